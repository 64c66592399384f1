//! Local Volume Discoverer
//!
//! Reconciles the entries under each configured discovery directory against
//! the PersistentVolumes this provisioner has registered:
//! - new entries get a PersistentVolume
//! - vanished entries lose theirs, unless the volume is bound

use crate::cache::{is_bound, VolumeCache};
use crate::cluster::pv::{create_local_pv_spec, LocalPvConfig};
use crate::config::{MountConfig, RuntimeConfig, EVENT_VOLUME_FAILED_DELETE};
use crate::discovery::affinity::{affinity_to_annotation, generate_node_affinity};
use crate::discovery::naming::generate_pv_name;
use crate::discovery::scanner::PathScanner;
use crate::error::{Error, ErrorAction, Result};
use crate::metrics::DiscoveryMetrics;
use futures::future::join_all;
use k8s_openapi::api::core::v1::{NodeAffinity, PersistentVolume};
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, info_span, warn, Instrument};

// =============================================================================
// Pass Reports
// =============================================================================

/// What happened to one entry or volume during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// A PersistentVolume was created
    Created(String),
    /// Another creator registered the volume first
    AlreadyExists(String),
    /// A PersistentVolume was deleted
    Deleted(String),
}

/// Result of reconciling one storage class
#[derive(Debug, Default)]
pub struct ClassReport {
    pub class: String,
    /// Entries listed under the mount directory
    pub discovered: usize,
    pub created: Vec<String>,
    pub already_existed: Vec<String>,
    pub deleted: Vec<String>,
    /// Bound volumes whose media disappeared
    pub orphaned: Vec<String>,
    /// Per-entry failures, keyed by volume name
    pub failures: Vec<(String, Error)>,
    /// Set when the class could not be scanned at all
    pub abandoned: Option<Error>,
}

impl ClassReport {
    fn new(class: &str) -> Self {
        Self {
            class: class.to_string(),
            ..Default::default()
        }
    }

    fn record(&mut self, subject: String, result: Result<EntryOutcome>) {
        match result {
            Ok(EntryOutcome::Created(name)) => self.created.push(name),
            Ok(EntryOutcome::AlreadyExists(name)) => self.already_existed.push(name),
            Ok(EntryOutcome::Deleted(name)) => self.deleted.push(name),
            Err(e) => self.failures.push((subject, e)),
        }
    }
}

/// Result of one discovery pass across every storage class
#[derive(Debug, Default)]
pub struct PassReport {
    pub classes: BTreeMap<String, ClassReport>,
    /// Set when the registered volumes could not be listed
    pub abandoned: Option<Error>,
}

impl PassReport {
    pub fn created(&self) -> usize {
        self.classes.values().map(|c| c.created.len()).sum()
    }

    pub fn deleted(&self) -> usize {
        self.classes.values().map(|c| c.deleted.len()).sum()
    }

    pub fn orphaned(&self) -> usize {
        self.classes.values().map(|c| c.orphaned.len()).sum()
    }

    pub fn failures(&self) -> usize {
        self.classes
            .values()
            .map(|c| c.failures.len() + usize::from(c.abandoned.is_some()))
            .sum::<usize>()
            + usize::from(self.abandoned.is_some())
    }

    /// Delay requested by a throttled API server before the next pass
    pub fn backoff(&self) -> Option<Duration> {
        let class_errors = self.classes.values().flat_map(|c| {
            c.failures
                .iter()
                .map(|(_, e)| e)
                .chain(c.abandoned.iter())
        });
        self.abandoned
            .iter()
            .chain(class_errors)
            .filter_map(|e| match e.action() {
                ErrorAction::RetryAfter(delay) => Some(delay),
                _ => None,
            })
            .max()
    }

    fn log_summary(&self) {
        if self.abandoned.is_some() {
            return;
        }
        info!(
            created = self.created(),
            deleted = self.deleted(),
            orphaned = self.orphaned(),
            failures = self.failures(),
            "Discovery pass complete"
        );
    }
}

// =============================================================================
// Discoverer
// =============================================================================

/// Scans discovery directories and creates local PersistentVolumes for them
pub struct Discoverer {
    config: RuntimeConfig,
    scanner: PathScanner,
    node_affinity: NodeAffinity,
    node_affinity_ann: String,
    metrics: DiscoveryMetrics,
}

impl std::fmt::Debug for Discoverer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Discoverer")
            .field("config", &self.config)
            .field("node_affinity_ann", &self.node_affinity_ann)
            .finish_non_exhaustive()
    }
}

impl Discoverer {
    /// Build the discoverer; fails if the node cannot be pinned by label
    pub fn new(config: RuntimeConfig, metrics: DiscoveryMetrics) -> Result<Self> {
        let node_affinity = generate_node_affinity(&config.node, &config.node_label_key)
            .map_err(|e| {
                Error::Configuration(format!("Failed to generate node affinity: {}", e))
            })?;
        let node_affinity_ann = affinity_to_annotation(&node_affinity).map_err(|e| {
            Error::Configuration(format!(
                "Failed to convert node affinity to alpha annotation: {}",
                e
            ))
        })?;

        Ok(Self {
            scanner: PathScanner::new(config.vol_util.clone()),
            config,
            node_affinity,
            node_affinity_ann,
            metrics,
        })
    }

    /// Annotation embedded in every volume this instance creates
    pub fn node_affinity_annotation(&self) -> &str {
        &self.node_affinity_ann
    }

    /// Run passes every `period` until `shutdown` resolves
    pub async fn run<F>(&self, period: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            "Starting discovery every {:?} for {} storage class(es)",
            period,
            self.config.discovery_map.len()
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }
            let report = tokio::select! {
                _ = &mut shutdown => break,
                report = self.discover_local_volumes() => report,
            };
            report.log_summary();

            if let Some(delay) = report.backoff() {
                warn!("API server is throttling, delaying next pass by {:?}", delay);
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        info!("Discovery loop stopped");
    }

    /// Run one discovery-and-reconciliation pass over every storage class
    pub async fn discover_local_volumes(&self) -> PassReport {
        let started = Instant::now();
        let span = info_span!("discovery_pass", node = %self.config.node.name);

        let report = async {
            let mut report = PassReport::default();

            let pvs = match self.config.api.list_pvs().await {
                Ok(pvs) => pvs,
                Err(e) => {
                    error!("Failed to list PersistentVolumes, skipping pass: {}", e);
                    report.abandoned = Some(e);
                    return report;
                }
            };
            let caches =
                VolumeCache::partition(self.config.discovery_map.keys(), &self.config.name, pvs);

            let passes = self.config.discovery_map.iter().map(|(class, mount)| {
                let cache = &caches[class];
                self.discover_volumes_at_path(class, mount, cache)
                    .instrument(info_span!("storage_class", class = %class))
            });
            for class_report in join_all(passes).await {
                report.classes.insert(class_report.class.clone(), class_report);
            }
            report
        }
        .instrument(span)
        .await;

        self.observe(&report, started.elapsed());
        report
    }

    /// Reconcile one storage class against its snapshot
    pub async fn discover_volumes_at_path(
        &self,
        class: &str,
        mount: &MountConfig,
        cache: &VolumeCache,
    ) -> ClassReport {
        let mut report = ClassReport::new(class);
        debug!(
            "Discovering volumes at hostpath {}, mount path {} for storage class {} ({} registered)",
            mount.host_dir,
            mount.mount_dir,
            class,
            cache.len()
        );

        let files = match self.scanner.list(Path::new(&mount.mount_dir)).await {
            Ok(files) => files,
            Err(e) => {
                error!("Error reading directory: {}", e);
                report.abandoned = Some(e);
                return report;
            }
        };
        report.discovered = files.len();

        let mut backed = HashSet::with_capacity(files.len());
        for file in &files {
            let pv_name = generate_pv_name(file, &self.config.node.name, class);
            backed.insert(pv_name.clone());
            if cache.get(&pv_name).is_some() {
                continue;
            }
            let result = self.create_volume(file, &pv_name, class, mount).await;
            report.record(pv_name, result);
        }

        for pv in cache.list() {
            let name = pv.metadata.name.clone().unwrap_or_default();
            if backed.contains(&name) {
                continue;
            }
            if is_bound(pv) {
                error!("{}", Error::OrphanedBoundVolume { name: name.clone() });
                report.orphaned.push(name);
            } else {
                let result = self.delete_volume(pv, &name).await;
                report.record(name, result);
            }
        }

        report
    }

    async fn create_volume(
        &self,
        file: &str,
        pv_name: &str,
        class: &str,
        mount: &MountConfig,
    ) -> Result<EntryOutcome> {
        let entry = match self.scanner.inspect(Path::new(&mount.mount_dir), file).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping {}: {}", file, e);
                return Err(e);
            }
        };
        let outside_path = Path::new(&mount.host_dir).join(file).display().to_string();

        info!(
            "Found new volume of volumeType {} at host path {} with capacity {}, creating Local PV {}",
            entry.volume_type, outside_path, entry.capacity_bytes, pv_name
        );

        let spec = create_local_pv_spec(&LocalPvConfig {
            name: pv_name.to_string(),
            host_path: outside_path.clone(),
            capacity_bytes: entry.capacity_bytes,
            storage_class: class.to_string(),
            volume_type: entry.volume_type,
            provisioner_name: self.config.name.clone(),
            affinity_ann: self.node_affinity_ann.clone(),
            node_affinity: Some(self.node_affinity.clone()),
        });

        match self.config.api.create_pv(&spec).await {
            Ok(_) => {
                info!("Created PV {} for volume at {}", pv_name, outside_path);
                Ok(EntryOutcome::Created(pv_name.to_string()))
            }
            Err(Error::ResourceExists { .. }) => {
                debug!("PV {} already exists", pv_name);
                Ok(EntryOutcome::AlreadyExists(pv_name.to_string()))
            }
            Err(e) => {
                error!("Error creating PV {} for volume at {}: {}", pv_name, outside_path, e);
                Err(e)
            }
        }
    }

    async fn delete_volume(&self, pv: &PersistentVolume, name: &str) -> Result<EntryOutcome> {
        match self.config.api.delete_pv(name).await {
            Ok(()) => {
                info!("Deleted PV {}", name);
                Ok(EntryOutcome::Deleted(name.to_string()))
            }
            Err(e) => {
                let message = format!("Error deleting PV {}: {}", name, e);
                warn!("{}", message);
                self.config
                    .recorder
                    .record_warning(pv, EVENT_VOLUME_FAILED_DELETE, &message)
                    .await;
                Err(e)
            }
        }
    }

    fn observe(&self, report: &PassReport, elapsed: Duration) {
        self.metrics.pass_duration.observe(elapsed.as_secs_f64());
        for (class, r) in &report.classes {
            self.metrics
                .volumes_created
                .with_label_values(&[class.as_str()])
                .inc_by(r.created.len() as u64);
            self.metrics
                .volumes_deleted
                .with_label_values(&[class.as_str()])
                .inc_by(r.deleted.len() as u64);
            // An abandoned class saw no entries, so its orphans are unknown
            if r.abandoned.is_none() {
                self.metrics
                    .orphaned_bound
                    .with_label_values(&[class.as_str()])
                    .set(r.orphaned.len() as i64);
            }
            for (_, e) in &r.failures {
                self.metrics
                    .entry_errors
                    .with_label_values(&[class.as_str(), e.kind()])
                    .inc();
            }
            if let Some(e) = &r.abandoned {
                self.metrics
                    .entry_errors
                    .with_label_values(&[class.as_str(), e.kind()])
                    .inc();
            }
        }
    }
}
