//! Discovery Metrics
//!
//! Prometheus counters and gauges describing reconciliation passes.

use crate::error::{Error, Result};
use prometheus::{
    Histogram, HistogramOpts, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};

/// Metrics for the discovery loop, registered on their own registry
#[derive(Clone)]
pub struct DiscoveryMetrics {
    registry: Registry,
    pub volumes_created: IntCounterVec,
    pub volumes_deleted: IntCounterVec,
    pub entry_errors: IntCounterVec,
    pub orphaned_bound: IntGaugeVec,
    pub pass_duration: Histogram,
}

impl DiscoveryMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let volumes_created = IntCounterVec::new(
            Opts::new("local_volume_created_total", "PersistentVolumes created"),
            &["class"],
        )
        .map_err(metrics_err)?;
        let volumes_deleted = IntCounterVec::new(
            Opts::new("local_volume_deleted_total", "PersistentVolumes deleted"),
            &["class"],
        )
        .map_err(metrics_err)?;
        let entry_errors = IntCounterVec::new(
            Opts::new(
                "local_volume_entry_errors_total",
                "Entries skipped or failed during discovery",
            ),
            &["class", "kind"],
        )
        .map_err(metrics_err)?;
        let orphaned_bound = IntGaugeVec::new(
            Opts::new(
                "local_volume_orphaned_bound",
                "Bound PersistentVolumes whose backing media is missing",
            ),
            &["class"],
        )
        .map_err(metrics_err)?;
        let pass_duration = Histogram::with_opts(HistogramOpts::new(
            "local_volume_pass_duration_seconds",
            "Duration of discovery passes",
        ))
        .map_err(metrics_err)?;

        registry
            .register(Box::new(volumes_created.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(volumes_deleted.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(entry_errors.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(orphaned_bound.clone()))
            .map_err(metrics_err)?;
        registry
            .register(Box::new(pass_duration.clone()))
            .map_err(metrics_err)?;

        Ok(Self {
            registry,
            volumes_created,
            volumes_deleted,
            entry_errors,
            orphaned_bound,
            pass_duration,
        })
    }

    /// Text exposition of every registered metric
    pub fn encode(&self) -> Result<String> {
        TextEncoder::new()
            .encode_to_string(&self.registry.gather())
            .map_err(metrics_err)
    }
}

fn metrics_err(e: prometheus::Error) -> Error {
    Error::Internal(format!("Metrics error: {}", e))
}
