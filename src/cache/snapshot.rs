//! Class-scoped volume snapshot
//!
//! Point-in-time view of the PersistentVolumes this provisioner owns for one
//! storage class. Built once per pass from a single list call.

use crate::config::ANN_PROVISIONED_BY;
use k8s_openapi::api::core::v1::PersistentVolume;
use std::collections::BTreeMap;

/// Phase of a PersistentVolume claimed by a consumer
pub const PHASE_BOUND: &str = "Bound";

/// Registered volumes of one storage class, keyed by name
#[derive(Debug, Clone, Default)]
pub struct VolumeCache {
    pvs: BTreeMap<String, PersistentVolume>,
}

impl VolumeCache {
    /// Split one listing into a snapshot per class, keeping only volumes
    /// created by `provisioner`
    pub fn partition<'a, C, I>(classes: C, provisioner: &str, pvs: I) -> BTreeMap<String, VolumeCache>
    where
        C: IntoIterator<Item = &'a String>,
        I: IntoIterator<Item = PersistentVolume>,
    {
        let mut caches: BTreeMap<String, VolumeCache> = classes
            .into_iter()
            .map(|c| (c.clone(), VolumeCache::default()))
            .collect();

        for pv in pvs {
            if provisioned_by(&pv) != Some(provisioner) {
                continue;
            }
            if let Some(cache) = storage_class(&pv).and_then(|c| caches.get_mut(c)) {
                cache.insert(pv);
            }
        }
        caches
    }

    fn insert(&mut self, pv: PersistentVolume) {
        if let Some(name) = pv.metadata.name.clone() {
            self.pvs.insert(name, pv);
        }
    }

    pub fn get(&self, name: &str) -> Option<&PersistentVolume> {
        self.pvs.get(name)
    }

    pub fn list(&self) -> impl Iterator<Item = &PersistentVolume> {
        self.pvs.values()
    }

    pub fn len(&self) -> usize {
        self.pvs.len()
    }
}

/// Whether a volume is claimed by a consumer
pub fn is_bound(pv: &PersistentVolume) -> bool {
    pv.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .map_or(false, |phase| phase == PHASE_BOUND)
}

/// Value of the `provisioned-by` annotation
pub fn provisioned_by(pv: &PersistentVolume) -> Option<&str> {
    pv.metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(ANN_PROVISIONED_BY))
        .map(String::as_str)
}

/// Storage class recorded in the volume spec
pub fn storage_class(pv: &PersistentVolume) -> Option<&str> {
    pv.spec
        .as_ref()
        .and_then(|s| s.storage_class_name.as_deref())
}
