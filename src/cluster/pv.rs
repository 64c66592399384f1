//! Local PersistentVolume Spec
//!
//! Builds the PersistentVolume object submitted for a discovered entry.

use crate::config::{ANN_ALPHA_NODE_AFFINITY, ANN_PROVISIONED_BY};
use crate::domain::ports::VolumeType;
use k8s_openapi::api::core::v1::{
    LocalVolumeSource, NodeAffinity, PersistentVolume, PersistentVolumeSpec, VolumeNodeAffinity,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Everything that goes into a local PersistentVolume
#[derive(Debug, Clone)]
pub struct LocalPvConfig {
    pub name: String,
    /// Path of the backing entry as seen from the host
    pub host_path: String,
    pub capacity_bytes: u64,
    pub storage_class: String,
    pub volume_type: VolumeType,
    /// Identity of the provisioner that owns the volume
    pub provisioner_name: String,
    /// Serialized node affinity
    pub affinity_ann: String,
    /// Same constraint in structured form
    pub node_affinity: Option<NodeAffinity>,
}

/// PersistentVolume for a local directory or block device
pub fn create_local_pv_spec(config: &LocalPvConfig) -> PersistentVolume {
    let mut annotations = BTreeMap::new();
    annotations.insert(ANN_PROVISIONED_BY.to_string(), config.provisioner_name.clone());
    annotations.insert(ANN_ALPHA_NODE_AFFINITY.to_string(), config.affinity_ann.clone());

    let mut capacity = BTreeMap::new();
    capacity.insert(
        "storage".to_string(),
        Quantity(config.capacity_bytes.to_string()),
    );

    let node_affinity = config
        .node_affinity
        .as_ref()
        .and_then(|a| a.required_during_scheduling_ignored_during_execution.clone())
        .map(|required| VolumeNodeAffinity {
            required: Some(required),
        });

    PersistentVolume {
        metadata: ObjectMeta {
            name: Some(config.name.clone()),
            annotations: Some(annotations),
            ..Default::default()
        },
        spec: Some(PersistentVolumeSpec {
            persistent_volume_reclaim_policy: Some("Delete".to_string()),
            capacity: Some(capacity),
            local: Some(LocalVolumeSource {
                path: config.host_path.clone(),
                fs_type: None,
            }),
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            storage_class_name: Some(config.storage_class.clone()),
            volume_mode: Some(config.volume_type.volume_mode().to_string()),
            node_affinity,
            ..Default::default()
        }),
        status: None,
    }
}

/// Capacity recorded in a volume spec, in bytes
pub fn capacity_bytes(pv: &PersistentVolume) -> Option<u64> {
    pv.spec
        .as_ref()
        .and_then(|s| s.capacity.as_ref())
        .and_then(|c| c.get("storage"))
        .and_then(|q| q.0.parse().ok())
}

/// Host path recorded in a volume spec
pub fn local_path(pv: &PersistentVolume) -> Option<&str> {
    pv.spec
        .as_ref()
        .and_then(|s| s.local.as_ref())
        .map(|l| l.path.as_str())
}
