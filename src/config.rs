//! Provisioner Configuration
//!
//! Storage-class discovery map loaded from YAML, plus the runtime bundle
//! handed to the discoverer.

use crate::domain::ports::{EventRecorderRef, NodeInfo, VolumeApiRef, VolumeUtilRef};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

// =============================================================================
// Constants
// =============================================================================

/// Node label used to pin discovered volumes to their node
pub const DEFAULT_NODE_LABEL_KEY: &str = "kubernetes.io/hostname";

/// Annotation recording which provisioner instance created a volume
pub const ANN_PROVISIONED_BY: &str = "pv.kubernetes.io/provisioned-by";

/// Annotation carrying the serialized node affinity
pub const ANN_ALPHA_NODE_AFFINITY: &str = "volume.alpha.kubernetes.io/node-affinity";

/// Event reason used when a volume could not be deleted
pub const EVENT_VOLUME_FAILED_DELETE: &str = "VolumeFailedDelete";

/// Default location of the storage-class map
pub const DEFAULT_CONFIG_PATH: &str = "/etc/provisioner/config/storageClassMap";

/// Prefix of the per-node provisioner identity
pub const PROVISIONER_NAME_PREFIX: &str = "local-volume-provisioner";

const DEFAULT_STORAGE_CLASS: &str = "local-storage";
const DEFAULT_HOST_DIR: &str = "/mnt/disks";
const DEFAULT_MOUNT_DIR: &str = "/local-disks";

// =============================================================================
// Mount Configuration
// =============================================================================

/// Where a storage class's volumes live, seen from the host and from this process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountConfig {
    /// Path recorded in created volumes
    pub host_dir: String,
    /// Path this process lists and stats
    #[serde(default)]
    pub mount_dir: String,
}

/// Storage-class discovery map
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionerConfig {
    #[serde(default)]
    pub storage_class_map: BTreeMap<String, MountConfig>,
}

impl ProvisionerConfig {
    /// Map used when no configuration file is present
    pub fn default_map() -> Self {
        let mut storage_class_map = BTreeMap::new();
        storage_class_map.insert(
            DEFAULT_STORAGE_CLASS.to_string(),
            MountConfig {
                host_dir: DEFAULT_HOST_DIR.to_string(),
                mount_dir: DEFAULT_MOUNT_DIR.to_string(),
            },
        );
        Self { storage_class_map }
    }

    /// Parse a YAML document and fill in defaults
    pub fn from_yaml(doc: &str) -> Result<Self> {
        let mut config: ProvisionerConfig = serde_yaml::from_str(doc).map_err(|e| {
            Error::Configuration(format!("Failed to parse storageClassMap: {}", e))
        })?;
        config.normalize()?;
        Ok(config)
    }

    /// Load from a file, falling back to the default map if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(doc) => {
                let config = Self::from_yaml(&doc)?;
                info!(
                    "Loaded {} storage class(es) from {}",
                    config.storage_class_map.len(),
                    path.display()
                );
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("No config at {}, using default discovery map", path.display());
                Ok(Self::default_map())
            }
            Err(e) => Err(Error::Configuration(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn normalize(&mut self) -> Result<()> {
        if self.storage_class_map.is_empty() {
            return Err(Error::Configuration(
                "storageClassMap has no entries".into(),
            ));
        }
        for (class, mount) in self.storage_class_map.iter_mut() {
            if mount.host_dir.is_empty() {
                return Err(Error::Configuration(format!(
                    "Storage class {} has no hostDir",
                    class
                )));
            }
            if mount.mount_dir.is_empty() {
                mount.mount_dir = mount.host_dir.clone();
            }
        }
        Ok(())
    }
}

// =============================================================================
// Runtime Configuration
// =============================================================================

/// Everything the discoverer needs at runtime
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Identity written into `provisioned-by`
    pub name: String,
    /// The local node
    pub node: NodeInfo,
    /// Label key used for node affinity
    pub node_label_key: String,
    /// Storage class → mount configuration
    pub discovery_map: BTreeMap<String, MountConfig>,
    /// Filesystem probing
    pub vol_util: VolumeUtilRef,
    /// PersistentVolume submission
    pub api: VolumeApiRef,
    /// Event sink
    pub recorder: EventRecorderRef,
}

impl RuntimeConfig {
    /// Provisioner identity for a node, unique per node incarnation
    pub fn provisioner_name(node: &NodeInfo) -> String {
        format!("{}-{}-{}", PROVISIONER_NAME_PREFIX, node.name, node.uid)
    }
}

impl std::fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("name", &self.name)
            .field("node", &self.node.name)
            .field("node_label_key", &self.node_label_key)
            .field("discovery_map", &self.discovery_map)
            .finish()
    }
}
