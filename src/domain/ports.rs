//! Domain Ports - Core trait definitions for the provisioner
//!
//! These traits define the boundaries between the discovery engine and the
//! host filesystem, the Kubernetes API, and the event stream.
//! Adapters implement these traits to provide concrete functionality.

use crate::error::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::PersistentVolume;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// Media Types
// =============================================================================

/// Kind of backing media found under a discovery directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeType {
    Block,
    File,
}

impl VolumeType {
    /// Value for `PersistentVolumeSpec.volumeMode`
    pub fn volume_mode(&self) -> &'static str {
        match self {
            VolumeType::Block => "Block",
            VolumeType::File => "Filesystem",
        }
    }
}

impl std::fmt::Display for VolumeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VolumeType::Block => write!(f, "block"),
            VolumeType::File => write!(f, "file"),
        }
    }
}

// =============================================================================
// Node Identity
// =============================================================================

/// Identity of the node this provisioner runs on
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Kubernetes node name
    pub name: String,
    /// Node UID, used to make the provisioner name unique per node incarnation
    pub uid: String,
    /// Node labels; `None` when the node object carries no label map at all
    pub labels: Option<BTreeMap<String, String>>,
}

// =============================================================================
// Volume Util Port
// =============================================================================

/// Port for filesystem and block-device probing
#[async_trait]
pub trait VolumeUtil: Send + Sync {
    /// List child entry names of a directory
    async fn read_dir(&self, path: &Path) -> std::io::Result<Vec<String>>;

    /// Check whether a path is a directory
    async fn is_dir(&self, path: &Path) -> std::io::Result<bool>;

    /// Check whether a path is a block special file
    async fn is_block(&self, path: &Path) -> std::io::Result<bool>;

    /// Capacity in bytes of the filesystem backing a directory
    async fn fs_capacity_bytes(&self, path: &Path) -> std::io::Result<u64>;

    /// Capacity in bytes of a block device
    async fn block_capacity_bytes(&self, path: &Path) -> std::io::Result<u64>;
}

// =============================================================================
// Volume API Port
// =============================================================================

/// Port for PersistentVolume submission
#[async_trait]
pub trait VolumeApi: Send + Sync {
    /// Create a PersistentVolume.
    ///
    /// Returns [`crate::Error::ResourceExists`] when a volume with the same
    /// name is already registered.
    async fn create_pv(&self, pv: &PersistentVolume) -> Result<PersistentVolume>;

    /// Delete a PersistentVolume by name
    async fn delete_pv(&self, name: &str) -> Result<()>;

    /// List all PersistentVolumes visible to the provisioner
    async fn list_pvs(&self) -> Result<Vec<PersistentVolume>>;
}

// =============================================================================
// Event Recorder Port
// =============================================================================

/// Port for surfacing problems on cluster objects
#[async_trait]
pub trait EventRecorder: Send + Sync {
    /// Attach a Warning event to a PersistentVolume
    async fn record_warning(&self, pv: &PersistentVolume, reason: &str, message: &str);
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type VolumeUtilRef = Arc<dyn VolumeUtil>;
pub type VolumeApiRef = Arc<dyn VolumeApi>;
pub type EventRecorderRef = Arc<dyn EventRecorder>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_type_display() {
        assert_eq!(format!("{}", VolumeType::Block), "block");
        assert_eq!(format!("{}", VolumeType::File), "file");
    }

    #[test]
    fn test_volume_mode() {
        assert_eq!(VolumeType::Block.volume_mode(), "Block");
        assert_eq!(VolumeType::File.volume_mode(), "Filesystem");
    }
}
