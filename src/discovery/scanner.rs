//! Discovery Path Scanner
//!
//! Lists a storage class's mount directory and classifies each entry as a
//! filesystem directory or a block device, then sizes it.

use crate::domain::ports::{VolumeType, VolumeUtilRef};
use crate::error::{Error, Result};
use std::path::Path;
use tracing::trace;

/// A classified and sized child of a mount directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackingEntry {
    pub volume_type: VolumeType,
    pub capacity_bytes: u64,
}

/// Scans mount directories through a [`crate::domain::ports::VolumeUtil`]
#[derive(Clone)]
pub struct PathScanner {
    vol_util: VolumeUtilRef,
}

impl PathScanner {
    pub fn new(vol_util: VolumeUtilRef) -> Self {
        Self { vol_util }
    }

    /// Child entry names of a mount directory
    pub async fn list(&self, mount_dir: &Path) -> Result<Vec<String>> {
        self.vol_util
            .read_dir(mount_dir)
            .await
            .map_err(|source| Error::DirectoryRead {
                path: mount_dir.display().to_string(),
                source,
            })
    }

    /// Directory check first, then block check
    pub async fn volume_type(&self, path: &Path) -> Result<VolumeType> {
        let dir_err = match self.vol_util.is_dir(path).await {
            Ok(true) => return Ok(VolumeType::File),
            Ok(false) => "not a directory".to_string(),
            Err(e) => e.to_string(),
        };
        let block_err = match self.vol_util.is_block(path).await {
            Ok(true) => return Ok(VolumeType::Block),
            Ok(false) => "not a block device".to_string(),
            Err(e) => e.to_string(),
        };

        Err(Error::UnknownMedia {
            path: path.display().to_string(),
            dir_err,
            block_err,
        })
    }

    /// Capacity in bytes, probed the way the media type requires
    pub async fn capacity_bytes(&self, path: &Path, volume_type: VolumeType) -> Result<u64> {
        let (probe, media) = match volume_type {
            VolumeType::Block => (self.vol_util.block_capacity_bytes(path).await, "block"),
            VolumeType::File => (self.vol_util.fs_capacity_bytes(path).await, "fs"),
        };
        probe.map_err(|e| Error::CapacityProbe {
            path: path.display().to_string(),
            media: media.to_string(),
            reason: e.to_string(),
        })
    }

    /// Classify and size one entry of a mount directory
    pub async fn inspect(&self, mount_dir: &Path, name: &str) -> Result<BackingEntry> {
        let path = mount_dir.join(name);
        let volume_type = self.volume_type(&path).await?;
        let capacity_bytes = self.capacity_bytes(&path, volume_type).await?;

        trace!(
            "Inspected {}: {} media, {} bytes",
            path.display(),
            volume_type,
            capacity_bytes
        );

        Ok(BackingEntry {
            volume_type,
            capacity_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeEntry, FakeVolumeUtil, GIB};
    use assert_matches::assert_matches;
    use std::sync::Arc;

    fn scanner(util: FakeVolumeUtil) -> PathScanner {
        PathScanner::new(Arc::new(util))
    }

    #[tokio::test]
    async fn test_list_entries() {
        let util = FakeVolumeUtil::new();
        util.add("/local-disks", "disk1", FakeEntry::dir(GIB));
        util.add("/local-disks", "disk2", FakeEntry::block(GIB));

        let names = scanner(util).list(Path::new("/local-disks")).await.unwrap();
        assert_eq!(names, vec!["disk1".to_string(), "disk2".to_string()]);
    }

    #[tokio::test]
    async fn test_list_missing_directory() {
        let result = scanner(FakeVolumeUtil::new())
            .list(Path::new("/missing"))
            .await;
        assert_matches!(result, Err(Error::DirectoryRead { path, .. }) if path == "/missing");
    }

    #[tokio::test]
    async fn test_directory_wins_over_block() {
        let util = FakeVolumeUtil::new();
        // Both probes say yes; the directory check runs first
        util.add("/m", "odd", FakeEntry::dir(GIB).also_block());

        let t = scanner(util).volume_type(Path::new("/m/odd")).await.unwrap();
        assert_eq!(t, VolumeType::File);
    }

    #[tokio::test]
    async fn test_block_only() {
        let util = FakeVolumeUtil::new();
        util.add("/m", "sdb", FakeEntry::block(GIB));

        let t = scanner(util).volume_type(Path::new("/m/sdb")).await.unwrap();
        assert_eq!(t, VolumeType::Block);
    }

    #[tokio::test]
    async fn test_block_check_runs_after_dir_probe_error() {
        let util = FakeVolumeUtil::new();
        util.add("/m", "sdc", FakeEntry::block(GIB).dir_probe_fails());

        let t = scanner(util).volume_type(Path::new("/m/sdc")).await.unwrap();
        assert_eq!(t, VolumeType::Block);
    }

    #[tokio::test]
    async fn test_unknown_media_carries_both_errors() {
        let util = FakeVolumeUtil::new();
        util.add("/m", "fifo", FakeEntry::other().dir_probe_fails());

        let result = scanner(util).volume_type(Path::new("/m/fifo")).await;
        assert_matches!(
            result,
            Err(Error::UnknownMedia { dir_err, block_err, .. })
                if dir_err.contains("probe failed") && block_err == "not a block device"
        );
    }

    #[tokio::test]
    async fn test_capacity_dispatch() {
        let util = FakeVolumeUtil::new();
        util.add("/m", "disk1", FakeEntry::dir(100 * GIB));
        util.add("/m", "disk2", FakeEntry::block(50 * GIB));
        let s = scanner(util);

        let d1 = s.inspect(Path::new("/m"), "disk1").await.unwrap();
        assert_eq!(d1.volume_type, VolumeType::File);
        assert_eq!(d1.capacity_bytes, 100 * GIB);

        let d2 = s.inspect(Path::new("/m"), "disk2").await.unwrap();
        assert_eq!(d2.volume_type, VolumeType::Block);
        assert_eq!(d2.capacity_bytes, 50 * GIB);
    }

    #[tokio::test]
    async fn test_capacity_probe_failure() {
        let util = FakeVolumeUtil::new();
        util.add("/m", "disk1", FakeEntry::dir(GIB).capacity_fails());

        let result = scanner(util).inspect(Path::new("/m"), "disk1").await;
        assert_matches!(result, Err(Error::CapacityProbe { media, .. }) if media == "fs");
    }
}
