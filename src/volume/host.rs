//! Host Volume Util
//!
//! Probes directories and block devices on the local filesystem.

use crate::domain::ports::VolumeUtil;
use async_trait::async_trait;
use std::io::{self, Seek, SeekFrom};
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// [`VolumeUtil`] over the real filesystem
#[derive(Debug, Clone, Default)]
pub struct HostVolumeUtil;

impl HostVolumeUtil {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VolumeUtil for HostVolumeUtil {
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            // Volume names are derived from entry names, which must round-trip
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => warn!(
                    "Skipping entry {:?} under {}: name is not valid UTF-8",
                    raw,
                    path.display()
                ),
            }
        }
        names.sort();
        Ok(names)
    }

    async fn is_dir(&self, path: &Path) -> io::Result<bool> {
        Ok(tokio::fs::metadata(path).await?.is_dir())
    }

    async fn is_block(&self, path: &Path) -> io::Result<bool> {
        Ok(tokio::fs::metadata(path).await?.file_type().is_block_device())
    }

    async fn fs_capacity_bytes(&self, path: &Path) -> io::Result<u64> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || statvfs_capacity(&path))
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
    }

    async fn block_capacity_bytes(&self, path: &Path) -> io::Result<u64> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let mut device = std::fs::File::open(&path)?;
            device.seek(SeekFrom::End(0))
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
    }
}

/// Total size of the filesystem containing `path`
fn statvfs_capacity(path: &Path) -> io::Result<u64> {
    let stat = nix::sys::statvfs::statvfs(path)
        .map_err(|errno| io::Error::from_raw_os_error(errno as i32))?;
    Ok((stat.blocks() as u64).saturating_mul(stat.fragment_size() as u64))
}
