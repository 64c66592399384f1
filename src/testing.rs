//! In-memory adapters used by unit tests

use crate::domain::ports::{EventRecorder, VolumeApi, VolumeUtil};
use crate::error::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeStatus};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::Path;

pub const GIB: u64 = 1024 * 1024 * 1024;

// =============================================================================
// Fake Volume Util
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FakeKind {
    Dir,
    Block,
    Other,
}

/// A fake directory child
#[derive(Debug, Clone)]
pub struct FakeEntry {
    kind: FakeKind,
    capacity_bytes: u64,
    also_block: bool,
    dir_probe_fails: bool,
    capacity_fails: bool,
}

impl FakeEntry {
    fn new(kind: FakeKind, capacity_bytes: u64) -> Self {
        Self {
            kind,
            capacity_bytes,
            also_block: false,
            dir_probe_fails: false,
            capacity_fails: false,
        }
    }

    pub fn dir(capacity_bytes: u64) -> Self {
        Self::new(FakeKind::Dir, capacity_bytes)
    }

    pub fn block(capacity_bytes: u64) -> Self {
        Self::new(FakeKind::Block, capacity_bytes)
    }

    pub fn other() -> Self {
        Self::new(FakeKind::Other, 0)
    }

    pub fn also_block(mut self) -> Self {
        self.also_block = true;
        self
    }

    pub fn dir_probe_fails(mut self) -> Self {
        self.dir_probe_fails = true;
        self
    }

    pub fn capacity_fails(mut self) -> Self {
        self.capacity_fails = true;
        self
    }
}

/// Directory tree held in memory
#[derive(Default)]
pub struct FakeVolumeUtil {
    dirs: Mutex<BTreeMap<String, BTreeMap<String, FakeEntry>>>,
    unreadable: Mutex<BTreeSet<String>>,
}

impl FakeVolumeUtil {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&self, dir: &str) {
        self.dirs.lock().entry(dir.to_string()).or_default();
    }

    pub fn add(&self, dir: &str, name: &str, entry: FakeEntry) {
        self.dirs
            .lock()
            .entry(dir.to_string())
            .or_default()
            .insert(name.to_string(), entry);
    }

    pub fn remove(&self, dir: &str, name: &str) {
        if let Some(children) = self.dirs.lock().get_mut(dir) {
            children.remove(name);
        }
    }

    pub fn make_unreadable(&self, dir: &str) {
        self.unreadable.lock().insert(dir.to_string());
    }

    fn lookup(&self, path: &Path) -> io::Result<FakeEntry> {
        let parent = path
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.dirs
            .lock()
            .get(&parent)
            .and_then(|children| children.get(&name))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }
}

#[async_trait]
impl VolumeUtil for FakeVolumeUtil {
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let key = path.display().to_string();
        if self.unreadable.lock().contains(&key) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"));
        }
        self.dirs
            .lock()
            .get(&key)
            .map(|children| children.keys().cloned().collect())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such directory"))
    }

    async fn is_dir(&self, path: &Path) -> io::Result<bool> {
        let entry = self.lookup(path)?;
        if entry.dir_probe_fails {
            return Err(io::Error::new(io::ErrorKind::Other, "dir probe failed"));
        }
        Ok(entry.kind == FakeKind::Dir)
    }

    async fn is_block(&self, path: &Path) -> io::Result<bool> {
        let entry = self.lookup(path)?;
        Ok(entry.kind == FakeKind::Block || entry.also_block)
    }

    async fn fs_capacity_bytes(&self, path: &Path) -> io::Result<u64> {
        let entry = self.lookup(path)?;
        if entry.capacity_fails {
            return Err(io::Error::new(io::ErrorKind::Other, "statvfs failed"));
        }
        Ok(entry.capacity_bytes)
    }

    async fn block_capacity_bytes(&self, path: &Path) -> io::Result<u64> {
        let entry = self.lookup(path)?;
        if entry.capacity_fails {
            return Err(io::Error::new(io::ErrorKind::Other, "seek failed"));
        }
        Ok(entry.capacity_bytes)
    }
}

// =============================================================================
// Fake Volume API
// =============================================================================

/// PersistentVolume store with call recording and failure injection
#[derive(Default)]
pub struct FakeVolumeApi {
    pvs: Mutex<BTreeMap<String, PersistentVolume>>,
    created: Mutex<Vec<PersistentVolume>>,
    deleted: Mutex<Vec<String>>,
    fail_create: Mutex<BTreeSet<String>>,
    fail_delete: Mutex<BTreeSet<String>>,
    racing_create: Mutex<BTreeSet<String>>,
    fail_list: Mutex<bool>,
}

impl FakeVolumeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a volume without recording a create call
    pub fn insert(&self, pv: PersistentVolume) {
        let name = pv.metadata.name.clone().unwrap_or_default();
        self.pvs.lock().insert(name, pv);
    }

    pub fn set_phase(&self, name: &str, phase: &str) {
        if let Some(pv) = self.pvs.lock().get_mut(name) {
            pv.status = Some(PersistentVolumeStatus {
                phase: Some(phase.to_string()),
                ..Default::default()
            });
        }
    }

    pub fn fail_create(&self, name: &str) {
        self.fail_create.lock().insert(name.to_string());
    }

    pub fn fail_delete(&self, name: &str) {
        self.fail_delete.lock().insert(name.to_string());
    }

    pub fn fail_list(&self, fail: bool) {
        *self.fail_list.lock() = fail;
    }

    pub fn clear_failures(&self) {
        self.fail_create.lock().clear();
        self.fail_delete.lock().clear();
        *self.fail_list.lock() = false;
    }

    /// Make the next create of `name` lose a race to another creator
    pub fn race_create(&self, name: &str) {
        self.racing_create.lock().insert(name.to_string());
    }

    pub fn created(&self) -> Vec<PersistentVolume> {
        self.created.lock().clone()
    }

    pub fn created_names(&self) -> Vec<String> {
        self.created
            .lock()
            .iter()
            .filter_map(|pv| pv.metadata.name.clone())
            .collect()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pvs.lock().contains_key(name)
    }
}

#[async_trait]
impl VolumeApi for FakeVolumeApi {
    async fn create_pv(&self, pv: &PersistentVolume) -> Result<PersistentVolume> {
        let name = pv.metadata.name.clone().unwrap_or_default();
        if self.fail_create.lock().contains(&name) {
            return Err(Error::Internal(format!("injected create failure for {}", name)));
        }
        if self.racing_create.lock().remove(&name) {
            self.pvs.lock().insert(name.clone(), pv.clone());
        }
        let mut pvs = self.pvs.lock();
        if pvs.contains_key(&name) {
            return Err(Error::ResourceExists {
                kind: "PersistentVolume".into(),
                name,
            });
        }
        pvs.insert(name, pv.clone());
        self.created.lock().push(pv.clone());
        Ok(pv.clone())
    }

    async fn delete_pv(&self, name: &str) -> Result<()> {
        if self.fail_delete.lock().contains(name) {
            return Err(Error::Internal(format!("injected delete failure for {}", name)));
        }
        self.pvs.lock().remove(name);
        self.deleted.lock().push(name.to_string());
        Ok(())
    }

    async fn list_pvs(&self) -> Result<Vec<PersistentVolume>> {
        if *self.fail_list.lock() {
            return Err(Error::Internal("injected list failure".into()));
        }
        Ok(self.pvs.lock().values().cloned().collect())
    }
}

// =============================================================================
// Fake Event Recorder
// =============================================================================

/// A recorded warning: (volume name, reason, message)
pub type RecordedEvent = (String, String, String);

#[derive(Default)]
pub struct FakeEventRecorder {
    events: Mutex<Vec<RecordedEvent>>,
}

impl FakeEventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl EventRecorder for FakeEventRecorder {
    async fn record_warning(&self, pv: &PersistentVolume, reason: &str, message: &str) {
        self.events.lock().push((
            pv.metadata.name.clone().unwrap_or_default(),
            reason.to_string(),
            message.to_string(),
        ));
    }
}
