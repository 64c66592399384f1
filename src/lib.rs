//! Local Volume Provisioner - Discovery Engine
//!
//! Runs on every node and keeps one local PersistentVolume per directory or
//! block device found under the configured discovery paths.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                        Discovery Loop (per node)                     │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐  │
//! │  │ Path Scanner   │  │ Volume Naming  │  │   Lifecycle Driver     │  │
//! │  │ (dir / block)  │  │ (FNV-1a diff)  │  │  (create / delete PV)  │  │
//! │  └───────┬────────┘  └───────┬────────┘  └───────────┬────────────┘  │
//! │          └───────────────────┼───────────────────────┘               │
//! │                  ┌───────────┴───────────┐                           │
//! │                  │ Class-scoped PV cache │                           │
//! │                  └───────────────────────┘                           │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  Host volume util (statvfs, block size)  │  Kubernetes API + Events  │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`discovery`]: Scanning, naming, affinity, and reconciliation
//! - [`cache`]: Per-pass snapshots of registered volumes
//! - [`cluster`]: Kubernetes adapters for volumes, events, and nodes
//! - [`volume`]: Host filesystem probing
//! - [`config`]: Discovery map and runtime configuration
//! - [`domain`]: Core domain types and traits
//! - [`error`]: Error types and handling

pub mod cache;
pub mod cluster;
pub mod config;
pub mod discovery;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod volume;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use cache::VolumeCache;

pub use cluster::{KubeEventRecorder, KubeVolumeApi};

pub use config::{MountConfig, ProvisionerConfig, RuntimeConfig};

pub use discovery::{
    generate_pv_name, ClassReport, Discoverer, EntryOutcome, PassReport, PathScanner,
};

pub use domain::ports::{
    EventRecorder, NodeInfo, VolumeApi, VolumeType, VolumeUtil,
};

pub use error::{Error, ErrorAction, Result};

pub use metrics::DiscoveryMetrics;

pub use volume::HostVolumeUtil;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
