//! Registered Volume Cache
//!
//! Snapshots of the PersistentVolumes this provisioner has registered,
//! scoped per storage class and refreshed once per discovery pass.

pub mod snapshot;

pub use snapshot::*;
