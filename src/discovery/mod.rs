//! Local Volume Discovery Module
//!
//! Scans configured discovery directories, names each backing entry, and
//! reconciles the result against registered PersistentVolumes.

pub mod affinity;
pub mod discoverer;
pub mod naming;
pub mod scanner;

pub use affinity::*;
pub use discoverer::*;
pub use naming::*;
pub use scanner::*;
