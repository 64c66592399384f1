//! Volume Probing Module
//!
//! Host filesystem implementation of the volume util port.

pub mod host;

pub use host::*;
