//! Cluster Adapters
//!
//! Kubernetes-backed implementations of the volume, event, and node ports.

pub mod api;
pub mod events;
pub mod node;
pub mod pv;

pub use api::*;
pub use events::*;
pub use node::*;
pub use pv::*;
