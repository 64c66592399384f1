//! Error types for the Local Volume Provisioner
//!
//! Provides structured error types for startup configuration, path scanning,
//! media probing, and Kubernetes API interaction.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for the provisioner
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Resource not found: {kind}/{name}")]
    ResourceNotFound { kind: String, name: String },

    #[error("Resource already exists: {kind}/{name}")]
    ResourceExists { kind: String, name: String },

    #[error("Missing backend storage media for bound volume {name}")]
    OrphanedBoundVolume { name: String },

    // =========================================================================
    // Discovery Errors
    // =========================================================================
    #[error("Failed to read directory {path}: {source}")]
    DirectoryRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Block device check for {path} failed: DirErr - {dir_err} BlkErr - {block_err}")]
    UnknownMedia {
        path: String,
        dir_err: String,
        block_err: String,
    },

    #[error("Path {path} {media} stats error: {reason}")]
    CapacityProbe {
        path: String,
        media: String,
        reason: String,
    },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

/// Action to take on error during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Retry on the next discovery pass
    RetryNextPass,
    /// Retry after specific duration
    RetryAfter(Duration),
    /// Don't retry, wait for operator intervention
    NoRetry,
}

impl Error {
    /// Determine what action to take for this error
    pub fn action(&self) -> ErrorAction {
        match self {
            // Startup problems never fix themselves
            Error::Configuration(_) => ErrorAction::NoRetry,

            // A bound volume lost its media; someone has to look at it
            Error::OrphanedBoundVolume { .. } => ErrorAction::NoRetry,

            // Back off a little when the API server is struggling
            Error::Kube(kube::Error::Api(resp)) if resp.code == 429 => {
                ErrorAction::RetryAfter(Duration::from_secs(30))
            }

            // Entry- and API-level failures are picked up by the next re-diff
            _ => ErrorAction::RetryNextPass,
        }
    }

    /// Short, stable label for metrics and event reasons
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Internal(_) => "internal",
            Error::Configuration(_) => "configuration",
            Error::Kube(_) => "kube",
            Error::ResourceNotFound { .. } => "not_found",
            Error::ResourceExists { .. } => "already_exists",
            Error::OrphanedBoundVolume { .. } => "orphaned_bound",
            Error::DirectoryRead { .. } => "directory_read",
            Error::UnknownMedia { .. } => "unknown_media",
            Error::CapacityProbe { .. } => "capacity_probe",
            Error::JsonParse(_) => "json",
        }
    }
}

/// Result type alias for the provisioner
pub type Result<T> = std::result::Result<T, Error>;
