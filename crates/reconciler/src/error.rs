//! Error types for the reconciler crate.

use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler error types.
#[derive(Debug, Error)]
pub enum Error {
    /// Installing the slurmdbd package failed.
    #[error("install failed: {reason}")]
    InstallFailed { reason: String },

    /// Rendering the configuration or restarting the daemon failed.
    #[error("restart failed: {reason}")]
    RestartFailed { reason: String },

    /// Relation data from the database peer is incomplete or mistyped.
    #[error("malformed relation data: {reason}")]
    MalformedRelationData { reason: String },

    /// Configuration synthesis was attempted without database facts.
    #[error("database facts are not available; configuration cannot be synthesized")]
    IncompleteFacts,

    /// Publishing relation data failed.
    #[error("failed to publish on relation '{relation}': {reason}")]
    PublishFailed { relation: String, reason: String },

    /// Invalid reconciler configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Durable state could not be read or written.
    #[error("state error: {0}")]
    State(#[from] slurmdbd_events::Error),
}

impl Error {
    /// Create an install failed error.
    pub fn install_failed(reason: impl Into<String>) -> Self {
        Self::InstallFailed {
            reason: reason.into(),
        }
    }

    /// Create a restart failed error.
    pub fn restart_failed(reason: impl Into<String>) -> Self {
        Self::RestartFailed {
            reason: reason.into(),
        }
    }

    /// Create a malformed relation data error.
    pub fn malformed_relation_data(reason: impl Into<String>) -> Self {
        Self::MalformedRelationData {
            reason: reason.into(),
        }
    }

    /// Create a publish failed error.
    pub fn publish_failed(relation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PublishFailed {
            relation: relation.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}
