//! Unit status reporting.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slurmdbd_events::{get_typed, set_typed, KeyValueStore};

use crate::error::Result;

/// Store key holding the last written status.
pub const STATUS_KEY: &str = "unit.status";

/// Kind of status shown to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusKind {
    Blocked,
    Installed,
    Active,
}

/// Human-facing unit status.
///
/// Write-only from the reconciler's point of view: nothing reads it back to
/// decide what to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub kind: StatusKind,
    pub message: String,
}

impl Status {
    /// Blocked, with the reason shown to the operator.
    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Blocked,
            message: reason.into(),
        }
    }

    /// The slurmdbd package is installed.
    pub fn installed() -> Self {
        Self {
            kind: StatusKind::Installed,
            message: "slurm installed".to_string(),
        }
    }

    /// slurmdbd is configured and running.
    pub fn active() -> Self {
        Self {
            kind: StatusKind::Active,
            message: "slurmdbd available".to_string(),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            StatusKind::Blocked => write!(f, "Blocked: {}", self.message),
            StatusKind::Installed => f.write_str("Installed"),
            StatusKind::Active => f.write_str("Active"),
        }
    }
}

/// Trait for publishing the unit status.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    /// Overwrite the current status.
    async fn set_status(&self, status: Status) -> Result<()>;
}

/// Status reporter that keeps the last status in the key/value store.
pub struct StoreStatusReporter {
    store: Arc<dyn KeyValueStore>,
}

impl StoreStatusReporter {
    /// Create a reporter over a key/value store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The last status written, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn last_status(&self) -> Result<Option<Status>> {
        Ok(get_typed(self.store.as_ref(), STATUS_KEY).await?)
    }
}

#[async_trait]
impl StatusReporter for StoreStatusReporter {
    async fn set_status(&self, status: Status) -> Result<()> {
        tracing::info!(status = %status, message = %status.message, "Unit status");
        Ok(set_typed(self.store.as_ref(), STATUS_KEY, &status).await?)
    }
}
