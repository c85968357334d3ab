//! Source of operator configuration options.

use async_trait::async_trait;
use slurmdbd_core::Options;
use tokio::sync::RwLock;

/// Supplies the current operator options. Read-only to the reconciler.
#[async_trait]
pub trait OptionsSource: Send + Sync {
    /// Get the options currently in effect.
    async fn options(&self) -> Options;
}

/// Options held in memory and replaced wholesale when they change.
#[derive(Default)]
pub struct SharedOptions {
    options: RwLock<Options>,
}

impl SharedOptions {
    /// Create a source holding `options`.
    pub fn new(options: Options) -> Self {
        Self {
            options: RwLock::new(options),
        }
    }

    /// Replace the options.
    pub async fn replace(&self, options: Options) {
        *self.options.write().await = options;
    }
}

#[async_trait]
impl OptionsSource for SharedOptions {
    async fn options(&self) -> Options {
        self.options.read().await.clone()
    }
}
