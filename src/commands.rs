//! CLI command handlers.
//!
//! Every event command is one dispatcher invocation: the unit's state file is
//! opened, the new event is delivered, previously deferred events are
//! redelivered, and everything is dropped again.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::sync::Arc;

use anyhow::{Context, Result};
use slurmdbd_core::OperatorConfig;
use slurmdbd_events::{Dispatcher, JsonFileStore, KeyValueStore, TracingKeyValueStore, UnitEvent};
use slurmdbd_reconciler::{
    Reconciler, ReconcilerBuilder, SharedOptions, StoreStatusReporter, SystemServiceManager,
};
use tracing::info;

use crate::cli::Commands;

/// A unit opened from its operator configuration.
pub struct Unit {
    dispatcher: Dispatcher<Reconciler>,
    status: StoreStatusReporter,
}

impl Unit {
    /// Open the state file and wire up the reconciler.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file is unreadable or the service
    /// configuration is invalid.
    pub async fn open(config: &OperatorConfig) -> Result<Self> {
        let file_store = JsonFileStore::open(&config.state_file)
            .await
            .with_context(|| {
                format!("Failed to open state file {}", config.state_file.display())
            })?;
        let store: Arc<dyn KeyValueStore> = Arc::new(TracingKeyValueStore::new(file_store));

        let service = SystemServiceManager::from_config(&config.service)
            .context("Invalid service configuration")?;

        let reconciler = ReconcilerBuilder::new()
            .with_store(store.clone())
            .with_service(Arc::new(service))
            .with_options(Arc::new(SharedOptions::new(config.options.clone())))
            .build()?;

        Ok(Self {
            dispatcher: Dispatcher::new(reconciler, store.clone()),
            status: StoreStatusReporter::new(store),
        })
    }

    /// Get the dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher<Reconciler> {
        &self.dispatcher
    }

    /// Deliver one event.
    ///
    /// # Errors
    ///
    /// Returns an error if any delivered event fails.
    pub async fn deliver(&self, event: UnitEvent) -> Result<()> {
        let event_type = event.event_type();
        let report = self
            .dispatcher
            .dispatch(event)
            .await
            .with_context(|| format!("Failed to handle '{event_type}'"))?;

        info!(
            event_type,
            handled = report.handled.len(),
            deferred = report.deferred.len(),
            "Dispatch complete"
        );
        Ok(())
    }

    /// Render a human-readable status report.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file cannot be read.
    pub async fn status_report(&self) -> Result<String> {
        let status = self
            .status
            .last_status()
            .await?
            .map_or_else(|| "unknown".to_string(), |s| s.to_string());
        let state = self.dispatcher.handler().observed_state().await?;
        let pending = self.dispatcher.pending().await?;
        let pending_types: Vec<&str> = pending.iter().map(UnitEvent::event_type).collect();

        Ok(format!(
            "status:  {status}\nstate:   {state}\npending: {} {pending_types:?}",
            pending.len()
        ))
    }
}

/// Map an event command to the event it delivers.
pub fn event_for(command: Commands) -> Option<UnitEvent> {
    match command {
        Commands::Install => Some(UnitEvent::install()),
        Commands::Start => Some(UnitEvent::start()),
        Commands::ConfigChanged => Some(UnitEvent::config_changed()),
        Commands::DatabaseAvailable { payload } => Some(UnitEvent::database_available(payload)),
        Commands::SlurmdbdJoined => Some(UnitEvent::slurmdbd_joined()),
        Commands::Status => None,
    }
}

/// Execute a CLI command.
///
/// # Errors
///
/// Returns an error if the unit cannot be opened or the command fails.
pub async fn execute_command(config: &OperatorConfig, command: Commands) -> Result<()> {
    let unit = Unit::open(config).await?;

    match event_for(command) {
        Some(event) => unit.deliver(event).await,
        None => {
            println!("{}", unit.status_report().await?);
            Ok(())
        }
    }
}
