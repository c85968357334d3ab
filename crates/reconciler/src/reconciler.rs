//! Reconciler implementation.

use std::sync::Arc;

use async_trait::async_trait;
use slurmdbd_events::{EventHandler, EventOutcome, KeyValueStore, RelationData, UnitEvent};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::facts::FactStore;
use crate::options::{OptionsSource, SharedOptions};
use crate::relation::{
    database_facts_from_relation, RelationPublisher, SlurmdbdProvides, StoreRelationPublisher,
};
use crate::service::ServiceManager;
use crate::status::{Status, StatusReporter, StoreStatusReporter};
use crate::synth::synthesize;
use crate::types::ObservedState;

/// Blocked reason while the slurmdbd package is not installed.
pub const WAITING_FOR_INSTALL: &str = "waiting for slurmdbd install";
/// Blocked reason while database credentials are unknown.
pub const NEEDS_DATABASE_RELATION: &str = "needs database relation";

/// Drives slurmdbd towards the configuration implied by identity, options and
/// database facts.
///
/// Holds no state of its own; everything that must outlive one event lives in
/// the injected key/value store.
pub struct Reconciler {
    facts: FactStore,
    service: Arc<dyn ServiceManager>,
    options: Arc<dyn OptionsSource>,
    status: Arc<dyn StatusReporter>,
    provides: SlurmdbdProvides,
}

impl Reconciler {
    /// Get the fact store.
    pub fn facts(&self) -> &FactStore {
        &self.facts
    }

    /// Get the service manager.
    pub fn service(&self) -> &Arc<dyn ServiceManager> {
        &self.service
    }

    /// Current observed state, derived from install state and the acquisition
    /// flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the fact store cannot be read.
    pub async fn observed_state(&self) -> Result<ObservedState> {
        let installed = self.service.slurm_installed().await;
        let acquired = self.facts.is_acquired().await?;
        Ok(ObservedState::from_parts(installed, acquired))
    }

    async fn on_install(&self) -> Result<EventOutcome> {
        if let Err(e) = self.service.prepare_system_for_slurm().await {
            self.status.set_status(Status::blocked(e.to_string())).await?;
            return Err(e);
        }
        self.status.set_status(Status::installed()).await?;
        let state = self.observed_state().await?;
        info!(state = %state, "Install complete");
        Ok(EventOutcome::Handled)
    }

    async fn on_config_changed(&self) -> Result<EventOutcome> {
        if !self.service.slurm_installed().await {
            self.status.set_status(Status::blocked(WAITING_FOR_INSTALL)).await?;
            return Ok(EventOutcome::Deferred);
        }
        if !self.facts.is_acquired().await? {
            self.status
                .set_status(Status::blocked(NEEDS_DATABASE_RELATION))
                .await?;
            return Ok(EventOutcome::Deferred);
        }

        self.write_config_and_restart().await?;
        Ok(EventOutcome::Handled)
    }

    async fn on_database_available(&self, data: &RelationData) -> Result<EventOutcome> {
        let facts = match database_facts_from_relation(data) {
            Ok(facts) => facts,
            Err(e) => {
                warn!(error = %e, "Ignoring database relation data");
                return Ok(EventOutcome::Handled);
            }
        };

        info!(
            host = %facts.hostname,
            port = facts.port,
            database = %facts.database_name,
            "Database facts received"
        );
        self.facts.set_database_facts(&facts).await?;
        self.write_config_and_restart().await?;
        self.facts.mark_acquired().await?;
        Ok(EventOutcome::Handled)
    }

    async fn on_slurmdbd_joined(&self) -> EventOutcome {
        self.provides.advertise(&self.service.identity()).await;
        EventOutcome::Handled
    }

    /// Synthesize the configuration from current inputs, render it and
    /// restart the daemon. Sets status Active on success and Blocked with the
    /// error on a failed restart.
    async fn write_config_and_restart(&self) -> Result<()> {
        let options = self.options.options().await;
        let facts = self.facts.get_database_facts().await?;
        let config = synthesize(&self.service.identity(), &options, facts.as_ref())?;

        if let Err(e) = self.service.render_config_and_restart(&config).await {
            self.status.set_status(Status::blocked(e.to_string())).await?;
            return Err(e);
        }

        self.status.set_status(Status::active()).await?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for Reconciler {
    type Error = Error;

    async fn handle(&self, event: &UnitEvent) -> Result<EventOutcome> {
        debug!(event_type = event.event_type(), "Reconciling");
        match event {
            UnitEvent::Install { .. } => self.on_install().await,
            UnitEvent::Start { .. } => Ok(EventOutcome::Handled),
            UnitEvent::ConfigChanged { .. } => self.on_config_changed().await,
            UnitEvent::DatabaseAvailable { data, .. } => self.on_database_available(data).await,
            UnitEvent::SlurmdbdJoined { .. } => Ok(self.on_slurmdbd_joined().await),
        }
    }
}

/// Builder for Reconciler.
///
/// The store and service manager are required. Options default to an empty
/// set; status and relation publishing default to the store.
pub struct ReconcilerBuilder {
    store: Option<Arc<dyn KeyValueStore>>,
    service: Option<Arc<dyn ServiceManager>>,
    options: Option<Arc<dyn OptionsSource>>,
    status: Option<Arc<dyn StatusReporter>>,
    publisher: Option<Arc<dyn RelationPublisher>>,
}

impl ReconcilerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            store: None,
            service: None,
            options: None,
            status: None,
            publisher: None,
        }
    }

    /// Set the durable key/value store.
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the service manager.
    pub fn with_service(mut self, service: Arc<dyn ServiceManager>) -> Self {
        self.service = Some(service);
        self
    }

    /// Set the options source.
    pub fn with_options(mut self, options: Arc<dyn OptionsSource>) -> Self {
        self.options = Some(options);
        self
    }

    /// Set a custom status reporter.
    pub fn with_status(mut self, status: Arc<dyn StatusReporter>) -> Self {
        self.status = Some(status);
        self
    }

    /// Set a custom relation publisher.
    pub fn with_publisher(mut self, publisher: Arc<dyn RelationPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Build the reconciler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the store or service manager is
    /// missing.
    pub fn build(self) -> Result<Reconciler> {
        let store = self
            .store
            .ok_or_else(|| Error::invalid_config("key/value store is required"))?;
        let service = self
            .service
            .ok_or_else(|| Error::invalid_config("service manager is required"))?;

        let options = self
            .options
            .unwrap_or_else(|| Arc::new(SharedOptions::default()));
        let status = self
            .status
            .unwrap_or_else(|| Arc::new(StoreStatusReporter::new(store.clone())));
        let publisher = self
            .publisher
            .unwrap_or_else(|| Arc::new(StoreRelationPublisher::new(store.clone())));

        Ok(Reconciler {
            facts: FactStore::new(store),
            service,
            options,
            status,
            provides: SlurmdbdProvides::new(publisher),
        })
    }
}

impl Default for ReconcilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
