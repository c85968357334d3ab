//! Event-driven reconciliation for a slurmdbd unit.
//!
//! The reconciler keeps slurmdbd's rendered configuration and running state
//! consistent with what is currently known:
//!
//! - **Network identity**: hostname and port of the managed daemon
//! - **Options**: operator-supplied settings
//! - **Database facts**: credentials received over the database relation
//!
//! # Key Concepts
//!
//! ## Deferral
//!
//! A `config_changed` event that arrives before the daemon is installed or
//! before database credentials are known is not an error. The handler sets a
//! blocked status and returns [`EventOutcome::Deferred`]; the dispatcher
//! redelivers it later.
//!
//! ## Render and restart
//!
//! The only side-effecting action. Configuration is synthesized from scratch
//! on every pass (never stored) and handed to the [`ServiceManager`], which
//! writes it atomically and restarts the daemon. Running it twice with the
//! same inputs yields the same file.
//!
//! # Example
//!
//! ```ignore
//! use slurmdbd_events::{Dispatcher, InMemoryKeyValueStore, UnitEvent};
//! use slurmdbd_reconciler::{ReconcilerBuilder, RecordingServiceManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = InMemoryKeyValueStore::new_arc();
//!     let reconciler = ReconcilerBuilder::new()
//!         .with_store(store.clone())
//!         .with_service(Arc::new(RecordingServiceManager::new("slurmdbd-0", 6819)))
//!         .build()
//!         .unwrap();
//!
//!     let dispatcher = Dispatcher::new(reconciler, store);
//!     dispatcher.dispatch(UnitEvent::install()).await.unwrap();
//! }
//! ```
//!
//! [`EventOutcome::Deferred`]: slurmdbd_events::EventOutcome::Deferred

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod error;
pub mod facts;
pub mod options;
pub mod reconciler;
pub mod relation;
pub mod service;
pub mod status;
pub mod synth;
pub mod types;

// Re-export main types
pub use error::{Error, Result};
pub use facts::{DatabaseFacts, FactStore};
pub use options::{OptionsSource, SharedOptions};
pub use reconciler::{Reconciler, ReconcilerBuilder};
pub use relation::{
    database_facts_from_relation, RelationPublisher, SlurmdbdProvides, StoreRelationPublisher,
};
pub use service::{RecordingServiceManager, ServiceManager, SystemServiceManager};
pub use status::{Status, StatusKind, StatusReporter, StoreStatusReporter};
pub use synth::synthesize;
pub use types::{NetworkIdentity, ObservedState, RenderedConfig};
