//! Unit lifecycle events and the plumbing that delivers them.
//!
//! This crate provides the event side of the slurmdbd reconciler:
//!
//! - **Event types**: the closed set of lifecycle and relation events a unit receives
//! - **Key/value store**: durable state that survives between invocations
//! - **Dispatcher**: sequential delivery with deferral and redelivery
//!
//! # Example
//!
//! ```ignore
//! use slurmdbd_events::{Dispatcher, InMemoryKeyValueStore, UnitEvent};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(InMemoryKeyValueStore::new());
//!     let dispatcher = Dispatcher::new(my_handler, store);
//!
//!     // Deferred events are persisted and redelivered after the next event.
//!     let report = dispatcher.dispatch(UnitEvent::install()).await.unwrap();
//!     println!("handled {} events", report.handled.len());
//! }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod dispatcher;
pub mod durable_store;
pub mod error;
pub mod event;
pub mod store;
pub mod types;

// Re-export main types
pub use dispatcher::{DispatchReport, Dispatcher, EventHandler, EventOutcome, DEFERRED_EVENTS_KEY};
pub use durable_store::JsonFileStore;
pub use error::{Error, Result};
pub use event::{RelationData, UnitEvent};
pub use store::{get_typed, set_typed, InMemoryKeyValueStore, KeyValueStore, TracingKeyValueStore};
pub use types::EventId;
