//! Relation adapters.
//!
//! - Inbound: turns raw database-relation data into [`DatabaseFacts`].
//! - Outbound: advertises slurmdbd's own address to consumers.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use slurmdbd_events::{KeyValueStore, RelationData};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::facts::{DatabaseFacts, DATABASE_KEY, HOST_KEY, PASSWORD_KEY, PORT_KEY, USER_KEY};
use crate::types::NetworkIdentity;

/// Name of the relation slurmdbd advertises itself on.
pub const SLURMDBD_RELATION: &str = "slurmdbd";
/// Advertised hostname key.
pub const SLURMDBD_HOSTNAME_KEY: &str = "slurmdbd_hostname";
/// Advertised port key.
pub const SLURMDBD_PORT_KEY: &str = "slurmdbd_port";

/// Validate database relation data and build facts from it.
///
/// All five fields must be present. Empty strings count as absent, matching
/// how relation data looks before the peer has finished writing it. `port`
/// may be a JSON integer or a decimal string.
///
/// # Errors
///
/// Returns [`Error::MalformedRelationData`] naming the first offending field.
pub fn database_facts_from_relation(data: &RelationData) -> Result<DatabaseFacts> {
    Ok(DatabaseFacts {
        username: required_string(data, USER_KEY)?,
        password: required_string(data, PASSWORD_KEY)?,
        hostname: required_string(data, HOST_KEY)?,
        port: required_port(data, PORT_KEY)?,
        database_name: required_string(data, DATABASE_KEY)?,
    })
}

fn required<'a>(data: &'a RelationData, key: &str) -> Result<&'a Value> {
    match data.get(key) {
        None | Some(Value::Null) => Err(Error::malformed_relation_data(format!(
            "missing field '{key}'"
        ))),
        Some(Value::String(s)) if s.is_empty() => Err(Error::malformed_relation_data(
            format!("missing field '{key}'"),
        )),
        Some(value) => Ok(value),
    }
}

fn required_string(data: &RelationData, key: &str) -> Result<String> {
    match required(data, key)? {
        Value::String(s) => Ok(s.clone()),
        other => Err(Error::malformed_relation_data(format!(
            "field '{key}' must be a string, got {other}"
        ))),
    }
}

fn required_port(data: &RelationData, key: &str) -> Result<u16> {
    let value = required(data, key)?;
    let port = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u16>().ok(),
        _ => None,
    };
    port.ok_or_else(|| {
        Error::malformed_relation_data(format!("field '{key}' is not a valid port: {value}"))
    })
}

/// Publishes application data on a relation.
#[async_trait]
pub trait RelationPublisher: Send + Sync {
    /// Replace the data this unit publishes on `relation`.
    async fn publish(&self, relation: &str, data: RelationData) -> Result<()>;
}

/// Publisher that records relation data in the unit's key/value store.
///
/// Data lands under `relation.<name>.app_data`, where the host runtime picks
/// it up.
pub struct StoreRelationPublisher {
    store: Arc<dyn KeyValueStore>,
}

impl StoreRelationPublisher {
    /// Create a publisher over a key/value store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Data last published on `relation`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn published(&self, relation: &str) -> Result<Option<RelationData>> {
        Ok(slurmdbd_events::get_typed(self.store.as_ref(), &app_data_key(relation)).await?)
    }
}

fn app_data_key(relation: &str) -> String {
    format!("relation.{relation}.app_data")
}

#[async_trait]
impl RelationPublisher for StoreRelationPublisher {
    async fn publish(&self, relation: &str, data: RelationData) -> Result<()> {
        slurmdbd_events::set_typed(self.store.as_ref(), &app_data_key(relation), &data)
            .await
            .map_err(|e| Error::publish_failed(relation, e.to_string()))
    }
}

/// Outbound adapter advertising slurmdbd's address to downstream consumers.
///
/// Stateless; a failed publish is logged and never blocks reconciliation.
pub struct SlurmdbdProvides {
    publisher: Arc<dyn RelationPublisher>,
}

impl SlurmdbdProvides {
    /// Create the adapter.
    pub fn new(publisher: Arc<dyn RelationPublisher>) -> Self {
        Self { publisher }
    }

    /// Relation payload advertising `identity`.
    pub fn payload(identity: &NetworkIdentity) -> RelationData {
        RelationData::from([
            (SLURMDBD_HOSTNAME_KEY.to_string(), json!(identity.hostname)),
            (SLURMDBD_PORT_KEY.to_string(), json!(identity.port)),
        ])
    }

    /// Publish `identity`. Returns whether the publish succeeded.
    pub async fn advertise(&self, identity: &NetworkIdentity) -> bool {
        match self
            .publisher
            .publish(SLURMDBD_RELATION, Self::payload(identity))
            .await
        {
            Ok(()) => {
                info!(
                    hostname = %identity.hostname,
                    port = identity.port,
                    "Advertised slurmdbd address"
                );
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to advertise slurmdbd address");
                false
            }
        }
    }
}
