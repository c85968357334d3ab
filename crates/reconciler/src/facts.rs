//! Database facts and their durable store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use slurmdbd_events::{get_typed, set_typed, KeyValueStore};

use crate::error::Result;

/// Relation / rendered-config key for the database user.
pub const USER_KEY: &str = "user";
/// Relation / rendered-config key for the database password.
pub const PASSWORD_KEY: &str = "password";
/// Relation / rendered-config key for the database host.
pub const HOST_KEY: &str = "host";
/// Relation / rendered-config key for the database port.
pub const PORT_KEY: &str = "port";
/// Relation / rendered-config key for the database name.
pub const DATABASE_KEY: &str = "database";

const DB_INFO_KEY: &str = "db_info";
const DB_INFO_ACQUIRED_KEY: &str = "db_info_acquired";

/// Connection credentials received from the database relation.
///
/// Always complete: a value of this type can only be built with all five
/// fields.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseFacts {
    pub username: String,
    pub password: String,
    pub hostname: String,
    pub port: u16,
    pub database_name: String,
}

impl DatabaseFacts {
    /// Entries contributed to the rendered configuration.
    pub fn config_entries(&self) -> [(&'static str, Value); 5] {
        [
            (USER_KEY, json!(self.username)),
            (PASSWORD_KEY, json!(self.password)),
            (HOST_KEY, json!(self.hostname)),
            (PORT_KEY, json!(self.port)),
            (DATABASE_KEY, json!(self.database_name)),
        ]
    }
}

impl std::fmt::Debug for DatabaseFacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseFacts")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("database_name", &self.database_name)
            .finish()
    }
}

/// Durable store for database facts and the acquisition flag.
///
/// Facts are written as one value, so a partial credential set is never
/// persisted. The acquisition flag only ever moves from false to true.
#[derive(Clone)]
pub struct FactStore {
    store: Arc<dyn KeyValueStore>,
}

impl FactStore {
    /// Create a fact store over a key/value store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Get the latest database facts, if any were stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or holds an unreadable value.
    pub async fn get_database_facts(&self) -> Result<Option<DatabaseFacts>> {
        Ok(get_typed(self.store.as_ref(), DB_INFO_KEY).await?)
    }

    /// Replace the stored database facts.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn set_database_facts(&self, facts: &DatabaseFacts) -> Result<()> {
        Ok(set_typed(self.store.as_ref(), DB_INFO_KEY, facts).await?)
    }

    /// Check whether facts have been received and applied at least once.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or holds an unreadable value.
    pub async fn is_acquired(&self) -> Result<bool> {
        Ok(get_typed(self.store.as_ref(), DB_INFO_ACQUIRED_KEY)
            .await?
            .unwrap_or(false))
    }

    /// Record that facts have been applied. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn mark_acquired(&self) -> Result<()> {
        Ok(set_typed(self.store.as_ref(), DB_INFO_ACQUIRED_KEY, &true).await?)
    }
}
