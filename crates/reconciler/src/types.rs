//! Core types for the reconciler.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Hostname and port the managed daemon is reachable on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkIdentity {
    pub hostname: String,
    pub port: u16,
}

impl NetworkIdentity {
    /// Create a new network identity.
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
        }
    }
}

/// Flat configuration handed to the service manager.
///
/// Always derived, never stored. Keys iterate in sorted order so rendering
/// is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenderedConfig(BTreeMap<String, Value>);

impl RenderedConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any earlier value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Get a value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Get the number of keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the configuration is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the underlying map.
    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

/// Reconciliation state as observed from install state and stored facts.
///
/// Never persisted; recomputed whenever asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservedState {
    /// The slurmdbd package is not installed.
    Uninstalled,
    /// Installed, database credentials not acquired yet.
    InstalledWaitingForDb,
    /// Installed and configured against the database.
    Active,
}

impl ObservedState {
    /// Derive the state from its two inputs.
    pub fn from_parts(installed: bool, acquired: bool) -> Self {
        match (installed, acquired) {
            (false, _) => Self::Uninstalled,
            (true, false) => Self::InstalledWaitingForDb,
            (true, true) => Self::Active,
        }
    }
}

impl std::fmt::Display for ObservedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninstalled => "uninstalled",
            Self::InstalledWaitingForDb => "installed, waiting for database",
            Self::Active => "active",
        };
        f.write_str(name)
    }
}
