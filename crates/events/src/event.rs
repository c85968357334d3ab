//! Unit event types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::EventId;

/// Raw key/value data published by a peer on a relation.
pub type RelationData = BTreeMap<String, serde_json::Value>;

/// Lifecycle and relation events delivered to a unit.
///
/// The set is closed: every handler matches on it exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnitEvent {
    /// The unit is being installed.
    Install {
        event_id: EventId,
        timestamp: DateTime<Utc>,
    },
    /// The unit was started.
    Start {
        event_id: EventId,
        timestamp: DateTime<Utc>,
    },
    /// Operator configuration options changed.
    ConfigChanged {
        event_id: EventId,
        timestamp: DateTime<Utc>,
    },
    /// The database relation published connection credentials.
    DatabaseAvailable {
        event_id: EventId,
        data: RelationData,
        timestamp: DateTime<Utc>,
    },
    /// A consumer joined the slurmdbd advertisement relation.
    SlurmdbdJoined {
        event_id: EventId,
        timestamp: DateTime<Utc>,
    },
}

impl UnitEvent {
    /// Create a new Install event.
    pub fn install() -> Self {
        Self::Install {
            event_id: EventId::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new Start event.
    pub fn start() -> Self {
        Self::Start {
            event_id: EventId::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new ConfigChanged event.
    pub fn config_changed() -> Self {
        Self::ConfigChanged {
            event_id: EventId::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new DatabaseAvailable event carrying the raw relation data.
    pub fn database_available(data: RelationData) -> Self {
        Self::DatabaseAvailable {
            event_id: EventId::new(),
            data,
            timestamp: Utc::now(),
        }
    }

    /// Create a new SlurmdbdJoined event.
    pub fn slurmdbd_joined() -> Self {
        Self::SlurmdbdJoined {
            event_id: EventId::new(),
            timestamp: Utc::now(),
        }
    }

    /// Get the event ID.
    pub fn event_id(&self) -> EventId {
        match self {
            Self::Install { event_id, .. }
            | Self::Start { event_id, .. }
            | Self::ConfigChanged { event_id, .. }
            | Self::DatabaseAvailable { event_id, .. }
            | Self::SlurmdbdJoined { event_id, .. } => *event_id,
        }
    }

    /// Get the timestamp the event was first emitted.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Install { timestamp, .. }
            | Self::Start { timestamp, .. }
            | Self::ConfigChanged { timestamp, .. }
            | Self::DatabaseAvailable { timestamp, .. }
            | Self::SlurmdbdJoined { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Install { .. } => "install",
            Self::Start { .. } => "start",
            Self::ConfigChanged { .. } => "config_changed",
            Self::DatabaseAvailable { .. } => "database_available",
            Self::SlurmdbdJoined { .. } => "slurmdbd_joined",
        }
    }

    /// Check whether delivering `self` makes an older, still pending `other`
    /// redundant.
    ///
    /// A newer `DatabaseAvailable` carries the latest credentials, and
    /// `ConfigChanged` has no payload, so one pending copy of either is
    /// enough.
    pub fn supersedes(&self, other: &UnitEvent) -> bool {
        matches!(
            (self, other),
            (Self::DatabaseAvailable { .. }, Self::DatabaseAvailable { .. })
                | (Self::ConfigChanged { .. }, Self::ConfigChanged { .. })
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_install_event() {
        let event = UnitEvent::install();
        assert_eq!(event.event_type(), "install");
    }

    #[test]
    fn test_database_available_keeps_payload() {
        let mut data = RelationData::new();
        data.insert("database".to_string(), serde_json::json!("slurm_acct_db"));
        let event = UnitEvent::database_available(data.clone());

        assert_eq!(event.event_type(), "database_available");
        assert!(matches!(event, UnitEvent::DatabaseAvailable { data: d, .. } if d == data));
    }

    #[test]
    fn test_supersedes_same_kind_only() {
        let db = UnitEvent::database_available(RelationData::new());
        let older_db = UnitEvent::database_available(RelationData::new());
        let config = UnitEvent::config_changed();

        assert!(db.supersedes(&older_db));
        assert!(config.supersedes(&UnitEvent::config_changed()));
        assert!(!db.supersedes(&config));
        assert!(!config.supersedes(&older_db));
        assert!(!UnitEvent::install().supersedes(&UnitEvent::install()));
        assert!(!UnitEvent::start().supersedes(&UnitEvent::start()));
    }

    #[test]
    fn test_serialized_form_is_tagged() {
        let event = UnitEvent::config_changed();
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value.get("type"), Some(&serde_json::json!("config_changed")));

        let back: UnitEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back.event_id(), event.event_id());
    }
}
