//! Error types for the events crate.

use thiserror::Error;

/// Result type alias for event operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Event error types.
#[derive(Debug, Error)]
pub enum Error {
    /// Key/value store operation failed.
    #[error("store operation '{operation}' failed: {reason}")]
    StoreFailed { operation: String, reason: String },

    /// Serialization error.
    #[error("serialization error for key '{key}': {reason}")]
    Serialization { key: String, reason: String },

    /// The event handler returned an error.
    #[error("handler failed on '{event_type}' event: {source}")]
    HandlerFailed {
        event_type: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Create a store failed error.
    pub fn store_failed(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StoreFailed {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Serialization {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a handler failed error.
    pub fn handler_failed<E>(event_type: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::HandlerFailed {
            event_type: event_type.into(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::store_failed("persist", "disk full");
        assert!(err.to_string().contains("persist"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_handler_failed_keeps_source() {
        let io = std::io::Error::other("restart refused");
        let err = Error::handler_failed("config_changed", io);
        assert!(err.to_string().contains("config_changed"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
