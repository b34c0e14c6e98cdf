//! Shared Error Types
//!
//! The wire types in `shared` can only fail while being encoded: a payload
//! that does not serialize into a `RealtimeEvent` envelope.
use thiserror::Error;

/// Failure to build or encode a realtime envelope
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// Payload could not be turned into JSON
    #[error("Serialization error: {message}")]
    SerializationError {
        message: String,
    },
}

impl SharedError {
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for SharedError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}
