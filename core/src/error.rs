//! Core error types for the Cadence sidecar client
//!
//! These errors describe failures of the transport and protocol layer.
//! The SDK wraps them into its own error type.

use crate::protocol::MessageType;

/// Core error type for protocol and connection operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame could not be decoded
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// A frame carried a message type code outside the known table
    #[error("Unknown message type code: {0}")]
    UnknownMessageType(i32),

    /// A property was missing or could not be parsed
    #[error("Invalid property '{name}': {reason}")]
    InvalidProperty { name: String, reason: String },

    /// The reply type does not match the type the request expects
    #[error("Reply type mismatch for request {request_id}: expected {expected:?}, got {actual:?}")]
    ReplyTypeMismatch {
        request_id: u64,
        expected: MessageType,
        actual: MessageType,
    },

    /// A correlation id was resolved more than once
    #[error("Request {0} has already been resolved")]
    AlreadyResolved(u64),

    /// A reply arrived for a correlation id that was never issued
    #[error("No request is waiting for id {0}")]
    UnknownRequestId(u64),

    /// The request was cancelled locally before a reply arrived
    #[error("Request {0} was cancelled")]
    Cancelled(u64),

    /// The sidecar channel is closed
    #[error("Connection to the proxy is closed")]
    ConnectionClosed,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),
}

/// Result type alias for core operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub(crate) fn property(name: &str, reason: impl Into<String>) -> Self {
        CoreError::InvalidProperty {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns true for errors caused by losing the sidecar channel.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, CoreError::ConnectionClosed | CoreError::Io(_))
    }
}
