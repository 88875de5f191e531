//! Error types for the Cadence SDK

// Re-export core error types
pub use cadence_core::{CoreError, ErrorType, ProxyError};

use crate::config::ConfigError;

/// Main error type for the Cadence SDK
#[derive(Debug, thiserror::Error)]
pub enum CadenceError {
    /// A workflow interface or implementation has an invalid shape
    #[error("Workflow type error: {0}")]
    WorkflowType(String),

    /// An activity interface or implementation has an invalid shape
    #[error("Activity type error: {0}")]
    ActivityType(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The API was used incorrectly
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// An external completion targeted an activity that is already finalized
    #[error("Activity already completed: {0}")]
    AlreadyCompleted(String),

    /// The connection to the proxy is closed
    #[error("Connection to the proxy is closed")]
    ConnectionClosed,

    /// Malformed frame, unexpected reply or other protocol failure
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The workflow or activity failed on the engine side
    #[error("{0}")]
    Remote(ProxyError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),
}

/// Result type alias for Cadence SDK operations
pub type Result<T> = std::result::Result<T, CadenceError>;

impl CadenceError {
    /// Application-defined failure raised from a workflow or activity body.
    pub fn custom(reason: impl Into<String>, message: impl Into<String>) -> Self {
        CadenceError::Remote(ProxyError::custom(reason, message))
    }

    /// Cancellation raised from a workflow or activity body.
    pub fn cancelled(message: impl Into<String>) -> Self {
        CadenceError::Remote(ProxyError::new(ErrorType::Cancelled, message))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            CadenceError::WorkflowType(_) | CadenceError::ActivityType(_)
        )
    }

    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            CadenceError::InvalidOperation(_) | CadenceError::AlreadyCompleted(_)
        )
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, CadenceError::Remote(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CadenceError::Remote(e) if e.error_type == ErrorType::Cancelled)
    }

    /// Error category and reason when this error crosses the wire.
    pub fn to_proxy_error(&self) -> ProxyError {
        match self {
            CadenceError::Remote(e) => e.clone(),
            CadenceError::Timeout(msg) => ProxyError::new(ErrorType::Timeout, msg.clone()),
            other => ProxyError::custom(other.kind_name(), other.to_string()),
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            CadenceError::WorkflowType(_) => "WorkflowTypeError",
            CadenceError::ActivityType(_) => "ActivityTypeError",
            CadenceError::InvalidConfiguration(_) => "InvalidConfiguration",
            CadenceError::InvalidOperation(_) => "InvalidOperation",
            CadenceError::AlreadyCompleted(_) => "AlreadyCompleted",
            CadenceError::ConnectionClosed => "ConnectionClosed",
            CadenceError::Protocol(_) => "ProtocolError",
            CadenceError::Remote(_) => "RemoteError",
            CadenceError::Serialization(_) => "SerializationError",
            CadenceError::Io(_) => "IoError",
            CadenceError::Timeout(_) => "Timeout",
        }
    }
}

impl From<CoreError> for CadenceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Serialization(e) => CadenceError::Serialization(e),
            CoreError::Io(e) => CadenceError::Io(e),
            CoreError::ConnectionClosed => CadenceError::ConnectionClosed,
            CoreError::InvalidConfiguration(msg) => CadenceError::InvalidConfiguration(msg),
            CoreError::Timeout(msg) => CadenceError::Timeout(msg),
            CoreError::Cancelled(id) => {
                CadenceError::cancelled(format!("request {id} was cancelled"))
            }
            other => CadenceError::Protocol(other.to_string()),
        }
    }
}

impl From<ConfigError> for CadenceError {
    fn from(err: ConfigError) -> Self {
        CadenceError::InvalidConfiguration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cadence_error_display() {
        let err = CadenceError::WorkflowType("IFoo is not an interface".to_string());
        assert_eq!(err.to_string(), "Workflow type error: IFoo is not an interface");

        let err = CadenceError::custom("ArgumentException", "forced-failure");
        assert_eq!(
            err.to_string(),
            "custom error (ArgumentException): forced-failure"
        );
    }

    #[test]
    fn test_error_categories() {
        assert!(CadenceError::ActivityType(String::new()).is_validation_error());
        assert!(CadenceError::InvalidOperation(String::new()).is_usage_error());
        assert!(CadenceError::AlreadyCompleted(String::new()).is_usage_error());
        assert!(CadenceError::cancelled("stop").is_remote());
        assert!(CadenceError::cancelled("stop").is_cancelled());
        assert!(!CadenceError::ConnectionClosed.is_remote());
    }

    #[test]
    fn test_error_from_core() {
        assert!(matches!(
            CadenceError::from(CoreError::ConnectionClosed),
            CadenceError::ConnectionClosed
        ));
        assert!(matches!(
            CadenceError::from(CoreError::AlreadyResolved(3)),
            CadenceError::Protocol(_)
        ));
        assert!(CadenceError::from(CoreError::Cancelled(3)).is_cancelled());
    }

    #[test]
    fn test_to_proxy_error_keeps_remote_errors() {
        let original = ProxyError::new(ErrorType::Terminated, "bye");
        assert_eq!(
            CadenceError::Remote(original.clone()).to_proxy_error(),
            original
        );

        let converted = CadenceError::InvalidOperation("twice".to_string()).to_proxy_error();
        assert_eq!(converted.error_type, ErrorType::Custom);
        assert_eq!(converted.reason.as_deref(), Some("InvalidOperation"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let result: std::result::Result<serde_json::Value, serde_json::Error> =
            serde_json::from_str("invalid json");
        let err: CadenceError = result.unwrap_err().into();
        assert!(matches!(err, CadenceError::Serialization(_)));
    }
}
