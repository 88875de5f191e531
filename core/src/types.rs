//! Engine data types shared by the client and the proxy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Identifies one run of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorkflowExecution {
    pub workflow_id: String,
    pub run_id: String,
}

impl WorkflowExecution {
    pub fn new(workflow_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            run_id: run_id.into(),
        }
    }
}

impl fmt::Display for WorkflowExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.workflow_id, self.run_id)
    }
}

/// Whether a new execution may reuse a workflow id that was used before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WorkflowIdReusePolicy {
    /// Sentinel resolved by the options chain, never sent to the engine
    #[default]
    UseDefault,
    AllowDuplicateFailedOnly,
    AllowDuplicate,
    RejectDuplicate,
}

impl WorkflowIdReusePolicy {
    /// Policy applied when nothing in the options chain sets one.
    pub const FALLBACK: WorkflowIdReusePolicy = WorkflowIdReusePolicy::AllowDuplicateFailedOnly;

    pub fn is_default(&self) -> bool {
        *self == WorkflowIdReusePolicy::UseDefault
    }
}

/// Error category reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Cancelled,
    Custom,
    Generic,
    Panic,
    Terminated,
    Timeout,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorType::Cancelled => "cancelled",
            ErrorType::Custom => "custom",
            ErrorType::Generic => "generic",
            ErrorType::Panic => "panic",
            ErrorType::Terminated => "terminated",
            ErrorType::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

/// Error carried in the `Error` property of a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProxyError {
    #[serde(rename = "Type")]
    pub error_type: ErrorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub message: String,
}

impl ProxyError {
    /// Reason reported when the target entity is gone or already finalized.
    pub const ENTITY_NOT_EXISTS: &'static str = "EntityNotExistsError";

    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            reason: None,
            message: message.into(),
        }
    }

    pub fn custom(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: ErrorType::Custom,
            reason: Some(reason.into()),
            message: message.into(),
        }
    }

    pub fn entity_not_exists(message: impl Into<String>) -> Self {
        Self::custom(Self::ENTITY_NOT_EXISTS, message)
    }

    pub fn is_entity_not_exists(&self) -> bool {
        self.reason.as_deref() == Some(Self::ENTITY_NOT_EXISTS)
    }
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{} error ({}): {}", self.error_type, reason, self.message),
            None => write!(f, "{} error: {}", self.error_type, self.message),
        }
    }
}

impl std::error::Error for ProxyError {}

/// Information about one activity invocation, delivered with the invoke request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActivityTask {
    #[serde(with = "base64_bytes")]
    pub task_token: Vec<u8>,
    pub workflow_execution: WorkflowExecution,
    pub workflow_type: String,
    pub workflow_domain: String,
    pub activity_id: String,
    pub activity_type: String,
    pub task_list: String,
    pub attempt: i32,
    pub scheduled_at: DateTime<Utc>,
    #[serde(with = "crate::time::duration_nanos")]
    pub heartbeat_timeout: Duration,
    #[serde(with = "crate::time::duration_nanos")]
    pub schedule_to_close_timeout: Duration,
    #[serde(with = "crate::time::duration_nanos")]
    pub start_to_close_timeout: Duration,
    /// Details recorded by the last heartbeat of a previous attempt
    #[serde(default, with = "base64_bytes::option")]
    pub heartbeat_details: Option<Vec<u8>>,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        BASE64.decode(raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            bytes: &Option<Vec<u8>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match bytes {
                Some(bytes) => serializer.serialize_some(&BASE64.encode(bytes)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Vec<u8>>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| BASE64.decode(raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
