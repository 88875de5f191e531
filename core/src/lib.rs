//! # Cadence Core
//!
//! Language-agnostic core of the Cadence sidecar client.
//!
//! The client never speaks the engine's native protocol. It talks to a
//! co-located proxy process over a length-prefixed message stream, and this
//! crate provides everything needed to hold up that conversation.
//!
//! ## What's in Core vs SDK
//!
//! **Core** contains the transport-level building blocks:
//! - Message type table and request/reply pairing
//! - Ordered property map and frame codec
//! - Correlation of requests and replies
//! - The symmetric proxy connection with its receive loop
//! - Engine data types (executions, ID-reuse policy, activity tasks, errors)
//! - Engine duration range
//!
//! **SDK** contains the programming model:
//! - Interface shapes, validation and type descriptors
//! - Options normalization
//! - Workflow and activity stubs
//! - Worker-side dispatch and the activity execution context
//! - Testing utilities
//!
//! ## Modules
//!
//! - [`protocol`] - Message types, properties and frame codec
//! - [`client`] - Correlation map and proxy connection
//! - [`types`] - Engine data types
//! - [`time`] - Duration range and timestamp helpers
//! - [`error`] - Core error types

pub mod client;
pub mod error;
pub mod protocol;
pub mod time;
pub mod types;

// Re-export error types
pub use error::{CoreError, CoreResult};

// Re-export protocol types
pub use protocol::{MessageKind, MessageType, Properties, ProxyMessage};

// Re-export client types
pub use client::{InboundHandler, PendingReplies, PendingReply, ProxyConnection};

// Re-export engine types
pub use types::{ActivityTask, ErrorType, ProxyError, WorkflowExecution, WorkflowIdReusePolicy};
