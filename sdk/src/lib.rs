//! Cadence SDK for Rust
//!
//! This SDK lets Rust applications define, start and implement workflows
//! and activities on the Cadence engine. The engine is never contacted
//! directly: every operation travels as a message to a local proxy process
//! over the connection provided by `cadence-core`.

#![allow(clippy::result_large_err)]

pub mod activity;
pub mod client;
pub mod config;
pub mod error;
pub mod interface;
pub mod options;
pub mod stub;
pub mod worker;
pub mod workflow;

/// Testing utilities: an in-memory proxy and a connected test environment.
/// Available only with the `testing` feature enabled.
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use error::{CadenceError, Result};

// Re-export config types
pub use config::{ActivityDefaults, CadenceSettings, WorkflowDefaults};

// Re-export client types
pub use client::{CadenceClient, CadenceClientBuilder};

// Re-export interface types
pub use interface::{
    ActivityInterface, Capability, ImplementationShape, InterfaceShape, MethodRole, MethodShape,
    ParamType, RegistrationMarker, ReturnKind, TypeDescriptor, WorkflowInterface,
};

// Re-export options
pub use options::{
    ActivityOptions, ChildWorkflowOptions, InterfaceDefaults, LocalActivityOptions,
    MethodDefaults, ParentClosePolicy, RetryPolicy, WorkflowOptions,
};

// Re-export stubs
pub use stub::{
    ActivityStub, ChildWorkflowStub, LocalActivityStub, Method, UntypedWorkflowStub, WorkflowStub,
};

// Re-export workflow and activity types
pub use activity::{Activity, ActivityContext, ActivityHandlers, ActivityOutcome};
pub use worker::{Catalog, HandlerTable};
pub use workflow::{Workflow, WorkflowContext, WorkflowHandlers, WorkflowInfo};

// Re-export engine types
pub use cadence_core::{ActivityTask, ErrorType, ProxyError, WorkflowExecution, WorkflowIdReusePolicy};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::activity::{Activity, ActivityContext, ActivityHandlers, ActivityOutcome};
    pub use crate::client::{CadenceClient, CadenceClientBuilder};
    pub use crate::config::{ActivityDefaults, CadenceSettings, WorkflowDefaults};
    pub use crate::error::{CadenceError, Result};
    pub use crate::interface::{
        ActivityInterface, ImplementationShape, InterfaceShape, MethodShape, ParamType,
        ReturnKind, WorkflowInterface,
    };
    pub use crate::options::{
        ActivityOptions, ChildWorkflowOptions, InterfaceDefaults, LocalActivityOptions,
        MethodDefaults, RetryPolicy, WorkflowOptions,
    };
    pub use crate::stub::{Method, UntypedWorkflowStub, WorkflowStub};
    pub use crate::worker::Catalog;
    pub use crate::workflow::{Workflow, WorkflowContext, WorkflowHandlers};
    pub use cadence_core::{ProxyError, WorkflowExecution, WorkflowIdReusePolicy};
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{json, Value};
}
