//! Workflow definitions and the context passed to workflow code.

mod context;
mod definition;

pub use context::{WorkflowContext, WorkflowInfo};
pub use definition::{Workflow, WorkflowHandlers};
