//! Client-side stubs.
//!
//! A stub is a dispatch table over one validated type descriptor: every
//! call looks up the addressed method, resolves the effective options,
//! serializes the arguments and waits for the one matching reply.

mod activity_stub;
pub mod args;
mod child_workflow_stub;
mod execution;
mod method;
mod untyped_workflow_stub;
mod workflow_stub;

pub use activity_stub::{ActivityStub, LocalActivityStub};
pub use child_workflow_stub::ChildWorkflowStub;
pub use method::Method;
pub use untyped_workflow_stub::UntypedWorkflowStub;
pub use workflow_stub::WorkflowStub;
