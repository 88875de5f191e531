//! Worker-side registration and dispatch of workflow and activity invocations

mod activity_worker;
mod catalog;
pub mod dispatch;
mod registry;
mod workflow_worker;

pub use catalog::{Catalog, CatalogEntry};
pub use dispatch::HandlerTable;
pub use registry::{RegisteredWorkflow, WorkflowInstance, WorkflowRegistry};

pub(crate) use activity_worker::ActivityWorker;
pub(crate) use workflow_worker::WorkflowWorker;
