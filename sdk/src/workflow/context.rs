//! Context handed to running workflow code.

use crate::activity::Activity;
use crate::client::runtime::ClientRuntime;
use crate::error::Result;
use crate::interface::{ActivityInterface, WorkflowInterface};
use crate::options::{ActivityOptions, ChildWorkflowOptions, LocalActivityOptions};
use crate::stub::{ActivityStub, ChildWorkflowStub, LocalActivityStub};
use cadence_core::protocol::names;
use cadence_core::{MessageType, ProxyMessage, WorkflowExecution};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Identity of one workflow run as delivered by the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowInfo {
    pub workflow_type: String,
    pub execution: WorkflowExecution,
    pub domain: String,
    pub task_list: String,
    /// Proxy-side id of this run, used to address it in requests
    pub context_id: i64,
}

/// Handle on one running workflow.
#[derive(Clone)]
pub struct WorkflowContext {
    runtime: Arc<ClientRuntime>,
    info: Arc<WorkflowInfo>,
}

impl WorkflowContext {
    pub(crate) fn new(runtime: Arc<ClientRuntime>, info: WorkflowInfo) -> Self {
        Self {
            runtime,
            info: Arc::new(info),
        }
    }

    pub fn info(&self) -> &WorkflowInfo {
        &self.info
    }

    pub fn workflow_execution(&self) -> &WorkflowExecution {
        &self.info.execution
    }

    pub fn context_id(&self) -> i64 {
        self.info.context_id
    }

    /// Durable sleep, timed by the engine.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        debug!(
            context_id = self.info.context_id,
            workflow_id = %self.info.execution.workflow_id,
            ?duration,
            "workflow sleep"
        );
        let mut request = ProxyMessage::new(MessageType::WorkflowSleepRequest)
            .with_i64(names::CONTEXT_ID, self.info.context_id);
        request.properties.set_duration(names::DURATION, duration);
        self.runtime.call(request).await?;
        Ok(())
    }

    /// Stub for activities executed by workers through the engine.
    pub fn new_activity_stub<I: ActivityInterface>(
        &self,
        options: ActivityOptions,
    ) -> Result<ActivityStub<I>> {
        let descriptor = self.runtime.activity_descriptor::<I>()?;
        Ok(ActivityStub::new(self.clone(), descriptor, options))
    }

    /// Stub that runs the activity implementation `A` in this process.
    pub fn new_local_activity_stub<A: Activity>(
        &self,
        options: LocalActivityOptions,
    ) -> Result<LocalActivityStub<A>> {
        let descriptor = self.runtime.activity_implementation_descriptor::<A>()?;
        Ok(LocalActivityStub::new(self.clone(), descriptor, options))
    }

    pub fn new_child_workflow_stub<I: WorkflowInterface>(
        &self,
        options: ChildWorkflowOptions,
    ) -> Result<ChildWorkflowStub<I>> {
        let descriptor = self.runtime.workflow_descriptor::<I>()?;
        Ok(ChildWorkflowStub::new(self.clone(), descriptor, options))
    }

    pub(crate) fn runtime(&self) -> &Arc<ClientRuntime> {
        &self.runtime
    }
}

impl std::fmt::Debug for WorkflowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowContext")
            .field("info", &self.info)
            .finish()
    }
}
