//! Child workflows started from workflow code.

use super::args::{decode_value, encode_args, get_result, set_args};
use super::execution::StartSlot;
use super::Method;
use crate::error::{CadenceError, Result};
use crate::interface::{MethodCategory, TypeDescriptor, WorkflowInterface};
use crate::options::ChildWorkflowOptions;
use crate::workflow::WorkflowContext;
use cadence_core::protocol::names;
use cadence_core::{MessageType, ProxyMessage, WorkflowExecution};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
struct StartedChild {
    child_id: i64,
    execution: WorkflowExecution,
}

/// Starts one child execution of workflow interface `I` and waits for it.
pub struct ChildWorkflowStub<I> {
    context: WorkflowContext,
    descriptor: Arc<TypeDescriptor>,
    options: ChildWorkflowOptions,
    started: StartSlot<StartedChild>,
    _interface: PhantomData<fn() -> I>,
}

impl<I: WorkflowInterface> ChildWorkflowStub<I> {
    pub(crate) fn new(
        context: WorkflowContext,
        descriptor: Arc<TypeDescriptor>,
        options: ChildWorkflowOptions,
    ) -> Self {
        Self {
            context,
            descriptor,
            options,
            started: StartSlot::new(),
            _interface: PhantomData,
        }
    }

    pub fn execution(&self) -> Option<WorkflowExecution> {
        self.started.get().map(|c| c.execution)
    }

    /// Start the child without waiting for it.
    pub async fn start<A: Serialize, R>(&self, method: Method<A, R>, args: A) -> Result<WorkflowExecution> {
        let claim = self.started.claim().map_err(|_| self.already_started())?;
        let md = self
            .descriptor
            .method_in(method.member(), MethodCategory::Entrypoint)
            .ok_or_else(|| {
                CadenceError::InvalidOperation(format!(
                    "[{}] is not a workflow entrypoint of [{}]",
                    method.member(),
                    self.descriptor.interface_name
                ))
            })?;
        let runtime = self.context.runtime();
        let options = self.options.normalize(
            Some(&md.defaults),
            Some(&self.descriptor.defaults),
            &runtime.settings,
        )?;
        let workflow_type = self.descriptor.qualified_name(md);

        let mut request = ProxyMessage::new(MessageType::WorkflowExecuteChildRequest)
            .with_i64(names::CONTEXT_ID, self.context.context_id())
            .with_string(names::WORKFLOW_TYPE, &workflow_type);
        set_args(&mut request.properties, &encode_args(&args)?)?;
        request.properties.set_json(names::OPTIONS, &options)?;

        let reply = runtime.call(request).await?;
        let child_id = reply
            .properties
            .get_i64(names::CHILD_ID)?
            .ok_or_else(|| CadenceError::Protocol("child reply carries no child id".to_string()))?;
        let execution: WorkflowExecution = reply
            .properties
            .get_json(names::EXECUTION)?
            .ok_or_else(|| CadenceError::Protocol("child reply carries no execution".to_string()))?;
        debug!(
            workflow_type = %workflow_type,
            workflow_id = %execution.workflow_id,
            context_id = self.context.context_id(),
            child_id,
            "child workflow started"
        );

        claim.bind(StartedChild {
            child_id,
            execution: execution.clone(),
        });
        Ok(execution)
    }

    /// Wait for the started child to finish.
    pub async fn result<R: DeserializeOwned>(&self) -> Result<R> {
        let child_id = self
            .started
            .get()
            .map(|c| c.child_id)
            .ok_or_else(|| CadenceError::InvalidOperation("the child workflow has not been started".to_string()))?;
        let request = ProxyMessage::new(MessageType::WorkflowWaitForChildRequest)
            .with_i64(names::CONTEXT_ID, self.context.context_id())
            .with_i64(names::CHILD_ID, child_id);
        let reply = self.context.runtime().call(request).await?;
        decode_value(get_result(&reply.properties)?)
    }

    /// Start the child and wait for its result.
    pub async fn execute<A: Serialize, R: DeserializeOwned>(&self, method: Method<A, R>, args: A) -> Result<R> {
        self.start(method, args).await?;
        self.result().await
    }

    fn already_started(&self) -> CadenceError {
        CadenceError::InvalidOperation(format!(
            "this stub has already started a child execution of [{}]",
            self.descriptor.engine_type_name
        ))
    }
}

impl<I> std::fmt::Debug for ChildWorkflowStub<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildWorkflowStub")
            .field("workflow_type", &self.descriptor.engine_type_name)
            .finish()
    }
}
