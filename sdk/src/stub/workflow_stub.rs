//! Typed workflow stub.

use super::args::{decode_value, encode_args};
use super::execution::{start_workflow, ExecutionHandle, StartSlot};
use super::Method;
use crate::client::runtime::ClientRuntime;
use crate::error::{CadenceError, Result};
use crate::interface::{MethodCategory, MethodDescriptor, SignalKind, TypeDescriptor, WorkflowInterface};
use crate::options::WorkflowOptions;
use cadence_core::WorkflowExecution;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;

/// Client-side proxy for one execution of the workflow interface `I`.
///
/// Each stub starts at most one execution; signals and queries go to that
/// execution.
///
/// ```ignore
/// let stub = client.new_workflow_stub::<GreeterWorkflow>(WorkflowOptions::new())?;
/// let greeting: String = stub.execute(HELLO, ("Jeff",)).await?;
/// ```
pub struct WorkflowStub<I> {
    runtime: Arc<ClientRuntime>,
    descriptor: Arc<TypeDescriptor>,
    options: WorkflowOptions,
    started: StartSlot<ExecutionHandle>,
    _interface: PhantomData<fn() -> I>,
}

impl<I: WorkflowInterface> WorkflowStub<I> {
    pub(crate) fn new(
        runtime: Arc<ClientRuntime>,
        descriptor: Arc<TypeDescriptor>,
        options: WorkflowOptions,
    ) -> Self {
        Self {
            runtime,
            descriptor,
            options,
            started: StartSlot::new(),
            _interface: PhantomData,
        }
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Execution started by this stub, if any.
    pub fn execution(&self) -> Option<WorkflowExecution> {
        self.started.get().map(|h| h.execution().clone())
    }

    /// Start the entrypoint `method` without waiting for it to finish.
    pub async fn start<A: Serialize, R>(&self, method: Method<A, R>, args: A) -> Result<WorkflowExecution> {
        let claim = self
            .started
            .claim()
            .map_err(|_| already_started(&self.descriptor))?;

        let md = self.method(method.member(), MethodCategory::Entrypoint)?;
        let options =
            self.options
                .normalize(Some(&md.defaults), Some(&self.descriptor.defaults), &self.runtime.settings)?;
        let args = encode_args(&args)?;
        let workflow_type = self.descriptor.qualified_name(md);
        let execution = start_workflow(&self.runtime, &workflow_type, &args, &options).await?;

        claim.bind(ExecutionHandle::new(
            Arc::clone(&self.runtime),
            execution.clone(),
            options.domain,
        ));
        Ok(execution)
    }

    /// Start the entrypoint `method` and wait for its result.
    pub async fn execute<A: Serialize, R: DeserializeOwned>(
        &self,
        method: Method<A, R>,
        args: A,
    ) -> Result<R> {
        self.start(method, args).await?;
        self.get_result().await
    }

    /// Wait for the started execution to finish.
    pub async fn get_result<R: DeserializeOwned>(&self) -> Result<R> {
        decode_value(self.handle()?.get_result().await?)
    }

    /// Send the signal `method`. Synchronous signals return the handler's
    /// result; fire-and-forget signals return as soon as the engine has
    /// accepted the signal.
    pub async fn signal<A: Serialize, R: DeserializeOwned>(
        &self,
        method: Method<A, R>,
        args: A,
    ) -> Result<R> {
        let md = self.method(method.member(), MethodCategory::Signal)?;
        let synchronous = md.signal_kind == SignalKind::Sync;
        let name = md.name.clone();
        let args = encode_args(&args)?;
        decode_value(self.handle()?.signal(&name, &args, synchronous).await?)
    }

    pub async fn query<A: Serialize, R: DeserializeOwned>(
        &self,
        method: Method<A, R>,
        args: A,
    ) -> Result<R> {
        let md = self.method(method.member(), MethodCategory::Query)?;
        let name = md.name.clone();
        let args = encode_args(&args)?;
        decode_value(self.handle()?.query(&name, &args).await?)
    }

    pub async fn cancel(&self) -> Result<()> {
        self.handle()?.cancel().await
    }

    fn method(&self, member: &str, category: MethodCategory) -> Result<&MethodDescriptor> {
        self.descriptor.method_in(member, category).ok_or_else(|| {
            CadenceError::InvalidOperation(format!(
                "[{}] is not a {category} of [{}]",
                member, self.descriptor.interface_name
            ))
        })
    }

    fn handle(&self) -> Result<ExecutionHandle> {
        self.started.get().ok_or_else(|| {
            CadenceError::InvalidOperation(format!(
                "no execution of [{}] has been started by this stub",
                self.descriptor.engine_type_name
            ))
        })
    }
}

fn already_started(descriptor: &TypeDescriptor) -> CadenceError {
    CadenceError::InvalidOperation(format!(
        "this stub has already started an execution of [{}]",
        descriptor.engine_type_name
    ))
}

impl<I> std::fmt::Debug for WorkflowStub<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowStub")
            .field("workflow_type", &self.descriptor.engine_type_name)
            .field("started", &self.started.get().map(|h| h.execution().clone()))
            .finish()
    }
}
