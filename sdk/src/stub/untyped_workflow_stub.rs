//! Workflow stub addressed by engine type name.

use super::args::{adapt_args, decode_value, encode_args};
use super::execution::{start_workflow, ExecutionHandle, StartSlot};
use crate::client::runtime::ClientRuntime;
use crate::error::{CadenceError, Result};
use crate::interface::{naming, MethodDescriptor, TypeDescriptor};
use crate::options::WorkflowOptions;
use cadence_core::WorkflowExecution;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Workflow stub for callers without a compile-time interface.
///
/// [`start`](Self::start) may be called once per stub: the workflow identity
/// is bound at the first start. Use
/// [`CadenceClient::attach_untyped_workflow_stub`](crate::CadenceClient::attach_untyped_workflow_stub)
/// to address an execution that was started elsewhere.
///
/// When the type is registered with this client, arguments are converted to
/// the declared parameter types before they are sent.
pub struct UntypedWorkflowStub {
    runtime: Arc<ClientRuntime>,
    workflow_type: String,
    options: WorkflowOptions,
    descriptor: Option<Arc<TypeDescriptor>>,
    started: StartSlot<ExecutionHandle>,
}

impl UntypedWorkflowStub {
    pub(crate) fn new(runtime: Arc<ClientRuntime>, workflow_type: String, options: WorkflowOptions) -> Self {
        let descriptor = runtime
            .workflows
            .get(&workflow_type)
            .map(|registered| registered.descriptor);
        Self {
            runtime,
            workflow_type,
            options,
            descriptor,
            started: StartSlot::new(),
        }
    }

    pub(crate) fn attached(
        runtime: Arc<ClientRuntime>,
        execution: WorkflowExecution,
        domain: String,
    ) -> Self {
        let handle = ExecutionHandle::new(Arc::clone(&runtime), execution, domain);
        Self {
            runtime,
            workflow_type: String::new(),
            options: WorkflowOptions::default(),
            descriptor: None,
            started: StartSlot::bound_to(handle),
        }
    }

    pub fn workflow_type(&self) -> &str {
        &self.workflow_type
    }

    pub fn execution(&self) -> Option<WorkflowExecution> {
        self.started.get().map(|h| h.execution().clone())
    }

    /// Start the workflow. Fails with [`CadenceError::InvalidOperation`] when
    /// this stub has already started or attached to an execution.
    pub async fn start<A: Serialize>(&self, args: A) -> Result<WorkflowExecution> {
        let claim = self
            .started
            .claim()
            .map_err(|bound| already_started(bound.as_ref().map(ExecutionHandle::execution)))?;

        let entrypoint = self.entrypoint();
        let mut args = encode_args(&args)?;
        if let Some(md) = entrypoint {
            args = adapt_args(args, &md.params);
        }
        let options = self.options.normalize(
            entrypoint.map(|md| &md.defaults),
            self.descriptor.as_deref().map(|d| &d.defaults),
            &self.runtime.settings,
        )?;
        let execution = start_workflow(&self.runtime, &self.workflow_type, &args, &options).await?;

        claim.bind(ExecutionHandle::new(
            Arc::clone(&self.runtime),
            execution.clone(),
            options.domain,
        ));
        Ok(execution)
    }

    pub async fn get_result<R: DeserializeOwned>(&self) -> Result<R> {
        decode_value(self.handle()?.get_result().await?)
    }

    /// Fire-and-forget signal.
    pub async fn signal<A: Serialize>(&self, name: &str, args: A) -> Result<()> {
        let args = self.prepare(self.descriptor.as_deref().and_then(|d| d.signal(name)), &args)?;
        self.handle()?.signal(name, &args, false).await?;
        Ok(())
    }

    /// Synchronous signal: waits for the handler and returns its result.
    pub async fn signal_sync<A: Serialize, R: DeserializeOwned>(&self, name: &str, args: A) -> Result<R> {
        let args = self.prepare(self.descriptor.as_deref().and_then(|d| d.signal(name)), &args)?;
        decode_value(self.handle()?.signal(name, &args, true).await?)
    }

    pub async fn query<A: Serialize, R: DeserializeOwned>(&self, name: &str, args: A) -> Result<R> {
        let args = self.prepare(self.descriptor.as_deref().and_then(|d| d.query(name)), &args)?;
        decode_value(self.handle()?.query(name, &args).await?)
    }

    pub async fn cancel(&self) -> Result<()> {
        self.handle()?.cancel().await
    }

    pub async fn terminate(&self, reason: &str, details: Option<&[u8]>) -> Result<()> {
        self.handle()?.terminate(reason, details).await
    }

    fn entrypoint(&self) -> Option<&MethodDescriptor> {
        let descriptor = self.descriptor.as_deref()?;
        let (_, discriminator) = naming::split(&self.workflow_type);
        descriptor
            .entrypoints()
            .find(|md| md.name == discriminator)
    }

    fn prepare<A: Serialize>(&self, method: Option<&MethodDescriptor>, args: &A) -> Result<Vec<Value>> {
        let args = encode_args(args)?;
        Ok(match method {
            Some(md) => adapt_args(args, &md.params),
            None => args,
        })
    }

    fn handle(&self) -> Result<ExecutionHandle> {
        self.started.get().ok_or_else(|| {
            CadenceError::InvalidOperation(format!(
                "workflow [{}] has not been started by this stub",
                self.workflow_type
            ))
        })
    }
}

fn already_started(execution: Option<&WorkflowExecution>) -> CadenceError {
    CadenceError::InvalidOperation(match execution {
        Some(execution) => format!(
            "this stub is already bound to workflow execution [{execution}]; start may only be called once"
        ),
        None => "this stub is already starting a workflow execution; start may only be called once"
            .to_string(),
    })
}

impl std::fmt::Debug for UntypedWorkflowStub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UntypedWorkflowStub")
            .field("workflow_type", &self.workflow_type)
            .field("execution", &self.execution())
            .finish()
    }
}
