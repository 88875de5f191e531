//! Dispatch of proxy-originated workflow invocations, signals and queries.

use super::registry::WorkflowInstance;
use crate::client::runtime::ClientRuntime;
use crate::error::{CadenceError, Result};
use crate::interface::TypeDescriptor;
use crate::stub::args::{get_args, set_result};
use crate::workflow::{WorkflowContext, WorkflowInfo};
use async_trait::async_trait;
use cadence_core::protocol::names;
use cadence_core::{CoreResult, InboundHandler, MessageType, ProxyMessage, WorkflowExecution};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

struct RunningWorkflow {
    instance: Arc<dyn WorkflowInstance>,
    descriptor: Arc<TypeDescriptor>,
    context: WorkflowContext,
}

/// Runs workflow entrypoints and routes signals and queries to the
/// instance of the run they address.
pub(crate) struct WorkflowWorker {
    runtime: Weak<ClientRuntime>,
    running: Mutex<HashMap<i64, Arc<RunningWorkflow>>>,
}

impl WorkflowWorker {
    pub(crate) fn new(runtime: Weak<ClientRuntime>) -> Self {
        Self {
            runtime,
            running: Mutex::new(HashMap::new()),
        }
    }

    async fn invoke(&self, request: &ProxyMessage) -> Result<Value> {
        let runtime = self.runtime.upgrade().ok_or(CadenceError::ConnectionClosed)?;
        let props = &request.properties;
        let context_id = require_context_id(request)?;
        let workflow_type = props.require_string(names::WORKFLOW_TYPE)?;

        let registered = runtime.workflows.get(&workflow_type).ok_or_else(|| {
            CadenceError::InvalidOperation(format!(
                "workflow type [{workflow_type}] is not registered with this client"
            ))
        })?;

        let info = WorkflowInfo {
            workflow_type: workflow_type.clone(),
            execution: WorkflowExecution::new(
                props.get_string(names::WORKFLOW_ID).unwrap_or_default(),
                props.get_string(names::RUN_ID).unwrap_or_default(),
            ),
            domain: props.get_string(names::DOMAIN).unwrap_or_default(),
            task_list: props.get_string(names::TASK_LIST).unwrap_or_default(),
            context_id,
        };
        info!(
            workflow_type = %workflow_type,
            workflow_id = %info.execution.workflow_id,
            run_id = %info.execution.run_id,
            context_id,
            "workflow started"
        );

        let running = Arc::new(RunningWorkflow {
            instance: registered.instantiate(),
            descriptor: Arc::clone(&registered.descriptor),
            context: WorkflowContext::new(runtime, info),
        });
        self.running.lock().insert(context_id, Arc::clone(&running));

        let args = get_args(props)?;
        let result = match running.instance.invoke(
            &registered.member,
            running.context.clone(),
            args,
        ) {
            Some(body) => body.await,
            None => Err(CadenceError::InvalidOperation(format!(
                "no handler for workflow entrypoint [{}]",
                registered.member
            ))),
        };

        self.running.lock().remove(&context_id);
        match &result {
            Ok(_) => info!(workflow_type = %workflow_type, context_id, "workflow completed"),
            Err(e) => warn!(workflow_type = %workflow_type, context_id, error = %e, "workflow failed"),
        }
        result
    }

    async fn signal(&self, request: &ProxyMessage) -> Result<Value> {
        let running = self.lookup(request)?;
        let name = request.properties.require_string(names::SIGNAL_NAME)?;
        let method = running.descriptor.signal(&name).ok_or_else(|| {
            CadenceError::InvalidOperation(format!(
                "workflow [{}] has no signal named [{name}]",
                running.descriptor.engine_type_name
            ))
        })?;
        debug!(context_id = running.context.context_id(), signal = %name, "signal received");
        self.dispatch(&running, &method.member, request).await
    }

    async fn query(&self, request: &ProxyMessage) -> Result<Value> {
        let running = self.lookup(request)?;
        let name = request.properties.require_string(names::QUERY_NAME)?;
        let method = running.descriptor.query(&name).ok_or_else(|| {
            CadenceError::InvalidOperation(format!(
                "workflow [{}] has no query named [{name}]",
                running.descriptor.engine_type_name
            ))
        })?;
        debug!(context_id = running.context.context_id(), query = %name, "query received");
        self.dispatch(&running, &method.member, request).await
    }

    async fn dispatch(
        &self,
        running: &RunningWorkflow,
        member: &str,
        request: &ProxyMessage,
    ) -> Result<Value> {
        let args = get_args(&request.properties)?;
        match running.instance.invoke(member, running.context.clone(), args) {
            Some(body) => body.await,
            None => Err(CadenceError::InvalidOperation(format!(
                "no handler for [{member}]"
            ))),
        }
    }

    fn lookup(&self, request: &ProxyMessage) -> Result<Arc<RunningWorkflow>> {
        let context_id = require_context_id(request)?;
        self.running.lock().get(&context_id).cloned().ok_or_else(|| {
            CadenceError::InvalidOperation(format!("no workflow is running for context {context_id}"))
        })
    }
}

fn require_context_id(request: &ProxyMessage) -> Result<i64> {
    request
        .properties
        .get_i64(names::CONTEXT_ID)?
        .ok_or_else(|| CadenceError::Protocol(format!("{} carries no context id", request.message_type)))
}

#[async_trait]
impl InboundHandler for WorkflowWorker {
    async fn handle(&self, message: ProxyMessage) -> CoreResult<Option<ProxyMessage>> {
        let result = match message.message_type {
            MessageType::WorkflowInvokeRequest => self.invoke(&message).await,
            MessageType::WorkflowSignalInvokeRequest => self.signal(&message).await,
            MessageType::WorkflowQueryInvokeRequest => self.query(&message).await,
            other => Err(CadenceError::Protocol(format!("unexpected {other}"))),
        };

        let mut reply = ProxyMessage::reply_to(&message)?;
        match result {
            Ok(value) => {
                if let Err(e) = set_result(&mut reply.properties, &value) {
                    reply.set_error(&e.to_proxy_error())?;
                }
            }
            Err(e) => reply.set_error(&e.to_proxy_error())?,
        }
        Ok(Some(reply))
    }
}
