//! Operations on a started workflow execution.

use super::args::{get_result, set_args};
use crate::client::runtime::ClientRuntime;
use crate::error::{CadenceError, Result};
use crate::options::EffectiveWorkflowOptions;
use cadence_core::protocol::names;
use cadence_core::{MessageType, ProxyMessage, WorkflowExecution};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// A started execution and the domain it runs in.
#[derive(Clone)]
pub(crate) struct ExecutionHandle {
    runtime: Arc<ClientRuntime>,
    execution: WorkflowExecution,
    domain: String,
}

impl ExecutionHandle {
    pub(crate) fn new(runtime: Arc<ClientRuntime>, execution: WorkflowExecution, domain: String) -> Self {
        Self {
            runtime,
            execution,
            domain,
        }
    }

    pub(crate) fn execution(&self) -> &WorkflowExecution {
        &self.execution
    }

    pub(crate) fn domain(&self) -> &str {
        &self.domain
    }

    fn request(&self, message_type: MessageType) -> ProxyMessage {
        ProxyMessage::new(message_type)
            .with_string(names::WORKFLOW_ID, &self.execution.workflow_id)
            .with_string(names::RUN_ID, &self.execution.run_id)
            .with_string(names::DOMAIN, &self.domain)
    }

    /// Wait for the run to finish and return its raw result.
    pub(crate) async fn get_result(&self) -> Result<Option<Value>> {
        let reply = self
            .runtime
            .call(self.request(MessageType::WorkflowGetResultRequest))
            .await?;
        Ok(get_result(&reply.properties)?)
    }

    /// Send a signal. Synchronous signals wait for the handler and return its
    /// result.
    pub(crate) async fn signal(
        &self,
        name: &str,
        args: &[Value],
        synchronous: bool,
    ) -> Result<Option<Value>> {
        debug!(
            workflow_id = %self.execution.workflow_id,
            run_id = %self.execution.run_id,
            signal = name,
            synchronous,
            "sending signal"
        );
        let mut request = self
            .request(MessageType::WorkflowSignalRequest)
            .with_string(names::SIGNAL_NAME, name)
            .with_bool(names::SYNCHRONOUS, synchronous);
        set_args(&mut request.properties, args)?;
        let reply = self.runtime.call(request).await?;
        Ok(get_result(&reply.properties)?)
    }

    pub(crate) async fn query(&self, name: &str, args: &[Value]) -> Result<Option<Value>> {
        let mut request = self
            .request(MessageType::WorkflowQueryRequest)
            .with_string(names::QUERY_NAME, name);
        set_args(&mut request.properties, args)?;
        let reply = self.runtime.call(request).await?;
        Ok(get_result(&reply.properties)?)
    }

    pub(crate) async fn cancel(&self) -> Result<()> {
        self.runtime
            .call(self.request(MessageType::WorkflowCancelRequest))
            .await?;
        Ok(())
    }

    pub(crate) async fn terminate(&self, reason: &str, details: Option<&[u8]>) -> Result<()> {
        let request = self
            .request(MessageType::WorkflowTerminateRequest)
            .with_string(names::REASON, reason)
            .with_bytes(names::DETAILS, details);
        self.runtime.call(request).await?;
        Ok(())
    }
}

enum StartState<T> {
    Idle,
    Starting,
    Started(T),
}

/// Binds a stub to at most one execution.
///
/// A start claims the slot before its request is sent, so a concurrent
/// start fails instead of launching a second run.
pub(crate) struct StartSlot<T> {
    state: Mutex<StartState<T>>,
}

impl<T: Clone> StartSlot<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(StartState::Idle),
        }
    }

    pub(crate) fn bound_to(value: T) -> Self {
        Self {
            state: Mutex::new(StartState::Started(value)),
        }
    }

    /// Claim the slot for a start. On failure returns the bound value, or
    /// `None` while another start is in flight.
    pub(crate) fn claim(&self) -> std::result::Result<StartClaim<'_, T>, Option<T>> {
        let mut state = self.state.lock();
        match &*state {
            StartState::Idle => {
                *state = StartState::Starting;
                Ok(StartClaim {
                    slot: self,
                    bound: false,
                })
            }
            StartState::Starting => Err(None),
            StartState::Started(value) => Err(Some(value.clone())),
        }
    }

    pub(crate) fn get(&self) -> Option<T> {
        match &*self.state.lock() {
            StartState::Started(value) => Some(value.clone()),
            _ => None,
        }
    }
}

/// An in-flight start. Dropping it unbound returns the slot to idle, so a
/// failed or abandoned start can be retried.
pub(crate) struct StartClaim<'a, T> {
    slot: &'a StartSlot<T>,
    bound: bool,
}

impl<T> StartClaim<'_, T> {
    pub(crate) fn bind(mut self, value: T) {
        *self.slot.state.lock() = StartState::Started(value);
        self.bound = true;
    }
}

impl<T> Drop for StartClaim<'_, T> {
    fn drop(&mut self) {
        if !self.bound {
            *self.slot.state.lock() = StartState::Idle;
        }
    }
}

/// Start a workflow run and return its execution.
pub(crate) async fn start_workflow(
    runtime: &ClientRuntime,
    workflow_type: &str,
    args: &[Value],
    options: &EffectiveWorkflowOptions,
) -> Result<WorkflowExecution> {
    let mut request = ProxyMessage::new(MessageType::WorkflowExecuteRequest)
        .with_string(names::WORKFLOW_TYPE, workflow_type)
        .with_string(names::DOMAIN, &options.domain);
    set_args(&mut request.properties, args)?;
    request.properties.set_json(names::OPTIONS, options)?;

    let reply = runtime.call(request).await?;
    let execution: WorkflowExecution = reply
        .properties
        .get_json(names::EXECUTION)?
        .ok_or_else(|| CadenceError::Protocol("execute reply carries no execution".to_string()))?;
    debug!(
        workflow_type,
        workflow_id = %execution.workflow_id,
        run_id = %execution.run_id,
        "workflow execution started"
    );
    Ok(execution)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_excludes_concurrent_start() {
        let slot = StartSlot::<u32>::new();
        let claim = slot.claim().unwrap();
        assert!(matches!(slot.claim(), Err(None)));
        assert_eq!(slot.get(), None);

        claim.bind(7);
        assert_eq!(slot.get(), Some(7));
        assert!(matches!(slot.claim(), Err(Some(7))));
    }

    #[test]
    fn test_unbound_claim_releases_slot() {
        let slot = StartSlot::<u32>::new();
        drop(slot.claim().unwrap());
        assert!(slot.claim().is_ok());
    }

    #[test]
    fn test_bound_slot_rejects_start() {
        let slot = StartSlot::bound_to("attached");
        assert!(matches!(slot.claim(), Err(Some("attached"))));
    }
}
