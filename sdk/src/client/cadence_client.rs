//! CadenceClient - the application-facing entry point

use super::builder::CadenceClientBuilder;
use super::runtime::{completion_error, ClientRuntime};
use crate::activity::{Activity, ActivityStatus, HeartbeatReporter};
use crate::config::CadenceSettings;
use crate::error::{CadenceError, Result};
use crate::interface::{naming, validate_type_name, Capability, WorkflowInterface};
use crate::options::{resolve_route, WorkflowOptions};
use crate::stub::{UntypedWorkflowStub, WorkflowStub};
use crate::worker::Catalog;
use crate::workflow::Workflow;
use cadence_core::protocol::names;
use cadence_core::{ErrorType, MessageType, ProxyConnection, ProxyError, ProxyMessage, WorkflowExecution};
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

/// Connection to the engine through the local proxy.
///
/// Cheap to clone; all clones share one connection. Registrations, workers
/// and the descriptor cache belong to the client and end with it.
///
/// Example:
/// ```ignore
/// let client = CadenceClient::builder()
///     .proxy_address("127.0.0.1:5000")
///     .default_domain("samples")
///     .default_task_list("greetings")
///     .connect()
///     .await?;
///
/// client.register_workflow::<Greeter>().await?;
/// client.register_activity::<Greetings>().await?;
/// client.start_worker(None).await?;
///
/// let stub = client.new_workflow_stub::<GreeterWorkflow>(WorkflowOptions::new())?;
/// let greeting: String = stub.execute(HELLO, ("Jeff",)).await?;
/// ```
#[derive(Clone)]
pub struct CadenceClient {
    runtime: Arc<ClientRuntime>,
}

impl CadenceClient {
    pub fn builder() -> CadenceClientBuilder {
        CadenceClientBuilder::new()
    }

    /// Connect over an already established byte stream to the proxy.
    pub async fn connect_with<T>(settings: CadenceSettings, transport: T) -> Result<Self>
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        settings.validate()?;
        let connect_timeout = settings.connect_timeout;
        let connection = ProxyConnection::open(transport);
        let client = Self {
            runtime: ClientRuntime::new(settings, connection),
        };

        let handshake = tokio::time::timeout(connect_timeout, client.handshake()).await;
        let outcome = match handshake {
            Ok(result) => result,
            Err(_) => Err(CadenceError::Timeout(format!(
                "proxy did not complete the handshake within {connect_timeout:?}"
            ))),
        };
        if let Err(err) = outcome {
            warn!(error = %err, "connecting to the proxy failed");
            client.runtime.mark_closed();
            client.runtime.connection.close().await;
            return Err(err);
        }

        client.start_ping_loop();
        info!(
            identity = %client.runtime.identity,
            domain = ?client.runtime.settings.default_domain,
            "connected to the proxy"
        );
        Ok(client)
    }

    async fn handshake(&self) -> Result<()> {
        let settings = &self.runtime.settings;
        self.runtime
            .call(
                ProxyMessage::new(MessageType::InitializeRequest)
                    .with_string(names::LIBRARY_VERSION, env!("CARGO_PKG_VERSION")),
            )
            .await?;

        let mut connect = ProxyMessage::new(MessageType::ConnectRequest)
            .with_string(names::ENDPOINTS, &settings.proxy_address)
            .with_string(names::IDENTITY, &self.runtime.identity)
            .with_bool(names::CREATE_DOMAIN, settings.create_domain);
        if let Some(domain) = &settings.default_domain {
            connect.properties.set_string(names::DOMAIN, domain);
        }
        connect
            .properties
            .set_duration(names::CLIENT_TIMEOUT, settings.connect_timeout);
        self.runtime.call(connect).await?;

        if settings.create_domain {
            let domain = self.runtime.default_domain(None)?;
            let request =
                ProxyMessage::new(MessageType::DomainRegisterRequest).with_string(names::NAME, &domain);
            match self.runtime.call(request).await {
                Ok(_) => info!(domain = %domain, "domain registered"),
                Err(CadenceError::Remote(e)) if e.reason.as_deref() == Some("DomainAlreadyExistsError") => {
                    debug!(domain = %domain, "domain already exists");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn start_ping_loop(&self) {
        let interval = self.runtime.settings.ping_interval;
        if interval.is_zero() {
            return;
        }
        let runtime = Arc::downgrade(&self.runtime);
        let shutdown = self.runtime.shutdown.clone();
        let timeout = self.runtime.settings.ping_timeout;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let Some(runtime) = runtime.upgrade() else { break };
                if runtime.is_closed() {
                    break;
                }
                match tokio::time::timeout(timeout, ping(&runtime)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(error = %e, "proxy ping failed"),
                    Err(_) => warn!(?timeout, "proxy ping timed out"),
                }
            }
            debug!("ping loop stopped");
        });
        *self.runtime.ping_task.lock() = Some(task);
    }

    /// Check that the proxy is responsive.
    pub async fn ping(&self) -> Result<()> {
        ping(&self.runtime).await
    }

    pub fn settings(&self) -> &CadenceSettings {
        &self.runtime.settings
    }

    pub fn identity(&self) -> &str {
        &self.runtime.identity
    }

    pub fn is_closed(&self) -> bool {
        self.runtime.is_closed()
    }

    /// Disconnect from the proxy.
    ///
    /// Outstanding calls fail with [`CadenceError::ConnectionClosed`] and
    /// running activity contexts are cancelled. Closing twice is a no-op.
    pub async fn close(&self) {
        if !self.runtime.mark_closed() {
            return;
        }
        let runtime = &self.runtime;
        runtime.shutdown.cancel();

        if runtime.connection.is_open() {
            let terminate = runtime
                .connection
                .call(ProxyMessage::new(MessageType::TerminateRequest));
            if tokio::time::timeout(runtime.settings.ping_timeout, terminate)
                .await
                .is_err()
            {
                debug!("proxy did not acknowledge terminate");
            }
        }

        let ping_task = runtime.ping_task.lock().take();
        if let Some(task) = ping_task {
            task.abort();
        }
        runtime.activity_contexts.cancel_all();
        runtime.connection.close().await;
        info!(identity = %runtime.identity, "client closed");
    }

    /// Validate and register the workflow implementation `W`.
    pub async fn register_workflow<W: Workflow>(&self) -> Result<()> {
        let descriptor = self.runtime.workflow_implementation_descriptor::<W>()?;
        let domain = self.runtime.default_domain(descriptor.defaults.domain.as_deref())?;
        let added = self.runtime.workflows.register::<W>(Arc::clone(&descriptor))?;
        for name in added {
            let request = ProxyMessage::new(MessageType::WorkflowRegisterRequest)
                .with_string(names::NAME, &name)
                .with_string(names::DOMAIN, &domain);
            self.runtime.call(request).await?;
            info!(workflow_type = %name, domain = %domain, "workflow registered");
        }
        Ok(())
    }

    /// Validate and register the activity implementation `A`.
    pub async fn register_activity<A: Activity>(&self) -> Result<()> {
        let descriptor = self.runtime.activity_implementation_descriptor::<A>()?;
        let domain = self.runtime.default_domain(descriptor.defaults.domain.as_deref())?;
        let added = self.runtime.activities.register::<A>(&descriptor)?;
        for name in added {
            let request = ProxyMessage::new(MessageType::ActivityRegisterRequest)
                .with_string(names::NAME, &name)
                .with_string(names::DOMAIN, &domain);
            self.runtime.call(request).await?;
            info!(activity_type = %name, domain = %domain, "activity registered");
        }
        Ok(())
    }

    /// Register every catalog entry whose registration marker asks for
    /// automatic registration. Returns how many were registered.
    pub async fn register_assembly(&self, catalog: &Catalog) -> Result<usize> {
        let mut registered = 0;
        for entry in catalog.entries() {
            if !entry.shape.auto_registers() {
                debug!(implementation = %entry.shape.full_name, "skipping catalog entry");
                continue;
            }
            entry.register(self).await?;
            registered += 1;
        }
        Ok(registered)
    }

    pub fn registered_workflow_types(&self) -> Vec<String> {
        self.runtime.workflows.registered_types()
    }

    pub fn registered_activity_types(&self) -> Vec<String> {
        self.runtime.activities.registered_types()
    }

    /// Start polling `task_list` (or the default task list) for workflow and
    /// activity invocations. Returns the worker id.
    pub async fn start_worker(&self, task_list: Option<&str>) -> Result<i64> {
        let task_list = resolve_route(
            "task list",
            &[task_list, self.runtime.settings.default_task_list.as_deref()],
        )?;
        if self.runtime.workers.lock().contains_key(&task_list) {
            return Err(CadenceError::InvalidOperation(format!(
                "a worker is already running for task list [{task_list}]"
            )));
        }
        let domain = self.runtime.default_domain(None)?;

        let request = ProxyMessage::new(MessageType::NewWorkerRequest)
            .with_string(names::DOMAIN, &domain)
            .with_string(names::TASK_LIST, &task_list);
        let reply = self.runtime.call(request).await?;
        let worker_id = reply
            .properties
            .get_i64(names::WORKER_ID)?
            .ok_or_else(|| CadenceError::Protocol("new worker reply carries no worker id".to_string()))?;

        self.runtime.workers.lock().insert(task_list.clone(), worker_id);
        info!(worker_id, task_list = %task_list, domain = %domain, "worker started");
        Ok(worker_id)
    }

    pub async fn stop_worker(&self, worker_id: i64) -> Result<()> {
        let task_list = {
            let workers = self.runtime.workers.lock();
            workers
                .iter()
                .find(|(_, id)| **id == worker_id)
                .map(|(task_list, _)| task_list.clone())
        };
        let task_list = task_list
            .ok_or_else(|| CadenceError::InvalidOperation(format!("worker {worker_id} is not running")))?;

        self.runtime
            .call(ProxyMessage::new(MessageType::StopWorkerRequest).with_i64(names::WORKER_ID, worker_id))
            .await?;
        self.runtime.workers.lock().remove(&task_list);
        info!(worker_id, task_list = %task_list, "worker stopped");
        Ok(())
    }

    /// Typed stub for one execution of workflow interface `I`.
    pub fn new_workflow_stub<I: WorkflowInterface>(&self, options: WorkflowOptions) -> Result<WorkflowStub<I>> {
        let descriptor = self.runtime.workflow_descriptor::<I>()?;
        Ok(WorkflowStub::new(Arc::clone(&self.runtime), descriptor, options))
    }

    /// Stub addressing a workflow by engine type name.
    pub fn new_untyped_workflow_stub(
        &self,
        workflow_type: &str,
        options: WorkflowOptions,
    ) -> Result<UntypedWorkflowStub> {
        // at most one separator: the type name and an optional discriminator
        let (type_name, discriminator) = naming::split(workflow_type);
        validate_type_name(Capability::Workflow, type_name)?;
        validate_type_name(Capability::Workflow, discriminator)?;
        Ok(UntypedWorkflowStub::new(
            Arc::clone(&self.runtime),
            workflow_type.to_string(),
            options,
        ))
    }

    /// Untyped stub bound to an execution started elsewhere.
    pub fn attach_untyped_workflow_stub(
        &self,
        execution: WorkflowExecution,
        domain: Option<&str>,
    ) -> Result<UntypedWorkflowStub> {
        let domain = self.runtime.default_domain(domain)?;
        Ok(UntypedWorkflowStub::attached(
            Arc::clone(&self.runtime),
            execution,
            domain,
        ))
    }

    pub async fn activity_heartbeat_by_token(&self, task_token: &[u8], details: Option<Vec<u8>>) -> Result<()> {
        self.runtime.record_heartbeat(task_token, details).await
    }

    pub async fn activity_heartbeat_by_id(
        &self,
        execution: &WorkflowExecution,
        activity_id: &str,
        details: Option<Vec<u8>>,
    ) -> Result<()> {
        let request = self
            .by_id(MessageType::ActivityRecordHeartbeatRequest, execution, activity_id)?
            .with_bytes(names::DETAILS, details.as_deref());
        self.runtime.call(request).await.map_err(completion_error)?;
        Ok(())
    }

    pub async fn activity_complete_by_token<R: Serialize>(&self, task_token: &[u8], result: R) -> Result<()> {
        let mut request = by_token(task_token);
        request.properties.set_json(names::RESULT, &result)?;
        self.complete(request).await?;
        self.runtime
            .activity_contexts
            .finish_by_token(task_token, ActivityStatus::Completed);
        Ok(())
    }

    pub async fn activity_complete_by_id<R: Serialize>(
        &self,
        execution: &WorkflowExecution,
        activity_id: &str,
        result: R,
    ) -> Result<()> {
        let mut request = self.by_id(MessageType::ActivityCompleteRequest, execution, activity_id)?;
        request.properties.set_json(names::RESULT, &result)?;
        self.complete(request).await?;
        self.runtime
            .activity_contexts
            .finish_by_id(execution, activity_id, ActivityStatus::Completed);
        Ok(())
    }

    /// Fail an externally completing activity.
    pub async fn activity_error_by_token(&self, task_token: &[u8], error: &CadenceError) -> Result<()> {
        let request = by_token(task_token).with_error(&error.to_proxy_error())?;
        self.complete(request).await?;
        self.runtime
            .activity_contexts
            .finish_by_token(task_token, ActivityStatus::Failed);
        Ok(())
    }

    pub async fn activity_error_by_id(
        &self,
        execution: &WorkflowExecution,
        activity_id: &str,
        error: &CadenceError,
    ) -> Result<()> {
        let request = self
            .by_id(MessageType::ActivityCompleteRequest, execution, activity_id)?
            .with_error(&error.to_proxy_error())?;
        self.complete(request).await?;
        self.runtime
            .activity_contexts
            .finish_by_id(execution, activity_id, ActivityStatus::Failed);
        Ok(())
    }

    pub async fn activity_cancel_by_token(&self, task_token: &[u8]) -> Result<()> {
        let request = by_token(task_token).with_error(&cancelled())?;
        self.complete(request).await?;
        self.runtime
            .activity_contexts
            .finish_by_token(task_token, ActivityStatus::Cancelled);
        Ok(())
    }

    pub async fn activity_cancel_by_id(&self, execution: &WorkflowExecution, activity_id: &str) -> Result<()> {
        let request = self
            .by_id(MessageType::ActivityCompleteRequest, execution, activity_id)?
            .with_error(&cancelled())?;
        self.complete(request).await?;
        self.runtime
            .activity_contexts
            .finish_by_id(execution, activity_id, ActivityStatus::Cancelled);
        Ok(())
    }

    async fn complete(&self, request: ProxyMessage) -> Result<()> {
        self.runtime.call(request).await.map_err(completion_error)?;
        Ok(())
    }

    fn by_id(
        &self,
        message_type: MessageType,
        execution: &WorkflowExecution,
        activity_id: &str,
    ) -> Result<ProxyMessage> {
        Ok(ProxyMessage::new(message_type)
            .with_string(names::DOMAIN, self.runtime.default_domain(None)?)
            .with_string(names::WORKFLOW_ID, &execution.workflow_id)
            .with_string(names::RUN_ID, &execution.run_id)
            .with_string(names::ACTIVITY_ID, activity_id))
    }

    /// Activities currently running in this client and activities waiting
    /// for external completion.
    pub fn activity_counts(&self) -> (usize, usize) {
        let contexts = &self.runtime.activity_contexts;
        (contexts.running(), contexts.pending())
    }
}

fn by_token(task_token: &[u8]) -> ProxyMessage {
    ProxyMessage::new(MessageType::ActivityCompleteRequest).with_bytes(names::TASK_TOKEN, Some(task_token))
}

fn cancelled() -> ProxyError {
    ProxyError::new(ErrorType::Cancelled, "activity was cancelled")
}

async fn ping(runtime: &ClientRuntime) -> Result<()> {
    runtime.call(ProxyMessage::new(MessageType::PingRequest)).await?;
    Ok(())
}

impl std::fmt::Debug for CadenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CadenceClient")
            .field("identity", &self.runtime.identity)
            .field("proxy_address", &self.runtime.settings.proxy_address)
            .field("closed", &self.is_closed())
            .finish()
    }
}
