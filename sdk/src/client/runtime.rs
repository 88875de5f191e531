//! State shared by a client, its stubs and its workers.

use crate::activity::{Activity, ActivityContexts, ActivityRegistry, HeartbeatReporter};
use crate::config::CadenceSettings;
use crate::error::{CadenceError, Result};
use crate::interface::{
    validate_activity_implementation, validate_activity_interface,
    validate_workflow_implementation, validate_workflow_interface, ActivityInterface,
    DescriptorCache, TypeDescriptor, WorkflowInterface,
};
use crate::options::resolve_route;
use crate::stub::args::check_reply;
use crate::worker::{ActivityWorker, WorkflowRegistry, WorkflowWorker};
use crate::workflow::Workflow;
use async_trait::async_trait;
use cadence_core::protocol::names;
use cadence_core::{MessageType, ProxyConnection, ProxyMessage};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Everything one client owns: the connection, the descriptor cache, the
/// registries and the running activity contexts.
pub(crate) struct ClientRuntime {
    pub(crate) settings: CadenceSettings,
    pub(crate) identity: String,
    pub(crate) connection: Arc<ProxyConnection>,
    pub(crate) descriptors: DescriptorCache,
    pub(crate) workflows: WorkflowRegistry,
    pub(crate) activities: ActivityRegistry,
    pub(crate) activity_contexts: ActivityContexts,
    /// Worker ids by task list
    pub(crate) workers: Mutex<HashMap<String, i64>>,
    pub(crate) shutdown: CancellationToken,
    pub(crate) ping_task: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
    next_local_id: AtomicI64,
}

impl ClientRuntime {
    pub(crate) fn new(settings: CadenceSettings, connection: Arc<ProxyConnection>) -> Arc<Self> {
        let identity = settings
            .client_identity
            .clone()
            .unwrap_or_else(|| format!("cadence-rs-{}", uuid::Uuid::new_v4()));
        let runtime = Arc::new(Self {
            settings,
            identity,
            connection,
            descriptors: DescriptorCache::new(),
            workflows: WorkflowRegistry::new(),
            activities: ActivityRegistry::new(),
            activity_contexts: ActivityContexts::default(),
            workers: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
            ping_task: Mutex::new(None),
            closed: AtomicBool::new(false),
            next_local_id: AtomicI64::new(1),
        });
        runtime.install_handlers();
        runtime
    }

    /// Route proxy-originated requests to the workers. Handlers hold a weak
    /// reference so the connection does not keep the runtime alive.
    fn install_handlers(self: &Arc<Self>) {
        let workflows = Arc::new(WorkflowWorker::new(Arc::downgrade(self)));
        for message_type in [
            MessageType::WorkflowInvokeRequest,
            MessageType::WorkflowSignalInvokeRequest,
            MessageType::WorkflowQueryInvokeRequest,
        ] {
            self.connection
                .register_handler(message_type, workflows.clone());
        }

        let activities = Arc::new(ActivityWorker::new(Arc::downgrade(self)));
        for message_type in [
            MessageType::ActivityInvokeRequest,
            MessageType::ActivityCancelNotification,
        ] {
            self.connection
                .register_handler(message_type, activities.clone());
        }
    }

    /// Send a request and turn an error reply into [`CadenceError::Remote`].
    pub(crate) async fn call(&self, request: ProxyMessage) -> Result<ProxyMessage> {
        if self.is_closed() {
            return Err(CadenceError::ConnectionClosed);
        }
        let message_type = request.message_type;
        let reply = self.connection.call(request).await?;
        debug!(message_type = %message_type, "reply resolved");
        check_reply(reply)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || !self.connection.is_open()
    }

    /// Mark the runtime closed. Returns false if it already was.
    pub(crate) fn mark_closed(&self) -> bool {
        !self.closed.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn next_local_id(&self) -> i64 {
        self.next_local_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn default_domain(&self, preferred: Option<&str>) -> Result<String> {
        resolve_route("domain", &[preferred, self.settings.default_domain.as_deref()])
    }

    pub(crate) fn workflow_descriptor<I: WorkflowInterface>(&self) -> Result<Arc<TypeDescriptor>> {
        self.descriptors
            .get_or_validate::<I>(|| validate_workflow_interface(&I::shape()))
    }

    pub(crate) fn activity_descriptor<I: ActivityInterface>(&self) -> Result<Arc<TypeDescriptor>> {
        self.descriptors
            .get_or_validate::<I>(|| validate_activity_interface(&I::shape()))
    }

    pub(crate) fn workflow_implementation_descriptor<W: Workflow>(
        &self,
    ) -> Result<Arc<TypeDescriptor>> {
        self.descriptors
            .get_or_validate::<W>(|| validate_workflow_implementation(&W::implementation()))
    }

    pub(crate) fn activity_implementation_descriptor<A: Activity>(
        &self,
    ) -> Result<Arc<TypeDescriptor>> {
        self.descriptors
            .get_or_validate::<A>(|| validate_activity_implementation(&A::implementation()))
    }
}

#[async_trait]
impl HeartbeatReporter for ClientRuntime {
    async fn record_heartbeat(&self, task_token: &[u8], details: Option<Vec<u8>>) -> Result<()> {
        let request = ProxyMessage::new(MessageType::ActivityRecordHeartbeatRequest)
            .with_bytes(names::TASK_TOKEN, Some(task_token))
            .with_bytes(names::DETAILS, details.as_deref());
        self.call(request).await.map_err(completion_error)?;
        Ok(())
    }
}

/// An engine "entity does not exist" reply on an activity operation means
/// the activity was already finalized.
pub(crate) fn completion_error(err: CadenceError) -> CadenceError {
    match err {
        CadenceError::Remote(error) if error.is_entity_not_exists() => {
            warn!(reason = ?error.reason, "activity is already completed");
            CadenceError::AlreadyCompleted(error.message)
        }
        other => other,
    }
}
