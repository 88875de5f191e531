//! In-memory stand-in for the proxy process.
//!
//! Speaks the proxy side of the message protocol over a duplex pipe and
//! keeps just enough engine state to run workflows and activities against
//! a real [`CadenceClient`](crate::CadenceClient): runs, workers,
//! activity tasks, heartbeats and external completions.

use crate::options::{EffectiveActivityOptions, EffectiveWorkflowOptions};
use async_trait::async_trait;
use cadence_core::protocol::names;
use cadence_core::{
    ActivityTask, CoreError, CoreResult, ErrorType, InboundHandler, MessageType, Properties,
    ProxyConnection, ProxyError, ProxyMessage, WorkflowExecution, WorkflowIdReusePolicy,
};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Weak};
use tokio::io::DuplexStream;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

const PIPE_CAPACITY: usize = 64 * 1024;

/// Raw JSON result of a run or activity, or the error it ended with.
type Outcome = Result<Option<String>, ProxyError>;

type Handled = Result<ProxyMessage, ProxyError>;

const HANDLED_REQUESTS: &[MessageType] = &[
    MessageType::InitializeRequest,
    MessageType::ConnectRequest,
    MessageType::TerminateRequest,
    MessageType::PingRequest,
    MessageType::CancelRequest,
    MessageType::DomainRegisterRequest,
    MessageType::NewWorkerRequest,
    MessageType::StopWorkerRequest,
    MessageType::WorkflowRegisterRequest,
    MessageType::WorkflowExecuteRequest,
    MessageType::WorkflowGetResultRequest,
    MessageType::WorkflowSignalRequest,
    MessageType::WorkflowQueryRequest,
    MessageType::WorkflowCancelRequest,
    MessageType::WorkflowTerminateRequest,
    MessageType::WorkflowSleepRequest,
    MessageType::WorkflowExecuteChildRequest,
    MessageType::WorkflowWaitForChildRequest,
    MessageType::ActivityRegisterRequest,
    MessageType::ActivityExecuteRequest,
    MessageType::ActivityRecordHeartbeatRequest,
    MessageType::ActivityCompleteRequest,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationKind {
    Workflow,
    Activity,
}

/// A workflow or activity type registered by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub kind: RegistrationKind,
    pub name: String,
    pub domain: String,
}

/// A heartbeat received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedHeartbeat {
    pub task_token: Vec<u8>,
    pub details: Option<Vec<u8>>,
}

struct Run {
    execution: WorkflowExecution,
    workflow_type: String,
    domain: String,
    task_list: String,
    context_id: i64,
    outcome: watch::Sender<Option<Outcome>>,
}

impl Run {
    /// Close the run. Returns false if it was already closed.
    fn finish(&self, outcome: Outcome) -> bool {
        self.outcome.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(outcome);
            true
        })
    }

    fn outcome(&self) -> Option<Outcome> {
        self.outcome.borrow().clone()
    }

    fn is_closed(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    async fn wait(&self) -> Outcome {
        let mut outcome = self.outcome.subscribe();
        let closed = match outcome.wait_for(Option::is_some).await {
            Ok(current) => current.clone(),
            Err(_) => None,
        };
        closed.unwrap_or_else(|| Err(ProxyError::entity_not_exists("the run was discarded")))
    }
}

struct ActivityRecord {
    task: ActivityTask,
    context_id: i64,
    finished: bool,
    completion: Option<oneshot::Sender<Outcome>>,
}

#[derive(Default)]
struct Ledger {
    identity: Option<String>,
    domains: HashSet<String>,
    registrations: Vec<Registration>,
    workers: HashMap<i64, String>,
    runs: Vec<Arc<Run>>,
    children: HashMap<i64, Arc<Run>>,
    activities: Vec<ActivityRecord>,
    heartbeats: Vec<RecordedHeartbeat>,
    pings: usize,
    terminated: bool,
}

struct ProxyState {
    connection: Weak<ProxyConnection>,
    ledger: Mutex<Ledger>,
    /// Task lists that currently have a worker
    task_lists: watch::Sender<HashSet<String>>,
    next_id: AtomicI64,
}

/// Proxy side of an in-memory client connection.
///
/// Example:
/// ```ignore
/// let (proxy, transport) = FakeProxy::start();
/// let client = CadenceClient::connect_with(settings, transport).await?;
/// ```
pub struct FakeProxy {
    connection: Arc<ProxyConnection>,
    state: Arc<ProxyState>,
}

impl FakeProxy {
    /// Start the proxy and return the client end of the pipe.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start() -> (Self, DuplexStream) {
        let (client_end, proxy_end) = tokio::io::duplex(PIPE_CAPACITY);
        let connection = ProxyConnection::open(proxy_end);
        let state = Arc::new(ProxyState {
            connection: Arc::downgrade(&connection),
            ledger: Mutex::new(Ledger::default()),
            task_lists: watch::channel(HashSet::new()).0,
            next_id: AtomicI64::new(1),
        });

        let handler = Arc::new(ProxyHandler {
            state: Arc::clone(&state),
        });
        for message_type in HANDLED_REQUESTS {
            connection.register_handler(*message_type, handler.clone());
        }
        (Self { connection, state }, client_end)
    }

    /// Identity the client announced while connecting.
    pub fn identity(&self) -> Option<String> {
        self.state.ledger.lock().identity.clone()
    }

    pub fn domains(&self) -> Vec<String> {
        let mut domains: Vec<String> = self.state.ledger.lock().domains.iter().cloned().collect();
        domains.sort();
        domains
    }

    pub fn registrations(&self) -> Vec<Registration> {
        self.state.ledger.lock().registrations.clone()
    }

    /// Task lists with a running worker.
    pub fn workers(&self) -> Vec<String> {
        let mut task_lists: Vec<String> = self.state.task_lists.borrow().iter().cloned().collect();
        task_lists.sort();
        task_lists
    }

    pub fn executions(&self) -> Vec<WorkflowExecution> {
        self.state
            .ledger
            .lock()
            .runs
            .iter()
            .map(|run| run.execution.clone())
            .collect()
    }

    /// Every activity task handed to the client, in scheduling order.
    pub fn activity_tasks(&self) -> Vec<ActivityTask> {
        self.state
            .ledger
            .lock()
            .activities
            .iter()
            .map(|record| record.task.clone())
            .collect()
    }

    pub fn heartbeats(&self) -> Vec<RecordedHeartbeat> {
        self.state.ledger.lock().heartbeats.clone()
    }

    pub fn pings(&self) -> usize {
        self.state.ledger.lock().pings
    }

    /// Whether the client said goodbye.
    pub fn is_terminated(&self) -> bool {
        self.state.ledger.lock().terminated
    }

    /// Tell the client that a running activity was cancelled.
    ///
    /// Returns false if no unfinished activity holds the token.
    pub async fn cancel_activity(&self, task_token: &[u8]) -> bool {
        let context_id = self
            .state
            .ledger
            .lock()
            .activities
            .iter()
            .find(|record| record.task.task_token == task_token && !record.finished)
            .map(|record| record.context_id);
        let Some(context_id) = context_id else {
            return false;
        };
        let event = ProxyMessage::new(MessageType::ActivityCancelNotification)
            .with_i64(names::CONTEXT_ID, context_id);
        self.connection.notify(event).await.is_ok()
    }

    pub async fn close(&self) {
        self.connection.close().await;
    }
}

struct ProxyHandler {
    state: Arc<ProxyState>,
}

#[async_trait]
impl InboundHandler for ProxyHandler {
    async fn handle(&self, request: ProxyMessage) -> CoreResult<Option<ProxyMessage>> {
        let reply = ProxyMessage::reply_to(&request)?;
        let state = &self.state;
        let handled = match request.message_type {
            MessageType::InitializeRequest | MessageType::CancelRequest => Ok(reply),
            MessageType::ConnectRequest => state.connect(&request, reply),
            MessageType::TerminateRequest => {
                state.ledger.lock().terminated = true;
                Ok(reply)
            }
            MessageType::PingRequest => {
                state.ledger.lock().pings += 1;
                Ok(reply)
            }
            MessageType::DomainRegisterRequest => state.register_domain(&request, reply),
            MessageType::NewWorkerRequest => state.new_worker(&request, reply),
            MessageType::StopWorkerRequest => state.stop_worker(&request, reply),
            MessageType::WorkflowRegisterRequest => {
                state.register(RegistrationKind::Workflow, &request, reply)
            }
            MessageType::ActivityRegisterRequest => {
                state.register(RegistrationKind::Activity, &request, reply)
            }
            MessageType::WorkflowExecuteRequest => state.execute(&request, reply),
            MessageType::WorkflowGetResultRequest => state.get_result(&request, reply).await,
            MessageType::WorkflowSignalRequest => state.signal(&request, reply).await,
            MessageType::WorkflowQueryRequest => state.query(&request, reply).await,
            MessageType::WorkflowCancelRequest => state.cancel(&request, reply),
            MessageType::WorkflowTerminateRequest => state.terminate(&request, reply),
            MessageType::WorkflowSleepRequest => state.sleep(&request, reply).await,
            MessageType::WorkflowExecuteChildRequest => state.execute_child(&request, reply),
            MessageType::WorkflowWaitForChildRequest => state.wait_for_child(&request, reply).await,
            MessageType::ActivityExecuteRequest => state.execute_activity(&request, reply).await,
            MessageType::ActivityRecordHeartbeatRequest => state.heartbeat(&request, reply),
            MessageType::ActivityCompleteRequest => state.complete_activity(&request, reply),
            other => Err(ProxyError::new(
                ErrorType::Generic,
                format!("{other} is not handled by the proxy"),
            )),
        };

        match handled {
            Ok(reply) => Ok(Some(reply)),
            Err(error) => {
                debug!(message_type = %request.message_type, error = %error, "replying with error");
                Ok(Some(ProxyMessage::reply_to(&request)?.with_error(&error)?))
            }
        }
    }
}

impl ProxyState {
    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn connect(&self, request: &ProxyMessage, reply: ProxyMessage) -> Handled {
        let identity = request.properties.get_string(names::IDENTITY);
        info!(identity = ?identity, "client connected");
        self.ledger.lock().identity = identity;
        Ok(reply)
    }

    fn register_domain(&self, request: &ProxyMessage, reply: ProxyMessage) -> Handled {
        let name = required_string(&request.properties, names::NAME)?;
        if !self.ledger.lock().domains.insert(name.clone()) {
            return Err(ProxyError::custom(
                "DomainAlreadyExistsError",
                format!("domain [{name}] already exists"),
            ));
        }
        Ok(reply)
    }

    fn register(&self, kind: RegistrationKind, request: &ProxyMessage, reply: ProxyMessage) -> Handled {
        let props = &request.properties;
        let registration = Registration {
            kind,
            name: required_string(props, names::NAME)?,
            domain: required_string(props, names::DOMAIN)?,
        };
        self.ledger.lock().registrations.push(registration);
        Ok(reply)
    }

    fn new_worker(&self, request: &ProxyMessage, reply: ProxyMessage) -> Handled {
        let task_list = required_string(&request.properties, names::TASK_LIST)?;
        let worker_id = self.next_id();
        self.ledger.lock().workers.insert(worker_id, task_list.clone());
        self.task_lists.send_modify(|lists| {
            lists.insert(task_list);
        });
        Ok(reply.with_i64(names::WORKER_ID, worker_id))
    }

    fn stop_worker(&self, request: &ProxyMessage, reply: ProxyMessage) -> Handled {
        let worker_id = required_i64(&request.properties, names::WORKER_ID)?;
        let mut ledger = self.ledger.lock();
        let task_list = ledger
            .workers
            .remove(&worker_id)
            .ok_or_else(|| ProxyError::entity_not_exists(format!("worker {worker_id} does not exist")))?;
        if !ledger.workers.values().any(|other| *other == task_list) {
            self.task_lists.send_modify(|lists| {
                lists.remove(&task_list);
            });
        }
        Ok(reply)
    }

    fn execute(self: &Arc<Self>, request: &ProxyMessage, mut reply: ProxyMessage) -> Handled {
        let props = &request.properties;
        let workflow_type = required_string(props, names::WORKFLOW_TYPE)?;
        let options: EffectiveWorkflowOptions = required_json(props, names::OPTIONS)?;
        let run = self.start_run(&workflow_type, &options, props.get(names::ARGS))?;
        reply
            .properties
            .set_json(names::EXECUTION, &run.execution)
            .map_err(bad_request)?;
        Ok(reply)
    }

    fn start_run(
        self: &Arc<Self>,
        workflow_type: &str,
        options: &EffectiveWorkflowOptions,
        args: Option<&str>,
    ) -> Result<Arc<Run>, ProxyError> {
        let workflow_id = options
            .workflow_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let run = {
            let mut ledger = self.ledger.lock();
            if let Some(previous) = ledger
                .runs
                .iter()
                .rev()
                .find(|run| run.execution.workflow_id == workflow_id)
            {
                check_reuse(previous, options.id_reuse_policy)?;
            }
            let run = Arc::new(Run {
                execution: WorkflowExecution::new(workflow_id, Uuid::new_v4().to_string()),
                workflow_type: workflow_type.to_string(),
                domain: options.domain.clone(),
                task_list: options.task_list.clone(),
                context_id: self.next_id(),
                outcome: watch::channel(None).0,
            });
            ledger.runs.push(Arc::clone(&run));
            run
        };
        info!(
            workflow_type,
            execution = %run.execution,
            task_list = %run.task_list,
            "run started"
        );
        tokio::spawn(Arc::clone(self).drive(Arc::clone(&run), args.map(str::to_string)));
        Ok(run)
    }

    /// Hand the run to a worker and record how it ends.
    async fn drive(self: Arc<Self>, run: Arc<Run>, args: Option<String>) {
        tokio::select! {
            _ = self.wait_for_worker(&run.task_list) => {}
            _ = run.wait() => return,
        }
        let mut invoke = ProxyMessage::new(MessageType::WorkflowInvokeRequest)
            .with_i64(names::CONTEXT_ID, run.context_id)
            .with_string(names::WORKFLOW_TYPE, &run.workflow_type)
            .with_string(names::WORKFLOW_ID, &run.execution.workflow_id)
            .with_string(names::RUN_ID, &run.execution.run_id)
            .with_string(names::DOMAIN, &run.domain)
            .with_string(names::TASK_LIST, &run.task_list);
        invoke.properties.set(names::ARGS, args);

        let outcome = match self.call_client(invoke).await {
            Ok(answer) => result_of(&answer),
            Err(error) => Err(error),
        };
        if run.finish(outcome) {
            debug!(execution = %run.execution, "run closed");
        }
    }

    async fn wait_for_worker(&self, task_list: &str) {
        let mut lists = self.task_lists.subscribe();
        let _ = lists.wait_for(|lists| lists.contains(task_list)).await;
    }

    async fn call_client(&self, request: ProxyMessage) -> Result<ProxyMessage, ProxyError> {
        let connection = self
            .connection
            .upgrade()
            .ok_or_else(|| ProxyError::new(ErrorType::Generic, "the proxy connection is closed"))?;
        let answer = connection.call(request).await.map_err(bad_request)?;
        match answer.error().map_err(bad_request)? {
            Some(error) => Err(error),
            None => Ok(answer),
        }
    }

    fn find_run(&self, props: &Properties) -> Result<Arc<Run>, ProxyError> {
        let workflow_id = required_string(props, names::WORKFLOW_ID)?;
        let run_id = props.get_string(names::RUN_ID).unwrap_or_default();
        self.ledger
            .lock()
            .runs
            .iter()
            .rev()
            .find(|run| {
                run.execution.workflow_id == workflow_id
                    && (run_id.is_empty() || run.execution.run_id == run_id)
            })
            .cloned()
            .ok_or_else(|| {
                ProxyError::entity_not_exists(format!("workflow [{workflow_id}/{run_id}] does not exist"))
            })
    }

    fn run_by_context(&self, context_id: i64) -> Result<Arc<Run>, ProxyError> {
        self.ledger
            .lock()
            .runs
            .iter()
            .find(|run| run.context_id == context_id)
            .cloned()
            .ok_or_else(|| ProxyError::entity_not_exists(format!("no run has context {context_id}")))
    }

    async fn get_result(&self, request: &ProxyMessage, reply: ProxyMessage) -> Handled {
        let run = self.find_run(&request.properties)?;
        let outcome = run.wait().await;
        with_outcome(reply, outcome)
    }

    async fn signal(self: &Arc<Self>, request: &ProxyMessage, reply: ProxyMessage) -> Handled {
        let props = &request.properties;
        let run = self.open_run(props)?;
        let synchronous = props.get_bool(names::SYNCHRONOUS).map_err(bad_request)?;
        let mut invoke = ProxyMessage::new(MessageType::WorkflowSignalInvokeRequest)
            .with_i64(names::CONTEXT_ID, run.context_id)
            .with_string(names::SIGNAL_NAME, required_string(props, names::SIGNAL_NAME)?);
        invoke.properties.set(names::ARGS, props.get(names::ARGS).map(str::to_string));

        if synchronous {
            let answer = self.call_client(invoke).await?;
            return with_outcome(reply, result_of(&answer));
        }
        let state = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(error) = state.call_client(invoke).await {
                warn!(error = %error, "signal delivery failed");
            }
        });
        Ok(reply)
    }

    async fn query(&self, request: &ProxyMessage, reply: ProxyMessage) -> Handled {
        let props = &request.properties;
        let run = self.open_run(props)?;
        let mut invoke = ProxyMessage::new(MessageType::WorkflowQueryInvokeRequest)
            .with_i64(names::CONTEXT_ID, run.context_id)
            .with_string(names::QUERY_NAME, required_string(props, names::QUERY_NAME)?);
        invoke.properties.set(names::ARGS, props.get(names::ARGS).map(str::to_string));
        let answer = self.call_client(invoke).await?;
        with_outcome(reply, result_of(&answer))
    }

    fn open_run(&self, props: &Properties) -> Result<Arc<Run>, ProxyError> {
        let run = self.find_run(props)?;
        if run.is_closed() {
            return Err(ProxyError::entity_not_exists(format!(
                "workflow [{}] is already closed",
                run.execution
            )));
        }
        Ok(run)
    }

    fn cancel(&self, request: &ProxyMessage, reply: ProxyMessage) -> Handled {
        let run = self.find_run(&request.properties)?;
        close_run(&run, ProxyError::new(ErrorType::Cancelled, "workflow was cancelled"))?;
        Ok(reply)
    }

    fn terminate(&self, request: &ProxyMessage, reply: ProxyMessage) -> Handled {
        let run = self.find_run(&request.properties)?;
        let reason = request
            .properties
            .get_string(names::REASON)
            .unwrap_or_else(|| "terminated".to_string());
        close_run(&run, ProxyError::new(ErrorType::Terminated, reason))?;
        Ok(reply)
    }

    async fn sleep(&self, request: &ProxyMessage, reply: ProxyMessage) -> Handled {
        let props = &request.properties;
        self.run_by_context(required_i64(props, names::CONTEXT_ID)?)?;
        let duration = props
            .get_duration(names::DURATION)
            .map_err(bad_request)?
            .unwrap_or_default();
        tokio::time::sleep(duration).await;
        Ok(reply)
    }

    fn execute_child(self: &Arc<Self>, request: &ProxyMessage, mut reply: ProxyMessage) -> Handled {
        let props = &request.properties;
        let parent = self.run_by_context(required_i64(props, names::CONTEXT_ID)?)?;
        let workflow_type = required_string(props, names::WORKFLOW_TYPE)?;
        let options: EffectiveWorkflowOptions = required_json(props, names::OPTIONS)?;
        let run = self.start_run(&workflow_type, &options, props.get(names::ARGS))?;

        let child_id = self.next_id();
        self.ledger.lock().children.insert(child_id, Arc::clone(&run));
        debug!(parent = %parent.execution, child = %run.execution, child_id, "child started");

        reply.properties.set_i64(names::CHILD_ID, child_id);
        reply
            .properties
            .set_json(names::EXECUTION, &run.execution)
            .map_err(bad_request)?;
        Ok(reply)
    }

    async fn wait_for_child(&self, request: &ProxyMessage, reply: ProxyMessage) -> Handled {
        let child_id = required_i64(&request.properties, names::CHILD_ID)?;
        let child = self
            .ledger
            .lock()
            .children
            .get(&child_id)
            .cloned()
            .ok_or_else(|| ProxyError::entity_not_exists(format!("child {child_id} does not exist")))?;
        let outcome = child.wait().await;
        with_outcome(reply, outcome)
    }

    async fn execute_activity(&self, request: &ProxyMessage, reply: ProxyMessage) -> Handled {
        let props = &request.properties;
        let parent = self.run_by_context(required_i64(props, names::CONTEXT_ID)?)?;
        let activity_type = required_string(props, names::ACTIVITY_TYPE)?;
        let options: EffectiveActivityOptions = required_json(props, names::OPTIONS)?;

        let context_id = self.next_id();
        let task = ActivityTask {
            task_token: Uuid::new_v4().as_bytes().to_vec(),
            workflow_execution: parent.execution.clone(),
            workflow_type: parent.workflow_type.clone(),
            workflow_domain: parent.domain.clone(),
            activity_id: options
                .activity_id
                .clone()
                .unwrap_or_else(|| context_id.to_string()),
            activity_type: activity_type.clone(),
            task_list: options.task_list.clone(),
            attempt: 1,
            scheduled_at: Utc::now(),
            heartbeat_timeout: options.heartbeat_timeout,
            schedule_to_close_timeout: options.schedule_to_close_timeout,
            start_to_close_timeout: options.start_to_close_timeout,
            heartbeat_details: None,
        };
        let (completion, completed) = oneshot::channel();
        self.ledger.lock().activities.push(ActivityRecord {
            task: task.clone(),
            context_id,
            finished: false,
            completion: Some(completion),
        });

        self.wait_for_worker(&task.task_list).await;
        let mut invoke = ProxyMessage::new(MessageType::ActivityInvokeRequest)
            .with_i64(names::CONTEXT_ID, context_id)
            .with_string(names::ACTIVITY_TYPE, &activity_type);
        invoke
            .properties
            .set_json(names::ACTIVITY_TASK, &task)
            .map_err(bad_request)?;
        invoke.properties.set(names::ARGS, props.get(names::ARGS).map(str::to_string));

        let outcome = match self.call_client(invoke).await {
            Ok(answer) if answer.properties.get_bool(names::PENDING).unwrap_or(false) => {
                debug!(activity_id = %task.activity_id, "waiting for external completion");
                match tokio::time::timeout(options.schedule_to_close_timeout, completed).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(_)) => Err(ProxyError::new(ErrorType::Cancelled, "activity was abandoned")),
                    Err(_) => Err(ProxyError::new(
                        ErrorType::Timeout,
                        "activity was not completed before its schedule-to-close timeout",
                    )),
                }
            }
            Ok(answer) => result_of(&answer),
            Err(error) => Err(error),
        };
        self.retire_activity(&task.task_token);
        with_outcome(reply, outcome)
    }

    fn retire_activity(&self, task_token: &[u8]) {
        let mut ledger = self.ledger.lock();
        if let Some(record) = ledger
            .activities
            .iter_mut()
            .find(|record| record.task.task_token == task_token)
        {
            record.finished = true;
            record.completion = None;
        }
    }

    fn heartbeat(&self, request: &ProxyMessage, reply: ProxyMessage) -> Handled {
        let props = &request.properties;
        let details = props.get_bytes(names::DETAILS).map_err(bad_request)?;
        let mut ledger = self.ledger.lock();
        let task_token = find_activity(&mut ledger, props)?.task.task_token.clone();
        ledger.heartbeats.push(RecordedHeartbeat { task_token, details });
        Ok(reply)
    }

    fn complete_activity(&self, request: &ProxyMessage, reply: ProxyMessage) -> Handled {
        let props = &request.properties;
        let outcome = match request.error().map_err(bad_request)? {
            Some(error) => Err(error),
            None => Ok(props.get(names::RESULT).map(str::to_string)),
        };
        let completion = {
            let mut ledger = self.ledger.lock();
            let record = find_activity(&mut ledger, props)?;
            record.finished = true;
            record.completion.take()
        };
        if let Some(completion) = completion {
            let _ = completion.send(outcome);
        }
        Ok(reply)
    }
}

fn check_reuse(previous: &Run, policy: WorkflowIdReusePolicy) -> Result<(), ProxyError> {
    let already_started = || {
        ProxyError::custom(
            "WorkflowExecutionAlreadyStartedError",
            format!("workflow [{}] is already started", previous.execution.workflow_id),
        )
    };
    match previous.outcome() {
        None => Err(already_started()),
        Some(Ok(_)) if policy != WorkflowIdReusePolicy::AllowDuplicate => Err(already_started()),
        Some(Err(_)) if policy == WorkflowIdReusePolicy::RejectDuplicate => Err(already_started()),
        Some(_) => Ok(()),
    }
}

fn close_run(run: &Run, error: ProxyError) -> Result<(), ProxyError> {
    if run.finish(Err(error)) {
        return Ok(());
    }
    Err(ProxyError::entity_not_exists(format!(
        "workflow [{}] is already closed",
        run.execution
    )))
}

fn find_activity<'a>(
    ledger: &'a mut Ledger,
    props: &Properties,
) -> Result<&'a mut ActivityRecord, ProxyError> {
    let found = match props.get_bytes(names::TASK_TOKEN).map_err(bad_request)? {
        Some(token) => ledger
            .activities
            .iter_mut()
            .find(|record| record.task.task_token == token),
        None => {
            let workflow_id = required_string(props, names::WORKFLOW_ID)?;
            let run_id = props.get_string(names::RUN_ID).unwrap_or_default();
            let activity_id = required_string(props, names::ACTIVITY_ID)?;
            ledger.activities.iter_mut().rev().find(|record| {
                let execution = &record.task.workflow_execution;
                execution.workflow_id == workflow_id
                    && (run_id.is_empty() || execution.run_id == run_id)
                    && record.task.activity_id == activity_id
            })
        }
    };
    match found {
        Some(record) if !record.finished => Ok(record),
        _ => Err(ProxyError::entity_not_exists("activity is not running")),
    }
}

fn result_of(answer: &ProxyMessage) -> Outcome {
    Ok(answer.properties.get(names::RESULT).map(str::to_string))
}

fn with_outcome(mut reply: ProxyMessage, outcome: Outcome) -> Handled {
    let result = outcome?;
    reply.properties.set(names::RESULT, result);
    Ok(reply)
}

fn bad_request(err: CoreError) -> ProxyError {
    ProxyError::new(ErrorType::Generic, err.to_string())
}

fn required_string(props: &Properties, name: &str) -> Result<String, ProxyError> {
    props.require_string(name).map_err(bad_request)
}

fn required_i64(props: &Properties, name: &str) -> Result<i64, ProxyError> {
    props
        .get_i64(name)
        .map_err(bad_request)?
        .ok_or_else(|| ProxyError::new(ErrorType::Generic, format!("missing property [{name}]")))
}

fn required_json<T: serde::de::DeserializeOwned>(props: &Properties, name: &str) -> Result<T, ProxyError> {
    props
        .get_json(name)
        .map_err(bad_request)?
        .ok_or_else(|| ProxyError::new(ErrorType::Generic, format!("missing property [{name}]")))
}
