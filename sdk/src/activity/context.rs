//! Execution context of one running activity.

use super::ActivityOutcome;
use crate::error::{CadenceError, Result};
use async_trait::async_trait;
use cadence_core::{time, ActivityTask, WorkflowExecution};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Sends heartbeats for a running activity to the engine.
#[async_trait]
pub trait HeartbeatReporter: Send + Sync {
    async fn record_heartbeat(&self, task_token: &[u8], details: Option<Vec<u8>>) -> Result<()>;
}

/// Where an activity invocation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityStatus {
    Running,
    /// A heartbeat is on its way to the engine
    HeartbeatPending,
    /// The last heartbeat was suppressed locally
    HeartbeatThrottled,
    /// The body handed completion to an external party
    ExternallyCompleting,
    Completed,
    Cancelled,
    Failed,
}

impl ActivityStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ActivityStatus::Completed | ActivityStatus::Cancelled | ActivityStatus::Failed
        )
    }
}

struct State {
    status: ActivityStatus,
    last_heartbeat_at: Option<Instant>,
}

struct Inner {
    task: ActivityTask,
    context_id: i64,
    reporter: Option<Arc<dyn HeartbeatReporter>>,
    cancellation: CancellationToken,
    state: Mutex<State>,
}

/// Handle on one activity invocation, passed to the activity body.
///
/// Heartbeats are throttled: a heartbeat is only sent when none has been
/// sent yet or the throttle interval has passed since the last one. The
/// interval is half the heartbeat timeout unless the caller supplies one.
///
/// Cancellation is cooperative. The engine may consider the activity
/// cancelled before the body observes [`cancellation_token`](Self::cancellation_token).
#[derive(Clone)]
pub struct ActivityContext {
    inner: Arc<Inner>,
}

impl ActivityContext {
    /// Context for an activity executed by a worker.
    pub fn new(task: ActivityTask, context_id: i64, reporter: Arc<dyn HeartbeatReporter>) -> Self {
        Self::build(task, context_id, Some(reporter))
    }

    /// Context for an activity run in-process by a local activity stub.
    pub fn local(task: ActivityTask, context_id: i64) -> Self {
        Self::build(task, context_id, None)
    }

    fn build(task: ActivityTask, context_id: i64, reporter: Option<Arc<dyn HeartbeatReporter>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                task,
                context_id,
                reporter,
                cancellation: CancellationToken::new(),
                state: Mutex::new(State {
                    status: ActivityStatus::Running,
                    last_heartbeat_at: None,
                }),
            }),
        }
    }

    pub fn task(&self) -> &ActivityTask {
        &self.inner.task
    }

    pub fn task_token(&self) -> &[u8] {
        &self.inner.task.task_token
    }

    pub fn workflow_execution(&self) -> &WorkflowExecution {
        &self.inner.task.workflow_execution
    }

    pub fn activity_id(&self) -> &str {
        &self.inner.task.activity_id
    }

    pub fn activity_type(&self) -> &str {
        &self.inner.task.activity_type
    }

    pub fn attempt(&self) -> i32 {
        self.inner.task.attempt
    }

    pub fn context_id(&self) -> i64 {
        self.inner.context_id
    }

    pub fn is_local(&self) -> bool {
        self.inner.reporter.is_none()
    }

    pub fn status(&self) -> ActivityStatus {
        self.inner.state.lock().status
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancellation.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancellation.is_cancelled()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        self.inner.cancellation.cancelled().await
    }

    /// Details recorded by the last heartbeat of a previous attempt.
    pub fn last_heartbeat_details(&self) -> Result<Option<&[u8]>> {
        self.require_remote("heartbeat details")?;
        Ok(self.inner.task.heartbeat_details.as_deref())
    }

    /// Send a heartbeat now, bypassing the throttle.
    pub async fn send_heartbeat(&self, details: Option<Vec<u8>>) -> Result<()> {
        let reporter = self.require_remote("heartbeats")?;
        self.begin_heartbeat(Instant::now())?;
        let result = reporter.record_heartbeat(self.task_token(), details).await;
        self.end_heartbeat();
        result
    }

    /// Throttled heartbeat without details. Returns whether it was sent.
    pub async fn heartbeat(&self) -> Result<bool> {
        self.heartbeat_with(|| None, None).await
    }

    /// Throttled heartbeat. `details` is only evaluated when the heartbeat
    /// is actually sent; `interval` overrides the throttle interval for
    /// this call.
    pub async fn heartbeat_with<F>(&self, details: F, interval: Option<Duration>) -> Result<bool>
    where
        F: FnOnce() -> Option<Vec<u8>> + Send,
    {
        let reporter = self.require_remote("heartbeats")?;
        let interval = interval.unwrap_or_else(|| self.default_interval());
        let now = Instant::now();

        {
            let mut state = self.inner.state.lock();
            ensure_active(state.status)?;
            if let Some(last) = state.last_heartbeat_at {
                if now.saturating_duration_since(last) < interval {
                    state.status = ActivityStatus::HeartbeatThrottled;
                    debug!(
                        context_id = self.inner.context_id,
                        activity_type = %self.inner.task.activity_type,
                        "heartbeat throttled"
                    );
                    return Ok(false);
                }
            }
            state.last_heartbeat_at = Some(now);
            state.status = ActivityStatus::HeartbeatPending;
        }

        let result = reporter.record_heartbeat(self.task_token(), details()).await;
        self.end_heartbeat();
        result.map(|()| true)
    }

    /// Hand completion of this activity to an external party.
    ///
    /// Return the outcome from the activity body; the engine is completed
    /// later through the client's external completion operations.
    pub fn complete_externally<T>(&self) -> ActivityOutcome<T> {
        if let Err(err) = self.require_remote("external completion") {
            return ActivityOutcome::Error(err);
        }
        let mut state = self.inner.state.lock();
        if let Err(err) = ensure_active(state.status) {
            return ActivityOutcome::Error(err);
        }
        state.status = ActivityStatus::ExternallyCompleting;
        ActivityOutcome::Pending
    }

    pub fn is_externally_completing(&self) -> bool {
        self.status() == ActivityStatus::ExternallyCompleting
    }

    pub(crate) fn request_cancel(&self) {
        debug!(
            context_id = self.inner.context_id,
            activity_type = %self.inner.task.activity_type,
            "activity cancellation requested"
        );
        self.inner.cancellation.cancel();
    }

    /// Record the final state. Terminal states are never left.
    pub(crate) fn finish(&self, status: ActivityStatus) {
        let mut state = self.inner.state.lock();
        if !state.status.is_terminal() {
            state.status = status;
        }
    }

    /// Half the heartbeat timeout. An unset timeout counts as the engine
    /// minimum.
    fn default_interval(&self) -> Duration {
        time::clamp(self.inner.task.heartbeat_timeout) / 2
    }

    fn require_remote(&self, what: &str) -> Result<&Arc<dyn HeartbeatReporter>> {
        self.inner.reporter.as_ref().ok_or_else(|| {
            CadenceError::InvalidOperation(format!("{what} are not supported for local activities"))
        })
    }

    fn begin_heartbeat(&self, now: Instant) -> Result<()> {
        let mut state = self.inner.state.lock();
        ensure_active(state.status)?;
        state.last_heartbeat_at = Some(now);
        state.status = ActivityStatus::HeartbeatPending;
        Ok(())
    }

    fn end_heartbeat(&self) {
        let mut state = self.inner.state.lock();
        if state.status == ActivityStatus::HeartbeatPending {
            state.status = ActivityStatus::Running;
        }
    }
}

fn ensure_active(status: ActivityStatus) -> Result<()> {
    match status {
        ActivityStatus::ExternallyCompleting => Err(CadenceError::InvalidOperation(
            "activity is being completed externally".to_string(),
        )),
        s if s.is_terminal() => Err(CadenceError::InvalidOperation(format!(
            "activity has already finished ({s:?})"
        ))),
        _ => Ok(()),
    }
}

impl std::fmt::Debug for ActivityContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityContext")
            .field("context_id", &self.inner.context_id)
            .field("activity_id", &self.inner.task.activity_id)
            .field("activity_type", &self.inner.task.activity_type)
            .field("is_local", &self.is_local())
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    pub(crate) struct CountingReporter {
        pub(crate) sent: AtomicUsize,
        pub(crate) details: Mutex<Vec<Option<Vec<u8>>>>,
    }

    #[async_trait]
    impl HeartbeatReporter for CountingReporter {
        async fn record_heartbeat(&self, _token: &[u8], details: Option<Vec<u8>>) -> Result<()> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            self.details.lock().push(details);
            Ok(())
        }
    }

    pub(crate) fn task(heartbeat_timeout: Duration) -> ActivityTask {
        ActivityTask {
            task_token: vec![1, 2, 3],
            workflow_execution: WorkflowExecution::new("wf-1", "run-1"),
            workflow_type: "Greeter".to_string(),
            workflow_domain: "test".to_string(),
            activity_id: "1".to_string(),
            activity_type: "Heartbeat".to_string(),
            task_list: "tasks".to_string(),
            attempt: 1,
            scheduled_at: Utc::now(),
            heartbeat_timeout,
            schedule_to_close_timeout: Duration::from_secs(60),
            start_to_close_timeout: Duration::from_secs(60),
            heartbeat_details: None,
        }
    }

    fn context(heartbeat_timeout: Duration) -> (ActivityContext, Arc<CountingReporter>) {
        let reporter = Arc::new(CountingReporter::default());
        let ctx = ActivityContext::new(task(heartbeat_timeout), 7, reporter.clone());
        (ctx, reporter)
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_throttling() {
        let (ctx, reporter) = context(Duration::from_secs(10));

        assert!(ctx.heartbeat().await.unwrap());
        assert!(!ctx.heartbeat().await.unwrap());
        assert_eq!(reporter.sent.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.status(), ActivityStatus::HeartbeatThrottled);

        tokio::time::sleep(Duration::from_secs(5) + Duration::from_millis(50)).await;
        assert!(ctx.heartbeat().await.unwrap());
        assert_eq!(reporter.sent.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.status(), ActivityStatus::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_heartbeat_timeout_still_throttles() {
        let (ctx, reporter) = context(Duration::ZERO);

        assert!(ctx.heartbeat().await.unwrap());
        assert!(!ctx.heartbeat().await.unwrap());
        assert_eq!(reporter.sent.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(ctx.heartbeat().await.unwrap());
        assert_eq!(reporter.sent.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_interval() {
        let (ctx, reporter) = context(Duration::from_secs(10));

        assert!(ctx.heartbeat_with(|| None, Some(Duration::from_secs(1))).await.unwrap());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(ctx.heartbeat_with(|| None, Some(Duration::from_secs(1))).await.unwrap());
        // the default interval is still five seconds
        assert!(!ctx.heartbeat().await.unwrap());
        assert_eq!(reporter.sent.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_details_are_lazy() {
        let (ctx, reporter) = context(Duration::from_secs(10));
        let mut evaluated = 0;

        assert!(ctx
            .heartbeat_with(
                || {
                    evaluated += 1;
                    Some(vec![0, 1, 2, 3, 4])
                },
                None
            )
            .await
            .unwrap());
        assert!(!ctx
            .heartbeat_with(
                || {
                    evaluated += 1;
                    Some(vec![9])
                },
                None
            )
            .await
            .unwrap());

        assert_eq!(evaluated, 1);
        assert_eq!(reporter.details.lock().clone(), vec![Some(vec![0, 1, 2, 3, 4])]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_heartbeat_is_not_throttled() {
        let (ctx, reporter) = context(Duration::from_secs(10));
        ctx.send_heartbeat(Some(vec![1])).await.unwrap();
        ctx.send_heartbeat(None).await.unwrap();
        assert_eq!(reporter.sent.load(Ordering::SeqCst), 2);
        // a throttled heartbeat right after is suppressed
        assert!(!ctx.heartbeat().await.unwrap());
    }

    #[tokio::test]
    async fn test_local_context_rejects_engine_operations() {
        let ctx = ActivityContext::local(task(Duration::from_secs(10)), 1);
        assert!(ctx.is_local());
        assert!(matches!(ctx.heartbeat().await, Err(CadenceError::InvalidOperation(_))));
        assert!(ctx.last_heartbeat_details().is_err());
        assert!(matches!(
            ctx.complete_externally::<()>(),
            ActivityOutcome::Error(CadenceError::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_external_completion_stops_heartbeats() {
        let (ctx, _reporter) = context(Duration::from_secs(10));
        assert!(matches!(ctx.complete_externally::<()>(), ActivityOutcome::Pending));
        assert!(ctx.is_externally_completing());
        assert!(ctx.heartbeat().await.is_err());
    }

    #[tokio::test]
    async fn test_cancellation_is_observable() {
        let (ctx, _reporter) = context(Duration::from_secs(10));
        let token = ctx.cancellation_token();
        assert!(!token.is_cancelled());
        ctx.request_cancel();
        ctx.cancelled().await;
        assert!(ctx.is_cancelled());

        ctx.finish(ActivityStatus::Cancelled);
        ctx.finish(ActivityStatus::Completed);
        assert_eq!(ctx.status(), ActivityStatus::Cancelled);
    }
}
