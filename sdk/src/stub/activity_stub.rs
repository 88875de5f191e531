//! Stubs for activities called from workflow code.

use super::args::{decode_value, encode_args, get_result, set_args};
use super::Method;
use crate::activity::{Activity, ActivityContext, ActivityHandlers, ActivityOutcome};
use crate::error::{CadenceError, Result};
use crate::interface::{ActivityInterface, MethodCategory, MethodDescriptor, TypeDescriptor};
use crate::options::{ActivityOptions, EffectiveLocalActivityOptions, LocalActivityOptions};
use crate::workflow::WorkflowContext;
use cadence_core::protocol::names;
use cadence_core::{ActivityTask, MessageType, ProxyMessage};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

fn activity_method<'d>(descriptor: &'d TypeDescriptor, member: &str) -> Result<&'d MethodDescriptor> {
    descriptor
        .method_in(member, MethodCategory::Activity)
        .ok_or_else(|| {
            CadenceError::InvalidOperation(format!(
                "[{member}] is not an activity method of [{}]",
                descriptor.interface_name
            ))
        })
}

/// Calls activities of interface `I` through the engine.
pub struct ActivityStub<I> {
    context: WorkflowContext,
    descriptor: Arc<TypeDescriptor>,
    options: ActivityOptions,
    _interface: PhantomData<fn() -> I>,
}

impl<I: ActivityInterface> ActivityStub<I> {
    pub(crate) fn new(context: WorkflowContext, descriptor: Arc<TypeDescriptor>, options: ActivityOptions) -> Self {
        Self {
            context,
            descriptor,
            options,
            _interface: PhantomData,
        }
    }

    /// Schedule the activity and wait for its result.
    pub async fn call<A: Serialize, R: DeserializeOwned>(&self, method: Method<A, R>, args: A) -> Result<R> {
        let md = activity_method(&self.descriptor, method.member())?;
        let runtime = self.context.runtime();
        let options = self.options.normalize(
            Some(&md.defaults),
            Some(&self.descriptor.defaults),
            &runtime.settings,
        )?;
        let activity_type = self.descriptor.qualified_name(md);

        let mut request = ProxyMessage::new(MessageType::ActivityExecuteRequest)
            .with_i64(names::CONTEXT_ID, self.context.context_id())
            .with_string(names::ACTIVITY_TYPE, &activity_type);
        set_args(&mut request.properties, &encode_args(&args)?)?;
        request.properties.set_json(names::OPTIONS, &options)?;

        debug!(
            activity_type = %activity_type,
            context_id = self.context.context_id(),
            "executing activity"
        );
        let reply = runtime.call(request).await?;
        decode_value(get_result(&reply.properties)?)
    }
}

impl<I> std::fmt::Debug for ActivityStub<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityStub")
            .field("activity_type", &self.descriptor.engine_type_name)
            .finish()
    }
}

/// Runs the activity implementation `A` in the workflow's process.
///
/// Named and validated like a normal activity, but no request is sent to
/// the proxy. The schedule-to-close timeout bounds all attempts together;
/// failed attempts are retried according to the retry policy, if any.
/// Heartbeats and external completion are not available.
pub struct LocalActivityStub<A: Activity> {
    context: WorkflowContext,
    descriptor: Arc<TypeDescriptor>,
    handlers: Arc<ActivityHandlers<A>>,
    options: LocalActivityOptions,
}

impl<A: Activity> LocalActivityStub<A> {
    pub(crate) fn new(
        context: WorkflowContext,
        descriptor: Arc<TypeDescriptor>,
        options: LocalActivityOptions,
    ) -> Self {
        Self {
            context,
            descriptor,
            handlers: Arc::new(A::handlers()),
            options,
        }
    }

    pub async fn call<Args: Serialize, R: DeserializeOwned>(
        &self,
        method: Method<Args, R>,
        args: Args,
    ) -> Result<R> {
        let md = activity_method(&self.descriptor, method.member())?;
        let runtime = self.context.runtime();
        let options = self.options.normalize(
            Some(&md.defaults),
            Some(&self.descriptor.defaults),
            &runtime.settings,
        );
        let activity_type = self.descriptor.qualified_name(md);
        let args = encode_args(&args)?;

        let deadline = Instant::now() + options.schedule_to_close_timeout;
        let value = tokio::time::timeout_at(
            deadline,
            self.attempts(method.member(), &activity_type, args, &options),
        )
        .await
        .map_err(|_| {
            CadenceError::Timeout(format!(
                "local activity [{activity_type}] did not finish within {:?}",
                options.schedule_to_close_timeout
            ))
        })??;
        decode_value(Some(value))
    }

    async fn attempts(
        &self,
        member: &str,
        activity_type: &str,
        args: Vec<Value>,
        options: &EffectiveLocalActivityOptions,
    ) -> Result<Value> {
        let mut attempt: u32 = 1;
        loop {
            let context = ActivityContext::local(
                self.task(activity_type, attempt, options.schedule_to_close_timeout),
                self.context.runtime().next_local_id(),
            );
            let outcome = match self
                .handlers
                .invoke(member, Arc::new(A::default()), context, args.clone())
            {
                Some(body) => body.await,
                None => ActivityOutcome::Error(CadenceError::InvalidOperation(format!(
                    "no handler for activity method [{member}]"
                ))),
            };

            let err = match outcome {
                ActivityOutcome::Value(value) => return Ok(value),
                ActivityOutcome::Pending => {
                    return Err(CadenceError::InvalidOperation(
                        "local activities cannot be completed externally".to_string(),
                    ))
                }
                ActivityOutcome::Error(err) => err,
            };

            match self.retry_delay(attempt, &err, options) {
                Some(delay) => {
                    warn!(
                        activity_type,
                        attempt,
                        error = %err,
                        "local activity failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => return Err(err),
            }
        }
    }

    fn retry_delay(
        &self,
        attempt: u32,
        err: &CadenceError,
        options: &EffectiveLocalActivityOptions,
    ) -> Option<Duration> {
        let policy = options.retry_policy.as_ref()?;
        if err.is_usage_error() || err.is_cancelled() {
            return None;
        }
        if policy.maximum_attempts != 0 && attempt >= policy.maximum_attempts {
            return None;
        }
        let reason = match err {
            CadenceError::Remote(e) => e.reason.as_deref(),
            _ => None,
        };
        if reason.is_some_and(|r| policy.non_retriable_error_reasons.iter().any(|n| n == r)) {
            return None;
        }
        Some(policy.backoff(attempt))
    }

    fn task(&self, activity_type: &str, attempt: u32, timeout: Duration) -> ActivityTask {
        let info = self.context.info();
        ActivityTask {
            task_token: uuid::Uuid::new_v4().as_bytes().to_vec(),
            workflow_execution: info.execution.clone(),
            workflow_type: info.workflow_type.clone(),
            workflow_domain: info.domain.clone(),
            activity_id: format!("local-{}", self.context.runtime().next_local_id()),
            activity_type: activity_type.to_string(),
            task_list: info.task_list.clone(),
            attempt: i32::try_from(attempt).unwrap_or(i32::MAX),
            scheduled_at: Utc::now(),
            heartbeat_timeout: Duration::ZERO,
            schedule_to_close_timeout: timeout,
            start_to_close_timeout: timeout,
            heartbeat_details: None,
        }
    }
}

impl<A: Activity> std::fmt::Debug for LocalActivityStub<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalActivityStub")
            .field("activity_type", &self.descriptor.engine_type_name)
            .finish()
    }
}
