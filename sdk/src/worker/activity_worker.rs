//! Dispatch of proxy-originated activity invocations and cancel notifications.

use crate::activity::{ActivityContext, ActivityOutcome, ActivityStatus};
use crate::client::runtime::ClientRuntime;
use crate::error::{CadenceError, Result};
use crate::stub::args::{get_args, set_result};
use async_trait::async_trait;
use cadence_core::protocol::names;
use cadence_core::{ActivityTask, CoreResult, InboundHandler, MessageType, ProxyMessage};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Runs activity bodies for the engine.
///
/// The body's outcome decides the reply: a value completes the activity, an
/// error fails it, and a pending outcome tells the proxy that completion
/// will arrive later through the external completion operations.
pub(crate) struct ActivityWorker {
    runtime: Weak<ClientRuntime>,
}

impl ActivityWorker {
    pub(crate) fn new(runtime: Weak<ClientRuntime>) -> Self {
        Self { runtime }
    }

    async fn invoke(&self, request: &ProxyMessage) -> Result<ProxyMessage> {
        let runtime = self.runtime.upgrade().ok_or(CadenceError::ConnectionClosed)?;
        let props = &request.properties;
        let context_id = props
            .get_i64(names::CONTEXT_ID)?
            .ok_or_else(|| CadenceError::Protocol("activity invoke carries no context id".to_string()))?;
        let activity_type = props.require_string(names::ACTIVITY_TYPE)?;
        let task: ActivityTask = props.get_json(names::ACTIVITY_TASK)?.ok_or_else(|| {
            CadenceError::Protocol("activity invoke carries no activity task".to_string())
        })?;

        let registered = runtime.activities.get(&activity_type).ok_or_else(|| {
            CadenceError::InvalidOperation(format!(
                "activity type [{activity_type}] is not registered with this client"
            ))
        })?;

        let args = get_args(props)?;

        let reporter: Arc<ClientRuntime> = Arc::clone(&runtime);
        let context = ActivityContext::new(task, context_id, reporter);
        let _running = runtime.activity_contexts.track(&context);
        debug!(
            activity_type = %activity_type,
            context_id,
            attempt = context.attempt(),
            "activity started"
        );

        let outcome = registered.invoke(context.clone(), args).await;

        let mut reply = ProxyMessage::reply_to(request)?;
        match outcome {
            ActivityOutcome::Value(value) => {
                set_result(&mut reply.properties, &value)?;
                context.finish(ActivityStatus::Completed);
                debug!(activity_type = %activity_type, context_id, "activity completed");
            }
            ActivityOutcome::Pending => {
                reply.properties.set_bool(names::PENDING, true);
                info!(
                    activity_type = %activity_type,
                    context_id,
                    "activity will be completed externally"
                );
            }
            ActivityOutcome::Error(err) => {
                let status = if err.is_cancelled() || context.is_cancelled() {
                    ActivityStatus::Cancelled
                } else {
                    ActivityStatus::Failed
                };
                context.finish(status);
                warn!(activity_type = %activity_type, context_id, error = %err, "activity failed");
                reply.set_error(&err.to_proxy_error())?;
            }
        }
        Ok(reply)
    }

    fn cancel(&self, notification: &ProxyMessage) -> Result<()> {
        let runtime = self.runtime.upgrade().ok_or(CadenceError::ConnectionClosed)?;
        if let Some(context_id) = notification.properties.get_i64(names::CONTEXT_ID)? {
            if !runtime.activity_contexts.cancel(context_id) {
                debug!(context_id, "cancel notification for an activity that is not running");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl InboundHandler for ActivityWorker {
    async fn handle(&self, message: ProxyMessage) -> CoreResult<Option<ProxyMessage>> {
        match message.message_type {
            MessageType::ActivityInvokeRequest => match self.invoke(&message).await {
                Ok(reply) => Ok(Some(reply)),
                Err(e) => {
                    warn!(error = %e, "activity invocation failed");
                    Ok(Some(ProxyMessage::reply_to(&message)?.with_error(&e.to_proxy_error())?))
                }
            },
            MessageType::ActivityCancelNotification => {
                if let Err(e) = self.cancel(&message) {
                    warn!(error = %e, "failed to deliver activity cancellation");
                }
                Ok(None)
            }
            other => {
                warn!(message_type = %other, "unexpected message for the activity worker");
                Ok(None)
            }
        }
    }
}
