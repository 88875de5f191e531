//! Registered activity implementations and tracked activity contexts.

use super::{Activity, ActivityContext, ActivityOutcome, ActivityStatus};
use crate::error::{CadenceError, Result};
use crate::interface::TypeDescriptor;
use cadence_core::WorkflowExecution;
use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

type InvokeFn =
    Arc<dyn Fn(ActivityContext, Vec<Value>) -> BoxFuture<'static, ActivityOutcome<Value>> + Send + Sync>;

/// One engine activity type bound to a member of an implementation.
#[derive(Clone)]
pub struct RegisteredActivity {
    pub engine_type_name: String,
    pub member: String,
    pub implementation: &'static str,
    type_id: TypeId,
    invoke: InvokeFn,
}

impl RegisteredActivity {
    /// Run the member on a fresh implementation instance.
    pub async fn invoke(&self, context: ActivityContext, args: Vec<Value>) -> ActivityOutcome<Value> {
        (self.invoke)(context, args).await
    }
}

impl std::fmt::Debug for RegisteredActivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredActivity")
            .field("engine_type_name", &self.engine_type_name)
            .field("member", &self.member)
            .field("implementation", &self.implementation)
            .finish()
    }
}

/// Activity types registered with one client.
#[derive(Default)]
pub struct ActivityRegistry {
    activities: RwLock<HashMap<String, RegisteredActivity>>,
}

impl ActivityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every activity method of `A`.
    ///
    /// Returns the engine type names that were not registered before.
    /// Registering the same implementation again is a no-op; a different
    /// implementation under a taken name fails without registering anything.
    pub fn register<A: Activity>(&self, descriptor: &TypeDescriptor) -> Result<Vec<String>> {
        let handlers = Arc::new(A::handlers());
        let type_id = TypeId::of::<A>();
        let implementation = std::any::type_name::<A>();

        let mut entries = Vec::new();
        for method in descriptor.entrypoints() {
            if !handlers.contains(&method.member) {
                return Err(CadenceError::InvalidConfiguration(format!(
                    "[{implementation}] has no handler for activity method [{}]",
                    method.member
                )));
            }
            let handlers = Arc::clone(&handlers);
            let member = method.member.clone();
            let invoke: InvokeFn = Arc::new(move |context, args| {
                match handlers.invoke(&member, Arc::new(A::default()), context, args) {
                    Some(future) => future,
                    None => {
                        let member = member.clone();
                        Box::pin(async move {
                            ActivityOutcome::Error(CadenceError::InvalidConfiguration(format!(
                                "no handler for activity method [{member}]"
                            )))
                        })
                    }
                }
            });
            entries.push(RegisteredActivity {
                engine_type_name: descriptor.qualified_name(method),
                member: method.member.clone(),
                implementation,
                type_id,
                invoke,
            });
        }

        let mut activities = self.activities.write();
        for entry in &entries {
            if let Some(existing) = activities.get(&entry.engine_type_name) {
                if existing.type_id != type_id {
                    return Err(CadenceError::InvalidConfiguration(format!(
                        "Activity type [{}] is already registered by [{}]",
                        entry.engine_type_name, existing.implementation
                    )));
                }
            }
        }

        let mut added = Vec::new();
        for entry in entries {
            if !activities.contains_key(&entry.engine_type_name) {
                added.push(entry.engine_type_name.clone());
                activities.insert(entry.engine_type_name.clone(), entry);
            }
        }
        Ok(added)
    }

    pub fn get(&self, engine_type_name: &str) -> Option<RegisteredActivity> {
        self.activities.read().get(engine_type_name).cloned()
    }

    pub fn has(&self, engine_type_name: &str) -> bool {
        self.activities.read().contains_key(engine_type_name)
    }

    pub fn registered_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.activities.read().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Activity contexts known to a client: running invocations by context id
/// and externally completing ones by task token.
#[derive(Default)]
pub(crate) struct ActivityContexts {
    running: Mutex<HashMap<i64, ActivityContext>>,
    pending: Mutex<HashMap<Vec<u8>, ActivityContext>>,
}

impl ActivityContexts {
    /// Track `context` as running until the returned guard is dropped.
    pub(crate) fn track(&self, context: &ActivityContext) -> RunningActivity<'_> {
        self.running.lock().insert(context.context_id(), context.clone());
        RunningActivity {
            contexts: self,
            context: context.clone(),
        }
    }

    fn end(&self, context: &ActivityContext) {
        self.running.lock().remove(&context.context_id());
        if context.is_externally_completing() {
            self.pending
                .lock()
                .insert(context.task_token().to_vec(), context.clone());
        }
    }

    /// Deliver a cancel notification to the addressed context only.
    pub(crate) fn cancel(&self, context_id: i64) -> bool {
        let context = self.running.lock().get(&context_id).cloned();
        match context {
            Some(context) => {
                context.request_cancel();
                true
            }
            None => false,
        }
    }

    pub(crate) fn finish_by_token(&self, task_token: &[u8], status: ActivityStatus) {
        if let Some(context) = self.pending.lock().remove(task_token) {
            context.finish(status);
        }
    }

    pub(crate) fn finish_by_id(
        &self,
        execution: &WorkflowExecution,
        activity_id: &str,
        status: ActivityStatus,
    ) {
        let mut pending = self.pending.lock();
        let token = pending
            .iter()
            .find(|(_, ctx)| {
                ctx.activity_id() == activity_id
                    && ctx.workflow_execution().workflow_id == execution.workflow_id
                    && (execution.run_id.is_empty() || ctx.workflow_execution().run_id == execution.run_id)
            })
            .map(|(token, _)| token.clone());
        if let Some(context) = token.and_then(|token| pending.remove(&token)) {
            context.finish(status);
        }
    }

    pub(crate) fn running(&self) -> usize {
        self.running.lock().len()
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Cancel every running context; used when the client closes.
    pub(crate) fn cancel_all(&self) {
        let running: Vec<ActivityContext> = self.running.lock().drain().map(|(_, c)| c).collect();
        for context in running {
            context.request_cancel();
        }
        let pending: Vec<ActivityContext> = self.pending.lock().drain().map(|(_, c)| c).collect();
        for context in pending {
            context.finish(ActivityStatus::Cancelled);
        }
    }
}

/// A running invocation. Dropping it leaves the running set, moving the
/// context to the pending set if it completes externally.
pub(crate) struct RunningActivity<'a> {
    contexts: &'a ActivityContexts,
    context: ActivityContext,
}

impl Drop for RunningActivity<'_> {
    fn drop(&mut self) {
        self.contexts.end(&self.context);
    }
}
