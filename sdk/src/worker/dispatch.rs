//! Member-name dispatch tables for workflow and activity implementations.

use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Type-erased handler for one interface member.
pub type BoxedHandler<T, C, O> =
    Box<dyn Fn(Arc<T>, C, Vec<Value>) -> BoxFuture<'static, O> + Send + Sync>;

/// Handlers of one implementation type, keyed by interface member.
///
/// The typed `on` builders live next to the workflow and activity
/// definitions; this type only stores and invokes.
pub struct HandlerTable<T, C, O> {
    handlers: HashMap<&'static str, BoxedHandler<T, C, O>>,
}

impl<T, C, O> Default for HandlerTable<T, C, O> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<T, C, O> HandlerTable<T, C, O> {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, member: &'static str, handler: BoxedHandler<T, C, O>) {
        self.handlers.insert(member, handler);
    }

    pub fn contains(&self, member: &str) -> bool {
        self.handlers.contains_key(member)
    }

    pub fn members(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Start the handler for `member`, if one is registered.
    pub(crate) fn invoke(
        &self,
        member: &str,
        instance: Arc<T>,
        context: C,
        args: Vec<Value>,
    ) -> Option<BoxFuture<'static, O>> {
        self.handlers
            .get(member)
            .map(|handler| handler(instance, context, args))
    }
}

impl<T, C, O> fmt::Debug for HandlerTable<T, C, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut members: Vec<_> = self.handlers.keys().collect();
        members.sort();
        f.debug_struct("HandlerTable").field("members", &members).finish()
    }
}
