//! Activity trait and handler registration.

use super::ActivityContext;
use crate::error::{CadenceError, Result};
use crate::interface::{ActivityInterface, ImplementationShape};
use crate::stub::args::decode_args;
use crate::stub::Method;
use crate::worker::dispatch::HandlerTable;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// How an activity body finished.
#[derive(Debug)]
pub enum ActivityOutcome<T> {
    /// Completed with a result
    Value(T),
    /// Completion was handed to an external party
    Pending,
    /// Failed
    Error(CadenceError),
}

impl<T> ActivityOutcome<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, ActivityOutcome::Pending)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ActivityOutcome<U> {
        match self {
            ActivityOutcome::Value(value) => ActivityOutcome::Value(f(value)),
            ActivityOutcome::Pending => ActivityOutcome::Pending,
            ActivityOutcome::Error(err) => ActivityOutcome::Error(err),
        }
    }
}

impl<T> From<Result<T>> for ActivityOutcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => ActivityOutcome::Value(value),
            Err(err) => ActivityOutcome::Error(err),
        }
    }
}

/// Handlers of one activity implementation.
pub type ActivityHandlers<A> = HandlerTable<A, ActivityContext, ActivityOutcome<Value>>;

/// An activity implementation.
///
/// A fresh instance is created for every invocation.
///
/// ```ignore
/// impl Activity for Greeter {
///     type Interface = GreeterActivity;
///
///     fn handlers() -> ActivityHandlers<Self> {
///         ActivityHandlers::<Self>::new().on(GREET, |_this, _ctx, (name,): (String,)| async move {
///             Ok(format!("Hello {name}!"))
///         })
///     }
/// }
/// ```
pub trait Activity: Default + Send + Sync + 'static {
    type Interface: ActivityInterface;

    /// Declared shape of the implementing type.
    fn implementation() -> ImplementationShape {
        ImplementationShape::activity::<Self::Interface>(std::any::type_name::<Self>())
    }

    fn handlers() -> ActivityHandlers<Self>;
}

impl<T: Send + Sync + 'static> HandlerTable<T, ActivityContext, ActivityOutcome<Value>> {
    /// Handle `method` with a body that returns a result.
    pub fn on<A, R, F, Fut>(self, method: Method<A, R>, handler: F) -> Self
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(Arc<T>, ActivityContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        self.on_outcome(method, move |this, ctx, args| {
            let body = handler(this, ctx, args);
            async move { ActivityOutcome::from(body.await) }
        })
    }

    /// Handle `method` with a body that may complete externally.
    pub fn on_outcome<A, R, F, Fut>(mut self, method: Method<A, R>, handler: F) -> Self
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(Arc<T>, ActivityContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActivityOutcome<R>> + Send + 'static,
    {
        self.insert(
            method.member(),
            Box::new(
                move |this: Arc<T>,
                      ctx: ActivityContext,
                      args: Vec<Value>|
                      -> BoxFuture<'static, ActivityOutcome<Value>> {
                    let body = decode_args::<A>(args).map(|args| handler(this, ctx, args));
                    Box::pin(async move {
                        let outcome = match body {
                            Ok(body) => body.await,
                            Err(err) => return ActivityOutcome::Error(err),
                        };
                        match outcome {
                            ActivityOutcome::Value(value) => match serde_json::to_value(value) {
                                Ok(value) => ActivityOutcome::Value(value),
                                Err(err) => ActivityOutcome::Error(err.into()),
                            },
                            ActivityOutcome::Pending => ActivityOutcome::Pending,
                            ActivityOutcome::Error(err) => ActivityOutcome::Error(err),
                        }
                    })
                },
            ),
        );
        self
    }
}
