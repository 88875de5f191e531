//! Workflow trait and handler registration.

use super::WorkflowContext;
use crate::error::Result;
use crate::interface::{ImplementationShape, WorkflowInterface};
use crate::stub::args::decode_args;
use crate::stub::Method;
use crate::worker::dispatch::HandlerTable;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Handlers of one workflow implementation: entrypoints, signals and queries.
pub type WorkflowHandlers<W> = HandlerTable<W, WorkflowContext, Result<Value>>;

/// A workflow implementation.
///
/// One instance is created per workflow run and shared by the entrypoint
/// and the signal and query handlers of that run, so state lives behind
/// interior mutability.
///
/// ```ignore
/// #[derive(Default)]
/// struct Greeter {
///     greeting: Mutex<String>,
/// }
///
/// impl Workflow for Greeter {
///     type Interface = GreeterWorkflow;
///
///     fn handlers() -> WorkflowHandlers<Self> {
///         WorkflowHandlers::<Self>::new()
///             .on(HELLO, |this, ctx, (name,): (String,)| async move {
///                 let stub = ctx.new_activity_stub::<GreetingActivity>(ActivityOptions::new())?;
///                 stub.call(COMPOSE, (name,)).await
///             })
///             .on(SET_GREETING, |this, _ctx, (greeting,): (String,)| async move {
///                 *this.greeting.lock() = greeting;
///                 Ok(())
///             })
///     }
/// }
/// ```
pub trait Workflow: Default + Send + Sync + 'static {
    type Interface: WorkflowInterface;

    /// Declared shape of the implementing type.
    fn implementation() -> ImplementationShape {
        ImplementationShape::workflow::<Self::Interface>(std::any::type_name::<Self>())
    }

    fn handlers() -> WorkflowHandlers<Self>;
}

impl<T: Send + Sync + 'static> HandlerTable<T, WorkflowContext, Result<Value>> {
    /// Handle the interface member named by `method`.
    pub fn on<A, R, F, Fut>(mut self, method: Method<A, R>, handler: F) -> Self
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(Arc<T>, WorkflowContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        self.insert(
            method.member(),
            Box::new(
                move |this: Arc<T>,
                      ctx: WorkflowContext,
                      args: Vec<Value>|
                      -> BoxFuture<'static, Result<Value>> {
                    let body = decode_args::<A>(args).map(|args| handler(this, ctx, args));
                    Box::pin(async move {
                        let value = body?.await?;
                        Ok(serde_json::to_value(value)?)
                    })
                },
            ),
        );
        self
    }
}
