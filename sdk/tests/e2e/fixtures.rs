//! Workflows and activities shared by the end-to-end tests.

use cadence_sdk::prelude::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

pub struct GreeterWorkflow;

pub const HELLO: Method<(String,), String> = Method::new("hello");
pub const BEATS: Method<(), Vec<bool>> = Method::new("beats");
pub const APPROVAL: Method<(), String> = Method::new("approval");
pub const FAMILY: Method<(String,), String> = Method::new("family");
pub const LOCAL: Method<(String,), String> = Method::new("local");
pub const FLAKY: Method<(), u32> = Method::new("flaky");
pub const WAITING: Method<(), ()> = Method::new("waiting");

impl WorkflowInterface for GreeterWorkflow {
    fn shape() -> InterfaceShape {
        InterfaceShape::workflow("e2e::IGreeter")
            .method(MethodShape::entrypoint("hello").param(ParamType::String))
            .method(MethodShape::entrypoint("beats").named("beats"))
            .method(MethodShape::entrypoint("approval").named("approval"))
            .method(
                MethodShape::entrypoint("family")
                    .named("family")
                    .param(ParamType::String),
            )
            .method(
                MethodShape::entrypoint("local")
                    .named("local")
                    .param(ParamType::String),
            )
            .method(MethodShape::entrypoint("flaky").named("flaky"))
            .method(MethodShape::entrypoint("waiting").named("waiting"))
    }
}

pub struct GreetingActivity;

pub const COMPOSE: Method<(String,), String> = Method::new("compose");
pub const BEAT: Method<(), Vec<bool>> = Method::new("beat");
pub const APPROVE: Method<(), String> = Method::new("approve");
pub const WAIT: Method<(), ()> = Method::new("wait");

impl ActivityInterface for GreetingActivity {
    fn shape() -> InterfaceShape {
        InterfaceShape::activity("e2e::IGreeting")
            .method(MethodShape::activity("compose").param(ParamType::String))
            .method(MethodShape::activity("beat").named("beat"))
            .method(MethodShape::activity("approve").named("approve"))
            .method(MethodShape::activity("wait").named("wait"))
    }
}

#[derive(Default)]
pub struct Greeter;

impl Workflow for Greeter {
    type Interface = GreeterWorkflow;

    fn handlers() -> WorkflowHandlers<Self> {
        WorkflowHandlers::<Self>::new()
            .on(HELLO, |_this, ctx, (name,): (String,)| async move {
                let greetings = ctx.new_activity_stub::<GreetingActivity>(ActivityOptions::new())?;
                greetings.call(COMPOSE, (name,)).await
            })
            .on(BEATS, |_this, ctx, ()| async move {
                let options = ActivityOptions::new().with_heartbeat_timeout(Duration::from_secs(2));
                let greetings = ctx.new_activity_stub::<GreetingActivity>(options)?;
                greetings.call(BEAT, ()).await
            })
            .on(APPROVAL, |_this, ctx, ()| async move {
                let greetings = ctx.new_activity_stub::<GreetingActivity>(ActivityOptions::new())?;
                greetings.call(APPROVE, ()).await
            })
            .on(FAMILY, |_this, ctx, (name,): (String,)| async move {
                let child = ctx.new_child_workflow_stub::<GreeterWorkflow>(ChildWorkflowOptions::new())?;
                let greeting: String = child.execute(HELLO, (name,)).await?;
                Ok(format!("{greeting} says the family"))
            })
            .on(LOCAL, |_this, ctx, (name,): (String,)| async move {
                let local = ctx.new_local_activity_stub::<Greeting>(LocalActivityOptions::new())?;
                local.call(COMPOSE, (name,)).await
            })
            .on(FLAKY, |_this, ctx, ()| async move {
                let retry = RetryPolicy::default()
                    .with_maximum_attempts(3)
                    .with_initial_interval(Duration::from_millis(10));
                let options = LocalActivityOptions::new().with_retry_policy(retry);
                let local = ctx.new_local_activity_stub::<Flaky>(options)?;
                local.call(ATTEMPT, ()).await
            })
            .on(WAITING, |_this, ctx, ()| async move {
                let greetings = ctx.new_activity_stub::<GreetingActivity>(ActivityOptions::new())?;
                greetings.call(WAIT, ()).await
            })
    }
}

#[derive(Default)]
pub struct Greeting;

impl Activity for Greeting {
    type Interface = GreetingActivity;

    fn handlers() -> ActivityHandlers<Self> {
        ActivityHandlers::<Self>::new()
            .on(COMPOSE, |_this, _ctx, (name,): (String,)| async move {
                Ok(format!("Hello {name}!"))
            })
            .on(BEAT, |_this, ctx, ()| async move {
                let first = ctx.heartbeat().await?;
                let second = ctx.heartbeat().await?;
                tokio::time::sleep(Duration::from_millis(1100)).await;
                let third = ctx.heartbeat().await?;
                Ok(vec![first, second, third])
            })
            .on_outcome(APPROVE, |_this, ctx, ()| async move {
                ctx.complete_externally::<String>()
            })
            .on(WAIT, |_this, ctx, ()| async move {
                ctx.cancelled().await;
                Err::<(), _>(CadenceError::cancelled("stopped by the engine"))
            })
    }
}

pub struct FlakyActivity;

pub const ATTEMPT: Method<(), u32> = Method::new("attempt");

impl ActivityInterface for FlakyActivity {
    fn shape() -> InterfaceShape {
        InterfaceShape::activity("e2e::IFlaky").method(MethodShape::activity("attempt"))
    }
}

/// Attempts made by [`Flaky`] across all instances.
pub static FLAKY_ATTEMPTS: AtomicU32 = AtomicU32::new(0);

/// Fails its first two attempts.
#[derive(Default)]
pub struct Flaky;

impl Activity for Flaky {
    type Interface = FlakyActivity;

    fn handlers() -> ActivityHandlers<Self> {
        ActivityHandlers::<Self>::new().on(ATTEMPT, |_this, _ctx, ()| async move {
            let attempt = FLAKY_ATTEMPTS.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt < 3 {
                return Err(CadenceError::custom("Flaky", format!("attempt {attempt} failed")));
            }
            Ok(attempt)
        })
    }
}

pub struct NamedWorkflow;

pub const RUN: Method<(), String> = Method::new("run");
pub const SET_NAME: Method<(String,), Option<String>> = Method::new("set_name");
pub const CURRENT: Method<(), Option<String>> = Method::new("current");

impl WorkflowInterface for NamedWorkflow {
    fn shape() -> InterfaceShape {
        InterfaceShape::workflow("e2e::INamed")
            .method(MethodShape::entrypoint("run"))
            .method(
                MethodShape::signal("set_name", "name")
                    .synchronous()
                    .param(ParamType::String),
            )
            .method(MethodShape::query("current", "current"))
    }
}

/// Waits until a name arrives by signal.
#[derive(Default)]
pub struct Named {
    name: Mutex<Option<String>>,
}

impl Workflow for Named {
    type Interface = NamedWorkflow;

    fn handlers() -> WorkflowHandlers<Self> {
        WorkflowHandlers::<Self>::new()
            .on(RUN, |this, ctx, ()| async move {
                loop {
                    let current = this.name.lock().clone();
                    if let Some(name) = current {
                        return Ok(name);
                    }
                    ctx.sleep(Duration::from_millis(20)).await?;
                }
            })
            .on(SET_NAME, |this, _ctx, (name,): (String,)| async move {
                Ok(this.name.lock().replace(name))
            })
            .on(CURRENT, |this, _ctx, ()| async move { Ok(this.name.lock().clone()) })
    }
}
