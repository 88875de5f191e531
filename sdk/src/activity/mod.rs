//! Activity definitions, registration and the per-invocation context.

pub(crate) mod context;
mod definition;
pub(crate) mod registry;

pub use context::{ActivityContext, ActivityStatus, HeartbeatReporter};
pub use definition::{Activity, ActivityHandlers, ActivityOutcome};
pub use registry::{ActivityRegistry, RegisteredActivity};

pub(crate) use registry::ActivityContexts;
