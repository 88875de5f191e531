//! Call options and their normalization.
//!
//! Every field resolves through the same chain, first set value wins:
//! explicit option, method defaults, interface defaults, client settings.
//! Zero durations count as unset. Resolved durations are clamped into the
//! engine range, and domain/task list must resolve to something or the call
//! fails with a configuration error.
//!
//! Normalizing never touches the caller's options; it produces a separate
//! `Effective*` record.

mod activity;
mod child_workflow;
mod defaults;
mod retry;
mod workflow;

pub use activity::{
    ActivityOptions, EffectiveActivityOptions, EffectiveLocalActivityOptions,
    LocalActivityOptions,
};
pub use child_workflow::{ChildWorkflowOptions, EffectiveChildWorkflowOptions, ParentClosePolicy};
pub use defaults::{InterfaceDefaults, MethodDefaults};
pub use retry::RetryPolicy;
pub use workflow::{EffectiveWorkflowOptions, WorkflowOptions};

use crate::error::{CadenceError, Result};
use cadence_core::{time, WorkflowIdReusePolicy};
use std::time::Duration;

/// First non-zero duration of the chain, else the fallback, clamped.
pub(crate) fn resolve_duration(tiers: &[Option<Duration>], fallback: Duration) -> Duration {
    let value = tiers
        .iter()
        .find_map(|tier| time::non_zero(*tier))
        .unwrap_or(fallback);
    time::clamp(value)
}

/// First non-blank routing target of the chain.
pub(crate) fn resolve_route(field: &str, tiers: &[Option<&str>]) -> Result<String> {
    tiers
        .iter()
        .flatten()
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            CadenceError::InvalidConfiguration(format!(
                "no {field} is set on the call options, the method, the interface or the client settings"
            ))
        })
}

/// First policy that is not the `UseDefault` sentinel.
pub(crate) fn resolve_reuse_policy(tiers: &[WorkflowIdReusePolicy]) -> WorkflowIdReusePolicy {
    tiers
        .iter()
        .copied()
        .find(|policy| !policy.is_default())
        .unwrap_or(WorkflowIdReusePolicy::FALLBACK)
}
