//! Options for normal and local activities.

use super::{resolve_duration, resolve_route, InterfaceDefaults, MethodDefaults, RetryPolicy};
use crate::config::CadenceSettings;
use crate::error::Result;
use cadence_core::time::duration_nanos;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Caller-supplied options for an activity executed by a worker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityOptions {
    /// Activity id; the engine assigns one when unset
    pub activity_id: Option<String>,
    /// Target domain
    pub domain: Option<String>,
    /// Task list that routes the work
    pub task_list: Option<String>,
    /// Total time allowed from scheduling to completion
    pub schedule_to_close_timeout: Option<Duration>,
    /// Time allowed for one execution once started
    pub start_to_close_timeout: Option<Duration>,
    /// Time allowed to wait in the task list
    pub schedule_to_start_timeout: Option<Duration>,
    /// Maximum gap between heartbeats
    pub heartbeat_timeout: Option<Duration>,
    /// Retry policy, none for a single attempt
    pub retry_policy: Option<RetryPolicy>,
}

impl ActivityOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_activity_id(mut self, activity_id: impl Into<String>) -> Self {
        self.activity_id = Some(activity_id.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_task_list(mut self, task_list: impl Into<String>) -> Self {
        self.task_list = Some(task_list.into());
        self
    }

    pub fn with_schedule_to_close_timeout(mut self, timeout: Duration) -> Self {
        self.schedule_to_close_timeout = Some(timeout);
        self
    }

    pub fn with_start_to_close_timeout(mut self, timeout: Duration) -> Self {
        self.start_to_close_timeout = Some(timeout);
        self
    }

    pub fn with_schedule_to_start_timeout(mut self, timeout: Duration) -> Self {
        self.schedule_to_start_timeout = Some(timeout);
        self
    }

    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = Some(timeout);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    pub fn normalize(
        &self,
        method: Option<&MethodDefaults>,
        interface: Option<&InterfaceDefaults>,
        settings: &CadenceSettings,
    ) -> Result<EffectiveActivityOptions> {
        let domain = resolve_route(
            "domain",
            &[
                self.domain.as_deref(),
                method.and_then(|m| m.domain.as_deref()),
                interface.and_then(|i| i.domain.as_deref()),
                settings.default_domain.as_deref(),
            ],
        )?;
        let task_list = resolve_route(
            "task list",
            &[
                self.task_list.as_deref(),
                method.and_then(|m| m.task_list.as_deref()),
                interface.and_then(|i| i.task_list.as_deref()),
                settings.default_task_list.as_deref(),
            ],
        )?;

        let defaults = &settings.activity;
        Ok(EffectiveActivityOptions {
            activity_id: self.activity_id.clone().filter(|id| !id.trim().is_empty()),
            domain,
            task_list,
            schedule_to_close_timeout: resolve_duration(
                &[
                    self.schedule_to_close_timeout,
                    method.and_then(MethodDefaults::schedule_to_close),
                    interface.and_then(InterfaceDefaults::schedule_to_close),
                ],
                defaults.schedule_to_close_timeout,
            ),
            start_to_close_timeout: resolve_duration(
                &[
                    self.start_to_close_timeout,
                    method.and_then(MethodDefaults::start_to_close),
                    interface.and_then(InterfaceDefaults::start_to_close),
                ],
                defaults.start_to_close_timeout,
            ),
            schedule_to_start_timeout: resolve_duration(
                &[
                    self.schedule_to_start_timeout,
                    method.and_then(MethodDefaults::schedule_to_start),
                    interface.and_then(InterfaceDefaults::schedule_to_start),
                ],
                defaults.schedule_to_start_timeout,
            ),
            heartbeat_timeout: resolve_duration(
                &[
                    self.heartbeat_timeout,
                    method.and_then(MethodDefaults::heartbeat),
                    interface.and_then(InterfaceDefaults::heartbeat),
                ],
                defaults.heartbeat_timeout,
            ),
            retry_policy: self
                .retry_policy
                .clone()
                .or_else(|| method.and_then(|m| m.retry_policy.clone()))
                .or_else(|| interface.and_then(|i| i.retry_policy.clone())),
        })
    }
}

/// Fully resolved activity options as sent to the proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EffectiveActivityOptions {
    /// Activity id; the engine assigns one when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
    /// Resolved domain
    pub domain: String,
    /// Resolved task list
    pub task_list: String,
    /// Total time allowed from scheduling to completion
    #[serde(with = "duration_nanos")]
    pub schedule_to_close_timeout: Duration,
    /// Time allowed for one execution once started
    #[serde(with = "duration_nanos")]
    pub start_to_close_timeout: Duration,
    /// Time allowed to wait in the task list
    #[serde(with = "duration_nanos")]
    pub schedule_to_start_timeout: Duration,
    /// Maximum gap between heartbeats
    #[serde(with = "duration_nanos")]
    pub heartbeat_timeout: Duration,
    /// Retry policy, none for a single attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<RetryPolicy>,
}

/// Caller-supplied options for an activity run in-process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalActivityOptions {
    /// Total time allowed from scheduling to completion
    pub schedule_to_close_timeout: Option<Duration>,
    /// Retry policy, none for a single attempt
    pub retry_policy: Option<RetryPolicy>,
}

impl LocalActivityOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schedule_to_close_timeout(mut self, timeout: Duration) -> Self {
        self.schedule_to_close_timeout = Some(timeout);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Local activities need no routing, so only timeouts and retries resolve.
    pub fn normalize(
        &self,
        method: Option<&MethodDefaults>,
        interface: Option<&InterfaceDefaults>,
        settings: &CadenceSettings,
    ) -> EffectiveLocalActivityOptions {
        EffectiveLocalActivityOptions {
            schedule_to_close_timeout: resolve_duration(
                &[
                    self.schedule_to_close_timeout,
                    method.and_then(MethodDefaults::schedule_to_close),
                    interface.and_then(InterfaceDefaults::schedule_to_close),
                ],
                settings.activity.schedule_to_close_timeout,
            ),
            retry_policy: self
                .retry_policy
                .clone()
                .or_else(|| method.and_then(|m| m.retry_policy.clone()))
                .or_else(|| interface.and_then(|i| i.retry_policy.clone())),
        }
    }
}

/// Fully resolved local activity options.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveLocalActivityOptions {
    /// Total time allowed from scheduling to completion
    pub schedule_to_close_timeout: Duration,
    /// Retry policy, none for a single attempt
    pub retry_policy: Option<RetryPolicy>,
}
