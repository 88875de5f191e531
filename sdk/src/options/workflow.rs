//! Options for starting workflows.

use super::{resolve_duration, resolve_reuse_policy, resolve_route};
use super::{InterfaceDefaults, MethodDefaults, RetryPolicy};
use crate::config::CadenceSettings;
use crate::error::Result;
use cadence_core::time::duration_nanos;
use cadence_core::WorkflowIdReusePolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Caller-supplied options for starting a workflow. Unset fields fall back
/// through the options chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowOptions {
    /// Workflow id; the engine generates one when unset
    pub workflow_id: Option<String>,
    /// Target domain
    pub domain: Option<String>,
    /// Task list that routes the work
    pub task_list: Option<String>,
    /// Time allowed for one execution once started
    pub start_to_close_timeout: Option<Duration>,
    /// Time allowed to wait in the task list
    pub schedule_to_start_timeout: Option<Duration>,
    /// Time allowed for one decision task
    pub decision_task_timeout: Option<Duration>,
    /// Whether an id from a closed run may be reused
    pub id_reuse_policy: WorkflowIdReusePolicy,
    /// Retry policy, none for a single attempt
    pub retry_policy: Option<RetryPolicy>,
    /// Cron expression for recurring runs
    pub cron_schedule: Option<String>,
}

impl WorkflowOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workflow_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
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

    pub fn with_start_to_close_timeout(mut self, timeout: Duration) -> Self {
        self.start_to_close_timeout = Some(timeout);
        self
    }

    pub fn with_schedule_to_start_timeout(mut self, timeout: Duration) -> Self {
        self.schedule_to_start_timeout = Some(timeout);
        self
    }

    pub fn with_decision_task_timeout(mut self, timeout: Duration) -> Self {
        self.decision_task_timeout = Some(timeout);
        self
    }

    pub fn with_id_reuse_policy(mut self, policy: WorkflowIdReusePolicy) -> Self {
        self.id_reuse_policy = policy;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    pub fn with_cron_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.cron_schedule = Some(schedule.into());
        self
    }

    /// Resolve every field through the options chain.
    pub fn normalize(
        &self,
        method: Option<&MethodDefaults>,
        interface: Option<&InterfaceDefaults>,
        settings: &CadenceSettings,
    ) -> Result<EffectiveWorkflowOptions> {
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

        let defaults = &settings.workflow;
        Ok(EffectiveWorkflowOptions {
            workflow_id: self.workflow_id.clone().filter(|id| !id.trim().is_empty()),
            domain,
            task_list,
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
            decision_task_timeout: resolve_duration(
                &[
                    self.decision_task_timeout,
                    method.and_then(MethodDefaults::decision_task),
                    interface.and_then(InterfaceDefaults::decision_task),
                ],
                defaults.decision_task_timeout,
            ),
            id_reuse_policy: resolve_reuse_policy(&[
                self.id_reuse_policy,
                method.map(|m| m.id_reuse_policy).unwrap_or_default(),
                interface.map(|i| i.id_reuse_policy).unwrap_or_default(),
                defaults.id_reuse_policy,
            ]),
            retry_policy: self
                .retry_policy
                .clone()
                .or_else(|| method.and_then(|m| m.retry_policy.clone()))
                .or_else(|| interface.and_then(|i| i.retry_policy.clone())),
            cron_schedule: self.cron_schedule.clone(),
        })
    }
}

/// Fully resolved workflow options as sent to the proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EffectiveWorkflowOptions {
    /// Workflow id; the engine generates one when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    /// Resolved domain
    pub domain: String,
    /// Resolved task list
    pub task_list: String,
    /// Time allowed for one execution once started
    #[serde(with = "duration_nanos")]
    pub start_to_close_timeout: Duration,
    /// Time allowed to wait in the task list
    #[serde(with = "duration_nanos")]
    pub schedule_to_start_timeout: Duration,
    /// Time allowed for one decision task
    #[serde(with = "duration_nanos")]
    pub decision_task_timeout: Duration,
    /// Whether an id from a closed run may be reused
    pub id_reuse_policy: WorkflowIdReusePolicy,
    /// Retry policy, none for a single attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<RetryPolicy>,
    /// Cron expression for recurring runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_schedule: Option<String>,
}
