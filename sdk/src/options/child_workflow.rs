//! Options for child workflows started from inside a workflow.

use super::{EffectiveWorkflowOptions, InterfaceDefaults, MethodDefaults, RetryPolicy, WorkflowOptions};
use crate::config::CadenceSettings;
use crate::error::Result;
use cadence_core::WorkflowIdReusePolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What happens to a child when its parent closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParentClosePolicy {
    #[default]
    Terminate,
    RequestCancel,
    Abandon,
}

/// Caller-supplied options for a child workflow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildWorkflowOptions {
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
    /// What happens to the child when the parent closes
    pub parent_close_policy: ParentClosePolicy,
}

impl ChildWorkflowOptions {
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

    pub fn with_parent_close_policy(mut self, policy: ParentClosePolicy) -> Self {
        self.parent_close_policy = policy;
        self
    }

    /// Resolve through the same chain as top-level workflows.
    pub fn normalize(
        &self,
        method: Option<&MethodDefaults>,
        interface: Option<&InterfaceDefaults>,
        settings: &CadenceSettings,
    ) -> Result<EffectiveChildWorkflowOptions> {
        let workflow = WorkflowOptions {
            workflow_id: self.workflow_id.clone(),
            domain: self.domain.clone(),
            task_list: self.task_list.clone(),
            start_to_close_timeout: self.start_to_close_timeout,
            schedule_to_start_timeout: self.schedule_to_start_timeout,
            decision_task_timeout: self.decision_task_timeout,
            id_reuse_policy: self.id_reuse_policy,
            retry_policy: self.retry_policy.clone(),
            cron_schedule: self.cron_schedule.clone(),
        }
        .normalize(method, interface, settings)?;

        Ok(EffectiveChildWorkflowOptions {
            workflow,
            parent_close_policy: self.parent_close_policy,
        })
    }
}

/// Fully resolved child workflow options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EffectiveChildWorkflowOptions {
    /// Options shared with top-level workflows
    #[serde(flatten)]
    pub workflow: EffectiveWorkflowOptions,
    /// What happens to the child when the parent closes
    pub parent_close_policy: ParentClosePolicy,
}
