//! Declarative defaults attached to interfaces and methods.
//!
//! Both tiers carry the same option fields. Timeouts are whole seconds and
//! zero means unset.

use super::RetryPolicy;
use cadence_core::WorkflowIdReusePolicy;
use std::time::Duration;

macro_rules! declared_defaults {
    ($(#[$meta:meta])* $name:ident { $($extra:tt)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            $($extra)*
            /// Target domain
            pub domain: Option<String>,
            /// Task list that routes the work
            pub task_list: Option<String>,
            /// Execution timeout in seconds
            pub start_to_close_seconds: u32,
            /// Task list wait timeout in seconds
            pub schedule_to_start_seconds: u32,
            /// Activity end-to-end timeout in seconds
            pub schedule_to_close_seconds: u32,
            /// Decision task timeout in seconds
            pub decision_task_seconds: u32,
            /// Activity heartbeat timeout in seconds
            pub heartbeat_seconds: u32,
            /// Whether an id from a closed run may be reused
            pub id_reuse_policy: WorkflowIdReusePolicy,
            /// Retry policy, none for a single attempt
            pub retry_policy: Option<RetryPolicy>,
        }

        impl $name {
            pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
                self.domain = Some(domain.into());
                self
            }

            pub fn with_task_list(mut self, task_list: impl Into<String>) -> Self {
                self.task_list = Some(task_list.into());
                self
            }

            pub fn with_start_to_close_seconds(mut self, seconds: u32) -> Self {
                self.start_to_close_seconds = seconds;
                self
            }

            pub fn with_schedule_to_start_seconds(mut self, seconds: u32) -> Self {
                self.schedule_to_start_seconds = seconds;
                self
            }

            pub fn with_schedule_to_close_seconds(mut self, seconds: u32) -> Self {
                self.schedule_to_close_seconds = seconds;
                self
            }

            pub fn with_decision_task_seconds(mut self, seconds: u32) -> Self {
                self.decision_task_seconds = seconds;
                self
            }

            pub fn with_heartbeat_seconds(mut self, seconds: u32) -> Self {
                self.heartbeat_seconds = seconds;
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

            pub(crate) fn start_to_close(&self) -> Option<Duration> {
                seconds(self.start_to_close_seconds)
            }

            pub(crate) fn schedule_to_start(&self) -> Option<Duration> {
                seconds(self.schedule_to_start_seconds)
            }

            pub(crate) fn schedule_to_close(&self) -> Option<Duration> {
                seconds(self.schedule_to_close_seconds)
            }

            pub(crate) fn decision_task(&self) -> Option<Duration> {
                seconds(self.decision_task_seconds)
            }

            pub(crate) fn heartbeat(&self) -> Option<Duration> {
                seconds(self.heartbeat_seconds)
            }
        }
    };
}

declared_defaults! {
    /// Defaults declared on a workflow or activity interface.
    InterfaceDefaults {
        /// Engine type name override
        pub name: Option<String>,
    }
}

declared_defaults! {
    /// Defaults declared on one interface method.
    MethodDefaults {}
}

impl InterfaceDefaults {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

fn seconds(value: u32) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(u64::from(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_seconds_are_unset() {
        let defaults = MethodDefaults::default().with_heartbeat_seconds(0);
        assert_eq!(defaults.heartbeat(), None);

        let defaults = InterfaceDefaults::default()
            .with_name("Greeter")
            .with_start_to_close_seconds(10);
        assert_eq!(defaults.start_to_close(), Some(Duration::from_secs(10)));
        assert_eq!(defaults.name.as_deref(), Some("Greeter"));
    }
}
