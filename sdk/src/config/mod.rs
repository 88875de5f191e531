//! Configuration for the Cadence client
//!
//! Client-wide settings are the last tier of the options chain: anything a
//! caller, a method or an interface leaves unset falls back to these values.

use cadence_core::WorkflowIdReusePolicy;
use std::time::Duration;

/// Client-wide workflow defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowDefaults {
    /// Maximum time a workflow run may take
    pub start_to_close_timeout: Duration,
    /// Maximum time a workflow may wait for a worker
    pub schedule_to_start_timeout: Duration,
    /// Maximum time for a single decision task
    pub decision_task_timeout: Duration,
    /// Workflow id reuse policy; `UseDefault` falls back to the engine policy constant
    pub id_reuse_policy: WorkflowIdReusePolicy,
}

impl Default for WorkflowDefaults {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl WorkflowDefaults {
    /// Default configuration suitable for most use cases
    pub const DEFAULT: Self = Self {
        start_to_close_timeout: Duration::from_secs(24 * 60 * 60),
        schedule_to_start_timeout: Duration::from_secs(120),
        decision_task_timeout: Duration::from_secs(10),
        id_reuse_policy: WorkflowIdReusePolicy::AllowDuplicateFailedOnly,
    };

    /// Configuration for workflows that run for weeks
    pub const LONG_RUNNING: Self = Self {
        start_to_close_timeout: Duration::from_secs(30 * 24 * 60 * 60),
        schedule_to_start_timeout: Duration::from_secs(600),
        decision_task_timeout: Duration::from_secs(10),
        id_reuse_policy: WorkflowIdReusePolicy::AllowDuplicateFailedOnly,
    };

    /// Create a new configuration with validation
    pub fn new(
        start_to_close_timeout: Duration,
        schedule_to_start_timeout: Duration,
        decision_task_timeout: Duration,
        id_reuse_policy: WorkflowIdReusePolicy,
    ) -> Result<Self, ConfigError> {
        let defaults = Self {
            start_to_close_timeout,
            schedule_to_start_timeout,
            decision_task_timeout,
            id_reuse_policy,
        };
        defaults.validate()?;
        Ok(defaults)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        positive("workflow start_to_close_timeout", self.start_to_close_timeout)?;
        positive(
            "workflow schedule_to_start_timeout",
            self.schedule_to_start_timeout,
        )?;
        positive("workflow decision_task_timeout", self.decision_task_timeout)
    }
}

/// Client-wide activity defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityDefaults {
    pub schedule_to_close_timeout: Duration,
    pub start_to_close_timeout: Duration,
    pub schedule_to_start_timeout: Duration,
    /// Heartbeat timeout; the heartbeat throttle interval is half of it
    pub heartbeat_timeout: Duration,
}

impl Default for ActivityDefaults {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl ActivityDefaults {
    /// Default configuration suitable for most use cases
    pub const DEFAULT: Self = Self {
        schedule_to_close_timeout: Duration::from_secs(24 * 60 * 60),
        start_to_close_timeout: Duration::from_secs(24 * 60 * 60),
        schedule_to_start_timeout: Duration::from_secs(24 * 60 * 60),
        heartbeat_timeout: Duration::from_secs(60),
    };

    /// Short timeouts for quick, chatty activities
    pub const SHORT_LIVED: Self = Self {
        schedule_to_close_timeout: Duration::from_secs(300),
        start_to_close_timeout: Duration::from_secs(60),
        schedule_to_start_timeout: Duration::from_secs(240),
        heartbeat_timeout: Duration::from_secs(10),
    };

    /// Create a new configuration with validation
    pub fn new(
        schedule_to_close_timeout: Duration,
        start_to_close_timeout: Duration,
        schedule_to_start_timeout: Duration,
        heartbeat_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let defaults = Self {
            schedule_to_close_timeout,
            start_to_close_timeout,
            schedule_to_start_timeout,
            heartbeat_timeout,
        };
        defaults.validate()?;
        Ok(defaults)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        positive(
            "activity schedule_to_close_timeout",
            self.schedule_to_close_timeout,
        )?;
        positive("activity start_to_close_timeout", self.start_to_close_timeout)?;
        positive(
            "activity schedule_to_start_timeout",
            self.schedule_to_start_timeout,
        )?;
        positive("activity heartbeat_timeout", self.heartbeat_timeout)
    }
}

/// Complete configuration for CadenceClient
#[derive(Debug, Clone)]
pub struct CadenceSettings {
    /// Address of the local proxy process
    pub proxy_address: String,
    /// Domain used when nothing else names one
    pub default_domain: Option<String>,
    /// Register the default domain on connect
    pub create_domain: bool,
    /// Task list used when nothing else names one
    pub default_task_list: Option<String>,
    /// Identity reported to the engine; generated when unset
    pub client_identity: Option<String>,
    /// Timeout for establishing the proxy connection
    pub connect_timeout: Duration,
    /// Interval between liveness pings to the proxy (zero disables pinging)
    pub ping_interval: Duration,
    /// Time a liveness ping may take before the proxy is considered gone
    pub ping_timeout: Duration,
    pub workflow: WorkflowDefaults,
    pub activity: ActivityDefaults,
}

impl Default for CadenceSettings {
    fn default() -> Self {
        Self {
            proxy_address: Self::DEFAULT_PROXY_ADDRESS.to_string(),
            default_domain: None,
            create_domain: false,
            default_task_list: None,
            client_identity: None,
            connect_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(5),
            ping_timeout: Duration::from_secs(5),
            workflow: WorkflowDefaults::DEFAULT,
            activity: ActivityDefaults::DEFAULT,
        }
    }
}

impl CadenceSettings {
    pub const DEFAULT_PROXY_ADDRESS: &'static str = "127.0.0.1:5000";

    /// Settings for a proxy on the loopback address serving one domain
    pub fn local(domain: impl Into<String>) -> Self {
        Self::default().with_default_domain(domain)
    }

    pub fn with_proxy_address(mut self, address: impl Into<String>) -> Self {
        self.proxy_address = address.into();
        self
    }

    pub fn with_default_domain(mut self, domain: impl Into<String>) -> Self {
        self.default_domain = Some(domain.into());
        self
    }

    pub fn with_create_domain(mut self, create: bool) -> Self {
        self.create_domain = create;
        self
    }

    pub fn with_default_task_list(mut self, task_list: impl Into<String>) -> Self {
        self.default_task_list = Some(task_list.into());
        self
    }

    pub fn with_client_identity(mut self, identity: impl Into<String>) -> Self {
        self.client_identity = Some(identity.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_ping(mut self, interval: Duration, timeout: Duration) -> Self {
        self.ping_interval = interval;
        self.ping_timeout = timeout;
        self
    }

    pub fn with_workflow_defaults(mut self, defaults: WorkflowDefaults) -> Self {
        self.workflow = defaults;
        self
    }

    pub fn with_activity_defaults(mut self, defaults: ActivityDefaults) -> Self {
        self.activity = defaults;
        self
    }

    /// Check the settings before connecting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.proxy_address.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "proxy_address must not be empty".to_string(),
            ));
        }
        not_blank("default_domain", self.default_domain.as_deref())?;
        not_blank("default_task_list", self.default_task_list.as_deref())?;
        if self.create_domain && self.default_domain.is_none() {
            return Err(ConfigError::InvalidValue(
                "create_domain requires default_domain".to_string(),
            ));
        }
        positive("connect_timeout", self.connect_timeout)?;
        if !self.ping_interval.is_zero() {
            positive("ping_timeout", self.ping_timeout)?;
        }
        self.workflow.validate()?;
        self.activity.validate()
    }
}

fn positive(name: &str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::InvalidValue(format!("{name} must be positive")));
    }
    Ok(())
}

fn not_blank(name: &str, value: Option<&str>) -> Result<(), ConfigError> {
    match value {
        Some(v) if v.trim().is_empty() => Err(ConfigError::InvalidValue(format!(
            "{name} must not be blank when set"
        ))),
        _ => Ok(()),
    }
}

/// Configuration error
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_defaults() {
        let config = WorkflowDefaults::default();
        assert_eq!(config.decision_task_timeout, Duration::from_secs(10));
        assert_eq!(
            config.id_reuse_policy,
            WorkflowIdReusePolicy::AllowDuplicateFailedOnly
        );
    }

    #[test]
    fn test_workflow_defaults_new_validation() {
        let result = WorkflowDefaults::new(
            Duration::ZERO,
            Duration::from_secs(1),
            Duration::from_secs(1),
            WorkflowIdReusePolicy::UseDefault,
        );
        assert!(result.is_err());

        let result = WorkflowDefaults::new(
            Duration::from_secs(60),
            Duration::from_secs(1),
            Duration::from_secs(1),
            WorkflowIdReusePolicy::RejectDuplicate,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_activity_defaults_presets() {
        assert_eq!(
            ActivityDefaults::DEFAULT.heartbeat_timeout,
            Duration::from_secs(60)
        );
        assert_eq!(
            ActivityDefaults::SHORT_LIVED.heartbeat_timeout,
            Duration::from_secs(10)
        );
        assert!(ActivityDefaults::new(
            Duration::from_secs(1),
            Duration::from_secs(1),
            Duration::from_secs(1),
            Duration::ZERO
        )
        .is_err());
    }

    #[test]
    fn test_settings_builder_pattern() {
        let settings = CadenceSettings::local("test-domain")
            .with_default_task_list("tasks")
            .with_create_domain(true)
            .with_activity_defaults(ActivityDefaults::SHORT_LIVED);

        assert_eq!(settings.default_domain.as_deref(), Some("test-domain"));
        assert_eq!(settings.default_task_list.as_deref(), Some("tasks"));
        assert_eq!(settings.proxy_address, CadenceSettings::DEFAULT_PROXY_ADDRESS);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_validation() {
        assert!(CadenceSettings::default()
            .with_proxy_address(" ")
            .validate()
            .is_err());
        assert!(CadenceSettings::default()
            .with_default_domain("")
            .validate()
            .is_err());
        assert!(CadenceSettings::default()
            .with_create_domain(true)
            .validate()
            .is_err());
        assert!(CadenceSettings::default()
            .with_ping(Duration::ZERO, Duration::ZERO)
            .validate()
            .is_ok());
    }
}
