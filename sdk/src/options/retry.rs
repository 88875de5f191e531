//! Retry policy sent with workflow and activity options.

use crate::config::ConfigError;
use cadence_core::time::duration_nanos;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry policy. The engine applies it to workflows and activities; local
/// activities apply it in-process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RetryPolicy {
    /// Backoff before the first retry
    #[serde(with = "duration_nanos")]
    pub initial_interval: Duration,
    /// Backoff multiplier
    pub backoff_coefficient: f64,
    /// Maximum backoff between attempts
    #[serde(with = "duration_nanos")]
    pub maximum_interval: Duration,
    /// Maximum number of attempts, zero for unlimited
    pub maximum_attempts: u32,
    /// Total time allowed for all attempts, zero for unlimited
    #[serde(with = "duration_nanos")]
    pub expiration_interval: Duration,
    /// Error reasons that stop retrying
    #[serde(default)]
    pub non_retriable_error_reasons: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            backoff_coefficient: 2.0,
            maximum_interval: Duration::from_secs(60),
            maximum_attempts: 3,
            expiration_interval: Duration::ZERO,
            non_retriable_error_reasons: Vec::new(),
        }
    }
}

impl RetryPolicy {
    pub fn with_maximum_attempts(mut self, attempts: u32) -> Self {
        self.maximum_attempts = attempts;
        self
    }

    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    pub fn with_non_retriable_reason(mut self, reason: impl Into<String>) -> Self {
        self.non_retriable_error_reasons.push(reason.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "retry initial_interval must be positive".to_string(),
            ));
        }
        if self.backoff_coefficient < 1.0 {
            return Err(ConfigError::InvalidValue(
                "retry backoff_coefficient must be at least 1.0".to_string(),
            ));
        }
        if self.maximum_interval < self.initial_interval {
            return Err(ConfigError::InvalidValue(
                "retry maximum_interval must not be below initial_interval".to_string(),
            ));
        }
        Ok(())
    }

    /// Backoff before attempt `attempt` (1-based), capped at the maximum interval.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.initial_interval.as_secs_f64() * self.backoff_coefficient.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.maximum_interval)
            .min(self.maximum_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.maximum_attempts, 3);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
        assert_eq!(policy.backoff(50), Duration::from_secs(60));
    }

    #[test]
    fn test_validation() {
        let mut policy = RetryPolicy::default();
        policy.backoff_coefficient = 0.5;
        assert!(policy.validate().is_err());

        let policy = RetryPolicy::default().with_initial_interval(Duration::from_secs(120));
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_wire_shape() {
        let policy = RetryPolicy::default().with_non_retriable_reason("ArgumentException");
        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json["InitialInterval"], 1_000_000_000i64);
        assert_eq!(json["NonRetriableErrorReasons"][0], "ArgumentException");
    }
}
