//! Property-based tests for option normalization
//!
//! Each field resolves through explicit option, method defaults, interface
//! defaults and client settings, first set value wins.

use cadence_sdk::prelude::*;
use proptest::prelude::*;
use std::time::Duration;

const MAX_ENGINE_SECONDS: u64 = i32::MAX as u64;

/// Seconds for one tier, zero meaning unset.
fn arb_tier() -> impl Strategy<Value = u32> {
    prop_oneof![Just(0u32), 1u32..=100_000]
}

fn arb_route() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("   ".to_string())),
        "[a-z]{1,8}".prop_map(Some),
    ]
}

fn arb_policy() -> impl Strategy<Value = WorkflowIdReusePolicy> {
    prop_oneof![
        Just(WorkflowIdReusePolicy::UseDefault),
        Just(WorkflowIdReusePolicy::AllowDuplicateFailedOnly),
        Just(WorkflowIdReusePolicy::AllowDuplicate),
        Just(WorkflowIdReusePolicy::RejectDuplicate),
    ]
}

fn settings() -> CadenceSettings {
    CadenceSettings::local("settings-domain").with_default_task_list("settings-tasks")
}

/// First non-zero tier in seconds, or the fallback, clamped to the engine range.
fn expected(tiers: &[u32], fallback: Duration) -> Duration {
    let value = tiers
        .iter()
        .find(|s| **s > 0)
        .map(|s| Duration::from_secs(u64::from(*s)))
        .unwrap_or(fallback);
    value.clamp(Duration::from_secs(1), Duration::from_secs(MAX_ENGINE_SECONDS))
}

fn expected_route(tiers: &[&Option<String>], fallback: &str) -> String {
    tiers
        .iter()
        .filter_map(|t| t.as_deref())
        .map(str::trim)
        .find(|t| !t.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

proptest! {
    #[test]
    fn prop_workflow_timeout_precedence(explicit in arb_tier(), method in arb_tier(), interface in arb_tier()) {
        let mut options = WorkflowOptions::new();
        if explicit > 0 {
            options = options.with_start_to_close_timeout(Duration::from_secs(u64::from(explicit)));
        }
        let method_defaults = MethodDefaults::default().with_start_to_close_seconds(method);
        let interface_defaults = InterfaceDefaults::default().with_start_to_close_seconds(interface);
        let settings = settings();

        let effective = options
            .normalize(Some(&method_defaults), Some(&interface_defaults), &settings)
            .unwrap();
        prop_assert_eq!(
            effective.start_to_close_timeout,
            expected(&[explicit, method, interface], settings.workflow.start_to_close_timeout)
        );
    }

    #[test]
    fn prop_zero_explicit_timeout_is_unset(method in arb_tier(), interface in arb_tier()) {
        let options = WorkflowOptions::new().with_decision_task_timeout(Duration::ZERO);
        let method_defaults = MethodDefaults::default().with_decision_task_seconds(method);
        let interface_defaults = InterfaceDefaults::default().with_decision_task_seconds(interface);
        let settings = settings();

        let effective = options
            .normalize(Some(&method_defaults), Some(&interface_defaults), &settings)
            .unwrap();
        prop_assert_eq!(
            effective.decision_task_timeout,
            expected(&[method, interface], settings.workflow.decision_task_timeout)
        );
    }

    #[test]
    fn prop_timeouts_are_clamped(nanos in 0u64..2_000_000_000, days in 0u64..100_000) {
        let settings = settings();
        let short = WorkflowOptions::new()
            .with_schedule_to_start_timeout(Duration::from_nanos(nanos))
            .normalize(None, None, &settings)
            .unwrap();
        prop_assert!(short.schedule_to_start_timeout >= Duration::from_secs(1));

        let long = WorkflowOptions::new()
            .with_start_to_close_timeout(Duration::from_secs(days * 24 * 60 * 60))
            .normalize(None, None, &settings)
            .unwrap();
        prop_assert!(long.start_to_close_timeout <= Duration::from_secs(MAX_ENGINE_SECONDS));
        prop_assert!(long.start_to_close_timeout >= Duration::from_secs(1));
    }

    #[test]
    fn prop_routing_precedence(explicit in arb_route(), method in arb_route(), interface in arb_route()) {
        let mut options = ActivityOptions::new();
        if let Some(domain) = &explicit {
            options = options.with_domain(domain.clone());
        }
        let mut method_defaults = MethodDefaults::default();
        if let Some(task_list) = &method {
            method_defaults = method_defaults.with_task_list(task_list.clone());
        }
        let mut interface_defaults = InterfaceDefaults::default();
        if let Some(domain) = &interface {
            interface_defaults = interface_defaults.with_domain(domain.clone());
        }

        let effective = options
            .normalize(Some(&method_defaults), Some(&interface_defaults), &settings())
            .unwrap();
        prop_assert_eq!(effective.domain, expected_route(&[&explicit, &interface], "settings-domain"));
        prop_assert_eq!(effective.task_list, expected_route(&[&method], "settings-tasks"));
    }

    #[test]
    fn prop_reuse_policy_precedence(explicit in arb_policy(), method in arb_policy(), interface in arb_policy()) {
        let options = WorkflowOptions::new().with_id_reuse_policy(explicit);
        let method_defaults = MethodDefaults::default().with_id_reuse_policy(method);
        let interface_defaults = InterfaceDefaults::default().with_id_reuse_policy(interface);
        let settings = settings();

        let effective = options
            .normalize(Some(&method_defaults), Some(&interface_defaults), &settings)
            .unwrap();
        let want = [explicit, method, interface]
            .into_iter()
            .find(|p| !p.is_default())
            .unwrap_or(settings.workflow.id_reuse_policy);
        prop_assert_eq!(effective.id_reuse_policy, want);
        prop_assert!(!effective.id_reuse_policy.is_default());
    }

    #[test]
    fn prop_normalize_leaves_options_untouched(explicit in arb_tier(), workflow_id in "[a-z]{0,6}") {
        let options = WorkflowOptions::new()
            .with_workflow_id(workflow_id)
            .with_start_to_close_timeout(Duration::from_secs(u64::from(explicit)));
        let before = options.clone();
        let _ = options.normalize(None, None, &settings()).unwrap();
        prop_assert_eq!(options, before);
    }

    #[test]
    fn prop_local_activity_timeout_precedence(explicit in arb_tier(), method in arb_tier()) {
        let mut options = LocalActivityOptions::default();
        if explicit > 0 {
            options = options.with_schedule_to_close_timeout(Duration::from_secs(u64::from(explicit)));
        }
        let method_defaults = MethodDefaults::default().with_schedule_to_close_seconds(method);
        let settings = settings();

        let effective = options.normalize(Some(&method_defaults), None, &settings);
        prop_assert_eq!(
            effective.schedule_to_close_timeout,
            expected(&[explicit, method], settings.activity.schedule_to_close_timeout)
        );
    }
}

#[test]
fn test_missing_domain_is_a_configuration_error() {
    let settings = CadenceSettings::default().with_default_task_list("tasks");
    let err = WorkflowOptions::new()
        .normalize(None, None, &settings)
        .unwrap_err();
    assert!(matches!(err, CadenceError::InvalidConfiguration(_)));

    let effective = WorkflowOptions::new()
        .with_domain("explicit")
        .normalize(None, None, &settings)
        .unwrap();
    assert_eq!(effective.domain, "explicit");
}

#[test]
fn test_blank_workflow_id_is_unset() {
    let effective = WorkflowOptions::new()
        .with_workflow_id("  ")
        .normalize(None, None, &settings())
        .unwrap();
    assert_eq!(effective.workflow_id, None);
}

#[test]
fn test_retry_policy_precedence() {
    let method_policy = RetryPolicy {
        maximum_attempts: 7,
        ..RetryPolicy::default()
    };
    let interface_policy = RetryPolicy {
        maximum_attempts: 2,
        ..RetryPolicy::default()
    };
    let method_defaults = MethodDefaults::default().with_retry_policy(method_policy.clone());
    let interface_defaults = InterfaceDefaults::default().with_retry_policy(interface_policy.clone());

    let effective = ActivityOptions::new()
        .normalize(Some(&method_defaults), Some(&interface_defaults), &settings())
        .unwrap();
    assert_eq!(effective.retry_policy, Some(method_policy));

    let effective = ActivityOptions::new()
        .normalize(None, Some(&interface_defaults), &settings())
        .unwrap();
    assert_eq!(effective.retry_policy, Some(interface_policy));
}
