//! Property-based tests for type validation

use cadence_sdk::interface::{
    validate_activity_interface, validate_type_name, validate_workflow_interface, Capability,
    SignalKind,
};
use cadence_sdk::prelude::*;
use proptest::prelude::*;

fn arb_name() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

proptest! {
    #[test]
    fn prop_names_with_separator_are_rejected(head in arb_name(), tail in arb_name()) {
        let name = format!("{head}::{tail}");
        let err = validate_type_name(Capability::Workflow, &name).unwrap_err();
        prop_assert!(matches!(err, CadenceError::WorkflowType(_)));
        let err = validate_type_name(Capability::Activity, &name).unwrap_err();
        prop_assert!(matches!(err, CadenceError::ActivityType(_)));
        prop_assert!(validate_type_name(Capability::Workflow, &head).is_ok());
    }

    #[test]
    fn prop_one_descriptor_per_entrypoint(names in prop::collection::hash_set(arb_name(), 1..6)) {
        let shape = names.iter().fold(InterfaceShape::workflow("props::IMany"), |shape, name| {
            shape.method(MethodShape::entrypoint(name).named(name))
        });
        let descriptor = validate_workflow_interface(&shape).unwrap();
        prop_assert_eq!(descriptor.engine_type_name.as_str(), "props.Many");
        prop_assert_eq!(descriptor.methods.len(), names.len());
        for name in &names {
            prop_assert!(descriptor.method(name).is_some());
        }
    }

    #[test]
    fn prop_duplicate_discriminators_are_rejected(name in arb_name()) {
        let shape = InterfaceShape::activity("props::ITwice")
            .method(MethodShape::activity("first").named(&name))
            .method(MethodShape::activity("second").named(&name));
        let err = validate_activity_interface(&shape).unwrap_err();
        prop_assert!(matches!(err, CadenceError::ActivityType(_)));
    }

    #[test]
    fn prop_discriminators_cannot_contain_separator(head in arb_name(), tail in arb_name()) {
        let shape = InterfaceShape::workflow("props::IBad")
            .method(MethodShape::entrypoint("run").named(&format!("{head}::{tail}")));
        prop_assert!(validate_workflow_interface(&shape).is_err());
    }
}

#[test]
fn test_signal_kinds() {
    let shape = InterfaceShape::workflow("props::ISignals")
        .method(MethodShape::entrypoint("run"))
        .method(MethodShape::signal("set", "set").synchronous())
        .method(MethodShape::signal("poke", "poke").fire_and_forget());
    let descriptor = validate_workflow_interface(&shape).unwrap();
    assert_eq!(descriptor.signal("set").unwrap().signal_kind, SignalKind::Sync);
    assert_eq!(
        descriptor.signal("poke").unwrap().signal_kind,
        SignalKind::FireAndForget
    );
}

#[test]
fn test_workflow_methods_on_activity_interface() {
    let shape = InterfaceShape::activity("props::IMixed")
        .method(MethodShape::activity("run"))
        .method(MethodShape::query("status", "status"));
    let err = validate_activity_interface(&shape).unwrap_err();
    assert!(err.is_validation_error());
}
