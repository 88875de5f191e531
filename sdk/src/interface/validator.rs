//! Shape validation for workflow and activity types.
//!
//! Validation is pure: it only looks at declared shapes, so it can run at
//! startup before any proxy connection exists. The first violation found
//! fails the whole type; nothing is partially registered.

use super::descriptor::{MethodCategory, MethodDescriptor, SignalKind, TypeDescriptor};
use super::naming::{self, METHOD_SEPARATOR};
use super::shape::{
    Capability, ImplementationShape, InterfaceShape, MethodRole, MethodShape, ReturnKind, TypeKind,
    Visibility,
};
use crate::error::{CadenceError, Result};
use std::collections::HashSet;

pub fn validate_workflow_interface(shape: &InterfaceShape) -> Result<TypeDescriptor> {
    validate_interface(shape, Capability::Workflow, None)
}

pub fn validate_workflow_implementation(shape: &ImplementationShape) -> Result<TypeDescriptor> {
    validate_implementation(shape, Capability::Workflow)
}

pub fn validate_activity_interface(shape: &InterfaceShape) -> Result<TypeDescriptor> {
    validate_interface(shape, Capability::Activity, None)
}

pub fn validate_activity_implementation(shape: &ImplementationShape) -> Result<TypeDescriptor> {
    validate_implementation(shape, Capability::Activity)
}

fn type_error(capability: Capability, message: String) -> CadenceError {
    match capability {
        Capability::Workflow => CadenceError::WorkflowType(message),
        Capability::Activity => CadenceError::ActivityType(message),
    }
}

fn title(capability: Capability) -> &'static str {
    match capability {
        Capability::Workflow => "Workflow",
        Capability::Activity => "Activity",
    }
}

/// Reject explicit type names that would collide with method discriminators.
pub fn validate_type_name(capability: Capability, name: &str) -> Result<()> {
    if name.contains(METHOD_SEPARATOR) {
        return Err(type_error(
            capability,
            format!(
                "{} type names cannot include \"{METHOD_SEPARATOR}\": \"{name}\".",
                title(capability)
            ),
        ));
    }
    Ok(())
}

fn validate_interface(
    shape: &InterfaceShape,
    capability: Capability,
    name_override: Option<&str>,
) -> Result<TypeDescriptor> {
    let fail = |message: String| Err(type_error(capability, message));
    let name = &shape.full_name;
    let kind = title(capability);

    if shape.kind != TypeKind::Interface {
        return fail(format!("[{name}] is not an interface."));
    }
    if !shape.has_capability(capability) {
        return fail(format!("[{name}] does not implement the {capability} capability."));
    }
    if shape.generic {
        return fail(format!(
            "[{name}] has generic type parameters. {kind} interfaces cannot be generic."
        ));
    }
    if shape.visibility != Visibility::Public {
        return fail(format!("{kind} interface [{name}] is not public."));
    }
    if let Some(marker) = shape.marker {
        return fail(format!(
            "{kind} interface [{name}] cannot carry a {marker} registration marker; markers are valid only on implementations."
        ));
    }

    let name_override = name_override.or(shape.defaults.name.as_deref());
    if let Some(explicit) = name_override {
        validate_type_name(capability, explicit)?;
    }

    let mut seen: HashSet<(MethodCategory, String)> = HashSet::new();
    let mut methods = Vec::new();

    for method in &shape.methods {
        let Some(role) = &method.role else { continue };
        let descriptor = describe_method(shape, capability, method, role)?;

        if descriptor.name.contains(METHOD_SEPARATOR) {
            return fail(format!(
                "Method [{name}.{}] name \"{}\" cannot include \"{METHOD_SEPARATOR}\".",
                method.member, descriptor.name
            ));
        }
        if !seen.insert((descriptor.category, descriptor.name.clone())) {
            return fail(format!(
                "Multiple {} methods of [{name}] are named \"{}\".",
                descriptor.category, descriptor.name
            ));
        }
        methods.push(descriptor);
    }

    if !methods.iter().any(|m| m.is_entrypoint) {
        return fail(format!(
            "{kind} interface [{name}] does not define any entrypoint methods."
        ));
    }

    Ok(TypeDescriptor {
        engine_type_name: naming::engine_type_name(name, name_override),
        kind: capability,
        interface_name: name.clone(),
        methods,
        defaults: shape.defaults.clone(),
    })
}

fn describe_method(
    shape: &InterfaceShape,
    capability: Capability,
    method: &MethodShape,
    role: &MethodRole,
) -> Result<MethodDescriptor> {
    let fail = |message: String| Err(type_error(capability, message));
    let path = format!("{}.{}", shape.full_name, method.member);

    let (category, name, signal_kind) = match (capability, role) {
        (Capability::Workflow, MethodRole::Entrypoint { name }) => {
            (MethodCategory::Entrypoint, discriminator(name), SignalKind::None)
        }
        (Capability::Workflow, MethodRole::Signal { name, synchronous }) => {
            let kind = match synchronous {
                None => {
                    return fail(format!(
                        "Signal method [{path}()] must declare whether it is synchronous or fire-and-forget."
                    ))
                }
                Some(true) => SignalKind::Sync,
                Some(false) => SignalKind::FireAndForget,
            };
            (MethodCategory::Signal, name.trim().to_string(), kind)
        }
        (Capability::Workflow, MethodRole::Query { name }) => {
            (MethodCategory::Query, name.trim().to_string(), SignalKind::None)
        }
        (Capability::Activity, MethodRole::Activity { name }) => {
            (MethodCategory::Activity, discriminator(name), SignalKind::None)
        }
        (Capability::Workflow, MethodRole::Activity { .. }) => {
            return fail(format!(
                "Method [{path}()] is declared as an activity method but [{}] is a workflow interface.",
                shape.full_name
            ))
        }
        (Capability::Activity, _) => {
            return fail(format!(
                "Method [{path}()] is declared as a workflow method but [{}] is an activity interface.",
                shape.full_name
            ))
        }
    };

    match (category, signal_kind, method.returns) {
        (_, _, ReturnKind::Synchronous) => {
            return fail(format!("{category} method [{path}()] must return a future."));
        }
        (MethodCategory::Signal, SignalKind::Sync, ReturnKind::Async) => {
            return fail(format!(
                "Synchronous signal method [{path}()] must return a future with a value."
            ));
        }
        (MethodCategory::Signal, SignalKind::FireAndForget, ReturnKind::AsyncValue) => {
            return fail(format!(
                "Fire-and-forget signal method [{path}()] cannot return a value. Declare it synchronous to enable this."
            ));
        }
        _ => {}
    }

    Ok(MethodDescriptor {
        name,
        member: method.member.clone(),
        category,
        is_entrypoint: matches!(category, MethodCategory::Entrypoint | MethodCategory::Activity),
        returns_value: method.returns == ReturnKind::AsyncValue,
        signal_kind,
        params: method.params.clone(),
        defaults: method.defaults.clone(),
    })
}

fn discriminator(name: &Option<String>) -> String {
    name.as_deref().map(str::trim).unwrap_or_default().to_string()
}

fn validate_implementation(
    shape: &ImplementationShape,
    capability: Capability,
) -> Result<TypeDescriptor> {
    let fail = |message: String| Err(type_error(capability, message));
    let name = &shape.full_name;
    let kind = title(capability);
    let lower = capability.to_string();

    if shape.kind == TypeKind::Interface {
        return fail(format!("[{name}] {lower} implementation cannot be an interface."));
    }
    if shape.generic {
        return fail(format!(
            "[{name}] has generic type parameters. {kind} implementations cannot be generic."
        ));
    }
    if shape.is_abstract_base {
        return fail(format!("The {lower} base cannot be a {lower} implementation."));
    }
    match shape.base {
        Some(base) if base == capability => {}
        Some(base) => {
            return fail(format!(
                "[{name}] does not derive from the {lower} base. Did you mean to register it as {}?",
                article(base)
            ));
        }
        None => return fail(format!("[{name}] does not derive from the {lower} base.")),
    }

    let mut matching = shape
        .interfaces
        .iter()
        .filter(|i| i.has_capability(capability));
    let interface = match (matching.next(), matching.next()) {
        (Some(interface), None) => interface,
        (None, _) => {
            return fail(format!(
                "{kind} type [{name}] does not implement an interface with the {lower} capability."
            ))
        }
        (Some(_), Some(_)) => {
            return fail(format!(
                "{kind} type [{name}] implements multiple {lower} interfaces. This is not supported."
            ))
        }
    };

    let mut name_override = None;
    if let Some(marker) = &shape.marker {
        if marker.capability != capability {
            return fail(format!(
                "{kind} type [{name}] cannot carry {} registration marker because it does not implement {}.",
                article(marker.capability),
                article(marker.capability)
            ));
        }
        name_override = marker.name.as_deref().filter(|n| !n.trim().is_empty());
    }

    validate_interface(interface, capability, name_override)
}

fn article(capability: Capability) -> &'static str {
    match capability {
        Capability::Workflow => "a workflow",
        Capability::Activity => "an activity",
    }
}
