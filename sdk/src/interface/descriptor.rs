//! Canonical descriptors produced by the validator.

use super::naming;
use super::shape::{Capability, ParamType};
use crate::options::{InterfaceDefaults, MethodDefaults};

/// What a method does on the engine side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodCategory {
    Entrypoint,
    Signal,
    Query,
    Activity,
}

impl std::fmt::Display for MethodCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MethodCategory::Entrypoint => "workflow entrypoint",
            MethodCategory::Signal => "signal",
            MethodCategory::Query => "query",
            MethodCategory::Activity => "activity",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Sync,
    FireAndForget,
    None,
}

/// One engine-visible method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    /// Discriminator for entrypoints and activities, the signal or query
    /// name otherwise. May be empty.
    pub name: String,
    /// Rust method name
    pub member: String,
    /// Workflow, signal, query or activity
    pub category: MethodCategory,
    /// Whether this method starts the workflow
    pub is_entrypoint: bool,
    /// Whether the method produces a result
    pub returns_value: bool,
    /// How a signal waits for its handler
    pub signal_kind: SignalKind,
    /// Parameter types in declaration order
    pub params: Vec<ParamType>,
    /// Method-level defaults
    pub defaults: MethodDefaults,
}

/// Validated description of one interface.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    /// Name the engine registers the type under
    pub engine_type_name: String,
    /// Workflow or activity
    pub kind: Capability,
    /// Rust interface name
    pub interface_name: String,
    /// Engine-visible methods
    pub methods: Vec<MethodDescriptor>,
    /// Interface-level defaults
    pub defaults: InterfaceDefaults,
}

impl TypeDescriptor {
    pub fn method(&self, member: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.member == member)
    }

    pub fn method_in(&self, member: &str, category: MethodCategory) -> Option<&MethodDescriptor> {
        self.methods
            .iter()
            .find(|m| m.member == member && m.category == category)
    }

    pub fn signal(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods
            .iter()
            .find(|m| m.category == MethodCategory::Signal && m.name == name)
    }

    pub fn query(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods
            .iter()
            .find(|m| m.category == MethodCategory::Query && m.name == name)
    }

    /// Entrypoint or activity methods, the ones registered with the engine.
    pub fn entrypoints(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods.iter().filter(|m| m.is_entrypoint)
    }

    /// Engine type name addressed by an entrypoint or activity method.
    pub fn qualified_name(&self, method: &MethodDescriptor) -> String {
        naming::qualify(&self.engine_type_name, &method.name)
    }
}
