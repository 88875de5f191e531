//! Declared shapes of workflow and activity interfaces and implementations.
//!
//! Rust has no runtime reflection, so each interface describes itself once
//! through [`WorkflowInterface::shape`](super::WorkflowInterface::shape) or
//! [`ActivityInterface::shape`](super::ActivityInterface::shape). The
//! validator checks these shapes before anything is registered.

use crate::options::{InterfaceDefaults, MethodDefaults};

/// Whether a declared type is an interface or a concrete implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Interface,
    Struct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// Capability marker carried by an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Workflow,
    Activity,
}

impl Capability {
    pub fn opposite(self) -> Capability {
        match self {
            Capability::Workflow => Capability::Activity,
            Capability::Activity => Capability::Workflow,
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Workflow => f.write_str("workflow"),
            Capability::Activity => f.write_str("activity"),
        }
    }
}

/// How a method returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    /// Plain blocking return, not allowed on engine-facing methods
    Synchronous,
    /// Future without a value
    Async,
    /// Future resolving to a value
    AsyncValue,
}

/// Declared parameter type, used to adapt loosely typed arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Bool,
    I32,
    I64,
    U32,
    U64,
    F32,
    F64,
    String,
    Bytes,
    Json,
}

/// Role of a method within its interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodRole {
    /// Workflow entrypoint, optionally discriminated by name
    Entrypoint { name: Option<String> },
    /// Signal handler; synchronicity must be declared explicitly
    Signal {
        name: String,
        synchronous: Option<bool>,
    },
    Query { name: String },
    /// Activity method, optionally discriminated by name
    Activity { name: Option<String> },
}

/// One method declared on an interface.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodShape {
    /// Member name used by typed call sites
    pub member: String,
    /// `None` for helper methods the engine never sees
    pub role: Option<MethodRole>,
    pub returns: ReturnKind,
    pub params: Vec<ParamType>,
    pub defaults: MethodDefaults,
}

impl MethodShape {
    fn with_role(member: &str, role: Option<MethodRole>) -> Self {
        Self {
            member: member.to_string(),
            role,
            returns: ReturnKind::AsyncValue,
            params: Vec::new(),
            defaults: MethodDefaults::default(),
        }
    }

    pub fn entrypoint(member: &str) -> Self {
        Self::with_role(member, Some(MethodRole::Entrypoint { name: None }))
    }

    /// Signal method; call [`synchronous`](Self::synchronous) or
    /// [`fire_and_forget`](Self::fire_and_forget) to declare how it is sent.
    pub fn signal(member: &str, name: &str) -> Self {
        Self::with_role(
            member,
            Some(MethodRole::Signal {
                name: name.to_string(),
                synchronous: None,
            }),
        )
    }

    pub fn query(member: &str, name: &str) -> Self {
        Self::with_role(
            member,
            Some(MethodRole::Query {
                name: name.to_string(),
            }),
        )
    }

    pub fn activity(member: &str) -> Self {
        Self::with_role(member, Some(MethodRole::Activity { name: None }))
    }

    /// Method without an engine role.
    pub fn helper(member: &str) -> Self {
        Self::with_role(member, None)
    }

    /// Set the discriminator of an entrypoint or activity method.
    pub fn named(mut self, name: &str) -> Self {
        match &mut self.role {
            Some(MethodRole::Entrypoint { name: slot }) | Some(MethodRole::Activity { name: slot }) => {
                *slot = Some(name.to_string());
            }
            Some(MethodRole::Signal { name: slot, .. }) | Some(MethodRole::Query { name: slot }) => {
                *slot = name.to_string();
            }
            None => {}
        }
        self
    }

    /// Synchronous signal: the sender waits for the handler's result.
    pub fn synchronous(mut self) -> Self {
        if let Some(MethodRole::Signal { synchronous, .. }) = &mut self.role {
            *synchronous = Some(true);
        }
        self
    }

    /// Fire-and-forget signal: the sender only waits for delivery.
    pub fn fire_and_forget(mut self) -> Self {
        if let Some(MethodRole::Signal { synchronous, .. }) = &mut self.role {
            *synchronous = Some(false);
        }
        self.returns = ReturnKind::Async;
        self
    }

    pub fn returns(mut self, returns: ReturnKind) -> Self {
        self.returns = returns;
        self
    }

    pub fn param(mut self, param: ParamType) -> Self {
        self.params.push(param);
        self
    }

    pub fn defaults(mut self, defaults: MethodDefaults) -> Self {
        self.defaults = defaults;
        self
    }
}

/// Declared shape of a workflow or activity interface.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceShape {
    /// Fully qualified path, such as `app::greeting::IGreeter`
    pub full_name: String,
    pub kind: TypeKind,
    pub visibility: Visibility,
    pub generic: bool,
    pub capabilities: Vec<Capability>,
    /// Registration markers are only valid on implementations
    pub marker: Option<Capability>,
    pub defaults: InterfaceDefaults,
    pub methods: Vec<MethodShape>,
}

impl InterfaceShape {
    fn new(full_name: &str, capability: Capability) -> Self {
        Self {
            full_name: full_name.to_string(),
            kind: TypeKind::Interface,
            visibility: Visibility::Public,
            generic: false,
            capabilities: vec![capability],
            marker: None,
            defaults: InterfaceDefaults::default(),
            methods: Vec::new(),
        }
    }

    pub fn workflow(full_name: &str) -> Self {
        Self::new(full_name, Capability::Workflow)
    }

    pub fn activity(full_name: &str) -> Self {
        Self::new(full_name, Capability::Activity)
    }

    pub fn method(mut self, method: MethodShape) -> Self {
        self.methods.push(method);
        self
    }

    pub fn defaults(mut self, defaults: InterfaceDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Registration marker attached to an implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationMarker {
    pub capability: Capability,
    /// Engine type name override
    pub name: Option<String>,
    /// Picked up by `register_assembly`
    pub auto_register: bool,
}

/// Declared shape of a type implementing a workflow or activity interface.
#[derive(Debug, Clone, PartialEq)]
pub struct ImplementationShape {
    pub full_name: String,
    pub kind: TypeKind,
    pub generic: bool,
    /// Base role the type derives from, if any
    pub base: Option<Capability>,
    /// The type is the abstract base itself
    pub is_abstract_base: bool,
    pub interfaces: Vec<InterfaceShape>,
    pub marker: Option<RegistrationMarker>,
}

impl ImplementationShape {
    fn new(full_name: &str, capability: Capability, interface: InterfaceShape) -> Self {
        Self {
            full_name: full_name.to_string(),
            kind: TypeKind::Struct,
            generic: false,
            base: Some(capability),
            is_abstract_base: false,
            interfaces: vec![interface],
            marker: None,
        }
    }

    pub fn workflow<I: super::WorkflowInterface>(full_name: &str) -> Self {
        Self::new(full_name, Capability::Workflow, I::shape())
    }

    pub fn activity<I: super::ActivityInterface>(full_name: &str) -> Self {
        Self::new(full_name, Capability::Activity, I::shape())
    }

    pub fn marker(mut self, marker: RegistrationMarker) -> Self {
        self.marker = Some(marker);
        self
    }

    pub fn auto_register(mut self) -> Self {
        let capability = self.base.unwrap_or(Capability::Workflow);
        let marker = self.marker.get_or_insert(RegistrationMarker {
            capability,
            name: None,
            auto_register: false,
        });
        marker.auto_register = true;
        self
    }

    pub fn auto_registers(&self) -> bool {
        self.marker.as_ref().is_some_and(|m| m.auto_register)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_sets_discriminator() {
        let method = MethodShape::entrypoint("run").named("fast");
        assert_eq!(
            method.role,
            Some(MethodRole::Entrypoint {
                name: Some("fast".to_string())
            })
        );

        let signal = MethodShape::signal("stop", "stop").named("halt").synchronous();
        assert_eq!(
            signal.role,
            Some(MethodRole::Signal {
                name: "halt".to_string(),
                synchronous: Some(true)
            })
        );
    }

    #[test]
    fn test_fire_and_forget_returns_nothing() {
        let signal = MethodShape::signal("ping", "ping").fire_and_forget();
        assert_eq!(signal.returns, ReturnKind::Async);
    }
}
