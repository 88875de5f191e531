//! Workflow and activity interfaces, their validation and their descriptors.

mod cache;
mod descriptor;
pub mod naming;
mod shape;
mod validator;

pub use cache::DescriptorCache;
pub use descriptor::{MethodCategory, MethodDescriptor, SignalKind, TypeDescriptor};
pub use shape::{
    Capability, ImplementationShape, InterfaceShape, MethodRole, MethodShape, ParamType,
    RegistrationMarker, ReturnKind, TypeKind, Visibility,
};
pub use validator::{
    validate_activity_implementation, validate_activity_interface, validate_type_name,
    validate_workflow_implementation, validate_workflow_interface,
};

/// A workflow interface: the contract stubs are generated from.
///
/// Usually implemented on a unit marker type next to the typed
/// [`Method`](crate::stub::Method) constants that address its members.
pub trait WorkflowInterface: 'static {
    fn shape() -> InterfaceShape;
}

/// An activity interface.
pub trait ActivityInterface: 'static {
    fn shape() -> InterfaceShape;
}
