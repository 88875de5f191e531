//! WorkflowRegistry - registered workflow implementations

use crate::error::{CadenceError, Result};
use crate::interface::TypeDescriptor;
use crate::workflow::{Workflow, WorkflowContext, WorkflowHandlers};
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::Value;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

/// One running workflow instance, shared by its entrypoint, signal and
/// query handlers.
pub trait WorkflowInstance: Send + Sync {
    /// Start the handler for `member`, if the implementation has one.
    fn invoke(
        &self,
        member: &str,
        context: WorkflowContext,
        args: Vec<Value>,
    ) -> Option<BoxFuture<'static, Result<Value>>>;
}

struct Instance<W> {
    this: Arc<W>,
    handlers: Arc<WorkflowHandlers<W>>,
}

impl<W: Workflow> WorkflowInstance for Instance<W> {
    fn invoke(
        &self,
        member: &str,
        context: WorkflowContext,
        args: Vec<Value>,
    ) -> Option<BoxFuture<'static, Result<Value>>> {
        self.handlers
            .invoke(member, Arc::clone(&self.this), context, args)
    }
}

type InstanceFactory = Arc<dyn Fn() -> Arc<dyn WorkflowInstance> + Send + Sync>;

/// A workflow entrypoint registered under one engine type name.
#[derive(Clone)]
pub struct RegisteredWorkflow {
    pub engine_type_name: String,
    /// Entrypoint member started for this type name
    pub member: String,
    pub implementation: &'static str,
    pub descriptor: Arc<TypeDescriptor>,
    type_id: TypeId,
    factory: InstanceFactory,
}

impl RegisteredWorkflow {
    /// Create the instance for a new run.
    pub fn instantiate(&self) -> Arc<dyn WorkflowInstance> {
        (self.factory)()
    }
}

impl std::fmt::Debug for RegisteredWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredWorkflow")
            .field("engine_type_name", &self.engine_type_name)
            .field("member", &self.member)
            .field("implementation", &self.implementation)
            .finish()
    }
}

/// Registry for workflow implementations, keyed by engine type name.
#[derive(Default)]
pub struct WorkflowRegistry {
    workflows: RwLock<HashMap<String, RegisteredWorkflow>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every entrypoint of `W`.
    ///
    /// Returns the engine type names that were not registered before. The
    /// same implementation may be registered again; a different
    /// implementation under a taken name fails and nothing is registered.
    pub fn register<W: Workflow>(&self, descriptor: Arc<TypeDescriptor>) -> Result<Vec<String>> {
        let handlers = Arc::new(W::handlers());
        let type_id = TypeId::of::<W>();
        let implementation = std::any::type_name::<W>();

        for method in &descriptor.methods {
            if !handlers.contains(&method.member) {
                return Err(CadenceError::InvalidConfiguration(format!(
                    "[{implementation}] has no handler for {} [{}]",
                    method.category, method.member
                )));
            }
        }

        let factory: InstanceFactory = {
            let handlers = Arc::clone(&handlers);
            Arc::new(move || -> Arc<dyn WorkflowInstance> {
                Arc::new(Instance {
                    this: Arc::new(W::default()),
                    handlers: Arc::clone(&handlers),
                })
            })
        };

        let entries: Vec<RegisteredWorkflow> = descriptor
            .entrypoints()
            .map(|method| RegisteredWorkflow {
                engine_type_name: descriptor.qualified_name(method),
                member: method.member.clone(),
                implementation,
                descriptor: Arc::clone(&descriptor),
                type_id,
                factory: Arc::clone(&factory),
            })
            .collect();

        let mut workflows = self.workflows.write();
        for entry in &entries {
            if let Some(existing) = workflows.get(&entry.engine_type_name) {
                if existing.type_id != type_id {
                    return Err(CadenceError::InvalidConfiguration(format!(
                        "Workflow type [{}] is already registered by [{}]",
                        entry.engine_type_name, existing.implementation
                    )));
                }
            }
        }

        let mut added = Vec::new();
        for entry in entries {
            if !workflows.contains_key(&entry.engine_type_name) {
                added.push(entry.engine_type_name.clone());
                workflows.insert(entry.engine_type_name.clone(), entry);
            }
        }
        Ok(added)
    }

    pub fn get(&self, engine_type_name: &str) -> Option<RegisteredWorkflow> {
        self.workflows.read().get(engine_type_name).cloned()
    }

    pub fn has(&self, engine_type_name: &str) -> bool {
        self.workflows.read().contains_key(engine_type_name)
    }

    pub fn registered_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.workflows.read().keys().cloned().collect();
        names.sort();
        names
    }
}
