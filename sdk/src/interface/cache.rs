use super::descriptor::TypeDescriptor;
use crate::error::Result;
use parking_lot::Mutex;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

/// Validated descriptors keyed by the Rust type they were built from.
///
/// Owned by one client. The lock is held only for the lookup and the
/// insert, never while validating.
#[derive(Default)]
pub struct DescriptorCache {
    entries: Mutex<HashMap<TypeId, Arc<TypeDescriptor>>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_validate<T: 'static>(
        &self,
        validate: impl FnOnce() -> Result<TypeDescriptor>,
    ) -> Result<Arc<TypeDescriptor>> {
        let key = TypeId::of::<T>();
        if let Some(descriptor) = self.entries.lock().get(&key) {
            return Ok(Arc::clone(descriptor));
        }

        let descriptor = Arc::new(validate()?);
        let mut entries = self.entries.lock();
        Ok(Arc::clone(entries.entry(key).or_insert(descriptor)))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
