//! Host capability directory
//!
//! The host exposes its service interfaces by name; extensions look them
//! up at load time and must bind every required capability before any
//! stateful step. A miss is a descriptive failure naming the capability,
//! never a partial binding.

use crate::error::CapabilityError;
use dashmap::DashMap;
use std::any::Any;
use std::sync::Arc;
use tracing::debug;

pub const MODE_REGISTRY_INTERFACE: &str = "SurfModeManager001";
pub const HOST_UTILS_INTERFACE: &str = "SurfUtils001";
pub const MAPPING_API_INTERFACE: &str = "SurfMappingApi001";

pub struct CapabilityDirectory {
    entries: DashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl CapabilityDirectory {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn provide<T: Send + Sync + 'static>(&self, name: &str, capability: Arc<T>) {
        debug!("Providing capability {}", name);
        self.entries.insert(name.to_string(), capability);
    }

    /// Resolves a named capability to a typed handle.
    pub fn query<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, CapabilityError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| CapabilityError::NotFound(name.to_string()))?;
        entry
            .value()
            .clone()
            .downcast::<T>()
            .map_err(|_| CapabilityError::TypeMismatch(name.to_string()))
    }
}

impl Default for CapabilityDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FakeUtils {
        answer: u32,
    }

    #[test]
    fn query_resolves_a_provided_capability() {
        let directory = CapabilityDirectory::new();
        directory.provide(HOST_UTILS_INTERFACE, Arc::new(FakeUtils { answer: 42 }));

        let utils: Arc<FakeUtils> = directory.query(HOST_UTILS_INTERFACE).unwrap();
        assert_eq!(utils.answer, 42);
    }

    #[test]
    fn missing_capability_names_itself_in_the_diagnostic() {
        let directory = CapabilityDirectory::new();
        let err = directory.query::<FakeUtils>(MODE_REGISTRY_INTERFACE).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to find SurfModeManager001 interface"
        );
    }

    #[test]
    fn mismatched_type_is_not_silently_accepted() {
        let directory = CapabilityDirectory::new();
        directory.provide(MAPPING_API_INTERFACE, Arc::new(FakeUtils { answer: 0 }));
        let err = directory.query::<String>(MAPPING_API_INTERFACE).unwrap_err();
        assert!(matches!(err, CapabilityError::TypeMismatch(_)));
    }
}
