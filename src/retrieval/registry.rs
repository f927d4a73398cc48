use crate::retrieval::AdapterHandle;
use std::collections::HashMap;
use tracing::debug;

/// Collection id → adapter handle
///
/// Owned by the caller and passed by reference.
#[derive(Debug, Clone, Default)]
pub struct AdapterRegistry {
    handles: HashMap<String, AdapterHandle>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle; returns the one it replaced, if any
    pub fn register(
        &mut self,
        collection_id: impl Into<String>,
        handle: AdapterHandle,
    ) -> Option<AdapterHandle> {
        let collection_id = collection_id.into();
        debug!(
            "Registering adapter '{}' for collection '{}'",
            handle.name(),
            collection_id
        );
        self.handles.insert(collection_id, handle)
    }

    pub fn get(&self, collection_id: &str) -> Option<&AdapterHandle> {
        self.handles.get(collection_id)
    }

    pub fn evict(&mut self, collection_id: &str) -> Option<AdapterHandle> {
        self.handles.remove(collection_id)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Registered collection ids, sorted
    pub fn collection_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.handles.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
