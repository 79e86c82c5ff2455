//! Resolution of model names to backend handles.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::backend::ModelHandle;
use crate::error::RepositoryError;

/// Maps model names to the backend handles that serve them.
///
/// Built once during startup and shared read-only afterwards.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    handles: BTreeMap<String, Arc<dyn ModelHandle>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handle under its own model name.
    pub fn register(mut self, handle: impl ModelHandle + 'static) -> Self {
        self.insert(Arc::new(handle));
        self
    }

    /// Registers an already shared handle, replacing one with the same name.
    pub fn insert(&mut self, handle: Arc<dyn ModelHandle>) {
        self.handles.insert(handle.model_name().to_string(), handle);
    }

    /// Resolves a model name.
    pub fn resolve(&self, model: &str) -> Result<Arc<dyn ModelHandle>, RepositoryError> {
        self.handles
            .get(model)
            .cloned()
            .ok_or_else(|| RepositoryError::UnknownModel(model.to_string()))
    }

    pub fn contains(&self, model: &str) -> bool {
        self.handles.contains_key(model)
    }

    /// Registered model names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(|s| s.as_str())
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.handles.keys().collect::<Vec<_>>())
            .finish()
    }
}
