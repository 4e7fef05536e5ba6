//! Loaded modules held for the lifetime of a session, keyed by catalog id.

use dllmcp_metadata::ModuleModel;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Session registry of loaded module models.
///
/// Owned explicitly by whoever runs the indexer (the tool server, a test);
/// entries live until [`ModuleRegistry::unload`] is called.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: RwLock<HashMap<String, Arc<ModuleModel>>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, catalog_id: &str, model: Arc<ModuleModel>) {
        if let Ok(mut modules) = self.modules.write() {
            modules.insert(catalog_id.to_string(), model);
        }
    }

    pub fn get(&self, catalog_id: &str) -> Option<Arc<ModuleModel>> {
        self.modules
            .read()
            .ok()
            .and_then(|modules| modules.get(catalog_id).cloned())
    }

    pub fn is_loaded(&self, catalog_id: &str) -> bool {
        self.get(catalog_id).is_some()
    }

    /// Drop the model for `catalog_id`. Returns whether it was loaded.
    pub fn unload(&self, catalog_id: &str) -> bool {
        let removed = self
            .modules
            .write()
            .map(|mut modules| modules.remove(catalog_id).is_some())
            .unwrap_or(false);
        if removed {
            tracing::debug!("unloaded module {}", catalog_id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.modules.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
