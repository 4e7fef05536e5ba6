use std::path::Path;

use crate::{
    CatalogModule, CatalogStats, DllMcpError, Entity, EntityDetail, ModuleBatch, SyntheticDocs,
    TypeQuery, TypeSummary,
};

// ── Catalog Store Trait ─────────────────────────────────────────────────────

/// Persistence contract for the catalog.
///
/// Writes arrive as whole [`ModuleBatch`]es so an implementation can make a
/// module visible atomically; readers must never observe a partially
/// committed module. Entity rows use insert-or-replace semantics keyed by
/// identifier, and re-committing an entity must not clear its synthetic
/// documentation layer.
pub trait CatalogStore: Send + Sync {
    // ── Writes ──────────────────────────────────────────────────────

    /// Persist a module record and all of its entities as one unit.
    fn commit_module(&self, batch: &ModuleBatch) -> Result<(), DllMcpError>;

    /// Replace the synthetic documentation layer of an entity.
    /// Returns `NotFound` if the entity does not exist.
    fn set_synthetic_docs(&self, entity_id: &str, docs: &SyntheticDocs)
        -> Result<(), DllMcpError>;

    /// Delete a module and everything it owns. Returns true if it existed.
    fn delete_module(&self, module_id: &str) -> Result<bool, DllMcpError>;

    // ── Reads ───────────────────────────────────────────────────────

    /// Get a module by catalog id.
    fn get_module(&self, module_id: &str) -> Result<Option<CatalogModule>, DllMcpError>;

    /// All modules, in insertion order.
    fn list_modules(&self) -> Result<Vec<CatalogModule>, DllMcpError>;

    /// Types of one module ordered by full name, filtered and paginated.
    /// An out-of-range page yields an empty vector.
    fn list_types(&self, query: &TypeQuery) -> Result<Vec<TypeSummary>, DllMcpError>;

    /// Members declared on one type, in index order.
    fn list_members(&self, type_id: &str) -> Result<Vec<Entity>, DllMcpError>;

    /// An entity (type or member) with its documentation record.
    fn get_entity(&self, entity_id: &str) -> Result<Option<EntityDetail>, DllMcpError>;

    /// The module that owns an entity.
    fn module_of(&self, entity_id: &str) -> Result<Option<CatalogModule>, DllMcpError> {
        match self.get_entity(entity_id)? {
            Some(detail) => self.get_module(&detail.entity.module_id),
            None => Ok(None),
        }
    }

    /// Catalog-wide counts.
    fn stats(&self) -> Result<CatalogStats, DllMcpError>;
}

// ── Decompiler Trait ────────────────────────────────────────────────────────

/// Source-text reconstruction for a single entity of a binary module.
///
/// Best effort: `None` means "unavailable" and is never an error.
pub trait Decompiler: Send + Sync {
    /// Language tag of the produced text.
    fn language(&self) -> &str {
        "csharp"
    }

    fn decompile(&self, module_path: &Path, entity_id: &str) -> Option<String>;
}

/// Decompiler that never produces source.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

impl Decompiler for Unavailable {
    fn decompile(&self, _module_path: &Path, _entity_id: &str) -> Option<String> {
        None
    }
}
