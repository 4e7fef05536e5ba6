//! `CatalogStore` trait implementation for Storage.

use crate::Storage;
use dllmcp_core::{
    CatalogModule, CatalogStats, CatalogStore, DllMcpError, Entity, EntityDetail, ModuleBatch,
    SyntheticDocs, TypeQuery, TypeSummary,
};

impl CatalogStore for Storage {
    fn commit_module(&self, batch: &ModuleBatch) -> Result<(), DllMcpError> {
        Storage::commit_module(self, batch)
    }

    fn set_synthetic_docs(
        &self,
        entity_id: &str,
        docs: &SyntheticDocs,
    ) -> Result<(), DllMcpError> {
        Storage::set_synthetic_docs(self, entity_id, docs)
    }

    fn delete_module(&self, module_id: &str) -> Result<bool, DllMcpError> {
        Storage::delete_module(self, module_id)
    }

    fn get_module(&self, module_id: &str) -> Result<Option<CatalogModule>, DllMcpError> {
        Storage::get_module(self, module_id)
    }

    fn list_modules(&self) -> Result<Vec<CatalogModule>, DllMcpError> {
        Storage::list_modules(self)
    }

    fn list_types(&self, query: &TypeQuery) -> Result<Vec<TypeSummary>, DllMcpError> {
        Storage::list_types(self, query)
    }

    fn list_members(&self, type_id: &str) -> Result<Vec<Entity>, DllMcpError> {
        Storage::list_members(self, type_id)
    }

    fn get_entity(&self, entity_id: &str) -> Result<Option<EntityDetail>, DllMcpError> {
        Storage::get_entity(self, entity_id)
    }

    fn stats(&self) -> Result<CatalogStats, DllMcpError> {
        Storage::stats(self)
    }
}
