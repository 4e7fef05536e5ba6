//! Indexing pipeline orchestrator.
//!
//! Loads a module, loads its sidecar documentation, walks every exported
//! type and member, names each one, attaches the authored documentation
//! found under that name and commits the whole module to the catalog in one
//! call.

use crate::docid;
use crate::registry::ModuleRegistry;
use crate::walker::EntityWalker;
use crate::xmldoc::DocCommentStore;
use chrono::Utc;
use dllmcp_core::{
    CatalogModule, CatalogStore, DllMcpError, Entity, IndexedEntity, ModuleBatch,
};
use dllmcp_metadata::ModuleModel;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Produces the structural model of a binary module.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<ModuleModel, DllMcpError>;
}

/// Reads modules with the ECMA-335 metadata reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataLoader;

impl ModuleLoader for MetadataLoader {
    fn load(&self, path: &Path) -> Result<ModuleModel, DllMcpError> {
        dllmcp_metadata::load_module(path)
    }
}

/// Outcome of indexing one module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexReport {
    /// Catalog id of the new module record.
    pub module_id: String,
    pub module_name: String,
    pub has_documentation: bool,
    pub type_count: usize,
    pub member_count: usize,
    /// Entities whose identifier matched a documentation entry.
    pub documented_count: usize,
    /// Non-fatal problems, e.g. an unreadable documentation file or
    /// duplicate identifiers.
    pub warnings: Vec<String>,
}

/// The indexing pipeline.
pub struct Indexer {
    store: Arc<dyn CatalogStore>,
    loader: Box<dyn ModuleLoader>,
    registry: Option<Arc<ModuleRegistry>>,
    strict_documentation: bool,
}

impl Indexer {
    /// Create an Indexer that reads modules from disk.
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self::with_loader(store, Box::new(MetadataLoader))
    }

    pub fn with_loader(store: Arc<dyn CatalogStore>, loader: Box<dyn ModuleLoader>) -> Self {
        Self {
            store,
            loader,
            registry: None,
            strict_documentation: false,
        }
    }

    /// Keep every indexed model in `registry` under its catalog id.
    pub fn with_registry(mut self, registry: Arc<ModuleRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Fail the whole call on a malformed documentation file instead of
    /// indexing without documentation.
    pub fn strict_documentation(mut self, strict: bool) -> Self {
        self.strict_documentation = strict;
        self
    }

    /// Index the module at `module_path`, correlating it with the
    /// documentation file at `doc_path` when one is given.
    ///
    /// Nothing is written unless the module loads and every entity can be
    /// named.
    pub fn index(
        &self,
        module_path: &Path,
        doc_path: Option<&Path>,
    ) -> Result<IndexReport, DllMcpError> {
        let model = self.loader.load(module_path)?;
        let mut warnings = Vec::new();

        let docs = match doc_path {
            Some(path) => self.load_docs(path, &mut warnings)?,
            None => None,
        };

        let module = CatalogModule {
            id: uuid::Uuid::new_v4().to_string(),
            name: model.name.clone(),
            has_documentation: docs.is_some(),
            origin_path: Some(origin_path(module_path)),
            indexed_at: Utc::now(),
        };

        let entities = collect_entities(&model, &module.id, docs.as_ref(), &mut warnings)?;

        let type_count = entities.iter().filter(|e| e.entity.kind.is_type()).count();
        let documented_count = entities
            .iter()
            .filter(|e| e.authored.as_ref().is_some_and(|a| !a.is_empty()))
            .count();

        let report = IndexReport {
            module_id: module.id.clone(),
            module_name: module.name.clone(),
            has_documentation: module.has_documentation,
            type_count,
            member_count: entities.len() - type_count,
            documented_count,
            warnings,
        };

        self.store.commit_module(&ModuleBatch { module, entities })?;

        if let Some(registry) = &self.registry {
            registry.insert(&report.module_id, Arc::new(model));
        }

        tracing::info!(
            "Indexed {} as {}: {} types, {} members, {} documented, {} warnings",
            report.module_name,
            report.module_id,
            report.type_count,
            report.member_count,
            report.documented_count,
            report.warnings.len(),
        );

        Ok(report)
    }

    fn load_docs(
        &self,
        path: &Path,
        warnings: &mut Vec<String>,
    ) -> Result<Option<DocCommentStore>, DllMcpError> {
        match DocCommentStore::load(path) {
            Ok(Some(store)) => {
                tracing::debug!("{} documentation entries in {}", store.len(), path.display());
                Ok(Some(store))
            }
            Ok(None) => {
                tracing::debug!("no documentation file at {}", path.display());
                Ok(None)
            }
            Err(err) if self.strict_documentation => Err(err),
            Err(err) => {
                tracing::warn!("Ignoring documentation: {}", err);
                warnings.push(err.to_string());
                Ok(None)
            }
        }
    }
}

/// Every exported type and member of `model` in walker order. A repeated
/// identifier replaces the earlier entity in place.
fn collect_entities(
    model: &ModuleModel,
    module_id: &str,
    docs: Option<&DocCommentStore>,
    warnings: &mut Vec<String>,
) -> Result<Vec<IndexedEntity>, DllMcpError> {
    let mut entities: Vec<IndexedEntity> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    let mut push = |entity: Entity| {
        let authored = docs.and_then(|d| d.lookup(&entity.id)).cloned();
        let indexed = IndexedEntity { entity, authored };
        match positions.get(&indexed.entity.id) {
            Some(&at) => {
                tracing::warn!("Duplicate identifier {}", indexed.entity.id);
                warnings.push(format!(
                    "duplicate identifier {}; later declaration replaces the earlier one",
                    indexed.entity.id
                ));
                entities[at] = indexed;
            }
            None => {
                positions.insert(indexed.entity.id.clone(), entities.len());
                entities.push(indexed);
            }
        }
    };

    let walker = EntityWalker::new(model);
    for ty in walker.types() {
        let type_id = docid::type_id(&ty.name);

        push(Entity {
            id: type_id.clone(),
            module_id: module_id.to_string(),
            parent_id: None,
            name: ty.definition.name.clone(),
            full_name: Some(ty.full_name.clone()),
            namespace: Some(ty.namespace.clone()),
            kind: ty.kind,
            signature: ty.signature.clone(),
            base_type: ty.base_type.clone(),
        });

        for member in walker.members(&ty) {
            push(Entity {
                id: docid::member_id(&ty.name, &member.shape)?,
                module_id: module_id.to_string(),
                parent_id: Some(type_id.clone()),
                name: member.name.to_string(),
                full_name: None,
                namespace: None,
                kind: member.kind,
                signature: member.signature,
                base_type: None,
            });
        }
    }

    Ok(entities)
}

fn origin_path(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .to_string()
}
