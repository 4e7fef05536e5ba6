//! dllmcp-storage: SQLite persistence for the dllmcp catalog.
//!
//! Uses rusqlite with bundled SQLite, WAL mode, and a versioned schema.

use chrono::{DateTime, Utc};
use dllmcp_core::{
    AuthoredDocs, CatalogModule, DllMcpError, DocumentationRecord, Entity, EntityKind,
    StorageConfig, SyntheticDocs,
};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

mod backend;
mod catalog;
mod queries;
mod schema;

/// SQLite-backed catalog of modules, entities and documentation.
///
/// Wraps `rusqlite::Connection` in a `Mutex` to satisfy the `Send + Sync`
/// bounds of `CatalogStore`.
pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    /// Get a lock on the underlying connection.
    pub(crate) fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, DllMcpError> {
        self.conn
            .lock()
            .map_err(|_| DllMcpError::Storage("connection mutex poisoned".to_string()))
    }

    /// Open (or create) a catalog database at the given path with default
    /// tuning.
    pub fn open(path: &Path) -> Result<Self, DllMcpError> {
        Self::open_with(path, &StorageConfig::default())
    }

    /// Open (or create) a catalog database at the given path.
    pub fn open_with(path: &Path, config: &StorageConfig) -> Result<Self, DllMcpError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).map_err(storage_err)?;

        // WAL mode so queries can run while a module is being committed
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(storage_err)?;
        conn.pragma_update(None, "cache_size", -(i64::from(config.cache_size_mb) * 1000))
            .map_err(storage_err)?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(storage_err)?;
        conn.pragma_update(None, "temp_store", "MEMORY")
            .map_err(storage_err)?;
        conn.busy_timeout(std::time::Duration::from_secs(config.busy_timeout_secs))
            .map_err(storage_err)?;

        schema::ensure_schema(&conn)?;
        tracing::debug!("opened catalog at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DllMcpError> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        schema::ensure_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

pub(crate) fn storage_err(e: rusqlite::Error) -> DllMcpError {
    DllMcpError::Storage(e.to_string())
}

pub(crate) fn from_timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Parameter and exception maps are stored as JSON only when non-empty.
pub(crate) fn map_to_json(map: &BTreeMap<String, String>) -> Result<Option<String>, DllMcpError> {
    if map.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(map)?))
}

pub(crate) fn map_from_json(
    json: Option<String>,
) -> Result<BTreeMap<String, String>, DllMcpError> {
    match json {
        Some(j) => serde_json::from_str(&j)
            .map_err(|e| DllMcpError::Storage(format!("corrupt documentation map: {e}"))),
        None => Ok(BTreeMap::new()),
    }
}

/// Text searched by `list_types`: full name, name and namespace, folded
/// with Unicode lowercasing (SQLite's own LIKE only folds ASCII).
pub(crate) fn search_key(
    full_name: Option<&str>,
    name: &str,
    namespace: Option<&str>,
) -> String {
    [full_name.unwrap_or_default(), name, namespace.unwrap_or_default()]
        .join("\n")
        .to_lowercase()
}

pub(crate) const MODULE_COLUMNS: &str = "id, name, has_documentation, origin_path, indexed_at";

/// Internal row struct for module deserialization.
pub(crate) struct ModuleRow {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) has_documentation: bool,
    pub(crate) origin_path: Option<String>,
    pub(crate) indexed_at: i64,
}

impl ModuleRow {
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            has_documentation: row.get(2)?,
            origin_path: row.get(3)?,
            indexed_at: row.get(4)?,
        })
    }

    pub(crate) fn into_module(self) -> CatalogModule {
        CatalogModule {
            id: self.id,
            name: self.name,
            has_documentation: self.has_documentation,
            origin_path: self.origin_path,
            indexed_at: from_timestamp(self.indexed_at),
        }
    }
}

pub(crate) const ENTITY_COLUMNS: &str = "e.id, e.module_id, e.parent_id, e.name, e.full_name, \
                                         e.namespace, e.kind, e.signature, e.base_type";

/// Internal row struct for entity deserialization. Reads the first nine
/// columns in [`ENTITY_COLUMNS`] order.
pub(crate) struct EntityRow {
    pub(crate) id: String,
    pub(crate) module_id: String,
    pub(crate) parent_id: Option<String>,
    pub(crate) name: String,
    pub(crate) full_name: Option<String>,
    pub(crate) namespace: Option<String>,
    pub(crate) kind: String,
    pub(crate) signature: String,
    pub(crate) base_type: Option<String>,
}

impl EntityRow {
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            module_id: row.get(1)?,
            parent_id: row.get(2)?,
            name: row.get(3)?,
            full_name: row.get(4)?,
            namespace: row.get(5)?,
            kind: row.get(6)?,
            signature: row.get(7)?,
            base_type: row.get(8)?,
        })
    }

    pub(crate) fn into_entity(self) -> Result<Entity, DllMcpError> {
        let kind: EntityKind = self.kind.parse()?;
        Ok(Entity {
            id: self.id,
            module_id: self.module_id,
            parent_id: self.parent_id,
            name: self.name,
            full_name: self.full_name,
            namespace: self.namespace,
            kind,
            signature: self.signature,
            base_type: self.base_type,
        })
    }
}

pub(crate) const DOC_COLUMNS: &str = "d.entity_id, d.xml_summary, d.xml_remarks, d.xml_returns, \
                                      d.xml_example, d.xml_params, d.xml_exceptions, \
                                      d.ai_summary, d.ai_example, d.last_updated";

/// Internal row struct for documentation deserialization. Reads ten columns
/// in [`DOC_COLUMNS`] order starting at `offset`; `entity_id` is NULL when
/// a LEFT JOIN found no record.
pub(crate) struct DocRow {
    pub(crate) entity_id: Option<String>,
    pub(crate) xml_summary: Option<String>,
    pub(crate) xml_remarks: Option<String>,
    pub(crate) xml_returns: Option<String>,
    pub(crate) xml_example: Option<String>,
    pub(crate) xml_params: Option<String>,
    pub(crate) xml_exceptions: Option<String>,
    pub(crate) ai_summary: Option<String>,
    pub(crate) ai_example: Option<String>,
    pub(crate) last_updated: Option<i64>,
}

impl DocRow {
    pub(crate) fn from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            entity_id: row.get(offset)?,
            xml_summary: row.get(offset + 1)?,
            xml_remarks: row.get(offset + 2)?,
            xml_returns: row.get(offset + 3)?,
            xml_example: row.get(offset + 4)?,
            xml_params: row.get(offset + 5)?,
            xml_exceptions: row.get(offset + 6)?,
            ai_summary: row.get(offset + 7)?,
            ai_example: row.get(offset + 8)?,
            last_updated: row.get(offset + 9)?,
        })
    }

    pub(crate) fn into_record(self) -> Result<Option<DocumentationRecord>, DllMcpError> {
        if self.entity_id.is_none() {
            return Ok(None);
        }
        Ok(Some(DocumentationRecord {
            authored: AuthoredDocs {
                summary: self.xml_summary,
                remarks: self.xml_remarks,
                returns: self.xml_returns,
                example: self.xml_example,
                params: map_from_json(self.xml_params)?,
                exceptions: map_from_json(self.xml_exceptions)?,
            },
            synthetic: SyntheticDocs {
                summary: self.ai_summary,
                example: self.ai_example,
            },
            last_updated: from_timestamp(self.last_updated.unwrap_or_default()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_map_is_empty_and_corrupt_map_is_an_error() {
        assert!(map_from_json(None).unwrap().is_empty());

        let map = map_from_json(Some(r#"{"a":"First operand"}"#.to_string())).unwrap();
        assert_eq!(map.get("a").map(String::as_str), Some("First operand"));

        let err = map_from_json(Some("{not json".to_string())).unwrap_err();
        assert!(matches!(err, DllMcpError::Storage(_)));
    }

    #[test]
    fn search_key_folds_beyond_ascii() {
        let key = search_key(Some("Größe.Ärger"), "Ärger", Some("Größe"));
        assert!(key.contains("größe.ärger"));
        assert!(!key.contains('Ä'));
        assert_eq!(search_key(None, "Plain", None), "\nplain\n");
    }
}
