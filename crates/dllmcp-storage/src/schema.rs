//! Catalog schema, versioned through SQLite's `user_version`.
//!
//! The catalog is a cache of what the indexer read: when the layout
//! changes the version is bumped and older files are refused rather than
//! upgraded in place, since re-indexing rebuilds them.

use crate::storage_err;
use dllmcp_core::DllMcpError;
use rusqlite::Connection;

/// Layout version written by this build.
pub(crate) const SCHEMA_VERSION: u32 = 1;

const SCHEMA: &str = include_str!("schema.sql");

/// Create the schema on a fresh database, or check that an existing one
/// has the layout this build reads.
pub(crate) fn ensure_schema(conn: &Connection) -> Result<(), DllMcpError> {
    let found: u32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(storage_err)?;

    match found {
        SCHEMA_VERSION => Ok(()),
        0 => {
            tracing::info!("Creating catalog schema v{SCHEMA_VERSION}");
            let tx = conn.unchecked_transaction().map_err(storage_err)?;
            tx.execute_batch(SCHEMA).map_err(|e| {
                DllMcpError::Storage(format!("Creating catalog schema failed: {e}"))
            })?;
            tx.pragma_update(None, "user_version", SCHEMA_VERSION)
                .map_err(storage_err)?;
            tx.commit().map_err(storage_err)
        }
        other => Err(DllMcpError::Storage(format!(
            "catalog schema v{other} is not readable by this build (expects v{SCHEMA_VERSION}); \
             delete the catalog file and re-index"
        ))),
    }
}
