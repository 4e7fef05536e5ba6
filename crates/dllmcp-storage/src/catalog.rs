//! Catalog writes: module commits, synthetic documentation, deletion.

use crate::{map_to_json, search_key, storage_err, Storage};
use dllmcp_core::{AuthoredDocs, DllMcpError, ModuleBatch, SyntheticDocs};
use rusqlite::{params, Connection};

impl Storage {
    /// Persist a module and all of its entities in one transaction.
    ///
    /// Entities are insert-or-replace by identifier. The authored layer of
    /// each documentation record is rewritten; the synthetic layer is left
    /// alone. Older modules indexed from the same origin path are removed
    /// along with any of their entities the new batch did not take over.
    pub fn commit_module(&self, batch: &ModuleBatch) -> Result<(), DllMcpError> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction().map_err(storage_err)?;
        let module = &batch.module;
        let now = module.indexed_at.timestamp();

        tx.execute(
            "INSERT OR REPLACE INTO modules (id, name, has_documentation, origin_path, indexed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                module.id,
                module.name,
                module.has_documentation,
                module.origin_path,
                now,
            ],
        )
        .map_err(storage_err)?;

        for (ordinal, indexed) in batch.entities.iter().enumerate() {
            let entity = &indexed.entity;
            tx.execute(
                "INSERT OR REPLACE INTO entities
                 (id, module_id, parent_id, name, full_name, namespace, kind, signature, base_type,
                  search_key, ordinal)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    entity.id,
                    module.id,
                    entity.parent_id,
                    entity.name,
                    entity.full_name,
                    entity.namespace,
                    entity.kind.to_string(),
                    entity.signature,
                    entity.base_type,
                    search_key(
                        entity.full_name.as_deref(),
                        &entity.name,
                        entity.namespace.as_deref()
                    ),
                    ordinal as i64,
                ],
            )
            .map_err(storage_err)?;

            match &indexed.authored {
                Some(docs) => upsert_authored(&tx, &entity.id, docs, now)?,
                None => clear_authored(&tx, &entity.id, now)?,
            }
        }

        if let Some(origin) = &module.origin_path {
            let superseded: Vec<String> = {
                let mut stmt = tx
                    .prepare("SELECT id FROM modules WHERE origin_path = ?1 AND id <> ?2")
                    .map_err(storage_err)?;
                let ids = stmt
                    .query_map(params![origin, module.id], |row| row.get(0))
                    .map_err(storage_err)?
                    .collect::<Result<Vec<String>, _>>()
                    .map_err(storage_err)?;
                ids
            };
            for old in &superseded {
                tracing::debug!("module {} supersedes {}", module.id, old);
                delete_module_rows(&tx, old)?;
            }
        }

        tx.commit().map_err(storage_err)?;
        Ok(())
    }

    /// Replace the synthetic documentation layer of an entity.
    pub fn set_synthetic_docs(
        &self,
        entity_id: &str,
        docs: &SyntheticDocs,
    ) -> Result<(), DllMcpError> {
        let conn = self.conn()?;
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM entities WHERE id = ?1)",
                params![entity_id],
                |row| row.get(0),
            )
            .map_err(storage_err)?;
        if !exists {
            return Err(DllMcpError::NotFound(format!("entity {entity_id}")));
        }

        conn.execute(
            "INSERT INTO documentation (entity_id, ai_summary, ai_example, last_updated)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(entity_id) DO UPDATE SET
                ai_summary = excluded.ai_summary,
                ai_example = excluded.ai_example,
                last_updated = excluded.last_updated",
            params![
                entity_id,
                docs.summary,
                docs.example,
                chrono::Utc::now().timestamp(),
            ],
        )
        .map_err(storage_err)?;

        Ok(())
    }

    /// Delete a module with its entities and their documentation.
    pub fn delete_module(&self, module_id: &str) -> Result<bool, DllMcpError> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction().map_err(storage_err)?;
        let deleted = delete_module_rows(&tx, module_id)?;
        tx.commit().map_err(storage_err)?;
        Ok(deleted)
    }
}

fn upsert_authored(
    conn: &Connection,
    entity_id: &str,
    docs: &AuthoredDocs,
    now: i64,
) -> Result<(), DllMcpError> {
    conn.execute(
        "INSERT INTO documentation
         (entity_id, xml_summary, xml_remarks, xml_returns, xml_example, xml_params, xml_exceptions, last_updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(entity_id) DO UPDATE SET
            xml_summary = excluded.xml_summary,
            xml_remarks = excluded.xml_remarks,
            xml_returns = excluded.xml_returns,
            xml_example = excluded.xml_example,
            xml_params = excluded.xml_params,
            xml_exceptions = excluded.xml_exceptions,
            last_updated = excluded.last_updated",
        params![
            entity_id,
            docs.summary,
            docs.remarks,
            docs.returns,
            docs.example,
            map_to_json(&docs.params)?,
            map_to_json(&docs.exceptions)?,
            now,
        ],
    )
    .map_err(storage_err)?;
    Ok(())
}

/// Drop a stale authored layer left by an earlier index of the same entity.
fn clear_authored(conn: &Connection, entity_id: &str, now: i64) -> Result<(), DllMcpError> {
    conn.execute(
        "UPDATE documentation SET
            xml_summary = NULL, xml_remarks = NULL, xml_returns = NULL,
            xml_example = NULL, xml_params = NULL, xml_exceptions = NULL,
            last_updated = ?2
         WHERE entity_id = ?1 AND (xml_summary IS NOT NULL OR xml_remarks IS NOT NULL
            OR xml_returns IS NOT NULL OR xml_example IS NOT NULL
            OR xml_params IS NOT NULL OR xml_exceptions IS NOT NULL)",
        params![entity_id, now],
    )
    .map_err(storage_err)?;
    Ok(())
}

fn delete_module_rows(conn: &Connection, module_id: &str) -> Result<bool, DllMcpError> {
    conn.execute(
        "DELETE FROM documentation WHERE entity_id IN
            (SELECT id FROM entities WHERE module_id = ?1)",
        params![module_id],
    )
    .map_err(storage_err)?;
    conn.execute("DELETE FROM entities WHERE module_id = ?1", params![module_id])
        .map_err(storage_err)?;
    let rows = conn
        .execute("DELETE FROM modules WHERE id = ?1", params![module_id])
        .map_err(storage_err)?;
    Ok(rows > 0)
}
