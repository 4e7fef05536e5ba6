//! Catalog reads: modules, paginated type listings, members, entity
//! details and stats.

use crate::{
    storage_err, DocRow, EntityRow, ModuleRow, Storage, DOC_COLUMNS, ENTITY_COLUMNS,
    MODULE_COLUMNS,
};
use dllmcp_core::{
    CatalogModule, CatalogStats, DllMcpError, Entity, EntityDetail, TypeQuery, TypeSummary,
};
use rusqlite::{params, OptionalExtension};

impl Storage {
    // ── Modules ─────────────────────────────────────────────────────────

    pub fn get_module(&self, module_id: &str) -> Result<Option<CatalogModule>, DllMcpError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {MODULE_COLUMNS} FROM modules WHERE id = ?1"),
                params![module_id],
                ModuleRow::from_row,
            )
            .optional()
            .map_err(storage_err)?;
        Ok(row.map(ModuleRow::into_module))
    }

    /// All modules in insertion order.
    pub fn list_modules(&self) -> Result<Vec<CatalogModule>, DllMcpError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {MODULE_COLUMNS} FROM modules ORDER BY rowid"))
            .map_err(storage_err)?;
        let rows = stmt
            .query_map([], ModuleRow::from_row)
            .map_err(storage_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_err)?;
        Ok(rows.into_iter().map(ModuleRow::into_module).collect())
    }

    // ── Types ───────────────────────────────────────────────────────────

    /// One page of a module's types, ordered by full name then identifier.
    pub fn list_types(&self, query: &TypeQuery) -> Result<Vec<TypeSummary>, DllMcpError> {
        query.validate()?;

        let mut sql = format!(
            "SELECT {ENTITY_COLUMNS}, d.xml_summary, d.ai_summary
             FROM entities e LEFT JOIN documentation d ON d.entity_id = e.id
             WHERE e.module_id = ?1 AND e.parent_id IS NULL"
        );
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> =
            vec![Box::new(query.module_id.clone())];

        // Both sides are lowercased in Rust; see `search_key`.
        if let Some(search) = query.search_text() {
            param_values.push(Box::new(format!(
                "%{}%",
                escape_like(&search.to_lowercase())
            )));
            let n = param_values.len();
            sql.push_str(&format!(" AND e.search_key LIKE ?{n} ESCAPE '\\'"));
        }

        param_values.push(Box::new(i64::from(query.page_size)));
        let limit = param_values.len();
        param_values.push(Box::new(i64::try_from(query.offset()).unwrap_or(i64::MAX)));
        let offset = param_values.len();
        sql.push_str(&format!(
            " ORDER BY e.full_name, e.id LIMIT ?{limit} OFFSET ?{offset}"
        ));

        let refs: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql).map_err(storage_err)?;
        let rows = stmt
            .query_map(refs.as_slice(), |row| {
                let entity = EntityRow::from_row(row)?;
                let authored: Option<String> = row.get(9)?;
                let synthetic: Option<String> = row.get(10)?;
                Ok((entity, authored, synthetic))
            })
            .map_err(storage_err)?;

        let mut result = Vec::new();
        for row in rows {
            let (entity, authored, synthetic) = row.map_err(storage_err)?;
            let summary = non_blank(authored).or_else(|| non_blank(synthetic));
            result.push(TypeSummary {
                entity: entity.into_entity()?,
                summary,
            });
        }
        Ok(result)
    }

    // ── Members & Entities ──────────────────────────────────────────────

    /// Members declared on `type_id`, in the order they were indexed.
    pub fn list_members(&self, type_id: &str) -> Result<Vec<Entity>, DllMcpError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {ENTITY_COLUMNS} FROM entities e WHERE e.parent_id = ?1 ORDER BY e.ordinal"
            ))
            .map_err(storage_err)?;
        let rows = stmt
            .query_map(params![type_id], EntityRow::from_row)
            .map_err(storage_err)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row.map_err(storage_err)?.into_entity()?);
        }
        Ok(result)
    }

    pub fn get_entity(&self, entity_id: &str) -> Result<Option<EntityDetail>, DllMcpError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {ENTITY_COLUMNS}, {DOC_COLUMNS}
                     FROM entities e LEFT JOIN documentation d ON d.entity_id = e.id
                     WHERE e.id = ?1"
                ),
                params![entity_id],
                |row| Ok((EntityRow::from_row(row)?, DocRow::from_row(row, 9)?)),
            )
            .optional()
            .map_err(storage_err)?;

        match row {
            Some((entity, docs)) => Ok(Some(EntityDetail {
                entity: entity.into_entity()?,
                documentation: docs.into_record()?,
            })),
            None => Ok(None),
        }
    }

    // ── Stats ───────────────────────────────────────────────────────────

    /// Get catalog statistics.
    pub fn stats(&self) -> Result<CatalogStats, DllMcpError> {
        let conn = self.conn()?;
        let count = |sql: &str| -> Result<usize, DllMcpError> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0)).map_err(storage_err)?;
            Ok(n as usize)
        };

        Ok(CatalogStats {
            module_count: count("SELECT COUNT(*) FROM modules")?,
            type_count: count("SELECT COUNT(*) FROM entities WHERE parent_id IS NULL")?,
            member_count: count("SELECT COUNT(*) FROM entities WHERE parent_id IS NOT NULL")?,
            documented_count: count(
                "SELECT COUNT(*) FROM documentation
                 WHERE TRIM(COALESCE(xml_summary, '')) <> ''
                    OR TRIM(COALESCE(ai_summary, '')) <> ''",
            )?,
        })
    }
}

/// Escape LIKE wildcards so search text matches literally.
fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dllmcp_core::{AuthoredDocs, EntityKind, IndexedEntity, ModuleBatch, SyntheticDocs};

    fn type_entity(module_id: &str, namespace: &str, name: &str) -> IndexedEntity {
        let full_name = format!("{namespace}.{name}");
        IndexedEntity {
            entity: Entity {
                id: format!("T:{full_name}"),
                module_id: module_id.to_string(),
                parent_id: None,
                name: name.to_string(),
                full_name: Some(full_name.clone()),
                namespace: Some(namespace.to_string()),
                kind: EntityKind::Class,
                signature: format!("class {full_name}"),
                base_type: None,
            },
            authored: None,
        }
    }

    fn member(parent: &str, name: &str, kind: EntityKind) -> IndexedEntity {
        IndexedEntity {
            entity: Entity {
                id: format!("M:{}.{name}", parent.trim_start_matches("T:")),
                module_id: "m1".to_string(),
                parent_id: Some(parent.to_string()),
                name: name.to_string(),
                full_name: None,
                namespace: None,
                kind,
                signature: name.to_string(),
                base_type: None,
            },
            authored: None,
        }
    }

    fn seeded() -> Storage {
        let storage = Storage::open_in_memory().unwrap();
        let mut documented = type_entity("m1", "Zeta", "Widget");
        documented.authored = Some(AuthoredDocs {
            summary: Some("A widget".to_string()),
            ..Default::default()
        });
        storage
            .commit_module(&ModuleBatch {
                module: dllmcp_core::CatalogModule {
                    id: "m1".to_string(),
                    name: "Widgets".to_string(),
                    has_documentation: true,
                    origin_path: None,
                    indexed_at: Utc::now(),
                },
                entities: vec![
                    documented,
                    member("T:Zeta.Widget", "Spin", EntityKind::Method),
                    member("T:Zeta.Widget", "Angle", EntityKind::Property),
                    type_entity("m1", "Alpha", "Calculator"),
                    type_entity("m1", "Alpha", "Percent_Helper"),
                    type_entity("m1", "Alpha.Widgets", "Knob"),
                    type_entity("m1", "Beta", "PercentXHelper"),
                    type_entity("m1", "Omega", "Übersetzer"),
                ],
            })
            .unwrap();
        storage
    }

    fn names(rows: &[TypeSummary]) -> Vec<&str> {
        rows.iter()
            .map(|r| r.entity.full_name.as_deref().unwrap_or_default())
            .collect()
    }

    #[test]
    fn types_are_ordered_by_full_name() {
        let storage = seeded();
        let rows = storage.list_types(&TypeQuery::new("m1")).unwrap();
        assert_eq!(
            names(&rows),
            vec![
                "Alpha.Calculator",
                "Alpha.Percent_Helper",
                "Alpha.Widgets.Knob",
                "Beta.PercentXHelper",
                "Omega.Übersetzer",
                "Zeta.Widget",
            ]
        );
        assert_eq!(rows[5].summary.as_deref(), Some("A widget"));
        assert!(rows[0].summary.is_none());
    }

    #[test]
    fn search_matches_name_namespace_or_full_name_case_insensitively() {
        let storage = seeded();
        let rows = storage
            .list_types(&TypeQuery::new("m1").search("WIDGET"))
            .unwrap();
        assert_eq!(names(&rows), vec!["Alpha.Widgets.Knob", "Zeta.Widget"]);

        let rows = storage
            .list_types(&TypeQuery::new("m1").search("beta"))
            .unwrap();
        assert_eq!(names(&rows), vec!["Beta.PercentXHelper"]);
    }

    #[test]
    fn search_folds_non_ascii_letters() {
        let storage = seeded();
        let rows = storage
            .list_types(&TypeQuery::new("m1").search("ÜBER"))
            .unwrap();
        assert_eq!(names(&rows), vec!["Omega.Übersetzer"]);

        let rows = storage
            .list_types(&TypeQuery::new("m1").search("übersetzer"))
            .unwrap();
        assert_eq!(names(&rows), vec!["Omega.Übersetzer"]);
    }

    #[test]
    fn like_wildcards_in_search_are_literal() {
        let storage = seeded();
        let rows = storage
            .list_types(&TypeQuery::new("m1").search("Percent_"))
            .unwrap();
        assert_eq!(names(&rows), vec!["Alpha.Percent_Helper"]);
        let rows = storage
            .list_types(&TypeQuery::new("m1").search("%"))
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn out_of_range_page_is_empty_and_bad_pages_are_rejected() {
        let storage = seeded();
        let rows = storage
            .list_types(&TypeQuery::new("m1").page(99, 20))
            .unwrap();
        assert!(rows.is_empty());

        let err = storage
            .list_types(&TypeQuery::new("m1").page(1, 0))
            .unwrap_err();
        assert!(matches!(err, DllMcpError::InvalidRequest(_)));
    }

    #[test]
    fn unknown_module_lists_nothing() {
        let storage = seeded();
        assert!(storage
            .list_types(&TypeQuery::new("nope"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn members_come_back_in_index_order() {
        let storage = seeded();
        let members = storage.list_members("T:Zeta.Widget").unwrap();
        let names: Vec<_> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Spin", "Angle"]);
        assert!(storage.list_members("T:Alpha.Calculator").unwrap().is_empty());
    }

    #[test]
    fn entity_without_documentation_has_no_record() {
        let storage = seeded();
        let detail = storage.get_entity("T:Alpha.Calculator").unwrap().unwrap();
        assert!(detail.documentation.is_none());
        assert!(storage.get_entity("T:Nope").unwrap().is_none());
    }

    #[test]
    fn corrupt_parameter_map_is_a_storage_error() {
        let storage = seeded();
        storage
            .conn()
            .unwrap()
            .execute(
                "UPDATE documentation SET xml_params = '{oops' WHERE entity_id = 'T:Zeta.Widget'",
                [],
            )
            .unwrap();
        let err = storage.get_entity("T:Zeta.Widget").unwrap_err();
        assert!(matches!(err, DllMcpError::Storage(_)));
    }

    #[test]
    fn module_of_and_stats() {
        let storage = seeded();
        let store: &dyn dllmcp_core::CatalogStore = &storage;
        let module = store.module_of("M:Zeta.Widget.Spin").unwrap().unwrap();
        assert_eq!(module.name, "Widgets");

        storage
            .set_synthetic_docs(
                "T:Alpha.Calculator",
                &SyntheticDocs {
                    summary: Some("Adds things".to_string()),
                    example: None,
                },
            )
            .unwrap();
        let stats = storage.stats().unwrap();
        assert_eq!(stats.module_count, 1);
        assert_eq!(stats.type_count, 6);
        assert_eq!(stats.member_count, 2);
        assert_eq!(stats.documented_count, 2);
    }

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(escape_like(r"a%b_c\d"), r"a\%b\_c\\d");
    }
}
