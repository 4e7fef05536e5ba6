//! Catalog tools: index an assembly, list assemblies, types and members.

use crate::types::{AssemblyInfo, IndexedAssembly, MemberInfo, ToolResult, TypeInfo, TypePage};
use crate::{optional_str, optional_u32, required_str, McpServer};
use dllmcp_core::TypeQuery;
use serde_json::Value;
use std::path::Path;

impl McpServer {
    pub(crate) fn tool_index_assembly(&self, args: &Value) -> ToolResult {
        let dll_path = match required_str(args, "dllPath") {
            Ok(p) => p,
            Err(e) => return ToolResult::tool_error(e),
        };
        let xml_path = optional_str(args, "xmlPath")
            .filter(|p| !p.trim().is_empty())
            .map(Path::new);

        match self.indexer.index(Path::new(dll_path), xml_path) {
            Ok(report) => ToolResult::json(&IndexedAssembly::from(report)),
            Err(e) => {
                tracing::warn!("Indexing {dll_path} failed: {e}");
                ToolResult::tool_error(e.to_string())
            }
        }
    }

    pub(crate) fn tool_list_assemblies(&self) -> ToolResult {
        match self.store.list_modules() {
            Ok(modules) => {
                let assemblies: Vec<AssemblyInfo> = modules
                    .into_iter()
                    .map(|m| {
                        let loaded = self.registry.is_loaded(&m.id);
                        AssemblyInfo::new(m, loaded)
                    })
                    .collect();
                ToolResult::json(&assemblies)
            }
            Err(e) => ToolResult::tool_error(e.to_string()),
        }
    }

    pub(crate) fn tool_list_types(&self, args: &Value) -> ToolResult {
        let assembly_id = match required_str(args, "assemblyId") {
            Ok(id) => id,
            Err(e) => return ToolResult::tool_error(e),
        };
        let (page, requested_size) =
            match (optional_u32(args, "page"), optional_u32(args, "pageSize")) {
                (Ok(page), Ok(size)) => (page.unwrap_or(1), size),
                (Err(e), _) | (_, Err(e)) => return ToolResult::tool_error(e),
            };
        let page_size = match self.catalog.page_size(requested_size) {
            Ok(size) => size,
            Err(e) => return ToolResult::tool_error(e.to_string()),
        };

        match self.store.get_module(assembly_id) {
            Ok(Some(_)) => {}
            Ok(None) => return ToolResult::tool_error(format!("Assembly not found: {assembly_id}")),
            Err(e) => return ToolResult::tool_error(e.to_string()),
        }

        let mut query = TypeQuery::new(assembly_id).page(page, page_size);
        if let Some(search) = optional_str(args, "search") {
            query = query.search(search);
        }

        match self.store.list_types(&query) {
            Ok(rows) => ToolResult::json(&TypePage {
                types: rows.into_iter().map(TypeInfo::from).collect(),
                page,
                page_size,
            }),
            Err(e) => ToolResult::tool_error(e.to_string()),
        }
    }

    pub(crate) fn tool_list_members(&self, args: &Value) -> ToolResult {
        let type_id = match required_str(args, "typeId") {
            Ok(id) => id,
            Err(e) => return ToolResult::tool_error(e),
        };

        match self.store.get_entity(type_id) {
            Ok(Some(detail)) if detail.entity.kind.is_type() => {}
            Ok(_) => return ToolResult::tool_error(format!("Type not found: {type_id}")),
            Err(e) => return ToolResult::tool_error(e.to_string()),
        }

        match self.store.list_members(type_id) {
            Ok(members) => {
                let members: Vec<MemberInfo> = members.into_iter().map(MemberInfo::from).collect();
                ToolResult::json(&members)
            }
            Err(e) => ToolResult::tool_error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_helpers::{call_tool, call_tool_json, seeded_server, test_server};
    use serde_json::json;

    #[test]
    fn list_assemblies_empty_catalog() {
        let server = test_server();
        let assemblies = call_tool_json(&server, "dll.listAssemblies", json!({}));
        assert_eq!(assemblies, json!([]));
    }

    #[test]
    fn list_assemblies_reports_seeded_module() {
        let server = seeded_server();
        let assemblies = call_tool_json(&server, "dll.listAssemblies", json!({}));
        assert_eq!(assemblies[0]["id"], "m1");
        assert_eq!(assemblies[0]["name"], "Seeded");
        assert_eq!(assemblies[0]["hasXmlDocumentation"], true);
        assert_eq!(assemblies[0]["loaded"], false);
    }

    #[test]
    fn list_types_pages_and_filters() {
        let server = seeded_server();
        let page = call_tool_json(
            &server,
            "dll.listTypes",
            json!({"assemblyId": "m1", "pageSize": 1}),
        );
        assert_eq!(page["pageSize"], 1);
        assert_eq!(page["types"].as_array().unwrap().len(), 1);
        assert_eq!(page["types"][0]["fullName"], "Demo.Calculator");
        assert_eq!(page["types"][0]["summary"], "A calculator.");

        let filtered = call_tool_json(
            &server,
            "dll.listTypes",
            json!({"assemblyId": "m1", "search": "HELP"}),
        );
        let types = filtered["types"].as_array().unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0]["kind"], "static_class");
        assert_eq!(filtered["page"], 1);
        assert_eq!(filtered["pageSize"], 20);
    }

    #[test]
    fn list_types_rejects_bad_paging_and_unknown_assembly() {
        let server = seeded_server();
        let (text, is_error) = call_tool(
            &server,
            "dll.listTypes",
            json!({"assemblyId": "m1", "pageSize": 0}),
        );
        assert!(is_error);
        assert_eq!(text, "Invalid request: page_size must be > 0");

        let (text, is_error) =
            call_tool(&server, "dll.listTypes", json!({"assemblyId": "m1", "page": 0}));
        assert!(is_error);
        assert_eq!(text, "Invalid request: page must be >= 1");

        let (_, is_error) =
            call_tool(&server, "dll.listTypes", json!({"assemblyId": "m1", "page": -2}));
        assert!(is_error);

        let (text, is_error) = call_tool(
            &server,
            "dll.listTypes",
            json!({"assemblyId": "m1", "pageSize": 501}),
        );
        assert!(is_error);
        assert_eq!(text, "Invalid request: page_size must be <= 500 (got 501)");

        let (text, is_error) = call_tool(&server, "dll.listTypes", json!({"assemblyId": "nope"}));
        assert!(is_error);
        assert_eq!(text, "Assembly not found: nope");
    }

    #[test]
    fn list_members_of_type() {
        let server = seeded_server();
        let members = call_tool_json(
            &server,
            "dll.listMembers",
            json!({"typeId": "T:Demo.Calculator"}),
        );
        let members = members.as_array().unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0]["name"], "Add");
        assert_eq!(members[0]["kind"], "method");
        assert_eq!(members[1]["kind"], "property");

        let (text, is_error) = call_tool(
            &server,
            "dll.listMembers",
            json!({"typeId": "M:Demo.Calculator.Add(System.Int32,System.Int32)"}),
        );
        assert!(is_error);
        assert!(text.starts_with("Type not found"));
    }

    #[test]
    fn index_assembly_missing_path_argument() {
        let server = test_server();
        let (text, is_error) = call_tool(&server, "dll.indexAssembly", json!({}));
        assert!(is_error);
        assert_eq!(text, "Missing or empty 'dllPath' parameter");
    }
}
