//! Shared test helpers for the tool server tests.

use crate::McpServer;
use chrono::Utc;
use dllmcp_core::{
    AuthoredDocs, CatalogModule, CatalogStore, Decompiler, DllMcpConfig, Entity, EntityKind,
    IndexedEntity, ModuleBatch,
};
use dllmcp_storage::Storage;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) const ADD_ID: &str = "M:Demo.Calculator.Add(System.Int32,System.Int32)";

/// Create a test server (in-memory catalog, nothing indexed).
pub(crate) fn test_server() -> McpServer {
    McpServer::in_memory().unwrap()
}

/// Server over a catalog holding one hand-built module.
pub(crate) fn seeded_server() -> McpServer {
    McpServer::new(seeded_store(None), &DllMcpConfig::default())
}

fn entity(id: &str, parent: Option<&str>, name: &str, kind: EntityKind, signature: &str) -> Entity {
    let full_name = parent.is_none().then(|| id.trim_start_matches("T:").to_string());
    Entity {
        id: id.to_string(),
        module_id: "m1".to_string(),
        parent_id: parent.map(String::from),
        name: name.to_string(),
        namespace: parent.is_none().then(|| "Demo".to_string()),
        full_name,
        kind,
        signature: signature.to_string(),
        base_type: parent.is_none().then(|| "System.Object".to_string()),
    }
}

pub(crate) fn seeded_store(origin_path: Option<&str>) -> Arc<dyn CatalogStore> {
    let storage = Storage::open_in_memory().unwrap();
    let calculator = "T:Demo.Calculator";
    let batch = ModuleBatch {
        module: CatalogModule {
            id: "m1".to_string(),
            name: "Seeded".to_string(),
            has_documentation: true,
            origin_path: origin_path.map(String::from),
            indexed_at: Utc::now(),
        },
        entities: vec![
            IndexedEntity {
                entity: entity(
                    calculator,
                    None,
                    "Calculator",
                    EntityKind::Class,
                    "class Demo.Calculator : System.Object",
                ),
                authored: Some(AuthoredDocs {
                    summary: Some("A calculator.".to_string()),
                    ..Default::default()
                }),
            },
            IndexedEntity {
                entity: entity(
                    ADD_ID,
                    Some(calculator),
                    "Add",
                    EntityKind::Method,
                    "Int32 Add(Int32 a, Int32 b)",
                ),
                authored: Some(AuthoredDocs {
                    summary: Some("Adds two integers".to_string()),
                    returns: Some("The sum.".to_string()),
                    params: [("a", "First operand"), ("b", "Second operand")]
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                    ..Default::default()
                }),
            },
            IndexedEntity {
                entity: entity(
                    "P:Demo.Calculator.Value",
                    Some(calculator),
                    "Value",
                    EntityKind::Property,
                    "Int32 Value",
                ),
                authored: None,
            },
            IndexedEntity {
                entity: entity(
                    "T:Demo.Helpers",
                    None,
                    "Helpers",
                    EntityKind::StaticClass,
                    "static class Demo.Helpers : System.Object",
                ),
                authored: None,
            },
        ],
    };
    storage.commit_module(&batch).unwrap();
    Arc::new(storage)
}

/// Call a tool; return its text and `isError` flag.
pub(crate) fn call_tool(server: &McpServer, tool_name: &str, arguments: Value) -> (String, bool) {
    let params = json!({"name": tool_name, "arguments": arguments});
    let resp = server.handle_request("tools/call", Some(&params), json!("req"));
    assert!(resp.error.is_none(), "{tool_name}: {:?}", resp.error);
    let result = resp.result.unwrap();
    let text = result["content"][0]["text"].as_str().unwrap().to_string();
    (text, result["isError"].as_bool().unwrap())
}

/// Call a tool that must succeed and parse its JSON body.
pub(crate) fn call_tool_json(server: &McpServer, tool_name: &str, arguments: Value) -> Value {
    let (text, is_error) = call_tool(server, tool_name, arguments);
    assert!(!is_error, "{tool_name} failed: {text}");
    serde_json::from_str(&text).unwrap()
}

/// Decompiler that counts calls and echoes the requested id.
#[derive(Default)]
pub(crate) struct RecordingDecompiler {
    pub calls: Arc<AtomicUsize>,
}

impl Decompiler for RecordingDecompiler {
    fn decompile(&self, _module_path: &Path, entity_id: &str) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(format!("// {entity_id}"))
    }
}
