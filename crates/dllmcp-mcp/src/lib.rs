//! dllmcp-mcp: tool server for the dllmcp catalog (JSON-RPC 2.0 over stdio).
//!
//! Implements 6 tools: dll.indexAssembly, dll.listAssemblies, dll.listTypes,
//! dll.listMembers, dll.getMemberDetails, dll.setSyntheticDocs.
//!
//! Transport: Newline-delimited JSON-RPC messages over stdio.
//! All logging goes to stderr; stdout is reserved for JSON-RPC only.

use dllmcp_core::{CatalogConfig, CatalogStore, Decompiler, DllMcpConfig, DllMcpError, Unavailable};
use dllmcp_index::{Indexer, ModuleLoader, ModuleRegistry};
use dllmcp_storage::Storage;
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
mod tools_catalog;
mod tools_docs;

pub use types::*;

// ── MCP Server ──────────────────────────────────────────────────────────────

/// Tool server over a catalog store.
pub struct McpServer {
    pub name: String,
    pub version: String,
    store: Arc<dyn CatalogStore>,
    indexer: Indexer,
    /// Module models loaded during this session, keyed by catalog id.
    registry: Arc<ModuleRegistry>,
    decompiler: Box<dyn Decompiler>,
    catalog: CatalogConfig,
    strict_documentation: bool,
}

impl McpServer {
    /// Create a server over `store`, reading modules from disk.
    pub fn new(store: Arc<dyn CatalogStore>, config: &DllMcpConfig) -> Self {
        let registry = Arc::new(ModuleRegistry::new());
        let strict_documentation = config.indexing.strict_documentation;
        let indexer = Indexer::new(Arc::clone(&store))
            .with_registry(Arc::clone(&registry))
            .strict_documentation(strict_documentation);
        Self {
            name: "dllmcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            store,
            indexer,
            registry,
            decompiler: Box::new(Unavailable),
            catalog: config.catalog.clone(),
            strict_documentation,
        }
    }

    /// Create a server from configuration, opening the configured database.
    pub fn from_config(config: &DllMcpConfig) -> Result<Self, DllMcpError> {
        let db_path = Path::new(&config.storage.db_path);
        let storage = Storage::open_with(db_path, &config.storage)?;
        tracing::debug!("Catalog opened at {}", db_path.display());
        Ok(Self::new(Arc::new(storage), config))
    }

    /// Server over a fresh in-memory catalog with default configuration.
    pub fn in_memory() -> Result<Self, DllMcpError> {
        let storage = Storage::open_in_memory()?;
        Ok(Self::new(Arc::new(storage), &DllMcpConfig::default()))
    }

    /// Replace the source-text collaborator.
    pub fn with_decompiler(mut self, decompiler: Box<dyn Decompiler>) -> Self {
        self.decompiler = decompiler;
        self
    }

    /// Replace how binaries are read by `dll.indexAssembly`.
    pub fn with_loader(mut self, loader: Box<dyn ModuleLoader>) -> Self {
        self.indexer = Indexer::with_loader(Arc::clone(&self.store), loader)
            .with_registry(Arc::clone(&self.registry))
            .strict_documentation(self.strict_documentation);
        self
    }

    /// Run the MCP server. Reads newline-delimited JSON-RPC from stdin,
    /// writes responses to stdout. Blocks until stdin is closed.
    pub fn run(&self) -> io::Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.serve(stdin.lock(), &mut stdout.lock())
    }

    /// Request loop over arbitrary line-oriented streams.
    pub fn serve(&self, reader: impl BufRead, writer: &mut impl Write) -> io::Result<()> {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(&line) {
                Ok(req) => req,
                Err(e) => {
                    let resp =
                        JsonRpcResponse::error(Value::Null, -32700, format!("Parse error: {e}"));
                    write_response(writer, &resp)?;
                    continue;
                }
            };

            // Notifications (no id) don't get a response
            let Some(id) = request.id else {
                self.handle_notification(&request.method);
                continue;
            };

            let response = self.handle_request(&request.method, request.params.as_ref(), id);
            write_response(writer, &response)?;
        }

        Ok(())
    }

    fn handle_notification(&self, method: &str) {
        match method {
            "notifications/initialized" => {
                tracing::info!("Client initialized, dllmcp server ready");
            }
            "notifications/cancelled" => {
                tracing::debug!("Request cancelled by client");
            }
            _ => {
                tracing::debug!("Unknown notification: {method}");
            }
        }
    }

    pub fn handle_request(
        &self,
        method: &str,
        params: Option<&Value>,
        id: Value,
    ) -> JsonRpcResponse {
        match method {
            "initialize" => self.handle_initialize(id),
            "tools/list" => {
                JsonRpcResponse::success(id, json!({ "tools": tool_definitions(&self.catalog) }))
            }
            "tools/call" => self.handle_tools_call(id, params),
            "ping" => JsonRpcResponse::success(id, json!({})),
            _ => JsonRpcResponse::error(id, -32601, format!("Method not found: {method}")),
        }
    }

    fn handle_initialize(&self, id: Value) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": { "listChanged": false }
                },
                "serverInfo": {
                    "name": self.name,
                    "version": self.version
                }
            }),
        )
    }

    fn handle_tools_call(&self, id: Value, params: Option<&Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::error(id, -32602, "Missing params");
        };

        let tool_name = params.get("name").and_then(|n| n.as_str()).unwrap_or("");
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        let result = self.dispatch_tool(tool_name, &arguments);

        match serde_json::to_value(result) {
            Ok(v) => JsonRpcResponse::success(id, v),
            Err(e) => JsonRpcResponse::error(id, -32603, format!("Serialization error: {e}")),
        }
    }

    // ── Tool Dispatch ───────────────────────────────────────────────────────

    fn dispatch_tool(&self, name: &str, args: &Value) -> ToolResult {
        match name {
            "dll.indexAssembly" => self.tool_index_assembly(args),
            "dll.listAssemblies" => self.tool_list_assemblies(),
            "dll.listTypes" => self.tool_list_types(args),
            "dll.listMembers" => self.tool_list_members(args),
            "dll.getMemberDetails" => self.tool_get_member_details(args),
            "dll.setSyntheticDocs" => self.tool_set_synthetic_docs(args),
            _ => ToolResult::tool_error(format!("Unknown tool: {name}")),
        }
    }
}

/// Write a JSON-RPC response as a single line.
fn write_response(writer: &mut impl Write, response: &JsonRpcResponse) -> io::Result<()> {
    let json = serde_json::to_string(response)?;
    writeln!(writer, "{json}")?;
    writer.flush()
}

// ── Argument Helpers ────────────────────────────────────────────────────────

/// Required non-blank string argument.
pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, String> {
    match args.get(key).and_then(|v| v.as_str()) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(format!("Missing or empty '{key}' parameter")),
    }
}

pub(crate) fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str())
}

/// Optional non-negative integer argument; present but malformed is an error.
pub(crate) fn optional_u32(args: &Value, key: &str) -> Result<Option<u32>, String> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| format!("'{key}' must be a non-negative integer")),
    }
}

// ── Tool Definitions ────────────────────────────────────────────────────────

fn tool_definitions(catalog: &CatalogConfig) -> Vec<Value> {
    vec![
        json!({
            "name": "dll.indexAssembly",
            "description": "Index a managed DLL and its XML documentation file into the catalog",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "dllPath": { "type": "string", "description": "Path to the DLL file" },
                    "xmlPath": { "type": "string", "description": "Path to the XML documentation file (optional)" }
                },
                "required": ["dllPath"]
            }
        }),
        json!({
            "name": "dll.listAssemblies",
            "description": "List all indexed assemblies",
            "inputSchema": {
                "type": "object",
                "properties": {}
            }
        }),
        json!({
            "name": "dll.listTypes",
            "description": "List types of an indexed assembly, ordered by full name, with optional search and paging",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "assemblyId": { "type": "string", "description": "Catalog id of the assembly" },
                    "search": { "type": "string", "description": "Case-insensitive substring of the full type name" },
                    "page": { "type": "integer", "minimum": 1, "default": 1 },
                    "pageSize": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": catalog.max_page_size,
                        "default": catalog.default_page_size,
                        "description": "Types per page; larger requests are rejected"
                    }
                },
                "required": ["assemblyId"]
            }
        }),
        json!({
            "name": "dll.listMembers",
            "description": "List the public members declared on a type",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "typeId": { "type": "string", "description": "Documentation id of the type (T:...)" }
                },
                "required": ["typeId"]
            }
        }),
        json!({
            "name": "dll.getMemberDetails",
            "description": "Get the signature and documentation of a type or member, optionally with source text",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "memberId": { "type": "string", "description": "Documentation id (T:, M:, P:, F:, E:)" },
                    "includeSource": { "type": "boolean", "default": false }
                },
                "required": ["memberId"]
            }
        }),
        json!({
            "name": "dll.setSyntheticDocs",
            "description": "Store generated documentation for an entity without touching its authored documentation",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "memberId": { "type": "string", "description": "Documentation id of the entity" },
                    "summary": { "type": "string" },
                    "example": { "type": "string" }
                },
                "required": ["memberId"]
            }
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::test_server;

    #[test]
    fn handle_initialize() {
        let server = test_server();
        let resp = server.handle_request("initialize", None, json!(1));
        assert!(resp.error.is_none());

        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "dllmcp");
    }

    #[test]
    fn handle_tools_list_returns_6_tools() {
        let server = test_server();
        let resp = server.handle_request("tools/list", None, json!(2));
        let result = resp.result.unwrap();
        let tools = result["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 6);

        let names: Vec<&str> = tools.iter().filter_map(|t| t["name"].as_str()).collect();
        for expected in [
            "dll.indexAssembly",
            "dll.listAssemblies",
            "dll.listTypes",
            "dll.listMembers",
            "dll.getMemberDetails",
            "dll.setSyntheticDocs",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
        for tool in tools {
            assert_eq!(tool["inputSchema"]["type"], "object");
        }

        let list_types = tools.iter().find(|t| t["name"] == "dll.listTypes").unwrap();
        let page_size = &list_types["inputSchema"]["properties"]["pageSize"];
        assert_eq!(page_size["maximum"], 500);
        assert_eq!(page_size["default"], 20);
    }

    #[test]
    fn unknown_method_and_tool() {
        let server = test_server();
        let resp = server.handle_request("resources/list", None, json!(3));
        assert_eq!(resp.error.unwrap().code, -32601);

        let params = json!({"name": "dll.bogus", "arguments": {}});
        let resp = server.handle_request("tools/call", Some(&params), json!(4));
        let result = resp.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["text"], "Unknown tool: dll.bogus");
    }

    #[test]
    fn tools_call_without_params() {
        let server = test_server();
        let resp = server.handle_request("tools/call", None, json!(5));
        assert_eq!(resp.error.unwrap().code, -32602);
    }

    #[test]
    fn serve_skips_notifications_and_reports_parse_errors() {
        let server = test_server();
        let input = concat!(
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
            "\n",
            "not json\n",
            "{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"ping\"}\n",
        );
        let mut out = Vec::new();
        server.serve(input.as_bytes(), &mut out).unwrap();

        let lines: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["error"]["code"], -32700);
        assert!(lines[0]["id"].is_null());
        assert_eq!(lines[1]["id"], 7);
        assert_eq!(lines[1]["result"], json!({}));
    }

    #[test]
    fn argument_helpers() {
        let args = json!({"a": "x", "blank": "  ", "n": 3, "neg": -1, "s": "4"});
        assert_eq!(required_str(&args, "a").unwrap(), "x");
        assert!(required_str(&args, "blank").is_err());
        assert!(required_str(&args, "missing").is_err());
        assert_eq!(optional_u32(&args, "n").unwrap(), Some(3));
        assert_eq!(optional_u32(&args, "missing").unwrap(), None);
        assert!(optional_u32(&args, "neg").is_err());
        assert!(optional_u32(&args, "s").is_err());
    }
}
