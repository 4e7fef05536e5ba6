//! Protocol types for the JSON-RPC tool server, and the camelCase shapes
//! tool results are serialized in.

use chrono::{DateTime, Utc};
use dllmcp_core::{CatalogModule, DocumentationView, Entity, EntityDetail, TypeSummary};
use dllmcp_index::IndexReport;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// ── JSON-RPC Types ──────────────────────────────────────────────────────────

/// JSON-RPC 2.0 request.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    /// Absent for notifications (no response expected).
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub(crate) fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub(crate) fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

// ── Tool Result Types ───────────────────────────────────────────────────────

/// Tool result (content array + isError flag).
#[derive(Debug, Serialize)]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

/// A single content block in a tool result.
#[derive(Debug, Serialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

impl ToolResult {
    pub(crate) fn text(msg: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent {
                content_type: "text".to_string(),
                text: msg.into(),
            }],
            is_error: false,
        }
    }

    /// Pretty-printed JSON body.
    pub(crate) fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(text) => Self::text(text),
            Err(e) => Self::tool_error(format!("Serialization error: {e}")),
        }
    }

    pub(crate) fn tool_error(msg: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent {
                content_type: "text".to_string(),
                text: msg.into(),
            }],
            is_error: true,
        }
    }
}

// ── Wire Shapes ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedAssembly {
    pub assembly_id: String,
    pub name: String,
    pub has_xml_documentation: bool,
    pub type_count: usize,
    pub member_count: usize,
    pub documented_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub message: String,
}

impl From<IndexReport> for IndexedAssembly {
    fn from(report: IndexReport) -> Self {
        Self {
            assembly_id: report.module_id,
            name: report.module_name,
            has_xml_documentation: report.has_documentation,
            type_count: report.type_count,
            member_count: report.member_count,
            documented_count: report.documented_count,
            warnings: report.warnings,
            message: "Assembly indexed successfully".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyInfo {
    pub id: String,
    pub name: String,
    pub has_xml_documentation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assembly_path: Option<String>,
    pub indexed_at: DateTime<Utc>,
    /// Whether the module model is held in this session.
    pub loaded: bool,
}

impl AssemblyInfo {
    pub(crate) fn new(module: CatalogModule, loaded: bool) -> Self {
        Self {
            id: module.id,
            name: module.name,
            has_xml_documentation: module.has_documentation,
            assembly_path: module.origin_path,
            indexed_at: module.indexed_at,
            loaded,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeInfo {
    pub id: String,
    pub name: String,
    pub full_name: String,
    pub namespace: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_type: Option<String>,
    pub summary: Option<String>,
}

impl From<TypeSummary> for TypeInfo {
    fn from(row: TypeSummary) -> Self {
        let entity = row.entity;
        Self {
            kind: entity.kind.to_string(),
            full_name: entity.full_name.unwrap_or_else(|| entity.name.clone()),
            namespace: entity.namespace.unwrap_or_default(),
            id: entity.id,
            name: entity.name,
            base_type: entity.base_type,
            summary: row.summary,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypePage {
    pub types: Vec<TypeInfo>,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub signature: String,
}

impl From<Entity> for MemberInfo {
    fn from(entity: Entity) -> Self {
        Self {
            kind: entity.kind.to_string(),
            id: entity.id,
            name: entity.name,
            signature: entity.signature,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetail {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub signature: String,
    pub documentation: DocumentationInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_code: Option<SourceCodeInfo>,
}

impl MemberDetail {
    pub(crate) fn new(detail: EntityDetail, source_code: Option<SourceCodeInfo>) -> Self {
        let documentation = DocumentationInfo::from(detail.view());
        let entity = detail.entity;
        Self {
            kind: entity.kind.to_string(),
            id: entity.id,
            name: entity.name,
            signature: entity.signature,
            documentation,
            source_code,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentationInfo {
    /// `xml`, `ai` or `none`.
    pub source: String,
    pub summary: Option<String>,
    pub remarks: Option<String>,
    pub returns: Option<String>,
    pub example: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub exceptions: BTreeMap<String, String>,
}

impl From<DocumentationView> for DocumentationInfo {
    fn from(view: DocumentationView) -> Self {
        Self {
            source: view.source.to_string(),
            summary: view.summary,
            remarks: view.remarks,
            returns: view.returns,
            example: view.example,
            params: view.params,
            exceptions: view.exceptions,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCodeInfo {
    pub available: bool,
    pub language: String,
    pub content: Option<String>,
}

impl SourceCodeInfo {
    pub(crate) fn unavailable(language: &str) -> Self {
        Self {
            available: false,
            language: language.to_string(),
            content: None,
        }
    }
}
