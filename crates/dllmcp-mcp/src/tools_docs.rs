//! Documentation tools: member details (with optional source) and the
//! synthetic documentation backfill.

use crate::types::{MemberDetail, SourceCodeInfo, ToolResult};
use crate::{optional_str, required_str, McpServer};
use dllmcp_core::{DllMcpError, SyntheticDocs};
use serde_json::{json, Value};
use std::path::Path;

impl McpServer {
    pub(crate) fn tool_get_member_details(&self, args: &Value) -> ToolResult {
        let member_id = match required_str(args, "memberId") {
            Ok(id) => id,
            Err(e) => return ToolResult::tool_error(e),
        };
        let include_source = args
            .get("includeSource")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        match self.member_detail(member_id, include_source) {
            Ok(detail) => ToolResult::json(&detail),
            Err(e) => ToolResult::tool_error(e.to_string()),
        }
    }

    /// Signature and merged documentation of one entity, with a source block
    /// when `include_source` is set.
    pub fn member_detail(
        &self,
        member_id: &str,
        include_source: bool,
    ) -> Result<MemberDetail, DllMcpError> {
        let detail = self
            .store
            .get_entity(member_id)?
            .ok_or_else(|| DllMcpError::NotFound(format!("member {member_id}")))?;
        let source_code = include_source.then(|| self.source_for(member_id));
        Ok(MemberDetail::new(detail, source_code))
    }

    /// Ask the decompiler for source text, provided the id is well formed and
    /// the owning module's binary is still on disk.
    fn source_for(&self, entity_id: &str) -> SourceCodeInfo {
        let language = self.decompiler.language();
        if !is_entity_id(entity_id) {
            return SourceCodeInfo::unavailable(language);
        }

        let origin = match self.store.module_of(entity_id) {
            Ok(Some(module)) => module.origin_path,
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Module lookup for {entity_id} failed: {e}");
                None
            }
        };
        let Some(origin) = origin.filter(|p| Path::new(p).is_file()) else {
            tracing::debug!("No binary on disk for {entity_id}");
            return SourceCodeInfo::unavailable(language);
        };

        match self.decompiler.decompile(Path::new(&origin), entity_id) {
            Some(content) => SourceCodeInfo {
                available: true,
                language: language.to_string(),
                content: Some(content),
            },
            None => SourceCodeInfo::unavailable(language),
        }
    }

    pub(crate) fn tool_set_synthetic_docs(&self, args: &Value) -> ToolResult {
        let member_id = match required_str(args, "memberId") {
            Ok(id) => id,
            Err(e) => return ToolResult::tool_error(e),
        };
        let docs = SyntheticDocs {
            summary: optional_str(args, "summary").map(String::from),
            example: optional_str(args, "example").map(String::from),
        };

        match self.store.set_synthetic_docs(member_id, &docs) {
            Ok(()) => ToolResult::json(&json!({
                "memberId": member_id,
                "message": "Synthetic documentation stored"
            })),
            Err(e) => ToolResult::tool_error(e.to_string()),
        }
    }
}

/// `X:name` where `X` is one of the five identifier prefixes.
fn is_entity_id(id: &str) -> bool {
    let mut chars = id.chars();
    matches!(chars.next(), Some('T' | 'M' | 'P' | 'F' | 'E'))
        && chars.next() == Some(':')
        && !chars.as_str().trim().is_empty()
}
