use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::DllMcpError;

// ── Entity Kinds ────────────────────────────────────────────────────────────

/// Closed set of indexed entity kinds: five type kinds and four member kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Interface,
    Enum,
    Struct,
    /// Abstract and sealed class: cannot be instantiated, members only.
    StaticClass,
    Class,
    Method,
    Property,
    Field,
    Event,
}

impl EntityKind {
    /// True for the type kinds, false for members.
    pub fn is_type(self) -> bool {
        matches!(
            self,
            Self::Interface | Self::Enum | Self::Struct | Self::StaticClass | Self::Class
        )
    }

    /// Keyword used in type signature text (`class Ns.Name`).
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Interface => "interface",
            Self::Enum => "enum",
            Self::Struct => "struct",
            Self::StaticClass => "static class",
            Self::Class => "class",
            Self::Method => "method",
            Self::Property => "property",
            Self::Field => "field",
            Self::Event => "event",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interface => write!(f, "interface"),
            Self::Enum => write!(f, "enum"),
            Self::Struct => write!(f, "struct"),
            Self::StaticClass => write!(f, "static_class"),
            Self::Class => write!(f, "class"),
            Self::Method => write!(f, "method"),
            Self::Property => write!(f, "property"),
            Self::Field => write!(f, "field"),
            Self::Event => write!(f, "event"),
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = DllMcpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "interface" => Ok(Self::Interface),
            "enum" => Ok(Self::Enum),
            "struct" => Ok(Self::Struct),
            "static_class" => Ok(Self::StaticClass),
            "class" => Ok(Self::Class),
            "method" => Ok(Self::Method),
            "property" => Ok(Self::Property),
            "field" => Ok(Self::Field),
            "event" => Ok(Self::Event),
            _ => Err(DllMcpError::UnsupportedEntityKind(s.to_string())),
        }
    }
}

// ── Catalog Records ─────────────────────────────────────────────────────────

/// One indexed binary module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogModule {
    /// Opaque catalog id, freshly generated per index operation.
    pub id: String,
    /// Display name (assembly name).
    pub name: String,
    /// Whether a sidecar documentation file was matched and loaded.
    pub has_documentation: bool,
    /// Where the binary was read from, for later source lookups.
    pub origin_path: Option<String>,
    pub indexed_at: DateTime<Utc>,
}

/// An indexed type or member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Canonical documentation identifier (`T:`, `M:`, `P:`, `F:`, `E:`).
    pub id: String,
    /// Owning module.
    pub module_id: String,
    /// Owning type identifier; `None` for types.
    pub parent_id: Option<String>,
    /// Simple name.
    pub name: String,
    /// Fully-qualified name (types only).
    pub full_name: Option<String>,
    /// Namespace (types only).
    pub namespace: Option<String>,
    pub kind: EntityKind,
    /// Human-readable declaration, for display only.
    pub signature: String,
    /// Base type name (types only).
    pub base_type: Option<String>,
}

// ── Documentation ───────────────────────────────────────────────────────────

/// Documentation authored in the sidecar file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoredDocs {
    pub summary: Option<String>,
    pub remarks: Option<String>,
    pub returns: Option<String>,
    pub example: Option<String>,
    /// Parameter name -> description.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// Exception type reference -> description.
    #[serde(default)]
    pub exceptions: BTreeMap<String, String>,
}

impl AuthoredDocs {
    /// True when no field carries any text.
    pub fn is_empty(&self) -> bool {
        [&self.summary, &self.remarks, &self.returns, &self.example]
            .iter()
            .all(|f| non_empty(f.as_deref()).is_none())
            && self.params.is_empty()
            && self.exceptions.is_empty()
    }
}

/// Machine-generated documentation, written independently of indexing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticDocs {
    pub summary: Option<String>,
    pub example: Option<String>,
}

/// Both documentation layers attached to one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentationRecord {
    pub authored: AuthoredDocs,
    pub synthetic: SyntheticDocs,
    /// Most recent write to either layer.
    pub last_updated: DateTime<Utc>,
}

/// Which layer supplied the displayed summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocSource {
    #[serde(rename = "xml")]
    Authored,
    #[serde(rename = "ai")]
    Synthetic,
    #[serde(rename = "none")]
    None,
}

impl std::fmt::Display for DocSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authored => write!(f, "xml"),
            Self::Synthetic => write!(f, "ai"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Read-time merge of the two documentation layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentationView {
    pub source: DocSource,
    pub summary: Option<String>,
    pub remarks: Option<String>,
    pub returns: Option<String>,
    pub example: Option<String>,
    pub params: BTreeMap<String, String>,
    pub exceptions: BTreeMap<String, String>,
}

impl DocumentationView {
    /// View of an entity with no documentation at all.
    pub fn absent() -> Self {
        Self {
            source: DocSource::None,
            summary: None,
            remarks: None,
            returns: None,
            example: None,
            params: BTreeMap::new(),
            exceptions: BTreeMap::new(),
        }
    }
}

impl DocumentationRecord {
    /// Authored value if non-empty, else synthetic, else absent.
    pub fn view(&self) -> DocumentationView {
        let authored_summary = non_empty(self.authored.summary.as_deref());
        let synthetic_summary = non_empty(self.synthetic.summary.as_deref());
        let source = if authored_summary.is_some() {
            DocSource::Authored
        } else if synthetic_summary.is_some() {
            DocSource::Synthetic
        } else {
            DocSource::None
        };

        DocumentationView {
            source,
            summary: authored_summary.or(synthetic_summary).map(String::from),
            remarks: non_empty(self.authored.remarks.as_deref()).map(String::from),
            returns: non_empty(self.authored.returns.as_deref()).map(String::from),
            example: non_empty(self.authored.example.as_deref())
                .or_else(|| non_empty(self.synthetic.example.as_deref()))
                .map(String::from),
            params: self.authored.params.clone(),
            exceptions: self.authored.exceptions.clone(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// An entity together with its documentation record, if one was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDetail {
    pub entity: Entity,
    pub documentation: Option<DocumentationRecord>,
}

impl EntityDetail {
    pub fn view(&self) -> DocumentationView {
        self.documentation
            .as_ref()
            .map(DocumentationRecord::view)
            .unwrap_or_else(DocumentationView::absent)
    }
}

/// One row of a type listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSummary {
    pub entity: Entity,
    /// Display summary (authored, else synthetic).
    pub summary: Option<String>,
}

// ── Queries ─────────────────────────────────────────────────────────────────

/// Paginated, optionally filtered listing of a module's types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeQuery {
    pub module_id: String,
    pub search: Option<String>,
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
}

impl TypeQuery {
    pub fn new(module_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            search: None,
            page: 1,
            page_size: 20,
        }
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// Reject non-positive page numbers and page sizes.
    pub fn validate(&self) -> Result<(), DllMcpError> {
        if self.page == 0 {
            return Err(DllMcpError::InvalidRequest("page must be >= 1".to_string()));
        }
        if self.page_size == 0 {
            return Err(DllMcpError::InvalidRequest(
                "page_size must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Row offset of the first result: `(page - 1) * page_size`.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    /// Search text with surrounding whitespace removed; `None` means no filter.
    pub fn search_text(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

// ── Index Batches ───────────────────────────────────────────────────────────

/// An entity plus the authored documentation found for it, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedEntity {
    pub entity: Entity,
    pub authored: Option<AuthoredDocs>,
}

/// Everything one indexing pass produced; committed as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleBatch {
    pub module: CatalogModule,
    /// Types and members in walker order.
    pub entities: Vec<IndexedEntity>,
}

/// Catalog-wide counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub module_count: usize,
    pub type_count: usize,
    pub member_count: usize,
    pub documented_count: usize,
}
