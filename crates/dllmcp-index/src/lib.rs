//! dllmcp-index: documentation-id generation and indexing for dllmcp.
//!
//! Turns a loaded module into catalog entities, each named by its canonical
//! documentation identifier and cross-linked to the authored comments of the
//! module's sidecar documentation file.
//!
//! # Architecture
//!
//! - **docid** — Documentation identifiers (`T:`, `M:`, `P:`, `F:`, `E:`)
//! - **xmldoc** — Sidecar documentation file parsing and lookup
//! - **walker** — Exported types and their declared public members
//! - **indexer** — Main pipeline: load, walk, name, correlate, commit
//! - **registry** — Loaded module models kept per catalog id

pub mod docid;
pub mod indexer;
pub mod registry;
pub mod walker;
pub mod xmldoc;

pub use docid::{MemberKind, MemberShape};
pub use indexer::{IndexReport, Indexer, MetadataLoader, ModuleLoader};
pub use registry::ModuleRegistry;
pub use walker::{EntityWalker, MemberDescriptor, TypeDescriptor};
pub use xmldoc::DocCommentStore;
