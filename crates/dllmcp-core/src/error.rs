/// Unified error type for dllmcp.
#[derive(Debug, thiserror::Error)]
pub enum DllMcpError {
    /// The binary module is unreadable, corrupt, or not a managed module.
    #[error("Module load failure: {0}")]
    ModuleLoad(String),

    /// A sidecar documentation file exists but is not well-formed.
    #[error("Malformed documentation: {0}")]
    MalformedDocumentation(String),

    /// The identifier generator was handed an entity it has no naming rule for.
    #[error("Unsupported entity kind: {0}")]
    UnsupportedEntityKind(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed request parameters (e.g. a zero page size).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
