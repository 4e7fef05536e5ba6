//! Serve command.

use dllmcp_core::DllMcpConfig;
use dllmcp_mcp::McpServer;

pub(crate) fn cmd_serve(config: &DllMcpConfig) -> anyhow::Result<()> {
    let server = McpServer::from_config(config)?;
    tracing::info!(
        "dllmcp server ready (stdio mode, db: {})",
        config.storage.db_path
    );
    server.run()?;
    Ok(())
}
