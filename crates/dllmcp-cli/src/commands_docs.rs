//! Documentation commands: show and annotate.

use dllmcp_core::{DllMcpConfig, SyntheticDocs};
use dllmcp_mcp::McpServer;

pub(crate) fn cmd_show(config: &DllMcpConfig, entity_id: &str, source: bool) -> anyhow::Result<()> {
    let storage = crate::open_storage(config)?;
    let server = McpServer::new(storage, config);
    let detail = server.member_detail(entity_id, source)?;
    let docs = &detail.documentation;

    println!("{} [{}]", detail.id, detail.kind);
    println!("  {}", detail.signature);
    println!();

    match &docs.summary {
        Some(summary) => println!("Summary ({}):\n  {summary}", docs.source),
        None => println!("Summary: (none)"),
    }
    if let Some(remarks) = &docs.remarks {
        println!("Remarks:\n  {remarks}");
    }
    if !docs.params.is_empty() {
        println!("Parameters:");
        for (name, text) in &docs.params {
            println!("  {name}: {text}");
        }
    }
    if let Some(returns) = &docs.returns {
        println!("Returns:\n  {returns}");
    }
    if !docs.exceptions.is_empty() {
        println!("Exceptions:");
        for (cref, text) in &docs.exceptions {
            println!("  {cref}: {text}");
        }
    }
    if let Some(example) = &docs.example {
        println!("Example:\n{example}");
    }

    if let Some(code) = &detail.source_code {
        println!();
        match &code.content {
            Some(content) if code.available => println!("Source ({}):\n{content}", code.language),
            _ => println!("Source: unavailable"),
        }
    }
    Ok(())
}

pub(crate) fn cmd_annotate(
    config: &DllMcpConfig,
    entity_id: &str,
    summary: Option<String>,
    example: Option<String>,
) -> anyhow::Result<()> {
    if summary.is_none() && example.is_none() {
        anyhow::bail!("Nothing to store: pass --summary and/or --example");
    }

    let storage = crate::open_storage(config)?;
    storage.set_synthetic_docs(entity_id, &SyntheticDocs { summary, example })?;
    println!("Stored synthetic documentation for {entity_id}");
    Ok(())
}
