//! Index, listing, and stats commands.

use dllmcp_core::{DllMcpConfig, TypeQuery};
use dllmcp_index::Indexer;
use std::path::Path;

pub(crate) fn cmd_index(config: &DllMcpConfig, dll: &Path, xml: &Path) -> anyhow::Result<()> {
    let storage = crate::open_storage(config)?;
    let indexer = Indexer::new(storage).strict_documentation(config.indexing.strict_documentation);

    let report = indexer.index(dll, Some(xml))?;

    println!("Indexed {} ({})", report.module_name, report.module_id);
    println!("  Types:      {}", report.type_count);
    println!("  Members:    {}", report.member_count);
    println!("  Documented: {}", report.documented_count);
    if report.has_documentation {
        println!("  XML docs:   {}", xml.display());
    } else {
        println!("  XML docs:   none");
    }
    for warning in &report.warnings {
        println!("  warning: {warning}");
    }
    Ok(())
}

pub(crate) fn cmd_assemblies(config: &DllMcpConfig) -> anyhow::Result<()> {
    let storage = crate::open_storage(config)?;
    let modules = storage.list_modules()?;

    if modules.is_empty() {
        println!("No assemblies indexed yet.");
        return Ok(());
    }

    for module in &modules {
        let docs = if module.has_documentation { "xml" } else { "-" };
        println!(
            "{}  {:<32} {:<4} {}",
            module.id,
            module.name,
            docs,
            module.indexed_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

pub(crate) fn cmd_types(
    config: &DllMcpConfig,
    assembly_id: &str,
    search: Option<&str>,
    page: u32,
    page_size: Option<u32>,
) -> anyhow::Result<()> {
    let page_size = config.catalog.page_size(page_size)?;
    let storage = crate::open_storage(config)?;
    if storage.get_module(assembly_id)?.is_none() {
        anyhow::bail!("Assembly not found: {assembly_id}");
    }

    let mut query = TypeQuery::new(assembly_id).page(page, page_size);
    if let Some(search) = search {
        query = query.search(search);
    }
    let rows = storage.list_types(&query)?;

    if rows.is_empty() {
        println!("No types on page {page}.");
        return Ok(());
    }

    for row in &rows {
        let full_name = row.entity.full_name.as_deref().unwrap_or(&row.entity.name);
        println!("  [{}] {}", row.entity.kind, full_name);
        if let Some(summary) = &row.summary {
            println!("         {}", crate::truncate_str(summary, 100));
        }
    }
    Ok(())
}

pub(crate) fn cmd_members(config: &DllMcpConfig, type_id: &str) -> anyhow::Result<()> {
    let storage = crate::open_storage(config)?;
    match storage.get_entity(type_id)? {
        Some(detail) if detail.entity.kind.is_type() => {
            println!("{}", detail.entity.signature);
        }
        _ => anyhow::bail!("Type not found: {type_id}"),
    }

    let members = storage.list_members(type_id)?;
    if members.is_empty() {
        println!("  (no public members)");
    }
    for member in &members {
        println!("  [{}] {}", member.kind, member.signature);
        println!("         {}", member.id);
    }
    Ok(())
}

pub(crate) fn cmd_stats(config: &DllMcpConfig) -> anyhow::Result<()> {
    let storage = crate::open_storage(config)?;
    let stats = storage.stats()?;

    println!("Catalog: {}", config.storage.db_path);
    println!("  Assemblies: {}", stats.module_count);
    println!("  Types:      {}", stats.type_count);
    println!("  Members:    {}", stats.member_count);
    println!("  Documented: {}", stats.documented_count);
    Ok(())
}
