//! dllmcp-cli: CLI entry point for the dllmcp documentation catalog.

mod commands_catalog;
mod commands_docs;
mod commands_serve;

use clap::{Parser, Subcommand};
use dllmcp_core::DllMcpConfig;
use dllmcp_storage::Storage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "dllmcp",
    about = "Index .NET assemblies and browse their documentation"
)]
#[command(version, propagate_version = true)]
struct Cli {
    /// Catalog database (overrides the configured path)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a DLL and its XML documentation file
    Index {
        /// Path to the DLL
        dll: PathBuf,

        /// XML documentation file (defaults to the DLL path with an .xml extension)
        #[arg(long)]
        xml: Option<PathBuf>,
    },

    /// List indexed assemblies
    Assemblies,

    /// List the types of an assembly
    Types {
        /// Assembly catalog id
        assembly_id: String,

        /// Case-insensitive substring of the type name
        #[arg(short, long)]
        search: Option<String>,

        /// Page number (1-based)
        #[arg(long, default_value = "1")]
        page: u32,

        /// Types per page (defaults to the configured page size)
        #[arg(long)]
        page_size: Option<u32>,
    },

    /// List the members of a type
    Members {
        /// Type documentation id (T:...)
        type_id: String,
    },

    /// Show the signature and documentation of a type or member
    Show {
        /// Documentation id (T:, M:, P:, F:, E:)
        entity_id: String,

        /// Also ask for source text
        #[arg(long)]
        source: bool,
    },

    /// Store generated documentation for a type or member
    Annotate {
        /// Documentation id
        entity_id: String,

        #[arg(long)]
        summary: Option<String>,

        #[arg(long)]
        example: Option<String>,
    },

    /// Show catalog statistics
    Stats,

    /// Start the tool server (JSON-RPC over stdio)
    Serve,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing to stderr (stdout reserved for JSON-RPC in serve mode)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dllmcp=info".parse().expect("valid tracing directive")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.db.as_deref());

    match cli.command {
        Commands::Index { dll, xml } => {
            let xml = xml.unwrap_or_else(|| dll.with_extension("xml"));
            commands_catalog::cmd_index(&config, &dll, &xml)?;
        }
        Commands::Assemblies => {
            commands_catalog::cmd_assemblies(&config)?;
        }
        Commands::Types {
            assembly_id,
            search,
            page,
            page_size,
        } => {
            commands_catalog::cmd_types(&config, &assembly_id, search.as_deref(), page, page_size)?;
        }
        Commands::Members { type_id } => {
            commands_catalog::cmd_members(&config, &type_id)?;
        }
        Commands::Show { entity_id, source } => {
            commands_docs::cmd_show(&config, &entity_id, source)?;
        }
        Commands::Annotate {
            entity_id,
            summary,
            example,
        } => {
            commands_docs::cmd_annotate(&config, &entity_id, summary, example)?;
        }
        Commands::Stats => {
            commands_catalog::cmd_stats(&config)?;
        }
        Commands::Serve => {
            commands_serve::cmd_serve(&config)?;
        }
    }

    Ok(())
}

// ── Helpers (shared across modules) ────────────────────────────────────────

/// Configuration from `~/.dllmcp/config.toml`, with `--db` applied.
pub(crate) fn load_config(db: Option<&Path>) -> DllMcpConfig {
    let mut config = DllMcpConfig::load_or_default();
    if let Some(db) = db {
        config.storage.db_path = db.to_string_lossy().into_owned();
    }
    config
}

pub(crate) fn open_storage(config: &DllMcpConfig) -> anyhow::Result<Arc<Storage>> {
    let storage = Storage::open_with(Path::new(&config.storage.db_path), &config.storage)?;
    Ok(Arc::new(storage))
}

/// Shorten `s` to at most `max` characters, marking the cut with `...`.
pub(crate) fn truncate_str(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &s[..end]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn truncate_str_short() {
        assert_eq!(truncate_str("hi", 10), "hi");
    }

    #[test]
    fn truncate_str_exact() {
        assert_eq!(truncate_str("hello", 5), "hello");
    }

    #[test]
    fn truncate_str_long() {
        assert_eq!(truncate_str("hello world", 5), "hello...");
    }

    #[test]
    fn truncate_str_multibyte() {
        assert_eq!(truncate_str("größer als", 4), "größ...");
    }

    #[test]
    fn parse_index_command() {
        let cli = Cli::try_parse_from(["dllmcp", "index", "lib/Demo.dll"]).unwrap();
        match cli.command {
            Commands::Index { dll, xml } => {
                assert_eq!(dll, PathBuf::from("lib/Demo.dll"));
                assert!(xml.is_none());
            }
            _ => panic!("Expected Index command"),
        }
        assert!(cli.db.is_none());
    }

    #[test]
    fn parse_index_with_xml_and_global_db() {
        let cli = Cli::try_parse_from([
            "dllmcp",
            "index",
            "Demo.dll",
            "--xml",
            "docs/Demo.xml",
            "--db",
            "/tmp/catalog.db",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/catalog.db")));
        match cli.command {
            Commands::Index { xml, .. } => {
                assert_eq!(xml, Some(PathBuf::from("docs/Demo.xml")));
            }
            _ => panic!("Expected Index command"),
        }
    }

    #[test]
    fn parse_types_defaults() {
        let cli = Cli::try_parse_from(["dllmcp", "types", "abc-123"]).unwrap();
        match cli.command {
            Commands::Types {
                assembly_id,
                search,
                page,
                page_size,
            } => {
                assert_eq!(assembly_id, "abc-123");
                assert!(search.is_none());
                assert_eq!(page, 1);
                assert!(page_size.is_none());
            }
            _ => panic!("Expected Types command"),
        }
    }

    #[test]
    fn parse_types_with_options() {
        let cli = Cli::try_parse_from([
            "dllmcp",
            "types",
            "abc-123",
            "--search",
            "Calc",
            "--page",
            "3",
            "--page-size",
            "50",
        ])
        .unwrap();
        match cli.command {
            Commands::Types {
                search,
                page,
                page_size,
                ..
            } => {
                assert_eq!(search, Some("Calc".to_string()));
                assert_eq!(page, 3);
                assert_eq!(page_size, Some(50));
            }
            _ => panic!("Expected Types command"),
        }
    }

    #[test]
    fn parse_show_with_source() {
        let cli = Cli::try_parse_from([
            "dllmcp",
            "show",
            "M:Demo.Calculator.Add(System.Int32,System.Int32)",
            "--source",
        ])
        .unwrap();
        match cli.command {
            Commands::Show { entity_id, source } => {
                assert_eq!(entity_id, "M:Demo.Calculator.Add(System.Int32,System.Int32)");
                assert!(source);
            }
            _ => panic!("Expected Show command"),
        }
    }

    #[test]
    fn parse_annotate_command() {
        let cli = Cli::try_parse_from([
            "dllmcp",
            "annotate",
            "T:Demo.Calculator",
            "--summary",
            "A calculator",
        ])
        .unwrap();
        match cli.command {
            Commands::Annotate {
                entity_id,
                summary,
                example,
            } => {
                assert_eq!(entity_id, "T:Demo.Calculator");
                assert_eq!(summary, Some("A calculator".to_string()));
                assert!(example.is_none());
            }
            _ => panic!("Expected Annotate command"),
        }
    }

    #[test]
    fn parse_simple_commands() {
        let cli = Cli::try_parse_from(["dllmcp", "stats"]).unwrap();
        assert!(matches!(cli.command, Commands::Stats));
        let cli = Cli::try_parse_from(["dllmcp", "serve"]).unwrap();
        assert!(matches!(cli.command, Commands::Serve));
        let cli = Cli::try_parse_from(["dllmcp", "assemblies"]).unwrap();
        assert!(matches!(cli.command, Commands::Assemblies));
    }

    #[test]
    fn parse_unknown_command_fails() {
        assert!(Cli::try_parse_from(["dllmcp", "unknown"]).is_err());
        assert!(Cli::try_parse_from(["dllmcp", "index"]).is_err());
        assert!(Cli::try_parse_from(["dllmcp", "types", "a", "--page", "-1"]).is_err());
    }

    #[test]
    fn oversized_page_size_is_rejected_before_touching_the_catalog() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = dir.path().join("catalog.db");
        let config = load_config(Some(&db));

        let err = commands_catalog::cmd_types(&config, "abc-123", None, 1, Some(10_000))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid request: page_size must be <= 500 (got 10000)"
        );
        assert!(!db.exists());
    }

    #[test]
    fn db_flag_overrides_configured_path() {
        let config = load_config(Some(Path::new("/tmp/override.db")));
        assert_eq!(config.storage.db_path, "/tmp/override.db");
    }
}
