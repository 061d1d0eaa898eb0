//! tcl-lsp: a language server for Tcl and Apache Rivet templates.
//!
//! Usage:
//!   tcl-lsp --stdio                 # Run the LSP server (stdin/stdout JSON-RPC)
//!   tcl-lsp index --root <path>     # One-shot workspace scan, print counts

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tcl_lsp_core::config::Config;
use tcl_lsp_core::index::Index;
use tcl_lsp_core::indexer::Indexer;
use tcl_lsp_core::lsp::{Backend, DiagnosticsStore};
use tcl_lsp_core::parser::ExternalParserClient;
use tcl_lsp_core::workspace;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tcl-lsp")]
#[command(about = "Language server for Tcl and Apache Rivet templates")]
#[command(version)]
struct Cli {
    /// Run as an LSP server over stdin/stdout
    #[arg(long)]
    stdio: bool,

    /// Workspace root (default: discovered from the current directory)
    #[arg(long)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a one-shot full scan and print symbol/file counts
    Index {
        /// Fail the process if any file produces a diagnostic
        #[arg(long)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // CRITICAL: log to stderr only — stdout carries LSP JSON-RPC.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tcl_lsp_core=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let start = cli
        .root
        .clone()
        .unwrap_or_else(|| std::env::current_dir().expect("current directory is accessible"));
    let root = workspace::find_root(&start);

    let mut config = Config::load(&root)?;
    if let Some(Commands::Index { strict: true }) = &cli.command {
        config.strict_validation = true;
    }

    if cli.stdio {
        run_lsp_server(root, config).await
    } else if let Some(Commands::Index { .. }) = cli.command {
        run_index(root, config).await
    } else {
        eprintln!("Use --stdio to start the LSP server, or `index` for a one-shot scan.");
        eprintln!("Run with --help for more information.");
        std::process::exit(1);
    }
}

fn build_parser(config: &Config) -> anyhow::Result<ExternalParserClient> {
    let binary = config
        .parser_path
        .as_ref()
        .and_then(|p| p.to_str())
        .unwrap_or("tcl-ast-parse");
    Ok(ExternalParserClient::new(binary, Duration::from_secs(config.parser_timeout_secs))?)
}

async fn run_lsp_server(root: PathBuf, config: Config) -> anyhow::Result<()> {
    tracing::info!(root = %root.display(), "starting tcl-lsp server");

    let parser = Arc::new(build_parser(&config)?);
    let index = Arc::new(Index::new());
    let diagnostics = Arc::new(DiagnosticsStore::new());
    let indexer = Arc::new(Indexer::new(Arc::clone(&index), Arc::clone(&diagnostics), Arc::clone(&parser), config));

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    let (service, socket) =
        tower_lsp::LspService::new(|client| Backend::new(client, index, diagnostics, indexer, parser));
    tower_lsp::Server::new(stdin, stdout, socket).serve(service).await;
    Ok(())
}

async fn run_index(root: PathBuf, config: Config) -> anyhow::Result<()> {
    tracing::info!(root = %root.display(), "running one-shot index scan");

    let parser = Arc::new(build_parser(&config)?);
    let index = Arc::new(Index::new());
    let diagnostics = Arc::new(DiagnosticsStore::new());
    let indexer = Indexer::new(Arc::clone(&index), Arc::clone(&diagnostics), parser, config);

    let files = indexer.start(&root).await?;
    let diagnostic_files = diagnostics.files().len();
    println!(
        "{}",
        serde_json::json!({
            "files": files,
            "symbols": index.symbol_count(),
            "files_with_diagnostics": diagnostic_files,
        })
    );

    if diagnostic_files > 0 {
        std::process::exit(1);
    }
    Ok(())
}
