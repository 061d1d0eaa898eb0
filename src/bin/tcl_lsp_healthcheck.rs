//! Smoke-tests the configured parser binary outside of the LSP server
//! itself — ambient tooling, not part of the core: it shells out
//! to the parser on a throwaway snippet and reports exit status, nothing
//! more.

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tcl_lsp_core::parser::{ExternalParserClient, ParseClient};

#[derive(Parser)]
#[command(name = "tcl-lsp-healthcheck")]
#[command(about = "Checks that the configured Tcl AST parser binary runs")]
struct Cli {
    /// Parser binary name or path (default: look up `tcl-ast-parse` on PATH)
    #[arg(long, default_value = "tcl-ast-parse")]
    parser: String,

    /// Seconds to wait before giving up
    #[arg(long, default_value = "5")]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let client = match ExternalParserClient::new(&cli.parser, Duration::from_secs(cli.timeout_secs)) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("tcl-lsp-healthcheck: {e}");
            return ExitCode::FAILURE;
        }
    };

    let tmp = std::env::temp_dir().join(format!("tcl-lsp-healthcheck-{}.tcl", std::process::id()));
    if let Err(e) = std::fs::write(&tmp, "proc healthcheck {} { return ok }\n") {
        eprintln!("tcl-lsp-healthcheck: could not write probe file: {e}");
        return ExitCode::FAILURE;
    }

    let result = client.parse_file(&tmp).await;
    let _ = std::fs::remove_file(&tmp);

    match result {
        Ok(_) => {
            println!("ok: {} parsed the probe file", cli.parser);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("tcl-lsp-healthcheck: {e}");
            ExitCode::FAILURE
        }
    }
}
