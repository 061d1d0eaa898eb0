//! Configuration (ambient stack).
//!
//! Loaded from an optional `tcl-lsp.toml` at the workspace root,
//! overlaid with `TCL_LSP_*` environment variables, overlaid with CLI
//! flags — in that priority order, CLI highest. Defaults: 6 parallel
//! parse jobs, 10s parser timeout, lenient validation, depth bound of 50.

use crate::error::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bounded worker count for the background indexer.
    pub max_parallel_parses: usize,
    /// Path to the external parser binary. `None` means "look up `parse`
    /// on `PATH`" via the `which` crate.
    pub parser_path: Option<PathBuf>,
    /// Kills the parser subprocess and reports a timeout past this many
    /// seconds.
    pub parser_timeout_secs: u64,
    /// Promotes validation failures to hard errors ("dev mode").
    pub strict_validation: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_parallel_parses: 6,
            parser_path: None,
            parser_timeout_secs: 10,
            strict_validation: false,
        }
    }
}

impl Config {
    /// Loads configuration from `<root>/tcl-lsp.toml` if present, then
    /// applies `TCL_LSP_*` environment overrides.
    pub fn load(root: &Path) -> ConfigResult<Self> {
        let mut config = Self::from_file(root)?;
        config.apply_env()?;
        Ok(config)
    }

    fn from_file(root: &Path) -> ConfigResult<Self> {
        let path = root.join("tcl-lsp.toml");
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })
    }

    fn apply_env(&mut self) -> ConfigResult<()> {
        if let Ok(v) = std::env::var("TCL_LSP_MAX_PARALLEL_PARSES") {
            self.max_parallel_parses = v.parse().map_err(|_| ConfigError::InvalidEnv {
                key: "TCL_LSP_MAX_PARALLEL_PARSES".to_string(),
                value: v,
            })?;
        }
        if let Ok(v) = std::env::var("TCL_LSP_PARSER_PATH") {
            self.parser_path = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("TCL_LSP_PARSER_TIMEOUT_SECS") {
            self.parser_timeout_secs = v.parse().map_err(|_| ConfigError::InvalidEnv {
                key: "TCL_LSP_PARSER_TIMEOUT_SECS".to_string(),
                value: v,
            })?;
        }
        if let Ok(v) = std::env::var("TCL_LSP_STRICT_VALIDATION") {
            self.strict_validation = v == "1" || v.eq_ignore_ascii_case("true");
        }
        Ok(())
    }
}
