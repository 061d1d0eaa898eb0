//! Error types for tcl-lsp-core.
//!
//! Uses thiserror for ergonomic error handling with proper error chain
//! propagation. A symbol or reference that cannot be resolved is not an
//! error — resolution returns `None`/empty `Vec`, never `Err`. `CoreError`
//! only covers failures that stop an operation from running at all: a
//! parser process that won't start, a workspace that can't be walked, a
//! config file that won't parse.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error for the core crate.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("parser error: {0}")]
    Parser(#[from] ParserError),

    #[error("validation error in {path}: {message}")]
    Validation { path: PathBuf, message: String },

    #[error("workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from spawning and talking to the external parser process.
///
/// The parser is the only foreign-process surface; its failures degrade
/// into diagnostics, never panics.
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("failed to locate parser binary {name}: {source}")]
    NotFound {
        name: String,
        #[source]
        source: which::Error,
    },

    #[error("failed to spawn parser process {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parser timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("parser exited with status {status}: {stderr}")]
    NonZeroExit { status: i32, stderr: String },

    #[error("parser output was not valid UTF-8")]
    InvalidUtf8,

    #[error("failed to decode parser output as AST JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors discovering or walking a workspace.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("no workspace root found above {path}")]
    RootNotFound { path: PathBuf },

    #[error("failed to walk workspace at {path}: {reason}")]
    Walk { path: PathBuf, reason: String },
}

/// Errors loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid environment override {key}: {value}")]
    InvalidEnv { key: String, value: String },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Result type alias for parser operations.
pub type ParserResult<T> = std::result::Result<T, ParserError>;

/// Result type alias for config operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl CoreError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parser(e) => e.code(),
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Workspace(e) => e.code(),
            Self::Config(e) => e.code(),
            Self::Io(_) => "IO_ERROR",
        }
    }
}

impl ParserError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "PARSER_NOT_FOUND",
            Self::Spawn { .. } => "PARSER_SPAWN_ERROR",
            Self::Timeout { .. } => "PARSER_TIMEOUT",
            Self::NonZeroExit { .. } => "PARSER_NONZERO_EXIT",
            Self::InvalidUtf8 => "PARSER_INVALID_UTF8",
            Self::Decode(_) => "PARSER_DECODE_ERROR",
        }
    }
}

impl WorkspaceError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::RootNotFound { .. } => "WORKSPACE_ROOT_NOT_FOUND",
            Self::Walk { .. } => "WORKSPACE_WALK_ERROR",
        }
    }
}

impl ConfigError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "CONFIG_READ_ERROR",
            Self::Parse { .. } => "CONFIG_PARSE_ERROR",
            Self::InvalidEnv { .. } => "CONFIG_INVALID_ENV",
        }
    }
}
