//! The external parser client.
//!
//! The parser is the only foreign-process surface in the system:
//! it's invoked as `parse <input-file>`, reads Tcl source, and writes a
//! single JSON AST document to stdout. Everything downstream of this
//! module is pure.

use crate::error::{ParserError, ParserResult};
use serde_json::Value;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

static TEMP_FILE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Abstracts over "a thing that turns a Tcl/RVT-fragment file into a raw
/// JSON AST", so the indexer and resolver tests can run against
/// [`FakeParserClient`] without spawning any process.
pub trait ParseClient: Send + Sync {
    fn parse_file<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, ParserResult<Value>>;

    /// Parses `source` directly, identified for diagnostics purposes by
    /// `label` (not necessarily a real file — RVT blocks don't exist as
    /// standalone files). The parser binary only understands files, so
    /// the default implementation spills `source` to a uniquely-named
    /// temp file and delegates to [`Self::parse_file`].
    fn parse_source<'a>(&'a self, label: &'a Path, source: &'a str) -> BoxFuture<'a, ParserResult<Value>> {
        let _ = label;
        let source = source.to_string();
        Box::pin(async move {
            let n = TEMP_FILE_COUNTER.fetch_add(1, Ordering::Relaxed);
            let mut path = std::env::temp_dir();
            path.push(format!("tcl-lsp-{}-{n}.tcl", std::process::id()));
            tokio::fs::write(&path, &source).await.map_err(|source| ParserError::Spawn {
                path: path.clone(),
                source,
            })?;
            let result = self.parse_file(&path).await;
            let _ = tokio::fs::remove_file(&path).await;
            result
        })
    }
}

/// Spawns the configured parser binary for each file.
pub struct ExternalParserClient {
    binary: PathBuf,
    timeout: Duration,
}

impl ExternalParserClient {
    /// Resolves `binary_name` to an absolute path via `which` unless it's
    /// already a path (absolute or contains a separator).
    pub fn new(binary_name: &str, timeout: Duration) -> ParserResult<Self> {
        let binary = if binary_name.contains(std::path::MAIN_SEPARATOR) {
            PathBuf::from(binary_name)
        } else {
            which::which(binary_name).map_err(|source| ParserError::NotFound {
                name: binary_name.to_string(),
                source,
            })?
        };
        Ok(Self { binary, timeout })
    }
}

impl ParseClient for ExternalParserClient {
    fn parse_file<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, ParserResult<Value>> {
        Box::pin(async move {
            let mut child = Command::new(&self.binary)
                .arg("parse")
                .arg(path)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
                .map_err(|source| ParserError::Spawn {
                    path: self.binary.clone(),
                    source,
                })?;

            let mut stdout = child.stdout.take().expect("piped stdout");
            let mut stderr = child.stderr.take().expect("piped stderr");

            let run = async {
                let mut out = Vec::new();
                let mut err = Vec::new();
                let (_, _, status) = tokio::join!(
                    stdout.read_to_end(&mut out),
                    stderr.read_to_end(&mut err),
                    child.wait(),
                );
                (out, err, status)
            };

            let (stdout_bytes, stderr_bytes, status) =
                match tokio::time::timeout(self.timeout, run).await {
                    Ok(result) => result,
                    Err(_) => {
                        let _ = child.start_kill();
                        return Err(ParserError::Timeout {
                            timeout_secs: self.timeout.as_secs(),
                        });
                    }
                };

            let status = status.map_err(|source| ParserError::Spawn {
                path: self.binary.clone(),
                source,
            })?;

            if !status.success() {
                let stderr_text = String::from_utf8_lossy(&stderr_bytes).into_owned();
                return Err(ParserError::NonZeroExit {
                    status: status.code().unwrap_or(-1),
                    stderr: stderr_text,
                });
            }

            let text = String::from_utf8(stdout_bytes).map_err(|_| ParserError::InvalidUtf8)?;
            let value: Value = serde_json::from_str(&text)?;
            Ok(value)
        })
    }
}

/// Test double: returns pre-built ASTs without spawning anything.
#[derive(Default)]
pub struct FakeParserClient {
    fixtures: std::sync::Mutex<std::collections::HashMap<PathBuf, Value>>,
}

impl FakeParserClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, path: impl Into<PathBuf>, ast: Value) {
        self.fixtures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.into(), ast);
    }
}

impl ParseClient for FakeParserClient {
    fn parse_file<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, ParserResult<Value>> {
        let ast = self
            .fixtures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .cloned();
        Box::pin(async move {
            ast.ok_or_else(|| ParserError::NonZeroExit {
                status: 1,
                stderr: format!("no fixture registered for {}", path.display()),
            })
        })
    }

    fn parse_source<'a>(&'a self, label: &'a Path, _source: &'a str) -> BoxFuture<'a, ParserResult<Value>> {
        // Fixtures are keyed by label directly — no temp file needed, and
        // no real parser binary to spill one for.
        self.parse_file(label)
    }
}
