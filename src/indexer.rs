//! The background indexer: brings the [`Index`] to a consistent,
//! query-ready state for a workspace root, then keeps it so as files
//! change.
//!
//! Pass 1 (define) parses every file with bounded concurrency and inserts
//! symbols. Pass 2 (resolve) runs only after pass 1 drains, extracting
//! and resolving references. Completion is always applied serially — no
//! `spawn`ed task writes into the `Index` directly — so two files never
//! race on the same map entry.

use crate::ast::build::{node_from_value, shift_positions};
use crate::ast::schema::{Node, NodeKind};
use crate::ast::validate;
use crate::config::Config;
use crate::error::WorkspaceError;
use crate::index::Index;
use crate::lsp::diagnostics::DiagnosticsStore;
use crate::parser::ParseClient;
use crate::resolver::{candidates, ScopeContext};
use crate::rvt::{extract_blocks, BlockKind};
use crate::types::{Diagnostic, Position, QName, Range, Reference, Severity};
use crate::walk::references::extract_references;
use crate::walk::symbols::extract_symbols;
use crate::workspace;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// `idle → scanning → ready`. `cleanup()` forces back to `idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Scanning,
    Ready,
}

pub struct Indexer<P> {
    index: Arc<Index>,
    diagnostics: Arc<DiagnosticsStore>,
    parser: Arc<P>,
    config: Config,
    status: RwLock<Status>,
    shutting_down: Arc<AtomicBool>,
}

impl<P: ParseClient + 'static> Indexer<P> {
    #[must_use]
    pub fn new(index: Arc<Index>, diagnostics: Arc<DiagnosticsStore>, parser: Arc<P>, config: Config) -> Self {
        Self {
            index,
            diagnostics,
            parser,
            config,
            status: RwLock::new(Status::Idle),
            shutting_down: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn status(&self) -> Status {
        *self.status.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_status(&self, status: Status) {
        *self.status.write().unwrap_or_else(|e| e.into_inner()) = status;
    }

    /// Forces the indexer back to `idle` and drops the work queue.
    /// In-flight completions observe `shutting_down` and become no-ops
    /// instead of mutating the index.
    pub fn cleanup(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        self.set_status(Status::Idle);
    }

    /// Runs a full two-pass scan of `root`. Returns the number of files
    /// enumerated.
    pub async fn start(&self, root: &Path) -> Result<usize, WorkspaceError> {
        self.shutting_down.store(false, Ordering::SeqCst);
        self.set_status(Status::Scanning);

        let files = workspace::discover_files(root)?;
        let permits = self.config.max_parallel_parses.max(1);
        let semaphore = Arc::new(Semaphore::new(permits));

        let mut handles = Vec::with_capacity(files.len());
        for path in &files {
            let semaphore = Arc::clone(&semaphore);
            let index = Arc::clone(&self.index);
            let diagnostics = Arc::clone(&self.diagnostics);
            let parser = Arc::clone(&self.parser);
            let shutting_down = Arc::clone(&self.shutting_down);
            let strict = self.config.strict_validation;
            let path = path.clone();
            handles.push(tokio::spawn(async move {
                let permit = semaphore.acquire_owned().await.expect("indexer semaphore never closed");
                if shutting_down.load(Ordering::SeqCst) {
                    drop(permit);
                    return None;
                }
                let result = define_file(&index, &diagnostics, parser.as_ref(), &path, strict).await;
                drop(permit);
                result
            }));
        }

        let mut pending: Vec<(Node, PathBuf)> = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Some(asts)) => pending.extend(asts),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "indexer worker task panicked"),
            }
        }

        if self.shutting_down.load(Ordering::SeqCst) {
            self.set_status(Status::Idle);
            return Ok(0);
        }

        // Pass 2 runs only after every pass-1 insertion from this scan has
        // landed, so a reference resolves against the full symbol set.
        for (ast, path) in &pending {
            if self.shutting_down.load(Ordering::SeqCst) {
                break;
            }
            resolve_file(&self.index, ast, path);
        }

        self.set_status(Status::Ready);
        info!(files = files.len(), "TCL index ready");
        Ok(files.len())
    }

    /// Incremental single-file reindex on save/change: synchronous with
    /// respect to this file, no global pass.
    pub async fn reindex_file(&self, path: &Path) {
        let strict = self.config.strict_validation;
        if let Some(asts) = define_file(&self.index, &self.diagnostics, self.parser.as_ref(), path, strict).await {
            for (ast, file) in &asts {
                resolve_file(&self.index, ast, file);
            }
        }
    }
}

/// One file's pass-1 work: `remove_file` → read → (for `.rvt`, split into
/// blocks) → parse → validate → extract + insert symbols. Returns the
/// built ASTs (one per `.rvt` code block, or one for a whole `.tcl`
/// file) for pass 2 to resolve, or `None` if the file couldn't be read.
async fn define_file(
    index: &Index,
    diagnostics: &DiagnosticsStore,
    parser: &impl ParseClient,
    path: &Path,
    strict: bool,
) -> Option<Vec<(Node, PathBuf)>> {
    index.remove_file(path);

    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "skipping unreadable file");
            diagnostics.clear(path);
            return None;
        }
    };
    if bytes.is_empty() {
        diagnostics.clear(path);
        return None;
    }
    let text = match String::from_utf8(bytes) {
        Ok(t) => t,
        Err(_) => {
            diagnostics.set(
                path.to_path_buf(),
                vec![failure_diagnostic("file is not valid UTF-8")],
            );
            return None;
        }
    };

    let is_rvt = path.extension().and_then(|e| e.to_str()) == Some("rvt");
    let units: Vec<(PathBuf, String, u32, u32)> = if is_rvt {
        extract_blocks(&text)
            .into_iter()
            .filter(|b| b.kind == BlockKind::Code)
            .enumerate()
            .map(|(i, block)| {
                (
                    path.join(format!("#block{i}")),
                    block.code,
                    block.start_line - 1,
                    block.start_col - 1,
                )
            })
            .collect()
    } else {
        vec![(path.to_path_buf(), text, 0, 0)]
    };

    let mut file_diagnostics = Vec::new();
    let mut asts = Vec::with_capacity(units.len());

    for (label, source, line_offset, col_offset) in units {
        let raw = match parser.parse_source(&label, &source).await {
            Ok(v) => v,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "parser failed");
                file_diagnostics.push(failure_diagnostic(&e.to_string()));
                continue;
            }
        };

        let outcome = validate::validate(&raw, strict);
        for error in &outcome.errors {
            file_diagnostics.push(Diagnostic {
                range: Range::new(Position::new(1, 1), Position::new(1, 1)),
                message: format!("{}: {}", error.path, error.message),
                severity: Severity::Error,
            });
        }

        // A parse that reports `had_error` with a partial AST is still
        // indexed — validation failures above don't stop
        // symbol extraction either.
        let mut node = node_from_value(&raw);
        shift_positions(&mut node, line_offset, col_offset);
        if let NodeKind::Root { had_error, errors, .. } = &node.kind {
            if *had_error {
                for parse_error in errors {
                    file_diagnostics.push(Diagnostic {
                        range: parse_error.range.unwrap_or(Range::new(Position::new(1, 1), Position::new(1, 1))),
                        message: parse_error.message.clone(),
                        severity: Severity::Error,
                    });
                }
            }
        }

        for symbol in extract_symbols(&node, path) {
            index.add_symbol(symbol);
        }
        asts.push((node, path.to_path_buf()));
    }

    diagnostics.set(path.to_path_buf(), file_diagnostics);
    Some(asts)
}

fn failure_diagnostic(message: &str) -> Diagnostic {
    Diagnostic {
        range: Range::new(Position::new(1, 1), Position::new(1, 1)),
        message: message.to_string(),
        severity: Severity::Error,
    }
}

/// Pass-2 work for one already-built AST: extract references, resolve
/// each to a target qualified name already present in the index, and
/// record the hit. Unresolved references (built-ins, dynamic names,
/// external code) are dropped silently.
fn resolve_file(index: &Index, node: &Node, file: &Path) {
    for reference in extract_references(node, file) {
        if let Some(target) = resolve_reference_target(index, &reference) {
            index.add_reference(target, reference);
        }
    }
}

fn resolve_reference_target(index: &Index, reference: &Reference) -> Option<QName> {
    if let Some(target) = &reference.target {
        return index.find(target).map(|_| target.clone());
    }
    let ctx = ScopeContext {
        namespace: reference.namespace.clone(),
        ..ScopeContext::default()
    };
    candidates(&reference.name, &ctx)
        .into_iter()
        .find(|candidate| index.find(candidate).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::FakeParserClient;
    use serde_json::json;
    use tempfile::TempDir;

    fn proc_ast(name: &str, calls: &[&str]) -> serde_json::Value {
        json!({
            "type": "root",
            "range": {"start": {"line":1,"column":1}, "end": {"line":10,"column":1}},
            "depth": 0,
            "children": [{
                "type": "proc",
                "range": {"start": {"line":1,"column":1}, "end": {"line":5,"column":1}},
                "depth": 1,
                "name": name,
                "params": [],
                "body": {"children": calls.iter().map(|c| json!({
                    "type": "command",
                    "range": {"start": {"line":2,"column":1}, "end": {"line":2,"column":10}},
                    "depth": 2,
                    "name": c,
                    "args": []
                })).collect::<Vec<_>>()}
            }]
        })
    }

    #[tokio::test]
    async fn full_scan_defines_symbols_and_resolves_calls() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.tcl"), "proc a {} { b }").unwrap();
        std::fs::write(dir.path().join("b.tcl"), "proc b {} {}").unwrap();

        let parser = Arc::new(FakeParserClient::new());
        parser.set(dir.path().join("a.tcl"), proc_ast("a", &["b"]));
        parser.set(dir.path().join("b.tcl"), proc_ast("b", &[]));

        let index = Arc::new(Index::new());
        let diagnostics = Arc::new(DiagnosticsStore::new());
        let indexer = Indexer::new(Arc::clone(&index), diagnostics, parser, Config::default());

        let count = indexer.start(dir.path()).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(indexer.status(), Status::Ready);
        assert!(index.find(&QName::new("::a")).is_some());
        assert!(index.find(&QName::new("::b")).is_some());
        assert_eq!(index.get_references(&QName::new("::b")).len(), 1);
    }

    #[tokio::test]
    async fn cleanup_before_start_prevents_writes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.tcl"), "proc a {} {}").unwrap();
        let parser = Arc::new(FakeParserClient::new());
        parser.set(dir.path().join("a.tcl"), proc_ast("a", &[]));

        let index = Arc::new(Index::new());
        let diagnostics = Arc::new(DiagnosticsStore::new());
        let indexer = Indexer::new(Arc::clone(&index), diagnostics, parser, Config::default());
        indexer.cleanup();
        assert_eq!(indexer.status(), Status::Idle);
    }

    #[tokio::test]
    async fn reindex_file_updates_without_global_pass() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.tcl");
        std::fs::write(&path, "proc a {} {}").unwrap();

        let parser = Arc::new(FakeParserClient::new());
        parser.set(path.clone(), proc_ast("a", &[]));

        let index = Arc::new(Index::new());
        let diagnostics = Arc::new(DiagnosticsStore::new());
        let indexer = Indexer::new(Arc::clone(&index), diagnostics, parser, Config::default());

        indexer.reindex_file(&path).await;
        assert!(index.find(&QName::new("::a")).is_some());
    }
}
