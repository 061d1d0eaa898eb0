//! Common test utilities for `tcl_lsp_core` integration tests.
//!
//! Wires a temp-dir workspace, the concurrent [`Index`], the background
//! [`Indexer`], and a `FakeParserClient` together so a scenario can
//! register per-file AST fixtures, run a full scan, and query the
//! resulting index without spawning a real parser process.

#![allow(dead_code)]

use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tcl_lsp_core::config::Config;
use tcl_lsp_core::index::Index;
use tcl_lsp_core::indexer::Indexer;
use tcl_lsp_core::lsp::DiagnosticsStore;
use tcl_lsp_core::parser::FakeParserClient;
use tempfile::TempDir;

/// A complete test workspace with all indexing services wired together.
pub struct Workspace {
    pub dir: TempDir,
    pub index: Arc<Index>,
    pub diagnostics: Arc<DiagnosticsStore>,
    pub parser: Arc<FakeParserClient>,
    pub indexer: Indexer<FakeParserClient>,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp workspace");
        let index = Arc::new(Index::new());
        let diagnostics = Arc::new(DiagnosticsStore::new());
        let parser = Arc::new(FakeParserClient::new());
        let indexer = Indexer::new(Arc::clone(&index), Arc::clone(&diagnostics), Arc::clone(&parser), Config::default());

        Self {
            dir,
            index,
            diagnostics,
            parser,
            indexer,
        }
    }

    /// Writes `name` to the workspace. Content is irrelevant to
    /// `FakeParserClient` but `Indexer::define_file` still reads the file
    /// to check it's non-empty, valid UTF-8.
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, content).expect("write workspace file");
        path
    }

    /// Registers the AST the fake parser should return for `name`.
    pub fn set_fixture(&self, name: &str, ast: Value) -> PathBuf {
        let path = self.dir.path().join(name);
        self.parser.set(path.clone(), ast);
        path
    }

    /// Writes a placeholder file and registers its fixture in one call —
    /// the common case, since the indexer skips files it can't read.
    pub fn file_with_ast(&self, name: &str, ast: Value) -> PathBuf {
        self.write_file(name, "# placeholder, see fixture\n");
        self.set_fixture(name, ast)
    }

    /// Runs the indexer's full two-pass scan over the workspace root.
    pub async fn index_all(&self) -> usize {
        self.indexer.start(self.dir.path()).await.expect("full scan")
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for a `{"type": "root", ...}` AST whose top-level children
/// are given directly, spanning the given end line.
pub fn root_ast(end_line: u32, children: Vec<Value>) -> Value {
    serde_json::json!({
        "type": "root",
        "range": {"start": {"line": 1, "column": 1}, "end": {"line": end_line, "column": 1}},
        "depth": 0,
        "children": children,
    })
}
