//! Diagnostics façade.
//!
//! One entry per file, replaced wholesale on each (re)index so stale
//! diagnostics never linger once a file parses and validates clean.

use crate::types::Diagnostic;
use dashmap::DashMap;
use std::path::{Path, PathBuf};

#[derive(Default)]
pub struct DiagnosticsStore {
    by_file: DashMap<PathBuf, Vec<Diagnostic>>,
}

impl DiagnosticsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the diagnostics for `path`. An empty `diagnostics` clears
    /// the entry entirely rather than leaving a stale empty `Vec` behind.
    pub fn set(&self, path: PathBuf, diagnostics: Vec<Diagnostic>) {
        if diagnostics.is_empty() {
            self.by_file.remove(&path);
        } else {
            self.by_file.insert(path, diagnostics);
        }
    }

    pub fn clear(&self, path: &Path) {
        self.by_file.remove(path);
    }

    #[must_use]
    pub fn get(&self, path: &Path) -> Vec<Diagnostic> {
        self.by_file.get(path).map(|r| r.clone()).unwrap_or_default()
    }

    /// All files currently carrying at least one diagnostic.
    #[must_use]
    pub fn files(&self) -> Vec<PathBuf> {
        self.by_file.iter().map(|e| e.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Position, Range, Severity};
    use std::path::PathBuf;

    fn diag() -> Diagnostic {
        Diagnostic {
            range: Range::new(Position::new(1, 1), Position::new(1, 2)),
            message: "bad".to_string(),
            severity: Severity::Error,
        }
    }

    #[test]
    fn set_then_clear_on_empty() {
        let store = DiagnosticsStore::new();
        let path = PathBuf::from("a.tcl");
        store.set(path.clone(), vec![diag()]);
        assert_eq!(store.get(&path).len(), 1);

        store.set(path.clone(), vec![]);
        assert!(store.get(&path).is_empty());
        assert!(store.files().is_empty());
    }

    #[test]
    fn explicit_clear_removes_entry() {
        let store = DiagnosticsStore::new();
        let path = PathBuf::from("a.tcl");
        store.set(path.clone(), vec![diag()]);
        store.clear(&path);
        assert!(store.get(&path).is_empty());
    }
}
