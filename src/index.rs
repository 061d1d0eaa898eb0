//! The in-memory symbol & reference index.
//!
//! Four maps, written by a single caller at a time (the background
//! indexer serialises all mutation through its applier task — see
//! [`crate::indexer`]) and read concurrently by LSP handlers. `DashMap`
//! gives per-shard locking so reads don't contend with each other the
//! way a single `RwLock` around a `HashMap` would, while still only
//! needing "consistent per-key" reads, which is all callers require.

use crate::types::{QName, Reference, Symbol};
use dashmap::DashMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// The symbol and reference store for a workspace.
#[derive(Default)]
pub struct Index {
    symbols: DashMap<QName, Symbol>,
    files: DashMap<PathBuf, HashSet<QName>>,
    references: DashMap<QName, Vec<Reference>>,
    ref_files: DashMap<PathBuf, Vec<(QName, usize)>>,
}

impl Index {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites `symbols[s.qualified_name]` and records ownership in
    /// `files[s.file]`. A second definition with the same qualified name
    /// silently overwrites the first (Tcl `proc` redefinition is legal);
    /// both entries stay in `files` so removing the file cleans up
    /// whichever definition is current.
    pub fn add_symbol(&self, symbol: Symbol) {
        self.files
            .entry(symbol.file.clone())
            .or_default()
            .insert(symbol.qualified_name.clone());
        self.symbols.insert(symbol.qualified_name.clone(), symbol);
    }

    #[must_use]
    pub fn find(&self, qn: &QName) -> Option<Symbol> {
        self.symbols.get(qn).map(|r| r.clone())
    }

    /// Appends a reference under its resolved target and records the
    /// `(target, index)` pair for this reference's file so it can be
    /// found again during cleanup.
    pub fn add_reference(&self, target: QName, reference: Reference) {
        let mut list = self.references.entry(target.clone()).or_default();
        let index = list.len();
        list.push(reference.clone());
        drop(list);
        self.ref_files
            .entry(reference.file.clone())
            .or_default()
            .push((target, index));
    }

    #[must_use]
    pub fn get_references(&self, qn: &QName) -> Vec<Reference> {
        self.references
            .get(qn)
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Deletes all symbols defined in `path` and filters out all
    /// references originating from `path`. Leaves `symbols[qn]` in place
    /// if `qn` is still defined elsewhere or its only loss is references.
    pub fn remove_file(&self, path: &Path) {
        if let Some((_, qns)) = self.files.remove(path) {
            for qn in qns {
                // Only drop the symbol if it still belongs to this file —
                // a newer definition in another file may have already
                // overwritten it (last-writer-wins).
                let still_owned = self
                    .symbols
                    .get(&qn)
                    .map(|s| s.file == path)
                    .unwrap_or(false);
                if still_owned {
                    self.symbols.remove(&qn);
                }
            }
        }

        if let Some((_, entries)) = self.ref_files.remove(path) {
            let targets: HashSet<QName> = entries.into_iter().map(|(qn, _)| qn).collect();
            for qn in targets {
                if let Some(mut refs) = self.references.get_mut(&qn) {
                    refs.retain(|r| r.file != path);
                }
            }
        }
    }

    /// Drops everything.
    pub fn clear(&self) {
        self.symbols.clear();
        self.files.clear();
        self.references.clear();
        self.ref_files.clear();
    }

    /// All symbols currently indexed, for `workspace/symbol` queries.
    #[must_use]
    pub fn all_symbols(&self) -> Vec<Symbol> {
        self.symbols.iter().map(|e| e.value().clone()).collect()
    }

    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Position, Range, ReferenceKind, SymbolKind};
    use std::path::PathBuf;

    fn sym(qn: &str, file: &str) -> Symbol {
        Symbol {
            kind: SymbolKind::Proc,
            name: qn.trim_start_matches("::").to_string(),
            qualified_name: QName::new(qn),
            file: PathBuf::from(file),
            range: Range::new(Position::new(1, 1), Position::new(1, 1)),
            scope: QName::root(),
            params: vec![],
        }
    }

    fn reference(name: &str, file: &str) -> Reference {
        Reference {
            kind: ReferenceKind::Call,
            name: name.to_string(),
            namespace: QName::root(),
            file: PathBuf::from(file),
            range: Range::new(Position::new(2, 1), Position::new(2, 1)),
            text: name.to_string(),
            target: None,
        }
    }

    #[test]
    fn add_and_find_round_trip() {
        let index = Index::new();
        let s = sym("::foo", "a.tcl");
        index.add_symbol(s.clone());
        assert_eq!(index.find(&s.qualified_name), Some(s));
    }

    #[test]
    fn remove_file_drops_symbols_and_references() {
        let index = Index::new();
        index.add_symbol(sym("::foo", "a.tcl"));
        index.add_reference(QName::new("::foo"), reference("foo", "b.tcl"));
        assert_eq!(index.get_references(&QName::new("::foo")).len(), 1);

        index.remove_file(Path::new("b.tcl"));
        assert!(index.get_references(&QName::new("::foo")).is_empty());
        // Symbol itself, defined in a.tcl, survives.
        assert!(index.find(&QName::new("::foo")).is_some());

        index.remove_file(Path::new("a.tcl"));
        assert!(index.find(&QName::new("::foo")).is_none());
    }

    #[test]
    fn redefinition_overwrites_but_both_files_own_it() {
        let index = Index::new();
        index.add_symbol(sym("::foo", "a.tcl"));
        index.add_symbol(sym("::foo", "b.tcl"));
        assert_eq!(index.find(&QName::new("::foo")).unwrap().file, PathBuf::from("b.tcl"));

        index.remove_file(Path::new("a.tcl"));
        // a.tcl's removal must not clobber the now-current b.tcl definition.
        assert_eq!(index.find(&QName::new("::foo")).unwrap().file, PathBuf::from("b.tcl"));

        index.remove_file(Path::new("b.tcl"));
        assert!(index.find(&QName::new("::foo")).is_none());
    }

    #[test]
    fn all_symbols_lists_every_entry() {
        let index = Index::new();
        index.add_symbol(sym("::foo", "a.tcl"));
        index.add_symbol(sym("::bar", "a.tcl"));
        let mut names: Vec<String> = index.all_symbols().into_iter().map(|s| s.name).collect();
        names.sort();
        assert_eq!(names, vec!["bar".to_string(), "foo".to_string()]);
    }

    #[test]
    fn clear_drops_everything() {
        let index = Index::new();
        index.add_symbol(sym("::foo", "a.tcl"));
        index.add_reference(QName::new("::foo"), reference("foo", "b.tcl"));
        index.clear();
        assert_eq!(index.symbol_count(), 0);
        assert_eq!(index.file_count(), 0);
        assert!(index.get_references(&QName::new("::foo")).is_empty());
    }
}
