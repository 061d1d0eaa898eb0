//! The scope-aware resolver.
//!
//! Given `(file, position)`, computes lexical scope context from the
//! cached AST, then resolves the token under the cursor to a `Symbol`
//! (go-to-definition) or assembles the definition + reference list for
//! find-references.

use crate::ast::schema::{Node, NodeKind};
use crate::index::Index;
use crate::types::{Position, QName, Range, Reference, ReferenceKind, Symbol};
use crate::walk::children_of;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// A caller-frame alias introduced by `upvar`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpvarInfo {
    pub level: String,
    pub other_var: String,
}

/// Lexical scope at a given `(file, position)`.
#[derive(Debug, Clone, Default)]
pub struct ScopeContext {
    pub namespace: QName,
    pub proc: Option<String>,
    pub locals: HashSet<String>,
    pub globals: HashSet<String>,
    pub upvars: HashMap<String, UpvarInfo>,
}

impl ScopeContext {
    fn root() -> Self {
        Self {
            namespace: QName::root(),
            ..Default::default()
        }
    }
}

/// Walks the AST top-down, stopping at the node whose range no longer
/// contains `pos` — the context accumulated up to that point is the
/// answer.
#[must_use]
pub fn compute_scope(root: &Node, pos: Position) -> ScopeContext {
    let mut ctx = ScopeContext::root();
    if root.range.contains(pos) {
        descend(root, pos, &mut ctx);
    }
    ctx
}

fn descend(node: &Node, pos: Position, ctx: &mut ScopeContext) {
    apply(node, ctx);
    for child in children_of(node) {
        if child.range.contains(pos) {
            descend(child, pos, ctx);
            return;
        }
    }
}

fn apply(node: &Node, ctx: &mut ScopeContext) {
    match &node.kind {
        NodeKind::NamespaceEval { name, .. } => {
            ctx.namespace = QName::join(&ctx.namespace, name);
        }
        NodeKind::Proc { name, params, .. } => {
            ctx.proc = Some(name.clone());
            ctx.locals = params.iter().map(|p| p.name.clone()).collect();
            ctx.globals.clear();
            ctx.upvars.clear();
        }
        NodeKind::Set { var_name, .. } if ctx.proc.is_some() => {
            ctx.locals.insert(var_name.clone());
        }
        NodeKind::Variable { name } if ctx.proc.is_some() => {
            ctx.locals.insert(name.clone());
        }
        NodeKind::Global { vars } => {
            ctx.globals.extend(vars.iter().cloned());
        }
        NodeKind::Upvar {
            level,
            other_var,
            local_var,
        } => {
            let local = local_var.clone().unwrap_or_else(|| other_var.clone());
            ctx.upvars.insert(
                local,
                UpvarInfo {
                    level: level.clone(),
                    other_var: other_var.clone(),
                },
            );
        }
        _ => {}
    }
}

/// Strips Tcl variable syntax (`$name`, `${name}`, `$arr(key)`) down to
/// the identifier that actually resolves.
#[must_use]
pub fn strip_variable_syntax(token: &str) -> &str {
    let token = token.strip_prefix('$').unwrap_or(token);
    if let Some(inner) = token.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
        return inner;
    }
    if let Some(paren) = token.find('(') {
        return &token[..paren];
    }
    token
}

/// Candidate qualified names for a bare token `w` seen under `ctx`,
/// de-duplicated, in resolution order: namespace-local before global, so
/// a name that exists in both scopes resolves to the lexically nearer
/// one.
#[must_use]
pub fn candidates(word: &str, ctx: &ScopeContext) -> Vec<QName> {
    if let Some(stripped) = word.strip_prefix("::") {
        return vec![QName::new(stripped)];
    }
    let raw = [QName::join(&ctx.namespace, word), QName::new(format!("::{word}"))];
    let mut seen = HashSet::new();
    raw.into_iter().filter(|q| seen.insert(q.clone())).collect()
}

/// Innermost node satisfying `pred` that contains `pos`, searching from
/// `root` downward (self included).
fn find_enclosing<'a>(node: &'a Node, pos: Position, pred: &impl Fn(&Node) -> bool) -> Option<&'a Node> {
    if !node.range.contains(pos) {
        return None;
    }
    for child in children_of(node) {
        if let Some(found) = find_enclosing(child, pos, pred) {
            return Some(found);
        }
    }
    if pred(node) {
        Some(node)
    } else {
        None
    }
}

#[must_use]
pub fn find_enclosing_proc(root: &Node, pos: Position) -> Option<&Node> {
    find_enclosing(root, pos, &|n| matches!(n.kind, NodeKind::Proc { .. }))
}

/// First `set`/`variable` site for `word` inside a proc's subtree,
/// without crossing into a nested `proc`.
fn find_first_local_def(proc_node: &Node, word: &str) -> Option<Range> {
    fn search(node: &Node, word: &str, skip_self_proc: bool) -> Option<Range> {
        if !skip_self_proc {
            if let NodeKind::Proc { .. } = &node.kind {
                return None;
            }
        }
        match &node.kind {
            NodeKind::Set { var_name, .. } if var_name == word => return Some(node.range),
            NodeKind::Variable { name } if name == word => return Some(node.range),
            _ => {}
        }
        for child in children_of(node) {
            if let Some(found) = search(child, word, false) {
                return Some(found);
            }
        }
        None
    }
    search(proc_node, word, true)
}

/// A go-to-definition result: either a same-file location (locals have
/// no index entry) or an indexed `Symbol`.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    SameFile { file: PathBuf, range: Range },
    Symbol(Symbol),
}

/// Resolution algorithm: locals, then upvar substitution, then
/// globals, then namespace-aware candidates, then a single-file AST
/// fallback. Returns `None` if nothing resolves — never an error.
#[must_use]
pub fn resolve_definition(index: &Index, root: &Node, file: &Path, pos: Position, token: &str) -> Option<Definition> {
    let word = strip_variable_syntax(token);
    let ctx = compute_scope(root, pos);

    if ctx.locals.contains(word) {
        let proc_node = find_enclosing_proc(root, pos)?;
        let range = find_first_local_def(proc_node, word)?;
        return Some(Definition::SameFile {
            file: file.to_path_buf(),
            range,
        });
    }

    let lookup_word = ctx
        .upvars
        .get(word)
        .map(|info| info.other_var.clone())
        .unwrap_or_else(|| word.to_string());

    if ctx.globals.contains(word) {
        let qn = QName::new(format!("::{lookup_word}"));
        return index.find(&qn).map(Definition::Symbol);
    }

    for candidate in candidates(&lookup_word, &ctx) {
        if let Some(symbol) = index.find(&candidate) {
            return Some(Definition::Symbol(symbol));
        }
    }

    // Fallback: the workspace index may not yet contain this file's
    // symbols (e.g. during warmup) — scan this file's own AST directly.
    let candidate_set: HashSet<QName> = candidates(&lookup_word, &ctx).into_iter().collect();
    crate::walk::symbols::extract_symbols(root, file)
        .into_iter()
        .find(|s| candidate_set.contains(&s.qualified_name))
        .map(Definition::Symbol)
}

/// Ordering bucket for find-references results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum FoundKind {
    Definition,
    Export,
    Call,
}

/// One entry in a find-references result: either the definition site or
/// a use site.
#[derive(Debug, Clone, PartialEq)]
pub struct Found {
    pub is_definition: bool,
    pub file: PathBuf,
    pub range: Range,
}

/// Retrieves the definition (if any) plus every reference to `qn`,
/// sorted `(type-order, file, line)` with `Definition < Export < Call`.
#[must_use]
pub fn find_references(index: &Index, qn: &QName) -> Vec<Found> {
    let mut entries: Vec<(FoundKind, Found)> = Vec::new();

    if let Some(symbol) = index.find(qn) {
        entries.push((
            FoundKind::Definition,
            Found {
                is_definition: true,
                file: symbol.file,
                range: symbol.range,
            },
        ));
    }

    for reference in index.get_references(qn) {
        let bucket = match reference.kind {
            ReferenceKind::Export | ReferenceKind::Alias => FoundKind::Export,
            ReferenceKind::Call => FoundKind::Call,
        };
        entries.push((
            bucket,
            Found {
                is_definition: false,
                file: reference.file,
                range: reference.range,
            },
        ));
    }

    entries.sort_by(|(ka, a), (kb, b)| {
        ka.cmp(kb)
            .then_with(|| a.file.cmp(&b.file))
            .then_with(|| a.range.start.line.cmp(&b.range.start.line))
    });
    entries.into_iter().map(|(_, found)| found).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::node_from_value;
    use crate::types::{Reference as RefT, SymbolKind};
    use serde_json::json;
    use std::path::PathBuf;

    fn def_symbol(qn: &str, file: &str, line: u32) -> Symbol {
        Symbol {
            kind: SymbolKind::Proc,
            name: qn.trim_start_matches("::").to_string(),
            qualified_name: QName::new(qn),
            file: PathBuf::from(file),
            range: Range::new(Position::new(line, 1), Position::new(line, 10)),
            scope: QName::root(),
            params: vec![],
        }
    }

    #[test]
    fn local_shadows_global_set() {
        // proc f {} { set x 2 } with x used at line 1 column ~16.
        let ast = json!({
            "type": "proc",
            "range": {"start": {"line":1,"column":1}, "end": {"line":1,"column":40}},
            "depth": 0,
            "name": "f",
            "params": [],
            "body": {"children": [
                {"type": "set", "range": {"start": {"line":1,"column":14}, "end": {"line":1,"column":24}}, "depth": 1, "var_name": "x", "value": "2"}
            ]}
        });
        let node = node_from_value(&ast);
        let ctx = compute_scope(&node, Position::new(1, 20));
        assert!(ctx.locals.contains("x"));
    }

    #[test]
    fn upvar_substitutes_other_var() {
        let ast = json!({
            "type": "proc",
            "range": {"start": {"line":1,"column":1}, "end": {"line":1,"column":60}},
            "depth": 0,
            "name": "f",
            "params": [],
            "body": {"children": [
                {"type": "upvar", "range": {"start": {"line":1,"column":14}, "end": {"line":1,"column":35}}, "depth": 1, "level": "1", "other_var": "realvar", "local_var": "local"}
            ]}
        });
        let node = node_from_value(&ast);
        let ctx = compute_scope(&node, Position::new(1, 40));
        assert_eq!(ctx.upvars.get("local").unwrap().other_var, "realvar");
    }

    #[test]
    fn resolve_definition_finds_global_after_candidates() {
        let index = Index::new();
        index.add_symbol(def_symbol("::add", "math.tcl", 1));
        let ast = json!({
            "type": "root",
            "range": {"start": {"line":1,"column":1}, "end": {"line":3,"column":1}},
            "depth": 0,
            "children": []
        });
        let node = node_from_value(&ast);
        let def = resolve_definition(&index, &node, Path::new("main.tcl"), Position::new(2, 13), "add");
        assert_eq!(def, Some(Definition::Symbol(def_symbol("::add", "math.tcl", 1))));
    }

    #[test]
    fn candidates_prefer_namespace_over_global() {
        let ctx = ScopeContext {
            namespace: QName::new("::ns1"),
            ..ScopeContext::default()
        };
        assert_eq!(candidates("get", &ctx), vec![QName::new("::ns1::get"), QName::new("::get")]);
    }

    #[test]
    fn resolve_definition_prefers_namespace_local_over_colliding_global() {
        let index = Index::new();
        index.add_symbol(def_symbol("::get", "global.tcl", 1));
        index.add_symbol(def_symbol("::ns1::get", "ns1.tcl", 5));
        let ast = json!({
            "type": "root",
            "range": {"start": {"line":1,"column":1}, "end": {"line":3,"column":1}},
            "depth": 0,
            "children": [{
                "type": "namespace_eval",
                "range": {"start": {"line":1,"column":1}, "end": {"line":3,"column":1}},
                "depth": 1,
                "name": "ns1",
                "body": {"children": []}
            }]
        });
        let node = node_from_value(&ast);
        let def = resolve_definition(&index, &node, Path::new("ns1.tcl"), Position::new(2, 1), "get");
        assert_eq!(def, Some(Definition::Symbol(def_symbol("::ns1::get", "ns1.tcl", 5))));
    }

    #[test]
    fn find_references_orders_definition_then_export_then_call() {
        let index = Index::new();
        index.add_symbol(def_symbol("::utils::format", "utils.tcl", 1));
        index.add_reference(
            QName::new("::utils::format"),
            RefT {
                kind: ReferenceKind::Call,
                name: "format".to_string(),
                namespace: QName::root(),
                file: PathBuf::from("b.tcl"),
                range: Range::new(Position::new(5, 1), Position::new(5, 5)),
                text: "format".to_string(),
                target: None,
            },
        );
        index.add_reference(
            QName::new("::utils::format"),
            RefT {
                kind: ReferenceKind::Call,
                name: "format".to_string(),
                namespace: QName::root(),
                file: PathBuf::from("a.tcl"),
                range: Range::new(Position::new(1, 1), Position::new(1, 5)),
                text: "format".to_string(),
                target: None,
            },
        );

        let found = find_references(&index, &QName::new("::utils::format"));
        assert_eq!(found.len(), 3);
        assert!(found[0].is_definition);
        assert_eq!(found[1].file, PathBuf::from("a.tcl"));
        assert_eq!(found[2].file, PathBuf::from("b.tcl"));
    }
}
