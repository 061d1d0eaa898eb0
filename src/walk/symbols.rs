//! Symbol extractor: emits `Symbol`s for `namespace_eval`,
//! `proc`, `set`, `variable`.

use super::{walk, Visitor, WalkContext};
use crate::ast::schema::{Node, NodeKind};
use crate::types::{QName, Symbol, SymbolKind};
use std::path::Path;

pub struct SymbolExtractor {
    pub symbols: Vec<Symbol>,
}

impl SymbolExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self { symbols: Vec::new() }
    }
}

impl Default for SymbolExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor for SymbolExtractor {
    fn visit(&mut self, node: &Node, ctx: &WalkContext<'_>) {
        let (kind, name, params) = match &node.kind {
            NodeKind::NamespaceEval { name, .. } => (SymbolKind::Namespace, name.clone(), vec![]),
            NodeKind::Proc { name, params, .. } => (SymbolKind::Proc, name.clone(), params.clone()),
            NodeKind::Set { var_name, .. } if !ctx.in_proc => {
                (SymbolKind::Variable, var_name.clone(), vec![])
            }
            NodeKind::Variable { name } if !ctx.in_proc => {
                (SymbolKind::Variable, name.clone(), vec![])
            }
            _ => return,
        };
        if name.is_empty() {
            return;
        }
        self.symbols.push(Symbol {
            kind,
            qualified_name: QName::join(&ctx.namespace, &name),
            name,
            file: ctx.filepath.to_path_buf(),
            range: node.range,
            scope: ctx.namespace.clone(),
            params,
        });
    }
}

/// Runs the symbol extractor over an AST rooted at `root`, for `file`.
#[must_use]
pub fn extract_symbols(root: &Node, file: &Path) -> Vec<Symbol> {
    let mut extractor = SymbolExtractor::new();
    walk(root, &WalkContext::root(file), &mut extractor);
    extractor.symbols
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::node_from_value;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn extracts_proc_and_nested_namespace() {
        let ast = json!({
            "type": "root",
            "range": {"start": {"line":1,"column":1}, "end": {"line":5,"column":1}},
            "depth": 0,
            "children": [
                {
                    "type": "namespace_eval",
                    "range": {"start": {"line":1,"column":1}, "end": {"line":3,"column":1}},
                    "depth": 1,
                    "name": "utils",
                    "body": {"children": [
                        {
                            "type": "proc",
                            "range": {"start": {"line":2,"column":1}, "end": {"line":2,"column":20}},
                            "depth": 2,
                            "name": "format",
                            "params": [],
                            "body": {"children": []}
                        }
                    ]}
                }
            ]
        });
        let node = node_from_value(&ast);
        let symbols = extract_symbols(&node, &PathBuf::from("utils.tcl"));
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].qualified_name.as_str(), "::utils");
        assert_eq!(symbols[1].qualified_name.as_str(), "::utils::format");
        assert_eq!(symbols[1].kind, SymbolKind::Proc);
    }

    #[test]
    fn set_and_variable_produce_variable_symbols() {
        let ast = json!({
            "type": "root",
            "range": {"start": {"line":1,"column":1}, "end": {"line":1,"column":1}},
            "depth": 0,
            "children": [
                {"type": "set", "range": {"start": {"line":1,"column":1}, "end": {"line":1,"column":1}}, "depth": 1, "var_name": "x", "value": "1"}
            ]
        });
        let node = node_from_value(&ast);
        let symbols = extract_symbols(&node, &PathBuf::from("a.tcl"));
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].kind, SymbolKind::Variable);
        assert_eq!(symbols[0].qualified_name.as_str(), "::x");
    }

    #[test]
    fn set_inside_proc_body_produces_no_symbol() {
        let ast = json!({
            "type": "root",
            "range": {"start": {"line":1,"column":1}, "end": {"line":3,"column":1}},
            "depth": 0,
            "children": [
                {
                    "type": "proc",
                    "range": {"start": {"line":1,"column":1}, "end": {"line":3,"column":1}},
                    "depth": 1,
                    "name": "run",
                    "params": [],
                    "body": {"children": [
                        {"type": "set", "range": {"start": {"line":2,"column":1}, "end": {"line":2,"column":1}}, "depth": 2, "var_name": "x", "value": "1"}
                    ]}
                }
            ]
        });
        let node = node_from_value(&ast);
        let symbols = extract_symbols(&node, &PathBuf::from("a.tcl"));
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].kind, SymbolKind::Proc);
    }
}
