//! Reference extractor: emits `Reference`s for
//! `namespace_export`, `interp_alias`, `command`, and
//! `command_substitution`.

use super::{walk, Visitor, WalkContext};
use crate::ast::schema::{CommandRef, Node, NodeKind};
use crate::builtins::is_builtin;
use crate::types::{QName, Reference, ReferenceKind};
use std::path::Path;

pub struct ReferenceExtractor {
    pub references: Vec<Reference>,
}

impl ReferenceExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            references: Vec::new(),
        }
    }

    fn push_call(&mut self, name: &str, node: &Node, ctx: &WalkContext<'_>, text: String) {
        if is_builtin(name) {
            return;
        }
        self.references.push(Reference {
            kind: ReferenceKind::Call,
            name: name.to_string(),
            namespace: ctx.namespace.clone(),
            file: ctx.filepath.to_path_buf(),
            range: node.range,
            text,
            target: None,
        });
    }
}

impl Default for ReferenceExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Up to 5 arguments summarised for UI display.
fn summarize_args(args: &[Node]) -> String {
    args.iter()
        .take(5)
        .map(describe_arg)
        .collect::<Vec<_>>()
        .join(" ")
}

fn describe_arg(node: &Node) -> String {
    match &node.kind {
        NodeKind::Expr { value } => value.clone(),
        NodeKind::Variable { name } => format!("${name}"),
        NodeKind::Command { name, .. } => name.clone().unwrap_or_default(),
        other => other.name().to_string(),
    }
}

impl Visitor for ReferenceExtractor {
    fn visit(&mut self, node: &Node, ctx: &WalkContext<'_>) {
        match &node.kind {
            NodeKind::NamespaceExport { exports } => {
                for name in exports {
                    if name == "*" {
                        continue;
                    }
                    self.references.push(Reference {
                        kind: ReferenceKind::Export,
                        name: name.clone(),
                        namespace: ctx.namespace.clone(),
                        file: ctx.filepath.to_path_buf(),
                        range: node.range,
                        text: format!("namespace export {name}"),
                        target: None,
                    });
                }
            }
            NodeKind::InterpAlias { alias, target } => {
                self.references.push(Reference {
                    kind: ReferenceKind::Export,
                    name: alias.clone(),
                    namespace: ctx.namespace.clone(),
                    file: ctx.filepath.to_path_buf(),
                    range: node.range,
                    text: format!("interp alias {alias} -> {target}"),
                    target: Some(QName::new(target.clone())),
                });
            }
            NodeKind::Command { name: Some(name), args } => {
                let text = format!("{name} {}", summarize_args(args));
                self.push_call(name, node, ctx, text);
            }
            NodeKind::CommandSubstitution { command } => {
                if let Some(head) = command.head() {
                    let text = match command {
                        CommandRef::Name(s) => s.clone(),
                        CommandRef::Parts(parts) => parts.join(" "),
                    };
                    self.push_call(head, node, ctx, text);
                }
            }
            NodeKind::Set { children, .. } => {
                // Re-enter the walk explicitly on embedded substitutions
                // so `set x [foo]` captures the call to `foo`.
                for child in children {
                    walk(child, ctx, self);
                }
            }
            _ => {}
        }
    }
}

/// Runs the reference extractor over an AST rooted at `root`, for `file`.
#[must_use]
pub fn extract_references(root: &Node, file: &Path) -> Vec<Reference> {
    let mut extractor = ReferenceExtractor::new();
    walk(root, &WalkContext::root(file), &mut extractor);
    extractor.references
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::node_from_value;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn command_emits_call_unless_builtin() {
        let ast = json!({
            "type": "root",
            "range": {"start": {"line":1,"column":1}, "end": {"line":1,"column":1}},
            "depth": 0,
            "children": [
                {"type": "command", "range": {"start": {"line":1,"column":1}, "end": {"line":1,"column":10}}, "depth": 1, "name": "add", "args": []},
                {"type": "command", "range": {"start": {"line":2,"column":1}, "end": {"line":2,"column":10}}, "depth": 1, "name": "puts", "args": []}
            ]
        });
        let node = node_from_value(&ast);
        let refs = extract_references(&node, &PathBuf::from("a.tcl"));
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "add");
    }

    #[test]
    fn namespace_export_excludes_wildcard() {
        let ast = json!({
            "type": "namespace_export",
            "range": {"start": {"line":1,"column":1}, "end": {"line":1,"column":1}},
            "depth": 0,
            "exports": ["foo", "*", "bar"]
        });
        let node = node_from_value(&ast);
        let refs = extract_references(&node, &PathBuf::from("a.tcl"));
        assert_eq!(refs.len(), 2);
        assert!(refs.iter().all(|r| r.name != "*"));
    }

    #[test]
    fn set_value_command_substitution_is_captured() {
        let ast = json!({
            "type": "set",
            "range": {"start": {"line":1,"column":1}, "end": {"line":1,"column":1}},
            "depth": 0,
            "var_name": "x",
            "value": "[foo]",
            "children": [
                {"type": "command_substitution", "range": {"start": {"line":1,"column":6}, "end": {"line":1,"column":11}}, "depth": 1, "command": "foo"}
            ]
        });
        let node = node_from_value(&ast);
        let refs = extract_references(&node, &PathBuf::from("a.tcl"));
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "foo");
    }
}
