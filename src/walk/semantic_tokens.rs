//! Semantic-token extractor: keyword, function/definition, and
//! variable tokens, encoded as the LSP delta-encoded quintuple stream.

use super::{walk, Visitor, WalkContext};
use crate::ast::schema::{Node, NodeKind};
use std::path::Path;

/// Token type indices, matching [`LEGEND`]'s order — this is the legend
/// advertised in `initialize`'s server capabilities.
pub const LEGEND: &[&str] = &["keyword", "function", "variable"];

const TYPE_KEYWORD: u32 = 0;
const TYPE_FUNCTION: u32 = 1;
const TYPE_VARIABLE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RawToken {
    line: u32,
    character: u32,
    length: u32,
    token_type: u32,
}

/// Known imperfection: positioning the
/// function/variable token after a keyword assumes a single-space
/// separator (`"proc "`, `"set "`). Tabs or unusual whitespace will
/// mis-position the token.
fn keyword_for(kind: &NodeKind) -> Option<&'static str> {
    match kind {
        NodeKind::Proc { .. } => Some("proc"),
        NodeKind::Set { .. } => Some("set"),
        NodeKind::Variable { .. } => Some("variable"),
        NodeKind::Global { .. } => Some("global"),
        NodeKind::Upvar { .. } => Some("upvar"),
        NodeKind::Array { .. } => Some("array"),
        NodeKind::If { .. } => Some("if"),
        NodeKind::While { .. } => Some("while"),
        NodeKind::For { .. } => Some("for"),
        NodeKind::Foreach { .. } => Some("foreach"),
        NodeKind::Switch { .. } => Some("switch"),
        NodeKind::NamespaceEval { .. } | NodeKind::NamespaceImport { .. } | NodeKind::NamespaceExport { .. } => {
            Some("namespace")
        }
        NodeKind::PackageRequire { .. } | NodeKind::PackageProvide { .. } => Some("package"),
        NodeKind::Source { .. } => Some("source"),
        NodeKind::Puts { .. } => Some("puts"),
        NodeKind::Error { .. } => Some("error"),
        NodeKind::InterpAlias { .. } => Some("interp"),
        _ => None,
    }
}

pub struct SemanticTokenExtractor {
    tokens: Vec<RawToken>,
}

impl SemanticTokenExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self { tokens: Vec::new() }
    }
}

impl Default for SemanticTokenExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor for SemanticTokenExtractor {
    fn visit(&mut self, node: &Node, _ctx: &WalkContext<'_>) {
        let start = node.range.start;
        if let Some(keyword) = keyword_for(&node.kind) {
            self.tokens.push(RawToken {
                line: start.line.saturating_sub(1),
                character: start.column.saturating_sub(1),
                length: keyword.len() as u32,
                token_type: TYPE_KEYWORD,
            });
        }

        match &node.kind {
            NodeKind::Proc { name, .. } if !name.is_empty() => {
                self.tokens.push(RawToken {
                    line: start.line.saturating_sub(1),
                    character: start.column.saturating_sub(1) + "proc ".len() as u32,
                    length: name.len() as u32,
                    token_type: TYPE_FUNCTION,
                });
            }
            NodeKind::Set { var_name, .. } if !var_name.is_empty() => {
                self.tokens.push(RawToken {
                    line: start.line.saturating_sub(1),
                    character: start.column.saturating_sub(1) + "set ".len() as u32,
                    length: var_name.len() as u32,
                    token_type: TYPE_VARIABLE,
                });
            }
            _ => {}
        }
    }
}

/// Sorts tokens by `(line, character)` and delta-encodes them into the
/// flat `[Δline, Δchar, length, type, modifiers]*` sequence LSP expects.
#[must_use]
fn encode(mut tokens: Vec<RawToken>) -> Vec<u32> {
    tokens.sort_by_key(|t| (t.line, t.character));
    let mut out = Vec::with_capacity(tokens.len() * 5);
    let (mut prev_line, mut prev_char) = (0u32, 0u32);
    for t in tokens {
        let delta_line = t.line - prev_line;
        let delta_char = if delta_line == 0 {
            t.character - prev_char
        } else {
            t.character
        };
        out.extend([delta_line, delta_char, t.length, t.token_type, 0]);
        prev_line = t.line;
        prev_char = t.character;
    }
    out
}

/// Runs the semantic-token extractor over an AST, returning the encoded
/// token stream for the whole file.
#[must_use]
pub fn extract_semantic_tokens(root: &Node, file: &Path) -> Vec<u32> {
    let mut extractor = SemanticTokenExtractor::new();
    walk(root, &WalkContext::root(file), &mut extractor);
    encode(extractor.tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::node_from_value;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn proc_emits_keyword_and_function_tokens() {
        let ast = json!({
            "type": "proc",
            "range": {"start": {"line":1,"column":1}, "end": {"line":1,"column":20}},
            "depth": 0,
            "name": "add",
            "params": [],
            "body": {"children": []}
        });
        let node = node_from_value(&ast);
        let encoded = extract_semantic_tokens(&node, &PathBuf::from("a.tcl"));
        // [keyword "proc" at 0,0 len4 type0] [function "add" at 0,5 len3 type1]
        assert_eq!(encoded, vec![0, 0, 4, 0, 0, 0, 5, 3, 1, 0]);
    }

    #[test]
    fn set_emits_variable_token() {
        let ast = json!({
            "type": "set",
            "range": {"start": {"line":3,"column":1}, "end": {"line":3,"column":10}},
            "depth": 0,
            "var_name": "x",
            "value": "1"
        });
        let node = node_from_value(&ast);
        let encoded = extract_semantic_tokens(&node, &PathBuf::from("a.tcl"));
        assert_eq!(encoded, vec![2, 0, 3, 0, 0, 0, 4, 1, 2, 0]);
    }
}
