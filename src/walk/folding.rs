//! Folding-range extractor: one range per `proc`,
//! `namespace_eval`, and any multi-line `if`/`while`/`for`/`foreach`/
//! `switch`.

use super::{walk, Visitor, WalkContext};
use crate::ast::schema::{Node, NodeKind};
use std::path::Path;

/// A foldable range, already in 0-based LSP line numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fold {
    pub start_line: u32,
    pub end_line: u32,
}

pub struct FoldingExtractor {
    pub folds: Vec<Fold>,
}

impl FoldingExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self { folds: Vec::new() }
    }

    fn push_if_multiline(&mut self, node: &Node) {
        let start = node.range.start.line;
        let end = node.range.end.line;
        if end > start {
            self.folds.push(Fold {
                start_line: start.saturating_sub(1),
                end_line: end.saturating_sub(1),
            });
        }
    }
}

impl Default for FoldingExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor for FoldingExtractor {
    fn visit(&mut self, node: &Node, _ctx: &WalkContext<'_>) {
        match &node.kind {
            NodeKind::Proc { .. }
            | NodeKind::NamespaceEval { .. }
            | NodeKind::If { .. }
            | NodeKind::While { .. }
            | NodeKind::For { .. }
            | NodeKind::Foreach { .. }
            | NodeKind::Switch { .. } => self.push_if_multiline(node),
            _ => {}
        }
    }
}

/// Runs the folding extractor over an AST rooted at `root`.
#[must_use]
pub fn extract_folds(root: &Node, file: &Path) -> Vec<Fold> {
    let mut extractor = FoldingExtractor::new();
    walk(root, &WalkContext::root(file), &mut extractor);
    extractor.folds
}
