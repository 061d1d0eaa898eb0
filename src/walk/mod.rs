//! The shared namespace-aware AST visitor and its four extractors.
//!
//! All four walkers — symbol extractor, reference extractor, folding
//! extractor, semantic-token extractor — drive the same [`walk`]
//! function with their own [`Visitor`] implementation, rather than each
//! re-implementing tree descent, namespace tracking and the depth guard.

pub mod folding;
pub mod references;
pub mod semantic_tokens;
pub mod symbols;

use crate::ast::schema::{Body, ElseIf, Node, NodeKind, SwitchCase};
use crate::ast::MAX_DEPTH;
use crate::types::QName;
use std::path::Path;

/// Per-node context threaded through the walk.
pub struct WalkContext<'a> {
    pub filepath: &'a Path,
    pub namespace: QName,
    pub depth: u32,
    /// `true` once the walk has descended into a `proc` body. A `set`
    /// or `variable` seen with this set is a local, not a global.
    pub in_proc: bool,
}

impl<'a> WalkContext<'a> {
    #[must_use]
    pub fn root(filepath: &'a Path) -> Self {
        Self {
            filepath,
            namespace: QName::root(),
            depth: 0,
            in_proc: false,
        }
    }

    fn child(&self, namespace: QName, in_proc: bool) -> Self {
        Self {
            filepath: self.filepath,
            namespace,
            depth: self.depth + 1,
            in_proc,
        }
    }
}

/// Implemented by each of the four extractors. `visit` is called once
/// per node, in pre-order, with the context computed for that node
/// (namespace already updated if the node is a `namespace_eval`). A
/// handler that needs to look inside data the default traversal doesn't
/// descend into (e.g. a `set` value's embedded `command_substitution`)
/// can call [`walk`] again directly on that sub-node — this is the
/// explicit re-entry the design calls `ctx.visit`.
pub trait Visitor {
    fn visit(&mut self, node: &Node, ctx: &WalkContext<'_>);
}

/// Walks `node` and its descendants, depth-bounded at [`MAX_DEPTH`].
/// Namespace propagation: on `namespace_eval`, the context handed to
/// descendants has `namespace = current + "::" + name` (normalised by
/// [`QName::join`] to exactly one `::` separator).
pub fn walk(node: &Node, ctx: &WalkContext<'_>, visitor: &mut dyn Visitor) {
    if ctx.depth > MAX_DEPTH {
        return;
    }
    visitor.visit(node, ctx);

    let child_ctx = match &node.kind {
        NodeKind::NamespaceEval { name, .. } => {
            ctx.child(QName::join(&ctx.namespace, name), ctx.in_proc)
        }
        NodeKind::Proc { .. } => ctx.child(ctx.namespace.clone(), true),
        _ => ctx.child(ctx.namespace.clone(), ctx.in_proc),
    };

    for child in children_of(node) {
        walk(child, &child_ctx, visitor);
    }
}

fn body_children(body: &Body) -> impl Iterator<Item = &Node> {
    body.children.iter()
}

/// Both `node.children` and `node.body.children` (and other body-shaped
/// fields) are traversed — a node may offer either or both.
pub(crate) fn children_of(node: &Node) -> Vec<&Node> {
    match &node.kind {
        NodeKind::Root { children, .. } | NodeKind::List { children } => children.iter().collect(),
        NodeKind::Proc { body, .. } | NodeKind::NamespaceEval { body, .. } | NodeKind::While { body, .. } | NodeKind::For { body, .. } | NodeKind::Foreach { body, .. } => {
            body_children(body).collect()
        }
        NodeKind::If {
            then_body,
            else_body,
            elseif_branches,
            ..
        } => {
            let mut out: Vec<&Node> = body_children(then_body).collect();
            for branch in elseif_branches.iter() as std::slice::Iter<'_, ElseIf> {
                out.extend(body_children(&branch.body));
            }
            if let Some(else_body) = else_body {
                out.extend(body_children(else_body));
            }
            out
        }
        NodeKind::Switch { cases, .. } => cases
            .iter()
            .flat_map(|c: &SwitchCase| body_children(&c.body))
            .collect(),
        NodeKind::Lappend { values, .. } | NodeKind::Puts { args: values } => values.iter().collect(),
        NodeKind::Command { args, .. } => args.iter().collect(),
        _ => Vec::new(),
    }
}
