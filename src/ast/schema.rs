//! Typed AST node shapes.
//!
//! Node kinds are a tagged-variant sum type rather than dynamic
//! dispatch: a `NodeKind` match arm per kind, plus an `Unknown` variant
//! that keeps the raw fields around so
//! the walkers can still traverse into `children`/`body` on a kind they
//! don't recognise ("unknown kinds are traversed but invoke no
//! handler").

use crate::types::{Param, Range};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One parse error reported by the external parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseError {
    pub message: String,
    pub range: Option<Range>,
}

/// A node in the Tcl AST. Every node carries `range` and `depth`
/// regardless of kind; kind-specific data lives in [`NodeKind`].
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub range: Range,
    pub depth: u32,
    pub kind: NodeKind,
}

/// A `{children: [Node]}` block, used by `proc`, `namespace_eval`,
/// loop bodies and `if` branches.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Body {
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElseIf {
    pub condition: String,
    pub body: Body,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub pattern: String,
    pub body: Body,
}

/// `command_substitution`'s `command` field: either a bare string or a
/// `[name, args...]` array.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandRef {
    Name(String),
    Parts(Vec<String>),
}

impl CommandRef {
    #[must_use]
    pub fn head(&self) -> Option<&str> {
        match self {
            Self::Name(s) => s.split_whitespace().next(),
            Self::Parts(parts) => parts.first().map(String::as_str),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Root {
        children: Vec<Node>,
        had_error: bool,
        errors: Vec<ParseError>,
    },
    Proc {
        name: String,
        params: Vec<Param>,
        body: Body,
    },
    Set {
        var_name: String,
        value: Value,
        /// Embedded substitution nodes inside `value` (e.g. `[foo]` in
        /// `set x [foo]`), when the parser attaches them. The reference
        /// extractor re-enters the walk on these explicitly.
        children: Vec<Node>,
    },
    Variable {
        name: String,
    },
    Global {
        vars: Vec<String>,
    },
    Upvar {
        level: String,
        other_var: String,
        local_var: Option<String>,
    },
    Array {
        name: String,
    },
    If {
        condition: String,
        then_body: Body,
        else_body: Option<Body>,
        elseif_branches: Vec<ElseIf>,
    },
    While {
        condition: String,
        body: Body,
    },
    For {
        init: String,
        condition: String,
        next: String,
        body: Body,
    },
    Foreach {
        var_name: String,
        list_expr: String,
        body: Body,
    },
    Switch {
        expression: String,
        cases: Vec<SwitchCase>,
    },
    NamespaceEval {
        name: String,
        body: Body,
    },
    NamespaceImport {
        imports: Vec<String>,
    },
    NamespaceExport {
        exports: Vec<String>,
    },
    PackageRequire {
        package_name: String,
        version: Option<String>,
    },
    PackageProvide {
        package_name: String,
        version: Option<String>,
    },
    Source {
        path: String,
    },
    Expr {
        value: String,
    },
    List {
        children: Vec<Node>,
    },
    Lappend {
        var_name: String,
        values: Vec<Node>,
    },
    Puts {
        args: Vec<Node>,
    },
    Error {
        message: String,
    },
    Command {
        name: Option<String>,
        args: Vec<Node>,
    },
    CommandSubstitution {
        command: CommandRef,
    },
    InterpAlias {
        alias: String,
        target: String,
    },
    /// A kind not in the fixed list above. Lenient validation and all
    /// walkers tolerate these; `fields` keeps the raw JSON so a
    /// `children`/`body` sub-tree can still be located generically.
    Unknown {
        type_name: String,
        fields: Map<String, Value>,
    },
}

impl NodeKind {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Root { .. } => "root",
            Self::Proc { .. } => "proc",
            Self::Set { .. } => "set",
            Self::Variable { .. } => "variable",
            Self::Global { .. } => "global",
            Self::Upvar { .. } => "upvar",
            Self::Array { .. } => "array",
            Self::If { .. } => "if",
            Self::While { .. } => "while",
            Self::For { .. } => "for",
            Self::Foreach { .. } => "foreach",
            Self::Switch { .. } => "switch",
            Self::NamespaceEval { .. } => "namespace_eval",
            Self::NamespaceImport { .. } => "namespace_import",
            Self::NamespaceExport { .. } => "namespace_export",
            Self::PackageRequire { .. } => "package_require",
            Self::PackageProvide { .. } => "package_provide",
            Self::Source { .. } => "source",
            Self::Expr { .. } => "expr",
            Self::List { .. } => "list",
            Self::Lappend { .. } => "lappend",
            Self::Puts { .. } => "puts",
            Self::Error { .. } => "error",
            Self::Command { .. } => "command",
            Self::CommandSubstitution { .. } => "command_substitution",
            Self::InterpAlias { .. } => "interp_alias",
            Self::Unknown { type_name, .. } => type_name,
        }
    }
}

/// The fixed set of node kind names the schema knows about.
pub const KNOWN_KINDS: &[&str] = &[
    "root",
    "proc",
    "set",
    "variable",
    "global",
    "upvar",
    "array",
    "if",
    "while",
    "for",
    "foreach",
    "switch",
    "namespace_eval",
    "namespace_import",
    "namespace_export",
    "package_require",
    "package_provide",
    "source",
    "expr",
    "list",
    "lappend",
    "puts",
    "error",
    "command",
    "command_substitution",
    "interp_alias",
];
