//! Builds a typed [`Node`] tree from raw parser JSON, best-effort.
//!
//! Validation (see [`super::validate`]) is advisory by default: a file
//! with schema violations is still indexed from whatever can be
//! recovered here. Missing required fields fall back to empty/default
//! values rather than failing the whole file.

use super::schema::{Body, CommandRef, ElseIf, Node, NodeKind, ParseError, SwitchCase};
use crate::types::{Param, Position, Range};
use serde_json::Value;

/// Builds a `Node` from a raw JSON value. Never fails: nodes with
/// missing or malformed fields degrade to sensible defaults so a
/// partially-broken document still yields a partially-usable tree.
#[must_use]
pub fn node_from_value(value: &Value) -> Node {
    let range = parse_range(value.get("range"));
    let depth = value
        .get("depth")
        .and_then(Value::as_u64)
        .unwrap_or(0)
        .min(u32::MAX as u64) as u32;
    let kind_name = value.get("type").and_then(Value::as_str).unwrap_or("");
    let kind = build_kind(kind_name, value);
    Node { range, depth, kind }
}

fn build_kind(kind: &str, v: &Value) -> NodeKind {
    match kind {
        "root" => NodeKind::Root {
            children: array_of_nodes(v.get("children")),
            had_error: tcl_bool(v.get("had_error")),
            errors: parse_errors(v.get("errors")),
        },
        "proc" => NodeKind::Proc {
            name: string_field(v, "name"),
            params: parse_params(v.get("params")),
            body: parse_body(v.get("body")),
        },
        "set" => NodeKind::Set {
            var_name: string_field(v, "var_name"),
            value: v.get("value").cloned().unwrap_or(Value::Null),
            children: array_of_nodes(v.get("children")),
        },
        "variable" => NodeKind::Variable {
            name: string_field(v, "name"),
        },
        "global" => NodeKind::Global {
            vars: tcl_array(v.get("vars")),
        },
        "upvar" => NodeKind::Upvar {
            level: string_field(v, "level"),
            other_var: string_field(v, "other_var"),
            local_var: v
                .get("local_var")
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        "array" => NodeKind::Array {
            name: string_field(v, "name"),
        },
        "if" => NodeKind::If {
            condition: string_field(v, "condition"),
            then_body: parse_body(v.get("then_body")),
            else_body: v.get("else_body").map(parse_body),
            elseif_branches: parse_elseif_branches(v.get("elseif_branches")),
        },
        "while" => NodeKind::While {
            condition: string_field(v, "condition"),
            body: parse_body(v.get("body")),
        },
        "for" => NodeKind::For {
            init: string_field(v, "init"),
            condition: string_field(v, "condition"),
            next: string_field(v, "next"),
            body: parse_body(v.get("body")),
        },
        "foreach" => NodeKind::Foreach {
            var_name: string_field(v, "var_name"),
            list_expr: string_field(v, "list_expr"),
            body: parse_body(v.get("body")),
        },
        "switch" => NodeKind::Switch {
            expression: string_field(v, "expression"),
            cases: parse_cases(v.get("cases")),
        },
        "namespace_eval" => NodeKind::NamespaceEval {
            name: string_field(v, "name"),
            body: parse_body(v.get("body")),
        },
        "namespace_import" => NodeKind::NamespaceImport {
            imports: tcl_array(v.get("imports")),
        },
        "namespace_export" => NodeKind::NamespaceExport {
            exports: tcl_array(v.get("exports")),
        },
        "package_require" => NodeKind::PackageRequire {
            package_name: string_field(v, "package_name"),
            version: v
                .get("version")
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        "package_provide" => NodeKind::PackageProvide {
            package_name: string_field(v, "package_name"),
            version: v
                .get("version")
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        "source" => NodeKind::Source {
            path: string_field(v, "path"),
        },
        "expr" => NodeKind::Expr {
            value: v
                .get("value")
                .map(value_to_text)
                .unwrap_or_default(),
        },
        "list" => NodeKind::List {
            children: array_of_nodes(v.get("children")),
        },
        "lappend" => NodeKind::Lappend {
            var_name: string_field(v, "var_name"),
            values: array_of_nodes(v.get("values")),
        },
        "puts" => NodeKind::Puts {
            args: array_of_nodes(v.get("args")),
        },
        "error" => NodeKind::Error {
            message: string_field(v, "message"),
        },
        "command" => NodeKind::Command {
            name: v.get("name").and_then(Value::as_str).map(str::to_string),
            args: array_of_nodes(v.get("args")),
        },
        "command_substitution" => NodeKind::CommandSubstitution {
            command: parse_command_ref(v.get("command")),
        },
        "interp_alias" => NodeKind::InterpAlias {
            alias: string_field(v, "alias"),
            target: string_field(v, "target"),
        },
        other => NodeKind::Unknown {
            type_name: other.to_string(),
            fields: v.as_object().cloned().unwrap_or_default(),
        },
    }
}

fn string_field(v: &Value, field: &str) -> String {
    v.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Numeric literals are kept as their original source text ("some
/// parser nodes carry numeric values as strings ... semantics must
/// match — comparisons are string comparisons").
fn value_to_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn tcl_bool(v: Option<&Value>) -> bool {
    match v {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "1",
        Some(Value::Number(n)) => n.as_u64() == Some(1),
        _ => false,
    }
}

/// Accepts a JSON array or the empty string as an empty array, per the
/// `tcl_array` field type.
fn tcl_array(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|i| i.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_params(v: Option<&Value>) -> Vec<Param> {
    let Some(Value::Array(items)) = v else {
        return Vec::new();
    };
    items
        .iter()
        .map(|p| Param {
            name: p
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            default: p
                .get("default")
                .and_then(Value::as_str)
                .map(str::to_string),
            is_varargs: p
                .get("is_varargs")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
        .collect()
}

fn parse_body(v: Option<&Value>) -> Body {
    let Some(v) = v else {
        return Body::default();
    };
    Body {
        children: array_of_nodes(v.get("children")),
    }
}

fn array_of_nodes(v: Option<&Value>) -> Vec<Node> {
    match v {
        Some(Value::Array(items)) => items.iter().map(node_from_value).collect(),
        _ => Vec::new(),
    }
}

fn parse_errors(v: Option<&Value>) -> Vec<ParseError> {
    let Some(Value::Array(items)) = v else {
        return Vec::new();
    };
    items
        .iter()
        .map(|e| ParseError {
            message: e
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            range: e.get("range").map(|r| parse_range(Some(r))),
        })
        .collect()
}

fn parse_elseif_branches(v: Option<&Value>) -> Vec<ElseIf> {
    let Some(Value::Array(items)) = v else {
        return Vec::new();
    };
    items
        .iter()
        .map(|b| ElseIf {
            condition: string_field(b, "condition"),
            body: parse_body(b.get("body")),
        })
        .collect()
}

fn parse_cases(v: Option<&Value>) -> Vec<SwitchCase> {
    let Some(Value::Array(items)) = v else {
        return Vec::new();
    };
    items
        .iter()
        .map(|c| SwitchCase {
            pattern: string_field(c, "pattern"),
            body: parse_body(c.get("body")),
        })
        .collect()
}

fn parse_command_ref(v: Option<&Value>) -> CommandRef {
    match v {
        Some(Value::String(s)) => CommandRef::Name(s.clone()),
        Some(Value::Array(items)) => {
            CommandRef::Parts(items.iter().filter_map(|i| i.as_str()).map(str::to_string).collect())
        }
        _ => CommandRef::Name(String::new()),
    }
}

fn parse_position(v: Option<&Value>) -> Position {
    let Some(v) = v else {
        return Position::new(1, 1);
    };
    Position::new(
        v.get("line").and_then(Value::as_u64).unwrap_or(1) as u32,
        v.get("column").and_then(Value::as_u64).unwrap_or(1) as u32,
    )
}

fn parse_range(v: Option<&Value>) -> Range {
    let Some(v) = v else {
        return Range::new(Position::new(1, 1), Position::new(1, 1));
    };
    Range::new(
        parse_position(v.get("start")),
        parse_position(v.get("end")),
    )
}

/// Remaps every position under `node` from coordinates relative to an
/// extracted source block to coordinates in the file the block came
/// from: `line_offset` is added to every line, and `col_offset` is added
/// to any position still on the block's own first line (whose column is
/// relative to the block's start column, not the file's). Both are zero
/// for a plain `.tcl` file, making this a no-op.
pub fn shift_positions(node: &mut Node, line_offset: u32, col_offset: u32) {
    shift_range(&mut node.range, line_offset, col_offset);
    shift_kind(&mut node.kind, line_offset, col_offset);
}

fn shift_position(pos: &mut Position, line_offset: u32, col_offset: u32) {
    if pos.line == 1 {
        pos.column += col_offset;
    }
    pos.line += line_offset;
}

fn shift_range(range: &mut Range, line_offset: u32, col_offset: u32) {
    shift_position(&mut range.start, line_offset, col_offset);
    shift_position(&mut range.end, line_offset, col_offset);
}

fn shift_body(body: &mut Body, line_offset: u32, col_offset: u32) {
    for child in &mut body.children {
        shift_positions(child, line_offset, col_offset);
    }
}

fn shift_kind(kind: &mut NodeKind, line_offset: u32, col_offset: u32) {
    match kind {
        NodeKind::Root { children, errors, .. } => {
            for child in children {
                shift_positions(child, line_offset, col_offset);
            }
            for error in errors {
                if let Some(range) = &mut error.range {
                    shift_range(range, line_offset, col_offset);
                }
            }
        }
        NodeKind::Proc { body, .. }
        | NodeKind::NamespaceEval { body, .. }
        | NodeKind::While { body, .. }
        | NodeKind::For { body, .. }
        | NodeKind::Foreach { body, .. } => {
            shift_body(body, line_offset, col_offset);
        }
        NodeKind::Set { children, .. } | NodeKind::List { children } => {
            for child in children {
                shift_positions(child, line_offset, col_offset);
            }
        }
        NodeKind::If {
            then_body,
            else_body,
            elseif_branches,
            ..
        } => {
            shift_body(then_body, line_offset, col_offset);
            if let Some(else_body) = else_body {
                shift_body(else_body, line_offset, col_offset);
            }
            for branch in elseif_branches {
                shift_body(&mut branch.body, line_offset, col_offset);
            }
        }
        NodeKind::Switch { cases, .. } => {
            for case in cases {
                shift_body(&mut case.body, line_offset, col_offset);
            }
        }
        NodeKind::Lappend { values, .. } => {
            for value in values {
                shift_positions(value, line_offset, col_offset);
            }
        }
        NodeKind::Puts { args } | NodeKind::Command { args, .. } => {
            for arg in args {
                shift_positions(arg, line_offset, col_offset);
            }
        }
        _ => {}
    }
}
