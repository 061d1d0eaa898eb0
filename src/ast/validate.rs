//! Validates raw parser JSON against the node schema.
//!
//! Validation runs on the untyped `serde_json::Value` the parser
//! produces, *before* [`super::build::node_from_value`] turns it into a
//! typed [`super::schema::Node`] tree — that way a validation failure can
//! be reported with a JSON-pointer-style path even when the document is
//! too malformed to build a `Node` from at all.

use super::schema::KNOWN_KINDS;
use super::MAX_DEPTH;
use crate::types::{Position, Range};
use serde_json::Value;

/// A field's declared type in the schema. The two `tcl_*` variants
/// accommodate the parser's quirks: `tcl_boolean` accepts `0`/`1` in
/// addition to `true`/`false`; `tcl_array` accepts `""` as an empty
/// array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    Any,
    TclBoolean,
    TclArray,
}

impl FieldType {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Any => true,
            Self::TclBoolean => {
                value.is_boolean()
                    || matches!(value.as_str(), Some("0" | "1"))
                    || matches!(value.as_u64(), Some(0 | 1))
            }
            Self::TclArray => value.is_array() || matches!(value.as_str(), Some("")),
        }
    }
}

struct FieldSpec {
    name: &'static str,
    ty: FieldType,
    required: bool,
}

const fn req(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        ty,
        required: true,
    }
}

const fn opt(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        ty,
        required: false,
    }
}

fn fields_for(kind: &str) -> Option<&'static [FieldSpec]> {
    // Field lists beyond the universal `type`, `range`, `depth` triple,
    // per the parser's documented type table.
    static ROOT: &[FieldSpec] = &[
        req("children", FieldType::Array),
        opt("had_error", FieldType::TclBoolean),
        opt("errors", FieldType::Array),
    ];
    static PROC: &[FieldSpec] = &[
        req("name", FieldType::String),
        req("params", FieldType::Array),
        req("body", FieldType::Object),
    ];
    static SET: &[FieldSpec] = &[
        req("var_name", FieldType::String),
        req("value", FieldType::Any),
    ];
    static VARIABLE: &[FieldSpec] = &[req("name", FieldType::String)];
    static GLOBAL: &[FieldSpec] = &[req("vars", FieldType::TclArray)];
    static UPVAR: &[FieldSpec] = &[
        req("level", FieldType::String),
        req("other_var", FieldType::String),
        opt("local_var", FieldType::String),
    ];
    static ARRAY: &[FieldSpec] = &[req("name", FieldType::String)];
    static IF: &[FieldSpec] = &[
        req("condition", FieldType::String),
        req("then_body", FieldType::Object),
        opt("else_body", FieldType::Object),
        opt("elseif_branches", FieldType::Array),
    ];
    static WHILE: &[FieldSpec] = &[
        req("condition", FieldType::String),
        req("body", FieldType::Object),
    ];
    static FOR: &[FieldSpec] = &[
        req("init", FieldType::String),
        req("condition", FieldType::String),
        req("next", FieldType::String),
        req("body", FieldType::Object),
    ];
    static FOREACH: &[FieldSpec] = &[
        req("var_name", FieldType::String),
        req("list_expr", FieldType::String),
        req("body", FieldType::Object),
    ];
    static SWITCH: &[FieldSpec] = &[
        req("expression", FieldType::String),
        req("cases", FieldType::Array),
    ];
    static NAMESPACE_EVAL: &[FieldSpec] = &[
        req("name", FieldType::String),
        req("body", FieldType::Any),
    ];
    static NAMESPACE_IMPORT: &[FieldSpec] = &[req("imports", FieldType::TclArray)];
    static NAMESPACE_EXPORT: &[FieldSpec] = &[req("exports", FieldType::TclArray)];
    static PACKAGE_REQUIRE: &[FieldSpec] = &[
        req("package_name", FieldType::String),
        opt("version", FieldType::String),
    ];
    static PACKAGE_PROVIDE: &[FieldSpec] = &[
        req("package_name", FieldType::String),
        opt("version", FieldType::String),
    ];
    static SOURCE: &[FieldSpec] = &[req("path", FieldType::String)];
    static EXPR: &[FieldSpec] = &[req("value", FieldType::Any)];
    static LIST: &[FieldSpec] = &[req("children", FieldType::Array)];
    static LAPPEND: &[FieldSpec] = &[
        req("var_name", FieldType::String),
        opt("values", FieldType::Array),
    ];
    static PUTS: &[FieldSpec] = &[opt("args", FieldType::Array)];
    static ERROR: &[FieldSpec] = &[req("message", FieldType::String)];
    static COMMAND: &[FieldSpec] = &[
        req("name", FieldType::String),
        opt("args", FieldType::Array),
    ];
    static COMMAND_SUBSTITUTION: &[FieldSpec] = &[req("command", FieldType::Any)];
    static INTERP_ALIAS: &[FieldSpec] = &[
        req("alias", FieldType::String),
        req("target", FieldType::String),
    ];

    Some(match kind {
        "root" => ROOT,
        "proc" => PROC,
        "set" => SET,
        "variable" => VARIABLE,
        "global" => GLOBAL,
        "upvar" => UPVAR,
        "array" => ARRAY,
        "if" => IF,
        "while" => WHILE,
        "for" => FOR,
        "foreach" => FOREACH,
        "switch" => SWITCH,
        "namespace_eval" => NAMESPACE_EVAL,
        "namespace_import" => NAMESPACE_IMPORT,
        "namespace_export" => NAMESPACE_EXPORT,
        "package_require" => PACKAGE_REQUIRE,
        "package_provide" => PACKAGE_PROVIDE,
        "source" => SOURCE,
        "expr" => EXPR,
        "list" => LIST,
        "lappend" => LAPPEND,
        "puts" => PUTS,
        "error" => ERROR,
        "command" => COMMAND,
        "command_substitution" => COMMAND_SUBSTITUTION,
        "interp_alias" => INTERP_ALIAS,
        _ => return None,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Validates a raw AST document.
///
/// In `strict` mode, unknown fields on a known kind and unknown node
/// kinds are errors. In lenient mode (the default), only missing
/// required fields and wrong-typed present fields fail; unknown
/// fields/kinds pass.
#[must_use]
pub fn validate(value: &Value, strict: bool) -> ValidationOutcome {
    let mut errors = Vec::new();
    walk(value, "$", strict, 0, None, &mut errors);
    ValidationOutcome {
        valid: errors.is_empty(),
        errors,
    }
}

/// Parses a `{start: {line, column}, end: {line, column}}` value into a
/// [`Range`], or `None` if any part is missing or the wrong type.
fn parse_range_value(v: Option<&Value>) -> Option<Range> {
    let v = v?;
    let start = v.get("start")?;
    let end = v.get("end")?;
    Some(Range::new(
        Position::new(
            u32::try_from(start.get("line")?.as_u64()?).ok()?,
            u32::try_from(start.get("column")?.as_u64()?).ok()?,
        ),
        Position::new(
            u32::try_from(end.get("line")?.as_u64()?).ok()?,
            u32::try_from(end.get("column")?.as_u64()?).ok()?,
        ),
    ))
}

fn walk(
    value: &Value,
    path: &str,
    strict: bool,
    depth: u32,
    parent_range: Option<Range>,
    errors: &mut Vec<ValidationError>,
) {
    if depth > MAX_DEPTH {
        errors.push(ValidationError {
            path: path.to_string(),
            message: format!("node depth exceeds MAX_DEPTH ({MAX_DEPTH})"),
        });
        return;
    }

    let Some(obj) = value.as_object() else {
        errors.push(ValidationError {
            path: path.to_string(),
            message: "expected a JSON object".to_string(),
        });
        return;
    };

    let Some(kind) = obj.get("type").and_then(Value::as_str) else {
        errors.push(ValidationError {
            path: path.to_string(),
            message: "missing required field `type`".to_string(),
        });
        return;
    };

    let own_range = parse_range_value(obj.get("range"));
    if obj.get("range").is_none() {
        errors.push(ValidationError {
            path: path.to_string(),
            message: "missing required field `range`".to_string(),
        });
    } else if let Some(range) = own_range {
        if let Some(parent) = parent_range {
            if !range.contained_in(&parent) {
                errors.push(ValidationError {
                    path: path.to_string(),
                    message: "range is not contained in parent range".to_string(),
                });
            }
        }
    }
    if obj.get("depth").is_none() {
        errors.push(ValidationError {
            path: path.to_string(),
            message: "missing required field `depth`".to_string(),
        });
    }

    match fields_for(kind) {
        None => {
            if strict {
                errors.push(ValidationError {
                    path: path.to_string(),
                    message: format!("unknown node kind `{kind}`"),
                });
            }
        }
        Some(specs) => {
            for spec in specs {
                match obj.get(spec.name) {
                    Some(v) => {
                        if !spec.ty.matches(v) {
                            errors.push(ValidationError {
                                path: format!("{path}.{}", spec.name),
                                message: format!(
                                    "field `{}` has wrong type for kind `{kind}`",
                                    spec.name
                                ),
                            });
                        }
                    }
                    None if spec.required => {
                        errors.push(ValidationError {
                            path: path.to_string(),
                            message: format!(
                                "missing required field `{}` for kind `{kind}`",
                                spec.name
                            ),
                        });
                    }
                    None => {}
                }
            }

            if strict {
                let known: std::collections::HashSet<&str> =
                    specs.iter().map(|s| s.name).collect();
                let universal = ["type", "range", "depth"];
                for key in obj.keys() {
                    if !known.contains(key.as_str()) && !universal.contains(&key.as_str()) {
                        errors.push(ValidationError {
                            path: format!("{path}.{key}"),
                            message: format!("unknown field `{key}` on kind `{kind}`"),
                        });
                    }
                }
            }
        }
    }

    for (key, child) in children_of(kind, obj) {
        walk(
            child,
            &format!("{path}.{key}"),
            strict,
            depth + 1,
            own_range,
            errors,
        );
    }
}

/// Finds the node-shaped children of an object so validation can recurse:
/// `children` arrays, and any `*body*` object carrying its own `children`.
fn children_of<'a>(
    _kind: &str,
    obj: &'a serde_json::Map<String, Value>,
) -> Vec<(String, &'a Value)> {
    let mut out = Vec::new();
    if let Some(Value::Array(items)) = obj.get("children") {
        for (i, item) in items.iter().enumerate() {
            out.push((format!("children[{i}]"), item));
        }
    }
    for key in ["body", "then_body", "else_body"] {
        if let Some(body) = obj.get(key) {
            if let Some(Value::Array(items)) = body.get("children") {
                for (i, item) in items.iter().enumerate() {
                    out.push((format!("{key}.children[{i}]"), item));
                }
            }
        }
    }
    if let Some(Value::Array(branches)) = obj.get("elseif_branches") {
        for (i, branch) in branches.iter().enumerate() {
            if let Some(Value::Array(items)) = branch.get("body").and_then(|b| b.get("children"))
            {
                for (j, item) in items.iter().enumerate() {
                    out.push((format!("elseif_branches[{i}].body.children[{j}]"), item));
                }
            }
        }
    }
    if let Some(Value::Array(cases)) = obj.get("cases") {
        for (i, case) in cases.iter().enumerate() {
            if let Some(Value::Array(items)) = case.get("body").and_then(|b| b.get("children")) {
                for (j, item) in items.iter().enumerate() {
                    out.push((format!("cases[{i}].body.children[{j}]"), item));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_minimal_root() {
        let ast = json!({"type": "root", "range": {"start": {"line":1,"column":1}, "end": {"line":1,"column":1}}, "depth": 0, "children": []});
        let outcome = validate(&ast, false);
        assert!(outcome.valid, "{:?}", outcome.errors);
    }

    #[test]
    fn lenient_mode_accepts_unknown_kind() {
        let ast = json!({"type": "frobnicate", "range": {"start": {"line":1,"column":1}, "end": {"line":1,"column":1}}, "depth": 0});
        let outcome = validate(&ast, false);
        assert!(outcome.valid);
    }

    #[test]
    fn strict_mode_rejects_unknown_kind() {
        let ast = json!({"type": "frobnicate", "range": {"start": {"line":1,"column":1}, "end": {"line":1,"column":1}}, "depth": 0});
        let outcome = validate(&ast, true);
        assert!(!outcome.valid);
    }

    #[test]
    fn rejects_missing_required_field() {
        let ast = json!({"type": "proc", "range": {"start": {"line":1,"column":1}, "end": {"line":1,"column":1}}, "depth": 0, "name": "foo"});
        let outcome = validate(&ast, false);
        assert!(!outcome.valid);
        assert!(outcome.errors.iter().any(|e| e.message.contains("params")));
    }

    #[test]
    fn tcl_boolean_accepts_numeric_string() {
        let ast = json!({"type": "root", "range": {"start": {"line":1,"column":1}, "end": {"line":1,"column":1}}, "depth": 0, "children": [], "had_error": "1"});
        let outcome = validate(&ast, false);
        assert!(outcome.valid, "{:?}", outcome.errors);
    }

    #[test]
    fn tcl_array_accepts_empty_string() {
        let ast = json!({"type": "global", "range": {"start": {"line":1,"column":1}, "end": {"line":1,"column":1}}, "depth": 0, "vars": ""});
        let outcome = validate(&ast, false);
        assert!(outcome.valid, "{:?}", outcome.errors);
    }

    #[test]
    fn rejects_child_range_outside_parent() {
        let ast = json!({
            "type": "root",
            "range": {"start": {"line":1,"column":1}, "end": {"line":2,"column":1}},
            "depth": 0,
            "children": [
                {"type": "command", "range": {"start": {"line":5,"column":1}, "end": {"line":5,"column":5}}, "depth": 1, "name": "foo", "args": []}
            ]
        });
        let outcome = validate(&ast, false);
        assert!(!outcome.valid);
        assert!(outcome.errors.iter().any(|e| e.message.contains("not contained")));
    }

    #[test]
    fn rejects_depth_past_max() {
        let mut node = json!({"type": "command", "range": {"start": {"line":1,"column":1}, "end": {"line":1,"column":1}}, "depth": 0, "name": "foo", "args": []});
        for _ in 0..(MAX_DEPTH + 2) {
            node = json!({
                "type": "root",
                "range": {"start": {"line":1,"column":1}, "end": {"line":1,"column":1}},
                "depth": 0,
                "children": [node]
            });
        }
        let outcome = validate(&node, false);
        assert!(!outcome.valid);
        assert!(outcome.errors.iter().any(|e| e.message.contains("MAX_DEPTH")));
    }
}
