//! Core domain types for tcl-lsp-core.
//!
//! These newtypes provide compile-time safety and semantic clarity for
//! the data model: positions, qualified names, symbols and references.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 1-based source position. `column` counts UTF-8 code units.
/// Position `1:1` is the first character of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Converts to 0-based LSP coordinates. The only place this conversion
    /// should happen outside `lsp::convert`.
    #[must_use]
    pub fn to_lsp(self) -> lsp_types::Position {
        lsp_types::Position {
            line: self.line.saturating_sub(1),
            character: self.column.saturating_sub(1),
        }
    }

    #[must_use]
    pub fn from_lsp(pos: lsp_types::Position) -> Self {
        Self {
            line: pos.line + 1,
            column: pos.character + 1,
        }
    }
}

/// A 1-based, half-open range: `end` is exclusive at column granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Whether `pos` falls within `[start, end)`.
    #[must_use]
    pub fn contains(&self, pos: Position) -> bool {
        pos >= self.start && pos < self.end
    }

    /// Whether `self` is entirely within `other` — used to check the AST
    /// invariant that child ranges are contained in their parent's range.
    #[must_use]
    pub fn contained_in(&self, other: &Self) -> bool {
        self.start >= other.start && self.end <= other.end
    }

    #[must_use]
    pub fn to_lsp(self) -> lsp_types::Range {
        lsp_types::Range {
            start: self.start.to_lsp(),
            end: self.end.to_lsp(),
        }
    }
}

/// A Tcl fully-qualified name, always rooted at `::`.
///
/// Uniquely identifies a symbol across the workspace. The newtype keeps
/// qualification bugs (forgetting the leading `::`, double-joining
/// separators) from compiling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QName(String);

impl QName {
    /// Wraps an already-rooted name (`::foo::bar`). Roots it if it's bare.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.starts_with("::") {
            Self(s)
        } else {
            Self(format!("::{s}"))
        }
    }

    /// The global namespace, `::`.
    #[must_use]
    pub fn root() -> Self {
        Self("::".to_string())
    }

    /// Joins a namespace qname with a bare name, normalising so the result
    /// begins with exactly one `::` and has no doubled separators.
    #[must_use]
    pub fn join(namespace: &Self, name: &str) -> Self {
        let ns = namespace.0.trim_end_matches(':');
        let name = name.trim_start_matches(':');
        if ns.is_empty() {
            Self(format!("::{name}"))
        } else {
            Self(format!("{ns}::{name}"))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Default for QName {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for QName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for QName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// What kind of entity a `Symbol` identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Proc,
    Variable,
    Namespace,
}

/// A formal parameter of a `proc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub default: Option<String>,
    pub is_varargs: bool,
}

/// An entity the user can navigate to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub name: String,
    pub qualified_name: QName,
    pub file: std::path::PathBuf,
    pub range: Range,
    pub scope: QName,
    /// Only populated for `SymbolKind::Proc`.
    pub params: Vec<Param>,
}

/// What kind of use-site a `Reference` represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    Call,
    Export,
    Alias,
}

/// A site in source that uses a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub kind: ReferenceKind,
    pub name: String,
    pub namespace: QName,
    pub file: std::path::PathBuf,
    pub range: Range,
    pub text: String,
    pub target: Option<QName>,
}

/// Severity of a diagnostic, mirroring LSP's `DiagnosticSeverity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

impl From<Severity> for lsp_types::DiagnosticSeverity {
    fn from(value: Severity) -> Self {
        match value {
            Severity::Error => lsp_types::DiagnosticSeverity::ERROR,
            Severity::Warning => lsp_types::DiagnosticSeverity::WARNING,
            Severity::Information => lsp_types::DiagnosticSeverity::INFORMATION,
            Severity::Hint => lsp_types::DiagnosticSeverity::HINT,
        }
    }
}

/// A diagnostic produced by parsing or validating a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub range: Range,
    pub message: String,
    pub severity: Severity,
}

// Compile-time assertions for thread safety: the index and indexer share
// these types across worker tasks, so a regression here would otherwise
// surface as a hard-to-read Send/Sync error deep in tokio::spawn.
#[cfg(test)]
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}

    assert_send_sync::<QName>();
    assert_send_sync::<Symbol>();
    assert_send_sync::<Reference>();
    assert_send_sync::<Diagnostic>();
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qname_roots_bare_names() {
        assert_eq!(QName::new("foo").as_str(), "::foo");
        assert_eq!(QName::new("::foo").as_str(), "::foo");
    }

    #[test]
    fn qname_join_normalises_separators() {
        let ns = QName::new("::ns::sub");
        assert_eq!(QName::join(&ns, "foo").as_str(), "::ns::sub::foo");
        assert_eq!(QName::join(&QName::root(), "foo").as_str(), "::foo");
    }

    #[test]
    fn range_contains_is_half_open() {
        let r = Range::new(Position::new(1, 1), Position::new(1, 5));
        assert!(r.contains(Position::new(1, 1)));
        assert!(r.contains(Position::new(1, 4)));
        assert!(!r.contains(Position::new(1, 5)));
    }

    #[test]
    fn position_lsp_roundtrip_is_zero_based() {
        let p = Position::new(1, 1);
        let lsp = p.to_lsp();
        assert_eq!(lsp.line, 0);
        assert_eq!(lsp.character, 0);
        assert_eq!(Position::from_lsp(lsp), p);
    }
}
