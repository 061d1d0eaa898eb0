//! The fixed Tcl built-in command set.
//!
//! Built-ins are excluded from the reference set so they don't pollute
//! find-references/go-to-definition with noise from every `set` or `if`
//! in the workspace.

use std::collections::HashSet;
use std::sync::LazyLock;

pub const BUILTIN_NAMES: &[&str] = &[
    "set", "puts", "expr", "if", "else", "for", "foreach", "while", "switch", "proc", "return",
    "break", "continue", "catch", "try", "throw", "error", "list", "lindex", "llength", "lappend",
    "lsort", "lsearch", "lrange", "lreplace", "string", "regexp", "regsub", "split", "join",
    "array", "dict", "incr", "append", "open", "close", "read", "gets", "eof", "file", "glob",
    "cd", "pwd", "package", "namespace", "variable", "global", "upvar", "info", "rename", "interp",
    "source", "after", "update", "vwait",
];

static BUILTIN_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| BUILTIN_NAMES.iter().copied().collect());

#[must_use]
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_SET.contains(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_builtins() {
        assert!(is_builtin("set"));
        assert!(is_builtin("namespace"));
        assert!(!is_builtin("my_custom_proc"));
    }
}
