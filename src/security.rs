//! Workspace containment: every path an LSP client hands us — via
//! `textDocument` URIs — gets checked against the workspace root before
//! it reaches the indexer or the document cache.
//!
//! Sensitive-file exclusion and regex ReDoS limits are out of scope
//! here: this server never serves file contents back to a client and
//! never compiles a client-supplied regex, so neither concern applies.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Security-related errors.
#[derive(Error, Debug, Clone)]
pub enum SecurityError {
    #[error("path traversal blocked: '{attempted}' escapes root '{}'", root.display())]
    PathTraversal { attempted: String, root: PathBuf },

    #[error("absolute path not allowed: '{path}'")]
    AbsolutePath { path: String },
}

impl SecurityError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::PathTraversal { .. } => "PATH_TRAVERSAL",
            Self::AbsolutePath { .. } => "ABSOLUTE_PATH",
        }
    }
}

/// Validates that `candidate`, an already-absolute path decoded from a
/// `file://` URI, resolves inside `root`. Takes an absolute path (LSP
/// URIs always decode to one) rather than a user-relative string, so
/// there's no join-then-normalize step — only containment.
pub fn validate_workspace_path(root: &Path, candidate: &Path) -> Result<PathBuf, SecurityError> {
    if !candidate.is_absolute() {
        return Err(SecurityError::AbsolutePath {
            path: candidate.display().to_string(),
        });
    }

    let normalized = normalize_path(candidate);
    let canonical_root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

    if !normalized.starts_with(&canonical_root) {
        return Err(SecurityError::PathTraversal {
            attempted: candidate.display().to_string(),
            root: root.to_path_buf(),
        });
    }

    Ok(normalized)
}

/// Normalizes a path by resolving `.` and `..` components without
/// filesystem access.
fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if components.last().is_some_and(|c| !matches!(c, Component::ParentDir)) {
                    components.pop();
                } else {
                    components.push(component);
                }
            }
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_inside_root_is_accepted() {
        let root = Path::new("/project");
        assert!(validate_workspace_path(root, Path::new("/project/src/main.tcl")).is_ok());
    }

    #[test]
    fn relative_path_rejected() {
        let root = Path::new("/project");
        assert!(matches!(
            validate_workspace_path(root, Path::new("src/main.tcl")),
            Err(SecurityError::AbsolutePath { .. })
        ));
    }

    #[test]
    fn path_escaping_root_rejected() {
        let root = Path::new("/project");
        assert!(matches!(
            validate_workspace_path(root, Path::new("/etc/passwd")),
            Err(SecurityError::PathTraversal { .. })
        ));
    }

    #[test]
    fn dot_dot_inside_root_still_resolves_inside() {
        let root = Path::new("/project");
        let result = validate_workspace_path(root, Path::new("/project/src/../lib.tcl"));
        assert_eq!(result.unwrap(), PathBuf::from("/project/lib.tcl"));
    }
}
