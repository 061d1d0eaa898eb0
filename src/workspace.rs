//! Workspace root discovery and file enumeration.

use crate::error::WorkspaceError;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Markers checked, in order, when walking up from a file looking for
/// the workspace root.
const ROOT_MARKERS: &[&str] = &[".git", "project.tcl", ".tcl", "tclIndex", "pkgIndex.tcl", "Makefile"];

/// Finds the workspace root: the first ancestor of `start` containing
/// one of [`ROOT_MARKERS`], else `start`'s own directory.
#[must_use]
pub fn find_root(start: &Path) -> PathBuf {
    let start_dir = if start.is_dir() {
        start
    } else {
        start.parent().unwrap_or(start)
    };

    let mut dir = Some(start_dir);
    while let Some(d) = dir {
        if ROOT_MARKERS.iter().any(|marker| d.join(marker).exists()) {
            return d.to_path_buf();
        }
        dir = d.parent();
    }
    start_dir.to_path_buf()
}

/// Enumerates `*.tcl` and `*.rvt` files under `root`, respecting
/// gitignore rules the way the rest of the project's tooling does.
/// Hidden/vendored directories are out of scope — callers that need
/// them supply their own globs.
pub fn discover_files(root: &Path) -> Result<Vec<PathBuf>, WorkspaceError> {
    let mut files = Vec::new();
    for entry in WalkBuilder::new(root)
        .hidden(true)
        .follow_links(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .build()
    {
        let entry = entry.map_err(|e| WorkspaceError::Walk {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;
        if entry.file_type().is_some_and(|t| t.is_file()) {
            let is_source = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| ext == "tcl" || ext == "rvt");
            if is_source {
                files.push(entry.into_path());
            }
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn finds_root_via_git_marker() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        let nested = dir.path().join("src/deep");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_root(&nested), dir.path());
    }

    #[test]
    fn falls_back_to_own_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("lonely");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_root(&nested), nested);
    }

    #[test]
    fn discovers_tcl_and_rvt_files_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.tcl"), "").unwrap();
        fs::write(dir.path().join("b.rvt"), "").unwrap();
        fs::write(dir.path().join("c.txt"), "").unwrap();
        let files = discover_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
    }
}
