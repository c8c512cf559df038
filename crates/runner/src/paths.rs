//! Path handling shared by the runner and the hosts.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Joins `path` onto `project_root` unless it is already absolute.
pub fn add_project_root_if_needed(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

/// Anchors every search path at the project root and drops duplicates, keeping the
/// first occurrence.
pub fn search_paths<I>(project_root: &Path, configured: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut paths: Vec<PathBuf> = Vec::new();
    for path in configured {
        let path = add_project_root_if_needed(project_root, &path);
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    paths
}

/// Locates each reference, either as given or by file name in a search path.
///
/// References that cannot be found are logged and left out.
pub fn resolve_references(
    project_root: &Path,
    references: &[PathBuf],
    search_paths: &[PathBuf],
) -> Vec<PathBuf> {
    let mut resolved = Vec::with_capacity(references.len());

    for reference in references {
        let direct = add_project_root_if_needed(project_root, reference);
        if direct.is_file() {
            resolved.push(direct);
            continue;
        }

        let found = reference.file_name().and_then(|name| {
            search_paths
                .iter()
                .map(|dir| dir.join(name))
                .find(|candidate| candidate.is_file())
        });
        match found {
            Some(path) => {
                debug!("Resolved {} to {}", reference.display(), path.display());
                resolved.push(path);
            }
            None => warn!("Could not resolve reference {}", reference.display()),
        }
    }
    resolved
}
