use std::path::{Path, PathBuf};

/// Locate a relative tests dir or compiler path from the current directory
/// upwards, so the harness works from any subdirectory of the repository.
/// Absolute paths, and paths found nowhere, are returned unchanged.
pub fn resolve_existing_path_upwards(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_existing_path_upwards_from(&cwd, path)
}

/// Walk from `base_dir` up to the filesystem root, returning the first
/// `<ancestor>/<path>` that exists.
pub fn resolve_existing_path_upwards_from(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let mut dir: Option<&Path> = Some(base_dir);
    while let Some(d) = dir {
        let cand = d.join(path);
        if cand.exists() {
            return cand;
        }
        dir = d.parent();
    }
    path.to_path_buf()
}
