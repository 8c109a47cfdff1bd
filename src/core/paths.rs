//! Shared path manipulation utilities.

use std::env;
use std::path::{Component, Path, PathBuf};

/// Resolve a path to an absolute, normalized path.
///
/// If `fs::canonicalize` succeeds (path exists), it is used to resolve symlinks
/// and normalize components.
///
/// If it fails (e.g. path does not exist), the path is made absolute relative
/// to CWD and `..`/`.` components are resolved syntactically.
pub fn resolve_absolute_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };

    if let Ok(canonical) = std::fs::canonicalize(&absolute) {
        return canonical;
    }

    normalize_syntactic(&absolute)
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
        }
    }
    components.into_iter().collect()
}

/// Project-relative form of `path` for human output.
///
/// Everything before the first `Assets` component (ASCII case-insensitive) is
/// dropped. Paths outside an `Assets` tree are returned unchanged.
pub fn display_path(path: &Path) -> PathBuf {
    let components: Vec<Component<'_>> = path.components().collect();
    let assets = components.iter().position(|c| {
        matches!(c, Component::Normal(name) if name.to_string_lossy().eq_ignore_ascii_case("assets"))
    });
    match assets {
        Some(idx) => components[idx..].iter().collect(),
        None => path.to_path_buf(),
    }
}

/// Split a `/`-or-`\`-separated relative pattern like `Plugins/Android` into
/// its non-empty segments.
pub fn relative_segments(pattern: &str) -> Vec<&str> {
    pattern
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .collect()
}
