//! Directory walker that collects plugin artifacts by file name pattern.
//!
//! The walk is breadth-first and deterministic: entries of each directory are
//! visited in byte order of their names, and a directory's files are emitted
//! before any of its subdirectories are descended. Results are then sorted by
//! file name with an ordinal case-insensitive, stable comparison, so files with
//! names differing only in case keep their walk order.

#![allow(missing_docs)]

use std::cmp::Ordering;
use std::collections::{HashSet, VecDeque};
use std::fs::{self, DirEntry};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::config::ScannerConfig;
use crate::core::errors::{ApfError, Result};
use crate::core::paths::resolve_absolute_path;
use crate::scanner::patterns::NamePattern;

/// Snapshot of one matching file taken at scan time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactFile {
    /// Absolute path.
    pub path: PathBuf,
    pub file_name: String,
    /// Text from the last `.` of the file name on, e.g. `.aar`; empty if none.
    pub extension: String,
    pub size_bytes: u64,
}

impl ArtifactFile {
    #[must_use]
    pub fn new(path: PathBuf, size_bytes: u64) -> Self {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = file_name
            .rfind('.')
            .map(|idx| file_name[idx..].to_string())
            .unwrap_or_default();
        Self {
            path,
            file_name,
            extension,
            size_bytes,
        }
    }
}

/// Walker configuration derived from `ScannerConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkerConfig {
    pub follow_symlinks: bool,
    /// Directory levels below the root that are descended.
    pub max_depth: usize,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self::from(&ScannerConfig::default())
    }
}

impl From<&ScannerConfig> for WalkerConfig {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            follow_symlinks: config.follow_symlinks,
            max_depth: config.max_depth,
        }
    }
}

/// Read-only recursive file finder.
///
/// Safety invariants:
/// - Honors `follow_symlinks`; symlinks are skipped entirely otherwise
/// - Visits each canonical directory once when following symlinks
/// - Bounded by `max_depth` to prevent runaway traversal
#[derive(Debug, Clone, Default)]
pub struct DirectoryWalker {
    config: WalkerConfig,
}

impl DirectoryWalker {
    #[must_use]
    pub fn new(config: WalkerConfig) -> Self {
        Self { config }
    }

    /// All files under `root` whose name matches `pattern`, sorted by name.
    pub fn scan(&self, root: &Path, pattern: &NamePattern) -> Result<Vec<ArtifactFile>> {
        let mut buckets = self.scan_many(root, &[pattern])?;
        Ok(buckets.pop().unwrap_or_default())
    }

    /// One walk, one sorted result list per pattern (in pattern order). A file
    /// matching several patterns appears in each of their lists.
    pub fn scan_many(
        &self,
        root: &Path,
        patterns: &[&NamePattern],
    ) -> Result<Vec<Vec<ArtifactFile>>> {
        let root = resolve_absolute_path(root);
        let meta = fs::metadata(&root).map_err(|source| ApfError::io(&root, source))?;
        if !meta.is_dir() {
            return Err(ApfError::NotADirectory { path: root });
        }

        let mut buckets: Vec<Vec<ArtifactFile>> = vec![Vec::new(); patterns.len()];
        let mut visited: HashSet<PathBuf> = HashSet::new();
        if self.config.follow_symlinks {
            visited.insert(root.clone());
        }

        let mut queue: VecDeque<(PathBuf, usize)> = VecDeque::from([(root, 0)]);
        while let Some((dir, depth)) = queue.pop_front() {
            for entry in read_dir_sorted(&dir)? {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .map_err(|source| ApfError::io(&path, source))?;

                let meta = if file_type.is_symlink() {
                    if !self.config.follow_symlinks {
                        continue;
                    }
                    // Dangling links are not artifacts.
                    let Ok(target) = fs::metadata(&path) else {
                        continue;
                    };
                    target
                } else {
                    entry
                        .metadata()
                        .map_err(|source| ApfError::io(&path, source))?
                };

                if meta.is_dir() {
                    if depth >= self.config.max_depth {
                        continue;
                    }
                    if self.config.follow_symlinks {
                        let canonical =
                            fs::canonicalize(&path).map_err(|source| ApfError::io(&path, source))?;
                        if !visited.insert(canonical) {
                            continue;
                        }
                    }
                    queue.push_back((path, depth + 1));
                } else if meta.is_file() {
                    let name = entry.file_name();
                    let name = name.to_string_lossy();
                    let mut artifact: Option<ArtifactFile> = None;
                    for (bucket, pattern) in buckets.iter_mut().zip(patterns) {
                        if pattern.matches(&name) {
                            let file = artifact
                                .get_or_insert_with(|| ArtifactFile::new(path.clone(), meta.len()));
                            bucket.push(file.clone());
                        }
                    }
                }
            }
        }

        for bucket in &mut buckets {
            sort_by_file_name(bucket);
        }
        Ok(buckets)
    }
}

/// Scan `root` for `pattern` with default walker settings.
pub fn scan(root: &Path, pattern: &NamePattern) -> Result<Vec<ArtifactFile>> {
    DirectoryWalker::default().scan(root, pattern)
}

/// Stable sort by file name, ordinal and case-insensitive.
pub fn sort_by_file_name(files: &mut [ArtifactFile]) {
    files.sort_by(|a, b| compare_ignore_case(&a.file_name, &b.file_name));
}

/// Ordinal comparison of the upper-cased characters of both strings.
#[must_use]
pub fn compare_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_uppercase)
        .cmp(b.chars().flat_map(char::to_uppercase))
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<DirEntry>> {
    let mut entries = fs::read_dir(dir)
        .map_err(|source| ApfError::io(dir, source))?
        .collect::<std::io::Result<Vec<DirEntry>>>()
        .map_err(|source| ApfError::io(dir, source))?;
    entries.sort_by_key(DirEntry::file_name);
    Ok(entries)
}
