//! Conflict classifier: logical-name extraction, build-location checks and
//! duplicate detection for Android plugin artifacts.
//!
//! A file named `play-services-base-17.2.1.aar` has the logical name
//! `play-services-base`: the text after the last `-` is dropped when it is a
//! version qualifier (dotted numbers, `release` or `debug`). Two files sharing a
//! logical name would both be packed into the Android build, so the second one
//! seen is reported as a duplicate. Files outside the folders the build picks up
//! are reported as excluded and never grouped.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::core::config::LayoutConfig;
use crate::core::paths::relative_segments;
use crate::scanner::walker::ArtifactFile;

/// Whether `token` is a version or build-variant qualifier.
///
/// Accepts `release`/`debug` in any case, or one or more `.`-separated
/// components that are each a non-empty run of ASCII digits fitting an `i32`.
#[must_use]
pub fn is_version_token(token: Option<&str>) -> bool {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return false;
    };
    if token.eq_ignore_ascii_case("release") || token.eq_ignore_ascii_case("debug") {
        return true;
    }
    token.split('.').all(|part| {
        !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) && part.parse::<i32>().is_ok()
    })
}

/// File name split into its logical name and optional version qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedName<'a> {
    pub logical_name: &'a str,
    pub qualifier: Option<&'a str>,
}

/// Split `file_name` (whose extension, dot included, is `extension`).
///
/// When the token after the last `-` is not a version qualifier, nothing is
/// stripped but the extension.
#[must_use]
pub fn parse_file_name<'a>(file_name: &'a str, extension: &str) -> ParsedName<'a> {
    let stem = file_name.strip_suffix(extension).unwrap_or(file_name);
    let Some(idx) = file_name.rfind('-') else {
        return ParsedName {
            logical_name: stem,
            qualifier: None,
        };
    };

    let tail = &file_name[idx + 1..];
    let token = tail.strip_suffix(extension).unwrap_or(tail);
    if is_version_token(Some(token)) {
        ParsedName {
            logical_name: &file_name[..idx],
            qualifier: Some(token),
        }
    } else {
        ParsedName {
            logical_name: stem,
            qualifier: None,
        }
    }
}

/// Where the Android build picks plugin artifacts up from.
///
/// A path is admitted when it contains `required_segment` as consecutive
/// components and its parent directory ends with one of `allowed_parents`.
/// Comparison is per path component and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationPolicy {
    required_segment: Vec<String>,
    allowed_parents: Vec<Vec<String>>,
}

impl Default for LocationPolicy {
    fn default() -> Self {
        Self::from(&LayoutConfig::default())
    }
}

impl From<&LayoutConfig> for LocationPolicy {
    fn from(layout: &LayoutConfig) -> Self {
        Self::new(&layout.required_segment, &layout.allowed_parents)
    }
}

impl LocationPolicy {
    #[must_use]
    pub fn new<S: AsRef<str>>(required_segment: &str, allowed_parents: &[S]) -> Self {
        let owned = |raw: &str| -> Vec<String> {
            relative_segments(raw)
                .into_iter()
                .map(str::to_string)
                .collect()
        };
        Self {
            required_segment: owned(required_segment),
            allowed_parents: allowed_parents
                .iter()
                .map(|parent| owned(parent.as_ref()))
                .filter(|segments| !segments.is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn admits(&self, path: &Path) -> bool {
        let components = normal_components(path);
        let under_required = !self.required_segment.is_empty()
            && components
                .windows(self.required_segment.len())
                .any(|window| window.iter().eq(self.required_segment.iter()));
        if !under_required {
            return false;
        }

        let Some(parent) = components.split_last().map(|(_, parent)| parent) else {
            return false;
        };
        self.allowed_parents
            .iter()
            .any(|allowed| parent.ends_with(allowed))
    }
}

fn normal_components(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

/// An artifact outside every folder the build picks up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationWarning {
    pub file_name: String,
    pub path: PathBuf,
}

impl fmt::Display for LocationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} file excluded from build (move to proper folder) {}",
            self.file_name,
            self.path.display()
        )
    }
}

/// Second file normalizing to an already registered logical name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateArtifact {
    pub logical_name: String,
    pub extension: String,
    pub registered: PathBuf,
    pub conflicting: PathBuf,
}

impl fmt::Display for DuplicateArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} \"{}\" already added:\n{}\n{}",
            self.extension,
            self.logical_name,
            self.registered.display(),
            self.conflicting.display()
        )
    }
}

/// Outcome of one conflict check. Findings are advisory; the caller decides
/// whether they block a build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    /// Logical name to the first file registered under it.
    pub groups: BTreeMap<String, ArtifactFile>,
    pub warnings: Vec<LocationWarning>,
    pub errors: Vec<DuplicateArtifact>,
}

impl ConflictReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.errors.is_empty()
    }
}

/// Group `files` by logical name, reporting misplaced files and duplicates in
/// input order. The first file seen under a logical name wins.
#[must_use]
pub fn classify(files: &[ArtifactFile], policy: &LocationPolicy) -> ConflictReport {
    let mut report = ConflictReport::default();

    for file in files {
        let parsed = parse_file_name(&file.file_name, &file.extension);

        if !policy.admits(&file.path) {
            report.warnings.push(LocationWarning {
                file_name: file.file_name.clone(),
                path: file.path.clone(),
            });
            continue;
        }

        match report.groups.entry(parsed.logical_name.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(file.clone());
            }
            Entry::Occupied(existing) => {
                report.errors.push(DuplicateArtifact {
                    logical_name: existing.key().clone(),
                    extension: file.extension.clone(),
                    registered: existing.get().path.clone(),
                    conflicting: file.path.clone(),
                });
            }
        }
    }

    report
}
