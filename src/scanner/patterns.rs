//! Artifact kinds and glob-style file name patterns.

#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::config::ScannerConfig;
use crate::core::errors::{ApfError, Result};

/// The three families of Android plugin files a project scan collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// `.aar` archive libraries.
    Archive,
    /// `.jar` Java archives.
    Library,
    /// `AndroidManifest.xml` files.
    Manifest,
}

impl ArtifactKind {
    /// Configured name pattern for this kind.
    #[must_use]
    pub fn pattern<'a>(&self, config: &'a ScannerConfig) -> &'a str {
        match self {
            Self::Archive => &config.archive_pattern,
            Self::Library => &config.library_pattern,
            Self::Manifest => &config.manifest_pattern,
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Archive => "archives",
            Self::Library => "libraries",
            Self::Manifest => "manifests",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ArtifactKind {
    type Err = ApfError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "archives" | "archive" | "aar" => Ok(Self::Archive),
            "libraries" | "library" | "jar" => Ok(Self::Library),
            "manifests" | "manifest" => Ok(Self::Manifest),
            other => Err(ApfError::InvalidConfig {
                details: format!("unknown artifact kind {other:?}"),
            }),
        }
    }
}

/// A compiled file name filter: an exact name like `AndroidManifest.xml` or a
/// wildcard like `*.aar`. Matching is case-insensitive and never crosses
/// a path separator.
#[derive(Debug, Clone)]
pub struct NamePattern {
    source: String,
    regex: Regex,
}

impl NamePattern {
    pub fn new(pattern: &str) -> Result<Self> {
        if pattern.is_empty() || pattern.contains(['/', '\\']) {
            return Err(ApfError::InvalidPattern {
                pattern: pattern.to_string(),
                details: "must be a non-empty file name without separators".to_string(),
            });
        }
        Ok(Self {
            source: pattern.to_string(),
            regex: glob_to_regex(pattern)?,
        })
    }

    #[must_use]
    pub fn matches(&self, file_name: &str) -> bool {
        self.regex.is_match(file_name)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut regex_str = String::with_capacity(pattern.len() * 2 + 8);
    regex_str.push_str("(?i)^");

    for c in pattern.chars() {
        match c {
            '*' => regex_str.push_str("[^/\\\\]*"),
            '?' => regex_str.push_str("[^/\\\\]"),
            '.' | '+' | '(' | ')' | '{' | '}' | '[' | ']' | '^' | '$' | '|' | '\\' => {
                regex_str.push('\\');
                regex_str.push(c);
            }
            c => regex_str.push(c),
        }
    }

    regex_str.push('$');

    Regex::new(&regex_str).map_err(|err| ApfError::InvalidPattern {
        pattern: pattern.to_string(),
        details: err.to_string(),
    })
}
