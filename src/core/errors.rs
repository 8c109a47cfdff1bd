//! APF-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, ApfError>;

/// Top-level error type for Android Plugin Fixer.
///
/// Conflict and location findings are not errors; they travel in
/// [`ConflictReport`](crate::scanner::classifier::ConflictReport).
#[derive(Debug, Error)]
pub enum ApfError {
    #[error("[APF-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[APF-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[APF-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[APF-2001] malformed manifest {path}: {details}")]
    MalformedManifest { path: PathBuf, details: String },

    #[error("[APF-2002] minSdkVersion {value:?} in {path} is not an integer")]
    Parse { path: PathBuf, value: String },

    #[error("[APF-2003] invalid name pattern {pattern:?}: {details}")]
    InvalidPattern { pattern: String, details: String },

    #[error("[APF-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[APF-3001] not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("[APF-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[APF-3003] no project scan available; run a scan first")]
    NoScan,
}

impl ApfError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "APF-1001",
            Self::MissingConfig { .. } => "APF-1002",
            Self::ConfigParse { .. } => "APF-1003",
            Self::MalformedManifest { .. } => "APF-2001",
            Self::Parse { .. } => "APF-2002",
            Self::InvalidPattern { .. } => "APF-2003",
            Self::Serialization { .. } => "APF-2101",
            Self::NotADirectory { .. } => "APF-3001",
            Self::Io { .. } => "APF-3002",
            Self::NoScan => "APF-3003",
        }
    }

    /// Missing, unreadable or unwritable paths.
    #[must_use]
    pub const fn is_filesystem(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::NotADirectory { .. })
    }

    /// Failures that make a CLI run exit non-zero even when reported per file.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        self.is_filesystem() || matches!(self, Self::MalformedManifest { .. })
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for ApfError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for ApfError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
