//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{ApfError, Result};
use crate::scanner::patterns::NamePattern;

/// Full APF configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub scanner: ScannerConfig,
    pub layout: LayoutConfig,
    pub sdk: SdkConfig,
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
}

/// Name patterns and traversal knobs for the artifact scanner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScannerConfig {
    pub archive_pattern: String,
    pub library_pattern: String,
    pub manifest_pattern: String,
    pub follow_symlinks: bool,
    pub max_depth: usize,
}

/// Folders the Android build picks plugin artifacts up from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LayoutConfig {
    /// Path segment every artifact must live under.
    pub required_segment: String,
    /// Directories an artifact may sit in directly.
    pub allowed_parents: Vec<String>,
}

/// minSdkVersion normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SdkConfig {
    /// Floor for the running maximum before any manifest is read.
    pub default_min_sdk: u32,
}

/// Activity log settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub jsonl_enabled: bool,
    pub jsonl_max_size_bytes: u64,
    pub jsonl_max_rotated_files: u32,
}

/// Filesystem paths used by apf.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub jsonl_log: PathBuf,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            archive_pattern: "*.aar".to_string(),
            library_pattern: "*.jar".to_string(),
            manifest_pattern: "AndroidManifest.xml".to_string(),
            follow_symlinks: false,
            max_depth: 64,
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            required_segment: "Plugins/Android".to_string(),
            allowed_parents: vec![
                "Plugins/Android".to_string(),
                "libs".to_string(),
                "bin".to_string(),
            ],
        }
    }
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            default_min_sdk: 15,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            jsonl_enabled: false,
            jsonl_max_size_bytes: 10 * 1024 * 1024,
            jsonl_max_rotated_files: 3,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[APF-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        let cfg = home_dir.join(".config").join("apf").join("config.toml");
        let data = home_dir.join(".local").join("share").join("apf");
        Self {
            config_file: cfg,
            jsonl_log: data.join("activity.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| ApfError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(ApfError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.normalize_layout();
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // scanner
        if let Some(raw) = lookup("APF_SCANNER_ARCHIVE_PATTERN") {
            self.scanner.archive_pattern = raw;
        }
        if let Some(raw) = lookup("APF_SCANNER_LIBRARY_PATTERN") {
            self.scanner.library_pattern = raw;
        }
        if let Some(raw) = lookup("APF_SCANNER_MANIFEST_PATTERN") {
            self.scanner.manifest_pattern = raw;
        }
        if let Some(raw) = lookup("APF_SCANNER_FOLLOW_SYMLINKS") {
            self.scanner.follow_symlinks = parse_env("APF_SCANNER_FOLLOW_SYMLINKS", &raw)?;
        }
        if let Some(raw) = lookup("APF_SCANNER_MAX_DEPTH") {
            self.scanner.max_depth = parse_env("APF_SCANNER_MAX_DEPTH", &raw)?;
        }

        // layout
        if let Some(raw) = lookup("APF_LAYOUT_REQUIRED_SEGMENT") {
            self.layout.required_segment = raw;
        }
        if let Some(raw) = lookup("APF_LAYOUT_ALLOWED_PARENTS") {
            self.layout.allowed_parents = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        // sdk
        if let Some(raw) = lookup("APF_SDK_DEFAULT_MIN_SDK") {
            self.sdk.default_min_sdk = parse_env("APF_SDK_DEFAULT_MIN_SDK", &raw)?;
        }

        // logging
        if let Some(raw) = lookup("APF_LOGGING_JSONL_ENABLED") {
            self.logging.jsonl_enabled = parse_env("APF_LOGGING_JSONL_ENABLED", &raw)?;
        }
        if let Some(raw) = lookup("APF_PATHS_JSONL_LOG") {
            self.paths.jsonl_log = PathBuf::from(raw);
        }

        Ok(())
    }

    /// Layout segments are compared component-wise; strip stray separators.
    fn normalize_layout(&mut self) {
        let trim = |s: &str| s.trim_matches(|c| c == '/' || c == '\\').to_string();
        self.layout.required_segment = trim(&self.layout.required_segment);
        for parent in &mut self.layout.allowed_parents {
            *parent = trim(parent);
        }
    }

    pub fn validate(&self) -> Result<()> {
        for pattern in [
            &self.scanner.archive_pattern,
            &self.scanner.library_pattern,
            &self.scanner.manifest_pattern,
        ] {
            NamePattern::new(pattern)?;
        }

        if self.scanner.max_depth == 0 {
            return Err(ApfError::InvalidConfig {
                details: "scanner.max_depth must be >= 1".to_string(),
            });
        }

        if self.layout.required_segment.is_empty() {
            return Err(ApfError::InvalidConfig {
                details: "layout.required_segment must not be empty".to_string(),
            });
        }

        if self.layout.allowed_parents.is_empty()
            || self.layout.allowed_parents.iter().any(String::is_empty)
        {
            return Err(ApfError::InvalidConfig {
                details: "layout.allowed_parents must list at least one non-empty directory"
                    .to_string(),
            });
        }

        if self.sdk.default_min_sdk == 0 {
            return Err(ApfError::InvalidConfig {
                details: "sdk.default_min_sdk must be >= 1".to_string(),
            });
        }

        if self.logging.jsonl_enabled && self.logging.jsonl_max_size_bytes == 0 {
            return Err(ApfError::InvalidConfig {
                details: "logging.jsonl_max_size_bytes must be > 0".to_string(),
            });
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| ApfError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
