//! Activity log front end: typed events mapped onto JSONL entries.
//!
//! Commands run to completion on one thread, so events are written inline
//! rather than through a channel. A disabled log accepts and drops every event.

#![allow(missing_docs)]

use std::path::Path;

use crate::core::config::Config;
use crate::core::errors::ApfError;
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};
use crate::manifest::sdk::WriteOutcome;
use crate::scanner::classifier::{DuplicateArtifact, LocationWarning};
use crate::scanner::patterns::ArtifactKind;

/// Events recorded while scanning and normalizing a project.
#[derive(Debug, Clone)]
pub enum ActivityEvent<'a> {
    ScanCompleted {
        root: &'a Path,
        archives: usize,
        libraries: usize,
        manifests: usize,
        duration_ms: u64,
    },
    ArtifactExcluded {
        kind: ArtifactKind,
        warning: &'a LocationWarning,
    },
    DuplicateFound {
        kind: ArtifactKind,
        duplicate: &'a DuplicateArtifact,
    },
    ManifestRead {
        path: &'a Path,
        min_sdk: Option<u32>,
    },
    ManifestRewritten {
        path: &'a Path,
        target: u32,
        outcome: &'a WriteOutcome,
        dry_run: bool,
    },
    Failed {
        path: Option<&'a Path>,
        error: &'a ApfError,
    },
}

/// Sink for [`ActivityEvent`]s.
pub struct ActivityLog {
    writer: Option<JsonlWriter>,
}

impl ActivityLog {
    /// Open the log described by `config`, or a disabled log when
    /// `logging.jsonl_enabled` is off.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        if config.logging.jsonl_enabled {
            Self::open(JsonlConfig::from(config))
        } else {
            Self::disabled()
        }
    }

    #[must_use]
    pub fn open(config: JsonlConfig) -> Self {
        Self {
            writer: Some(JsonlWriter::open(config)),
        }
    }

    #[must_use]
    pub const fn disabled() -> Self {
        Self { writer: None }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    pub fn record(&mut self, event: &ActivityEvent<'_>) {
        if let Some(writer) = self.writer.as_mut() {
            writer.write_entry(&event_to_log_entry(event));
        }
    }

    pub fn flush(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush();
        }
    }
}

fn path_string(path: &Path) -> String {
    path.display().to_string()
}

fn event_to_log_entry(event: &ActivityEvent<'_>) -> LogEntry {
    match event {
        ActivityEvent::ScanCompleted {
            root,
            archives,
            libraries,
            manifests,
            duration_ms,
        } => {
            let mut e = LogEntry::new(EventType::ScanComplete, Severity::Info);
            e.path = Some(path_string(root));
            e.count = Some(archives + libraries + manifests);
            e.details = Some(format!(
                "archives={archives} libraries={libraries} manifests={manifests}"
            ));
            e.duration_ms = Some(*duration_ms);
            e.ok = Some(true);
            e
        }
        ActivityEvent::ArtifactExcluded { kind, warning } => {
            let mut e = LogEntry::new(EventType::ArtifactExcluded, Severity::Warning);
            e.kind = Some(kind.label().to_string());
            e.path = Some(path_string(&warning.path));
            e.details = Some(warning.to_string());
            e
        }
        ActivityEvent::DuplicateFound { kind, duplicate } => {
            let mut e = LogEntry::new(EventType::DuplicateArtifact, Severity::Error);
            e.kind = Some(kind.label().to_string());
            e.logical_name = Some(duplicate.logical_name.clone());
            e.path = Some(path_string(&duplicate.conflicting));
            e.registered = Some(path_string(&duplicate.registered));
            e
        }
        ActivityEvent::ManifestRead { path, min_sdk } => {
            let mut e = LogEntry::new(EventType::ManifestRead, Severity::Info);
            e.path = Some(path_string(path));
            e.min_sdk = *min_sdk;
            e.ok = Some(true);
            e
        }
        ActivityEvent::ManifestRewritten {
            path,
            target,
            outcome,
            dry_run,
        } => {
            let mut e = LogEntry::new(EventType::ManifestRewrite, Severity::Info);
            e.path = Some(path_string(path));
            e.min_sdk = Some(*target);
            e.ok = Some(true);
            match outcome {
                WriteOutcome::Rewritten { previous } => e.previous = Some(previous.clone()),
                WriteOutcome::Unchanged => e.details = Some("unchanged".to_string()),
                WriteOutcome::Absent => e.details = Some("no minSdkVersion".to_string()),
            }
            if *dry_run {
                let note = e.details.take().map_or_else(
                    || "dry-run".to_string(),
                    |details| format!("dry-run {details}"),
                );
                e.details = Some(note);
            }
            e
        }
        ActivityEvent::Failed { path, error } => {
            let severity = if error.is_fatal() {
                Severity::Error
            } else {
                Severity::Warning
            };
            let mut e = LogEntry::new(EventType::Error, severity);
            e.path = path.map(path_string);
            e.ok = Some(false);
            e.error_code = Some(error.code().to_string());
            e.error_message = Some(error.to_string());
            e
        }
    }
}
