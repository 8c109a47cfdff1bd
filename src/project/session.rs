//! Project session: the last scan plus the running `minSdkVersion` state,
//! with the actions a front end triggers against them.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;

use crate::core::config::{Config, ScannerConfig};
use crate::core::errors::{ApfError, Result};
use crate::core::paths::resolve_absolute_path;
use crate::logger::activity::{ActivityEvent, ActivityLog};
use crate::manifest::sdk::{self, ApplyReport, ManifestSurvey, SdkVersionState};
use crate::scanner::classifier::{self, ConflictReport, LocationPolicy};
use crate::scanner::patterns::{ArtifactKind, NamePattern};
use crate::scanner::walker::{ArtifactFile, DirectoryWalker, WalkerConfig};

/// The three artifact lists collected from one project root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectScan {
    pub root: PathBuf,
    pub archives: Vec<ArtifactFile>,
    pub libraries: Vec<ArtifactFile>,
    pub manifests: Vec<ArtifactFile>,
}

impl ProjectScan {
    #[must_use]
    pub fn files(&self, kind: ArtifactKind) -> &[ArtifactFile] {
        match kind {
            ArtifactKind::Archive => &self.archives,
            ArtifactKind::Library => &self.libraries,
            ArtifactKind::Manifest => &self.manifests,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.archives.len() + self.libraries.len() + self.manifests.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Walk `root` once, collecting archives, libraries and manifests by the
/// configured name patterns.
pub fn scan_project(root: &Path, config: &ScannerConfig) -> Result<ProjectScan> {
    let archive = NamePattern::new(&config.archive_pattern)?;
    let library = NamePattern::new(&config.library_pattern)?;
    let manifest = NamePattern::new(&config.manifest_pattern)?;

    let walker = DirectoryWalker::new(WalkerConfig::from(config));
    let mut buckets = walker
        .scan_many(root, &[&archive, &library, &manifest])?
        .into_iter();

    Ok(ProjectScan {
        root: resolve_absolute_path(root),
        archives: buckets.next().unwrap_or_default(),
        libraries: buckets.next().unwrap_or_default(),
        manifests: buckets.next().unwrap_or_default(),
    })
}

/// State shared by the scan, conflict and SDK actions.
pub struct Session {
    config: Config,
    policy: LocationPolicy,
    sdk: SdkVersionState,
    scan: Option<ProjectScan>,
    activity: ActivityLog,
}

impl Session {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let activity = ActivityLog::from_config(&config);
        Self::with_activity_log(config, activity)
    }

    #[must_use]
    pub fn with_activity_log(config: Config, activity: ActivityLog) -> Self {
        Self {
            policy: LocationPolicy::from(&config.layout),
            sdk: SdkVersionState::new(config.sdk.default_min_sdk),
            scan: None,
            activity,
            config,
        }
    }

    #[must_use]
    pub fn last_scan(&self) -> Option<&ProjectScan> {
        self.scan.as_ref()
    }

    /// Scan `root`, replacing the previous scan. The observed `minSdkVersion`
    /// maximum restarts from the configured floor; an explicit target is kept.
    pub fn scan_project(&mut self, root: &Path) -> Result<&ProjectScan> {
        let started = Instant::now();
        let scan = match scan_project(root, &self.config.scanner) {
            Ok(scan) => scan,
            Err(err) => {
                self.activity.record(&ActivityEvent::Failed {
                    path: Some(root),
                    error: &err,
                });
                return Err(err);
            }
        };

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.activity.record(&ActivityEvent::ScanCompleted {
            root: &scan.root,
            archives: scan.archives.len(),
            libraries: scan.libraries.len(),
            manifests: scan.manifests.len(),
            duration_ms,
        });

        let explicit = self.sdk.explicit_target();
        self.sdk = SdkVersionState::new(self.config.sdk.default_min_sdk);
        if let Some(value) = explicit {
            self.sdk.set_target(value);
        }
        Ok(self.scan.insert(scan))
    }

    /// Classify the archives or libraries of the last scan.
    pub fn check_conflicts(&mut self, kind: ArtifactKind) -> Result<ConflictReport> {
        if kind == ArtifactKind::Manifest {
            return Err(ApfError::InvalidConfig {
                details: "conflict checks apply to archives or libraries".to_string(),
            });
        }
        let scan = self.scan.as_ref().ok_or(ApfError::NoScan)?;
        let report = classifier::classify(scan.files(kind), &self.policy);

        for warning in &report.warnings {
            self.activity
                .record(&ActivityEvent::ArtifactExcluded { kind, warning });
        }
        for duplicate in &report.errors {
            self.activity
                .record(&ActivityEvent::DuplicateFound { kind, duplicate });
        }
        Ok(report)
    }

    /// Read every manifest of the last scan into the running maximum.
    pub fn read_manifests(&mut self) -> Result<ManifestSurvey> {
        let scan = self.scan.as_ref().ok_or(ApfError::NoScan)?;
        let survey = sdk::survey(&scan.manifests, &mut self.sdk);

        for reading in &survey.readings {
            match &reading.result {
                Ok(min_sdk) => self.activity.record(&ActivityEvent::ManifestRead {
                    path: &reading.path,
                    min_sdk: *min_sdk,
                }),
                Err(error) => self.activity.record(&ActivityEvent::Failed {
                    path: Some(&reading.path),
                    error,
                }),
            }
        }
        Ok(survey)
    }

    #[must_use]
    pub fn sdk_state(&self) -> SdkVersionState {
        self.sdk
    }

    /// Explicit target if one was set, otherwise the highest value read.
    #[must_use]
    pub fn current_target_sdk_version(&self) -> u32 {
        self.sdk.target()
    }

    pub fn set_target_sdk_version(&mut self, value: u32) {
        self.sdk.set_target(value);
    }

    /// Rewrite every manifest of the last scan to the current target.
    pub fn apply_target_sdk_version(&mut self, dry_run: bool) -> Result<ApplyReport> {
        let scan = self.scan.as_ref().ok_or(ApfError::NoScan)?;
        let report = sdk::apply(&scan.manifests, self.sdk.target(), dry_run);

        for write in &report.writes {
            match &write.result {
                Ok(outcome) => self.activity.record(&ActivityEvent::ManifestRewritten {
                    path: &write.path,
                    target: report.target,
                    outcome,
                    dry_run,
                }),
                Err(error) => self.activity.record(&ActivityEvent::Failed {
                    path: Some(&write.path),
                    error,
                }),
            }
        }
        self.activity.flush();
        Ok(report)
    }
}
