//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use android_plugin_fixer::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{ApfError, Result};

// Scanner
pub use crate::scanner::classifier::{ConflictReport, LocationPolicy, classify};
pub use crate::scanner::patterns::{ArtifactKind, NamePattern};
pub use crate::scanner::walker::{ArtifactFile, DirectoryWalker, WalkerConfig};

// Manifest
pub use crate::manifest::sdk::{SdkVersionState, WriteOutcome, read_min_sdk, write_min_sdk};

// Project
pub use crate::project::session::{ProjectScan, Session, scan_project};
