#![forbid(unsafe_code)]

//! Android Plugin Fixer (apf): checks the Android plugin files of a game
//! project before a build.
//!
//! Three jobs:
//! 1. **Artifact scanner**: finds `.aar` archives, `.jar` libraries and
//!    `AndroidManifest.xml` files under a project root
//! 2. **Conflict classifier**: groups archives or libraries by name with the
//!    version suffix stripped, flagging duplicates and misplaced files
//! 3. **SDK normalizer**: reads `minSdkVersion` from every manifest and
//!    rewrites them all to one value
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use android_plugin_fixer::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use android_plugin_fixer::core::config::Config;
//! use android_plugin_fixer::scanner::walker::{DirectoryWalker, WalkerConfig};
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod manifest;
pub mod project;
pub mod scanner;
