//! Project-level orchestration over the scanner, classifier and manifest modules.

pub mod session;
