//! Artifact scanner: directory walker, name patterns, conflict classification.

pub mod classifier;
pub mod patterns;
pub mod walker;
