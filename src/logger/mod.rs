//! Activity logging: JSONL append-only log with graceful degradation.

pub mod activity;
pub mod jsonl;
