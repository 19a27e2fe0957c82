//! Shared DTOs for the pomfold workspace.
//!
//! # Design constraints
//! - Rules and plugin specs are read from configuration; keep their wire shape stable.
//! - Outcomes and reports are serialized to disk as JSON.
//! - Prefer adding optional fields over changing semantics.

pub mod outcome;
pub mod plugin;
pub mod report;
pub mod rule;

/// Schema identifiers.
pub mod schema {
    pub const POMFOLD_REPORT_V1: &str = "pomfold.report.v1";
}
