//! Error taxonomy shared across the pipeline
//!
//! Denial by policy is deliberately absent: it is an expected outcome,
//! not an error.

use thiserror::Error;

/// Malformed engine or policy configuration. Fatal at construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Penalty weight `{name}` must be finite and non-negative, got {value}")]
    InvalidPenalty { name: &'static str, value: f64 },

    #[error("Autonomy floor `{name}` must lie in [0, 1], got {value}")]
    FloorOutOfRange { name: &'static str, value: f64 },

    #[error("Autonomy floors must satisfy full > safe > suggest >= block (got full={full}, safe={safe}, suggest={suggest}, block={block})")]
    NonMonotonicFloors {
        full: f64,
        safe: f64,
        suggest: f64,
        block: f64,
    },

    #[error("Threshold `{name}` is invalid: {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("Baseline for sensor `{sensor}` has invalid std {std}")]
    InvalidBaseline { sensor: String, std: f64 },

    #[error("Stale-data limit must be at least 1")]
    ZeroStaleLimit,

    #[error("Allowed actions for {stricter} are not a strict subset of those for {looser}")]
    BrokenLattice { stricter: String, looser: String },

    #[error("FULL_AUTONOMY must allow the full action vocabulary; missing {0}")]
    IncompleteFullAutonomy(String),
}

/// Gate-side failures. Apart from `Uninitialized`, these surface as
/// `status=ERROR` execution results rather than propagating.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("System not initialized: no snapshot ingested for the current day")]
    Uninitialized,

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid action: {0}")]
    UnknownAction(String),

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Day {0} already resolved; ingest the next snapshot first")]
    AlreadyResolved(u32),
}
