//! Autonomy modes define how much the proposer may do on a given day
//!
//! Modes form a hierarchy from most to least restrictive:
//! BLOCK < SUGGEST_ONLY < SAFE_ONLY < FULL_AUTONOMY

use serde::{Deserialize, Serialize};
use std::fmt;

/// Autonomy tier derived from the trust score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutonomyMode {
    /// Data cannot be trusted. Only verification and alerting.
    Block,

    /// Proposals are advisory. Passive actions only.
    SuggestOnly,

    /// Conservative control actions allowed, no optimization.
    SafeOnly,

    /// Everything in the action vocabulary is allowed.
    FullAutonomy,
}

impl Default for AutonomyMode {
    fn default() -> Self {
        AutonomyMode::Block
    }
}

impl AutonomyMode {
    /// Parse from the wire token (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "BLOCK" => Some(AutonomyMode::Block),
            "SUGGEST_ONLY" => Some(AutonomyMode::SuggestOnly),
            "SAFE_ONLY" => Some(AutonomyMode::SafeOnly),
            "FULL_AUTONOMY" => Some(AutonomyMode::FullAutonomy),
            _ => None,
        }
    }

    /// Get the wire token
    pub fn as_str(&self) -> &'static str {
        match self {
            AutonomyMode::Block => "BLOCK",
            AutonomyMode::SuggestOnly => "SUGGEST_ONLY",
            AutonomyMode::SafeOnly => "SAFE_ONLY",
            AutonomyMode::FullAutonomy => "FULL_AUTONOMY",
        }
    }

    /// All modes, most restrictive first
    pub fn all() -> &'static [Self] {
        &[
            AutonomyMode::Block,
            AutonomyMode::SuggestOnly,
            AutonomyMode::SafeOnly,
            AutonomyMode::FullAutonomy,
        ]
    }

    /// Check if this mode is at least as permissive as `required`
    pub fn permits(&self, required: AutonomyMode) -> bool {
        *self >= required
    }
}

impl fmt::Display for AutonomyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
