//! The fixed action vocabulary a proposer may choose from

use serde::{Deserialize, Serialize};
use std::fmt;

/// Control actions, roughly ordered from passive to most invasive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    /// Keep the process at its current setpoints
    Hold,
    /// Raise an operator alert
    Alert,
    /// Ask for a manual sensor check
    RequestVerification,
    /// Conservative, bounded control adjustment
    ActSafe,
    /// Unrestricted optimizing control adjustment
    ActUnrestricted,
}

/// Action substituted whenever a proposal is denied or cannot be honoured
pub const FAIL_SAFE_ACTION: ActionType = ActionType::Hold;

impl ActionType {
    /// Parse an exact wire token. No fuzzy matching: anything outside the
    /// vocabulary is rejected.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "HOLD" => Some(ActionType::Hold),
            "ALERT" => Some(ActionType::Alert),
            "REQUEST_VERIFICATION" => Some(ActionType::RequestVerification),
            "ACT_SAFE" => Some(ActionType::ActSafe),
            "ACT_UNRESTRICTED" => Some(ActionType::ActUnrestricted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Hold => "HOLD",
            ActionType::Alert => "ALERT",
            ActionType::RequestVerification => "REQUEST_VERIFICATION",
            ActionType::ActSafe => "ACT_SAFE",
            ActionType::ActUnrestricted => "ACT_UNRESTRICTED",
        }
    }

    /// The full vocabulary
    pub fn all() -> &'static [Self] {
        &[
            ActionType::Hold,
            ActionType::Alert,
            ActionType::RequestVerification,
            ActionType::ActSafe,
            ActionType::ActUnrestricted,
        ]
    }

    /// Whether the action changes process setpoints
    pub fn is_actuating(&self) -> bool {
        matches!(self, ActionType::ActSafe | ActionType::ActUnrestricted)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
