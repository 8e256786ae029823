//! Policy gate
//!
//! Pure authorization: the answer depends only on the (action, mode) pair,
//! never on the score or on earlier calls.

use std::collections::BTreeSet;
use tracing::warn;
use trustgate_core::{ActionType, AutonomyMode, ConfigError, FAIL_SAFE_ACTION};

use crate::config::PolicyTable;

/// Mode-to-action authorization
pub trait Policy {
    /// Every action authorized in `mode`
    fn allowed_actions(&self, mode: AutonomyMode) -> &BTreeSet<ActionType>;

    /// Whether `action` may execute in `mode`
    fn check_compliance(&self, action: ActionType, mode: AutonomyMode) -> bool {
        self.allowed_actions(mode).contains(&action)
    }
}

/// The policy gate backed by a validated table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyGate {
    table: PolicyTable,
}

impl Default for PolicyGate {
    fn default() -> Self {
        Self {
            table: PolicyTable::default(),
        }
    }
}

impl PolicyGate {
    /// Build a gate from a table, rejecting tables that break the lattice.
    ///
    /// Modes where the fail-safe action is not itself authorized are
    /// reported with a warning; see `fail_safe_conflicts`.
    pub fn new(table: PolicyTable) -> Result<Self, ConfigError> {
        table.validate()?;
        let gate = Self { table };
        for mode in gate.fail_safe_conflicts() {
            warn!(
                "Fail-safe action {} is not in the allowed set for {}; denials in this mode still execute it",
                FAIL_SAFE_ACTION, mode
            );
        }
        Ok(gate)
    }

    pub fn table(&self) -> &PolicyTable {
        &self.table
    }

    /// Modes whose allowed set does not contain the fail-safe action
    pub fn fail_safe_conflicts(&self) -> Vec<AutonomyMode> {
        self.table.fail_safe_conflicts(FAIL_SAFE_ACTION)
    }
}

impl Policy for PolicyGate {
    fn allowed_actions(&self, mode: AutonomyMode) -> &BTreeSet<ActionType> {
        self.table.get(mode)
    }
}
