//! Policy table configuration
//!
//! Maps each autonomy mode to the set of actions it authorizes. The
//! reference table is the default; a custom table may be supplied but must
//! keep the inclusion lattice intact.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use trustgate_core::{ActionType, AutonomyMode, ConfigError};

/// Allowed actions per autonomy mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTable {
    #[serde(default = "default_block")]
    pub block: BTreeSet<ActionType>,

    #[serde(default = "default_suggest_only")]
    pub suggest_only: BTreeSet<ActionType>,

    #[serde(default = "default_safe_only")]
    pub safe_only: BTreeSet<ActionType>,

    #[serde(default = "default_full_autonomy")]
    pub full_autonomy: BTreeSet<ActionType>,
}

fn default_block() -> BTreeSet<ActionType> {
    [ActionType::RequestVerification, ActionType::Alert].into_iter().collect()
}

fn default_suggest_only() -> BTreeSet<ActionType> {
    let mut set = default_block();
    set.insert(ActionType::Hold);
    set
}

fn default_safe_only() -> BTreeSet<ActionType> {
    let mut set = default_suggest_only();
    set.insert(ActionType::ActSafe);
    set
}

fn default_full_autonomy() -> BTreeSet<ActionType> {
    ActionType::all().iter().copied().collect()
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            block: default_block(),
            suggest_only: default_suggest_only(),
            safe_only: default_safe_only(),
            full_autonomy: default_full_autonomy(),
        }
    }
}

impl PolicyTable {
    /// Allowed actions for a mode
    pub fn get(&self, mode: AutonomyMode) -> &BTreeSet<ActionType> {
        match mode {
            AutonomyMode::Block => &self.block,
            AutonomyMode::SuggestOnly => &self.suggest_only,
            AutonomyMode::SafeOnly => &self.safe_only,
            AutonomyMode::FullAutonomy => &self.full_autonomy,
        }
    }

    /// Each mode's set must be a strict subset of the next looser mode's,
    /// and FULL_AUTONOMY must cover the whole vocabulary.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let modes = AutonomyMode::all();
        for pair in modes.windows(2) {
            let (stricter, looser) = (pair[0], pair[1]);
            let a = self.get(stricter);
            let b = self.get(looser);
            if !(a.is_subset(b) && a.len() < b.len()) {
                return Err(ConfigError::BrokenLattice {
                    stricter: stricter.to_string(),
                    looser: looser.to_string(),
                });
            }
        }

        let missing: Vec<&str> = ActionType::all()
            .iter()
            .filter(|a| !self.full_autonomy.contains(a))
            .map(|a| a.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::IncompleteFullAutonomy(missing.join(", ")));
        }

        Ok(())
    }

    /// Modes in which `fail_safe` is not itself an allowed action
    pub fn fail_safe_conflicts(&self, fail_safe: ActionType) -> Vec<AutonomyMode> {
        AutonomyMode::all()
            .iter()
            .copied()
            .filter(|mode| !self.get(*mode).contains(&fail_safe))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_table_is_valid() {
        assert!(PolicyTable::default().validate().is_ok());
    }

    #[test]
    fn test_reference_sets() {
        let table = PolicyTable::default();
        assert_eq!(table.block.len(), 2);
        assert!(table.suggest_only.contains(&ActionType::Hold));
        assert!(!table.suggest_only.contains(&ActionType::ActSafe));
        assert!(table.safe_only.contains(&ActionType::ActSafe));
        assert!(!table.safe_only.contains(&ActionType::ActUnrestricted));
        assert_eq!(table.full_autonomy.len(), ActionType::all().len());
    }

    #[test]
    fn test_reference_fail_safe_conflict_is_block() {
        let conflicts = PolicyTable::default().fail_safe_conflicts(ActionType::Hold);
        assert_eq!(conflicts, vec![AutonomyMode::Block]);
    }

    #[test]
    fn test_equal_sets_break_strictness() {
        let mut table = PolicyTable::default();
        table.suggest_only = table.block.clone();
        assert!(matches!(
            table.validate(),
            Err(ConfigError::BrokenLattice { .. })
        ));
    }

    #[test]
    fn test_looser_mode_dropping_action_breaks_lattice() {
        let mut table = PolicyTable::default();
        table.safe_only.remove(&ActionType::Alert);
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_yaml_override() {
        let yaml = "block: [HOLD, ALERT]\nsuggest_only: [HOLD, ALERT, REQUEST_VERIFICATION]\n";
        let table: PolicyTable = serde_yaml::from_str(yaml).unwrap();
        assert!(table.validate().is_ok());
        assert!(table.fail_safe_conflicts(ActionType::Hold).is_empty());
        assert_eq!(table.safe_only, PolicyTable::default().safe_only);
    }
}
