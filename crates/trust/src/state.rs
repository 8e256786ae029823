//! Detector state carried between days

use serde::{Deserialize, Serialize};

/// Two-sided CUSUM accumulators. Both sides are always >= 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CusumAccumulator {
    pub s_pos: f64,
    pub s_neg: f64,
}

/// Everything the engine remembers from previous days.
///
/// Owned by exactly one engine. Serializable so a run can be checkpointed,
/// but never shown to the proposer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorState {
    /// Days in a row with at least one missing reading
    pub consecutive_missing: u32,
    /// Drift accumulators for the drift channel
    pub cusum: CusumAccumulator,
    /// Post-clamp score of the previous day
    pub previous_score: f64,
    /// Last evaluated day, used to catch out-of-order ingest
    pub last_day: Option<u32>,
}

impl Default for DetectorState {
    fn default() -> Self {
        Self {
            consecutive_missing: 0,
            cusum: CusumAccumulator::default(),
            previous_score: 1.0,
            last_day: None,
        }
    }
}

impl DetectorState {
    /// Advance the missing-day counter. Returns the new count.
    pub fn record_missing(&mut self, missing_readings: usize) -> u32 {
        if missing_readings > 0 {
            self.consecutive_missing = self.consecutive_missing.saturating_add(1);
        } else {
            self.consecutive_missing = 0;
        }
        self.consecutive_missing
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
