//! Trust assessments and their anomaly flags

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::mode::AutonomyMode;

/// The five anomaly indicators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    RangeViolation,
    DriftSuspected,
    StaleData,
    TimestampAnomaly,
    InconsistentSignals,
}

impl Flag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::RangeViolation => "range_violation",
            Flag::DriftSuspected => "drift_suspected",
            Flag::StaleData => "stale_data",
            Flag::TimestampAnomaly => "timestamp_anomaly",
            Flag::InconsistentSignals => "inconsistent_signals",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "range_violation" => Some(Flag::RangeViolation),
            "drift_suspected" => Some(Flag::DriftSuspected),
            "stale_data" => Some(Flag::StaleData),
            "timestamp_anomaly" => Some(Flag::TimestampAnomaly),
            "inconsistent_signals" => Some(Flag::InconsistentSignals),
            _ => None,
        }
    }

    /// All flags in reporting order
    pub fn all() -> &'static [Self] {
        &[
            Flag::RangeViolation,
            Flag::DriftSuspected,
            Flag::StaleData,
            Flag::TimestampAnomaly,
            Flag::InconsistentSignals,
        ]
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Fixed record of the five anomaly flags for one day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustFlags {
    pub range_violation: bool,
    pub drift_suspected: bool,
    pub stale_data: bool,
    pub timestamp_anomaly: bool,
    pub inconsistent_signals: bool,
}

impl TrustFlags {
    pub fn get(&self, flag: Flag) -> bool {
        match flag {
            Flag::RangeViolation => self.range_violation,
            Flag::DriftSuspected => self.drift_suspected,
            Flag::StaleData => self.stale_data,
            Flag::TimestampAnomaly => self.timestamp_anomaly,
            Flag::InconsistentSignals => self.inconsistent_signals,
        }
    }

    pub fn set(&mut self, flag: Flag, value: bool) {
        match flag {
            Flag::RangeViolation => self.range_violation = value,
            Flag::DriftSuspected => self.drift_suspected = value,
            Flag::StaleData => self.stale_data = value,
            Flag::TimestampAnomaly => self.timestamp_anomaly = value,
            Flag::InconsistentSignals => self.inconsistent_signals = value,
        }
    }

    /// Raised flags in reporting order
    pub fn active(&self) -> Vec<Flag> {
        Flag::all().iter().copied().filter(|f| self.get(*f)).collect()
    }

    pub fn any(&self) -> bool {
        Flag::all().iter().any(|f| self.get(*f))
    }

    /// Names of raised flags joined with `sep` (empty string when clean)
    pub fn joined(&self, sep: &str) -> String {
        self.active()
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(sep)
    }
}

/// Result of evaluating one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustAssessment {
    pub day: u32,
    /// Always within [0, 1]
    pub trust_score: f64,
    pub autonomy_mode: AutonomyMode,
    pub flags: TrustFlags,
}

impl TrustAssessment {
    /// Build an assessment. The score is clamped into [0, 1]; NaN maps to 0.
    pub fn new(day: u32, trust_score: f64, autonomy_mode: AutonomyMode, flags: TrustFlags) -> Self {
        let trust_score = if trust_score.is_nan() {
            0.0
        } else {
            trust_score.clamp(0.0, 1.0)
        };
        Self {
            day,
            trust_score,
            autonomy_mode,
            flags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_get_set() {
        let mut flags = TrustFlags::default();
        assert!(!flags.any());
        flags.set(Flag::StaleData, true);
        flags.set(Flag::RangeViolation, true);
        assert!(flags.get(Flag::StaleData));
        assert_eq!(flags.active(), vec![Flag::RangeViolation, Flag::StaleData]);
        assert_eq!(flags.joined("|"), "range_violation|stale_data");
    }

    #[test]
    fn test_flags_serialize_all_five() {
        let value = serde_json::to_value(TrustFlags::default()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 5);
        for flag in Flag::all() {
            assert_eq!(obj[flag.as_str()], serde_json::Value::Bool(false));
        }
    }

    #[test]
    fn test_assessment_clamps_score() {
        let a = TrustAssessment::new(1, 1.7, AutonomyMode::FullAutonomy, TrustFlags::default());
        assert_eq!(a.trust_score, 1.0);
        let b = TrustAssessment::new(1, -0.3, AutonomyMode::Block, TrustFlags::default());
        assert_eq!(b.trust_score, 0.0);
        let c = TrustAssessment::new(1, f64::NAN, AutonomyMode::Block, TrustFlags::default());
        assert_eq!(c.trust_score, 0.0);
    }
}
