//! Pure anomaly detectors
//!
//! Each detector is a plain function over one day's data. Anything that
//! needs memory across days takes and returns its state explicitly; the
//! engine owns that state.

use trustgate_core::{Baseline, Snapshot};

use crate::state::CusumAccumulator;

/// Stale data is a trailing signal: it fires only once the run of
/// consecutive days with missing readings reaches `limit`.
pub fn is_stale(consecutive_missing: u32, limit: u32) -> bool {
    consecutive_missing >= limit
}

/// Any present reading stamped with a day other than the snapshot's own
pub fn has_timestamp_anomaly(snapshot: &Snapshot) -> bool {
    snapshot
        .readings
        .values()
        .any(|r| !r.is_missing && r.timestamp_day != snapshot.day)
}

/// Statistical outlier test. A zero-std baseline never fires.
pub fn is_outlier(value: f64, baseline: &Baseline, threshold: f64) -> bool {
    match baseline.z_score(value) {
        Some(z) => z.abs() > threshold,
        None => false,
    }
}

/// Outcome of one CUSUM step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CusumStep {
    pub drift: bool,
    pub accumulator: CusumAccumulator,
}

/// Two-sided CUSUM update on the standardized value.
///
/// With a zero-std baseline the accumulator is returned unchanged and no
/// drift is reported.
pub fn cusum_step(value: f64, baseline: &Baseline, k: f64, h: f64, acc: CusumAccumulator) -> CusumStep {
    let Some(z) = baseline.z_score(value) else {
        return CusumStep {
            drift: false,
            accumulator: acc,
        };
    };

    let accumulator = CusumAccumulator {
        s_pos: (acc.s_pos + z - k).max(0.0),
        s_neg: (acc.s_neg - z - k).max(0.0),
    };

    CusumStep {
        drift: accumulator.s_pos > h || accumulator.s_neg > h,
        accumulator,
    }
}

/// Growth is physically bounded under cold stress. A growth reading above
/// `growth_bound` while temperature sits below `cold_boundary` is
/// inconsistent.
pub fn violates_cold_growth_bound(growth: f64, temperature: f64, growth_bound: f64, cold_boundary: f64) -> bool {
    temperature < cold_boundary && growth > growth_bound
}
