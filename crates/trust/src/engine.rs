//! Trust assessment engine
//!
//! Turns one snapshot per day into a `TrustAssessment`. Detectors run in a
//! fixed order: staleness, timestamp integrity, statistical outlier, drift,
//! physical consistency. Order only matters for drift, which is skipped
//! (state untouched) on any day that already has a range violation.

use tracing::{debug, warn};
use trustgate_core::{ConfigError, Flag, Snapshot, TrustAssessment, TrustFlags};

use crate::config::EngineConfig;
use crate::detectors::{cusum_step, has_timestamp_anomaly, is_outlier, is_stale, violates_cold_growth_bound};
use crate::state::DetectorState;

/// Anything that can assess a day of sensor data
pub trait TrustEngine {
    /// Evaluate the next day. Must be called once per day, in day order.
    fn evaluate(&mut self, snapshot: &Snapshot) -> TrustAssessment;
}

/// The stateful engine. One instance per scenario.
#[derive(Debug, Clone)]
pub struct TrustAssessmentEngine {
    config: EngineConfig,
    state: DetectorState,
}

impl TrustAssessmentEngine {
    /// Create an engine, rejecting malformed configuration
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            state: DetectorState::default(),
        })
    }

    /// Resume from a previously saved state
    pub fn with_state(config: EngineConfig, state: DetectorState) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read-only view of detector internals (diagnostics and checkpoints)
    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    /// Forget all history, as if no day had been evaluated
    pub fn reset(&mut self) {
        self.state.reset();
    }

    fn detect(&mut self, snapshot: &Snapshot) -> TrustFlags {
        let cfg = &self.config;
        let mut flags = TrustFlags::default();

        // 1. Staleness
        let missing = snapshot.missing_count();
        let run = self.state.record_missing(missing);
        flags.stale_data = is_stale(run, cfg.stale_limit);

        // 2. Timestamp integrity
        flags.timestamp_anomaly = has_timestamp_anomaly(snapshot);

        // 3. Statistical outlier
        flags.range_violation = cfg.baselines.iter().any(|(sensor_id, baseline)| {
            snapshot
                .value(sensor_id)
                .map_or(false, |v| is_outlier(v, baseline, cfg.thresholds.z_score))
        });

        // 4. Drift, pre-empted by a spike on the same day
        if !flags.range_violation {
            let drift_sensor = cfg.sensors.drift.as_str();
            if let (Some(value), Some(baseline)) = (snapshot.value(drift_sensor), cfg.baseline(drift_sensor)) {
                let step = cusum_step(
                    value,
                    baseline,
                    cfg.thresholds.cusum_k,
                    cfg.thresholds.cusum_h,
                    self.state.cusum,
                );
                self.state.cusum = step.accumulator;
                flags.drift_suspected = step.drift;
            }
        }

        // 5. Physical consistency
        let growth = snapshot.value(&cfg.sensors.growth);
        let temperature = snapshot.value(&cfg.sensors.temperature);
        if let (Some(growth), Some(temperature)) = (growth, temperature) {
            flags.inconsistent_signals = violates_cold_growth_bound(
                growth,
                temperature,
                cfg.thresholds.residual_growth,
                cfg.thresholds.cold_stress_temp,
            );
        }

        flags
    }

    fn score(&mut self, flags: &TrustFlags, missing: usize) -> f64 {
        let deductions: f64 = flags
            .active()
            .into_iter()
            .map(|flag: Flag| self.config.penalties.weight(flag))
            .sum();
        let mut score = 1.0 - deductions;

        if missing > 0 {
            score = score.min(self.state.previous_score * self.config.missing_decay);
        }

        let score = score.clamp(0.0, 1.0);
        self.state.previous_score = score;
        score
    }
}

impl TrustEngine for TrustAssessmentEngine {
    fn evaluate(&mut self, snapshot: &Snapshot) -> TrustAssessment {
        if let Some(last) = self.state.last_day {
            if snapshot.day <= last {
                warn!(
                    "Snapshot for day {} evaluated after day {}; detector state assumes increasing days",
                    snapshot.day, last
                );
            }
        }
        self.state.last_day = Some(snapshot.day);

        let flags = self.detect(snapshot);
        let score = self.score(&flags, snapshot.missing_count());
        let mode = self.config.autonomy_levels.mode_for(score);

        let raised = flags.joined("|");
        debug!(
            day = snapshot.day,
            score,
            mode = %mode,
            flags = %raised,
            s_pos = self.state.cusum.s_pos,
            s_neg = self.state.cusum.s_neg,
            "Assessed snapshot"
        );

        TrustAssessment::new(snapshot.day, score, mode, flags)
    }
}
