//! Trust engine configuration
//!
//! Thresholds, penalty weights, autonomy floors and sensor baselines are
//! supplied externally and are immutable for a run. Values missing from a
//! YAML file fall back to the documented defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use trustgate_core::{AutonomyMode, Baseline, ConfigError, Flag};

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Detector thresholds
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Score deduction per raised flag
    #[serde(default)]
    pub penalties: Penalties,

    /// Score floors for each autonomy mode
    #[serde(default)]
    pub autonomy_levels: AutonomyLevels,

    /// Nominal distribution per sensor id
    #[serde(default = "default_baselines")]
    pub baselines: BTreeMap<String, Baseline>,

    /// Consecutive days with missing readings before `stale_data` is raised
    #[serde(default = "default_stale_limit")]
    pub stale_limit: u32,

    /// Cap on today's score as a fraction of yesterday's when data is missing
    #[serde(default = "default_missing_decay")]
    pub missing_decay: f64,

    /// Which sensor ids feed the drift and physics detectors
    #[serde(default)]
    pub sensors: SensorRoles,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            penalties: Penalties::default(),
            autonomy_levels: AutonomyLevels::default(),
            baselines: default_baselines(),
            stale_limit: default_stale_limit(),
            missing_decay: default_missing_decay(),
            sensors: SensorRoles::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file, or defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read engine config from {:?}", path))?;
            let config: Self = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse engine config from {:?}", path))?;
            config
                .validate()
                .with_context(|| format!("Invalid engine config in {:?}", path))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Check every invariant the engine relies on
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.penalties.validate()?;
        self.autonomy_levels.validate()?;
        self.thresholds.validate()?;

        for (sensor, baseline) in &self.baselines {
            if !baseline.std.is_finite() || baseline.std < 0.0 || !baseline.mean.is_finite() {
                return Err(ConfigError::InvalidBaseline {
                    sensor: sensor.clone(),
                    std: baseline.std,
                });
            }
        }

        if self.stale_limit == 0 {
            return Err(ConfigError::ZeroStaleLimit);
        }

        if !(0.0..=1.0).contains(&self.missing_decay) {
            return Err(ConfigError::InvalidThreshold {
                name: "missing_decay",
                value: self.missing_decay,
            });
        }

        Ok(())
    }

    pub fn baseline(&self, sensor_id: &str) -> Option<&Baseline> {
        self.baselines.get(sensor_id)
    }
}

/// Detector thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// |z| above this is a range violation
    #[serde(default = "default_z_score")]
    pub z_score: f64,

    /// CUSUM slack per step
    #[serde(default = "default_cusum_k")]
    pub cusum_k: f64,

    /// CUSUM decision interval
    #[serde(default = "default_cusum_h")]
    pub cusum_h: f64,

    /// Highest plausible growth reading under cold stress
    #[serde(default = "default_residual_growth")]
    pub residual_growth: f64,

    /// Temperature below which cold stress applies
    #[serde(default = "default_cold_stress_temp")]
    pub cold_stress_temp: f64,
}

fn default_z_score() -> f64 {
    3.0
}

fn default_cusum_k() -> f64 {
    0.5
}

fn default_cusum_h() -> f64 {
    5.0
}

fn default_residual_growth() -> f64 {
    0.8
}

fn default_cold_stress_temp() -> f64 {
    28.0
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            z_score: default_z_score(),
            cusum_k: default_cusum_k(),
            cusum_h: default_cusum_h(),
            residual_growth: default_residual_growth(),
            cold_stress_temp: default_cold_stress_temp(),
        }
    }
}

impl Thresholds {
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        let positive = [("z_score", self.z_score), ("cusum_h", self.cusum_h)];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
        if !self.cusum_k.is_finite() || self.cusum_k < 0.0 {
            return Err(ConfigError::InvalidThreshold {
                name: "cusum_k",
                value: self.cusum_k,
            });
        }
        let finite = [
            ("residual_growth", self.residual_growth),
            ("cold_stress_temp", self.cold_stress_temp),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
        Ok(())
    }
}

/// Penalty weights, one per flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Penalties {
    #[serde(default = "default_penalty_timestamp")]
    pub timestamp_anomaly: f64,
    #[serde(default = "default_penalty_range")]
    pub range_violation: f64,
    #[serde(default = "default_penalty_stale")]
    pub stale_data: f64,
    #[serde(default = "default_penalty_inconsistent")]
    pub inconsistent_signals: f64,
    #[serde(default = "default_penalty_drift")]
    pub drift_suspected: f64,
}

fn default_penalty_timestamp() -> f64 {
    1.0
}

fn default_penalty_range() -> f64 {
    0.5
}

fn default_penalty_stale() -> f64 {
    0.6
}

fn default_penalty_inconsistent() -> f64 {
    0.3
}

fn default_penalty_drift() -> f64 {
    0.2
}

impl Default for Penalties {
    fn default() -> Self {
        Self {
            timestamp_anomaly: default_penalty_timestamp(),
            range_violation: default_penalty_range(),
            stale_data: default_penalty_stale(),
            inconsistent_signals: default_penalty_inconsistent(),
            drift_suspected: default_penalty_drift(),
        }
    }
}

impl Penalties {
    /// Weight deducted when `flag` is raised
    pub fn weight(&self, flag: Flag) -> f64 {
        match flag {
            Flag::RangeViolation => self.range_violation,
            Flag::DriftSuspected => self.drift_suspected,
            Flag::StaleData => self.stale_data,
            Flag::TimestampAnomaly => self.timestamp_anomaly,
            Flag::InconsistentSignals => self.inconsistent_signals,
        }
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        for flag in Flag::all() {
            let value = self.weight(*flag);
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidPenalty {
                    name: flag.as_str(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Minimum score for each autonomy mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutonomyLevels {
    #[serde(default = "default_floor_full")]
    pub full: f64,
    #[serde(default = "default_floor_safe")]
    pub safe: f64,
    #[serde(default = "default_floor_suggest")]
    pub suggest: f64,
    #[serde(default)]
    pub block: f64,
}

fn default_floor_full() -> f64 {
    0.8
}

fn default_floor_safe() -> f64 {
    0.6
}

fn default_floor_suggest() -> f64 {
    0.4
}

impl Default for AutonomyLevels {
    fn default() -> Self {
        Self {
            full: default_floor_full(),
            safe: default_floor_safe(),
            suggest: default_floor_suggest(),
            block: 0.0,
        }
    }
}

impl AutonomyLevels {
    /// Highest tier whose floor the score meets; BLOCK below every floor
    pub fn mode_for(&self, score: f64) -> AutonomyMode {
        if score >= self.full {
            AutonomyMode::FullAutonomy
        } else if score >= self.safe {
            AutonomyMode::SafeOnly
        } else if score >= self.suggest {
            AutonomyMode::SuggestOnly
        } else {
            AutonomyMode::Block
        }
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        let floors = [
            ("full", self.full),
            ("safe", self.safe),
            ("suggest", self.suggest),
            ("block", self.block),
        ];
        for (name, value) in floors {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::FloorOutOfRange { name, value });
            }
        }

        if !(self.full > self.safe && self.safe > self.suggest && self.suggest >= self.block) {
            return Err(ConfigError::NonMonotonicFloors {
                full: self.full,
                safe: self.safe,
                suggest: self.suggest,
                block: self.block,
            });
        }
        Ok(())
    }
}

/// Sensor ids with a special role in the detectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRoles {
    /// Channel fed to the CUSUM drift detector
    #[serde(default = "default_drift_sensor")]
    pub drift: String,
    #[serde(default = "default_growth_sensor")]
    pub growth: String,
    #[serde(default = "default_temperature_sensor")]
    pub temperature: String,
}

fn default_drift_sensor() -> String {
    "ph".to_string()
}

fn default_growth_sensor() -> String {
    "growth".to_string()
}

fn default_temperature_sensor() -> String {
    "temp".to_string()
}

impl Default for SensorRoles {
    fn default() -> Self {
        Self {
            drift: default_drift_sensor(),
            growth: default_growth_sensor(),
            temperature: default_temperature_sensor(),
        }
    }
}

fn default_baselines() -> BTreeMap<String, Baseline> {
    let mut baselines = BTreeMap::new();
    baselines.insert("ph".to_string(), Baseline::new(10.0, 0.05));
    baselines.insert("temp".to_string(), Baseline::new(32.0, 0.5));
    baselines
}

fn default_stale_limit() -> u32 {
    2
}

fn default_missing_decay() -> f64 {
    0.8
}
