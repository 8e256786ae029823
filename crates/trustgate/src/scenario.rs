//! Seeded sensor scenarios
//!
//! Nominal Gaussian readings for ph, temp, ec and growth, with one fault
//! pattern injected per scenario id. Each scenario draws from its own RNG
//! so the same id yields the same snapshots regardless of batch order.

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::path::Path;
use thiserror::Error;
use trustgate_core::{Baseline, SensorReading, Snapshot};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScenarioError {
    #[error("Unknown scenario: {0} (expected one of S1..S8)")]
    Unknown(String),

    #[error("Invalid noise distribution for {sensor}: {reason}")]
    Distribution { sensor: String, reason: String },
}

/// Scenario ids with a one-line description
pub const SCENARIOS: &[(&str, &str)] = &[
    ("S1", "nominal"),
    ("S2", "pH spike to 12.0 on day 3"),
    ("S3", "pH drift, plateau at +0.14 from day 3"),
    ("S4", "ec missing on days 3-4"),
    ("S5", "growth 1.2 under cold stress (20.0) on day 5"),
    ("S6", "pH timestamp skew on day 4"),
    ("S7", "pH step to 10.2 from day 2"),
    ("S8", "pH offset 10.12 from day 2, ec missing days 5-6"),
];

/// Sensors and their nominal distributions, in draw order
const NOMINAL: &[(&str, Baseline)] = &[
    ("ph", Baseline { mean: 10.0, std: 0.05 }),
    ("temp", Baseline { mean: 32.0, std: 0.5 }),
    ("ec", Baseline { mean: 1.5, std: 0.1 }),
    ("growth", Baseline { mean: 1.0, std: 0.1 }),
];

pub fn is_known(scenario_id: &str) -> bool {
    SCENARIOS.iter().any(|(id, _)| *id == scenario_id)
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in s.bytes() {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioGenerator {
    seed: u64,
    duration_days: u32,
}

impl ScenarioGenerator {
    pub fn new(seed: u64, duration_days: u32) -> Self {
        Self { seed, duration_days }
    }

    pub fn duration_days(&self) -> u32 {
        self.duration_days
    }

    /// Snapshots for days `0..duration_days`
    pub fn generate(&self, scenario_id: &str) -> Result<Vec<Snapshot>, ScenarioError> {
        if !is_known(scenario_id) {
            return Err(ScenarioError::Unknown(scenario_id.to_string()));
        }

        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(fnv1a(scenario_id)));
        let days = self.duration_days as usize;
        let mut series: Vec<Vec<f64>> = Vec::with_capacity(NOMINAL.len());
        for (sensor, b) in NOMINAL {
            let normal = Normal::new(b.mean, b.std).map_err(|e| ScenarioError::Distribution {
                sensor: sensor.to_string(),
                reason: e.to_string(),
            })?;
            series.push((0..days).map(|_| normal.sample(&mut rng)).collect());
        }

        let snapshots = (0..self.duration_days)
            .map(|day| {
                let mut snap = Snapshot::new(day);
                for ((sensor, _), values) in NOMINAL.iter().zip(&series) {
                    let nominal = values[day as usize];
                    snap.insert(inject(scenario_id, sensor, day, nominal));
                }
                snap
            })
            .collect();

        Ok(snapshots)
    }
}

fn inject(scenario_id: &str, sensor: &str, day: u32, nominal: f64) -> SensorReading {
    let mut value = nominal;
    let mut timestamp_day = day;
    let mut is_missing = false;

    match (scenario_id, sensor) {
        ("S2", "ph") if day == 3 => value = 12.0,
        ("S3", "ph") if day >= 1 => value = 10.0 + if day >= 3 { 0.14 } else { 0.05 * day as f64 },
        ("S4", "ec") if day == 3 || day == 4 => is_missing = true,
        ("S5", "growth") if day == 5 => value = 1.2,
        ("S5", "temp") if day == 5 => value = 20.0,
        ("S6", "ph") if day == 4 => timestamp_day = 2,
        ("S7", "ph") if day >= 2 => value = 10.2,
        ("S8", "ph") if day >= 2 => value = 10.12,
        ("S8", "ec") if day == 5 || day == 6 => is_missing = true,
        _ => {}
    }

    SensorReading {
        sensor_id: sensor.to_string(),
        timestamp_day,
        value,
        is_missing,
    }
}

/// Load snapshots from a JSON array; days must be strictly increasing
pub fn load_snapshots(path: &Path) -> Result<Vec<Snapshot>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshots from {:?}", path))?;
    let snapshots: Vec<Snapshot> =
        serde_json::from_str(&content).with_context(|| format!("Failed to parse snapshots in {:?}", path))?;

    for pair in snapshots.windows(2) {
        if pair[1].day <= pair[0].day {
            bail!(
                "Snapshots in {:?} are out of order: day {} follows day {}",
                path,
                pair[1].day,
                pair[0].day
            );
        }
    }
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_deterministic() {
        let g = ScenarioGenerator::new(42, 10);
        assert_eq!(g.generate("S1").unwrap(), g.generate("S1").unwrap());
        assert_ne!(g.generate("S1").unwrap(), ScenarioGenerator::new(7, 10).generate("S1").unwrap());
    }

    #[test]
    fn test_unknown_scenario() {
        let g = ScenarioGenerator::new(42, 10);
        assert_eq!(g.generate("S9"), Err(ScenarioError::Unknown("S9".into())));
    }

    #[test]
    fn test_fault_injection() {
        let g = ScenarioGenerator::new(42, 10);

        let s2 = g.generate("S2").unwrap();
        assert_eq!(s2.len(), 10);
        assert_eq!(s2[3].value("ph"), Some(12.0));

        let s3 = g.generate("S3").unwrap();
        assert!((s3[2].value("ph").unwrap() - 10.1).abs() < 1e-9);
        assert!((s3[7].value("ph").unwrap() - 10.14).abs() < 1e-9);

        let s4 = g.generate("S4").unwrap();
        assert_eq!(s4[3].missing_count(), 1);
        assert_eq!(s4[5].missing_count(), 0);

        let s5 = g.generate("S5").unwrap();
        assert_eq!(s5[5].value("temp"), Some(20.0));

        let s6 = g.generate("S6").unwrap();
        assert_eq!(s6[4].get("ph").unwrap().timestamp_day, 2);

        let s8 = g.generate("S8").unwrap();
        assert_eq!(s8[6].value("ec"), None);
        assert_eq!(s8[6].value("ph"), Some(10.12));
    }

    #[test]
    fn test_nominal_noise_is_plausible() {
        let s1 = ScenarioGenerator::new(42, 50).generate("S1").unwrap();
        let mean = s1.iter().filter_map(|s| s.value("ph")).sum::<f64>() / 50.0;
        assert!((mean - 10.0).abs() < 0.05);

        let temps: Vec<f64> = s1.iter().filter_map(|s| s.value("temp")).collect();
        let t_mean = temps.iter().sum::<f64>() / temps.len() as f64;
        let t_std = (temps.iter().map(|t| (t - t_mean).powi(2)).sum::<f64>() / (temps.len() - 1) as f64).sqrt();
        assert!((0.3..0.7).contains(&t_std), "temp std {}", t_std);
    }

    #[test]
    fn test_load_snapshots() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("days.json");
        let snaps = ScenarioGenerator::new(1, 3).generate("S1").unwrap();
        std::fs::write(&path, serde_json::to_string(&snaps).unwrap()).unwrap();
        assert_eq!(load_snapshots(&path).unwrap().len(), 3);

        let reversed: Vec<_> = snaps.into_iter().rev().collect();
        std::fs::write(&path, serde_json::to_string(&reversed).unwrap()).unwrap();
        assert!(load_snapshots(&path).is_err());
    }
}
