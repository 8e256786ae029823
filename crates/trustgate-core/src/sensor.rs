//! Sensor readings and daily snapshots

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single sensor reading. `value` is meaningless when `is_missing` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub sensor_id: String,
    /// Day the sensor itself stamped on the reading
    pub timestamp_day: u32,
    pub value: f64,
    #[serde(default)]
    pub is_missing: bool,
}

impl SensorReading {
    /// A present reading
    pub fn new(sensor_id: impl Into<String>, timestamp_day: u32, value: f64) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            timestamp_day,
            value,
            is_missing: false,
        }
    }

    /// A reading that did not arrive
    pub fn missing(sensor_id: impl Into<String>, timestamp_day: u32) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            timestamp_day,
            value: 0.0,
            is_missing: true,
        }
    }

    /// The value, if the reading is present
    pub fn present_value(&self) -> Option<f64> {
        if self.is_missing {
            None
        } else {
            Some(self.value)
        }
    }
}

/// All readings for one simulated day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub day: u32,
    pub readings: BTreeMap<String, SensorReading>,
}

impl Snapshot {
    pub fn new(day: u32) -> Self {
        Self {
            day,
            readings: BTreeMap::new(),
        }
    }

    /// Builder-style insert, keyed by the reading's sensor id
    pub fn with_reading(mut self, reading: SensorReading) -> Self {
        self.insert(reading);
        self
    }

    pub fn insert(&mut self, reading: SensorReading) {
        self.readings.insert(reading.sensor_id.clone(), reading);
    }

    pub fn get(&self, sensor_id: &str) -> Option<&SensorReading> {
        self.readings.get(sensor_id)
    }

    /// Value of a sensor, if it exists and is present
    pub fn value(&self, sensor_id: &str) -> Option<f64> {
        self.get(sensor_id).and_then(SensorReading::present_value)
    }

    /// Number of readings flagged as missing
    pub fn missing_count(&self) -> usize {
        self.readings.values().filter(|r| r.is_missing).count()
    }
}

/// Nominal distribution of a sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub mean: f64,
    pub std: f64,
}

impl Baseline {
    pub fn new(mean: f64, std: f64) -> Self {
        Self { mean, std }
    }

    /// Standardized deviation of `value`. `None` when std is zero, which
    /// disables every z-based test for the sensor.
    pub fn z_score(&self, value: f64) -> Option<f64> {
        if self.std == 0.0 {
            return None;
        }
        Some((value - self.mean) / self.std)
    }
}
