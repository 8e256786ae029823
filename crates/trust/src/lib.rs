//! Trust - Assessment engine for the trust-gated control loop
//!
//! Each day's sensor snapshot is run through a fixed chain of detectors:
//! - staleness (consecutive days with missing readings)
//! - timestamp integrity
//! - z-score outliers against known baselines
//! - CUSUM drift on the drift channel
//! - a cold-stress growth bound
//!
//! Raised flags deduct fixed penalties from a score of 1.0, missing data
//! caps the score relative to the previous day, and the score maps onto an
//! autonomy mode through configured floors.

pub mod config;
pub mod detectors;
pub mod engine;
pub mod state;

pub use config::EngineConfig;
pub use engine::{TrustAssessmentEngine, TrustEngine};
pub use state::{CusumAccumulator, DetectorState};
