//! Trustgate Core - Shared data model for the trust-gated control loop
//!
//! A monitored process produces one sensor snapshot per day. The trust
//! engine turns snapshots into a bounded trust score, the policy gate maps
//! the resulting autonomy mode to an authorized action set, and the
//! orchestrator decides what actually executes.
//!
//! This crate holds the vocabulary shared by all three.

pub mod action;
pub mod assessment;
pub mod error;
pub mod mode;
pub mod paths;
pub mod sensor;

pub use action::{ActionType, FAIL_SAFE_ACTION};
pub use assessment::{Flag, TrustAssessment, TrustFlags};
pub use error::{ConfigError, GateError};
pub use mode::AutonomyMode;
pub use paths::Paths;
pub use sensor::{Baseline, SensorReading, Snapshot};
