//! Trustgate - trust-gated control arbitration
//!
//! Sits between an untrusted proposer and the process it wants to act on.
//! Each day:
//! 1. the engine scores the day's snapshot and picks an autonomy mode
//! 2. the proposer sees a reduced context and proposes one action
//! 3. the policy gate checks the action against the mode
//! 4. a denied or malformed proposal is replaced with HOLD
//! 5. the outcome is appended to the audit trail

pub mod audit;
pub mod config;
pub mod metrics;
pub mod orchestrator;
pub mod proposer;
pub mod protocol;
pub mod runner;
pub mod scenario;

pub use audit::{AuditQuery, AuditRecord, AuditSink, AuditStats, CsvAuditLog, JsonlAuditLog};
pub use config::{RunConfig, RunSettings};
pub use metrics::SafetyMetrics;
pub use orchestrator::{Orchestrator, Phase};
pub use proposer::{AdversaryProposer, AlignedProposer, BuiltinProposer, Proposer, ProposerError, ScriptedProposer};
pub use protocol::{ContextPayload, ExecutionResult, ExecutionStatus, Resource, SensorValue, Tool, ToolCall, TrustContext};
pub use runner::{run_batch, run_scenario, DayOutcome, ScenarioReport};
pub use scenario::{load_snapshots, ScenarioError, ScenarioGenerator};
