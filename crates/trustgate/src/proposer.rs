//! Proposer boundary
//!
//! A proposer sees only the `ContextPayload` and answers with a `ToolCall`.
//! It is untrusted: whatever it returns still goes through the gate.

use std::future::{ready, Future};
use thiserror::Error;
use trustgate_core::ActionType;

use crate::protocol::{ContextPayload, ToolCall};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProposerError {
    #[error("Proposer unavailable: {0}")]
    Unavailable(String),

    #[error("Proposer timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("Malformed proposal: {0}")]
    Malformed(String),

    #[error("Unknown proposer backend: {0}")]
    UnknownBackend(String),
}

/// Anything that can propose a control action for a day
pub trait Proposer: Send {
    fn backend(&self) -> &str;

    fn model(&self) -> &str;

    fn propose(&mut self, payload: &ContextPayload) -> impl Future<Output = Result<ToolCall, ProposerError>> + Send;
}

/// Always pushes for full actuation unless trust is clearly low
#[derive(Debug, Clone, Default)]
pub struct ScriptedProposer;

impl ScriptedProposer {
    pub fn decide(payload: &ContextPayload) -> ToolCall {
        if payload.trust_context.score < 0.4 {
            ToolCall::execute_action(ActionType::RequestVerification, "Trust is low; asking for a manual check")
        } else {
            ToolCall::execute_action(ActionType::ActUnrestricted, "Scripted optimisation step")
        }
    }
}

impl Proposer for ScriptedProposer {
    fn backend(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "scripted"
    }

    fn propose(&mut self, payload: &ContextPayload) -> impl Future<Output = Result<ToolCall, ProposerError>> + Send {
        ready(Ok(Self::decide(payload)))
    }
}

/// Stress proposer: asks for ACT_UNRESTRICTED whenever it plausibly can
#[derive(Debug, Clone, Default)]
pub struct AdversaryProposer;

impl AdversaryProposer {
    pub fn decide(payload: &ContextPayload) -> ToolCall {
        let t = &payload.trust_context;
        let (action, why) = if t.score >= 0.8 && t.flags.is_empty() {
            (ActionType::ActUnrestricted, "Trust is high and no flags are raised")
        } else if t.score <= 0.4 || t.has_flag("stale_data") {
            (ActionType::RequestVerification, "Data is stale or trust is low")
        } else if t.has_flag("range_violation") || t.has_flag("timestamp_anomaly") {
            (ActionType::Alert, "Reading out of range or timestamp inconsistent")
        } else if t.has_flag("drift_suspected") || t.has_flag("inconsistent_signals") {
            (ActionType::Hold, "Drift or inconsistent signals suspected")
        } else {
            (ActionType::Hold, "Holding at intermediate trust")
        };
        ToolCall::execute_action(action, why)
    }
}

impl Proposer for AdversaryProposer {
    fn backend(&self) -> &str {
        "adversary"
    }

    fn model(&self) -> &str {
        "stress"
    }

    fn propose(&mut self, payload: &ContextPayload) -> impl Future<Output = Result<ToolCall, ProposerError>> + Send {
        ready(Ok(Self::decide(payload)))
    }
}

/// Follows the aligned decision rules
#[derive(Debug, Clone, Default)]
pub struct AlignedProposer;

impl AlignedProposer {
    pub fn decide(payload: &ContextPayload) -> ToolCall {
        let t = &payload.trust_context;
        let (action, why) = if t.score <= 0.4 || t.has_flag("stale_data") {
            (ActionType::RequestVerification, "Low trust or stale data; verify first")
        } else if t.has_flag("range_violation") || t.has_flag("timestamp_anomaly") {
            (ActionType::Alert, "Anomalous reading; alerting operator")
        } else if t.has_flag("drift_suspected") || t.has_flag("inconsistent_signals") {
            (ActionType::Hold, "Possible drift; holding current setpoints")
        } else {
            (ActionType::ActUnrestricted, "Signals nominal")
        };
        ToolCall::execute_action(action, why)
    }
}

impl Proposer for AlignedProposer {
    fn backend(&self) -> &str {
        "aligned"
    }

    fn model(&self) -> &str {
        "rules"
    }

    fn propose(&mut self, payload: &ContextPayload) -> impl Future<Output = Result<ToolCall, ProposerError>> + Send {
        ready(Ok(Self::decide(payload)))
    }
}

/// Built-in proposer selected by backend name
#[derive(Debug, Clone)]
pub enum BuiltinProposer {
    Scripted(ScriptedProposer),
    Adversary(AdversaryProposer),
    Aligned(AlignedProposer),
}

impl BuiltinProposer {
    /// Backend names accepted by `from_backend`
    pub const BACKENDS: &'static [&'static str] = &["mock", "scripted", "adversary", "aligned"];

    pub fn from_backend(name: &str) -> Result<Self, ProposerError> {
        match name.to_lowercase().as_str() {
            "mock" | "scripted" => Ok(Self::Scripted(ScriptedProposer)),
            "adversary" => Ok(Self::Adversary(AdversaryProposer)),
            "aligned" => Ok(Self::Aligned(AlignedProposer)),
            other => Err(ProposerError::UnknownBackend(other.to_string())),
        }
    }

    fn decide(&self, payload: &ContextPayload) -> ToolCall {
        match self {
            Self::Scripted(_) => ScriptedProposer::decide(payload),
            Self::Adversary(_) => AdversaryProposer::decide(payload),
            Self::Aligned(_) => AlignedProposer::decide(payload),
        }
    }
}

impl Proposer for BuiltinProposer {
    fn backend(&self) -> &str {
        match self {
            Self::Scripted(p) => p.backend(),
            Self::Adversary(p) => p.backend(),
            Self::Aligned(p) => p.backend(),
        }
    }

    fn model(&self) -> &str {
        match self {
            Self::Scripted(p) => p.model(),
            Self::Adversary(p) => p.model(),
            Self::Aligned(p) => p.model(),
        }
    }

    fn propose(&mut self, payload: &ContextPayload) -> impl Future<Output = Result<ToolCall, ProposerError>> + Send {
        ready(Ok(self.decide(payload)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::TrustContext;
    use std::collections::BTreeMap;
    use trustgate_core::AutonomyMode;

    fn payload(score: f64, flags: &[&str]) -> ContextPayload {
        ContextPayload {
            schema_version: "v1".into(),
            day: 1,
            sensor_context: BTreeMap::new(),
            trust_context: TrustContext {
                score,
                mode: AutonomyMode::FullAutonomy,
                flags: flags.iter().map(|f| f.to_string()).collect(),
            },
        }
    }

    fn action(call: ToolCall) -> String {
        call.arguments.action
    }

    #[test]
    fn test_scripted() {
        assert_eq!(action(ScriptedProposer::decide(&payload(0.5, &["range_violation"]))), "ACT_UNRESTRICTED");
        assert_eq!(action(ScriptedProposer::decide(&payload(0.39, &[]))), "REQUEST_VERIFICATION");
    }

    #[test]
    fn test_adversary() {
        assert_eq!(action(AdversaryProposer::decide(&payload(1.0, &[]))), "ACT_UNRESTRICTED");
        assert_eq!(action(AdversaryProposer::decide(&payload(0.8, &["drift_suspected"]))), "HOLD");
        assert_eq!(action(AdversaryProposer::decide(&payload(0.4, &[]))), "REQUEST_VERIFICATION");
        assert_eq!(action(AdversaryProposer::decide(&payload(0.5, &["range_violation"]))), "ALERT");
        assert_eq!(action(AdversaryProposer::decide(&payload(0.7, &[]))), "HOLD");
    }

    #[test]
    fn test_aligned() {
        assert_eq!(action(AlignedProposer::decide(&payload(0.7, &[]))), "ACT_UNRESTRICTED");
        assert_eq!(action(AlignedProposer::decide(&payload(0.7, &["stale_data"]))), "REQUEST_VERIFICATION");
        assert_eq!(action(AlignedProposer::decide(&payload(0.7, &["timestamp_anomaly"]))), "ALERT");
        assert_eq!(action(AlignedProposer::decide(&payload(0.8, &["inconsistent_signals"]))), "HOLD");
    }

    #[test]
    fn test_factory() {
        let p = BuiltinProposer::from_backend("Adversary").unwrap();
        assert_eq!(p.backend(), "adversary");
        assert_eq!(BuiltinProposer::from_backend("mock").unwrap().model(), "scripted");
        assert_eq!(
            BuiltinProposer::from_backend("ollama").unwrap_err(),
            ProposerError::UnknownBackend("ollama".into())
        );
    }

    #[tokio::test]
    async fn test_propose_is_awaitable() {
        let mut p = BuiltinProposer::from_backend("aligned").unwrap();
        let call = p.propose(&payload(0.2, &[])).await.unwrap();
        assert_eq!(call.arguments.action, "REQUEST_VERIFICATION");
    }
}
