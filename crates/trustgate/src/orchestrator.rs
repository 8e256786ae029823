//! The trust gate state machine
//!
//! Per day: `update_state` → `get_context_payload` → `execute_tool`.
//! The payload step may be skipped; a day is resolved exactly once.
//! A denied proposal is replaced by the fail-safe action. A malformed one
//! is recorded as an error, and the fail-safe action runs then too.

use gates::{Policy, PolicyGate};
use tracing::{debug, info, warn};
use trust::{TrustAssessmentEngine, TrustEngine};
use trustgate_core::{ActionType, GateError, Snapshot, TrustAssessment, FAIL_SAFE_ACTION};

use crate::protocol::{
    execute_action_tool, ContextPayload, ExecutionResult, ExecutionStatus, Resource, Tool, ToolCall,
    EXECUTE_ACTION_TOOL,
};

/// Where the orchestrator is within the current day.
///
/// `execute_tool` and `resolve_fail_safe` accept both `Assessed` and
/// `AwaitingProposal`; only `Uninitialized` and `Resolved` reject them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No snapshot ingested yet
    Uninitialized,
    /// Today's assessment exists
    Assessed,
    /// Context handed to the proposer
    AwaitingProposal,
    /// Today's execution result has been emitted
    Resolved,
}

/// Owns one engine and one policy gate for a single scenario
pub struct Orchestrator<E = TrustAssessmentEngine, P = PolicyGate> {
    engine: E,
    policy: P,
    previous: Option<Snapshot>,
    current: Option<Snapshot>,
    assessment: Option<TrustAssessment>,
    phase: Phase,
}

impl<E: TrustEngine, P: Policy> Orchestrator<E, P> {
    pub fn new(engine: E, policy: P) -> Self {
        Self {
            engine,
            policy,
            previous: None,
            current: None,
            assessment: None,
            phase: Phase::Uninitialized,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn assessment(&self) -> Option<&TrustAssessment> {
        self.assessment.as_ref()
    }

    pub fn previous_snapshot(&self) -> Option<&Snapshot> {
        self.previous.as_ref()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Ingest the next day's snapshot and assess it
    pub fn update_state(&mut self, snapshot: Snapshot) -> &TrustAssessment {
        if matches!(self.phase, Phase::Assessed | Phase::AwaitingProposal) {
            if let Some(a) = &self.assessment {
                warn!(day = a.day, "Advancing past a day that was never resolved");
            }
        }

        let assessment = self.engine.evaluate(&snapshot);
        debug!(
            day = assessment.day,
            score = assessment.trust_score,
            mode = %assessment.autonomy_mode,
            "Snapshot ingested"
        );

        self.previous = self.current.replace(snapshot);
        self.phase = Phase::Assessed;
        self.assessment.insert(assessment)
    }

    fn ready(&self) -> Result<(&Snapshot, &TrustAssessment), GateError> {
        match (&self.current, &self.assessment) {
            (Some(s), Some(a)) if self.phase != Phase::Uninitialized => Ok((s, a)),
            _ => Err(GateError::Uninitialized),
        }
    }

    /// Proposer-visible view of today
    pub fn get_context_payload(&mut self) -> Result<ContextPayload, GateError> {
        let (snapshot, assessment) = self.ready()?;
        let payload = ContextPayload::project(snapshot, assessment);
        if self.phase == Phase::Assessed {
            self.phase = Phase::AwaitingProposal;
        }
        Ok(payload)
    }

    /// Gate a proposal and emit today's execution result.
    ///
    /// Only a missing ingest or a second execution for the same day is
    /// returned as `Err`; bad proposals become `status=ERROR` results.
    pub fn execute_tool(&mut self, call: &ToolCall) -> Result<ExecutionResult, GateError> {
        let (_, assessment) = self.ready()?;
        let (day, mode, score) = (assessment.day, assessment.autonomy_mode, assessment.trust_score);
        if self.phase == Phase::Resolved {
            return Err(GateError::AlreadyResolved(day));
        }

        let raw = call.arguments.action.clone();
        let rationale = call.arguments.rationale.clone();

        if call.tool_name != EXECUTE_ACTION_TOOL {
            let err = GateError::UnknownTool(call.tool_name.clone());
            return Ok(self.fail_safe(Some(raw), rationale, err.to_string()));
        }

        let Some(proposed) = ActionType::from_str(&raw) else {
            let err = GateError::UnknownAction(raw.clone());
            return Ok(self.fail_safe(Some(raw), rationale, err.to_string()));
        };

        let (executed, status, message) = if self.policy.check_compliance(proposed, mode) {
            (
                proposed,
                ExecutionStatus::Success,
                "Action executed successfully.".to_string(),
            )
        } else {
            let mut message = format!(
                "Trust Mode is {}. Action {} denied. Executed {} instead.",
                mode, proposed, FAIL_SAFE_ACTION
            );
            if !self.policy.check_compliance(FAIL_SAFE_ACTION, mode) {
                message.push_str(&format!(
                    " Note: {} is not itself authorized in {}.",
                    FAIL_SAFE_ACTION, mode
                ));
            }
            (FAIL_SAFE_ACTION, ExecutionStatus::Blocked, message)
        };

        let result = ExecutionResult {
            day,
            proposed_action: Some(raw),
            executed_action: executed,
            rationale,
            trust_mode: mode,
            trust_score: score,
            status,
            message,
            overridden: executed != proposed,
        };

        if result.status == ExecutionStatus::Blocked {
            info!(
                day = result.day,
                mode = %mode,
                proposed = %proposed,
                executed = %executed,
                "Proposal denied"
            );
        } else {
            debug!(day = result.day, action = %executed, "Proposal executed");
        }

        self.phase = Phase::Resolved;
        Ok(result)
    }

    /// Resolve today without a usable proposal (timeout, proposer failure)
    pub fn resolve_fail_safe(&mut self, reason: impl Into<String>) -> Result<ExecutionResult, GateError> {
        let (_, assessment) = self.ready()?;
        if self.phase == Phase::Resolved {
            return Err(GateError::AlreadyResolved(assessment.day));
        }
        Ok(self.fail_safe(None, String::new(), reason.into()))
    }

    fn fail_safe(&mut self, proposed: Option<String>, rationale: String, message: String) -> ExecutionResult {
        // Callers have already passed `ready()`
        let (day, mode, score) = match &self.assessment {
            Some(a) => (a.day, a.autonomy_mode, a.trust_score),
            None => (0, Default::default(), 0.0),
        };
        warn!(day, mode = %mode, "{}; executing {}", message, FAIL_SAFE_ACTION);
        self.phase = Phase::Resolved;
        ExecutionResult {
            day,
            proposed_action: proposed,
            executed_action: FAIL_SAFE_ACTION,
            rationale,
            trust_mode: mode,
            trust_score: score,
            status: ExecutionStatus::Error,
            message,
            overridden: true,
        }
    }

    /// Tools a proposer may call
    pub fn list_tools(&self) -> Vec<Tool> {
        vec![execute_action_tool()]
    }

    /// Resources describing today's context
    pub fn list_resources(&self) -> Vec<Resource> {
        let Some(a) = &self.assessment else {
            return Vec::new();
        };
        vec![
            Resource {
                uri: format!("sensors://{}/readings", a.day),
                name: format!("Sensor readings, day {}", a.day),
                mime_type: "application/json".to_string(),
            },
            Resource {
                uri: format!("trust://{}/score", a.day),
                name: format!("Trust assessment, day {}", a.day),
                mime_type: "application/json".to_string(),
            },
        ]
    }

    /// Read one of today's resources as JSON text
    pub fn read_resource(&self, uri: &str) -> Result<String, GateError> {
        let (snapshot, assessment) = self.ready()?;
        let payload = ContextPayload::project(snapshot, assessment);

        let unknown = || GateError::UnknownResource(uri.to_string());
        let (scheme, rest) = uri.split_once("://").ok_or_else(unknown)?;
        let (day, path) = rest.split_once('/').ok_or_else(unknown)?;
        if day.parse::<u32>().ok() != Some(payload.day) {
            return Err(unknown());
        }

        let value = match (scheme, path) {
            ("sensors", "readings") => serde_json::to_string_pretty(&payload.sensor_context),
            ("trust", "score") => serde_json::to_string_pretty(&payload.trust_context),
            _ => return Err(unknown()),
        };
        value.map_err(|_| unknown())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trust::EngineConfig;
    use trustgate_core::{AutonomyMode, SensorReading};

    fn orchestrator() -> Orchestrator {
        let engine = TrustAssessmentEngine::new(EngineConfig::default()).unwrap();
        Orchestrator::new(engine, PolicyGate::default())
    }

    fn clean(day: u32) -> Snapshot {
        Snapshot::new(day)
            .with_reading(SensorReading::new("ph", day, 10.0))
            .with_reading(SensorReading::new("temp", day, 32.0))
            .with_reading(SensorReading::new("ec", day, 1.5))
            .with_reading(SensorReading::new("growth", day, 1.0))
    }

    #[test]
    fn test_uninitialized() {
        let mut orch = orchestrator();
        assert_eq!(orch.get_context_payload(), Err(GateError::Uninitialized));
        let call = ToolCall::execute_action(ActionType::Hold, "");
        assert_eq!(orch.execute_tool(&call), Err(GateError::Uninitialized));
        assert!(orch.list_resources().is_empty());
    }

    #[test]
    fn test_phases() {
        let mut orch = orchestrator();
        assert_eq!(orch.phase(), Phase::Uninitialized);
        orch.update_state(clean(1));
        assert_eq!(orch.phase(), Phase::Assessed);
        orch.get_context_payload().unwrap();
        assert_eq!(orch.phase(), Phase::AwaitingProposal);
        let call = ToolCall::execute_action(ActionType::ActUnrestricted, "nominal");
        let result = orch.execute_tool(&call).unwrap();
        assert_eq!(result.status, ExecutionStatus::Success);
        assert!(!result.overridden);
        assert_eq!(orch.phase(), Phase::Resolved);

        assert_eq!(orch.execute_tool(&call), Err(GateError::AlreadyResolved(1)));

        orch.update_state(clean(2));
        assert_eq!(orch.phase(), Phase::Assessed);
        assert_eq!(orch.previous_snapshot().map(|s| s.day), Some(1));
    }

    #[test]
    fn test_execute_without_payload() {
        let mut orch = orchestrator();
        orch.update_state(clean(1));
        assert_eq!(orch.phase(), Phase::Assessed);
        let result = orch.execute_tool(&ToolCall::execute_action(ActionType::Hold, "")).unwrap();
        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(orch.phase(), Phase::Resolved);
        assert_eq!(orch.resolve_fail_safe("late"), Err(GateError::AlreadyResolved(1)));
    }

    #[test]
    fn test_result_carries_raw_score() {
        // Six days without ec: 0.8, 0.4, then decay by 0.8 down to 0.16384
        let mut orch = orchestrator();
        let gappy = |d: u32| clean(d).with_reading(SensorReading::missing("ec", d));
        for day in 1..=6 {
            orch.update_state(gappy(day));
        }
        let score = orch.assessment().map(|a| a.trust_score).unwrap();
        assert!((score - 0.16384).abs() < 1e-12);

        let result = orch.execute_tool(&ToolCall::execute_action(ActionType::Hold, "")).unwrap();
        assert_eq!(result.trust_score, score);
    }

    #[test]
    fn test_denial_forces_hold() {
        let mut orch = orchestrator();
        // Range violation: score 0.5 → SUGGEST_ONLY
        let spiked = clean(1).with_reading(SensorReading::new("ph", 1, 12.0));
        let a = orch.update_state(spiked).clone();
        assert_eq!(a.autonomy_mode, AutonomyMode::SuggestOnly);

        let call = ToolCall::execute_action(ActionType::ActSafe, "try anyway");
        let result = orch.execute_tool(&call).unwrap();
        assert_eq!(result.status, ExecutionStatus::Blocked);
        assert_eq!(result.executed_action, ActionType::Hold);
        assert!(result.overridden);
        assert_eq!(
            result.message,
            "Trust Mode is SUGGEST_ONLY. Action ACT_SAFE denied. Executed HOLD instead."
        );
    }

    #[test]
    fn test_unknown_tool_and_action_are_errors() {
        let mut orch = orchestrator();
        orch.update_state(clean(1));
        let mut call = ToolCall::execute_action(ActionType::ActSafe, "");
        call.tool_name = "open_valve".into();
        let result = orch.execute_tool(&call).unwrap();
        assert_eq!(result.status, ExecutionStatus::Error);
        assert_eq!(result.executed_action, ActionType::Hold);
        assert!(result.overridden);
        assert_eq!(result.message, "Unknown tool: open_valve");

        orch.update_state(clean(2));
        let mut call = ToolCall::execute_action(ActionType::ActSafe, "");
        call.arguments.action = "act_safe".into();
        let result = orch.execute_tool(&call).unwrap();
        assert_eq!(result.status, ExecutionStatus::Error);
        assert_eq!(result.proposed_action.as_deref(), Some("act_safe"));
        assert_eq!(result.message, "Invalid action: act_safe");
    }

    #[test]
    fn test_resolve_fail_safe() {
        let mut orch = orchestrator();
        orch.update_state(clean(1));
        orch.get_context_payload().unwrap();
        let result = orch.resolve_fail_safe("Proposer timed out").unwrap();
        assert_eq!(result.proposed_action, None);
        assert_eq!(result.executed_action, ActionType::Hold);
        assert_eq!(result.status, ExecutionStatus::Error);
        assert!(result.overridden);
    }

    #[test]
    fn test_resources() {
        let mut orch = orchestrator();
        orch.update_state(clean(4));
        assert_eq!(orch.list_tools()[0].name, EXECUTE_ACTION_TOOL);
        let uris: Vec<_> = orch.list_resources().into_iter().map(|r| r.uri).collect();
        assert_eq!(uris, vec!["sensors://4/readings", "trust://4/score"]);

        let trust: serde_json::Value = serde_json::from_str(&orch.read_resource("trust://4/score").unwrap()).unwrap();
        assert_eq!(trust["mode"], "FULL_AUTONOMY");
        assert!(trust.get("s_pos").is_none());

        assert!(matches!(orch.read_resource("trust://3/score"), Err(GateError::UnknownResource(_))));
        assert!(matches!(orch.read_resource("cusum://4/state"), Err(GateError::UnknownResource(_))));
    }
}
