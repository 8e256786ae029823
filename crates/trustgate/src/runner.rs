//! Scenario runner
//!
//! Days within a scenario run strictly in order. Scenarios share nothing
//! and run as separate tasks, each with its own engine and orchestrator.

use anyhow::Result;
use gates::{Policy, PolicyGate};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};
use trust::{TrustAssessmentEngine, TrustEngine};
use trustgate_core::{GateError, Snapshot, TrustAssessment};

use crate::audit::{AuditRecord, AuditSink};
use crate::config::RunConfig;
use crate::orchestrator::Orchestrator;
use crate::protocol::ExecutionResult;
use crate::proposer::{Proposer, ProposerError};
use crate::scenario::ScenarioGenerator;

/// One resolved day
#[derive(Debug, Clone, PartialEq)]
pub struct DayOutcome {
    pub assessment: TrustAssessment,
    pub result: ExecutionResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioReport {
    pub scenario_id: String,
    pub backend: String,
    pub model: String,
    pub days: Vec<DayOutcome>,
}

impl ScenarioReport {
    pub fn records(&self) -> Vec<AuditRecord> {
        self.days
            .iter()
            .map(|d| AuditRecord::new(&self.scenario_id, &self.backend, &self.model, &d.assessment, &d.result))
            .collect()
    }

    /// Send every day to a sink, in day order
    pub fn write_to(&self, sink: &mut impl AuditSink) -> Result<()> {
        for record in self.records() {
            sink.record(&record)?;
        }
        Ok(())
    }
}

/// Run one scenario to completion.
///
/// A proposer that fails or exceeds `timeout` resolves the day to the
/// fail-safe action; the run never stalls on it.
pub async fn run_scenario<E, Q, P>(
    scenario_id: &str,
    snapshots: Vec<Snapshot>,
    orchestrator: &mut Orchestrator<E, Q>,
    proposer: &mut P,
    timeout: Duration,
) -> Result<ScenarioReport, GateError>
where
    E: TrustEngine,
    Q: Policy,
    P: Proposer,
{
    let mut days = Vec::with_capacity(snapshots.len());

    for snapshot in snapshots {
        let assessment = orchestrator.update_state(snapshot).clone();
        let payload = orchestrator.get_context_payload()?;

        let result = match tokio::time::timeout(timeout, proposer.propose(&payload)).await {
            Ok(Ok(call)) => orchestrator.execute_tool(&call)?,
            Ok(Err(e)) => {
                warn!(scenario = scenario_id, day = payload.day, error = %e, "Proposer failed");
                orchestrator.resolve_fail_safe(e.to_string())?
            }
            Err(_) => {
                let e = ProposerError::Timeout {
                    after_ms: timeout.as_millis() as u64,
                };
                warn!(scenario = scenario_id, day = payload.day, "{}", e);
                orchestrator.resolve_fail_safe(e.to_string())?
            }
        };

        days.push(DayOutcome { assessment, result });
    }

    Ok(ScenarioReport {
        scenario_id: scenario_id.to_string(),
        backend: proposer.backend().to_string(),
        model: proposer.model().to_string(),
        days,
    })
}

/// Run every configured scenario in parallel, reports in configured order.
///
/// Each task gets its own clone of `proposer`. Reports carry the proposer's
/// model label unless `run.model` overrides it.
pub async fn run_batch<P>(config: &RunConfig, proposer: P) -> Result<Vec<ScenarioReport>>
where
    P: Proposer + Clone + 'static,
{
    let generator = ScenarioGenerator::new(config.run.seed, config.run.duration_days);
    let timeout = Duration::from_millis(config.run.proposer_timeout_ms);
    let model = config.run.model.clone();

    let mut tasks = JoinSet::new();
    for (index, scenario_id) in config.run.scenarios.iter().enumerate() {
        let snapshots = generator.generate(scenario_id)?;
        let engine = TrustAssessmentEngine::new(config.engine.clone())?;
        let gate = PolicyGate::new(config.policy.clone())?;
        let mut proposer = proposer.clone();
        let scenario_id = scenario_id.clone();
        let model = model.clone();

        tasks.spawn(async move {
            let mut orchestrator = Orchestrator::new(engine, gate);
            let mut report = run_scenario(&scenario_id, snapshots, &mut orchestrator, &mut proposer, timeout).await?;
            if let Some(model) = model {
                report.model = model;
            }
            Ok::<_, GateError>((index, report))
        });
    }

    let mut reports = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        let (index, report) = joined??;
        info!(
            scenario = %report.scenario_id,
            days = report.days.len(),
            "Scenario complete"
        );
        reports.push((index, report));
    }

    reports.sort_by_key(|(index, _)| *index);
    Ok(reports.into_iter().map(|(_, r)| r).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ContextPayload, ExecutionStatus, ToolCall};
    use crate::proposer::BuiltinProposer;
    use std::future::Future;
    use trust::EngineConfig;
    use trustgate_core::ActionType;

    /// Never answers within any sane timeout
    #[derive(Clone)]
    struct Stalled;

    impl Proposer for Stalled {
        fn backend(&self) -> &str {
            "stalled"
        }

        fn model(&self) -> &str {
            "none"
        }

        fn propose(&mut self, _payload: &ContextPayload) -> impl Future<Output = Result<ToolCall, ProposerError>> + Send {
            async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(ToolCall::execute_action(ActionType::ActUnrestricted, "too late"))
            }
        }
    }

    #[derive(Clone)]
    struct Broken;

    impl Proposer for Broken {
        fn backend(&self) -> &str {
            "broken"
        }

        fn model(&self) -> &str {
            "none"
        }

        fn propose(&mut self, _payload: &ContextPayload) -> impl Future<Output = Result<ToolCall, ProposerError>> + Send {
            std::future::ready(Err(ProposerError::Unavailable("connection refused".into())))
        }
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(
            TrustAssessmentEngine::new(EngineConfig::default()).unwrap(),
            PolicyGate::default(),
        )
    }

    #[tokio::test]
    async fn test_timeout_resolves_to_hold() {
        let snapshots = ScenarioGenerator::new(42, 3).generate("S1").unwrap();
        let mut orch = orchestrator();
        let report = run_scenario("S1", snapshots, &mut orch, &mut Stalled, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(report.days.len(), 3);
        for day in &report.days {
            assert_eq!(day.result.status, ExecutionStatus::Error);
            assert_eq!(day.result.executed_action, ActionType::Hold);
            assert_eq!(day.result.proposed_action, None);
            assert!(day.result.overridden);
            assert!(day.result.message.contains("timed out"));
        }
    }

    #[tokio::test]
    async fn test_proposer_failure_resolves_to_hold() {
        let snapshots = ScenarioGenerator::new(42, 2).generate("S2").unwrap();
        let mut orch = orchestrator();
        let report = run_scenario("S2", snapshots, &mut orch, &mut Broken, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(report.days.iter().all(|d| d.result.executed_action == ActionType::Hold));
        assert_eq!(report.backend, "broken");
    }

    #[tokio::test]
    async fn test_batch_order_and_audit() {
        let mut config = RunConfig::default();
        config.run.scenarios = vec!["S7".into(), "S1".into(), "S2".into()];
        config.run.duration_days = 6;

        let proposer = BuiltinProposer::from_backend("mock").unwrap();
        let reports = run_batch(&config, proposer).await.unwrap();
        let ids: Vec<_> = reports.iter().map(|r| r.scenario_id.as_str()).collect();
        assert_eq!(ids, vec!["S7", "S1", "S2"]);

        let mut records: Vec<AuditRecord> = Vec::new();
        for report in &reports {
            report.write_to(&mut records).unwrap();
        }
        assert_eq!(records.len(), 18);
        assert!(records.iter().all(|r| r.model == "scripted"));
    }

    #[tokio::test]
    async fn test_batch_keeps_proposer_model() {
        let mut config = RunConfig::default();
        config.run.scenarios = vec!["S1".into(), "S2".into()];
        config.run.duration_days = 3;
        config.run.backend = "adversary".into();

        let proposer = BuiltinProposer::from_backend(&config.run.backend).unwrap();
        let reports = run_batch(&config, proposer.clone()).await.unwrap();
        for report in &reports {
            assert_eq!(report.backend, "adversary");
            assert_eq!(report.model, "stress");
            assert!(report.records().iter().all(|r| r.model == "stress"));
        }

        config.run.model = Some("stress-v2".into());
        let reports = run_batch(&config, proposer).await.unwrap();
        assert!(reports.iter().all(|r| r.model == "stress-v2"));
    }

    #[tokio::test]
    async fn test_batch_rejects_unknown_scenario() {
        let mut config = RunConfig::default();
        config.run.scenarios = vec!["S1".into(), "S42".into()];
        let proposer = BuiltinProposer::from_backend("mock").unwrap();
        assert!(run_batch(&config, proposer).await.is_err());
    }
}
