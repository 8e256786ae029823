//! Audit trail for gated executions
//!
//! One record per scenario day, written as CSV (experiment log) and/or
//! JSON lines (queryable). Records are never rewritten once appended.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use trustgate_core::{ActionType, AutonomyMode, TrustAssessment};

use crate::protocol::{round_to, ExecutionResult, ExecutionStatus};

/// A single audit row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub recorded_at: DateTime<Utc>,
    pub scenario_id: String,
    pub day: u32,
    pub backend: String,
    pub model: String,
    /// Rounded to four decimals
    pub trust_score: f64,
    pub mode: AutonomyMode,
    /// Raised flag names joined with `|`
    pub flags: String,
    pub proposed_action: Option<String>,
    pub executed_action: ActionType,
    pub status: ExecutionStatus,
    #[serde(rename = "override")]
    pub overridden: bool,
    #[serde(default)]
    pub rationale: String,
}

impl AuditRecord {
    pub fn new(
        scenario_id: &str,
        backend: &str,
        model: &str,
        assessment: &TrustAssessment,
        result: &ExecutionResult,
    ) -> Self {
        Self {
            recorded_at: Utc::now(),
            scenario_id: scenario_id.to_string(),
            day: result.day,
            backend: backend.to_string(),
            model: model.to_string(),
            trust_score: round_to(assessment.trust_score, 4),
            mode: assessment.autonomy_mode,
            flags: assessment.flags.joined("|"),
            proposed_action: result.proposed_action.clone(),
            executed_action: result.executed_action,
            status: result.status,
            overridden: result.overridden,
            rationale: result.rationale.clone(),
        }
    }

    /// Proposal parsed into the action vocabulary, if it was valid
    pub fn proposed(&self) -> Option<ActionType> {
        self.proposed_action.as_deref().and_then(ActionType::from_str)
    }
}

/// Destination for audit records
pub trait AuditSink {
    fn record(&mut self, record: &AuditRecord) -> Result<()>;
}

/// Experiment log: one CSV file per run, header first
pub struct CsvAuditLog {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl CsvAuditLog {
    pub const COLUMNS: [&'static str; 12] = [
        "scenario_id",
        "day",
        "backend",
        "model",
        "trust_score",
        "mode",
        "flags",
        "proposed_action",
        "executed_action",
        "status",
        "override",
        "rationale",
    ];

    /// Create (or truncate) the log and write the header row
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create audit directory {:?}", parent))?;
        }
        let mut writer =
            csv::Writer::from_path(path).with_context(|| format!("Failed to create CSV log at {:?}", path))?;
        writer.write_record(Self::COLUMNS)?;
        writer.flush()?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for CsvAuditLog {
    fn record(&mut self, r: &AuditRecord) -> Result<()> {
        let row = [
            r.scenario_id.clone(),
            r.day.to_string(),
            r.backend.clone(),
            r.model.clone(),
            format!("{:.4}", r.trust_score),
            r.mode.to_string(),
            r.flags.clone(),
            r.proposed_action.clone().unwrap_or_default(),
            r.executed_action.to_string(),
            r.status.to_string(),
            if r.overridden { "True" } else { "False" }.to_string(),
            r.rationale.clone(),
        ];
        self.writer
            .write_record(&row)
            .with_context(|| format!("Failed to write CSV log at {:?}", self.path))?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Append-only JSON lines log
pub struct JsonlAuditLog {
    log_path: PathBuf,
}

impl JsonlAuditLog {
    pub fn with_path(log_path: PathBuf) -> Self {
        Self { log_path }
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }

    /// Append one record
    pub fn append(&self, record: &AuditRecord) -> Result<()> {
        if let Some(parent) = self.log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Failed to open audit log at {:?}", self.log_path))?;

        let mut writer = BufWriter::new(file);
        let json = serde_json::to_string(record)?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;

        Ok(())
    }

    /// All records, in append order
    pub fn all(&self) -> Result<Vec<AuditRecord>> {
        self.query(AuditQuery::default())
    }

    /// Records for one scenario
    pub fn for_scenario(&self, scenario_id: &str) -> Result<Vec<AuditRecord>> {
        self.query(AuditQuery::default().scenario(scenario_id))
    }

    /// Blocked executions
    pub fn blocked(&self) -> Result<Vec<AuditRecord>> {
        self.query(AuditQuery::default().status(ExecutionStatus::Blocked))
    }

    /// Query with a filter; unparseable lines are skipped
    pub fn query(&self, query: AuditQuery) -> Result<Vec<AuditRecord>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.log_path)
            .with_context(|| format!("Failed to read audit log at {:?}", self.log_path))?;
        let reader = BufReader::new(file);

        let mut records: Vec<AuditRecord> = reader
            .lines()
            .filter_map(|line| line.ok().and_then(|l| serde_json::from_str(&l).ok()))
            .filter(|record: &AuditRecord| query.matches(record))
            .collect();

        if let Some(limit) = query.limit {
            records.truncate(limit);
        }

        Ok(records)
    }

    pub fn stats(&self) -> Result<AuditStats> {
        let mut stats = AuditStats::default();
        for record in self.all()? {
            stats.total += 1;
            match record.status {
                ExecutionStatus::Success => stats.success += 1,
                ExecutionStatus::Blocked => stats.blocked += 1,
                ExecutionStatus::Error => stats.errors += 1,
            }
            if record.overridden {
                stats.overridden += 1;
            }
        }
        Ok(stats)
    }
}

impl AuditSink for JsonlAuditLog {
    fn record(&mut self, record: &AuditRecord) -> Result<()> {
        self.append(record)
    }
}

/// In-memory sink, for callers that post-process records themselves
impl AuditSink for Vec<AuditRecord> {
    fn record(&mut self, record: &AuditRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// Query parameters for the JSONL log
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    scenario_id: Option<String>,
    status: Option<ExecutionStatus>,
    overridden: Option<bool>,
    limit: Option<usize>,
}

impl AuditQuery {
    pub fn scenario(mut self, scenario_id: &str) -> Self {
        self.scenario_id = Some(scenario_id.to_string());
        self
    }

    pub fn status(mut self, status: ExecutionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn overridden(mut self, overridden: bool) -> Self {
        self.overridden = Some(overridden);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, record: &AuditRecord) -> bool {
        if let Some(ref scenario) = self.scenario_id {
            if record.scenario_id != *scenario {
                return false;
            }
        }

        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }

        if let Some(overridden) = self.overridden {
            if record.overridden != overridden {
                return false;
            }
        }

        true
    }
}

/// Audit statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditStats {
    pub total: usize,
    pub success: usize,
    pub blocked: usize,
    pub errors: usize,
    pub overridden: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use trustgate_core::TrustFlags;

    fn record(scenario: &str, day: u32, status: ExecutionStatus) -> AuditRecord {
        let mut flags = TrustFlags::default();
        flags.range_violation = status == ExecutionStatus::Blocked;
        flags.drift_suspected = status == ExecutionStatus::Blocked;
        let assessment = TrustAssessment::new(day, 0.31234, AutonomyMode::Block, flags);
        let result = ExecutionResult {
            day,
            proposed_action: Some("ACT_UNRESTRICTED".into()),
            executed_action: ActionType::Hold,
            rationale: "push, then \"hope\"".into(),
            trust_mode: AutonomyMode::Block,
            trust_score: 0.3123,
            status,
            message: String::new(),
            overridden: status != ExecutionStatus::Success,
        };
        AuditRecord::new(scenario, "mock", "scripted", &assessment, &result)
    }

    #[test]
    fn test_record_fields() {
        let r = record("S2", 3, ExecutionStatus::Blocked);
        assert_eq!(r.trust_score, 0.3123);
        assert_eq!(r.flags, "range_violation|drift_suspected");
        assert_eq!(r.proposed(), Some(ActionType::ActUnrestricted));
    }

    #[test]
    fn test_csv_log() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("runs").join("experiment_log.csv");
        let mut log = CsvAuditLog::create(&path).unwrap();
        log.record(&record("S2", 3, ExecutionStatus::Blocked)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], CsvAuditLog::COLUMNS.join(","));
        assert_eq!(
            lines[1],
            "S2,3,mock,scripted,0.3123,BLOCK,range_violation|drift_suspected,ACT_UNRESTRICTED,HOLD,BLOCKED,True,\"push, then \"\"hope\"\"\""
        );
    }

    #[test]
    fn test_csv_log_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("experiment_log.csv");
        let mut log = CsvAuditLog::create(&path).unwrap();
        let mut r = record("S4", 2, ExecutionStatus::Success);
        r.rationale = "line one\nline two, with comma".into();
        r.proposed_action = None;
        log.record(&r).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), CsvAuditLog::COLUMNS.to_vec());

        let rows: Vec<csv::StringRecord> = reader.records().map(|row| row.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][7], "");
        assert_eq!(&rows[0][10], "False");
        assert_eq!(&rows[0][11], "line one\nline two, with comma");
    }

    #[test]
    fn test_jsonl_query() {
        let dir = tempdir().unwrap();
        let mut log = JsonlAuditLog::with_path(dir.path().join("audit.jsonl"));
        assert!(log.all().unwrap().is_empty());

        for day in 1..=5 {
            let status = if day % 2 == 0 {
                ExecutionStatus::Blocked
            } else {
                ExecutionStatus::Success
            };
            log.record(&record(if day <= 3 { "S1" } else { "S2" }, day, status)).unwrap();
        }

        assert_eq!(log.for_scenario("S1").unwrap().len(), 3);
        assert_eq!(log.blocked().unwrap().len(), 2);
        assert_eq!(log.query(AuditQuery::default().overridden(false).limit(2)).unwrap().len(), 2);

        let stats = log.stats().unwrap();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.success, 3);
        assert_eq!(stats.blocked, 2);
        assert_eq!(stats.overridden, 2);

        let line = std::fs::read_to_string(log.path()).unwrap();
        assert!(line.contains("\"override\":true"));
    }
}
