//! Wire types exchanged with the proposer and the audit stream
//!
//! The proposer sees a `ContextPayload` and answers with a `ToolCall`.
//! The orchestrator answers every tool call with an `ExecutionResult`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use trustgate_core::{ActionType, AutonomyMode, Snapshot, TrustAssessment};

/// The single tool the orchestrator exposes
pub const EXECUTE_ACTION_TOOL: &str = "execute_action";

/// Schema version stamped on payloads and tool calls
pub const SCHEMA_VERSION: &str = "v1";

/// Placeholder shown to the proposer for a missing reading
pub const MISSING_SENTINEL: &str = "MISSING";

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// Sensor value as the proposer sees it: a number, or "MISSING"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensorValue {
    Value(f64),
    Missing(String),
}

impl SensorValue {
    pub fn missing() -> Self {
        SensorValue::Missing(MISSING_SENTINEL.to_string())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, SensorValue::Missing(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SensorValue::Value(v) => Some(*v),
            SensorValue::Missing(_) => None,
        }
    }
}

/// Proposer-visible trust summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustContext {
    /// Score rounded to two decimals
    pub score: f64,
    pub mode: AutonomyMode,
    /// Names of raised flags only
    pub flags: Vec<String>,
}

impl TrustContext {
    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.iter().any(|f| f == name)
    }
}

/// Everything the proposer is allowed to see for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextPayload {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub day: u32,
    pub sensor_context: BTreeMap<String, SensorValue>,
    pub trust_context: TrustContext,
}

impl ContextPayload {
    /// Project a snapshot and its assessment into the proposer view.
    /// Detector internals never appear here.
    pub fn project(snapshot: &Snapshot, assessment: &TrustAssessment) -> Self {
        let sensor_context = snapshot
            .readings
            .iter()
            .map(|(id, r)| {
                let value = match r.present_value() {
                    Some(v) => SensorValue::Value(v),
                    None => SensorValue::missing(),
                };
                (id.clone(), value)
            })
            .collect();

        Self {
            schema_version: default_schema_version(),
            day: snapshot.day,
            sensor_context,
            trust_context: TrustContext {
                score: round_to(assessment.trust_score, 2),
                mode: assessment.autonomy_mode,
                flags: assessment
                    .flags
                    .active()
                    .iter()
                    .map(|f| f.as_str().to_string())
                    .collect(),
            },
        }
    }
}

/// Arguments of an `execute_action` call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolArguments {
    /// Raw action token; validated by the orchestrator, never coerced
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub rationale: String,
}

/// A proposal from the (untrusted) proposer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: ToolArguments,
}

impl ToolCall {
    /// Convenience constructor for the standard tool
    pub fn execute_action(action: ActionType, rationale: impl Into<String>) -> Self {
        Self {
            schema_version: default_schema_version(),
            tool_name: EXECUTE_ACTION_TOOL.to_string(),
            arguments: ToolArguments {
                action: action.as_str().to_string(),
                rationale: rationale.into(),
            },
        }
    }
}

/// Outcome class of one gated execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Proposal was compliant and executed as proposed
    Success,
    /// Proposal was well-formed but denied; fail-safe executed instead
    Blocked,
    /// Proposal was malformed or never arrived; fail-safe executed instead
    Error,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "SUCCESS",
            ExecutionStatus::Blocked => "BLOCKED",
            ExecutionStatus::Error => "ERROR",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SUCCESS" => Some(ExecutionStatus::Success),
            "BLOCKED" => Some(ExecutionStatus::Blocked),
            "ERROR" => Some(ExecutionStatus::Error),
            _ => None,
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// What actually happened on a given day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub day: u32,
    /// Raw token the proposer asked for; `None` if no proposal arrived
    pub proposed_action: Option<String>,
    pub executed_action: ActionType,
    pub rationale: String,
    pub trust_mode: AutonomyMode,
    pub trust_score: f64,
    pub status: ExecutionStatus,
    pub message: String,
    #[serde(rename = "override")]
    pub overridden: bool,
}

/// MCP-style tool definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Definition of the `execute_action` tool, advertised to proposers
pub fn execute_action_tool() -> Tool {
    let actions: Vec<&str> = ActionType::all().iter().map(|a| a.as_str()).collect();
    Tool {
        name: EXECUTE_ACTION_TOOL.to_string(),
        description: "Request a control action on the process. The host decides what actually executes.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "action": {"type": "string", "enum": actions},
                "rationale": {"type": "string", "description": "One sentence justification"}
            },
            "required": ["action"]
        }),
    }
}

/// MCP-style resource descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub uri: String,
    pub name: String,
    pub mime_type: String,
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
