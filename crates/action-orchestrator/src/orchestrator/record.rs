//! Per-action execution records, the output of an orchestration run.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use super::action::{ActionArgs, PlannedAction};
use super::context::EntityInfo;
use super::executor::ToolOutcome;

/// Outcome of one executed action.
///
/// `sequence` starts at 1 and follows completion order across the whole run.
/// `entity_info` is `None` when the tool failed or produced no identifiable
/// entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub sequence: usize,
    /// Position of the action in the planned list
    pub plan_index: usize,
    pub tool_name: String,
    pub entity_type: Option<String>,
    pub artifact_id: Option<String>,
    /// Arguments as sent to the tool, after placeholder substitution
    pub args: ActionArgs,
    pub success: bool,
    pub message: String,
    pub entity_info: Option<EntityInfo>,
    pub error: Option<String>,
    pub executed_at_ms: u64,
}

impl ExecutionRecord {
    /// Builds a record from a normalized tool outcome.
    pub fn from_outcome(
        sequence: usize,
        plan_index: usize,
        action: &PlannedAction,
        outcome: ToolOutcome,
        executed_at_ms: u64,
    ) -> Self {
        let ToolOutcome {
            success,
            message,
            entity_info,
            error,
        } = outcome;

        Self {
            sequence,
            plan_index,
            tool_name: action.tool_name.clone(),
            entity_type: action.entity_type.clone(),
            artifact_id: action.artifact_id.clone(),
            args: action.args.clone(),
            success,
            message,
            // A failed call never exposes an entity for later resolution
            entity_info: if success { entity_info } else { None },
            error: if success {
                None
            } else {
                Some(error.unwrap_or_else(|| "Unknown error".to_string()))
            },
            executed_at_ms,
        }
    }

    /// Builds a failure record for an action whose tool call raised.
    pub fn failure(
        sequence: usize,
        plan_index: usize,
        action: &PlannedAction,
        error: impl Into<String>,
        executed_at_ms: u64,
    ) -> Self {
        let error = error.into();
        Self {
            sequence,
            plan_index,
            tool_name: action.tool_name.clone(),
            entity_type: action.entity_type.clone(),
            artifact_id: action.artifact_id.clone(),
            args: action.args.clone(),
            success: false,
            message: format!("❌ Failed to execute: {error}"),
            entity_info: None,
            error: Some(error),
            executed_at_ms,
        }
    }
}

/// Returns the current system time in milliseconds since UNIX_EPOCH.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
