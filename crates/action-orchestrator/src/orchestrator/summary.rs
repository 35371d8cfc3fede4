//! User-facing summaries of a run.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::context::EntityInfo;
use super::executor::truncate_chars;
use super::record::ExecutionRecord;

const REPORT_ERROR_LIMIT: usize = 200;

/// Counts for a finished (or aborted) run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSummary {
    pub total_planned: usize,
    pub completed: usize,
    pub failed: usize,
    /// Planned actions that never ran (deadlock, safety bound, cancellation)
    pub not_executed: usize,
    pub duration_ms: u64,
}

impl ActionSummary {
    pub fn from_records(total_planned: usize, records: &[ExecutionRecord], duration: Duration) -> Self {
        let completed = records.iter().filter(|r| r.success).count();
        let failed = records.len() - completed;

        Self {
            total_planned,
            completed,
            failed,
            not_executed: total_planned.saturating_sub(records.len()),
            duration_ms: duration.as_millis() as u64,
        }
    }
}

/// Condensed view of one record for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReport {
    pub sequence: usize,
    pub tool_name: String,
    pub artifact_type: Option<String>,
    pub artifact_id: Option<String>,
    pub success: bool,
    pub entity: Option<EntityInfo>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ActionReport {
    pub fn from_record(record: &ExecutionRecord) -> Self {
        let (message, error) = if record.success {
            (Some(success_message(&record.message)), None)
        } else {
            let error = record.error.as_deref().map(|e| {
                if e.chars().count() > REPORT_ERROR_LIMIT {
                    format!("{}...", truncate_chars(e, REPORT_ERROR_LIMIT))
                } else {
                    e.to_string()
                }
            });
            (None, error)
        };

        Self {
            sequence: record.sequence,
            tool_name: record.tool_name.clone(),
            artifact_type: record.entity_type.clone(),
            artifact_id: record.artifact_id.clone(),
            success: record.success,
            entity: record.entity_info.clone(),
            message,
            error,
        }
    }
}

/// Extracts the text of the first `✅` line of a tool message.
pub fn extract_success_message(message: &str) -> Option<String> {
    message
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix('✅'))
        .map(|rest| rest.trim().to_string())
        .filter(|rest| !rest.is_empty())
}

fn success_message(message: &str) -> String {
    if let Some(extracted) = extract_success_message(message) {
        return extracted;
    }

    let lower = message.to_lowercase();
    if lower.contains("created") {
        "Created successfully".to_string()
    } else if lower.contains("updated") {
        "Updated successfully".to_string()
    } else {
        "Action completed successfully".to_string()
    }
}
