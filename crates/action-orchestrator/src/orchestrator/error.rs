//! Error types for orchestrator operations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Diagnostic context for a run that stopped with actions still pending.
///
/// Produced when every pending action is blocked, and when the iteration cap
/// stops a run. Carries enough information to tell the user which references
/// could not be resolved and what the run did manage to produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlockReport {
    /// Unresolved references as lookup keys (`"project:DoesNotExist"`), or the raw
    /// token when it could not be parsed at all.
    pub unresolved_placeholders: Vec<String>,
    /// Tool names of the actions left pending.
    pub blocked_tools: Vec<String>,
    /// Lookup keys available in the execution context when the run stopped.
    pub available_entities: Vec<String>,
}

impl fmt::Display for DeadlockReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Deadlock detected: cannot resolve placeholders.")?;
        writeln!(f, "Blocked placeholders: {:?}", self.unresolved_placeholders)?;
        writeln!(f, "Blocked tools: {:?}", self.blocked_tools)?;
        writeln!(f, "Available entities in context: {:?}", self.available_entities)?;
        writeln!(f, "Possible causes:")?;
        writeln!(f, "- Entity was not created successfully")?;
        writeln!(f, "- Entity name mismatch between placeholder and actual name")?;
        write!(f, "- Circular dependency between actions")
    }
}

/// Errors that can occur during orchestrator operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrchestratorError {
    /// Every pending action is blocked; the run cannot proceed.
    #[error("{0}")]
    UnresolvableReference(DeadlockReport),

    /// The iteration cap was reached before all actions ran.
    #[error(
        "Safety bound exceeded after {iterations} iteration(s), {remaining} action(s) not executed. Unresolved placeholders: {:?}. Available entities: {:?}",
        .report.unresolved_placeholders,
        .report.available_entities
    )]
    SafetyBoundExceeded {
        iterations: usize,
        remaining: usize,
        report: DeadlockReport,
    },

    /// No tool with the specified name is registered.
    #[error("Tool '{0}' not found")]
    ToolNotFound(String),

    /// A tool call raised an error.
    #[error("Tool '{tool_name}' failed: {message}")]
    ToolExecution { tool_name: String, message: String },

    /// A tool call exceeded the executor's timeout.
    #[error("Tool '{tool_name}' timed out after {timeout:?}")]
    StepTimeout { tool_name: String, timeout: Duration },

    /// A token starting with `<id of` could not be parsed.
    #[error("Failed to parse placeholder: {0}")]
    PlaceholderParse(String),

    /// The referenced entity is not in the execution context.
    #[error("Entity '{entity_name}' (type: {entity_type}) not found in execution context")]
    EntityNotFound {
        entity_type: String,
        entity_name: String,
    },

    /// The entity was found but lacks the value needed for the argument.
    #[error("Could not extract value for field '{field}' from entity '{entity_name}'")]
    MissingEntityValue { field: String, entity_name: String },

    /// A resolved value has the wrong format for its argument.
    #[error("Field '{field}' requires UUID format, but got: '{value}'")]
    InvalidIdentifier { field: String, value: String },

    /// The implicit dependency rule table contains a cycle.
    #[error("Implicit dependency rules contain a cycle: {0}")]
    CyclicDependencyRules(String),

    /// The configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The run was cancelled before all actions ran.
    #[error("Orchestration cancelled")]
    Cancelled,
}

impl OrchestratorError {
    /// Creates a tool execution error.
    pub fn tool_execution(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for OrchestratorError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}
