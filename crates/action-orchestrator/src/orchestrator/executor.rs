//! Tool invocation: the seam between the orchestrator and concrete tools.
//!
//! The orchestrator only sees [`ActionExecutor`]. The provided
//! [`RegistryExecutor`] looks tools up in an explicit [`ToolRegistry`] and owns
//! the per-call timeout; retries, batching, and rate limiting belong to the
//! tools themselves.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::action::{ActionArgs, PlannedAction};
use super::context::EntityInfo;
use super::error::OrchestratorError;

/// Normalized result of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub entity_info: Option<EntityInfo>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ToolOutcome {
    /// A successful call, optionally producing an entity.
    pub fn success(message: impl Into<String>, entity_info: Option<EntityInfo>) -> Self {
        Self {
            success: true,
            message: message.into(),
            entity_info,
            error: None,
        }
    }

    /// A call the tool itself reported as failed.
    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            message: String::new(),
            entity_info: None,
            error: Some(error),
        }
    }
}

/// A concrete tool, e.g. `cycles_create`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name as referenced by planned actions.
    fn name(&self) -> &str;

    /// Invokes the tool. An `Err` is treated the same as a raised exception: the
    /// action fails, the run continues.
    async fn invoke(&self, args: &ActionArgs) -> Result<ToolOutcome, OrchestratorError>;
}

/// Explicit registry of tools grouped by entity type.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool under an entity type, replacing any tool with the same
    /// name for that type.
    pub fn register(&mut self, entity_type: impl Into<String>, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.entry(entity_type.into()).or_default().insert(name, tool);
    }

    /// Finds a tool, preferring the given entity type and falling back to any
    /// entity type that registers a tool with this name.
    pub fn lookup(&self, entity_type: Option<&str>, tool_name: &str) -> Option<Arc<dyn Tool>> {
        if let Some(entity_type) = entity_type
            && let Some(tool) = self.tools.get(entity_type).and_then(|tools| tools.get(tool_name))
        {
            return Some(Arc::clone(tool));
        }

        let mut entity_types: Vec<&String> = self.tools.keys().collect();
        entity_types.sort();

        entity_types
            .into_iter()
            .find_map(|et| self.tools.get(et).and_then(|tools| tools.get(tool_name)))
            .map(Arc::clone)
    }

    /// Returns true if any entity type registers a tool with this name.
    pub fn contains(&self, tool_name: &str) -> bool {
        self.tools.values().any(|tools| tools.contains_key(tool_name))
    }

    /// Total number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: HashMap<&String, Vec<&String>> = self
            .tools
            .iter()
            .map(|(entity_type, tools)| (entity_type, tools.keys().collect()))
            .collect();
        f.debug_struct("ToolRegistry").field("tools", &names).finish()
    }
}

/// Executes one planned action.
///
/// Called concurrently for every action in a ready batch; the arguments have
/// been fully substituted by the time this is called.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, action: &PlannedAction) -> Result<ToolOutcome, OrchestratorError>;
}

/// [`ActionExecutor`] backed by a [`ToolRegistry`].
#[derive(Debug, Clone)]
pub struct RegistryExecutor {
    registry: ToolRegistry,
    timeout: Option<Duration>,
}

impl RegistryExecutor {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            timeout: None,
        }
    }

    /// Sets a per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }
}

#[async_trait]
impl ActionExecutor for RegistryExecutor {
    async fn execute(&self, action: &PlannedAction) -> Result<ToolOutcome, OrchestratorError> {
        let tool = self
            .registry
            .lookup(action.entity_type.as_deref(), &action.tool_name)
            .ok_or_else(|| OrchestratorError::ToolNotFound(action.tool_name.clone()))?;

        debug!(tool_name = %action.tool_name, "Invoking tool");

        match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, tool.invoke(&action.args)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(tool_name = %action.tool_name, timeout = ?timeout, "Tool call timed out");
                    Err(OrchestratorError::StepTimeout {
                        tool_name: action.tool_name.clone(),
                        timeout,
                    })
                }
            },
            None => tool.invoke(&action.args).await,
        }
    }
}

const VALIDATION_SUMMARY_LIMIT: usize = 150;
const ERROR_MESSAGE_LIMIT: usize = 200;

/// Condenses a raw tool error into a short, user-facing message.
///
/// Multi-field validation traces such as
///
/// ```text
/// 2 validation errors for cycles_add_work_items
/// cycle_id
///   Field required [type=missing, input_value={...}, input_type=dict]
/// issues
///   Field required [type=missing, input_value={...}, input_type=dict]
/// ```
///
/// become `Missing required fields: cycle_id, issues`.
pub fn format_tool_error(raw: &str) -> String {
    if raw.to_lowercase().contains("validation error") {
        let lines: Vec<&str> = raw.lines().collect();
        let mut missing: Vec<&str> = Vec::new();

        for (i, line) in lines.iter().enumerate().skip(1) {
            if !line.contains("Field required") {
                continue;
            }
            let field = lines[i - 1].trim();
            if !field.is_empty()
                && !field.starts_with('[')
                && !field.starts_with("For further")
                && !missing.contains(&field)
            {
                missing.push(field);
            }
        }

        if !missing.is_empty() {
            return format!("Missing required fields: {}", missing.join(", "));
        }

        let first_line = lines.first().copied().unwrap_or_default();
        return truncate_chars(first_line, VALIDATION_SUMMARY_LIMIT);
    }

    truncate_chars(raw, ERROR_MESSAGE_LIMIT)
}

pub(crate) fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool {
        name: String,
        delay: Duration,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            &self.name
        }

        async fn invoke(&self, args: &ActionArgs) -> Result<ToolOutcome, OrchestratorError> {
            tokio::time::sleep(self.delay).await;
            Ok(ToolOutcome::success(format!("echo {}", json!(args)), None))
        }
    }

    fn echo(name: &str) -> Arc<dyn Tool> {
        Arc::new(EchoTool {
            name: name.to_string(),
            delay: Duration::ZERO,
        })
    }

    #[test]
    fn test_registry_lookup_prefers_entity_type() {
        let mut registry = ToolRegistry::new();
        registry.register("project", echo("projects_create"));
        registry.register("cycle", echo("cycles_create"));

        assert_eq!(registry.len(), 2);
        assert!(registry.lookup(Some("cycle"), "cycles_create").is_some());
        // Wrong entity type falls back to a name match
        assert!(registry.lookup(Some("project"), "cycles_create").is_some());
        assert!(registry.lookup(None, "projects_create").is_some());
        assert!(registry.lookup(None, "modules_create").is_none());
        assert!(registry.contains("cycles_create"));
    }

    #[tokio::test]
    async fn test_registry_executor_unknown_tool() {
        let executor = RegistryExecutor::new(ToolRegistry::new());
        let result = executor.execute(&PlannedAction::new("projects_create")).await;

        assert_eq!(
            result,
            Err(OrchestratorError::ToolNotFound("projects_create".to_string()))
        );
    }

    #[tokio::test]
    async fn test_registry_executor_invokes_tool() {
        let mut registry = ToolRegistry::new();
        registry.register("project", echo("projects_create"));
        let executor = RegistryExecutor::new(registry);

        let action = PlannedAction::new("projects_create").with_arg("name", json!("Launch"));
        let outcome = executor.execute(&action).await.unwrap();

        assert!(outcome.success);
        assert!(outcome.message.contains("Launch"));
    }

    #[tokio::test]
    async fn test_registry_executor_timeout() {
        let mut registry = ToolRegistry::new();
        registry.register(
            "project",
            Arc::new(EchoTool {
                name: "projects_create".to_string(),
                delay: Duration::from_millis(200),
            }),
        );
        let executor = RegistryExecutor::new(registry).with_timeout(Duration::from_millis(20));

        let result = executor.execute(&PlannedAction::new("projects_create")).await;
        assert!(matches!(result, Err(OrchestratorError::StepTimeout { .. })));
    }

    #[test]
    fn test_format_missing_fields() {
        let raw = "3 validation errors for cycles_add_work_items\n\
                   cycle_id\n  Field required [type=missing, input_value={}, input_type=dict]\n    \
                   For further information visit https://errors.pydantic.dev/2.8/v/missing\n\
                   issues\n  Field required [type=missing, input_value={}, input_type=dict]\n\
                   project_id\n  Field required [type=missing, input_value={}, input_type=dict]\n\
                   cycle_id\n  Field required [type=missing, input_value={}, input_type=dict]";

        assert_eq!(
            format_tool_error(raw),
            "Missing required fields: cycle_id, issues, project_id"
        );
    }

    #[test]
    fn test_format_other_validation_error() {
        let raw = "1 validation error for projects_create\nname\n  String should have at most 255 characters";
        assert_eq!(format_tool_error(raw), "1 validation error for projects_create");
    }

    #[test]
    fn test_format_truncates_long_errors() {
        let raw = "é".repeat(500);
        let formatted = format_tool_error(&raw);
        assert_eq!(formatted.chars().count(), 200);
    }

    #[test]
    fn test_format_short_error_unchanged() {
        assert_eq!(format_tool_error("connection refused"), "connection refused");
    }
}
