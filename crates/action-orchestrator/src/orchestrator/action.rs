//! Planned actions produced by an upstream planner.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Arguments of a planned action, keyed by argument name.
pub type ActionArgs = Map<String, JsonValue>;

/// A single tool invocation proposed by the planner.
///
/// `args` may contain placeholders such as `<id of project: Launch>`, either as a
/// string value or as an element of a list value. The orchestrator rewrites those
/// in place once the referenced entity has been produced; nothing else about the
/// action changes during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedAction {
    /// Name of the tool to invoke (e.g. `cycles_create`)
    pub tool_name: String,
    /// Tool arguments
    #[serde(default)]
    pub args: ActionArgs,
    /// Entity type the tool operates on (e.g. `cycle`), used for tool lookup
    #[serde(default)]
    pub entity_type: Option<String>,
    /// Opaque artifact identifier assigned by the planner
    #[serde(default)]
    pub artifact_id: Option<String>,
}

impl PlannedAction {
    /// Creates an action with no arguments.
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            args: ActionArgs::new(),
            entity_type: None,
            artifact_id: None,
        }
    }

    /// Adds (or replaces) an argument.
    pub fn with_arg(mut self, name: impl Into<String>, value: JsonValue) -> Self {
        self.args.insert(name.into(), value);
        self
    }

    /// Sets the entity type.
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Sets the artifact identifier.
    pub fn with_artifact_id(mut self, artifact_id: impl Into<String>) -> Self {
        self.artifact_id = Some(artifact_id.into());
        self
    }

    /// The name the planner intended for the produced entity, taken from the
    /// `name` argument.
    ///
    /// Tools may rename an entity on conflict, so this can differ from the name
    /// reported back in the tool's entity info.
    pub fn planned_name(&self) -> Option<&str> {
        self.args
            .get("name")
            .and_then(JsonValue::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}
