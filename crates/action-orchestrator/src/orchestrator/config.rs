//! Configuration for orchestration runs.

use serde::{Deserialize, Serialize};

use super::dependency_rules::{
    ImplicitDependencyResolver, ImplicitDependencyRule, default_dependency_rules,
};
use super::error::OrchestratorError;

/// Configuration for the action orchestrator.
///
/// # Examples
///
/// ```ignore
/// use action_orchestrator::orchestrator::OrchestratorConfig;
///
/// let config = OrchestratorConfig::new()
///     .with_max_iterations_multiplier(3)
///     .with_max_concurrent_tasks(4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Iteration cap as a multiple of the number of planned actions.
    ///
    /// Every iteration that does not deadlock executes at least one action, so a
    /// well-formed rule table never reaches this bound. It exists to stop runaway
    /// loops caused by a defective rule table.
    ///
    /// **Default:** 2
    #[serde(default = "default_multiplier")]
    pub max_iterations_multiplier: usize,

    /// Absolute iteration cap overriding the multiplier.
    #[serde(default)]
    pub max_iterations: Option<usize>,

    /// Maximum number of tool calls in flight within one batch.
    ///
    /// If `None`, every ready action in a batch starts at once. The batch still
    /// completes in full before the next partition is computed.
    #[serde(default)]
    pub max_concurrent_tasks: Option<usize>,

    /// Implicit `(prerequisite, dependent)` ordering rules between tool kinds.
    #[serde(default = "default_dependency_rules")]
    pub dependency_rules: Vec<ImplicitDependencyRule>,

    /// Argument names that receive an entity's short identifier instead of its id.
    ///
    /// **Default:** `workspace_slug`, `identifier`
    #[serde(default = "default_identifier_fields")]
    pub identifier_fields: Vec<String>,

    /// Require values substituted into `*_id` arguments to be UUIDs.
    ///
    /// **Default:** `false`
    #[serde(default)]
    pub validate_uuid_ids: bool,
}

fn default_multiplier() -> usize {
    2
}

fn default_identifier_fields() -> Vec<String> {
    vec!["workspace_slug".to_string(), "identifier".to_string()]
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestratorConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            max_iterations_multiplier: default_multiplier(),
            max_iterations: None,
            max_concurrent_tasks: None,
            dependency_rules: default_dependency_rules(),
            identifier_fields: default_identifier_fields(),
            validate_uuid_ids: false,
        }
    }

    /// Parses a JSON configuration document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, OrchestratorError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_iterations_multiplier(mut self, multiplier: usize) -> Self {
        self.max_iterations_multiplier = multiplier;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }

    pub fn with_max_concurrent_tasks(mut self, max: usize) -> Self {
        self.max_concurrent_tasks = Some(max);
        self
    }

    pub fn with_unlimited_concurrency(mut self) -> Self {
        self.max_concurrent_tasks = None;
        self
    }

    /// Replaces the rule table.
    pub fn with_dependency_rules(mut self, rules: Vec<ImplicitDependencyRule>) -> Self {
        self.dependency_rules = rules;
        self
    }

    /// Appends one rule to the table.
    pub fn with_dependency_rule(
        mut self,
        prerequisite: impl Into<String>,
        dependent: impl Into<String>,
    ) -> Self {
        self.dependency_rules
            .push(ImplicitDependencyRule::new(prerequisite, dependent));
        self
    }

    pub fn with_identifier_fields(mut self, fields: Vec<String>) -> Self {
        self.identifier_fields = fields;
        self
    }

    pub fn with_uuid_validation(mut self, enable: bool) -> Self {
        self.validate_uuid_ids = enable;
        self
    }

    /// Iteration cap for a plan with `action_count` actions.
    pub fn iteration_limit(&self, action_count: usize) -> usize {
        self.max_iterations
            .unwrap_or_else(|| action_count.saturating_mul(self.max_iterations_multiplier))
    }

    /// Checks the configuration for values that can never work.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.max_iterations_multiplier == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "max_iterations_multiplier must be at least 1".to_string(),
            ));
        }

        if self.max_concurrent_tasks == Some(0) {
            return Err(OrchestratorError::InvalidConfig(
                "max_concurrent_tasks must be at least 1".to_string(),
            ));
        }

        ImplicitDependencyResolver::new(self.dependency_rules.clone())?;
        Ok(())
    }
}
