//! Implicit ordering constraints between tool kinds.
//!
//! Some dependencies are real but never show up as placeholders in a plan: work
//! items can only be added to a cycle once the cycle exists, even when the plan
//! refers to the cycle by something other than a placeholder. A rule
//! `(prerequisite, dependent)` keeps every `dependent` action blocked while any
//! `prerequisite` action is still pending.
//!
//! Rules are keyed by tool name only, so unrelated instances of a dependent tool
//! also wait. This never under-blocks but can over-serialize independent parts
//! of a plan.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::dependency_graph::DependencyGraph;
use super::error::OrchestratorError;

/// A single `(prerequisite, dependent)` rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImplicitDependencyRule {
    pub prerequisite: String,
    pub dependent: String,
}

impl ImplicitDependencyRule {
    pub fn new(prerequisite: impl Into<String>, dependent: impl Into<String>) -> Self {
        Self {
            prerequisite: prerequisite.into(),
            dependent: dependent.into(),
        }
    }
}

/// The rule table used when none is configured.
pub fn default_dependency_rules() -> Vec<ImplicitDependencyRule> {
    vec![
        ImplicitDependencyRule::new("cycles_create", "cycles_add_work_items"),
        ImplicitDependencyRule::new("modules_create", "modules_add_work_items"),
        ImplicitDependencyRule::new("workitems_create", "cycles_add_work_items"),
        ImplicitDependencyRule::new("workitems_create", "modules_add_work_items"),
    ]
}

/// Multiset of tool names still pending execution.
#[derive(Debug, Clone, Default)]
pub struct PendingTools {
    counts: HashMap<String, usize>,
}

impl PendingTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tool_name: &str) {
        *self.counts.entry(tool_name.to_string()).or_insert(0) += 1;
    }

    /// Number of pending actions using this tool.
    pub fn count(&self, tool_name: &str) -> usize {
        self.counts.get(tool_name).copied().unwrap_or(0)
    }

    pub fn contains(&self, tool_name: &str) -> bool {
        self.count(tool_name) > 0
    }
}

impl<'a> FromIterator<&'a str> for PendingTools {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut pending = Self::new();
        for tool_name in iter {
            pending.insert(tool_name);
        }
        pending
    }
}

/// Evaluates the rule table against the pending set.
#[derive(Debug, Clone)]
pub struct ImplicitDependencyResolver {
    rules: Vec<ImplicitDependencyRule>,
    graph: DependencyGraph,
}

impl ImplicitDependencyResolver {
    /// Builds a resolver, rejecting rule tables that contain a cycle.
    pub fn new(rules: Vec<ImplicitDependencyRule>) -> Result<Self, OrchestratorError> {
        let mut graph = DependencyGraph::new();
        for rule in &rules {
            graph.add_dependency(&rule.dependent, &rule.prerequisite);
        }

        if let Some(cycle) = graph.find_cycle() {
            return Err(OrchestratorError::CyclicDependencyRules(cycle.join(" -> ")));
        }

        Ok(Self { rules, graph })
    }

    pub fn rules(&self) -> &[ImplicitDependencyRule] {
        &self.rules
    }

    /// Returns the first prerequisite of `tool_name` that is still pending.
    pub fn blocking_prerequisite(&self, tool_name: &str, pending: &PendingTools) -> Option<String> {
        let mut prerequisites: Vec<String> = self.graph.get_prerequisites(tool_name).into_iter().collect();
        prerequisites.sort();

        let blocking = prerequisites.into_iter().find(|p| pending.contains(p));
        if let Some(prerequisite) = &blocking {
            debug!(
                tool_name = %tool_name,
                prerequisite = %prerequisite,
                "Action blocked by pending implicit dependency"
            );
        }
        blocking
    }

    /// Returns true if both sides of some rule appear among `tool_names`.
    pub fn has_edges_among<'a>(&self, tool_names: impl IntoIterator<Item = &'a str>) -> bool {
        let pending: PendingTools = tool_names.into_iter().collect();
        self.rules
            .iter()
            .any(|rule| pending.contains(&rule.prerequisite) && pending.contains(&rule.dependent))
    }
}
