//! Orchestration of planned tool actions.
//!
//! The driver loop in [`ActionOrchestrator`] repeatedly partitions the pending
//! actions into ready and blocked sets, executes the ready batch concurrently,
//! records produced entities in the [`ExecutionContext`], and substitutes
//! placeholders in the blocked actions until nothing is left to do.

pub mod action;
pub mod action_orchestrator;
pub mod config;
pub mod context;
pub mod dependency_graph;
pub mod dependency_rules;
pub mod error;
pub mod executor;
pub mod placeholder;
pub mod readiness;
pub mod record;
pub mod summary;

pub use action::{ActionArgs, PlannedAction};
pub use action_orchestrator::{ActionOrchestrator, OrchestrationResult, RunStatus};
pub use config::OrchestratorConfig;
pub use context::{ContextEntry, EntityInfo, ExecutionContext};
pub use dependency_graph::DependencyGraph;
pub use dependency_rules::{ImplicitDependencyResolver, ImplicitDependencyRule, PendingTools};
pub use error::{DeadlockReport, OrchestratorError};
pub use executor::{
    ActionExecutor, RegistryExecutor, Tool, ToolOutcome, ToolRegistry, format_tool_error,
};
pub use placeholder::{PlaceholderRef, is_placeholder, parse_placeholder};
pub use readiness::{BlockReason, BlockedAction, Partition, PendingAction, ReadinessPartitioner};
pub use record::ExecutionRecord;
pub use summary::{ActionReport, ActionSummary};
