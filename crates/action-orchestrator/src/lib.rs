//! 'action-orchestrator' - Dependency-aware execution of planned tool actions.
//!
//! An upstream planner proposes a list of tool invocations ("create a project,
//! then add a cycle to it, then assign users"). Later actions refer to entities
//! produced by earlier ones through symbolic placeholders such as
//! `<id of project: Launch>` instead of real identifiers. This crate decides an
//! execution order for such a plan, resolves placeholders against the results of
//! already-executed actions, runs independent actions concurrently in batches,
//! and reports plans that can never complete.
//!
//! # Quick start
//!
//! ```ignore
//! use action_orchestrator::orchestrator::{
//!     ActionOrchestrator, PlannedAction, RegistryExecutor, ToolRegistry,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let mut registry = ToolRegistry::new();
//! registry.register("project", Arc::new(CreateProjectTool::default()));
//! registry.register("cycle", Arc::new(CreateCycleTool::default()));
//!
//! let orchestrator = ActionOrchestrator::new(Arc::new(RegistryExecutor::new(registry)))?;
//!
//! let result = orchestrator
//!     .execute(vec![
//!         PlannedAction::new("projects_create").with_arg("name", json!("Launch")),
//!         PlannedAction::new("cycles_create")
//!             .with_arg("project_id", json!("<id of project: Launch>"))
//!             .with_arg("name", json!("Sprint1")),
//!     ])
//!     .await;
//!
//! assert!(result.is_complete());
//! ```

pub mod observability;
pub mod orchestrator;

pub use orchestrator::{
    ActionExecutor, ActionOrchestrator, EntityInfo, ExecutionContext, ExecutionRecord,
    OrchestrationResult, OrchestratorConfig, OrchestratorError, PlannedAction, RunStatus,
    ToolOutcome, ToolRegistry,
};
