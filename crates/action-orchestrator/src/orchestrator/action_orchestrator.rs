//! Driver loop: partition, execute the ready batch concurrently, resolve, repeat.
//!
//! Each iteration splits the pending actions into ready and blocked sets, runs
//! the whole ready batch concurrently and waits for all of it, registers the
//! produced entities, and substitutes placeholders in the blocked actions. The
//! loop ends when nothing is pending, when every pending action is blocked
//! (deadlock), or when the iteration cap is reached.

use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::mem;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::action::PlannedAction;
use super::config::OrchestratorConfig;
use super::context::ExecutionContext;
use super::dependency_rules::ImplicitDependencyResolver;
use super::error::{DeadlockReport, OrchestratorError};
use super::executor::{ActionExecutor, format_tool_error};
use super::placeholder::{PlaceholderResolver, placeholder_tokens};
use super::readiness::{BlockedAction, Partition, PendingAction, ReadinessPartitioner};
use super::record::{ExecutionRecord, current_timestamp_ms};
use super::summary::{ActionReport, ActionSummary};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Every planned action ran (successfully or not)
    Completed,
    /// The remaining actions reference entities that will never exist
    Deadlocked,
    /// The iteration cap was reached
    SafetyBoundExceeded,
    /// The cancellation token fired between batches
    Cancelled,
}

/// Result of an orchestration run.
///
/// Records are always returned, including when the run aborted early.
#[derive(Debug, Clone)]
pub struct OrchestrationResult {
    pub status: RunStatus,
    /// One record per executed action, in completion order
    pub records: Vec<ExecutionRecord>,
    /// Actions that never ran, with whatever substitutions were made
    pub pending: Vec<PlannedAction>,
    /// Number of partition/execute iterations performed
    pub iterations: usize,
    /// Entities produced during the run
    pub context: ExecutionContext,
    /// Run-level error for any status other than `Completed`
    pub error: Option<OrchestratorError>,
    pub summary: ActionSummary,
}

impl OrchestrationResult {
    /// Every planned action was executed.
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Some executed action failed.
    pub fn has_failures(&self) -> bool {
        self.records.iter().any(|r| !r.success)
    }

    /// The record for the action at `plan_index`, if it ran.
    pub fn record_for(&self, plan_index: usize) -> Option<&ExecutionRecord> {
        self.records.iter().find(|r| r.plan_index == plan_index)
    }

    /// Condensed per-action views in completion order.
    pub fn reports(&self) -> Vec<ActionReport> {
        self.records.iter().map(ActionReport::from_record).collect()
    }

    /// Converts a run that did not complete into its run-level error.
    ///
    /// Inspect `records` first if partial results matter; they are dropped on `Err`.
    pub fn into_result(self) -> Result<Self, OrchestratorError> {
        match (self.status, self.error) {
            (RunStatus::Completed, error) => Ok(Self { error, ..self }),
            (_, Some(error)) => Err(error),
            (_, None) => Err(OrchestratorError::InvalidConfig(format!(
                "run ended with status {:?} but carried no error",
                self.status
            ))),
        }
    }
}

/// Executes a planned action list with dependency resolution.
///
/// # Examples
///
/// ```ignore
/// use action_orchestrator::orchestrator::{ActionOrchestrator, RegistryExecutor};
///
/// let orchestrator = ActionOrchestrator::new(Arc::new(RegistryExecutor::new(registry)))?;
/// let result = orchestrator.execute(planned_actions).await;
///
/// for record in &result.records {
///     println!("{} -> {}", record.tool_name, record.success);
/// }
/// ```
pub struct ActionOrchestrator {
    executor: Arc<dyn ActionExecutor>,
    config: OrchestratorConfig,
    rules: ImplicitDependencyResolver,
}

impl ActionOrchestrator {
    /// Creates an orchestrator with the default configuration.
    pub fn new(executor: Arc<dyn ActionExecutor>) -> Result<Self, OrchestratorError> {
        Self::with_config(executor, OrchestratorConfig::default())
    }

    /// Creates an orchestrator with a custom configuration.
    pub fn with_config(
        executor: Arc<dyn ActionExecutor>,
        config: OrchestratorConfig,
    ) -> Result<Self, OrchestratorError> {
        config.validate()?;
        let rules = ImplicitDependencyResolver::new(config.dependency_rules.clone())?;

        Ok(Self {
            executor,
            config,
            rules,
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Executes all actions.
    pub async fn execute(&self, actions: Vec<PlannedAction>) -> OrchestrationResult {
        self.execute_with_cancellation(actions, CancellationToken::new())
            .await
    }

    /// Executes all actions, stopping before the next batch once `cancellation_token`
    /// fires. A batch already in flight always completes and its records are kept.
    pub async fn execute_with_cancellation(
        &self,
        actions: Vec<PlannedAction>,
        cancellation_token: CancellationToken,
    ) -> OrchestrationResult {
        let total_actions = actions.len();

        self.run(actions, cancellation_token)
            .instrument(info_span!(
                "action_orchestrator_execute",
                total_actions = total_actions,
            ))
            .await
    }

    async fn run(
        &self,
        actions: Vec<PlannedAction>,
        cancellation_token: CancellationToken,
    ) -> OrchestrationResult {
        let started = Instant::now();
        let total_actions = actions.len();
        let iteration_limit = self.config.iteration_limit(total_actions);

        info!("Starting orchestrated execution of {} actions", total_actions);
        self.log_plan_shape(&actions);

        let mut pending: Vec<PendingAction> = actions
            .into_iter()
            .enumerate()
            .map(|(plan_index, action)| PendingAction { plan_index, action })
            .collect();
        let mut context = ExecutionContext::new();
        let mut records: Vec<ExecutionRecord> = Vec::new();
        let mut iteration = 0usize;

        let run_error = loop {
            if pending.is_empty() {
                break None;
            }

            if cancellation_token.is_cancelled() {
                warn!(remaining = pending.len(), "Orchestration cancelled before next batch");
                break Some(OrchestratorError::Cancelled);
            }

            if iteration >= iteration_limit {
                warn!(
                    iterations = iteration,
                    remaining = pending.len(),
                    "Reached max iterations, stopping"
                );
                let report = self.stall_report(pending.iter().map(|p| &p.action), &context);
                break Some(OrchestratorError::SafetyBoundExceeded {
                    iterations: iteration,
                    remaining: pending.len(),
                    report,
                });
            }

            iteration += 1;

            // 1. Partition
            let Partition { mut ready, blocked } = self
                .partitioner(&context)
                .partition(mem::take(&mut pending));

            info!(
                iteration = iteration,
                ready = ready.len(),
                blocked = blocked.len(),
                "Partitioned pending actions"
            );

            // 2. Deadlock
            if ready.is_empty() && !blocked.is_empty() {
                let report = self.stall_report(blocked.iter().map(|b| &b.pending.action), &context);
                error!(
                    unresolved = ?report.unresolved_placeholders,
                    available = ?report.available_entities,
                    "Deadlock detected, cannot resolve placeholders"
                );
                pending = blocked.into_iter().map(|b| b.pending).collect();
                break Some(OrchestratorError::UnresolvableReference(report));
            }

            // 3. Execute the ready batch
            {
                let resolver = self.placeholder_resolver(&context);
                for item in &mut ready {
                    resolver.substitute(&mut item.action.args);
                }
            }

            let batch_span = info_span!(
                "batch",
                iteration = iteration,
                ready = ready.len(),
                blocked = blocked.len()
            );
            let completed = self
                .execute_batch(ready, records.len())
                .instrument(batch_span)
                .await;

            for (item, record) in completed {
                if record.success {
                    context.record(&item.action, &record);
                } else {
                    warn!(
                        tool_name = %record.tool_name,
                        "Action failed, not updating context"
                    );
                }
                records.push(record);
            }

            // 4. Resolve placeholders in what is still blocked
            let resolver = self.placeholder_resolver(&context);
            pending = blocked
                .into_iter()
                .map(|BlockedAction { mut pending, .. }| {
                    let substituted = resolver.substitute(&mut pending.action.args);
                    if substituted > 0 {
                        debug!(
                            tool_name = %pending.action.tool_name,
                            substituted = substituted,
                            "Resolved placeholders in blocked action"
                        );
                    }
                    pending
                })
                .collect();
        };

        let status = match &run_error {
            None => RunStatus::Completed,
            Some(OrchestratorError::UnresolvableReference(_)) => RunStatus::Deadlocked,
            Some(OrchestratorError::Cancelled) => RunStatus::Cancelled,
            Some(_) => RunStatus::SafetyBoundExceeded,
        };

        let summary = ActionSummary::from_records(total_actions, &records, started.elapsed());
        info!(
            status = ?status,
            completed = summary.completed,
            failed = summary.failed,
            not_executed = summary.not_executed,
            "Orchestration finished"
        );

        OrchestrationResult {
            status,
            records,
            pending: pending.into_iter().map(|p| p.action).collect(),
            iterations: iteration,
            context,
            error: run_error,
            summary,
        }
    }

    /// Runs one batch concurrently and waits for all of it.
    ///
    /// Records are numbered in completion order, continuing after `sequence_base`.
    async fn execute_batch(
        &self,
        ready: Vec<PendingAction>,
        sequence_base: usize,
    ) -> Vec<(PendingAction, ExecutionRecord)> {
        let semaphore = self
            .config
            .max_concurrent_tasks
            .map(|max| Arc::new(Semaphore::new(max)));
        let mut in_flight = FuturesUnordered::new();

        for item in ready {
            let executor = Arc::clone(&self.executor);
            let semaphore = semaphore.clone();
            let action = item.action.clone();

            let action_span = info_span!(
                "orchestrated_action",
                tool_name = %item.action.tool_name,
                plan_index = item.plan_index,
            );

            let task = tokio::spawn(
                async move {
                    let _permit = match &semaphore {
                        Some(semaphore) => semaphore.acquire().await.ok(),
                        None => None,
                    };
                    debug!("Action execution started");
                    executor.execute(&action).await
                }
                .instrument(action_span),
            );

            in_flight.push(task.map(move |joined| (item, joined)));
        }

        let mut completed = Vec::with_capacity(in_flight.len());

        while let Some((item, joined)) = in_flight.next().await {
            let sequence = sequence_base + completed.len() + 1;
            let executed_at_ms = current_timestamp_ms();

            let record = match joined {
                Ok(Ok(mut outcome)) => {
                    if !outcome.success {
                        outcome.error = outcome.error.map(|e| format_tool_error(&e));
                    }
                    ExecutionRecord::from_outcome(
                        sequence,
                        item.plan_index,
                        &item.action,
                        outcome,
                        executed_at_ms,
                    )
                }
                Ok(Err(e)) => {
                    error!(tool_name = %item.action.tool_name, error = %e, "Failed to execute action");
                    ExecutionRecord::failure(
                        sequence,
                        item.plan_index,
                        &item.action,
                        format_tool_error(&e.to_string()),
                        executed_at_ms,
                    )
                }
                Err(join_error) => {
                    error!(tool_name = %item.action.tool_name, error = %join_error, "Action task aborted");
                    ExecutionRecord::failure(
                        sequence,
                        item.plan_index,
                        &item.action,
                        format_tool_error(
                            &OrchestratorError::tool_execution(
                                &item.action.tool_name,
                                format!("task aborted: {join_error}"),
                            )
                            .to_string(),
                        ),
                        executed_at_ms,
                    )
                }
            };

            if record.success {
                info!(tool_name = %record.tool_name, sequence = sequence, "Action completed successfully");
            }

            completed.push((item, record));
        }

        completed
    }

    fn placeholder_resolver<'a>(&'a self, context: &'a ExecutionContext) -> PlaceholderResolver<'a> {
        PlaceholderResolver::new(
            context,
            &self.config.identifier_fields,
            self.config.validate_uuid_ids,
        )
    }

    fn partitioner<'a>(&'a self, context: &'a ExecutionContext) -> ReadinessPartitioner<'a> {
        ReadinessPartitioner::new(&self.rules, self.placeholder_resolver(context))
    }

    /// Diagnostics for the actions a run stopped with.
    fn stall_report<'p>(
        &self,
        stalled: impl Iterator<Item = &'p PlannedAction>,
        context: &ExecutionContext,
    ) -> DeadlockReport {
        let resolver = self.placeholder_resolver(context);
        let mut unresolved_placeholders: Vec<String> = Vec::new();
        let mut blocked_tools = Vec::new();

        for action in stalled {
            for key in resolver.unresolved(&action.args) {
                if !unresolved_placeholders.contains(&key) {
                    unresolved_placeholders.push(key);
                }
            }
            blocked_tools.push(action.tool_name.clone());
        }

        DeadlockReport {
            unresolved_placeholders,
            blocked_tools,
            available_entities: context.keys(),
        }
    }

    fn log_plan_shape(&self, actions: &[PlannedAction]) {
        let has_placeholders = actions
            .iter()
            .any(|a| !placeholder_tokens(&a.args).is_empty());
        let has_rule_edges = self
            .rules
            .has_edges_among(actions.iter().map(|a| a.tool_name.as_str()));

        if has_placeholders || has_rule_edges {
            debug!(
                has_placeholders = has_placeholders,
                has_rule_edges = has_rule_edges,
                "Plan has dependencies, executing in batches"
            );
        } else {
            debug!("All actions are independent, expecting a single batch");
        }
    }
}
