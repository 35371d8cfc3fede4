//! Splits pending actions into a ready batch and a blocked remainder.

use tracing::debug;

use super::action::PlannedAction;
use super::dependency_rules::{ImplicitDependencyResolver, PendingTools};
use super::placeholder::PlaceholderResolver;

/// A planned action that has not run yet, tagged with its plan position.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    pub plan_index: usize,
    pub action: PlannedAction,
}

/// Why an action cannot run in the current batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    /// Placeholders whose entity is not (yet) in the context
    UnresolvedPlaceholders(Vec<String>),
    /// An action of this prerequisite tool is still pending
    PendingPrerequisite(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockedAction {
    pub pending: PendingAction,
    pub reason: BlockReason,
}

/// Result of one readiness check. Both lists keep plan order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub ready: Vec<PendingAction>,
    pub blocked: Vec<BlockedAction>,
}

impl Partition {
    /// Every action is blocked and none can run.
    pub fn is_deadlocked(&self) -> bool {
        self.ready.is_empty() && !self.blocked.is_empty()
    }
}

/// Combines placeholder resolvability and the implicit rule table.
///
/// An action is blocked if any of its placeholders cannot be resolved against
/// the current context, or if its tool is the dependent side of a rule whose
/// prerequisite tool is still pending. Everything else is ready; ready actions in
/// the same partition have no dependency on each other.
pub struct ReadinessPartitioner<'a> {
    rules: &'a ImplicitDependencyResolver,
    placeholders: PlaceholderResolver<'a>,
}

impl<'a> ReadinessPartitioner<'a> {
    pub fn new(rules: &'a ImplicitDependencyResolver, placeholders: PlaceholderResolver<'a>) -> Self {
        Self { rules, placeholders }
    }

    /// Partitions `pending`. The pending tool multiset includes every action
    /// passed in, the ones being checked among them.
    pub fn partition(&self, pending: Vec<PendingAction>) -> Partition {
        let pending_tools: PendingTools = pending.iter().map(|p| p.action.tool_name.as_str()).collect();
        let mut partition = Partition::default();

        for item in pending {
            match self.block_reason(&item.action, &pending_tools) {
                Some(reason) => {
                    debug!(
                        tool_name = %item.action.tool_name,
                        plan_index = item.plan_index,
                        reason = ?reason,
                        "Action blocked"
                    );
                    partition.blocked.push(BlockedAction { pending: item, reason });
                }
                None => partition.ready.push(item),
            }
        }

        partition
    }

    /// Returns why `action` cannot run now, or `None` if it is ready.
    pub fn block_reason(&self, action: &PlannedAction, pending_tools: &PendingTools) -> Option<BlockReason> {
        let unresolved = self.placeholders.unresolved(&action.args);
        if !unresolved.is_empty() {
            return Some(BlockReason::UnresolvedPlaceholders(unresolved));
        }

        self.rules
            .blocking_prerequisite(&action.tool_name, pending_tools)
            .map(BlockReason::PendingPrerequisite)
    }
}
