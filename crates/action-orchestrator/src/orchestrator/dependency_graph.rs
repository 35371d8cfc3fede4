//! Directed graph over tool names built from the implicit dependency rules.
//!
//! An edge `dependent -> prerequisite` means no action of the dependent tool may
//! start while an action of the prerequisite tool is still pending. The graph
//! must be acyclic, otherwise two tools would wait on each other forever.

use std::collections::{HashMap, HashSet};

/// A directed graph of tool-kind dependencies.
///
/// # Examples
///
/// ```ignore
/// use action_orchestrator::orchestrator::DependencyGraph;
///
/// let mut graph = DependencyGraph::new();
/// graph.add_dependency("cycles_add_work_items", "cycles_create");
///
/// assert!(graph.get_prerequisites("cycles_add_work_items").contains("cycles_create"));
/// assert!(graph.find_cycle().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// tool -> tools it waits for
    prerequisites: HashMap<String, HashSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an edge: `dependent` waits for `prerequisite`. Both nodes are
    /// created if missing.
    pub fn add_dependency(&mut self, dependent: &str, prerequisite: &str) {
        self.prerequisites
            .entry(dependent.to_string())
            .or_default()
            .insert(prerequisite.to_string());
        self.prerequisites.entry(prerequisite.to_string()).or_default();
    }

    /// Tools that `tool` waits for. Empty for unknown tools.
    pub fn get_prerequisites(&self, tool: &str) -> HashSet<String> {
        self.prerequisites.get(tool).cloned().unwrap_or_default()
    }

    /// Finds a cycle, returning the tools on it in edge order.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();

        let mut nodes: Vec<&String> = self.prerequisites.keys().collect();
        nodes.sort();

        for node in nodes {
            if let Some(cycle) = self.find_cycle_dfs(node, &mut visited, &mut stack) {
                return Some(cycle);
            }
        }

        None
    }

    fn find_cycle_dfs(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        stack: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        if let Some(pos) = stack.iter().position(|n| n == node) {
            let mut cycle = stack[pos..].to_vec();
            cycle.push(node.to_string());
            return Some(cycle);
        }

        if visited.contains(node) {
            return None;
        }

        visited.insert(node.to_string());
        stack.push(node.to_string());

        if let Some(prereqs) = self.prerequisites.get(node) {
            let mut prereqs: Vec<&String> = prereqs.iter().collect();
            prereqs.sort();
            for prereq in prereqs {
                if let Some(cycle) = self.find_cycle_dfs(prereq, visited, stack) {
                    return Some(cycle);
                }
            }
        }

        stack.pop();
        None
    }
}
