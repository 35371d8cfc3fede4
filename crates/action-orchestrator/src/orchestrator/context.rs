//! Execution context: entities produced so far in the current run.
//!
//! Each produced entity is stored once as a [`ContextEntry`]; lookup keys are
//! aliases pointing at that single entry. An entity is reachable under
//! `"{type}:{name}"` and the bare `{name}`, for both the name the tool actually
//! returned and, when it differs, the name the planner asked for.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::action::PlannedAction;
use super::record::ExecutionRecord;

/// Identifying information for an entity produced by a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityInfo {
    /// Entity type (e.g. `project`, `cycle`)
    pub entity_type: String,
    /// Actual name after execution (may differ from the planned name)
    pub entity_name: String,
    /// Opaque entity id
    pub entity_id: String,
    /// Optional short code (e.g. `PROJ`)
    #[serde(default)]
    pub entity_identifier: Option<String>,
}

impl EntityInfo {
    pub fn new(
        entity_type: impl Into<String>,
        entity_name: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_name: entity_name.into(),
            entity_id: entity_id.into(),
            entity_identifier: None,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.entity_identifier = Some(identifier.into());
        self
    }
}

/// A registered entity together with the record that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub entity: EntityInfo,
    /// Sequence number of the producing [`ExecutionRecord`]
    pub sequence: usize,
    /// Tool that produced the entity
    pub tool_name: String,
}

/// Append-only index from lookup keys to produced entities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionContext {
    entries: Vec<ContextEntry>,
    aliases: BTreeMap<String, usize>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the entity produced by `record`.
    ///
    /// No-op unless the record succeeded and carries entity info with a type and
    /// name. Returns the number of lookup keys registered.
    pub fn record(&mut self, action: &PlannedAction, record: &ExecutionRecord) -> usize {
        if !record.success {
            return 0;
        }

        let Some(entity) = record.entity_info.as_ref() else {
            return 0;
        };

        let entity_type = entity.entity_type.trim();
        let actual_name = entity.entity_name.trim();
        if entity_type.is_empty() || actual_name.is_empty() {
            return 0;
        }

        let mut keys = vec![format!("{entity_type}:{actual_name}"), actual_name.to_string()];

        if let Some(planned_name) = action.planned_name()
            && planned_name != actual_name
        {
            info!(
                planned = %planned_name,
                actual = %actual_name,
                "Name mismatch, registering entity under both names"
            );
            keys.push(format!("{entity_type}:{planned_name}"));
            keys.push(planned_name.to_string());
        }

        let index = self.entries.len();
        self.entries.push(ContextEntry {
            entity: entity.clone(),
            sequence: record.sequence,
            tool_name: record.tool_name.clone(),
        });

        for key in &keys {
            if let Some(previous) = self.aliases.insert(key.clone(), index) {
                debug!(key = %key, previous_entry = previous, "Lookup key now points at a newer entity");
            }
        }

        info!(
            entity = %keys[0],
            keys = keys.len(),
            "Stored entity in execution context"
        );

        keys.len()
    }

    /// Looks up the entry for `"{entity_type}:{entity_name}"`, falling back to
    /// the bare `entity_name`.
    pub fn lookup(&self, entity_type: &str, entity_name: &str) -> Option<&ContextEntry> {
        self.aliases
            .get(&format!("{entity_type}:{entity_name}"))
            .or_else(|| self.aliases.get(entity_name))
            .and_then(|&index| self.entries.get(index))
    }

    /// Resolves a reference to the entity it names.
    pub fn resolve(&self, entity_type: &str, entity_name: &str) -> Option<&EntityInfo> {
        self.lookup(entity_type, entity_name).map(|entry| &entry.entity)
    }

    /// Returns true if the reference can be resolved.
    pub fn contains(&self, entity_type: &str, entity_name: &str) -> bool {
        self.lookup(entity_type, entity_name).is_some()
    }

    /// All lookup keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.aliases.keys().cloned().collect()
    }

    /// Registered entities in registration order.
    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
