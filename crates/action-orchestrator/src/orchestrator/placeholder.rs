//! Placeholder recognition and substitution.
//!
//! A placeholder is a string of the form `<id of TYPE: NAME>` standing in for the
//! identifier of an entity that an earlier action is expected to produce. TYPE is
//! a bare word token, NAME is free text up to the first closing `>`. Text after
//! the `>` is ignored and the whole argument is replaced by the resolved value.
//!
//! Any string argument (or list element) that contains `<id of` anywhere is
//! treated as a placeholder. If it does not start with a well-formed token it can
//! never be resolved, so its action stays blocked and is never sent to a tool.
//! Other values pass through untouched.

use regex::Regex;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, warn};

use super::action::ActionArgs;
use super::context::ExecutionContext;
use super::error::OrchestratorError;

const PLACEHOLDER_PREFIX: &str = "<id of";

static PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<id of (\w+):\s*([^>]+)>").expect("valid placeholder pattern"));

static UUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("valid uuid pattern")
});

/// A parsed placeholder: the type and planned name of the referenced entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlaceholderRef {
    pub entity_type: String,
    pub entity_name: String,
}

impl PlaceholderRef {
    /// Context lookup key, `"{entity_type}:{entity_name}"`.
    pub fn lookup_key(&self) -> String {
        format!("{}:{}", self.entity_type, self.entity_name)
    }
}

impl fmt::Display for PlaceholderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<id of {}: {}>", self.entity_type, self.entity_name)
    }
}

/// Returns true if the value is a string containing `<id of`.
///
/// A token that passes here may still fail [`parse_placeholder`], in which case
/// it is treated as unresolved.
pub fn is_placeholder(value: &JsonValue) -> bool {
    value.as_str().is_some_and(is_placeholder_token)
}

fn is_placeholder_token(token: &str) -> bool {
    token.contains(PLACEHOLDER_PREFIX)
}

/// Parses a placeholder token into its entity type and name.
///
/// Returns `None` for malformed tokens, including an empty name.
pub fn parse_placeholder(token: &str) -> Option<PlaceholderRef> {
    let captures = PLACEHOLDER_PATTERN.captures(token.trim())?;
    let entity_type = captures.get(1)?.as_str().to_string();
    let entity_name = captures.get(2)?.as_str().trim().to_string();

    if entity_name.is_empty() {
        return None;
    }

    Some(PlaceholderRef {
        entity_type,
        entity_name,
    })
}

/// Collects every placeholder token in the arguments as `(argument name, token)`.
pub fn placeholder_tokens(args: &ActionArgs) -> Vec<(&str, &str)> {
    let mut tokens = Vec::new();

    for (name, value) in args {
        match value {
            JsonValue::String(s) if is_placeholder_token(s) => tokens.push((name.as_str(), s.as_str())),
            JsonValue::Array(items) => {
                for item in items {
                    if let JsonValue::String(s) = item
                        && is_placeholder_token(s)
                    {
                        tokens.push((name.as_str(), s.as_str()));
                    }
                }
            }
            _ => {}
        }
    }

    tokens
}

/// Resolves placeholders against an [`ExecutionContext`].
///
/// Field selection: arguments listed in `identifier_fields` receive the entity's
/// short identifier (falling back to its id), every other argument receives the
/// entity id.
#[derive(Debug, Clone, Copy)]
pub struct PlaceholderResolver<'a> {
    context: &'a ExecutionContext,
    identifier_fields: &'a [String],
    validate_uuid_ids: bool,
}

impl<'a> PlaceholderResolver<'a> {
    pub fn new(
        context: &'a ExecutionContext,
        identifier_fields: &'a [String],
        validate_uuid_ids: bool,
    ) -> Self {
        Self {
            context,
            identifier_fields,
            validate_uuid_ids,
        }
    }

    /// Resolves one placeholder token for the given argument.
    pub fn resolve_token(&self, field: &str, token: &str) -> Result<String, OrchestratorError> {
        let reference = parse_placeholder(token)
            .ok_or_else(|| OrchestratorError::PlaceholderParse(token.to_string()))?;

        let entity = self
            .context
            .resolve(&reference.entity_type, &reference.entity_name)
            .ok_or_else(|| OrchestratorError::EntityNotFound {
                entity_type: reference.entity_type.clone(),
                entity_name: reference.entity_name.clone(),
            })?;

        let value = if self.identifier_fields.iter().any(|f| f == field) {
            match entity.entity_identifier.as_deref().filter(|s| !s.is_empty()) {
                Some(identifier) => identifier.to_string(),
                None => {
                    warn!(
                        field = %field,
                        entity = %reference.lookup_key(),
                        "No entity_identifier available, using entity_id as fallback"
                    );
                    entity.entity_id.clone()
                }
            }
        } else {
            entity.entity_id.clone()
        };

        if value.trim().is_empty() {
            return Err(OrchestratorError::MissingEntityValue {
                field: field.to_string(),
                entity_name: reference.entity_name,
            });
        }

        if self.validate_uuid_ids && field.ends_with("_id") && !UUID_PATTERN.is_match(&value) {
            return Err(OrchestratorError::InvalidIdentifier {
                field: field.to_string(),
                value,
            });
        }

        Ok(value)
    }

    /// Returns the placeholders in `args` that cannot be resolved right now.
    ///
    /// Missing entities are reported by lookup key and malformed tokens verbatim.
    /// An entity that exists but yields an unusable value is reported by lookup
    /// key followed by the reason, e.g. `project:Launch (Field 'project_id' ...)`.
    pub fn unresolved(&self, args: &ActionArgs) -> Vec<String> {
        placeholder_tokens(args)
            .into_iter()
            .filter_map(|(field, token)| {
                let Some(reference) = parse_placeholder(token) else {
                    return Some(token.to_string());
                };
                match self.resolve_token(field, token) {
                    Ok(_) => None,
                    Err(OrchestratorError::EntityNotFound { .. }) => Some(reference.lookup_key()),
                    Err(e) => Some(format!("{} ({e})", reference.lookup_key())),
                }
            })
            .collect()
    }

    /// Substitutes every resolvable placeholder in `args` in place.
    ///
    /// Placeholders that cannot be resolved yet are left as they are. Returns the
    /// number of substitutions made.
    pub fn substitute(&self, args: &mut ActionArgs) -> usize {
        let mut substituted = 0;

        for (field, value) in args.iter_mut() {
            match value {
                JsonValue::String(token) if is_placeholder_token(token) => {
                    if let Some(resolved) = self.try_resolve(field, token) {
                        *value = JsonValue::String(resolved);
                        substituted += 1;
                    }
                }
                JsonValue::Array(items) => {
                    for item in items.iter_mut() {
                        if let JsonValue::String(token) = item
                            && is_placeholder_token(token)
                            && let Some(resolved) = self.try_resolve(field, token)
                        {
                            *item = JsonValue::String(resolved);
                            substituted += 1;
                        }
                    }
                }
                _ => {}
            }
        }

        substituted
    }

    fn try_resolve(&self, field: &str, token: &str) -> Option<String> {
        match self.resolve_token(field, token) {
            Ok(resolved) => {
                debug!(field = %field, placeholder = %token, resolved = %resolved, "Resolved placeholder");
                Some(resolved)
            }
            Err(e) => {
                debug!(field = %field, placeholder = %token, error = %e, "Placeholder still unresolved");
                None
            }
        }
    }
}
