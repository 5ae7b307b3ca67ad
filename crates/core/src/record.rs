//! Records produced by a dump call
//!
//! The manager's dump endpoints yield two shapes of object:
//!
//! ```text
//! {"id": "dep-1", ...}                                   bare entity
//! {"__entity": {...}, "__source": "executions",
//!  "__source_id": "exec-7"}                             entity with provenance
//! ```
//!
//! The second shape tells us which parent entity the record belongs to and
//! drives file routing. Parsing turns both into a [`Record`] once, so the
//! router matches on a variant instead of probing for keys.

use crate::error::{SnapshotError, SnapshotResult};
use serde_json::{Map, Value};

/// A JSON object as exported into a shard
pub type Entity = Map<String, Value>;

/// Envelope key holding the wrapped entity
pub const ENVELOPE_ENTITY: &str = "__entity";
/// Envelope key holding the parent's dump type
pub const ENVELOPE_SOURCE: &str = "__source";
/// Envelope key holding the parent's id
pub const ENVELOPE_SOURCE_ID: &str = "__source_id";

/// One entity yielded by a dump call
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// Entity with no parent context
    Bare(Entity),
    /// Entity belonging to a parent entity
    Wrapped {
        /// The entity itself
        entity: Entity,
        /// Parent's dump type name, e.g. `executions`
        source_type: String,
        /// Parent's id
        source_id: String,
    },
}

impl Record {
    /// Create a bare record
    pub fn bare(entity: Entity) -> Self {
        Record::Bare(entity)
    }

    /// Create a record with provenance
    pub fn wrapped(
        entity: Entity,
        source_type: impl Into<String>,
        source_id: impl Into<String>,
    ) -> Self {
        Record::Wrapped {
            entity,
            source_type: source_type.into(),
            source_id: source_id.into(),
        }
    }

    /// Parse a raw JSON object as returned by the manager
    ///
    /// An envelope whose `__source_id` is missing or empty carries no parent
    /// and parses as a bare record of its `__entity`. Otherwise `__source`
    /// must be a string.
    pub fn from_json(raw: Value) -> SnapshotResult<Self> {
        let mut obj = match raw {
            Value::Object(obj) => obj,
            other => {
                return Err(SnapshotError::upstream(
                    "parse record",
                    format!("expected a JSON object, got {}", other),
                ))
            }
        };

        let Some(inner) = obj.remove(ENVELOPE_ENTITY) else {
            return Ok(Record::Bare(obj));
        };
        let Value::Object(entity) = inner else {
            return Err(SnapshotError::upstream(
                "parse record",
                "`__entity` is not a JSON object",
            ));
        };
        let Some(source_id) = obj.get(ENVELOPE_SOURCE_ID).and_then(id_to_string) else {
            return Ok(Record::Bare(entity));
        };
        let source_type = match obj.remove(ENVELOPE_SOURCE) {
            Some(Value::String(s)) => s,
            other => {
                return Err(SnapshotError::upstream(
                    "parse record",
                    format!("invalid `__source`: {:?}", other),
                ))
            }
        };

        Ok(Record::Wrapped {
            entity,
            source_type,
            source_id,
        })
    }

    /// The entity payload
    pub fn entity(&self) -> &Entity {
        match self {
            Record::Bare(entity) | Record::Wrapped { entity, .. } => entity,
        }
    }

    /// Split into entity and optional `(source_type, source_id)`
    pub fn into_parts(self) -> (Entity, Option<(String, String)>) {
        match self {
            Record::Bare(entity) => (entity, None),
            Record::Wrapped {
                entity,
                source_type,
                source_id,
            } => (entity, Some((source_type, source_id))),
        }
    }
}

/// Render a JSON id (string or integer) as a string
///
/// Empty strings and non-scalar values are not ids.
pub fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
