//! Referential index.
//!
//! Answers existence, role and reverse-reference questions over a
//! point-in-time set of collection snapshots. Snapshots are immutable, so an
//! index can be built from the published collections without taking any
//! writer lock; writers that need an exact view build one from the
//! collections they hold locked.

use crate::collection::Collection;
use crate::error::{CoreError, CoreResult, Referrer, ValidationError};
use crate::record::{Fields, Record};
use crate::schema::{Schema, SchemaRegistry};
use crate::types::Kind;
use serde_json::Value;
use std::sync::Arc;

/// Lookup structure over collection snapshots.
#[derive(Debug, Clone, Default)]
pub struct ReferentialIndex {
    snapshots: [Option<Arc<Collection>>; 4],
}

impl ReferentialIndex {
    /// Creates an index with no collections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the snapshot of the collection's kind.
    #[must_use]
    pub fn with(mut self, collection: Arc<Collection>) -> Self {
        self.insert(collection);
        self
    }

    /// Adds or replaces the snapshot of the collection's kind.
    pub fn insert(&mut self, collection: Arc<Collection>) {
        let slot = collection.kind().index();
        self.snapshots[slot] = Some(collection);
    }

    /// The snapshot of `kind`, if indexed.
    #[must_use]
    pub fn collection(&self, kind: Kind) -> Option<&Collection> {
        self.snapshots[kind.index()].as_deref()
    }

    /// Whether a record of `kind` with `id` exists.
    #[must_use]
    pub fn exists(&self, kind: Kind, id: &str) -> bool {
        self.get(kind, id).is_some()
    }

    /// Looks up a record.
    #[must_use]
    pub fn get(&self, kind: Kind, id: &str) -> Option<&Record> {
        self.collection(kind)?.get(id)
    }

    /// Records of `kind` whose `field` equals `value`, ignoring case.
    #[must_use]
    pub fn find_by_role(&self, kind: Kind, field: &str, value: &str) -> Vec<&Record> {
        self.collection(kind)
            .map(|c| {
                c.iter()
                    .filter(|r| r.get_str(field).is_some_and(|v| v.eq_ignore_ascii_case(value)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every record pointing at `kind`/`id`, in registry and insertion order.
    #[must_use]
    pub fn references_of(&self, registry: &SchemaRegistry, kind: Kind, id: &str) -> Vec<Referrer> {
        registry
            .referrers_of(kind)
            .into_iter()
            .flat_map(move |(schema, field)| {
                self.collection(schema.kind)
                    .into_iter()
                    .flat_map(|c| c.iter())
                    .filter(move |r| r.get_str(field.name) == Some(id))
                    .map(move |r| Referrer {
                        kind: schema.kind,
                        id: r.id().to_string(),
                        field: field.name.to_string(),
                    })
            })
            .collect()
    }

    /// Checks the foreign keys of `fields` against the indexed snapshots.
    ///
    /// With `previous`, only keys whose value changed are checked, so an
    /// update that leaves an assignment alone is not rejected because the
    /// assigned user's role changed since.
    ///
    /// # Errors
    ///
    /// Returns `Referential` for a missing target and `Validation` when the
    /// target exists but has the wrong role.
    pub fn check(&self, schema: &Schema, fields: &Fields, previous: Option<&Fields>) -> CoreResult<()> {
        for (spec, reference) in schema.references() {
            let Some(target_id) = fields.get(spec.name).and_then(Value::as_str) else {
                continue;
            };
            if previous.is_some_and(|p| p.get(spec.name).and_then(Value::as_str) == Some(target_id)) {
                continue;
            }

            let Some(target) = self.get(reference.target, target_id) else {
                return Err(CoreError::Referential {
                    kind: schema.kind,
                    field: spec.name.to_string(),
                    target: reference.target,
                    id: target_id.to_string(),
                });
            };

            if let Some(role) = &reference.role {
                let holds = target
                    .get_str(role.field)
                    .is_some_and(|v| v.eq_ignore_ascii_case(role.value));
                if !holds {
                    return Err(ValidationError::new(
                        spec.name,
                        format!("{} {target_id} is not a {}", reference.target, role.value),
                    )
                    .into());
                }
            }
        }
        Ok(())
    }
}
