//! Load-time backfill of legacy documents.
//!
//! Documents written by older tools may use legacy key names, lack fields
//! added later, lack ids, or repeat an id. Backfill turns the decoded
//! entries into a well-formed collection:
//!
//! - legacy key names are renamed to the declared names;
//! - absent derived fields are computed where the stored data allows it;
//! - absent fields with a declared default receive it;
//! - entries without an id, or repeating an earlier id, get a fresh one.
//!
//! Stored values are never overwritten and undeclared keys are kept. The
//! store persists the result once when anything changed, so a second load
//! finds nothing to do.

use crate::allocator::IdAllocator;
use crate::collection::{Collection, RawEntry};
use crate::derive::Deriver;
use crate::error::CoreResult;
use crate::record::{Fields, Record};
use crate::schema::Schema;
use crate::types::Kind;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fmt;

/// What a backfill changed in one kind's document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillReport {
    /// Kind backfilled.
    pub kind: Kind,
    /// Records in the resulting collection.
    pub records: usize,
    /// Legacy keys renamed to declared names.
    pub renamed_fields: usize,
    /// Absent fields filled from declared defaults.
    pub defaulted_fields: usize,
    /// Absent derived fields computed.
    pub derived_fields: usize,
    /// Ids allocated for entries missing or repeating one.
    pub assigned_ids: usize,
}

impl BackfillReport {
    fn new(kind: Kind) -> Self {
        Self {
            kind,
            records: 0,
            renamed_fields: 0,
            defaulted_fields: 0,
            derived_fields: 0,
            assigned_ids: 0,
        }
    }

    /// Whether the document needs rewriting.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.renamed_fields + self.defaulted_fields + self.derived_fields + self.assigned_ids > 0
    }
}

impl fmt::Display for BackfillReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} records, {} renamed, {} defaulted, {} derived, {} ids assigned",
            self.kind,
            self.records,
            self.renamed_fields,
            self.defaulted_fields,
            self.derived_fields,
            self.assigned_ids
        )
    }
}

/// Backfills decoded entries of one kind.
#[derive(Debug, Clone, Copy)]
pub struct Backfill<'a> {
    schema: &'a Schema,
    allocator: IdAllocator,
    today: NaiveDate,
}

impl<'a> Backfill<'a> {
    /// Creates a backfill for `schema`; `today` feeds derived statuses.
    #[must_use]
    pub fn new(schema: &'a Schema, allocator: IdAllocator, today: NaiveDate) -> Self {
        Self {
            schema,
            allocator,
            today,
        }
    }

    /// Builds a collection from `entries`, preserving their order.
    ///
    /// The first entry holding an id keeps it; later holders are
    /// re-identified.
    ///
    /// # Errors
    ///
    /// Returns `AllocationExhausted` if a fresh id cannot be allocated.
    pub fn run(&self, entries: Vec<RawEntry>) -> CoreResult<(Collection, BackfillReport)> {
        let kind = self.schema.kind;
        let mut report = BackfillReport::new(kind);
        let mut taken: HashSet<String> = entries.iter().filter_map(|e| e.id.clone()).collect();
        let mut collection = Collection::new(kind);
        let deriver = Deriver::fill_missing(self.today, None);

        for entry in entries {
            let mut fields = entry.fields;
            report.renamed_fields += usize::from(entry.legacy_id) + self.rename_aliases(&mut fields);
            report.derived_fields += deriver.apply(self.schema, &mut fields).len();
            report.defaulted_fields += self.fill_defaults(&mut fields);
            let fields = self.reorder(fields);

            let id = match entry.id {
                Some(id) if !collection.contains(&id) => id,
                previous => {
                    let id = self.allocator.allocate(kind, &self.schema.id_policy, &taken)?;
                    if let Some(previous) = previous {
                        tracing::warn!(%kind, duplicate = %previous, assigned = %id, "duplicate id re-allocated");
                    }
                    taken.insert(id.clone());
                    report.assigned_ids += 1;
                    id
                }
            };
            collection.insert(Record::new(kind, id, fields))?;
        }

        report.records = collection.len();
        Ok((collection, report))
    }

    fn rename_aliases(&self, fields: &mut Fields) -> usize {
        let mut renamed = 0;
        for spec in &self.schema.fields {
            for alias in spec.aliases {
                if let Some(value) = fields.remove(*alias) {
                    if !fields.contains_key(spec.name) {
                        fields.insert(spec.name.to_string(), value);
                    }
                    renamed += 1;
                }
            }
        }
        renamed
    }

    fn fill_defaults(&self, fields: &mut Fields) -> usize {
        let mut filled = 0;
        for spec in &self.schema.fields {
            if let Some(default) = &spec.default {
                if !fields.contains_key(spec.name) {
                    fields.insert(spec.name.to_string(), default.clone());
                    filled += 1;
                }
            }
        }
        filled
    }

    /// Declared fields in schema order, then any undeclared keys.
    fn reorder(&self, mut fields: Fields) -> Fields {
        let mut ordered = Fields::with_capacity(fields.len());
        for spec in &self.schema.fields {
            if let Some(value) = fields.remove(spec.name) {
                ordered.insert(spec.name.to_string(), value);
            }
        }
        ordered.extend(fields);
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::decode;
    use crate::config::ValidationPolicy;
    use crate::schema::SchemaRegistry;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::standard(&ValidationPolicy::default()).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn legacy_vehicles_receive_defaults() {
        let registry = registry();
        let schema = registry.schema(Kind::Vehicle).unwrap();
        let doc = br#"[{"vehicle_id": "VID-OLD001", "vehicle_number": "MH12AB1234", "driver_id": null}]"#;

        let (collection, report) = Backfill::new(schema, IdAllocator::new(10), today())
            .run(decode(schema, doc).unwrap())
            .unwrap();

        let record = collection.get("VID-OLD001").unwrap();
        assert_eq!(record.get_str("engine_number"), Some("-"));
        assert_eq!(record.get_str("model"), Some("TATA Prima E.28K"));
        assert_eq!(record.get_str("driver_assigned"), Some("Not Assigned"));
        assert_eq!(record.get_str("manager_name"), Some("Not Assigned"));
        assert!(record.get("manager_id").unwrap().is_null());
        assert!(report.changed());
        assert_eq!(report.records, 1);

        let keys: Vec<_> = record.fields().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "vehicle_number",
                "engine_number",
                "chassis_number",
                "manager_id",
                "manager_name",
                "driver_id",
                "driver_assigned",
                "model"
            ]
        );
    }

    #[test]
    fn insurance_aliases_are_renamed() {
        let registry = registry();
        let schema = registry.schema(Kind::Insurance).unwrap();
        let doc = br#"[{"Insurance ID": "12345678901", "Vehicle ID": "VID-ABC123",
            "Insurance Type": "Comprehensive", "Issue Date": "2024-01-10"}]"#;

        let (collection, report) = Backfill::new(schema, IdAllocator::new(10), today())
            .run(decode(schema, doc).unwrap())
            .unwrap();

        let record = collection.get("12345678901").unwrap();
        assert_eq!(record.get_str("vehicle_id"), Some("VID-ABC123"));
        assert_eq!(record.get_str("expiry_date"), Some("2025-01-10"));
        assert_eq!(record.get_str("status"), Some("ACTIVE"));
        assert_eq!(report.renamed_fields, 4);
        assert_eq!(report.derived_fields, 2);
    }

    #[test]
    fn missing_and_duplicate_ids_are_assigned() {
        let registry = registry();
        let schema = registry.schema(Kind::Maintenance).unwrap();
        let doc = br#"[
            {"maintenance_id": "MNT002", "vehicle_id": "VID-A"},
            {"vehicle_id": "VID-B"},
            {"maintenance_id": "MNT002", "vehicle_id": "VID-C"}
        ]"#;

        let (collection, report) = Backfill::new(schema, IdAllocator::new(10), today())
            .run(decode(schema, doc).unwrap())
            .unwrap();

        let ids: Vec<_> = collection.iter().map(Record::id).collect();
        assert_eq!(ids, ["MNT002", "MNT003", "MNT004"]);
        assert_eq!(collection.get("MNT002").unwrap().get_str("vehicle_id"), Some("VID-A"));
        assert_eq!(report.assigned_ids, 2);
    }

    #[test]
    fn well_formed_document_is_unchanged() {
        let registry = registry();
        let schema = registry.schema(Kind::Maintenance).unwrap();
        let doc = br#"[{"maintenance_id": "MNT001", "vehicle_id": "VID-A",
            "maintenance_type": "regular", "last_date_of_maintenance": "2024-05-01",
            "maintenance_status": "ok", "problem_description": "", "legacy_note": "kept"}]"#;

        let (collection, report) = Backfill::new(schema, IdAllocator::new(10), today())
            .run(decode(schema, doc).unwrap())
            .unwrap();
        assert!(!report.changed());
        assert_eq!(collection.get("MNT001").unwrap().get_str("legacy_note"), Some("kept"));
    }
}
