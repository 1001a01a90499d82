//! Store-computed fields.

use crate::index::ReferentialIndex;
use crate::lifecycle::{expiry_for, format_date, status_at};
use crate::record::Fields;
use crate::schema::{Derivation, Schema};
use crate::validation::parse_date;
use chrono::{Datelike, NaiveDate};
use serde_json::Value;

/// Applies a schema's derivations to a field map.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deriver<'a> {
    today: NaiveDate,
    index: Option<&'a ReferentialIndex>,
    only_missing: bool,
}

impl<'a> Deriver<'a> {
    /// Recomputes every derived field, as on a write.
    pub(crate) fn refresh(today: NaiveDate, index: &'a ReferentialIndex) -> Self {
        Self {
            today,
            index: Some(index),
            only_missing: false,
        }
    }

    /// Fills derived fields that are absent or null, leaving stored values
    /// alone, as on load.
    pub(crate) fn fill_missing(today: NaiveDate, index: Option<&'a ReferentialIndex>) -> Self {
        Self {
            today,
            index,
            only_missing: true,
        }
    }

    /// Applies the derivations in order; returns the names of changed fields.
    pub(crate) fn apply(&self, schema: &Schema, fields: &mut Fields) -> Vec<&'static str> {
        let mut changed = Vec::new();
        for derivation in &schema.derivations {
            match derivation {
                Derivation::Lifecycle => {
                    let Some(lifecycle) = &schema.lifecycle else {
                        continue;
                    };
                    let expiry = fields
                        .get(lifecycle.issued)
                        .and_then(Value::as_str)
                        .and_then(parse_date)
                        .and_then(|issued| expiry_for(lifecycle.validity, issued));
                    let Some(expiry) = expiry else {
                        continue;
                    };
                    let expiry = if self.only_missing {
                        fields
                            .get(lifecycle.expires)
                            .and_then(Value::as_str)
                            .and_then(parse_date)
                            .unwrap_or(expiry)
                    } else {
                        expiry
                    };
                    self.set(fields, lifecycle.expires, Value::String(format_date(expiry)), &mut changed);
                    let status = status_at(expiry, self.today).as_str();
                    self.set(fields, lifecycle.status, Value::String(status.to_string()), &mut changed);
                }
                Derivation::AgeFromBirthDate { birth, age } => {
                    if let Some(born) = fields.get(*birth).and_then(Value::as_str).and_then(parse_date) {
                        self.set(fields, *age, Value::from(age_on(born, self.today)), &mut changed);
                    }
                }
                Derivation::ReferenceName {
                    id_field,
                    name_field,
                    source_field,
                    unassigned,
                } => {
                    let name = match fields.get(*id_field).and_then(Value::as_str) {
                        None => Some((*unassigned).to_string()),
                        Some(id) => schema
                            .field(id_field)
                            .and_then(|spec| spec.reference.as_ref())
                            .zip(self.index)
                            .and_then(|(reference, index)| index.get(reference.target, id))
                            .and_then(|target| target.get_str(source_field))
                            .map(str::to_string),
                    };
                    if let Some(name) = name {
                        self.set(fields, *name_field, Value::String(name), &mut changed);
                    }
                }
                Derivation::ClearUnless {
                    field,
                    when_field,
                    equals,
                } => {
                    let keep = fields.get(*when_field).and_then(Value::as_str) == Some(*equals);
                    if !keep && !self.only_missing {
                        self.set(fields, *field, Value::String(String::new()), &mut changed);
                    }
                }
            }
        }
        changed
    }

    fn set(&self, fields: &mut Fields, name: &'static str, value: Value, changed: &mut Vec<&'static str>) {
        let current = fields.get(name);
        if self.only_missing && current.is_some_and(|v| !v.is_null()) {
            return;
        }
        if current != Some(&value) {
            fields.insert(name.to_string(), value);
            changed.push(name);
        }
    }
}

/// Whole years between `born` and `today`, counting a birthday only once
/// it has occurred this year.
#[must_use]
pub fn age_on(born: NaiveDate, today: NaiveDate) -> i64 {
    let mut years = i64::from(today.year()) - i64::from(born.year());
    if (today.month(), today.day()) < (born.month(), born.day()) {
        years -= 1;
    }
    years
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use crate::config::ValidationPolicy;
    use crate::record::{fields, Record};
    use crate::schema::SchemaRegistry;
    use crate::types::Kind;
    use serde_json::json;
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn registry() -> SchemaRegistry {
        SchemaRegistry::standard(&ValidationPolicy::default()).unwrap()
    }

    #[test]
    fn age_counts_birthdays() {
        assert_eq!(age_on(date(1990, 6, 15), date(2024, 6, 14)), 33);
        assert_eq!(age_on(date(1990, 6, 15), date(2024, 6, 15)), 34);
    }

    #[test]
    fn insurance_dates_and_status() {
        let registry = registry();
        let schema = registry.schema(Kind::Insurance).unwrap();
        let index = ReferentialIndex::new();
        let mut f = fields([("issue_date", json!("2024-01-10")), ("status", json!("INACTIVE"))]);

        let changed = Deriver::refresh(date(2024, 6, 1), &index).apply(schema, &mut f);
        assert_eq!(f["expiry_date"], "2025-01-10");
        assert_eq!(f["status"], "ACTIVE");
        assert_eq!(changed, ["expiry_date", "status"]);
    }

    #[test]
    fn reference_names_follow_assignment() {
        let registry = registry();
        let schema = registry.schema(Kind::Vehicle).unwrap();
        let mut users = Collection::new(Kind::User);
        users
            .insert(Record::new(Kind::User, "U0002", fields([("name", json!("Ravi"))])))
            .unwrap();
        let index = ReferentialIndex::new().with(Arc::new(users));

        let mut f = fields([("manager_id", Value::Null), ("driver_id", json!("U0002"))]);
        Deriver::refresh(date(2024, 6, 1), &index).apply(schema, &mut f);
        assert_eq!(f["manager_name"], "Not Assigned");
        assert_eq!(f["driver_assigned"], "Ravi");
    }

    #[test]
    fn description_cleared_unless_not_ok() {
        let registry = registry();
        let schema = registry.schema(Kind::Maintenance).unwrap();
        let index = ReferentialIndex::new();
        let deriver = Deriver::refresh(date(2024, 6, 1), &index);

        let mut f = fields([("maintenance_status", json!("ok")), ("problem_description", json!("brakes"))]);
        deriver.apply(schema, &mut f);
        assert_eq!(f["problem_description"], "");

        let mut f = fields([("maintenance_status", json!("not ok")), ("problem_description", json!("brakes"))]);
        deriver.apply(schema, &mut f);
        assert_eq!(f["problem_description"], "brakes");
    }

    #[test]
    fn fill_missing_keeps_stored_values() {
        let registry = registry();
        let schema = registry.schema(Kind::Insurance).unwrap();
        let mut f = fields([
            ("issue_date", json!("2024-01-10")),
            ("expiry_date", json!("2024-12-31")),
        ]);

        let changed = Deriver::fill_missing(date(2025, 1, 5), None).apply(schema, &mut f);
        assert_eq!(f["expiry_date"], "2024-12-31");
        assert_eq!(f["status"], "INACTIVE");
        assert_eq!(changed, ["status"]);
    }
}
