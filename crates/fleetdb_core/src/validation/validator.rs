//! Schema-driven candidate validation.

use super::rules::{age_range, check_rule, date_format_error, parse_date};
use crate::collection::Collection;
use crate::error::ValidationError;
use crate::record::Fields;
use crate::schema::{CrossCheck, FieldSpec, FieldType, Schema};
use chrono::NaiveDate;
use serde_json::Value;

/// Validates candidates of one kind.
///
/// ```rust
/// use chrono::NaiveDate;
/// use fleetdb_core::{fields, Collection, Kind, SchemaRegistry, ValidationPolicy, Validator};
/// use serde_json::json;
///
/// let registry = SchemaRegistry::standard(&ValidationPolicy::default()).unwrap();
/// let schema = registry.schema(Kind::Maintenance).unwrap();
/// let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
///
/// let candidate = fields([
///     ("vehicle_id", json!("VID-ABC123")),
///     ("maintenance_type", json!("regular")),
///     ("last_date_of_maintenance", json!("2024-05-30")),
///     ("maintenance_status", json!("not ok")),
///     ("problem_description", json!("")),
/// ]);
/// let err = Validator::new(schema, today)
///     .validate(&candidate, &Collection::new(Kind::Maintenance), None)
///     .unwrap_err();
/// assert_eq!(err.field, "problem_description");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    schema: &'a Schema,
    today: NaiveDate,
}

impl<'a> Validator<'a> {
    /// Creates a validator for `schema`, judging dates against `today`.
    #[must_use]
    pub fn new(schema: &'a Schema, today: NaiveDate) -> Self {
        Self { schema, today }
    }

    /// Checks `candidate` (the fields without the id).
    ///
    /// Uniqueness ignores the record whose id is `exclude_id`, so an update
    /// does not collide with itself.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule, in schema order, cross-field checks
    /// last.
    pub fn validate(
        &self,
        candidate: &Fields,
        existing: &Collection,
        exclude_id: Option<&str>,
    ) -> Result<(), ValidationError> {
        if let Some(key) = candidate.keys().find(|k| self.schema.field(k).is_none()) {
            let reason = if key.as_str() == self.schema.id_field {
                "is assigned by the store".to_string()
            } else {
                format!("is not a {} field", self.schema.kind)
            };
            return Err(ValidationError::new(key.as_str(), reason));
        }

        for spec in &self.schema.fields {
            self.check_field(spec, candidate.get(spec.name), existing, exclude_id)?;
        }

        self.schema
            .checks
            .iter()
            .try_for_each(|check| self.check_cross(check, candidate))
    }

    fn check_field(
        &self,
        spec: &FieldSpec,
        value: Option<&Value>,
        existing: &Collection,
        exclude_id: Option<&str>,
    ) -> Result<(), ValidationError> {
        let value = match value {
            None | Some(Value::Null) if spec.required => {
                return Err(ValidationError::new(spec.name, "is required"));
            }
            Some(Value::Null) if !spec.nullable => {
                return Err(ValidationError::new(spec.name, "must not be null"));
            }
            None | Some(Value::Null) => return Ok(()),
            Some(value) => value,
        };

        match &spec.field_type {
            FieldType::Integer => {
                if value.as_i64().is_none() {
                    return Err(ValidationError::new(spec.name, "must be an integer"));
                }
            }
            FieldType::Text | FieldType::Secret | FieldType::Date | FieldType::Enum(_) => {
                let Some(text) = value.as_str() else {
                    return Err(ValidationError::new(
                        spec.name,
                        format!("must be {}", spec.field_type.type_name()),
                    ));
                };
                self.check_text(spec, text)?;
            }
        }

        if spec.unique {
            self.check_unique(spec, value, existing, exclude_id)?;
        }
        Ok(())
    }

    fn check_text(&self, spec: &FieldSpec, text: &str) -> Result<(), ValidationError> {
        match &spec.field_type {
            FieldType::Date if parse_date(text).is_none() => {
                return Err(date_format_error(spec.name));
            }
            FieldType::Enum(values) if !values.iter().any(|v| *v == text) => {
                return Err(ValidationError::new(
                    spec.name,
                    format!("{text:?} must be one of {}", values.join(", ")),
                ));
            }
            _ => {}
        }
        match &spec.rule {
            Some(rule) => check_rule(rule, spec.name, text, self.today),
            None => Ok(()),
        }
    }

    fn check_unique(
        &self,
        spec: &FieldSpec,
        value: &Value,
        existing: &Collection,
        exclude_id: Option<&str>,
    ) -> Result<(), ValidationError> {
        // Backfill placeholders are shared by every legacy record.
        if spec.default.as_ref() == Some(value) {
            return Ok(());
        }
        let taken = existing
            .iter()
            .filter(|r| Some(r.id()) != exclude_id)
            .any(|r| r.get(spec.name) == Some(value));
        if taken {
            let shown = value.as_str().map_or_else(|| value.to_string(), str::to_string);
            return Err(ValidationError::new(
                spec.name,
                format!("{shown} is already registered to another {}", self.schema.kind),
            ));
        }
        Ok(())
    }

    fn check_cross(&self, check: &CrossCheck, candidate: &Fields) -> Result<(), ValidationError> {
        match check {
            CrossCheck::AgeForPosition { age, position } => {
                let (Some(years), Some(role)) = (
                    candidate.get(*age).and_then(Value::as_i64),
                    candidate.get(*position).and_then(Value::as_str),
                ) else {
                    return Ok(());
                };
                let range = age_range(role);
                if range.contains(&years) {
                    Ok(())
                } else {
                    Err(ValidationError::new(
                        *age,
                        format!(
                            "{years} is outside {}-{} allowed for {role}",
                            range.start(),
                            range.end()
                        ),
                    ))
                }
            }
            CrossCheck::RequiredWhen {
                field,
                when_field,
                equals,
            } => {
                let triggered = candidate.get(*when_field).and_then(Value::as_str) == Some(*equals);
                let present = candidate
                    .get(*field)
                    .and_then(Value::as_str)
                    .is_some_and(|s| !s.trim().is_empty());
                if triggered && !present {
                    Err(ValidationError::new(
                        *field,
                        format!("is required when {when_field} is {equals:?}"),
                    ))
                } else {
                    Ok(())
                }
            }
        }
    }
}
