//! Schema registry and the standard fleet schemas.

use super::types::{
    Case, CrossCheck, Derivation, DocumentShape, ExpiryRule, FieldSpec, FieldType, Lifecycle,
    RoleFilter, Rule, Schema,
};
use crate::allocator::IdPolicy;
use crate::config::ValidationPolicy;
use crate::error::{CoreError, CoreResult};
use crate::types::Kind;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::Arc;

/// Positions a user may hold.
pub const POSITIONS: &[&str] = &["Owner", "Manager", "Driver", "Blue-Collar"];
/// Accepted genders.
pub const GENDERS: &[&str] = &["Male", "Female", "Other"];
/// Insurance products.
pub const INSURANCE_TYPES: &[&str] = &["Third Party", "Comprehensive", "Zero Depreciation"];
/// Maintenance kinds.
pub const MAINTENANCE_TYPES: &[&str] = &["regular", "docker"];
/// Maintenance outcomes.
pub const MAINTENANCE_STATUSES: &[&str] = &["ok", "not ok"];
/// Persisted status spellings.
pub const STATUSES: &[&str] = &["ACTIVE", "INACTIVE"];

/// Placeholder written into vehicle fields backfilled from legacy records.
pub const PLACEHOLDER: &str = "-";
/// Name shown for an empty driver or manager slot.
pub const NOT_ASSIGNED: &str = "Not Assigned";
/// Model assumed for vehicles that never recorded one.
pub const DEFAULT_MODEL: &str = "TATA Prima E.28K";

const UPPER_ALNUM: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const DIGITS: &[u8] = b"0123456789";

/// Immutable set of schemas, built once at startup.
///
/// ```rust
/// use fleetdb_core::{Kind, SchemaRegistry, ValidationPolicy};
///
/// let registry = SchemaRegistry::standard(&ValidationPolicy::default()).unwrap();
/// let vehicle = registry.schema(Kind::Vehicle).unwrap();
/// assert_eq!(vehicle.id_field, "vehicle_id");
/// ```
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: [Option<Arc<Schema>>; 4],
}

impl SchemaRegistry {
    /// Builds a registry holding all four standard schemas.
    ///
    /// # Errors
    ///
    /// Returns `Pattern` if a validation pattern fails to compile.
    pub fn standard(policy: &ValidationPolicy) -> CoreResult<Self> {
        Kind::ALL
            .iter()
            .try_fold(Self::builder(*policy), |b, kind| b.register(*kind))
            .map(SchemaRegistryBuilder::build)
    }

    /// Starts an empty registry.
    #[must_use]
    pub fn builder(policy: ValidationPolicy) -> SchemaRegistryBuilder {
        SchemaRegistryBuilder {
            policy,
            schemas: Default::default(),
        }
    }

    /// Returns the schema of `kind`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKind` if the kind was not registered.
    pub fn schema(&self, kind: Kind) -> CoreResult<&Schema> {
        self.schemas[kind.index()]
            .as_deref()
            .ok_or_else(|| CoreError::unknown_kind(kind.name()))
    }

    /// Returns the schema of the kind named `name`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKind` for unparseable or unregistered names.
    pub fn schema_by_name(&self, name: &str) -> CoreResult<&Schema> {
        self.schema(name.parse()?)
    }

    pub(crate) fn shared(&self, kind: Kind) -> CoreResult<Arc<Schema>> {
        self.schemas[kind.index()]
            .clone()
            .ok_or_else(|| CoreError::unknown_kind(kind.name()))
    }

    /// Registered kinds, in lock order.
    pub fn kinds(&self) -> impl Iterator<Item = Kind> + '_ {
        Kind::ALL
            .into_iter()
            .filter(|k| self.schemas[k.index()].is_some())
    }

    /// Fields in other kinds that point into `target`.
    #[must_use]
    pub fn referrers_of(&self, target: Kind) -> Vec<(&Schema, &FieldSpec)> {
        self.schemas
            .iter()
            .flatten()
            .flat_map(|schema| {
                schema
                    .references()
                    .filter(move |(_, r)| r.target == target)
                    .map(move |(f, _)| (schema.as_ref(), f))
            })
            .collect()
    }
}

/// Collects schemas for a [`SchemaRegistry`].
#[derive(Debug)]
pub struct SchemaRegistryBuilder {
    policy: ValidationPolicy,
    schemas: [Option<Arc<Schema>>; 4],
}

impl SchemaRegistryBuilder {
    /// Registers the standard schema of `kind`.
    ///
    /// # Errors
    ///
    /// Returns `Pattern` if a validation pattern fails to compile.
    pub fn register(self, kind: Kind) -> CoreResult<Self> {
        let schema = match kind {
            Kind::User => user_schema(&self.policy)?,
            Kind::Vehicle => vehicle_schema()?,
            Kind::Insurance => insurance_schema(),
            Kind::Maintenance => maintenance_schema(),
        };
        Ok(self.register_schema(schema))
    }

    /// Registers a caller-built schema, replacing any schema of the same kind.
    #[must_use]
    pub fn register_schema(mut self, schema: Schema) -> Self {
        let slot = schema.kind.index();
        self.schemas[slot] = Some(Arc::new(schema));
        self
    }

    /// Freezes the registry.
    #[must_use]
    pub fn build(self) -> SchemaRegistry {
        SchemaRegistry {
            schemas: self.schemas,
        }
    }
}

fn pattern(expr: &str, hint: &'static str) -> CoreResult<Rule> {
    Ok(Rule::Pattern {
        regex: Regex::new(expr)?,
        hint,
    })
}

fn text(value: &str) -> Value {
    Value::String(value.to_string())
}

fn user_schema(policy: &ValidationPolicy) -> CoreResult<Schema> {
    Ok(Schema {
        kind: Kind::User,
        id_field: "user_id",
        id_aliases: &[],
        id_policy: IdPolicy::Sequential {
            prefix: "U",
            width: 4,
        },
        shape: DocumentShape::Map,
        fields: vec![
            FieldSpec::text("name").rule(Rule::NonEmpty),
            FieldSpec::text("mobile")
                .rule(pattern(policy.mobile.pattern(), "a 10-digit mobile number")?)
                .unique(),
            FieldSpec::text("email")
                .case(Case::Lower)
                .rule(pattern(policy.email.pattern(), "a valid e-mail address")?)
                .unique(),
            FieldSpec::one_of("gender", GENDERS, Case::Title),
            FieldSpec::date("date_of_birth").optional().rule(Rule::NotFuture),
            FieldSpec::new("age", FieldType::Integer),
            FieldSpec::one_of("position", POSITIONS, Case::Title),
            FieldSpec::new("password", FieldType::Secret)
                .optional()
                .rule(Rule::Password),
        ],
        checks: vec![CrossCheck::AgeForPosition {
            age: "age",
            position: "position",
        }],
        derivations: vec![Derivation::AgeFromBirthDate {
            birth: "date_of_birth",
            age: "age",
        }],
        lifecycle: None,
    })
}

fn vehicle_schema() -> CoreResult<Schema> {
    let manager = RoleFilter {
        field: "position",
        value: "Manager",
    };
    let driver = RoleFilter {
        field: "position",
        value: "Driver",
    };

    Ok(Schema {
        kind: Kind::Vehicle,
        id_field: "vehicle_id",
        id_aliases: &[],
        id_policy: IdPolicy::Random {
            prefix: "VID-",
            alphabet: UPPER_ALNUM,
            len: 6,
            leading_nonzero: false,
        },
        shape: DocumentShape::Array,
        fields: vec![
            FieldSpec::text("vehicle_number")
                .case(Case::Upper)
                .rule(pattern(r"^[A-Z]{2}\d{2}[A-Z]{2}\d{4}$", "like MH12AB1234")?)
                .unique()
                .default_value(text(PLACEHOLDER)),
            FieldSpec::text("engine_number")
                .case(Case::Upper)
                .rule(pattern(r"^[A-Z]\d{3}[A-Z]{4}\d{5}$", "13 chars like A123BCDE56789")?)
                .default_value(text(PLACEHOLDER)),
            FieldSpec::text("chassis_number")
                .case(Case::Upper)
                .rule(pattern(
                    r"^[A-HJ-NPR-Z0-9]{17}$",
                    "a 17-char VIN without I, O or Q",
                )?)
                .default_value(text(PLACEHOLDER)),
            FieldSpec::text("manager_id")
                .optional()
                .case(Case::Upper)
                .references(Kind::User, Some(manager))
                .default_value(Value::Null),
            FieldSpec::text("manager_name")
                .derived()
                .default_value(text(PLACEHOLDER)),
            FieldSpec::text("driver_id")
                .optional()
                .case(Case::Upper)
                .references(Kind::User, Some(driver))
                .default_value(Value::Null),
            FieldSpec::text("driver_assigned")
                .derived()
                .default_value(text(NOT_ASSIGNED)),
            FieldSpec::text("model")
                .rule(Rule::NonEmpty)
                .default_value(text(DEFAULT_MODEL)),
        ],
        checks: Vec::new(),
        derivations: vec![
            Derivation::ReferenceName {
                id_field: "manager_id",
                name_field: "manager_name",
                source_field: "name",
                unassigned: NOT_ASSIGNED,
            },
            Derivation::ReferenceName {
                id_field: "driver_id",
                name_field: "driver_assigned",
                source_field: "name",
                unassigned: NOT_ASSIGNED,
            },
        ],
        lifecycle: None,
    })
}

fn insurance_schema() -> Schema {
    Schema {
        kind: Kind::Insurance,
        id_field: "insurance_id",
        id_aliases: &["Insurance ID"],
        id_policy: IdPolicy::Random {
            prefix: "",
            alphabet: DIGITS,
            len: 11,
            leading_nonzero: true,
        },
        shape: DocumentShape::Array,
        fields: vec![
            FieldSpec::text("vehicle_id")
                .case(Case::Upper)
                .references(Kind::Vehicle, None)
                .aliases(&["Vehicle ID"]),
            FieldSpec::one_of("insurance_type", INSURANCE_TYPES, Case::Title)
                .aliases(&["Insurance Type"]),
            FieldSpec::date("issue_date").aliases(&["Issue Date"]),
            FieldSpec::date("expiry_date")
                .derived()
                .aliases(&["Expiry Date"]),
            FieldSpec::one_of("status", STATUSES, Case::Upper)
                .derived()
                .aliases(&["Status"]),
        ],
        checks: Vec::new(),
        derivations: vec![Derivation::Lifecycle],
        lifecycle: Some(Lifecycle {
            issued: "issue_date",
            expires: "expiry_date",
            status: "status",
            validity: ExpiryRule::CalendarYears(1),
        }),
    }
}

fn maintenance_schema() -> Schema {
    Schema {
        kind: Kind::Maintenance,
        id_field: "maintenance_id",
        id_aliases: &[],
        id_policy: IdPolicy::Sequential {
            prefix: "MNT",
            width: 3,
        },
        shape: DocumentShape::Array,
        fields: vec![
            FieldSpec::text("vehicle_id")
                .case(Case::Upper)
                .references(Kind::Vehicle, None),
            FieldSpec::one_of("maintenance_type", MAINTENANCE_TYPES, Case::Lower),
            FieldSpec::date("last_date_of_maintenance"),
            FieldSpec::one_of("maintenance_status", MAINTENANCE_STATUSES, Case::Lower),
            FieldSpec::text("problem_description").default_value(json!("")),
        ],
        checks: vec![CrossCheck::RequiredWhen {
            field: "problem_description",
            when_field: "maintenance_status",
            equals: "not ok",
        }],
        derivations: vec![Derivation::ClearUnless {
            field: "problem_description",
            when_field: "maintenance_status",
            equals: "not ok",
        }],
        lifecycle: None,
    }
}
