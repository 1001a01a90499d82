//! Schema registry.
//!
//! A schema declares, per record kind, the ordered field set with types,
//! defaults, canonical case, content rules, uniqueness and foreign keys,
//! plus cross-field checks, store-computed derivations, the identifier
//! policy and the layout of the backing document.
//!
//! Schemas are static configuration: they are built once when a store
//! opens and never change afterwards.

mod registry;
mod types;

pub use registry::{
    SchemaRegistry, SchemaRegistryBuilder, DEFAULT_MODEL, GENDERS, INSURANCE_TYPES,
    MAINTENANCE_STATUSES, MAINTENANCE_TYPES, NOT_ASSIGNED, PLACEHOLDER, POSITIONS, STATUSES,
};
pub use types::{
    Case, CrossCheck, Derivation, DocumentShape, ExpiryRule, FieldSpec, FieldType, Lifecycle,
    Reference, RoleFilter, Rule, Schema,
};
