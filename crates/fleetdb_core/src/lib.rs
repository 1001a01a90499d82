//! # FleetDB Core
//!
//! Schema-driven record store for fleet operations.
//!
//! This crate provides:
//! - A schema registry for users, vehicles, insurance and maintenance
//! - A pure validation engine (field rules, uniqueness, cross-field checks)
//! - Identifier allocation (random-retry and sequential)
//! - Referential integrity between kinds
//! - A record store with one writer per kind and lock-free snapshot reads
//! - Load-time backfill of legacy documents
//! - A lifecycle sweeper for expiring records
//!
//! ## Example
//!
//! ```rust
//! use fleetdb_core::{fields, Config, Kind, Status, Store};
//! use serde_json::json;
//!
//! let store = Store::open_in_memory(Config::default()).unwrap();
//!
//! let vehicle = store
//!     .create(
//!         Kind::Vehicle,
//!         fields([
//!             ("vehicle_number", json!("mh12ab1234")),
//!             ("engine_number", json!("A123BCDE56789")),
//!             ("chassis_number", json!("1HGCM82633A004352")),
//!         ]),
//!     )
//!     .unwrap();
//! assert!(vehicle.id().starts_with("VID-"));
//! assert_eq!(vehicle.get_str("driver_assigned"), Some("Not Assigned"));
//!
//! // A vehicle without insurance is inactive.
//! assert_eq!(store.status_for_vehicle(vehicle.id()).unwrap(), Status::Inactive);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod allocator;
mod clock;
mod collection;
mod config;
mod derive;
mod error;
mod index;
mod lifecycle;
mod migration;
pub mod password;
mod record;
mod schema;
mod store;
mod types;
pub mod validation;

pub use allocator::{IdAllocator, IdPolicy, IdSet};
pub use clock::{Clock, FixedClock, SystemClock};
pub use collection::{decode, encode, Collection, RawEntry};
pub use config::{Config, EmailPolicy, MobilePolicy, ReferencePolicy, SweepPolicy, ValidationPolicy};
pub use derive::age_on;
pub use error::{CoreError, CoreResult, Referrer, ValidationError};
pub use index::ReferentialIndex;
pub use lifecycle::{expiry_for, format_date, recompute_status, status_at, SweepReport, Sweeper};
pub use migration::{Backfill, BackfillReport};
pub use record::{fields, Fields, Record};
pub use schema::{
    Case, CrossCheck, Derivation, DocumentShape, ExpiryRule, FieldSpec, FieldType, Lifecycle,
    Reference, RoleFilter, Rule, Schema, SchemaRegistry, SchemaRegistryBuilder, DEFAULT_MODEL,
    GENDERS, INSURANCE_TYPES, MAINTENANCE_STATUSES, MAINTENANCE_TYPES, NOT_ASSIGNED, PLACEHOLDER,
    POSITIONS, STATUSES,
};
pub use store::{Backends, Store};
pub use types::{Kind, Status};
pub use validation::Validator;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
