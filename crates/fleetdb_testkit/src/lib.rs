//! # FleetDB Testkit
//!
//! Test utilities for FleetDB.
//!
//! This crate provides:
//! - Test stores (in-memory or in a temporary directory) on a fixed clock
//! - Seed helpers for users, vehicles, insurance and maintenance records
//! - A fault-injecting storage backend
//! - Property-based generators for valid field values using proptest
//!
//! ## Usage
//!
//! ```rust
//! use fleetdb_testkit::prelude::*;
//!
//! let t = TestStore::memory();
//! let driver = seed_driver(&t, "Ravi Kumar", "9876500001");
//! let vehicle = seed_vehicle(&t, "MH12AB1234");
//! assert_eq!(driver.get_str("position"), Some("Driver"));
//! assert!(vehicle.id().starts_with("VID-"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
