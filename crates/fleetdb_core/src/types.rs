//! Core type definitions for FleetDB.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A record category with its own schema, collection and backing document.
///
/// The declaration order is also the lock order for operations that touch
/// more than one kind: a kind is only ever referenced by kinds declared
/// after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// Operators, drivers, managers and owners.
    User,
    /// Fleet vehicles.
    Vehicle,
    /// Insurance policies attached to vehicles.
    Insurance,
    /// Maintenance log entries attached to vehicles.
    Maintenance,
}

impl Kind {
    /// All kinds, in lock order.
    pub const ALL: [Kind; 4] = [Kind::User, Kind::Vehicle, Kind::Insurance, Kind::Maintenance];

    /// Returns the lowercase kind name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Kind::User => "user",
            Kind::Vehicle => "vehicle",
            Kind::Insurance => "insurance",
            Kind::Maintenance => "maintenance",
        }
    }

    /// Returns the file name of the kind's backing document.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Kind::User => "users.json",
            Kind::Vehicle => "vehicles.json",
            Kind::Insurance => "insurance.json",
            Kind::Maintenance => "maintenance_data.json",
        }
    }

    /// Position of this kind in [`Kind::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Kind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" | "users" => Ok(Kind::User),
            "vehicle" | "vehicles" => Ok(Kind::Vehicle),
            "insurance" => Ok(Kind::Insurance),
            "maintenance" => Ok(Kind::Maintenance),
            _ => Err(CoreError::unknown_kind(s)),
        }
    }
}

/// Derived validity status of a record with a lifecycle window.
///
/// Never authoritative: always recomputed from the expiry date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// Expiry date still ahead.
    Active,
    /// Expiry date reached or passed.
    Inactive,
}

impl Status {
    /// Returns the persisted spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Active => "ACTIVE",
            Status::Inactive => "INACTIVE",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
