//! Test fixtures and store helpers.
//!
//! Provides test stores on a settable clock and seed helpers for the
//! common record shapes.

use chrono::NaiveDate;
use fleetdb_core::{fields, Backends, Clock, Config, Fields, FixedClock, Kind, Record, Store};
use fleetdb_storage::InMemoryBackend;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// The date test stores start on.
pub fn test_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date")
}

/// Parses a `YYYY-MM-DD` literal.
pub fn date(text: &str) -> NaiveDate {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").expect("valid date literal")
}

enum Location {
    Memory(Vec<InMemoryBackend>),
    Dir(TempDir),
}

/// A test store with automatic cleanup.
///
/// The store runs on a [`FixedClock`] starting at [`test_today`]. Memory
/// stores keep handles on their documents, so both kinds of store can be
/// reopened to exercise loading.
pub struct TestStore {
    /// The store instance.
    pub store: Store,
    /// The clock the store reads "today" from.
    pub clock: Arc<FixedClock>,
    config: Config,
    location: Location,
}

impl TestStore {
    /// Creates an in-memory test store with the default configuration.
    pub fn memory() -> Self {
        Self::memory_with(Config::default())
    }

    /// Creates an in-memory test store.
    pub fn memory_with(config: Config) -> Self {
        let documents = Kind::ALL.iter().map(|_| InMemoryBackend::new()).collect();
        Self::open(config, Location::Memory(documents))
    }

    /// Creates an in-memory test store whose `kind` document starts as `document`.
    pub fn with_document(kind: Kind, document: impl Into<Vec<u8>>) -> Self {
        let mut documents: Vec<_> = Kind::ALL.iter().map(|_| InMemoryBackend::new()).collect();
        documents[kind.index()] = InMemoryBackend::with_data(document);
        Self::open(Config::default(), Location::Memory(documents))
    }

    /// Creates a file-backed test store in a temporary directory.
    pub fn file() -> Self {
        Self::file_with(Config::default())
    }

    /// Creates a file-backed test store with `config`.
    pub fn file_with(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        Self::open(config, Location::Dir(temp_dir))
    }

    fn open(config: Config, location: Location) -> Self {
        let clock = Arc::new(FixedClock::new(test_today()));
        let store = open_store(&config, &location, Arc::clone(&clock));
        Self {
            store,
            clock,
            config,
            location,
        }
    }

    /// Drops the store and opens a new one over the same documents and clock.
    pub fn reopen(self) -> Self {
        let Self {
            store,
            clock,
            config,
            location,
        } = self;
        drop(store);
        let store = open_store(&config, &location, Arc::clone(&clock));
        Self {
            store,
            clock,
            config,
            location,
        }
    }

    /// The data directory, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::Dir(dir) => Some(dir.path()),
            Location::Memory(_) => None,
        }
    }

    /// The raw persisted document of `kind`.
    pub fn document(&self, kind: Kind) -> Option<Vec<u8>> {
        match &self.location {
            Location::Memory(documents) => documents[kind.index()].data(),
            Location::Dir(dir) => std::fs::read(dir.path().join(kind.file_name())).ok(),
        }
    }

    /// The persisted document of `kind`, parsed.
    pub fn document_json(&self, kind: Kind) -> Option<Value> {
        self.document(kind)
            .map(|bytes| serde_json::from_slice(&bytes).expect("persisted document is JSON"))
    }
}

fn open_store(config: &Config, location: &Location, clock: Arc<FixedClock>) -> Store {
    let backends = match location {
        Location::Memory(documents) => Kind::ALL
            .iter()
            .fold(Backends::new(), |b, kind| b.with(*kind, documents[kind.index()].clone())),
        Location::Dir(dir) => Backends::files(dir.path()).expect("Failed to open file backends"),
    };
    let clock: Arc<dyn Clock> = clock;
    Store::open_with_clock(config.clone(), backends, clock).expect("Failed to open test store")
}

impl std::ops::Deref for TestStore {
    type Target = Store;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary in-memory store.
///
/// # Example
///
/// ```rust
/// use fleetdb_core::Kind;
/// use fleetdb_testkit::with_test_store;
///
/// with_test_store(|store| {
///     assert!(store.is_empty(Kind::User));
/// });
/// ```
pub fn with_test_store<F, R>(f: F) -> R
where
    F: FnOnce(&Store) -> R,
{
    let test_store = TestStore::memory();
    f(&test_store.store)
}

/// Fields of a valid user. The e-mail is derived from the mobile number.
pub fn user_fields(name: &str, mobile: &str, position: &str, age: i64) -> Fields {
    fields([
        ("name", json!(name)),
        ("mobile", json!(mobile)),
        ("email", json!(format!("u{mobile}@example.com"))),
        ("gender", json!("Male")),
        ("age", json!(age)),
        ("position", json!(position)),
    ])
}

/// Creates a manager.
pub fn seed_manager(store: &Store, name: &str, mobile: &str) -> Record {
    store
        .create(Kind::User, user_fields(name, mobile, "Manager", 40))
        .expect("Failed to seed manager")
}

/// Creates a driver.
pub fn seed_driver(store: &Store, name: &str, mobile: &str) -> Record {
    store
        .create(Kind::User, user_fields(name, mobile, "Driver", 30))
        .expect("Failed to seed driver")
}

/// Fields of a valid vehicle with registration `plate`.
pub fn vehicle_fields(plate: &str) -> Fields {
    fields([
        ("vehicle_number", json!(plate)),
        ("engine_number", json!("A123BCDE56789")),
        ("chassis_number", json!("1HGCM82633A004352")),
    ])
}

/// Creates an unassigned vehicle.
pub fn seed_vehicle(store: &Store, plate: &str) -> Record {
    store
        .create(Kind::Vehicle, vehicle_fields(plate))
        .expect("Failed to seed vehicle")
}

/// Fields of a comprehensive policy on `vehicle_id` issued on `issued`.
pub fn insurance_fields(vehicle_id: &str, issued: &str) -> Fields {
    fields([
        ("vehicle_id", json!(vehicle_id)),
        ("insurance_type", json!("Comprehensive")),
        ("issue_date", json!(issued)),
    ])
}

/// Fields of a regular service on `vehicle_id`.
///
/// `problem` is only sent when `Some`.
pub fn maintenance_fields(vehicle_id: &str, on: &str, status: &str, problem: Option<&str>) -> Fields {
    let mut fields = fields([
        ("vehicle_id", json!(vehicle_id)),
        ("maintenance_type", json!("regular")),
        ("last_date_of_maintenance", json!(on)),
        ("maintenance_status", json!(status)),
    ]);
    if let Some(problem) = problem {
        fields.insert("problem_description".to_string(), json!(problem));
    }
    fields
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// A small fleet: one manager, one driver and a vehicle assigned to both.
    pub struct Fleet {
        /// The manager.
        pub manager: Record,
        /// The driver.
        pub driver: Record,
        /// The vehicle.
        pub vehicle: Record,
    }

    /// Seeds a [`Fleet`] into `store`.
    pub fn fleet(store: &Store) -> Fleet {
        let manager = seed_manager(store, "Meera Rao", "9876500010");
        let driver = seed_driver(store, "Ravi Kumar", "9876500020");
        let mut candidate = vehicle_fields("MH12AB1234");
        candidate.insert("manager_id".to_string(), json!(manager.id()));
        candidate.insert("driver_id".to_string(), json!(driver.id()));
        let vehicle = store
            .create(Kind::Vehicle, candidate)
            .expect("Failed to seed assigned vehicle");
        Fleet {
            manager,
            driver,
            vehicle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_starts_empty() {
        let t = TestStore::memory();
        assert!(Kind::ALL.iter().all(|kind| t.is_empty(*kind)));
        assert_eq!(t.today(), test_today());
        assert!(t.path().is_none());
    }

    #[test]
    fn memory_store_reopens_with_its_documents() {
        let t = TestStore::memory();
        let vehicle = seed_vehicle(&t, "KA01CD5678");
        assert!(t.document(Kind::Vehicle).is_some());

        let t = t.reopen();
        assert_eq!(t.get(Kind::Vehicle, vehicle.id()).unwrap(), vehicle);
    }

    #[test]
    fn fleet_scenario_links_names() {
        let t = TestStore::memory();
        let fleet = scenarios::fleet(&t);
        assert_eq!(fleet.vehicle.get_str("manager_name"), Some("Meera Rao"));
        assert_eq!(fleet.vehicle.get_str("driver_assigned"), Some("Ravi Kumar"));
    }

    #[test]
    fn with_test_store_runs_closure() {
        let count = with_test_store(|store| {
            seed_driver(store, "Asha", "9876500030");
            store.len(Kind::User)
        });
        assert_eq!(count, 1);
    }
}
