//! Integration tests for record writes, references and user lookups.

use fleetdb_core::{
    fields, password, Backends, Config, CoreError, Kind, ReferencePolicy, Store, NOT_ASSIGNED,
};
use fleetdb_testkit::prelude::*;
use serde_json::json;

fn validation_field(err: &CoreError) -> &str {
    err.as_validation()
        .map(|v| v.field.as_str())
        .unwrap_or_else(|| panic!("expected a validation error, got {err}"))
}

#[test]
fn user_age_boundaries_follow_position() {
    let t = TestStore::memory();
    let cases = [
        ("Driver", 17, false),
        ("Driver", 18, true),
        ("Driver", 60, true),
        ("Driver", 61, false),
        ("Manager", 120, true),
        ("Manager", 121, false),
    ];

    for (i, (position, age, accepted)) in cases.into_iter().enumerate() {
        let mobile = format!("98765000{i:02}");
        let result = t.create(Kind::User, user_fields("Asha Patel", &mobile, position, age));
        match (accepted, result) {
            (true, Ok(user)) => assert_eq!(user.get_i64("age"), Some(age)),
            (false, Err(err)) => assert_eq!(validation_field(&err), "age"),
            (expected, got) => panic!("{position} aged {age}: expected {expected}, got {got:?}"),
        }
    }
}

#[test]
fn user_ids_are_sequential_and_fields_canonical() {
    let t = TestStore::memory();
    let mut candidate = user_fields("  Meera Rao ", "9876543210", "manager", 41);
    candidate.insert("email".into(), json!("Meera.Rao@Example.COM"));
    candidate.insert("gender".into(), json!("FEMALE"));

    let first = t.create(Kind::User, candidate).unwrap();
    let second = seed_driver(&t, "Ravi Kumar", "9876543211");

    assert_eq!(first.id(), "U0001");
    assert_eq!(second.id(), "U0002");
    assert_eq!(first.get_str("name"), Some("Meera Rao"));
    assert_eq!(first.get_str("email"), Some("meera.rao@example.com"));
    assert_eq!(first.get_str("gender"), Some("Female"));
    assert_eq!(first.get_str("position"), Some("Manager"));
}

#[test]
fn age_is_derived_from_birth_date() {
    let t = TestStore::memory();
    let mut candidate = user_fields("Asha Patel", "9876500001", "Driver", 99);
    candidate.insert("date_of_birth".into(), json!("1990-06-02"));

    let user = t.create(Kind::User, candidate).unwrap();
    assert_eq!(user.get_i64("age"), Some(33));
}

#[test]
fn duplicate_mobile_and_email_are_rejected() {
    let t = TestStore::memory();
    seed_driver(&t, "Ravi Kumar", "9876500001");

    let err = t
        .create(Kind::User, user_fields("Other", "9876500001", "Driver", 30))
        .unwrap_err();
    assert_eq!(validation_field(&err), "mobile");

    let mut candidate = user_fields("Other", "9876500002", "Driver", 30);
    candidate.insert("email".into(), json!("U9876500001@EXAMPLE.com"));
    let err = t.create(Kind::User, candidate).unwrap_err();
    assert_eq!(validation_field(&err), "email");
    assert_eq!(t.len(Kind::User), 1);
}

#[test]
fn weak_passwords_are_rejected_and_strong_ones_hashed() {
    let t = TestStore::memory();
    let mut candidate = user_fields("Asha Patel", "9876500001", "Owner", 50);
    candidate.insert("password".into(), json!("password"));
    let err = t.create(Kind::User, candidate.clone()).unwrap_err();
    assert_eq!(validation_field(&err), "password");

    candidate.insert("password".into(), json!("Fleet@2024"));
    let user = t.create(Kind::User, candidate).unwrap();
    let stored = user.get_str("password").unwrap();
    assert!(password::is_hashed(stored));
    assert!(password::verify("Fleet@2024", stored));
}

#[test]
fn caller_supplied_hash_is_treated_as_plaintext() {
    let t = TestStore::memory();
    let mut candidate = user_fields("Asha Patel", "9876500001", "Owner", 50);
    candidate.insert("password".into(), json!("$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"));
    let err = t.create(Kind::User, candidate.clone()).unwrap_err();
    assert_eq!(validation_field(&err), "password");

    let smuggled = password::hash("weak").unwrap();
    candidate.insert("password".into(), json!(smuggled));
    let user = t.create(Kind::User, candidate).unwrap();
    let stored = user.get_str("password").unwrap();
    assert_ne!(stored, smuggled);
    assert!(password::verify(&smuggled, stored));
    assert!(!password::verify("weak", stored));

    let err = t
        .update(Kind::User, user.id(), fields([("password", json!("weak"))]))
        .unwrap_err();
    assert_eq!(validation_field(&err), "password");
}

#[test]
fn update_rejects_current_password() {
    let t = TestStore::memory();
    let mut candidate = user_fields("Asha Patel", "9876500001", "Owner", 50);
    candidate.insert("password".into(), json!("Fleet@2024"));
    let user = t.create(Kind::User, candidate).unwrap();

    let err = t
        .update(Kind::User, user.id(), fields([("password", json!("Fleet@2024"))]))
        .unwrap_err();
    assert_eq!(validation_field(&err), "password");
    assert_eq!(t.get(Kind::User, user.id()).unwrap(), user);

    let updated = t
        .update(Kind::User, user.id(), fields([("password", json!("Fleet@2025"))]))
        .unwrap();
    assert!(password::verify("Fleet@2025", updated.get_str("password").unwrap()));

    // Untouched secrets survive unrelated edits.
    let renamed = t
        .update(Kind::User, user.id(), fields([("name", json!("Asha Rao"))]))
        .unwrap();
    assert_eq!(renamed.get_str("password"), updated.get_str("password"));
}

#[test]
fn vehicle_create_normalizes_and_assigns_id() {
    let t = TestStore::memory();
    let vehicle = t
        .create(
            Kind::Vehicle,
            fields([
                ("vehicle_number", json!(" mh12ab1234 ")),
                ("engine_number", json!("a123bcde56789")),
                ("chassis_number", json!("1hgcm82633a004352")),
            ]),
        )
        .unwrap();

    let id = vehicle.id();
    assert!(id.starts_with("VID-"));
    assert_eq!(id.len(), 10);
    assert!(id[4..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    assert_eq!(vehicle.get_str("vehicle_number"), Some("MH12AB1234"));
    assert_eq!(vehicle.get_str("engine_number"), Some("A123BCDE56789"));
    assert_eq!(vehicle.get_str("chassis_number"), Some("1HGCM82633A004352"));
    assert_eq!(vehicle.get_str("model"), Some("TATA Prima E.28K"));
    assert_eq!(vehicle.get_str("driver_assigned"), Some(NOT_ASSIGNED));
    assert!(vehicle.get("driver_id").unwrap().is_null());
}

#[test]
fn duplicate_plate_is_rejected_on_vehicle_number() {
    let t = TestStore::memory();
    seed_vehicle(&t, "MH12AB1234");

    let err = t.create(Kind::Vehicle, vehicle_fields("mh12ab1234")).unwrap_err();
    assert_eq!(validation_field(&err), "vehicle_number");
    assert_eq!(t.len(Kind::Vehicle), 1);
}

#[test]
fn bad_chassis_number_is_rejected() {
    let t = TestStore::memory();
    let mut candidate = vehicle_fields("MH12AB1234");
    candidate.insert("chassis_number".into(), json!("1HGCM82633A00435O"));

    let err = t.create(Kind::Vehicle, candidate).unwrap_err();
    assert_eq!(validation_field(&err), "chassis_number");
}

#[test]
fn ids_and_derived_fields_cannot_be_supplied() {
    let t = TestStore::memory();
    let vehicle = seed_vehicle(&t, "MH12AB1234");

    let mut candidate = vehicle_fields("KA01CD5678");
    candidate.insert("vehicle_id".into(), json!("VID-AAAAAA"));
    let err = t.create(Kind::Vehicle, candidate).unwrap_err();
    assert_eq!(validation_field(&err), "vehicle_id");

    let err = t
        .update(Kind::Vehicle, vehicle.id(), fields([("driver_assigned", json!("Someone"))]))
        .unwrap_err();
    assert_eq!(validation_field(&err), "driver_assigned");

    let err = t
        .update(Kind::Vehicle, vehicle.id(), fields([("colour", json!("red"))]))
        .unwrap_err();
    assert_eq!(validation_field(&err), "colour");
}

#[test]
fn assigning_a_driver_derives_the_name() {
    let t = TestStore::memory();
    let driver = seed_driver(&t, "Ravi Kumar", "9876500001");
    let vehicle = seed_vehicle(&t, "MH12AB1234");

    let updated = t
        .update(Kind::Vehicle, vehicle.id(), fields([("driver_id", json!(driver.id().to_lowercase()))]))
        .unwrap();
    assert_eq!(updated.get_str("driver_id"), Some(driver.id()));
    assert_eq!(updated.get_str("driver_assigned"), Some("Ravi Kumar"));

    let cleared = t
        .update(Kind::Vehicle, vehicle.id(), fields([("driver_id", json!(""))]))
        .unwrap();
    assert!(cleared.get("driver_id").unwrap().is_null());
    assert_eq!(cleared.get_str("driver_assigned"), Some(NOT_ASSIGNED));
}

#[test]
fn references_must_exist_and_hold_the_role() {
    let t = TestStore::memory();
    let driver = seed_driver(&t, "Ravi Kumar", "9876500001");
    let vehicle = seed_vehicle(&t, "MH12AB1234");

    let err = t
        .update(Kind::Vehicle, vehicle.id(), fields([("driver_id", json!("U0099"))]))
        .unwrap_err();
    assert!(matches!(err, CoreError::Referential { target: Kind::User, .. }), "{err}");

    let err = t
        .update(Kind::Vehicle, vehicle.id(), fields([("manager_id", json!(driver.id()))]))
        .unwrap_err();
    assert_eq!(validation_field(&err), "manager_id");

    let err = t
        .create(Kind::Insurance, insurance_fields("VID-NOPE00", "2024-01-10"))
        .unwrap_err();
    assert!(matches!(err, CoreError::Referential { target: Kind::Vehicle, .. }), "{err}");
}

#[test]
fn maintenance_accepts_scheduled_dates() {
    let t = TestStore::memory();
    let vehicle = seed_vehicle(&t, "MH12AB1234");

    let planned = t
        .create(Kind::Maintenance, maintenance_fields(vehicle.id(), "2024-09-15", "ok", None))
        .unwrap();
    assert_eq!(planned.get_str("last_date_of_maintenance"), Some("2024-09-15"));

    let err = t
        .create(Kind::Maintenance, maintenance_fields(vehicle.id(), "15/09/2024", "ok", None))
        .unwrap_err();
    assert_eq!(validation_field(&err), "last_date_of_maintenance");
}

#[test]
fn maintenance_description_follows_status() {
    let t = TestStore::memory();
    let vehicle = seed_vehicle(&t, "MH12AB1234");

    let err = t
        .create(Kind::Maintenance, maintenance_fields(vehicle.id(), "2024-05-01", "not ok", None))
        .unwrap_err();
    assert_eq!(validation_field(&err), "problem_description");

    let broken = t
        .create(
            Kind::Maintenance,
            maintenance_fields(vehicle.id(), "2024-05-01", "NOT OK", Some("brake pads worn")),
        )
        .unwrap();
    assert_eq!(broken.id(), "MNT001");
    assert_eq!(broken.get_str("problem_description"), Some("brake pads worn"));

    let fixed = t
        .update(Kind::Maintenance, broken.id(), fields([("maintenance_status", json!("ok"))]))
        .unwrap();
    assert_eq!(fixed.get_str("problem_description"), Some(""));

    let err = t
        .create(Kind::Maintenance, maintenance_fields(vehicle.id(), "2024-06-02", "ok", None))
        .unwrap_err();
    assert_eq!(validation_field(&err), "last_date_of_maintenance");
}

#[test]
fn restrict_blocks_deleting_a_referenced_user() {
    let t = TestStore::memory();
    let fleet = scenarios::fleet(&t);

    let err = t.delete(Kind::User, fleet.driver.id()).unwrap_err();
    let CoreError::ReferentialIntegrity { referenced_by, .. } = &err else {
        panic!("expected ReferentialIntegrity, got {err}");
    };
    assert_eq!(referenced_by.len(), 1);
    assert_eq!(referenced_by[0].kind, Kind::Vehicle);
    assert_eq!(referenced_by[0].id, fleet.vehicle.id());
    assert_eq!(referenced_by[0].field, "driver_id");
    assert!(t.get(Kind::User, fleet.driver.id()).is_ok());
}

#[test]
fn cascade_clear_unassigns_then_deletes() {
    let t = TestStore::memory_with(Config::default().reference_policy(ReferencePolicy::CascadeClear));
    let fleet = scenarios::fleet(&t);

    t.delete(Kind::User, fleet.driver.id()).unwrap();

    assert!(matches!(
        t.get(Kind::User, fleet.driver.id()),
        Err(CoreError::NotFound { .. })
    ));
    let vehicle = t.get(Kind::Vehicle, fleet.vehicle.id()).unwrap();
    assert!(vehicle.get("driver_id").unwrap().is_null());
    assert_eq!(vehicle.get_str("driver_assigned"), Some(NOT_ASSIGNED));
    assert_eq!(vehicle.get_str("manager_name"), Some("Meera Rao"));
}

#[test]
fn cascade_clear_still_blocks_required_references() {
    let t = TestStore::memory_with(Config::default().reference_policy(ReferencePolicy::CascadeClear));
    let vehicle = seed_vehicle(&t, "MH12AB1234");
    t.create(Kind::Insurance, insurance_fields(vehicle.id(), "2024-01-10"))
        .unwrap();

    let err = t.delete(Kind::Vehicle, vehicle.id()).unwrap_err();
    assert!(matches!(err, CoreError::ReferentialIntegrity { .. }), "{err}");
    assert_eq!(t.len(Kind::Vehicle), 1);
}

#[test]
fn deleting_unknown_id_is_not_found() {
    let t = TestStore::memory();
    assert!(matches!(
        t.delete(Kind::Vehicle, "VID-000000"),
        Err(CoreError::NotFound { kind: Kind::Vehicle, .. })
    ));
}

#[test]
fn failed_write_leaves_state_unchanged() {
    let (backend, switch) = FaultyBackend::new();
    let store = Store::open_with_backends(
        Config::default(),
        Backends::new().with(Kind::Vehicle, backend),
    )
    .unwrap();
    let vehicle = seed_vehicle(&store, "MH12AB1234");
    let before = switch.document();

    switch.fail_writes(true);
    let err = store.create(Kind::Vehicle, vehicle_fields("KA01CD5678")).unwrap_err();
    assert!(matches!(err, CoreError::Storage(_)), "{err}");
    let err = store.delete(Kind::Vehicle, vehicle.id()).unwrap_err();
    assert!(matches!(err, CoreError::Storage(_)), "{err}");

    assert_eq!(store.list(Kind::Vehicle), vec![vehicle]);
    assert_eq!(switch.document(), before);

    switch.heal();
    seed_vehicle(&store, "KA01CD5678");
    assert_eq!(store.len(Kind::Vehicle), 2);
}

#[test]
fn failed_cascade_restores_cleared_references() {
    let (users, switch) = FaultyBackend::new();
    let store = Store::open_with_backends(
        Config::default().reference_policy(ReferencePolicy::CascadeClear),
        Backends::new().with(Kind::User, users),
    )
    .unwrap();
    let fleet = scenarios::fleet(&store);

    switch.fail_writes(true);
    assert!(store.delete(Kind::User, fleet.driver.id()).is_err());

    let vehicle = store.get(Kind::Vehicle, fleet.vehicle.id()).unwrap();
    assert_eq!(vehicle.get_str("driver_id"), Some(fleet.driver.id()));
    assert_eq!(vehicle.get_str("driver_assigned"), Some("Ravi Kumar"));
    assert_eq!(store.len(Kind::User), 2);
}

#[test]
fn find_user_by_id_mobile_or_email() {
    let t = TestStore::memory();
    let user = seed_manager(&t, "Meera Rao", "9876500001");

    assert_eq!(t.find_user("U0001").unwrap(), user);
    assert_eq!(t.find_user("u0001").unwrap(), user);
    assert_eq!(t.find_user(" 9876500001 ").unwrap(), user);
    assert_eq!(t.find_user("U9876500001@Example.com").unwrap(), user);
    assert!(matches!(t.find_user("nobody"), Err(CoreError::NotFound { .. })));
}

#[test]
fn users_by_role_ignores_case() {
    let t = TestStore::memory();
    seed_manager(&t, "Meera Rao", "9876500001");
    seed_driver(&t, "Ravi Kumar", "9876500002");
    seed_driver(&t, "Asha Patel", "9876500003");

    let drivers: Vec<_> = t
        .users_by_role("driver")
        .into_iter()
        .map(|u| u.get_str("name").unwrap().to_string())
        .collect();
    assert_eq!(drivers, ["Ravi Kumar", "Asha Patel"]);
    assert!(t.users_by_role("Owner").is_empty());
}

#[test]
fn reset_password_rules() {
    let t = TestStore::memory();
    let user = seed_manager(&t, "Meera Rao", "9876500001");

    let err = t.reset_password(user.id(), "short").unwrap_err();
    assert_eq!(validation_field(&err), "password");

    t.reset_password(user.id(), "Fleet@2024").unwrap();
    let stored = t.get(Kind::User, user.id()).unwrap();
    assert!(password::verify("Fleet@2024", stored.get_str("password").unwrap()));

    let err = t.reset_password(user.id(), "Fleet@2024").unwrap_err();
    assert_eq!(validation_field(&err), "password");

    assert!(matches!(
        t.reset_password("U0099", "Fleet@2025"),
        Err(CoreError::NotFound { .. })
    ));
}

#[test]
fn reads_see_a_consistent_snapshot_during_writes() {
    let t = TestStore::memory();
    let reader = &t.store;

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for i in 0..20 {
                seed_vehicle(reader, &format!("MH12AB{i:04}"));
            }
        });
        scope.spawn(|| {
            for _ in 0..50 {
                let listed = reader.list(Kind::Vehicle);
                let mut plates: Vec<_> = listed
                    .iter()
                    .map(|v| v.get_str("vehicle_number").unwrap().to_string())
                    .collect();
                plates.dedup();
                assert_eq!(plates.len(), listed.len());
            }
        });
    });
    assert_eq!(t.len(Kind::Vehicle), 20);
}
