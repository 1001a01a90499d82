//! Verify command implementation.

use super::open_snapshot;
use fleetdb_core::{CoreError, Kind, Store};
use std::path::Path;

/// Verification result for one kind.
#[derive(Debug)]
pub struct VerifyResult {
    /// Kind checked.
    pub kind: Kind,
    /// Number of records checked.
    pub records_checked: usize,
    /// Failing records with their first problem.
    pub errors: Vec<(String, CoreError)>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying data directory {}", path.display());
    println!();

    let store = open_snapshot(path)?;
    let results = verify(&store);
    for result in &results {
        print_result(result);
    }

    println!();
    if results.iter().all(VerifyResult::is_ok) {
        println!("✓ Verification passed");
        Ok(())
    } else {
        println!("✗ Verification failed");
        Err("Verification failed".into())
    }
}

fn verify(store: &Store) -> Vec<VerifyResult> {
    Kind::ALL
        .iter()
        .map(|kind| VerifyResult {
            kind: *kind,
            records_checked: store.len(*kind),
            errors: store.verify(*kind),
        })
        .collect()
}

fn print_result(result: &VerifyResult) {
    println!(
        "  {} records checked: {}, valid: {}, invalid: {}",
        result.kind,
        result.records_checked,
        result.records_checked - result.errors.len(),
        result.errors.len()
    );
    for (id, error) in &result.errors {
        println!("    ERROR {id}: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_legacy_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("vehicles.json"),
            r#"[{"vehicle_id": "VID-OLD001", "vehicle_number": "MH12AB1234"}]"#,
        )
        .unwrap();

        let store = open_snapshot(dir.path()).unwrap();
        let results = verify(&store);
        let vehicles = &results[Kind::Vehicle.index()];
        assert_eq!(vehicles.records_checked, 1);
        assert_eq!(vehicles.errors.len(), 1);
        assert_eq!(vehicles.errors[0].0, "VID-OLD001");
        assert!(results[Kind::User.index()].is_ok());
    }
}
