//! Migrate command implementation.
//!
//! Opening a store backfills every legacy document and persists the result.
//! A dry run opens in-memory copies instead and only reports.

use super::{open_snapshot, open_store};
use fleetdb_core::{BackfillReport, Config};
use std::path::Path;
use tracing::info;

/// Runs the migrate command.
pub fn run(path: &Path, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    info!("Backfilling documents in {}", path.display());

    if dry_run {
        let store = open_snapshot(path)?;
        let pending = changed(store.backfill_reports());
        if pending.is_empty() {
            println!("✓ All documents are up to date.");
        } else {
            println!("Dry run - would rewrite {} document(s):", pending.len());
            for report in pending {
                println!("  {report}");
            }
        }
        return Ok(());
    }

    let store = open_store(path, Config::default())?;
    let applied = changed(store.backfill_reports());
    if applied.is_empty() {
        println!("✓ All documents are up to date.");
    } else {
        println!("✓ Backfilled {} document(s):", applied.len());
        for report in applied {
            println!("  {report}");
        }
    }
    Ok(())
}

fn changed(reports: &[BackfillReport]) -> Vec<&BackfillReport> {
    reports.iter().filter(|r| r.changed()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetdb_core::Kind;

    #[test]
    fn migrate_rewrites_once_and_dry_run_does_not() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("maintenance_data.json");
        let legacy = r#"[{"vehicle_id": "VID-A", "maintenance_type": "regular"}]"#;
        std::fs::write(&file, legacy).unwrap();

        run(dir.path(), true).unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), legacy);

        run(dir.path(), false).unwrap();
        let rewritten: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&file).unwrap()).unwrap();
        assert_eq!(rewritten[0]["maintenance_id"], "MNT001");
        assert_eq!(rewritten[0]["problem_description"], "");

        let store = open_snapshot(dir.path()).unwrap();
        assert!(!store.backfill_reports()[Kind::Maintenance.index()].changed());
    }
}
