//! Inspect command implementation.

use super::{document_size, open_snapshot};
use fleetdb_core::{Kind, Status, Store};
use serde::Serialize;
use std::path::Path;

/// Data directory inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Data directory.
    pub path: String,
    /// Date statuses were computed for.
    pub today: String,
    /// Total size of all documents in bytes.
    pub total_size: u64,
    /// Per-kind statistics.
    pub kinds: Vec<KindStats>,
}

/// Statistics for a single kind.
#[derive(Debug, Serialize)]
pub struct KindStats {
    /// Kind name.
    pub kind: Kind,
    /// Backing document file name.
    pub document: &'static str,
    /// Document size in bytes.
    pub size: u64,
    /// Number of records.
    pub records: usize,
    /// Active records, for kinds with a lifecycle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<usize>,
    /// Whether loading would rewrite the document.
    pub backfill_pending: bool,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_snapshot(path)?;
    let result = inspect(path, &store)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn inspect(path: &Path, store: &Store) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let mut kinds = Vec::with_capacity(Kind::ALL.len());
    for kind in Kind::ALL {
        let records = store.list(kind);
        let active = store.schema(kind)?.lifecycle.as_ref().map(|lifecycle| {
            records
                .iter()
                .filter(|r| r.get_str(lifecycle.status) == Some(Status::Active.as_str()))
                .count()
        });
        kinds.push(KindStats {
            kind,
            document: kind.file_name(),
            size: document_size(path, kind)?,
            records: records.len(),
            active,
            backfill_pending: store.backfill_reports()[kind.index()].changed(),
        });
    }

    Ok(InspectResult {
        path: path.display().to_string(),
        today: store.today().to_string(),
        total_size: kinds.iter().map(|k| k.size).sum(),
        kinds,
    })
}

fn print_text_output(result: &InspectResult) {
    println!("FleetDB Data Inspection");
    println!("=======================");
    println!();
    println!("Path:  {}", result.path);
    println!("Today: {}", result.today);
    println!();
    println!("Documents:");
    for stats in &result.kinds {
        println!(
            "  {:<22} {:>10}",
            stats.document,
            format_size(stats.size)
        );
    }
    println!("  {:<22} {:>10}", "total", format_size(result.total_size));
    println!();
    println!("Records:");
    for stats in &result.kinds {
        let mut line = format!("  {:<12} {:>6}", stats.kind.name(), stats.records);
        if let Some(active) = stats.active {
            line.push_str(&format!("  ({active} active, {} inactive)", stats.records - active));
        }
        if stats.backfill_pending {
            line.push_str("  [backfill pending]");
        }
        println!("{line}");
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
