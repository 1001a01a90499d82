//! CLI command implementations.

pub mod inspect;
pub mod migrate;
pub mod sweep;
pub mod verify;

use fleetdb_core::{Backends, Config, Kind, Store};
use fleetdb_storage::{FileBackend, InMemoryBackend, StorageBackend};
use std::path::Path;

/// Opens the data directory for writing. The directory must exist.
pub fn open_store(path: &Path, config: Config) -> Result<Store, Box<dyn std::error::Error>> {
    Ok(Store::open(path, config.create_if_missing(false))?)
}

/// Opens a store over in-memory copies of the documents in `path`.
///
/// Loading runs the backfill, but only the copies are rewritten, so the
/// directory is left exactly as it was.
pub fn open_snapshot(path: &Path) -> Result<Store, Box<dyn std::error::Error>> {
    if !path.is_dir() {
        return Err(format!("No data directory at {}", path.display()).into());
    }
    let mut backends = Backends::new();
    for kind in Kind::ALL {
        let file = FileBackend::open(&path.join(kind.file_name()))?;
        let copy = match file.read()? {
            Some(bytes) => InMemoryBackend::with_data(bytes),
            None => InMemoryBackend::new(),
        };
        backends = backends.with(kind, copy);
    }
    Ok(Store::open_with_backends(Config::default(), backends)?)
}

/// Size in bytes of a kind's document, zero when absent.
pub fn document_size(path: &Path, kind: Kind) -> Result<u64, Box<dyn std::error::Error>> {
    Ok(FileBackend::open(&path.join(kind.file_name()))?.size()?)
}
