//! Storage backend trait definition.

use crate::error::StorageResult;

/// A whole-document storage backend for FleetDB.
///
/// Storage backends are **opaque document stores**. A backend holds the
/// latest encoded document of one record kind and nothing else. FleetDB owns
/// the encoding - backends do not understand records or schemas.
///
/// # Invariants
///
/// - `read` returns exactly the bytes of the last successful `replace`
/// - `read` returns `None` if nothing was ever stored
/// - a failed `replace` leaves the previous document in place
/// - Backends must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait StorageBackend: Send + Sync {
    /// Reads the stored document.
    ///
    /// Returns `Ok(None)` when no document has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the document exists but cannot be read.
    fn read(&self) -> StorageResult<Option<Vec<u8>>>;

    /// Replaces the stored document with `data`.
    ///
    /// After this returns successfully the new document is durable and
    /// every later `read` observes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written. The previous
    /// document is left untouched in that case.
    fn replace(&mut self, data: &[u8]) -> StorageResult<()>;

    /// Returns the size of the stored document in bytes (0 when absent).
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Short human-readable location, used in log lines.
    fn describe(&self) -> String;
}
