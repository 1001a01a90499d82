//! Fault injection for storage backends.
//!
//! [`FaultyBackend`] wraps an in-memory document and fails writes on
//! demand. The store owns the backend once opened, so the failure is
//! controlled through a [`FaultSwitch`] that shares its state.
//!
//! ```rust
//! use fleetdb_storage::StorageBackend;
//! use fleetdb_testkit::FaultyBackend;
//!
//! let (mut backend, switch) = FaultyBackend::new();
//! backend.replace(b"[]").unwrap();
//!
//! switch.fail_writes(true);
//! assert!(backend.replace(b"[1]").is_err());
//! assert_eq!(switch.document().as_deref(), Some(&b"[]"[..]));
//! ```

use fleetdb_storage::{InMemoryBackend, StorageBackend, StorageError, StorageResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct FaultState {
    fail_writes: AtomicBool,
    fail_after: AtomicUsize,
    writes: AtomicUsize,
    rejected: AtomicUsize,
}

/// A storage backend whose writes can be made to fail.
#[derive(Debug, Clone)]
pub struct FaultyBackend {
    inner: InMemoryBackend,
    state: Arc<FaultState>,
}

/// Controls a [`FaultyBackend`] after it has been handed to a store.
#[derive(Debug, Clone)]
pub struct FaultSwitch {
    inner: InMemoryBackend,
    state: Arc<FaultState>,
}

impl FaultyBackend {
    /// Creates an empty backend and its switch.
    pub fn new() -> (Self, FaultSwitch) {
        Self::wrap(InMemoryBackend::new())
    }

    /// Creates a backend holding `document`.
    pub fn with_document(document: impl Into<Vec<u8>>) -> (Self, FaultSwitch) {
        Self::wrap(InMemoryBackend::with_data(document))
    }

    fn wrap(inner: InMemoryBackend) -> (Self, FaultSwitch) {
        let state = Arc::new(FaultState {
            fail_after: AtomicUsize::new(usize::MAX),
            ..FaultState::default()
        });
        let switch = FaultSwitch {
            inner: inner.clone(),
            state: Arc::clone(&state),
        };
        (Self { inner, state }, switch)
    }
}

impl FaultSwitch {
    /// Makes every following write fail, or stops doing so.
    pub fn fail_writes(&self, fail: bool) {
        self.state.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Lets `writes` more writes succeed, then fails the rest.
    pub fn fail_after(&self, writes: usize) {
        let done = self.state.writes.load(Ordering::SeqCst);
        self.state
            .fail_after
            .store(done.saturating_add(writes), Ordering::SeqCst);
    }

    /// Clears all injected failures.
    pub fn heal(&self) {
        self.fail_writes(false);
        self.state.fail_after.store(usize::MAX, Ordering::SeqCst);
    }

    /// Successful writes so far.
    pub fn writes(&self) -> usize {
        self.state.writes.load(Ordering::SeqCst)
    }

    /// Writes rejected so far.
    pub fn rejected(&self) -> usize {
        self.state.rejected.load(Ordering::SeqCst)
    }

    /// The document as last written successfully.
    pub fn document(&self) -> Option<Vec<u8>> {
        self.inner.data()
    }
}

impl StorageBackend for FaultyBackend {
    fn read(&self) -> StorageResult<Option<Vec<u8>>> {
        self.inner.read()
    }

    fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
        let writes = self.state.writes.load(Ordering::SeqCst);
        if self.state.fail_writes.load(Ordering::SeqCst)
            || writes >= self.state.fail_after.load(Ordering::SeqCst)
        {
            self.state.rejected.fetch_add(1, Ordering::SeqCst);
            return Err(StorageError::WriteRejected("injected write failure".into()));
        }
        self.inner.replace(data)?;
        self.state.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn describe(&self) -> String {
        format!("faulty({})", self.inner.describe())
    }
}
