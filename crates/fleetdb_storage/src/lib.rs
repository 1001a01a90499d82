//! # FleetDB Storage
//!
//! Document storage backends for FleetDB.
//!
//! Every record kind is persisted as a single encoded document. Backends are
//! **opaque document stores**: they hand back the last document written and
//! replace it wholesale. They never interpret the bytes.
//!
//! ## Design Principles
//!
//! - A backend holds at most one document
//! - `replace` is all-or-nothing: readers see the old document or the new one
//! - A backend that was never written reports no document rather than an error
//! - Must be `Send + Sync` so stores can be shared across threads
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral stores
//! - [`FileBackend`] - For persistent storage using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use fleetdb_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! assert!(backend.read().unwrap().is_none());
//! backend.replace(b"[]").unwrap();
//! assert_eq!(backend.read().unwrap().as_deref(), Some(&b"[]"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
