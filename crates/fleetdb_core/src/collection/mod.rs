//! In-memory collections and their document codec.
//!
//! A [`Collection`] holds every record of one kind, keyed by id, in
//! insertion order. Published collections are immutable snapshots behind an
//! `Arc`; writers clone, modify and swap.

mod codec;
mod ordered;

pub use codec::{decode, encode, RawEntry};
pub use ordered::Collection;
