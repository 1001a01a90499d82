//! Record identifier allocation.
//!
//! Two policies exist. Random ids draw fixed-length strings from an
//! alphabet and retry on collision, up to a configured cap. Sequential ids
//! take the highest numeric suffix among existing ids and add one.

use crate::error::{CoreError, CoreResult};
use crate::types::Kind;
use rand::Rng;
use std::collections::HashSet;

/// How a kind produces new identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdPolicy {
    /// `prefix` followed by `len` characters drawn from `alphabet`.
    Random {
        /// Literal prefix, e.g. `VID-`.
        prefix: &'static str,
        /// Characters to draw from.
        alphabet: &'static [u8],
        /// Number of drawn characters.
        len: usize,
        /// The first drawn character is never `0`.
        leading_nonzero: bool,
    },
    /// `prefix` followed by a zero-padded counter.
    Sequential {
        /// Literal prefix, e.g. `MNT`.
        prefix: &'static str,
        /// Minimum digit count.
        width: usize,
    },
}

impl IdPolicy {
    /// Whether `id` has the shape this policy produces.
    #[must_use]
    pub fn matches(&self, id: &str) -> bool {
        match self {
            IdPolicy::Random {
                prefix,
                alphabet,
                len,
                leading_nonzero,
            } => id.strip_prefix(prefix).is_some_and(|rest| {
                rest.len() == *len
                    && rest.bytes().all(|b| alphabet.contains(&b))
                    && !(*leading_nonzero && rest.starts_with('0'))
            }),
            IdPolicy::Sequential { prefix, width } => id
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.len() >= *width && rest.bytes().all(|b| b.is_ascii_digit())),
        }
    }
}

/// Read access to the ids already taken in a collection.
pub trait IdSet {
    /// Whether `id` is taken.
    fn contains_id(&self, id: &str) -> bool;

    /// All taken ids.
    fn id_iter(&self) -> Box<dyn Iterator<Item = &str> + '_>;
}

impl IdSet for HashSet<String> {
    fn contains_id(&self, id: &str) -> bool {
        self.contains(id)
    }

    fn id_iter(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(self.iter().map(String::as_str))
    }
}

/// Produces fresh identifiers that do not collide with existing ones.
#[derive(Debug, Clone, Copy)]
pub struct IdAllocator {
    max_attempts: usize,
}

impl IdAllocator {
    /// Creates an allocator that gives up after `max_attempts` random draws.
    #[must_use]
    pub const fn new(max_attempts: usize) -> Self {
        Self { max_attempts }
    }

    /// Allocates an id for `kind` under `policy`.
    ///
    /// # Errors
    ///
    /// Returns `AllocationExhausted` if no free id was found within the cap.
    pub fn allocate(&self, kind: Kind, policy: &IdPolicy, existing: &dyn IdSet) -> CoreResult<String> {
        self.allocate_with(&mut rand::thread_rng(), kind, policy, existing)
    }

    /// Like [`allocate`](Self::allocate) with a caller-supplied generator.
    ///
    /// # Errors
    ///
    /// Returns `AllocationExhausted` if no free id was found within the cap.
    pub fn allocate_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        kind: Kind,
        policy: &IdPolicy,
        existing: &dyn IdSet,
    ) -> CoreResult<String> {
        match policy {
            IdPolicy::Random {
                prefix,
                alphabet,
                len,
                leading_nonzero,
            } => {
                if alphabet.is_empty() {
                    return Err(CoreError::invalid_operation(format!(
                        "{kind} id alphabet is empty"
                    )));
                }
                for _ in 0..self.max_attempts {
                    let id = draw(rng, prefix, alphabet, *len, *leading_nonzero);
                    if !existing.contains_id(&id) {
                        return Ok(id);
                    }
                }
                Err(CoreError::AllocationExhausted {
                    kind,
                    attempts: self.max_attempts,
                })
            }
            IdPolicy::Sequential { prefix, width } => {
                let next = existing
                    .id_iter()
                    .filter_map(|id| id.strip_prefix(prefix)?.parse::<u64>().ok())
                    .max()
                    .map_or(Some(1), |n| n.checked_add(1))
                    .ok_or(CoreError::AllocationExhausted { kind, attempts: 1 })?;
                let id = format!("{prefix}{next:0width$}", width = *width);
                // A legacy id such as "U01" can parse to the same counter.
                if existing.contains_id(&id) {
                    return Err(CoreError::AllocationExhausted { kind, attempts: 1 });
                }
                Ok(id)
            }
        }
    }
}

fn draw<R: Rng + ?Sized>(
    rng: &mut R,
    prefix: &str,
    alphabet: &[u8],
    len: usize,
    leading_nonzero: bool,
) -> String {
    let mut id = String::with_capacity(prefix.len() + len);
    id.push_str(prefix);
    for i in 0..len {
        let mut ch = alphabet[rng.gen_range(0..alphabet.len())];
        while i == 0 && leading_nonzero && ch == b'0' && alphabet.len() > 1 {
            ch = alphabet[rng.gen_range(0..alphabet.len())];
        }
        id.push(char::from(ch));
    }
    id
}
