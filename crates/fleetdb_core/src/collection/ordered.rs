//! Insertion-ordered record collection.

use crate::allocator::IdSet;
use crate::error::{CoreError, CoreResult};
use crate::record::Record;
use crate::types::Kind;
use std::collections::HashMap;

/// Records of one kind, unique by id, in insertion order.
#[derive(Debug, Clone)]
pub struct Collection {
    kind: Kind,
    records: Vec<Record>,
    positions: HashMap<String, usize>,
}

impl Collection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            records: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Returns the kind held.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up a record by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.positions.get(id).map(|&i| &self.records[i])
    }

    /// Whether a record with `id` exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Appends a record.
    ///
    /// # Errors
    ///
    /// Fails if the kind differs or the id is already present.
    pub fn insert(&mut self, record: Record) -> CoreResult<()> {
        self.check_kind(&record)?;
        if self.contains(record.id()) {
            return Err(CoreError::invalid_operation(format!(
                "duplicate {} id {}",
                self.kind,
                record.id()
            )));
        }
        self.positions
            .insert(record.id().to_string(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    /// Replaces the record with the same id, keeping its position.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record has that id.
    pub fn replace(&mut self, record: Record) -> CoreResult<Record> {
        self.check_kind(&record)?;
        let &i = self
            .positions
            .get(record.id())
            .ok_or_else(|| CoreError::not_found(self.kind, record.id()))?;
        Ok(std::mem::replace(&mut self.records[i], record))
    }

    /// Removes and returns the record with `id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record has that id.
    pub fn remove(&mut self, id: &str) -> CoreResult<Record> {
        let i = self
            .positions
            .remove(id)
            .ok_or_else(|| CoreError::not_found(self.kind, id))?;
        let record = self.records.remove(i);
        for pos in self.positions.values_mut() {
            if *pos > i {
                *pos -= 1;
            }
        }
        Ok(record)
    }

    /// Keeps only the records for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&Record) -> bool) {
        self.records.retain(|r| keep(r));
        self.reindex();
    }

    /// Applies `f` to every record in place.
    pub(crate) fn for_each_mut(&mut self, f: impl FnMut(&mut Record)) {
        self.records.iter_mut().for_each(f);
    }

    /// Collects the records, in insertion order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Record> {
        self.records.clone()
    }

    fn check_kind(&self, record: &Record) -> CoreResult<()> {
        if record.kind() == self.kind {
            Ok(())
        } else {
            Err(CoreError::invalid_operation(format!(
                "{} record in {} collection",
                record.kind(),
                self.kind
            )))
        }
    }

    fn reindex(&mut self) {
        self.positions = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id().to_string(), i))
            .collect();
    }
}

impl IdSet for Collection {
    fn contains_id(&self, id: &str) -> bool {
        self.contains(id)
    }

    fn id_iter(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(self.records.iter().map(Record::id))
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
