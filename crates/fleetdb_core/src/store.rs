//! Record store facade.

use crate::allocator::IdAllocator;
use crate::clock::{Clock, SystemClock};
use crate::collection::{decode, encode, Collection};
use crate::config::{Config, ReferencePolicy};
use crate::derive::Deriver;
use crate::error::{CoreError, CoreResult, Referrer};
use crate::index::ReferentialIndex;
use crate::lifecycle::{recompute_status, refresh_status, SweepReport, Sweeper};
use crate::migration::{Backfill, BackfillReport};
use crate::password;
use crate::record::{Fields, Record};
use crate::schema::{FieldSpec, FieldType, Schema, SchemaRegistry};
use crate::types::{Kind, Status};
use crate::validation::Validator;
use chrono::NaiveDate;
use fleetdb_storage::{FileBackend, InMemoryBackend, StorageBackend};
use parking_lot::{Mutex, MutexGuard, RwLock};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

type Writer<'a> = MutexGuard<'a, Box<dyn StorageBackend>>;

/// One storage backend per kind, handed to [`Store::open_with_backends`].
///
/// Kinds without a backend get a fresh [`InMemoryBackend`].
#[derive(Default)]
pub struct Backends {
    slots: [Option<Box<dyn StorageBackend>>; 4],
}

impl Backends {
    /// No backends.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the backend of `kind`.
    #[must_use]
    pub fn with(mut self, kind: Kind, backend: impl StorageBackend + 'static) -> Self {
        self.slots[kind.index()] = Some(Box::new(backend));
        self
    }

    /// File backends for every kind under `dir`, one document per kind.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a document path is unusable.
    pub fn files(dir: &Path) -> CoreResult<Self> {
        Kind::ALL.iter().try_fold(Self::new(), |backends, kind| {
            Ok(backends.with(*kind, FileBackend::open(&dir.join(kind.file_name()))?))
        })
    }

    fn take(&mut self, kind: Kind) -> Box<dyn StorageBackend> {
        self.slots[kind.index()]
            .take()
            .unwrap_or_else(|| Box::new(InMemoryBackend::new()))
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.slots.iter().flatten().map(|b| b.describe()))
            .finish()
    }
}

struct Slot {
    schema: Arc<Schema>,
    writer: Mutex<Box<dyn StorageBackend>>,
    snapshot: RwLock<Arc<Collection>>,
}

impl Slot {
    fn snapshot(&self) -> Arc<Collection> {
        Arc::clone(&self.snapshot.read())
    }
}

/// The record store.
///
/// Every kind has its own collection, backing document and writer lock.
/// Mutations of one kind are serialized; reads use the last published
/// snapshot and never wait for a writer. A mutation either commits to
/// storage and publishes a new snapshot, or leaves both untouched.
///
/// # Example
///
/// ```rust
/// use fleetdb_core::{fields, Config, Kind, Store};
/// use serde_json::json;
///
/// let store = Store::open_in_memory(Config::default()).unwrap();
/// let manager = store
///     .create(
///         Kind::User,
///         fields([
///             ("name", json!("Meera Rao")),
///             ("mobile", json!("9876543210")),
///             ("email", json!("Meera@Example.com")),
///             ("gender", json!("female")),
///             ("age", json!(41)),
///             ("position", json!("manager")),
///         ]),
///     )
///     .unwrap();
///
/// assert_eq!(manager.id(), "U0001");
/// assert_eq!(manager.get_str("email"), Some("meera@example.com"));
/// assert_eq!(manager.get_str("position"), Some("Manager"));
/// ```
pub struct Store {
    config: Config,
    registry: Arc<SchemaRegistry>,
    clock: Arc<dyn Clock>,
    allocator: IdAllocator,
    slots: Vec<Slot>,
    backfill: Vec<BackfillReport>,
}

impl Store {
    /// Opens the store kept in the directory `path`.
    ///
    /// Each kind lives in its own document (`users.json`, `vehicles.json`,
    /// `insurance.json`, `maintenance_data.json`). Missing documents load
    /// as empty collections and are written on the first mutation.
    ///
    /// # Errors
    ///
    /// Fails if the directory is missing and `create_if_missing` is off, or
    /// on I/O errors.
    pub fn open(path: &Path, config: Config) -> CoreResult<Self> {
        if !path.is_dir() {
            if !config.create_if_missing {
                return Err(CoreError::invalid_operation(format!(
                    "data directory {} does not exist and create_if_missing is false",
                    path.display()
                )));
            }
            std::fs::create_dir_all(path).map_err(fleetdb_storage::StorageError::from)?;
        }
        Self::open_with_backends(config, Backends::files(path)?)
    }

    /// Opens a store that keeps every document in memory.
    ///
    /// # Errors
    ///
    /// Only fails if the configured patterns do not compile.
    pub fn open_in_memory(config: Config) -> CoreResult<Self> {
        Self::open_with_backends(config, Backends::new())
    }

    /// Opens a store over caller-supplied backends, using the system clock.
    ///
    /// # Errors
    ///
    /// Returns storage errors from reading or backfilling documents.
    pub fn open_with_backends(config: Config, backends: Backends) -> CoreResult<Self> {
        Self::open_with_clock(config, backends, Arc::new(SystemClock))
    }

    /// Opens a store over caller-supplied backends and clock.
    ///
    /// Loading decodes each document, backfills it and persists the
    /// backfill when it changed anything. Undecodable documents load as
    /// empty collections.
    ///
    /// # Errors
    ///
    /// Returns storage errors from reading or backfilling documents.
    pub fn open_with_clock(
        config: Config,
        mut backends: Backends,
        clock: Arc<dyn Clock>,
    ) -> CoreResult<Self> {
        let registry = Arc::new(SchemaRegistry::standard(&config.validation)?);
        let allocator = IdAllocator::new(config.max_allocation_attempts);
        let today = clock.today();

        let mut slots = Vec::with_capacity(Kind::ALL.len());
        let mut backfill = Vec::with_capacity(Kind::ALL.len());
        for kind in Kind::ALL {
            let schema = registry.shared(kind)?;
            let mut backend = backends.take(kind);
            let (collection, report) = load(&schema, backend.as_mut(), allocator, today)?;
            backfill.push(report);
            slots.push(Slot {
                schema,
                writer: Mutex::new(backend),
                snapshot: RwLock::new(Arc::new(collection)),
            });
        }

        Ok(Self {
            config,
            registry,
            clock,
            allocator,
            slots,
            backfill,
        })
    }

    /// The configuration the store was opened with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The schema registry.
    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// The schema of `kind`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKind` if the kind has no schema.
    pub fn schema(&self, kind: Kind) -> CoreResult<&Schema> {
        self.registry.schema(kind)
    }

    /// What the backfill changed while opening, per kind.
    #[must_use]
    pub fn backfill_reports(&self) -> &[BackfillReport] {
        &self.backfill
    }

    /// The clock's current date.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Where the kind's document lives.
    #[must_use]
    pub fn describe(&self, kind: Kind) -> String {
        self.slot(kind).writer.lock().describe()
    }

    /// Number of records of `kind`.
    #[must_use]
    pub fn len(&self, kind: Kind) -> usize {
        self.slot(kind).snapshot.read().len()
    }

    /// Whether the store holds no records of `kind`.
    #[must_use]
    pub fn is_empty(&self, kind: Kind) -> bool {
        self.len(kind) == 0
    }

    /// Validates and stores a new record, allocating its id.
    ///
    /// `candidate` holds the caller's fields. Strings are trimmed and put
    /// into canonical case, absent fields receive their defaults and
    /// derived fields are computed before validation. Neither the id nor
    /// a derived field may be supplied.
    ///
    /// # Errors
    ///
    /// `Validation`, `Referential`, `AllocationExhausted` or a storage
    /// error. On error nothing changes.
    pub fn create(&self, kind: Kind, candidate: Fields) -> CoreResult<Record> {
        let slot = self.slot(kind);
        let mut writer = slot.writer.lock();
        let current = slot.snapshot();
        let index = self.index_with(&current);

        let fields = self.prepare(&slot.schema, None, candidate, &current, &index)?;
        let id = self
            .allocator
            .allocate(kind, &slot.schema.id_policy, &*current)?;
        let record = Record::new(kind, id, fields);

        let mut working = (*current).clone();
        working.insert(record.clone())?;
        self.commit(slot, &mut writer, working)?;
        tracing::debug!(%kind, id = record.id(), "created");
        Ok(record)
    }

    /// Merges `patch` into the record, re-derives and re-validates it.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Validation` (also when the patch names the id or a
    /// derived field), `Referential` or a storage error. On error nothing
    /// changes.
    pub fn update(&self, kind: Kind, id: &str, patch: Fields) -> CoreResult<Record> {
        let slot = self.slot(kind);
        let mut writer = slot.writer.lock();
        let current = slot.snapshot();
        let base = current
            .get(id)
            .ok_or_else(|| CoreError::not_found(kind, id))?;
        let index = self.index_with(&current);

        let fields = self.prepare(&slot.schema, Some(base), patch, &current, &index)?;
        let record = Record::new(kind, id, fields);

        let mut working = (*current).clone();
        working.replace(record.clone())?;
        self.commit(slot, &mut writer, working)?;
        tracing::debug!(%kind, id, "updated");
        Ok(record)
    }

    /// Deletes a record, honoring the configured [`ReferencePolicy`].
    ///
    /// Under `Restrict` a referenced record cannot be deleted. Under
    /// `CascadeClear` nullable references are cleared first; a required
    /// reference still blocks.
    ///
    /// # Errors
    ///
    /// `NotFound`, `ReferentialIntegrity` or a storage error. On error
    /// nothing changes.
    pub fn delete(&self, kind: Kind, id: &str) -> CoreResult<()> {
        let slot = self.slot(kind);
        let mut writer = slot.writer.lock();

        // Referrers are declared after the kinds they point at, so taking
        // their locks now keeps the global order.
        let mut referrer_kinds: Vec<Kind> = self
            .registry
            .referrers_of(kind)
            .into_iter()
            .map(|(schema, _)| schema.kind)
            .collect();
        referrer_kinds.sort();
        referrer_kinds.dedup();
        let mut referrer_writers: Vec<(Kind, Writer<'_>)> = referrer_kinds
            .iter()
            .map(|k| (*k, self.slot(*k).writer.lock()))
            .collect();

        let current = slot.snapshot();
        if !current.contains(id) {
            return Err(CoreError::not_found(kind, id));
        }

        let index = self.index_with(&current);
        let referrers = index.references_of(&self.registry, kind, id);
        if !referrers.is_empty() {
            let blocking: Vec<Referrer> = match self.config.reference_policy {
                ReferencePolicy::Restrict => referrers.clone(),
                ReferencePolicy::CascadeClear => referrers
                    .iter()
                    .filter(|r| !self.is_nullable(r.kind, &r.field))
                    .cloned()
                    .collect(),
            };
            if !blocking.is_empty() {
                return Err(CoreError::ReferentialIntegrity {
                    kind,
                    id: id.to_string(),
                    referenced_by: blocking,
                });
            }
        }

        let mut working = (*current).clone();
        working.remove(id)?;

        if referrers.is_empty() {
            self.commit(slot, &mut writer, working)?;
        } else {
            let cleared = self.clear_references(&referrers, &index)?;
            self.commit_cascade(slot, &mut writer, working, cleared, &mut referrer_writers)?;
            tracing::debug!(%kind, id, cleared = referrers.len(), "references cleared");
        }
        tracing::debug!(%kind, id, "deleted");
        Ok(())
    }

    /// Returns a copy of a record, with any lifecycle status recomputed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record has that id.
    pub fn get(&self, kind: Kind, id: &str) -> CoreResult<Record> {
        let slot = self.slot(kind);
        let mut record = slot
            .snapshot()
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(kind, id))?;
        if let Some(lifecycle) = &slot.schema.lifecycle {
            refresh_status(lifecycle, &mut record, self.clock.today());
        }
        Ok(record)
    }

    /// Returns copies of all records of `kind` in insertion order, with any
    /// lifecycle status recomputed.
    #[must_use]
    pub fn list(&self, kind: Kind) -> Vec<Record> {
        let slot = self.slot(kind);
        let mut records = slot.snapshot().to_vec();
        if let Some(lifecycle) = &slot.schema.lifecycle {
            let today = self.clock.today();
            for record in &mut records {
                refresh_status(lifecycle, record, today);
            }
        }
        records
    }

    /// Rewrites the kind's document from the current collection.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    pub fn persist(&self, kind: Kind) -> CoreResult<()> {
        let slot = self.slot(kind);
        let mut writer = slot.writer.lock();
        let bytes = encode(&slot.schema, &slot.snapshot())?;
        writer.replace(&bytes)?;
        tracing::debug!(%kind, bytes = bytes.len(), "persisted");
        Ok(())
    }

    /// Sweeps `kind` with the configured sweep policy.
    ///
    /// # Errors
    ///
    /// Returns a storage error if persisting the result fails.
    pub fn sweep(&self, kind: Kind) -> CoreResult<SweepReport> {
        Sweeper::new(self.config.sweep, Arc::clone(&self.clock)).sweep(self, kind)
    }

    pub(crate) fn sweep_with(&self, kind: Kind, sweeper: &Sweeper) -> CoreResult<SweepReport> {
        let slot = self.slot(kind);
        let mut writer = slot.writer.lock();
        let current = slot.snapshot();

        let Some(lifecycle) = &slot.schema.lifecycle else {
            return Ok(SweepReport {
                kept: current.len(),
                ..SweepReport::default()
            });
        };

        let mut working = (*current).clone();
        let report = sweeper.sweep_collection(lifecycle, &mut working);
        if report.evicted > 0 || report.refreshed > 0 {
            self.commit(slot, &mut writer, working)?;
        }
        tracing::info!(
            %kind,
            kept = report.kept,
            evicted = report.evicted,
            refreshed = report.refreshed,
            "sweep complete"
        );
        Ok(report)
    }

    /// Finds a user by id, mobile number or e-mail address, in that order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing matches.
    pub fn find_user(&self, identifier: &str) -> CoreResult<Record> {
        let needle = identifier.trim();
        let users = self.slot(Kind::User).snapshot();
        let email = needle.to_lowercase();

        users
            .get(needle)
            .or_else(|| users.get(&needle.to_uppercase()))
            .or_else(|| users.iter().find(|u| u.get_str("mobile") == Some(needle)))
            .or_else(|| users.iter().find(|u| u.get_str("email") == Some(email.as_str())))
            .cloned()
            .ok_or_else(|| CoreError::not_found(Kind::User, needle))
    }

    /// Users holding `position`, compared case-insensitively.
    #[must_use]
    pub fn users_by_role(&self, position: &str) -> Vec<Record> {
        ReferentialIndex::new()
            .with(self.slot(Kind::User).snapshot())
            .find_by_role(Kind::User, "position", position.trim())
            .into_iter()
            .cloned()
            .collect()
    }

    /// Current insurance status of a vehicle.
    ///
    /// Recomputes the status of the vehicle's first insurance record and
    /// persists the refreshed value if it changed. A vehicle without
    /// insurance is inactive.
    ///
    /// # Errors
    ///
    /// Returns a storage error if persisting the refreshed status fails.
    pub fn status_for_vehicle(&self, vehicle_id: &str) -> CoreResult<Status> {
        let slot = self.slot(Kind::Insurance);
        let Some(lifecycle) = &slot.schema.lifecycle else {
            return Ok(Status::Inactive);
        };
        let mut writer = slot.writer.lock();
        let current = slot.snapshot();
        let today = self.clock.today();

        let needle = vehicle_id.trim();
        let Some(policy) = current
            .iter()
            .find(|r| r.get_str("vehicle_id").is_some_and(|v| v.eq_ignore_ascii_case(needle)))
        else {
            return Ok(Status::Inactive);
        };

        let status = recompute_status(lifecycle, policy, today);
        let mut refreshed = policy.clone();
        if refresh_status(lifecycle, &mut refreshed, today) {
            let mut working = (*current).clone();
            working.replace(refreshed)?;
            self.commit(slot, &mut writer, working)?;
            tracing::debug!(vehicle_id = needle, %status, "insurance status refreshed");
        }
        Ok(status)
    }

    /// Replaces a user's password.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Validation` when the password is weak or equal to the
    /// current one, or a storage error.
    pub fn reset_password(&self, user_id: &str, new_password: &str) -> CoreResult<()> {
        let slot = self.slot(Kind::User);
        let mut writer = slot.writer.lock();
        let current = slot.snapshot();
        let user = current
            .get(user_id)
            .ok_or_else(|| CoreError::not_found(Kind::User, user_id))?;

        password::check_replacement("password", new_password, user.get_str("password"))?;

        let mut updated = user.clone();
        updated
            .fields_mut()
            .insert("password".to_string(), Value::String(password::hash(new_password)?));
        let mut working = (*current).clone();
        working.replace(updated)?;
        self.commit(slot, &mut writer, working)?;
        tracing::debug!(user_id, "password reset");
        Ok(())
    }

    /// Re-checks every stored record of `kind` against its schema and
    /// references.
    ///
    /// Returns one entry per failing record; legacy placeholders and
    /// dangling references show up here.
    #[must_use]
    pub fn verify(&self, kind: Kind) -> Vec<(String, CoreError)> {
        let slot = self.slot(kind);
        let current = slot.snapshot();
        let index = self.index_with(&current);
        let validator = Validator::new(&slot.schema, self.clock.today());

        current
            .iter()
            .filter_map(|record| {
                let (declared, _) = split_declared(&slot.schema, record.fields().clone());
                validator
                    .validate(&declared, &current, Some(record.id()))
                    .map_err(CoreError::from)
                    .and_then(|()| index.check(&slot.schema, &declared, None))
                    .err()
                    .map(|err| (record.id().to_string(), err))
            })
            .collect()
    }

    fn slot(&self, kind: Kind) -> &Slot {
        &self.slots[kind.index()]
    }

    /// Published snapshots of every kind, with `own` in place of its kind.
    fn index_with(&self, own: &Arc<Collection>) -> ReferentialIndex {
        self.slots
            .iter()
            .filter(|s| s.schema.kind != own.kind())
            .fold(ReferentialIndex::new(), |index, s| index.with(s.snapshot()))
            .with(Arc::clone(own))
    }

    fn is_nullable(&self, kind: Kind, field: &str) -> bool {
        self.slot(kind)
            .schema
            .field(field)
            .is_some_and(|spec| spec.nullable)
    }

    /// Runs the write pipeline for a create (`base` is `None`) or update.
    fn prepare(
        &self,
        schema: &Schema,
        base: Option<&Record>,
        input: Fields,
        existing: &Collection,
        index: &ReferentialIndex,
    ) -> CoreResult<Fields> {
        let today = self.clock.today();

        let mut merged = base.map(|r| r.fields().clone()).unwrap_or_default();
        let mut fresh_secrets = Vec::new();
        for (key, value) in input {
            let Some(spec) = schema.field(&key) else {
                let reason = if key == schema.id_field {
                    "is assigned by the store and cannot be changed".to_string()
                } else {
                    format!("is not a {} field", schema.kind)
                };
                return Err(CoreError::validation(key, reason));
            };
            if spec.derived {
                return Err(CoreError::validation(key, "is computed by the store"));
            }
            let value = normalize(spec, value);
            if spec.field_type == FieldType::Secret {
                if let Value::String(secret) = &value {
                    let stored = base.and_then(|r| r.get_str(spec.name));
                    password::check_replacement(spec.name, secret, stored)?;
                    fresh_secrets.push(spec.name);
                }
            }
            merged.insert(key, value);
        }

        if base.is_none() {
            for spec in &schema.fields {
                if let Some(default) = &spec.default {
                    if !merged.contains_key(spec.name) {
                        merged.insert(spec.name.to_string(), default.clone());
                    }
                }
            }
        }

        Deriver::refresh(today, index).apply(schema, &mut merged);

        let (mut declared, extras) = split_declared(schema, merged);
        Validator::new(schema, today).validate(&declared, existing, base.map(Record::id))?;
        index.check(schema, &declared, base.map(Record::fields))?;

        for spec in schema.fields.iter().filter(|f| f.field_type == FieldType::Secret) {
            if let Some(Value::String(secret)) = declared.get_mut(spec.name) {
                if fresh_secrets.contains(&spec.name) || !password::is_hashed(secret) {
                    *secret = password::hash(secret)?;
                }
            }
        }

        declared.extend(extras);
        Ok(declared)
    }

    /// Encodes `collection`, writes it and publishes it.
    fn commit(&self, slot: &Slot, writer: &mut Writer<'_>, collection: Collection) -> CoreResult<()> {
        let bytes = encode(&slot.schema, &collection)?;
        writer.replace(&bytes)?;
        *slot.snapshot.write() = Arc::new(collection);
        Ok(())
    }

    /// Nulls every referrer's field and re-derives the referring records.
    fn clear_references(
        &self,
        referrers: &[Referrer],
        index: &ReferentialIndex,
    ) -> CoreResult<Vec<(Kind, Collection)>> {
        let today = self.clock.today();
        let mut cleared: Vec<(Kind, Collection)> = Vec::new();

        for referrer in referrers {
            let position = match cleared.iter().position(|(k, _)| *k == referrer.kind) {
                Some(i) => i,
                None => {
                    let snapshot = self.slot(referrer.kind).snapshot();
                    cleared.push((referrer.kind, (*snapshot).clone()));
                    cleared.len() - 1
                }
            };
            let collection = &mut cleared[position].1;
            let schema = &self.slot(referrer.kind).schema;

            let mut record = collection
                .get(&referrer.id)
                .cloned()
                .ok_or_else(|| CoreError::not_found(referrer.kind, referrer.id.as_str()))?;
            record
                .fields_mut()
                .insert(referrer.field.clone(), Value::Null);
            Deriver::refresh(today, index).apply(schema, record.fields_mut());
            collection.replace(record)?;
        }
        Ok(cleared)
    }

    /// Commits cleared referrer collections, then the owner's collection,
    /// restoring the already-written documents if a later write fails.
    fn commit_cascade(
        &self,
        owner: &Slot,
        owner_writer: &mut Writer<'_>,
        owner_collection: Collection,
        cleared: Vec<(Kind, Collection)>,
        writers: &mut [(Kind, Writer<'_>)],
    ) -> CoreResult<()> {
        let mut committed: Vec<(Kind, Arc<Collection>)> = Vec::new();
        let mut result = Ok(());

        for (kind, collection) in cleared {
            let slot = self.slot(kind);
            let previous = slot.snapshot();
            let Some((_, writer)) = writers.iter_mut().find(|(k, _)| *k == kind) else {
                result = Err(CoreError::invalid_operation(format!("{kind} is not locked")));
                break;
            };
            match self.commit(slot, writer, collection) {
                Ok(()) => committed.push((kind, previous)),
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }
        if result.is_ok() {
            result = self.commit(owner, owner_writer, owner_collection);
        }

        if let Err(err) = result {
            for (kind, previous) in committed.into_iter().rev() {
                let slot = self.slot(kind);
                let restored = writers
                    .iter_mut()
                    .find(|(k, _)| *k == kind)
                    .ok_or_else(|| CoreError::invalid_operation(format!("{kind} is not locked")))
                    .and_then(|(_, writer)| self.commit(slot, writer, (*previous).clone()));
                if let Err(rollback) = restored {
                    tracing::error!(%kind, error = %rollback, "failed to restore document after aborted delete");
                }
            }
            return Err(err);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = f.debug_struct("Store");
        for slot in &self.slots {
            out.field(slot.schema.kind.name(), &slot.snapshot.read().len());
        }
        out.field("today", &self.clock.today()).finish_non_exhaustive()
    }
}

/// Reads, decodes and backfills one kind's document.
fn load(
    schema: &Schema,
    backend: &mut dyn StorageBackend,
    allocator: IdAllocator,
    today: NaiveDate,
) -> CoreResult<(Collection, BackfillReport)> {
    let kind = schema.kind;
    let entries = match backend.read()? {
        None => Vec::new(),
        Some(bytes) => decode(schema, &bytes).unwrap_or_else(|err| {
            tracing::warn!(%kind, backend = %backend.describe(), error = %err, "unreadable document, starting empty");
            Vec::new()
        }),
    };

    let (collection, report) = Backfill::new(schema, allocator, today).run(entries)?;
    if report.changed() {
        backend.replace(&encode(schema, &collection)?)?;
        tracing::info!(%report, "backfilled");
    }
    Ok((collection, report))
}

/// Trims text, applies the canonical case and maps empty optional values to
/// null.
fn normalize(spec: &FieldSpec, value: Value) -> Value {
    match value {
        Value::String(s) if spec.field_type != FieldType::Secret => {
            let trimmed = s.trim();
            if trimmed.is_empty() && spec.nullable {
                Value::Null
            } else {
                Value::String(spec.case.apply(trimmed))
            }
        }
        other => other,
    }
}

/// Separates declared fields, in schema order, from undeclared legacy keys.
fn split_declared(schema: &Schema, mut fields: Fields) -> (Fields, Fields) {
    let mut declared = Fields::with_capacity(schema.fields.len());
    for spec in &schema.fields {
        if let Some(value) = fields.remove(spec.name) {
            declared.insert(spec.name.to_string(), value);
        }
    }
    (declared, fields)
}
