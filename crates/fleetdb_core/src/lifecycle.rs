//! Lifecycle status and the expiry sweeper.
//!
//! Status is a cache of `today >= expiry` and is recomputed from the
//! stored dates whenever it is needed. The sweeper refreshes every cached
//! status of a kind and, when the policy says so, evicts the inactive
//! records. It holds no timer; callers schedule it.

use crate::clock::Clock;
use crate::collection::Collection;
use crate::config::SweepPolicy;
use crate::error::CoreResult;
use crate::record::Record;
use crate::schema::{ExpiryRule, Lifecycle};
use crate::store::Store;
use crate::types::{Kind, Status};
use crate::validation::{parse_date, DATE_FORMAT};
use chrono::{Days, Months, NaiveDate};
use serde_json::Value;
use std::sync::Arc;

/// Expiry date implied by `issued` under `rule`.
///
/// Calendar-year expiry lands on the same month and day; an issue date of
/// February 29 expires on February 28.
#[must_use]
pub fn expiry_for(rule: ExpiryRule, issued: NaiveDate) -> Option<NaiveDate> {
    match rule {
        ExpiryRule::CalendarYears(years) => issued.checked_add_months(Months::new(years.checked_mul(12)?)),
        ExpiryRule::Days(days) => issued.checked_add_days(Days::new(days)),
    }
}

/// Status of a window ending at `expiry`, as of `today`.
#[must_use]
pub fn status_at(expiry: NaiveDate, today: NaiveDate) -> Status {
    if today >= expiry {
        Status::Inactive
    } else {
        Status::Active
    }
}

/// Recomputes the status of `record` from its stored dates.
///
/// The stored expiry wins; when it is missing or unreadable the expiry is
/// derived from the issue date. A record with neither is inactive.
#[must_use]
pub fn recompute_status(lifecycle: &Lifecycle, record: &Record, today: NaiveDate) -> Status {
    record
        .get_str(lifecycle.expires)
        .and_then(parse_date)
        .or_else(|| {
            record
                .get_str(lifecycle.issued)
                .and_then(parse_date)
                .and_then(|issued| expiry_for(lifecycle.validity, issued))
        })
        .map_or(Status::Inactive, |expiry| status_at(expiry, today))
}

/// Writes the recomputed status into `record`; returns whether it changed.
pub(crate) fn refresh_status(lifecycle: &Lifecycle, record: &mut Record, today: NaiveDate) -> bool {
    let status = Value::String(recompute_status(lifecycle, record, today).as_str().to_string());
    if record.get(lifecycle.status) == Some(&status) {
        return false;
    }
    record.fields_mut().insert(lifecycle.status.to_string(), status);
    true
}

/// Formats a date the way documents store it.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    /// Records left in the collection.
    pub kept: usize,
    /// Records removed as inactive.
    pub evicted: usize,
    /// Kept records whose cached status changed.
    pub refreshed: usize,
}

/// Recomputes statuses and evicts expired records.
pub struct Sweeper {
    policy: SweepPolicy,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Sweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sweeper")
            .field("policy", &self.policy)
            .field("today", &self.clock.today())
            .finish()
    }
}

impl Sweeper {
    /// Creates a sweeper.
    #[must_use]
    pub fn new(policy: SweepPolicy, clock: Arc<dyn Clock>) -> Self {
        Self { policy, clock }
    }

    /// The sweep policy.
    #[must_use]
    pub fn policy(&self) -> SweepPolicy {
        self.policy
    }

    /// Status of `record` as of the sweeper's clock.
    #[must_use]
    pub fn recompute_status(&self, lifecycle: &Lifecycle, record: &Record) -> Status {
        recompute_status(lifecycle, record, self.clock.today())
    }

    /// Sweeps `kind` in `store` under the kind's writer lock.
    ///
    /// Kinds without a lifecycle are left untouched and report every
    /// record as kept. Running a sweep twice without the clock moving
    /// evicts nothing the second time.
    ///
    /// # Errors
    ///
    /// Returns storage or encoding errors from persisting the result; on
    /// error the collection is unchanged.
    pub fn sweep(&self, store: &Store, kind: Kind) -> CoreResult<SweepReport> {
        store.sweep_with(kind, self)
    }

    /// Applies the sweep to a collection in place.
    #[must_use]
    pub fn sweep_collection(&self, lifecycle: &Lifecycle, collection: &mut Collection) -> SweepReport {
        let today = self.clock.today();
        let mut report = SweepReport::default();

        if self.policy.evict_inactive {
            let before = collection.len();
            collection.retain(|r| recompute_status(lifecycle, r, today) == Status::Active);
            report.evicted = before - collection.len();
        }
        collection.for_each_mut(|record| {
            if refresh_status(lifecycle, record, today) {
                report.refreshed += 1;
            }
        });
        report.kept = collection.len();
        report
    }
}
