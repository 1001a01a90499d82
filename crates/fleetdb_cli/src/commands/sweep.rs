//! Sweep command implementation.
//!
//! The core never schedules anything itself. `--daily-at` turns this
//! command into a small polling loop that sweeps at most once per
//! calendar day, at or after the given local time.

use super::open_store;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use fleetdb_core::{Config, Kind, Store, SweepReport};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Runs one sweep over every kind with a lifecycle.
pub fn run_once(path: &Path, evict: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path, Config::default().evict_inactive(evict))?;
    for (kind, report) in sweep_all(&store)? {
        println!(
            "{kind}: {} kept, {} evicted, {} refreshed",
            report.kept, report.evicted, report.refreshed
        );
    }
    Ok(())
}

/// Sweeps every day at `at` (HH:MM, local time) until interrupted.
pub fn run_daily(
    path: &Path,
    evict: bool,
    at: &str,
    poll_secs: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let at = NaiveTime::parse_from_str(at, "%H:%M")
        .map_err(|e| format!("Invalid --daily-at {at:?}, expected HH:MM: {e}"))?;
    if poll_secs == 0 {
        return Err("--poll-secs must be at least 1".into());
    }

    let store = open_store(path, Config::default().evict_inactive(evict))?;
    let mut schedule = DailySchedule::new(at);
    info!(%at, poll_secs, "sweep scheduled daily");

    loop {
        if schedule.due(Local::now().naive_local()) {
            match sweep_all(&store) {
                Ok(reports) => {
                    for (kind, report) in reports {
                        info!(%kind, kept = report.kept, evicted = report.evicted, "scheduled sweep");
                    }
                }
                // Retried on the next day's run.
                Err(e) => warn!(error = %e, "scheduled sweep failed"),
            }
        }
        std::thread::sleep(Duration::from_secs(poll_secs));
    }
}

fn sweep_all(store: &Store) -> Result<Vec<(Kind, SweepReport)>, Box<dyn std::error::Error>> {
    let mut reports = Vec::new();
    for kind in Kind::ALL {
        if store.schema(kind)?.lifecycle.is_some() {
            reports.push((kind, store.sweep(kind)?));
        }
    }
    Ok(reports)
}

/// Fires once per calendar day, at the first poll at or after `at`.
#[derive(Debug, Clone)]
struct DailySchedule {
    at: NaiveTime,
    last_run: Option<NaiveDate>,
}

impl DailySchedule {
    fn new(at: NaiveTime) -> Self {
        Self { at, last_run: None }
    }

    fn due(&mut self, now: NaiveDateTime) -> bool {
        let today = now.date();
        if now.time() < self.at || self.last_run == Some(today) {
            return false;
        }
        self.last_run = Some(today);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn fires_once_per_day_after_the_time() {
        let mut schedule = DailySchedule::new(NaiveTime::from_hms_opt(2, 30, 0).unwrap());

        assert!(!schedule.due(at("2024-06-01", "02:29")));
        assert!(schedule.due(at("2024-06-01", "02:30")));
        assert!(!schedule.due(at("2024-06-01", "02:31")));
        assert!(!schedule.due(at("2024-06-01", "23:59")));

        assert!(!schedule.due(at("2024-06-02", "00:10")));
        assert!(schedule.due(at("2024-06-02", "09:00")));
    }

    #[test]
    fn late_start_still_fires_that_day() {
        let mut schedule = DailySchedule::new(NaiveTime::from_hms_opt(0, 0, 0).unwrap());
        assert!(schedule.due(at("2024-06-01", "18:45")));
        assert!(!schedule.due(at("2024-06-01", "18:46")));
    }

    #[test]
    fn one_shot_sweep_skips_kinds_without_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path(), Config::default()).unwrap();
        let reports = sweep_all(&store).unwrap();
        let kinds: Vec<_> = reports.iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, [Kind::Insurance]);
    }

    #[test]
    fn invalid_time_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run_daily(dir.path(), false, "25:00", 60).is_err());
        assert!(run_daily(dir.path(), false, "02:30", 0).is_err());
    }
}
