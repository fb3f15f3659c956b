//! Refresh cadence.
//!
//! [`RefreshSchedule::next_after`] is a pure function of the current time;
//! the loop in [`run_scheduler`] reads time through a [`Clock`] so tests can
//! drive it without waiting for wall-clock hours.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};

use bdpm_loader::{BdpmError, Refresher, SnapshotStore, SourceFetcher};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Daily UTC times at which a refresh runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSchedule {
    /// Ascending, without duplicates, never empty.
    times: Vec<NaiveTime>,
}

impl Default for RefreshSchedule {
    fn default() -> Self {
        Self {
            times: Self::DEFAULT_TIMES
                .iter()
                .filter_map(|&(h, m)| NaiveTime::from_hms_opt(h, m, 0))
                .collect(),
        }
    }
}

impl RefreshSchedule {
    /// Default refresh times (hour, minute), UTC.
    pub const DEFAULT_TIMES: [(u32, u32); 2] = [(6, 0), (18, 0)];

    /// Creates a schedule from daily times. An empty list gives the default.
    pub fn new(mut times: Vec<NaiveTime>) -> Self {
        if times.is_empty() {
            return Self::default();
        }
        times.sort_unstable();
        times.dedup();
        Self { times }
    }

    /// Parses comma-separated `HH:MM` times; invalid entries are logged and
    /// ignored.
    pub fn parse(raw: &str) -> Self {
        let times = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| match NaiveTime::parse_from_str(entry, "%H:%M") {
                Ok(time) => Some(time),
                Err(e) => {
                    tracing::warn!("Ignoring invalid refresh time {:?}: {}", entry, e);
                    None
                }
            })
            .collect();
        Self::new(times)
    }

    /// Reads `BDPM_REFRESH_TIMES`, falling back to the default schedule.
    pub fn from_env() -> Self {
        match std::env::var("BDPM_REFRESH_TIMES") {
            Ok(raw) => Self::parse(&raw),
            Err(_) => Self::default(),
        }
    }

    /// Configured times, ascending.
    pub fn times(&self) -> &[NaiveTime] {
        &self.times
    }

    /// Returns the first scheduled time strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        if let Some(time) = self.times.iter().find(|t| today.and_time(**t).and_utc() > now) {
            return today.and_time(*time).and_utc();
        }

        let tomorrow = now + chrono::Duration::days(1);
        match self.times.first() {
            Some(first) => tomorrow.date_naive().and_time(*first).and_utc(),
            None => tomorrow,
        }
    }
}

/// Runs one refresh and logs its outcome. Failures leave the last good
/// snapshot in place.
async fn refresh_once<F: SourceFetcher>(store: &SnapshotStore, refresher: &Refresher<F>) {
    match refresher.refresh(store).await {
        Ok(summary) => tracing::info!(
            "Refresh published {} medicaments and {} generique groups",
            summary.medicaments,
            summary.generiques
        ),
        Err(BdpmError::ConcurrentUpdateRejected) => {
            tracing::warn!("Skipping scheduled refresh, another refresh is running")
        }
        Err(e) => tracing::warn!("Refresh failed, serving previous snapshot: {}", e),
    }
}

/// Refreshes once immediately, then at every scheduled time until
/// `shutdown` resolves.
pub async fn run_scheduler<F, C, S>(
    store: &SnapshotStore,
    refresher: &Refresher<F>,
    schedule: &RefreshSchedule,
    clock: &C,
    shutdown: S,
) where
    F: SourceFetcher,
    C: Clock,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    tokio::select! {
        _ = refresh_once(store, refresher) => {}
        _ = &mut shutdown => {
            tracing::info!("Shutdown requested during initial refresh");
            return;
        }
    }

    loop {
        let now = clock.now();
        let next = schedule.next_after(now);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        tracing::info!("Next refresh at {}", next);

        tokio::select! {
            _ = tokio::time::sleep(wait) => refresh_once(store, refresher).await,
            _ = &mut shutdown => {
                tracing::info!("Scheduler stopped");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use bdpm_loader::{BdpmResult, RefreshConfig, SourceKind};
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_next_after_default_schedule() {
        let schedule = RefreshSchedule::default();

        assert_eq!(schedule.next_after(at(2024, 3, 1, 2, 30)), at(2024, 3, 1, 6, 0));
        assert_eq!(schedule.next_after(at(2024, 3, 1, 6, 0)), at(2024, 3, 1, 18, 0));
        assert_eq!(schedule.next_after(at(2024, 3, 1, 12, 0)), at(2024, 3, 1, 18, 0));
        assert_eq!(schedule.next_after(at(2024, 3, 1, 18, 0)), at(2024, 3, 2, 6, 0));
        assert_eq!(schedule.next_after(at(2024, 12, 31, 23, 59)), at(2025, 1, 1, 6, 0));
    }

    #[test]
    fn test_parse_schedule() {
        let schedule = RefreshSchedule::parse("22:15, 03:00,bogus,03:00,25:00");
        assert_eq!(
            schedule.times(),
            &[
                NaiveTime::from_hms_opt(3, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(22, 15, 0).unwrap(),
            ]
        );
        assert_eq!(schedule.next_after(at(2024, 3, 1, 23, 0)), at(2024, 3, 2, 3, 0));
    }

    #[test]
    fn test_empty_schedule_falls_back_to_default() {
        assert_eq!(RefreshSchedule::parse(""), RefreshSchedule::default());
        assert_eq!(RefreshSchedule::parse("nope"), RefreshSchedule::default());
        assert_eq!(RefreshSchedule::default().times().len(), 2);
    }

    /// Wall clock that follows tokio's (pausable) time.
    struct TokioClock {
        start: DateTime<Utc>,
        origin: tokio::time::Instant,
    }

    impl Clock for TokioClock {
        fn now(&self) -> DateTime<Utc> {
            let elapsed = tokio::time::Instant::now() - self.origin;
            self.start + chrono::Duration::from_std(elapsed).unwrap()
        }
    }

    struct CountingFetcher {
        calls: Arc<AtomicUsize>,
    }

    impl SourceFetcher for CountingFetcher {
        async fn fetch(&self, kind: SourceKind, url: &str) -> BdpmResult<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(BdpmError::Download {
                kind,
                url: url.to_string(),
                message: "HTTP status 503 Service Unavailable".to_string(),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_refreshes_at_each_scheduled_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dir = tempfile::tempdir().unwrap();
        let refresher = Refresher::new(
            CountingFetcher {
                calls: Arc::clone(&calls),
            },
            RefreshConfig::default().with_files_dir(dir.path()),
        );
        let store = SnapshotStore::new();
        let clock = TokioClock {
            start: at(2024, 3, 1, 5, 59),
            origin: tokio::time::Instant::now(),
        };

        // Initial refresh, 06:00 and 18:00, then stop before the next day
        let shutdown = tokio::time::sleep(Duration::from_secs(13 * 3600));
        run_scheduler(&store, &refresher, &RefreshSchedule::default(), &clock, shutdown).await;

        assert_eq!(calls.load(Ordering::SeqCst), 3 * SourceKind::ALL.len());
        assert_eq!(store.last_updated(), None);
        assert!(!store.is_updating());
    }
}
