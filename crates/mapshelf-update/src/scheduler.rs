//! Deciding when the next map update check is due

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use mapshelf_config::ClientSettings;

use crate::UpdateError;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Default number of days between checks
pub const THRESHOLD_DAYS: u32 = mapshelf_config::DEFAULT_CHECK_THRESHOLD_DAYS;

/// Where the time of the last update check is kept
pub trait CheckStateStore {
    /// Epoch milliseconds of the last check, `None` if there never was one
    fn last_check(&self) -> Option<i64>;

    /// Remember `epoch_millis` as the time of the last check
    fn set_last_check(&mut self, epoch_millis: i64) -> Result<(), UpdateError>;
}

/// [`CheckStateStore`] that lives only as long as the process
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    last_check: Option<i64>,
}

impl MemoryStateStore {
    pub fn new(last_check: Option<i64>) -> Self {
        Self { last_check }
    }
}

impl CheckStateStore for MemoryStateStore {
    fn last_check(&self) -> Option<i64> {
        self.last_check
    }

    fn set_last_check(&mut self, epoch_millis: i64) -> Result<(), UpdateError> {
        self.last_check = Some(epoch_millis);
        Ok(())
    }
}

impl CheckStateStore for ClientSettings {
    fn last_check(&self) -> Option<i64> {
        self.last_map_update_check()
    }

    fn set_last_check(&mut self, epoch_millis: i64) -> Result<(), UpdateError> {
        self.set_last_map_update_check(epoch_millis)
            .map_err(|e| UpdateError::StateStore(e.to_string()))
    }
}

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

/// Gates map update checks to at most one per threshold period
#[derive(Debug)]
pub struct UpdateScheduler<S: CheckStateStore> {
    store: S,
    threshold_days: u32,
}

impl<S: CheckStateStore> UpdateScheduler<S> {
    pub fn new(store: S) -> Self {
        Self::with_threshold_days(store, THRESHOLD_DAYS)
    }

    pub fn with_threshold_days(store: S, threshold_days: u32) -> Self {
        Self {
            store,
            threshold_days,
        }
    }

    pub fn threshold(&self) -> Duration {
        Duration::from_secs(u64::from(self.threshold_days) * 24 * 60 * 60)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Whether a check is due at `now_millis`, without touching the store
    ///
    /// Due when the last check (epoch 0 if there never was one) lies strictly
    /// before `now - threshold`.
    pub fn evaluate_at(&self, now_millis: i64) -> bool {
        let cutoff = now_millis - i64::from(self.threshold_days) * MILLIS_PER_DAY;
        let last_check = self.store.last_check().unwrap_or(0);
        last_check < cutoff
    }

    /// Record a check at `now_millis`
    pub fn mark_checked(&mut self, now_millis: i64) -> Result<(), UpdateError> {
        self.store.set_last_check(now_millis)
    }

    /// Whether a check is due now; resets the clock either way
    ///
    /// A caller that gets `true` but then fails to check (say, the listing
    /// could not be fetched) will not be asked again for a full threshold
    /// period. Use [`evaluate_at`](Self::evaluate_at) and
    /// [`mark_checked`](Self::mark_checked) to decouple the two.
    pub fn is_check_due(&mut self) -> bool {
        let now = now_millis();
        let due = self.evaluate_at(now);

        if let Err(e) = self.mark_checked(now) {
            tracing::warn!("Failed to record map update check time: {}", e);
        }

        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(n: i64) -> i64 {
        n * MILLIS_PER_DAY
    }

    #[test]
    fn test_never_checked_is_due() {
        let scheduler = UpdateScheduler::new(MemoryStateStore::default());
        assert!(scheduler.evaluate_at(now_millis()));
    }

    #[test]
    fn test_due_once_then_reset() {
        let mut scheduler =
            UpdateScheduler::new(MemoryStateStore::new(Some(now_millis() - days(8))));

        assert!(scheduler.is_check_due());
        assert!(!scheduler.is_check_due());
    }

    #[test]
    fn test_recent_check_is_not_due_but_still_resets() {
        let six_days_ago = now_millis() - days(6);
        let mut scheduler = UpdateScheduler::new(MemoryStateStore::new(Some(six_days_ago)));

        assert!(!scheduler.is_check_due());
        assert!(scheduler.store().last_check().unwrap() > six_days_ago);
    }

    #[test]
    fn test_cutoff_is_strict() {
        let now = days(100);
        let scheduler = UpdateScheduler::new(MemoryStateStore::new(Some(now - days(7))));
        assert!(!scheduler.evaluate_at(now));
        assert!(scheduler.evaluate_at(now + 1));
    }

    #[test]
    fn test_evaluate_does_not_write() {
        let scheduler = UpdateScheduler::new(MemoryStateStore::default());
        assert!(scheduler.evaluate_at(days(30)));
        assert_eq!(scheduler.store().last_check(), None);
    }

    #[test]
    fn test_custom_threshold() {
        let now = days(100);
        let mut scheduler =
            UpdateScheduler::with_threshold_days(MemoryStateStore::default(), 1);
        scheduler.mark_checked(now - days(2)).unwrap();

        assert!(scheduler.evaluate_at(now));
        assert_eq!(scheduler.threshold(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_client_settings_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let settings = ClientSettings::open(&path).unwrap();
        let mut scheduler = UpdateScheduler::new(settings);
        assert!(scheduler.is_check_due());

        // The reset survives a restart
        let reopened = UpdateScheduler::new(ClientSettings::open(&path).unwrap());
        assert!(!reopened.evaluate_at(now_millis()));
    }
}
