// src/reset.rs
//! Once-per-day habit reset at local midnight
//!
//! The cursor holds the local `YYYY-MM-DD` of the last successful reset.
//! It is written only after the habits collaborator succeeds, so a failed
//! reset is retried on the next check.

use crate::{
    clock::{date_string, Clock},
    error::Result,
    habits::HabitsCollaborator,
    store::{keys, KeyValueStore},
};
use chrono::{Duration, NaiveDate};
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

pub struct DailyResetScheduler<S, H> {
    store: S,
    habits: H,
    clock: Arc<dyn Clock>,
}

/// Time left until the next local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Countdown {
    fn from_duration(remaining: Duration) -> Self {
        let total = remaining.num_seconds().max(0);
        Self {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}m {}s", self.hours, self.minutes, self.seconds)
    }
}

impl<S: KeyValueStore, H: HabitsCollaborator> DailyResetScheduler<S, H> {
    pub fn new(store: S, habits: H, clock: Arc<dyn Clock>) -> Self {
        Self { store, habits, clock }
    }

    pub fn habits(&self) -> &H {
        &self.habits
    }

    /// Local date of the last successful reset, if any. A cursor that is
    /// not a `YYYY-MM-DD` date counts as never reset.
    pub fn last_reset_date(&self) -> Result<Option<String>> {
        let bytes = match self.store.get(keys::LAST_RESET_DATE)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        let parsed = std::str::from_utf8(&bytes)
            .map_err(|e| e.to_string())
            .and_then(|s| {
                NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                    .map_err(|e| format!("{:?}: {}", s, e))
            });

        match parsed {
            Ok(date) => Ok(Some(date_string(date))),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring corrupt reset cursor");
                Ok(None)
            }
        }
    }

    fn today(&self) -> String {
        date_string(self.clock.local_date())
    }

    /// Reset habits if the local date moved past the cursor. Returns whether
    /// a reset happened.
    pub fn check_and_reset(&self) -> Result<bool> {
        let today = self.today();
        let last = self.last_reset_date()?;

        if last.as_deref() == Some(today.as_str()) {
            return Ok(false);
        }

        tracing::info!(today = %today, last = ?last, "New day detected, resetting habits");
        self.reset_to(&today)?;
        Ok(true)
    }

    /// Reset habits regardless of the cursor, then advance it to today.
    pub fn force_reset(&self) -> Result<()> {
        let today = self.today();
        tracing::info!(today = %today, "Forcing habit reset");
        self.reset_to(&today)
    }

    fn reset_to(&self, today: &str) -> Result<()> {
        let habits = self.habits.list_habits()?;
        self.habits.set_all_incomplete(&habits)?;
        self.store.set(keys::LAST_RESET_DATE, today.as_bytes())?;
        tracing::debug!(count = habits.len(), "Habits reset");
        Ok(())
    }

    /// Display-only countdown to the next local midnight.
    pub fn time_until_next_reset(&self) -> Countdown {
        let now = self.clock.now();
        let remaining = now
            .date_naive()
            .succ_opt()
            .and_then(|tomorrow| tomorrow.and_hms_opt(0, 0, 0))
            .map(|midnight| midnight - now.naive_local())
            .unwrap_or_else(Duration::zero);
        Countdown::from_duration(remaining)
    }

    /// Check once now, then once per `period`, until `running` clears.
    /// Failures are logged and retried on the next tick.
    pub async fn run_interval(&self, period: std::time::Duration, running: Arc<AtomicBool>) {
        tracing::info!(period_secs = period.as_secs(), "Starting daily reset checks");
        let mut ticker = tokio::time::interval(period);

        loop {
            ticker.tick().await;
            if !running.load(Ordering::Relaxed) {
                break;
            }

            if let Err(e) = self.check_and_reset() {
                tracing::warn!(error = %e, "Daily reset check failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        error::TrackerError,
        habits::{Habit, HabitBook},
        store::{testing::FlakyStore, MemoryStore},
    };
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct RecordingHabits {
        lists: AtomicUsize,
        calls: AtomicUsize,
        failing: AtomicBool,
    }

    impl HabitsCollaborator for RecordingHabits {
        fn list_habits(&self) -> Result<Vec<Habit>> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Habit { id: 1, name: "Run".into(), completed: true, streak: 3 }])
        }

        fn set_all_incomplete(&self, _habits: &[Habit]) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(TrackerError::Persistence("write failed".to_string()));
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl HabitsCollaborator for Arc<RecordingHabits> {
        fn list_habits(&self) -> Result<Vec<Habit>> {
            (**self).list_habits()
        }

        fn set_all_incomplete(&self, habits: &[Habit]) -> Result<()> {
            (**self).set_all_incomplete(habits)
        }
    }

    fn scheduler_at(
        rfc3339: &str,
    ) -> (DailyResetScheduler<MemoryStore, RecordingHabits>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at(rfc3339).unwrap());
        let scheduler =
            DailyResetScheduler::new(MemoryStore::new(), RecordingHabits::default(), clock.clone());
        (scheduler, clock)
    }

    fn calls<S: KeyValueStore>(scheduler: &DailyResetScheduler<S, RecordingHabits>) -> usize {
        scheduler.habits().calls.load(Ordering::SeqCst)
    }

    #[test]
    fn test_new_day_resets_once() {
        let (scheduler, _clock) = scheduler_at("2024-01-02T09:00:00+07:00");
        scheduler.store.set(keys::LAST_RESET_DATE, b"2024-01-01").unwrap();

        assert!(scheduler.check_and_reset().unwrap());
        assert!(!scheduler.check_and_reset().unwrap());
        assert_eq!(calls(&scheduler), 1);
        assert_eq!(scheduler.last_reset_date().unwrap().as_deref(), Some("2024-01-02"));
    }

    #[test]
    fn test_same_day_does_not_touch_habits() {
        let (scheduler, _clock) = scheduler_at("2024-01-01T15:00:00+00:00");
        scheduler.store.set(keys::LAST_RESET_DATE, b"2024-01-01").unwrap();

        assert!(!scheduler.check_and_reset().unwrap());
        assert_eq!(calls(&scheduler), 0);
        assert_eq!(scheduler.habits().lists.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_never_reset_counts_as_new_day() {
        let (scheduler, _clock) = scheduler_at("2024-01-01T15:00:00+00:00");
        assert!(scheduler.check_and_reset().unwrap());
        assert_eq!(calls(&scheduler), 1);
    }

    #[test]
    fn test_many_checks_one_reset() {
        let (scheduler, clock) = scheduler_at("2024-01-02T00:00:05+07:00");
        scheduler.store.set(keys::LAST_RESET_DATE, b"2024-01-01").unwrap();

        for _ in 0..20 {
            scheduler.check_and_reset().unwrap();
            clock.advance(Duration::minutes(30));
        }
        // 20 checks x 30 minutes stays inside Jan 2
        assert_eq!(calls(&scheduler), 1);
    }

    #[test]
    fn test_boundary_uses_local_offset() {
        // 23:30 UTC on Jan 1 is already Jan 2 at UTC+7
        let (scheduler, _clock) = scheduler_at("2024-01-02T06:30:00+07:00");
        scheduler.store.set(keys::LAST_RESET_DATE, b"2024-01-01").unwrap();
        assert!(scheduler.check_and_reset().unwrap());
    }

    #[test]
    fn test_late_check_after_missed_midnight() {
        let (scheduler, clock) = scheduler_at("2024-01-01T23:59:00+00:00");
        assert!(scheduler.check_and_reset().unwrap());

        // App closed over several midnights
        clock.advance(Duration::days(3));
        assert!(scheduler.check_and_reset().unwrap());
        assert!(!scheduler.check_and_reset().unwrap());
        assert_eq!(calls(&scheduler), 2);
    }

    #[test]
    fn test_failed_reset_keeps_cursor() {
        let (scheduler, _clock) = scheduler_at("2024-01-02T08:00:00+00:00");
        scheduler.store.set(keys::LAST_RESET_DATE, b"2024-01-01").unwrap();
        scheduler.habits().failing.store(true, Ordering::SeqCst);

        assert!(scheduler.check_and_reset().is_err());
        assert_eq!(scheduler.last_reset_date().unwrap().as_deref(), Some("2024-01-01"));

        scheduler.habits().failing.store(false, Ordering::SeqCst);
        assert!(scheduler.check_and_reset().unwrap());
        assert_eq!(calls(&scheduler), 1);
    }

    #[test]
    fn test_clock_moved_back_to_cursor_date_does_not_reset() {
        let (scheduler, clock) = scheduler_at("2024-01-02T08:00:00+00:00");
        scheduler.store.set(keys::LAST_RESET_DATE, b"2024-01-01").unwrap();
        assert!(scheduler.check_and_reset().unwrap());

        // Jumped ahead and back again without a check in between
        clock.advance(Duration::days(1));
        clock.advance(Duration::days(-1));
        assert!(!scheduler.check_and_reset().unwrap());
        assert_eq!(calls(&scheduler), 1);
    }

    #[test]
    fn test_clock_moved_back_past_cursor_compares_by_date_string() {
        let (scheduler, clock) = scheduler_at("2024-01-03T08:00:00+00:00");
        assert!(scheduler.check_and_reset().unwrap());

        clock.advance(Duration::days(-1));
        assert!(scheduler.check_and_reset().unwrap());
        assert_eq!(scheduler.last_reset_date().unwrap().as_deref(), Some("2024-01-02"));
    }

    #[test]
    fn test_real_habit_book_is_reset() {
        let clock = Arc::new(ManualClock::at("2024-06-10T07:00:00+02:00").unwrap());
        let store = Arc::new(MemoryStore::new());
        let book = HabitBook::new(Arc::clone(&store));
        let habit = book.add("Stretch").unwrap();
        book.toggle(habit.id).unwrap();

        let scheduler = DailyResetScheduler::new(Arc::clone(&store), book, clock);
        assert!(scheduler.check_and_reset().unwrap());

        let habits = scheduler.habits().list().unwrap();
        assert!(!habits[0].completed);
        assert_eq!(habits[0].streak, 1);
    }

    #[test]
    fn test_cursor_write_failure_is_reported() {
        let clock = Arc::new(ManualClock::at("2024-06-10T07:00:00+00:00").unwrap());
        let store = Arc::new(FlakyStore::default());
        store.set_failing(true);
        let scheduler = DailyResetScheduler::new(Arc::clone(&store), RecordingHabits::default(), clock);

        let err = scheduler.check_and_reset().unwrap_err();
        assert!(matches!(err, TrackerError::Persistence(_)));
        assert!(scheduler.last_reset_date().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_cursor_counts_as_never_reset() {
        let clock = Arc::new(ManualClock::at("2024-06-10T07:00:00+00:00").unwrap());
        let store = Arc::new(MemoryStore::new());
        let book = HabitBook::new(Arc::clone(&store));
        let habit = book.add("Walk").unwrap();
        book.toggle(habit.id).unwrap();
        store.set(keys::LAST_RESET_DATE, &[0xff, 0xfe, 0x00]).unwrap();

        let scheduler = DailyResetScheduler::new(Arc::clone(&store), book, clock.clone());
        assert!(scheduler.last_reset_date().unwrap().is_none());
        assert!(scheduler.check_and_reset().unwrap());
        assert!(!scheduler.habits().list().unwrap()[0].completed);
        assert_eq!(scheduler.last_reset_date().unwrap().as_deref(), Some("2024-06-10"));

        // Later days keep resetting normally
        scheduler.habits().toggle(habit.id).unwrap();
        clock.advance(Duration::days(1));
        assert!(scheduler.check_and_reset().unwrap());
        assert!(!scheduler.habits().list().unwrap()[0].completed);
    }

    #[test]
    fn test_malformed_date_cursor_is_ignored() {
        let (scheduler, _clock) = scheduler_at("2024-01-02T09:00:00+00:00");
        scheduler.store.set(keys::LAST_RESET_DATE, b"yesterday").unwrap();
        assert!(scheduler.check_and_reset().unwrap());
        assert_eq!(calls(&scheduler), 1);
    }

    #[test]
    fn test_force_reset() {
        let (scheduler, _clock) = scheduler_at("2024-01-01T10:00:00+00:00");
        scheduler.store.set(keys::LAST_RESET_DATE, b"2024-01-01").unwrap();
        scheduler.force_reset().unwrap();
        assert_eq!(calls(&scheduler), 1);
    }

    #[test]
    fn test_countdown() {
        let (scheduler, clock) = scheduler_at("2024-01-01T21:15:30+07:00");
        let countdown = scheduler.time_until_next_reset();
        assert_eq!(countdown, Countdown { hours: 2, minutes: 44, seconds: 30 });
        assert_eq!(countdown.to_string(), "2h 44m 30s");

        clock.set(chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00+07:00").unwrap());
        assert_eq!(scheduler.time_until_next_reset().hours, 24);

        // Countdown never resets anything
        assert_eq!(calls(&scheduler), 0);
        assert!(scheduler.last_reset_date().unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_checks_until_stopped() {
        let clock = Arc::new(ManualClock::at("2024-01-01T12:00:00+00:00").unwrap());
        let habits = Arc::new(RecordingHabits::default());
        let scheduler = Arc::new(DailyResetScheduler::new(
            MemoryStore::new(),
            Arc::clone(&habits),
            clock.clone(),
        ));
        let running = Arc::new(AtomicBool::new(true));

        let task = {
            let scheduler = Arc::clone(&scheduler);
            let running = Arc::clone(&running);
            tokio::spawn(async move {
                scheduler
                    .run_interval(std::time::Duration::from_secs(60), running)
                    .await
            })
        };

        tokio::time::sleep(std::time::Duration::from_secs(150)).await;
        assert_eq!(habits.calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::days(1));
        tokio::time::sleep(std::time::Duration::from_secs(61)).await;
        assert_eq!(habits.calls.load(Ordering::SeqCst), 2);

        running.store(false, Ordering::Relaxed);
        tokio::time::sleep(std::time::Duration::from_secs(61)).await;
        task.await.unwrap();
    }
}
