use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::StoreError;
use crate::store::{Store, keys};

/// Persisted `(start, duration)` pair of the live exam timer.
///
/// Stored instead of a countdown value so the remaining time can be
/// recomputed after any gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerRecord {
    pub start_time: DateTime<Utc>,
    pub duration_seconds: i64,
}

impl TimerRecord {
    pub fn new(start_time: DateTime<Utc>, duration_seconds: i64) -> Self {
        Self {
            start_time,
            duration_seconds,
        }
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.start_time + TimeDelta::seconds(self.duration_seconds.max(0))
    }

    /// Time left at `now`, or `None` once `now - start >= duration`.
    ///
    /// A clock that moved backwards never yields more than the full duration.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        let full = Duration::from_secs(self.duration_seconds.max(0) as u64);
        let left = (self.deadline() - now).to_std().ok()?;
        if left.is_zero() {
            return None;
        }
        Some(left.min(full))
    }

    /// Reads the record; a missing or malformed half means "no active timer".
    pub fn load(store: &Store) -> Result<Option<Self>, StoreError> {
        let start = store.get::<i64>(keys::TIMER_START)?;
        let duration = store.get::<i64>(keys::TIMER_DURATION)?;
        let (Some(start_ms), Some(duration_seconds)) = (start, duration) else {
            return Ok(None);
        };
        Ok(DateTime::from_timestamp_millis(start_ms).map(|start_time| Self {
            start_time,
            duration_seconds,
        }))
    }

    pub fn save(&self, store: &Store) -> Result<(), StoreError> {
        store.set(keys::TIMER_START, &self.start_time.timestamp_millis())?;
        store.set(keys::TIMER_DURATION, &self.duration_seconds)
    }

    pub fn clear(store: &Store) -> Result<(), StoreError> {
        store.clear(keys::TIMER_START)?;
        store.clear(keys::TIMER_DURATION)
    }
}
