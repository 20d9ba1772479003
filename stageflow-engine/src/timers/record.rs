//! Timer records.

use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Scheduling state of one delayed transition.
///
/// Lifecycle: `scheduled → fired | cancelled | paused`, and
/// `paused → scheduled | cancelled`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerRecord {
    /// Unique timer id.
    pub id: String,
    /// The stage that armed the timer.
    pub stage: String,
    /// The stage the timer moves to.
    pub target: String,
    /// Index of the originating transition within the owning stage.
    pub transition_index: usize,
    /// The configured delay.
    pub duration: Duration,
    /// When the timer is due (meaningful while not paused).
    pub scheduled_at: Instant,
    /// Whether the clock is halted.
    pub paused: bool,
    /// Time left when paused.
    pub remaining: Option<Duration>,
    /// Arbitrary annotations.
    pub metadata: HashMap<String, Value>,
}

impl TimerRecord {
    /// Creates a running record due `duration` after `now`.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        stage: impl Into<String>,
        target: impl Into<String>,
        transition_index: usize,
        duration: Duration,
        now: Instant,
    ) -> Self {
        Self {
            id: id.into(),
            stage: stage.into(),
            target: target.into(),
            transition_index,
            duration,
            scheduled_at: now + duration,
            paused: false,
            remaining: None,
            metadata: HashMap::new(),
        }
    }

    /// Time left before the timer fires, as seen at `now`.
    #[must_use]
    pub fn remaining_at(&self, now: Instant) -> Duration {
        if self.paused {
            self.remaining.unwrap_or_default()
        } else {
            self.scheduled_at.saturating_duration_since(now)
        }
    }

    /// Time left before the timer fires.
    #[must_use]
    pub fn remaining_time(&self) -> Duration {
        self.remaining_at(Instant::now())
    }

    /// Halts the clock, capturing the remaining time.
    pub(crate) fn pause_at(&mut self, now: Instant) {
        if !self.paused {
            self.remaining = Some(self.scheduled_at.saturating_duration_since(now));
            self.paused = true;
        }
    }

    /// Restarts the clock from the captured remaining time.
    pub(crate) fn resume_at(&mut self, now: Instant) {
        if self.paused {
            self.scheduled_at = now + self.remaining.take().unwrap_or_default();
            self.paused = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_counts_down() {
        let now = Instant::now();
        let record = TimerRecord::new("t", "loading", "main", 0, Duration::from_secs(3), now);

        assert_eq!(record.remaining_at(now), Duration::from_secs(3));
        assert_eq!(record.remaining_at(now + Duration::from_secs(1)), Duration::from_secs(2));
        assert_eq!(record.remaining_at(now + Duration::from_secs(10)), Duration::ZERO);
    }

    #[test]
    fn test_pause_freezes_remaining() {
        let now = Instant::now();
        let mut record = TimerRecord::new("t", "loading", "main", 0, Duration::from_secs(3), now);

        record.pause_at(now + Duration::from_secs(1));
        assert!(record.paused);
        assert_eq!(record.remaining_at(now + Duration::from_secs(100)), Duration::from_secs(2));

        let resumed = now + Duration::from_secs(50);
        record.resume_at(resumed);
        assert!(!record.paused);
        assert!(record.remaining.is_none());
        assert_eq!(record.scheduled_at, resumed + Duration::from_secs(2));
    }
}
