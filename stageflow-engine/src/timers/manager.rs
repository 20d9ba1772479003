//! Timer table and tokio-backed scheduling.

use super::TimerRecord;
use crate::config::StageDefinition;
use crate::errors::TimerError;
use crate::utils::generate_timer_id;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Identifies one armed run of a timer.
///
/// Pausing, resuming or restoring bumps the generation, so a wake-up from a
/// superseded run is recognised and ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerFiring {
    /// The timer id.
    pub id: String,
    /// The run the wake-up belongs to.
    pub generation: u64,
}

/// Callback invoked when a timer elapses.
pub type TimerCallback = Arc<dyn Fn(TimerFiring) -> BoxFuture<'static, ()> + Send + Sync>;

struct TimerEntry {
    record: TimerRecord,
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl TimerEntry {
    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Owns every timer of one engine.
///
/// Each running timer is a tokio task that sleeps for the remaining time
/// and then hands a [`TimerFiring`] to the callback on a detached task.
/// The callback is expected to [`claim`](TimerManager::claim) the firing
/// before acting on it.
pub struct TimerManager {
    entries: Vec<TimerEntry>,
    callback: Option<TimerCallback>,
    next_generation: u64,
}

impl TimerManager {
    /// Creates a manager that reports elapsed timers to `callback`.
    #[must_use]
    pub fn new(callback: TimerCallback) -> Self {
        Self {
            entries: Vec::new(),
            callback: Some(callback),
            next_generation: 0,
        }
    }

    /// Creates a manager whose timers never fire. Used in tests.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            entries: Vec::new(),
            callback: None,
            next_generation: 0,
        }
    }

    /// Arms one timer per delayed transition of `stage`.
    pub fn arm_stage(&mut self, stage: &StageDefinition) -> Vec<TimerRecord> {
        let now = Instant::now();
        let mut armed = Vec::new();
        for (index, transition) in stage.delayed_transitions() {
            let Some(delay) = transition.delay else { continue };
            let record = TimerRecord::new(
                generate_timer_id(),
                &stage.name,
                &transition.target,
                index,
                delay,
                now,
            );
            debug!(
                timer_id = %record.id,
                stage = %record.stage,
                target = %record.target,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Timer scheduled"
            );
            armed.push(record.clone());
            self.insert(record);
        }
        armed
    }

    /// Adds a record, spawning its task unless it is paused.
    pub fn insert(&mut self, record: TimerRecord) {
        let generation = self.bump_generation();
        let handle = if record.paused {
            None
        } else {
            self.spawn(&record.id, generation, record.remaining_at(Instant::now()))
        };
        self.entries.push(TimerEntry {
            record,
            generation,
            handle,
        });
    }

    /// Cancels one timer.
    ///
    /// # Errors
    ///
    /// Returns `TimerError::NotFound` for an unknown id.
    pub fn cancel(&mut self, id: &str) -> Result<TimerRecord, TimerError> {
        let position = self
            .entries
            .iter()
            .position(|e| e.record.id == id)
            .ok_or_else(|| TimerError::NotFound(id.to_string()))?;
        let mut entry = self.entries.remove(position);
        entry.abort();
        debug!(timer_id = id, "Timer cancelled");
        Ok(entry.record)
    }

    /// Cancels every timer owned by `stage`.
    pub fn cancel_stage(&mut self, stage: &str) -> Vec<TimerRecord> {
        self.take_where(|r| r.stage == stage)
    }

    /// Cancels every timer.
    pub fn cancel_all(&mut self) -> Vec<TimerRecord> {
        self.take_where(|_| true)
    }

    /// Pauses every running timer owned by `stage`. Returns how many.
    pub fn pause_stage(&mut self, stage: &str) -> usize {
        let now = Instant::now();
        let mut count = 0;
        for entry in self.entries.iter_mut().filter(|e| e.record.stage == stage) {
            if entry.record.paused {
                continue;
            }
            entry.abort();
            entry.record.pause_at(now);
            count += 1;
        }
        count
    }

    /// Resumes every paused timer owned by `stage`. Returns how many.
    pub fn resume_stage(&mut self, stage: &str) -> usize {
        let now = Instant::now();
        let mut count = 0;
        for i in 0..self.entries.len() {
            if self.entries[i].record.stage != stage || !self.entries[i].record.paused {
                continue;
            }
            let generation = self.bump_generation();
            let entry = &mut self.entries[i];
            entry.record.resume_at(now);
            entry.generation = generation;
            let (id, delay) = (entry.record.id.clone(), entry.record.remaining_at(now));
            let handle = self.spawn(&id, generation, delay);
            self.entries[i].handle = handle;
            count += 1;
        }
        count
    }

    /// Removes the timers owned by `stage` without firing them.
    ///
    /// Running records keep their absolute due time, so putting them back
    /// with [`TimerManager::reinstate`] preserves the original schedule.
    pub fn suspend_stage(&mut self, stage: &str) -> Vec<TimerRecord> {
        self.take_where(|r| r.stage == stage)
    }

    /// Puts back records produced by [`TimerManager::suspend_stage`].
    ///
    /// A running record whose due time passed while suspended fires
    /// immediately.
    pub fn reinstate(&mut self, records: Vec<TimerRecord>) {
        for record in records {
            self.insert(record);
        }
    }

    /// Claims an elapsed timer, removing it from the table.
    ///
    /// Returns `None` if the timer was cancelled, paused or re-armed since
    /// the wake-up was issued.
    pub fn claim(&mut self, firing: &TimerFiring) -> Option<TimerRecord> {
        let position = self.entries.iter().position(|e| {
            e.record.id == firing.id && e.generation == firing.generation && !e.record.paused
        })?;
        let entry = self.entries.remove(position);
        Some(entry.record)
    }

    /// All timers, in creation order.
    #[must_use]
    pub fn records(&self) -> Vec<TimerRecord> {
        self.entries.iter().map(|e| e.record.clone()).collect()
    }

    /// Timers owned by `stage`.
    #[must_use]
    pub fn stage_records(&self, stage: &str) -> Vec<TimerRecord> {
        self.entries
            .iter()
            .filter(|e| e.record.stage == stage)
            .map(|e| e.record.clone())
            .collect()
    }

    /// Looks up one timer.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<TimerRecord> {
        self.entries
            .iter()
            .find(|e| e.record.id == id)
            .map(|e| e.record.clone())
    }

    /// The shortest remaining time among the timers of `stage`.
    #[must_use]
    pub fn remaining_for_stage(&self, stage: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|e| e.record.stage == stage)
            .map(|e| e.record.remaining_at(now))
            .min()
    }

    /// Whether `stage` owns timers and all of them are paused.
    #[must_use]
    pub fn all_paused(&self, stage: &str) -> bool {
        let mut owned = self.entries.iter().filter(|e| e.record.stage == stage).peekable();
        owned.peek().is_some() && owned.all(|e| e.record.paused)
    }

    /// Returns the number of timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no timers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn take_where(&mut self, predicate: impl Fn(&TimerRecord) -> bool) -> Vec<TimerRecord> {
        let mut taken = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());
        for mut entry in self.entries.drain(..) {
            if predicate(&entry.record) {
                entry.abort();
                taken.push(entry.record);
            } else {
                kept.push(entry);
            }
        }
        self.entries = kept;
        taken
    }

    fn bump_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    fn spawn(&self, id: &str, generation: u64, delay: Duration) -> Option<JoinHandle<()>> {
        let callback = self.callback.clone()?;
        let firing = TimerFiring {
            id: id.to_string(),
            generation,
        };
        Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Detached so that cancelling this timer from inside the
            // transition it triggers cannot abort that transition.
            tokio::spawn(callback(firing));
        }))
    }
}

impl Drop for TimerManager {
    fn drop(&mut self) {
        for entry in &mut self.entries {
            entry.abort();
        }
    }
}

impl std::fmt::Debug for TimerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerManager")
            .field("timers", &self.records())
            .finish_non_exhaustive()
    }
}
