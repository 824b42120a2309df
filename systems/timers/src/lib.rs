#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic task set that drives every timer owned by a session.
//!
//! Timers never fire on their own. The owner advances the clock with
//! [`Timers::advance`] and then drains due tasks one at a time through
//! [`Timers::next_due`], which lets the owner react to each firing (including
//! cancelling everything) before the next one is released.

use std::time::Duration;

use thiserror::Error;

/// Identifier assigned to a scheduled task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Retrieves the numeric identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Errors raised when scheduling a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum TimerError {
    /// Repeating tasks require a non-zero period.
    #[error("repeating tasks require a non-zero interval")]
    ZeroInterval,
}

/// Task released by [`Timers::next_due`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fired<T> {
    /// Identifier of the task that fired.
    pub id: TaskId,
    /// Clock reading at which the task was due.
    pub due: Duration,
    /// Payload registered with the task.
    pub payload: T,
}

#[derive(Clone, Debug)]
struct Scheduled<T> {
    id: TaskId,
    due: Duration,
    period: Option<Duration>,
    payload: T,
}

/// Set of repeating and one-shot tasks sharing one virtual clock.
#[derive(Clone, Debug)]
pub struct Timers<T> {
    now: Duration,
    horizon: Duration,
    next_id: u64,
    tasks: Vec<Scheduled<T>>,
}

impl<T> Default for Timers<T> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            horizon: Duration::ZERO,
            next_id: 0,
            tasks: Vec::new(),
        }
    }
}

impl<T: Clone> Timers<T> {
    /// Creates an empty task set with the clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current clock reading.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of tasks that are still scheduled.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Schedules a task that fires every `interval`, first one interval from now.
    pub fn schedule_repeating(
        &mut self,
        interval: Duration,
        payload: T,
    ) -> Result<TaskId, TimerError> {
        if interval.is_zero() {
            return Err(TimerError::ZeroInterval);
        }
        Ok(self.insert(interval, Some(interval), payload))
    }

    /// Schedules a task that fires once after `delay`.
    pub fn schedule_once(&mut self, delay: Duration, payload: T) -> TaskId {
        self.insert(delay, None, payload)
    }

    /// Cancels a single task. Returns `false` when the task was not scheduled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        self.tasks.len() != before
    }

    /// Cancels every scheduled task and any firing already released by
    /// [`Timers::advance`]. Returns the number of tasks that were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.tasks.len();
        self.tasks.clear();
        self.horizon = self.now;
        dropped
    }

    /// Moves the firing horizon forward by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.horizon = self.horizon.saturating_add(dt);
    }

    /// Releases the earliest task due at or before the horizon.
    ///
    /// Ties are broken by scheduling order. Repeating tasks are re-armed one
    /// period after their due time. Once nothing else is due the clock settles
    /// on the horizon and `None` is returned.
    pub fn next_due(&mut self) -> Option<Fired<T>> {
        let index = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.due <= self.horizon)
            .min_by_key(|(_, task)| (task.due, task.id))
            .map(|(index, _)| index);

        let Some(index) = index else {
            self.now = self.horizon;
            return None;
        };

        let task = &mut self.tasks[index];
        let fired = Fired {
            id: task.id,
            due: task.due,
            payload: task.payload.clone(),
        };
        self.now = task.due;
        let period = task.period;

        match period {
            Some(period) => task.due = task.due.saturating_add(period),
            None => {
                let _ = self.tasks.remove(index);
            }
        }

        Some(fired)
    }

    fn insert(&mut self, delay: Duration, period: Option<Duration>, payload: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push(Scheduled {
            id,
            due: self.now.saturating_add(delay),
            period,
            payload,
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_interval() {
        let mut timers = Timers::new();
        assert_eq!(
            timers.schedule_repeating(Duration::ZERO, ()),
            Err(TimerError::ZeroInterval)
        );
        assert_eq!(timers.pending(), 0);
    }

    #[test]
    fn clock_settles_on_horizon() {
        let mut timers: Timers<()> = Timers::new();
        timers.advance(Duration::from_millis(40));
        assert!(timers.next_due().is_none());
        assert_eq!(timers.now(), Duration::from_millis(40));
    }
}
