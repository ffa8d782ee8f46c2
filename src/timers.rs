//! Timer queue for the sandbox event loop.
//!
//! Script timers only carry an id here; the callback itself lives inside the
//! script context and is looked up when the timer fires. Host waiters use a
//! `Signal` task that completes a oneshot channel.
//!
//! Timers are tagged with the owner that was current when they were
//! scheduled, so a failing callback can be charged to the render that
//! caused it rather than whichever render happened to fire it.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

pub type TimerId = u32;

/// Identifies the render a timer was scheduled on behalf of.
pub type TimerOwner = u32;

#[derive(Debug)]
pub enum TimerTask {
    Script,
    Signal(oneshot::Sender<()>),
}

/// A timer removed from the queue because it came due.
#[derive(Debug)]
pub struct DueTimer {
    pub id: TimerId,
    pub task: TimerTask,
    pub owner: Option<TimerOwner>,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    queue: BTreeMap<(Instant, u64), DueTimer>,
    index: HashMap<TimerId, (Instant, u64)>,
    next_id: TimerId,
    seq: u64,
    owner: Option<TimerOwner>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `task` to run after `delay`. Timers with equal due times fire
    /// in scheduling order.
    pub fn schedule(&mut self, delay: Duration, task: TimerTask) -> TimerId {
        self.schedule_at(Instant::now() + delay, task)
    }

    pub fn schedule_at(&mut self, due: Instant, task: TimerTask) -> TimerId {
        self.next_id = self.next_id.wrapping_add(1).max(1);
        let id = self.next_id;
        self.seq += 1;
        let key = (due, self.seq);
        let owner = self.owner;
        self.queue.insert(key, DueTimer { id, task, owner });
        self.index.insert(id, key);
        id
    }

    /// Returns whether a pending timer was removed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.index.remove(&id) {
            Some(key) => self.queue.remove(&key).is_some(),
            None => false,
        }
    }

    /// Removes and returns the earliest timer due at or before `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<DueTimer> {
        let key = *self.queue.keys().next()?;
        if key.0 > now {
            return None;
        }
        let timer = self.queue.remove(&key)?;
        self.index.remove(&timer.id);
        Some(timer)
    }

    /// Sets the owner stamped on timers scheduled from now on and returns
    /// the previous one.
    pub fn set_owner(&mut self, owner: Option<TimerOwner>) -> Option<TimerOwner> {
        std::mem::replace(&mut self.owner, owner)
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drops every pending timer. Dropped signals wake their waiters with a
    /// closed-channel error. Returns how many timers were discarded.
    pub fn clear(&mut self) -> usize {
        let count = self.queue.len();
        self.queue.clear();
        self.index.clear();
        count
    }
}
