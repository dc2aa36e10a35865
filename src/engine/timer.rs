//! Deferred effects
//!
//! Every delayed change (clearing feedback, removing repelled pieces,
//! auto-advancing) is a timer in a [`TimerQueue`]. Each timer carries the
//! [`LevelToken`] that was current when it was scheduled; the owner drops
//! fired timers whose token no longer matches, so leaving a level invalidates
//! everything it scheduled.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use super::flow::LevelToken;

/// Source of the current time, relative to an arbitrary origin
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall clock for the real binary
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Kind of deferred effect
///
/// At most one timer per class is pending; scheduling another replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerClass {
    /// Move to the next level
    AutoAdvance,
    /// Blank the feedback line
    FeedbackClear,
    /// Remove repelled or returned pieces
    WorkspaceClear,
    /// Finish a merge or trace evolution
    Evolution,
    /// Hide a non-target result in a guided level
    ResultHold,
    /// Allow finishing a free level
    FinishUnlock,
}

/// Handle returned by [`TimerQueue::schedule`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

/// A pending effect
#[derive(Debug, Clone)]
pub struct Timer<E> {
    pub id: TimerId,
    pub class: TimerClass,
    pub due: Duration,
    pub token: LevelToken,
    pub effect: E,
}

#[derive(Debug, Clone)]
pub struct TimerQueue<E> {
    timers: Vec<Timer<E>>,
    next_id: u64,
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> TimerQueue<E> {
    pub fn new() -> Self {
        Self {
            timers: Vec::new(),
            next_id: 1,
        }
    }

    /// Schedule an effect, replacing any pending timer of the same class
    pub fn schedule(&mut self, class: TimerClass, due: Duration, token: LevelToken, effect: E) -> TimerId {
        self.cancel_class(class);
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            class,
            due,
            token,
            effect,
        });
        id
    }

    /// Returns true if the timer was still pending
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        before != self.timers.len()
    }

    pub fn cancel_class(&mut self, class: TimerClass) {
        self.timers.retain(|t| t.class != class);
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    pub fn is_pending(&self, class: TimerClass) -> bool {
        self.timers.iter().any(|t| t.class == class)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Earliest due time among pending timers
    pub fn next_due(&self) -> Option<Duration> {
        self.timers.iter().map(|t| t.due).min()
    }

    /// Remove and return every timer due at or before `now`, oldest first
    pub fn drain_due(&mut self, now: Duration) -> Vec<Timer<E>> {
        let (mut due, pending): (Vec<_>, Vec<_>) =
            self.timers.drain(..).partition(|t| t.due <= now);
        self.timers = pending;
        due.sort_by_key(|t| (t.due, t.id));
        due
    }
}
