//! Discrete-event scheduling.
//!
//! This module provides the host side of the simulation clock:
//! 1. **Time:** `Tick` is the global time unit; `ClockDomain` converts cycles to ticks.
//! 2. **Queue:** `EventQueue` orders pending events by tick, FIFO among equal ticks.
//! 3. **Handle:** `Scheduler` is what components hold to read the time and defer work.
//!
//! The queue is single-threaded. Components share it through `Rc` and schedule
//! through `&self`, so a handler can schedule follow-up work while the host loop
//! is between pops.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use tracing::warn;

/// Simulation time in ticks.
pub type Tick = u64;

/// Handle used by components to read the clock and schedule deferred work.
pub trait Scheduler<E> {
    /// Current simulation time.
    fn cur_tick(&self) -> Tick;

    /// Schedules `event` to fire at `when`.
    fn schedule(&self, when: Tick, event: E);
}

/// A clock with a fixed period in ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockDomain {
    period: Tick,
}

impl ClockDomain {
    /// Creates a clock domain; a zero period is treated as one tick.
    pub const fn new(period: Tick) -> Self {
        Self {
            period: if period == 0 { 1 } else { period },
        }
    }

    /// Ticks per cycle.
    pub const fn period(&self) -> Tick {
        self.period
    }

    /// Tick of the clock edge `cycles` cycles after the next edge at or after `now`.
    pub const fn clock_edge(&self, now: Tick, cycles: u64) -> Tick {
        let next = now.div_ceil(self.period) * self.period;
        next + cycles * self.period
    }

    /// Converts a cycle count to ticks.
    pub const fn cycles_to_ticks(&self, cycles: u64) -> Tick {
        cycles * self.period
    }
}

struct Scheduled<E> {
    when: Tick,
    seq: u64,
    event: E,
}

impl<E> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.when == other.when && self.seq == other.seq
    }
}

impl<E> Eq for Scheduled<E> {}

impl<E> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Scheduled<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse the ordering for min-heap
        other
            .when
            .cmp(&self.when)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Pending events ordered by firing time.
pub struct EventQueue<E> {
    now: Cell<Tick>,
    seq: Cell<u64>,
    pending: RefCell<BinaryHeap<Scheduled<E>>>,
}

impl<E> EventQueue<E> {
    /// Creates an empty queue at tick zero.
    pub fn new() -> Self {
        Self {
            now: Cell::new(0),
            seq: Cell::new(0),
            pending: RefCell::new(BinaryHeap::new()),
        }
    }

    /// Current simulation time.
    pub fn now(&self) -> Tick {
        self.now.get()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    /// Firing time of the earliest pending event.
    pub fn next_tick(&self) -> Option<Tick> {
        self.pending.borrow().peek().map(|s| s.when)
    }

    /// Queues `event` at `when`. Times in the past are clamped to now.
    pub fn push(&self, when: Tick, event: E) {
        let now = self.now.get();
        let when = if when < now {
            warn!(when, now, "event scheduled in the past, firing now");
            now
        } else {
            when
        };
        let seq = self.seq.get();
        self.seq.set(seq + 1);
        self.pending
            .borrow_mut()
            .push(Scheduled { when, seq, event });
    }

    /// Removes the earliest event and advances time to it.
    pub fn pop(&self) -> Option<(Tick, E)> {
        let next = self.pending.borrow_mut().pop()?;
        self.now.set(next.when);
        Some((next.when, next.event))
    }
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventQueue<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue")
            .field("now", &self.now.get())
            .field("pending", &self.len())
            .finish()
    }
}

impl<E, T: Into<E>> Scheduler<T> for EventQueue<E> {
    fn cur_tick(&self) -> Tick {
        self.now()
    }

    fn schedule(&self, when: Tick, event: T) {
        self.push(when, event.into());
    }
}
