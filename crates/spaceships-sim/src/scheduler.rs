//! Delayed-action queue.
//!
//! A ship schedules actions to run at a future timestamp (the `Gone`
//! transition after blowing up) and drains whatever is due at the top of
//! each tick. Actions with equal deadlines run in scheduling order.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;

use spaceships_core::types::Millis;

struct Scheduled<T> {
    at: Millis,
    seq: u64,
    action: T,
}

impl<T> PartialEq for Scheduled<T> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl<T> Eq for Scheduled<T> {}

impl<T> PartialOrd for Scheduled<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Scheduled<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.seq).cmp(&(other.at, other.seq))
    }
}

pub struct DelayQueue<T> {
    heap: BinaryHeap<Reverse<Scheduled<T>>>,
    next_seq: u64,
}

impl<T> Default for DelayQueue<T> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }
}

impl<T> fmt::Debug for DelayQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayQueue")
            .field("len", &self.heap.len())
            .field("next_deadline", &self.next_deadline())
            .finish()
    }
}

impl<T> DelayQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at: Millis, action: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Scheduled { at, seq, action }));
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.heap.peek().map(|Reverse(s)| s.at)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Remove and return the earliest action if it is due at `now`.
    pub fn pop_due(&mut self, now: Millis) -> Option<T> {
        if self.next_deadline()? > now {
            return None;
        }
        self.heap.pop().map(|Reverse(s)| s.action)
    }

    /// Run every action due at `now`, in deadline order. Actions scheduled
    /// by `run` itself are picked up in the same pass if already due.
    /// Returns how many ran.
    pub fn drain_due(&mut self, now: Millis, mut run: impl FnMut(&mut Self, T)) -> usize {
        let mut ran = 0;
        while let Some(action) = self.pop_due(now) {
            run(self, action);
            ran += 1;
        }
        ran
    }
}
