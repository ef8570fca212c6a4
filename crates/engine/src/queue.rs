// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded FIFO queue between producers and batch workers
//!
//! Producers never block: an offer to a full or closed queue is refused and
//! the caller counts a drop. Consumers remove entries only through
//! [`BoundedQueue::drain_into`], which is atomic with respect to other
//! drains and offers.

use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug)]
struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Fixed-capacity, thread-safe FIFO queue
#[derive(Debug)]
pub struct BoundedQueue<T> {
    inner: Mutex<Inner<T>>,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity.min(4096)),
                closed: false,
            }),
            capacity,
        }
    }

    /// Enqueue without blocking; `false` when full or closed
    pub fn offer(&self, item: T) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.closed || inner.items.len() >= self.capacity {
            return false;
        }
        inner.items.push_back(item);
        true
    }

    /// Move up to `max` oldest entries into `buf`, returning how many moved
    pub fn drain_into(&self, buf: &mut Vec<T>, max: usize) -> usize {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let n = max.min(inner.items.len());
        buf.extend(inner.items.drain(..n));
        n
    }

    /// Remove everything still queued
    pub fn drain_all(&self) -> Vec<T> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.items.drain(..).collect()
    }

    /// Refuse all further offers; queued entries stay drainable
    pub fn close(&self) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).closed
    }

    /// Current occupancy (advisory)
    pub fn size(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).items.len()
    }

    /// Free slots (advisory)
    pub fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.size())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
