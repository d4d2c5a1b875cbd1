//! Bounded blocking queues for pipeline flow control.
//!
//! This module provides the [`BoundedQueue`] shared by adjacent pipeline
//! stages: a fixed-capacity ring-buffer FIFO whose slots carry a per-item
//! `processed` marker, letting a counting stage and a removing stage
//! cooperate on the same queue without double-counting or skipping items.
//!
//! # Blocking discipline
//!
//! Every operation takes the queue's single mutex for the whole
//! decision-plus-mutation; there is no check under the lock followed by a
//! mutation outside it. Blocking operations wait on the condition variable
//! tied to the transition they need, re-checking the predicate in a loop:
//!
//! - `space` - signaled when the queue becomes non-full (a slot was freed)
//! - `fresh_head` - signaled when an unprocessed item becomes the head
//!   (the queue became non-empty, or a removal exposed a new head)
//! - `head_processed` - signaled when the head's marker is set
//! - `drained` - signaled when the queue becomes empty
//!
//! # Marker protocol
//!
//! Only the head may be marked, and only a marked head may be removed. An
//! item is therefore marked at most once in its lifetime, and the head
//! observed by the counting stage cannot be removed out from under it:
//! removal requires the very marker the counter has not yet set.

use parking_lot::{Condvar, Mutex};

use crate::errors::{EncpipeError, Result};

/// A value flowing through a pipeline queue.
///
/// The end-of-stream sentinel is a distinct variant rather than an in-band
/// byte value, so all 256 byte values are valid payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// A payload byte.
    Byte(u8),
    /// End-of-stream sentinel; always the last token a queue ever receives.
    End,
}

impl Token {
    /// Returns the payload byte, or `None` for the end sentinel.
    #[must_use]
    pub fn byte(self) -> Option<u8> {
        match self {
            Token::Byte(b) => Some(b),
            Token::End => None,
        }
    }

    /// Returns true for the end sentinel.
    #[must_use]
    pub fn is_end(self) -> bool {
        matches!(self, Token::End)
    }
}

/// A queue slot: a token plus its counting marker.
#[derive(Debug, Clone, Copy)]
struct Slot {
    token: Token,
    processed: bool,
}

/// Ring-buffer state guarded by the queue mutex.
///
/// `head` indexes the oldest slot; insertion goes to `(head + len) %
/// capacity`. Index arithmetic keeps enqueue and dequeue O(1) with no
/// element shifting.
struct QueueInner {
    slots: Vec<Option<Slot>>,
    head: usize,
    len: usize,
}

impl QueueInner {
    fn head_slot(&self) -> Option<&Slot> {
        if self.len == 0 {
            None
        } else {
            self.slots[self.head].as_ref()
        }
    }

    fn push_tail(&mut self, token: Token) {
        let tail = (self.head + self.len) % self.slots.len();
        debug_assert!(self.slots[tail].is_none(), "tail slot occupied");
        self.slots[tail] = Some(Slot { token, processed: false });
        self.len += 1;
    }

    fn pop_head(&mut self) -> Slot {
        debug_assert!(self.len > 0, "pop from empty queue");
        let slot = self.slots[self.head].take().expect("head slot vacant");
        self.head = (self.head + 1) % self.slots.len();
        self.len -= 1;
        slot
    }
}

/// Fixed-capacity blocking FIFO shared by one producer, one counting stage,
/// and one removing stage.
pub struct BoundedQueue {
    name: &'static str,
    capacity: usize,
    inner: Mutex<QueueInner>,
    space: Condvar,
    fresh_head: Condvar,
    head_processed: Condvar,
    drained: Condvar,
}

impl BoundedQueue {
    /// Create a queue with the given fixed capacity.
    ///
    /// Capacities are validated at configuration time; the queue itself only
    /// requires a non-zero capacity.
    #[must_use]
    pub fn new(name: &'static str, capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be non-zero");
        Self {
            name,
            capacity,
            inner: Mutex::new(QueueInner { slots: vec![None; capacity], head: 0, len: 0 }),
            space: Condvar::new(),
            fresh_head: Condvar::new(),
            head_processed: Condvar::new(),
            drained: Condvar::new(),
        }
    }

    /// The queue's fixed capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len
    }

    /// True if no items are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().len == 0
    }

    /// True if the queue is at capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        let inner = self.inner.lock();
        inner.len == self.capacity
    }

    /// Append a token if there is room, returning whether it was accepted.
    pub fn try_enqueue(&self, token: Token) -> bool {
        let mut inner = self.inner.lock();
        if inner.len == self.capacity {
            return false;
        }
        let was_empty = inner.len == 0;
        inner.push_tail(token);
        if was_empty {
            self.fresh_head.notify_one();
        }
        true
    }

    /// Append a token, or fail with [`EncpipeError::CapacityViolation`] if
    /// the queue is full.
    ///
    /// Stages use the blocking [`enqueue`](Self::enqueue); this checked form
    /// exists for callers that have already established room and treat a
    /// full queue as a broken invariant.
    ///
    /// # Errors
    ///
    /// Returns `CapacityViolation` when the queue is at capacity.
    pub fn checked_enqueue(&self, token: Token) -> Result<()> {
        if self.try_enqueue(token) {
            Ok(())
        } else {
            Err(EncpipeError::CapacityViolation {
                queue: self.name.to_string(),
                capacity: self.capacity,
            })
        }
    }

    /// Append a token, blocking while the queue is full.
    pub fn enqueue(&self, token: Token) {
        let mut inner = self.inner.lock();
        while inner.len == self.capacity {
            self.space.wait(&mut inner);
        }
        let was_empty = inner.len == 0;
        inner.push_tail(token);
        if was_empty {
            self.fresh_head.notify_one();
        }
    }

    /// Copy of the head token and its marker, if any item is queued.
    #[must_use]
    pub fn peek_head(&self) -> Option<(Token, bool)> {
        self.inner.lock().head_slot().map(|slot| (slot.token, slot.processed))
    }

    /// Set the head's marker, signaling the removing stage.
    ///
    /// Idempotent. Returns false when the queue is empty.
    pub fn mark_head_processed(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.len == 0 {
            return false;
        }
        let head = inner.head;
        let slot = inner.slots[head].as_mut().expect("head slot vacant");
        if !slot.processed {
            slot.processed = true;
            self.head_processed.notify_one();
        }
        true
    }

    /// Block until an unprocessed item is at the head, run `inspect` on its
    /// token, then set the marker - all in one critical section.
    ///
    /// This is the counting stage's operation: the inspection and the marker
    /// write cannot be separated by a removal, because removal requires the
    /// marker that is only set here. Returns a copy of the inspected token.
    pub fn process_head<F: FnOnce(Token)>(&self, inspect: F) -> Token {
        let mut inner = self.inner.lock();
        loop {
            if let Some(slot) = inner.head_slot() {
                if !slot.processed {
                    break;
                }
            }
            self.fresh_head.wait(&mut inner);
        }
        let head = inner.head;
        let slot = inner.slots[head].as_mut().expect("head slot vacant");
        let token = slot.token;
        inspect(token);
        slot.processed = true;
        self.head_processed.notify_one();
        token
    }

    /// Block until the head exists and carries the marker, then remove and
    /// return it.
    ///
    /// Waking waiters: the producer (a slot was freed), the counting stage
    /// (a new, unprocessed head was exposed), and any drain waiter once the
    /// queue becomes empty.
    pub fn dequeue_processed(&self) -> Token {
        let mut inner = self.inner.lock();
        while !inner.head_slot().is_some_and(|slot| slot.processed) {
            self.head_processed.wait(&mut inner);
        }
        let slot = inner.pop_head();
        self.space.notify_one();
        if inner.len == 0 {
            self.drained.notify_all();
        } else {
            self.fresh_head.notify_one();
        }
        slot.token
    }

    /// Block until the queue is empty.
    pub fn wait_until_empty(&self) {
        let mut inner = self.inner.lock();
        while inner.len > 0 {
            self.drained.wait(&mut inner);
        }
    }
}

impl std::fmt::Debug for BoundedQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("BoundedQueue")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("len", &inner.len)
            .finish()
    }
}
