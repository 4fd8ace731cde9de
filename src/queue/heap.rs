//! Max-heap of tasks keyed by priority.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::error::{Error, Result};
use crate::model::{Priority, Task};

/// Heap entry: the task plus its ordering key.
///
/// `seq` is a per-queue insertion counter. Ordering on `Reverse(seq)` after
/// priority makes equal-priority tasks come out oldest first.
struct QueueEntry {
    priority: Priority,
    seq: Reverse<u64>,
    task: Task,
}

impl QueueEntry {
    fn key(&self) -> (Priority, Reverse<u64>) {
        (self.priority, self.seq)
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Tasks retrievable in descending priority order. Not synchronized; see
/// [`super::WorkQueue`] for the shared version.
#[derive(Default)]
pub struct PriorityQueue {
    heap: BinaryHeap<QueueEntry>,
    next_seq: u64,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: Task) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.heap.push(QueueEntry {
            priority: task.priority,
            seq: Reverse(seq),
            task,
        });
    }

    /// Remove the highest-priority task.
    ///
    /// # Errors
    ///
    /// [`Error::QueueUnderflow`] if the queue is empty.
    pub fn pop(&mut self) -> Result<Task> {
        self.heap
            .pop()
            .map(|entry| entry.task)
            .ok_or(Error::QueueUnderflow)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
