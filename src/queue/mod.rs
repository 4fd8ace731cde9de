//! Thread-safe work queue shared by trigger callbacks and the dispatcher.
//!
//! Structural changes (push, pop, drain) take the write lock; length checks
//! take the read lock. The queue never wakes anyone: the engine pairs every
//! push with its own wake signal.

pub mod heap;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Error, Result};
use crate::model::Task;

pub use heap::PriorityQueue;

#[derive(Default)]
pub struct WorkQueue {
    inner: RwLock<PriorityQueue>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, task: Task) {
        self.write().push(task);
    }

    /// Push `task` unless `closed` is set. The flag is read under the write
    /// lock, so a push either lands before a concurrent [`Self::drain`] or
    /// is refused.
    ///
    /// # Errors
    ///
    /// [`Error::ShuttingDown`] if `closed` is set.
    pub fn push_unless(&self, task: Task, closed: &AtomicBool) -> Result<()> {
        let mut queue = self.write();
        if closed.load(Ordering::Acquire) {
            return Err(Error::ShuttingDown);
        }
        queue.push(task);
        Ok(())
    }

    /// Pop the highest-priority task. The caller must know the queue is
    /// non-empty; otherwise this is [`crate::error::Error::QueueUnderflow`].
    pub fn pop(&self) -> Result<Task> {
        self.write().pop()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Remove every queued task, highest priority first.
    pub fn drain(&self) -> Vec<Task> {
        let mut queue = self.write();
        let mut drained = Vec::with_capacity(queue.len());
        while let Ok(task) = queue.pop() {
            drained.push(task);
        }
        drained
    }

    // Poisoning is ignored: no code path panics with the heap half-updated.
    fn read(&self) -> RwLockReadGuard<'_, PriorityQueue> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PriorityQueue> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
