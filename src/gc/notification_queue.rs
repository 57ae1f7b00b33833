//! Notification queue for abandoned digest contexts.
//!
//! ## Problem
//!
//! A digest owner can be dropped anywhere: on a thread that must not call
//! into the native engine, mid-unwind, or by a host collector callback that
//! runs at an arbitrary point. Releasing the native context right there is
//! not always possible.
//!
//! ## Solution
//!
//! The owner's watch entry is queued instead, and the queue is drained in
//! bounded batches the next time anyone acquires a context (see
//! [`BoundedDrainer`](super::BoundedDrainer)).
//!
//! ## Usage
//!
//! ```ignore
//! let queue = NotificationQueue::new();
//!
//! // From any thread, once the owner is unreachable
//! queue.notify(entry);
//!
//! // Later, on the acquire path
//! while let Some(entry) = queue.poll() {
//!     // claim and release
//! }
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use super::WatchEntry;

/// Multi-producer queue of watch entries whose owners became unreachable.
///
/// Unbounded. Entries carry no ordering guarantee relative to abandonment
/// time; consumers must tolerate entries that were already disposed.
pub struct NotificationQueue {
    /// Entries pending release
    queue: Mutex<VecDeque<WatchEntry>>,

    /// Fast check for pending items (avoids lock acquisition on hot path).
    /// Only written while `queue` is locked, so it never goes below zero.
    pending_count: AtomicU64,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationQueue {
    /// Create a new empty queue.
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(8)),
            pending_count: AtomicU64::new(0),
        }
    }

    /// Deliver an unreachability notification for `entry`.
    ///
    /// Callable from any thread. Entries that are already claimed are
    /// dropped here since the drainer would skip them anyway.
    pub fn notify(&self, entry: WatchEntry) {
        if entry.is_claimed() {
            tracing::trace!(
                "Ignoring notification for already disposed handle {}",
                entry.handle()
            );
            return;
        }

        let handle = entry.handle();
        {
            let mut queue = self.queue.lock().expect("notification queue poisoned");
            queue.push_back(entry);
            self.pending_count.fetch_add(1, Ordering::Release);
        }

        tracing::trace!(
            "Queued abandoned handle {} (pending: {})",
            handle,
            self.len()
        );
    }

    /// Pop the oldest pending entry without waiting.
    pub fn poll(&self) -> Option<WatchEntry> {
        // Fast path: nothing pending
        if !self.has_pending() {
            return None;
        }

        let mut queue = self.queue.lock().expect("notification queue poisoned");
        let entry = queue.pop_front()?;
        self.pending_count.fetch_sub(1, Ordering::Release);
        Some(entry)
    }

    /// This is a fast lock-free check.
    #[inline]
    pub fn has_pending(&self) -> bool {
        self.pending_count.load(Ordering::Acquire) > 0
    }

    /// Number of entries waiting to be polled.
    #[inline]
    pub fn len(&self) -> u64 {
        self.pending_count.load(Ordering::Acquire)
    }

    /// Lock-free; `true` when nothing is waiting.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.has_pending()
    }
}

impl std::fmt::Debug for NotificationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationQueue")
            .field("pending_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gc::{ExternalHandle, WatchRegistry};

    #[test]
    fn test_queue_creation() {
        let queue = NotificationQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
        assert!(queue.poll().is_none());
    }

    #[test]
    fn test_fifo_delivery() {
        let registry = WatchRegistry::new();
        let queue = NotificationQueue::new();

        for raw in [4, 2, 8] {
            queue.notify(registry.register(raw, ExternalHandle::new(raw).unwrap()));
        }
        assert_eq!(queue.len(), 3);

        let order: Vec<u64> = std::iter::from_fn(|| queue.poll())
            .map(|entry| entry.handle().get())
            .collect();
        assert_eq!(order, vec![4, 2, 8]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_claimed_entries_are_not_queued() {
        let registry = WatchRegistry::new();
        let queue = NotificationQueue::new();
        let entry = registry.register(1, ExternalHandle::new(1).unwrap());

        assert!(registry.claim_and_remove(&entry));
        queue.notify(entry);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pending_count_tracks_concurrent_notify_and_poll() {
        use std::sync::Arc;

        const PER_THREAD: u64 = 500;

        let registry = Arc::new(WatchRegistry::new());
        let queue = Arc::new(NotificationQueue::new());

        let producers: Vec<_> = (0..4u64)
            .map(|t| {
                let registry = Arc::clone(&registry);
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        let raw = t * PER_THREAD + i + 1;
                        queue.notify(registry.register(raw, ExternalHandle::new(raw).unwrap()));
                    }
                })
            })
            .collect();

        let consumer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                let mut polled = 0;
                while polled < 4 * PER_THREAD {
                    assert!(queue.len() <= 4 * PER_THREAD);
                    if queue.poll().is_some() {
                        polled += 1;
                    }
                }
                polled
            })
        };

        for producer in producers {
            producer.join().unwrap();
        }
        assert_eq!(consumer.join().unwrap(), 4 * PER_THREAD);
        assert_eq!(queue.len(), 0);
        assert!(queue.poll().is_none());
    }
}
