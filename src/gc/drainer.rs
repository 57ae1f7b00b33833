//! Bounded release of abandoned contexts.

use super::{ExternalHandle, NotificationQueue, WatchRegistry};

/// Drains the notification queue in capped batches.
///
/// Runs inline on the acquire path, so a burst of abandoned owners is spread
/// over many acquisitions instead of stalling one of them. Never waits for
/// new notifications.
#[derive(Debug, Clone, Copy)]
pub struct BoundedDrainer {
    cap: usize,
}

impl BoundedDrainer {
    /// Create a drainer popping at most `cap` notifications per call.
    pub fn new(cap: usize) -> Self {
        Self { cap }
    }

    /// Notifications popped per call at most.
    #[inline]
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Drain up to the configured cap. See [`drain_up_to`](Self::drain_up_to).
    pub fn drain(
        &self,
        queue: &NotificationQueue,
        registry: &WatchRegistry,
        release: impl FnMut(ExternalHandle),
    ) -> usize {
        Self::drain_up_to(self.cap, queue, registry, release)
    }

    /// Pop at most `cap` notifications and release the ones this call wins.
    ///
    /// Entries already claimed by an explicit dispose are consumed without
    /// calling `release`. Returns the number of handles released, not the
    /// number popped, so `0` does not imply the queue is empty.
    pub fn drain_up_to(
        cap: usize,
        queue: &NotificationQueue,
        registry: &WatchRegistry,
        mut release: impl FnMut(ExternalHandle),
    ) -> usize {
        let mut popped = 0;
        let mut released = 0;

        while popped < cap {
            let Some(entry) = queue.poll() else {
                break;
            };
            popped += 1;

            if registry.claim_and_remove(&entry) {
                release(entry.handle());
                released += 1;
            }
        }

        if popped > 0 {
            tracing::debug!(
                "Drained {} notifications, released {} handles (cap: {}, pending: {})",
                popped,
                released,
                cap,
                queue.len()
            );
        }

        released
    }
}
