//! Shared lifecycle hub for native digest contexts.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{BoundedDrainer, NotificationQueue, WatchEntry, WatchRegistry};
use crate::config::CleanupConfig;
use crate::crypto::{DigestAlgorithm, DigestOwner, NativeDigestEngine};
use crate::error::NativeError;

/// Monotonic source of owner identities.
static NEXT_OWNER_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_owner_id() -> u64 {
    NEXT_OWNER_ID.fetch_add(1, Ordering::Relaxed)
}

/// Owns the engine, the watch registry and the notification queue shared by
/// every [`DigestOwner`] created from it.
///
/// Each acquisition registers a watch and then runs one bounded drain, so
/// abandoned contexts are released as a side effect of ongoing work.
pub struct ContextTracker {
    engine: Arc<dyn NativeDigestEngine>,
    registry: WatchRegistry,
    queue: NotificationQueue,
    drainer: BoundedDrainer,
    config: CleanupConfig,
    acquired: AtomicU64,
    released_explicitly: AtomicU64,
    released_by_drain: AtomicU64,
    claims_lost: AtomicU64,
}

impl ContextTracker {
    pub fn new(engine: Arc<dyn NativeDigestEngine>, config: CleanupConfig) -> Arc<Self> {
        tracing::debug!(
            "Creating ContextTracker (drain_cap: {})",
            config.drain_cap
        );

        Arc::new(Self {
            engine,
            registry: WatchRegistry::new(),
            queue: NotificationQueue::new(),
            drainer: BoundedDrainer::new(config.drain_cap),
            config,
            acquired: AtomicU64::new(0),
            released_explicitly: AtomicU64::new(0),
            released_by_drain: AtomicU64::new(0),
            claims_lost: AtomicU64::new(0),
        })
    }

    /// Create an owner in the unallocated state.
    pub fn owner(self: &Arc<Self>, algorithm: DigestAlgorithm) -> DigestOwner {
        DigestOwner::new(Arc::clone(self), algorithm)
    }

    /// Engine that owns the native contexts.
    pub fn engine(&self) -> &dyn NativeDigestEngine {
        self.engine.as_ref()
    }

    /// Cleanup settings this tracker was built with.
    pub fn config(&self) -> CleanupConfig {
        self.config
    }

    /// Queue that receives unreachability notifications.
    ///
    /// Foreign hosts with their own collector deliver watch entries here.
    pub fn notifications(&self) -> &NotificationQueue {
        &self.queue
    }

    /// Watches for every context not yet released.
    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    /// Acquire a fresh native context for `owner_id` and watch it.
    pub fn acquire(
        &self,
        algorithm: DigestAlgorithm,
        owner_id: u64,
    ) -> Result<WatchEntry, NativeError> {
        let handle = self.engine.acquire(algorithm)?;
        tracing::trace!(
            "Acquired {} context {} for owner {}",
            algorithm,
            handle,
            owner_id
        );
        Ok(self.track(handle, owner_id))
    }

    /// Duplicate the context behind `entry` for a new owner and watch the copy.
    pub fn duplicate(&self, entry: &WatchEntry, owner_id: u64) -> Result<WatchEntry, NativeError> {
        let handle = self.engine.duplicate(entry.handle())?;
        tracing::trace!(
            "Duplicated context {} into {} for owner {}",
            entry.handle(),
            handle,
            owner_id
        );
        Ok(self.track(handle, owner_id))
    }

    fn track(&self, handle: super::ExternalHandle, owner_id: u64) -> WatchEntry {
        let entry = self.registry.register(owner_id, handle);
        self.acquired.fetch_add(1, Ordering::Relaxed);
        self.drain();
        entry
    }

    /// Claim `entry` and release its context.
    ///
    /// Returns `false` when another path already released it.
    pub fn dispose(&self, entry: &WatchEntry) -> bool {
        if !self.registry.claim_and_remove(entry) {
            self.claims_lost.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(
                "Handle {} already released by another path",
                entry.handle()
            );
            return false;
        }

        self.engine.release(entry.handle());
        self.released_explicitly.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("Disposed context {}", entry.handle());
        true
    }

    /// Run one drain bounded by the configured cap.
    ///
    /// Returns the number of contexts released, which can be `0` while
    /// notifications remain: a batch made only of already-disposed entries
    /// releases nothing. Check [`notifications`](Self::notifications) to know
    /// whether more work is queued.
    pub fn drain(&self) -> usize {
        self.drain_with_cap(self.drainer.cap())
    }

    /// Run one drain bounded by `cap`. Never blocks on an empty queue.
    ///
    /// Same return value as [`drain`](Self::drain).
    pub fn drain_with_cap(&self, cap: usize) -> usize {
        if self.queue.is_empty() {
            return 0;
        }

        let released = BoundedDrainer::drain_up_to(cap, &self.queue, &self.registry, |handle| {
            self.engine.release(handle)
        });

        self.released_by_drain
            .fetch_add(released as u64, Ordering::Relaxed);
        released
    }

    /// Snapshot of the lifecycle counters.
    pub fn stats(&self) -> TrackerStats {
        TrackerStats {
            acquired: self.acquired.load(Ordering::Relaxed),
            released_explicitly: self.released_explicitly.load(Ordering::Relaxed),
            released_by_drain: self.released_by_drain.load(Ordering::Relaxed),
            claims_lost: self.claims_lost.load(Ordering::Relaxed),
            live: self.registry.len(),
            pending: self.queue.len(),
        }
    }
}

impl Drop for ContextTracker {
    fn drop(&mut self) {
        let released = self.drain_with_cap(usize::MAX);

        if released > 0 {
            tracing::debug!("Released {} abandoned contexts on shutdown", released);
        }

        let leaked = self.registry.len();
        if leaked > 0 {
            tracing::warn!("ContextTracker dropped with {} watched contexts", leaked);
        }
    }
}

impl std::fmt::Debug for ContextTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextTracker")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Counters describing tracker activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackerStats {
    /// Contexts acquired or duplicated
    pub acquired: u64,
    /// Contexts released by an owner's reset/finalize
    pub released_explicitly: u64,
    /// Contexts released by the drainer
    pub released_by_drain: u64,
    /// Claims that lost to another path (no release performed)
    pub claims_lost: u64,
    /// Watches currently registered
    pub live: usize,
    /// Notifications waiting to be drained
    pub pending: u64,
}

impl TrackerStats {
    /// Contexts released by either path.
    pub fn released(&self) -> u64 {
        self.released_explicitly + self.released_by_drain
    }

    /// Acquired minus released; zero once every context has been cleaned up.
    pub fn outstanding(&self) -> u64 {
        self.acquired.saturating_sub(self.released())
    }
}
