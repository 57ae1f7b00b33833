//! Registry of outstanding watches on native digest contexts.
//!
//! Every live native context has exactly one [`WatchEntry`] tying it to the
//! owner that holds it. The entry is released through exactly one of two
//! paths: the owner disposes it explicitly, or the owner is abandoned and the
//! drainer picks the entry up from the notification queue. Both paths go
//! through [`WatchRegistry::claim_and_remove`], and only the winning claimant
//! may release the native context.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::ExternalHandle;

struct WatchSlot {
    handle: ExternalHandle,
    owner_id: u64,
    /// Tombstone: set once by the winning claimant, never cleared.
    claimed: AtomicBool,
}

/// A watch tying an owner's liveness to its current native context.
///
/// Cheap to clone; all clones refer to the same slot, so claiming through any
/// clone claims the watch for all of them.
#[derive(Clone)]
pub struct WatchEntry {
    slot: Arc<WatchSlot>,
}

impl WatchEntry {
    /// Native handle being watched.
    #[inline]
    pub fn handle(&self) -> ExternalHandle {
        self.slot.handle
    }

    /// Identity of the watched owner.
    #[inline]
    pub fn owner_id(&self) -> u64 {
        self.slot.owner_id
    }

    /// Whether some path already claimed this watch.
    #[inline]
    pub fn is_claimed(&self) -> bool {
        self.slot.claimed.load(Ordering::Acquire)
    }

    fn same_slot(&self, other: &WatchEntry) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl std::fmt::Debug for WatchEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchEntry")
            .field("handle", &self.slot.handle)
            .field("owner_id", &self.slot.owner_id)
            .field("claimed", &self.is_claimed())
            .finish()
    }
}

/// Set of outstanding watches, ordered by handle value.
///
/// Safe for concurrent registration from many owners and concurrent claims
/// from the dispose and drain paths.
pub struct WatchRegistry {
    entries: Mutex<BTreeMap<ExternalHandle, WatchEntry>>,
}

impl Default for WatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Create a fresh watch for `handle` on behalf of owner `owner_id`.
    pub fn register(&self, owner_id: u64, handle: ExternalHandle) -> WatchEntry {
        let entry = WatchEntry {
            slot: Arc::new(WatchSlot {
                handle,
                owner_id,
                claimed: AtomicBool::new(false),
            }),
        };

        let previous = self
            .entries
            .lock()
            .expect("watch registry poisoned")
            .insert(handle, entry.clone());

        if let Some(previous) = previous {
            // The engine handed out a handle that is still live. Keep the new
            // watch and tombstone the stale one so it can never be released.
            previous.slot.claimed.store(true, Ordering::Release);
            log::error!(
                "Native handle {} registered twice (previous owner {}, new owner {})",
                handle,
                previous.owner_id(),
                owner_id
            );
        }

        log::trace!("Registered watch for handle {} (owner {})", handle, owner_id);
        entry
    }

    /// Claim `entry` and remove it from the registry.
    ///
    /// Returns `true` for exactly one caller per entry. A `false` return means
    /// another path already claimed it and the caller must not release the
    /// native context.
    pub fn claim_and_remove(&self, entry: &WatchEntry) -> bool {
        if entry
            .slot
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::trace!("Watch for handle {} already claimed", entry.handle());
            return false;
        }

        let mut entries = self.entries.lock().expect("watch registry poisoned");

        if entries
            .get(&entry.handle())
            .is_some_and(|current| current.same_slot(entry))
        {
            entries.remove(&entry.handle());
        }

        true
    }

    /// Whether a live watch exists for `handle`.
    pub fn contains(&self, handle: ExternalHandle) -> bool {
        self.entries
            .lock()
            .expect("watch registry poisoned")
            .contains_key(&handle)
    }

    /// Snapshot of live handles in ascending order.
    pub fn handles(&self) -> Vec<ExternalHandle> {
        self.entries
            .lock()
            .expect("watch registry poisoned")
            .keys()
            .copied()
            .collect()
    }

    /// Number of live watches.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("watch registry poisoned").len()
    }

    /// Whether no watch is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for WatchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchRegistry")
            .field("live", &self.len())
            .finish()
    }
}
