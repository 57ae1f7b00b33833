//! Lifetime tracking for native digest contexts.
//!
//! Every native context is released exactly once: either synchronously when
//! its owner finalizes or resets, or later by a bounded drain after the owner
//! was dropped while still holding it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ContextTracker (Arc, shared by all owners)                 │
//! │  ├── acquire/duplicate → register watch → bounded drain     │
//! │  ├── dispose → claim → release                              │
//! │  └── stats (acquired / released / claims lost)              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  WatchRegistry                                              │
//! │  ├── One WatchEntry per live handle, ordered by handle      │
//! │  └── claim_and_remove: exactly one claimant wins            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  NotificationQueue                                          │
//! │  ├── Fed when an owner is dropped holding a context         │
//! │  └── Also accepts entries from a foreign host collector     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  BoundedDrainer                                             │
//! │  └── Pops ≤ drain_cap entries, releases the claims it wins  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use openworkers_native_digest::{CleanupConfig, ContextTracker, DigestAlgorithm, RingEngine};
//!
//! let tracker = ContextTracker::new(Arc::new(RingEngine::new()), CleanupConfig::from_env()?);
//!
//! let mut owner = tracker.owner(DigestAlgorithm::SHA256);
//! owner.update(b"abc")?;
//! let digest = owner.finalize()?; // context released here
//!
//! let mut abandoned = tracker.owner(DigestAlgorithm::SHA256);
//! abandoned.update(b"abc")?;
//! drop(abandoned); // context queued, released by a later acquire or drain()
//! ```

mod drainer;
mod handle;
mod notification_queue;
mod tracker;
mod watch_registry;

pub use drainer::BoundedDrainer;
pub use handle::ExternalHandle;
pub use notification_queue::NotificationQueue;
pub use tracker::{ContextTracker, TrackerStats};
pub use watch_registry::{WatchEntry, WatchRegistry};

pub(crate) use tracker::next_owner_id;
