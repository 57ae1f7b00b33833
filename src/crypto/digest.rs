//! Digest owner: a single logical digest computation over a native context.

use std::sync::Arc;

use super::DigestAlgorithm;
use crate::error::{DigestError, NativeError, NativeOperation, Result};
use crate::gc::{ContextTracker, ExternalHandle, WatchEntry, next_owner_id};

/// Owns at most one native digest context at a time.
///
/// The context is acquired lazily on the first update (or finalize) and is
/// disposed deterministically by [`finalize_into`](Self::finalize_into) and
/// [`reset`](Self::reset). Dropping an owner that still holds a context hands
/// its watch to the tracker's notification queue, and the context is released
/// by a later drain.
///
/// All context-touching operations take `&mut self`, so calls on one owner are
/// serialized by the borrow checker. Share an owner across threads behind a
/// `Mutex` if needed.
///
/// # Example
///
/// ```ignore
/// let tracker = ContextTracker::new(Arc::new(RingEngine::new()), CleanupConfig::default());
/// let mut owner = tracker.owner(DigestAlgorithm::SHA256);
///
/// owner.update(b"hello ")?;
/// owner.update(b"world")?;
/// let digest = owner.finalize()?;
/// ```
pub struct DigestOwner {
    tracker: Arc<ContextTracker>,
    algorithm: DigestAlgorithm,
    owner_id: u64,
    context: Option<WatchEntry>,
}

impl DigestOwner {
    pub(crate) fn new(tracker: Arc<ContextTracker>, algorithm: DigestAlgorithm) -> Self {
        Self {
            tracker,
            algorithm,
            owner_id: next_owner_id(),
            context: None,
        }
    }

    /// Algorithm this owner digests with.
    #[inline]
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Fixed output size in bytes. Does not touch the native context.
    #[inline]
    pub fn digest_length(&self) -> usize {
        self.algorithm.output_len()
    }

    /// Identity used for this owner's watches.
    #[inline]
    pub fn owner_id(&self) -> u64 {
        self.owner_id
    }

    /// Whether a native context is currently held.
    #[inline]
    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    /// Handle of the current native context, if any.
    pub fn handle(&self) -> Option<ExternalHandle> {
        self.context.as_ref().map(WatchEntry::handle)
    }

    /// Feed a single byte.
    pub fn update_byte(&mut self, input: u8) -> Result<()> {
        self.update_range(&[input], 0, 1)
    }

    /// Feed all of `input`. See [`update_range`](Self::update_range).
    pub fn update(&mut self, input: &[u8]) -> Result<()> {
        self.update_range(input, 0, input.len())
    }

    /// Feed `input[offset..offset + len]` into the digest.
    ///
    /// An empty range is a no-op. An out-of-bounds range fails before any
    /// context is acquired. If the engine rejects the update the owner is
    /// reset, since the native state can no longer be trusted.
    pub fn update_range(&mut self, input: &[u8], offset: usize, len: usize) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        let range = check_range(input.len(), offset, len)?;

        let handle = self.ensure_context()?;

        if let Err(source) = self.tracker.engine().update(handle, &input[range]) {
            tracing::debug!(
                "Native update failed on {} context {}, resetting owner {}",
                self.algorithm,
                handle,
                self.owner_id
            );
            self.reset();
            return Err(self.external(NativeOperation::Update, source));
        }

        Ok(())
    }

    /// Write the digest into `output[offset..offset + len]` and reset.
    ///
    /// `len` must be at least [`digest_length`](Self::digest_length). An owner
    /// that was never updated yields the digest of empty input. The context is
    /// disposed whether or not the engine succeeds.
    pub fn finalize_into(&mut self, output: &mut [u8], offset: usize, len: usize) -> Result<usize> {
        let digest_length = self.digest_length();

        if len < digest_length {
            return Err(DigestError::OutputTooSmall {
                required: digest_length,
                actual: len,
                algorithm: self.algorithm.name(),
            });
        }
        check_range(output.len(), offset, len)?;

        let handle = self.ensure_context()?;
        let result = self
            .tracker
            .engine()
            .finalize(handle, &mut output[offset..offset + digest_length]);

        self.reset();

        result.map_err(|source| self.external(NativeOperation::Finalize, source))
    }

    /// Allocating variant of [`finalize_into`](Self::finalize_into).
    pub fn finalize(&mut self) -> Result<Vec<u8>> {
        let mut output = vec![0u8; self.digest_length()];
        let len = output.len();
        self.finalize_into(&mut output, 0, len)?;
        Ok(output)
    }

    /// Create an independent owner with the same digest state.
    ///
    /// If a context is held it is duplicated natively and the copy gets its own
    /// watch; otherwise the clone starts unallocated. A failed duplicate leaves
    /// `self` untouched.
    pub fn try_clone(&self) -> Result<DigestOwner> {
        let owner_id = next_owner_id();

        let context = match &self.context {
            Some(entry) => Some(
                self.tracker
                    .duplicate(entry, owner_id)
                    .map_err(|source| self.external(NativeOperation::Duplicate, source))?,
            ),
            None => None,
        };

        Ok(DigestOwner {
            tracker: Arc::clone(&self.tracker),
            algorithm: self.algorithm,
            owner_id,
            context,
        })
    }

    /// Dispose the current context, if any. Idempotent.
    pub fn reset(&mut self) {
        if let Some(entry) = self.context.take() {
            self.tracker.dispose(&entry);
        }
    }

    fn ensure_context(&mut self) -> Result<ExternalHandle> {
        if let Some(entry) = &self.context {
            return Ok(entry.handle());
        }

        let entry = self
            .tracker
            .acquire(self.algorithm, self.owner_id)
            .map_err(|source| self.external(NativeOperation::Acquire, source))?;
        let handle = entry.handle();
        self.context = Some(entry);
        Ok(handle)
    }

    fn external(&self, operation: NativeOperation, source: NativeError) -> DigestError {
        DigestError::External {
            operation,
            algorithm: self.algorithm.name(),
            source,
        }
    }
}

/// Validate that `offset..offset + len` lies within a buffer of `buffer_len`.
fn check_range(buffer_len: usize, offset: usize, len: usize) -> Result<std::ops::Range<usize>> {
    match offset.checked_add(len) {
        Some(end) if end <= buffer_len => Ok(offset..end),
        _ => Err(DigestError::Range {
            offset,
            len,
            buffer_len,
        }),
    }
}

impl Drop for DigestOwner {
    fn drop(&mut self) {
        if let Some(entry) = self.context.take() {
            tracing::trace!(
                "Owner {} abandoned with {} context {}",
                self.owner_id,
                self.algorithm,
                entry.handle()
            );
            self.tracker.notifications().notify(entry);
        }
    }
}

impl std::io::Write for DigestOwner {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.update(buf).map_err(std::io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for DigestOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestOwner")
            .field("algorithm", &self.algorithm)
            .field("owner_id", &self.owner_id)
            .field("handle", &self.handle())
            .finish()
    }
}
