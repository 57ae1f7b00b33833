//! Boundary with the native digest implementation.

use super::DigestAlgorithm;
use crate::error::NativeError;
use crate::gc::ExternalHandle;

/// Foreign function surface behind every digest context.
///
/// Implementations own the native state; the core only ever sees
/// [`ExternalHandle`]s. The core guarantees it never passes a handle that was
/// already released, and never releases a handle twice.
pub trait NativeDigestEngine: Send + Sync {
    /// Create a context initialized for `algorithm`.
    fn acquire(&self, algorithm: DigestAlgorithm) -> Result<ExternalHandle, NativeError>;

    /// Feed `input` into the context.
    fn update(&self, handle: ExternalHandle, input: &[u8]) -> Result<(), NativeError>;

    /// Write the digest of everything fed so far into `output`, returning the
    /// number of bytes written. The handle stays valid until released.
    fn finalize(&self, handle: ExternalHandle, output: &mut [u8]) -> Result<usize, NativeError>;

    /// Create an independent context with identical internal state.
    ///
    /// Must not leave a partially copied context behind on failure.
    fn duplicate(&self, handle: ExternalHandle) -> Result<ExternalHandle, NativeError>;

    /// Destroy the context. Must not fail observably.
    fn release(&self, handle: ExternalHandle);
}
