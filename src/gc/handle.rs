//! Opaque identifier for a native resource.

use std::num::NonZeroU64;

/// Opaque handle to a native digest context.
///
/// Zero is never a valid live handle. Engines must not hand out the same
/// value twice while it is live. Equality is identity of the native resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExternalHandle(NonZeroU64);

impl ExternalHandle {
    /// Wrap a raw handle value. Returns `None` for zero.
    #[inline]
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Raw handle value as the engine knows it.
    #[inline]
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for ExternalHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
