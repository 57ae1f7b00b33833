//! Native digest engine backed by `ring`, with MD5 from `md-5`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use md5::{Digest, Md5};
use ring::digest;

use super::{DigestAlgorithm, NativeDigestEngine};
use crate::error::{NativeError, NativeErrorCode};
use crate::gc::ExternalHandle;

/// Native state behind one handle.
#[derive(Clone)]
enum NativeContext {
    Ring(digest::Context),
    /// ring has no MD5
    Md5(Md5),
}

impl NativeContext {
    fn update(&mut self, input: &[u8]) {
        match self {
            NativeContext::Ring(context) => context.update(input),
            NativeContext::Md5(hasher) => Digest::update(hasher, input),
        }
    }

    /// Digest of everything fed so far, leaving `self` usable.
    fn digest(&self) -> Vec<u8> {
        match self {
            NativeContext::Ring(context) => context.clone().finish().as_ref().to_vec(),
            NativeContext::Md5(hasher) => hasher.clone().finalize().to_vec(),
        }
    }
}

/// Handle table of digest contexts: `ring::digest::Context` for the SHA
/// family, `md5::Md5` for MD5.
///
/// Handles come from a monotonically increasing counter starting at 1, so a
/// value is never reused for the lifetime of the engine.
pub struct RingEngine {
    contexts: Mutex<HashMap<u64, NativeContext>>,
    next_id: AtomicU64,
}

impl Default for RingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RingEngine {
    /// Create an engine with an empty handle table.
    pub fn new() -> Self {
        Self {
            contexts: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of contexts currently allocated.
    pub fn live(&self) -> usize {
        self.contexts.lock().expect("ring engine poisoned").len()
    }

    fn new_context(algorithm: DigestAlgorithm) -> Result<NativeContext, NativeError> {
        if algorithm.name() == "MD5" {
            if algorithm.output_len() != DigestAlgorithm::MD5.output_len() {
                return Err(Self::length_mismatch(
                    algorithm,
                    DigestAlgorithm::MD5.output_len(),
                ));
            }
            return Ok(NativeContext::Md5(Md5::new()));
        }

        let ring_algorithm = match algorithm.name() {
            "SHA-1" => &digest::SHA1_FOR_LEGACY_USE_ONLY,
            "SHA-256" => &digest::SHA256,
            "SHA-384" => &digest::SHA384,
            "SHA-512" => &digest::SHA512,
            other => {
                return Err(NativeError::with_detail(
                    NativeErrorCode::UnknownAlgorithm,
                    other,
                ));
            }
        };

        if ring_algorithm.output_len() != algorithm.output_len() {
            return Err(Self::length_mismatch(algorithm, ring_algorithm.output_len()));
        }

        Ok(NativeContext::Ring(digest::Context::new(ring_algorithm)))
    }

    fn length_mismatch(algorithm: DigestAlgorithm, actual: usize) -> NativeError {
        NativeError::with_detail(
            NativeErrorCode::DigestInit,
            format!(
                "{} produces {} bytes, not {}",
                algorithm.name(),
                actual,
                algorithm.output_len()
            ),
        )
    }

    fn insert(&self, context: NativeContext) -> Result<ExternalHandle, NativeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = ExternalHandle::new(id)
            .ok_or_else(|| NativeError::new(NativeErrorCode::ContextCreate))?;

        self.contexts
            .lock()
            .expect("ring engine poisoned")
            .insert(id, context);

        Ok(handle)
    }

    fn unknown(handle: ExternalHandle) -> NativeError {
        NativeError::with_detail(
            NativeErrorCode::InvalidParam,
            format!("unknown handle {}", handle),
        )
    }
}

impl NativeDigestEngine for RingEngine {
    fn acquire(&self, algorithm: DigestAlgorithm) -> Result<ExternalHandle, NativeError> {
        self.insert(Self::new_context(algorithm)?)
    }

    fn update(&self, handle: ExternalHandle, input: &[u8]) -> Result<(), NativeError> {
        let mut contexts = self.contexts.lock().expect("ring engine poisoned");
        let context = contexts
            .get_mut(&handle.get())
            .ok_or_else(|| Self::unknown(handle))?;

        context.update(input);
        Ok(())
    }

    fn finalize(&self, handle: ExternalHandle, output: &mut [u8]) -> Result<usize, NativeError> {
        // Finish a copy so the slot stays valid until release
        let context = self
            .contexts
            .lock()
            .expect("ring engine poisoned")
            .get(&handle.get())
            .cloned()
            .ok_or_else(|| Self::unknown(handle))?;

        let bytes = context.digest();

        let Some(target) = output.get_mut(..bytes.len()) else {
            return Err(NativeError::new(NativeErrorCode::BufferTooShort));
        };
        target.copy_from_slice(&bytes);

        Ok(bytes.len())
    }

    fn duplicate(&self, handle: ExternalHandle) -> Result<ExternalHandle, NativeError> {
        let copy = self
            .contexts
            .lock()
            .expect("ring engine poisoned")
            .get(&handle.get())
            .cloned()
            .ok_or_else(|| {
                NativeError::with_detail(
                    NativeErrorCode::ContextCopy,
                    format!("unknown handle {}", handle),
                )
            })?;

        self.insert(copy)
    }

    fn release(&self, handle: ExternalHandle) {
        let removed = self
            .contexts
            .lock()
            .expect("ring engine poisoned")
            .remove(&handle.get());

        if removed.is_none() {
            tracing::warn!("Release of unknown native handle {}", handle);
        }
    }
}

impl std::fmt::Debug for RingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingEngine")
            .field("live", &self.live())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    #[test]
    fn test_sha256_hello_world() {
        let engine = RingEngine::new();
        let handle = engine.acquire(DigestAlgorithm::SHA256).unwrap();
        engine.update(handle, b"hello world").unwrap();

        let mut out = [0u8; 32];
        assert_eq!(engine.finalize(handle, &mut out).unwrap(), 32);
        assert_eq!(
            hex(&out),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );

        engine.release(handle);
        assert_eq!(engine.live(), 0);
    }

    #[test]
    fn test_handles_are_not_reused() {
        let engine = RingEngine::new();
        let first = engine.acquire(DigestAlgorithm::SHA1).unwrap();
        engine.release(first);
        let second = engine.acquire(DigestAlgorithm::SHA1).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_duplicate_is_independent() {
        let engine = RingEngine::new();
        let original = engine.acquire(DigestAlgorithm::SHA256).unwrap();
        engine.update(original, b"abc").unwrap();

        let copy = engine.duplicate(original).unwrap();
        engine.update(copy, b"def").unwrap();

        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        engine.finalize(original, &mut a).unwrap();
        engine.finalize(copy, &mut b).unwrap();
        assert_ne!(a, b);
        assert_eq!(engine.live(), 2);
    }

    #[test]
    fn test_unknown_algorithm_and_length_mismatch() {
        let engine = RingEngine::new();

        let err = engine.acquire(DigestAlgorithm::custom("MD4", 16)).unwrap_err();
        assert_eq!(err.code, NativeErrorCode::UnknownAlgorithm);
        assert_eq!(err.detail.as_deref(), Some("MD4"));

        let err = engine.acquire(DigestAlgorithm::custom("MD5", 20)).unwrap_err();
        assert_eq!(err.code, NativeErrorCode::DigestInit);

        let err = engine.acquire(DigestAlgorithm::custom("SHA-256", 16)).unwrap_err();
        assert_eq!(err.code, NativeErrorCode::DigestInit);
        assert_eq!(engine.live(), 0);
    }

    #[test]
    fn test_md5_abc_then_copy() {
        let engine = RingEngine::new();
        let handle = engine.acquire(DigestAlgorithm::MD5).unwrap();
        engine.update(handle, b"abc").unwrap();

        let copy = engine.duplicate(handle).unwrap();

        let mut out = [0u8; 16];
        assert_eq!(engine.finalize(handle, &mut out).unwrap(), 16);
        assert_eq!(hex(&out), "900150983cd24fb0d6963f7d28e17f72");

        // Finalize leaves the context intact
        let mut again = [0u8; 16];
        engine.finalize(handle, &mut again).unwrap();
        assert_eq!(out, again);

        engine.update(copy, b"d").unwrap();
        engine.finalize(copy, &mut out).unwrap();
        assert_eq!(hex(&out), "e2fc714c4727ee9395f324cd2e7f331f");

        engine.release(handle);
        engine.release(copy);
        assert_eq!(engine.live(), 0);
    }

    #[test]
    fn test_finalize_short_buffer() {
        let engine = RingEngine::new();
        let handle = engine.acquire(DigestAlgorithm::SHA512).unwrap();
        let mut out = [0u8; 32];
        let err = engine.finalize(handle, &mut out).unwrap_err();
        assert_eq!(err.code, NativeErrorCode::BufferTooShort);
    }
}
