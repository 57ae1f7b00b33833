#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use openworkers_native_digest::{
    CleanupConfig, ContextTracker, DigestAlgorithm, ExternalHandle, NativeDigestEngine,
    NativeError, NativeErrorCode, RingEngine,
};

/// 16-byte test algorithm: SHA-256 with both halves XOR-folded together.
pub const FOLD128: DigestAlgorithm = DigestAlgorithm::custom("FOLD-128", 16);

/// Reference implementation of [`FOLD128`] for expected values.
pub fn fold128(input: &[u8]) -> [u8; 16] {
    let digest = ring::digest::digest(&ring::digest::SHA256, input);
    let bytes = digest.as_ref();
    let mut out = [0u8; 16];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = bytes[i] ^ bytes[i + 16];
    }
    out
}

/// Engine wrapper that counts every foreign call and can inject failures.
pub struct CountingEngine {
    inner: RingEngine,
    pub acquires: AtomicUsize,
    pub updates: AtomicUsize,
    pub finalizes: AtomicUsize,
    pub duplicates: AtomicUsize,
    pub releases: AtomicUsize,
    released: Mutex<HashMap<u64, usize>>,
    /// Handles whose output is folded to 16 bytes.
    folded: Mutex<HashSet<u64>>,
    pub fail_acquire: AtomicBool,
    pub fail_update: AtomicBool,
    pub fail_finalize: AtomicBool,
    pub fail_duplicate: AtomicBool,
}

impl CountingEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: RingEngine::new(),
            acquires: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            finalizes: AtomicUsize::new(0),
            duplicates: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            released: Mutex::new(HashMap::new()),
            folded: Mutex::new(HashSet::new()),
            fail_acquire: AtomicBool::new(false),
            fail_update: AtomicBool::new(false),
            fail_finalize: AtomicBool::new(false),
            fail_duplicate: AtomicBool::new(false),
        })
    }

    /// Contexts acquired or duplicated that were not released yet.
    pub fn live(&self) -> usize {
        self.inner.live()
    }

    /// How many times `handle` was released.
    pub fn release_count(&self, handle: ExternalHandle) -> usize {
        self.released
            .lock()
            .unwrap()
            .get(&handle.get())
            .copied()
            .unwrap_or(0)
    }

    /// Largest release count over all handles.
    pub fn max_release_count(&self) -> usize {
        self.released
            .lock()
            .unwrap()
            .values()
            .copied()
            .max()
            .unwrap_or(0)
    }

    fn is_folded(&self, handle: ExternalHandle) -> bool {
        self.folded.lock().unwrap().contains(&handle.get())
    }

    fn inner_algorithm(algorithm: DigestAlgorithm) -> DigestAlgorithm {
        if algorithm == FOLD128 {
            DigestAlgorithm::SHA256
        } else {
            algorithm
        }
    }
}

impl NativeDigestEngine for CountingEngine {
    fn acquire(&self, algorithm: DigestAlgorithm) -> Result<ExternalHandle, NativeError> {
        if self.fail_acquire.load(Ordering::SeqCst) {
            return Err(NativeErrorCode::ContextCreate.into());
        }
        let handle = self.inner.acquire(Self::inner_algorithm(algorithm))?;
        if algorithm == FOLD128 {
            self.folded.lock().unwrap().insert(handle.get());
        }
        self.acquires.fetch_add(1, Ordering::SeqCst);
        Ok(handle)
    }

    fn update(&self, handle: ExternalHandle, input: &[u8]) -> Result<(), NativeError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(NativeErrorCode::DigestUpdate.into());
        }
        self.inner.update(handle, input)
    }

    fn finalize(&self, handle: ExternalHandle, output: &mut [u8]) -> Result<usize, NativeError> {
        self.finalizes.fetch_add(1, Ordering::SeqCst);
        if self.fail_finalize.load(Ordering::SeqCst) {
            return Err(NativeErrorCode::DigestFinal.into());
        }

        if self.is_folded(handle) {
            let mut full = [0u8; 32];
            self.inner.finalize(handle, &mut full)?;
            for (i, byte) in output.iter_mut().enumerate() {
                *byte = full[i] ^ full[i + 16];
            }
            return Ok(output.len());
        }

        self.inner.finalize(handle, output)
    }

    fn duplicate(&self, handle: ExternalHandle) -> Result<ExternalHandle, NativeError> {
        if self.fail_duplicate.load(Ordering::SeqCst) {
            return Err(NativeErrorCode::ContextCopy.into());
        }
        let copy = self.inner.duplicate(handle)?;
        if self.is_folded(handle) {
            self.folded.lock().unwrap().insert(copy.get());
        }
        self.duplicates.fetch_add(1, Ordering::SeqCst);
        Ok(copy)
    }

    fn release(&self, handle: ExternalHandle) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        *self
            .released
            .lock()
            .unwrap()
            .entry(handle.get())
            .or_insert(0) += 1;
        self.inner.release(handle);
    }
}

pub fn tracker(engine: &Arc<CountingEngine>, drain_cap: usize) -> Arc<ContextTracker> {
    ContextTracker::new(
        Arc::clone(engine) as Arc<dyn NativeDigestEngine>,
        CleanupConfig::default().with_drain_cap(drain_cap),
    )
}
