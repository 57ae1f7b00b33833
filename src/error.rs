//! Error types for native digest contexts.

use thiserror::Error;

/// Failure codes reported by a native digest engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeErrorCode {
    /// Input parameter was empty or invalid (includes unknown handles).
    InvalidParam,
    /// The engine could not allocate working memory.
    Allocation,
    /// Output buffer cannot hold the digest.
    BufferTooShort,
    /// Creating a fresh context failed.
    ContextCreate,
    /// The engine does not know the requested algorithm.
    UnknownAlgorithm,
    /// Initializing the context for the algorithm failed.
    DigestInit,
    /// Feeding input into the context failed.
    DigestUpdate,
    /// Producing the final digest failed.
    DigestFinal,
    /// Copying a context into a new one failed.
    ContextCopy,
}

impl NativeErrorCode {
    /// Fixed human-readable description of the code.
    pub fn message(self) -> &'static str {
        match self {
            NativeErrorCode::InvalidParam => "input parameter is empty or invalid",
            NativeErrorCode::Allocation => "allocation failed",
            NativeErrorCode::BufferTooShort => "buffer too short to store digest",
            NativeErrorCode::ContextCreate => "context creation failed",
            NativeErrorCode::UnknownAlgorithm => "unknown digest algorithm",
            NativeErrorCode::DigestInit => "digest init failed",
            NativeErrorCode::DigestUpdate => "digest update failed",
            NativeErrorCode::DigestFinal => "digest final failed",
            NativeErrorCode::ContextCopy => "context copy failed",
        }
    }
}

impl std::fmt::Display for NativeErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Error reported by a [`NativeDigestEngine`](crate::NativeDigestEngine) call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}{}", format_detail(.detail))]
pub struct NativeError {
    pub code: NativeErrorCode,
    pub detail: Option<String>,
}

fn format_detail(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

impl NativeError {
    /// Error carrying only a code.
    pub fn new(code: NativeErrorCode) -> Self {
        Self { code, detail: None }
    }

    /// Error with extra context appended to the code's message.
    pub fn with_detail(code: NativeErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: Some(detail.into()),
        }
    }
}

impl From<NativeErrorCode> for NativeError {
    fn from(code: NativeErrorCode) -> Self {
        Self::new(code)
    }
}

/// Foreign operation names used when wrapping [`NativeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeOperation {
    Acquire,
    Update,
    Finalize,
    Duplicate,
}

impl std::fmt::Display for NativeOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NativeOperation::Acquire => "acquire",
            NativeOperation::Update => "update",
            NativeOperation::Finalize => "finalize",
            NativeOperation::Duplicate => "duplicate",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by [`DigestOwner`](crate::DigestOwner) operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    /// `offset`/`len` do not describe a slice of the buffer.
    #[error("range out of bounds: offset {offset} + len {len} exceeds buffer of {buffer_len} bytes")]
    Range {
        offset: usize,
        len: usize,
        buffer_len: usize,
    },

    /// Output slice is shorter than the fixed digest length.
    #[error("length must be at least {required} for {algorithm} digests, got {actual}")]
    OutputTooSmall {
        required: usize,
        actual: usize,
        algorithm: &'static str,
    },

    /// A native engine call failed. The owner has been reset where applicable.
    #[error("native {operation} failed for {algorithm} digests: {source}")]
    External {
        operation: NativeOperation,
        algorithm: &'static str,
        #[source]
        source: NativeError,
    },
}

/// Invalid cleanup configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: expected a non-negative integer")]
    InvalidDrainCap { var: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, DigestError>;
