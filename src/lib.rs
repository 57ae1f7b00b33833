pub mod config;
pub mod crypto;
pub mod error;
pub mod gc;

// Core API
pub use config::CleanupConfig;
pub use crypto::{DigestAlgorithm, DigestOwner, NativeDigestEngine, RingEngine};
pub use error::{ConfigError, DigestError, NativeError, NativeErrorCode, NativeOperation, Result};
pub use gc::{ContextTracker, ExternalHandle, TrackerStats};
