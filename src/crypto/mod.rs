//! Digest owners and the native engine boundary.

mod algorithm;
mod digest;
mod engine;
mod ring_engine;

pub use algorithm::DigestAlgorithm;
pub use digest::DigestOwner;
pub use engine::NativeDigestEngine;
pub use ring_engine::RingEngine;
