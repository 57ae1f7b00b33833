use std::str::FromStr;

/// Resource kind tag for a digest context: algorithm name and fixed output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DigestAlgorithm {
    name: &'static str,
    output_len: usize,
}

impl DigestAlgorithm {
    pub const MD5: Self = Self::custom("MD5", 16);
    pub const SHA1: Self = Self::custom("SHA-1", 20);
    pub const SHA256: Self = Self::custom("SHA-256", 32);
    pub const SHA384: Self = Self::custom("SHA-384", 48);
    pub const SHA512: Self = Self::custom("SHA-512", 64);

    /// Algorithms understood by [`RingEngine`](crate::RingEngine).
    pub const SUPPORTED: [Self; 5] = [
        Self::MD5,
        Self::SHA1,
        Self::SHA256,
        Self::SHA384,
        Self::SHA512,
    ];

    /// Describe an algorithm provided by some other engine.
    pub const fn custom(name: &'static str, output_len: usize) -> Self {
        Self { name, output_len }
    }

    /// Canonical upper-case name, e.g. `SHA-256`.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Digest size in bytes.
    #[inline]
    pub fn output_len(&self) -> usize {
        self.output_len
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

impl FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MD5" => Ok(Self::MD5),
            "SHA-1" => Ok(Self::SHA1),
            "SHA-256" => Ok(Self::SHA256),
            "SHA-384" => Ok(Self::SHA384),
            "SHA-512" => Ok(Self::SHA512),
            _ => Err(format!("Unsupported algorithm: {}", s)),
        }
    }
}
