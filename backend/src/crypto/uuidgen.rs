//! URL-safe base64 identifier generator (`spec.md` §4.5).
//!
//! Three entropy-mixing schemes trade construction cost for unlinkability:
//! `v1` is a raw CSPRNG draw, `v2` folds in wallclock time, `v3` additionally
//! mixes a per-instance monotonic counter through sixteen extra CSPRNG draws.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use sha3::{Digest, Sha3_512};

/// Entropy-mixing scheme used by [`UuidGen::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UuidVersion {
    /// Raw CSPRNG bytes, no mixing.
    V1,
    /// `SHA3-512(wallclock_seconds_ascii || 256 CSPRNG bytes)`.
    V2,
    /// `SHA3-512` over CSPRNG draws, wallclock, a monotonic counter, and more
    /// CSPRNG draws interleaved with the counter.
    V3,
}

/// Reason a [`UuidParams`] construction was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UuidParamsError {
    /// `num_bytes` was outside `[12, 63]`.
    #[error("uuid num_bytes must be in [12, 63]")]
    InvalidNumBytes,
}

/// Validated UUID generation parameters (`spec.md` §3 "UUID params").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UuidParams {
    version: UuidVersion,
    num_bytes: usize,
}

impl UuidParams {
    /// Construct parameters, rejecting `num_bytes` outside `[12, 63]`.
    ///
    /// # Errors
    /// Returns [`UuidParamsError::InvalidNumBytes`] when `num_bytes` falls
    /// outside `[12, 63]`.
    pub fn new(version: UuidVersion, num_bytes: usize) -> Result<Self, UuidParamsError> {
        if !(12..64).contains(&num_bytes) {
            return Err(UuidParamsError::InvalidNumBytes);
        }
        Ok(Self { version, num_bytes })
    }

    /// Default parameters: `v1`, 18 bytes (no base64 padding).
    #[must_use]
    pub const fn default_params() -> Self {
        Self {
            version: UuidVersion::V1,
            num_bytes: 18,
        }
    }
}

fn wallclock_seconds_ascii() -> String {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    elapsed.to_string()
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Generates identifiers per `spec.md` §4.5.
///
/// `v3`'s counter is per-instance rather than global: two generators never
/// share a counter, so uniqueness only needs to hold within one generator's
/// lifetime, matching how the dispatch/worker/middleware each own theirs.
#[derive(Debug)]
pub struct UuidGen {
    params: UuidParams,
    counter: AtomicU64,
}

impl UuidGen {
    /// Build a generator bound to the given parameters.
    #[must_use]
    pub fn new(params: UuidParams) -> Self {
        Self {
            params,
            counter: AtomicU64::new(0),
        }
    }

    /// Produce the next identifier as URL-safe, unpadded base64.
    #[must_use]
    pub fn next(&self) -> String {
        let bytes = match self.params.version {
            UuidVersion::V1 => self.next_v1(),
            UuidVersion::V2 => self.next_v2(),
            UuidVersion::V3 => self.next_v3(),
        };
        URL_SAFE_NO_PAD.encode(bytes)
    }

    fn truncate(digest: &[u8], num_bytes: usize) -> Vec<u8> {
        digest.iter().take(num_bytes).copied().collect()
    }

    fn next_v1(&self) -> Vec<u8> {
        random_bytes(self.params.num_bytes)
    }

    fn next_v2(&self) -> Vec<u8> {
        let mut hasher = Sha3_512::new();
        hasher.update(wallclock_seconds_ascii().as_bytes());
        hasher.update(random_bytes(256));
        Self::truncate(&hasher.finalize(), self.params.num_bytes)
    }

    fn next_v3(&self) -> Vec<u8> {
        let mut hasher = Sha3_512::new();
        hasher.update(random_bytes(32));
        hasher.update(wallclock_seconds_ascii().as_bytes());
        for _ in 0..16 {
            self.counter.fetch_add(1, Ordering::Relaxed);
            hasher.update(random_bytes(16));
        }
        hasher.update(self.counter.load(Ordering::Relaxed).to_string().as_bytes());
        Self::truncate(&hasher.finalize(), self.params.num_bytes)
    }
}
