//! Password-hash (KDF) utility: derives a fixed-length shadow suitable for
//! comparison but not reversal (`spec.md` §4.4).

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use pbkdf2::pbkdf2_hmac;
use scrypt::Params as ScryptParams;
use sha2::Sha512;

/// Selects which derivation chain [`AuthKdf::shadow`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfMethod {
    /// `PBKDF2-HMAC-SHA512(pw, salt, iters, dklen)`.
    Pbkdf2,
    /// `scrypt(pw, salt, N, r, p=1, dklen)`.
    Scrypt,
    /// `scrypt` producing an intermediate key, then PBKDF2-HMAC-SHA512 over
    /// that key with the same salt/iters/dklen.
    ScryptThenPbkdf2,
}

/// Reason a [`KdfParams`] construction was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum KdfParamsError {
    /// `salt` was shorter than 4 bytes.
    #[error("kdf salt must be at least 4 bytes")]
    SaltTooShort,
    /// `scrypt_n` was not a power of two, or was below 512.
    #[error("kdf scrypt_n must be a power of two >= 512")]
    InvalidScryptN,
    /// `scrypt_r` was zero or odd.
    #[error("kdf scrypt_r must be a positive even number")]
    InvalidScryptR,
    /// `pbkdf2_iters` was below 1000.
    #[error("kdf pbkdf2_iters must be >= 1000")]
    InvalidIterations,
    /// `dklen` was below 8 bytes.
    #[error("kdf dklen must be >= 8 bytes")]
    InvalidDklen,
}

/// Immutable, validated KDF parameters (`spec.md` §3 "KDF params").
///
/// Parallelism factor for scrypt is fixed at 1; PRF for pbkdf2 is fixed at
/// SHA-512, matching the spec exactly rather than exposing them as knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfParams {
    salt: Vec<u8>,
    scrypt_n: u32,
    scrypt_r: u32,
    pbkdf2_iters: u32,
    dklen: usize,
    method: KdfMethod,
}

impl KdfParams {
    /// Validate and construct KDF parameters.
    ///
    /// # Errors
    /// Returns [`KdfParamsError`] when any parameter fails the boundary
    /// checks in `spec.md` §4.4/§8: salt shorter than 4 bytes, `N < 512` or
    /// not a power of two, `r` zero or odd, `iters < 1000`, or
    /// `dklen < 8`.
    pub fn new(
        salt: Vec<u8>,
        scrypt_n: u32,
        scrypt_r: u32,
        pbkdf2_iters: u32,
        dklen: usize,
        method: KdfMethod,
    ) -> Result<Self, KdfParamsError> {
        if salt.len() < 4 {
            return Err(KdfParamsError::SaltTooShort);
        }
        if scrypt_n < 512 || !scrypt_n.is_power_of_two() {
            return Err(KdfParamsError::InvalidScryptN);
        }
        if scrypt_r == 0 || scrypt_r % 2 != 0 {
            return Err(KdfParamsError::InvalidScryptR);
        }
        if pbkdf2_iters < 1000 {
            return Err(KdfParamsError::InvalidIterations);
        }
        if dklen < 8 {
            return Err(KdfParamsError::InvalidDklen);
        }

        Ok(Self {
            salt,
            scrypt_n,
            scrypt_r,
            pbkdf2_iters,
            dklen,
            method,
        })
    }
}

/// Error surfaced by the underlying `scrypt` crate when parameters it
/// receives (already validated by [`KdfParams::new`]) are nonetheless
/// rejected by the library's own internal bounds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("scrypt derivation failed: {0}")]
pub struct ScryptFailure(String);

/// Compare two password shadows without short-circuiting on the first
/// differing byte, so a failed comparison takes the same time regardless of
/// where the mismatch falls.
///
/// Both shadows are fixed-length base64 output of the same `dklen`, so a
/// length mismatch alone (checked up front, not worth hiding) already means
/// "no match" before the constant-time pass runs.
#[must_use]
pub fn shadows_match(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Derives password shadows per `spec.md` §4.4.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthKdf {
    params: KdfParams,
}

impl AuthKdf {
    /// Build a KDF bound to the given parameters.
    #[must_use]
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    /// Derive the URL-safe, unpadded base64 password shadow.
    ///
    /// # Errors
    /// Returns [`ScryptFailure`] only if the scrypt library rejects the
    /// already-validated parameters (practically unreachable, but the
    /// underlying crate's API is fallible).
    pub fn shadow(&self, password: &str) -> Result<String, ScryptFailure> {
        let bytes = match self.params.method {
            KdfMethod::Pbkdf2 => self.pbkdf2(password.as_bytes()),
            KdfMethod::Scrypt => self.scrypt(password.as_bytes())?,
            KdfMethod::ScryptThenPbkdf2 => {
                let intermediate = self.scrypt(password.as_bytes())?;
                self.pbkdf2(&intermediate)
            }
        };
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    fn pbkdf2(&self, input: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; self.params.dklen];
        pbkdf2_hmac::<Sha512>(input, &self.params.salt, self.params.pbkdf2_iters, &mut out);
        out
    }

    fn scrypt(&self, input: &[u8]) -> Result<Vec<u8>, ScryptFailure> {
        let log_n = u8::try_from(self.params.scrypt_n.trailing_zeros())
            .map_err(|err| ScryptFailure(err.to_string()))?;
        let params = ScryptParams::new(log_n, self.params.scrypt_r, 1, self.params.dklen)
            .map_err(|err| ScryptFailure(err.to_string()))?;
        let mut out = vec![0u8; self.params.dklen];
        scrypt::scrypt(input, &self.params.salt, &params, &mut out)
            .map_err(|err| ScryptFailure(err.to_string()))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_salt() {
        let result = KdfParams::new(vec![1, 2, 3], 16384, 8, 1000, 18, KdfMethod::Scrypt);
        assert_eq!(result, Err(KdfParamsError::SaltTooShort));
    }

    #[test]
    fn rejects_non_power_of_two_n() {
        let result = KdfParams::new(vec![0; 8], 500, 8, 1000, 18, KdfMethod::Scrypt);
        assert_eq!(result, Err(KdfParamsError::InvalidScryptN));
    }

    #[test]
    fn rejects_small_dklen() {
        let result = KdfParams::new(vec![0; 8], 16384, 8, 1000, 4, KdfMethod::Scrypt);
        assert_eq!(result, Err(KdfParamsError::InvalidDklen));
    }

    #[test]
    fn rejects_small_iteration_count() {
        let result = KdfParams::new(vec![0; 8], 16384, 8, 999, 18, KdfMethod::Pbkdf2);
        assert_eq!(result, Err(KdfParamsError::InvalidIterations));
    }

    #[test]
    fn shadow_is_deterministic() {
        let params = KdfParams::new(
            b"fafd52b82186a75e0869bf33".to_vec(),
            16384,
            8,
            1000,
            18,
            KdfMethod::Scrypt,
        )
        .expect("valid params");
        let kdf = AuthKdf::new(params);

        let first = kdf.shadow("hello world").expect("shadow computes");
        let second = kdf.shadow("hello world").expect("shadow computes");
        assert_eq!(first, second);
    }

    #[test]
    fn scrypt_vector_matches_spec() {
        let params = KdfParams::new(
            b"fafd52b82186a75e0869bf33".to_vec(),
            16384,
            8,
            1000,
            18,
            KdfMethod::Scrypt,
        )
        .expect("valid params");
        let kdf = AuthKdf::new(params);

        assert_eq!(
            kdf.shadow("hello world").expect("shadow computes"),
            "VF7fvKPvTLQw08sQVTa8A_l8"
        );
        assert_eq!(
            kdf.shadow("password123").expect("shadow computes"),
            "LIeK2TpP5QaaTLYlnFUofd-v"
        );
        assert_eq!(
            kdf.shadow("greywolf").expect("shadow computes"),
            "vHN3r2UcDsr8NUPV2BEcmBoW"
        );
    }

    #[test]
    fn scrypt_then_pbkdf2_vector_matches_spec() {
        let params = KdfParams::new(
            b"16a90eed44842585e4900931".to_vec(),
            16384,
            8,
            40_000,
            18,
            KdfMethod::ScryptThenPbkdf2,
        )
        .expect("valid params");
        let kdf = AuthKdf::new(params);

        assert_eq!(
            kdf.shadow("hello world").expect("shadow computes"),
            "IxsSdMsvmkAqW94ncW4QVf62"
        );
        assert_eq!(
            kdf.shadow("password123").expect("shadow computes"),
            "TribxtmGykrTWUvgLQ_0hYdI"
        );
        assert_eq!(
            kdf.shadow("redwolf").expect("shadow computes"),
            "r_RrPHNLcLOXbuyIOyjXa-aD"
        );
    }

    #[test]
    fn shadows_match_accepts_equal_strings() {
        assert!(shadows_match("abc123", "abc123"));
    }

    #[test]
    fn shadows_match_rejects_different_strings() {
        assert!(!shadows_match("abc123", "abc124"));
    }

    #[test]
    fn shadows_match_rejects_different_lengths() {
        assert!(!shadows_match("abc", "abcd"));
    }

    #[test]
    fn pbkdf2_only_vector_matches_spec() {
        let params = KdfParams::new(
            b"fafd52b82186a75e0869bf33".to_vec(),
            16384,
            8,
            1_000_000,
            18,
            KdfMethod::Pbkdf2,
        )
        .expect("valid params");
        let kdf = AuthKdf::new(params);

        assert_eq!(
            kdf.shadow("hello world").expect("shadow computes"),
            "slHCzxdH86DUntgOCkDilSEj"
        );
    }
}
