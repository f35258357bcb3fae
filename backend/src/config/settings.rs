//! Typed settings assembled from a [`ConfigRegistry`] snapshot
//! (`spec.md` §6 "Config keys consumed by the core").

use std::path::PathBuf;
use std::time::Duration;

use crate::crypto::{KdfMethod, KdfParams, UuidParams, UuidVersion};
use crate::worker::WorkerConfig;

use super::registry::ConfigRegistry;

/// `DBL_DISPATCH_IDLE_COUNTER_THRESHOLD` is documented as "fatal-exit on
/// invalid"; this error lets `main` choose how to exit rather than baking a
/// `process::exit` call into config parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("config key {key} has an invalid value: {reason}")]
pub struct ConfigError {
    key: &'static str,
    reason: String,
}

impl ConfigError {
    fn new(key: &'static str, reason: impl Into<String>) -> Self {
        Self {
            key,
            reason: reason.into(),
        }
    }

    /// Build a [`ConfigError`] for an unrecognized `DBL_DAO_BACKEND` value.
    ///
    /// `DBL_DAO_BACKEND` selects which [`crate::dao::DaoFactory`] `main`
    /// builds; it is not one of `spec.md` §6's listed keys since DAO
    /// selection sits at the boundary the core treats as pluggable.
    #[must_use]
    pub fn unknown_dao_backend(value: &str) -> Self {
        Self::new("DBL_DAO_BACKEND", format!("unknown dao backend {value:?}"))
    }
}

/// Build [`WorkerConfig`] from `DBL_WORKER_THREAD_SLEEP_WAIT_TIMEOUT` and
/// `DBL_DISPATCH_IDLE_COUNTER_THRESHOLD`, falling back to `spec.md` §4.2's
/// documented defaults (threshold 10, sleep 10ms) when absent.
///
/// # Errors
/// Returns [`ConfigError`] if `DBL_DISPATCH_IDLE_COUNTER_THRESHOLD` is
/// present but not a positive integer, or if the sleep timeout is present
/// but not a non-negative float.
pub fn worker_config(registry: &ConfigRegistry) -> Result<WorkerConfig, ConfigError> {
    let defaults = WorkerConfig::defaults();

    let idle_threshold = match registry.get_str("DBL_DISPATCH_IDLE_COUNTER_THRESHOLD") {
        None => defaults.idle_threshold,
        Some(raw) => raw.parse::<u32>().map_err(|_| {
            ConfigError::new(
                "DBL_DISPATCH_IDLE_COUNTER_THRESHOLD",
                format!("{raw:?} is not a positive integer"),
            )
        })?,
    };

    let idle_sleep = match registry.get_f64("DBL_WORKER_THREAD_SLEEP_WAIT_TIMEOUT") {
        None => defaults.idle_sleep,
        Some(seconds) if seconds >= 0.0 => Duration::from_secs_f64(seconds),
        Some(seconds) => {
            return Err(ConfigError::new(
                "DBL_WORKER_THREAD_SLEEP_WAIT_TIMEOUT",
                format!("{seconds} must not be negative"),
            ));
        }
    };

    Ok(WorkerConfig {
        idle_threshold,
        idle_sleep,
    })
}

/// Build [`UuidParams`] from `CU__UUID_VERSION`/`CU__UUID_NUM_BYTES`,
/// defaulting to `v1`/18 bytes (`spec.md` §3 "UUID params").
///
/// # Errors
/// Returns [`ConfigError`] for an unknown version string or a `num_bytes`
/// outside `[12, 63]`.
pub fn uuid_params(registry: &ConfigRegistry) -> Result<UuidParams, ConfigError> {
    let version = match registry.get_str("CU__UUID_VERSION") {
        None => UuidVersion::V1,
        Some("v1") => UuidVersion::V1,
        Some("v2") => UuidVersion::V2,
        Some("v3") => UuidVersion::V3,
        Some(other) => {
            return Err(ConfigError::new("CU__UUID_VERSION", format!("unknown version {other:?}")));
        }
    };

    let num_bytes = match registry.get_u32("CU__UUID_NUM_BYTES") {
        None => 18,
        Some(value) => usize::try_from(value)
            .map_err(|_| ConfigError::new("CU__UUID_NUM_BYTES", "value out of range"))?,
    };

    UuidParams::new(version, num_bytes)
        .map_err(|err| ConfigError::new("CU__UUID_NUM_BYTES", err.to_string()))
}

/// Build [`KdfParams`] from the `CU_AUTH_KDF__*` keys (`spec.md` §6).
///
/// The salt is taken as the literal UTF-8 bytes of the config value, not
/// hex-decoded — `spec.md` §8's worked vectors only reproduce against the
/// raw ASCII salt string.
///
/// # Errors
/// Returns [`ConfigError`] if the salt is missing, the method is
/// unrecognized, or the resulting parameters fail [`KdfParams::new`]'s
/// validation.
pub fn kdf_params(registry: &ConfigRegistry) -> Result<KdfParams, ConfigError> {
    let salt = registry
        .get_str("CU_AUTH_KDF__SALT")
        .map(str::as_bytes)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| ConfigError::new("CU_AUTH_KDF__SALT", "missing"))?;

    let method = match registry.get_str("CU_AUTH_KDF__METHOD") {
        None | Some("scrypt") => KdfMethod::Scrypt,
        Some("pbkdf2") => KdfMethod::Pbkdf2,
        Some("scrypt_then_pbkdf2") => KdfMethod::ScryptThenPbkdf2,
        Some(other) => {
            return Err(ConfigError::new("CU_AUTH_KDF__METHOD", format!("unknown method {other:?}")));
        }
    };

    let scrypt_n = registry.get_u32("CU_AUTH_KDF__SCRYPT_N").unwrap_or(16384);
    let scrypt_r = registry.get_u32("CU_AUTH_KDF__SCRYPT_R").unwrap_or(8);
    let pbkdf2_iters = registry
        .get_u32("CU_AUTH_KDF__PBKDF2_HMAC_ITERATIONS")
        .unwrap_or(1000);
    let dklen = registry
        .get_u32("CU_AUTH_KDF__DKLEN")
        .map_or(18, |value| usize::try_from(value).unwrap_or(18));

    KdfParams::new(salt, scrypt_n, scrypt_r, pbkdf2_iters, dklen, method)
        .map_err(|err| ConfigError::new("CU_AUTH_KDF__*", err.to_string()))
}

/// Settings for the disk-backed reference DAO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteSettings {
    /// Path to the embedded-SQL file.
    pub db_path: PathBuf,
    /// Delay before re-opening a connection after one closes or fails.
    pub reconnect_delay: Duration,
    /// Remove any existing file at `db_path` before the first connection.
    pub clean_start: bool,
}

/// Build [`SqliteSettings`] from `DAO_SQLITE_RECONNECT_DELAY` plus a
/// caller-supplied default path (the path itself is not one of `spec.md`
/// §6's listed config keys; it is passed in by `main` from the CLI/deploy
/// environment).
#[must_use]
pub fn sqlite_settings(registry: &ConfigRegistry, db_path: PathBuf, clean_start: bool) -> SqliteSettings {
    let reconnect_delay = registry
        .get_f64("DAO_SQLITE_RECONNECT_DELAY")
        .filter(|seconds| *seconds >= 0.0)
        .map_or_else(|| Duration::from_secs(0), Duration::from_secs_f64);

    SqliteSettings {
        db_path,
        reconnect_delay,
        clean_start,
    }
}
