//! Identifier and digest helpers
//!
//! Record ids, user ids and session tokens are xxHash3 digests of the fields
//! that identify them plus the current time, rendered as 16 hex digits.
//! Passwords are stored as SHA-256 digests salted with the account email.

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;
use xxhash_rust::xxh3::xxh3_64;

/// Disambiguates ids generated within the same clock tick
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate a fresh identifier from the given seed parts
pub fn new_id(seed: &[&str]) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);

    let mut data = Vec::with_capacity(64);
    for part in seed {
        data.extend_from_slice(part.as_bytes());
        data.push(0);
    }
    data.extend_from_slice(&nanos.to_le_bytes());
    data.extend_from_slice(&sequence.to_le_bytes());

    let id = format!("{:016x}", xxh3_64(&data));
    trace!(%id, "Generated identifier");
    id
}

/// Hex SHA-256 digest of a password salted with the lower-cased email.
///
/// One fast unkeyed hash only keeps plain-text passwords out of the local
/// session file. It is not a credential store for shared or networked use;
/// that needs a slow password hash with a random per-account salt.
pub fn password_digest(email: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.trim().to_lowercase().as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
