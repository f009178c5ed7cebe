//! Utility functions and helpers.

pub mod http;
pub mod text;

use sha2::{Digest, Sha256};

/// Prefix shared by every key this crate writes to a store.
pub const KEY_PREFIX: &str = "urwc_";

/// Deterministic cache key for an operation and everything that shapes
/// its visible output.
///
/// Parts are length-prefixed so `("ab", "c")` and `("a", "bc")` differ.
pub fn fingerprint(operation: &str, parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(operation.as_bytes());
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    let digest = hex::encode(hasher.finalize());
    format!("{KEY_PREFIX}{operation}_{}", &digest[..32])
}

/// Short stable id for a map registration.
pub fn short_id(input: &str) -> String {
    let digest = hex::encode(Sha256::digest(input.as_bytes()));
    digest[..10].to_string()
}
