//! Version tokens for optimistic concurrency.
//!
//! The token is a content digest rather than an mtime: two auto-saves inside
//! one timestamp tick must still produce different tokens.

use xxhash_rust::xxh3::xxh3_64;

/// Stable version for a byte slice using xxh3_64; fixed-width lowercase hex.
pub fn version_for_bytes(bytes: &[u8]) -> String {
    let h = xxh3_64(bytes);
    format!("{h:016x}")
}

/// Compare a client token against the current one. Surrounding quotes (as in
/// an HTTP ETag) and ASCII case are ignored.
pub fn versions_match(expected: &str, current: &str) -> bool {
    let e = expected.trim().trim_matches('"');
    e.eq_ignore_ascii_case(current)
}
