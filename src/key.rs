//! Key sanitizing
//!
//! Logical keys are strings; stored keys are bytes. The empty key is
//! stored as a two-byte null sentinel, so a real key made only of null
//! bytes is pushed one byte longer whenever it could collide with it.
//!
//! ```text
//!   logical          stored
//!   ""          ->   "\0\0"
//!   "\0"        ->   "\0"
//!   "\0\0"      ->   "\0\0\0"
//!   "\0" * n    ->   "\0" * (n + 1)     (n >= 2)
//!   other       ->   other
//! ```

/// Reserved stored form of the empty key
pub const NULL_KEY: &[u8] = b"\0\0";

/// Map a logical key to the bytes actually stored.
pub fn sanitize(key: &str) -> Vec<u8> {
    let bytes = key.as_bytes();

    if bytes.is_empty() {
        return NULL_KEY.to_vec();
    }

    if bytes.len() >= 2 && all_null(bytes) {
        let mut stored = Vec::with_capacity(bytes.len() + 1);
        stored.extend_from_slice(bytes);
        stored.push(0);
        return stored;
    }

    bytes.to_vec()
}

/// Inverse of [`sanitize`] for keys read back from a bucket.
pub fn restore(stored: &[u8]) -> &[u8] {
    if stored == NULL_KEY {
        return &[];
    }

    if stored.len() >= 3 && all_null(stored) {
        return &stored[..stored.len() - 1];
    }

    stored
}

fn all_null(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == 0)
}

/// Logical key for a stored leaf key, as handed to iteration callbacks
pub fn logical(stored: &[u8]) -> String {
    String::from_utf8_lossy(restore(stored)).into_owned()
}
