//! SHA-256 source tokens for inline content.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::collections::HashSet;

/// Compute the SHA-256 hash of content and format it as a CSP source token.
pub fn compute_hash(content: &str) -> String {
    let hash = openssl::sha::sha256(content.as_bytes());
    format!("'sha256-{}'", STANDARD.encode(hash))
}

/// Hash every non-empty value, keeping the first occurrence of each token.
pub fn hash_values<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut hashes = Vec::new();

    for value in values {
        let value = value.as_ref();
        if value.is_empty() {
            continue;
        }
        let hash = compute_hash(value);
        if seen.insert(hash.clone()) {
            hashes.push(hash);
        }
    }

    hashes
}
