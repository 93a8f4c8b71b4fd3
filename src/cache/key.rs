//! Deterministic cache fingerprints.
//!
//! The key is the SHA-256 of a canonical JSON document `{path, payload}`.
//! serde_json serializes map keys in sorted order, so equal requests always
//! produce identical bytes regardless of construction order.

use serde_json::json;
use sha2::{Digest, Sha256};

use crate::providers::types::ChatCompletionRequest;

/// Fingerprint a request for cache lookup. Any semantic difference in the
/// payload (messages, temperature, max_tokens, metadata) changes the key.
pub fn fingerprint(path: &str, request: &ChatCompletionRequest) -> String {
    let document = json!({
        "path": path,
        "payload": request,
    });
    let canonical = document.to_string();
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{digest:x}")
}
