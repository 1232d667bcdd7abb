//! Content fingerprint of a regression sample.
//!
//! Two runs over identical inputs produce the same joined sample and
//! therefore the same fingerprint; the report prints it so runs can be
//! compared at a glance.

use crate::domain::JoinedSample;

/// BLAKE3 hex digest of the sample's canonical JSON encoding.
pub fn sample_fingerprint(sample: &JoinedSample) -> String {
    let bytes = serde_json::to_vec(&sample.rows).unwrap_or_default();
    blake3::hash(&bytes).to_hex().to_string()
}
