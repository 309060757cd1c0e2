//! Hash-chain primitives.
//!
//! Hash input layout (bytes, in order):
//!   1. sequence as 8-byte little-endian
//!   2. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   3. canonical JSON of the event (serde_json, no pretty-printing)

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use warden_contracts::{
    audit::AuditEvent,
    error::{GuardError, GuardResult},
};

/// The `prev_hash` of the first link in every chain.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// One audit event and its position in the chain.
///
/// Changing any field of `event` invalidates `this_hash` and every later
/// `prev_hash`, which [`verify_chain`] detects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainedEvent {
    pub sequence: u64,
    pub event: AuditEvent,
    pub prev_hash: String,
    pub this_hash: String,
}

/// SHA-256 over (sequence, prev_hash, event JSON), as lowercase hex.
///
/// # Errors
///
/// `Fatal` if the event cannot be serialized.
pub fn hash_event(sequence: u64, event: &AuditEvent, prev_hash: &str) -> GuardResult<String> {
    let event_json = serde_json::to_vec(event)
        .map_err(|e| GuardError::fatal(format!("audit event is not serializable: {e}")))?;

    let mut hasher = Sha256::new();
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&event_json);

    Ok(hex::encode(hasher.finalize()))
}

/// True when every link points at its predecessor and every hash matches
/// its recomputed value. An empty chain is valid.
pub fn verify_chain(chain: &[ChainedEvent]) -> bool {
    let mut expected_prev = GENESIS_HASH.to_string();

    for (position, link) in chain.iter().enumerate() {
        if link.sequence != position as u64 || link.prev_hash != expected_prev {
            return false;
        }

        match hash_event(link.sequence, &link.event, &link.prev_hash) {
            Ok(recomputed) if recomputed == link.this_hash => {}
            _ => return false,
        }

        expected_prev = link.this_hash.clone();
    }

    true
}
