//! In-memory, hash-chained audit sink.
//!
//! Cloning an `InMemoryAuditSink` shares its state, so a test or operator
//! console can hold a handle while the trail writes through another.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::info;

use warden_contracts::{
    audit::AuditEvent,
    error::{GuardError, GuardResult},
};

use crate::{
    chain::{hash_event, verify_chain, ChainedEvent, GENESIS_HASH},
    sink::AuditSink,
};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct InMemoryState {
    pub(crate) chain: Vec<ChainedEvent>,
    /// `this_hash` of the last link, or `GENESIS_HASH` when empty.
    pub(crate) last_hash: String,
}

// ── Public sink ───────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct InMemoryAuditSink {
    pub(crate) state: Arc<Mutex<InMemoryState>>,
}

impl Default for InMemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryState {
                chain: Vec::new(),
                last_hash: GENESIS_HASH.to_string(),
            })),
        }
    }

    fn lock(&self) -> GuardResult<MutexGuard<'_, InMemoryState>> {
        self.state
            .lock()
            .map_err(|e| GuardError::fatal(format!("audit state lock poisoned: {e}")))
    }

    /// Snapshot of every stored event, in append order.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.chain().into_iter().map(|link| link.event).collect()
    }

    /// Stored events whose `action` equals `action`.
    pub fn events_with_action(&self, action: &str) -> Vec<AuditEvent> {
        self.events().into_iter().filter(|e| e.action == action).collect()
    }

    pub fn chain(&self) -> Vec<ChainedEvent> {
        self.lock().map(|s| s.chain.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|s| s.chain.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `this_hash` of the newest link, or empty when nothing was stored.
    pub fn terminal_hash(&self) -> String {
        self.lock()
            .ok()
            .and_then(|s| s.chain.last().map(|link| link.this_hash.clone()))
            .unwrap_or_default()
    }

    /// Confirm the stored chain has not been altered.
    pub fn verify_integrity(&self) -> bool {
        self.lock().map(|s| verify_chain(&s.chain)).unwrap_or(false)
    }
}

impl AuditSink for InMemoryAuditSink {
    fn append(&self, event: &AuditEvent) -> GuardResult<()> {
        let mut state = self.lock()?;

        let sequence = state.chain.len() as u64;
        let prev_hash = state.last_hash.clone();
        let this_hash = hash_event(sequence, event, &prev_hash)?;

        state.chain.push(ChainedEvent {
            sequence,
            event: event.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
        });
        state.last_hash = this_hash;
        Ok(())
    }

    fn flush(&self) -> GuardResult<()> {
        let state = self.lock()?;
        info!(
            event_count = state.chain.len(),
            terminal_hash = %state.last_hash,
            "in-memory audit chain flushed"
        );
        Ok(())
    }
}
