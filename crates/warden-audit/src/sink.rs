//! The durable side of the audit trail.

use warden_contracts::{audit::AuditEvent, error::GuardResult};

/// Append-only event storage.
///
/// Implementations must serialize concurrent appends. A returned error means
/// the event was not stored; the trail escalates it.
pub trait AuditSink: Send + Sync {
    fn append(&self, event: &AuditEvent) -> GuardResult<()>;

    fn flush(&self) -> GuardResult<()> {
        Ok(())
    }
}
