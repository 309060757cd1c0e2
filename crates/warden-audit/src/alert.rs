//! Alert side-channel for failed and critical events.

use tracing::error;

use warden_contracts::audit::AuditEvent;

/// Receives every event that `AuditEvent::requires_alert` flags.
///
/// Called synchronously, before the durable write.
pub trait AlertChannel: Send + Sync {
    fn alert(&self, event: &AuditEvent);
}

/// Emits alerts as `error!` records under the `warden::alert` target, so a
/// subscriber can route them separately from ordinary logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertChannel;

impl AlertChannel for TracingAlertChannel {
    fn alert(&self, event: &AuditEvent) {
        error!(
            target: "warden::alert",
            correlation_id = %event.correlation_id,
            actor_id = %event.actor_id,
            actor_handle = %event.actor_handle,
            action = %event.action,
            resource = %event.resource,
            severity = ?event.severity,
            error_kind = event.error_kind.map(|k| k.as_str()).unwrap_or("none"),
            error = event.error.as_deref().unwrap_or(""),
            "ALERT: {} failed for {}",
            event.action,
            event.actor_handle
        );
    }
}
