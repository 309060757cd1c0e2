//! The audit trail: alert routing, durable write, and the tracing mirror.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use warden_contracts::{
    audit::{actions, AuditEvent, Severity},
    error::{GuardError, GuardResult},
};
use warden_core::traits::AuditRecorder;

use crate::{
    alert::{AlertChannel, TracingAlertChannel},
    sink::AuditSink,
};

/// Routes each event through the alert channel (when required), then the
/// sink, and mirrors it to `tracing` at a level matching its severity.
///
/// A sink failure never reaches the caller. It is logged at `error!` and
/// raised as an `audit_sink_failure` alert instead.
pub struct AuditTrail {
    sink: Arc<dyn AuditSink>,
    alerts: Arc<dyn AlertChannel>,
    enabled: bool,
}

impl AuditTrail {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            alerts: Arc::new(TracingAlertChannel),
            enabled: true,
        }
    }

    pub fn with_alerts(mut self, alerts: Arc<dyn AlertChannel>) -> Self {
        self.alerts = alerts;
        self
    }

    /// A disabled trail drops every event. The bypass is logged here, once.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        if !enabled && self.enabled {
            warn!("audit logging disabled; events will not be recorded");
        }
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn escalate(&self, event: &AuditEvent, err: &GuardError) {
        error!(
            target: "warden::audit",
            correlation_id = %event.correlation_id,
            action = %event.action,
            error = %err,
            "audit sink rejected event"
        );
        let failure = AuditEvent::for_identity(
            &event.correlation_id,
            "system",
            "system",
            actions::AUDIT_SINK_FAILURE,
            event.action.clone(),
        )
        .failed(err)
        .with_severity(Severity::Critical)
        .with_meta("dropped_action", event.action.clone())
        .with_meta("dropped_actor_id", event.actor_id.clone());
        self.alerts.alert(&failure);
    }
}

impl AuditRecorder for AuditTrail {
    fn record(&self, event: AuditEvent) {
        if !self.enabled {
            return;
        }

        mirror(&event);

        if event.requires_alert() {
            self.alerts.alert(&event);
        }

        if let Err(err) = self.sink.append(&event) {
            self.escalate(&event, &err);
        }
    }

    fn flush(&self) -> GuardResult<()> {
        self.sink.flush()
    }
}

fn mirror(event: &AuditEvent) {
    let level = if event.requires_alert() {
        Severity::Error
    } else {
        event.severity
    };
    match level {
        Severity::Info => info!(
            correlation_id = %event.correlation_id,
            actor_id = %event.actor_id,
            action = %event.action,
            resource = %event.resource,
            "audit"
        ),
        Severity::Warning => warn!(
            correlation_id = %event.correlation_id,
            actor_id = %event.actor_id,
            action = %event.action,
            resource = %event.resource,
            "audit"
        ),
        Severity::Error | Severity::Critical => error!(
            correlation_id = %event.correlation_id,
            actor_id = %event.actor_id,
            action = %event.action,
            resource = %event.resource,
            success = event.success,
            error = event.error.as_deref().unwrap_or(""),
            "audit"
        ),
    }
    debug!(metadata = %serde_json::Value::Object(event.metadata.clone()), "audit metadata");
}
