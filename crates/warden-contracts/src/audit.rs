//! Audit event types.
//!
//! `AuditEvent` is the field-keyed record every component emits. Once handed
//! to the audit trail it is never mutated or deleted by the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    actor::Actor,
    error::{ErrorKind, GuardError},
};

/// Identifier joining every audit event of one logical operation.
///
/// Created once per `run_guarded` invocation and threaded through every
/// component that records on its behalf.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub uuid::Uuid);

impl CorrelationId {
    /// Create a new, unique correlation ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Severity tier of an audit event.
///
/// `Critical` events, and any event with `success = false`, are routed
/// through the alert side-channel in addition to the durable sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

/// Well-known `action` values.
pub mod actions {
    pub const PERMISSION_DENIED: &str = "permission_denied";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const SECURITY_VIOLATION: &str = "security_violation";
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const CACHE_HIT: &str = "cache_hit";
    pub const CACHE_STORED: &str = "cache_stored";
    pub const WORKFLOW_STARTED: &str = "workflow_started";
    pub const WORKFLOW_RETRY: &str = "workflow_retry";
    pub const WORKFLOW_COMPLETED: &str = "workflow_completed";
    pub const WORKFLOW_FAILED: &str = "workflow_failed";
    pub const COMMAND_EXECUTED: &str = "command_executed";
    pub const CODE_REVIEW_COMPLETED: &str = "code_review_completed";
    pub const ACTIONS_MATERIALIZED: &str = "actions_materialized";
    pub const GUARDRAIL_BYPASS_ENABLED: &str = "guardrail_bypass_enabled";
    pub const AUDIT_SINK_FAILURE: &str = "audit_sink_failure";
}

/// An immutable, machine-parseable audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub correlation_id: CorrelationId,
    pub actor_id: String,
    pub actor_handle: String,
    /// What happened, usually one of the [`actions`] constants.
    pub action: String,
    /// The affected resource (operation name, command path, cache key, ...).
    pub resource: String,
    pub success: bool,
    pub error: Option<String>,
    /// Stable error tag, present whenever `error` is.
    pub error_kind: Option<ErrorKind>,
    pub metadata: Map<String, Value>,
    pub severity: Severity,
}

impl AuditEvent {
    /// Start a successful `Info` event for `actor`.
    pub fn new(
        correlation_id: &CorrelationId,
        actor: &Actor,
        action: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self::for_identity(correlation_id, &actor.id.0, &actor.handle, action, resource)
    }

    /// Start an event for an identity that may not resolve to an `Actor`
    /// (system events, unknown actor ids).
    pub fn for_identity(
        correlation_id: &CorrelationId,
        actor_id: &str,
        actor_handle: &str,
        action: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            correlation_id: correlation_id.clone(),
            actor_id: actor_id.to_string(),
            actor_handle: actor_handle.to_string(),
            action: action.into(),
            resource: resource.into(),
            success: true,
            error: None,
            error_kind: None,
            metadata: Map::new(),
            severity: Severity::Info,
        }
    }

    /// Mark the event as failed with `err`, copying its message and kind.
    ///
    /// The kind is also written to `metadata.error_kind` so consumers that
    /// only read the metadata map can still tell fatal from transient.
    pub fn failed(mut self, err: &GuardError) -> Self {
        let kind = err.kind();
        self.success = false;
        self.error = Some(err.to_string());
        self.error_kind = Some(kind);
        self.metadata
            .insert("error_kind".to_string(), Value::String(kind.as_str().to_string()));
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// True when the trail must route this event through the alert channel.
    pub fn requires_alert(&self) -> bool {
        self.severity == Severity::Critical || !self.success
    }
}
