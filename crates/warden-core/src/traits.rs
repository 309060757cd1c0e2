//! Seam traits for the guarded pipeline.
//!
//! The pipeline only ever talks to these traits:
//!
//! - `Authorizer`: the gate, evaluated before anything runs
//! - `AuditRecorder`: the sink every outcome is reported to
//! - `GuardedOperation`: the unit of work being protected
//!
//! The remaining traits describe external collaborators that operations
//! consume: the model, the command runner, the actor directory, and the
//! queued-action source and artifact publisher. Their internals are out of
//! scope; only their success/failure contract matters.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use warden_contracts::{
    action::QueuedAction,
    actor::{Actor, ActorId, Permission},
    audit::{AuditEvent, CorrelationId},
    error::GuardResult,
    sandbox::{CommandSpec, SandboxResult},
};

/// The audit trail as seen by every component that reports outcomes.
///
/// `record` is fire-and-forget: implementations must never lose an event
/// silently, so a sink failure is escalated by the implementation rather
/// than returned to the caller.
pub trait AuditRecorder: Send + Sync {
    /// Append one event. Events are never mutated after this call.
    fn record(&self, event: AuditEvent);

    /// Flush buffered events to durable storage. Called at shutdown.
    fn flush(&self) -> GuardResult<()> {
        Ok(())
    }
}

/// The authorization gate.
///
/// On deny the implementation records a `permission_denied` event itself and
/// returns `GuardError::Unauthorized`; the pipeline never runs the operation.
pub trait Authorizer: Send + Sync {
    fn authorize(
        &self,
        actor: &Actor,
        permission: Permission,
        operation: &str,
        correlation_id: &CorrelationId,
    ) -> GuardResult<()>;
}

/// Per-attempt context handed to an operation.
#[derive(Clone)]
pub struct OperationContext {
    pub correlation_id: CorrelationId,
    pub actor: Actor,
    /// Zero-based attempt number within the current invocation.
    pub attempt: u32,
    pub audit: Arc<dyn AuditRecorder>,
}

impl OperationContext {
    /// Start an audit event for this attempt's actor and correlation id.
    pub fn event(&self, action: &str, resource: impl Into<String>) -> AuditEvent {
        AuditEvent::new(&self.correlation_id, &self.actor, action, resource)
    }
}

/// A named, permission-gated unit of work.
///
/// Operations are registered with the pipeline once at startup. The pipeline
/// authorizes, rate-limits and consults the cache before `execute` runs, and
/// may call `execute` again on transient failure.
#[async_trait]
pub trait GuardedOperation: Send + Sync {
    /// Unique operation name used by `run_guarded`.
    fn name(&self) -> &str;

    /// The permission the actor must hold.
    fn permission(&self) -> Permission;

    /// The rate-limit class to charge, if any.
    fn rate_class(&self) -> Option<&str> {
        None
    }

    /// Cache key for this payload, or `None` when results are not cacheable.
    ///
    /// Key derivation is deliberately the operation's decision: some callers
    /// key on a content hash, others on a coarse identifier.
    fn cache_key(&self, _actor: &Actor, _payload: &Value) -> Option<String> {
        None
    }

    /// TTL for cached results; `None` uses the store default.
    fn cache_ttl(&self) -> Option<Duration> {
        None
    }

    /// Run one attempt.
    async fn execute(&self, ctx: &OperationContext, payload: &Value) -> GuardResult<Value>;
}

/// An opaque generative model.
///
/// Implementations signal retryable trouble with `GuardError::Transient`.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn call_model(&self, prompt: &str) -> GuardResult<String>;
}

/// Something that can run an external command under the sandbox policy.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> GuardResult<SandboxResult>;
}

/// Read access to the external identity store.
pub trait ActorDirectory: Send + Sync {
    fn get_actor(&self, id: &ActorId) -> Option<Actor>;

    /// Stamp the actor's last-activity time. Stores that do not track
    /// activity may ignore this.
    fn mark_active(&self, _id: &ActorId) {}
}

/// Source of pending cross-system actions.
#[async_trait]
pub trait ActionSource: Send + Sync {
    async fn fetch_queued_actions(&self) -> GuardResult<Vec<QueuedAction>>;
}

/// Creates the artifact (issue, page, pull request, ...) for one action.
#[async_trait]
pub trait ArtifactPublisher: Send + Sync {
    /// Returns a reference (URL or id) to the created artifact.
    async fn create_artifact(&self, action: &QueuedAction) -> GuardResult<String>;
}
