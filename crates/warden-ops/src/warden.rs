//! `Warden`: every guardrail service wired from one `GuardConfig`.
//!
//! The facade owns nothing global. Each instance builds its own trail,
//! guard, limiter, cache, runner, sanitizer and sandbox, so two instances
//! (or two tests) never share state.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use warden_audit::{AlertChannel, AuditSink, AuditTrail};
use warden_contracts::{
    actor::{Actor, ActorId},
    audit::{actions, AuditEvent, CorrelationId, Severity},
    config::GuardConfig,
    error::{GuardError, GuardResult},
    workflow::WorkflowResult,
};
use warden_core::{
    traits::{ActionSource, ActorDirectory, ArtifactPublisher, AuditRecorder, ModelClient},
    CacheStore, GuardedPipeline, RateLimiter, WorkflowRunner,
};
use warden_policy::{AuthorizationGuard, CommandValidator, InputSanitizer};
use warden_sandbox::SandboxExecutor;
use warden_verify::ResponseVerifier;

use crate::operations::{
    CacheKeyStrategy, CodeReviewOperation, MaterializeActionsOperation, SyncDaemonOperation,
    SyncDaemonSettings, MATERIALIZE_ACTIONS, REVIEW_CODE, RUN_SYNC_DAEMON,
};

/// The external systems the operations talk to.
pub struct Collaborators {
    pub model: Arc<dyn ModelClient>,
    pub directory: Arc<dyn ActorDirectory>,
    pub actions: Arc<dyn ActionSource>,
    pub publisher: Arc<dyn ArtifactPublisher>,
}

/// Per-operation choices that are not guardrail configuration.
#[derive(Debug, Clone, Default)]
pub struct OperationSettings {
    pub review_cache_key: CacheKeyStrategy,
    pub sync_daemon: SyncDaemonSettings,
}

pub struct Warden {
    config: GuardConfig,
    pipeline: GuardedPipeline,
    audit: Arc<dyn AuditRecorder>,
    directory: Arc<dyn ActorDirectory>,
    executor: Arc<SandboxExecutor>,
    sanitizer: Arc<InputSanitizer>,
}

impl Warden {
    /// Build every service and register the reference operations.
    ///
    /// Each disabled guardrail records one `guardrail_bypass_enabled` event
    /// here, before any operation can run.
    ///
    /// # Errors
    ///
    /// `Fatal` if a configured pattern does not compile.
    pub fn new(
        config: GuardConfig,
        sink: Arc<dyn AuditSink>,
        collaborators: Collaborators,
        settings: OperationSettings,
    ) -> GuardResult<Self> {
        Self::build(config, AuditTrail::new(sink), collaborators, settings)
    }

    /// As [`Warden::new`], routing alerts to `alerts` instead of `tracing`.
    pub fn with_alerts(
        config: GuardConfig,
        sink: Arc<dyn AuditSink>,
        alerts: Arc<dyn AlertChannel>,
        collaborators: Collaborators,
        settings: OperationSettings,
    ) -> GuardResult<Self> {
        Self::build(config, AuditTrail::new(sink).with_alerts(alerts), collaborators, settings)
    }

    fn build(
        config: GuardConfig,
        trail: AuditTrail,
        collaborators: Collaborators,
        settings: OperationSettings,
    ) -> GuardResult<Self> {
        let features = config.features;
        let audit: Arc<dyn AuditRecorder> = Arc::new(trail.with_enabled(features.audit_logging));

        record_bypasses(&config, audit.as_ref());

        let guard = AuthorizationGuard::new(Arc::clone(&audit)).with_enabled(features.authorization);
        let limiter = RateLimiter::from_settings(&config.rate_limits).with_enabled(features.rate_limiting);
        let cache = CacheStore::from_settings(&config.cache).with_enabled(features.caching);
        let runner = WorkflowRunner::new(config.retry.clone(), Arc::clone(&audit))
            .with_enabled(features.retry_handling);

        let sanitizer = Arc::new(
            InputSanitizer::from_settings(&config.sanitizer)?.with_validation(features.input_validation),
        );
        let validator = Arc::new(CommandValidator::from_settings(&config.command_policy)?);
        let executor = Arc::new(
            SandboxExecutor::new(config.sandbox.clone(), validator).with_enabled(features.sandbox),
        );
        let verifier = Arc::new(ResponseVerifier::new());

        let mut pipeline = GuardedPipeline::new(
            Arc::new(guard),
            Arc::new(limiter),
            Arc::new(cache),
            runner,
            Arc::clone(&audit),
        );
        pipeline.register(Arc::new(CodeReviewOperation::new(
            collaborators.model,
            Arc::clone(&sanitizer),
            verifier,
            settings.review_cache_key,
        )))?;
        pipeline.register(Arc::new(SyncDaemonOperation::new(
            executor.clone(),
            settings.sync_daemon,
        )))?;
        pipeline.register(Arc::new(MaterializeActionsOperation::new(
            collaborators.actions,
            collaborators.publisher,
        )))?;

        info!(
            operations = ?pipeline.operation_names().collect::<Vec<_>>(),
            "warden initialized"
        );

        Ok(Self {
            config,
            pipeline,
            audit,
            directory: collaborators.directory,
            executor,
            sanitizer,
        })
    }

    // ── Invocation surface ────────────────────────────────────────────────────

    pub async fn run_guarded(&self, operation: &str, actor: &Actor, payload: Value) -> WorkflowResult {
        self.pipeline.run_guarded(operation, actor, payload).await
    }

    /// Resolve `actor_id` through the directory, then run the operation.
    ///
    /// An unknown or inactive actor is denied with `Unauthorized` and one
    /// `permission_denied` event. A resolved actor is marked active.
    pub async fn run_guarded_for(&self, operation: &str, actor_id: &ActorId, payload: Value) -> WorkflowResult {
        let actor = match self.directory.get_actor(actor_id) {
            Some(actor) if actor.active => actor,
            found => {
                let reason = if found.is_some() { "actor inactive" } else { "unknown actor" };
                return self.deny_identity(operation, actor_id, reason);
            }
        };
        self.directory.mark_active(actor_id);
        debug!(actor_id = %actor_id, operation, "actor resolved");
        self.pipeline.run_guarded(operation, &actor, payload).await
    }

    fn deny_identity(&self, operation: &str, actor_id: &ActorId, reason: &str) -> WorkflowResult {
        let correlation_id = CorrelationId::new();
        let permission = self
            .pipeline
            .permission_for(operation)
            .map_or("unknown", |p| p.as_str());
        let err = GuardError::Unauthorized {
            actor: actor_id.to_string(),
            permission: permission.to_string(),
            operation: operation.to_string(),
        };
        warn!(correlation_id = %correlation_id, actor_id = %actor_id, operation, reason, "actor resolution denied");
        self.audit.record(
            AuditEvent::for_identity(
                &correlation_id,
                actor_id.as_str(),
                "unknown",
                actions::PERMISSION_DENIED,
                operation,
            )
            .failed(&err)
            .with_severity(Severity::Warning)
            .with_meta("permission", permission)
            .with_meta("reason", reason),
        );
        WorkflowResult::failed(correlation_id, &err, 0, 0)
    }

    pub async fn review_code(&self, actor: &Actor, artifact_id: &str, code: &str) -> WorkflowResult {
        self.run_guarded(REVIEW_CODE, actor, json!({ "artifact_id": artifact_id, "code": code }))
            .await
    }

    pub async fn run_sync_daemon(&self, actor: &Actor, args: &[&str]) -> WorkflowResult {
        self.run_guarded(RUN_SYNC_DAEMON, actor, json!({ "args": args })).await
    }

    pub async fn materialize_actions(&self, actor: &Actor) -> WorkflowResult {
        self.run_guarded(MATERIALIZE_ACTIONS, actor, json!({})).await
    }

    /// Flush the audit sink. Call once before the process exits.
    pub fn shutdown(&self) -> GuardResult<()> {
        info!("warden shutting down; flushing audit trail");
        self.audit.flush()
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn audit(&self) -> &Arc<dyn AuditRecorder> {
        &self.audit
    }

    pub fn cache(&self) -> &CacheStore {
        self.pipeline.cache()
    }

    pub fn limiter(&self) -> &RateLimiter {
        self.pipeline.limiter()
    }

    pub fn sandbox(&self) -> &SandboxExecutor {
        &self.executor
    }

    pub fn sanitizer(&self) -> &InputSanitizer {
        &self.sanitizer
    }

    pub fn directory(&self) -> &Arc<dyn ActorDirectory> {
        &self.directory
    }

    pub fn operation_names(&self) -> Vec<&str> {
        self.pipeline.operation_names().collect()
    }
}

/// One warning event per switched-off guardrail. A disabled audit trail
/// drops these; `AuditTrail::with_enabled` has already logged that bypass.
fn record_bypasses(config: &GuardConfig, audit: &dyn AuditRecorder) {
    let disabled = config.features.disabled_guardrails();
    if disabled.is_empty() {
        return;
    }
    let correlation_id = CorrelationId::new();
    for guardrail in disabled {
        warn!(guardrail, "guardrail bypass enabled");
        audit.record(
            AuditEvent::for_identity(
                &correlation_id,
                "system",
                "system",
                actions::GUARDRAIL_BYPASS_ENABLED,
                guardrail,
            )
            .with_severity(Severity::Warning)
            .with_meta("guardrail", guardrail),
        );
    }
}
