//! The guarded pipeline: the single entry point for sensitive operations.
//!
//! Every invocation runs in a fixed order:
//!
//!   lookup → active check → authorize → rate limit → [runner: cache get →
//!   execute → cache set] → audit
//!
//! `GuardedOperation::execute` is never reachable unless authorization and
//! the rate-limit check both pass. Those two gates run once per invocation,
//! outside the retry loop, so a denial is never retried.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use warden_contracts::{
    actor::{Actor, Permission},
    audit::{actions, AuditEvent, CorrelationId, Severity},
    error::{ErrorKind, GuardError, GuardResult},
    workflow::WorkflowResult,
};

use crate::{
    cache::CacheStore,
    rate_limit::{RateDecision, RateLimiter},
    runner::WorkflowRunner,
    traits::{AuditRecorder, Authorizer, GuardedOperation, OperationContext},
};

/// Registry of guarded operations plus the services that protect them.
///
/// Built once at startup; all services are injected, none are global.
pub struct GuardedPipeline {
    authorizer: Arc<dyn Authorizer>,
    limiter: Arc<RateLimiter>,
    cache: Arc<CacheStore>,
    runner: WorkflowRunner,
    audit: Arc<dyn AuditRecorder>,
    operations: BTreeMap<String, Arc<dyn GuardedOperation>>,
}

impl GuardedPipeline {
    pub fn new(
        authorizer: Arc<dyn Authorizer>,
        limiter: Arc<RateLimiter>,
        cache: Arc<CacheStore>,
        runner: WorkflowRunner,
        audit: Arc<dyn AuditRecorder>,
    ) -> Self {
        Self {
            authorizer,
            limiter,
            cache,
            runner,
            audit,
            operations: BTreeMap::new(),
        }
    }

    /// Register an operation under its `name()`.
    ///
    /// # Errors
    ///
    /// `Fatal` if the name is already taken.
    pub fn register(&mut self, operation: Arc<dyn GuardedOperation>) -> GuardResult<()> {
        let name = operation.name().to_string();
        if self.operations.contains_key(&name) {
            return Err(GuardError::fatal(format!("operation '{name}' registered twice")));
        }
        debug!(operation = %name, permission = %operation.permission(), "registered operation");
        self.operations.insert(name, operation);
        Ok(())
    }

    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    /// The permission a registered operation requires.
    pub fn permission_for(&self, operation: &str) -> Option<Permission> {
        self.operations.get(operation).map(|op| op.permission())
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn audit(&self) -> &Arc<dyn AuditRecorder> {
        &self.audit
    }

    /// Run `operation` for `actor` with `payload`.
    ///
    /// Never returns `Err`: denials, rejections and exhausted retries all come
    /// back as a `Failed` result carrying the error kind.
    pub async fn run_guarded(&self, operation: &str, actor: &Actor, payload: Value) -> WorkflowResult {
        let correlation_id = CorrelationId::new();

        debug!(
            correlation_id = %correlation_id,
            operation,
            actor_id = %actor.id,
            "run_guarded starting"
        );

        // ── Step 1: Resolve the operation ────────────────────────────────────
        let Some(op) = self.operations.get(operation).cloned() else {
            let err = GuardError::validation(format!("unknown operation '{operation}'"));
            self.audit.record(
                AuditEvent::new(&correlation_id, actor, actions::VALIDATION_FAILED, operation)
                    .failed(&err)
                    .with_severity(Severity::Warning),
            );
            return WorkflowResult::failed(correlation_id, &err, 0, 0);
        };

        // ── Step 2: Inactive actors hold no permissions ──────────────────────
        if !actor.active {
            let err = GuardError::Unauthorized {
                actor: actor.id.to_string(),
                permission: op.permission().to_string(),
                operation: operation.to_string(),
            };
            warn!(correlation_id = %correlation_id, actor_id = %actor.id, operation, "inactive actor denied");
            self.audit.record(
                AuditEvent::new(&correlation_id, actor, actions::PERMISSION_DENIED, operation)
                    .failed(&err)
                    .with_severity(Severity::Warning)
                    .with_meta("permission", op.permission().as_str())
                    .with_meta("reason", "actor inactive"),
            );
            return WorkflowResult::failed(correlation_id, &err, 0, 0);
        }

        // ── Step 3: Authorization ────────────────────────────────────────────
        //
        // The authorizer records its own permission_denied event.
        if let Err(err) = self
            .authorizer
            .authorize(actor, op.permission(), operation, &correlation_id)
        {
            return WorkflowResult::failed(correlation_id, &err, 0, 0);
        }

        // ── Step 4: Rate limit ───────────────────────────────────────────────
        if let Some(class) = op.rate_class() {
            if let RateDecision::Rejected { retry_after } = self.limiter.check(actor.id.as_str(), class) {
                let err = GuardError::RateLimited {
                    action_class: class.to_string(),
                };
                self.audit.record(
                    AuditEvent::new(&correlation_id, actor, actions::RATE_LIMITED, operation)
                        .failed(&err)
                        .with_severity(Severity::Warning)
                        .with_meta("action_class", class)
                        .with_meta("retry_after_ms", retry_after.as_millis() as u64),
                );
                return WorkflowResult::failed(correlation_id, &err, 0, 0);
            }
        }

        // ── Step 5: Retrying execution ───────────────────────────────────────
        let cache_key = if self.cache.is_enabled() {
            op.cache_key(actor, &payload)
        } else {
            None
        };

        let op_ref = op.as_ref();
        let cid_ref = &correlation_id;
        let payload_ref = &payload;
        let key_ref = cache_key.as_deref();

        self.runner
            .run(operation, actor, &correlation_id, move |attempt| {
                self.run_attempt(op_ref, actor, cid_ref, payload_ref, key_ref, attempt)
            })
            .await
    }

    async fn run_attempt(
        &self,
        op: &dyn GuardedOperation,
        actor: &Actor,
        correlation_id: &CorrelationId,
        payload: &Value,
        cache_key: Option<&str>,
        attempt: u32,
    ) -> GuardResult<Value> {
        if let Some(key) = cache_key {
            if let Some(hit) = self.cache.get(key) {
                self.audit.record(
                    AuditEvent::new(correlation_id, actor, actions::CACHE_HIT, op.name())
                        .with_meta("cache_key", key),
                );
                return Ok(hit);
            }
        }

        let ctx = OperationContext {
            correlation_id: correlation_id.clone(),
            actor: actor.clone(),
            attempt,
            audit: Arc::clone(&self.audit),
        };

        match op.execute(&ctx, payload).await {
            Ok(value) => {
                if let Some(key) = cache_key {
                    self.cache.set(key, value.clone(), op.cache_ttl());
                    let mut event = AuditEvent::new(correlation_id, actor, actions::CACHE_STORED, op.name())
                        .with_meta("cache_key", key);
                    if let Some(ttl) = op.cache_ttl() {
                        event = event.with_meta("ttl_secs", ttl.as_secs());
                    }
                    self.audit.record(event);
                }
                Ok(value)
            }
            Err(err) => {
                let action = match err.kind() {
                    ErrorKind::SecurityViolation => Some((actions::SECURITY_VIOLATION, Severity::Error)),
                    ErrorKind::ValidationError => Some((actions::VALIDATION_FAILED, Severity::Warning)),
                    _ => None,
                };
                if let Some((action, severity)) = action {
                    self.audit.record(
                        AuditEvent::new(correlation_id, actor, action, op.name())
                            .failed(&err)
                            .with_severity(severity)
                            .with_meta("attempt", attempt),
                    );
                }
                Err(err)
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
