//! # warden-core
//!
//! The guarded execution pipeline and its stateful services.
//!
//! ## Pipeline
//!
//! ```text
//! run_guarded(operation, actor, payload)
//!   → Authorizer::authorize      (trusted gate)
//!   → RateLimiter::check         (per actor and action class)
//!   → WorkflowRunner::run        (retry with exponential backoff)
//!       → CacheStore::get
//!       → GuardedOperation::execute
//!       → CacheStore::set
//!   → AuditRecorder::record      (at every step)
//! ```
//!
//! Everything an operation touches is injected through the traits in
//! [`traits`]; this crate holds no global state.

pub mod cache;
pub mod pipeline;
pub mod rate_limit;
pub mod runner;
pub mod traits;

pub use cache::CacheStore;
pub use pipeline::GuardedPipeline;
pub use rate_limit::{RateDecision, RateLimiter};
pub use runner::WorkflowRunner;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use warden_contracts::{
        actor::{Actor, Permission, Role},
        audit::{actions, AuditEvent, CorrelationId, Severity},
        error::{GuardError, GuardResult},
    };

    use crate::traits::{AuditRecorder, Authorizer};

    pub fn developer() -> Actor {
        Actor::new("user_002", "dev@example.com", vec![Role::Developer])
    }

    #[derive(Default)]
    pub struct RecordingAudit {
        events: Mutex<Vec<AuditEvent>>,
    }

    impl RecordingAudit {
        pub fn events(&self) -> Vec<AuditEvent> {
            self.events.lock().unwrap().clone()
        }

        pub fn actions(&self) -> Vec<String> {
            self.events().into_iter().map(|e| e.action).collect()
        }

        pub fn with_action(&self, action: &str) -> Vec<AuditEvent> {
            self.events().into_iter().filter(|e| e.action == action).collect()
        }

        pub fn last(&self) -> Option<AuditEvent> {
            self.events().pop()
        }

        pub fn is_empty(&self) -> bool {
            self.events.lock().unwrap().is_empty()
        }
    }

    impl AuditRecorder for RecordingAudit {
        fn record(&self, event: AuditEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    pub struct AllowAll;

    impl Authorizer for AllowAll {
        fn authorize(&self, _: &Actor, _: Permission, _: &str, _: &CorrelationId) -> GuardResult<()> {
            Ok(())
        }
    }

    /// Denies everything and records the denial, as a real guard would.
    pub struct DenyAll {
        audit: Arc<RecordingAudit>,
    }

    impl DenyAll {
        pub fn new(audit: Arc<RecordingAudit>) -> Self {
            Self { audit }
        }
    }

    impl Authorizer for DenyAll {
        fn authorize(
            &self,
            actor: &Actor,
            permission: Permission,
            operation: &str,
            correlation_id: &CorrelationId,
        ) -> GuardResult<()> {
            let err = GuardError::Unauthorized {
                actor: actor.id.to_string(),
                permission: permission.to_string(),
                operation: operation.to_string(),
            };
            self.audit.record(
                AuditEvent::new(correlation_id, actor, actions::PERMISSION_DENIED, operation)
                    .failed(&err)
                    .with_severity(Severity::Warning),
            );
            Err(err)
        }
    }
}
