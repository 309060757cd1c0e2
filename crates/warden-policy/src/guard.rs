//! The authorization guard.
//!
//! Allows iff one of the actor's roles grants the permission in the fixed
//! table. A denial is audited here, before the pipeline sees it, so every
//! `Unauthorized` outcome has exactly one `permission_denied` event.

use std::sync::Arc;

use tracing::{debug, warn};

use warden_contracts::{
    actor::{Actor, Permission},
    audit::{actions, AuditEvent, CorrelationId, Severity},
    error::{GuardError, GuardResult},
};
use warden_core::traits::{AuditRecorder, Authorizer};

use crate::tables::roles_grant;

pub struct AuthorizationGuard {
    audit: Arc<dyn AuditRecorder>,
    enabled: bool,
}

impl AuthorizationGuard {
    pub fn new(audit: Arc<dyn AuditRecorder>) -> Self {
        Self {
            audit,
            enabled: true,
        }
    }

    /// A disabled guard allows every request. The caller that disables it
    /// is responsible for auditing the bypass once.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The pure decision, without auditing.
    pub fn is_allowed(&self, actor: &Actor, permission: Permission) -> bool {
        !self.enabled || roles_grant(&actor.roles, permission)
    }
}

impl Authorizer for AuthorizationGuard {
    fn authorize(
        &self,
        actor: &Actor,
        permission: Permission,
        operation: &str,
        correlation_id: &CorrelationId,
    ) -> GuardResult<()> {
        if self.is_allowed(actor, permission) {
            debug!(
                correlation_id = %correlation_id,
                actor_id = %actor.id,
                permission = %permission,
                operation,
                "authorized"
            );
            return Ok(());
        }

        warn!(
            correlation_id = %correlation_id,
            actor_id = %actor.id,
            permission = %permission,
            operation,
            "permission denied"
        );

        let err = GuardError::Unauthorized {
            actor: actor.id.to_string(),
            permission: permission.to_string(),
            operation: operation.to_string(),
        };
        let roles: Vec<&str> = actor.roles.iter().map(|r| r.as_str()).collect();
        self.audit.record(
            AuditEvent::new(correlation_id, actor, actions::PERMISSION_DENIED, operation)
                .failed(&err)
                .with_severity(Severity::Warning)
                .with_meta("permission", permission.as_str())
                .with_meta("operation", operation)
                .with_meta("roles", roles),
        );
        Err(err)
    }
}
