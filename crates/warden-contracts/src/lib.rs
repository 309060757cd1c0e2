//! # warden-contracts
//!
//! Shared types, error taxonomy, and audit records for the Warden guardrail
//! engine.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions, their defaults, and error types.

pub mod action;
pub mod actor;
pub mod audit;
pub mod config;
pub mod error;
pub mod sandbox;
pub mod verify;
pub mod workflow;

#[cfg(test)]
mod tests {
    use super::*;
    use actor::{Actor, Role};
    use audit::{AuditEvent, CorrelationId, Severity};
    use config::{FeatureFlags, GuardConfig};
    use error::{ErrorKind, GuardError};
    use sandbox::CommandSpec;
    use workflow::{WorkflowResult, WorkflowStatus};

    fn admin() -> Actor {
        Actor::new("user_001", "admin@example.com", vec![Role::Admin])
    }

    // ── ErrorKind ────────────────────────────────────────────────────────────

    #[test]
    fn only_transient_failures_are_retryable() {
        let errors = [
            GuardError::Unauthorized {
                actor: "a".into(),
                permission: "p".into(),
                operation: "o".into(),
            },
            GuardError::security("pattern"),
            GuardError::validation("too long"),
            GuardError::RateLimited { action_class: "ai_prompts".into() },
            GuardError::fatal("missing config"),
        ];
        for err in &errors {
            assert!(!err.is_retryable(), "{err} must not be retryable");
        }
        assert!(GuardError::transient("model timeout").is_retryable());
    }

    #[test]
    fn error_kind_serializes_as_stable_tag() {
        let json = serde_json::to_string(&ErrorKind::TransientFailure).unwrap();
        assert_eq!(json, "\"transient_failure\"");
        assert_eq!(ErrorKind::ValidationError.as_str(), "validation_error");
    }

    #[test]
    fn unauthorized_display_names_actor_permission_and_operation() {
        let err = GuardError::Unauthorized {
            actor: "viewer@example.com".into(),
            permission: "run_model_prompts".into(),
            operation: "review_code".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("viewer@example.com"));
        assert!(msg.contains("run_model_prompts"));
        assert!(msg.contains("review_code"));
    }

    // ── AuditEvent ───────────────────────────────────────────────────────────

    #[test]
    fn failed_event_carries_error_kind_in_metadata() {
        let cid = CorrelationId::new();
        let event = AuditEvent::new(&cid, &admin(), "workflow_failed", "review_code")
            .failed(&GuardError::fatal("no model configured"))
            .with_severity(Severity::Error);

        assert!(!event.success);
        assert_eq!(event.error_kind, Some(ErrorKind::Fatal));
        assert_eq!(event.metadata["error_kind"], "fatal");
        assert!(event.requires_alert());
    }

    #[test]
    fn info_success_event_does_not_alert_but_critical_does() {
        let cid = CorrelationId::new();
        let event = AuditEvent::new(&cid, &admin(), "cache_hit", "review:CS_001");
        assert!(!event.requires_alert());
        assert!(event.with_severity(Severity::Critical).requires_alert());
    }

    #[test]
    fn audit_event_is_field_keyed_json() {
        let cid = CorrelationId::new();
        let event = AuditEvent::new(&cid, &admin(), "workflow_started", "review_code")
            .with_meta("attempt", 0);
        let value = serde_json::to_value(&event).unwrap();
        for key in [
            "timestamp",
            "correlation_id",
            "actor_id",
            "actor_handle",
            "action",
            "resource",
            "success",
            "error",
            "metadata",
            "severity",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(value["severity"], "info");
    }

    // ── CorrelationId ────────────────────────────────────────────────────────

    #[test]
    fn correlation_id_new_produces_unique_values() {
        let ids: std::collections::HashSet<String> =
            (0..100).map(|_| CorrelationId::new().to_string()).collect();
        assert_eq!(ids.len(), 100);
    }

    // ── Config defaults ──────────────────────────────────────────────────────

    #[test]
    fn default_config_enables_every_guardrail() {
        let config = GuardConfig::default();
        assert_eq!(config.features, FeatureFlags::default());
        assert!(config.features.disabled_guardrails().is_empty());
        assert_eq!(config.sanitizer.max_sanitized_len, 10_000);
        assert_eq!(config.sanitizer.max_validated_len, 8_000);
        assert_eq!(config.rate_limits.window_secs, 3_600);
        assert_eq!(config.rate_limits.limits.get("ai_prompts"), Some(&10));
    }

    #[test]
    fn disabled_guardrails_lists_switched_off_flags() {
        let flags = FeatureFlags {
            sandbox: false,
            caching: false,
            audit_logging: false,
            ..FeatureFlags::default()
        };
        assert_eq!(flags.disabled_guardrails(), vec!["sandbox", "caching"]);
    }

    // ── Sandbox / workflow types ─────────────────────────────────────────────

    #[test]
    fn command_line_joins_program_and_args() {
        let spec = CommandSpec::new("python3").args(["script.py", "--verbose"]);
        assert_eq!(spec.command_line(), "python3 script.py --verbose");
    }

    #[test]
    fn failed_workflow_result_exposes_kind_and_message_only() {
        let cid = CorrelationId::new();
        let result: WorkflowResult =
            WorkflowResult::failed(cid, &GuardError::transient("model unavailable"), 3, 120);
        assert_eq!(result.status, WorkflowStatus::Failed);
        assert_eq!(result.retry_count, 3);
        assert_eq!(result.error_kind(), Some(ErrorKind::TransientFailure));
        assert!(result.data.is_none());
        assert!(!result.is_success());
    }
}
