//! `materialize_actions`: turns queued cross-system actions into artifacts.
//!
//! Payload: `{"limit": n}` (optional). Artifacts are created in queue order.
//! A publisher failure aborts the attempt; artifacts created before it are
//! not rolled back, so a retried attempt may publish them again.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use warden_contracts::{actor::Permission, audit::actions, error::GuardResult};
use warden_core::traits::{ActionSource, ArtifactPublisher, GuardedOperation, OperationContext};
use warden_policy::{FieldRule, FieldType, FieldValidator};

pub const MATERIALIZE_ACTIONS: &str = "materialize_actions";

pub struct MaterializeActionsOperation {
    source: Arc<dyn ActionSource>,
    publisher: Arc<dyn ArtifactPublisher>,
}

impl MaterializeActionsOperation {
    pub fn new(source: Arc<dyn ActionSource>, publisher: Arc<dyn ArtifactPublisher>) -> Self {
        Self { source, publisher }
    }
}

#[async_trait]
impl GuardedOperation for MaterializeActionsOperation {
    fn name(&self) -> &str {
        MATERIALIZE_ACTIONS
    }

    fn permission(&self) -> Permission {
        Permission::ModifyState
    }

    fn rate_class(&self) -> Option<&str> {
        Some("state_writes")
    }

    async fn execute(&self, ctx: &OperationContext, payload: &Value) -> GuardResult<Value> {
        let rules = [FieldRule::new("limit", FieldType::Number).range(Some(1.0), Some(1_000.0))];
        let fields = FieldValidator::validate(payload, &rules)?;
        let limit = fields
            .get("limit")
            .and_then(Value::as_f64)
            .map_or(usize::MAX, |n| n as usize);

        let queued = self.source.fetch_queued_actions().await?;
        debug!(correlation_id = %ctx.correlation_id, queued = queued.len(), limit, "fetched queued actions");

        let mut created = Vec::new();
        for action in queued.iter().take(limit) {
            let reference = self.publisher.create_artifact(action).await?;
            debug!(kind = %action.kind, target = %action.target, %reference, "artifact created");
            created.push(json!({
                "kind": action.kind,
                "target": action.target,
                "title": action.title,
                "reference": reference,
            }));
        }

        let kinds: Vec<Value> = created.iter().map(|c| c["kind"].clone()).collect();
        info!(correlation_id = %ctx.correlation_id, count = created.len(), "queued actions materialized");
        ctx.audit.record(
            ctx.event(actions::ACTIONS_MATERIALIZED, "execution_queue")
                .with_meta("count", created.len() as u64)
                .with_meta("queued", queued.len() as u64)
                .with_meta("kinds", kinds),
        );

        Ok(json!({
            "count": created.len(),
            "created": created,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use warden_contracts::{
        actor::{Actor, Role},
        audit::{actions, AuditEvent, CorrelationId},
        error::ErrorKind,
    };
    use warden_core::traits::{AuditRecorder, GuardedOperation, OperationContext};

    use super::MaterializeActionsOperation;
    use crate::mock_data::{sample_actions, RecordingPublisher, StaticActionSource};

    #[derive(Default)]
    struct Collect(Mutex<Vec<AuditEvent>>);

    impl AuditRecorder for Collect {
        fn record(&self, event: AuditEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn ctx(audit: Arc<Collect>) -> OperationContext {
        OperationContext {
            correlation_id: CorrelationId::new(),
            actor: Actor::new("user_002", "developer@example.com", vec![Role::Developer]),
            attempt: 0,
            audit,
        }
    }

    #[tokio::test]
    async fn test_every_queued_action_becomes_an_artifact() {
        let publisher = RecordingPublisher::new();
        let op = MaterializeActionsOperation::new(
            Arc::new(StaticActionSource::new(sample_actions())),
            Arc::new(publisher.clone()),
        );
        let audit = Arc::new(Collect::default());

        let out = op.execute(&ctx(audit.clone()), &json!({})).await.unwrap();

        assert_eq!(out["count"], json!(3));
        assert_eq!(out["created"][0]["reference"], json!("mock://issue/1"));
        assert_eq!(publisher.created().len(), 3);
        let events = audit.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, actions::ACTIONS_MATERIALIZED);
        assert_eq!(events[0].metadata["kinds"], json!(["issue", "pull_request", "discussion"]));
    }

    #[tokio::test]
    async fn test_limit_caps_artifacts_and_accepts_numeric_string() {
        let publisher = RecordingPublisher::new();
        let op = MaterializeActionsOperation::new(
            Arc::new(StaticActionSource::new(sample_actions())),
            Arc::new(publisher.clone()),
        );

        let out = op.execute(&ctx(Arc::default()), &json!({"limit": "2"})).await.unwrap();

        assert_eq!(out["count"], json!(2));
        assert_eq!(publisher.created().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_limit_is_validation_error() {
        let source = Arc::new(StaticActionSource::new(sample_actions()));
        let op = MaterializeActionsOperation::new(source.clone(), Arc::new(RecordingPublisher::new()));

        let err = op.execute(&ctx(Arc::default()), &json!({"limit": 0})).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(source.fetches(), 0);
    }

    #[tokio::test]
    async fn test_empty_queue_creates_nothing() {
        let op = MaterializeActionsOperation::new(
            Arc::new(StaticActionSource::new(Vec::new())),
            Arc::new(RecordingPublisher::new()),
        );
        let out = op.execute(&ctx(Arc::default()), &json!({})).await.unwrap();
        assert_eq!(out["count"], json!(0));
    }
}
