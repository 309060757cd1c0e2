//! Retrying workflow runner.
//!
//! Drives one invocation through `Pending -> Running -> {Success | Retry ->
//! Running | Failed}`. Only `TransientFailure` enters `Retry`; every other
//! error kind fails immediately. The runner never returns `Err`: every
//! terminal outcome is a [`WorkflowResult`].
//!
//! Audit events per invocation (when retry handling is enabled):
//!
//! - `workflow_started`, once, before the first attempt
//! - `workflow_retry`, once per retry, before the backoff wait
//! - `workflow_completed` or `workflow_failed`, once, at the end

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use warden_contracts::{
    actor::Actor,
    audit::{actions, AuditEvent, CorrelationId, Severity},
    config::RetrySettings,
    error::{ErrorKind, GuardError, GuardResult},
    workflow::WorkflowResult,
};

use crate::traits::AuditRecorder;

pub struct WorkflowRunner {
    settings: RetrySettings,
    enabled: bool,
    audit: Arc<dyn AuditRecorder>,
}

impl WorkflowRunner {
    pub fn new(settings: RetrySettings, audit: Arc<dyn AuditRecorder>) -> Self {
        Self {
            settings,
            enabled: true,
            audit,
        }
    }

    /// With retry handling disabled the runner executes exactly once and
    /// records nothing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn settings(&self) -> &RetrySettings {
        &self.settings
    }

    /// Wait before retry number `retry` (1-based): `base * 2^(retry-1)`,
    /// capped at `max_delay`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let max = self.settings.max_delay();
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.settings
            .base_delay()
            .checked_mul(factor)
            .map_or(max, |d| d.min(max))
    }

    /// Run `attempt` until it succeeds, fails non-retryably, or exhausts
    /// `max_retries`. The closure receives the zero-based attempt number.
    pub async fn run<F, Fut>(
        &self,
        operation: &str,
        actor: &Actor,
        correlation_id: &CorrelationId,
        mut attempt: F,
    ) -> WorkflowResult
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = GuardResult<Value>>,
    {
        let started = Instant::now();

        if !self.enabled {
            let outcome = attempt(0).await;
            let duration_ms = elapsed_ms(started);
            return match outcome {
                Ok(data) => WorkflowResult::success(correlation_id.clone(), data, 0, duration_ms),
                Err(err) => {
                    debug!(operation, %correlation_id, error = %err, "single attempt failed");
                    WorkflowResult::failed(correlation_id.clone(), &err, 0, duration_ms)
                }
            };
        }

        self.audit.record(
            AuditEvent::new(correlation_id, actor, actions::WORKFLOW_STARTED, operation)
                .with_meta("max_retries", self.settings.max_retries),
        );
        info!(operation, %correlation_id, actor_id = %actor.id, "workflow started");

        let mut retries = 0u32;
        loop {
            match attempt(retries).await {
                Ok(data) => {
                    let duration_ms = elapsed_ms(started);
                    self.audit.record(
                        AuditEvent::new(correlation_id, actor, actions::WORKFLOW_COMPLETED, operation)
                            .with_meta("duration_ms", duration_ms)
                            .with_meta("retry_count", retries),
                    );
                    info!(operation, %correlation_id, retries, duration_ms, "workflow completed");
                    return WorkflowResult::success(correlation_id.clone(), data, retries, duration_ms);
                }
                Err(err) if err.is_retryable() && retries < self.settings.max_retries => {
                    retries += 1;
                    let wait = self.backoff(retries);
                    let wait_ms = wait.as_millis() as u64;
                    self.audit.record(
                        AuditEvent::new(correlation_id, actor, actions::WORKFLOW_RETRY, operation)
                            .failed(&err)
                            .with_severity(Severity::Warning)
                            .with_meta("retry_count", retries)
                            .with_meta("wait_ms", wait_ms)
                            .with_meta("max_retries", self.settings.max_retries),
                    );
                    warn!(operation, %correlation_id, retries, wait_ms, error = %err, "retrying after transient failure");
                    tokio::time::sleep(wait).await;
                }
                Err(err) => {
                    let duration_ms = elapsed_ms(started);
                    self.record_failure(operation, actor, correlation_id, &err, retries, duration_ms);
                    return WorkflowResult::failed(correlation_id.clone(), &err, retries, duration_ms);
                }
            }
        }
    }

    fn record_failure(
        &self,
        operation: &str,
        actor: &Actor,
        correlation_id: &CorrelationId,
        err: &GuardError,
        retries: u32,
        duration_ms: u64,
    ) {
        let severity = match err.kind() {
            ErrorKind::Fatal => Severity::Critical,
            _ => Severity::Error,
        };
        self.audit.record(
            AuditEvent::new(correlation_id, actor, actions::WORKFLOW_FAILED, operation)
                .failed(err)
                .with_severity(severity)
                .with_meta("retry_count", retries)
                .with_meta("duration_ms", duration_ms),
        );
        warn!(
            operation,
            %correlation_id,
            retries,
            duration_ms,
            error_kind = %err.kind(),
            "workflow failed"
        );
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use warden_contracts::{
        audit::{actions, Severity},
        config::RetrySettings,
        error::{ErrorKind, GuardError},
        workflow::WorkflowStatus,
    };

    use super::WorkflowRunner;
    use crate::test_support::{developer, RecordingAudit};

    fn runner(max_retries: u32, base_delay_ms: u64, audit: Arc<RecordingAudit>) -> WorkflowRunner {
        WorkflowRunner::new(
            RetrySettings {
                max_retries,
                base_delay_ms,
                max_delay_ms: 60_000,
            },
            audit,
        )
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let audit = Arc::new(RecordingAudit::default());
        let runner = WorkflowRunner::new(
            RetrySettings {
                max_retries: 10,
                base_delay_ms: 1_000,
                max_delay_ms: 5_000,
            },
            audit,
        );
        assert_eq!(runner.backoff(1), Duration::from_secs(1));
        assert_eq!(runner.backoff(2), Duration::from_secs(2));
        assert_eq!(runner.backoff(3), Duration::from_secs(4));
        assert_eq!(runner.backoff(4), Duration::from_secs(5));
        assert_eq!(runner.backoff(40), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_twice_then_succeeds() {
        let audit = Arc::new(RecordingAudit::default());
        let runner = runner(3, 1_000, audit.clone());
        let calls = Arc::new(AtomicU32::new(0));

        let result = runner
            .run("flaky", &developer(), &Default::default(), |_| {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(GuardError::transient("upstream timeout"))
                    } else {
                        Ok(json!({"ok": true}))
                    }
                }
            })
            .await;

        assert_eq!(result.status, WorkflowStatus::Success);
        assert_eq!(result.retry_count, 2);
        assert_eq!(result.data, Some(json!({"ok": true})));
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        assert_eq!(
            audit.actions(),
            vec![
                actions::WORKFLOW_STARTED,
                actions::WORKFLOW_RETRY,
                actions::WORKFLOW_RETRY,
                actions::WORKFLOW_COMPLETED,
            ]
        );
        let completed = audit.last().unwrap();
        assert_eq!(completed.metadata["retry_count"], json!(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_exhausts_with_doubling_waits() {
        let audit = Arc::new(RecordingAudit::default());
        let runner = runner(3, 1_000, audit.clone());
        let calls = Arc::new(AtomicU32::new(0));

        let result = runner
            .run("always_down", &developer(), &Default::default(), |_| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(GuardError::transient("model unavailable"))
                }
            })
            .await;

        assert_eq!(result.status, WorkflowStatus::Failed);
        assert_eq!(result.retry_count, 3);
        assert_eq!(result.error_kind(), Some(ErrorKind::TransientFailure));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(result.duration_ms >= 7_000);

        let waits: Vec<_> = audit
            .with_action(actions::WORKFLOW_RETRY)
            .iter()
            .map(|e| e.metadata["wait_ms"].as_u64().unwrap())
            .collect();
        assert_eq!(waits, vec![1_000, 2_000, 4_000]);

        let failed = audit.with_action(actions::WORKFLOW_FAILED);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].severity, Severity::Error);
        assert_eq!(failed[0].metadata["error_kind"], json!("transient_failure"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_numbers_are_passed_in_order() {
        let audit = Arc::new(RecordingAudit::default());
        let runner = runner(2, 10, audit);
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));

        runner
            .run("numbered", &developer(), &Default::default(), |attempt| {
                let seen = seen.clone();
                async move {
                    seen.lock().unwrap().push(attempt);
                    Err(GuardError::transient("again"))
                }
            })
            .await;

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_non_retryable_kinds_fail_on_first_attempt() {
        for err in [
            GuardError::validation("code too short"),
            GuardError::security("forbidden pattern"),
            GuardError::fatal("missing daemon path"),
        ] {
            let audit = Arc::new(RecordingAudit::default());
            let runner = runner(3, 1_000, audit.clone());
            let calls = Arc::new(AtomicU32::new(0));
            let kind = err.kind();

            let result = runner
                .run("op", &developer(), &Default::default(), |_| {
                    let calls = calls.clone();
                    let err = err.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err(err)
                    }
                })
                .await;

            assert_eq!(result.status, WorkflowStatus::Failed);
            assert_eq!(result.retry_count, 0);
            assert_eq!(result.error_kind(), Some(kind));
            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert!(audit.with_action(actions::WORKFLOW_RETRY).is_empty());
        }
    }

    #[tokio::test]
    async fn test_fatal_failure_is_critical_and_tagged() {
        let audit = Arc::new(RecordingAudit::default());
        let runner = runner(3, 1_000, audit.clone());

        runner
            .run("op", &developer(), &Default::default(), |_| async {
                Err(GuardError::fatal("sandbox policy missing"))
            })
            .await;

        let failed = audit.with_action(actions::WORKFLOW_FAILED);
        assert_eq!(failed[0].severity, Severity::Critical);
        assert_eq!(failed[0].metadata["error_kind"], json!("fatal"));
    }

    #[tokio::test]
    async fn test_disabled_runner_executes_once_without_events() {
        let audit = Arc::new(RecordingAudit::default());
        let runner = runner(3, 1_000, audit.clone()).with_enabled(false);
        let calls = Arc::new(AtomicU32::new(0));

        let result = runner
            .run("op", &developer(), &Default::default(), |_| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(GuardError::transient("flaky"))
                }
            })
            .await;

        assert_eq!(result.status, WorkflowStatus::Failed);
        assert_eq!(result.retry_count, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(audit.is_empty());

        let ok = runner
            .run("op", &developer(), &Default::default(), |_| async { Ok(json!(1)) })
            .await;
        assert!(ok.is_success());
        assert!(audit.is_empty());
    }
}
