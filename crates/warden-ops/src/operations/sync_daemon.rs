//! `run_sync_daemon`: runs the synchronization daemon under the sandbox.
//!
//! Payload: `{"args": ["--once", ...]}` (optional). The command line is
//! `<interpreter> <daemon_path> <args...>`; every part goes through the
//! command policy before anything is spawned.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use warden_contracts::{
    actor::Permission,
    audit::{actions, Severity},
    error::{GuardError, GuardResult},
    sandbox::CommandSpec,
};
use warden_core::traits::{CommandRunner, GuardedOperation, OperationContext};
use warden_policy::{FieldRule, FieldType, FieldValidator};

pub const RUN_SYNC_DAEMON: &str = "run_sync_daemon";

const MAX_ARGS: f64 = 32.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncDaemonSettings {
    pub interpreter: String,
    pub daemon_path: PathBuf,
    /// `None` uses the sandbox policy ceiling.
    pub timeout_secs: Option<u64>,
}

impl Default for SyncDaemonSettings {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            daemon_path: PathBuf::from("./sync_daemon.py"),
            timeout_secs: None,
        }
    }
}

pub struct SyncDaemonOperation {
    runner: Arc<dyn CommandRunner>,
    settings: SyncDaemonSettings,
}

impl SyncDaemonOperation {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: SyncDaemonSettings) -> Self {
        Self { runner, settings }
    }

    fn spec(&self, args: Vec<String>) -> CommandSpec {
        let mut spec = CommandSpec::new(self.settings.interpreter.clone())
            .arg(self.settings.daemon_path.display().to_string())
            .args(args);
        if let Some(secs) = self.settings.timeout_secs {
            spec = spec.timeout(Duration::from_secs(secs));
        }
        spec
    }
}

fn string_args(value: Option<&Value>) -> GuardResult<Vec<String>> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| GuardError::validation(format!("daemon argument {item} is not a string")))
        })
        .collect()
}

#[async_trait]
impl GuardedOperation for SyncDaemonOperation {
    fn name(&self) -> &str {
        RUN_SYNC_DAEMON
    }

    fn permission(&self) -> Permission {
        Permission::ExecuteCommands
    }

    fn rate_class(&self) -> Option<&str> {
        Some("commands")
    }

    /// A missing daemon is a deployment error, so it is `Fatal`. A timeout is
    /// `Transient`. A non-zero exit is reported in the returned data with
    /// `success: false`.
    async fn execute(&self, ctx: &OperationContext, payload: &Value) -> GuardResult<Value> {
        let rules = [FieldRule::new("args", FieldType::List).range(None, Some(MAX_ARGS))];
        let fields = FieldValidator::validate(payload, &rules)?;
        let args = string_args(fields.get("args"))?;

        if !self.settings.daemon_path.exists() {
            return Err(GuardError::fatal(format!(
                "sync daemon not found: {}",
                self.settings.daemon_path.display()
            )));
        }

        let spec = self.spec(args.clone());
        let result = self.runner.run(&spec).await?;

        info!(
            correlation_id = %ctx.correlation_id,
            exit_code = result.exit_code,
            timed_out = result.timed_out,
            "sync daemon finished"
        );

        let resource = self.settings.daemon_path.display().to_string();
        let mut event = ctx
            .event(actions::COMMAND_EXECUTED, resource)
            .with_meta("command_line", result.command_line.clone())
            .with_meta("exit_code", result.exit_code)
            .with_meta("timed_out", result.timed_out)
            .with_meta("sandboxed", result.sandboxed)
            .with_meta("args", args);

        if result.timed_out {
            let err = GuardError::transient(format!("sync daemon timed out: {}", result.command_line));
            ctx.audit
                .record(event.failed(&err).with_severity(Severity::Warning));
            return Err(err);
        }

        if !result.success {
            event.success = false;
            event = event
                .with_meta("stderr", result.stderr.clone())
                .with_severity(Severity::Warning);
        }
        ctx.audit.record(event);

        serde_json::to_value(&result)
            .map_err(|e| GuardError::fatal(format!("sandbox result is not serializable: {e}")))
    }
}
