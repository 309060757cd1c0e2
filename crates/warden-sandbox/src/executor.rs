use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

use warden_contracts::{
    error::{GuardError, GuardResult},
    sandbox::{CommandSpec, SandboxPolicy, SandboxResult},
};
use warden_core::traits::CommandRunner;
use warden_policy::CommandValidator;

const TIMEOUT_MESSAGE: &str = "Command timed out";

pub struct SandboxExecutor {
    policy: SandboxPolicy,
    validator: Arc<CommandValidator>,
    enabled: bool,
}

impl SandboxExecutor {
    pub fn new(policy: SandboxPolicy, validator: Arc<CommandValidator>) -> Self {
        Self {
            policy,
            validator,
            enabled: true,
        }
    }

    /// A disabled executor skips validation and the working-directory check
    /// and marks every result `sandboxed = false`.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn policy(&self) -> &SandboxPolicy {
        &self.policy
    }

    pub fn validator(&self) -> &CommandValidator {
        &self.validator
    }

    /// Canonicalize `dir` and require it under an allowed read path when any
    /// are configured.
    fn resolve_working_dir(&self, dir: &Path) -> GuardResult<PathBuf> {
        if dir.to_string_lossy().contains("..") {
            return Err(GuardError::security(format!(
                "path traversal in working directory '{}'",
                dir.display()
            )));
        }

        let canonical = dir.canonicalize().map_err(|e| {
            GuardError::validation(format!("invalid working directory '{}': {e}", dir.display()))
        })?;

        if self.policy.allowed_read_paths.is_empty() {
            return Ok(canonical);
        }

        let permitted = self
            .policy
            .allowed_read_paths
            .iter()
            .filter_map(|root| root.canonicalize().ok())
            .any(|root| canonical.starts_with(root));
        if permitted {
            Ok(canonical)
        } else {
            Err(GuardError::security(format!(
                "working directory '{}' is outside the allowed paths",
                canonical.display()
            )))
        }
    }

    /// Validate, spawn, and wait for `spec`.
    ///
    /// # Errors
    ///
    /// `SecurityViolation` if the command or working directory is rejected,
    /// `Validation` if the working directory does not exist. Process-level
    /// failures are reported inside the returned result.
    pub async fn execute(&self, spec: &CommandSpec) -> GuardResult<SandboxResult> {
        let command_line = spec.command_line();

        let working_dir = match (&spec.working_dir, self.enabled) {
            (Some(dir), true) => Some(self.resolve_working_dir(dir)?),
            (Some(dir), false) => Some(dir.clone()),
            (None, _) => None,
        };

        if self.enabled {
            self.validator.validate_spec(spec)?;
        } else {
            warn!(command = %command_line, "sandbox disabled; running without policy check");
        }

        let limit = spec.timeout.unwrap_or_else(|| self.policy.max_execution());
        info!(command = %command_line, timeout_ms = limit.as_millis() as u64, "executing command");

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &working_dir {
            cmd.current_dir(dir);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(command = %command_line, error = %e, "failed to spawn command");
                return Ok(self.result(&command_line, false, -1, String::new(), e.to_string(), false));
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let outcome = tokio::time::timeout(limit, async {
            tokio::join!(child.wait(), read_pipe(stdout), read_pipe(stderr))
        })
        .await;

        let result = match outcome {
            Ok((Ok(status), out, err)) => self.result(
                &command_line,
                status.success(),
                status.code().unwrap_or(-1),
                out,
                err,
                false,
            ),
            Ok((Err(e), out, _)) => {
                warn!(command = %command_line, error = %e, "failed to wait for command");
                self.result(&command_line, false, -1, out, e.to_string(), false)
            }
            Err(_) => {
                warn!(command = %command_line, timeout_ms = limit.as_millis() as u64, "command timed out; killing");
                if let Err(e) = child.kill().await {
                    warn!(command = %command_line, error = %e, "failed to kill timed-out command");
                }
                self.result(&command_line, false, -1, String::new(), TIMEOUT_MESSAGE.to_string(), true)
            }
        };

        debug!(
            command = %command_line,
            exit_code = result.exit_code,
            success = result.success,
            timed_out = result.timed_out,
            "command finished"
        );
        Ok(result)
    }

    fn result(
        &self,
        command_line: &str,
        success: bool,
        exit_code: i32,
        stdout: String,
        stderr: String,
        timed_out: bool,
    ) -> SandboxResult {
        SandboxResult {
            success,
            exit_code,
            stdout,
            stderr,
            timed_out,
            command_line: command_line.to_string(),
            sandboxed: self.enabled,
        }
    }
}

#[async_trait]
impl CommandRunner for SandboxExecutor {
    async fn run(&self, spec: &CommandSpec) -> GuardResult<SandboxResult> {
        self.execute(spec).await
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            debug!(error = %e, "output pipe closed with error");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(all(test, unix))]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use tempfile::TempDir;

    use warden_contracts::{
        config::CommandPolicySettings,
        error::ErrorKind,
        sandbox::{CommandSpec, SandboxPolicy},
    };
    use warden_policy::CommandValidator;

    use super::SandboxExecutor;

    fn executor(policy: SandboxPolicy) -> SandboxExecutor {
        let validator = CommandValidator::from_settings(&CommandPolicySettings::default()).unwrap();
        SandboxExecutor::new(policy, Arc::new(validator))
    }

    #[tokio::test]
    async fn test_captures_stdout_and_exit_code() {
        let result = executor(SandboxPolicy::default())
            .execute(&CommandSpec::new("echo").arg("hello"))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout.trim(), "hello");
        assert_eq!(result.command_line, "echo hello");
        assert!(result.sandboxed);
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_unsuccessful() {
        let result = executor(SandboxPolicy::default())
            .execute(&CommandSpec::new("false"))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let started = Instant::now();
        let result = executor(SandboxPolicy::default())
            .execute(
                &CommandSpec::new("sleep")
                    .arg("5")
                    .timeout(Duration::from_millis(100)),
            )
            .await
            .unwrap();

        assert!(result.timed_out);
        assert!(!result.success);
        assert_eq!(result.exit_code, -1);
        assert_eq!(result.stderr, "Command timed out");
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_policy_ceiling_is_default_timeout() {
        let policy = SandboxPolicy {
            max_execution_secs: 1,
            ..SandboxPolicy::default()
        };
        let result = executor(policy)
            .execute(&CommandSpec::new("sleep").arg("5"))
            .await
            .unwrap();
        assert!(result.timed_out);
    }

    #[tokio::test]
    async fn test_missing_binary_is_captured() {
        let result = executor(SandboxPolicy::default())
            .execute(&CommandSpec::new("definitely-not-a-real-binary-xyz"))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, -1);
        assert!(!result.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_forbidden_command_never_runs() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("ran");
        let marker_arg = marker.display().to_string();
        let err = executor(SandboxPolicy::default())
            .execute(&CommandSpec::new("touch").args([marker_arg.as_str(), ";", "id"]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SecurityViolation);
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_disabled_sandbox_skips_validation() {
        let result = executor(SandboxPolicy::default())
            .with_enabled(false)
            .execute(&CommandSpec::new("echo").arg("a;b"))
            .await
            .unwrap();
        assert!(result.success);
        assert!(!result.sandboxed);
        assert_eq!(result.stdout.trim(), "a;b");
    }

    #[tokio::test]
    async fn test_working_dir_must_be_under_allowed_paths() {
        let allowed = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let policy = SandboxPolicy {
            allowed_read_paths: vec![allowed.path().to_path_buf()],
            ..SandboxPolicy::default()
        };
        let exec = executor(policy);

        let ok = exec
            .execute(&CommandSpec::new("pwd").working_dir(allowed.path()))
            .await
            .unwrap();
        assert!(ok.success);

        let err = exec
            .execute(&CommandSpec::new("pwd").working_dir(other.path()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SecurityViolation);
    }

    #[tokio::test]
    async fn test_working_dir_traversal_rejected() {
        let dir = TempDir::new().unwrap();
        let err = executor(SandboxPolicy::default())
            .execute(&CommandSpec::new("pwd").working_dir(dir.path().join("..")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SecurityViolation);
    }
}
