//! Sandbox policy and command execution result types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Execution limits for external commands.
///
/// Loaded once at startup and read-only thereafter. `max_memory_mb` and
/// `network_isolation` are advisory: they are enforced by the surrounding
/// execution environment, not emulated in-process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxPolicy {
    /// Wall-clock ceiling, also the default per-command timeout.
    pub max_execution_secs: u64,
    pub max_memory_mb: u64,
    pub network_isolation: bool,
    /// Working directories must resolve under one of these when non-empty.
    pub allowed_read_paths: Vec<PathBuf>,
    pub allowed_write_paths: Vec<PathBuf>,
    pub allowed_domains: Vec<String>,
}

impl SandboxPolicy {
    pub fn max_execution(&self) -> Duration {
        Duration::from_secs(self.max_execution_secs)
    }
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        Self {
            max_execution_secs: 300,
            max_memory_mb: 512,
            network_isolation: true,
            allowed_read_paths: Vec::new(),
            allowed_write_paths: Vec::new(),
            allowed_domains: vec!["api.github.com".to_string(), "api.notion.com".to_string()],
        }
    }
}

/// A request to run one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Overrides the policy ceiling when set.
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// `program` followed by the space-joined arguments.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured outcome of a sandboxed command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxResult {
    pub success: bool,
    /// Process exit code, or `-1` on timeout, signal, or spawn failure.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub command_line: String,
    /// False when the command ran in the unchecked fallback mode.
    pub sandboxed: bool,
}
