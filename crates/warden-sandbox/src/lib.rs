//! # warden-sandbox
//!
//! Runs external commands under the command policy and the sandbox policy's
//! wall-clock ceiling.
//!
//! - The command is validated before anything is spawned. A rejection is
//!   returned as `SecurityViolation`.
//! - Output is captured, not streamed.
//! - On timeout the child is killed and reaped, and the result reports
//!   `timed_out = true`, `exit_code = -1`.
//! - A spawn failure (missing binary, bad working directory) comes back as
//!   an unsuccessful [`SandboxResult`], not an error.
//!
//! The executor records no audit events. The calling operation decides what
//! to log.

mod executor;

pub use executor::SandboxExecutor;
