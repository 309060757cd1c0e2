//! Workflow outcome types.
//!
//! `WorkflowResult` is what `run_guarded` hands back to callers. Every
//! terminal outcome (success, denial, rejection, validation failure,
//! exhausted retries) is expressed as a value of this type; nothing unwinds
//! past the runner boundary.

use serde::{Deserialize, Serialize};

use crate::{
    audit::CorrelationId,
    error::{ErrorKind, GuardError},
};

/// Lifecycle state of one workflow invocation.
///
/// `Pending -> Running -> {Success | Retry -> Running | Failed}`. Only
/// `Success` and `Failed` ever appear in a returned result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    Running,
    Retry,
    Success,
    Failed,
}

/// The caller-visible error: a kind and a human-readable message, nothing more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&GuardError> for WorkflowError {
    fn from(err: &GuardError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Terminal result of a guarded operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult<T = serde_json::Value> {
    pub status: WorkflowStatus,
    pub correlation_id: CorrelationId,
    pub data: Option<T>,
    pub error: Option<WorkflowError>,
    /// Number of retries performed (attempts minus one on success).
    pub retry_count: u32,
    pub duration_ms: u64,
}

impl<T> WorkflowResult<T> {
    pub fn success(correlation_id: CorrelationId, data: T, retry_count: u32, duration_ms: u64) -> Self {
        Self {
            status: WorkflowStatus::Success,
            correlation_id,
            data: Some(data),
            error: None,
            retry_count,
            duration_ms,
        }
    }

    pub fn failed(
        correlation_id: CorrelationId,
        err: &GuardError,
        retry_count: u32,
        duration_ms: u64,
    ) -> Self {
        Self {
            status: WorkflowStatus::Failed,
            correlation_id,
            data: None,
            error: Some(err.into()),
            retry_count,
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == WorkflowStatus::Success
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}
