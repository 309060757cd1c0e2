//! Cross-system actions awaiting materialization.

use serde::{Deserialize, Serialize};

/// One pending action pulled from the execution queue of an external system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedAction {
    /// Discriminant such as `"issue"`, `"pull_request"` or `"discussion"`.
    pub kind: String,
    /// Where the artifact should be created (repository, workspace, ...).
    pub target: String,
    pub title: String,
    pub description: String,
    pub priority: String,
}
