//! The guarded reference operations.
//!
//! | Operation             | Permission          | Rate class     | Cached |
//! |-----------------------|---------------------|----------------|--------|
//! | `review_code`         | `RunModelPrompts`   | `ai_prompts`   | yes    |
//! | `run_sync_daemon`     | `ExecuteCommands`   | `commands`     | no     |
//! | `materialize_actions` | `ModifyState`       | `state_writes` | no     |

pub mod code_review;
pub mod queued_actions;
pub mod sync_daemon;

pub use code_review::{CacheKeyStrategy, CodeReviewOperation, REVIEW_CODE};
pub use queued_actions::{MaterializeActionsOperation, MATERIALIZE_ACTIONS};
pub use sync_daemon::{SyncDaemonOperation, SyncDaemonSettings, RUN_SYNC_DAEMON};
