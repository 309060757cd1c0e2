//! # warden-ops
//!
//! The guarded reference operations and the [`Warden`] facade that wires
//! them to every guardrail service.
//!
//! ```rust,ignore
//! let warden = Warden::new(config, Arc::new(InMemoryAuditSink::new()), collaborators, Default::default())?;
//! let result = warden.run_guarded_for("review_code", &ActorId::new("user_002"), payload).await;
//! ```
//!
//! [`mock_data`] holds in-process collaborators and [`scenarios`] the
//! walk-throughs the demo binary runs.

pub mod mock_data;
pub mod operations;
pub mod scenarios;
pub mod warden;

pub use operations::{CacheKeyStrategy, SyncDaemonSettings};
pub use warden::{Collaborators, OperationSettings, Warden};
