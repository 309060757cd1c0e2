//! # warden-audit
//!
//! Append-only audit trail for the Warden guardrail engine.
//!
//! ## Overview
//!
//! [`AuditTrail`] implements [`AuditRecorder`](warden_core::traits::AuditRecorder).
//! Each recorded event is:
//!
//! 1. mirrored to `tracing` at a level matching its severity
//! 2. sent to the [`AlertChannel`] if it is critical or failed
//! 3. appended to an [`AuditSink`]
//!
//! Two sinks ship with the crate. [`InMemoryAuditSink`] keeps a SHA-256 hash
//! chain so tampering is detectable with `verify_integrity`.
//! [`JsonlAuditSink`] writes one JSON object per line to a file.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use warden_audit::{AuditTrail, InMemoryAuditSink};
//!
//! let sink = InMemoryAuditSink::new();
//! let trail = AuditTrail::new(Arc::new(sink.clone()));
//! trail.record(event);
//! assert!(sink.verify_integrity());
//! ```

pub mod alert;
pub mod chain;
pub mod jsonl;
pub mod memory;
pub mod sink;
pub mod trail;

pub use alert::{AlertChannel, TracingAlertChannel};
pub use chain::{hash_event, verify_chain, ChainedEvent, GENESIS_HASH};
pub use jsonl::JsonlAuditSink;
pub use memory::InMemoryAuditSink;
pub use sink::AuditSink;
pub use trail::AuditTrail;

// ── Tests ─────────────────────────────────────────────────────────────────────
