//! # warden-verify
//!
//! Checks untrusted model output before a guarded operation returns it.
//!
//! ```rust,ignore
//! use warden_verify::{code_review_schema, ResponseVerifier};
//!
//! let verifier = ResponseVerifier::new();
//! let review = verifier.verify_text(&model_text, &code_review_schema())?;
//! ```

pub mod engine;
pub mod schemas;

pub use engine::{CustomVerifierFn, ResponseVerifier};
pub use schemas::code_review_schema;
