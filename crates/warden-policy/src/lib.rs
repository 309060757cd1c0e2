//! # warden-policy
//!
//! Everything that decides whether a request may proceed:
//!
//! - [`tables`]: the fixed role → permission grants
//! - [`AuthorizationGuard`]: RBAC check that audits its own denials
//! - [`InputSanitizer`]: free-text cleanup and injection screening
//! - [`CommandValidator`]: forbidden-pattern, traversal and metacharacter
//!   checks for external commands
//! - [`FieldValidator`]: typed checks for structured payloads
//! - [`config`]: TOML loading of [`GuardConfig`](warden_contracts::config::GuardConfig)
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use warden_policy::config::load_config_file;
//!
//! let config = load_config_file(Path::new("policies/warden.toml"))?;
//! let sanitizer = InputSanitizer::from_settings(&config.sanitizer)?;
//! ```
//!
//! The phrase and command pattern lists are heuristics. They are configured
//! as data and tested against known evasions; they do not claim to be
//! complete.

pub mod command;
pub mod config;
pub mod guard;
pub mod input;
pub mod sanitizer;
pub mod tables;

pub use command::CommandValidator;
pub use guard::AuthorizationGuard;
pub use input::{FieldRule, FieldType, FieldValidator};
pub use sanitizer::InputSanitizer;
