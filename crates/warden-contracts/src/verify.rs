//! Model-response verification schema and report types.
//!
//! A model's raw text is untrusted. Before a guarded operation returns it,
//! the text is parsed and checked against a `ResponseSchema`: a JSON Schema
//! document for structure plus semantic rules JSON Schema cannot express
//! conveniently.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything a response is checked against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSchema {
    /// Unique identifier for this schema (e.g. "code-review-v1").
    pub schema_id: String,
    /// JSON Schema document. `Value::Null` means no structural constraint.
    pub json_schema: Value,
    /// Semantic rules evaluated after structural validation.
    pub rules: Vec<VerificationRule>,
}

/// A single verification rule applied to a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRule {
    /// Identifier referenced in failure reports.
    pub rule_id: String,
    pub description: String,
    pub rule_type: VerificationRuleType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VerificationRuleType {
    /// The field at `field_path` (dot notation) must be present and non-null.
    RequiredField { field_path: String },

    /// The field at `field_path` must equal one of `allowed`.
    AllowedValues { field_path: String, allowed: Vec<Value> },

    /// The field at `field_path` must be a number within `[min, max]`.
    NumberRange { field_path: String, min: f64, max: f64 },

    /// A string field at `field_path` must not contain `pattern`.
    ForbiddenPattern { field_path: String, pattern: String },

    /// Delegate to a function registered with the verifier by name.
    Custom { function_name: String },
}

/// The result of running every rule in a `ResponseSchema`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    /// True only if all rules passed.
    pub passed: bool,
    /// Every failure collected during the run. Empty on pass.
    pub failures: Vec<VerificationFailure>,
}

impl VerificationReport {
    /// `[rule] message; [rule] message` summary for errors and audit records.
    pub fn summary(&self) -> String {
        self.failures
            .iter()
            .map(|f| format!("[{}] {}", f.rule_id, f.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationFailure {
    pub rule_id: String,
    pub message: String,
}
