//! Model-response verifier.
//!
//! A response is checked twice. The JSON Schema document catches shape
//! errors; the semantic rules then catch what a schema expresses badly
//! (ranges over optional paths, substring bans, named custom checks).
//! Every failure from both passes is reported, not just the first.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use warden_contracts::{
    error::{GuardError, GuardResult},
    verify::{ResponseSchema, VerificationFailure, VerificationReport, VerificationRule, VerificationRuleType},
};

const SCHEMA_RULE_ID: &str = "json-schema";

/// Returns `Some(message)` when the check fails.
pub type CustomVerifierFn = Box<dyn Fn(&Value) -> Option<String> + Send + Sync>;

#[derive(Default)]
pub struct ResponseVerifier {
    named_checks: HashMap<String, CustomVerifierFn>,
}

impl ResponseVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `check` available to `Custom { function_name: name }` rules.
    /// Registering a name twice keeps the later check.
    pub fn register_rule(&mut self, name: impl Into<String>, check: CustomVerifierFn) {
        let name = name.into();
        debug!(rule = %name, "custom verification rule registered");
        self.named_checks.insert(name, check);
    }

    /// Parse model text as JSON and verify it.
    ///
    /// A surrounding Markdown code fence is tolerated.
    ///
    /// # Errors
    ///
    /// `Transient` when the text is not JSON or fails verification: model
    /// output is non-deterministic, so a retry can produce a valid response.
    pub fn verify_text(&self, text: &str, schema: &ResponseSchema) -> GuardResult<Value> {
        let value: Value = serde_json::from_str(strip_code_fence(text)).map_err(|e| {
            warn!(schema_id = %schema.schema_id, error = %e, "model response is not valid JSON");
            GuardError::transient(format!("model response is not valid JSON: {e}"))
        })?;

        let report = self.verify(&value, schema);
        if !report.passed {
            return Err(GuardError::transient(format!(
                "model response failed verification: {}",
                report.summary()
            )));
        }
        Ok(value)
    }

    /// Run the structural pass and then every semantic rule.
    pub fn verify(&self, payload: &Value, schema: &ResponseSchema) -> VerificationReport {
        let mut failures = structural_failures(payload, &schema.json_schema);

        failures.extend(schema.rules.iter().filter_map(|rule| {
            let message = self.check_rule(rule, payload)?;
            Some(VerificationFailure {
                rule_id: rule.rule_id.clone(),
                message,
            })
        }));

        for failure in &failures {
            warn!(schema_id = %schema.schema_id, rule_id = %failure.rule_id, message = %failure.message, "verification failure");
        }
        debug!(schema_id = %schema.schema_id, failures = failures.len(), "response verified");

        VerificationReport {
            passed: failures.is_empty(),
            failures,
        }
    }

    fn check_rule(&self, rule: &VerificationRule, payload: &Value) -> Option<String> {
        match &rule.rule_type {
            VerificationRuleType::RequiredField { field_path } => lookup(payload, field_path)
                .is_none()
                .then(|| format!("'{field_path}' is required but missing or null")),

            VerificationRuleType::AllowedValues { field_path, allowed } => match lookup(payload, field_path) {
                Some(actual) if allowed.contains(actual) => None,
                Some(actual) => Some(format!("'{field_path}' = {actual} is not an allowed value")),
                None => Some(format!("'{field_path}' is missing; expected one of the allowed values")),
            },

            VerificationRuleType::NumberRange { field_path, min, max } => {
                let Some(actual) = lookup(payload, field_path) else {
                    return Some(format!("'{field_path}' is missing; expected a number in [{min}, {max}]"));
                };
                match actual.as_f64() {
                    Some(n) if (*min..=*max).contains(&n) => None,
                    Some(n) => Some(format!("'{field_path}' = {n} is outside [{min}, {max}]")),
                    None => Some(format!("'{field_path}' is not a number")),
                }
            }

            // Only string values can contain the pattern; anything else passes.
            VerificationRuleType::ForbiddenPattern { field_path, pattern } => lookup(payload, field_path)
                .and_then(Value::as_str)
                .filter(|text| text.contains(pattern.as_str()))
                .map(|_| format!("'{field_path}' contains forbidden text '{pattern}'")),

            VerificationRuleType::Custom { function_name } => match self.named_checks.get(function_name) {
                Some(check) => check(payload),
                None => Some(format!("custom rule '{function_name}' is not registered")),
            },
        }
    }
}

/// Follow a dot-separated path. `None` when a segment is missing or null.
fn lookup<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.')
        .try_fold(root, |node, segment| node.get(segment).filter(|v| !v.is_null()))
}

/// JSON Schema violations as failures. A null schema imposes nothing; a
/// schema that does not compile is itself one failure.
fn structural_failures(payload: &Value, json_schema: &Value) -> Vec<VerificationFailure> {
    if json_schema.is_null() {
        return Vec::new();
    }
    let failure = |message: String| VerificationFailure {
        rule_id: SCHEMA_RULE_ID.to_string(),
        message,
    };
    match jsonschema::validator_for(json_schema) {
        Ok(validator) => validator
            .iter_errors(payload)
            .map(|error| failure(format!("schema violation at '{}': {error}", error.instance_path)))
            .collect(),
        Err(e) => vec![failure(format!("schema document does not compile: {e}"))],
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
