//! Structured payload validation.
//!
//! Checks a JSON object field by field against a list of [`FieldRule`]s and
//! returns the normalized object: numeric strings become numbers and
//! `"true"`/`"false"` become booleans. Fields without a rule pass through
//! unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use warden_contracts::error::{GuardError, GuardResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    List,
}

/// Constraints for one payload field.
///
/// `min`/`max` bound the value for numbers, the character count for strings
/// and the element count for lists. They are ignored for booleans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub allowed_values: Option<Vec<Value>>,
}

impl FieldRule {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            min: None,
            max: None,
            allowed_values: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn allowed<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

pub struct FieldValidator;

impl FieldValidator {
    /// Validate `payload` against `rules`.
    ///
    /// # Errors
    ///
    /// `Validation` naming the first offending field.
    pub fn validate(payload: &Value, rules: &[FieldRule]) -> GuardResult<Map<String, Value>> {
        let Value::Object(fields) = payload else {
            return Err(GuardError::validation("payload must be a JSON object"));
        };
        let mut out = fields.clone();

        for rule in rules {
            let value = match fields.get(&rule.name) {
                None | Some(Value::Null) if rule.required => {
                    return Err(GuardError::validation(format!("missing required field '{}'", rule.name)))
                }
                None | Some(Value::Null) => continue,
                Some(value) => value,
            };

            let normalized = coerce(rule, value)?;
            check_bounds(rule, &normalized)?;

            if let Some(allowed) = &rule.allowed_values {
                if !allowed.contains(&normalized) {
                    return Err(GuardError::validation(format!(
                        "field '{}' must be one of {}",
                        rule.name,
                        Value::Array(allowed.clone())
                    )));
                }
            }

            out.insert(rule.name.clone(), normalized);
        }

        Ok(out)
    }
}

fn coerce(rule: &FieldRule, value: &Value) -> GuardResult<Value> {
    let mismatch = || {
        GuardError::validation(format!(
            "field '{}' must be of type {:?}",
            rule.name, rule.field_type
        ))
    };

    match (rule.field_type, value) {
        (FieldType::String, Value::String(_))
        | (FieldType::Number, Value::Number(_))
        | (FieldType::Boolean, Value::Bool(_))
        | (FieldType::List, Value::Array(_)) => Ok(value.clone()),

        (FieldType::Number, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(mismatch),

        (FieldType::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(mismatch()),
        },

        _ => Err(mismatch()),
    }
}

fn check_bounds(rule: &FieldRule, value: &Value) -> GuardResult<()> {
    let (measure, what) = match value {
        Value::Number(n) => (n.as_f64(), "value"),
        Value::String(s) => (Some(s.chars().count() as f64), "length"),
        Value::Array(items) => (Some(items.len() as f64), "length"),
        _ => return Ok(()),
    };
    let Some(measure) = measure else {
        return Ok(());
    };

    if let Some(min) = rule.min {
        if measure < min {
            return Err(GuardError::validation(format!(
                "field '{}' {what} {measure} is below minimum {min}",
                rule.name
            )));
        }
    }
    if let Some(max) = rule.max {
        if measure > max {
            return Err(GuardError::validation(format!(
                "field '{}' {what} {measure} exceeds maximum {max}",
                rule.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use warden_contracts::error::ErrorKind;

    use super::{FieldRule, FieldType, FieldValidator};

    #[test]
    fn test_missing_required_field() {
        let rules = [FieldRule::new("title", FieldType::String).required()];
        let err = FieldValidator::validate(&json!({}), &rules).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn test_optional_field_may_be_absent() {
        let rules = [FieldRule::new("note", FieldType::String)];
        assert!(FieldValidator::validate(&json!({"other": 1}), &rules).is_ok());
    }

    #[test]
    fn test_numeric_string_is_coerced() {
        let rules = [FieldRule::new("score", FieldType::Number).required()];
        let out = FieldValidator::validate(&json!({"score": "8.5"}), &rules).unwrap();
        assert_eq!(out["score"], json!(8.5));
    }

    #[test]
    fn test_number_range() {
        let rules = [FieldRule::new("ecl_score", FieldType::Number)
            .required()
            .range(Some(0.0), Some(1.0))];
        assert!(FieldValidator::validate(&json!({"ecl_score": 1.5}), &rules).is_err());
        assert!(FieldValidator::validate(&json!({"ecl_score": -0.1}), &rules).is_err());
        assert!(FieldValidator::validate(&json!({"ecl_score": 1.0}), &rules).is_ok());
    }

    #[test]
    fn test_string_length_bounds() {
        let rules = [FieldRule::new("code", FieldType::String).range(Some(10.0), Some(20.0))];
        assert!(FieldValidator::validate(&json!({"code": "short"}), &rules).is_err());
        assert!(FieldValidator::validate(&json!({"code": "x".repeat(21)}), &rules).is_err());
        assert!(FieldValidator::validate(&json!({"code": "fn main() {}"}), &rules).is_ok());
    }

    #[test]
    fn test_allowed_values() {
        let rules = [FieldRule::new("status", FieldType::String)
            .required()
            .allowed(["draft", "review", "approved"])];
        assert!(FieldValidator::validate(&json!({"status": "invalid"}), &rules).is_err());
        assert!(FieldValidator::validate(&json!({"status": "review"}), &rules).is_ok());
    }

    #[test]
    fn test_type_mismatch() {
        let rules = [
            FieldRule::new("flag", FieldType::Boolean),
            FieldRule::new("tags", FieldType::List),
        ];
        assert!(FieldValidator::validate(&json!({"flag": "yes"}), &rules).is_err());
        assert!(FieldValidator::validate(&json!({"tags": "a,b"}), &rules).is_err());
        let out = FieldValidator::validate(&json!({"flag": "TRUE", "tags": ["a"]}), &rules).unwrap();
        assert_eq!(out["flag"], json!(true));
    }

    #[test]
    fn test_non_object_payload_rejected() {
        assert!(FieldValidator::validate(&json!([1, 2]), &[]).is_err());
    }
}
