//! Built-in response schemas.

use serde_json::json;

use warden_contracts::verify::{ResponseSchema, VerificationRule, VerificationRuleType};

/// A code review must carry a numeric `ecl_score` in `[0, 1]` and a textual
/// `overall_assessment`. Per-dimension scores are optional.
pub fn code_review_schema() -> ResponseSchema {
    ResponseSchema {
        schema_id: "code-review-v1".to_string(),
        json_schema: json!({
            "type": "object",
            "properties": {
                "ecl_score": { "type": "number" },
                "overall_assessment": { "type": "string" },
                "functionality_score": { "type": "number" },
                "code_quality_score": { "type": "number" },
                "security_score": { "type": "number" },
                "performance_score": { "type": "number" },
                "recommended_status": { "type": "string" }
            },
            "required": ["ecl_score", "overall_assessment"]
        }),
        rules: vec![VerificationRule {
            rule_id: "ecl-score-range".to_string(),
            description: "ecl_score must lie in [0.0, 1.0]".to_string(),
            rule_type: VerificationRuleType::NumberRange {
                field_path: "ecl_score".to_string(),
                min: 0.0,
                max: 1.0,
            },
        }],
    }
}
