//! Free-text sanitization and injection screening.
//!
//! `sanitize` is best-effort cleanup and never fails. `validate` is the hard
//! gate. `build_safe_text` composes a template from sanitized variables and
//! validates the composed result.
//!
//! The forbidden-phrase list is a heuristic. It catches the common phrasing
//! of instruction-override attempts and nothing more; paraphrase, homoglyphs
//! or token splitting get through.

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};
use tracing::warn;

use warden_contracts::{
    config::SanitizerSettings,
    error::{GuardError, GuardResult},
};

pub struct InputSanitizer {
    settings: SanitizerSettings,
    phrases: Vec<(String, Regex)>,
    validation_enabled: bool,
}

impl InputSanitizer {
    /// Compile the configured phrase list.
    ///
    /// # Errors
    ///
    /// `Fatal` if any phrase is not a valid regular expression.
    pub fn from_settings(settings: &SanitizerSettings) -> GuardResult<Self> {
        let phrases = compile_patterns(&settings.forbidden_phrases)?;
        Ok(Self {
            settings: settings.clone(),
            phrases,
            validation_enabled: true,
        })
    }

    /// With validation disabled, `validate` accepts everything. `sanitize`
    /// still runs.
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validation_enabled = enabled;
        self
    }

    pub fn settings(&self) -> &SanitizerSettings {
        &self.settings
    }

    /// Strip control characters, escape quoting characters, trim, and
    /// truncate to `max_sanitized_len` characters plus the marker.
    ///
    /// Idempotent: an already-escaped `\\` or `\"` pair is left alone, and a
    /// truncated result re-truncates to itself.
    pub fn sanitize(&self, text: &str) -> String {
        let stripped: String = text.chars().filter(|c| !c.is_control()).collect();
        let escaped = escape_quoting(&stripped);
        let trimmed = escaped.trim();

        let max = self.settings.max_sanitized_len;
        if trimmed.chars().count() <= max {
            return trimmed.to_string();
        }
        let mut out: String = trimmed.chars().take(max).collect();
        out.push_str(&self.settings.truncation_marker);
        out
    }

    /// Reject oversized text (`Validation`) or text matching a forbidden
    /// phrase (`SecurityViolation`).
    pub fn validate(&self, text: &str) -> GuardResult<()> {
        if !self.validation_enabled {
            return Ok(());
        }

        let len = text.chars().count();
        if len > self.settings.max_validated_len {
            return Err(GuardError::validation(format!(
                "input exceeds max length: {len} > {}",
                self.settings.max_validated_len
            )));
        }

        if let Some((pattern, _)) = self.phrases.iter().find(|(_, re)| re.is_match(text)) {
            warn!(pattern = %pattern, "forbidden phrase detected");
            return Err(GuardError::security(format!("forbidden pattern detected: {pattern}")));
        }

        Ok(())
    }

    /// Substitute sanitized `variables` into `{name}` placeholders of
    /// `template`, wrapping untrusted variables in the sentinel delimiters,
    /// then validate the composed text.
    ///
    /// `{{` and `}}` produce literal braces. A placeholder with no matching
    /// variable is a `Validation` error.
    pub fn build_safe_text(&self, template: &str, variables: &Map<String, Value>) -> GuardResult<String> {
        let (start, end) = &self.settings.delimiters;

        let mut rendered = Map::new();
        for (key, value) in variables {
            let mut text = self.render(value);
            if self.settings.untrusted_keys.iter().any(|k| k == key) {
                text = format!("{start}\n{text}\n{end}");
            }
            rendered.insert(key.clone(), Value::String(text));
        }

        let composed = substitute(template, &rendered)?;
        self.validate(&composed)?;
        Ok(composed)
    }

    fn render(&self, value: &Value) -> String {
        match value {
            Value::String(s) => self.sanitize(s),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => self.sanitize(s),
                    other => self.sanitize(&other.to_string()),
                })
                .collect::<Vec<_>>()
                .join(", "),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Compile case-insensitive patterns, keeping the source text for messages.
pub(crate) fn compile_patterns(patterns: &[String]) -> GuardResult<Vec<(String, Regex)>> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map(|re| (p.clone(), re))
                .map_err(|e| GuardError::fatal(format!("invalid pattern '{p}': {e}")))
        })
        .collect()
}

fn escape_quoting(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek() {
                Some(&next @ ('\\' | '"')) => {
                    chars.next();
                    out.push('\\');
                    out.push(next);
                }
                _ => out.push_str("\\\\"),
            },
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out
}

fn substitute(template: &str, variables: &Map<String, Value>) -> GuardResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for n in chars.by_ref() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    name.push(n);
                }
                if !closed {
                    return Err(GuardError::validation("unterminated placeholder in template"));
                }
                match variables.get(&name) {
                    Some(Value::String(s)) => out.push_str(s),
                    Some(other) => out.push_str(&other.to_string()),
                    None => {
                        return Err(GuardError::validation(format!(
                            "template references unknown variable '{name}'"
                        )))
                    }
                }
            }
            _ => out.push(c),
        }
    }
    Ok(out)
}
