//! Startup configuration types.
//!
//! Every struct here deserializes with `#[serde(default)]`, so a TOML file
//! only needs the keys it overrides. Loading lives in `warden-policy`; this
//! crate only defines the shapes and their defaults.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sandbox::SandboxPolicy;

/// Independent on/off switches for each guardrail. All default to `true`.
///
/// Turning a switch off is an explicit, audited bypass, never a silent
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub authorization: bool,
    pub audit_logging: bool,
    pub sandbox: bool,
    pub input_validation: bool,
    pub rate_limiting: bool,
    pub caching: bool,
    pub retry_handling: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            authorization: true,
            audit_logging: true,
            sandbox: true,
            input_validation: true,
            rate_limiting: true,
            caching: true,
            retry_handling: true,
        }
    }
}

impl FeatureFlags {
    /// Names of the guardrails that are switched off, excluding audit
    /// logging (which cannot audit its own absence).
    pub fn disabled_guardrails(&self) -> Vec<&'static str> {
        [
            ("authorization", self.authorization),
            ("sandbox", self.sandbox),
            ("input_validation", self.input_validation),
            ("rate_limiting", self.rate_limiting),
            ("caching", self.caching),
            ("retry_handling", self.retry_handling),
        ]
        .into_iter()
        .filter(|(_, on)| !on)
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    /// Upper bound on any single backoff wait.
    pub max_delay_ms: u64,
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub max_entries: usize,
    pub default_ttl_secs: u64,
}

impl CacheSettings {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: 500,
            default_ttl_secs: 1_800,
        }
    }
}

/// Per-class request budgets over one trailing window.
///
/// Classes missing from `limits` are never limited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub window_secs: u64,
    pub limits: BTreeMap<String, u32>,
}

impl RateLimitSettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        let limits = [("ai_prompts", 10), ("commands", 5), ("state_writes", 50)]
            .into_iter()
            .map(|(class, limit)| (class.to_string(), limit))
            .collect();
        Self {
            window_secs: 3_600,
            limits,
        }
    }
}

/// Default instruction-override and role-escalation phrasing.
pub const DEFAULT_FORBIDDEN_PHRASES: &[&str] = &[
    r"ignore\s+previous\s+instructions",
    r"disregard",
    r"system:",
    r"override",
    r"jailbreak",
    r"pretend\s+you\s+are",
    r"act\s+as\s+if",
    r"new\s+instructions",
    r"system\s+prompt",
    r"admin\s+mode",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerSettings {
    /// `sanitize` truncates beyond this many characters.
    pub max_sanitized_len: usize,
    /// `validate` rejects beyond this many characters.
    pub max_validated_len: usize,
    pub truncation_marker: String,
    /// Opening and closing sentinels around untrusted content.
    pub delimiters: (String, String),
    /// Template variables whose values are wrapped in `delimiters`.
    pub untrusted_keys: Vec<String>,
    /// Case-insensitive regular expressions.
    pub forbidden_phrases: Vec<String>,
}

impl Default for SanitizerSettings {
    fn default() -> Self {
        Self {
            max_sanitized_len: 10_000,
            max_validated_len: 8_000,
            truncation_marker: "... [truncated]".to_string(),
            delimiters: ("---START---".to_string(), "---END---".to_string()),
            untrusted_keys: ["code_content", "user_input", "stream_content"]
                .into_iter()
                .map(String::from)
                .collect(),
            forbidden_phrases: DEFAULT_FORBIDDEN_PHRASES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Default forbidden command patterns, grouped by what they catch.
pub const DEFAULT_COMMAND_PATTERNS: &[&str] = &[
    // destructive deletion
    r"\brm\s+-(?:rf|fr)\b",
    r"\bmkfs\b",
    // privilege escalation
    r"\bsudo\b",
    r"\bsu\s",
    // permission widening
    r"\bchmod\s+(?:-R\s+)?777\b",
    // output redirection
    r">\s*/dev/null",
    r"(?:^|\s)\d?>{1,2}",
    // chaining, piping, substitution
    r"&&",
    r"\|",
    r";",
    r"`",
    r"\$\(",
    // subshell invocation
    r"\b(?:ba|z|k|da)?sh\s+-c\b",
    // outbound network tools
    r"\bcurl\b",
    r"\bwget\b",
    r"\bssh\b",
    r"\bscp\b",
    r"\bnc\b",
];

/// Raw shell metacharacters the command validator always rejects. Settings
/// can extend this set but never shrink it.
pub const SHELL_METACHARACTERS: &[char] = &['&', '|', ';', '$', '`', '\n', '\r'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandPolicySettings {
    /// Case-insensitive regular expressions matched against the joined
    /// command line.
    pub forbidden_patterns: Vec<String>,
    /// Rejected in addition to [`SHELL_METACHARACTERS`].
    pub extra_metacharacters: Vec<char>,
}

impl Default for CommandPolicySettings {
    fn default() -> Self {
        Self {
            forbidden_patterns: DEFAULT_COMMAND_PATTERNS.iter().map(|p| p.to_string()).collect(),
            extra_metacharacters: Vec::new(),
        }
    }
}

/// The complete startup configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub features: FeatureFlags,
    pub retry: RetrySettings,
    pub cache: CacheSettings,
    pub rate_limits: RateLimitSettings,
    pub sandbox: SandboxPolicy,
    pub sanitizer: SanitizerSettings,
    pub command_policy: CommandPolicySettings,
}
