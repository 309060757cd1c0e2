//! Startup configuration loading.
//!
//! Parses a [`GuardConfig`] from TOML and compiles every configured pattern
//! once, so a bad regular expression fails at startup rather than on the
//! first request that would have hit it.

use std::path::Path;

use tracing::{info, warn};

use warden_contracts::{
    config::GuardConfig,
    error::{GuardError, GuardResult},
};

use crate::{command::CommandValidator, sanitizer::InputSanitizer};

/// Parse `s` as a TOML `GuardConfig`. Missing keys take their defaults.
///
/// # Errors
///
/// `Fatal` if the TOML is malformed, does not match `GuardConfig`, or
/// contains a pattern that does not compile.
pub fn load_config_str(s: &str) -> GuardResult<GuardConfig> {
    let config: GuardConfig = toml::from_str(s)
        .map_err(|e| GuardError::fatal(format!("failed to parse guard configuration: {e}")))?;
    check(&config)?;
    Ok(config)
}

/// Read and parse the file at `path`.
///
/// # Errors
///
/// `Fatal` if the file cannot be read or fails [`load_config_str`].
pub fn load_config_file(path: &Path) -> GuardResult<GuardConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        GuardError::fatal(format!("failed to read configuration file '{}': {e}", path.display()))
    })?;
    let config = load_config_str(&contents)?;
    info!(path = %path.display(), "loaded guard configuration");
    Ok(config)
}

fn check(config: &GuardConfig) -> GuardResult<()> {
    InputSanitizer::from_settings(&config.sanitizer)?;
    CommandValidator::from_settings(&config.command_policy)?;

    if config.cache.max_entries == 0 && config.features.caching {
        warn!("cache.max_entries is 0; caching is effectively disabled");
    }
    if config.retry.base_delay_ms > config.retry.max_delay_ms {
        return Err(GuardError::fatal(format!(
            "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
            config.retry.base_delay_ms, config.retry.max_delay_ms
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use warden_contracts::{config::GuardConfig, error::ErrorKind};

    use super::{load_config_file, load_config_str};

    #[test]
    fn test_empty_document_yields_defaults() {
        assert_eq!(load_config_str("").unwrap(), GuardConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = load_config_str(
            r#"
            [features]
            caching = false

            [retry]
            max_retries = 5

            [rate_limits.limits]
            ai_prompts = 2
            "#,
        )
        .unwrap();

        assert!(!config.features.caching);
        assert!(config.features.authorization);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.base_delay_ms, 1_000);
        assert_eq!(config.rate_limits.limits.get("ai_prompts"), Some(&2));
        assert_eq!(config.rate_limits.window_secs, 3_600);
    }

    #[test]
    fn test_malformed_toml_is_fatal() {
        let err = load_config_str("[features\ncaching = ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fatal);
    }

    #[test]
    fn test_bad_pattern_is_fatal() {
        let err = load_config_str(
            r#"
            [command_policy]
            forbidden_patterns = ["(unclosed"]
            "#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert!(err.to_string().contains("(unclosed"));
    }

    #[test]
    fn test_inverted_retry_delays_are_fatal() {
        let err = load_config_str("[retry]\nbase_delay_ms = 10\nmax_delay_ms = 5\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fatal);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[sandbox]\nmax_execution_secs = 30").unwrap();

        let config = load_config_file(file.path()).unwrap();
        assert_eq!(config.sandbox.max_execution_secs, 30);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = load_config_file(std::path::Path::new("/nonexistent/warden.toml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fatal);
    }

    #[test]
    fn test_shipped_policy_file_parses() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../policies/warden.toml");
        let config = load_config_file(&path).unwrap();
        assert!(config.features.authorization);
    }
}
