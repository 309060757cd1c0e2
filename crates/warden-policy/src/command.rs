//! Command policy validation.
//!
//! Three independent checks, each sufficient to reject:
//!
//! 1. forbidden patterns, matched case-insensitively against the command
//!    line (`program` and `args` joined by spaces)
//! 2. parent-directory traversal in any argument
//! 3. raw shell metacharacters anywhere in the command line
//!
//! Check 3 overlaps with several default patterns and stays regardless: the
//! base set [`SHELL_METACHARACTERS`] is fixed, and settings may only add to
//! it, so a trimmed configuration still cannot admit chaining or
//! substitution.

use std::path::{Component, Path};

use regex::Regex;
use tracing::warn;

use warden_contracts::{
    config::{CommandPolicySettings, SHELL_METACHARACTERS},
    error::{GuardError, GuardResult},
    sandbox::CommandSpec,
};

use crate::sanitizer::compile_patterns;

pub struct CommandValidator {
    patterns: Vec<(String, Regex)>,
    metacharacters: Vec<char>,
}

impl CommandValidator {
    /// # Errors
    ///
    /// `Fatal` if a configured pattern does not compile.
    pub fn from_settings(settings: &CommandPolicySettings) -> GuardResult<Self> {
        let mut metacharacters = SHELL_METACHARACTERS.to_vec();
        for c in &settings.extra_metacharacters {
            if !metacharacters.contains(c) {
                metacharacters.push(*c);
            }
        }
        Ok(Self {
            patterns: compile_patterns(&settings.forbidden_patterns)?,
            metacharacters,
        })
    }

    /// Validate `program` with `args`. Never executes anything.
    ///
    /// # Errors
    ///
    /// `SecurityViolation` naming the offending pattern, argument or
    /// character class.
    pub fn validate(&self, program: &str, args: &[String]) -> GuardResult<()> {
        let command_line = std::iter::once(program)
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");

        if let Some((pattern, _)) = self.patterns.iter().find(|(_, re)| re.is_match(&command_line)) {
            return Err(reject(&command_line, format!("forbidden pattern detected: {pattern}")));
        }

        if let Some(arg) = args.iter().find(|arg| has_traversal(arg)) {
            return Err(reject(&command_line, format!("path traversal detected in argument '{arg}'")));
        }

        if let Some(c) = command_line.chars().find(|c| self.metacharacters.contains(c)) {
            return Err(reject(
                &command_line,
                format!("shell metacharacter not allowed: {}", char_class(c)),
            ));
        }

        if command_line.contains('\0') {
            return Err(reject(&command_line, "null byte not allowed".to_string()));
        }

        Ok(())
    }

    pub fn validate_spec(&self, spec: &CommandSpec) -> GuardResult<()> {
        self.validate(&spec.program, &spec.args)
    }
}

fn reject(command_line: &str, reason: String) -> GuardError {
    warn!(command = %command_line.escape_debug(), reason = %reason, "command rejected");
    GuardError::security(reason)
}

fn has_traversal(arg: &str) -> bool {
    arg.contains("../")
        || arg.contains("/..")
        || arg.contains("..\\")
        || Path::new(arg)
            .components()
            .any(|c| matches!(c, Component::ParentDir))
}

fn char_class(c: char) -> String {
    match c {
        '&' => "ampersand".to_string(),
        '|' => "pipe".to_string(),
        ';' => "semicolon".to_string(),
        '$' => "dollar".to_string(),
        '`' => "backtick".to_string(),
        '\n' => "newline".to_string(),
        '\r' => "carriage return".to_string(),
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use warden_contracts::{
        config::CommandPolicySettings,
        error::ErrorKind,
        sandbox::CommandSpec,
    };

    use super::CommandValidator;

    fn validator() -> CommandValidator {
        CommandValidator::from_settings(&CommandPolicySettings::default()).unwrap()
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn rejection(program: &str, list: &[&str]) -> String {
        let err = validator().validate(program, &args(list)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SecurityViolation);
        err.to_string()
    }

    #[test]
    fn test_benign_command_is_accepted() {
        assert!(validator()
            .validate("python3", &args(&["script.py", "--verbose"]))
            .is_ok());
        assert!(validator()
            .validate("python3", &args(&["sync_daemon.py", "--sync-all", "--dry-run"]))
            .is_ok());
    }

    #[test]
    fn test_forbidden_patterns_are_rejected() {
        for (program, list) in [
            ("rm", vec!["-rf", "/"]),
            ("sudo", vec!["ls"]),
            ("chmod", vec!["777", "file"]),
            ("curl", vec!["http://example.com"]),
            ("wget", vec!["http://example.com"]),
            ("ssh", vec!["host"]),
            ("scp", vec!["a", "host:b"]),
            ("bash", vec!["-c", "id"]),
            ("echo", vec!["hi", ">/dev/null"]),
            ("echo", vec!["hi", "2>", "err.log"]),
            ("SUDO", vec!["ls"]),
        ] {
            let msg = rejection(program, &list);
            assert!(msg.contains("forbidden pattern"), "{program} {list:?}: {msg}");
        }
    }

    #[test]
    fn test_chaining_names_the_pattern() {
        let msg = rejection("ls", &["&&", "whoami"]);
        assert!(msg.contains("&&"), "{msg}");
    }

    #[test]
    fn test_traversal_is_rejected() {
        for arg in ["../../../etc/passwd", "data/..", "..", "a/../b"] {
            let msg = rejection("cat", &[arg]);
            assert!(msg.contains("path traversal"), "{arg}: {msg}");
        }
        assert!(validator().validate("cat", &args(&["notes..txt"])).is_ok());
    }

    #[test]
    fn test_metacharacters_rejected_even_without_patterns() {
        let bare = CommandValidator::from_settings(&CommandPolicySettings {
            forbidden_patterns: vec![],
            ..CommandPolicySettings::default()
        })
        .unwrap();

        for (arg, class) in [
            ("a;b", "semicolon"),
            ("a|b", "pipe"),
            ("a&b", "ampersand"),
            ("$HOME", "dollar"),
            ("`id`", "backtick"),
            ("a\nb", "newline"),
            ("a\rb", "carriage return"),
        ] {
            let err = bare.validate("echo", &args(&[arg])).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::SecurityViolation);
            assert!(err.to_string().contains(class), "{arg:?}: {err}");
        }
    }

    #[test]
    fn test_emptied_config_keeps_base_metacharacters() {
        let settings = crate::config::load_config_str(
            "[command_policy]\nforbidden_patterns = []\nextra_metacharacters = []\n",
        )
        .unwrap()
        .command_policy;
        let bare = CommandValidator::from_settings(&settings).unwrap();

        for arg in ["a;b", "$(id)", "x|y"] {
            let err = bare.validate("echo", &args(&[arg])).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::SecurityViolation, "{arg}");
        }
    }

    #[test]
    fn test_extra_metacharacters_extend_the_base_set() {
        let strict = CommandValidator::from_settings(&CommandPolicySettings {
            extra_metacharacters: vec!['<', '>'],
            ..CommandPolicySettings::default()
        })
        .unwrap();

        let err = strict.validate("sort", &args(&["<input"])).unwrap_err();
        assert!(err.to_string().contains("'<'"), "{err}");
        assert!(strict.validate("echo", &args(&["a;b"])).is_err());
        assert!(validator().validate("sort", &args(&["<input"])).is_ok());
    }

    #[test]
    fn test_pattern_list_is_evaded_by_unlisted_tools() {
        // Heuristic only: anything not on the list is allowed.
        assert!(validator().validate("python3", &args(&["-m", "http.server"])).is_ok());
        assert!(validator().validate("perl", &args(&["-e", "unlink 'x'"])).is_ok());
    }

    #[test]
    fn test_validate_spec_uses_program_and_args() {
        let spec = CommandSpec::new("python3").args(["daemon.py", "--sync"]);
        assert!(validator().validate_spec(&spec).is_ok());
        let bad = CommandSpec::new("python3").args(["daemon.py", ";", "id"]);
        assert!(validator().validate_spec(&bad).is_err());
    }
}
