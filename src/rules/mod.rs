//! Rule checkers: content policies applied to a file snapshot.

mod defaults;
mod forced_exit;
mod secrets;

pub use defaults::{DEFAULT_FORBIDDEN_KEYWORD, ForbiddenDefaultsChecker};
pub use forced_exit::ForcedExitChecker;
pub use secrets::SecretsChecker;

use thiserror::Error;

use crate::config::{self, Config, ConfigError};
use crate::decision::{ValidationOutcome, Violation};
use crate::logging::Logger;
use crate::matcher::{Pattern, find_matches};
use crate::snapshot::FileSnapshot;

/// Runtime failure of a single checker.
#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("{checker}: {source}")]
    Io {
        checker: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{checker}: {message}")]
    Failed {
        checker: &'static str,
        message: String,
    },
}

/// One content checker.
#[derive(Debug)]
pub enum RuleChecker {
    ForbiddenDefaults(ForbiddenDefaultsChecker),
    Secrets(SecretsChecker),
    ForcedExit(ForcedExitChecker),
}

impl RuleChecker {
    /// Build every enabled rule checker, in evaluation order. Any bad
    /// pattern aborts construction.
    pub fn from_config(config: &Config, log: &Logger) -> Result<Vec<Self>, ConfigError> {
        let mut checkers = Vec::new();
        if let Some(c) = config.checker(config::FORBIDDEN_DEFAULTS) {
            checkers.push(RuleChecker::ForbiddenDefaults(ForbiddenDefaultsChecker::new(
                c, log,
            )?));
        }
        if let Some(c) = config.checker(config::SECRETS) {
            checkers.push(RuleChecker::Secrets(SecretsChecker::new(c, log)?));
        }
        if let Some(c) = config.checker(config::FORCED_EXIT) {
            checkers.push(RuleChecker::ForcedExit(ForcedExitChecker::new(c, log)?));
        }
        Ok(checkers)
    }

    pub fn name(&self) -> &'static str {
        match self {
            RuleChecker::ForbiddenDefaults(_) => config::FORBIDDEN_DEFAULTS,
            RuleChecker::Secrets(_) => config::SECRETS,
            RuleChecker::ForcedExit(_) => config::FORCED_EXIT,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            RuleChecker::ForbiddenDefaults(c) => c.enabled(),
            RuleChecker::Secrets(c) => c.enabled(),
            RuleChecker::ForcedExit(c) => c.enabled(),
        }
    }

    pub fn evaluate(&self, snapshot: &FileSnapshot) -> Result<ValidationOutcome, CheckerError> {
        match self {
            RuleChecker::ForbiddenDefaults(c) => Ok(c.validate(snapshot)),
            RuleChecker::Secrets(c) => Ok(c.validate(snapshot)),
            RuleChecker::ForcedExit(c) => Ok(c.validate(snapshot)),
        }
    }
}

/// Compile a checker's `custom_patterns`.
fn compile_custom(sources: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    sources.iter().map(|s| Pattern::regex(s)).collect()
}

/// Critical violations for every custom pattern occurrence.
fn custom_violations(content: &str, patterns: &[Pattern]) -> Vec<Violation> {
    find_matches(content, patterns)
        .into_iter()
        .map(|m| {
            Violation::critical(
                "custom_pattern",
                format!("matched custom pattern '{}': {}", m.pattern, m.text),
            )
            .at(m.line, m.column)
        })
        .collect()
}

/// Configured `suggestion_message` first, then the built-in list.
fn suggestions_with(configured: Option<&str>, builtin: &[&str]) -> Vec<String> {
    configured
        .filter(|s| !s.is_empty())
        .into_iter()
        .chain(builtin.iter().copied())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_default_order() {
        let checkers = RuleChecker::from_config(&Config::default(), &Logger::default()).unwrap();
        let names: Vec<&str> = checkers.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["forbidden_defaults", "secrets", "forced_exit"]);
        assert!(checkers.iter().all(|c| c.enabled()));
    }

    #[test]
    fn test_from_config_skips_disabled() {
        let mut config = Config::default();
        config.checkers.get_mut("secrets").unwrap().enabled = false;
        let checkers = RuleChecker::from_config(&config, &Logger::default()).unwrap();
        assert!(checkers.iter().all(|c| c.name() != "secrets"));
    }

    #[test]
    fn test_bad_custom_pattern_fails_construction() {
        let mut config = Config::default();
        config
            .checkers
            .get_mut("forced_exit")
            .unwrap()
            .custom_patterns = vec!["(unclosed".to_string()];
        let err = RuleChecker::from_config(&config, &Logger::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Regex { .. }));
    }

    #[test]
    fn test_suggestions_with_configured_first() {
        let s = suggestions_with(Some("first"), &["a", "b"]);
        assert_eq!(s, vec!["first", "a", "b"]);
        assert_eq!(suggestions_with(Some(""), &["a"]), vec!["a"]);
    }
}
