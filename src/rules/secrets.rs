//! Hardcoded credential detection.

use super::{compile_custom, custom_violations, suggestions_with};
use crate::config::{CheckerConfig, ConfigError};
use crate::decision::{ValidationOutcome, Violation};
use crate::exceptions::{ExceptionRules, PathRules, has_supported_extension};
use crate::logging::Logger;
use crate::matcher::{Pattern, find_matches};
use crate::snapshot::FileSnapshot;

const JWT_PATTERN: &str = r"eyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+";
const WALLET_PATTERN: &str = r"0x[a-fA-F0-9]{40}";
const API_KEY_PATTERN: &str = r"(sk_|pk_|api_key_|access_token_)[a-zA-Z0-9]{20,}";

const SUPPORTED_EXTENSIONS: &[&str] = &[
    ".go", ".ts", ".js", ".tsx", ".jsx", ".py", ".json", ".yaml", ".yml", ".sh", ".bash", ".toml",
];

const BUILTIN_EXCEPTIONS: &[&str] = &[
    "/example",
    "/sample",
    "/template",
    "/demo",
    ".example",
    ".sample",
    ".template",
    "/fixtures/",
    "/mocks/",
    "/stubs/",
];

const GO_SUGGESTIONS: &[&str] = &[
    "Read secrets with os.Getenv()",
    "Validate required environment variables at startup",
    "Keep settings in one config package instead of scattered literals",
];

const JS_SUGGESTIONS: &[&str] = &[
    "Read secrets from process.env.VARIABLE_NAME",
    "Put test-only values in a test-config file",
    "Use shared test account constants instead of literal values",
];

const PY_SUGGESTIONS: &[&str] = &[
    "Read secrets with os.environ[\"VARIABLE_NAME\"]",
    "Fail at startup when a required variable is missing",
];

const CONFIG_SUGGESTIONS: &[&str] = &[
    "Use environment variable substitution",
    "Keep separate configurations for test, dev and prod",
    "Document every required environment variable",
];

const GENERIC_SUGGESTIONS: &[&str] = &[
    "Never commit real secrets to the repository",
    "Use .env files for local development and add them to .gitignore",
    "Consider a secret manager such as Vault or AWS Secrets Manager",
    "Keep fixed test data in dedicated fixture files",
];

/// One credential category.
#[derive(Debug)]
struct SecretKind {
    kind: &'static str,
    message: &'static str,
    suggestion: &'static str,
    pattern: Pattern,
}

/// Blocks JWTs, wallet addresses and API keys written into files.
#[derive(Debug)]
pub struct SecretsChecker {
    enabled: bool,
    kinds: Vec<SecretKind>,
    exceptions: ExceptionRules,
    test_config: PathRules,
    custom: Vec<Pattern>,
    suggestion_message: Option<String>,
    log: Logger,
}

impl SecretsChecker {
    pub fn new(config: &CheckerConfig, log: &Logger) -> Result<Self, ConfigError> {
        let pattern = |configured: &Option<String>, builtin: &str| {
            Pattern::regex(configured.as_deref().filter(|p| !p.is_empty()).unwrap_or(builtin))
        };
        let kinds = vec![
            SecretKind {
                kind: "hardcoded_jwt",
                message: "Hardcoded JWT token",
                suggestion: "Load tokens from environment variables or a test config",
                pattern: pattern(&config.jwt_pattern, JWT_PATTERN)?,
            },
            SecretKind {
                kind: "hardcoded_wallet",
                message: "Hardcoded wallet address",
                suggestion: "Load addresses from environment variables or shared test accounts",
                pattern: pattern(&config.wallet_pattern, WALLET_PATTERN)?,
            },
            SecretKind {
                kind: "hardcoded_api_key",
                message: "Hardcoded API key",
                suggestion: "Load API keys from environment variables or a config file",
                pattern: pattern(&config.api_key_pattern, API_KEY_PATTERN)?,
            },
        ];

        Ok(Self {
            enabled: config.enabled,
            kinds,
            exceptions: ExceptionRules::compile(
                &config.exception_paths,
                &config.exception_files,
                BUILTIN_EXCEPTIONS,
            )?,
            test_config: PathRules::compile(&config.test_config_exceptions)?,
            custom: compile_custom(&config.custom_patterns)?,
            suggestion_message: config.suggestion_message.clone(),
            log: log.with("checker", crate::config::SECRETS),
        })
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn validate(&self, snapshot: &FileSnapshot) -> ValidationOutcome {
        if !self.enabled {
            return ValidationOutcome::pass();
        }
        if self.exceptions.is_exempt(&snapshot.path, &self.log) {
            return ValidationOutcome::pass();
        }
        if !has_supported_extension(&snapshot.path, SUPPORTED_EXTENSIONS) {
            self.log
                .with("file", &snapshot.path)
                .debug("file type not supported, skipping");
            return ValidationOutcome::pass();
        }

        let mut violations = Vec::new();
        for kind in &self.kinds {
            violations.extend(self.check_kind(kind, snapshot));
        }
        violations.extend(custom_violations(&snapshot.content, &self.custom));
        if violations.is_empty() {
            return ValidationOutcome::pass();
        }

        self.log
            .with("file", &snapshot.path)
            .with("violations", violations.len())
            .info("secrets detected in code");
        ValidationOutcome::with_violations(violations, self.suggestions(&snapshot.extension))
    }

    fn check_kind(&self, kind: &SecretKind, snapshot: &FileSnapshot) -> Vec<Violation> {
        let matches = find_matches(&snapshot.content, std::slice::from_ref(&kind.pattern));
        if matches.is_empty() {
            return Vec::new();
        }
        if let Some(rule) = self.test_config.find(&snapshot.path) {
            self.log
                .with("file", &snapshot.path)
                .with("exception", rule.as_str())
                .debug(format!("{} in test config, skipping", kind.kind));
            return Vec::new();
        }
        matches
            .into_iter()
            .map(|m| {
                Violation::critical(kind.kind, kind.message)
                    .with_suggestion(kind.suggestion)
                    .at(m.line, m.column)
            })
            .collect()
    }

    fn suggestions(&self, extension: &str) -> Vec<String> {
        let specific: &[&str] = match extension {
            ".go" => GO_SUGGESTIONS,
            ".ts" | ".js" | ".tsx" | ".jsx" => JS_SUGGESTIONS,
            ".py" => PY_SUGGESTIONS,
            ".json" | ".yaml" | ".yml" | ".toml" => CONFIG_SUGGESTIONS,
            _ => &[],
        };
        let mut suggestions = suggestions_with(self.suggestion_message.as_deref(), specific);
        suggestions.extend(GENERIC_SUGGESTIONS.iter().map(|s| s.to_string()));
        suggestions
    }
}
