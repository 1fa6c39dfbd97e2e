//! Forbidden keyword and implicit default-value detection.
//!
//! Lines are checked top to bottom. Language constructs where "default" is
//! legitimate and comment lines are skipped; otherwise the first matching
//! rule wins and a line yields at most one violation:
//!
//! 1. the forbidden keyword as a whole word
//! 2. `||` followed by a literal (`x || "dev"`)
//! 3. `??` followed by a literal (`x ?? 10`)
//! 4. shell default substitution (`${PORT:-8080}`)

use once_cell::sync::Lazy;
use regex::Regex;

use super::{compile_custom, custom_violations, suggestions_with};
use crate::config::{CheckerConfig, ConfigError};
use crate::decision::{ValidationOutcome, Violation};
use crate::exceptions::{ExceptionRules, has_supported_extension};
use crate::logging::Logger;
use crate::matcher::{Pattern, column_of};
use crate::snapshot::FileSnapshot;

pub const DEFAULT_FORBIDDEN_KEYWORD: &str = "fallback";

const SUPPORTED_EXTENSIONS: &[&str] = &[".go", ".ts", ".js", ".tsx", ".jsx", ".py", ".sh", ".bash"];

const BUILTIN_EXCEPTIONS: &[&str] = &[
    "/test-config.",
    "/fixture",
    "/mock",
    "/stub",
    ".example",
    ".sample",
    ".template",
];

const SUGGESTIONS: &[&str] = &[
    "Remove implicit default values from the code",
    "Validate explicitly: if value == \"\" { return errors.New(\"value is required\") }",
    "Configuration errors must surface instead of being hidden behind default values",
];

static FUNCTION_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(func|fn|def|function)\b").expect("valid regex"));

/// A field tag such as `` `default:"80"` `` or `` `envDefault:"x"` ``.
static DEFAULT_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)`[^`]*default\w*:""#).expect("valid regex"));

static OR_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\|\|\s*["'`\d]"#).expect("valid regex"));

static NULLISH_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\?\?\s*["'`\d]"#).expect("valid regex"));

/// Blocks the forbidden keyword and literal defaults in executable source.
#[derive(Debug)]
pub struct ForbiddenDefaultsChecker {
    enabled: bool,
    keyword: Regex,
    exceptions: ExceptionRules,
    custom: Vec<Pattern>,
    suggestion_message: Option<String>,
    log: Logger,
}

impl ForbiddenDefaultsChecker {
    pub fn new(config: &CheckerConfig, log: &Logger) -> Result<Self, ConfigError> {
        let word = config
            .forbidden_keyword
            .as_deref()
            .filter(|w| !w.is_empty())
            .unwrap_or(DEFAULT_FORBIDDEN_KEYWORD);
        let source = if config.case_sensitive {
            format!(r"\b{}\b", regex::escape(word))
        } else {
            format!(r"(?i)\b{}\b", regex::escape(word))
        };
        let keyword = Regex::new(&source).map_err(|e| ConfigError::Regex {
            pattern: source.clone(),
            source: e,
        })?;

        Ok(Self {
            enabled: config.enabled,
            keyword,
            exceptions: ExceptionRules::compile(
                &config.exception_paths,
                &config.exception_files,
                BUILTIN_EXCEPTIONS,
            )?,
            custom: compile_custom(&config.custom_patterns)?,
            suggestion_message: config.suggestion_message.clone(),
            log: log.with("checker", crate::config::FORBIDDEN_DEFAULTS),
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

        let mut violations = self.find_violations(&snapshot.content);
        violations.extend(custom_violations(&snapshot.content, &self.custom));
        if violations.is_empty() {
            return ValidationOutcome::pass();
        }

        self.log
            .with("file", &snapshot.path)
            .with("violations", violations.len())
            .info("implicit defaults detected");
        ValidationOutcome::with_violations(
            violations,
            suggestions_with(self.suggestion_message.as_deref(), SUGGESTIONS),
        )
    }

    fn find_violations(&self, content: &str) -> Vec<Violation> {
        let mut violations = Vec::new();

        for (idx, line) in content.split('\n').enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || is_language_construct(trimmed) || is_comment(trimmed) {
                continue;
            }
            if let Some((violation, offset)) = self.check_line(line) {
                violations.push(violation.at(idx + 1, column_of(line, offset)));
            }
        }

        violations
    }

    /// First rule hit on `line`, with the byte offset of the offending text.
    fn check_line(&self, line: &str) -> Option<(Violation, usize)> {
        if let Some(m) = self.keyword.find(line) {
            return Some((
                Violation::critical(
                    "forbidden_keyword",
                    format!("Forbidden keyword '{}' in executable code", m.as_str()),
                )
                .with_suggestion("Use explicit validation instead of a default value"),
                m.start(),
            ));
        }
        if let Some(offset) = OR_LITERAL.find(line).map(|m| m.start()) {
            return Some((
                Violation::critical("or_default", "Default value via || with a literal")
                    .with_suggestion(
                        "Validate explicitly: if (!value) throw new Error('value is required')",
                    ),
                offset,
            ));
        }
        if let Some(offset) = NULLISH_LITERAL.find(line).map(|m| m.start()) {
            return Some((
                Violation::critical("nullish_default", "Default value via ?? with a literal")
                    .with_suggestion("Validate explicitly instead of nullish coalescing"),
                offset,
            ));
        }
        if let Some(offset) = line.find(":-").filter(|&i| line[i..].contains('}')) {
            return Some((
                Violation::critical("shell_default", "Shell default substitution ${VAR:-value}")
                    .with_suggestion("Check explicitly: if [ -z \"$VAR\" ]; then exit 1; fi"),
                offset,
            ));
        }
        None
    }
}

/// Switch/select default branches, field tags and `Default`-named functions.
fn is_language_construct(line: &str) -> bool {
    let lower = line.to_lowercase();
    if lower.contains("default:") {
        return true;
    }
    if DEFAULT_TAG.is_match(line) {
        return true;
    }
    FUNCTION_KEYWORD.is_match(line) && line.contains("Default")
}

fn is_comment(line: &str) -> bool {
    ["//", "#", "/*", "*"].iter().any(|p| line.starts_with(p))
}
