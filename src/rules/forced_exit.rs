//! Forced process termination in library code.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{compile_custom, custom_violations, suggestions_with};
use crate::config::{CheckerConfig, ConfigError};
use crate::decision::{ValidationOutcome, Violation};
use crate::exceptions::{ExceptionRules, PathRules};
use crate::logging::Logger;
use crate::matcher::{Pattern, find_matches};
use crate::snapshot::FileSnapshot;

const EXIT_PATTERNS: &[&str] = &[
    r"\bpanic\s*\(",
    r"log\.Fatal\s*\(",
    r"log\.Fatalf\s*\(",
    r"log\.Fatalln\s*\(",
    r"os\.Exit\s*\(",
];

/// Entrypoints, examples and benchmarks may terminate the process.
const BUILTIN_EXCEPTIONS: &[&str] = &[
    "/cmd/",
    "/main.go",
    "/examples/",
    "/demo/",
    "/benchmark/",
    "_bench.go",
];

const SUGGESTIONS: &[&str] = &[
    "Return errors from functions: func() error { return fmt.Errorf(...) }",
    "Handle errors gracefully at the application boundary",
    "Accept a context.Context so callers can cancel operations",
    "Reserve defer recover() for the few places that truly need it",
    "Document the errors a function can return",
];

const RECOVER_SUGGESTIONS: &[&str] = &[
    "If recover() is used, make sure the architecture really requires it",
    "Consider returning errors instead of recovering from panics",
];

const MAIN_SUGGESTIONS: &[&str] = &[
    "Inside main() a fatal log is acceptable for initialization errors",
    "For CLI applications prefer commands that return errors",
];

static RECOVER_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"recover\s*\(\s*\)").expect("valid regex"));
static MAIN_FUNC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"func\s+main\s*\(\s*\)").expect("valid regex"));

/// Which termination family a match belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitFamily {
    Panic,
    LogFatal,
    ProcessExit,
}

impl ExitFamily {
    fn of(text: &str) -> Self {
        if text.contains("panic") {
            ExitFamily::Panic
        } else if text.contains("Fatal") {
            ExitFamily::LogFatal
        } else {
            ExitFamily::ProcessExit
        }
    }

    fn kind(self) -> &'static str {
        match self {
            ExitFamily::Panic => "panic_usage",
            ExitFamily::LogFatal => "log_fatal_usage",
            ExitFamily::ProcessExit => "process_exit_usage",
        }
    }

    fn message(self) -> &'static str {
        match self {
            ExitFamily::Panic => "panic in production code is forbidden",
            ExitFamily::LogFatal => "Fatal logging terminates the process from production code",
            ExitFamily::ProcessExit => "Forced process exit in production code",
        }
    }

    fn suggestion(self) -> &'static str {
        match self {
            ExitFamily::Panic => "Return fmt.Errorf(\"...: %w\", err) instead of panicking",
            ExitFamily::LogFatal => "Log with logger.Error() and shut down gracefully",
            ExitFamily::ProcessExit => "Propagate the error to the caller instead of exiting",
        }
    }
}

/// Blocks panics, fatal logs and exits outside entrypoints and tests.
#[derive(Debug)]
pub struct ForcedExitChecker {
    enabled: bool,
    only_extension: Option<String>,
    patterns: Vec<Pattern>,
    exceptions: ExceptionRules,
    test_exceptions: PathRules,
    custom: Vec<Pattern>,
    suggestion_message: Option<String>,
    log: Logger,
}

impl ForcedExitChecker {
    pub fn new(config: &CheckerConfig, log: &Logger) -> Result<Self, ConfigError> {
        let patterns = EXIT_PATTERNS
            .iter()
            .map(|p| Pattern::regex(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enabled: config.enabled,
            only_extension: config
                .only_extension
                .as_deref()
                .filter(|e| !e.is_empty())
                .map(normalize_extension),
            patterns,
            exceptions: ExceptionRules::compile(
                &config.exception_paths,
                &config.exception_files,
                BUILTIN_EXCEPTIONS,
            )?,
            test_exceptions: PathRules::compile(&config.test_exceptions)?,
            custom: compile_custom(&config.custom_patterns)?,
            suggestion_message: config.suggestion_message.clone(),
            log: log.with("checker", crate::config::FORCED_EXIT),
        })
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn validate(&self, snapshot: &FileSnapshot) -> ValidationOutcome {
        if !self.enabled {
            return ValidationOutcome::pass();
        }
        let log = self.log.with("file", &snapshot.path);

        if let Some(ext) = &self.only_extension
            && snapshot.extension != *ext
        {
            log.debug(format!("not a {ext} file, skipping"));
            return ValidationOutcome::pass();
        }
        if snapshot.is_test {
            log.debug("test file, skipping");
            return ValidationOutcome::pass();
        }
        if let Some(rule) = self.test_exceptions.find(&snapshot.path) {
            log.with("exception", rule.as_str())
                .debug("file matched test exception");
            return ValidationOutcome::pass();
        }
        if self.exceptions.is_exempt(&snapshot.path, &self.log) {
            return ValidationOutcome::pass();
        }

        let mut violations: Vec<Violation> = find_matches(&snapshot.content, &self.patterns)
            .into_iter()
            .map(|m| {
                let family = ExitFamily::of(&m.text);
                Violation::critical(family.kind(), family.message())
                    .with_suggestion(family.suggestion())
                    .at(m.line, m.column)
            })
            .collect();
        violations.extend(custom_violations(&snapshot.content, &self.custom));

        let suggestions = self.suggestions(&snapshot.content, !violations.is_empty());
        if !violations.is_empty() {
            log.with("violations", violations.len())
                .info("forced exit detected in production code");
        }
        ValidationOutcome::with_violations(violations, suggestions)
    }

    /// General advice only accompanies violations; the recover and main
    /// hints are added whenever the content has those constructs.
    fn suggestions(&self, content: &str, has_violations: bool) -> Vec<String> {
        let mut suggestions = if has_violations {
            suggestions_with(self.suggestion_message.as_deref(), SUGGESTIONS)
        } else {
            Vec::new()
        };
        if RECOVER_CALL.is_match(content) {
            suggestions.extend(RECOVER_SUGGESTIONS.iter().map(|s| s.to_string()));
        }
        if MAIN_FUNC.is_match(content) {
            suggestions.extend(MAIN_SUGGESTIONS.iter().map(|s| s.to_string()));
        }
        suggestions
    }
}

fn normalize_extension(ext: &str) -> String {
    let lower = ext.to_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{lower}")
    }
}
