//! Violation, checker outcome and decision types.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

use crate::input::ToolInvocationEvent;

/// How serious a single violation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// The highest severity present, `Info` when there are no violations.
    pub fn highest(violations: &[Violation]) -> Self {
        violations
            .iter()
            .map(|v| v.severity)
            .max()
            .unwrap_or(Severity::Info)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("info"),
            Severity::Warning => f.write_str("warning"),
            Severity::Critical => f.write_str("critical"),
        }
    }
}

/// The verdict handed back to the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Warn,
    Block,
}

impl Action {
    /// `block` iff any violation is critical, else `warn` iff any is a
    /// warning, else `allow`.
    pub fn from_violations(violations: &[Violation]) -> Self {
        match Severity::highest(violations) {
            Severity::Critical => Action::Block,
            Severity::Warning => Action::Warn,
            Severity::Info => Action::Allow,
        }
    }

    /// Process exit code surfaced to the caller.
    pub fn exit_code(self) -> u8 {
        match self {
            Action::Allow => 0,
            Action::Warn | Action::Block => 2,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Allow => f.write_str("allow"),
            Action::Warn => f.write_str("warn"),
            Action::Block => f.write_str("block"),
        }
    }
}

/// One detected rule breach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Type tag, e.g. `hardcoded_jwt`.
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub suggestion: String,
    pub severity: Severity,
    /// 1-based line, 0 when the violation has no location.
    pub line: usize,
    /// 1-based column, 0 when the violation has no location.
    pub column: usize,
}

impl Violation {
    pub fn new(kind: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            suggestion: String::new(),
            severity,
            line: 0,
            column: 0,
        }
    }

    pub fn critical(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Critical, message)
    }

    pub fn info(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Info, message)
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = suggestion.into();
        self
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = line;
        self.column = column;
        self
    }
}

/// Result of running one checker against one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationOutcome {
    pub violations: Vec<Violation>,
    pub suggestions: Vec<String>,
    /// Replacement for the event, set only by tool checkers that rewrite it.
    pub modified_event: Option<ToolInvocationEvent>,
}

impl ValidationOutcome {
    /// A valid outcome with nothing to report.
    pub fn pass() -> Self {
        Self::default()
    }

    pub fn with_violations(violations: Vec<Violation>, suggestions: Vec<String>) -> Self {
        Self {
            violations,
            suggestions,
            modified_event: None,
        }
    }

    /// Valid unless a blocking (warning or critical) violation is present.
    pub fn is_valid(&self) -> bool {
        self.violations
            .iter()
            .all(|v| v.severity == Severity::Info)
    }
}

/// The engine's verdict for one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub action: Action,
    pub level: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_event: Option<ToolInvocationEvent>,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "process_time_ms", serialize_with = "as_millis")]
    pub process_time: Duration,
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

impl Decision {
    pub fn is_blocked(&self) -> bool {
        self.action == Action::Block
    }

    pub fn is_allowed(&self) -> bool {
        self.action == Action::Allow
    }
}
