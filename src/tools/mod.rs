//! Tool checkers: policies keyed by the kind of action and hook phase.

mod formatter;
mod notifier;
mod shell;

pub use formatter::FormatterTool;
pub use notifier::NotifierTool;
pub use shell::ShellTool;

use std::collections::BTreeMap;
use std::fmt;

use crate::config::{self, Config, ConfigError};
use crate::decision::ValidationOutcome;
use crate::input::{EventKind, ToolInvocationEvent};
use crate::logging::Logger;
use crate::rules::CheckerError;

/// Destructive commands blocked when no list is configured.
pub const DEFAULT_BLOCKED_PATTERNS: &[&str] = &["rm -rf /", "rm -rf ~", ":(){ :|:& };:"];

/// Built-in formatter commands, by extension.
pub fn default_formatters() -> BTreeMap<String, String> {
    let mut formatters = BTreeMap::new();
    formatters.insert("go".to_string(), "gofmt -w".to_string());
    for ext in ["ts", "tsx", "js", "jsx"] {
        formatters.insert(ext.to_string(), "prettier --write".to_string());
    }
    formatters
}

/// Lifecycle point at which checkers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Pre,
    Post,
    Stop,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::Pre => f.write_str("pre"),
            HookPhase::Post => f.write_str("post"),
            HookPhase::Stop => f.write_str("stop"),
        }
    }
}

/// One action checker.
#[derive(Debug)]
pub enum ToolChecker {
    Shell(ShellTool),
    Formatter(FormatterTool),
    Notifier(NotifierTool),
}

impl ToolChecker {
    /// Build every enabled tool checker, in evaluation order.
    pub fn from_config(config: &Config, log: &Logger) -> Result<Vec<Self>, ConfigError> {
        let mut tools = Vec::new();
        if let Some(t) = config.tool(config::SHELL) {
            tools.push(ToolChecker::Shell(ShellTool::new(t, log)));
        }
        if let Some(t) = config.tool(config::FORMATTER) {
            tools.push(ToolChecker::Formatter(FormatterTool::new(t, log)));
        }
        if let Some(t) = config.tool(config::NOTIFIER) {
            tools.push(ToolChecker::Notifier(NotifierTool::new(t, log)?));
        }
        Ok(tools)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolChecker::Shell(_) => config::SHELL,
            ToolChecker::Formatter(_) => config::FORMATTER,
            ToolChecker::Notifier(_) => config::NOTIFIER,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            ToolChecker::Shell(t) => t.enabled(),
            ToolChecker::Formatter(t) => t.enabled(),
            ToolChecker::Notifier(t) => t.enabled(),
        }
    }

    pub fn phase(&self) -> HookPhase {
        match self {
            ToolChecker::Shell(_) => HookPhase::Pre,
            ToolChecker::Formatter(_) => HookPhase::Post,
            ToolChecker::Notifier(_) => HookPhase::Stop,
        }
    }

    pub fn supports(&self, kind: &EventKind) -> bool {
        match self {
            ToolChecker::Shell(_) => *kind == EventKind::Bash,
            ToolChecker::Formatter(_) => kind.is_file_write(),
            ToolChecker::Notifier(_) => *kind == EventKind::Stop,
        }
    }

    /// Whether this checker runs for `kind` during `phase`.
    pub fn applies(&self, kind: &EventKind, phase: HookPhase) -> bool {
        self.phase() == phase && self.supports(kind)
    }

    pub fn evaluate(
        &self,
        event: &ToolInvocationEvent,
        phase: HookPhase,
    ) -> Result<ValidationOutcome, CheckerError> {
        if !self.applies(&event.kind, phase) {
            return Ok(ValidationOutcome::pass());
        }
        match self {
            ToolChecker::Shell(t) => Ok(t.check(event)),
            ToolChecker::Formatter(t) => t.format(event),
            ToolChecker::Notifier(t) => Ok(t.notify(event)),
        }
    }
}
