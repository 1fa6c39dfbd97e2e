//! Post-write formatting with external formatter binaries.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::process::{Command, Stdio};

use super::default_formatters;
use crate::config::ToolConfig;
use crate::decision::{ValidationOutcome, Violation};
use crate::input::ToolInvocationEvent;
use crate::logging::Logger;
use crate::rules::CheckerError;

#[derive(Debug)]
pub struct FormatterTool {
    enabled: bool,
    /// Extension without dot -> command line.
    formatters: BTreeMap<String, String>,
    log: Logger,
}

impl FormatterTool {
    pub fn new(config: &ToolConfig, log: &Logger) -> Self {
        let formatters = if config.formatters.is_empty() {
            default_formatters()
        } else {
            config
                .formatters
                .iter()
                .map(|(ext, cmd)| (ext.trim_start_matches('.').to_lowercase(), cmd.clone()))
                .collect()
        };
        Self {
            enabled: config.enabled,
            formatters,
            log: log.with("tool", crate::config::FORMATTER),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Run the formatter for the written file. Never blocks: a failing
    /// formatter is reported as an `info` violation.
    pub fn format(&self, event: &ToolInvocationEvent) -> Result<ValidationOutcome, CheckerError> {
        if !self.enabled {
            return Ok(ValidationOutcome::pass());
        }
        let Some(path) = event.file_path.as_deref().filter(|p| !p.is_empty()) else {
            return Ok(ValidationOutcome::pass());
        };
        let Some(command_line) = self.command_for(path) else {
            return Ok(ValidationOutcome::pass());
        };
        let mut parts = command_line.split_whitespace();
        let Some(program) = parts.next() else {
            return Ok(ValidationOutcome::pass());
        };

        let log = self.log.with("file", path).with("formatter", program);
        log.debug("formatting file");

        let output = match Command::new(program)
            .args(parts)
            .arg(path)
            .stdin(Stdio::null())
            .output()
        {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log.debug("formatter not found, skipping");
                return Ok(ValidationOutcome::pass());
            }
            Err(e) => {
                return Err(CheckerError::Io {
                    checker: crate::config::FORMATTER,
                    source: e,
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            log.with("status", output.status).warn("formatter failed");
            let message = if detail.is_empty() {
                format!("{program} failed on {path} ({})", output.status)
            } else {
                format!("{program} failed on {path}: {detail}")
            };
            let violation = Violation::info("format_error", message)
                .with_suggestion("Check the file for syntax errors");
            return Ok(ValidationOutcome::with_violations(vec![violation], Vec::new()));
        }

        log.info("formatted file");
        Ok(ValidationOutcome::with_violations(
            Vec::new(),
            vec![format!("{path} was formatted with {program}")],
        ))
    }

    fn command_for(&self, path: &str) -> Option<&str> {
        let ext = std::path::Path::new(path).extension()?.to_str()?.to_lowercase();
        self.formatters.get(&ext).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Severity;
    use crate::input::EventKind;

    fn tool(ext: &str, command: &str) -> FormatterTool {
        let mut formatters = BTreeMap::new();
        formatters.insert(ext.to_string(), command.to_string());
        let config = ToolConfig {
            formatters,
            ..Default::default()
        };
        FormatterTool::new(&config, &Logger::default())
    }

    fn write(path: &str) -> ToolInvocationEvent {
        ToolInvocationEvent::new(EventKind::Write).with_file(path, "package a")
    }

    #[test]
    fn test_default_formatters() {
        let t = FormatterTool::new(&ToolConfig::default(), &Logger::default());
        assert_eq!(t.command_for("a/b.go"), Some("gofmt -w"));
        assert_eq!(t.command_for("a/b.TSX"), Some("prettier --write"));
        assert_eq!(t.command_for("a/b.py"), None);
    }

    #[test]
    fn test_successful_format_adds_suggestion() {
        let outcome = tool("go", "true").format(&write("a.go")).unwrap();
        assert!(outcome.violations.is_empty());
        assert_eq!(outcome.suggestions, vec!["a.go was formatted with true"]);
    }

    #[test]
    fn test_failing_formatter_is_info() {
        let outcome = tool("go", "false").format(&write("a.go")).unwrap();
        assert_eq!(outcome.violations.len(), 1);
        assert_eq!(outcome.violations[0].kind, "format_error");
        assert_eq!(outcome.violations[0].severity, Severity::Info);
        assert!(outcome.is_valid());
    }

    #[test]
    fn test_missing_binary_skipped() {
        let outcome = tool("go", "hookwarden-no-such-formatter -w")
            .format(&write("a.go"))
            .unwrap();
        assert_eq!(outcome, ValidationOutcome::pass());
    }

    #[test]
    fn test_unconfigured_extension_skipped() {
        let outcome = tool(".go", "false").format(&write("a.rs")).unwrap();
        assert_eq!(outcome, ValidationOutcome::pass());
    }

    #[test]
    fn test_event_without_file() {
        let event = ToolInvocationEvent::new(EventKind::Edit);
        assert!(tool("go", "false").format(&event).unwrap().violations.is_empty());
    }

    #[test]
    fn test_unexecutable_formatter_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("fmt.sh");
        std::fs::write(&script, "#!/bin/sh\n").unwrap();
        let t = tool("go", script.to_str().unwrap());
        assert!(matches!(
            t.format(&write("a.go")),
            Err(CheckerError::Io { .. })
        ));
    }
}
