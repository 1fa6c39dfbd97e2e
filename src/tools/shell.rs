//! Dangerous shell command detection and command rewrites.

use super::DEFAULT_BLOCKED_PATTERNS;
use crate::config::{CommandRewrite, ToolConfig};
use crate::decision::{ValidationOutcome, Violation};
use crate::input::ToolInvocationEvent;
use crate::logging::Logger;
use crate::matcher::column_of;

#[derive(Debug)]
pub struct ShellTool {
    enabled: bool,
    blocked: Vec<String>,
    rewrites: Vec<CommandRewrite>,
    log: Logger,
}

impl ShellTool {
    /// `blocked_patterns`, else the older `dangerous_commands`, else the
    /// built-in list.
    pub fn new(config: &ToolConfig, log: &Logger) -> Self {
        let configured = if config.blocked_patterns.is_empty() {
            &config.dangerous_commands
        } else {
            &config.blocked_patterns
        };
        let blocked = if configured.is_empty() {
            DEFAULT_BLOCKED_PATTERNS.iter().map(|p| p.to_string()).collect()
        } else {
            configured.iter().filter(|p| !p.is_empty()).cloned().collect()
        };

        Self {
            enabled: config.enabled,
            blocked,
            rewrites: config
                .rewrites
                .iter()
                .filter(|r| !r.from.is_empty())
                .cloned()
                .collect(),
            log: log.with("tool", crate::config::SHELL),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn check(&self, event: &ToolInvocationEvent) -> ValidationOutcome {
        if !self.enabled {
            return ValidationOutcome::pass();
        }
        let Some(command) = event.command.as_deref().filter(|c| !c.trim().is_empty()) else {
            return ValidationOutcome::pass();
        };
        self.log.with("command", command).debug("checking shell command");

        let violations: Vec<Violation> = self
            .blocked
            .iter()
            .filter_map(|pattern| {
                command.find(pattern.as_str()).map(|idx| {
                    Violation::critical(
                        "dangerous_command",
                        format!("Dangerous shell command detected: {pattern}"),
                    )
                    .with_suggestion("Avoid potentially destructive commands")
                    .at(1, column_of(command, idx))
                })
            })
            .collect();

        if !violations.is_empty() {
            self.log
                .with("command", command)
                .warn("blocked dangerous shell command");
            return ValidationOutcome::with_violations(violations, Vec::new());
        }

        let mut outcome = ValidationOutcome::pass();
        if let Some(rewritten) = self.rewrite(command) {
            self.log
                .with("command", command)
                .with("rewritten", &rewritten)
                .info("rewrote shell command");
            outcome.modified_event = Some(event.clone().with_command(rewritten));
        }
        outcome
    }

    /// Apply every rewrite in order; `None` when the command is unchanged.
    fn rewrite(&self, command: &str) -> Option<String> {
        let rewritten = self
            .rewrites
            .iter()
            .fold(command.to_string(), |cmd, r| cmd.replace(&r.from, &r.to));
        (rewritten != command).then_some(rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::EventKind;

    fn bash(command: &str) -> ToolInvocationEvent {
        ToolInvocationEvent::new(EventKind::Bash).with_command(command)
    }

    fn default_tool() -> ShellTool {
        ShellTool::new(&ToolConfig::default(), &Logger::default())
    }

    #[test]
    fn test_rm_rf_root_blocked() {
        let outcome = default_tool().check(&bash("sudo rm -rf / --no-preserve-root"));
        assert_eq!(outcome.violations.len(), 1);
        assert_eq!(outcome.violations[0].kind, "dangerous_command");
        assert_eq!(outcome.violations[0].column, 6);
        assert!(!outcome.is_valid());
    }

    #[test]
    fn test_relative_rm_allowed() {
        assert!(default_tool().check(&bash("rm -rf ./build")).is_valid());
    }

    #[test]
    fn test_empty_command_passes() {
        assert!(default_tool().check(&bash("  ")).is_valid());
        let no_command = ToolInvocationEvent::new(EventKind::Bash);
        assert!(default_tool().check(&no_command).is_valid());
    }

    #[test]
    fn test_configured_patterns_replace_defaults() {
        let config = ToolConfig {
            blocked_patterns: vec!["git push --force".to_string()],
            ..Default::default()
        };
        let tool = ShellTool::new(&config, &Logger::default());
        assert!(!tool.check(&bash("git push --force origin main")).is_valid());
        assert!(tool.check(&bash("rm -rf /")).is_valid());
    }

    #[test]
    fn test_legacy_dangerous_commands() {
        let config = ToolConfig {
            dangerous_commands: vec!["mkfs".to_string()],
            ..Default::default()
        };
        let tool = ShellTool::new(&config, &Logger::default());
        assert!(!tool.check(&bash("mkfs.ext4 /dev/sda1")).is_valid());
    }

    #[test]
    fn test_every_matching_pattern_reported() {
        let outcome = default_tool().check(&bash("rm -rf / && rm -rf ~"));
        assert_eq!(outcome.violations.len(), 2);
    }

    #[test]
    fn test_rewrite_allowed_command() {
        let config = ToolConfig {
            rewrites: vec![CommandRewrite {
                from: "--headed".to_string(),
                to: "--headless".to_string(),
            }],
            ..Default::default()
        };
        let tool = ShellTool::new(&config, &Logger::default());
        let outcome = tool.check(&bash("npx playwright test --headed"));
        assert!(outcome.is_valid());
        let modified = outcome.modified_event.unwrap();
        assert_eq!(
            modified.command.as_deref(),
            Some("npx playwright test --headless")
        );

        assert!(tool.check(&bash("npx playwright test")).modified_event.is_none());
    }

    #[test]
    fn test_disabled_tool_passes() {
        let config = ToolConfig {
            enabled: false,
            ..Default::default()
        };
        let tool = ShellTool::new(&config, &Logger::default());
        assert!(tool.check(&bash("rm -rf /")).is_valid());
    }
}
