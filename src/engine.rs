//! Per-invocation orchestration of rule and tool checkers.
//!
//! Each entry point runs the checkers for one hook phase, merges their
//! outcomes and produces exactly one [`Decision`]:
//!
//! - pre-action: rule checkers on the file snapshot, then pre-phase tools;
//!   a tool may rewrite the event for the tools after it
//! - post-action: post-phase tools only
//! - session-end: stop-phase tools only, always `allow`

use std::collections::HashSet;
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;

use crate::cancel::CancelToken;
use crate::config::{Config, ConfigError};
use crate::decision::{Action, Decision, Severity, ValidationOutcome, Violation};
use crate::input::{EventKind, ToolInvocationEvent};
use crate::logging::Logger;
use crate::rules::{CheckerError, RuleChecker};
use crate::snapshot::FileSnapshot;
use crate::tools::{HookPhase, ToolChecker};

/// Errors that abort an invocation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("evaluation cancelled before all checkers ran")]
    Cancelled,

    #[error("tool checker '{tool}' failed: {source}")]
    Tool {
        tool: &'static str,
        #[source]
        source: CheckerError,
    },
}

#[derive(Debug)]
pub struct Engine {
    rules: Vec<RuleChecker>,
    tools: Vec<ToolChecker>,
    log: Logger,
}

/// Violations and suggestions gathered across checkers.
#[derive(Debug, Default)]
struct Collected {
    violations: Vec<Violation>,
    suggestions: Vec<String>,
}

impl Collected {
    fn absorb(&mut self, outcome: ValidationOutcome) {
        self.violations.extend(outcome.violations);
        self.suggestions.extend(outcome.suggestions);
    }
}

impl Engine {
    /// Build every enabled checker. A bad pattern fails construction.
    pub fn new(config: &Config, log: &Logger) -> Result<Self, ConfigError> {
        let log = log.with("component", "engine");
        let engine = Self::from_parts(
            RuleChecker::from_config(config, &log)?,
            ToolChecker::from_config(config, &log)?,
            &log,
        );
        engine
            .log
            .with("rules", engine.rules.len())
            .with("tools", engine.tools.len())
            .debug("engine initialized");
        Ok(engine)
    }

    /// Assemble from prebuilt checkers; disabled ones are dropped.
    pub fn from_parts(rules: Vec<RuleChecker>, tools: Vec<ToolChecker>, log: &Logger) -> Self {
        Self {
            rules: rules.into_iter().filter(|c| c.enabled()).collect(),
            tools: tools.into_iter().filter(|t| t.enabled()).collect(),
            log: log.clone(),
        }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|c| c.name()).collect()
    }

    pub fn tool_names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn pre_action(
        &self,
        event: &ToolInvocationEvent,
        cancel: &CancelToken,
    ) -> Result<Decision, EngineError> {
        let start = Instant::now();
        let log = self.log.with("phase", HookPhase::Pre).with("event", &event.kind);
        log.debug("processing pre-action");

        let mut collected = Collected::default();

        if event.kind.is_file_write()
            && let Some(snapshot) = FileSnapshot::from_event(event)
        {
            for checker in &self.rules {
                if cancel.is_cancelled() {
                    log.warn("cancelled during rule checkers");
                    return Err(EngineError::Cancelled);
                }
                absorb_rule(&log, checker.name(), checker.evaluate(&snapshot), &mut collected);
            }
        }

        let mut current = event.clone();
        for tool in &self.tools {
            if !tool.applies(&current.kind, HookPhase::Pre) {
                continue;
            }
            if cancel.is_cancelled() {
                log.warn("cancelled during tool checkers");
                return Err(EngineError::Cancelled);
            }
            let result = tool.evaluate(&current, HookPhase::Pre);
            if let Some(modified) = absorb_tool(&log, tool.name(), result, &mut collected)? {
                current = modified;
            }
        }

        let modified = (current != *event).then_some(current);
        let decision = decide(HookPhase::Pre, &event.kind, collected, modified, start);
        log.with("action", decision.action)
            .with("violations", decision.violations.len())
            .debug("pre-action completed");
        Ok(decision)
    }

    /// Post-phase tools only; tool failures are logged and skipped.
    pub fn post_action(&self, event: &ToolInvocationEvent, cancel: &CancelToken) -> Decision {
        self.run_tools_only(HookPhase::Post, event, cancel)
    }

    /// Stop-phase tools only; always resolves to `allow`.
    pub fn session_end(&self, event: &ToolInvocationEvent, cancel: &CancelToken) -> Decision {
        self.run_tools_only(HookPhase::Stop, event, cancel)
    }

    fn run_tools_only(
        &self,
        phase: HookPhase,
        event: &ToolInvocationEvent,
        cancel: &CancelToken,
    ) -> Decision {
        let start = Instant::now();
        let log = self.log.with("phase", phase).with("event", &event.kind);
        log.debug("processing hook");

        let mut collected = Collected::default();
        for tool in self.tools.iter().filter(|t| t.applies(&event.kind, phase)) {
            if cancel.is_cancelled() {
                log.warn("cancelled, returning partial result");
                break;
            }
            absorb_tool_lenient(&log, tool.name(), tool.evaluate(event, phase), &mut collected);
        }

        let decision = decide(phase, &event.kind, collected, None, start);
        log.with("action", decision.action)
            .with("violations", decision.violations.len())
            .debug("hook completed");
        decision
    }
}

/// Merge a rule checker result; a failed checker contributes nothing.
fn absorb_rule(
    log: &Logger,
    name: &str,
    result: Result<ValidationOutcome, CheckerError>,
    collected: &mut Collected,
) {
    match result {
        Ok(outcome) => collected.absorb(outcome),
        Err(e) => log
            .with("checker", name)
            .error(format!("rule checker failed, skipping: {e}")),
    }
}

/// Merge a pre-phase tool checker result and return its rewritten event,
/// if any. A failure aborts the invocation.
fn absorb_tool(
    log: &Logger,
    name: &'static str,
    result: Result<ValidationOutcome, CheckerError>,
    collected: &mut Collected,
) -> Result<Option<ToolInvocationEvent>, EngineError> {
    match result {
        Ok(mut outcome) => {
            let modified = outcome.modified_event.take();
            collected.absorb(outcome);
            Ok(modified)
        }
        Err(source) => {
            log.with("tool", name).error(format!("tool checker failed: {source}"));
            Err(EngineError::Tool { tool: name, source })
        }
    }
}

/// Merge a post/stop tool checker result; failures are logged and skipped
/// and rewrites are ignored.
fn absorb_tool_lenient(
    log: &Logger,
    name: &str,
    result: Result<ValidationOutcome, CheckerError>,
    collected: &mut Collected,
) {
    match result {
        Ok(outcome) => collected.absorb(outcome),
        Err(e) => log
            .with("tool", name)
            .error(format!("tool checker failed, skipping: {e}")),
    }
}

fn decide(
    phase: HookPhase,
    kind: &EventKind,
    collected: Collected,
    modified_event: Option<ToolInvocationEvent>,
    start: Instant,
) -> Decision {
    let Collected {
        violations,
        suggestions,
    } = collected;

    let action = match phase {
        HookPhase::Stop => Action::Allow,
        HookPhase::Pre | HookPhase::Post => Action::from_violations(&violations),
    };
    let message = violations
        .first()
        .map(|v| v.message.clone())
        .unwrap_or_else(|| generic_message(phase, kind));

    Decision {
        action,
        level: Severity::highest(&violations),
        message,
        violations,
        suggestions: dedup(suggestions),
        modified_event,
        timestamp: Utc::now(),
        process_time: start.elapsed(),
    }
}

fn generic_message(phase: HookPhase, kind: &EventKind) -> String {
    match phase {
        HookPhase::Pre => "Operation allowed".to_string(),
        HookPhase::Post => format!("Post-processing for {kind} completed"),
        HookPhase::Stop => "Session end processing completed".to_string(),
    }
}

/// Exact-match dedup keeping first-seen order.
fn dedup(suggestions: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    suggestions
        .into_iter()
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{self, CheckerConfig, CommandRewrite, ToolConfig};

    fn engine(config: &Config) -> Engine {
        Engine::new(config, &Logger::default()).unwrap()
    }

    /// Only the named checkers, with default options.
    fn only(checkers: &[&str], tools: &[&str]) -> Config {
        let mut config = Config::empty();
        for name in checkers {
            config
                .checkers
                .insert(name.to_string(), CheckerConfig::default());
        }
        for name in tools {
            config.tools.insert(name.to_string(), ToolConfig::default());
        }
        config
    }

    fn write(path: &str, content: &str) -> ToolInvocationEvent {
        ToolInvocationEvent::new(EventKind::Write).with_file(path, content)
    }

    fn bash(command: &str) -> ToolInvocationEvent {
        ToolInvocationEvent::new(EventKind::Bash).with_command(command)
    }

    #[test]
    fn test_zero_checkers_allow() {
        let e = engine(&Config::empty());
        let cancel = CancelToken::new();
        for event in [
            write("a.go", "panic(1)"),
            bash("rm -rf /"),
            ToolInvocationEvent::stop(),
        ] {
            let d = e.pre_action(&event, &cancel).unwrap();
            assert!(d.is_allowed());
            assert!(d.violations.is_empty());
            assert_eq!(d.message, "Operation allowed");
        }
    }

    #[test]
    fn test_disabled_checkers_are_dropped() {
        let mut config = only(&[config::FORCED_EXIT], &[config::SHELL]);
        config.checkers.get_mut(config::FORCED_EXIT).unwrap().enabled = false;
        config.tools.get_mut(config::SHELL).unwrap().enabled = false;
        let e = engine(&config);
        assert!(e.rule_names().is_empty());
        assert!(e.tool_names().is_empty());
    }

    #[test]
    fn test_panic_in_service_blocks() {
        let mut config = only(&[config::FORCED_EXIT], &[]);
        config.checkers.get_mut(config::FORCED_EXIT).unwrap().only_extension =
            Some(".go".to_string());
        let d = engine(&config)
            .pre_action(&write("service.go", "panic(\"boom\")"), &CancelToken::new())
            .unwrap();
        assert!(d.is_blocked());
        assert_eq!(d.level, Severity::Critical);
        assert_eq!(d.violations.len(), 1);
        assert_eq!(d.violations[0].kind, "panic_usage");
        assert_eq!(d.message, d.violations[0].message);
    }

    #[test]
    fn test_panic_in_entrypoint_allowed() {
        let config = only(&[config::FORCED_EXIT], &[]);
        let d = engine(&config)
            .pre_action(&write("cmd/app/main.go", "panic(\"boom\")"), &CancelToken::new())
            .unwrap();
        assert!(d.is_allowed());
    }

    #[test]
    fn test_rules_skip_non_write_events() {
        let config = only(&[config::FORCED_EXIT], &[]);
        let mut event = bash("go run .");
        event.file_path = Some("service.go".to_string());
        event.content = Some("panic(1)".to_string());
        let d = engine(&config).pre_action(&event, &CancelToken::new()).unwrap();
        assert!(d.is_allowed());
    }

    #[test]
    fn test_shell_block_and_allow() {
        let e = engine(&only(&[], &[config::SHELL]));
        let cancel = CancelToken::new();
        assert!(e.pre_action(&bash("rm -rf /"), &cancel).unwrap().is_blocked());
        assert!(e.pre_action(&bash("rm -rf ./build"), &cancel).unwrap().is_allowed());
    }

    #[test]
    fn test_rewrite_is_surfaced() {
        let mut config = only(&[], &[config::SHELL]);
        config.tools.get_mut(config::SHELL).unwrap().rewrites = vec![CommandRewrite {
            from: "--headed".to_string(),
            to: "--headless".to_string(),
        }];
        let e = engine(&config);
        let d = e
            .pre_action(&bash("npx playwright test --headed"), &CancelToken::new())
            .unwrap();
        assert!(d.is_allowed());
        assert_eq!(
            d.modified_event.unwrap().command.as_deref(),
            Some("npx playwright test --headless")
        );

        let unchanged = e.pre_action(&bash("ls"), &CancelToken::new()).unwrap();
        assert!(unchanged.modified_event.is_none());
    }

    #[test]
    fn test_suggestions_deduplicated_across_checkers() {
        let mut config = only(&[config::FORBIDDEN_DEFAULTS, config::SECRETS], &[]);
        for name in [config::FORBIDDEN_DEFAULTS, config::SECRETS] {
            config.checkers.get_mut(name).unwrap().suggestion_message =
                Some("Read the policy".to_string());
        }
        let content = "mode := fallback\naddr := \"0x742d35Cc6634C0532925a3b844Bc454e4438f44e\"";
        let d = engine(&config)
            .pre_action(&write("src/a.go", content), &CancelToken::new())
            .unwrap();
        assert_eq!(d.violations.len(), 2);
        assert_eq!(d.suggestions[0], "Read the policy");
        let repeats = d.suggestions.iter().filter(|s| *s == "Read the policy").count();
        assert_eq!(repeats, 1);
    }

    #[test]
    fn test_stop_always_allows() {
        let config = only(&[], &[config::NOTIFIER]);
        let d = engine(&config).session_end(&ToolInvocationEvent::stop(), &CancelToken::new());
        assert!(d.is_allowed());
        assert_eq!(d.violations[0].kind, "notification_sent");
    }

    #[test]
    fn test_stop_without_tools() {
        let d = engine(&Config::empty())
            .session_end(&ToolInvocationEvent::stop(), &CancelToken::new());
        assert!(d.is_allowed());
        assert_eq!(d.message, "Session end processing completed");
    }

    #[test]
    fn test_post_skips_failing_tool() {
        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("fmt.sh");
        std::fs::write(&script, "#!/bin/sh\n").unwrap();
        let mut config = only(&[], &[config::FORMATTER]);
        config
            .tools
            .get_mut(config::FORMATTER)
            .unwrap()
            .formatters
            .insert("go".to_string(), script.to_string_lossy().into_owned());

        let d = engine(&config).post_action(&write("a.go", "package a"), &CancelToken::new());
        assert!(d.is_allowed());
        assert!(d.violations.is_empty());
        assert_eq!(d.message, "Post-processing for Write completed");
    }

    #[test]
    fn test_post_does_not_run_rules() {
        let config = only(&[config::FORCED_EXIT], &[]);
        let d = engine(&config).post_action(&write("service.go", "panic(1)"), &CancelToken::new());
        assert!(d.is_allowed());
    }

    #[test]
    fn test_cancelled_pre_fails_fast() {
        let e = engine(&only(&[config::FORCED_EXIT], &[]));
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = e.pre_action(&write("service.go", "panic(1)"), &cancel);
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }

    #[test]
    fn test_cancelled_stop_returns_partial() {
        let e = engine(&only(&[], &[config::NOTIFIER]));
        let cancel = CancelToken::new();
        cancel.cancel();
        let d = e.session_end(&ToolInvocationEvent::stop(), &cancel);
        assert!(d.is_allowed());
        assert!(d.violations.is_empty());
    }

    #[test]
    fn test_rule_error_is_skipped() {
        let mut collected = Collected::default();
        let failure = Err(CheckerError::Failed {
            checker: "secrets",
            message: "boom".to_string(),
        });
        absorb_rule(&Logger::default(), "secrets", failure, &mut collected);
        assert!(collected.violations.is_empty());
    }

    #[test]
    fn test_tool_error_propagates_only_pre() {
        let failure = || {
            Err(CheckerError::Failed {
                checker: "shell",
                message: "boom".to_string(),
            })
        };
        let mut collected = Collected::default();
        let log = Logger::default();
        assert!(matches!(
            absorb_tool(&log, "shell", failure(), &mut collected),
            Err(EngineError::Tool { tool: "shell", .. })
        ));

        absorb_tool_lenient(&log, "formatter", failure(), &mut collected);
        assert!(collected.violations.is_empty());

        let outcome = ValidationOutcome::with_violations(
            vec![Violation::info("format_error", "gofmt failed")],
            vec![],
        );
        absorb_tool_lenient(&log, "formatter", Ok(outcome), &mut collected);
        assert_eq!(collected.violations.len(), 1);
    }

    #[test]
    fn test_warning_resolves_to_warn() {
        let collected = Collected {
            violations: vec![
                Violation::info("i", "first"),
                Violation::new("w", Severity::Warning, "second"),
            ],
            suggestions: vec![],
        };
        let d = decide(HookPhase::Pre, &EventKind::Write, collected, None, Instant::now());
        assert_eq!(d.action, Action::Warn);
        assert_eq!(d.level, Severity::Warning);
        assert_eq!(d.message, "first");
    }

    #[test]
    fn test_dedup_keeps_first_seen_order() {
        let s = vec!["b", "a", "b", "c", "a"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(dedup(s), vec!["b", "a", "c"]);
    }
}
