//! Rendering a decision for the hook caller.

use crate::decision::{Action, Decision, Severity, Violation};

/// Human-readable report for stderr. `None` when there is nothing to say.
pub fn format_response(decision: &Decision, verbose: bool) -> Option<String> {
    let mut out = String::new();

    match decision.action {
        Action::Block => {
            out.push_str(&format!("BLOCKED: {}\n", decision.message));
            for v in blocking(&decision.violations) {
                out.push_str(&format!("  - {}\n", describe(v)));
            }
        }
        Action::Warn => {
            out.push_str(&format!("WARNING: {}\n", decision.message));
            for v in blocking(&decision.violations) {
                out.push_str(&format!("  - {}\n", describe(v)));
            }
        }
        Action::Allow => {
            if verbose {
                out.push_str(&format!("ALLOWED: {}\n", decision.message));
            }
            if let Some(command) = decision
                .modified_event
                .as_ref()
                .and_then(|e| e.command.as_deref())
            {
                out.push_str(&format!("COMMAND MODIFIED: {command}\n"));
            }
        }
    }

    if decision.action != Action::Allow && !decision.suggestions.is_empty() {
        out.push_str("Suggestions:\n");
        for s in &decision.suggestions {
            out.push_str(&format!("  - {s}\n"));
        }
    }

    if verbose {
        if !decision.violations.is_empty() {
            out.push_str("Violations:\n");
            for v in &decision.violations {
                out.push_str(&format!("  - [{}] {}\n", v.severity, describe(v)));
                if !v.suggestion.is_empty() {
                    out.push_str(&format!("    {}\n", v.suggestion));
                }
            }
        }
        out.push_str(&format!("Processing time: {:?}\n", decision.process_time));
    }

    (!out.is_empty()).then_some(out)
}

/// JSON for the rewritten event, written to stdout for the caller.
pub fn modified_event_json(decision: &Decision) -> Result<Option<String>, serde_json::Error> {
    decision
        .modified_event
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
}

fn blocking(violations: &[Violation]) -> impl Iterator<Item = &Violation> {
    violations.iter().filter(|v| v.severity != Severity::Info)
}

fn describe(v: &Violation) -> String {
    if v.line > 0 {
        format!("{}:{} {}: {}", v.line, v.column, v.kind, v.message)
    } else {
        format!("{}: {}", v.kind, v.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{EventKind, ToolInvocationEvent};
    use chrono::Utc;
    use std::time::Duration;

    fn decision(action: Action, violations: Vec<Violation>, suggestions: &[&str]) -> Decision {
        Decision {
            action,
            level: Severity::highest(&violations),
            message: violations
                .first()
                .map(|v| v.message.clone())
                .unwrap_or_else(|| "Operation allowed".to_string()),
            violations,
            suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
            modified_event: None,
            timestamp: Utc::now(),
            process_time: Duration::from_millis(3),
        }
    }

    #[test]
    fn test_allow_is_silent() {
        let d = decision(Action::Allow, vec![], &[]);
        assert!(format_response(&d, false).is_none());
        assert!(format_response(&d, true).unwrap().contains("ALLOWED"));
    }

    #[test]
    fn test_block_lists_violations_and_suggestions() {
        let v = Violation::critical("panic_usage", "panic in production code").at(3, 2);
        let d = decision(Action::Block, vec![v], &["Return errors"]);
        let msg = format_response(&d, false).unwrap();
        assert!(msg.starts_with("BLOCKED: panic in production code"));
        assert!(msg.contains("3:2 panic_usage"));
        assert!(msg.contains("Suggestions:\n  - Return errors"));
        assert!(!msg.contains("Processing time"));
    }

    #[test]
    fn test_warn_prefix() {
        let v = Violation::new("w", Severity::Warning, "careful");
        let msg = format_response(&decision(Action::Warn, vec![v], &[]), false).unwrap();
        assert!(msg.starts_with("WARNING: careful"));
    }

    #[test]
    fn test_verbose_shows_every_violation() {
        let v = Violation::info("format_error", "gofmt failed");
        let msg = format_response(&decision(Action::Allow, vec![v], &[]), true).unwrap();
        assert!(msg.contains("[info] format_error: gofmt failed"));
        assert!(msg.contains("Processing time"));
    }

    #[test]
    fn test_modified_event() {
        let mut d = decision(Action::Allow, vec![], &[]);
        assert_eq!(modified_event_json(&d).unwrap(), None);

        d.modified_event = Some(ToolInvocationEvent::new(EventKind::Bash).with_command("ls -a"));
        let json = modified_event_json(&d).unwrap().unwrap();
        assert_eq!(json, r#"{"tool_name":"Bash","command":"ls -a"}"#);
        assert!(format_response(&d, false).unwrap().contains("COMMAND MODIFIED: ls -a"));
    }
}
