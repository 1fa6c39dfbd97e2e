//! Session-end notifications.
//!
//! Sound and desktop notifications are spawned as detached child processes
//! that are never waited on; their failures are only logged.

use std::path::Path;
use std::process::{Command, Stdio};

use regex::Regex;

use crate::config::{ConfigError, ToolConfig};
use crate::decision::{ValidationOutcome, Violation};
use crate::input::ToolInvocationEvent;
use crate::logging::Logger;

const UNKNOWN_PROJECT: &str = "unknown";

const SOUND_FILES: &[&str] = &[
    "/usr/share/sounds/freedesktop/stereo/window-attention.oga",
    "/usr/share/sounds/alsa/Front_Left.wav",
];

#[derive(Debug)]
pub struct NotifierTool {
    enabled: bool,
    sound: bool,
    desktop: bool,
    terminal_title: bool,
    /// `<work_dir>/<project>` and Claude's dash-encoded `-<work-dir>-<project>/`.
    project_patterns: Vec<Regex>,
    log: Logger,
}

impl NotifierTool {
    pub fn new(config: &ToolConfig, log: &Logger) -> Result<Self, ConfigError> {
        let work_dir = config
            .work_dir
            .clone()
            .filter(|d| !d.is_empty())
            .or_else(|| dirs::home_dir().map(|h| h.join("work").to_string_lossy().into_owned()));

        let project_patterns = match work_dir {
            Some(dir) => {
                let dir = dir.trim_end_matches('/');
                let direct = format!(r"{}/([^/]+)(?:/|$)", regex::escape(dir));
                let encoded = format!(r"{}-([^/]+)/", regex::escape(&encode_path(dir)));
                [direct, encoded]
                    .into_iter()
                    .map(|source| {
                        Regex::new(&source).map_err(|e| ConfigError::Regex {
                            pattern: source.clone(),
                            source: e,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?
            }
            None => Vec::new(),
        };

        Ok(Self {
            enabled: config.enabled,
            sound: config.sound,
            desktop: config.desktop,
            terminal_title: config.terminal_title,
            project_patterns,
            log: log.with("tool", crate::config::NOTIFIER),
        })
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn notify(&self, event: &ToolInvocationEvent) -> ValidationOutcome {
        if !self.enabled {
            return ValidationOutcome::pass();
        }

        let project = self.project_for(event);
        let log = self.log.with("project", &project);
        log.debug("session ended, sending notifications");

        if self.terminal_title {
            eprint!("\x1b]0;Claude Code [{project}] - READY\x07");
        }
        if self.sound {
            self.play_sound(&log);
        }
        if self.desktop {
            let body = format!("Project: {project}");
            spawn_detached(
                &log,
                "notify-send",
                &["Claude Code session completed", body.as_str()],
            );
        }

        let notification = Violation::info(
            "notification_sent",
            format!("Session [{project}] completed, notifications sent"),
        );
        ValidationOutcome::with_violations(
            vec![notification],
            vec![format!("Notifications sent for project [{project}]")],
        )
    }

    /// Project name from the transcript path, else the working directory.
    fn project_for(&self, event: &ToolInvocationEvent) -> String {
        if let Some(transcript) = event.transcript_path.as_deref().filter(|p| !p.is_empty()) {
            return self.project_name(transcript);
        }
        let cwd = event
            .cwd
            .clone()
            .filter(|c| !c.is_empty())
            .or_else(|| {
                std::env::current_dir()
                    .ok()
                    .map(|d| d.to_string_lossy().into_owned())
            });
        match cwd {
            Some(dir) => self.project_name(&dir),
            None => UNKNOWN_PROJECT.to_string(),
        }
    }

    fn project_name(&self, path: &str) -> String {
        self.project_patterns
            .iter()
            .find_map(|re| re.captures(path).and_then(|c| c.get(1)))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| UNKNOWN_PROJECT.to_string())
    }

    fn play_sound(&self, log: &Logger) {
        if spawn_detached(log, "canberra-gtk-play", &["-i", "window-attention"]) {
            return;
        }
        for file in SOUND_FILES {
            if Path::new(file).exists() && spawn_detached(log, "paplay", &[*file]) {
                return;
            }
        }
        log.debug("no sound player available");
    }
}

/// Start `program` without waiting for it. Returns whether it started.
fn spawn_detached(log: &Logger, program: &str, args: &[&str]) -> bool {
    match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(_child) => {
            log.with("command", program).debug("spawned notification process");
            true
        }
        Err(e) => {
            log.with("command", program)
                .debug(format!("notification process not started: {e}"));
            false
        }
    }
}

/// `/home/user/work` -> `home-user-work`.
fn encode_path(path: &str) -> String {
    path.trim_start_matches('/').replace('/', "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Severity;

    fn quiet(work_dir: &str) -> NotifierTool {
        let config = ToolConfig {
            work_dir: Some(work_dir.to_string()),
            ..Default::default()
        };
        NotifierTool::new(&config, &Logger::default()).unwrap()
    }

    #[test]
    fn test_encode_path() {
        assert_eq!(encode_path("/home/user/work"), "home-user-work");
    }

    #[test]
    fn test_project_from_direct_path() {
        let n = quiet("/home/u/work/");
        assert_eq!(n.project_name("/home/u/work/shop/src/main.go"), "shop");
        assert_eq!(n.project_name("/home/u/work/shop"), "shop");
    }

    #[test]
    fn test_project_from_encoded_transcript() {
        let n = quiet("/home/u/work");
        let transcript = "/home/u/.claude/projects/-home-u-work-shop/abc.jsonl";
        assert_eq!(n.project_name(transcript), "shop");
    }

    #[test]
    fn test_unknown_project() {
        assert_eq!(quiet("/home/u/work").project_name("/tmp/x"), "unknown");
    }

    #[test]
    fn test_notify_uses_cwd_without_transcript() {
        let n = quiet("/home/u/work");
        let mut event = ToolInvocationEvent::stop();
        event.cwd = Some("/home/u/work/blog".to_string());
        let outcome = n.notify(&event);
        assert!(outcome.is_valid());
        assert_eq!(outcome.violations.len(), 1);
        assert_eq!(outcome.violations[0].kind, "notification_sent");
        assert_eq!(outcome.violations[0].severity, Severity::Info);
        assert_eq!(outcome.suggestions, vec!["Notifications sent for project [blog]"]);
    }

    #[test]
    fn test_disabled_notifier() {
        let config = ToolConfig {
            enabled: false,
            ..Default::default()
        };
        let n = NotifierTool::new(&config, &Logger::default()).unwrap();
        assert_eq!(n.notify(&ToolInvocationEvent::stop()), ValidationOutcome::pass());
    }
}
