//! Configuration loading, defaults and validation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::logging::level_directive;

/// Rule checker names.
pub const FORBIDDEN_DEFAULTS: &str = "forbidden_defaults";
pub const SECRETS: &str = "secrets";
pub const FORCED_EXIT: &str = "forced_exit";

/// Tool checker names.
pub const SHELL: &str = "shell";
pub const FORMATTER: &str = "formatter";
pub const NOTIFIER: &str = "notifier";

/// Environment variable overriding the config location.
pub const CONFIG_ENV: &str = "HOOKWARDEN_CONFIG";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid regex pattern '{pattern}': {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid glob pattern '{pattern}': {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("timeout must be greater than zero")]
    InvalidTimeout,

    #[error("cannot determine home directory")]
    NoHomeDir,
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    /// Rule checker name -> options.
    pub checkers: BTreeMap<String, CheckerConfig>,
    /// Tool checker name -> options.
    pub tools: BTreeMap<String, ToolConfig>,
}

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
    /// Log destination; empty means stderr. `~` is expanded.
    pub log_file: String,
    /// Deadline for one invocation, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: "~/.claude/logs/hookwarden.log".to_string(),
            timeout_ms: 5000,
        }
    }
}

/// Options for one rule checker. Fields a checker does not use are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    pub enabled: bool,
    /// Path substrings (or file-name globs) exempt from this checker.
    pub exception_paths: Vec<String>,
    /// File-name globs exempt from this checker.
    pub exception_files: Vec<String>,
    /// Extra regexes reported as critical violations.
    pub custom_patterns: Vec<String>,
    /// Emitted ahead of the built-in suggestions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion_message: Option<String>,

    // forbidden_defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forbidden_keyword: Option<String>,
    pub case_sensitive: bool,

    // forced_exit
    /// Only scan files with this extension (e.g. `.go`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only_extension: Option<String>,
    pub test_exceptions: Vec<String>,

    // secrets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_pattern: Option<String>,
    pub test_config_exceptions: Vec<String>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            exception_paths: vec![],
            exception_files: vec![],
            custom_patterns: vec![],
            suggestion_message: None,
            forbidden_keyword: None,
            case_sensitive: false,
            only_extension: None,
            test_exceptions: vec![],
            jwt_pattern: None,
            wallet_pattern: None,
            api_key_pattern: None,
            test_config_exceptions: vec![],
        }
    }
}

/// A substring replacement applied to allowed shell commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRewrite {
    pub from: String,
    pub to: String,
}

/// Options for one tool checker. Fields a tool does not use are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub enabled: bool,

    // shell
    pub blocked_patterns: Vec<String>,
    /// Older name for `blocked_patterns`, read when that list is empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dangerous_commands: Vec<String>,
    pub rewrites: Vec<CommandRewrite>,

    // formatter
    /// Extension (without dot) -> command line; the file path is appended.
    pub formatters: BTreeMap<String, String>,

    // notifier
    pub sound: bool,
    pub desktop: bool,
    pub terminal_title: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            blocked_patterns: vec![],
            dangerous_commands: vec![],
            rewrites: vec![],
            formatters: BTreeMap::new(),
            sound: false,
            desktop: false,
            terminal_title: false,
            work_dir: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut checkers = BTreeMap::new();
        checkers.insert(
            FORBIDDEN_DEFAULTS.to_string(),
            CheckerConfig {
                exception_paths: vec!["docs/".to_string(), "README".to_string()],
                exception_files: vec!["*.md".to_string(), "*.txt".to_string(), "*.rst".to_string()],
                suggestion_message: Some(
                    "Use explicit validation, required parameters and returned errors".to_string(),
                ),
                forbidden_keyword: Some(crate::rules::DEFAULT_FORBIDDEN_KEYWORD.to_string()),
                ..Default::default()
            },
        );
        checkers.insert(
            FORCED_EXIT.to_string(),
            CheckerConfig {
                only_extension: Some(".go".to_string()),
                test_exceptions: vec!["*_test.go".to_string()],
                ..Default::default()
            },
        );
        checkers.insert(
            SECRETS.to_string(),
            CheckerConfig {
                test_config_exceptions: vec![
                    "test-config.ts".to_string(),
                    "test-config.js".to_string(),
                    "*test*.json".to_string(),
                ],
                ..Default::default()
            },
        );

        let mut tools = BTreeMap::new();
        tools.insert(
            SHELL.to_string(),
            ToolConfig {
                blocked_patterns: crate::tools::DEFAULT_BLOCKED_PATTERNS
                    .iter()
                    .map(|p| p.to_string())
                    .collect(),
                ..Default::default()
            },
        );
        tools.insert(
            FORMATTER.to_string(),
            ToolConfig {
                formatters: crate::tools::default_formatters(),
                ..Default::default()
            },
        );
        tools.insert(
            NOTIFIER.to_string(),
            ToolConfig {
                sound: true,
                desktop: true,
                terminal_title: true,
                ..Default::default()
            },
        );

        Self {
            general: GeneralConfig::default(),
            checkers,
            tools,
        }
    }
}

impl Config {
    /// A configuration with no checkers at all.
    pub fn empty() -> Self {
        Self {
            general: GeneralConfig::default(),
            checkers: BTreeMap::new(),
            tools: BTreeMap::new(),
        }
    }

    /// Resolve the config location: explicit path, then
    /// `HOOKWARDEN_CONFIG`, then `~/.claude/hooks/hookwarden.toml`.
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        dirs::home_dir()
            .map(|h| h.join(".claude/hooks/hookwarden.toml"))
            .ok_or(ConfigError::NoHomeDir)
    }

    /// Load from `path`, writing the built-in default there first when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            Self::from_toml(&fs::read_to_string(path)?)?
        } else {
            let config = Config::default();
            config.save(path)?;
            config
        };
        config.validate()?;
        config.expand_paths();
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write the config, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if level_directive(&self.general.log_level).is_none() {
            return Err(ConfigError::InvalidLogLevel(self.general.log_level.clone()));
        }
        if self.general.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }

    /// Options for an enabled rule checker.
    pub fn checker(&self, name: &str) -> Option<&CheckerConfig> {
        self.checkers.get(name).filter(|c| c.enabled)
    }

    /// Options for an enabled tool checker.
    pub fn tool(&self, name: &str) -> Option<&ToolConfig> {
        self.tools.get(name).filter(|t| t.enabled)
    }

    fn expand_paths(&mut self) {
        self.general.log_file = expand_home(&self.general.log_file);
        for tool in self.tools.values_mut() {
            if let Some(dir) = &tool.work_dir {
                tool.work_dir = Some(expand_home(dir));
            }
        }
    }
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().into_owned(),
        _ => path.to_string(),
    }
}
