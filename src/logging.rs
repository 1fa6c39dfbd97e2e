//! Logger handle and subscriber installation.
//!
//! Components never reach for a global logger: each constructor receives a
//! [`Logger`] and derives child handles with [`Logger::with`]. The handle
//! only carries scope fields; records are emitted through `tracing`.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

/// An immutable logging scope, e.g. `component=engine checker=secrets`.
#[derive(Debug, Clone, Default)]
pub struct Logger {
    fields: Arc<Vec<(&'static str, String)>>,
}

impl Logger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A child handle with one more scope field; `self` is left untouched.
    pub fn with(&self, key: &'static str, value: impl fmt::Display) -> Self {
        let mut fields = Vec::with_capacity(self.fields.len() + 1);
        fields.extend(self.fields.iter().cloned());
        fields.push((key, value.to_string()));
        Self {
            fields: Arc::new(fields),
        }
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn trace(&self, message: impl fmt::Display) {
        tracing::trace!(scope = %self, "{message}");
    }

    pub fn debug(&self, message: impl fmt::Display) {
        tracing::debug!(scope = %self, "{message}");
    }

    pub fn info(&self, message: impl fmt::Display) {
        tracing::info!(scope = %self, "{message}");
    }

    pub fn warn(&self, message: impl fmt::Display) {
        tracing::warn!(scope = %self, "{message}");
    }

    pub fn error(&self, message: impl fmt::Display) {
        tracing::error!(scope = %self, "{message}");
    }
}

impl fmt::Display for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// Map the configured level onto an `EnvFilter` directive.
pub fn level_directive(level: &str) -> Option<&'static str> {
    match level.to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

/// Install the global subscriber. `RUST_LOG` overrides `level`; an empty
/// `log_file` writes records to stderr.
pub fn init(level: &str, log_file: &str) -> io::Result<()> {
    let directive = level_directive(level).unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if log_file.is_empty() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .with_target(false)
            .try_init();
        return Ok(());
    }

    let path = Path::new(log_file);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init();
    Ok(())
}
