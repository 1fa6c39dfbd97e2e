//! Input parsing for Claude Code hook invocations.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Errors that can occur when parsing hook input.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// The raw JSON object Claude Code writes to stdin.
#[derive(Debug, Clone, Deserialize)]
pub struct HookInput {
    /// The tool being invoked (e.g., "Bash", "Write", "Edit").
    #[serde(default)]
    pub tool_name: Option<String>,

    /// The tool's input parameters as raw JSON (object or JSON-encoded string).
    #[serde(default)]
    pub tool_input: serde_json::Value,

    #[serde(default)]
    pub session_id: Option<String>,

    #[serde(default)]
    pub cwd: Option<String>,

    #[serde(default)]
    pub transcript_path: Option<String>,

    #[serde(default)]
    pub file_path: Option<String>,

    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub new_string: Option<String>,

    #[serde(default)]
    pub command: Option<String>,
}

/// The kind of action the assistant proposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Write,
    Edit,
    MultiEdit,
    Bash,
    Stop,
    Other(String),
}

impl EventKind {
    pub fn from_tool_name(name: &str) -> Self {
        match name {
            "Write" => EventKind::Write,
            "Edit" => EventKind::Edit,
            "MultiEdit" => EventKind::MultiEdit,
            "Bash" => EventKind::Bash,
            "Stop" => EventKind::Stop,
            other => EventKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Write => "Write",
            EventKind::Edit => "Edit",
            EventKind::MultiEdit => "MultiEdit",
            EventKind::Bash => "Bash",
            EventKind::Stop => "Stop",
            EventKind::Other(name) => name,
        }
    }

    /// Kinds that write file content and therefore get a file snapshot.
    pub fn is_file_write(&self) -> bool {
        matches!(self, EventKind::Write | EventKind::Edit | EventKind::MultiEdit)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One proposed action, normalized from the raw hook payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInvocationEvent {
    #[serde(rename = "tool_name")]
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_path: Option<String>,
}

impl ToolInvocationEvent {
    /// A bare event of the given kind.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            session_id: None,
            file_path: None,
            content: None,
            new_string: None,
            command: None,
            cwd: None,
            transcript_path: None,
        }
    }

    /// The synthetic event used when a session-end payload is unusable.
    pub fn stop() -> Self {
        Self::new(EventKind::Stop)
    }

    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self.content = Some(content.into());
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Text that would land in the file: full content, else replacement text.
    pub fn written_text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .filter(|c| !c.is_empty())
            .or(self.new_string.as_deref())
    }
}

impl HookInput {
    /// Parse from JSON string.
    pub fn parse(json: &str) -> Result<Self, InputError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Normalize into a flat event; `tool_name` is required.
    pub fn into_event(self) -> Result<ToolInvocationEvent, InputError> {
        let tool_name = self
            .tool_name
            .clone()
            .ok_or(InputError::MissingField("tool_name"))?;
        Ok(self.into_event_as(EventKind::from_tool_name(&tool_name)))
    }

    /// Normalize into a flat event of a fixed kind (used for session end).
    pub fn into_event_as(self, kind: EventKind) -> ToolInvocationEvent {
        let params = self.params();
        let mut event = ToolInvocationEvent {
            kind,
            session_id: self.session_id,
            file_path: self.file_path,
            content: self.content,
            new_string: self.new_string,
            command: self.command,
            cwd: self.cwd,
            transcript_path: self.transcript_path,
        };

        let Some(params) = params else {
            return event;
        };
        let text = |key: &str| params.get(key).and_then(|v| v.as_str()).map(String::from);

        match event.kind {
            EventKind::Write => {
                event.file_path = text("file_path").or(event.file_path);
                event.content = text("content").or(event.content);
            }
            EventKind::Edit => {
                event.file_path = text("file_path").or(event.file_path);
                event.new_string = text("new_string").or(event.new_string);
            }
            EventKind::MultiEdit => {
                event.file_path = text("file_path").or(event.file_path);
                if let Some(edits) = params.get("edits").and_then(|v| v.as_array()) {
                    let joined: Vec<&str> = edits
                        .iter()
                        .filter_map(|e| e.get("new_string").and_then(|v| v.as_str()))
                        .collect();
                    if !joined.is_empty() {
                        event.new_string = Some(joined.join("\n"));
                    }
                }
            }
            EventKind::Bash => {
                event.command = text("command").or(event.command);
            }
            EventKind::Stop | EventKind::Other(_) => {
                event.file_path = text("file_path").or(event.file_path);
            }
        }

        event
    }

    /// The kind-specific parameter object; a JSON-encoded string is unwrapped.
    fn params(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        match &self.tool_input {
            serde_json::Value::Object(map) => Some(map.clone()),
            serde_json::Value::String(raw) => match serde_json::from_str(raw) {
                Ok(serde_json::Value::Object(map)) => Some(map),
                _ => None,
            },
            _ => None,
        }
    }
}
