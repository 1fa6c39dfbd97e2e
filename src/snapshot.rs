//! The file view rule checkers scan.

use std::path::Path;

use crate::exceptions::{is_documentation_file, is_test_file};
use crate::input::ToolInvocationEvent;

/// Text about to be written to a file, plus what is known about the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    pub path: String,
    pub content: String,
    /// Lowercased extension with its leading dot (`.go`), empty when absent.
    pub extension: String,
    pub is_test: bool,
    pub is_docs: bool,
}

impl FileSnapshot {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let extension = Path::new(&path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default();
        Self {
            is_test: is_test_file(&path),
            is_docs: is_documentation_file(&path),
            extension,
            content: content.into(),
            path,
        }
    }

    /// Snapshot for events that reference a file; `None` otherwise.
    pub fn from_event(event: &ToolInvocationEvent) -> Option<Self> {
        let path = event.file_path.as_deref().filter(|p| !p.is_empty())?;
        Some(Self::new(path, event.written_text().unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::EventKind;

    #[test]
    fn test_extension_and_flags() {
        let s = FileSnapshot::new("web/App.test.tsx", "x");
        assert_eq!(s.extension, ".tsx");
        assert!(s.is_test);
        assert!(!s.is_docs);

        let d = FileSnapshot::new("docs/guide.md", "");
        assert!(d.is_docs);
        assert_eq!(d.extension, ".md");

        assert_eq!(FileSnapshot::new("src/Main.GO", "").extension, ".go");

        let none = FileSnapshot::new("Makefile", "");
        assert_eq!(none.extension, "");
    }

    #[test]
    fn test_from_event_prefers_content() {
        let mut event = ToolInvocationEvent::new(EventKind::Edit);
        event.file_path = Some("a.go".to_string());
        event.new_string = Some("new".to_string());
        assert_eq!(FileSnapshot::from_event(&event).unwrap().content, "new");

        event.content = Some("full".to_string());
        assert_eq!(FileSnapshot::from_event(&event).unwrap().content, "full");
    }

    #[test]
    fn test_from_event_without_file() {
        let event = ToolInvocationEvent::new(EventKind::Bash).with_command("ls");
        assert!(FileSnapshot::from_event(&event).is_none());
    }
}
