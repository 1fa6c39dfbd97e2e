//! Path-based exemptions shared by every rule checker.
//!
//! An entry containing glob metacharacters (`*`, `?`, `[`) is matched against
//! the file name; any other entry is a substring of the path. Relative paths
//! are matched as if rooted, so `/cmd/` also exempts `cmd/app/main.go`.

use globset::{Glob, GlobMatcher};

use crate::config::ConfigError;
use crate::logging::Logger;

const DOC_EXTENSIONS: &[&str] = &[".md", ".txt", ".rst", ".adoc"];
const DOC_FILES: &[&str] = &["README", "CHANGELOG", "LICENSE", "AUTHORS", "CONTRIBUTORS"];
const DOC_DIRS: &[&str] = &["/docs/", "/doc/", "/documentation/"];

const TEST_DIRS: &[&str] = &["/test/", "/tests/", "/testing/"];
const TEST_SUFFIXES: &[&str] = &[
    "_test.go",
    "_test.py",
    ".test.ts",
    ".test.js",
    ".test.tsx",
    ".test.jsx",
    ".spec.ts",
    ".spec.js",
    ".spec.tsx",
    ".spec.jsx",
];

/// One configured exemption.
#[derive(Debug, Clone)]
pub enum PathRule {
    Substring(String),
    Glob { pattern: String, matcher: GlobMatcher },
}

impl PathRule {
    pub fn parse(entry: &str) -> Result<Self, ConfigError> {
        if entry.contains(['*', '?', '[']) {
            let matcher = Glob::new(entry)
                .map_err(|e| ConfigError::Glob {
                    pattern: entry.to_string(),
                    source: e,
                })?
                .compile_matcher();
            Ok(PathRule::Glob {
                pattern: entry.to_string(),
                matcher,
            })
        } else {
            Ok(PathRule::Substring(entry.to_string()))
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathRule::Substring(needle) => rooted(path).contains(needle.as_str()),
            PathRule::Glob { matcher, .. } => matcher.is_match(file_name(path)),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PathRule::Substring(s) => s,
            PathRule::Glob { pattern, .. } => pattern,
        }
    }
}

/// A compiled list of exemptions.
#[derive(Debug, Clone, Default)]
pub struct PathRules(Vec<PathRule>);

impl PathRules {
    pub fn compile<S: AsRef<str>>(entries: &[S]) -> Result<Self, ConfigError> {
        entries
            .iter()
            .map(|e| PathRule::parse(e.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(PathRules)
    }

    /// The first rule matching `path`.
    pub fn find(&self, path: &str) -> Option<&PathRule> {
        self.0.iter().find(|rule| rule.matches(path))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Exemptions for one checker: the configured allowlist plus the checker's
/// own built-in carve-outs. Documentation and test files are always exempt.
#[derive(Debug, Clone, Default)]
pub struct ExceptionRules {
    configured: PathRules,
    builtin: PathRules,
}

impl ExceptionRules {
    pub fn new(configured: PathRules, builtin: PathRules) -> Self {
        Self { configured, builtin }
    }

    /// Configured entries (`exception_paths` + `exception_files`) and
    /// checker-specific built-in substrings.
    pub fn compile(
        exception_paths: &[String],
        exception_files: &[String],
        builtin: &[&str],
    ) -> Result<Self, ConfigError> {
        let configured: Vec<&str> = exception_paths
            .iter()
            .chain(exception_files)
            .map(String::as_str)
            .collect();
        Ok(Self::new(
            PathRules::compile(&configured)?,
            PathRules::compile(builtin)?,
        ))
    }

    /// Whether `path` is exempt, logging the reason at debug level.
    pub fn is_exempt(&self, path: &str, log: &Logger) -> bool {
        let log = log.with("file", path);
        if let Some(rule) = self.configured.find(path) {
            log.with("exception", rule.as_str())
                .debug("file matched configured exception");
            return true;
        }
        if is_documentation_file(path) {
            log.debug("file is documentation");
            return true;
        }
        if is_test_file(path) {
            log.debug("file is a test file");
            return true;
        }
        if let Some(rule) = self.builtin.find(path) {
            log.with("exception", rule.as_str())
                .debug("file matched checker exception");
            return true;
        }
        false
    }
}

pub fn is_documentation_file(path: &str) -> bool {
    let lower = path.to_lowercase();
    if DOC_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return true;
    }
    let stem = file_stem(path);
    if DOC_FILES.iter().any(|doc| stem.eq_ignore_ascii_case(doc)) {
        return true;
    }
    let rooted = rooted(path);
    DOC_DIRS.iter().any(|dir| rooted.contains(dir))
}

pub fn is_test_file(path: &str) -> bool {
    if TEST_SUFFIXES.iter().any(|suffix| path.ends_with(suffix)) {
        return true;
    }
    let rooted = rooted(path);
    TEST_DIRS.iter().any(|dir| rooted.contains(dir))
}

/// Case-insensitive suffix match against a fixed extension allowlist.
pub fn has_supported_extension(path: &str, extensions: &[&str]) -> bool {
    let lower = path.to_lowercase();
    extensions.iter().any(|ext| lower.ends_with(ext))
}

/// Last path component.
pub fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// File name without its final extension (`README.md` -> `README`).
pub fn file_stem(path: &str) -> &str {
    let name = file_name(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

fn rooted(path: &str) -> std::borrow::Cow<'_, str> {
    if path.starts_with('/') {
        std::borrow::Cow::Borrowed(path)
    } else {
        std::borrow::Cow::Owned(format!("/{path}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(paths: &[&str], builtin: &[&str]) -> ExceptionRules {
        let paths: Vec<String> = paths.iter().map(|s| s.to_string()).collect();
        ExceptionRules::compile(&paths, &[], builtin).unwrap()
    }

    #[test]
    fn test_documentation_files() {
        assert!(is_documentation_file("README.md"));
        assert!(is_documentation_file("notes.TXT"));
        assert!(is_documentation_file("LICENSE"));
        assert!(is_documentation_file("project/docs/api.go"));
        assert!(is_documentation_file("docs/api.go"));
        assert!(!is_documentation_file("src/handler.go"));
    }

    #[test]
    fn test_test_files() {
        assert!(is_test_file("pkg/service_test.go"));
        assert!(is_test_file("web/app.spec.tsx"));
        assert!(is_test_file("tests/helper.go"));
        assert!(is_test_file("/repo/test/helper.go"));
        assert!(!is_test_file("src/testing_utils.go"));
        assert!(!is_test_file("src/contest.go"));
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("a/b/README.md"), "README");
        assert_eq!(file_stem(".env"), ".env");
        assert_eq!(file_stem("Makefile"), "Makefile");
    }

    #[test]
    fn test_configured_substring_exception() {
        let r = rules(&["generated/"], &[]);
        assert!(r.is_exempt("src/generated/api.go", &Logger::default()));
        assert!(!r.is_exempt("src/api.go", &Logger::default()));
    }

    #[test]
    fn test_relative_paths_are_rooted() {
        let r = rules(&[], &["/cmd/", "/main.go"]);
        assert!(r.is_exempt("cmd/app/main.go", &Logger::default()));
        assert!(r.is_exempt("main.go", &Logger::default()));
        assert!(!r.is_exempt("domain.go", &Logger::default()));
    }

    #[test]
    fn test_glob_exception_matches_file_name() {
        let r = rules(&["*test*.json"], &[]);
        assert!(r.is_exempt("config/integration-test-data.json", &Logger::default()));
        assert!(!r.is_exempt("config/prod.json", &Logger::default()));
    }

    #[test]
    fn test_invalid_glob_is_construction_error() {
        assert!(PathRule::parse("[unclosed").is_err());
    }

    #[test]
    fn test_supported_extension() {
        assert!(has_supported_extension("a/B.GO", &[".go"]));
        assert!(!has_supported_extension("a/b.rs", &[".go", ".ts"]));
    }
}
