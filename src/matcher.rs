//! Line-oriented pattern matching shared by every checker.

use regex::Regex;

use crate::config::ConfigError;

/// A compiled pattern: a regular expression or a plain substring.
#[derive(Debug, Clone)]
pub enum Pattern {
    Regex(Regex),
    Literal(String),
}

impl Pattern {
    /// Compile a regex, reporting the offending source on failure.
    pub fn regex(source: &str) -> Result<Self, ConfigError> {
        Regex::new(source)
            .map(Pattern::Regex)
            .map_err(|e| ConfigError::Regex {
                pattern: source.to_string(),
                source: e,
            })
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Pattern::Literal(text.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Pattern::Regex(re) => re.as_str(),
            Pattern::Literal(s) => s,
        }
    }

    /// Byte ranges of every non-overlapping occurrence in `line`.
    fn find_in(&self, line: &str) -> Vec<(usize, usize)> {
        match self {
            Pattern::Regex(re) => re.find_iter(line).map(|m| (m.start(), m.end())).collect(),
            Pattern::Literal(needle) if needle.is_empty() => Vec::new(),
            Pattern::Literal(needle) => line
                .match_indices(needle.as_str())
                .map(|(start, text)| (start, start + text.len()))
                .collect(),
        }
    }
}

/// One occurrence of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column (in characters) of the match start.
    pub column: usize,
    pub text: String,
    /// Source of the pattern that produced the match.
    pub pattern: String,
}

/// Scan `content` line by line; for each line and each pattern, report every
/// non-overlapping occurrence in order.
pub fn find_matches(content: &str, patterns: &[Pattern]) -> Vec<PatternMatch> {
    let mut matches = Vec::new();
    if content.is_empty() {
        return matches;
    }

    for (idx, line) in content.split('\n').enumerate() {
        for pattern in patterns {
            for (start, end) in pattern.find_in(line) {
                matches.push(PatternMatch {
                    line: idx + 1,
                    column: column_of(line, start),
                    text: line[start..end].to_string(),
                    pattern: pattern.as_str().to_string(),
                });
            }
        }
    }

    matches
}

/// 1-based character column of a byte offset within `line`.
pub fn column_of(line: &str, byte_offset: usize) -> usize {
    line[..byte_offset].chars().count() + 1
}
