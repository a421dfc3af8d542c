//! Pattern based extraction of the status token from a response body.

use crate::error::ExtractError;
use regex::Regex;

/// Pattern used when `statusPattern` is not configured (or invalid).
pub const DEFAULT_PATTERN: &str = "([0-9]{1,3})";

/// Capture group used when `patternGroupToExtract` is not configured.
pub const DEFAULT_GROUP: usize = 1;

/// Applies a configured regex to response bodies.
///
/// Immutable after construction.
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    pattern: Regex,
    group: usize,
}

impl PatternExtractor {
    pub fn new(pattern: Regex, group: usize) -> Self {
        Self { pattern, group }
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn group(&self) -> usize {
        self.group
    }

    /// Whether the configured group index exists in the pattern.
    ///
    /// Group 0 is the whole match and always exists.
    pub fn group_in_range(&self) -> bool {
        self.group < self.pattern.captures_len()
    }

    /// Extract the configured group from `body`.
    pub fn extract<'b>(&self, body: &'b str) -> Result<&'b str, ExtractError> {
        extract(&self.pattern, body, self.group)
    }
}

impl Default for PatternExtractor {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
            group: DEFAULT_GROUP,
        }
    }
}

pub fn default_pattern() -> Regex {
    Regex::new(DEFAULT_PATTERN).expect("default status pattern is a valid regex")
}

/// Apply `pattern` to `body` and return the substring captured by `group`.
pub fn extract<'b>(pattern: &Regex, body: &'b str, group: usize) -> Result<&'b str, ExtractError> {
    let captures = pattern
        .captures(body)
        .ok_or(ExtractError::PatternMismatch)?;

    if group >= captures.len() {
        return Err(ExtractError::InvalidGroup {
            index: group,
            groups: captures.len(),
        });
    }

    // An optional group that did not take part in the match
    captures
        .get(group)
        .map(|m| m.as_str())
        .ok_or(ExtractError::PatternMismatch)
}
