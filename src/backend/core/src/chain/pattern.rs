//! Ant-style request path patterns.
//!
//! * `**` matches any number of path segments, including none.
//! * `*` matches any run of characters within one segment.
//! * `?` matches exactly one character other than `/`.
//!
//! `/rest/**` therefore matches `/rest`, `/rest/` and `/rest/workspaces/topp`.

use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::{GuardError, Result};

/// A compiled path pattern. Equality and display use the source text.
#[derive(Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
}

impl PathPattern {
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let source = pattern.into();
        let trimmed = source.trim();

        if trimmed.is_empty() {
            return Err(GuardError::invalid_pattern(source, "pattern is empty"));
        }
        if trimmed != source {
            return Err(GuardError::invalid_pattern(
                source,
                "pattern has leading or trailing whitespace",
            ));
        }
        if !source.starts_with('/') && !source.starts_with("**") {
            return Err(GuardError::invalid_pattern(
                source,
                "pattern must start with '/' or '**'",
            ));
        }

        let regex = Regex::new(&to_regex(&source)).map_err(|e| {
            GuardError::invalid_pattern(source.clone(), e.to_string())
        })?;

        Ok(Self { source, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

fn to_regex(pattern: &str) -> String {
    let bytes = pattern.as_bytes();
    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');

    let mut i = 0;
    while i < bytes.len() {
        let rest = &pattern[i..];
        if rest.starts_with("/**") && (rest.len() == 3 || rest.as_bytes()[3] == b'/') {
            out.push_str("(?:/.*)?");
            i += 3;
        } else if rest.starts_with("**") {
            out.push_str(".*");
            i += 2;
        } else {
            let ch = rest.chars().next().unwrap_or_default();
            match ch {
                '*' => out.push_str("[^/]*"),
                '?' => out.push_str("[^/]"),
                other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
            i += ch.len_utf8();
        }
    }

    out.push('$');
    out
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for PathPattern {}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathPattern").field(&self.source).finish()
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Serialize for PathPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl TryFrom<&str> for PathPattern {
    type Error = GuardError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
