//! Save-name pattern dialect
//!
//! Patterns are matched against bare file names, anchored at the first
//! character (prefix match):
//! - `#` matches a run of one or more digits
//! - `?` matches exactly one character
//! - a pattern that is exactly `*` matches every name
//! - anything else, including a `*` inside a longer pattern, is literal

use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;

/// A single compiled pattern
#[derive(Clone)]
pub struct Matcher {
    /// Pattern as the user wrote it
    source: String,
    /// Anchored translation
    regex: Regex,
}

impl Matcher {
    /// Compile a pattern
    pub fn compile(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(Error::EmptyPattern);
        }

        let regex = Regex::new(&translate(pattern)).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Check whether `name` starts with a string satisfying this pattern
    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Matcher").field(&self.source).finish()
    }
}

/// Translate a pattern into an anchored regular expression
fn translate(pattern: &str) -> String {
    if pattern == "*" {
        return "^".to_string();
    }

    let mut out = String::with_capacity(pattern.len() * 2 + 1);
    out.push('^');

    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '#' => out.push_str(r"\d+"),
            '?' => out.push_str("(?s:.)"),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }

    out
}

/// Check `name` against a list of matchers (OR semantics)
pub fn matches(name: &str, matchers: &[Matcher]) -> bool {
    matchers.iter().any(|m| m.is_match(name))
}

/// The active pattern list
#[derive(Debug, Clone)]
pub struct PatternSet {
    matchers: Vec<Matcher>,
}

impl PatternSet {
    /// Compile every pattern; fails on the first invalid one
    pub fn compile<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let matchers = patterns
            .into_iter()
            .map(|p| Matcher::compile(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        if matchers.is_empty() {
            return Err(Error::NoPatterns);
        }

        Ok(Self { matchers })
    }

    /// Check whether any pattern matches `name`
    pub fn matches(&self, name: &str) -> bool {
        matches(name, &self.matchers)
    }
}
