//! Name filters: shell-style masks and regular expressions compiled into one
//! case-insensitive, start-anchored path predicate.
//!
//! Masks follow `fnmatch` semantics rather than path-aware globbing:
//! - `*` matches any run of characters, including `/`
//! - `?` matches exactly one character
//! - `[...]` matches a character set, `[!...]` its complement
//! - an unterminated `[` is a literal bracket
//!
//! A translated mask must consume the whole path; a user regexp only has to
//! match at position 0.

#![allow(missing_docs)]

use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Serialize, Serializer};

use crate::core::errors::{FeedError, Result};

/// Translate a shell mask into an (unanchored-at-start) regular expression.
///
/// The result always ends with `\z`, so `*.avi` never matches `movie.avi.part`.
/// Anchoring at the start is added by [`PathMatcher`].
pub fn mask_to_regex(mask: &str) -> String {
    let chars: Vec<char> = mask.chars().collect();
    let mut out = String::with_capacity(mask.len() * 2 + 8);
    out.push_str("(?s:");

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => {
                // Collapse runs of stars; `**` means the same as `*` here.
                while i < chars.len() && chars[i] == '*' {
                    i += 1;
                }
                out.push_str(".*");
            }
            '?' => {
                out.push('.');
                i += 1;
            }
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    push_class(&mut out, &chars[i + 1..end]);
                    i = end + 1;
                }
                None => {
                    out.push_str(r"\[");
                    i += 1;
                }
            },
            c => {
                out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
                i += 1;
            }
        }
    }

    out.push_str(r")\z");
    out
}

/// Index of the `]` closing the set opened at `open`, if the set is terminated.
///
/// A `]` directly after `[` or `[!` is a member of the set, not its end.
fn class_end(chars: &[char], open: usize) -> Option<usize> {
    let mut j = open + 1;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    while j < chars.len() && chars[j] != ']' {
        j += 1;
    }
    (j < chars.len()).then_some(j)
}

fn push_class(out: &mut String, body: &[char]) {
    out.push('[');
    let mut rest = body;
    if let Some((&'!', tail)) = rest.split_first() {
        out.push('^');
        rest = tail;
    }
    let mut prev = None;
    for &c in rest {
        match c {
            // Set-operation and nesting syntax in the regex engine; literal in a mask.
            '\\' | '[' | ']' | '&' | '~' | '^' => {
                out.push('\\');
                out.push(c);
            }
            '-' if prev == Some('-') => out.push_str(r"\-"),
            _ => out.push(c),
        }
        prev = Some(c);
    }
    out.push(']');
}

/// Anchored form reported for a matcher with no pattern.
const MATCH_ALL: &str = "^(?:)";

/// Compiled, case-insensitive path predicate anchored at the start of the string.
///
/// A matcher without a compiled regex accepts every candidate.
#[derive(Clone)]
pub struct PathMatcher {
    source: Option<String>,
    regex: Option<Regex>,
}

impl PathMatcher {
    /// A matcher that accepts every candidate.
    pub const fn any() -> Self {
        Self {
            source: None,
            regex: None,
        }
    }

    /// Compile a user-supplied regular expression.
    pub fn from_regex(pattern: &str) -> Result<Self> {
        Self::compile(Some(pattern), pattern)
    }

    /// Compile a shell mask via [`mask_to_regex`].
    pub fn from_mask(mask: &str) -> Result<Self> {
        Self::compile(Some(mask), &mask_to_regex(mask))
    }

    fn compile(source: Option<&str>, pattern: &str) -> Result<Self> {
        let anchored = format!("^(?:{pattern})");
        let regex = RegexBuilder::new(&anchored)
            .case_insensitive(true)
            .build()
            .map_err(|err| FeedError::InvalidPattern {
                pattern: source.unwrap_or(pattern).to_string(),
                details: err.to_string(),
            })?;
        Ok(Self {
            source: source.map(str::to_string),
            regex: Some(regex),
        })
    }

    /// Whether `candidate` matches from its first character.
    pub fn is_match(&self, candidate: &str) -> bool {
        self.regex.as_ref().is_none_or(|regex| regex.is_match(candidate))
    }

    /// The mask or regexp this matcher was built from, if any.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// The compiled (anchored) regular expression.
    pub fn as_str(&self) -> &str {
        self.regex.as_ref().map_or(MATCH_ALL, Regex::as_str)
    }

    /// Whether this matcher accepts everything.
    pub fn is_match_all(&self) -> bool {
        self.source.is_none()
    }
}

impl Default for PathMatcher {
    fn default() -> Self {
        Self::any()
    }
}

impl fmt::Debug for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathMatcher")
            .field("source", &self.source)
            .field("regex", &self.as_str())
            .finish()
    }
}

impl PartialEq for PathMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for PathMatcher {}

impl Serialize for PathMatcher {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
