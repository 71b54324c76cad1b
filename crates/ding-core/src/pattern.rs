//! Glob patterns that select hub notifications.
//!
//! A pattern is a `/`-separated path with an optional `?key` suffix. Two
//! wildcards are recognised:
//!
//! | Token | Matches |
//! |-------|---------|
//! | `*`   | any run of characters inside one segment (no `/`, no `?`) |
//! | `**`  | any run of characters, including `/` and `?` |
//! | `/**` | zero or more whole segments |
//!
//! Matching is anchored at both ends and case-insensitive. The literal
//! characters `[`, `]`, `/` and `?` are escaped before the wildcards are
//! expanded, so array-index syntax such as `list[0]` matches literally. Any
//! other regular-expression syntax passes through untouched, which is why a
//! pattern can fail to compile.
//!
//! # Example
//!
//! ```
//! use ding_core::pattern::Pattern;
//!
//! let p = Pattern::compile("/timer/*?value").unwrap();
//! assert!(p.matches("/timer/t1?value"));
//! assert!(p.matches("/Timer/T1?VALUE"));
//! assert!(!p.matches("/timer/t1/x?value"));
//! ```

use regex::{Regex, RegexBuilder};
use std::fmt;

/// A subscription pattern could not be turned into a matcher.
#[derive(Debug, thiserror::Error)]
#[error("invalid subscription pattern {pattern:?}: {source}")]
pub struct PatternError {
    /// The pattern text as passed to [`Pattern::compile`].
    pub pattern: String,
    #[source]
    source: regex::Error,
}

/// A compiled, anchored, case-insensitive path matcher.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile a glob into a matcher.
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        let expr = format!("^{}$", translate(&pattern.to_lowercase()));
        let regex = RegexBuilder::new(&expr)
            .case_insensitive(true)
            .build()
            .map_err(|source| PatternError {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// The pattern text this matcher was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The generated regular expression, mostly useful when debugging.
    pub fn expression(&self) -> &str {
        self.regex.as_str()
    }

    /// Test a full path (`path` or `path?key`) against the pattern.
    pub fn matches(&self, full_path: &str) -> bool {
        self.regex.is_match(&full_path.to_lowercase())
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("source", &self.source)
            .field("expression", &self.regex.as_str())
            .finish()
    }
}

/// Build the path used for matching: `path?key` when a key is present.
pub fn full_path(path: &str, key: Option<&str>) -> String {
    match key {
        Some(key) if !key.is_empty() => format!("{path}?{key}"),
        _ => path.to_string(),
    }
}

// Single left-to-right pass: `**` is consumed before a lone `*` can see it.
// A `/**` run that ends the segment also matches zero segments, so `a/**?x`
// accepts `a?x`. Followed by anything else it needs the slash.
fn translate(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::with_capacity(glob.len() * 2);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let double_star_at =
            |at: usize| chars.get(at) == Some(&'*') && chars.get(at + 1) == Some(&'*');
        match c {
            '/' if double_star_at(i + 1) => {
                let ends_segment = matches!(chars.get(i + 3), None | Some('?') | Some('/'));
                out.push_str(if ends_segment { r"(?:\/.*)?" } else { r"\/.*" });
                i += 3;
                continue;
            }
            '*' if double_star_at(i) => {
                out.push_str(".*");
                i += 2;
                continue;
            }
            '*' => out.push_str("[^/?]*"),
            '[' | ']' | '/' | '?' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
        i += 1;
    }
    out
}
