//! Path pattern matching.
//!
//! # Responsibilities
//! - Parse route patterns into literal and parameter segments
//! - Match request paths segment by segment (case-sensitive)
//! - Extract `:name` path parameters, percent-decoded
//! - Compute the remainder below a `/*` prefix for mounted sub-routers
//!
//! # Design Decisions
//! - No regex: a pattern is a flat segment list plus a prefix flag
//! - Exact patterns do not match a trailing slash (`/a` ≠ `/a/`)
//! - A prefix pattern matches its own prefix (`/sub/*` matches `/sub`)
//! - Malformed patterns are reported by `check`, not at construction,
//!   so route registration stays chainable

use std::fmt;

use percent_encoding::percent_decode_str;

use crate::routing::router::RouterError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
    prefix: bool,
}

/// Result of matching a path against a [`PathPattern`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMatch {
    /// Bound path parameters in pattern order.
    pub params: Vec<(String, String)>,
    /// Path below the matched prefix, always starting with `/`.
    /// `None` for exact patterns.
    pub remainder: Option<String>,
}

impl PathPattern {
    /// Parse a pattern such as `/users/:id` or `/sub/*`.
    pub fn new(pattern: impl Into<String>) -> Self {
        let raw = pattern.into();
        let mut parts = split_path(&raw);
        let prefix = parts.last() == Some(&"*");
        if prefix {
            parts.pop();
        }
        let segments = parts
            .into_iter()
            .map(|part| match part.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(part.to_string()),
            })
            .collect();

        Self {
            raw,
            segments,
            prefix,
        }
    }

    /// The pattern used by routes registered without a path.
    pub fn any() -> Self {
        Self {
            raw: "/*".to_string(),
            segments: Vec::new(),
            prefix: true,
        }
    }

    /// Original pattern text.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the pattern ends in `/*`.
    pub fn is_prefix(&self) -> bool {
        self.prefix
    }

    /// Report malformed patterns.
    pub fn check(&self) -> Result<(), RouterError> {
        let invalid = |reason: &'static str| RouterError::InvalidPattern {
            pattern: self.raw.clone(),
            reason,
        };

        if !self.raw.starts_with('/') {
            return Err(invalid("pattern must start with '/'"));
        }
        for segment in &self.segments {
            match segment {
                Segment::Param(name) if name.is_empty() => {
                    return Err(invalid("path parameter needs a name"));
                }
                Segment::Literal(text) if text.contains('*') => {
                    return Err(invalid("'*' is only allowed as the final segment"));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Match a request path, binding parameters on success.
    pub fn matches(&self, path: &str) -> Option<PathMatch> {
        let parts = split_path(path);
        if parts.len() < self.segments.len() || (!self.prefix && parts.len() != self.segments.len()) {
            return None;
        }

        let mut params = Vec::new();
        for (segment, part) in self.segments.iter().zip(&parts) {
            match segment {
                Segment::Literal(text) if text == part => {}
                Segment::Param(name) if !part.is_empty() => {
                    let value = percent_decode_str(part).decode_utf8_lossy().into_owned();
                    params.push((name.clone(), value));
                }
                _ => return None,
            }
        }

        let remainder = self
            .prefix
            .then(|| format!("/{}", parts[self.segments.len()..].join("/")));

        Some(PathMatch { params, remainder })
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Split a path into segments after its leading slash. `/` has none.
fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}
