//! Canonical query shapes.

use std::fmt::Display;
use std::ops::Deref;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use super::Error;

static STRING_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"'(?:[^']|'')*'"#).unwrap());
static NUMERIC_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(^|[^A-Za-z0-9_$:.])-?[0-9]+(?:\.[0-9]+)?(?:[eE][-+]?[0-9]+)?\b"#).unwrap()
});
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\s+"#).unwrap());

/// Statement text with literals removed.
///
/// Two statements that differ only in literal values share a shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalShape {
    shape: Arc<str>,
}

impl CanonicalShape {
    pub fn new(shape: &str) -> Self {
        Self {
            shape: Arc::from(shape),
        }
    }
}

impl Deref for CanonicalShape {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.shape
    }
}

impl Display for CanonicalShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.shape)
    }
}

impl From<&str> for CanonicalShape {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Reduces a statement to its canonical shape.
pub trait Fingerprint: Send + Sync {
    fn shape(&self, sql: &str) -> Result<CanonicalShape, Error>;
}

/// Default fingerprint: replaces string and numeric literals
/// with `?` and collapses whitespace. Bind variable
/// placeholders (`:name`, `$1`) are left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize statement text.
    pub fn normalize(sql: &str) -> String {
        let sql = STRING_LITERAL.replace_all(sql, "?");
        let sql = NUMERIC_LITERAL.replace_all(&sql, "${1}?");
        let sql = WHITESPACE.replace_all(&sql, " ");
        sql.trim().trim_end_matches(';').trim_end().to_string()
    }
}

impl Fingerprint for Normalizer {
    fn shape(&self, sql: &str) -> Result<CanonicalShape, Error> {
        let shape = Self::normalize(sql);
        if shape.is_empty() {
            return Err(Error::EmptyQuery);
        }
        Ok(CanonicalShape::new(&shape))
    }
}
