//! Sensitive data redaction
//!
//! Redaction is the last step before serialization. Map entries whose key
//! matches a sensitive name (case-insensitive, exact) are replaced with the
//! mask wholesale; every remaining string scalar is passed through the value
//! patterns in order. Nested maps and sequences are walked at any depth.

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Replacement written in place of redacted data
pub const REDACTION_MASK: &str = "***";

/// Key names redacted when no explicit set is configured
pub const DEFAULT_REDACT_KEYS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "api_key",
    "apikey",
    "authorization",
    "auth",
];

/// Compiled redaction rules
#[derive(Clone, Default)]
pub struct Redactor {
    /// Sensitive key names, lowercased
    keys: HashSet<String>,

    /// Compiled value patterns, applied in order
    patterns: Vec<Regex>,
}

impl Redactor {
    /// Compile a redactor from key names and value patterns
    ///
    /// Patterns that fail to compile are skipped with a warning on stderr;
    /// a bad pattern never prevents logging from starting.
    pub fn new<K, P>(keys: K, patterns: P) -> Self
    where
        K: IntoIterator,
        K::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let keys = keys
            .into_iter()
            .map(|k| k.as_ref().to_lowercase())
            .collect();

        let patterns = patterns
            .into_iter()
            .filter_map(|p| match Regex::new(p.as_ref()) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    eprintln!(
                        "[LOGGER WARNING] Ignoring invalid redaction pattern '{}': {}",
                        p.as_ref(),
                        e
                    );
                    None
                }
            })
            .collect();

        Self { keys, patterns }
    }

    /// Redactor with no rules; returns input unchanged
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        !self.keys.is_empty() || !self.patterns.is_empty()
    }

    /// Check if a key name is sensitive
    pub fn is_sensitive_key(&self, key: &str) -> bool {
        !self.keys.is_empty() && self.keys.contains(&key.to_lowercase())
    }

    /// Apply the value patterns to a string
    pub fn scrub_str(&self, text: &str) -> String {
        let mut result = text.to_string();
        for pattern in &self.patterns {
            if pattern.is_match(&result) {
                result = pattern.replace_all(&result, REDACTION_MASK).into_owned();
            }
        }
        result
    }

    /// Redact an arbitrary value, returning a new value
    pub fn redact(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(self.redact_map(map)),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.redact(v)).collect()),
            Value::String(s) if !self.patterns.is_empty() => Value::String(self.scrub_str(s)),
            other => other.clone(),
        }
    }

    /// Redact every entry of a map, returning a new map
    pub fn redact_map(&self, map: &Map<String, Value>) -> Map<String, Value> {
        map.iter()
            .map(|(key, value)| {
                let value = if self.is_sensitive_key(key) {
                    Value::String(REDACTION_MASK.to_string())
                } else {
                    self.redact(value)
                };
                (key.clone(), value)
            })
            .collect()
    }
}

impl std::fmt::Debug for Redactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redactor")
            .field("keys_count", &self.keys.len())
            .field("patterns_count", &self.patterns.len())
            .finish()
    }
}
