//! Template variable handling
//!
//! Provides variable substitution using {{ placeholder }} syntax.
//! Values are JSON values so callers can bind strings, numbers, booleans
//! and arrays (for {{#each}} blocks) from the same container.

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::LazyLock;

/// `{{ identifier }}` with optional whitespace around the identifier
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("placeholder pattern is valid")
});

/// Block openers, `{{#if identifier}}` and `{{#each identifier}}`
static BLOCK_OPENER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{#(?:if|each)\s+([A-Za-z0-9_]+)\s*\}\}").expect("block opener pattern is valid")
});

/// Marker words that look like placeholders but belong to block syntax
const KEYWORDS: &[&str] = &["else", "this"];

/// Template variables container
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variables {
    /// Variable name -> value mapping
    vars: HashMap<String, Value>,
}

impl Variables {
    /// Create an empty Variables container
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable value
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.vars.insert(key.to_string(), value.into());
    }

    /// Builder form of [`Variables::set`]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Get a variable value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    /// Whether the variable is bound to a truthy value
    pub fn is_truthy(&self, key: &str) -> bool {
        is_truthy(self.vars.get(key))
    }

    /// Parse KEY=VALUE strings and add them as variables.
    ///
    /// A value that parses as JSON (`3`, `true`, `["a","b"]`) is stored as
    /// that JSON value, anything else is stored as a plain string.
    pub fn add_from_pairs(&mut self, pairs: &[String]) {
        for pair in pairs {
            if let Some((key, value)) = pair.split_once('=') {
                let value = value.trim();
                let parsed = serde_json::from_str::<Value>(value)
                    .unwrap_or_else(|_| Value::String(value.to_string()));
                self.set(key.trim(), parsed);
            }
        }
    }

    /// Replace all {{placeholder}} patterns in a string.
    ///
    /// Unbound placeholders are left exactly as written.
    pub fn substitute(&self, content: &str) -> String {
        PLACEHOLDER
            .replace_all(content, |caps: &Captures| match self.vars.get(&caps[1]) {
                Some(value) => display_value(value),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Find all variables used in a string
    pub fn find_used_variables(content: &str) -> Vec<String> {
        let mut vars: Vec<String> = PLACEHOLDER
            .captures_iter(content)
            .chain(BLOCK_OPENER.captures_iter(content))
            .map(|cap| cap[1].to_string())
            .filter(|name| !KEYWORDS.contains(&name.as_str()))
            .collect();

        vars.sort();
        vars.dedup();
        vars
    }

    /// Get all defined variable names
    pub fn names(&self) -> Vec<&String> {
        let mut names: Vec<_> = self.vars.keys().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl From<Map<String, Value>> for Variables {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            vars: map.into_iter().collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Variables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Truthiness used by {{#if}}: absent, null, false, 0 and "" are falsy
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// String form of a value as it appears in compiled output
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => display_number(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => display_value(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

fn display_number(n: &serde_json::Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        // Integral floats print without a fractional part
        Some(f) if f == 0.0 => "0".to_string(),
        Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        _ => n.to_string(),
    }
}
