//! Override, override-set and axis types.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::errors::OverrideError;

/// Sigil marking a key that does not exist in the base config yet.
pub const ADD_PREFIX: char = '+';

/// Strip any leading add-prefix from a raw key.
///
/// Two overrides target the same config path when their normalized keys are
/// equal. Every precedence and collision check goes through this function.
pub fn normalize_key(raw: &str) -> &str {
    raw.trim_start_matches(ADD_PREFIX)
}

/// A single `key=value` change applied to the base configuration of one job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Override {
    key: String,
    value: String,
    is_additive: bool,
}

impl Override {
    /// Build an override from a raw key that may carry a single `+` prefix.
    pub fn new(raw_key: &str, value: impl Into<String>) -> Result<Self, OverrideError> {
        let (key, is_additive) = split_raw_key(raw_key)?;
        Ok(Self {
            key: key.to_string(),
            value: value.into(),
            is_additive,
        })
    }

    /// Normalized key, without the add-prefix.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_additive(&self) -> bool {
        self.is_additive
    }

    /// Key as it is rendered on the command line, add-prefix included.
    pub fn raw_key(&self) -> String {
        if self.is_additive {
            format!("{ADD_PREFIX}{}", self.key)
        } else {
            self.key.clone()
        }
    }
}

impl fmt::Display for Override {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_additive {
            write!(f, "{ADD_PREFIX}")?;
        }
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Split a raw key into its normalized form and the additive tag.
pub(crate) fn split_raw_key(raw_key: &str) -> Result<(&str, bool), OverrideError> {
    let (key, is_additive) = match raw_key.strip_prefix(ADD_PREFIX) {
        Some(rest) => (rest, true),
        None => (raw_key, false),
    };
    validate_key(raw_key, key)?;
    Ok((key, is_additive))
}

fn validate_key(raw_key: &str, key: &str) -> Result<(), OverrideError> {
    let invalid = |message: &str| OverrideError::InvalidKey {
        key: raw_key.to_string(),
        message: message.to_string(),
    };

    if key.is_empty() {
        return Err(invalid("key is empty"));
    }
    if key.starts_with(ADD_PREFIX) {
        return Err(invalid("only a single '+' prefix is supported"));
    }
    if key.starts_with('~') {
        return Err(invalid("delete overrides are not supported"));
    }
    if key.contains('=') || key.chars().any(char::is_whitespace) {
        return Err(invalid("key must not contain '=' or whitespace"));
    }
    Ok(())
}

/// One complete alternative assignment for a subset of keys.
///
/// Order only matters for deterministic rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverrideSet {
    overrides: Vec<Override>,
}

impl OverrideSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from `(raw_key, value)` pairs; values only need to be
    /// displayable.
    pub fn from_pairs<K, V, I>(pairs: I) -> Result<Self, OverrideError>
    where
        K: AsRef<str>,
        V: fmt::Display,
        I: IntoIterator<Item = (K, V)>,
    {
        pairs
            .into_iter()
            .map(|(key, value)| Override::new(key.as_ref(), value.to_string()))
            .collect()
    }

    pub fn push(&mut self, item: Override) {
        self.overrides.push(item);
    }

    /// Append every override of `other`, keeping order.
    pub fn extend_from(&mut self, other: &OverrideSet) {
        self.overrides.extend(other.overrides.iter().cloned());
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Override> {
        self.overrides.iter()
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    /// Set of normalized keys present in this set.
    pub fn keys(&self) -> HashSet<&str> {
        self.overrides.iter().map(Override::key).collect()
    }

    pub fn contains_key(&self, raw_key: &str) -> bool {
        let key = normalize_key(raw_key);
        self.overrides.iter().any(|o| o.key() == key)
    }

    pub fn get(&self, raw_key: &str) -> Option<&Override> {
        let key = normalize_key(raw_key);
        self.overrides.iter().find(|o| o.key() == key)
    }

    /// Render as ordered `raw_key=value` strings.
    pub fn render(&self) -> Vec<String> {
        self.overrides.iter().map(ToString::to_string).collect()
    }
}

impl FromIterator<Override> for OverrideSet {
    fn from_iter<T: IntoIterator<Item = Override>>(iter: T) -> Self {
        Self {
            overrides: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for OverrideSet {
    type Item = Override;
    type IntoIter = std::vec::IntoIter<Override>;

    fn into_iter(self) -> Self::IntoIter {
        self.overrides.into_iter()
    }
}

impl<'a> IntoIterator for &'a OverrideSet {
    type Item = &'a Override;
    type IntoIter = std::slice::Iter<'a, Override>;

    fn into_iter(self) -> Self::IntoIter {
        self.overrides.iter()
    }
}

/// One key together with its ordered candidate values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axis {
    key: String,
    is_additive: bool,
    values: Vec<String>,
}

impl Axis {
    /// Build an axis from a raw key that may carry a single `+` prefix.
    pub fn try_new(raw_key: &str, values: Vec<String>) -> Result<Self, OverrideError> {
        let (key, is_additive) = split_raw_key(raw_key)?;
        Ok(Self::from_normalized(key.to_string(), is_additive, values))
    }

    pub(crate) fn from_normalized(key: String, is_additive: bool, values: Vec<String>) -> Self {
        Self {
            key,
            is_additive,
            values,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_additive(&self) -> bool {
        self.is_additive
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Whether the axis has more than one candidate.
    pub fn is_sweep(&self) -> bool {
        self.values.len() > 1
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// One override per candidate value, in declared order.
    pub fn choices(&self) -> Vec<Override> {
        self.values
            .iter()
            .map(|value| Override {
                key: self.key.clone(),
                value: value.clone(),
                is_additive: self.is_additive,
            })
            .collect()
    }
}
