//! Parser for raw command-line override tokens.
//!
//! Supported forms:
//! - `key=value` and `+key=value`
//! - `key=v1,v2,...` (top-level commas split a sweep; commas nested in
//!   brackets or quotes do not)
//! - `key=choice(v1,v2,...)`
//! - `key=range(stop)`, `key=range(start,stop)`, `key=range(start,stop,step)`

use serde::{Deserialize, Serialize};

use crate::errors::OverrideError;
use crate::overrides::{split_raw_key, Axis, ADD_PREFIX};

/// Parsed value side of an override token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverrideValue {
    Single(String),
    Sweep(Vec<String>),
}

/// A structured override specification, as produced by [`OverrideParser`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideSpec {
    /// Normalized key.
    pub key: String,
    pub additive: bool,
    pub value: OverrideValue,
}

impl OverrideSpec {
    pub fn is_sweep(&self) -> bool {
        matches!(self.value, OverrideValue::Sweep(_))
    }

    pub fn raw_key(&self) -> String {
        if self.additive {
            format!("{ADD_PREFIX}{}", self.key)
        } else {
            self.key.clone()
        }
    }

    /// Candidate value strings in declared order.
    pub fn candidates(&self) -> Vec<String> {
        match &self.value {
            OverrideValue::Single(value) => vec![value.clone()],
            OverrideValue::Sweep(values) => values.clone(),
        }
    }

    pub fn to_axis(&self) -> Axis {
        Axis::from_normalized(self.key.clone(), self.additive, self.candidates())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OverrideParser;

impl OverrideParser {
    pub fn create() -> Self {
        Self
    }

    pub fn parse_overrides<S: AsRef<str>>(
        &self,
        tokens: &[S],
    ) -> Result<Vec<OverrideSpec>, OverrideError> {
        tokens
            .iter()
            .map(|token| self.parse_override(token.as_ref()))
            .collect()
    }

    pub fn parse_override(&self, token: &str) -> Result<OverrideSpec, OverrideError> {
        let malformed = |message: &str| OverrideError::Malformed {
            token: token.to_string(),
            message: message.to_string(),
        };

        let (raw_key, raw_value) = token
            .split_once('=')
            .ok_or_else(|| malformed("expected key=value"))?;
        let (key, additive) = split_raw_key(raw_key.trim())?;
        let raw_value = raw_value.trim();

        let value = if let Some(args) = function_args(raw_value, "choice") {
            OverrideValue::Sweep(split_elements(args).map_err(|m| malformed(&m))?)
        } else if let Some(args) = function_args(raw_value, "range") {
            OverrideValue::Sweep(expand_range(args).map_err(|m| malformed(&m))?)
        } else {
            let parts = split_top_level(raw_value).map_err(|m| malformed(&m))?;
            if parts.len() == 1 {
                OverrideValue::Single(unquote(parts[0].trim()).to_string())
            } else {
                let values = split_elements(raw_value).map_err(|m| malformed(&m))?;
                OverrideValue::Sweep(values)
            }
        };

        Ok(OverrideSpec {
            key: key.to_string(),
            additive,
            value,
        })
    }
}

/// Arguments of `name(...)` when the whole value is that call.
fn function_args<'a>(value: &'a str, name: &str) -> Option<&'a str> {
    value
        .strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

/// Split on top-level commas, unquote every element and reject empty ones.
fn split_elements(value: &str) -> Result<Vec<String>, String> {
    split_top_level(value)?
        .into_iter()
        .map(|part| {
            let part = part.trim();
            if part.is_empty() {
                Err("empty sweep element".to_string())
            } else {
                Ok(unquote(part).to_string())
            }
        })
        .collect()
}

fn split_top_level(value: &str) -> Result<Vec<&str>, String> {
    let mut parts = Vec::new();
    let mut stack: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (idx, ch) in value.char_indices() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '[' | '{' | '(' => stack.push(ch),
            ']' | '}' | ')' => {
                let expected = match ch {
                    ']' => '[',
                    '}' => '{',
                    _ => '(',
                };
                if stack.pop() != Some(expected) {
                    return Err(format!("unbalanced '{ch}'"));
                }
            }
            ',' if stack.is_empty() => {
                parts.push(&value[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }

    if quote.is_some() {
        return Err("unterminated quote".to_string());
    }
    if let Some(open) = stack.last() {
        return Err(format!("unclosed '{open}'"));
    }
    parts.push(&value[start..]);
    Ok(parts)
}

fn unquote(value: &str) -> &str {
    for q in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(q) && value.ends_with(q) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Upper bound on the values a single `range()` may produce.
pub const MAX_RANGE_VALUES: usize = 100_000;

fn expand_range(args: &str) -> Result<Vec<String>, String> {
    let numbers = split_top_level(args)?
        .into_iter()
        .map(|part| {
            part.trim()
                .parse::<i64>()
                .map_err(|_| format!("range() argument '{}' is not an integer", part.trim()))
        })
        .collect::<Result<Vec<i64>, String>>()?;

    let (start, stop, step) = match numbers.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => return Err("range() takes 1 to 3 arguments".to_string()),
    };
    if step == 0 {
        return Err("range() step must not be zero".to_string());
    }

    let mut values = Vec::new();
    let mut current = start;
    while (step > 0 && current < stop) || (step < 0 && current > stop) {
        if values.len() == MAX_RANGE_VALUES {
            return Err(format!("range() yields more than {MAX_RANGE_VALUES} values"));
        }
        values.push(current.to_string());
        current = match current.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    if values.is_empty() {
        return Err("range() is empty".to_string());
    }
    Ok(values)
}
