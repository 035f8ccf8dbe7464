//! Placeholder substitution
//!
//! Walks request params and bodies, replacing `$name` tokens with values
//! from a context. A string that is exactly one token takes the context
//! value as-is (lists stay lists); tokens embedded in text are replaced by
//! the value's string form.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::ResolveError;
use crate::spec::{Context, Defaults};

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$[A-Za-z0-9_]+").unwrap());
static WHOLE_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\$([A-Za-z0-9_]+)\s*$").unwrap());

/// Knobs for [`substitute_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubstituteOptions {
    /// After a whole-token substitution of a string, reinterpret it as a
    /// number, boolean or list literal when it parses as one.
    pub coerce_literals: bool,
}

impl Default for SubstituteOptions {
    fn default() -> Self {
        Self {
            coerce_literals: true,
        }
    }
}

impl From<&Defaults> for SubstituteOptions {
    fn from(defaults: &Defaults) -> Self {
        Self {
            coerce_literals: defaults.coerce_literals,
        }
    }
}

/// Substitute placeholders using the default options.
pub fn substitute(value: &Value, context: &Context) -> Result<Value, ResolveError> {
    substitute_with(value, context, SubstituteOptions::default())
}

/// Return a copy of `value` with every placeholder replaced from `context`.
///
/// Map keys are never substituted. Any token missing from the context
/// fails the whole call.
pub fn substitute_with(
    value: &Value,
    context: &Context,
    options: SubstituteOptions,
) -> Result<Value, ResolveError> {
    match value {
        Value::String(s) => substitute_str(s, context, options),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, item) in map {
                out.insert(key.clone(), substitute_with(item, context, options)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| substitute_with(item, context, options))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

/// Substitute every request param.
///
/// With `implicit` set, a param whose name is a context key takes that
/// context value verbatim; it is not scanned for placeholders.
pub fn substitute_params(
    params: &Map<String, Value>,
    context: &Context,
    options: SubstituteOptions,
    implicit: bool,
) -> Result<Map<String, Value>, ResolveError> {
    let mut out = Map::with_capacity(params.len());
    for (key, value) in params {
        let value = match context.get(key) {
            Some(found) if implicit => found.clone(),
            _ => substitute_with(value, context, options)?,
        };
        out.insert(key.clone(), value);
    }
    Ok(out)
}

/// Render a value as it appears inside text: strings verbatim, null as
/// empty, everything else as compact JSON.
pub(crate) fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn substitute_str(
    s: &str,
    context: &Context,
    options: SubstituteOptions,
) -> Result<Value, ResolveError> {
    if let Some(caps) = WHOLE_TOKEN_RE.captures(s) {
        let found = lookup(context, &caps[1])?;
        return Ok(match found {
            Value::String(text) if options.coerce_literals => coerce_literal(text),
            other => other.clone(),
        });
    }

    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for token in TOKEN_RE.find_iter(s) {
        let found = lookup(context, &token.as_str()[1..])?;
        out.push_str(&s[last..token.start()]);
        out.push_str(&string_form(found));
        last = token.end();
    }
    out.push_str(&s[last..]);
    Ok(Value::String(out))
}

fn lookup<'a>(context: &'a Context, name: &str) -> Result<&'a Value, ResolveError> {
    context
        .get(name)
        .ok_or_else(|| ResolveError::MissingContextParameter(name.to_string()))
}

// Only number, boolean and list literals are accepted; anything else,
// including parse failures, keeps the original string.
fn coerce_literal(text: &str) -> Value {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(v @ (Value::Number(_) | Value::Bool(_) | Value::Array(_))) => v,
        _ => Value::String(text.to_string()),
    }
}
