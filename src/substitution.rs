//! Placeholder extraction and replacement
//!
//! The wire form of a variable reference is `$(scope.key)` with three
//! interchangeable key spellings (`scope.key`, `scope["key"]`, `scope['key']`),
//! an optional `[N]` / `[*]` accessor, and an optional `.subkey` for object
//! values. Replacement maps are keyed by the text between `$(` and `)`, so a
//! single map entry drives plain string substitution everywhere.
//!
//! Replacement is literal and total: every key present in the map is
//! substituted, every reference absent from the map is left exactly as
//! written. Unresolved text is not an error here; a later pass (or the
//! pipeline-result aggregation, which does check) deals with it.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::error::FieldError;

/// A `$(...)` span with no nested parentheses. On nested input such as
/// `$(outer.$(params.a))` only the inner, well-formed reference matches.
static EXPRESSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\(([^()]+)\)").expect("expression regex"));

/// A value that consists of exactly one reference and nothing else.
static SINGLE_EXPRESSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$\([^()]+\)$").expect("single expression regex"));

/// Replace `$(key)` with the mapped value for every key in `replacements`.
pub fn apply_replacements(input: &str, replacements: &HashMap<String, String>) -> String {
    let mut out = input.to_string();
    for (key, value) in replacements {
        out = out.replace(&format!("$({key})"), value);
    }
    out
}

/// Resolve one sequence element. An element that is exactly `$(key)` or
/// `$(key[*])` for an array-valued key splices the whole array in; anything
/// else resolves to a single element via string replacement.
pub fn apply_array_replacements(
    input: &str,
    string_replacements: &HashMap<String, String>,
    array_replacements: &HashMap<String, Vec<String>>,
) -> Vec<String> {
    for (key, values) in array_replacements {
        if input == format!("$({key})") || input == format!("$({key}[*])") {
            return values.clone();
        }
    }
    vec![apply_replacements(input, string_replacements)]
}

/// Whether the whole value is a single reference (the minimal shape).
pub fn is_single_expression(value: &str) -> bool {
    SINGLE_EXPRESSION_RE.is_match(value)
}

/// Strip `$(`, `)`, and a trailing `[*]` from a minimal expression, yielding
/// the replacement-map key.
pub fn trim_expression(value: &str) -> &str {
    let inner = value
        .strip_prefix("$(")
        .and_then(|v| v.strip_suffix(')'))
        .unwrap_or(value);
    inner.strip_suffix("[*]").unwrap_or(inner)
}

/// All `$(...)` bodies appearing in `input`, in order.
pub fn extract_expressions(input: &str) -> Vec<&str> {
    EXPRESSION_RE
        .captures_iter(input)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Key names referenced under `prefix` in `input`. The returned name carries
/// the object subkey when present (`myObject.url`) and drops any `[N]`/`[*]`
/// accessor. References to other scopes are ignored.
pub fn extract_variable_names(input: &str, prefix: &str) -> Vec<String> {
    extract_expressions(input)
        .into_iter()
        .filter_map(|body| parse_scoped(body, prefix))
        .collect()
}

/// Parse a reference body relative to a scope prefix. `params.foo[0]`,
/// `params["foo"]`, `params['foo']` and `params.obj.key` (against prefix
/// `params`) all yield a key name; bodies in other scopes yield `None`.
fn parse_scoped(body: &str, prefix: &str) -> Option<String> {
    let rest = body.strip_prefix(prefix)?;
    let (mut name, mut rest) = if let Some(r) = rest.strip_prefix('.') {
        let end = r.find('[').unwrap_or(r.len());
        (r[..end].to_string(), &r[end..])
    } else if let Some(r) = rest.strip_prefix("[\"") {
        let end = r.find("\"]")?;
        (r[..end].to_string(), &r[end + 2..])
    } else if let Some(r) = rest.strip_prefix("['") {
        let end = r.find("']")?;
        (r[..end].to_string(), &r[end + 2..])
    } else {
        return None;
    };
    if name.is_empty() {
        return None;
    }
    if let Some(r) = rest.strip_prefix('[') {
        let end = r.find(']')?;
        let accessor = &r[..end];
        if accessor != "*" && accessor.parse::<usize>().is_err() {
            return None;
        }
        rest = &r[end + 1..];
    }
    if let Some(subkey) = rest.strip_prefix('.') {
        name.push('.');
        name.push_str(subkey);
        rest = "";
    }
    if rest.is_empty() {
        Some(name)
    } else {
        None
    }
}

/// Every reference under `prefix` must name a declared variable.
pub fn validate_variable(
    value: &str,
    prefix: &str,
    declared: &HashSet<String>,
) -> Result<(), FieldError> {
    for name in extract_variable_names(value, prefix) {
        if !declared.contains(&name) {
            return Err(FieldError::with_paths(
                format!("non-existent variable in {value:?}"),
                vec![String::new()],
            ));
        }
    }
    Ok(())
}

/// References to any of `names` (array- or object-typed variables) are not
/// allowed in this field at all, minimal or embedded.
pub fn validate_variable_prohibited(
    value: &str,
    prefix: &str,
    names: &HashSet<String>,
) -> Result<(), FieldError> {
    for name in extract_variable_names(value, prefix) {
        if names.contains(&name) {
            return Err(FieldError::with_paths(
                format!("variable type invalid in {value:?}"),
                vec![String::new()],
            ));
        }
    }
    Ok(())
}

/// References to any of `names` must stand alone: the reference has to be the
/// entire field value so it can splice rather than concatenate.
pub fn validate_variable_isolated(
    value: &str,
    prefix: &str,
    names: &HashSet<String>,
) -> Result<(), FieldError> {
    for body in extract_expressions(value) {
        let Some(name) = parse_scoped(body, prefix) else {
            continue;
        };
        if names.contains(&name) && value != format!("$({body})") {
            return Err(FieldError::with_paths(
                format!("variable is not properly isolated in {value:?}"),
                vec![String::new()],
            ));
        }
    }
    Ok(())
}
