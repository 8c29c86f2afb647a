//! `${...}` references between recipe inputs and step results.
//!
//! The grammar is a dotted path and nothing else:
//!
//! - `${inputs.<name>}` reads a bound parameter.
//! - `${steps.<label>.payload.<field>...}` reads an earlier step's result;
//!   `success` and `elapsed_ms` are also available under the step label.
//! - Numeric segments index arrays (`${steps.list.payload.items.0}`).
//! - `$${` is a literal `${`.
//!
//! A string that is exactly one reference takes the referenced value with its
//! type intact. References embedded in longer text are stringified.

use serde_json::{Map, Value, json};
use thiserror::Error;

use taskmind_cdp::CommandResult;

pub const INPUTS_ROOT: &str = "inputs";
pub const STEPS_ROOT: &str = "steps";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("unterminated reference in '{0}'")]
    Unterminated(String),

    #[error("invalid reference '${{{0}}}'")]
    InvalidPath(String),

    #[error("unresolved reference '${{{0}}}'")]
    Unresolved(String),
}

enum Piece<'a> {
    Text(&'a str),
    Ref(&'a str),
}

fn parse(template: &str) -> Result<Vec<Piece<'_>>, ExprError> {
    let mut pieces = Vec::new();
    let mut rest = template;
    while let Some(pos) = rest.find("${") {
        if rest[..pos].ends_with('$') {
            pieces.push(Piece::Text(&rest[..pos - 1]));
            pieces.push(Piece::Text("${"));
            rest = &rest[pos + 2..];
            continue;
        }
        if pos > 0 {
            pieces.push(Piece::Text(&rest[..pos]));
        }
        let after = &rest[pos + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| ExprError::Unterminated(template.to_string()))?;
        let path = after[..end].trim();
        check_path(path)?;
        pieces.push(Piece::Ref(path));
        rest = &after[end + 1..];
    }
    if !rest.is_empty() {
        pieces.push(Piece::Text(rest));
    }
    Ok(pieces)
}

fn check_path(path: &str) -> Result<(), ExprError> {
    let segments: Vec<&str> = path.split('.').collect();
    let valid_segments = segments
        .iter()
        .all(|s| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-'));
    let valid_root = matches!(segments[0], INPUTS_ROOT | STEPS_ROOT) && segments.len() >= 2;
    if valid_segments && valid_root {
        Ok(())
    } else {
        Err(ExprError::InvalidPath(path.to_string()))
    }
}

/// Every reference path inside `value`, in document order.
pub fn references(value: &Value) -> Result<Vec<String>, ExprError> {
    let mut found = Vec::new();
    collect_references(value, &mut found)?;
    Ok(found)
}

fn collect_references(value: &Value, found: &mut Vec<String>) -> Result<(), ExprError> {
    match value {
        Value::String(s) => {
            for piece in parse(s)? {
                if let Piece::Ref(path) = piece {
                    found.push(path.to_string());
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, found)?;
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_references(item, found)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Values visible to references during one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    inputs: Map<String, Value>,
    steps: Map<String, Value>,
}

impl Scope {
    pub fn new(inputs: Map<String, Value>) -> Self {
        Self {
            inputs,
            steps: Map::new(),
        }
    }

    /// Make a step's result visible under `steps.<label>`.
    pub fn record_step(&mut self, label: &str, result: &CommandResult) {
        self.steps.insert(
            label.to_string(),
            json!({
                "success": result.success,
                "payload": result.payload,
                "elapsed_ms": result.elapsed.as_millis() as u64,
            }),
        );
    }

    pub fn inputs(&self) -> &Map<String, Value> {
        &self.inputs
    }

    /// Resolve a dotted path.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = match segments.next()? {
            INPUTS_ROOT => self.inputs.get(segments.next()?)?,
            STEPS_ROOT => self.steps.get(segments.next()?)?,
            _ => return None,
        };
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

/// Replace every reference in `value`, recursing into arrays and objects.
pub fn substitute(value: &Value, scope: &Scope) -> Result<Value, ExprError> {
    match value {
        Value::String(s) => substitute_str(s, scope),
        Value::Array(items) => items
            .iter()
            .map(|item| substitute(item, scope))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, item) in map {
                out.insert(key.clone(), substitute(item, scope)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_str(template: &str, scope: &Scope) -> Result<Value, ExprError> {
    let pieces = parse(template)?;
    let resolve = |path: &str| scope.lookup(path).ok_or_else(|| ExprError::Unresolved(path.to_string()));

    if let [Piece::Ref(path)] = pieces.as_slice() {
        return resolve(*path).cloned();
    }

    let mut out = String::new();
    for piece in pieces {
        match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::Ref(path) => match resolve(path)? {
                Value::String(s) => out.push_str(s),
                Value::Null => {}
                other => out.push_str(&other.to_string()),
            },
        }
    }
    Ok(Value::String(out))
}
