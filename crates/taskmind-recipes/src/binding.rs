//! Caller parameters checked against a recipe's input schema.

use serde_json::{Map, Value};

use taskmind_commands::ValueType;

use crate::error::ParameterError;
use crate::model::Recipe;

/// Bind `params` to `recipe`'s inputs.
///
/// Unknown names, wrong types and missing required inputs are rejected.
/// Absent optional inputs take their default, or null when none is declared,
/// so references to them always resolve.
pub fn bind_parameters(recipe: &Recipe, params: Map<String, Value>) -> Result<Map<String, Value>, ParameterError> {
    let mut unknown: Vec<&String> = params.keys().filter(|k| recipe.input(k).is_none()).collect();
    unknown.sort();
    if let Some(name) = unknown.first() {
        return Err(ParameterError::Unknown(name.to_string()));
    }

    let mut bound = Map::new();
    for input in &recipe.inputs {
        let value = match params.get(&input.name) {
            Some(value) if !value.is_null() => {
                if !input.ty.matches(value) {
                    return Err(ParameterError::TypeMismatch {
                        name: input.name.clone(),
                        expected: input.ty,
                        actual: ValueType::of(value),
                    });
                }
                value.clone()
            }
            _ => match (&input.default, input.required) {
                (Some(default), _) => default.clone(),
                (None, true) => return Err(ParameterError::Missing(input.name.clone())),
                (None, false) => Value::Null,
            },
        };
        bound.insert(input.name.clone(), value);
    }
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InputSpec, RecipeKind};
    use serde_json::json;

    fn input(name: &str, ty: ValueType, required: bool, default: Option<Value>) -> InputSpec {
        InputSpec {
            name: name.to_string(),
            ty,
            required,
            default,
            description: String::new(),
        }
    }

    fn recipe() -> Recipe {
        let mut recipe = Recipe::new("search", RecipeKind::Atomic, "1.0.0");
        recipe.inputs = vec![
            input("url", ValueType::String, true, None),
            input("limit", ValueType::Integer, false, Some(json!(10))),
            input("ratio", ValueType::Number, false, None),
        ];
        recipe
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_bind_applies_defaults() {
        let bound = bind_parameters(&recipe(), params(json!({"url": "https://example.com"}))).unwrap();
        assert_eq!(bound["url"], "https://example.com");
        assert_eq!(bound["limit"], 10);
        assert_eq!(bound["ratio"], Value::Null);
    }

    #[test]
    fn test_missing_required() {
        let err = bind_parameters(&recipe(), Map::new()).unwrap_err();
        assert_eq!(err, ParameterError::Missing("url".into()));

        let err = bind_parameters(&recipe(), params(json!({"url": null}))).unwrap_err();
        assert_eq!(err, ParameterError::Missing("url".into()));
    }

    #[test]
    fn test_type_mismatch() {
        let err = bind_parameters(&recipe(), params(json!({"url": "x", "limit": "ten"}))).unwrap_err();
        assert_eq!(
            err,
            ParameterError::TypeMismatch {
                name: "limit".into(),
                expected: ValueType::Integer,
                actual: ValueType::String,
            }
        );

        // Integers are numbers, not the other way round.
        assert!(bind_parameters(&recipe(), params(json!({"url": "x", "ratio": 2}))).is_ok());
        assert!(bind_parameters(&recipe(), params(json!({"url": "x", "limit": 2.5}))).is_err());
    }

    #[test]
    fn test_unknown_parameter() {
        let err = bind_parameters(&recipe(), params(json!({"url": "x", "zzz": 1, "extra": 2}))).unwrap_err();
        assert_eq!(err, ParameterError::Unknown("extra".into()));
    }
}
