//! Capability descriptors: the declared contract of a verb.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared type of a parameter or output field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    Any,
}

impl ValueType {
    /// Whether `value` conforms to this type. Integers also satisfy `Number`.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ValueType::String => value.is_string(),
            ValueType::Integer => value.is_i64() || value.is_u64(),
            ValueType::Number => value.is_number(),
            ValueType::Boolean => value.is_boolean(),
            ValueType::Object => value.is_object(),
            ValueType::Array => value.is_array(),
            ValueType::Any => true,
        }
    }

    /// Type of a concrete value (`Any` for null).
    pub fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => ValueType::String,
            Value::Number(n) if n.is_i64() || n.is_u64() => ValueType::Integer,
            Value::Number(_) => ValueType::Number,
            Value::Bool(_) => ValueType::Boolean,
            Value::Object(_) => ValueType::Object,
            Value::Array(_) => ValueType::Array,
            Value::Null => ValueType::Any,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Object => "object",
            ValueType::Array => "array",
            ValueType::Any => "any",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" | "str" => Ok(ValueType::String),
            "integer" | "int" => Ok(ValueType::Integer),
            "number" | "float" => Ok(ValueType::Number),
            "boolean" | "bool" => Ok(ValueType::Boolean),
            "object" | "map" => Ok(ValueType::Object),
            "array" | "list" => Ok(ValueType::Array),
            "any" => Ok(ValueType::Any),
            other => Err(format!("unknown type '{}'", other)),
        }
    }
}

/// A named, typed parameter or output field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ValueType,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Machine-readable contract of one verb.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub verb: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: Vec<FieldSpec>,
    #[serde(default)]
    pub optional: Vec<FieldSpec>,
    /// Declared shape of the result payload.
    #[serde(default)]
    pub output: Vec<FieldSpec>,
}

impl CapabilityDescriptor {
    pub fn new(verb: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            description: description.into(),
            required: Vec::new(),
            optional: Vec::new(),
            output: Vec::new(),
        }
    }

    pub fn required(mut self, name: &str, ty: ValueType) -> Self {
        self.required.push(FieldSpec::new(name, ty));
        self
    }

    pub fn optional(mut self, name: &str, ty: ValueType) -> Self {
        self.optional.push(FieldSpec::new(name, ty));
        self
    }

    pub fn output(mut self, name: &str, ty: ValueType) -> Self {
        self.output.push(FieldSpec::new(name, ty));
        self
    }

    /// Look up a declared parameter, required or optional.
    pub fn param(&self, name: &str) -> Option<&FieldSpec> {
        self.required
            .iter()
            .chain(self.optional.iter())
            .find(|p| p.name == name)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|p| p.name == name)
    }

    /// Required parameter names, sorted.
    pub fn required_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.required.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_type_matches() {
        assert!(ValueType::Integer.matches(&json!(3)));
        assert!(ValueType::Number.matches(&json!(3)));
        assert!(ValueType::Number.matches(&json!(2.5)));
        assert!(!ValueType::Integer.matches(&json!(2.5)));
        assert!(!ValueType::String.matches(&json!(1)));
        assert!(ValueType::Any.matches(&Value::Null));
    }

    #[test]
    fn test_value_type_parse_aliases() {
        assert_eq!("str".parse::<ValueType>().unwrap(), ValueType::String);
        assert_eq!("bool".parse::<ValueType>().unwrap(), ValueType::Boolean);
        assert!("date".parse::<ValueType>().is_err());
    }

    #[test]
    fn test_descriptor_builder() {
        let desc = CapabilityDescriptor::new("navigate", "Navigate to a URL")
            .required("url", ValueType::String)
            .optional("timeout_ms", ValueType::Integer)
            .output("url", ValueType::String);

        assert!(desc.is_required("url"));
        assert!(!desc.is_required("timeout_ms"));
        assert_eq!(desc.param("timeout_ms").unwrap().ty, ValueType::Integer);
        assert!(desc.param("missing").is_none());
    }

    #[test]
    fn test_descriptor_yaml_shape() {
        let yaml = json!({
            "verb": "scroll_to_text",
            "required": [{"name": "text", "type": "string"}],
            "output": [{"name": "found", "type": "boolean"}]
        });
        let desc: CapabilityDescriptor = serde_json::from_value(yaml).unwrap();
        assert_eq!(desc.required_names(), vec!["text"]);
        assert!(desc.optional.is_empty());
    }
}
