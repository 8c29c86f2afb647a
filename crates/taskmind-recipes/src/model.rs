//! Recipe definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use taskmind_commands::ValueType;

use crate::error::RecipeError;

/// Verb that runs an in-page script step.
pub const SCRIPT_VERB: &str = "script";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeKind {
    /// A single verb or script.
    #[default]
    Atomic,
    /// An ordered sequence of steps.
    Workflow,
}

impl fmt::Display for RecipeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipeKind::Atomic => write!(f, "atomic"),
            RecipeKind::Workflow => write!(f, "workflow"),
        }
    }
}

/// Where script bodies run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeRuntime {
    /// Command verbs only.
    #[default]
    Steps,
    /// In-page JavaScript.
    #[serde(alias = "javascript")]
    Js,
    Python,
    #[serde(alias = "sh", alias = "bash")]
    Shell,
}

impl RecipeRuntime {
    /// Whether script steps can run inside the page.
    pub fn runs_in_page(&self) -> bool {
        matches!(self, RecipeRuntime::Steps | RecipeRuntime::Js)
    }
}

/// Recipe origin. Later variants override earlier ones on id collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeSource {
    Example,
    User,
    Project,
}

impl fmt::Display for RecipeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipeSource::Example => write!(f, "example"),
            RecipeSource::User => write!(f, "user"),
            RecipeSource::Project => write!(f, "project"),
        }
    }
}

/// One declared input parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputSpec {
    pub name: String,
    #[serde(rename = "type", default = "any_type")]
    pub ty: ValueType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// One declared output field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSpec {
    pub name: String,
    #[serde(rename = "type", default = "any_type")]
    pub ty: ValueType,
    /// Dotted path into the run scope, e.g. `steps.read.payload.title`.
    /// Defaults to the field of the same name in the last step's payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

fn any_type() -> ValueType {
    ValueType::Any
}

/// One step: a command verb with arguments, or a script body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verb: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub with: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// Script body in a sibling file; the loader inlines it into `script`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_file: Option<String>,
}

impl Step {
    pub fn verb(verb: &str, with: Value) -> Self {
        Self {
            verb: Some(verb.to_string()),
            with: match with {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            ..Default::default()
        }
    }

    pub fn script(body: &str) -> Self {
        Self {
            script: Some(body.to_string()),
            ..Default::default()
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Key under which this step's result is visible to later steps.
    pub fn label(&self, index: usize) -> String {
        self.name.clone().unwrap_or_else(|| format!("step{}", index + 1))
    }

    /// Capability this step calls, if its shape is valid.
    pub fn capability(&self) -> Option<&str> {
        match (&self.verb, &self.script) {
            (Some(verb), None) => Some(verb.as_str()),
            (None, Some(_)) => Some(SCRIPT_VERB),
            _ => None,
        }
    }

    /// Arguments passed to the capability, before substitution.
    pub fn arguments(&self) -> Value {
        match &self.script {
            Some(body) if self.verb.is_none() => json!({"expression": body}),
            _ => Value::Object(self.with.clone()),
        }
    }
}

/// A parsed recipe. Never mutated after loading; a change is a new version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Recipe {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: RecipeKind,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub runtime: RecipeRuntime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub use_cases: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_targets: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    /// Environment variables the recipe expects, with descriptions.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub inputs: Vec<InputSpec>,
    #[serde(default)]
    pub outputs: Vec<OutputSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,

    /// Markdown documentation following the front matter.
    #[serde(skip)]
    pub body: String,
    #[serde(skip)]
    pub source: Option<RecipeSource>,
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

impl Recipe {
    pub fn new(id: &str, kind: RecipeKind, version: &str) -> Self {
        Self {
            id: id.to_string(),
            kind,
            version: version.to_string(),
            description: String::new(),
            runtime: RecipeRuntime::default(),
            tags: Vec::new(),
            use_cases: Vec::new(),
            output_targets: Vec::new(),
            dependencies: Vec::new(),
            env: BTreeMap::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            steps: Vec::new(),
            body: String::new(),
            source: None,
            path: None,
        }
    }

    pub fn input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn summary(&self) -> RecipeSummary {
        RecipeSummary {
            id: self.id.clone(),
            kind: self.kind,
            version: self.version.clone(),
            description: self.description.clone(),
            runtime: self.runtime,
            tags: self.tags.clone(),
            source: self.source,
            path: self.path.clone(),
        }
    }

    /// Serialize back to `recipe.md` form: YAML front matter plus body.
    pub fn to_markdown(&self) -> Result<String, RecipeError> {
        let yaml = serde_yml::to_string(self).map_err(|e| RecipeError::malformed(&self.id, e.to_string()))?;
        let mut out = format!("---\n{}---\n", yaml);
        if !self.body.is_empty() {
            out.push('\n');
            out.push_str(&self.body);
            out.push('\n');
        }
        Ok(out)
    }
}

/// Listing view of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RecipeKind,
    pub version: String,
    pub description: String,
    pub runtime: RecipeRuntime,
    pub tags: Vec<String>,
    pub source: Option<RecipeSource>,
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_capability() {
        let verb = Step::verb("navigate", json!({"url": "https://example.com"}));
        assert_eq!(verb.capability(), Some("navigate"));
        assert_eq!(verb.arguments()["url"], "https://example.com");

        let script = Step::script("document.title").named("title");
        assert_eq!(script.capability(), Some(SCRIPT_VERB));
        assert_eq!(script.arguments()["expression"], "document.title");
        assert_eq!(script.label(4), "title");

        let both = Step {
            verb: Some("get_title".into()),
            script: Some("1".into()),
            ..Default::default()
        };
        assert_eq!(both.capability(), None);
        assert_eq!(Step::default().label(0), "step1");
    }

    #[test]
    fn test_source_priority_order() {
        assert!(RecipeSource::Example < RecipeSource::User);
        assert!(RecipeSource::User < RecipeSource::Project);
    }

    #[test]
    fn test_runtime_aliases() {
        let runtime: RecipeRuntime = serde_json::from_value(json!("javascript")).unwrap();
        assert_eq!(runtime, RecipeRuntime::Js);
        let runtime: RecipeRuntime = serde_json::from_value(json!("bash")).unwrap();
        assert_eq!(runtime, RecipeRuntime::Shell);
        assert!(!runtime.runs_in_page());
    }
}
