//! Capability inventories.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use taskmind_commands::{CapabilityDescriptor, CommandRegistry};

use crate::error::AuditError;

/// Either a bare list of descriptors or `{ capabilities: [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    List(Vec<CapabilityDescriptor>),
    Wrapped { capabilities: Vec<CapabilityDescriptor> },
}

impl Document {
    fn into_descriptors(self) -> Vec<CapabilityDescriptor> {
        match self {
            Document::List(list) => list,
            Document::Wrapped { capabilities } => capabilities,
        }
    }
}

/// A set of capability descriptors with unique verbs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    capabilities: Vec<CapabilityDescriptor>,
}

impl Inventory {
    pub fn new(capabilities: Vec<CapabilityDescriptor>) -> Result<Self, AuditError> {
        let mut seen = HashSet::new();
        for descriptor in &capabilities {
            if !seen.insert(descriptor.verb.as_str()) {
                return Err(AuditError::DuplicateCapability(descriptor.verb.clone()));
            }
        }
        Ok(Self { capabilities })
    }

    /// The current surface: every descriptor the registry declares.
    pub fn from_registry(registry: &CommandRegistry) -> Self {
        Self {
            capabilities: registry.descriptors(),
        }
    }

    pub fn from_json(content: &str) -> Result<Self, AuditError> {
        let document: Document = serde_json::from_str(content).map_err(|e| AuditError::Parse {
            location: "<json>".to_string(),
            reason: e.to_string(),
        })?;
        Self::new(document.into_descriptors())
    }

    pub fn from_yaml(content: &str) -> Result<Self, AuditError> {
        let document: Document = serde_yml::from_str(content).map_err(|e| AuditError::Parse {
            location: "<yaml>".to_string(),
            reason: e.to_string(),
        })?;
        Self::new(document.into_descriptors())
    }

    /// Load from a `.json` file, or YAML for any other extension.
    pub fn load(path: &Path) -> Result<Self, AuditError> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
        let parsed = if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        };
        let inventory = parsed.map_err(|e| match e {
            AuditError::Parse { reason, .. } => AuditError::Parse {
                location: path.display().to_string(),
                reason,
            },
            other => other,
        })?;
        debug!("Loaded {} capabilities from {}", inventory.len(), path.display());
        Ok(inventory)
    }

    pub fn get(&self, verb: &str) -> Option<&CapabilityDescriptor> {
        self.capabilities.iter().find(|d| d.verb == verb)
    }

    /// Copy without `verb`.
    pub fn without(&self, verb: &str) -> Self {
        Self {
            capabilities: self.capabilities.iter().filter(|d| d.verb != verb).cloned().collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapabilityDescriptor> {
        self.capabilities.iter()
    }

    pub fn verbs(&self) -> Vec<&str> {
        self.capabilities.iter().map(|d| d.verb.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_wrapped_yaml() {
        let yaml = r#"
capabilities:
  - verb: navigate
    required:
      - { name: url, type: string }
  - verb: get_title
    output:
      - { name: title, type: string }
"#;
        let inventory = Inventory::from_yaml(yaml).unwrap();
        assert_eq!(inventory.verbs(), vec!["navigate", "get_title"]);
        assert_eq!(inventory.get("navigate").unwrap().required_names(), vec!["url"]);
    }

    #[test]
    fn test_parse_bare_json_list() {
        let json = r#"[{"verb": "scroll"}, {"verb": "zoom", "required": [{"name": "factor", "type": "number"}]}]"#;
        let inventory = Inventory::from_json(json).unwrap();
        assert_eq!(inventory.len(), 2);
        assert!(inventory.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_verbs_rejected() {
        let err = Inventory::from_json(r#"[{"verb": "scroll"}, {"verb": "scroll"}]"#).unwrap_err();
        assert!(matches!(err, AuditError::DuplicateCapability(v) if v == "scroll"));
    }

    #[test]
    fn test_load_reports_path_on_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("legacy.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = Inventory::load(&path).unwrap_err();
        assert!(matches!(err, AuditError::Parse { ref location, .. } if location.ends_with("legacy.json")));

        let yaml_path = temp_dir.path().join("legacy.yaml");
        std::fs::write(&yaml_path, "- verb: status\n").unwrap();
        assert_eq!(Inventory::load(&yaml_path).unwrap().verbs(), vec!["status"]);
    }
}
