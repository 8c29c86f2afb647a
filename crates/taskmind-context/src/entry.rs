//! Execution journal records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a journaled step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Success,
    Warning,
    Failure,
}

/// What kind of work a step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Navigation,
    Extraction,
    Interaction,
    Screenshot,
    RecipeExecution,
    DataProcessing,
    Analysis,
    UserInteraction,
    Other,
}

/// How a step was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMethod {
    Command,
    Recipe,
    File,
    Manual,
    Analysis,
    Tool,
}

/// Free-form observation attached to an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: String,
    pub summary: String,
}

/// One append-only journal record.
///
/// `timestamp` is caller metadata; journal order is arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub timestamp: DateTime<Utc>,
    pub step: String,
    pub status: LogStatus,
    pub action: ActionKind,
    pub method: ExecutionMethod,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insights: Vec<Insight>,
}

impl ExecutionLogEntry {
    pub fn new(step: impl Into<String>, status: LogStatus) -> Self {
        Self {
            timestamp: Utc::now(),
            step: step.into(),
            status,
            action: ActionKind::Other,
            method: ExecutionMethod::Manual,
            data: Value::Null,
            insights: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: ActionKind) -> Self {
        self.action = action;
        self
    }

    pub fn with_method(mut self, method: ExecutionMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_insight(mut self, kind: impl Into<String>, summary: impl Into<String>) -> Self {
        self.insights.push(Insight {
            kind: kind.into(),
            summary: summary.into(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_serialized_shape() {
        let entry = ExecutionLogEntry::new("Open dashboard", LogStatus::Success)
            .with_action(ActionKind::Navigation)
            .with_method(ExecutionMethod::Command)
            .with_data(json!({"url": "https://example.com"}))
            .with_insight("pitfall", "login wall after 3 visits");

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["action"], "navigation");
        assert_eq!(value["method"], "command");
        assert_eq!(value["insights"][0]["type"], "pitfall");
    }

    #[test]
    fn test_entry_without_insights_omits_field() {
        let entry = ExecutionLogEntry::new("Extract table", LogStatus::Warning)
            .with_action(ActionKind::RecipeExecution);
        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("insights").is_none());
        assert_eq!(value["action"], "recipe_execution");

        let back: ExecutionLogEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }
}
