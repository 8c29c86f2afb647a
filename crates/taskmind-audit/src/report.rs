//! Coverage and parity scoring.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use taskmind_commands::{CapabilityDescriptor, FieldSpec};

use crate::inventory::Inventory;

/// Audit result for one capability name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityRecord {
    pub name: String,
    /// Present in the legacy surface.
    pub legacy: bool,
    /// Present in the current surface.
    pub current: bool,
    /// Both surfaces declare the same required inputs and result shape.
    pub parity: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Coverage and parity across two inventories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditReport {
    pub records: Vec<CapabilityRecord>,
    pub legacy_total: usize,
    pub matched: usize,
    pub parity_matched: usize,
    pub legacy_only: Vec<String>,
    pub current_only: Vec<String>,
}

impl AuditReport {
    /// Share of legacy capabilities the current surface also has, in percent.
    pub fn coverage(&self) -> f64 {
        percent(self.matched, self.legacy_total)
    }

    /// Share of matched capabilities with structural parity, in percent.
    pub fn parity(&self) -> f64 {
        percent(self.parity_matched, self.matched)
    }

    /// Full coverage and full parity. Compared on counts, not rounded percentages.
    pub fn passed(&self) -> bool {
        self.matched == self.legacy_total && self.parity_matched == self.matched
    }

    pub fn record(&self, name: &str) -> Option<&CapabilityRecord> {
        self.records.iter().find(|r| r.name == name)
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        100.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

impl fmt::Display for AuditReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "coverage: {:.1}% ({}/{})",
            self.coverage(),
            self.matched,
            self.legacy_total
        )?;
        writeln!(
            f,
            "parity:   {:.1}% ({}/{})",
            self.parity(),
            self.parity_matched,
            self.matched
        )?;
        for record in self.records.iter().filter(|r| r.legacy && r.current && !r.parity) {
            writeln!(f, "  mismatch {}: {}", record.name, record.notes.join("; "))?;
        }
        for name in &self.legacy_only {
            writeln!(f, "  missing  {}", name)?;
        }
        for name in &self.current_only {
            writeln!(f, "  new      {}", name)?;
        }
        Ok(())
    }
}

/// Structural comparison of a legacy and a current surface.
#[derive(Debug, Clone, Default)]
pub struct ConsistencyValidator;

impl ConsistencyValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn audit(&self, legacy: &Inventory, current: &Inventory) -> AuditReport {
        let names: BTreeSet<&str> = legacy.iter().chain(current.iter()).map(|d| d.verb.as_str()).collect();

        let mut records = Vec::with_capacity(names.len());
        let mut legacy_only = Vec::new();
        let mut current_only = Vec::new();
        let mut matched = 0;
        let mut parity_matched = 0;

        for name in names {
            let record = match (legacy.get(name), current.get(name)) {
                (Some(old), Some(new)) => {
                    let notes = compare(old, new);
                    matched += 1;
                    if notes.is_empty() {
                        parity_matched += 1;
                    }
                    CapabilityRecord {
                        name: name.to_string(),
                        legacy: true,
                        current: true,
                        parity: notes.is_empty(),
                        notes,
                    }
                }
                (Some(_), None) => {
                    legacy_only.push(name.to_string());
                    CapabilityRecord {
                        name: name.to_string(),
                        legacy: true,
                        current: false,
                        parity: false,
                        notes: vec!["not implemented in the current surface".to_string()],
                    }
                }
                (None, _) => {
                    current_only.push(name.to_string());
                    CapabilityRecord {
                        name: name.to_string(),
                        legacy: false,
                        current: true,
                        parity: false,
                        notes: vec!["no legacy counterpart".to_string()],
                    }
                }
            };
            records.push(record);
        }

        AuditReport {
            records,
            legacy_total: legacy.len(),
            matched,
            parity_matched,
            legacy_only,
            current_only,
        }
    }
}

fn shape(fields: &[FieldSpec]) -> BTreeSet<String> {
    fields.iter().map(|f| format!("{}:{}", f.name, f.ty)).collect()
}

fn describe(fields: &BTreeSet<String>) -> String {
    format!("[{}]", fields.iter().cloned().collect::<Vec<_>>().join(", "))
}

/// Differences between two declarations of the same capability.
fn compare(legacy: &CapabilityDescriptor, current: &CapabilityDescriptor) -> Vec<String> {
    let mut notes = Vec::new();

    let (old_in, new_in) = (shape(&legacy.required), shape(&current.required));
    if old_in != new_in {
        notes.push(format!(
            "required inputs differ: legacy {} vs current {}",
            describe(&old_in),
            describe(&new_in)
        ));
    }

    let (old_out, new_out) = (shape(&legacy.output), shape(&current.output));
    if old_out != new_out {
        notes.push(format!(
            "result shape differs: legacy {} vs current {}",
            describe(&old_out),
            describe(&new_out)
        ));
    }
    notes
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
