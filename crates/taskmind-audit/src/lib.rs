//! Consistency audit between two capability surfaces.
//!
//! Compares a legacy capability inventory with the descriptors declared by
//! the current command registry. Nothing is executed: parity here means the
//! two surfaces declare the same required inputs and the same result shape.

mod error;
mod inventory;
mod report;

pub use error::AuditError;
pub use inventory::Inventory;
pub use report::{AuditReport, CapabilityRecord, ConsistencyValidator};
