//! Declarative validation of a loaded graph database against a Biolink-like
//! schema: constraint extraction, SQL compilation, and a staged check
//! pipeline gated by a validation profile.

mod constraint;
mod engine;
mod query;
mod report;
mod schema;

pub use constraint::{ClassConstraints, ConstraintType, ConstraintValue, Severity, SlotConstraint};
pub use engine::{ValidationContext, ValidationEngine, ValidationProfile};
pub use report::{ValidationReport, ValidationViolation, ViolationSample};
pub use schema::{ClassDefinition, EnumDefinition, Schema, SlotDefinition};
