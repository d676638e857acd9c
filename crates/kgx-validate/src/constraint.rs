//! The constraint vocabulary extracted from a schema slot, independent of
//! how it will later be compiled to SQL.

use crate::schema::{ClassDefinition, Schema, SlotDefinition};
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintType {
    Required,
    Recommended,
    Pattern,
    Enum,
    Identifier,
    Multivalued,
    RangeClass,
    MissingColumn,
    IdPrefix,
    InvalidSubproperty,
    MinimumCardinality,
    MaximumCardinality,
    ExactCardinality,
    UniqueKey,
    SubpropertyOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ConstraintValue {
    Flag,
    Text(String),
    Count(u64),
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct SlotConstraint {
    pub slot_name: String,
    pub constraint_type: ConstraintType,
    pub value: ConstraintValue,
    pub severity: Severity,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct ClassConstraints {
    pub table: String,
    pub slots: IndexMap<String, Vec<SlotConstraint>>,
}

/// Extracts every constraint a slot definition carries. A slot can yield
/// several constraints at once (e.g. required + pattern).
pub fn extract_slot_constraints(slot_name: &str, slot: &SlotDefinition) -> Vec<SlotConstraint> {
    let mut constraints = Vec::new();

    if slot.required {
        constraints.push(SlotConstraint {
            slot_name: slot_name.to_string(),
            constraint_type: ConstraintType::Required,
            value: ConstraintValue::Flag,
            severity: Severity::Error,
            description: format!("Field '{slot_name}' is required"),
        });
    } else if slot.recommended {
        constraints.push(SlotConstraint {
            slot_name: slot_name.to_string(),
            constraint_type: ConstraintType::Recommended,
            value: ConstraintValue::Flag,
            severity: Severity::Warning,
            description: format!("Field '{slot_name}' is recommended"),
        });
    }

    if let Some(pattern) = &slot.pattern {
        constraints.push(SlotConstraint {
            slot_name: slot_name.to_string(),
            constraint_type: ConstraintType::Pattern,
            value: ConstraintValue::Text(pattern.clone()),
            severity: Severity::Error,
            description: format!("Field '{slot_name}' must match pattern: {pattern}"),
        });
    }

    if let Some(min) = slot.minimum_cardinality {
        constraints.push(SlotConstraint {
            slot_name: slot_name.to_string(),
            constraint_type: ConstraintType::MinimumCardinality,
            value: ConstraintValue::Count(min),
            severity: Severity::Error,
            description: format!("Field '{slot_name}' requires at least {min} value(s)"),
        });
    }

    if let Some(max) = slot.maximum_cardinality {
        constraints.push(SlotConstraint {
            slot_name: slot_name.to_string(),
            constraint_type: ConstraintType::MaximumCardinality,
            value: ConstraintValue::Count(max),
            severity: Severity::Error,
            description: format!("Field '{slot_name}' allows at most {max} value(s)"),
        });
    }

    if let Some(exact) = slot.exact_cardinality {
        constraints.push(SlotConstraint {
            slot_name: slot_name.to_string(),
            constraint_type: ConstraintType::ExactCardinality,
            value: ConstraintValue::Count(exact),
            severity: Severity::Error,
            description: format!("Field '{slot_name}' requires exactly {exact} value(s)"),
        });
    }

    if slot.identifier {
        constraints.push(SlotConstraint {
            slot_name: slot_name.to_string(),
            constraint_type: ConstraintType::Identifier,
            value: ConstraintValue::Flag,
            severity: Severity::Error,
            description: format!("Field '{slot_name}' must be unique"),
        });
    }

    if slot.multivalued {
        constraints.push(SlotConstraint {
            slot_name: slot_name.to_string(),
            constraint_type: ConstraintType::Multivalued,
            value: ConstraintValue::Flag,
            severity: Severity::Info,
            description: format!("Field '{slot_name}' can have multiple values"),
        });
    }

    if let Some(parent) = &slot.subproperty_of {
        constraints.push(SlotConstraint {
            slot_name: slot_name.to_string(),
            constraint_type: ConstraintType::SubpropertyOf,
            value: ConstraintValue::Text(parent.clone()),
            severity: Severity::Info,
            description: format!("Field '{slot_name}' is a subproperty of '{parent}'"),
        });
    }

    constraints
}

/// Collects every induced slot's constraints for one class.
pub fn class_constraints(schema: &Schema, class: &ClassDefinition) -> ClassConstraints {
    let mut slots = IndexMap::new();
    for slot_name in &class.slots {
        let constraints = match schema.slot(slot_name) {
            Some(slot_def) => extract_slot_constraints(slot_name, slot_def),
            None => continue,
        };
        if !constraints.is_empty() {
            slots.insert(slot_name.clone(), constraints);
        }
    }
    ClassConstraints { table: class.table.clone(), slots }
}
