//! Foundational data model shared by every other crate in this workspace:
//! the KGX [`Record`]/[`Value`] types, [`Node`]/[`Edge`] views over them,
//! the cross-cutting [`Error`] taxonomy, and the small set of Biolink
//! conventions (multivalued columns, canonical TSV column order) that
//! several downstream crates need to agree on.
//!
//! NOTE: keep this crate's dependency list small. Everything else in the
//! workspace depends on it, directly or transitively.

mod error;
mod record;
mod value;

pub use error::{Error, ErrorKind, Result};
pub use record::{Edge, Mapping, Node, Record};
pub use value::Value;

/// The delimiter KGX TSV uses to flatten list-valued fields.
pub const MULTIVALUED_DELIMITER: char = '|';

/// Columns whose values are pipe-delimited lists at rest in KGX TSV, and
/// which the graph DB facade splits into arrays during unification.
pub const MULTIVALUED_COLUMNS: &[&str] = &[
    "category",
    "publications",
    "has_evidence",
    "provided_by",
    "synonym",
    "xref",
    "qualifiers",
];

/// Canonical leading column order for node TSV output. Remaining columns
/// are appended alphabetically, with `_`-prefixed columns last.
pub const NODE_COLUMN_PREFIX: &[&str] = &[
    "id",
    "category",
    "name",
    "description",
    "xref",
    "provided_by",
    "synonym",
];

/// Canonical leading column order for edge TSV output.
pub const EDGE_COLUMN_PREFIX: &[&str] = &[
    "id",
    "subject",
    "predicate",
    "object",
    "category",
    "provided_by",
];

/// Returns true if `column` is one of the Biolink-derived multivalued columns.
pub fn is_multivalued_column(column: &str) -> bool {
    MULTIVALUED_COLUMNS.contains(&column)
}
