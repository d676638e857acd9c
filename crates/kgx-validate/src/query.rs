//! Compiling a [`SlotConstraint`] into a pair of DuckDB-dialect SQL
//! statements: one that counts violations, one that samples a few.

use crate::constraint::{ConstraintType, ConstraintValue, SlotConstraint};

/// `None` for constraints that are informational only (multivalued,
/// subproperty_of) and never compile to a query.
pub fn generate_query_pair(constraint: &SlotConstraint, table: &str, sample_limit: u64) -> Option<(String, String)> {
    let slot = &constraint.slot_name;

    match constraint.constraint_type {
        ConstraintType::Required | ConstraintType::Recommended => Some(required_queries(table, slot, sample_limit)),
        ConstraintType::Pattern => match &constraint.value {
            ConstraintValue::Text(pattern) => Some(pattern_queries(table, slot, pattern, sample_limit)),
            _ => None,
        },
        ConstraintType::MinimumCardinality => match constraint.value {
            ConstraintValue::Count(n) => Some(cardinality_queries(table, slot, "<", n, sample_limit)),
            _ => None,
        },
        ConstraintType::MaximumCardinality => match constraint.value {
            ConstraintValue::Count(n) => Some(cardinality_queries(table, slot, ">", n, sample_limit)),
            _ => None,
        },
        ConstraintType::ExactCardinality => match constraint.value {
            ConstraintValue::Count(n) => Some(cardinality_queries(table, slot, "!=", n, sample_limit)),
            _ => None,
        },
        _ => None,
    }
}

fn required_queries(table: &str, slot: &str, limit: u64) -> (String, String) {
    let count = format!(r#"SELECT COUNT(*) FROM {table} WHERE "{slot}" IS NULL OR TRIM(CAST("{slot}" AS VARCHAR)) = ''"#);
    let sample = format!(r#"SELECT "{slot}" FROM {table} WHERE "{slot}" IS NULL OR TRIM(CAST("{slot}" AS VARCHAR)) = '' LIMIT {limit}"#);
    (count, sample)
}

fn pattern_queries(table: &str, slot: &str, pattern: &str, limit: u64) -> (String, String) {
    let escaped = pattern.replace('\'', "''");
    let count = format!(
        r#"SELECT COUNT(*) FROM {table} WHERE "{slot}" IS NOT NULL AND NOT regexp_matches(CAST("{slot}" AS VARCHAR), '{escaped}')"#
    );
    let sample = format!(
        r#"SELECT "{slot}" FROM {table} WHERE "{slot}" IS NOT NULL AND NOT regexp_matches(CAST("{slot}" AS VARCHAR), '{escaped}') LIMIT {limit}"#
    );
    (count, sample)
}

fn cardinality_queries(table: &str, slot: &str, comparison: &str, bound: u64, limit: u64) -> (String, String) {
    let count = format!(
        r#"SELECT COUNT(*) FROM {table} WHERE "{slot}" IS NOT NULL AND array_length("{slot}") {comparison} {bound}"#
    );
    let sample = format!(
        r#"SELECT "{slot}", array_length("{slot}") FROM {table} WHERE "{slot}" IS NOT NULL AND array_length("{slot}") {comparison} {bound} LIMIT {limit}"#
    );
    (count, sample)
}

/// A composite unique-key check: the columns in `key_slots` must, taken
/// together, appear at most once per row.
pub fn unique_key_queries(table: &str, key_slots: &[String], limit: u64) -> (String, String) {
    let columns = key_slots.iter().map(|s| format!(r#""{s}""#)).collect::<Vec<_>>().join(", ");
    let count = format!(
        "SELECT COALESCE(SUM(dup_count - 1), 0) FROM (SELECT {columns}, COUNT(*) AS dup_count FROM {table} GROUP BY {columns} HAVING COUNT(*) > 1)"
    );
    let sample = format!(
        "SELECT {columns}, COUNT(*) FROM {table} GROUP BY {columns} HAVING COUNT(*) > 1 ORDER BY COUNT(*) DESC LIMIT {limit}"
    );
    (count, sample)
}

/// Edge endpoints (`subject`/`object`) that don't resolve to a node id.
pub fn referential_integrity_queries(column: &str, limit: u64) -> (String, String) {
    let count = format!("SELECT COUNT(*) FROM edges e WHERE e.{column} NOT IN (SELECT id FROM nodes)");
    let sample = format!(
        "SELECT e.{column}, COUNT(*) FROM edges e WHERE e.{column} NOT IN (SELECT id FROM nodes) GROUP BY e.{column} ORDER BY COUNT(*) DESC LIMIT {limit}"
    );
    (count, sample)
}

/// A column's value must be one of a fixed set (Biolink `category`/`predicate` enums).
pub fn enum_membership_queries(table: &str, column: &str, allowed: &[String], limit: u64) -> (String, String) {
    let list = allowed.iter().map(|v| format!("'{}'", v.replace('\'', "''"))).collect::<Vec<_>>().join(",");
    let count = format!("SELECT COUNT(*) FROM {table} WHERE {column} IS NOT NULL AND {column} NOT IN ({list})");
    let sample = format!(
        "SELECT {column}, COUNT(*) FROM {table} WHERE {column} IS NOT NULL AND {column} NOT IN ({list}) GROUP BY {column} ORDER BY COUNT(*) DESC LIMIT {limit}"
    );
    (count, sample)
}

/// Node `id` must start with one of the category's allowed prefixes.
pub fn id_prefix_queries(category: &str, prefixes: &[String], limit: u64) -> (String, String) {
    let pattern = prefixes.iter().map(|p| format!("^{p}:")).collect::<Vec<_>>().join("|");
    let category_escaped = category.replace('\'', "''");
    let count = format!(
        "SELECT COUNT(*) FROM nodes WHERE category = '{category_escaped}' AND id IS NOT NULL AND NOT regexp_matches(id, '{pattern}')"
    );
    let sample = format!(
        "SELECT id FROM nodes WHERE category = '{category_escaped}' AND id IS NOT NULL AND NOT regexp_matches(id, '{pattern}') LIMIT {limit}"
    );
    (count, sample)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Severity;

    #[test]
    fn required_constraint_compiles_to_null_or_blank_check() {
        let constraint = SlotConstraint {
            slot_name: "id".to_string(),
            constraint_type: ConstraintType::Required,
            value: ConstraintValue::Flag,
            severity: Severity::Error,
            description: String::new(),
        };
        let (count, _sample) = generate_query_pair(&constraint, "nodes", 10).unwrap();
        assert!(count.contains("IS NULL"));
        assert!(count.contains("nodes"));
    }

    #[test]
    fn multivalued_constraint_has_no_query() {
        let constraint = SlotConstraint {
            slot_name: "category".to_string(),
            constraint_type: ConstraintType::Multivalued,
            value: ConstraintValue::Flag,
            severity: Severity::Info,
            description: String::new(),
        };
        assert!(generate_query_pair(&constraint, "nodes", 10).is_none());
    }
}
