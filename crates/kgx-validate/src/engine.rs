//! Running a schema's constraints against a loaded graph database.

use crate::constraint::{class_constraints, ConstraintType, Severity, SlotConstraint};
use crate::query;
use crate::report::{ValidationReport, ValidationViolation, ViolationSample};
use crate::schema::Schema;
use kgx_graphdb::GraphDb;
use kgx_model::Result;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationProfile {
    Minimal,
    Standard,
    Full,
}

#[derive(Debug, Clone)]
pub struct ValidationContext {
    pub categories: Option<Vec<String>>,
    pub profile: ValidationProfile,
    pub sample_limit: u64,
}

impl Default for ValidationContext {
    fn default() -> ValidationContext {
        ValidationContext { categories: None, profile: ValidationProfile::Standard, sample_limit: 10 }
    }
}

pub struct ValidationEngine<'a> {
    db: &'a GraphDb,
    schema: &'a Schema,
}

impl<'a> ValidationEngine<'a> {
    pub fn new(db: &'a GraphDb, schema: &'a Schema) -> ValidationEngine<'a> {
        ValidationEngine { db, schema }
    }

    pub fn validate(&self, context: &ValidationContext) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();

        let validate_values = context.profile != ValidationProfile::Minimal;
        let validate_referential = context.profile == ValidationProfile::Full;
        let validate_biolink = matches!(context.profile, ValidationProfile::Standard | ValidationProfile::Full);
        let validate_unique_keys = context.profile == ValidationProfile::Full;

        if self.db.table_exists("nodes") {
            report.violations.extend(self.validate_schema_structure("nodes", "named thing")?);
        }
        if self.db.table_exists("edges") {
            report.violations.extend(self.validate_schema_structure("edges", "association")?);
        }

        if validate_values {
            if self.db.table_exists("nodes") {
                report.violations.extend(self.validate_table("nodes", "named thing", context)?);
                report.tables_validated.push("nodes".to_string());
            }
            if self.db.table_exists("edges") {
                report.violations.extend(self.validate_table("edges", "association", context)?);
                report.tables_validated.push("edges".to_string());
            }
        }

        if validate_referential && self.db.table_exists("nodes") && self.db.table_exists("edges") {
            report.violations.extend(self.validate_referential_integrity(context.sample_limit)?);
        }

        if validate_biolink {
            if self.db.table_exists("nodes") {
                report.violations.extend(self.validate_categories(context.sample_limit)?);
                report.violations.extend(self.validate_id_prefixes(context.sample_limit)?);
            }
            if self.db.table_exists("edges") {
                report.violations.extend(self.validate_predicates(context.sample_limit)?);
            }
        }

        if validate_unique_keys && self.db.table_exists("edges") {
            report.violations.extend(self.validate_unique_keys("edges", "association", context.sample_limit)?);
        }

        let table_record_counts: Vec<(String, u64)> =
            report.tables_validated.iter().map(|t| (t.clone(), self.db.row_count(t))).collect();
        report.compute_summary(&table_record_counts);

        Ok(report)
    }

    fn available_columns(&self, table: &str) -> BTreeSet<String> {
        self.db.describe(table).into_iter().map(|(name, _)| name).collect()
    }

    fn validate_schema_structure(&self, table: &str, class_name: &str) -> Result<Vec<ValidationViolation>> {
        let Some(class) = self.schema.class(class_name) else { return Ok(Vec::new()) };
        let constraints = class_constraints(self.schema, class);
        let available = self.available_columns(table);
        let total_records = self.db.row_count(table);

        let mut violations = Vec::new();
        for (slot_name, slot_constraints) in &constraints.slots {
            if available.contains(slot_name) {
                continue;
            }
            let is_required = slot_constraints.iter().any(|c| c.constraint_type == ConstraintType::Required);
            let is_recommended = slot_constraints.iter().any(|c| c.constraint_type == ConstraintType::Recommended);
            let severity = if is_required {
                Severity::Error
            } else if is_recommended {
                Severity::Warning
            } else {
                continue;
            };
            violations.push(ValidationViolation {
                constraint_type: ConstraintType::MissingColumn,
                slot_name: slot_name.clone(),
                table: table.to_string(),
                severity,
                description: format!("Column '{slot_name}' ({}) does not exist in table", severity.as_str()),
                violation_count: total_records,
                total_records,
                violation_percentage: 100.0,
                samples: Vec::new(),
            });
        }
        Ok(violations)
    }

    fn validate_table(&self, table: &str, class_name: &str, context: &ValidationContext) -> Result<Vec<ValidationViolation>> {
        let Some(class) = self.schema.class(class_name) else { return Ok(Vec::new()) };
        let constraints = class_constraints(self.schema, class);
        let available = self.available_columns(table);
        let total_records = self.db.row_count(table);

        let mut violations = Vec::new();
        for (slot_name, slot_constraints) in &constraints.slots {
            if !available.contains(slot_name) {
                continue;
            }
            for constraint in slot_constraints {
                if let Some(violation) = self.run_query_pair(constraint, table, total_records, context.sample_limit)? {
                    violations.push(violation);
                }
            }
        }
        Ok(violations)
    }

    fn run_query_pair(
        &self,
        constraint: &SlotConstraint,
        table: &str,
        total_records: u64,
        sample_limit: u64,
    ) -> Result<Option<ValidationViolation>> {
        let Some((count_sql, sample_sql)) = query::generate_query_pair(constraint, table, sample_limit) else {
            return Ok(None);
        };

        let violation_count = match self.scalar_count(&count_sql) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(slot = constraint.slot_name, "validation query failed: {e}");
                return Ok(None);
            }
        };
        if violation_count == 0 {
            return Ok(None);
        }

        let samples = self.sample_rows(&sample_sql).unwrap_or_default();
        Ok(Some(ValidationViolation {
            constraint_type: constraint.constraint_type,
            slot_name: constraint.slot_name.clone(),
            table: table.to_string(),
            severity: constraint.severity,
            description: constraint.description.clone(),
            violation_count,
            total_records,
            violation_percentage: percentage(violation_count, total_records),
            samples,
        }))
    }

    fn validate_unique_keys(&self, table: &str, class_name: &str, sample_limit: u64) -> Result<Vec<ValidationViolation>> {
        let Some(class) = self.schema.class(class_name) else { return Ok(Vec::new()) };
        if class.unique_keys.is_empty() {
            return Ok(Vec::new());
        }
        let available = self.available_columns(table);
        let total_records = self.db.row_count(table);

        let mut violations = Vec::new();
        for (uk_name, uk_slots) in &class.unique_keys {
            if !uk_slots.iter().all(|s| available.contains(s)) {
                tracing::debug!(unique_key = uk_name, "skipping, missing columns");
                continue;
            }
            let (count_sql, sample_sql) = query::unique_key_queries(table, uk_slots, sample_limit);
            let violation_count = self.scalar_count(&count_sql)?;
            if violation_count == 0 {
                continue;
            }
            let samples = self.sample_rows(&sample_sql).unwrap_or_default();
            violations.push(ValidationViolation {
                constraint_type: ConstraintType::UniqueKey,
                slot_name: uk_name.clone(),
                table: table.to_string(),
                severity: Severity::Error,
                description: format!("Duplicate values for unique key ({})", uk_slots.join(", ")),
                violation_count,
                total_records,
                violation_percentage: percentage(violation_count, total_records),
                samples,
            });
        }
        Ok(violations)
    }

    fn validate_referential_integrity(&self, sample_limit: u64) -> Result<Vec<ValidationViolation>> {
        let total_edges = self.db.row_count("edges");
        let mut violations = Vec::new();
        for column in ["subject", "object"] {
            let (count_sql, sample_sql) = query::referential_integrity_queries(column, sample_limit);
            let violation_count = self.scalar_count(&count_sql)?;
            if violation_count == 0 {
                continue;
            }
            let samples = self.sample_rows(&sample_sql).unwrap_or_default();
            violations.push(ValidationViolation {
                constraint_type: ConstraintType::RangeClass,
                slot_name: column.to_string(),
                table: "edges".to_string(),
                severity: Severity::Error,
                description: format!("Edge {column} references a non-existent node"),
                violation_count,
                total_records: total_edges,
                violation_percentage: percentage(violation_count, total_edges),
                samples,
            });
        }
        Ok(violations)
    }

    fn validate_categories(&self, sample_limit: u64) -> Result<Vec<ValidationViolation>> {
        let valid = self.schema.valid_categories();
        if valid.is_empty() {
            return Ok(Vec::new());
        }
        let total_nodes = self.db.row_count("nodes");
        let (count_sql, sample_sql) = query::enum_membership_queries("nodes", "category", &valid, sample_limit);
        let violation_count = self.scalar_count(&count_sql)?;
        if violation_count == 0 {
            return Ok(Vec::new());
        }
        let samples = self.sample_rows(&sample_sql).unwrap_or_default();
        Ok(vec![ValidationViolation {
            constraint_type: ConstraintType::Enum,
            slot_name: "category".to_string(),
            table: "nodes".to_string(),
            severity: Severity::Warning,
            description: "Node category not in the Biolink model".to_string(),
            violation_count,
            total_records: total_nodes,
            violation_percentage: percentage(violation_count, total_nodes),
            samples,
        }])
    }

    fn validate_predicates(&self, sample_limit: u64) -> Result<Vec<ValidationViolation>> {
        let valid = self.schema.valid_predicates();
        if valid.is_empty() {
            return Ok(Vec::new());
        }
        let total_edges = self.db.row_count("edges");
        let (count_sql, sample_sql) = query::enum_membership_queries("edges", "predicate", &valid, sample_limit);
        let violation_count = self.scalar_count(&count_sql)?;
        if violation_count == 0 {
            return Ok(Vec::new());
        }
        let samples = self.sample_rows(&sample_sql).unwrap_or_default();
        Ok(vec![ValidationViolation {
            constraint_type: ConstraintType::InvalidSubproperty,
            slot_name: "predicate".to_string(),
            table: "edges".to_string(),
            severity: Severity::Warning,
            description: "Edge predicate not found in the Biolink slot hierarchy".to_string(),
            violation_count,
            total_records: total_edges,
            violation_percentage: percentage(violation_count, total_edges),
            samples,
        }])
    }

    fn validate_id_prefixes(&self, sample_limit: u64) -> Result<Vec<ValidationViolation>> {
        let total_nodes = self.db.row_count("nodes");
        let mut violations = Vec::new();
        for (category, class) in &self.schema.classes {
            if class.id_prefixes.is_empty() || !class.id_prefixes_are_closed {
                continue;
            }
            let biolink_category = format!("biolink:{}", category.replace(' ', ""));
            let (count_sql, sample_sql) = query::id_prefix_queries(&biolink_category, &class.id_prefixes, sample_limit);
            let violation_count = self.scalar_count(&count_sql)?;
            if violation_count == 0 {
                continue;
            }
            let samples = self.sample_rows(&sample_sql).unwrap_or_default();
            violations.push(ValidationViolation {
                constraint_type: ConstraintType::IdPrefix,
                slot_name: "id".to_string(),
                table: "nodes".to_string(),
                severity: Severity::Warning,
                description: format!("ID prefix not in allowed list for {biolink_category}: {:?}", class.id_prefixes),
                violation_count,
                total_records: total_nodes,
                violation_percentage: percentage(violation_count, total_nodes),
                samples,
            });
        }
        Ok(violations)
    }

    fn scalar_count(&self, sql: &str) -> Result<u64> {
        self.db
            .connection()
            .query_row(sql, [], |row| row.get::<_, i64>(0))
            .map(|n| n.max(0) as u64)
            .map_err(|e| kgx_model::Error::validation(format!("validation query failed: {e}\n{sql}")))
    }

    fn sample_rows(&self, sql: &str) -> Result<Vec<ViolationSample>> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(sql).map_err(|e| kgx_model::Error::validation(e.to_string()))?;
        let column_count = stmt.column_count();
        let rows = stmt
            .query_map([], |row| {
                (0..column_count).map(|i| row.get::<_, Option<String>>(i)).collect::<duckdb::Result<Vec<_>>>()
            })
            .map_err(|e| kgx_model::Error::validation(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).map(|values| ViolationSample { values }).collect())
    }
}

fn percentage(count: u64, total: u64) -> f64 {
    if total > 0 {
        count as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    fn schema() -> Schema {
        Schema::from_yaml_str(
            r#"
classes:
  "named thing":
    table: nodes
    slots: [id, category]
  association:
    table: edges
    slots: [subject, predicate, object]
slots:
  id:
    identifier: true
    required: true
  category:
    multivalued: true
    recommended: true
  subject:
    required: true
  predicate:
    required: true
  object:
    required: true
"#,
        )
        .unwrap()
    }

    #[test]
    fn minimal_profile_only_checks_schema_structure() {
        let db = GraphDb::open_in_memory().unwrap();
        db.exec("CREATE TABLE nodes AS SELECT 'A' AS id").unwrap();
        let schema = schema();
        let engine = ValidationEngine::new(&db, &schema);
        let context = ValidationContext { profile: ValidationProfile::Minimal, ..Default::default() };
        let report = engine.validate(&context).unwrap();
        assert!(report.violations.iter().any(|v| v.constraint_type == ConstraintType::MissingColumn));
        assert!(report.tables_validated.is_empty());
    }

    #[test]
    fn standard_profile_flags_required_nulls() {
        let db = GraphDb::open_in_memory().unwrap();
        db.exec("CREATE TABLE nodes AS SELECT NULL::VARCHAR AS id, 'biolink:Gene' AS category").unwrap();
        let schema = schema();
        let engine = ValidationEngine::new(&db, &schema);
        let report = engine.validate(&ValidationContext::default()).unwrap();
        assert!(report.has_errors());
        assert!(report.violations.iter().any(|v| v.constraint_type == ConstraintType::Required && v.slot_name == "id"));
    }

    #[test]
    fn full_profile_adds_referential_integrity() {
        let db = GraphDb::open_in_memory().unwrap();
        db.exec("CREATE TABLE nodes AS SELECT 'A' AS id, 'biolink:Gene' AS category").unwrap();
        db.exec("CREATE TABLE edges AS SELECT 'A' AS subject, 'biolink:related_to' AS predicate, 'MISSING' AS object").unwrap();
        let schema = schema();
        let engine = ValidationEngine::new(&db, &schema);
        let context = ValidationContext { profile: ValidationProfile::Full, ..Default::default() };
        let report = engine.validate(&context).unwrap();
        assert!(report.violations.iter().any(|v| v.constraint_type == ConstraintType::RangeClass && v.slot_name == "object"));
    }
}
