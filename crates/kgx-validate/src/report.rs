//! The result of running the validation engine: every violation found,
//! plus aggregate counts and a compliance percentage.

use crate::constraint::{ConstraintType, Severity};

#[derive(Debug, Clone, Default)]
pub struct ViolationSample {
    pub values: Vec<Option<String>>,
}

#[derive(Debug, Clone)]
pub struct ValidationViolation {
    pub constraint_type: ConstraintType,
    pub slot_name: String,
    pub table: String,
    pub severity: Severity,
    pub description: String,
    pub violation_count: u64,
    pub total_records: u64,
    pub violation_percentage: f64,
    pub samples: Vec<ViolationSample>,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub violations: Vec<ValidationViolation>,
    pub total_violations: u64,
    pub error_count: u64,
    pub warning_count: u64,
    pub info_count: u64,
    pub compliance_percentage: f64,
    pub tables_validated: Vec<String>,
    pub constraints_checked: u64,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Fills in the aggregate fields from `violations`/`tables_validated`,
    /// which must already be populated.
    pub fn compute_summary(&mut self, table_record_counts: &[(String, u64)]) {
        self.total_violations = self.violations.iter().map(|v| v.violation_count).sum();
        self.error_count = self.violations.iter().filter(|v| v.severity == Severity::Error).map(|v| v.violation_count).sum();
        self.warning_count = self.violations.iter().filter(|v| v.severity == Severity::Warning).map(|v| v.violation_count).sum();
        self.info_count = self.violations.iter().filter(|v| v.severity == Severity::Info).map(|v| v.violation_count).sum();
        self.constraints_checked = self.violations.len() as u64;

        let total_records: u64 = self
            .tables_validated
            .iter()
            .filter_map(|table| table_record_counts.iter().find(|(t, _)| t == table).map(|(_, n)| *n))
            .sum();

        self.compliance_percentage = if total_records > 0 {
            (total_records.saturating_sub(self.error_count)) as f64 / total_records as f64 * 100.0
        } else {
            100.0
        };
    }
}
