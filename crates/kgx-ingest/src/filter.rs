//! Typed row predicates with include/exclude polarity, evaluated over a
//! record before it reaches the transform runtime.

use kgx_config::{ColumnFilter, FilterConfig, FilterValue, ListColumnFilter, Polarity};
use kgx_model::{Record, Value};

/// A compiled predicate ready to test against records. Compilation just
/// flattens the discriminated [`FilterConfig`] into operator + operand so
/// evaluation doesn't re-match on every row.
pub struct Predicate {
    column: String,
    inclusion: Polarity,
    op: Op,
}

enum Op {
    Gt(FilterValue),
    Ge(FilterValue),
    Lt(FilterValue),
    Le(FilterValue),
    Eq(FilterValue),
    Ne(FilterValue),
    In(Vec<FilterValue>),
    InExact(Vec<FilterValue>),
}

impl Predicate {
    pub fn compile(config: &FilterConfig) -> Predicate {
        let (column, inclusion, op) = match config {
            FilterConfig::Gt(ColumnFilter { column, inclusion, value }) => {
                (column.clone(), *inclusion, Op::Gt(value.clone()))
            }
            FilterConfig::Ge(ColumnFilter { column, inclusion, value }) => {
                (column.clone(), *inclusion, Op::Ge(value.clone()))
            }
            FilterConfig::Lt(ColumnFilter { column, inclusion, value }) => {
                (column.clone(), *inclusion, Op::Lt(value.clone()))
            }
            FilterConfig::Le(ColumnFilter { column, inclusion, value }) => {
                (column.clone(), *inclusion, Op::Le(value.clone()))
            }
            FilterConfig::Eq(ColumnFilter { column, inclusion, value }) => {
                (column.clone(), *inclusion, Op::Eq(value.clone()))
            }
            FilterConfig::Ne(ColumnFilter { column, inclusion, value }) => {
                (column.clone(), *inclusion, Op::Ne(value.clone()))
            }
            FilterConfig::In(ListColumnFilter { column, inclusion, value }) => {
                (column.clone(), *inclusion, Op::In(value.clone()))
            }
            FilterConfig::InExact(ListColumnFilter { column, inclusion, value }) => {
                (column.clone(), *inclusion, Op::InExact(value.clone()))
            }
        };
        Predicate { column, inclusion, op }
    }

    /// Evaluates this predicate against `record`. A `None`/missing value in
    /// the target column always drops the row, regardless of polarity.
    fn matches(&self, record: &Record) -> bool {
        let Some(actual) = record.get(&self.column) else {
            return false;
        };
        if actual.is_null() {
            return false;
        }

        let outcome = match &self.op {
            Op::Gt(v) => compare_numeric(actual, v).map(|o| o == std::cmp::Ordering::Greater).unwrap_or(false),
            Op::Ge(v) => compare_numeric(actual, v).map(|o| o != std::cmp::Ordering::Less).unwrap_or(false),
            Op::Lt(v) => compare_numeric(actual, v).map(|o| o == std::cmp::Ordering::Less).unwrap_or(false),
            Op::Le(v) => compare_numeric(actual, v).map(|o| o != std::cmp::Ordering::Greater).unwrap_or(false),
            Op::Eq(v) => equals(actual, v),
            Op::Ne(v) => !equals(actual, v),
            Op::In(list) => list.iter().any(|v| in_list_fuzzy(actual, v)),
            Op::InExact(list) => list.iter().any(|v| equals(actual, v)),
        };

        match self.inclusion {
            Polarity::Include => outcome,
            Polarity::Exclude => !outcome,
        }
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

fn filter_value_as_f64(value: &FilterValue) -> Option<f64> {
    match value {
        FilterValue::Int(i) => Some(*i as f64),
        FilterValue::Float(f) => Some(*f),
        FilterValue::String(s) => s.parse::<f64>().ok(),
    }
}

fn compare_numeric(actual: &Value, expected: &FilterValue) -> Option<std::cmp::Ordering> {
    let a = as_f64(actual)?;
    let b = filter_value_as_f64(expected)?;
    a.partial_cmp(&b)
}

fn filter_value_as_string(value: &FilterValue) -> String {
    match value {
        FilterValue::Int(i) => i.to_string(),
        FilterValue::Float(f) => f.to_string(),
        FilterValue::String(s) => s.clone(),
    }
}

/// `eq`/`ne` accept strings in addition to numeric comparisons.
fn equals(actual: &Value, expected: &FilterValue) -> bool {
    if let (Some(a), Some(b)) = (as_f64(actual), filter_value_as_f64(expected)) {
        if a == b {
            return true;
        }
    }
    actual.flatten("|") == filter_value_as_string(expected)
}

/// `in` matches by substring when the actual column value is a string, or
/// exact membership otherwise.
fn in_list_fuzzy(actual: &Value, candidate: &FilterValue) -> bool {
    match actual {
        Value::String(s) => s.contains(&filter_value_as_string(candidate)),
        _ => equals(actual, candidate),
    }
}

/// Owns a list of predicates; a record passes iff every predicate agrees.
#[derive(Default)]
pub struct RowFilter {
    predicates: Vec<Predicate>,
}

impl RowFilter {
    pub fn new(configs: &[FilterConfig]) -> RowFilter {
        RowFilter {
            predicates: configs.iter().map(Predicate::compile).collect(),
        }
    }

    pub fn keep(&self, record: &Record) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with(column: &str, value: impl Into<Value>) -> Record {
        let mut r = Record::new();
        r.insert(column, value);
        r
    }

    #[test]
    fn none_value_is_dropped_regardless_of_polarity() {
        let filter = RowFilter::new(&[FilterConfig::Eq(ColumnFilter {
            column: "category".into(),
            inclusion: Polarity::Exclude,
            value: FilterValue::String("biolink:Gene".into()),
        })]);
        let mut record = Record::new();
        record.insert("category", Value::Null);
        assert!(!filter.keep(&record));
    }

    #[test]
    fn in_matches_substring_for_strings() {
        let filter = RowFilter::new(&[FilterConfig::In(ListColumnFilter {
            column: "xref".into(),
            inclusion: Polarity::Include,
            value: vec![FilterValue::String("FOO".into())],
        })]);
        let record = record_with("xref", "prefix:FOO:123");
        assert!(filter.keep(&record));
    }

    #[test]
    fn in_exact_requires_full_match() {
        let filter = RowFilter::new(&[FilterConfig::InExact(ListColumnFilter {
            column: "xref".into(),
            inclusion: Polarity::Include,
            value: vec![FilterValue::String("FOO".into())],
        })]);
        let record = record_with("xref", "prefix:FOO:123");
        assert!(!filter.keep(&record));
    }

    #[test]
    fn exclude_polarity_inverts_outcome() {
        let filter = RowFilter::new(&[FilterConfig::Eq(ColumnFilter {
            column: "category".into(),
            inclusion: Polarity::Exclude,
            value: FilterValue::String("biolink:Gene".into()),
        })]);
        assert!(!filter.keep(&record_with("category", "biolink:Gene")));
        assert!(filter.keep(&record_with("category", "biolink:Disease")));
    }
}
