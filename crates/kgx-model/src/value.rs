use std::fmt;

/// A single field value within a [`crate::Record`].
///
/// This mirrors the four semantic types the KGX convention actually uses
/// on the wire (string, int, float, pipe-delimited list) plus null, rather
/// than the full `serde_json::Value` tree — records are a flat property
/// bag, never nested objects.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Float(f64),
    List(Vec<String>),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Flattens to a single display string, joining list elements with `delimiter`.
    /// Used by TSV-shaped writers and readers alike.
    pub fn flatten(&self, delimiter: &str) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::List(items) => items.join(delimiter),
            Value::Null => String::new(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.flatten("|"))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::List(v)
    }
}

impl<T> From<Option<T>> for Value
where
    Value: From<T>,
{
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => Value::from(v),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_joins_lists_with_delimiter() {
        let v = Value::List(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(v.flatten("|"), "a|b|c");
    }

    #[test]
    fn flatten_scalars_round_trip_as_strings() {
        assert_eq!(Value::Int(42).flatten("|"), "42");
        assert_eq!(Value::Null.flatten("|"), "");
    }
}
