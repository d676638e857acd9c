use crate::value::Value;
use indexmap::IndexMap;
use std::ops::{Deref, DerefMut};

/// An ordered string-keyed property bag. Insertion order is preserved so
/// that writers which honor a "declared or first-seen" column order (the
/// TSV writer, in particular) can reconstruct it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(IndexMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Record(IndexMap::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Returns whether this record looks like a node (has an `id` but no
    /// `subject`/`predicate`/`object` triple) or an edge (has the triple).
    /// Writers use this to route a record to the right output file.
    pub fn is_edge(&self) -> bool {
        self.contains_key("subject") && self.contains_key("predicate") && self.contains_key("object")
    }

    pub fn is_node(&self) -> bool {
        !self.is_edge() && self.contains_key("id")
    }
}

impl Deref for Record {
    type Target = IndexMap<String, Value>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Record {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Record(IndexMap::from_iter(iter))
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A validated view over a [`Record`] known to carry a required `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Node(Record);

impl Node {
    /// Wraps `record` as a Node, failing if it has no `id`.
    pub fn from_record(record: Record) -> crate::Result<Self> {
        if !record.contains_key("id") {
            return Err(crate::Error::contract("node record is missing required field 'id'"));
        }
        Ok(Node(record))
    }

    pub fn id(&self) -> &str {
        self.0
            .get("id")
            .and_then(Value::as_str)
            .expect("Node invariant: id present and string")
    }

    pub fn into_record(self) -> Record {
        self.0
    }

    pub fn record(&self) -> &Record {
        &self.0
    }
}

/// A validated view over a [`Record`] known to carry `subject`, `predicate`,
/// and `object`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge(Record);

impl Edge {
    pub fn from_record(record: Record) -> crate::Result<Self> {
        for field in ["subject", "predicate", "object"] {
            if !record.contains_key(field) {
                return Err(crate::Error::contract(format!(
                    "edge record is missing required field '{field}'"
                )));
            }
        }
        Ok(Edge(record))
    }

    pub fn subject(&self) -> &str {
        self.field_str("subject")
    }

    pub fn predicate(&self) -> &str {
        self.field_str("predicate")
    }

    pub fn object(&self) -> &str {
        self.field_str("object")
    }

    fn field_str(&self, field: &str) -> &str {
        self.0
            .get(field)
            .and_then(Value::as_str)
            .expect("Edge invariant: required fields present and string")
    }

    pub fn into_record(self) -> Record {
        self.0
    }

    pub fn record(&self) -> &Record {
        &self.0
    }
}

/// A single SSSOM mapping row: `subject_id` is the canonical identifier that
/// `object_id` should be rewritten to during normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    pub subject_id: String,
    pub predicate_id: String,
    pub object_id: String,
    pub mapping_justification: String,
}

impl Mapping {
    /// Builds a Mapping from a generic Record, failing with a `CONFIG` error
    /// if any of the four essential SSSOM columns are absent.
    pub fn from_record(record: &Record) -> crate::Result<Self> {
        let field = |name: &str| -> crate::Result<String> {
            record
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| crate::Error::config(format!("SSSOM row missing column '{name}'")))
        };
        Ok(Mapping {
            subject_id: field("subject_id")?,
            predicate_id: field("predicate_id")?,
            object_id: field("object_id")?,
            mapping_justification: field("mapping_justification")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_node_and_edge_records() {
        let mut node = Record::new();
        node.insert("id", "HGNC:123");
        assert!(node.is_node());
        assert!(!node.is_edge());

        let mut edge = Record::new();
        edge.insert("subject", "HGNC:123");
        edge.insert("predicate", "biolink:related_to");
        edge.insert("object", "HGNC:456");
        assert!(edge.is_edge());
    }

    #[test]
    fn node_from_record_requires_id() {
        let record = Record::new();
        assert!(Node::from_record(record).is_err());
    }

    #[test]
    fn mapping_requires_all_sssom_columns() {
        let mut record = Record::new();
        record.insert("subject_id", "NCBIGene:1");
        let err = Mapping::from_record(&record).unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::Config);
    }
}
