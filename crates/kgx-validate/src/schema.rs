//! A Biolink-like schema: just enough of LinkML's class/slot model to drive
//! constraint extraction, loaded from a plain YAML document rather than
//! requiring a full LinkML runtime.

use indexmap::IndexMap;
use kgx_model::{Error, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotDefinition {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub recommended: bool,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub identifier: bool,
    #[serde(default)]
    pub multivalued: bool,
    #[serde(default)]
    pub minimum_cardinality: Option<u64>,
    #[serde(default)]
    pub maximum_cardinality: Option<u64>,
    #[serde(default)]
    pub exact_cardinality: Option<u64>,
    #[serde(default)]
    pub subproperty_of: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassDefinition {
    /// Which table this class's instances live in (`nodes` or `edges`).
    pub table: String,
    #[serde(default)]
    pub slots: Vec<String>,
    #[serde(default)]
    pub id_prefixes: Vec<String>,
    #[serde(default)]
    pub id_prefixes_are_closed: bool,
    #[serde(default)]
    pub unique_keys: IndexMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnumDefinition {
    pub permissible_values: Vec<String>,
}

/// The schema document: classes, the slots they induce, and the permissible
/// value sets for the Biolink-specific `category`/`predicate` enums.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Schema {
    pub classes: IndexMap<String, ClassDefinition>,
    #[serde(default)]
    pub slots: IndexMap<String, SlotDefinition>,
    #[serde(default)]
    pub enums: IndexMap<String, EnumDefinition>,
}

impl Schema {
    pub fn from_yaml_str(yaml: &str) -> Result<Schema> {
        serde_yaml::from_str(yaml).map_err(|e| Error::config(format!("invalid schema YAML: {e}")))
    }

    pub fn load(path: &Path) -> Result<Schema> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::io(format!("failed to read schema {}: {e}", path.display())))?;
        Schema::from_yaml_str(&contents)
    }

    pub fn class(&self, name: &str) -> Option<&ClassDefinition> {
        self.classes.get(name)
    }

    pub fn slot(&self, name: &str) -> Option<&SlotDefinition> {
        self.slots.get(name)
    }

    pub fn valid_categories(&self) -> Vec<String> {
        self.enums.get("category").map(|e| e.permissible_values.clone()).unwrap_or_default()
    }

    pub fn valid_predicates(&self) -> Vec<String> {
        self.enums.get("predicate").map(|e| e.permissible_values.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
classes:
  "named thing":
    table: nodes
    slots: [id, category, name]
    id_prefixes: [HGNC, NCBIGene]
    id_prefixes_are_closed: true
  association:
    table: edges
    slots: [subject, predicate, object]
    unique_keys:
      edge_key: [subject, predicate, object]
slots:
  id:
    identifier: true
    required: true
  category:
    multivalued: true
    recommended: true
  subject:
    required: true
enums:
  category:
    permissible_values: ["biolink:Gene", "biolink:Disease"]
"#;

    #[test]
    fn parses_classes_slots_and_enums() {
        let schema = Schema::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(schema.class("named thing").unwrap().table, "nodes");
        assert!(schema.slot("id").unwrap().identifier);
        assert_eq!(schema.valid_categories(), vec!["biolink:Gene".to_string(), "biolink:Disease".to_string()]);
        assert_eq!(schema.class("association").unwrap().unique_keys.get("edge_key").unwrap(), &vec!["subject", "predicate", "object"]);
    }
}
