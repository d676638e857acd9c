//! The canonical KGX TSV writer: lazily-opened `<source>_nodes.tsv` /
//! `<source>_edges.tsv` files with a fixed leading column order, pipe-
//! flattened list values, and an optional strict contract check.

use crate::sssom::SssomRewriter;
use crate::Writer;
use kgx_model::{Error, Record, Result, NODE_COLUMN_PREFIX, EDGE_COLUMN_PREFIX};
use std::fs::File;
use std::path::{Path, PathBuf};

struct TableSink {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
    columns: Vec<String>,
}

impl TableSink {
    fn new(path: PathBuf) -> TableSink {
        TableSink { path, writer: None, columns: Vec::new() }
    }

    fn ensure_open(&mut self, columns: Vec<String>) -> Result<()> {
        if self.writer.is_some() {
            return Ok(());
        }
        let file = File::create(&self.path)
            .map_err(|e| Error::io(format!("failed to create {}: {e}", self.path.display())).with_source(e))?;
        let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(file);
        writer
            .write_record(&columns)
            .map_err(|e| Error::io(format!("failed to write header to {}: {e}", self.path.display())))?;
        self.columns = columns;
        self.writer = Some(writer);
        Ok(())
    }

    fn write_row(&mut self, record: &Record) -> Result<()> {
        let row: Vec<String> = self.columns.iter().map(|c| record.get(c).map(|v| v.flatten("|")).unwrap_or_default()).collect();
        self.writer
            .as_mut()
            .expect("ensure_open called before write_row")
            .write_record(&row)
            .map_err(|e| Error::io(format!("failed to write row to {}: {e}", self.path.display())))
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(w) = self.writer.as_mut() {
            w.flush().map_err(|e| Error::io(format!("failed to flush {}: {e}", self.path.display())))?;
        }
        Ok(())
    }
}

/// Computes the canonical column order: leading prefix columns (in the
/// order [`NODE_COLUMN_PREFIX`]/[`EDGE_COLUMN_PREFIX`] declare, restricted
/// to those actually in use), then the remaining non-internal columns
/// alphabetically, then `_`-prefixed internal columns alphabetically.
fn canonical_order(prefix: &[&str], known: &[String]) -> Vec<String> {
    let mut ordered: Vec<String> = prefix
        .iter()
        .filter(|p| known.iter().any(|k| k == *p))
        .map(|s| s.to_string())
        .collect();

    let mut rest: Vec<String> = known.iter().filter(|k| !prefix.contains(&k.as_str())).cloned().collect();
    let internal: Vec<String> = rest.iter().filter(|c| c.starts_with('_')).cloned().collect();
    rest.retain(|c| !c.starts_with('_'));
    rest.sort();
    let mut internal_sorted = internal;
    internal_sorted.sort();

    ordered.extend(rest);
    ordered.extend(internal_sorted);
    ordered
}

pub struct TsvWriter {
    node_sink: TableSink,
    edge_sink: TableSink,
    node_properties: Vec<String>,
    edge_properties: Vec<String>,
    strict: bool,
    sssom: Option<SssomRewriter>,
}

impl TsvWriter {
    pub fn open(
        output_dir: &Path,
        source_name: &str,
        node_properties: Vec<String>,
        edge_properties: Vec<String>,
        strict: bool,
        sssom: Option<SssomRewriter>,
    ) -> TsvWriter {
        TsvWriter {
            node_sink: TableSink::new(output_dir.join(format!("{source_name}_nodes.tsv"))),
            edge_sink: TableSink::new(output_dir.join(format!("{source_name}_edges.tsv"))),
            node_properties,
            edge_properties,
            strict,
            sssom,
        }
    }

    fn check_strict(&self, record: &Record, declared: &[String], prefix: &[&str]) -> Result<()> {
        if !self.strict || declared.is_empty() {
            return Ok(());
        }
        for key in record.keys() {
            if !declared.iter().any(|d| d == key) && !prefix.contains(&key.as_str()) {
                return Err(Error::contract(format!(
                    "record carries field '{key}' outside the declared column set"
                )));
            }
        }
        Ok(())
    }
}

impl Writer for TsvWriter {
    fn write_record(&mut self, mut record: Record) -> Result<()> {
        if record.is_edge() {
            if let Some(sssom) = &self.sssom {
                sssom.apply(&mut record);
            }
            self.check_strict(&record, &self.edge_properties, EDGE_COLUMN_PREFIX)?;
            let known: Vec<String> = if self.edge_properties.is_empty() {
                record.keys().cloned().collect()
            } else {
                self.edge_properties.clone()
            };
            self.edge_sink.ensure_open(canonical_order(EDGE_COLUMN_PREFIX, &known))?;
            self.edge_sink.write_row(&record)
        } else if record.is_node() {
            self.check_strict(&record, &self.node_properties, NODE_COLUMN_PREFIX)?;
            let known: Vec<String> = if self.node_properties.is_empty() {
                record.keys().cloned().collect()
            } else {
                self.node_properties.clone()
            };
            self.node_sink.ensure_open(canonical_order(NODE_COLUMN_PREFIX, &known))?;
            self.node_sink.write_row(&record)
        } else {
            Err(Error::contract("record is neither a node (has 'id') nor an edge (has subject/predicate/object)"))
        }
    }

    fn finalize(&mut self) -> Result<()> {
        self.node_sink.flush()?;
        self.edge_sink.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgx_model::Value;

    #[test]
    fn writes_node_and_edge_files_with_canonical_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = TsvWriter::open(dir.path(), "test", vec![], vec![], false, None);

        let mut node = Record::new();
        node.insert("name", "Gene A");
        node.insert("id", "ENSEMBL:A");
        node.insert("category", Value::List(vec!["biolink:Gene".into()]));
        writer.write_record(node).unwrap();

        let mut edge = Record::new();
        edge.insert("object", "ENSEMBL:B");
        edge.insert("subject", "ENSEMBL:A");
        edge.insert("predicate", "biolink:interacts_with");
        writer.write_record(edge).unwrap();
        writer.finalize().unwrap();

        let nodes_text = std::fs::read_to_string(dir.path().join("test_nodes.tsv")).unwrap();
        let header = nodes_text.lines().next().unwrap();
        assert_eq!(header, "id\tcategory\tname");

        let edges_text = std::fs::read_to_string(dir.path().join("test_edges.tsv")).unwrap();
        let header = edges_text.lines().next().unwrap();
        assert_eq!(header, "subject\tpredicate\tobject");
    }

    #[test]
    fn strict_mode_rejects_undeclared_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = TsvWriter::open(dir.path(), "test", vec!["id".into(), "category".into()], vec![], true, None);
        let mut node = Record::new();
        node.insert("id", "ENSEMBL:A");
        node.insert("category", "biolink:Gene");
        node.insert("mystery_field", "oops");
        let err = writer.write_record(node).unwrap_err();
        assert_eq!(err.kind, kgx_model::ErrorKind::Contract);
    }

    #[test]
    fn flattens_list_values_with_pipe() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = TsvWriter::open(dir.path(), "test", vec![], vec![], false, None);
        let mut node = Record::new();
        node.insert("id", "ENSEMBL:A");
        node.insert("category", Value::List(vec!["biolink:Gene".into(), "biolink:NamedThing".into()]));
        writer.write_record(node).unwrap();
        writer.finalize().unwrap();

        let text = std::fs::read_to_string(dir.path().join("test_nodes.tsv")).unwrap();
        let row = text.lines().nth(1).unwrap();
        assert!(row.contains("biolink:Gene|biolink:NamedThing"));
    }
}
