use crate::sssom::SssomRewriter;
use crate::Writer;
use kgx_model::{Error, Record, Result, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

struct LazyFile {
    path: PathBuf,
    file: Option<BufWriter<File>>,
}

impl LazyFile {
    fn new(path: PathBuf) -> LazyFile {
        LazyFile { path, file: None }
    }

    fn ensure_open(&mut self) -> Result<&mut BufWriter<File>> {
        if self.file.is_none() {
            let file = File::create(&self.path)
                .map_err(|e| Error::io(format!("failed to create {}: {e}", self.path.display())).with_source(e))?;
            self.file = Some(BufWriter::new(file));
        }
        Ok(self.file.as_mut().unwrap())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(f) = self.file.as_mut() {
            f.flush().map_err(|e| Error::io(format!("failed to flush {}: {e}", self.path.display())))?;
        }
        Ok(())
    }
}

/// One JSON object per line; node and edge streams go to separate files,
/// both created lazily on first write.
pub struct JsonlWriter {
    node_file: LazyFile,
    edge_file: LazyFile,
    sssom: Option<SssomRewriter>,
}

impl JsonlWriter {
    pub fn open(output_dir: &Path, source_name: &str, sssom: Option<SssomRewriter>) -> JsonlWriter {
        JsonlWriter {
            node_file: LazyFile::new(output_dir.join(format!("{source_name}_nodes.jsonl"))),
            edge_file: LazyFile::new(output_dir.join(format!("{source_name}_edges.jsonl"))),
            sssom,
        }
    }
}

fn record_to_json(record: &Record) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (key, value) in record.iter() {
        let json = match value {
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null),
            Value::List(items) => serde_json::Value::Array(items.iter().cloned().map(serde_json::Value::String).collect()),
            Value::Null => serde_json::Value::Null,
        };
        map.insert(key.clone(), json);
    }
    serde_json::Value::Object(map)
}

impl Writer for JsonlWriter {
    fn write_record(&mut self, mut record: Record) -> Result<()> {
        let target = if record.is_edge() {
            if let Some(sssom) = &self.sssom {
                sssom.apply(&mut record);
            }
            self.edge_file.ensure_open()?
        } else if record.is_node() {
            self.node_file.ensure_open()?
        } else {
            return Err(Error::contract("record is neither a node nor an edge"));
        };

        let json = record_to_json(&record);
        let line = serde_json::to_string(&json)?;
        writeln!(target, "{line}").map_err(|e| Error::io(format!("failed to write JSONL line: {e}")))
    }

    fn finalize(&mut self) -> Result<()> {
        self.node_file.flush()?;
        self.edge_file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = JsonlWriter::open(dir.path(), "test", None);
        let mut node = Record::new();
        node.insert("id", "A");
        writer.write_record(node).unwrap();
        writer.finalize().unwrap();

        let text = std::fs::read_to_string(dir.path().join("test_nodes.jsonl")).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("\"id\":\"A\""));
    }
}
