use super::RecordReader;
use kgx_config::RecordReaderConfig;
use kgx_model::{Error, Record, Result, Value};
use std::io::{BufRead, BufReader, Read};

/// Reads newline-delimited JSON objects into records.
pub struct JsonlReader {
    lines: std::io::Lines<BufReader<Box<dyn Read>>>,
    required_properties: Vec<String>,
    row_limit: u64,
    last_row: u64,
}

impl JsonlReader {
    pub fn new(stream: Box<dyn Read>, config: &RecordReaderConfig) -> JsonlReader {
        JsonlReader {
            lines: BufReader::new(stream).lines(),
            required_properties: config.required_properties.clone(),
            row_limit: config.row_limit,
            last_row: 0,
        }
    }

    fn parse_line(&self, line: &str) -> Result<Record> {
        let value: serde_json::Value = serde_json::from_str(line)
            .map_err(|e| Error::parse(format!("invalid JSON line: {e}")).at_row(self.last_row))?;
        let object = value
            .as_object()
            .ok_or_else(|| Error::parse("JSONL line did not parse to an object").at_row(self.last_row))?;

        for required in &self.required_properties {
            if !object.contains_key(required) {
                return Err(Error::parse(format!("missing required property '{required}'")).at_row(self.last_row));
            }
        }

        Ok(json_object_to_record(object))
    }
}

pub(super) fn json_object_to_record(object: &serde_json::Map<String, serde_json::Value>) -> Record {
    let mut record = Record::new();
    for (key, value) in object {
        record.insert(key.clone(), json_value_to_value(value));
    }
    record
}

fn json_value_to_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::String(b.to_string()),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::List(
            items
                .iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        ),
        serde_json::Value::Object(_) => Value::String(value.to_string()),
    }
}

impl Iterator for JsonlReader {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.row_limit != 0 && self.last_row >= self.row_limit {
            return None;
        }
        loop {
            let line = self.lines.next()?;
            let line = match line {
                Ok(l) => l,
                Err(e) => return Some(Err(Error::io(format!("failed to read line: {e}")))),
            };
            if line.trim().is_empty() {
                continue;
            }
            self.last_row += 1;
            return Some(self.parse_line(&line));
        }
    }
}

impl RecordReader for JsonlReader {
    fn last_row(&self) -> u64 {
        self.last_row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_jsonl_lines_skipping_blanks() {
        let config = RecordReaderConfig {
            files: vec![],
            file_archive: None,
            base_dir: None,
            required_properties: vec![],
            row_limit: 0,
            filters: vec![],
        };
        let stream: Box<dyn Read> = Box::new(Cursor::new("{\"id\":\"HGNC:1\"}\n\n{\"id\":\"HGNC:2\"}\n"));
        let records: Vec<_> = JsonlReader::new(stream, &config).collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn missing_required_property_fails_with_parse_error() {
        let config = RecordReaderConfig {
            files: vec![],
            file_archive: None,
            base_dir: None,
            required_properties: vec!["id".to_string()],
            row_limit: 0,
            filters: vec![],
        };
        let stream: Box<dyn Read> = Box::new(Cursor::new("{\"category\":\"biolink:Gene\"}\n"));
        let mut reader = JsonlReader::new(stream, &config);
        let err = reader.next().unwrap().unwrap_err();
        assert_eq!(err.kind, kgx_model::ErrorKind::Parse);
    }
}
