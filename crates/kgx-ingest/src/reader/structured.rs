use super::jsonl::json_object_to_record;
use super::RecordReader;
use kgx_config::{JsonPathSegment, PathedReaderConfig};
use kgx_model::{Error, Record, Result};
use std::io::Read;

/// Backing document format for [`StructuredReader`]: the two differ only in
/// how the initial byte stream is parsed into a `serde_json::Value` tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

/// Reads a whole JSON or YAML document, navigates to `json_path`, and
/// yields the resulting list of objects (a lone object is promoted to a
/// one-element list) as records. Unlike the line-oriented readers, the
/// whole document is materialized up front; laziness only applies to the
/// record stream produced from the already-navigated list.
pub struct StructuredReader {
    rows: std::vec::IntoIter<serde_json::Value>,
    required_properties: Vec<String>,
    row_limit: u64,
    last_row: u64,
}

impl StructuredReader {
    pub fn new(mut stream: Box<dyn Read>, config: &PathedReaderConfig, format: DocumentFormat) -> Result<StructuredReader> {
        let mut text = String::new();
        stream.read_to_string(&mut text)?;

        let document: serde_json::Value = match format {
            DocumentFormat::Json => serde_json::from_str(&text)
                .map_err(|e| Error::parse(format!("invalid JSON document: {e}")))?,
            DocumentFormat::Yaml => {
                let yaml_value: serde_yaml::Value = serde_yaml::from_str(&text)
                    .map_err(|e| Error::parse(format!("invalid YAML document: {e}")))?;
                serde_json::to_value(yaml_value)
                    .map_err(|e| Error::parse(format!("failed to normalize YAML document: {e}")))?
            }
        };

        let navigated = navigate(&document, &config.json_path)?;
        let rows = promote_to_list(navigated)?;

        Ok(StructuredReader {
            rows: rows.into_iter(),
            required_properties: config.required_properties.clone(),
            row_limit: config.row_limit,
            last_row: 0,
        })
    }

    fn parse_value(&self, value: serde_json::Value) -> Result<Record> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::parse("navigated value is not an object").at_row(self.last_row))?;
        for required in &self.required_properties {
            if !object.contains_key(required) {
                return Err(Error::parse(format!("missing required property '{required}'")).at_row(self.last_row));
            }
        }
        Ok(json_object_to_record(object))
    }
}

fn navigate(document: &serde_json::Value, path: &[JsonPathSegment]) -> Result<serde_json::Value> {
    let mut current = document;
    for segment in path {
        current = match segment {
            JsonPathSegment::Key(key) => current
                .get(key)
                .ok_or_else(|| Error::parse(format!("json_path key '{key}' not found")))?,
            JsonPathSegment::Index(idx) => current
                .get(idx)
                .ok_or_else(|| Error::parse(format!("json_path index {idx} out of bounds")))?,
        };
    }
    Ok(current.clone())
}

fn promote_to_list(value: serde_json::Value) -> Result<Vec<serde_json::Value>> {
    match value {
        serde_json::Value::Array(items) => Ok(items),
        serde_json::Value::Object(_) => Ok(vec![value]),
        other => Err(Error::parse(format!(
            "navigated value must be a list of objects or a single object, got {other}"
        ))),
    }
}

impl Iterator for StructuredReader {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.row_limit != 0 && self.last_row >= self.row_limit {
            return None;
        }
        let value = self.rows.next()?;
        self.last_row += 1;
        Some(self.parse_value(value))
    }
}

impl RecordReader for StructuredReader {
    fn last_row(&self) -> u64 {
        self.last_row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn config(yaml: &str) -> PathedReaderConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn navigates_json_path_to_a_list() {
        let cfg = config(
            r#"
format: json
files: []
json_path: ["data", "items"]
"#,
        );
        let stream: Box<dyn Read> = Box::new(Cursor::new(r#"{"data":{"items":[{"id":"A"},{"id":"B"}]}}"#));
        let records: Vec<_> = StructuredReader::new(stream, &cfg, DocumentFormat::Json)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("id").unwrap().as_str(), Some("B"));
    }

    #[test]
    fn promotes_single_object_to_one_element_list() {
        let cfg = config("format: json\nfiles: []\n");
        let stream: Box<dyn Read> = Box::new(Cursor::new(r#"{"id":"A"}"#));
        let records: Vec<_> = StructuredReader::new(stream, &cfg, DocumentFormat::Json)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn yaml_document_navigates_the_same_way() {
        let cfg = config("format: yaml\nfiles: []\njson_path: [\"items\"]\n");
        let stream: Box<dyn Read> = Box::new(Cursor::new("items:\n  - id: A\n  - id: B\n"));
        let records: Vec<_> = StructuredReader::new(stream, &cfg, DocumentFormat::Yaml)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn missing_required_property_fails_with_parse_error() {
        let cfg = config("format: json\nfiles: []\nrequired_properties: [id]\n");
        let stream: Box<dyn Read> = Box::new(Cursor::new(r#"[{"name":"no id here"}]"#));
        let err = StructuredReader::new(stream, &cfg, DocumentFormat::Json)
            .unwrap()
            .next()
            .unwrap()
            .unwrap_err();
        assert_eq!(err.kind, kgx_model::ErrorKind::Parse);
    }
}
