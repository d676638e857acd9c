use super::RecordReader;
use kgx_config::{ColumnType, DelimitedReaderConfig, HeaderDirective};
use kgx_model::{Error, Record, Result, Value};
use std::io::Read;

/// Reads CSV/TSV-shaped text into records, honoring header modes, comment
/// lines, declared column types, and row-length mismatches the way a
/// tolerant tabular ingester has to.
pub struct DelimitedReader {
    inner: csv::Reader<Box<dyn Read>>,
    columns: Vec<(String, ColumnType)>,
    skip_blank_lines: bool,
    row_limit: u64,
    last_row: u64,
}

impl DelimitedReader {
    pub fn new(stream: Box<dyn Read>, config: &DelimitedReaderConfig) -> Result<DelimitedReader> {
        let delimiter = config
            .delimiter
            .as_bytes()
            .first()
            .copied()
            .ok_or_else(|| Error::config("delimited reader delimiter must be a single byte"))?;

        let comment = config.comment_char.as_ref().and_then(|c| c.as_bytes().first().copied());

        let mut builder = csv::ReaderBuilder::new();
        builder.delimiter(delimiter).flexible(true).has_headers(false);
        if let Some(c) = comment {
            builder.comment(Some(c));
        }

        let mut inner = builder.from_reader(stream);

        let header_mode = config.header.clone().unwrap_or(HeaderDirective::Infer);

        let header_names: Vec<String> = match &header_mode {
            HeaderDirective::None => {
                if config.columns.is_empty() {
                    return Err(Error::config(
                        "header: none requires declared `columns` to supply the header row",
                    ));
                }
                config.columns.keys().cloned().collect()
            }
            HeaderDirective::Skip(n) => {
                let mut record = csv::StringRecord::new();
                for _ in 0..*n {
                    inner
                        .read_record(&mut record)
                        .map_err(|e| Error::parse(format!("failed to skip header line: {e}")))?;
                }
                read_header_row(&mut inner, config.header_prefix.as_deref())?
            }
            HeaderDirective::Infer => read_header_row(&mut inner, config.header_prefix.as_deref())?,
        };

        for configured in config.columns.keys() {
            if !header_names.iter().any(|h| h == configured) {
                return Err(Error::parse(format!(
                    "configured column '{configured}' is absent from the header"
                )));
            }
        }
        for header_col in &header_names {
            if !config.columns.contains_key(header_col) {
                tracing::debug!(column = %header_col, "header column not declared in config, defaulting to string");
            }
        }

        let columns = header_names
            .into_iter()
            .map(|name| {
                let ty = config.columns.get(&name).copied().unwrap_or(ColumnType::String);
                (name, ty)
            })
            .collect();

        Ok(DelimitedReader {
            inner,
            columns,
            skip_blank_lines: config.skip_blank_lines,
            row_limit: config.row_limit,
            last_row: 0,
        })
    }

    fn parse_row(&self, raw: &csv::StringRecord) -> Result<Record> {
        if raw.len() < self.columns.len() {
            return Err(Error::parse(format!(
                "row has {} fields but {} columns are declared",
                raw.len(),
                self.columns.len()
            ))
            .at_row(self.last_row));
        }
        if raw.len() > self.columns.len() {
            tracing::warn!(
                row = self.last_row,
                extra = raw.len() - self.columns.len(),
                "row has more fields than declared columns; discarding extras"
            );
        }

        let mut record = Record::new();
        for (i, (name, ty)) in self.columns.iter().enumerate() {
            let raw_value = raw.get(i).unwrap_or("");
            let value = coerce(raw_value, *ty).map_err(|e| e.at_row(self.last_row))?;
            record.insert(name.clone(), value);
        }
        Ok(record)
    }

    fn is_blank(raw: &csv::StringRecord) -> bool {
        raw.len() <= 1 && raw.iter().all(|f| f.is_empty())
    }
}

fn read_header_row(inner: &mut csv::Reader<Box<dyn Read>>, header_prefix: Option<&str>) -> Result<Vec<String>> {
    let mut record = csv::StringRecord::new();
    let found = inner
        .read_record(&mut record)
        .map_err(|e| Error::parse(format!("failed to read header row: {e}")))?;
    if !found {
        return Err(Error::parse("no header row found in empty input"));
    }
    let mut names: Vec<String> = record.iter().map(str::to_string).collect();
    if let (Some(prefix), Some(first)) = (header_prefix, names.first_mut()) {
        if let Some(stripped) = first.strip_prefix(prefix) {
            *first = stripped.to_string();
        }
    }
    Ok(names)
}

fn coerce(raw: &str, ty: ColumnType) -> Result<Value> {
    match ty {
        ColumnType::String => Ok(Value::String(raw.to_string())),
        ColumnType::Int => raw
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| Error::parse(format!("'{raw}' is not a valid int"))),
        ColumnType::Float => raw
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| Error::parse(format!("'{raw}' is not a valid float"))),
        ColumnType::Bool => match raw {
            "true" | "false" => Ok(Value::String(raw.to_string())),
            _ => Err(Error::parse(format!("'{raw}' is not a valid bool"))),
        },
        ColumnType::List => Ok(Value::List(
            raw.split(kgx_model::MULTIVALUED_DELIMITER).map(str::to_string).collect(),
        )),
    }
}

impl Iterator for DelimitedReader {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.row_limit != 0 && self.last_row >= self.row_limit {
            return None;
        }

        let mut raw = csv::StringRecord::new();
        loop {
            match self.inner.read_record(&mut raw) {
                Ok(false) => return None,
                Ok(true) => {
                    if DelimitedReader::is_blank(&raw) {
                        if self.skip_blank_lines {
                            continue;
                        }
                        self.last_row += 1;
                        let mut record = Record::new();
                        for (name, _) in &self.columns {
                            record.insert(name.clone(), Value::Null);
                        }
                        return Some(Ok(record));
                    }
                    self.last_row += 1;
                    return Some(self.parse_row(&raw));
                }
                Err(e) => return Some(Err(Error::parse(format!("malformed row: {e}")).at_row(self.last_row))),
            }
        }
    }
}

impl RecordReader for DelimitedReader {
    fn last_row(&self) -> u64 {
        self.last_row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn config(yaml: &str) -> DelimitedReaderConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn infers_header_and_coerces_types() {
        let cfg = config(
            r#"
format: tsv
files: []
columns:
  id: string
  weight: float
"#,
        );
        let stream: Box<dyn Read> = Box::new(Cursor::new("id\tweight\nHGNC:1\t1.5\n"));
        let mut reader = DelimitedReader::new(stream, &cfg).unwrap();
        let record = reader.next().unwrap().unwrap();
        assert_eq!(record.get("id").unwrap().as_str(), Some("HGNC:1"));
        assert_eq!(record.get("weight").unwrap().flatten("|"), "1.5");
    }

    #[test]
    fn short_row_fails_with_parse_error() {
        let cfg = config(
            r#"
format: tsv
files: []
columns:
  id: string
  category: string
"#,
        );
        let stream: Box<dyn Read> = Box::new(Cursor::new("id\tcategory\nHGNC:1\n"));
        let mut reader = DelimitedReader::new(stream, &cfg).unwrap();
        let err = reader.next().unwrap().unwrap_err();
        assert_eq!(err.kind, kgx_model::ErrorKind::Parse);
    }

    #[test]
    fn header_none_uses_declared_columns_as_header() {
        let cfg = config(
            r#"
format: tsv
files: []
header: none
columns:
  id: string
  category: string
"#,
        );
        let stream: Box<dyn Read> = Box::new(Cursor::new("HGNC:1\tbiolink:Gene\n"));
        let mut reader = DelimitedReader::new(stream, &cfg).unwrap();
        let record = reader.next().unwrap().unwrap();
        assert_eq!(record.get("id").unwrap().as_str(), Some("HGNC:1"));
    }

    #[test]
    fn missing_configured_column_in_header_is_an_error() {
        let cfg = config(
            r#"
format: tsv
files: []
columns:
  id: string
  missing_col: string
"#,
        );
        let stream: Box<dyn Read> = Box::new(Cursor::new("id\tcategory\nHGNC:1\tbiolink:Gene\n"));
        let err = DelimitedReader::new(stream, &cfg).unwrap_err();
        assert_eq!(err.kind, kgx_model::ErrorKind::Parse);
    }
}
