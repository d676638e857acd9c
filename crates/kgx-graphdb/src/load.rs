//! Loading one KGX file into a temp table and, once every file for a run
//! has landed, unifying them into the final `nodes`/`edges` tables.

use crate::GraphDb;
use kgx_model::{is_multivalued_column, Error, Result};
use std::path::PathBuf;

/// Which table a file's rows belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Nodes,
    Edges,
}

impl FileKind {
    fn table_name(self) -> &'static str {
        match self {
            FileKind::Nodes => "nodes",
            FileKind::Edges => "edges",
        }
    }
}

/// The format a file on disk is encoded in, for purposes of generating the
/// engine's read expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Tsv,
    Jsonl,
    Parquet,
}

/// One file to load, with enough information to pick a read expression and
/// tag the rows it contributes.
#[derive(Debug, Clone)]
pub struct FileSpec {
    pub path: PathBuf,
    pub kind: FileKind,
    pub format: FileFormat,
    pub source_name: String,
    pub generate_provided_by: bool,
}

impl FileSpec {
    fn read_expression(&self, full_scan: bool) -> String {
        let path = self.path.display().to_string().replace('\'', "''");
        match self.format {
            FileFormat::Tsv => format!("read_csv('{path}', delim='\t', header=true, all_varchar=true)"),
            FileFormat::Jsonl => {
                if full_scan {
                    format!("read_json('{path}', format='newline_delimited', sample_size=-1)")
                } else {
                    format!("read_json('{path}', format='newline_delimited')")
                }
            }
            FileFormat::Parquet => format!("read_parquet('{path}')"),
        }
    }

    fn safe_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().replace(['-', '.'], "_"))
            .unwrap_or_else(|| "file".to_string())
    }
}

/// The outcome of loading one file into a temp table.
pub struct FileLoadResult {
    pub file_spec: FileSpec,
    pub records_loaded: u64,
    pub temp_table_name: Option<String>,
    pub error: Option<String>,
}

impl GraphDb {
    /// Loads one file into a uniquely-named temp table, recording its
    /// per-column schema for the run's schema report. JSONL files whose
    /// schema inference fails with "unknown key" are retried with a full
    /// scan (`sample_size=-1`) before giving up.
    pub fn load_file(&self, file_spec: FileSpec, unique: u64) -> FileLoadResult {
        match self.try_load_file(&file_spec, unique) {
            Ok((temp_table_name, records_loaded)) => FileLoadResult {
                file_spec,
                records_loaded,
                temp_table_name: Some(temp_table_name),
                error: None,
            },
            Err(e) => {
                tracing::error!(path = %file_spec.path.display(), "failed to load file: {e}");
                FileLoadResult { file_spec, records_loaded: 0, temp_table_name: None, error: Some(e.to_string()) }
            }
        }
    }

    fn try_load_file(&self, file_spec: &FileSpec, unique: u64) -> Result<(String, u64)> {
        if !file_spec.path.exists() {
            return Err(Error::io(format!("file not found: {}", file_spec.path.display())));
        }

        let temp_table_name = format!(
            "temp_{}_{}_{}",
            match file_spec.kind {
                FileKind::Nodes => "nodes",
                FileKind::Edges => "edges",
            },
            file_spec.safe_name(),
            unique,
        );

        let escaped_source = file_spec.source_name.replace('\'', "''");
        let mut extra_columns = vec![format!("'{escaped_source}' as file_source")];
        let select_star = if file_spec.generate_provided_by {
            extra_columns.push(format!("'{escaped_source}' as provided_by"));
            // COLUMNS() with a lambda, rather than `* EXCLUDE (provided_by)`, since
            // EXCLUDE errors when the named column isn't present and a source file
            // may or may not already carry one.
            "COLUMNS(c -> c != 'provided_by')"
        } else {
            "*"
        };
        let extra = format!(", {}", extra_columns.join(", "));

        let create = |full_scan: bool| -> String {
            format!(
                "CREATE TEMP TABLE {temp_table_name} AS SELECT {select_star}{extra} FROM {}",
                file_spec.read_expression(full_scan)
            )
        };

        let sql = create(false);
        if let Err(e) = self.conn.execute_batch(&sql) {
            let message = e.to_string();
            let retryable =
                file_spec.format == FileFormat::Jsonl && message.contains("unknown key") && message.contains("JSON transform error");
            if retryable {
                tracing::warn!(path = %file_spec.path.display(), "schema inference failed, retrying with full scan");
                self.conn
                    .execute_batch(&create(true))
                    .map_err(|e| Error::io(format!("failed to load {}: {e}", file_spec.path.display())))?;
            } else {
                return Err(Error::io(format!("failed to load {}: {e}", file_spec.path.display())));
            }
        }

        let records_loaded: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {temp_table_name}"), [], |row| row.get(0))
            .map_err(|e| Error::io(format!("failed to count rows in {temp_table_name}: {e}")))?;

        self.record_schema(file_spec, &temp_table_name)?;

        Ok((temp_table_name, records_loaded as u64))
    }

    fn record_schema(&self, file_spec: &FileSpec, temp_table_name: &str) -> Result<()> {
        let table_type = match file_spec.kind {
            FileKind::Nodes => "nodes",
            FileKind::Edges => "edges",
        };
        for (column_name, data_type) in self.describe(temp_table_name) {
            if column_name == "file_source" {
                continue;
            }
            self.conn
                .execute(
                    "INSERT INTO file_schemas (filename, table_type, column_name, data_type, file_source) VALUES (?, ?, ?, ?, ?)",
                    duckdb::params![file_spec.path.display().to_string(), table_type, column_name, data_type, file_spec.source_name],
                )
                .map_err(|e| Error::io(format!("failed to record schema for {}: {e}", file_spec.path.display())))?;
        }
        Ok(())
    }

    /// Unifies every successfully-loaded temp table into the final
    /// `nodes`/`edges` tables via `UNION ALL BY NAME`, splitting the
    /// Biolink-derived multivalued columns into arrays as they land.
    pub fn create_final_tables(&self, results: &[FileLoadResult]) -> Result<()> {
        self.unify(FileKind::Nodes, results)?;
        self.unify(FileKind::Edges, results)?;
        Ok(())
    }

    fn unify(&self, kind: FileKind, results: &[FileLoadResult]) -> Result<()> {
        let temp_tables: Vec<&str> = results
            .iter()
            .filter(|r| r.file_spec.kind == kind && r.error.is_none())
            .filter_map(|r| r.temp_table_name.as_deref())
            .collect();

        if temp_tables.is_empty() {
            return Ok(());
        }

        let selects: Vec<String> = temp_tables
            .iter()
            .map(|table| {
                let own_columns: Vec<String> = self.describe(table).into_iter().map(|(name, _)| name).collect();
                let projected: Vec<String> = own_columns
                    .iter()
                    .map(|column| {
                        if is_multivalued_column(column) {
                            format!("string_split({column}, '|') AS {column}")
                        } else {
                            column.clone()
                        }
                    })
                    .collect();
                format!("SELECT {} FROM {table}", projected.join(", "))
            })
            .collect();

        let union = selects.join(" UNION ALL BY NAME ");
        let table = kind.table_name();
        self.exec(&format!("CREATE OR REPLACE TABLE {table} AS {union}"))?;

        match kind {
            FileKind::Nodes => {
                self.exec(&format!("CREATE OR REPLACE TABLE duplicate_nodes AS SELECT * FROM {table} WHERE 1=0"))?;
                self.exec(&format!("CREATE OR REPLACE TABLE singleton_nodes AS SELECT * FROM {table} WHERE 1=0"))?;
            }
            FileKind::Edges => {
                self.exec(&format!("CREATE OR REPLACE TABLE dangling_edges AS SELECT * FROM {table} WHERE 1=0"))?;
            }
        }

        tracing::info!(table, temp_tables = temp_tables.len(), "unified temp tables into final table");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tsv(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::File::create(&path).unwrap().write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_a_tsv_file_into_a_temp_table_tagged_with_its_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tsv(&dir, "genes_nodes.tsv", "id\tname\nENSEMBL:A\tGene A\n");
        let db = GraphDb::open_in_memory().unwrap();

        let spec = FileSpec {
            path,
            kind: FileKind::Nodes,
            format: FileFormat::Tsv,
            source_name: "genes".to_string(),
            generate_provided_by: true,
        };
        let result = db.load_file(spec, 1);
        assert!(result.error.is_none());
        assert_eq!(result.records_loaded, 1);
    }

    #[test]
    fn unifies_disjoint_columns_with_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_tsv(&dir, "a_nodes.tsv", "id\tname\nA:1\tFoo\n");
        let b = write_tsv(&dir, "b_nodes.tsv", "id\tdescription\nB:1\tBar\n");
        let db = GraphDb::open_in_memory().unwrap();

        let specs = vec![
            FileSpec { path: a, kind: FileKind::Nodes, format: FileFormat::Tsv, source_name: "a".into(), generate_provided_by: false },
            FileSpec { path: b, kind: FileKind::Nodes, format: FileFormat::Tsv, source_name: "b".into(), generate_provided_by: false },
        ];
        let results: Vec<FileLoadResult> = specs.into_iter().enumerate().map(|(i, s)| db.load_file(s, i as u64)).collect();
        db.create_final_tables(&results).unwrap();

        let count: i64 = db.connection().query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0)).unwrap();
        assert_eq!(count, 2);

        let nulls: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM nodes WHERE (id = 'A:1' AND description IS NULL) OR (id = 'B:1' AND name IS NULL)", [], |row| row.get(0))
            .unwrap();
        assert_eq!(nulls, 2);
    }

    #[test]
    fn generate_provided_by_replaces_an_existing_column_instead_of_duplicating_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tsv(&dir, "a_nodes.tsv", "id\tprovided_by\nA:1\told_source\n");
        let db = GraphDb::open_in_memory().unwrap();

        let spec = FileSpec { path, kind: FileKind::Nodes, format: FileFormat::Tsv, source_name: "a".into(), generate_provided_by: true };
        let result = db.load_file(spec, 1);
        assert!(result.error.is_none(), "{:?}", result.error);

        let value: String = db
            .connection()
            .query_row(&format!("SELECT provided_by FROM {}", result.temp_table_name.unwrap()), [], |row| row.get(0))
            .unwrap();
        assert_eq!(value, "a");
    }

    #[test]
    fn missing_file_reports_an_error_without_panicking() {
        let db = GraphDb::open_in_memory().unwrap();
        let spec = FileSpec {
            path: PathBuf::from("/nonexistent/file.tsv"),
            kind: FileKind::Nodes,
            format: FileFormat::Tsv,
            source_name: "missing".into(),
            generate_provided_by: false,
        };
        let result = db.load_file(spec, 1);
        assert!(result.error.is_some());
        assert_eq!(result.records_loaded, 0);
    }
}
