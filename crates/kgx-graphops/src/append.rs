//! Adding new files to an already-joined database, widening the target
//! table's schema as new columns appear rather than requiring every file to
//! agree on one schema up front.

use kgx_graphdb::{FileLoadResult, FileSpec, GraphDb};
use kgx_model::{Error, Result};
use std::collections::BTreeMap;

pub struct AppendConfig {
    pub node_files: Vec<FileSpec>,
    pub edge_files: Vec<FileSpec>,
    pub deduplicate: bool,
}

pub struct AppendResult {
    pub files_loaded: Vec<FileLoadResult>,
    pub new_columns_added: u64,
    pub schema_changes: Vec<String>,
}

/// Loads each file into a temp table, widens the target table with any
/// columns the file introduces (always nullable), checks any column the
/// file shares with the target for a type mismatch (reported as an `IO`
/// error rather than letting the engine attempt an implicit cast), then
/// reconciles column order with `INSERT ... UNION ALL BY NAME`.
pub fn append_graphs(db: &GraphDb, config: AppendConfig) -> Result<AppendResult> {
    let mut files_loaded = Vec::new();
    let mut schema_changes = Vec::new();
    let mut new_columns_added = 0u64;
    let mut unique = 0u64;

    for file_spec in config.node_files {
        let (result, changes, added) = append_one(db, file_spec, "nodes", unique)?;
        unique += 1;
        schema_changes.extend(changes);
        new_columns_added += added;
        files_loaded.push(result);
    }
    for file_spec in config.edge_files {
        let (result, changes, added) = append_one(db, file_spec, "edges", unique)?;
        unique += 1;
        schema_changes.extend(changes);
        new_columns_added += added;
        files_loaded.push(result);
    }

    if config.deduplicate {
        crate::deduplicate::deduplicate_graph(db, crate::deduplicate::DeduplicateConfig::default())?;
    }

    Ok(AppendResult { files_loaded, new_columns_added, schema_changes })
}

fn append_one(db: &GraphDb, file_spec: FileSpec, table: &str, unique: u64) -> Result<(FileLoadResult, Vec<String>, u64)> {
    let existing_schema: BTreeMap<String, String> = db.describe(table).into_iter().collect();
    let path_display = file_spec.path.display().to_string();
    let result = db.load_file(file_spec, unique);

    let Some(temp_table) = result.temp_table_name.clone() else {
        return Ok((result, Vec::new(), 0));
    };

    let file_schema = db.describe(&temp_table);
    let new_columns: Vec<&(String, String)> = file_schema.iter().filter(|(name, _)| !existing_schema.contains_key(name)).collect();

    for (name, file_type) in &file_schema {
        if let Some(existing_type) = existing_schema.get(name) {
            if base_type(existing_type) != base_type(file_type) {
                return Err(Error::io(format!(
                    "column '{name}' in {path_display} has type {file_type}, incompatible with {table}.{name}'s existing type {existing_type}"
                )));
            }
        }
    }

    let mut changes = Vec::new();
    if !new_columns.is_empty() {
        for (name, data_type) in &new_columns {
            db.exec(&format!("ALTER TABLE {table} ADD COLUMN {name} {data_type}"))
                .map_err(|e| Error::io(format!("failed to widen {table} with column {name} from {path_display}: {e}")))?;
        }
        changes.push(format!(
            "added {} new columns to {table}: {}",
            new_columns.len(),
            new_columns.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>().join(", ")
        ));
    }

    db.exec(&format!(
        "INSERT INTO {table} SELECT * FROM (
            SELECT * FROM {table} WHERE 1=0
            UNION ALL BY NAME
            SELECT * FROM {temp_table}
        )"
    ))
    .map_err(|e| Error::io(format!("failed to append rows from {path_display} into {table}: {e}")))?;

    let added_count = new_columns.len() as u64;
    Ok((result, changes, added_count))
}

/// Strips a type's precision/scale suffix (`VARCHAR(200)` -> `VARCHAR`) so
/// that two differently-sized instances of the same base type aren't
/// flagged as a mismatch.
fn base_type(data_type: &str) -> &str {
    data_type.split('(').next().unwrap_or(data_type).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgx_graphdb::{FileFormat, FileKind};
    use std::io::Write;

    fn write_tsv(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::File::create(&path).unwrap().write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn widens_the_target_table_with_new_columns() {
        let db = GraphDb::open_in_memory().unwrap();
        db.exec("CREATE TABLE nodes AS SELECT 'A:1' AS id, 'Foo' AS name").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = write_tsv(&dir, "more_nodes.tsv", "id\tname\tdescription\nA:2\tBar\tSome description\n");

        let config = AppendConfig {
            node_files: vec![FileSpec {
                path,
                kind: FileKind::Nodes,
                format: FileFormat::Tsv,
                source_name: "more".into(),
                generate_provided_by: false,
            }],
            edge_files: vec![],
            deduplicate: false,
        };

        let result = append_graphs(&db, config).unwrap();
        assert_eq!(result.new_columns_added, 1);
        assert_eq!(db.row_count("nodes"), 2);
    }

    #[test]
    fn rejects_a_shared_column_with_an_incompatible_type() {
        let db = GraphDb::open_in_memory().unwrap();
        db.exec("CREATE TABLE nodes AS SELECT 'A:1' AS id, CAST('1' AS VARCHAR) AS count").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("more_nodes.jsonl");
        std::fs::File::create(&path).unwrap().write_all(b"{\"id\": \"A:2\", \"count\": 5}\n").unwrap();

        let config = AppendConfig {
            node_files: vec![FileSpec {
                path,
                kind: FileKind::Nodes,
                format: FileFormat::Jsonl,
                source_name: "more".into(),
                generate_provided_by: false,
            }],
            edge_files: vec![],
            deduplicate: false,
        };

        let err = append_graphs(&db, config).unwrap_err();
        assert_eq!(err.kind, kgx_model::ErrorKind::Io);
        assert!(err.message.contains("count"));
    }
}
