//! Applying SSSOM mappings to rewrite edge subject/object identifiers to a
//! single canonical form.

use kgx_graphdb::GraphDb;
use kgx_model::{Error, Result};
use std::path::PathBuf;

pub struct NormalizeConfig {
    /// SSSOM TSV files, each with `#`-prefixed YAML header comments and at
    /// least `subject_id`/`predicate_id`/`object_id` columns.
    pub mapping_files: Vec<PathBuf>,
}

pub struct NormalizeResult {
    pub mappings_loaded: usize,
    pub edges_normalized: u64,
    pub collapsed_mappings: u64,
}

/// Loads every SSSOM file, reduces many-to-one collisions deterministically
/// (lexicographically smallest `subject_id` wins), then rewrites `edges`'
/// `subject`/`object` columns through the resulting `object_id -> subject_id`
/// table, preserving the original value in `original_subject`/`original_object`
/// the first time a row is actually rewritten.
pub fn normalize_graph(db: &GraphDb, config: NormalizeConfig) -> Result<NormalizeResult> {
    if config.mapping_files.is_empty() {
        tracing::info!("no SSSOM mapping files configured, skipping normalization");
        return Ok(NormalizeResult { mappings_loaded: 0, edges_normalized: 0, collapsed_mappings: 0 });
    }
    if !db.table_exists("edges") {
        tracing::debug!("edges table does not exist, skipping normalization");
        return Ok(NormalizeResult { mappings_loaded: 0, edges_normalized: 0, collapsed_mappings: 0 });
    }

    let mut temp_tables = Vec::new();
    for (i, path) in config.mapping_files.iter().enumerate() {
        let table = format!("temp_sssom_{i}");
        let read_path = path.display().to_string().replace('\'', "''");
        db.exec(&format!(
            "CREATE TEMP TABLE {table} AS SELECT * FROM read_csv('{read_path}', delim='\t', header=true, all_varchar=true, comment='#', ignore_errors=true)"
        ))
        .map_err(|e| Error::io(format!("failed to load SSSOM file {}: {e}", path.display())))?;
        temp_tables.push(table);
    }

    let union = temp_tables.iter().map(|t| format!("SELECT * FROM {t}")).collect::<Vec<_>>().join(" UNION ALL BY NAME ");
    db.exec(&format!("CREATE OR REPLACE TABLE all_mappings AS {union}"))?;

    let total_rows = db.row_count("all_mappings");
    db.exec(
        "CREATE OR REPLACE TABLE mappings AS
         SELECT * EXCLUDE (rn) FROM (
            SELECT *, ROW_NUMBER() OVER (PARTITION BY object_id ORDER BY subject_id) AS rn
            FROM all_mappings
         ) WHERE rn = 1",
    )?;
    let distinct_rows = db.row_count("mappings");
    let collapsed_mappings = total_rows.saturating_sub(distinct_rows);
    if collapsed_mappings > 0 {
        tracing::warn!(collapsed_mappings, "SSSOM mappings collapsed many-to-one object_ids; kept lexicographically smallest subject_id");
    }

    let edge_columns: Vec<String> = db.describe("edges").into_iter().map(|(name, _)| name).collect();
    let has_original_subject = edge_columns.iter().any(|c| c == "original_subject");
    let has_original_object = edge_columns.iter().any(|c| c == "original_object");

    if !has_original_subject {
        db.exec("ALTER TABLE edges ADD COLUMN original_subject VARCHAR")?;
    }
    if !has_original_object {
        db.exec("ALTER TABLE edges ADD COLUMN original_object VARCHAR")?;
    }

    let edges_normalized: i64 = db
        .connection()
        .query_row(
            "SELECT COUNT(*) FROM edges e
             LEFT JOIN mappings m_subj ON e.subject = m_subj.object_id
             LEFT JOIN mappings m_obj ON e.object = m_obj.object_id
             WHERE (m_subj.subject_id IS NOT NULL AND m_subj.subject_id != e.subject)
                OR (m_obj.subject_id IS NOT NULL AND m_obj.subject_id != e.object)",
            [],
            |row| row.get(0),
        )
        .map_err(|e| Error::io(e.to_string()))?;

    db.exec(
        "CREATE OR REPLACE TABLE edges AS
         SELECT e.* EXCLUDE (subject, object, original_subject, original_object),
                COALESCE(m_subj.subject_id, e.subject) AS subject,
                COALESCE(m_obj.subject_id, e.object) AS object,
                COALESCE(e.original_subject, CASE WHEN m_subj.subject_id IS NOT NULL AND m_subj.subject_id != e.subject THEN e.subject END) AS original_subject,
                COALESCE(e.original_object, CASE WHEN m_obj.subject_id IS NOT NULL AND m_obj.subject_id != e.object THEN e.object END) AS original_object
         FROM edges e
         LEFT JOIN mappings m_subj ON e.subject = m_subj.object_id
         LEFT JOIN mappings m_obj ON e.object = m_obj.object_id",
    )?;

    let edges_normalized = edges_normalized.max(0) as u64;
    tracing::info!(mappings_loaded = temp_tables.len(), edges_normalized, "normalized edge identifiers");

    Ok(NormalizeResult { mappings_loaded: temp_tables.len(), edges_normalized, collapsed_mappings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_sssom(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::File::create(&path).unwrap().write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn rewrites_edge_endpoints_through_sssom_mapping() {
        let db = GraphDb::open_in_memory().unwrap();
        db.exec("CREATE TABLE edges AS SELECT 'OLD:1' AS subject, 'biolink:related_to' AS predicate, 'B:1' AS object").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let mapping = write_sssom(
            &dir,
            "mapping.sssom.tsv",
            "# curie_map:\n#   OLD: https://example.org/OLD_\nsubject_id\tpredicate_id\tobject_id\tmapping_justification\nNEW:1\tskos:exactMatch\tOLD:1\tsemapv:ManualMappingCuration\n",
        );

        let result = normalize_graph(&db, NormalizeConfig { mapping_files: vec![mapping] }).unwrap();
        assert_eq!(result.edges_normalized, 1);

        let conn = db.connection();
        let (subject, original_subject): (String, Option<String>) =
            conn.query_row("SELECT subject, original_subject FROM edges", [], |row| Ok((row.get(0)?, row.get(1)?))).unwrap();
        assert_eq!(subject, "NEW:1");
        assert_eq!(original_subject.as_deref(), Some("OLD:1"));
    }

    #[test]
    fn no_mapping_files_is_a_no_op() {
        let db = GraphDb::open_in_memory().unwrap();
        db.exec("CREATE TABLE edges AS SELECT 'A' AS subject, 'biolink:related_to' AS predicate, 'B' AS object").unwrap();
        let result = normalize_graph(&db, NormalizeConfig { mapping_files: vec![] }).unwrap();
        assert_eq!(result.mappings_loaded, 0);
        assert_eq!(result.edges_normalized, 0);
    }
}
