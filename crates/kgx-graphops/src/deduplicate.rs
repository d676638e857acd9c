//! Removing rows with duplicate `id` values from `nodes`/`edges`, archiving
//! every duplicate row (not just the discarded ones) for QC.

use kgx_graphdb::{DatabaseStats, GraphDb};
use kgx_model::Result;

pub struct DeduplicateConfig {
    pub deduplicate_nodes: bool,
    pub deduplicate_edges: bool,
}

impl Default for DeduplicateConfig {
    fn default() -> DeduplicateConfig {
        DeduplicateConfig { deduplicate_nodes: true, deduplicate_edges: true }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DedupeCounts {
    pub found: u64,
    pub removed: u64,
}

pub struct DeduplicateResult {
    pub nodes: DedupeCounts,
    pub edges: DedupeCounts,
    pub final_stats: DatabaseStats,
}

pub fn deduplicate_graph(db: &GraphDb, config: DeduplicateConfig) -> Result<DeduplicateResult> {
    let nodes = if config.deduplicate_nodes { dedupe_table(db, "nodes", "duplicate_nodes")? } else { DedupeCounts::default() };
    let edges = if config.deduplicate_edges { dedupe_edges(db)? } else { DedupeCounts::default() };
    let final_stats = db.get_stats();
    Ok(DeduplicateResult { nodes, edges, final_stats })
}

fn dedupe_table(db: &GraphDb, table: &str, archive_table: &str) -> Result<DedupeCounts> {
    if !db.table_exists(table) {
        tracing::debug!(table, "table does not exist, skipping deduplication");
        return Ok(DedupeCounts::default());
    }

    let original_count = db.row_count(table);
    let order_column = db.order_column(table);

    db.exec(&format!(
        "CREATE OR REPLACE TABLE {archive_table} AS SELECT * FROM {table} WHERE id IN (SELECT id FROM {table} GROUP BY id HAVING COUNT(*) > 1)"
    ))?;

    let duplicate_rows = db.row_count(archive_table);
    if duplicate_rows == 0 {
        tracing::info!(table, "no duplicates found");
        return Ok(DedupeCounts::default());
    }

    db.exec(&format!(
        "CREATE OR REPLACE TABLE {table} AS SELECT * EXCLUDE (rn) FROM (SELECT *, ROW_NUMBER() OVER (PARTITION BY id ORDER BY {order_column}) AS rn FROM {table}) WHERE rn = 1"
    ))?;

    let final_count = db.row_count(table);
    let removed = original_count.saturating_sub(final_count);
    tracing::info!(table, duplicate_rows, removed, "deduplicated table");
    Ok(DedupeCounts { found: duplicate_rows, removed })
}

fn dedupe_edges(db: &GraphDb) -> Result<DedupeCounts> {
    if !db.table_exists("edges") {
        tracing::debug!("edges table does not exist, skipping deduplication");
        return Ok(DedupeCounts::default());
    }
    let has_id = db.describe("edges").iter().any(|(name, _)| name == "id");
    if !has_id {
        tracing::warn!("edges table has no 'id' column, skipping edge deduplication");
        return Ok(DedupeCounts::default());
    }
    dedupe_table(db, "edges", "duplicate_edges")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_duplicate_node_ids_keeping_first_by_file_source() {
        let db = GraphDb::open_in_memory().unwrap();
        db.exec(
            "CREATE TABLE nodes AS
             SELECT 'A:1' AS id, 'first' AS file_source
             UNION ALL SELECT 'A:1', 'second'
             UNION ALL SELECT 'A:2', 'first'",
        )
        .unwrap();

        let result = deduplicate_graph(&db, DeduplicateConfig::default()).unwrap();
        assert_eq!(result.nodes.found, 2);
        assert_eq!(result.nodes.removed, 1);
        assert_eq!(result.final_stats.nodes, 2);
    }

    #[test]
    fn edges_without_an_id_column_are_skipped() {
        let db = GraphDb::open_in_memory().unwrap();
        db.exec("CREATE TABLE edges AS SELECT 'A' AS subject, 'biolink:related_to' AS predicate, 'B' AS object").unwrap();
        let result = deduplicate_graph(&db, DeduplicateConfig::default()).unwrap();
        assert_eq!(result.edges, DedupeCounts::default());
    }

    #[test]
    fn missing_tables_are_a_no_op() {
        let db = GraphDb::open_in_memory().unwrap();
        let result = deduplicate_graph(&db, DeduplicateConfig::default()).unwrap();
        assert_eq!(result.nodes, DedupeCounts::default());
        assert_eq!(result.edges, DedupeCounts::default());
    }
}
