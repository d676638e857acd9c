//! Cleaning up graph-integrity issues: edges whose endpoints don't exist,
//! and nodes referenced by no edge.

use indexmap::IndexMap;
use kgx_graphdb::GraphDb;
use kgx_model::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingletonPolicy {
    Keep,
    Remove,
}

pub struct PruneConfig {
    pub singleton_policy: SingletonPolicy,
    /// Reserved: connected-component analysis is out of scope. A non-zero
    /// value logs a warning and otherwise does nothing.
    pub min_component_size: Option<u64>,
}

impl Default for PruneConfig {
    fn default() -> PruneConfig {
        PruneConfig { singleton_policy: SingletonPolicy::Keep, min_component_size: None }
    }
}

pub struct PruneResult {
    pub dangling_edges_moved: u64,
    pub dangling_edges_by_source: IndexMap<String, u64>,
    pub missing_nodes_by_source: IndexMap<String, u64>,
    pub singleton_nodes_moved: u64,
    pub singleton_nodes_kept: u64,
}

pub fn prune_graph(db: &GraphDb, config: PruneConfig) -> Result<PruneResult> {
    let (dangling_edges_moved, dangling_edges_by_source, missing_nodes_by_source) = handle_dangling_edges(db)?;
    let (singleton_nodes_moved, singleton_nodes_kept) = handle_singleton_nodes(db, config.singleton_policy)?;

    if let Some(size) = config.min_component_size {
        // TODO: connected-component analysis is not implemented; this is a documented no-op.
        tracing::warn!(min_component_size = size, "component size filtering is not implemented, ignoring");
    }

    Ok(PruneResult { dangling_edges_moved, dangling_edges_by_source, missing_nodes_by_source, singleton_nodes_moved, singleton_nodes_kept })
}

fn source_column(db: &GraphDb) -> &'static str {
    let columns: Vec<String> = db.describe("edges").into_iter().map(|(name, _)| name).collect();
    if columns.iter().any(|c| c == "file_source") {
        "file_source"
    } else if columns.iter().any(|c| c == "source") {
        "source"
    } else {
        "'unknown'"
    }
}

fn handle_dangling_edges(db: &GraphDb) -> Result<(u64, IndexMap<String, u64>, IndexMap<String, u64>)> {
    if !db.table_exists("edges") || !db.table_exists("nodes") {
        tracing::debug!("nodes or edges table missing, skipping dangling-edge pruning");
        return Ok((0, IndexMap::new(), IndexMap::new()));
    }

    let source_expr = source_column(db);
    let source_select = if source_expr == "'unknown'" { "'unknown'".to_string() } else { format!("COALESCE(e.{source_expr}, 'unknown')") };

    db.exec(
        &format!(
            "CREATE OR REPLACE TABLE dangling_edges AS SELECT * FROM edges WHERE 1=0;
             INSERT INTO dangling_edges
             SELECT e.* FROM edges e
             LEFT JOIN nodes n1 ON e.subject = n1.id
             LEFT JOIN nodes n2 ON e.object = n2.id
             WHERE n1.id IS NULL OR n2.id IS NULL"
        )
    )?;

    let dangling_edges_moved = db.row_count("dangling_edges");
    if dangling_edges_moved == 0 {
        return Ok((0, IndexMap::new(), IndexMap::new()));
    }

    let by_source = query_group_counts(
        db,
        &format!(
            "SELECT {source_select} AS src, COUNT(*) FROM dangling_edges e GROUP BY src ORDER BY src"
        ),
    )?;

    let missing_by_source = query_group_counts(
        db,
        &format!(
            "SELECT src, COUNT(DISTINCT missing_id) FROM (
                SELECT {source_select} AS src, e.subject AS missing_id FROM dangling_edges e
                LEFT JOIN nodes n1 ON e.subject = n1.id WHERE n1.id IS NULL
                UNION ALL
                SELECT {source_select} AS src, e.object AS missing_id FROM dangling_edges e
                LEFT JOIN nodes n2 ON e.object = n2.id WHERE n2.id IS NULL
            ) GROUP BY src ORDER BY src"
        ),
    )?;

    db.exec(
        "DELETE FROM edges WHERE EXISTS (
            SELECT 1 FROM dangling_edges d WHERE d.subject = edges.subject AND d.object = edges.object
        )",
    )?;

    tracing::info!(dangling_edges_moved, "moved dangling edges out of the main edges table");
    Ok((dangling_edges_moved, by_source, missing_by_source))
}

fn query_group_counts(db: &GraphDb, sql: &str) -> Result<IndexMap<String, u64>> {
    let conn = db.connection();
    let mut stmt = conn.prepare(sql).map_err(|e| Error::io(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
        .map_err(|e| Error::io(e.to_string()))?;
    let mut map = IndexMap::new();
    for row in rows {
        let (key, count) = row.map_err(|e| Error::io(e.to_string()))?;
        map.insert(key, count.max(0) as u64);
    }
    Ok(map)
}

fn handle_singleton_nodes(db: &GraphDb, policy: SingletonPolicy) -> Result<(u64, u64)> {
    if !db.table_exists("nodes") {
        return Ok((0, 0));
    }

    let singleton_count = db
        .connection()
        .query_row(
            "SELECT COUNT(*) FROM nodes n
             LEFT JOIN edges e1 ON n.id = e1.subject
             LEFT JOIN edges e2 ON n.id = e2.object
             WHERE e1.subject IS NULL AND e2.object IS NULL",
            [],
            |row| row.get::<_, i64>(0),
        )
        .map_err(|e| Error::io(e.to_string()))?
        .max(0) as u64;

    if singleton_count == 0 {
        return Ok((0, 0));
    }

    match policy {
        SingletonPolicy::Keep => {
            tracing::info!(singleton_count, "keeping singleton nodes (default policy)");
            Ok((0, singleton_count))
        }
        SingletonPolicy::Remove => {
            db.exec(
                "CREATE OR REPLACE TABLE singleton_nodes AS
                 SELECT n.* FROM nodes n
                 LEFT JOIN edges e1 ON n.id = e1.subject
                 LEFT JOIN edges e2 ON n.id = e2.object
                 WHERE e1.subject IS NULL AND e2.object IS NULL",
            )?;
            db.exec(
                "DELETE FROM nodes WHERE nodes.id IN (
                    SELECT n.id FROM nodes n
                    LEFT JOIN edges e1 ON n.id = e1.subject
                    LEFT JOIN edges e2 ON n.id = e2.object
                    WHERE e1.subject IS NULL AND e2.object IS NULL
                )",
            )?;
            tracing::info!(singleton_count, "moved singleton nodes to singleton_nodes table");
            Ok((singleton_count, 0))
        }
    }
}
