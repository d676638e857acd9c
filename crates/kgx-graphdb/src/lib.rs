//! The `H` component: a facade over one embedded analytic SQL engine
//! connection, responsible for loading heterogeneous KGX files into
//! unified `nodes`/`edges` tables and exporting them back out.

mod export;
mod load;
mod stats;

pub use export::ExportFormat;
pub use load::{FileFormat, FileKind, FileLoadResult, FileSpec};
pub use stats::DatabaseStats;

use kgx_model::{Error, Result};
use std::path::{Path, PathBuf};

/// One connection to the embedded graph database, backed by a persistent
/// file or an in-memory instance.
pub struct GraphDb {
    conn: duckdb::Connection,
    db_path: Option<PathBuf>,
}

impl GraphDb {
    /// Opens a persistent database at `path`.
    pub fn open(path: &Path) -> Result<GraphDb> {
        let conn = duckdb::Connection::open(path)
            .map_err(|e| Error::io(format!("failed to open graph database {}: {e}", path.display())))?;
        let db = GraphDb { conn, db_path: Some(path.to_path_buf()) };
        db.setup_schema()?;
        Ok(db)
    }

    /// Opens an in-memory database, used for one-shot operations like split
    /// that never need to persist a database file.
    pub fn open_in_memory() -> Result<GraphDb> {
        let conn = duckdb::Connection::open_in_memory()
            .map_err(|e| Error::io(format!("failed to open in-memory graph database: {e}")))?;
        let db = GraphDb { conn, db_path: None };
        db.setup_schema()?;
        Ok(db)
    }

    fn setup_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS file_schemas (
                    filename VARCHAR,
                    table_type VARCHAR,
                    column_name VARCHAR,
                    data_type VARCHAR,
                    file_source VARCHAR
                )",
            )
            .map_err(|e| Error::io(format!("failed to initialize graph database schema: {e}")))?;
        tracing::debug!("graph database schema initialized");
        Ok(())
    }

    pub fn connection(&self) -> &duckdb::Connection {
        &self.conn
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Runs a statement that returns no rows, wrapping the engine's error in
    /// this workspace's taxonomy.
    pub fn exec(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| Error::io(format!("graph database statement failed: {e}\n{sql}")))
    }

    /// True if `table` currently exists and is queryable.
    pub fn table_exists(&self, table: &str) -> bool {
        self.conn.execute(&format!("SELECT COUNT(*) FROM {table} LIMIT 1"), []).is_ok()
    }

    /// The row count of `table`, or zero if it doesn't exist.
    pub fn row_count(&self, table: &str) -> u64 {
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get::<_, i64>(0))
            .map(|n| n.max(0) as u64)
            .unwrap_or(0)
    }

    /// The distinct column names of `table`, or an empty vec if it doesn't exist.
    pub fn describe(&self, table: &str) -> Vec<(String, String)> {
        let mut stmt = match self.conn.prepare(&format!("DESCRIBE {table}")) {
            Ok(stmt) => stmt,
            Err(_) => return Vec::new(),
        };
        let rows = stmt.query_map([], |row| {
            let name: String = row.get(0)?;
            let data_type: String = row.get(1)?;
            Ok((name, data_type))
        });
        match rows {
            Ok(rows) => rows.filter_map(|r| r.ok()).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Which column a table should order by to determine "first occurrence"
    /// for deduplication: `file_source`, else `provided_by`, else a constant.
    pub fn order_column(&self, table: &str) -> String {
        let columns: Vec<String> = self.describe(table).into_iter().map(|(name, _)| name).collect();
        if columns.iter().any(|c| c == "file_source") {
            "file_source".to_string()
        } else if columns.iter().any(|c| c == "provided_by") {
            "provided_by".to_string()
        } else {
            "1".to_string()
        }
    }
}
