//! Exporting `nodes`/`edges` to flat files, either loose in a directory or
//! bundled into a tar/tar.gz archive.

use crate::GraphDb;
use kgx_model::{Error, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Tsv,
    Jsonl,
    Parquet,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            ExportFormat::Tsv => "tsv",
            ExportFormat::Jsonl => "jsonl",
            ExportFormat::Parquet => "parquet",
        }
    }

    fn copy_options(self) -> &'static str {
        match self {
            ExportFormat::Tsv => "(HEADER, DELIMITER '\t')",
            ExportFormat::Parquet => "(FORMAT PARQUET)",
            ExportFormat::Jsonl => "(FORMAT JSON)",
        }
    }
}

impl GraphDb {
    /// Copies `table` out to `path` in `format` via the engine's own `COPY`
    /// statement.
    pub fn export_table(&self, table: &str, path: &Path, format: ExportFormat) -> Result<()> {
        let sql = format!("COPY {table} TO '{}' {}", path.display().to_string().replace('\'', "''"), format.copy_options());
        self.exec(&sql)?;
        tracing::info!(table, path = %path.display(), "exported table");
        Ok(())
    }

    fn archive_filenames(graph_name: &str, format: ExportFormat) -> (String, String) {
        let ext = format.extension();
        (format!("{graph_name}_nodes.{ext}"), format!("{graph_name}_edges.{ext}"))
    }

    /// Exports `nodes`/`edges` to standalone files in `output_directory`,
    /// named `<graph_name>_nodes.<ext>` / `<graph_name>_edges.<ext>`.
    pub fn export_to_loose_files(&self, output_directory: &Path, graph_name: &str, format: ExportFormat) -> Result<(PathBuf, PathBuf)> {
        std::fs::create_dir_all(output_directory)
            .map_err(|e| Error::io(format!("failed to create {}: {e}", output_directory.display())))?;
        let (nodes_name, edges_name) = Self::archive_filenames(graph_name, format);
        let nodes_path = output_directory.join(nodes_name);
        let edges_path = output_directory.join(edges_name);
        self.export_table("nodes", &nodes_path, format)?;
        self.export_table("edges", &edges_path, format)?;
        Ok((nodes_path, edges_path))
    }

    /// Exports `nodes`/`edges` to a tar (or tar.gz, when `compress`) archive
    /// at `output_path`, with the same standardized filenames inside.
    pub fn export_to_archive(&self, output_path: &Path, graph_name: &str, format: ExportFormat, compress: bool) -> Result<()> {
        let staging = tempfile::tempdir().map_err(|e| Error::io(format!("failed to create staging directory: {e}")))?;
        let (nodes_name, edges_name) = Self::archive_filenames(graph_name, format);
        let nodes_path = staging.path().join(&nodes_name);
        let edges_path = staging.path().join(&edges_name);
        self.export_table("nodes", &nodes_path, format)?;
        self.export_table("edges", &edges_path, format)?;

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(format!("failed to create {}: {e}", parent.display())))?;
        }

        let file = File::create(output_path).map_err(|e| Error::io(format!("failed to create {}: {e}", output_path.display())))?;

        if compress {
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            builder.append_path_with_name(&nodes_path, &nodes_name).map_err(|e| Error::io(e.to_string()))?;
            builder.append_path_with_name(&edges_path, &edges_name).map_err(|e| Error::io(e.to_string()))?;
            let encoder = builder.into_inner().map_err(|e| Error::io(e.to_string()))?;
            encoder.finish().map_err(|e| Error::io(e.to_string()))?.flush().map_err(|e| Error::io(e.to_string()))?;
        } else {
            let mut builder = tar::Builder::new(file);
            builder.append_path_with_name(&nodes_path, &nodes_name).map_err(|e| Error::io(e.to_string()))?;
            builder.append_path_with_name(&edges_path, &edges_name).map_err(|e| Error::io(e.to_string()))?;
            builder.into_inner().map_err(|e| Error::io(e.to_string()))?.flush().map_err(|e| Error::io(e.to_string()))?;
        }

        tracing::info!(path = %output_path.display(), compress, "exported database to archive");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_db() -> GraphDb {
        let db = GraphDb::open_in_memory().unwrap();
        db.exec("CREATE TABLE nodes AS SELECT 'A' AS id").unwrap();
        db.exec("CREATE TABLE edges AS SELECT 'A' AS subject, 'biolink:related_to' AS predicate, 'B' AS object").unwrap();
        db
    }

    #[test]
    fn exports_loose_tsv_files() {
        let db = seeded_db();
        let dir = tempfile::tempdir().unwrap();
        let (nodes_path, edges_path) = db.export_to_loose_files(dir.path(), "test", ExportFormat::Tsv).unwrap();
        assert!(nodes_path.exists());
        assert!(edges_path.exists());
        assert_eq!(nodes_path.file_name().unwrap(), "test_nodes.tsv");
    }

    #[test]
    fn exports_a_tar_archive_with_standardized_names() {
        let db = seeded_db();
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("test.tar");
        db.export_to_archive(&archive_path, "test", ExportFormat::Tsv, false).unwrap();
        assert!(archive_path.exists());

        let mut archive = tar::Archive::new(File::open(&archive_path).unwrap());
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&"test_nodes.tsv".to_string()));
        assert!(names.contains(&"test_edges.tsv".to_string()));
    }
}
