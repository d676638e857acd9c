//! The composite merge pipeline: join → deduplicate → normalize → prune →
//! validate → export, each step optional and individually skippable.

use kgx_graphdb::{DatabaseStats, ExportFormat, FileSpec, GraphDb};
use kgx_graphops::{
    append_graphs, deduplicate_graph, join_graphs, normalize_graph, prune_graph, AppendConfig, AppendResult,
    DeduplicateConfig, DeduplicateResult, JoinConfig, JoinResult, NormalizeConfig, NormalizeResult, PruneConfig,
    PruneResult, SingletonPolicy,
};
use kgx_model::{Error, Result};
use kgx_validate::{Schema, ValidationContext, ValidationEngine, ValidationProfile, ValidationReport};
use std::path::{Path, PathBuf};

pub struct MergeConfig {
    pub node_files: Vec<FileSpec>,
    pub edge_files: Vec<FileSpec>,
    pub mapping_files: Vec<PathBuf>,

    /// Persistent output database path. A temporary file is used (and
    /// deleted afterward) when not set.
    pub output_database: Option<PathBuf>,

    pub skip_deduplicate: bool,
    pub skip_normalize: bool,
    pub skip_prune: bool,
    pub singleton_policy: SingletonPolicy,

    pub skip_validation: bool,
    pub validation_schema: Option<Schema>,
    pub validation_profile: ValidationProfile,
    pub validation_errors_halt: bool,

    pub export_final: bool,
    pub export_directory: Option<PathBuf>,
    pub output_format: ExportFormat,
    pub archive: bool,
    pub compress: bool,
    pub graph_name: String,

    pub continue_on_pipeline_step_error: bool,
}

impl Default for MergeConfig {
    fn default() -> MergeConfig {
        MergeConfig {
            node_files: Vec::new(),
            edge_files: Vec::new(),
            mapping_files: Vec::new(),
            output_database: None,
            skip_deduplicate: false,
            skip_normalize: false,
            skip_prune: false,
            singleton_policy: SingletonPolicy::Keep,
            skip_validation: false,
            validation_schema: None,
            validation_profile: ValidationProfile::Standard,
            validation_errors_halt: false,
            export_final: false,
            export_directory: None,
            output_format: ExportFormat::Tsv,
            archive: false,
            compress: false,
            graph_name: "merged_graph".to_string(),
            continue_on_pipeline_step_error: false,
        }
    }
}

#[derive(Default)]
pub struct MergeResult {
    pub success: bool,
    pub join_result: Option<JoinResult>,
    pub deduplicate_result: Option<DeduplicateResult>,
    pub normalize_result: Option<NormalizeResult>,
    pub prune_result: Option<PruneResult>,
    pub validation_report: Option<ValidationReport>,
    pub operations_completed: Vec<String>,
    pub operations_skipped: Vec<String>,
    pub final_stats: DatabaseStats,
    pub database_path: Option<PathBuf>,
    pub exported_files: Vec<PathBuf>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Runs the full pipeline. Per-step failures either abort the pipeline
/// (returning a [`MergeResult`] with `success: false` and the error
/// recorded) or, under `continue_on_pipeline_step_error`, are downgraded to
/// a warning and the remaining steps still run.
pub fn merge_graphs(config: MergeConfig) -> Result<MergeResult> {
    let mut result = MergeResult::default();

    let mut temp_dir_guard: Option<tempfile::TempDir> = None;
    let (db_path, using_temp_db) = match &config.output_database {
        Some(path) => (path.clone(), false),
        None => {
            let dir = tempfile::tempdir().map_err(|e| Error::io(format!("failed to create temporary directory: {e}")))?;
            let path = dir.path().join("merge.duckdb");
            temp_dir_guard = Some(dir);
            (path, true)
        }
    };

    let db = GraphDb::open(&db_path)?;

    macro_rules! run_step {
        ($name:expr, $body:expr) => {
            match $body {
                Ok(value) => {
                    result.operations_completed.push($name.to_string());
                    Some(value)
                }
                Err(e) => {
                    result.errors.push(format!("{} step failed: {e}", $name));
                    if config.continue_on_pipeline_step_error {
                        result.warnings.push(format!("{} failed but pipeline continued", $name));
                        None
                    } else {
                        result.final_stats = db.get_stats();
                        result.database_path = if using_temp_db { None } else { Some(db_path.clone()) };
                        return Ok(result);
                    }
                }
            }
        };
    }

    let join_config = JoinConfig { node_files: config.node_files, edge_files: config.edge_files };
    result.join_result = run_step!("join", join_graphs(&db, join_config));
    if result.join_result.as_ref().map(|r| r.files_loaded.is_empty()).unwrap_or(true) {
        result.errors.push("join loaded no files".to_string());
    }

    if !config.skip_deduplicate {
        result.deduplicate_result = run_step!("deduplicate", deduplicate_graph(&db, DeduplicateConfig::default()));
    } else {
        result.operations_skipped.push("deduplicate".to_string());
    }

    if !config.skip_normalize && !config.mapping_files.is_empty() {
        let normalize_config = NormalizeConfig { mapping_files: config.mapping_files };
        result.normalize_result = run_step!("normalize", normalize_graph(&db, normalize_config));
    } else {
        result.operations_skipped.push("normalize".to_string());
    }

    if !config.skip_prune {
        let prune_config = PruneConfig { singleton_policy: config.singleton_policy, min_component_size: None };
        result.prune_result = run_step!("prune", prune_graph(&db, prune_config));
    } else {
        result.operations_skipped.push("prune".to_string());
    }

    if !config.skip_validation {
        if let Some(schema) = &config.validation_schema {
            let engine = ValidationEngine::new(&db, schema);
            let context = ValidationContext { categories: None, profile: config.validation_profile, sample_limit: 10 };
            let report = run_step!("validate", engine.validate(&context));
            if let Some(report) = &report {
                if report.has_errors() && config.validation_errors_halt {
                    result.errors.push(format!("validation found {} error(s); halting", report.error_count));
                    result.validation_report = Some(report.clone());
                    result.final_stats = db.get_stats();
                    result.database_path = if using_temp_db { None } else { Some(db_path.clone()) };
                    return Ok(result);
                }
            }
            result.validation_report = report;
        } else {
            result.operations_skipped.push("validate".to_string());
        }
    } else {
        result.operations_skipped.push("validate".to_string());
    }

    if config.export_final {
        if let Some(export_dir) = &config.export_directory {
            result.exported_files = export_database(&db, export_dir, &config.graph_name, config.output_format, config.archive, config.compress)?;
            result.operations_completed.push("export".to_string());
        } else {
            result.operations_skipped.push("export".to_string());
        }
    } else {
        result.operations_skipped.push("export".to_string());
    }

    result.final_stats = db.get_stats();
    result.success = result.errors.is_empty();
    result.database_path = if using_temp_db { None } else { Some(db_path.clone()) };

    drop(db);
    drop(temp_dir_guard);

    tracing::info!(
        completed = ?result.operations_completed,
        skipped = ?result.operations_skipped,
        nodes = result.final_stats.nodes,
        edges = result.final_stats.edges,
        "merge pipeline finished"
    );

    Ok(result)
}

fn export_database(db: &GraphDb, export_dir: &Path, graph_name: &str, format: ExportFormat, archive: bool, compress: bool) -> Result<Vec<PathBuf>> {
    if db.row_count("nodes") == 0 && db.row_count("edges") == 0 {
        tracing::info!("no data to export");
        return Ok(Vec::new());
    }

    if archive {
        let ext = if compress { "tar.gz" } else { "tar" };
        let archive_path = export_dir.join(format!("{graph_name}.{ext}"));
        db.export_to_archive(&archive_path, graph_name, format, compress)?;
        Ok(vec![archive_path])
    } else {
        let (nodes_path, edges_path) = db.export_to_loose_files(export_dir, graph_name, format)?;
        Ok(vec![nodes_path, edges_path])
    }
}

/// Widens an existing, already-joined database with additional files,
/// outside the full merge pipeline.
pub fn append_to_graph(db: &GraphDb, config: AppendConfig) -> Result<AppendResult> {
    append_graphs(db, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgx_graphdb::{FileFormat, FileKind};
    use std::io::Write;

    fn write_tsv(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::File::create(&path).unwrap().write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn runs_join_through_prune_with_a_temporary_database() {
        let dir = tempfile::tempdir().unwrap();
        let nodes_path = write_tsv(&dir, "a_nodes.tsv", "id\tcategory\nA:1\tbiolink:Gene\nA:2\tbiolink:Gene\n");
        let edges_path = write_tsv(&dir, "a_edges.tsv", "subject\tpredicate\tobject\nA:1\tbiolink:related_to\tA:2\n");

        let config = MergeConfig {
            node_files: vec![FileSpec { path: nodes_path, kind: FileKind::Nodes, format: FileFormat::Tsv, source_name: "a".into(), generate_provided_by: true }],
            edge_files: vec![FileSpec { path: edges_path, kind: FileKind::Edges, format: FileFormat::Tsv, source_name: "a".into(), generate_provided_by: true }],
            skip_validation: true,
            ..MergeConfig::default()
        };

        let result = merge_graphs(config).unwrap();
        assert!(result.success);
        assert_eq!(result.final_stats.nodes, 2);
        assert_eq!(result.final_stats.edges, 1);
        assert!(result.database_path.is_none());
    }

    #[test]
    fn missing_mapping_files_skips_normalize() {
        let dir = tempfile::tempdir().unwrap();
        let nodes_path = write_tsv(&dir, "a_nodes.tsv", "id\nA:1\n");

        let config = MergeConfig {
            node_files: vec![FileSpec { path: nodes_path, kind: FileKind::Nodes, format: FileFormat::Tsv, source_name: "a".into(), generate_provided_by: false }],
            skip_validation: true,
            ..MergeConfig::default()
        };

        let result = merge_graphs(config).unwrap();
        assert!(result.operations_skipped.contains(&"normalize".to_string()));
    }
}
