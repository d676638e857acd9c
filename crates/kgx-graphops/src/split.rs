//! Partitioning one loaded file into many output files, one per distinct
//! combination of a set of split columns.

use kgx_graphdb::{ExportFormat, FileKind, FileSpec, GraphDb};
use kgx_model::{Error, Result};
use std::path::PathBuf;

pub struct SplitConfig {
    pub input_file: FileSpec,
    pub split_fields: Vec<String>,
    pub output_directory: PathBuf,
    pub output_format: ExportFormat,
    pub remove_prefixes: bool,
}

pub struct SplitResult {
    pub output_files: Vec<PathBuf>,
    pub total_records_split: u64,
}

pub fn split_graph(config: SplitConfig) -> Result<SplitResult> {
    std::fs::create_dir_all(&config.output_directory)
        .map_err(|e| Error::io(format!("failed to create {}: {e}", config.output_directory.display())))?;

    let db = GraphDb::open_in_memory()?;
    let table = match config.input_file.kind {
        FileKind::Nodes => "nodes",
        FileKind::Edges => "edges",
    };
    let suffix = match config.input_file.kind {
        FileKind::Nodes => "_nodes",
        FileKind::Edges => "_edges",
    };

    let result = db.load_file(config.input_file.clone(), 0);
    if let Some(error) = &result.error {
        return Err(Error::io(format!("failed to load input file: {error}")));
    }
    db.create_final_tables(std::slice::from_ref(&result))?;

    let fields = config.split_fields.join(", ");
    let conn = db.connection();
    let mut stmt = conn
        .prepare(&format!("SELECT DISTINCT {fields} FROM {table}"))
        .map_err(|e| Error::io(e.to_string()))?;
    let combos: Vec<Vec<Option<String>>> = stmt
        .query_map([], |row| {
            (0..config.split_fields.len()).map(|i| row.get::<_, Option<String>>(i)).collect::<duckdb::Result<Vec<_>>>()
        })
        .map_err(|e| Error::io(e.to_string()))?
        .filter_map(|r| r.ok())
        .collect();

    let stem = config.input_file.path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "split".to_string());
    let prefix = stem.strip_suffix("_nodes").or_else(|| stem.strip_suffix("_edges")).unwrap_or(&stem);

    let mut output_files = Vec::new();
    let mut total_records_split = 0u64;

    for values in combos {
        let where_clause: Vec<String> = config
            .split_fields
            .iter()
            .zip(values.iter())
            .map(|(field, value)| match value {
                Some(v) => format!("{field} = '{}'", v.replace('\'', "''")),
                None => format!("{field} IS NULL"),
            })
            .collect();
        let where_sql = where_clause.join(" AND ");

        let filename = generate_filename(prefix, &values, config.output_format, suffix, config.remove_prefixes);
        let output_path = config.output_directory.join(&filename);

        db.export_table(&format!("(SELECT * FROM {table} WHERE {where_sql})"), &output_path, config.output_format)?;

        let records_in_split: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {table} WHERE {where_sql}"), [], |row| row.get(0))
            .map_err(|e| Error::io(e.to_string()))?;
        total_records_split += records_in_split.max(0) as u64;
        output_files.push(output_path);
    }

    Ok(SplitResult { output_files, total_records_split })
}

fn generate_filename(prefix: &str, values: &[Option<String>], format: ExportFormat, suffix: &str, remove_prefixes: bool) -> String {
    let ext = match format {
        ExportFormat::Tsv => "tsv",
        ExportFormat::Jsonl => "jsonl",
        ExportFormat::Parquet => "parquet",
    };
    let segments: Vec<String> = values
        .iter()
        .map(|v| {
            let raw = v.clone().unwrap_or_else(|| "null".to_string());
            let cleaned = if remove_prefixes { raw.splitn(2, ':').last().unwrap_or(&raw).to_string() } else { raw };
            sanitize_segment(&cleaned)
        })
        .collect();
    format!("{prefix}_{}{suffix}.{ext}", segments.join("_"))
}

fn sanitize_segment(value: &str) -> String {
    value.chars().map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgx_graphdb::FileFormat;
    use std::io::Write;

    #[test]
    fn splits_nodes_by_a_single_category_column() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("genes_nodes.tsv");
        std::fs::File::create(&input_path)
            .unwrap()
            .write_all(b"id\tcategory\nA:1\tgene\nA:2\tgene\nA:3\tprotein\n")
            .unwrap();

        let output_dir = dir.path().join("out");
        let config = SplitConfig {
            input_file: FileSpec {
                path: input_path,
                kind: FileKind::Nodes,
                format: FileFormat::Tsv,
                source_name: "genes".into(),
                generate_provided_by: false,
            },
            split_fields: vec!["category".to_string()],
            output_directory: output_dir.clone(),
            output_format: ExportFormat::Tsv,
            remove_prefixes: false,
        };

        let result = split_graph(config).unwrap();
        assert_eq!(result.output_files.len(), 2);
        assert_eq!(result.total_records_split, 3);
    }
}
