//! Mapping tables: a nested reader-(optionally-transform) pipeline whose
//! output is indexed in memory by `key_column` rather than written to disk,
//! so a transform's `lookup` has something to search.

use crate::runtime::{self, TransformLoader};
use crate::transform::TransformEntryPoint;
use indexmap::IndexMap;
use kgx_config::{MapConfig, TransformConfig};
use kgx_ingest::Source;
use kgx_model::{Error, Record, Result};
use kgx_write::PassthroughWriter;
use std::path::{Path, PathBuf};

/// One mapping table, keyed by the configured `key_column`.
pub type KeyIndex = IndexMap<String, Record>;

/// Every configured mapping table, keyed by its declared name, in
/// declaration order.
pub type Mappings = IndexMap<String, KeyIndex>;

/// Resolves the path a [`TransformConfig`] names, either `code` (an inline
/// snippet's logical path) or `module` (a file path), relative to
/// `base_dir`. This is an opaque lookup key for [`TransformLoader`], not a
/// path the loader is required to read from disk.
fn resolve_module_path(cfg: &TransformConfig, base_dir: Option<&Path>) -> Result<PathBuf> {
    let raw = cfg
        .module
        .as_deref()
        .or(cfg.code.as_deref())
        .ok_or_else(|| Error::config("transform config declares neither 'code' nor 'module'"))?;

    let path = Path::new(raw);
    Ok(match base_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    })
}

/// Runs one mapping's reader (and optional transform) to completion, then
/// indexes the resulting rows by `key_column`.
pub fn load_mapping(
    config: &MapConfig,
    base_dir: Option<&Path>,
    loader: &dyn TransformLoader,
) -> Result<(String, KeyIndex)> {
    let source = Source::open(config.reader.clone(), base_dir)?;

    let rows: Vec<Record> = match &config.transform {
        None => source.collect::<Result<Vec<Record>>>()?,
        Some(transform_cfg) => {
            let module_path = resolve_module_path(transform_cfg, base_dir)?;
            let cache = runtime::ModuleCache::new(loader);
            let entry = cache.get_or_load(&module_path)?;
            let mut writer = PassthroughWriter::new();
            let empty = Mappings::new();
            {
                let mut entry = entry.borrow_mut();
                let entry: &mut TransformEntryPoint = &mut entry;
                runtime::run(entry, source, &mut writer, &empty, transform_cfg.on_map_failure)?;
            }
            writer.into_records()
        }
    };

    let mut index = KeyIndex::new();
    for row in rows {
        let key = row
            .get(&config.key_column)
            .ok_or_else(|| {
                Error::config(format!(
                    "mapping '{}' produced a row missing its key column '{}'",
                    config.name, config.key_column
                ))
            })?
            .flatten("|");

        let entry = if config.value_columns.is_empty() {
            row
        } else {
            let mut trimmed = Record::new();
            for column in &config.value_columns {
                if let Some(value) = row.get(column) {
                    trimmed.insert(column.clone(), value.clone());
                }
            }
            trimmed
        };

        index.insert(key, entry);
    }

    Ok((config.name.clone(), index))
}

/// Loads every configured mapping into one [`Mappings`] tree, preserving
/// declaration order so [`crate::context::TransformContext::lookup`]'s
/// unqualified search visits tables in the order the config declared them.
pub fn load_mappings(
    configs: &[MapConfig],
    base_dir: Option<&Path>,
    loader: &dyn TransformLoader,
) -> Result<Mappings> {
    let mut mappings = Mappings::new();
    for config in configs {
        let (name, table) = load_mapping(config, base_dir, loader)?;
        mappings.insert(name, table);
    }
    Ok(mappings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::TransformRegistration;
    use kgx_config::{DelimitedReaderConfig, HeaderDirective, ReaderConfig};

    fn csv_mapping(name: &str, key_column: &str, value_columns: Vec<String>, files: Vec<String>) -> MapConfig {
        MapConfig {
            name: name.to_string(),
            reader: ReaderConfig::Csv(DelimitedReaderConfig {
                files,
                file_archive: None,
                base_dir: None,
                delimiter: ",".to_string(),
                header: Some(HeaderDirective::Infer),
                header_prefix: None,
                comment_char: None,
                columns: Default::default(),
                skip_blank_lines: false,
                row_limit: 0,
                filters: Vec::new(),
            }),
            transform: None,
            key_column: key_column.to_string(),
            value_columns,
        }
    }

    struct NoopLoader;
    impl TransformLoader for NoopLoader {
        fn load(&self, _absolute_path: &Path) -> Result<TransformRegistration> {
            unreachable!("mapping without a transform never consults the loader")
        }
    }

    #[test]
    fn indexes_rows_by_key_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("genes.csv");
        std::fs::write(&path, "hgnc_id,symbol\nHGNC:1,BRCA1\nHGNC:2,BRCA2\n").unwrap();

        let config = csv_mapping("gene_map", "hgnc_id", vec!["symbol".to_string()], vec!["genes.csv".to_string()]);
        let (name, table) = load_mapping(&config, Some(dir.path()), &NoopLoader).unwrap();

        assert_eq!(name, "gene_map");
        assert_eq!(table.get("HGNC:1").unwrap().get("symbol").unwrap().as_str(), Some("BRCA1"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn missing_key_column_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("genes.csv");
        std::fs::write(&path, "symbol\nBRCA1\n").unwrap();

        let config = csv_mapping("gene_map", "hgnc_id", vec![], vec!["genes.csv".to_string()]);
        let err = load_mapping(&config, Some(dir.path()), &NoopLoader).unwrap_err();
        assert_eq!(err.kind, kgx_model::ErrorKind::Config);
    }

    #[test]
    fn load_mappings_preserves_declaration_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), "k,v\nx,1\n").unwrap();
        std::fs::write(dir.path().join("b.csv"), "k,v\ny,2\n").unwrap();

        let configs = vec![
            csv_mapping("second", "k", vec![], vec!["b.csv".to_string()]),
            csv_mapping("first", "k", vec![], vec!["a.csv".to_string()]),
        ];
        let mappings = load_mappings(&configs, Some(dir.path()), &NoopLoader).unwrap();
        let names: Vec<&String> = mappings.keys().collect();
        assert_eq!(names, vec!["second", "first"]);
    }
}
