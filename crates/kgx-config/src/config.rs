//! Typed configuration objects for every pipeline component. These are the
//! `serde::Deserialize` targets produced by [`crate::loader::load_yaml_as`].

use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;

/// Top-level source configuration: one reader, one optional transform, one
/// writer, addressed by a declared `name`.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    #[serde(default)]
    pub metadata: Option<HashMap<String, serde_yaml::Value>>,
    pub reader: ReaderConfig,
    #[serde(default)]
    pub transform: Option<TransformConfig>,
    pub writer: WriterConfig,
}

/// Reader configuration, discriminated by `format`. Each variant carries the
/// fields specific to that format; shared fields (`files`, `filters`) are
/// duplicated per-variant rather than flattened, so that an unknown field on
/// the wrong variant is rejected at load time instead of silently ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum ReaderConfig {
    Csv(DelimitedReaderConfig),
    Tsv(DelimitedReaderConfig),
    Jsonl(RecordReaderConfig),
    Json(PathedReaderConfig),
    Yaml(PathedReaderConfig),
}

#[derive(Debug, Clone, Deserialize)]
pub struct DelimitedReaderConfig {
    pub files: Vec<String>,
    #[serde(default)]
    pub file_archive: Option<String>,
    #[serde(default)]
    pub base_dir: Option<String>,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default)]
    pub header: Option<HeaderDirective>,
    #[serde(default)]
    pub header_prefix: Option<String>,
    #[serde(default)]
    pub comment_char: Option<String>,
    /// Declared column names and types, in declaration order. When `header`
    /// is `none`, this order doubles as the header row itself.
    #[serde(default)]
    pub columns: IndexMap<String, ColumnType>,
    #[serde(default)]
    pub skip_blank_lines: bool,
    #[serde(default)]
    pub row_limit: u64,
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordReaderConfig {
    pub files: Vec<String>,
    #[serde(default)]
    pub file_archive: Option<String>,
    #[serde(default)]
    pub base_dir: Option<String>,
    #[serde(default)]
    pub required_properties: Vec<String>,
    #[serde(default)]
    pub row_limit: u64,
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathedReaderConfig {
    pub files: Vec<String>,
    #[serde(default)]
    pub file_archive: Option<String>,
    #[serde(default)]
    pub base_dir: Option<String>,
    #[serde(default)]
    pub json_path: Vec<JsonPathSegment>,
    #[serde(default)]
    pub required_properties: Vec<String>,
    #[serde(default)]
    pub row_limit: u64,
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum JsonPathSegment {
    Key(String),
    Index(usize),
}

impl ReaderConfig {
    /// The configured file entries (literal paths or glob patterns), common
    /// to every reader variant.
    pub fn files(&self) -> &[String] {
        match self {
            ReaderConfig::Csv(c) | ReaderConfig::Tsv(c) => &c.files,
            ReaderConfig::Jsonl(c) => &c.files,
            ReaderConfig::Json(c) | ReaderConfig::Yaml(c) => &c.files,
        }
    }

    pub fn file_archive(&self) -> Option<&str> {
        match self {
            ReaderConfig::Csv(c) | ReaderConfig::Tsv(c) => c.file_archive.as_deref(),
            ReaderConfig::Jsonl(c) => c.file_archive.as_deref(),
            ReaderConfig::Json(c) | ReaderConfig::Yaml(c) => c.file_archive.as_deref(),
        }
    }

    pub fn base_dir(&self) -> Option<&str> {
        match self {
            ReaderConfig::Csv(c) | ReaderConfig::Tsv(c) => c.base_dir.as_deref(),
            ReaderConfig::Jsonl(c) => c.base_dir.as_deref(),
            ReaderConfig::Json(c) | ReaderConfig::Yaml(c) => c.base_dir.as_deref(),
        }
    }

    pub fn filters(&self) -> &[FilterConfig] {
        match self {
            ReaderConfig::Csv(c) | ReaderConfig::Tsv(c) => &c.filters,
            ReaderConfig::Jsonl(c) => &c.filters,
            ReaderConfig::Json(c) | ReaderConfig::Yaml(c) => &c.filters,
        }
    }

    pub fn row_limit(&self) -> u64 {
        match self {
            ReaderConfig::Csv(c) | ReaderConfig::Tsv(c) => c.row_limit,
            ReaderConfig::Jsonl(c) => c.row_limit,
            ReaderConfig::Json(c) | ReaderConfig::Yaml(c) => c.row_limit,
        }
    }
}

/// `infer` (default), `none` (headers come from `columns`), or a count of
/// lines to skip before the header row.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderDirective {
    Infer,
    None,
    Skip(u32),
}

fn default_delimiter() -> String {
    "\t".to_string()
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Int,
    Float,
    List,
    Bool,
}

/// A single row-filter predicate, discriminated by `filter_code`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "filter_code", rename_all = "snake_case")]
pub enum FilterConfig {
    Gt(ColumnFilter),
    Ge(ColumnFilter),
    Lt(ColumnFilter),
    Le(ColumnFilter),
    Eq(ColumnFilter),
    Ne(ColumnFilter),
    In(ListColumnFilter),
    InExact(ListColumnFilter),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnFilter {
    pub column: String,
    #[serde(default = "default_include")]
    pub inclusion: Polarity,
    pub value: FilterValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListColumnFilter {
    pub column: String,
    #[serde(default = "default_include")]
    pub inclusion: Polarity,
    pub value: Vec<FilterValue>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Include,
    Exclude,
}

fn default_include() -> Polarity {
    Polarity::Include
}

/// A filter literal: can compare numerically or as a string depending on the
/// operator and target column type.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FilterValue {
    Int(i64),
    Float(f64),
    String(String),
}

/// Transform configuration: identifies the user transform module and its
/// auxiliary lookup maps.
#[derive(Debug, Clone, Deserialize)]
pub struct TransformConfig {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub mappings: Vec<String>,
    #[serde(default)]
    pub global_table: Option<String>,
    #[serde(default)]
    pub local_table: Option<String>,
    #[serde(default)]
    pub on_map_failure: OnMapFailure,
    #[serde(default)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OnMapFailure {
    #[default]
    Warning,
    Error,
}

/// A mapping (SSSOM-like lookup) config: a nested transform run whose output
/// is indexed in memory rather than written to disk.
#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    pub name: String,
    pub reader: ReaderConfig,
    #[serde(default)]
    pub transform: Option<TransformConfig>,
    pub key_column: String,
    #[serde(default)]
    pub value_columns: Vec<String>,
}

/// Writer configuration, discriminated by `format`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum WriterConfig {
    Tsv(WriterOptions),
    Jsonl(WriterOptions),
    Passthrough(WriterOptions),
}

#[derive(Debug, Clone, Deserialize)]
pub struct WriterOptions {
    #[serde(default)]
    pub node_properties: Vec<String>,
    #[serde(default)]
    pub edge_properties: Vec<String>,
    #[serde(default)]
    pub min_node_count: Option<u64>,
    #[serde(default)]
    pub min_edge_count: Option<u64>,
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub sssom_config: Option<SssomConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SssomConfig {
    pub files: Vec<String>,
    #[serde(default)]
    pub filter_prefixes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_delimited_reader_with_filters() {
        let yaml = r#"
format: tsv
files: ["nodes.tsv"]
filters:
  - filter_code: eq
    column: category
    value: "biolink:Gene"
  - filter_code: in
    column: xref
    inclusion: exclude
    value: ["FOO:1", "FOO:2"]
"#;
        let cfg: ReaderConfig = serde_yaml::from_str(yaml).unwrap();
        match cfg {
            ReaderConfig::Tsv(d) => assert_eq!(d.filters.len(), 2),
            other => panic!("expected Tsv variant, got {other:?}"),
        }
    }

    #[test]
    fn writer_config_discriminates_on_format() {
        let yaml = "format: jsonl\nnode_properties: [id, category]\n";
        let cfg: WriterConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(cfg, WriterConfig::Jsonl(_)));
    }

    #[test]
    fn transform_config_defaults_on_map_failure_to_warning() {
        let yaml = "module: my_transform\n";
        let cfg: TransformConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.on_map_failure, OnMapFailure::Warning);
    }
}
