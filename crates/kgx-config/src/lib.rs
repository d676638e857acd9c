//! Configuration loading: YAML parsing with duplicate-key rejection and
//! `!include` resolution, plus the typed configuration objects every other
//! crate in the workspace deserializes into.

mod config;
mod loader;

pub use config::{
    ColumnFilter, ColumnType, DelimitedReaderConfig, FilterConfig, FilterValue, HeaderDirective,
    JsonPathSegment, ListColumnFilter, MapConfig, OnMapFailure, PathedReaderConfig, Polarity,
    ReaderConfig, RecordReaderConfig, SourceConfig, SssomConfig, TransformConfig, WriterConfig,
    WriterOptions,
};
pub use loader::{load_yaml, load_yaml_as};

use std::path::Path;

/// Loads and validates a top-level source configuration from `path`.
pub fn load_config(path: impl AsRef<Path>) -> kgx_model::Result<SourceConfig> {
    load_yaml_as(path.as_ref())
}
