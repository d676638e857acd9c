//! The object every user transform entry point receives: `write`,
//! `lookup`, `log`, the resolved `mappings` tree, and an opaque `state`
//! scratchpad that survives across rows within one run.

use crate::mapping::Mappings;
use kgx_config::OnMapFailure;
use kgx_model::{Error, Record, Result};
use kgx_write::Writer;
use tracing::Level;

/// The full per-run context handed to a user transform's entry point.
/// Borrows the writer and the resolved mapping tables rather than owning
/// them, since both are shared with the runtime driving iteration.
pub struct TransformContext<'a> {
    writer: &'a mut dyn Writer,
    mappings: &'a Mappings,
    state: serde_json::Map<String, serde_json::Value>,
    on_map_failure: OnMapFailure,
}

impl<'a> TransformContext<'a> {
    pub fn new(writer: &'a mut dyn Writer, mappings: &'a Mappings, on_map_failure: OnMapFailure) -> TransformContext<'a> {
        TransformContext {
            writer,
            mappings,
            state: serde_json::Map::new(),
            on_map_failure,
        }
    }

    /// Forwards every record in `records` to the configured writer.
    pub fn write(&mut self, records: impl IntoIterator<Item = Record>) -> Result<()> {
        for record in records {
            self.writer.write_record(record)?;
        }
        Ok(())
    }

    /// Resolves `key` through `map_name`'s mapping table (or every
    /// configured map, in declaration order, when `map_name` is `None`),
    /// reading the `map_column` value of the first matching entry.
    ///
    /// A miss is either passed through unchanged (warning policy, the
    /// default) or raised as a `MAPPING` error, per the transform config's
    /// `on_map_failure`.
    pub fn lookup(&self, key: &str, map_column: &str, map_name: Option<&str>) -> Result<String> {
        let tables: Vec<&String> = match map_name {
            Some(name) => vec![self
                .mappings
                .keys()
                .find(|k| k.as_str() == name)
                .ok_or_else(|| Error::mapping(format!("no mapping named '{name}' is configured")))?],
            None => self.mappings.keys().collect(),
        };

        for name in tables {
            if let Some(table) = self.mappings.get(name) {
                if let Some(row) = table.get(key) {
                    if let Some(value) = row.get(map_column) {
                        return Ok(value.flatten("|"));
                    }
                }
            }
        }

        match self.on_map_failure {
            OnMapFailure::Warning => {
                tracing::warn!(key, map_column, map_name, "lookup miss; passing key through unchanged");
                Ok(key.to_string())
            }
            OnMapFailure::Error => Err(Error::mapping(format!(
                "lookup failed: no mapping resolved key '{key}' via column '{map_column}'"
            ))),
        }
    }

    /// Structured logging at the given level, tagged the same way every
    /// other component in this workspace tags its events.
    pub fn log(&self, message: &str, level: Level) {
        match level {
            Level::ERROR => tracing::error!(target: "kgx_transform::user", "{message}"),
            Level::WARN => tracing::warn!(target: "kgx_transform::user", "{message}"),
            Level::INFO => tracing::info!(target: "kgx_transform::user", "{message}"),
            Level::DEBUG => tracing::debug!(target: "kgx_transform::user", "{message}"),
            Level::TRACE => tracing::trace!(target: "kgx_transform::user", "{message}"),
        }
    }

    pub fn mappings(&self) -> &Mappings {
        self.mappings
    }

    pub fn state(&mut self) -> &mut serde_json::Map<String, serde_json::Value> {
        &mut self.state
    }

    pub(crate) fn finalize_writer(&mut self) -> Result<()> {
        self.writer.finalize()
    }
}
