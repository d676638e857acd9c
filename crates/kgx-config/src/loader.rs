//! A YAML loader with two behaviors the stock `serde_yaml` parser doesn't
//! give you for free: rejecting duplicate mapping keys, and resolving
//! `!include <path>` tags by recursively loading the referenced file
//! through this same loader.

use kgx_model::{Error, Result};
use std::fs;
use std::path::Path;

const INCLUDE_TAG: &str = "include";

/// Loads a YAML document from `path`, checking for duplicate keys and
/// resolving `!include` tags relative to `path`'s directory.
pub fn load_yaml(path: &Path) -> Result<serde_yaml::Value> {
    tracing::debug!(path = %path.display(), "loading YAML config");
    let text = fs::read_to_string(path)
        .map_err(|e| Error::io(format!("failed to read config file {}: {e}", path.display())).with_source(e))?;
    load_yaml_str(&text, path)
}

fn load_yaml_str(text: &str, path: &Path) -> Result<serde_yaml::Value> {
    check_duplicate_keys(text, path)?;

    let mut value: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| {
        Error::config(format!("failed to parse YAML in {}: {e}", path.display())).with_source(e)
    })?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    resolve_includes(&mut value, base_dir)?;
    Ok(value)
}

/// Deserializes an already-resolved YAML [`serde_yaml::Value`] into a typed
/// configuration object.
pub fn load_yaml_as<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let value = load_yaml(path)?;
    serde_yaml::from_value(value)
        .map_err(|e| Error::config(format!("invalid config in {}: {e}", path.display())).with_source(e))
}

fn resolve_includes(value: &mut serde_yaml::Value, base_dir: &Path) -> Result<()> {
    match value {
        serde_yaml::Value::Tagged(tagged) if tagged.tag == serde_yaml::value::Tag::new(INCLUDE_TAG) => {
            let rel_path = tagged
                .value
                .as_str()
                .ok_or_else(|| Error::config("!include tag must contain a string path"))?;
            let included_path = base_dir.join(rel_path);
            *value = load_yaml(&included_path)?;
        }
        serde_yaml::Value::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                resolve_includes(v, base_dir)?;
            }
        }
        serde_yaml::Value::Sequence(seq) => {
            for v in seq.iter_mut() {
                resolve_includes(v, base_dir)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// A zero-sized probe type whose only job is to walk the YAML event stream
/// and fail if any mapping repeats a key. We deserialize into it once,
/// purely for the side effect, before deserializing into the real
/// [`serde_yaml::Value`] tree.
struct DuplicateKeyCheck;

impl<'de> serde::de::Deserialize<'de> for DuplicateKeyCheck {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        deserializer.deserialize_any(DuplicateKeyVisitor).map(|_| DuplicateKeyCheck)
    }
}

struct DuplicateKeyVisitor;

impl<'de> serde::de::Visitor<'de> for DuplicateKeyVisitor {
    type Value = ();

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("any YAML value")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<(), A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut seen = std::collections::HashSet::new();
        while let Some(key) = map.next_key::<serde_yaml::Value>()? {
            let repr = format!("{key:?}");
            if !seen.insert(repr.clone()) {
                return Err(serde::de::Error::custom(format!(
                    "duplicate key found in mapping: {repr}"
                )));
            }
            map.next_value::<DuplicateKeyCheck>()?;
        }
        Ok(())
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<(), A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        while seq.next_element::<DuplicateKeyCheck>()?.is_some() {}
        Ok(())
    }

    fn visit_bool<E>(self, _v: bool) -> std::result::Result<(), E>
    where
        E: serde::de::Error,
    {
        Ok(())
    }
    fn visit_i64<E>(self, _v: i64) -> std::result::Result<(), E>
    where
        E: serde::de::Error,
    {
        Ok(())
    }
    fn visit_u64<E>(self, _v: u64) -> std::result::Result<(), E>
    where
        E: serde::de::Error,
    {
        Ok(())
    }
    fn visit_f64<E>(self, _v: f64) -> std::result::Result<(), E>
    where
        E: serde::de::Error,
    {
        Ok(())
    }
    fn visit_str<E>(self, _v: &str) -> std::result::Result<(), E>
    where
        E: serde::de::Error,
    {
        Ok(())
    }
    fn visit_string<E>(self, _v: String) -> std::result::Result<(), E>
    where
        E: serde::de::Error,
    {
        Ok(())
    }
    fn visit_none<E>(self) -> std::result::Result<(), E>
    where
        E: serde::de::Error,
    {
        Ok(())
    }
    fn visit_some<D>(self, deserializer: D) -> std::result::Result<(), D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
    fn visit_unit<E>(self) -> std::result::Result<(), E>
    where
        E: serde::de::Error,
    {
        Ok(())
    }
}

fn check_duplicate_keys(text: &str, path: &Path) -> Result<()> {
    serde_yaml::from_str::<DuplicateKeyCheck>(text)
        .map(|_| ())
        .map_err(|e| Error::config(format!("duplicate key in {}: {e}", path.display())).with_source(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn rejects_duplicate_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp(&dir, "dup.yaml", "a: 1\nb: 2\na: 3\n");
        let err = load_yaml(&path).unwrap_err();
        assert_eq!(err.kind, kgx_model::ErrorKind::Config);
    }

    #[test]
    fn resolves_include_tags_recursively() {
        let dir = tempfile::tempdir().unwrap();
        write_tmp(&dir, "inner.yaml", "x: 1\ny: 2\n");
        let outer = write_tmp(&dir, "outer.yaml", "nested: !include inner.yaml\ntop: 3\n");

        let value = load_yaml(&outer).unwrap();
        let nested = value.get("nested").unwrap();
        assert_eq!(nested.get("x").unwrap().as_i64(), Some(1));
        assert_eq!(value.get("top").unwrap().as_i64(), Some(3));
    }

    #[test]
    fn accepts_non_duplicate_nested_mappings() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tmp(&dir, "ok.yaml", "a:\n  x: 1\n  y: 2\nb:\n  x: 3\n");
        assert!(load_yaml(&path).is_ok());
    }
}
