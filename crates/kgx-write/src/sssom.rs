//! Opt-in SSSOM identifier rewriting applied by writers before an edge hits
//! disk: if a configured mapping's `object_id` matches the edge's subject
//! or object, substitute the mapping's `subject_id` and preserve the prior
//! value under `original_subject`/`original_object`.

use kgx_model::{Error, Record, Result, Value};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;

/// An in-memory `object_id -> subject_id` lookup built from one or more
/// SSSOM TSV files. SSSOM files carry a YAML-style `#`-prefixed header
/// comment block that must be skipped before the tab-delimited body.
pub struct SssomRewriter {
    by_object_id: HashMap<String, String>,
}

impl SssomRewriter {
    /// Loads `files`, optionally restricting entries to those whose
    /// `object_id` starts with one of `filter_prefixes` (empty = no filter).
    pub fn load(files: &[String], filter_prefixes: &[String]) -> Result<SssomRewriter> {
        let mut by_object_id = HashMap::new();

        for path in files {
            let mut text = String::new();
            File::open(path)
                .map_err(|e| Error::io(format!("failed to open SSSOM file {path}: {e}")).with_source(e))?
                .read_to_string(&mut text)?;

            let mut builder = csv::ReaderBuilder::new();
            builder.delimiter(b'\t').comment(Some(b'#')).has_headers(true);
            let mut reader = builder.from_reader(text.as_bytes());

            let headers = reader
                .headers()
                .map_err(|e| Error::parse(format!("failed to read SSSOM header in {path}: {e}")))?
                .clone();

            for record in reader.records() {
                let record = record.map_err(|e| Error::parse(format!("malformed SSSOM row in {path}: {e}")))?;
                let mut row = HashMap::new();
                for (name, value) in headers.iter().zip(record.iter()) {
                    row.insert(name, value);
                }
                let (Some(object_id), Some(subject_id)) = (row.get("object_id"), row.get("subject_id")) else {
                    continue;
                };
                if !filter_prefixes.is_empty() && !filter_prefixes.iter().any(|p| object_id.starts_with(p.as_str())) {
                    continue;
                }
                by_object_id.insert(object_id.to_string(), subject_id.to_string());
            }
        }

        Ok(SssomRewriter { by_object_id })
    }

    /// Rewrites `edge`'s `subject`/`object` in place when a mapping applies,
    /// recording the pre-rewrite value in `original_subject`/`original_object`.
    pub fn apply(&self, edge: &mut Record) {
        self.rewrite_field(edge, "subject", "original_subject");
        self.rewrite_field(edge, "object", "original_object");
    }

    fn rewrite_field(&self, edge: &mut Record, field: &str, original_field: &str) {
        let Some(current) = edge.get(field).and_then(Value::as_str).map(str::to_string) else {
            return;
        };
        let Some(replacement) = self.by_object_id.get(&current) else {
            return;
        };
        if replacement == &current {
            return;
        }
        edge.insert(original_field, current.clone());
        edge.insert(field, replacement.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_sssom(dir: &tempfile::TempDir, name: &str, rows: &[(&str, &str)]) -> String {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        writeln!(f, "# SSSOM metadata\nsubject_id\tpredicate_id\tobject_id\tmapping_justification").unwrap();
        for (subject, object) in rows {
            writeln!(f, "{subject}\tskos:exactMatch\t{object}\tsemapv:ManualMappingCuration").unwrap();
        }
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn rewrites_subject_and_records_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sssom(&dir, "mapping.sssom.tsv", &[("NCBIGene:1", "ENSEMBL:X")]);

        let rewriter = SssomRewriter::load(&[path], &[]).unwrap();
        let mut edge = Record::new();
        edge.insert("subject", "ENSEMBL:X");
        edge.insert("predicate", "biolink:related_to");
        edge.insert("object", "HGNC:1");

        rewriter.apply(&mut edge);
        assert_eq!(edge.get("subject").unwrap().as_str(), Some("NCBIGene:1"));
        assert_eq!(edge.get("original_subject").unwrap().as_str(), Some("ENSEMBL:X"));
    }

    #[test]
    fn leaves_unmapped_identifiers_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sssom(&dir, "mapping.sssom.tsv", &[("NCBIGene:1", "ENSEMBL:X")]);
        let rewriter = SssomRewriter::load(&[path], &[]).unwrap();

        let mut edge = Record::new();
        edge.insert("subject", "HGNC:999");
        edge.insert("predicate", "biolink:related_to");
        edge.insert("object", "HGNC:1");
        rewriter.apply(&mut edge);
        assert_eq!(edge.get("subject").unwrap().as_str(), Some("HGNC:999"));
        assert!(edge.get("original_subject").is_none());
    }
}
