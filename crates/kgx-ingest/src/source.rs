//! Composes the resource opener, format readers, and row filter into one
//! concatenated, filtered record stream over every file a `reader` config
//! declares. This is the `D` component: expand globs, open each resource,
//! apply filters, track progress, honor an overall row limit.

use crate::opener::{self, Resource};
use crate::reader::{DelimitedReader, JsonlReader, RecordReader, StructuredReader};
use crate::reader::structured::DocumentFormat;
use crate::filter::RowFilter;
use indicatif::{ProgressBar, ProgressStyle};
use kgx_config::ReaderConfig;
use kgx_model::{Error, Record, Result};
use std::io::BufRead;
use std::path::{Path, PathBuf};

const PROGRESS_BAR_TEMPLATE: &str = "{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}";

/// Expands `pattern` relative to `base_dir` using glob semantics. A pattern
/// that matches nothing is passed through literally (as a single-element
/// result) so that opening it downstream produces a precise `IO` error
/// instead of the pattern silently vanishing.
pub fn expand_glob(pattern: &str, base_dir: Option<&Path>) -> Vec<PathBuf> {
    let resolved = match base_dir {
        Some(dir) if !Path::new(pattern).is_absolute() => dir.join(pattern),
        _ => PathBuf::from(pattern),
    };
    let resolved_str = resolved.to_string_lossy().into_owned();

    match glob::glob(&resolved_str) {
        Ok(paths) => {
            let mut matches: Vec<PathBuf> = paths.filter_map(std::result::Result::ok).collect();
            matches.sort();
            if matches.is_empty() {
                vec![resolved]
            } else {
                matches
            }
        }
        Err(_) => vec![resolved],
    }
}

/// A concatenated, filtered stream of records over every resource a reader
/// config names. Readers are iterated in declared order; the row filter is
/// applied before a record is yielded; an overall `row_limit` stops the
/// stream mid-iteration and drops the remaining unopened readers.
pub struct Source {
    pending: Vec<PathBuf>,
    archive_members: Option<Vec<opener::NamedStream>>,
    current: Option<Box<dyn RecordReader>>,
    config: ReaderConfig,
    filter: RowFilter,
    row_limit: u64,
    emitted: u64,
    last_row: u64,
    current_name: Option<String>,
    progress: Option<ProgressBar>,
}

impl Source {
    /// Builds a `Source` over every file the reader config names, resolving
    /// globs relative to `base_dir` (the config's own `base_dir`, if set,
    /// takes precedence over the caller-supplied directory).
    pub fn open(config: ReaderConfig, base_dir: Option<&Path>) -> Result<Source> {
        Source::open_inner(config, base_dir, false)
    }

    /// Like [`Source::open`], but for delimited and JSONL readers over
    /// plain local files, pre-counts lines so a progress bar can report a
    /// known total as records are emitted. Archive members, remote
    /// resources, and JSON/YAML readers fall back to an indeterminate
    /// spinner since their record count can't be known without fully
    /// decoding them first.
    pub fn open_with_progress(config: ReaderConfig, base_dir: Option<&Path>) -> Result<Source> {
        Source::open_inner(config, base_dir, true)
    }

    fn open_inner(config: ReaderConfig, base_dir: Option<&Path>, show_progress: bool) -> Result<Source> {
        let effective_base = config.base_dir().map(Path::new).or(base_dir);

        let mut pending = Vec::new();
        let mut archive_members = None;

        if let Some(archive_path) = config.file_archive() {
            let resource = opener::open(archive_path, None)?;
            match resource {
                Resource::Archive { members, .. } => {
                    let names: Vec<String> = config.files().to_vec();
                    let filtered = if names.is_empty() {
                        members
                    } else {
                        members.into_iter().filter(|m| names.contains(&m.name)).collect()
                    };
                    archive_members = Some(filtered);
                }
                Resource::Single(stream) => {
                    archive_members = Some(vec![stream]);
                }
            }
        } else {
            for pattern in config.files() {
                pending.extend(expand_glob(pattern, effective_base));
            }
        }

        let filter = RowFilter::new(config.filters());
        let row_limit = config.row_limit();

        let progress = if show_progress {
            build_progress_bar(&config, &pending)
        } else {
            None
        };

        Ok(Source {
            pending,
            archive_members,
            current: None,
            config,
            filter,
            row_limit,
            emitted: 0,
            last_row: 0,
            current_name: None,
            progress,
        })
    }

    pub fn last_row(&self) -> u64 {
        self.current.as_ref().map(|r| r.last_row()).unwrap_or(self.last_row)
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current_name.as_deref()
    }

    fn advance_reader(&mut self) -> Result<bool> {
        if let Some(members) = self.archive_members.as_mut() {
            if members.is_empty() {
                return Ok(false);
            }
            let member = members.remove(0);
            self.current_name = Some(member.name.clone());
            self.current = Some(build_reader(&self.config, member.reader)?);
            return Ok(true);
        }

        if self.pending.is_empty() {
            return Ok(false);
        }
        let path = self.pending.remove(0);
        if !path.exists() {
            return Err(Error::io(format!("no such file or directory: {}", path.display())));
        }
        let resource = opener::open(path.to_str().unwrap_or_default(), None)?;
        match resource {
            Resource::Single(stream) => {
                self.current_name = Some(stream.name.clone());
                self.current = Some(build_reader(&self.config, stream.reader)?);
            }
            Resource::Archive { mut members, .. } => {
                if members.is_empty() {
                    self.current = None;
                } else {
                    let member = members.remove(0);
                    self.current_name = Some(member.name.clone());
                    self.current = Some(build_reader(&self.config, member.reader)?);
                    let mut rest = members;
                    rest.reverse();
                    for m in rest {
                        self.pending.insert(0, PathBuf::from(m.name));
                    }
                }
            }
        }
        Ok(true)
    }
}

/// Counts lines (best-effort) in every plain, uncompressed local file a
/// delimited or JSONL reader config names, for a progress bar's total. JSON
/// and YAML readers, archives, and remote resources get an indeterminate
/// spinner instead, since a line count wouldn't correspond to a record count.
fn build_progress_bar(config: &ReaderConfig, pending: &[PathBuf]) -> Option<ProgressBar> {
    let countable = matches!(config, ReaderConfig::Csv(_) | ReaderConfig::Tsv(_) | ReaderConfig::Jsonl(_));
    let style = ProgressStyle::with_template(PROGRESS_BAR_TEMPLATE).ok();

    if !countable || pending.is_empty() {
        let pb = ProgressBar::new_spinner();
        pb.set_message("reading records");
        return Some(pb);
    }

    let mut total: u64 = 0;
    for path in pending {
        match count_lines(path) {
            Some(n) => total += n,
            None => {
                let pb = ProgressBar::new_spinner();
                pb.set_message("reading records");
                return Some(pb);
            }
        }
    }

    let has_header = !matches!(config, ReaderConfig::Jsonl(_));
    if has_header {
        total = total.saturating_sub(pending.len() as u64);
    }

    let pb = ProgressBar::new(total);
    if let Some(style) = style {
        pb.set_style(style);
    }
    pb.set_message("reading records");
    Some(pb)
}

fn count_lines(path: &Path) -> Option<u64> {
    use std::io::Read;

    let ext = path.extension().map(|e| e.to_string_lossy().to_lowercase()).unwrap_or_default();
    if matches!(ext.as_str(), "gz" | "zip" | "tar" | "tgz") {
        return None;
    }

    let mut file = std::fs::File::open(path).ok()?;
    let mut prefix = [0u8; 2];
    let n = file.read(&mut prefix).ok()?;
    if opener::detect_compression(&prefix[..n]).is_some() {
        return None;
    }

    let file = std::fs::File::open(path).ok()?;
    Some(std::io::BufReader::new(file).lines().count() as u64)
}

fn build_reader(config: &ReaderConfig, stream: Box<dyn std::io::Read>) -> Result<Box<dyn RecordReader>> {
    let reader: Box<dyn RecordReader> = match config {
        ReaderConfig::Csv(c) | ReaderConfig::Tsv(c) => Box::new(DelimitedReader::new(stream, c)?),
        ReaderConfig::Jsonl(c) => Box::new(JsonlReader::new(stream, c)),
        ReaderConfig::Json(c) => Box::new(StructuredReader::new(stream, c, DocumentFormat::Json)?),
        ReaderConfig::Yaml(c) => Box::new(StructuredReader::new(stream, c, DocumentFormat::Yaml)?),
    };
    Ok(reader)
}

impl Iterator for Source {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.row_limit != 0 && self.emitted >= self.row_limit {
                self.current = None;
                self.pending.clear();
                if let Some(members) = self.archive_members.as_mut() {
                    members.clear();
                }
                if let Some(pb) = &self.progress {
                    pb.finish_with_message("done");
                }
                return None;
            }

            if self.current.is_none() {
                match self.advance_reader() {
                    Ok(true) => continue,
                    Ok(false) => {
                        if let Some(pb) = &self.progress {
                            pb.finish_with_message("done");
                        }
                        return None;
                    }
                    Err(e) => return Some(Err(e)),
                }
            }

            let reader = self.current.as_mut().unwrap();
            match reader.next() {
                Some(Ok(record)) => {
                    self.last_row = reader.last_row();
                    if self.filter.keep(&record) {
                        self.emitted += 1;
                        if let Some(pb) = &self.progress {
                            pb.inc(1);
                        }
                        return Some(Ok(record));
                    }
                }
                Some(Err(e)) => {
                    self.last_row = reader.last_row();
                    return Some(Err(e.at_row(self.last_row)));
                }
                None => {
                    self.last_row = reader.last_row();
                    self.current = None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::File::create(&path).unwrap().write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn glob_expands_sorted_and_passes_through_zero_matches_literally() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir, "entity_0.yaml", "id: A\n");
        write_file(&dir, "entity_1.yaml", "id: B\n");

        let matched = expand_glob("entity_*.yaml", Some(dir.path()));
        assert_eq!(matched.len(), 2);
        assert!(matched[0].to_string_lossy().contains("entity_0"));

        let unmatched = expand_glob("nope_*.yaml", Some(dir.path()));
        assert_eq!(unmatched.len(), 1);
        assert!(unmatched[0].to_string_lossy().contains("nope_"));
    }

    #[test]
    fn source_concatenates_multiple_files_in_declared_order() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir, "a.jsonl", "{\"id\":\"A\"}\n");
        write_file(&dir, "b.jsonl", "{\"id\":\"B\"}\n");

        let config: ReaderConfig = serde_yaml::from_str(&format!(
            "format: jsonl\nfiles: [\"{}\", \"{}\"]\n",
            dir.path().join("a.jsonl").display(),
            dir.path().join("b.jsonl").display(),
        ))
        .unwrap();

        let source = Source::open(config, None).unwrap();
        let records: Vec<_> = source.collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("id").unwrap().as_str(), Some("A"));
        assert_eq!(records[1].get("id").unwrap().as_str(), Some("B"));
    }

    #[test]
    fn row_limit_stops_the_stream_mid_iteration() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir, "many.jsonl", "{\"id\":\"A\"}\n{\"id\":\"B\"}\n{\"id\":\"C\"}\n");

        let config: ReaderConfig = serde_yaml::from_str(&format!(
            "format: jsonl\nfiles: [\"{}\"]\nrow_limit: 2\n",
            dir.path().join("many.jsonl").display(),
        ))
        .unwrap();

        let source = Source::open(config, None).unwrap();
        let records: Vec<_> = source.collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn missing_file_fails_with_io_error() {
        let config: ReaderConfig = serde_yaml::from_str("format: jsonl\nfiles: [\"/no/such/file.jsonl\"]\n").unwrap();
        let mut source = Source::open(config, None).unwrap();
        let err = source.next().unwrap().unwrap_err();
        assert_eq!(err.kind, kgx_model::ErrorKind::Io);
    }

    #[test]
    fn empty_file_yields_zero_records_without_error() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir, "empty.jsonl", "");

        let config: ReaderConfig = serde_yaml::from_str(&format!(
            "format: jsonl\nfiles: [\"{}\"]\n",
            dir.path().join("empty.jsonl").display(),
        ))
        .unwrap();

        let source = Source::open(config, None).unwrap();
        let records: Vec<_> = source.collect::<Result<_>>().unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn progress_bar_counts_lines_minus_header_for_delimited_sources() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir, "genes.tsv", "id\tname\nHGNC:1\tBRCA1\nHGNC:2\tBRCA2\n");

        let config: ReaderConfig = serde_yaml::from_str(&format!(
            "format: tsv\nfiles: [\"{}\"]\n",
            dir.path().join("genes.tsv").display(),
        ))
        .unwrap();

        let source = Source::open_with_progress(config, None).unwrap();
        let pb = source.progress.as_ref().unwrap();
        assert_eq!(pb.length(), Some(2));

        let records: Vec<_> = source.collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 2);
    }
}
