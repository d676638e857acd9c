//! Uniform access to local/remote, compressed, or archive-packed byte
//! streams. Every resource comes back as one or more named, readable text
//! streams so the rest of the pipeline never has to think about where the
//! bytes actually came from.

use kgx_model::{Error, Result};
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// A compression format detected or declared for a single-stream resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
}

/// One named, readable stream. `name` is used for diagnostics and for
/// deriving output file stems.
pub struct NamedStream {
    pub name: String,
    pub reader: Box<dyn Read>,
}

/// The result of opening a resource: either a single stream, or an archive
/// exposing many named member streams.
pub enum Resource {
    Single(NamedStream),
    Archive {
        archive_name: String,
        members: Vec<NamedStream>,
    },
}

/// Checks for a magic number at the start of `prefix` and returns the
/// corresponding compression, if recognized. Gzip is the two-byte `1f 8b`;
/// zip archives are the four-byte `50 4b 03 04`, checked here only so the
/// caller can route to archive handling instead of gzip decoding.
pub fn detect_compression(prefix: &[u8]) -> Option<Compression> {
    if prefix.starts_with(&[0x1f, 0x8b]) {
        Some(Compression::Gzip)
    } else {
        None
    }
}

fn is_zip_magic(prefix: &[u8]) -> bool {
    prefix.starts_with(&[0x50, 0x4b, 0x03, 0x04])
}

fn file_stem(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Opens `location` (a local path or an `http(s)://` URL), yielding a single
/// stream or an archive's member streams. `compression_hint` overrides
/// sniffing when the caller already knows the format.
pub fn open(location: &str, compression_hint: Option<Compression>) -> Result<Resource> {
    let local_path = if location.starts_with("http://") || location.starts_with("https://") {
        fetch_remote(location)?
    } else {
        PathBuf::from(location)
    };

    if !local_path.exists() {
        return Err(Error::io(format!("no such file or directory: {}", local_path.display())));
    }

    let ext = local_path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let lower_name = local_path.to_string_lossy().to_lowercase();

    if ext == "zip" {
        return open_zip(&local_path);
    }
    if ext == "tar" {
        return open_tar(&local_path, false);
    }
    if lower_name.ends_with(".tar.gz") || lower_name.ends_with(".tgz") {
        return open_tar(&local_path, true);
    }

    let mut file = File::open(&local_path)?;
    let mut prefix = [0u8; 4];
    let n = file.read(&mut prefix)?;
    file.seek(SeekFrom::Start(0))?;

    if is_zip_magic(&prefix[..n]) {
        return open_zip(&local_path);
    }

    let compression = compression_hint.unwrap_or_else(|| detect_compression(&prefix[..n]).unwrap_or(Compression::None));
    tracing::debug!(path = %local_path.display(), ?compression, "opened resource");

    let reader: Box<dyn Read> = match compression {
        Compression::Gzip => Box::new(flate2::read::GzDecoder::new(file)),
        Compression::None => Box::new(file),
    };

    Ok(Resource::Single(NamedStream {
        name: file_stem(&local_path),
        reader,
    }))
}

fn fetch_remote(url: &str) -> Result<PathBuf> {
    tracing::info!(url, "fetching remote resource");
    let response = reqwest::blocking::get(url)
        .map_err(|e| Error::network(format!("failed to fetch {url}: {e}")).with_source(e))?;
    if !response.status().is_success() {
        return Err(Error::network(format!(
            "fetching {url} returned non-2xx status {}",
            response.status()
        )));
    }
    let bytes = response
        .bytes()
        .map_err(|e| Error::network(format!("failed to read response body for {url}: {e}")).with_source(e))?;

    let mut tmp = tempfile::NamedTempFile::new()?;
    std::io::Write::write_all(&mut tmp, &bytes)?;
    let (_, path) = tmp.keep().map_err(|e| Error::io(format!("failed to persist downloaded file: {e}")))?;
    Ok(path)
}

fn open_zip(path: &Path) -> Result<Resource> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::io(format!("failed to open zip archive {}: {e}", path.display())))?;

    let mut members = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::io(format!("failed to read zip entry {i} in {}: {e}", path.display())))?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf)?;
        members.push(NamedStream {
            name,
            reader: Box::new(Cursor::new(buf)),
        });
    }

    Ok(Resource::Archive {
        archive_name: file_stem(path),
        members,
    })
}

fn open_tar(path: &Path, gzipped: bool) -> Result<Resource> {
    let file = File::open(path)?;
    let reader: Box<dyn Read> = if gzipped {
        Box::new(flate2::read::GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    let mut archive = tar::Archive::new(reader);

    let mut members = Vec::new();
    for entry in archive
        .entries()
        .map_err(|e| Error::io(format!("failed to read tar archive {}: {e}", path.display())))?
    {
        let mut entry = entry.map_err(|e| Error::io(format!("failed to read tar entry in {}: {e}", path.display())))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry
            .path()
            .map_err(|e| Error::io(format!("invalid tar entry path in {}: {e}", path.display())))?
            .to_string_lossy()
            .into_owned();
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf)?;
        members.push(NamedStream {
            name,
            reader: Box::new(Cursor::new(buf)),
        });
    }

    Ok(Resource::Archive {
        archive_name: file_stem(path),
        members,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn detects_gzip_magic() {
        assert_eq!(detect_compression(&[0x1f, 0x8b, 0x08]), Some(Compression::Gzip));
        assert_eq!(detect_compression(b"plain text"), None);
    }

    #[test]
    fn opens_plain_local_file_as_single_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.tsv");
        std::fs::File::create(&path).unwrap().write_all(b"id\tcategory\n").unwrap();

        let resource = open(path.to_str().unwrap(), None).unwrap();
        match resource {
            Resource::Single(stream) => assert_eq!(stream.name, "nodes.tsv"),
            _ => panic!("expected a single stream"),
        }
    }

    #[test]
    fn missing_file_fails_with_io_error() {
        let err = open("/no/such/path.tsv", None).unwrap_err();
        assert_eq!(err.kind, kgx_model::ErrorKind::Io);
    }
}
