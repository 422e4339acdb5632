//! Single-entry zip framing for cache entries, plus atomic file staging.

use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tiletex_fs::{create_utf8_file, ensure_parent_dir, open_utf8_file};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Errors raised while framing or unframing cache entries.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Reading or writing a file failed.
    #[error("archive I/O failed at {path}: {source}")]
    Io {
        /// File being accessed.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// The zip container was malformed.
    #[error("invalid zip container {path}: {source}")]
    Zip {
        /// Archive path.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: ZipError,
    },
    /// The zip container held no entries.
    #[error("zip container {path} is empty")]
    Empty {
        /// Archive path.
        path: Utf8PathBuf,
    },
}

fn io_error(path: &Utf8Path) -> impl Fn(io::Error) -> ArchiveError + '_ {
    move |source| ArchiveError::Io {
        path: path.to_owned(),
        source,
    }
}

fn zip_error(path: &Utf8Path) -> impl Fn(ZipError) -> ArchiveError + '_ {
    move |source| ArchiveError::Zip {
        path: path.to_owned(),
        source,
    }
}

/// Create a temporary file next to `destination` for later [`publish`].
pub fn stage_beside(destination: &Utf8Path) -> io::Result<NamedTempFile> {
    ensure_parent_dir(destination)?;
    let dir = destination
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    tempfile::Builder::new()
        .prefix(".tiletex-")
        .suffix(".part")
        .tempfile_in(dir)
}

/// Atomically rename a staged file to `destination`, replacing it.
pub fn publish(staged: NamedTempFile, destination: &Utf8Path) -> io::Result<()> {
    staged
        .persist(destination.as_std_path())
        .map(drop)
        .map_err(|err| err.error)
}

/// Deflate `source` into a single-entry archive at `archive`.
///
/// Returns the uncompressed byte count.
pub fn compress_file(
    source: &Utf8Path,
    archive: &Utf8Path,
    entry_name: &str,
) -> Result<u64, ArchiveError> {
    let mut input = open_utf8_file(source).map_err(io_error(source))?.into_std();
    let output = create_utf8_file(archive)
        .map_err(io_error(archive))?
        .into_std();
    let mut writer = ZipWriter::new(output);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer
        .start_file(entry_name, options)
        .map_err(zip_error(archive))?;
    let written = io::copy(&mut input, &mut writer).map_err(io_error(archive))?;
    let mut output = writer.finish().map_err(zip_error(archive))?;
    output.flush().map_err(io_error(archive))?;
    Ok(written)
}

/// Restore the first entry of `archive` to `destination`.
///
/// The entry is staged beside `destination` and renamed into place, so a
/// concurrent reader sees either the old file or the complete new one.
pub fn extract_single(archive: &Utf8Path, destination: &Utf8Path) -> Result<u64, ArchiveError> {
    let input = open_utf8_file(archive).map_err(io_error(archive))?.into_std();
    let mut container = ZipArchive::new(input).map_err(zip_error(archive))?;
    if container.is_empty() {
        return Err(ArchiveError::Empty {
            path: archive.to_owned(),
        });
    }
    let mut entry = container.by_index(0).map_err(zip_error(archive))?;
    let mut staged = stage_beside(destination).map_err(io_error(destination))?;
    let written = io::copy(&mut entry, &mut staged).map_err(io_error(destination))?;
    staged.flush().map_err(io_error(destination))?;
    publish(staged, destination).map_err(io_error(destination))?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::fs;

    #[fixture]
    fn workspace() -> (tempfile::TempDir, Utf8PathBuf) {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8");
        (temp, root)
    }

    #[rstest]
    fn extract_restores_compressed_bytes(workspace: (tempfile::TempDir, Utf8PathBuf)) {
        let (_temp, root) = workspace;
        let source = root.join("osm-key.xml");
        let body = "<osm>".to_owned() + &"<node id=\"1\" lat=\"0\" lon=\"0\"/>".repeat(200) + "</osm>";
        fs::write(&source, &body).expect("write source");
        let archive = root.join("cache/osm-key.xml.zip");
        let written = compress_file(&source, &archive, "osm-key.xml").expect("compress");
        assert_eq!(written, body.len() as u64);
        assert!(fs::metadata(&archive).expect("stat").len() < written);

        let restored = root.join("work/osm-key.xml");
        extract_single(&archive, &restored).expect("extract");
        assert_eq!(fs::read_to_string(&restored).expect("read"), body);
    }

    #[rstest]
    fn extract_rejects_non_zip_input(workspace: (tempfile::TempDir, Utf8PathBuf)) {
        let (_temp, root) = workspace;
        let bogus = root.join("bogus.zip");
        fs::write(&bogus, b"not a zip").expect("write");
        let err = extract_single(&bogus, &root.join("out.xml")).expect_err("invalid zip");
        assert!(matches!(err, ArchiveError::Zip { .. }), "got {err:?}");
        assert!(!root.join("out.xml").exists());
    }

    #[rstest]
    fn publish_replaces_existing_destination(workspace: (tempfile::TempDir, Utf8PathBuf)) {
        let (_temp, root) = workspace;
        let destination = root.join("entry.xml");
        fs::write(&destination, b"old").expect("write");
        let mut staged = stage_beside(&destination).expect("stage");
        staged.write_all(b"new").expect("write staged");
        publish(staged, &destination).expect("publish");
        assert_eq!(fs::read(&destination).expect("read"), b"new");
    }
}
