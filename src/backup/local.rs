//! # Local Output
//!
//! Writes an artifact to a local file or stdout for `export`.

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::SerializationError;

/// Write `artifact` to `path`, or to stdout when `path` is `-`
///
/// Files are written to a temporary sibling first and renamed into place, so a
/// reader never observes a partially written key.
///
/// # Errors
///
/// [`SerializationError::Io`] when the file cannot be created, written or renamed.
pub fn write_local(path: &Path, artifact: &[u8]) -> Result<(), SerializationError> {
    if path == Path::new("-") {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(artifact)?;
        stdout.flush()?;
        return Ok(());
    }

    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(artifact)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;

    info!(path = %path.display(), bytes = artifact.len(), "Key exported to local file");
    Ok(())
}
