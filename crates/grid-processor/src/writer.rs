//! All-or-nothing file output.
//!
//! Content goes to a temporary file in the destination directory and is
//! renamed over the target only after it has been fully written, so a failed
//! render never leaves a truncated artifact behind.

use std::io::{BufWriter, Write};
use std::path::Path;

use raster_common::RenderResult;
use tempfile::NamedTempFile;
use tracing::info;

/// Write through `fill` into a temp file, then atomically move it to `path`.
pub fn write_atomic_with<F>(path: &Path, fill: F) -> RenderResult<()>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    std::fs::create_dir_all(&parent)?;

    let tmp = NamedTempFile::new_in(&parent)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        fill(&mut writer)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    info!(path = %path.display(), "Wrote artifact");
    Ok(())
}

/// Atomically write a byte buffer to `path`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> RenderResult<()> {
    write_atomic_with(path, |w| w.write_all(contents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_parent_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/map.html");
        write_atomic(&path, b"<html></html>").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<html></html>");
    }

    #[test]
    fn test_failed_fill_leaves_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.html");
        let result = write_atomic_with(&path, |w| {
            w.write_all(b"partial")?;
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"))
        });
        assert!(result.is_err());
        assert!(!path.exists());
        // The temp file is cleaned up as well
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_overwrites_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        write_atomic(&path, b"old").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }
}
