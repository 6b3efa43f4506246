//! The persisted side-by-side comparison of every index.
//!
//! Unlike the other renderers this artifact is reused: it is rebuilt only
//! when one of its source rasters is newer than the file on disk.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use raster_common::{RenderError, RenderResult};
use tracing::{debug, info, instrument};

use crate::config::RenderOptions;
use crate::renderers::{list_inputs, MultiIndexMapRenderer};

/// File name of the comparison artifact.
pub const COMPARE_ALL_FILE: &str = "compare_indices_all.html";

/// Where the comparison lives and whether this call rebuilt it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareOutcome {
    pub path: PathBuf,
    pub rebuilt: bool,
}

fn modified(path: &Path) -> RenderResult<SystemTime> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| RenderError::input_not_found(path, e))
}

/// `true` when `artifact` is missing or older than any source.
pub fn needs_rebuild(artifact: &Path, sources: &[PathBuf]) -> RenderResult<bool> {
    let built = match std::fs::metadata(artifact).and_then(|m| m.modified()) {
        Ok(time) => time,
        Err(_) => return Ok(true),
    };
    for source in sources {
        if modified(source)? > built {
            debug!(source = %source.display(), "Source is newer than comparison");
            return Ok(true);
        }
    }
    Ok(false)
}

/// Render every `*.tif` in `index_dir` into `output_dir/compare_indices_all.html`
/// with the [`RenderOptions::compare_all`] settings, unless the existing
/// file is up to date.
pub fn render_compare_all(index_dir: &Path, aoi_paths: &[PathBuf], output_dir: &Path) -> RenderResult<CompareOutcome> {
    render_compare_all_with(index_dir, aoi_paths, output_dir, RenderOptions::compare_all())
}

#[instrument(skip_all, fields(index_dir = %index_dir.display()))]
pub fn render_compare_all_with(
    index_dir: &Path,
    aoi_paths: &[PathBuf],
    output_dir: &Path,
    options: RenderOptions,
) -> RenderResult<CompareOutcome> {
    let rasters = list_inputs(index_dir, "tif")?;
    if rasters.is_empty() {
        return Err(RenderError::input_not_found(index_dir, "no GeoTIFF indices found"));
    }

    let path = output_dir.join(COMPARE_ALL_FILE);
    if !needs_rebuild(&path, &rasters)? {
        info!(path = %path.display(), "Comparison is up to date");
        return Ok(CompareOutcome { path, rebuilt: false });
    }

    let renderer = MultiIndexMapRenderer::new(options)?;
    let path = renderer.render(&rasters, aoi_paths, &path)?;
    info!(path = %path.display(), indices = rasters.len(), "Rebuilt comparison");
    Ok(CompareOutcome { path, rebuilt: true })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn touch(path: &Path, time: SystemTime) {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(path)
            .unwrap();
        file.set_modified(time).unwrap();
    }

    #[test]
    fn test_missing_artifact_needs_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        assert!(needs_rebuild(&dir.path().join("missing.html"), &[]).unwrap());
    }

    #[test]
    fn test_newer_source_needs_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join(COMPARE_ALL_FILE);
        let source = dir.path().join("NDVI.tif");
        let now = SystemTime::now();

        touch(&artifact, now);
        touch(&source, now - Duration::from_secs(60));
        assert!(!needs_rebuild(&artifact, &[source.clone()]).unwrap());

        touch(&source, now + Duration::from_secs(60));
        assert!(needs_rebuild(&artifact, &[source]).unwrap());
    }

    #[test]
    fn test_same_mtime_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join(COMPARE_ALL_FILE);
        let source = dir.path().join("NDVI.tif");
        let now = SystemTime::now();
        touch(&artifact, now);
        touch(&source, now);
        assert!(!needs_rebuild(&artifact, &[source]).unwrap());
    }

    #[test]
    fn test_empty_index_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_compare_all(dir.path(), &[], dir.path()).unwrap_err();
        assert!(matches!(err, RenderError::InputNotFound { .. }));
    }
}
