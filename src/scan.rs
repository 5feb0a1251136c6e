//! Raster discovery.
//!
//! Walks a directory tree lazily and yields every regular file whose name ends
//! with the configured suffix:
//!
//! ```text
//! rasters/                                 scan(rasters, ".tif")
//! ├── odc-stac.toml
//! ├── SENSOR_L1_X_202001010000_band.tif    → yielded
//! ├── SENSOR_L1_X_202001010000_band.json
//! └── 2021/
//!     ├── SENSOR_L1_X_202101010000_band.tif → yielded
//!     └── notes.txt
//! ```
//!
//! Order follows the filesystem and is not guaranteed; callers that compare
//! sequences should sort first. Symlinked directories are not descended into;
//! a symlink to a regular file is yielded like the file itself.
//!
//! Walk errors such as an unreadable sub-directory are yielded as items so the
//! caller decides whether they are fatal.

use crate::naming::RasterFile;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

/// Lazy iterator over matching rasters under a root directory.
pub struct RasterScan {
    walker: walkdir::IntoIter,
    extension: String,
}

impl Iterator for RasterScan {
    type Item = Result<RasterFile, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e.into())),
            };
            if !entry.file_name().to_string_lossy().ends_with(&self.extension) {
                continue;
            }
            let is_file = if entry.path_is_symlink() {
                entry.path().is_file()
            } else {
                entry.file_type().is_file()
            };
            if is_file {
                tracing::debug!(path = %entry.path().display(), "discovered raster");
                return Some(Ok(RasterFile::new(entry.into_path())));
            }
        }
    }
}

/// Start a scan of `root` for files ending with `extension`.
///
/// Fails immediately if `root` is not a directory; any later walk error is
/// yielded by the iterator.
pub fn scan(root: &Path, extension: &str) -> Result<RasterScan, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    Ok(RasterScan {
        walker: WalkDir::new(root).follow_links(false).into_iter(),
        extension: extension.to_string(),
    })
}
