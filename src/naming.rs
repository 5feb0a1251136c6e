//! Filename conventions for input rasters and the documents written beside them.
//!
//! A raster is identified by its file stem. Three things derive from it:
//!
//! - **Item id**: the stem with spaces replaced by underscores
//!   (`my raster 1.tif` → `my_raster_1`).
//! - **Acquisition time**: the fourth underscore-delimited field of the stem,
//!   parsed as `YYYYMMDDHHMM` and rendered as ISO-8601 with a literal `Z`
//!   (`SENSOR_L1_X_202001010000_band` → `2020-01-01T00:00:00Z`).
//! - **Sibling paths**: documents replace only the final suffix of the raster
//!   path, so `scene.tif`, `scene.json` and `scene.odc-dataset.json` share a stem.

use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Zero-based index of the date-time field in an underscore-split stem.
const DATE_FIELD_INDEX: usize = 3;
const DATE_FORMAT: &str = "%Y%m%d%H%M";

/// Suffix of the STAC Item document.
pub const ITEM_SUFFIX: &str = ".json";
/// Suffix of the ODC dataset document.
pub const DATASET_SUFFIX: &str = ".odc-dataset.json";
/// Suffix of re-encoded rasters.
pub const COG_SUFFIX: &str = ".tif";

#[derive(Error, Debug)]
pub enum DateError {
    #[error("file stem '{stem}' has no date field (needs at least 4 '_'-separated fields)")]
    MissingField { stem: String },
    #[error("date field '{token}' does not match YYYYMMDDHHMM: {source}")]
    BadToken {
        token: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// An input raster on disk.
///
/// Never mutated: re-encoding produces a new `RasterFile` for the output path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterFile {
    pub path: PathBuf,
}

impl RasterFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Filename without its final suffix.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Bare filename, used as the relative asset `href`.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Stable document identifier: the stem with spaces replaced by underscores.
    pub fn item_id(&self) -> String {
        self.stem().replace(' ', "_")
    }

    /// Resolve the acquisition time for this raster.
    ///
    /// A non-empty `default_date` is returned verbatim; otherwise the date is
    /// inferred from the stem.
    pub fn acquisition_datetime(&self, default_date: Option<&str>) -> Result<String, DateError> {
        match default_date.filter(|d| !d.is_empty()) {
            Some(date) => Ok(date.to_string()),
            None => infer_datetime(&self.stem()),
        }
    }

    /// Path of a document written beside this raster.
    pub fn sibling(&self, suffix: &str) -> PathBuf {
        with_suffix(&self.path, suffix)
    }

    /// Output path for the re-encoded copy: suffix replaced by `.tif`, spaces
    /// in the filename replaced by underscores.
    pub fn cog_path(&self) -> PathBuf {
        let renamed = with_suffix(&self.path, COG_SUFFIX);
        match renamed.file_name() {
            Some(name) => renamed.with_file_name(name.to_string_lossy().replace(' ', "_")),
            None => renamed,
        }
    }
}

/// Infer an ISO-8601 UTC timestamp from a stem like `AAA_BBB_CCC_202301151230_EEE`.
///
/// The time is taken as UTC; no timezone conversion happens.
pub fn infer_datetime(stem: &str) -> Result<String, DateError> {
    let token = stem
        .split('_')
        .nth(DATE_FIELD_INDEX)
        .ok_or_else(|| DateError::MissingField {
            stem: stem.to_string(),
        })?;
    let parsed =
        NaiveDateTime::parse_from_str(token, DATE_FORMAT).map_err(|source| DateError::BadToken {
            token: token.to_string(),
            source,
        })?;
    Ok(format!("{}Z", parsed.format("%Y-%m-%dT%H:%M:%S")))
}

/// Replace the final suffix of `path` (or append one if it has none).
///
/// `suffix` includes its leading dot and may itself contain dots
/// (`.odc-dataset.json`).
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    path.with_extension(suffix.trim_start_matches('.'))
}
