//! Batch driver: turns discovered rasters into catalog documents.
//!
//! For every raster the driver runs one fault-isolated pipeline:
//!
//! ```text
//! raster ─▶ [re-encode as COG] ─▶ read georeference ─▶ footprint + date
//!        ─▶ STAC Item  ─▶ <stem>.json
//!        ─▶ eo3 dataset ─▶ <stem>.odc-dataset.json
//! ```
//!
//! Any error inside that pipeline becomes a [`FailureReport`] and the batch
//! moves on to the next raster. Nothing is retried or cleaned up: a COG or
//! Item written before the failing step stays on disk. Only a discovery error
//! stops the batch.

use crate::cog::{CogError, convert_to_cog};
use crate::config::CogProfile;
use crate::geometry::{ProjectionError, Projector, SpatialFootprint};
use crate::geotiff::{HeaderError, read_georeference};
use crate::naming::{DATASET_SUFFIX, DateError, ITEM_SUFFIX, RasterFile};
use crate::odc::{TransformError, stac_transform};
use crate::scan::ScanError;
use crate::stac::{EmitError, ItemInputs, build_item, write_document};
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while processing a single raster.
#[derive(Error, Debug)]
pub enum RasterError {
    #[error(transparent)]
    Date(#[from] DateError),
    #[error(transparent)]
    Header(#[from] HeaderError),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error(transparent)]
    Cog(#[from] CogError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Emit(#[from] EmitError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-batch settings shared by every raster.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub platform: String,
    pub band_name: String,
    /// Used verbatim as the datetime of every raster when non-empty.
    pub default_date: Option<String>,
    pub cog_convert: bool,
    pub profile: CogProfile,
}

/// Documents written for one raster.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedRaster {
    /// The raster the documents describe; the COG when one was produced.
    pub raster: PathBuf,
    pub item_path: PathBuf,
    pub dataset_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailureReport {
    /// Input path, or the COG path if re-encoding had already succeeded.
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Processed(ProcessedRaster),
    Failed(FailureReport),
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: Vec<ProcessedRaster>,
    pub failures: Vec<FailureReport>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.processed.len() + self.failures.len()
    }
}

/// Re-encode the raster when the batch asks for it, otherwise pass it through.
pub fn prepare_raster(raster: &RasterFile, options: &BatchOptions) -> Result<RasterFile, RasterError> {
    if options.cog_convert {
        Ok(convert_to_cog(raster, &options.profile)?)
    } else {
        Ok(raster.clone())
    }
}

/// Write the STAC Item and eo3 dataset beside `raster`.
pub fn describe_raster(
    raster: &RasterFile,
    options: &BatchOptions,
    projector: &impl Projector,
) -> Result<ProcessedRaster, RasterError> {
    let georeference = read_georeference(&raster.path)?;
    let datetime = raster.acquisition_datetime(options.default_date.as_deref())?;
    let footprint = SpatialFootprint::new(georeference.bounds, georeference.epsg, projector)?;

    let item = build_item(ItemInputs {
        raster,
        platform: &options.platform,
        band_name: &options.band_name,
        datetime,
        georeference: &georeference,
        footprint: &footprint,
    });
    let item_path = raster.sibling(ITEM_SUFFIX);
    write_document(&item_path, &item)?;

    let dataset = stac_transform(&serde_json::to_value(&item)?, projector)?;
    let dataset_path = raster.sibling(DATASET_SUFFIX);
    write_document(&dataset_path, &dataset)?;

    Ok(ProcessedRaster {
        raster: raster.path.clone(),
        item_path,
        dataset_path,
    })
}

/// Run the whole per-raster pipeline, reporting failures against the path
/// that was being worked on when they happened.
pub fn process_raster(
    raster: &RasterFile,
    options: &BatchOptions,
    projector: &impl Projector,
) -> Result<ProcessedRaster, FailureReport> {
    let fail = |path: &PathBuf, err: RasterError| FailureReport {
        path: path.clone(),
        message: err.to_string(),
    };
    let target = prepare_raster(raster, options).map_err(|e| fail(&raster.path, e))?;
    describe_raster(&target, options, projector).map_err(|e| fail(&target.path, e))
}

/// Process every raster yielded by `rasters`, in order.
///
/// Each outcome is passed to `on_event` as soon as it is known. A discovery
/// error aborts the batch; per-raster errors never do.
pub fn process_rasters<I, P, F>(
    rasters: I,
    options: &BatchOptions,
    projector: &P,
    mut on_event: F,
) -> Result<BatchReport, ScanError>
where
    I: IntoIterator<Item = Result<RasterFile, ScanError>>,
    P: Projector,
    F: FnMut(&BatchEvent),
{
    let mut report = BatchReport::default();
    for raster in rasters {
        let raster = raster?;
        match process_raster(&raster, options, projector) {
            Ok(processed) => {
                on_event(&BatchEvent::Processed(processed.clone()));
                report.processed.push(processed);
            }
            Err(failure) => {
                tracing::debug!(path = %failure.path.display(), error = %failure.message, "raster failed");
                on_event(&BatchEvent::Failed(failure.clone()));
                report.failures.push(failure);
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BatchConfig;
    use crate::geometry::tests::{FailingProjector, RecordingProjector};
    use crate::scan::scan;
    use crate::test_helpers::{GeoTiffFixture, write_dated_geotiff, write_geotiff};
    use std::path::Path;
    use tempfile::TempDir;

    fn options() -> BatchOptions {
        BatchOptions {
            platform: "demo".to_string(),
            band_name: "blue".to_string(),
            default_date: None,
            cog_convert: false,
            profile: CogProfile {
                block_size: 16,
                ..BatchConfig::default().cog
            },
        }
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn writes_item_and_dataset_beside_raster() {
        let tmp = TempDir::new().unwrap();
        let path = write_dated_geotiff(tmp.path(), "SENSOR_L1_X_202001010000_band");
        let projector = RecordingProjector::default();

        let processed = process_raster(&RasterFile::new(&path), &options(), &projector).unwrap();

        assert_eq!(processed.raster, path);
        assert_eq!(
            processed.item_path,
            tmp.path().join("SENSOR_L1_X_202001010000_band.json")
        );
        assert_eq!(
            processed.dataset_path,
            tmp.path().join("SENSOR_L1_X_202001010000_band.odc-dataset.json")
        );

        let item = read_json(&processed.item_path);
        assert_eq!(item["id"], "SENSOR_L1_X_202001010000_band");
        assert_eq!(item["properties"]["datetime"], "2020-01-01T00:00:00Z");
        assert_eq!(item["properties"]["platform"], "demo");
        assert_eq!(item["properties"]["proj:epsg"], 32755);

        let dataset = read_json(&processed.dataset_path);
        assert_eq!(dataset["label"], "SENSOR_L1_X_202001010000_band");
        assert_eq!(dataset["product"]["name"], "demo");
        assert_eq!(dataset["crs"], "epsg:32755");
        assert!(projector.call_count() > 0);
    }

    #[test]
    fn default_date_overrides_filename() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("undated.tif");
        write_geotiff(&path, &GeoTiffFixture::default());

        let opts = BatchOptions {
            default_date: Some("2019-06-01T00:00:00Z".to_string()),
            ..options()
        };
        let processed =
            process_raster(&RasterFile::new(&path), &opts, &RecordingProjector::default())
                .unwrap();
        let item = read_json(&processed.item_path);
        assert_eq!(item["properties"]["datetime"], "2019-06-01T00:00:00Z");
    }

    #[test]
    fn undated_raster_without_default_fails() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("undated.tif");
        write_geotiff(&path, &GeoTiffFixture::default());

        let failure =
            process_raster(&RasterFile::new(&path), &options(), &RecordingProjector::default())
                .unwrap_err();
        assert_eq!(failure.path, path);
        assert!(!tmp.path().join("undated.json").exists());
    }

    #[test]
    fn conversion_reports_against_cog_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("my scene.tiff");
        write_geotiff(&path, &GeoTiffFixture::default());

        let opts = BatchOptions {
            cog_convert: true,
            ..options()
        };
        let failure =
            process_raster(&RasterFile::new(&path), &opts, &RecordingProjector::default())
                .unwrap_err();

        // The COG was written, then date inference failed on its stem.
        let cog = tmp.path().join("my_scene.tif");
        assert!(cog.exists());
        assert_eq!(failure.path, cog);
    }

    #[test]
    fn conversion_describes_the_cog() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("SENSOR_L1_X_202001010000_band.tiff");
        write_geotiff(&path, &GeoTiffFixture::default());

        let opts = BatchOptions {
            cog_convert: true,
            ..options()
        };
        let processed =
            process_raster(&RasterFile::new(&path), &opts, &RecordingProjector::default())
                .unwrap();
        assert_eq!(
            processed.raster,
            tmp.path().join("SENSOR_L1_X_202001010000_band.tif")
        );
        let item = read_json(&processed.item_path);
        assert_eq!(
            item["assets"]["blue"]["href"],
            "SENSOR_L1_X_202001010000_band.tif"
        );
        // Stock profile assigns EPSG:28355.
        assert_eq!(item["properties"]["proj:epsg"], 28355);
    }

    #[test]
    fn converting_a_tif_in_place_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_dated_geotiff(tmp.path(), "SENSOR_L1_X_202001010000_band");
        let opts = BatchOptions {
            cog_convert: true,
            ..options()
        };
        let failure =
            process_raster(&RasterFile::new(&path), &opts, &RecordingProjector::default())
                .unwrap_err();
        assert_eq!(failure.path, path);
        assert!(failure.message.contains("same name"));
    }

    #[test]
    fn projection_failure_is_isolated() {
        let tmp = TempDir::new().unwrap();
        let path = write_dated_geotiff(tmp.path(), "SENSOR_L1_X_202001010000_band");
        let result = process_raster(&RasterFile::new(&path), &options(), &FailingProjector);
        assert!(result.is_err());
    }

    #[test]
    fn one_bad_raster_does_not_stop_the_batch() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a_broken.tif"), b"not a tiff").unwrap();
        let good = write_dated_geotiff(tmp.path(), "SENSOR_L1_X_202001010000_band");

        let mut events = Vec::new();
        let report = process_rasters(
            scan(tmp.path(), ".tif").unwrap(),
            &options(),
            &RecordingProjector::default(),
            |event| events.push(event.clone()),
        )
        .unwrap();

        assert_eq!(report.total(), 2);
        assert_eq!(report.processed.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.processed[0].raster, good);
        assert_eq!(report.failures[0].path, tmp.path().join("a_broken.tif"));
        assert_eq!(events.len(), 2);
        assert!(!tmp.path().join("a_broken.json").exists());
    }

    #[test]
    fn discovery_error_aborts() {
        let rasters = vec![Err(ScanError::NotADirectory(PathBuf::from("/absent")))];
        let mut events = 0;
        let result = process_rasters(
            rasters,
            &options(),
            &RecordingProjector::default(),
            |_| events += 1,
        );
        assert!(matches!(result, Err(ScanError::NotADirectory(_))));
        assert_eq!(events, 0);
    }

    #[test]
    fn empty_batch_reports_nothing() {
        let tmp = TempDir::new().unwrap();
        let report = process_rasters(
            scan(tmp.path(), ".tif").unwrap(),
            &options(),
            &RecordingProjector::default(),
            |_| {},
        )
        .unwrap();
        assert_eq!(report.total(), 0);
    }
}
