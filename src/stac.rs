//! STAC Item assembly and document emission.
//!
//! One Item per raster, written beside it as `<stem>.json`:
//!
//! ```json
//! {
//!   "id": "SENSOR_L1_X_202001010000_band",
//!   "type": "Feature",
//!   "stac_version": "1.0.0-beta.2",
//!   "stac_extensions": ["proj"],
//!   "properties": { "platform": "demo", "datetime": "2020-01-01T00:00:00Z", "proj:epsg": 32755 },
//!   "bbox": [[left, bottom], [left, top], [right, top], [right, bottom], [left, bottom]],
//!   "geometry": { "type": "Polygon", "coordinates": [[[lon, lat], ...]] },
//!   "assets": { "blue": { "href": "SENSOR_L1_X_202001010000_band.tif", ... } }
//! }
//! ```
//!
//! `bbox` is the footprint ring in the raster's own CRS while `geometry` is
//! the same ring in EPSG:4326. Downstream consumers rely on this exact shape,
//! so both are kept as they are.
//!
//! `geometry` positions are GeoJSON `[lon, lat]`; the older Python tool wrote
//! `[lat, lon]` here, so its Items and ours disagree on axis order.

use crate::geometry::SpatialFootprint;
use crate::geotiff::Georeference;
use crate::naming::RasterFile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const STAC_VERSION: &str = "1.0.0-beta.2";
pub const PROJ_EXTENSION: &str = "proj";
pub const COG_MEDIA_TYPE: &str = "image/tiff; application=geotiff; profile=cloud-optimized";
pub const DATA_ROLE: &str = "data";

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("failed to serialize document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StacItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub stac_version: String,
    pub stac_extensions: Vec<String>,
    pub properties: ItemProperties,
    /// Footprint ring in the source CRS.
    pub bbox: Vec<[f64; 2]>,
    pub geometry: Polygon,
    pub assets: BTreeMap<String, Asset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemProperties {
    pub platform: String,
    pub datetime: String,
    #[serde(rename = "proj:epsg")]
    pub epsg: u16,
}

/// GeoJSON polygon with a single exterior ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

impl Polygon {
    pub fn new(ring: Vec<[f64; 2]>) -> Self {
        Self {
            kind: "Polygon".to_string(),
            coordinates: vec![ring],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub title: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub roles: Vec<String>,
    /// Bare file name, relative to the Item document.
    pub href: String,
    /// `[rows, cols]`
    #[serde(rename = "proj:shape")]
    pub shape: [u64; 2],
    #[serde(rename = "proj:transform")]
    pub transform: [f64; 9],
}

/// Everything an Item is built from.
pub struct ItemInputs<'a> {
    pub raster: &'a RasterFile,
    pub platform: &'a str,
    pub band_name: &'a str,
    pub datetime: String,
    pub georeference: &'a Georeference,
    pub footprint: &'a SpatialFootprint,
}

pub fn build_item(inputs: ItemInputs<'_>) -> StacItem {
    let ItemInputs {
        raster,
        platform,
        band_name,
        datetime,
        georeference,
        footprint,
    } = inputs;

    let asset = Asset {
        title: format!("Data file for {band_name}"),
        media_type: COG_MEDIA_TYPE.to_string(),
        roles: vec![DATA_ROLE.to_string()],
        href: raster.file_name(),
        shape: georeference.shape,
        transform: georeference.transform.to_affine9(),
    };

    StacItem {
        id: raster.item_id(),
        kind: "Feature".to_string(),
        stac_version: STAC_VERSION.to_string(),
        stac_extensions: vec![PROJ_EXTENSION.to_string()],
        properties: ItemProperties {
            platform: platform.to_string(),
            datetime,
            epsg: georeference.epsg,
        },
        bbox: footprint.ring.clone(),
        geometry: Polygon::new(footprint.geographic_ring.clone()),
        assets: BTreeMap::from([(band_name.to_string(), asset)]),
    }
}

/// Serialise `document` as 2-space indented JSON and write it to `path`.
pub fn write_document<T: Serialize>(path: &Path, document: &T) -> Result<(), EmitError> {
    let json = serde_json::to_string_pretty(document)?;
    std::fs::write(path, json).map_err(|source| EmitError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "wrote document");
    Ok(())
}
