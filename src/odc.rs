//! STAC Item → Open Data Cube eo3 dataset document.
//!
//! A pure function over the Item's JSON value. It reads only what eo3 needs
//! and never writes back into the Item:
//!
//! | eo3 field | Source |
//! |---|---|
//! | `id` | Item id if it is a UUID, otherwise a UUIDv5 derived from product and label |
//! | `label` | Item id |
//! | `product.name` | `odc:product`, else `collection`, else `platform`; lower-cased |
//! | `crs` | `proj:epsg` |
//! | `grids` | `proj:shape` / `proj:transform` (Item level, else per asset) |
//! | `measurements` | assets with the `data` role |
//! | `accessories` | all other assets |
//! | `properties` | Item properties, eo3-renamed, `proj:*` removed |
//! | `geometry` | Item geometry reprojected into the native CRS |

use crate::geometry::{GEOGRAPHIC_EPSG, ProjectionError, Projector};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

pub const DATASET_SCHEMA: &str = "https://schemas.opendatacube.org/dataset";

/// Namespace for dataset ids derived from processing parameters.
const ODC_NAMESPACE: Uuid = Uuid::from_u128(0x6f34c6f4_13d6_43c0_8e4e_42b6c13203af);
const ALGORITHM_VERSION: &str = "1.0.0";
const DEFAULT_GRID: &str = "default";

/// STAC property names with an eo3 equivalent.
const PROPERTY_RENAMES: &[(&str, &str)] = &[
    ("platform", "eo:platform"),
    ("instruments", "eo:instrument"),
    ("constellation", "eo:constellation"),
    ("gsd", "eo:gsd"),
    ("start_datetime", "dtr:start_datetime"),
    ("end_datetime", "dtr:end_datetime"),
    ("view:off_nadir", "eo:off_nadir"),
    ("view:azimuth", "eo:azimuth"),
    ("view:sun_azimuth", "eo:sun_azimuth"),
    ("view:sun_elevation", "eo:sun_elevation"),
];

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("STAC Item has no '{0}'")]
    MissingField(&'static str),
    #[error("STAC field '{field}' is malformed: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
    #[error("cannot determine product name (no odc:product, collection or platform)")]
    NoProductName,
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetDocument {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub id: String,
    pub label: String,
    pub product: ProductRef,
    pub crs: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Value>,
    pub grids: BTreeMap<String, Grid>,
    pub properties: Map<String, Value>,
    pub measurements: BTreeMap<String, Measurement>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub accessories: BTreeMap<String, Accessory>,
    pub lineage: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    pub shape: Vec<u64>,
    pub transform: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Accessory {
    pub path: String,
}

/// Deterministic dataset id for a processed Item.
pub fn dataset_uuid(product: &str, label: &str) -> Uuid {
    let text = format!("{product}_stac_process\n{ALGORITHM_VERSION}\n\n{label}").to_lowercase();
    Uuid::new_v5(&ODC_NAMESPACE, text.as_bytes())
}

fn str_field<'a>(value: &'a Value, field: &'static str) -> Option<&'a str> {
    value.get(field).and_then(Value::as_str)
}

fn product_name(item: &Value, properties: &Map<String, Value>) -> Result<String, TransformError> {
    properties
        .get("odc:product")
        .and_then(Value::as_str)
        .or_else(|| str_field(item, "collection"))
        .or_else(|| properties.get("platform").and_then(Value::as_str))
        .map(str::to_lowercase)
        .ok_or(TransformError::NoProductName)
}

fn grid_of(holder: &Value, field: &'static str) -> Result<Option<Grid>, TransformError> {
    let (Some(shape), Some(transform)) = (holder.get("proj:shape"), holder.get("proj:transform"))
    else {
        return Ok(None);
    };
    let invalid = |message: &str| TransformError::InvalidField {
        field,
        message: message.to_string(),
    };
    let shape: Vec<u64> = serde_json::from_value(shape.clone())
        .map_err(|_| invalid("proj:shape must be two non-negative integers"))?;
    let transform: Vec<f64> = serde_json::from_value(transform.clone())
        .map_err(|_| invalid("proj:transform must be numbers"))?;
    if shape.len() != 2 || !(transform.len() == 6 || transform.len() == 9) {
        return Err(invalid("expected 2 shape values and 6 or 9 transform values"));
    }
    Ok(Some(Grid { shape, transform }))
}

fn has_data_role(asset: &Value) -> bool {
    asset
        .get("roles")
        .and_then(Value::as_array)
        .is_some_and(|roles| roles.iter().any(|r| r.as_str() == Some("data")))
}

fn eo3_properties(properties: &Map<String, Value>) -> Map<String, Value> {
    properties
        .iter()
        .filter(|(key, value)| !key.starts_with("proj:") && !value.is_null())
        .map(|(key, value)| {
            let renamed = PROPERTY_RENAMES
                .iter()
                .find(|(stac, _)| *stac == key.as_str())
                .map_or(key.as_str(), |(_, eo3)| *eo3);
            (renamed.to_string(), value.clone())
        })
        .collect()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Reproject a geographic polygon into `epsg`, rounding each coordinate.
fn native_geometry(
    geometry: &Value,
    epsg: u16,
    decimals: i32,
    projector: &impl Projector,
) -> Result<Option<Value>, TransformError> {
    if str_field(geometry, "type") != Some("Polygon") {
        return Ok(None);
    }
    let rings: Vec<Vec<[f64; 2]>> = geometry
        .get("coordinates")
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| TransformError::InvalidField {
            field: "geometry",
            message: e.to_string(),
        })?
        .ok_or(TransformError::MissingField("geometry.coordinates"))?;

    let mut projected = Vec::with_capacity(rings.len());
    for ring in rings {
        let mut out = Vec::with_capacity(ring.len());
        for [lon, lat] in ring {
            let (x, y) = projector.project(GEOGRAPHIC_EPSG, epsg, lon, lat)?;
            out.push([round_to(x, decimals), round_to(y, decimals)]);
        }
        projected.push(out);
    }
    Ok(Some(json!({ "type": "Polygon", "coordinates": projected })))
}

/// Transform a STAC Item into an eo3 dataset document.
pub fn stac_transform(
    item: &Value,
    projector: &impl Projector,
) -> Result<DatasetDocument, TransformError> {
    let label = str_field(item, "id")
        .ok_or(TransformError::MissingField("id"))?
        .to_string();
    let properties = item
        .get("properties")
        .and_then(Value::as_object)
        .ok_or(TransformError::MissingField("properties"))?;
    let product = product_name(item, properties)?;

    let epsg = properties
        .get("proj:epsg")
        .ok_or(TransformError::MissingField("proj:epsg"))?;
    let epsg = epsg
        .as_u64()
        .and_then(|code| u16::try_from(code).ok())
        .ok_or_else(|| TransformError::InvalidField {
            field: "proj:epsg",
            message: format!("{epsg} is not an EPSG code"),
        })?;

    let empty = Map::new();
    let assets = item
        .get("assets")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let mut grids = BTreeMap::new();
    let default_grid = match grid_of(&item["properties"], "properties")? {
        Some(grid) => Some(grid),
        None => assets
            .values()
            .filter(|asset| has_data_role(asset))
            .find_map(|asset| grid_of(asset, "assets").transpose())
            .transpose()?,
    };
    let default_grid = default_grid.ok_or(TransformError::MissingField("proj:shape"))?;
    grids.insert(DEFAULT_GRID.to_string(), default_grid.clone());

    let mut measurements = BTreeMap::new();
    let mut accessories = BTreeMap::new();
    for (name, asset) in assets {
        let path = str_field(asset, "href")
            .ok_or(TransformError::MissingField("href"))?
            .to_string();
        if !has_data_role(asset) {
            accessories.insert(name.clone(), Accessory { path });
            continue;
        }
        let grid = match grid_of(asset, "assets")? {
            Some(grid) if grid != default_grid => {
                grids.insert(name.clone(), grid);
                Some(name.clone())
            }
            _ => None,
        };
        measurements.insert(name.clone(), Measurement { path, grid });
    }

    let pixel_size = default_grid.transform[0].abs();
    let decimals = if pixel_size >= 1.0 { 0 } else { 6 };
    let geometry = match item.get("geometry") {
        Some(geometry) => native_geometry(geometry, epsg, decimals, projector)?,
        None => None,
    };

    let id = match Uuid::parse_str(&label) {
        Ok(uuid) => uuid,
        Err(_) => dataset_uuid(&product, &label),
    };

    Ok(DatasetDocument {
        schema: DATASET_SCHEMA.to_string(),
        id: id.to_string(),
        label,
        product: ProductRef { name: product },
        crs: format!("epsg:{epsg}"),
        geometry,
        grids,
        properties: eo3_properties(properties),
        measurements,
        accessories,
        lineage: Map::new(),
    })
}
