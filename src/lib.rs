//! # create-odc-stac
//!
//! Catalog a directory of georeferenced rasters for an Open Data Cube. Every
//! matching raster gets a STAC Item and an ODC eo3 dataset document written
//! beside it, and the batch gets one product definition.
//!
//! # Architecture: One Fault-Isolated Pass Per Raster
//!
//! ```text
//! 1. Discover   directory  →  rasters           (lazy walk, suffix match)
//! 2. Re-encode  raster     →  COG               (optional)
//! 3. Extract    raster     →  georeference      (TIFF header only, no pixels)
//! 4. Emit       metadata   →  <stem>.json + <stem>.odc-dataset.json
//! ```
//!
//! Steps 2-4 run per raster inside one error boundary: a failure is reported
//! with the raster's path and the batch continues. Only discovery,
//! configuration and the product write are fatal.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Lazy recursive discovery of files ending with the raster suffix |
//! | [`naming`] | `RasterFile`: stem, identifier, acquisition date, sibling paths |
//! | [`geotiff`] | TIFF/BigTIFF header and GeoTIFF georeferencing via the `tiff` decoder |
//! | [`geometry`] | Bounds, footprint polygons, the `Projector` seam over `proj4rs` |
//! | [`cog`] | COG re-encoding through `geotiff-writer`, plus a layout validator |
//! | [`stac`] | STAC Item assembly and JSON emission |
//! | [`odc`] | STAC Item → eo3 dataset transform |
//! | [`product`] | eo3 product definition template |
//! | [`config`] | `odc-stac.toml` loading, merging over stock defaults, validation |
//! | [`process`] | Batch driver, per-raster pipeline, events and report |
//! | [`output`] | CLI output formatting for events and the final summary |
//!
//! # Design Decisions
//!
//! ## Pure-Rust Raster Stack
//!
//! Headers and pixels are read with the `tiff` crate's decoder and COGs are
//! encoded by `geotiff-writer`. Reprojection uses `proj4rs` with definitions
//! from `crs-definitions`. No GDAL or PROJ install is needed; the binary is
//! self-contained.
//!
//! ## Documents Beside the Data
//!
//! Documents are siblings of their raster and assets are referenced by bare
//! file name, so a catalogued directory can be moved or synced as a unit.
//!
//! ## Deterministic Dataset Ids
//!
//! An eo3 dataset id is a UUIDv5 derived from product and label, so re-running
//! a batch rewrites the same ids instead of minting new ones.

pub mod cog;
pub mod config;
pub mod geometry;
pub mod geotiff;
pub mod naming;
pub mod odc;
pub mod output;
pub mod process;
pub mod product;
pub mod scan;
pub mod stac;

#[cfg(test)]
pub(crate) mod test_helpers;
