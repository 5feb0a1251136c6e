//! Footprint geometry and coordinate reprojection.
//!
//! A raster's footprint is its bounds rectangle written as a closed five-point
//! ring in a fixed winding order:
//!
//! ```text
//! (left, top) ──────── (right, top)
//!      │                    │
//!      │                    │
//! (left, bottom) ───── (right, bottom)
//!
//! ring = [bottom-left, top-left, top-right, bottom-right, bottom-left]
//! ```
//!
//! The ring is kept twice: once in the source CRS (used for the STAC `bbox`
//! field) and once reprojected to EPSG:4326 longitude/latitude (used for the
//! STAC `geometry`). Only the second is reprojected.
//!
//! Reprojection sits behind the [`Projector`] trait. The production
//! implementation, [`Proj4Projector`], uses `proj4rs` with CRS definitions from
//! the `crs-definitions` database, so no PROJ or GDAL install is needed.

use thiserror::Error;

/// EPSG code of WGS 84 longitude/latitude.
pub const GEOGRAPHIC_EPSG: u16 = 4326;

#[derive(Error, Debug)]
pub enum ProjectionError {
    #[error("EPSG:{0} is not in the CRS definitions database")]
    UnknownEpsg(u16),
    #[error("invalid definition for EPSG:{epsg}: {message}")]
    InvalidDefinition { epsg: u16, message: String },
    #[error("transform from EPSG:{from} to EPSG:{to} failed: {message}")]
    TransformFailed { from: u16, to: u16, message: String },
}

/// Axis-aligned rectangle in a raster's CRS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl Bounds {
    /// Closed ring over the four corners: BL → TL → TR → BR → BL.
    pub fn ring(&self) -> Vec<[f64; 2]> {
        vec![
            [self.left, self.bottom],
            [self.left, self.top],
            [self.right, self.top],
            [self.right, self.bottom],
            [self.left, self.bottom],
        ]
    }
}

/// A raster's footprint in its own CRS and in geographic coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialFootprint {
    pub epsg: u16,
    pub bounds: Bounds,
    /// Closed ring in the source CRS.
    pub ring: Vec<[f64; 2]>,
    /// The same ring as `[longitude, latitude]` in EPSG:4326.
    pub geographic_ring: Vec<[f64; 2]>,
}

impl SpatialFootprint {
    /// Build the footprint of `bounds` and reproject its ring to EPSG:4326.
    pub fn new(
        bounds: Bounds,
        epsg: u16,
        projector: &impl Projector,
    ) -> Result<Self, ProjectionError> {
        let ring = bounds.ring();
        let geographic_ring = reproject_ring(projector, epsg, GEOGRAPHIC_EPSG, &ring)?;
        Ok(Self {
            epsg,
            bounds,
            ring,
            geographic_ring,
        })
    }
}

/// Coordinate transform between two EPSG-coded CRSs.
///
/// Geographic coordinates are `(longitude, latitude)` in degrees.
pub trait Projector {
    fn project(&self, from: u16, to: u16, x: f64, y: f64) -> Result<(f64, f64), ProjectionError>;
}

/// Reproject every vertex of `ring`.
pub fn reproject_ring(
    projector: &impl Projector,
    from: u16,
    to: u16,
    ring: &[[f64; 2]],
) -> Result<Vec<[f64; 2]>, ProjectionError> {
    ring.iter()
        .map(|&[x, y]| projector.project(from, to, x, y).map(|(px, py)| [px, py]))
        .collect()
}

/// PROJ.4 string for an EPSG code.
pub fn proj_string(epsg: u16) -> Option<&'static str> {
    crs_definitions::from_code(epsg).map(|def| def.proj4)
}

/// Whether an EPSG code names a longitude/latitude CRS.
pub fn is_geographic(epsg: u16) -> bool {
    proj_string(epsg).is_some_and(|p| p.contains("+proj=longlat"))
}

/// Pure-Rust projector backed by `proj4rs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Proj4Projector;

impl Proj4Projector {
    pub fn new() -> Self {
        Self
    }
}

impl Projector for Proj4Projector {
    fn project(&self, from: u16, to: u16, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
        use proj4rs::proj::Proj;
        use proj4rs::transform::transform;

        if from == to {
            return Ok((x, y));
        }

        let load = |epsg: u16| -> Result<Proj, ProjectionError> {
            let definition = proj_string(epsg).ok_or(ProjectionError::UnknownEpsg(epsg))?;
            Proj::from_proj_string(definition).map_err(|e| ProjectionError::InvalidDefinition {
                epsg,
                message: format!("{e:?}"),
            })
        };
        let source = load(from)?;
        let target = load(to)?;

        // proj4rs works in radians for geographic CRSs
        let (x_in, y_in) = if is_geographic(from) {
            (x.to_radians(), y.to_radians())
        } else {
            (x, y)
        };
        let mut point = (x_in, y_in, 0.0);
        transform(&source, &target, &mut point).map_err(|e| ProjectionError::TransformFailed {
            from,
            to,
            message: format!("{e:?}"),
        })?;

        if is_geographic(to) {
            Ok((point.0.to_degrees(), point.1.to_degrees()))
        } else {
            Ok((point.0, point.1))
        }
    }
}
