//! Shared test utilities for the create-odc-stac test suite.
//!
//! Synthesises small GeoTIFF fixtures with the `tiff` encoder so tests never
//! depend on binary files checked into the repository.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let path = tmp.path().join("A_B_C_202001010000_band.tif");
//! write_geotiff(&path, &GeoTiffFixture::default());
//! ```

use std::fs::File;
use std::path::Path;
use tiff::encoder::{TiffEncoder, colortype};
use tiff::tags::Tag;

use crate::geotiff::geokeys;

// =========================================================================
// GeoTIFF fixtures
// =========================================================================

/// Pixel layout of a synthesised fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureSamples {
    Gray8,
    Gray16,
    Rgb8,
    Gray32Float,
}

/// Parameters of a north-up GeoTIFF fixture.
///
/// The default is a 32×24 single-band `u8` raster in UTM zone 55 south
/// (EPSG:32755) with 10 m pixels and its top-left corner at
/// (500 000, 5 800 000).
#[derive(Debug, Clone)]
pub struct GeoTiffFixture {
    pub width: u32,
    pub height: u32,
    pub samples: FixtureSamples,
    /// Top-left corner in CRS units.
    pub origin: (f64, f64),
    pub pixel_size: f64,
    pub epsg: Option<u16>,
    pub geographic: bool,
    pub pixel_is_point: bool,
    pub nodata: Option<&'static str>,
}

impl Default for GeoTiffFixture {
    fn default() -> Self {
        Self {
            width: 32,
            height: 24,
            samples: FixtureSamples::Gray8,
            origin: (500_000.0, 5_800_000.0),
            pixel_size: 10.0,
            epsg: Some(32755),
            geographic: false,
            pixel_is_point: false,
            nodata: None,
        }
    }
}

impl GeoTiffFixture {
    /// Value of sample `s` at pixel (`x`, `y`). Deterministic and non-constant.
    pub fn sample(&self, x: u32, y: u32, s: u32) -> u32 {
        (x * 7 + y * 13 + s * 31) % 251
    }

    fn geokey_directory(&self) -> Vec<u16> {
        let model = if self.geographic {
            geokeys::MODEL_TYPE_GEOGRAPHIC
        } else {
            geokeys::MODEL_TYPE_PROJECTED
        };
        let raster = if self.pixel_is_point {
            geokeys::RASTER_PIXEL_IS_POINT
        } else {
            geokeys::RASTER_PIXEL_IS_AREA
        };
        let mut keys = vec![
            geokeys::MODEL_TYPE,
            0,
            1,
            model,
            geokeys::RASTER_TYPE,
            0,
            1,
            raster,
        ];
        if let Some(epsg) = self.epsg {
            let key = if self.geographic {
                geokeys::GEOGRAPHIC_TYPE
            } else {
                geokeys::PROJECTED_CS_TYPE
            };
            keys.extend_from_slice(&[key, 0, 1, epsg]);
        }
        let count = (keys.len() / 4) as u16;
        let mut directory = vec![1, 1, 0, count];
        directory.extend(keys);
        directory
    }
}

/// Write a stripped, uncompressed GeoTIFF described by `fixture`.
///
/// The tie point is written at the pixel corner for PixelIsArea rasters and
/// at the first pixel's centre for PixelIsPoint ones, so both describe the
/// same footprint.
pub fn write_geotiff(path: &Path, fixture: &GeoTiffFixture) {
    let file = File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(file).unwrap();
    let (w, h) = (fixture.width, fixture.height);

    let bands = match fixture.samples {
        FixtureSamples::Rgb8 => 3,
        _ => 1,
    };
    let values: Vec<u32> = (0..h)
        .flat_map(|y| (0..w).flat_map(move |x| (0..bands).map(move |s| (x, y, s))))
        .map(|(x, y, s)| fixture.sample(x, y, s))
        .collect();

    let (x0, y0) = if fixture.pixel_is_point {
        (
            fixture.origin.0 + fixture.pixel_size / 2.0,
            fixture.origin.1 - fixture.pixel_size / 2.0,
        )
    } else {
        fixture.origin
    };
    let scale = [fixture.pixel_size, fixture.pixel_size, 0.0];
    let tiepoint = [0.0, 0.0, 0.0, x0, y0, 0.0];
    let geokeys = fixture.geokey_directory();

    macro_rules! write_image {
        ($colortype:ty, $data:expr) => {{
            let mut image = encoder.new_image::<$colortype>(w, h).unwrap();
            let dir = image.encoder();
            dir.write_tag(Tag::ModelPixelScaleTag, &scale[..])
                .unwrap();
            dir.write_tag(Tag::ModelTiepointTag, &tiepoint[..])
                .unwrap();
            dir.write_tag(Tag::GeoKeyDirectoryTag, &geokeys[..])
                .unwrap();
            if let Some(nodata) = fixture.nodata {
                dir.write_tag(Tag::GdalNodata, nodata).unwrap();
            }
            image.write_data(&$data[..]).unwrap();
        }};
    }

    match fixture.samples {
        FixtureSamples::Gray8 => {
            let data: Vec<u8> = values.iter().map(|&v| v as u8).collect();
            write_image!(colortype::Gray8, data)
        }
        FixtureSamples::Rgb8 => {
            let data: Vec<u8> = values.iter().map(|&v| v as u8).collect();
            write_image!(colortype::RGB8, data)
        }
        FixtureSamples::Gray16 => {
            let data: Vec<u16> = values.iter().map(|&v| v as u16 * 100).collect();
            write_image!(colortype::Gray16, data)
        }
        FixtureSamples::Gray32Float => {
            let data: Vec<f32> = values.iter().map(|&v| v as f32 * 0.5).collect();
            write_image!(colortype::Gray32Float, data)
        }
    }
}

/// Write a fixture named with the date-bearing convention under `dir`.
pub fn write_dated_geotiff(dir: &Path, stem: &str) -> std::path::PathBuf {
    let path = dir.join(format!("{stem}.tif"));
    write_geotiff(&path, &GeoTiffFixture::default());
    path
}
