//! Raster → Cloud-Optimized GeoTIFF re-encoding.
//!
//! Pixels are decoded with the `tiff` crate ([`raster`]) and encoded by
//! `geotiff-writer`'s [`CogBuilder`], which lays out the tiles, overview
//! pyramid and IFDs-before-data directories. This module maps a
//! [`CogProfile`] onto that builder; [`validate`] re-reads the result.

mod calculations;
pub mod raster;
pub mod validate;

pub use calculations::overview_factors;
pub use raster::DecodedRaster;
pub use validate::{check_layout, read_layout, validate_cog};

use crate::config::{CogProfile, Compression, CrsSetting, Resampling};
use crate::geometry::is_geographic;
use crate::geotiff::{GeoTransform, HeaderError, RasterHeader, read_header};
use crate::naming::RasterFile;
use geotiff_writer::{CogBuilder, GeoTiffBuilder, PhotometricInterpretation, RasterType};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode raster: {0}")]
    Decode(#[from] tiff::TiffError),
    #[error(transparent)]
    Header(#[from] HeaderError),
    #[error("failed to encode COG: {0}")]
    Encode(#[from] geotiff_writer::Error),
    #[error("Can't convert to files of the same name: {}", .0.display())]
    SamePath(PathBuf),
    #[error("unsupported raster layout: {0}")]
    Unsupported(String),
    #[error("{} is not a valid cloud-optimized GeoTIFF: {}", .path.display(), .problems.join("; "))]
    Invalid {
        path: PathBuf,
        problems: Vec<String>,
    },
}

/// Re-encode `raster` as a COG beside it and return the new file.
///
/// The output path replaces the suffix with `.tif` and spaces in the file
/// name with underscores; it must differ from the input path. The CRS written
/// is the profile's when set (assigned, not reprojected) and nodata is always
/// the profile's.
pub fn convert_to_cog(raster: &RasterFile, profile: &CogProfile) -> Result<RasterFile, CogError> {
    let output = raster.cog_path();
    if output == raster.path {
        return Err(CogError::SamePath(output));
    }

    tracing::debug!(input = %raster.path.display(), output = %output.display(), "re-encoding");
    let header = read_header(&raster.path)?;
    let pixels = DecodedRaster::decode(&raster.path, &header)?;

    let builder = cog_builder(&header, profile);
    pixels.write_cog(&builder, &output)?;
    tracing::debug!(
        output = %output.display(),
        overviews = overview_factors(pixels.width, pixels.height, profile.block_size).len(),
        "wrote COG"
    );

    if profile.validate {
        validate_cog(&output)?;
    }
    Ok(RasterFile::new(output))
}

/// Encoder settings for a raster shaped like `header` under `profile`.
pub fn cog_builder(header: &RasterHeader, profile: &CogProfile) -> CogBuilder {
    let (width, height) = (header.width as u32, header.height as u32);
    let bands = header.samples_per_pixel.max(1);

    let mut geotiff = GeoTiffBuilder::new(width, height)
        .bands(u32::from(bands))
        .tile_size(profile.block_size, profile.block_size)
        .nodata(&profile.nodata.to_string());
    geotiff = match profile.compression {
        Compression::Deflate => geotiff
            .compression(geotiff_writer::Compression::Deflate)
            .deflate_level(profile.deflate_level),
        Compression::None => geotiff.compression(geotiff_writer::Compression::None),
    };
    if bands == 3 && header.bits_per_sample == 8 {
        geotiff = geotiff.photometric(PhotometricInterpretation::Rgb);
    }
    if let Some(transform) = header.transform {
        // Header transforms are already corner-based.
        geotiff = geotiff
            .raster_type(RasterType::PixelIsArea)
            .transform(writer_transform(transform));
    }
    let epsg = match profile.epsg {
        CrsSetting::Code(code) => Some(code),
        CrsSetting::Keyword(_) => header.epsg,
    };
    if let Some(code) = epsg {
        geotiff = if is_geographic(code) {
            geotiff.geographic_epsg(code)
        } else {
            geotiff.projected_epsg(code)
        };
    }

    CogBuilder::new(geotiff)
        .overview_levels(overview_factors(width, height, profile.block_size))
        .resampling(match profile.overview_resampling {
            Resampling::Nearest => geotiff_writer::Resampling::NearestNeighbor,
            Resampling::Average => geotiff_writer::Resampling::Average,
        })
}

fn writer_transform(t: GeoTransform) -> geotiff_writer::GeoTransform {
    geotiff_writer::GeoTransform {
        origin_x: t.c,
        pixel_width: t.a,
        skew_x: t.b,
        origin_y: t.f,
        skew_y: t.d,
        pixel_height: t.e,
    }
}
