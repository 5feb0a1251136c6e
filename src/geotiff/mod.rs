//! GeoTIFF header reading.
//!
//! [`header`] opens a file with the `tiff` crate's [`tiff::decoder::Decoder`],
//! which parses the TIFF/BigTIFF header and the first directory without
//! touching pixel data, and interprets that directory as a raster header plus
//! GeoTIFF georeferencing (affine transform, EPSG code, nodata).
//!
//! Pixel decoding lives in [`crate::cog`].

pub mod header;

pub use header::{
    GeoTransform, Georeference, RasterHeader, open_decoder, read_georeference, read_header,
};

use thiserror::Error;
use tiff::{TiffError, TiffFormatError};

/// GeoKey identifiers inside the GeoKeyDirectory.
pub mod geokeys {
    pub const MODEL_TYPE: u16 = 1024;
    pub const RASTER_TYPE: u16 = 1025;
    pub const GEOGRAPHIC_TYPE: u16 = 2048;
    pub const PROJECTED_CS_TYPE: u16 = 3072;

    pub const MODEL_TYPE_PROJECTED: u16 = 1;
    pub const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
    pub const RASTER_PIXEL_IS_AREA: u16 = 1;
    pub const RASTER_PIXEL_IS_POINT: u16 = 2;
    pub const USER_DEFINED: u16 = 32767;
}

#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a TIFF file")]
    NotTiff,
    #[error("invalid TIFF: {0}")]
    Tiff(TiffError),
    #[error("raster has no georeferencing (no ModelTransformation or ModelTiepoint/ModelPixelScale)")]
    NoGeoreference,
    #[error("raster has no EPSG code (missing or user-defined CRS)")]
    NoEpsg,
}

impl From<TiffError> for HeaderError {
    fn from(err: TiffError) -> Self {
        match err {
            TiffError::FormatError(
                TiffFormatError::TiffSignatureNotFound | TiffFormatError::TiffSignatureInvalid,
            ) => HeaderError::NotTiff,
            TiffError::IoError(io) => HeaderError::Io(io),
            other => HeaderError::Tiff(other),
        }
    }
}
