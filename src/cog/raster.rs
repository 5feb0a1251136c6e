//! Decoded pixels handed to the COG encoder.

use super::CogError;
use crate::geotiff::{RasterHeader, open_decoder};
use geotiff_writer::{CogBuilder, NumericSample};
use ndarray::ArrayView3;
use std::path::Path;
use tiff::decoder::{DecodingResult, Limits};

/// First image of a TIFF file, pixel-interleaved.
#[derive(Debug)]
pub struct DecodedRaster {
    pub width: u32,
    pub height: u32,
    pub bands: u16,
    pub samples: DecodingResult,
}

impl DecodedRaster {
    pub fn decode(path: &Path, header: &RasterHeader) -> Result<Self, CogError> {
        if header.planar_configuration != 1 {
            return Err(CogError::Unsupported(
                "planar (band-separate) sample layout".into(),
            ));
        }
        if header.width == 0 || header.height == 0 {
            return Err(CogError::Unsupported("raster has zero dimensions".into()));
        }

        let mut decoder = open_decoder(path)?.with_limits(Limits::unlimited());
        let (width, height) = decoder.dimensions()?;
        let samples = decoder.read_image()?;
        Ok(Self {
            width,
            height,
            bands: header.samples_per_pixel.max(1),
            samples,
        })
    }

    /// `(rows, cols, bands)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.bands as usize,
        )
    }

    /// Encode through `builder` into `path`.
    pub fn write_cog(&self, builder: &CogBuilder, path: &Path) -> Result<(), CogError> {
        let shape = self.shape();
        match &self.samples {
            DecodingResult::U8(v) => write_samples(builder, path, shape, v),
            DecodingResult::I8(v) => write_samples(builder, path, shape, v),
            DecodingResult::U16(v) => write_samples(builder, path, shape, v),
            DecodingResult::I16(v) => write_samples(builder, path, shape, v),
            DecodingResult::U32(v) => write_samples(builder, path, shape, v),
            DecodingResult::I32(v) => write_samples(builder, path, shape, v),
            DecodingResult::U64(v) => write_samples(builder, path, shape, v),
            DecodingResult::I64(v) => write_samples(builder, path, shape, v),
            DecodingResult::F32(v) => write_samples(builder, path, shape, v),
            DecodingResult::F64(v) => write_samples(builder, path, shape, v),
            DecodingResult::F16(_) => Err(CogError::Unsupported("16-bit float samples".into())),
        }
    }
}

fn write_samples<T: NumericSample>(
    builder: &CogBuilder,
    path: &Path,
    shape: (usize, usize, usize),
    samples: &[T],
) -> Result<(), CogError> {
    let (rows, cols, bands) = shape;
    let array = ArrayView3::from_shape(shape, samples).map_err(|_| {
        CogError::Unsupported(format!(
            "decoded {} samples, expected {rows}x{cols}x{bands}",
            samples.len()
        ))
    })?;
    builder.write_3d(path, array)?;
    Ok(())
}
