//! Raster header and GeoTIFF georeferencing from the first IFD.

use super::{HeaderError, geokeys};
use crate::geometry::Bounds;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tiff::decoder::{ChunkType, Decoder};
use tiff::tags::Tag;

/// Affine pixel→CRS transform in rasterio coefficient order.
///
/// ```text
/// x = a * col + b * row + c
/// y = d * col + e * row + f
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl GeoTransform {
    /// North-up transform with origin at the top-left corner.
    pub fn north_up(left: f64, top: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            a: pixel_width,
            b: 0.0,
            c: left,
            d: 0.0,
            e: -pixel_height,
            f: top,
        }
    }

    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    /// No rotation and rows running southwards.
    pub fn is_north_up(&self) -> bool {
        self.b == 0.0 && self.d == 0.0 && self.a > 0.0 && self.e < 0.0
    }

    /// Nine coefficients as rasterio serialises an `Affine`.
    pub fn to_affine9(&self) -> [f64; 9] {
        [self.a, self.b, self.c, self.d, self.e, self.f, 0.0, 0.0, 1.0]
    }

    /// Parse the first six of the nine (or six) serialised coefficients.
    pub fn from_coefficients(values: &[f64]) -> Option<Self> {
        match values {
            [a, b, c, d, e, f, ..] => Some(Self {
                a: *a,
                b: *b,
                c: *c,
                d: *d,
                e: *e,
                f: *f,
            }),
            _ => None,
        }
    }

    /// Bounds of a `width` × `height` grid under this transform.
    pub fn bounds(&self, width: u64, height: u64) -> Bounds {
        let (w, h) = (width as f64, height as f64);
        if self.b == 0.0 && self.d == 0.0 {
            let (x0, x1) = (self.c, self.c + self.a * w);
            let (y0, y1) = (self.f, self.f + self.e * h);
            return Bounds {
                left: x0.min(x1),
                bottom: y0.min(y1),
                right: x0.max(x1),
                top: y0.max(y1),
            };
        }
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(w, 0.0),
            self.apply(0.0, h),
            self.apply(w, h),
        ];
        let xs = corners.iter().map(|p| p.0);
        let ys = corners.iter().map(|p| p.1);
        Bounds {
            left: xs.clone().fold(f64::INFINITY, f64::min),
            bottom: ys.clone().fold(f64::INFINITY, f64::min),
            right: xs.fold(f64::NEG_INFINITY, f64::max),
            top: ys.fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Everything the pipeline needs from a raster's first IFD.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterHeader {
    pub width: u64,
    pub height: u64,
    pub samples_per_pixel: u16,
    pub bits_per_sample: u16,
    /// TIFF SampleFormat: 1 unsigned, 2 signed, 3 float.
    pub sample_format: u16,
    pub compression: u16,
    pub planar_configuration: u16,
    pub tiled: bool,
    pub transform: Option<GeoTransform>,
    pub epsg: Option<u16>,
    pub nodata: Option<f64>,
}

/// The georeferencing subset embedded in a STAC Item.
#[derive(Debug, Clone, PartialEq)]
pub struct Georeference {
    pub transform: GeoTransform,
    /// `[rows, cols]`
    pub shape: [u64; 2],
    pub epsg: u16,
    pub bounds: Bounds,
}

impl RasterHeader {
    /// Interpret the decoder's current image directory.
    pub fn from_decoder<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Self, HeaderError> {
        let (width, height) = decoder.dimensions()?;

        let keys = GeoKeys::from_decoder(decoder)?;
        let transform = read_transform(decoder)?.map(|t| {
            if keys.raster_type == Some(geokeys::RASTER_PIXEL_IS_POINT) {
                shift_to_pixel_area(t)
            } else {
                t
            }
        });
        let nodata = match decoder.find_tag(Tag::GdalNodata)? {
            Some(value) => value
                .into_string()?
                .trim_end_matches('\0')
                .trim()
                .parse::<f64>()
                .ok(),
            None => None,
        };

        Ok(Self {
            width: u64::from(width),
            height: u64::from(height),
            samples_per_pixel: first_short(decoder, Tag::SamplesPerPixel)?,
            bits_per_sample: first_short(decoder, Tag::BitsPerSample)?,
            sample_format: first_short(decoder, Tag::SampleFormat)?,
            compression: first_short(decoder, Tag::Compression)?,
            planar_configuration: first_short(decoder, Tag::PlanarConfiguration)?,
            tiled: matches!(decoder.get_chunk_type(), ChunkType::Tile),
            transform,
            epsg: keys.epsg(),
            nodata,
        })
    }

    pub fn georeference(&self) -> Result<Georeference, HeaderError> {
        let transform = self.transform.ok_or(HeaderError::NoGeoreference)?;
        let epsg = self.epsg.ok_or(HeaderError::NoEpsg)?;
        Ok(Georeference {
            transform,
            shape: [self.height, self.width],
            epsg,
            bounds: transform.bounds(self.width, self.height),
        })
    }
}

/// Open `path` positioned on its first image directory.
///
/// Only the header and directory are read; pixel data stays on disk.
pub fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>, HeaderError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(Decoder::new(reader)?)
}

/// Read the header of the first image in a TIFF file.
///
/// The file handle is dropped before returning, on success or error.
pub fn read_header(path: &Path) -> Result<RasterHeader, HeaderError> {
    let mut decoder = open_decoder(path)?;
    RasterHeader::from_decoder(&mut decoder)
}

/// Read transform, shape, EPSG code and bounds of a GeoTIFF.
pub fn read_georeference(path: &Path) -> Result<Georeference, HeaderError> {
    let header = read_header(path)?;
    tracing::debug!(
        path = %path.display(),
        width = header.width,
        height = header.height,
        epsg = ?header.epsg,
        "read raster header"
    );
    header.georeference()
}

/// First value of a SHORT tag, or the TIFF default of 1 when absent.
fn first_short<R: Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> Result<u16, HeaderError> {
    Ok(decoder
        .find_tag_unsigned_vec::<u16>(tag)?
        .and_then(|values| values.first().copied())
        .unwrap_or(1))
}

fn find_f64s<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    tag: Tag,
) -> Result<Option<Vec<f64>>, HeaderError> {
    Ok(decoder
        .find_tag(tag)?
        .map(|value| value.into_f64_vec())
        .transpose()?)
}

// ---------------------------------------------------------------------------
// GeoTIFF tags
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct GeoKeys {
    model_type: Option<u16>,
    raster_type: Option<u16>,
    geographic: Option<u16>,
    projected: Option<u16>,
}

impl GeoKeys {
    /// Short-valued keys stored inline in the directory (TIFFTagLocation 0).
    fn from_decoder<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Self, HeaderError> {
        let directory = match decoder.find_tag(Tag::GeoKeyDirectoryTag)? {
            Some(value) => value.into_u16_vec()?,
            None => return Ok(Self::default()),
        };
        Ok(Self::from_directory(&directory))
    }

    fn from_directory(directory: &[u16]) -> Self {
        let mut keys = Self::default();
        let Some(&count) = directory.get(3) else {
            return keys;
        };
        for entry in directory[4..].chunks_exact(4).take(count as usize) {
            let (id, location, value) = (entry[0], entry[1], entry[3]);
            if location != 0 {
                continue;
            }
            match id {
                geokeys::MODEL_TYPE => keys.model_type = Some(value),
                geokeys::RASTER_TYPE => keys.raster_type = Some(value),
                geokeys::GEOGRAPHIC_TYPE => keys.geographic = Some(value),
                geokeys::PROJECTED_CS_TYPE => keys.projected = Some(value),
                _ => {}
            }
        }
        keys
    }

    fn epsg(&self) -> Option<u16> {
        let code = match self.model_type {
            Some(geokeys::MODEL_TYPE_PROJECTED) => self.projected,
            Some(geokeys::MODEL_TYPE_GEOGRAPHIC) => self.geographic,
            _ => self.projected.or(self.geographic),
        };
        code.filter(|&c| c != 0 && c != geokeys::USER_DEFINED)
    }
}

/// ModelTransformation wins over a ModelTiepoint/ModelPixelScale pair.
fn read_transform<R: Read + Seek>(
    decoder: &mut Decoder<R>,
) -> Result<Option<GeoTransform>, HeaderError> {
    if let Some(m) = find_f64s(decoder, Tag::ModelTransformationTag)?.filter(|m| m.len() >= 16) {
        return Ok(Some(GeoTransform {
            a: m[0],
            b: m[1],
            c: m[3],
            d: m[4],
            e: m[5],
            f: m[7],
        }));
    }

    let tiepoint = find_f64s(decoder, Tag::ModelTiepointTag)?.filter(|t| t.len() >= 6);
    let scale = find_f64s(decoder, Tag::ModelPixelScaleTag)?.filter(|s| s.len() >= 2);
    let (Some(tiepoint), Some(scale)) = (tiepoint, scale) else {
        return Ok(None);
    };
    let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
    let (sx, sy) = (scale[0], scale[1]);
    Ok(Some(GeoTransform {
        a: sx,
        b: 0.0,
        c: x - i * sx,
        d: 0.0,
        e: -sy,
        f: y + j * sy,
    }))
}

/// Move a PixelIsPoint origin from the first pixel's centre to its corner.
fn shift_to_pixel_area(t: GeoTransform) -> GeoTransform {
    GeoTransform {
        c: t.c - 0.5 * t.a - 0.5 * t.b,
        f: t.f - 0.5 * t.d - 0.5 * t.e,
        ..t
    }
}
