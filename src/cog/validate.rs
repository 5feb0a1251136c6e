//! Structural checks for cloud-optimized GeoTIFFs.
//!
//! Mirrors the hard errors of `rio cogeo validate`: directories up front,
//! tiled everywhere, overviews ordered and stored before full resolution.

use super::CogError;
use crate::geotiff::open_decoder;
use std::io::{Read, Seek};
use std::path::Path;
use tiff::decoder::{ChunkType, Decoder};
use tiff::tags::Tag;

/// Largest offset at which the first IFD may start. GDAL places a small
/// "ghost" metadata block between the header and the first directory.
const MAX_FIRST_IFD_OFFSET: u64 = 300;

/// What the layout rules need from one image directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLayout {
    pub ifd_offset: u64,
    pub width: u32,
    pub height: u32,
    pub tiled: bool,
    /// Smallest non-zero tile or strip offset.
    pub data_offset: Option<u64>,
}

impl ImageLayout {
    fn from_decoder<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Self, CogError> {
        let tiled = matches!(decoder.get_chunk_type(), ChunkType::Tile);
        let offsets_tag = if tiled {
            Tag::TileOffsets
        } else {
            Tag::StripOffsets
        };
        let (width, height) = decoder.dimensions()?;
        Ok(Self {
            ifd_offset: decoder.ifd_pointer().map_or(0, |p| p.0),
            width,
            height,
            tiled,
            data_offset: decoder
                .find_tag_unsigned_vec::<u64>(offsets_tag)?
                .and_then(|offsets| offsets.into_iter().filter(|&o| o > 0).min()),
        })
    }
}

/// Walk the directory chain of the file at `path`.
pub fn read_layout(path: &Path) -> Result<Vec<ImageLayout>, CogError> {
    let mut decoder = open_decoder(path)?;
    let mut images = vec![ImageLayout::from_decoder(&mut decoder)?];
    while decoder.more_images() {
        decoder.next_image()?;
        images.push(ImageLayout::from_decoder(&mut decoder)?);
    }
    Ok(images)
}

/// Validate the COG at `path`; all problems found are reported together.
pub fn validate_cog(path: &Path) -> Result<(), CogError> {
    let problems = check_layout(&read_layout(path)?);
    if problems.is_empty() {
        Ok(())
    } else {
        Err(CogError::Invalid {
            path: path.to_path_buf(),
            problems,
        })
    }
}

/// List every layout rule `images` breaks.
pub fn check_layout(images: &[ImageLayout]) -> Vec<String> {
    let mut problems = Vec::new();

    for (i, image) in images.iter().enumerate() {
        if !image.tiled {
            problems.push(format!("IFD {i} is not tiled"));
        }
    }

    if let Some(first) = images.first() {
        if first.ifd_offset > MAX_FIRST_IFD_OFFSET {
            problems.push(format!(
                "first IFD starts at byte {}, expected within the first {MAX_FIRST_IFD_OFFSET} bytes",
                first.ifd_offset
            ));
        }
    }

    if let Some(data_start) = images.iter().filter_map(|image| image.data_offset).min() {
        for (i, image) in images.iter().enumerate() {
            if image.ifd_offset > data_start {
                problems.push(format!(
                    "IFD {i} starts at byte {} after image data starts at byte {data_start}",
                    image.ifd_offset
                ));
            }
        }
    }

    for (i, pair) in images.windows(2).enumerate() {
        let (prev, this) = (&pair[0], &pair[1]);
        let level = i + 1;
        if this.width >= prev.width || this.height >= prev.height {
            problems.push(format!(
                "overview {level} ({}x{}) is not smaller than the level before it ({}x{})",
                this.width, this.height, prev.width, prev.height
            ));
        }
        if let (Some(before), Some(after)) = (prev.data_offset, this.data_offset) {
            if after >= before {
                problems.push(format!(
                    "tile data of overview {level} is not stored before level {i}"
                ));
            }
        }
    }

    problems
}
