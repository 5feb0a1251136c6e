//! Minimal eo3 product definition, one per batch.
//!
//! The document is a fixed template; only the platform and the single
//! measurement's name, dtype and nodata vary. Band dtype and nodata are
//! declared by the caller and never checked against the rasters.

use std::path::{Path, PathBuf};
use thiserror::Error;

pub const PRODUCT_SUFFIX: &str = ".odc-product.yaml";

#[derive(Error, Debug)]
pub enum ProductError {
    #[error("failed to write product definition {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductDefinition {
    pub platform: String,
    pub band_name: String,
    pub band_type: String,
    pub band_nodata: f64,
}

impl ProductDefinition {
    pub fn render(&self) -> String {
        format!(
            "
name: {platform}
description: Auto-generated product example for {platform}
metadata_type: eo3

metadata:
  product:
    name: {platform}

measurements:
- name: '{band_name}'
  units: '1'
  dtype: '{band_type}'
  nodata: {nodata}
...",
            platform = self.platform,
            band_name = self.band_name,
            band_type = self.band_type,
            nodata = format_float(self.band_nodata),
        )
    }

    /// `<dir>/<platform>.odc-product.yaml`
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}{PRODUCT_SUFFIX}", self.platform))
    }

    /// Render into `dir`, replacing any existing file.
    pub fn write(&self, dir: &Path) -> Result<PathBuf, ProductError> {
        let path = self.path_in(dir);
        std::fs::write(&path, self.render()).map_err(|source| ProductError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "wrote product definition");
        Ok(path)
    }
}

/// Render a float the way Python's `repr` does, with YAML spellings for
/// non-finite values.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return ".nan".to_string();
    }
    if value.is_infinite() {
        let text = if value > 0.0 { ".inf" } else { "-.inf" };
        return text.to_string();
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        // 1e+20, 1.5e-05
        let text = format!("{value:e}");
        let (mantissa, exponent) = text.split_once('e').unwrap_or((text.as_str(), "0"));
        let (sign, digits) = match exponent.strip_prefix('-') {
            Some(digits) => ('-', digits),
            None => ('+', exponent),
        };
        return format!("{mantissa}e{sign}{digits:0>2}");
    }
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
