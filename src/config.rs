//! Batch configuration module.
//!
//! Handles loading, validating, and merging `odc-stac.toml`. The file is
//! optional and lives in the batch directory (the one passed on the command
//! line). Stock defaults are overridden by whatever keys the file sets.
//!
//! ## Config File Location
//!
//! ```text
//! rasters/
//! ├── odc-stac.toml            # Batch config (overrides stock defaults)
//! ├── 2020/
//! │   └── SENSOR_L1_X_202001010000_band.tif
//! └── ...
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [cog]
//! block_size = 512               # Tile width and height in pixels
//! compression = "deflate"        # "deflate" or "none"
//! deflate_level = 6              # zlib level 0-9
//! nodata = 0                     # GDAL nodata written to every level
//! epsg = 28355                   # CRS assigned to the output, or "source"
//! overview_resampling = "nearest" # "nearest" or "average"
//! validate = true                # Check COG layout after writing
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::geometry::proj_string;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the optional config file in the batch directory.
pub const CONFIG_FILE_NAME: &str = "odc-stac.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Batch configuration loaded from `odc-stac.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Re-encoding profile used when `--cog-convert` is on.
    pub cog: CogProfile,
}

impl BatchConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cog = &self.cog;
        if cog.block_size < 16 || cog.block_size % 16 != 0 {
            return Err(ConfigError::Validation(format!(
                "cog.block_size must be a positive multiple of 16, got {}",
                cog.block_size
            )));
        }
        if cog.deflate_level > 9 {
            return Err(ConfigError::Validation(format!(
                "cog.deflate_level must be 0-9, got {}",
                cog.deflate_level
            )));
        }
        if let CrsSetting::Code(code) = cog.epsg {
            if proj_string(code).is_none() {
                return Err(ConfigError::Validation(format!(
                    "cog.epsg {code} is not a known EPSG code"
                )));
            }
        }
        Ok(())
    }
}

/// Re-encoding profile for Cloud-Optimized GeoTIFF output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CogProfile {
    /// Tile width and height. Also the size the smallest overview must not exceed.
    pub block_size: u32,
    pub compression: Compression,
    pub deflate_level: u32,
    pub nodata: f64,
    /// CRS assigned to the output. The transform is copied, never warped.
    pub epsg: CrsSetting,
    pub overview_resampling: Resampling,
    /// Check the COG layout of every written file.
    pub validate: bool,
}

impl Default for CogProfile {
    fn default() -> Self {
        Self {
            block_size: 512,
            compression: Compression::Deflate,
            deflate_level: 6,
            nodata: 0.0,
            epsg: CrsSetting::Code(28355),
            overview_resampling: Resampling::Nearest,
            validate: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Deflate,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resampling {
    Nearest,
    Average,
}

/// An EPSG code, or `"source"` to keep the input raster's CRS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CrsSetting {
    Code(u16),
    Keyword(SourceKeyword),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKeyword {
    Source,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(BatchConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `odc-stac.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no config file.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<BatchConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: BatchConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `odc-stac.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<BatchConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(dir)?;
    let config = resolve_config(base, overlay)?;
    tracing::debug!(?config, "resolved batch config");
    Ok(config)
}

/// Returns a fully-commented stock `odc-stac.toml` with all keys and explanations.
///
/// Used by the `--gen-config` CLI flag.
pub fn stock_config_toml() -> &'static str {
    r##"# create-odc-stac Configuration
# =============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file as odc-stac.toml in the directory you pass on the
# command line. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Cloud-Optimized GeoTIFF re-encoding (used with --cog-convert)
# ---------------------------------------------------------------------------
[cog]
# Tile width and height in pixels. Must be a multiple of 16.
# Overviews are added by halving until the smaller side fits in one block.
block_size = 512

# Tile compression: "deflate" or "none".
compression = "deflate"

# zlib compression level for "deflate" (0 = fastest, 9 = smallest).
deflate_level = 6

# Nodata value recorded in the output (GDAL_NODATA tag).
nodata = 0.0

# CRS written into the output as an EPSG code. The pixel grid is copied
# unchanged, so this relabels rather than reprojects. Use "source" to keep
# the input raster's CRS.
epsg = 28355

# Overview resampling: "nearest" or "average".
overview_resampling = "nearest"

# Re-read every written file and check its COG layout.
validate = true
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_matches_stock_profile() {
        let cog = BatchConfig::default().cog;
        assert_eq!(cog.block_size, 512);
        assert_eq!(cog.compression, Compression::Deflate);
        assert_eq!(cog.deflate_level, 6);
        assert_eq!(cog.nodata, 0.0);
        assert_eq!(cog.epsg, CrsSetting::Code(28355));
        assert_eq!(cog.overview_resampling, Resampling::Nearest);
        assert!(cog.validate);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[cog]
compression = "none"
"#;
        let config: BatchConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.cog.compression, Compression::None);
        // Default values preserved
        assert_eq!(config.cog.block_size, 512);
    }

    #[test]
    fn epsg_accepts_source_keyword() {
        let config: BatchConfig = toml::from_str("[cog]\nepsg = \"source\"\n").unwrap();
        assert_eq!(config.cog.epsg, CrsSetting::Keyword(SourceKeyword::Source));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<BatchConfig, _> = toml::from_str("[cog]\ntile_size = 256\n");
        assert!(result.is_err());
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, BatchConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            r#"
[cog]
block_size = 256
nodata = -9999
epsg = 32755
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.cog.block_size, 256);
        assert_eq!(config.cog.nodata, -9999.0);
        assert_eq!(config.cog.epsg, CrsSetting::Code(32755));
        // Unspecified values should be defaults
        assert_eq!(config.cog.deflate_level, 6);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "this is not valid toml [[[").unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "[cog]\nblock_size = 100\n").unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"level = 6"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"level = 9"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("level").unwrap().as_integer(), Some(9));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[cog]
block_size = 512
deflate_level = 6
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[cog]
deflate_level = 1
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let cog = merged.get("cog").unwrap();
        assert_eq!(cog.get("deflate_level").unwrap().as_integer(), Some(1));
        // block_size preserved from base
        assert_eq!(cog.get("block_size").unwrap().as_integer(), Some(512));
    }

    #[test]
    fn merge_toml_replaces_non_table_with_table() {
        let base: toml::Value = toml::from_str(r#"epsg = 28355"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"epsg = "source""#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("epsg").unwrap().as_str(), Some("source"));
    }

    // =========================================================================
    // validation tests
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(BatchConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_block_size_multiple_of_16() {
        let mut config = BatchConfig::default();
        config.cog.block_size = 16;
        assert!(config.validate().is_ok());
        config.cog.block_size = 24;
        assert!(config.validate().is_err());
        config.cog.block_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_deflate_level_range() {
        let mut config = BatchConfig::default();
        config.cog.deflate_level = 9;
        assert!(config.validate().is_ok());
        config.cog.deflate_level = 10;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_unknown_epsg() {
        let mut config = BatchConfig::default();
        config.cog.epsg = CrsSetting::Code(1);
        assert!(config.validate().is_err());
        config.cog.epsg = CrsSetting::Keyword(SourceKeyword::Source);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn resolve_config_with_overlay() {
        let base = stock_defaults_value();
        let overlay: toml::Value = toml::from_str("[cog]\nvalidate = false\n").unwrap();
        let config = resolve_config(base, Some(overlay)).unwrap();
        assert!(!config.cog.validate);
        assert_eq!(config.cog.block_size, 512);
    }

    // =========================================================================
    // stock_config_toml tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: BatchConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, BatchConfig::default());
    }

    #[test]
    fn stock_defaults_value_has_cog_section() {
        let val = stock_defaults_value();
        assert!(val.is_table());
        assert_eq!(
            val.get("cog").unwrap().get("epsg").unwrap().as_integer(),
            Some(28355)
        );
    }
}
