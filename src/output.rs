//! CLI output formatting for batch runs.
//!
//! # Architecture
//!
//! Each event has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Diagnostics go
//! through `tracing` on stderr; everything here is the user-facing report.
//!
//! # Output
//!
//! ```text
//! Product: rasters/demo.odc-product.yaml
//! Processed rasters/SENSOR_L1_X_202001010000_band.tif
//!     Item: SENSOR_L1_X_202001010000_band.json
//!     Dataset: SENSOR_L1_X_202001010000_band.odc-dataset.json
//! Failed to process rasters/broken.tif with exception Not a TIFF file
//!
//! Processed 2 rasters, 1 failed
//! ```

use crate::process::{BatchEvent, BatchReport, FailureReport, ProcessedRaster};
use std::path::Path;

// ============================================================================
// Helpers
// ============================================================================

/// Indentation for a given depth level (4 spaces per level).
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// File name of `path`, or the whole path if it has none.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// Product definition
// ============================================================================

pub fn format_product(path: &Path) -> Vec<String> {
    vec![format!("Product: {}", path.display())]
}

pub fn print_product(path: &Path) {
    for line in format_product(path) {
        println!("{}", line);
    }
}

// ============================================================================
// Per-raster events
// ============================================================================

/// Format one raster outcome.
///
/// Successes lead with the raster path (the COG when one was produced) and
/// list the written documents by file name underneath.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Processed(processed) => format_processed(processed),
        BatchEvent::Failed(failure) => format_failure(failure),
    }
}

fn format_processed(processed: &ProcessedRaster) -> Vec<String> {
    vec![
        format!("Processed {}", processed.raster.display()),
        format!("{}Item: {}", indent(1), display_name(&processed.item_path)),
        format!(
            "{}Dataset: {}",
            indent(1),
            display_name(&processed.dataset_path)
        ),
    ]
}

fn format_failure(failure: &FailureReport) -> Vec<String> {
    vec![format!(
        "Failed to process {} with exception {}",
        failure.path.display(),
        failure.message
    )]
}

pub fn print_batch_event(event: &BatchEvent) {
    for line in format_batch_event(event) {
        println!("{}", line);
    }
}

// ============================================================================
// Summary
// ============================================================================

pub fn format_summary(report: &BatchReport) -> Vec<String> {
    vec![
        String::new(),
        format!(
            "Processed {} rasters, {} failed",
            report.total(),
            report.failures.len()
        ),
    ]
}

pub fn print_summary(report: &BatchReport) {
    for line in format_summary(report) {
        println!("{}", line);
    }
}
