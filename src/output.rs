//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Destinations
//!
//! ```text
//! 001 LINE (line)
//!     Photos sent over LINE
//!     Limit: 20.00 MB, 1920px long edge, quality 0.85
//!     Removes: GPS
//! ```
//!
//! ## Inspect
//!
//! ```text
//! IMG_0042.jpg
//!     Location: 35.6581, 139.7484
//!     Captured: 2024-05-01 10:20:30
//!     Camera: Canon EOS R5
//!     Resolution: 4000 × 3000
//! ```
//!
//! ## Optimize
//!
//! ```text
//! IMG_0042.jpg → IMG_0042-email.jpg
//!     Size: 3.20 MB → 812.4 KB (75.2% smaller)
//!     Dimensions: 4000 × 3000 → 1600 × 1200
//!     Removed: GPS
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions do no I/O.
//! `--json` output goes through the `Serialize` summaries instead.

use crate::config::DestinationProfile;
use crate::imaging::Dimensions;
use crate::metadata::MetadataItem;
use crate::optimize::OptimizationResult;
use crate::size::format_file_size;
use serde::Serialize;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn format_dimensions(dims: Dimensions) -> String {
    format!("{} × {}", dims.width, dims.height)
}

fn removal_summary(strip_gps: bool, strip_all: bool) -> &'static str {
    match (strip_gps, strip_all) {
        (_, true) => "all metadata",
        (true, false) => "GPS",
        (false, false) => "nothing",
    }
}

// ============================================================================
// Destinations
// ============================================================================

pub fn format_destinations(destinations: &[DestinationProfile]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, d) in destinations.iter().enumerate() {
        lines.push(format!("{} {} ({})", format_index(i + 1), d.name, d.slug()));
        if !d.description.is_empty() {
            lines.push(format!("{}{}", indent(1), d.description));
        }
        lines.push(format!(
            "{}Limit: {}, {}px long edge, quality {:.2}",
            indent(1),
            format_file_size(d.max_file_size_bytes),
            d.max_long_edge_pixels,
            d.target_quality
        ));
        lines.push(format!(
            "{}Removes: {}",
            indent(1),
            removal_summary(d.strip_gps, d.strip_all_metadata)
        ));
    }
    lines
}

pub fn print_destinations(destinations: &[DestinationProfile]) {
    for line in format_destinations(destinations) {
        println!("{}", line);
    }
}

// ============================================================================
// Inspect
// ============================================================================

pub fn format_metadata(source: &Path, items: &[MetadataItem]) -> Vec<String> {
    let mut lines = vec![file_name(source)];
    if items.is_empty() {
        lines.push(format!("{}No metadata", indent(1)));
    }
    for item in items {
        lines.push(format!("{}{}: {}", indent(1), item.label, item.value));
    }
    lines
}

pub fn print_metadata(source: &Path, items: &[MetadataItem]) {
    for line in format_metadata(source, items) {
        println!("{}", line);
    }
}

// ============================================================================
// Optimize
// ============================================================================

pub fn format_result(source: &Path, output: &Path, result: &OptimizationResult) -> Vec<String> {
    let rate = result.reduction_rate();
    let change = if rate >= 0.0 {
        format!("{:.1}% smaller", rate)
    } else {
        format!("{:.1}% larger", -rate)
    };

    let mut lines = vec![
        format!("{} → {}", file_name(source), file_name(output)),
        format!(
            "{}Size: {} → {} ({})",
            indent(1),
            format_file_size(result.original_size_bytes),
            format_file_size(result.optimized_size_bytes()),
            change
        ),
    ];
    if result.was_resized {
        lines.push(format!(
            "{}Dimensions: {} → {}",
            indent(1),
            format_dimensions(result.original_dimensions),
            format_dimensions(result.optimized_dimensions)
        ));
    } else {
        lines.push(format!(
            "{}Dimensions: {} (unchanged)",
            indent(1),
            format_dimensions(result.original_dimensions)
        ));
    }
    lines.push(format!(
        "{}Removed: {}",
        indent(1),
        removal_summary(result.stripped_gps, result.stripped_all_metadata)
    ));
    lines
}

pub fn print_result(source: &Path, output: &Path, result: &OptimizationResult) {
    for line in format_result(source, output, result) {
        println!("{}", line);
    }
}

pub fn format_failure(source: &Path, error: &dyn std::error::Error) -> String {
    format!("{}: {}", file_name(source), error)
}

/// Machine-readable form of one optimize outcome (`--json`).
#[derive(Debug, Clone, Serialize)]
pub struct ResultSummary {
    pub source: String,
    pub output: String,
    pub original_size_bytes: u64,
    pub optimized_size_bytes: u64,
    pub reduction_rate: f64,
    pub was_resized: bool,
    pub original_dimensions: Dimensions,
    pub optimized_dimensions: Dimensions,
    pub stripped_gps: bool,
    pub stripped_all_metadata: bool,
}

impl ResultSummary {
    pub fn new(source: &Path, output: &Path, result: &OptimizationResult) -> Self {
        Self {
            source: source.display().to_string(),
            output: output.display().to_string(),
            original_size_bytes: result.original_size_bytes,
            optimized_size_bytes: result.optimized_size_bytes(),
            reduction_rate: result.reduction_rate(),
            was_resized: result.was_resized,
            original_dimensions: result.original_dimensions,
            optimized_dimensions: result.optimized_dimensions,
            stripped_gps: result.stripped_gps,
            stripped_all_metadata: result.stripped_all_metadata,
        }
    }
}

/// `--json` entry for an image that could not be optimized.
#[derive(Debug, Clone, Serialize)]
pub struct FailureSummary {
    pub source: String,
    pub error: String,
}

/// Everything one `optimize --json` run prints.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub destination: String,
    pub results: Vec<ResultSummary>,
    pub failures: Vec<FailureSummary>,
}

pub fn format_batch_footer(succeeded: usize, failed: usize) -> String {
    if failed == 0 {
        format!("{} optimized", succeeded)
    } else {
        format!("{} optimized, {} failed", succeeded, failed)
    }
}
