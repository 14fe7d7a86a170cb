//! Destination catalog and processing configuration.
//!
//! Without a config file the stock catalog below is used as is. A config file
//! (passed with `--config`) replaces the catalog wholesale and can cap the
//! number of parallel workers.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All sections are optional
//!
//! [processing]
//! max_processes = 4          # Max parallel workers (omit for auto = CPU cores)
//!
//! [[destinations]]
//! name = "Email"
//! icon = "envelope.fill"     # Presentation hint, optional
//! description = "Light enough for mail attachments"
//! max_file_size_bytes = 2097152
//! max_long_edge_pixels = 1600
//! target_quality = 0.75      # 0 < q <= 1
//! strip_gps = true           # default true
//! strip_all_metadata = false # default false; implies strip_gps
//! ```
//!
//! ## Stock catalog
//!
//! | Destination | Max size | Long edge | Quality | Strips |
//! |---|---|---|---|---|
//! | LINE | 20 MB | 1920 | 0.85 | GPS |
//! | X (Twitter) | 5 MB | 2048 | 0.85 | GPS |
//! | Instagram | 8 MB | 1440 | 0.90 | GPS |
//! | Mercari | 5 MB | 1280 | 0.80 | GPS |
//! | Email | 2 MB | 1600 | 0.75 | GPS |
//! | Web | 500 KB | 1200 | 0.70 | everything |
//!
//! Unknown keys are rejected to catch typos early. The catalog is validated
//! once, at load time.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Ordered destination catalog.
    pub destinations: Vec<DestinationProfile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            processing: ProcessingConfig::default(),
            destinations: stock_destinations(),
        }
    }
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the processing settings and every destination.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        if self.destinations.is_empty() {
            return Err(ConfigError::Validation(
                "at least one destination is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        for destination in &self.destinations {
            destination.validate()?;
            if !seen.insert(destination.slug()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate destination name: {:?}",
                    destination.name
                )));
            }
        }
        Ok(())
    }

    /// Look up a destination by display name or slug, ignoring case:
    /// `"X (Twitter)"`, `"x (twitter)"` and `"x-twitter"` all match.
    pub fn find_destination(&self, query: &str) -> Option<&DestinationProfile> {
        let wanted = slugify(query);
        self.destinations
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(query.trim()) || d.slug() == wanted)
    }
}

/// `[processing]`: how many files `optimize` works on at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Worker count for batch optimization. Omitted means one per core;
    /// more than the core count is capped.
    pub max_processes: Option<usize>,
}

/// Worker count for a batch: `max_processes` capped at the core count, or
/// the core count when unset.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Size, dimension, quality and privacy requirements of one destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DestinationProfile {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub description: String,
    pub max_file_size_bytes: u64,
    pub max_long_edge_pixels: u32,
    /// Encode quality in `(0, 1]`.
    pub target_quality: f32,
    #[serde(default = "default_strip_gps")]
    pub strip_gps: bool,
    #[serde(default)]
    pub strip_all_metadata: bool,
}

fn default_strip_gps() -> bool {
    true
}

impl DestinationProfile {
    /// Whether optimizing for this destination removes GPS data.
    /// Stripping everything implies stripping GPS.
    pub fn removes_gps(&self) -> bool {
        self.strip_gps || self.strip_all_metadata
    }

    /// Filename-safe identifier, e.g. `x-twitter`.
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| {
            Err(ConfigError::Validation(format!(
                "destination {:?}: {msg}",
                self.name
            )))
        };

        if self.name.trim().is_empty() || self.slug().is_empty() {
            return invalid("name must contain at least one letter or digit");
        }
        if self.max_file_size_bytes == 0 {
            return invalid("max_file_size_bytes must be positive");
        }
        if self.max_long_edge_pixels == 0 {
            return invalid("max_long_edge_pixels must be positive");
        }
        if !(self.target_quality > 0.0 && self.target_quality <= 1.0) {
            return invalid("target_quality must be in (0, 1]");
        }
        Ok(())
    }
}

const MIB: u64 = 1024 * 1024;

fn profile(
    name: &str,
    icon: &str,
    description: &str,
    max_file_size_bytes: u64,
    max_long_edge_pixels: u32,
    target_quality: f32,
    strip_all_metadata: bool,
) -> DestinationProfile {
    DestinationProfile {
        name: name.to_string(),
        icon: icon.to_string(),
        description: description.to_string(),
        max_file_size_bytes,
        max_long_edge_pixels,
        target_quality,
        strip_gps: true,
        strip_all_metadata,
    }
}

/// The compiled-in destination catalog, in display order.
pub fn stock_destinations() -> Vec<DestinationProfile> {
    vec![
        profile(
            "LINE",
            "message.fill",
            "Photos sent over LINE",
            20 * MIB,
            1920,
            0.85,
            false,
        ),
        profile(
            "X (Twitter)",
            "at",
            "Posts on X",
            5 * MIB,
            2048,
            0.85,
            false,
        ),
        profile(
            "Instagram",
            "camera.fill",
            "Instagram posts",
            8 * MIB,
            1440,
            0.90,
            false,
        ),
        profile(
            "Mercari",
            "bag.fill",
            "Mercari listing photos",
            5 * MIB,
            1280,
            0.80,
            false,
        ),
        profile(
            "Email",
            "envelope.fill",
            "Light enough for mail attachments",
            2 * MIB,
            1600,
            0.75,
            false,
        ),
        profile(
            "Web",
            "globe",
            "Web uploads, all metadata removed",
            500 * 1024,
            1200,
            0.70,
            true,
        ),
    ]
}

/// Lowercase, dash-separated form of a name.
///
/// - Replaces non-alphanumeric characters with dashes
/// - Collapses consecutive dashes into one
/// - Strips leading and trailing dashes
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut prev_dash = true;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Load and validate a config file.
///
/// Sections left out fall back to their defaults (stock catalog, all cores).
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    Config::from_toml(&content)
}

/// Returns a fully-commented stock config with every destination.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# sendfit configuration
# =====================
# All sections are optional. Leaving out [[destinations]] keeps this stock
# catalog; listing any destination replaces the whole catalog.
# Unknown keys will cause an error.

[processing]
# Max parallel workers for batch optimize. Omit for all CPU cores;
# values above the core count are clamped down.
# max_processes = 4

# Each destination:
#   name                  display name, also matched as a slug ("x-twitter")
#   icon                  presentation hint
#   description           one-line summary
#   max_file_size_bytes   byte ceiling for the optimized file
#   max_long_edge_pixels  longer side is scaled down to this (never up)
#   target_quality        first encode quality, 0 < q <= 1; lowered in 0.1 steps to fit
#   strip_gps             remove location data (default true)
#   strip_all_metadata    remove EXIF, IPTC, XMP, comments; keeps the ICC profile

[[destinations]]
name = "LINE"
icon = "message.fill"
description = "Photos sent over LINE"
max_file_size_bytes = 20971520
max_long_edge_pixels = 1920
target_quality = 0.85
strip_gps = true
strip_all_metadata = false

[[destinations]]
name = "X (Twitter)"
icon = "at"
description = "Posts on X"
max_file_size_bytes = 5242880
max_long_edge_pixels = 2048
target_quality = 0.85
strip_gps = true
strip_all_metadata = false

[[destinations]]
name = "Instagram"
icon = "camera.fill"
description = "Instagram posts"
max_file_size_bytes = 8388608
max_long_edge_pixels = 1440
target_quality = 0.90
strip_gps = true
strip_all_metadata = false

[[destinations]]
name = "Mercari"
icon = "bag.fill"
description = "Mercari listing photos"
max_file_size_bytes = 5242880
max_long_edge_pixels = 1280
target_quality = 0.80
strip_gps = true
strip_all_metadata = false

[[destinations]]
name = "Email"
icon = "envelope.fill"
description = "Light enough for mail attachments"
max_file_size_bytes = 2097152
max_long_edge_pixels = 1600
target_quality = 0.75
strip_gps = true
strip_all_metadata = false

[[destinations]]
name = "Web"
icon = "globe"
description = "Web uploads, all metadata removed"
max_file_size_bytes = 512000
max_long_edge_pixels = 1200
target_quality = 0.70
strip_gps = true
strip_all_metadata = true
"##
}
