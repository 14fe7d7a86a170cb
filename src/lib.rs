//! # sendfit
//!
//! Fits a photo to where it is going. Every destination (a messenger, a
//! marketplace, an email attachment) has a file-size ceiling, a pixel budget
//! and a privacy expectation; sendfit turns one JPEG into one that satisfies
//! all three.
//!
//! # Architecture: One Pipeline, Pure Stages
//!
//! ```text
//! 1. Resize     long edge capped, aspect ratio kept, never upscaled
//! 2. Compress   quality descent until the bytes fit (bounded, best effort)
//! 3. Strip      GPS or all metadata, without touching pixel data
//! 4. Verify     decode the final bytes back into a previewable image
//! ```
//!
//! Each stage is a function of its inputs. The encoder sits behind the
//! [`imaging::Codec`] trait, so the quality search and the orchestration are
//! unit tested against a recording mock instead of real JPEG encodes.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`optimize`] | Runs the pipeline for one image and one destination |
//! | [`imaging`] | Decode/encode, resize, quality search, JPEG segment and EXIF plumbing |
//! | [`metadata`] | Reads GPS/EXIF/device/vendor metadata, strips it, formats it for display |
//! | [`config`] | Destination catalog and processing settings from `config.toml` |
//! | [`batch`] | Input discovery and collision-free output paths for the CLI |
//! | [`output`] | CLI output formatting |
//! | [`size`] | Human-readable byte sizes and compression ratios |
//!
//! # Design Decisions
//!
//! ## The Byte Ceiling Is Measured, Not Estimated
//!
//! The decoded image carries the metadata segments of its source, and the
//! codec writes them back on every encode. The size compared against the
//! ceiling is therefore the size of a complete file. Under strip-all the
//! segments that would be dropped are left out before encoding. Stripping
//! runs after compression and only ever removes bytes.
//!
//! ## Metadata Removal Is a Container Rewrite
//!
//! Removing GPS patches the EXIF block in place: the GPS pointer is unlinked
//! and the GPS directory zeroed, every other offset stays valid. GPS
//! properties mirrored into XMP are cut from the packet. Removing
//! everything drops segments. Neither path re-encodes pixels, so stripping
//! cannot cost quality.
//!
//! ## Best Effort Over Failure
//!
//! When the lowest quality still does not fit, the smallest candidate is
//! returned and the caller compares its size against the limit. Only an
//! image that cannot be encoded at all, or whose result cannot be decoded,
//! is an error.

pub mod batch;
pub mod config;
pub mod imaging;
pub mod metadata;
pub mod optimize;
pub mod output;
pub mod size;

#[cfg(test)]
pub(crate) mod test_helpers;
