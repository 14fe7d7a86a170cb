//! Photo optimization for a destination.
//!
//! Composes the imaging and metadata stages into one call:
//!
//! ```text
//! 1. Resize      long edge → profile.max_long_edge_pixels (never up)
//! 2. Compress    quality descent until ≤ profile.max_file_size_bytes (best effort)
//! 3. Strip       GPS or everything, per profile (best effort, falls back to 2)
//! 4. Verify      decode the final bytes; this is the preview
//! 5. Report      sizes, dimensions and what was removed
//! ```
//!
//! Only two things are fatal: the first encode of stage 2, and the decode of
//! stage 4. Everything else degrades silently and shows up in the result's
//! flags.
//!
//! ## Concurrency
//!
//! [`optimize`] is synchronous and touches nothing but its arguments, so it
//! can be called from any number of threads at once. The CLI runs one call
//! per file on a rayon pool; an interactive caller would push it onto a
//! worker the same way.

use crate::config::DestinationProfile;
use crate::imaging::container::{self, SegmentKind};
use crate::imaging::{
    Codec, DecodeError, DecodedImage, Dimensions, EncodeError, EncodedBuffer, JpegCodec,
    MetadataSegment, compress_to_fit, resize,
};
use crate::metadata::{read_metadata, strip_metadata};
use crate::size::compression_ratio;
use std::borrow::Cow;
use thiserror::Error;
use tracing::{debug, warn};

/// A fatal optimization failure. No partial result is produced.
#[derive(Error, Debug)]
pub enum OptimizationError {
    #[error("optimization failed for this image: {0}")]
    Compress(#[from] EncodeError),
    #[error("optimization failed for this image: result is not displayable: {0}")]
    Verify(#[from] DecodeError),
}

/// Outcome of one [`optimize`] call.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub original_size_bytes: u64,
    /// The bytes to send.
    pub optimized_buffer: EncodedBuffer,
    /// `optimized_buffer` decoded again, for previews.
    pub optimized_image: DecodedImage,
    /// Dimensions actually changed (not merely "resize was attempted").
    pub was_resized: bool,
    pub original_dimensions: Dimensions,
    pub optimized_dimensions: Dimensions,
    /// The original carried GPS data, the profile asked for its removal, and
    /// none is left in `optimized_buffer`.
    pub stripped_gps: bool,
    /// Mirrors the profile's `strip_all_metadata`.
    pub stripped_all_metadata: bool,
}

impl OptimizationResult {
    /// Always the length of [`optimized_buffer`](Self::optimized_buffer).
    pub fn optimized_size_bytes(&self) -> u64 {
        self.optimized_buffer.len() as u64
    }

    /// Percentage of bytes saved; negative when the output grew.
    pub fn reduction_rate(&self) -> f64 {
        compression_ratio(self.original_size_bytes, self.optimized_size_bytes())
    }
}

/// Optimize `image` for `profile` with the production JPEG codec.
///
/// `original_bytes` must be the encoded form `image` was decoded from; it is
/// used for the original size and to tell whether it carried GPS data.
pub fn optimize(
    image: &DecodedImage,
    original_bytes: &[u8],
    profile: &DestinationProfile,
) -> Result<OptimizationResult, OptimizationError> {
    optimize_with_codec(&JpegCodec::new(), image, original_bytes, profile)
}

/// Optimize with a custom codec (for testing).
pub fn optimize_with_codec(
    codec: &impl Codec,
    image: &DecodedImage,
    original_bytes: &[u8],
    profile: &DestinationProfile,
) -> Result<OptimizationResult, OptimizationError> {
    // Stage 1: resize
    let original_dimensions = image.dimensions();
    let resized = resize(image, profile.max_long_edge_pixels);
    let optimized_dimensions = resized.dimensions();
    let was_resized = optimized_dimensions != original_dimensions;

    // Stage 2: compress to fit. Under strip-all the segments stage 3 would
    // drop never reach the encoder, so the size search measures what is sent.
    let resized = if profile.strip_all_metadata
        && !resized.metadata_segments().iter().all(survives_strip_all)
    {
        Cow::Owned(resized.into_owned().retain_metadata(survives_strip_all))
    } else {
        resized
    };
    let compressed = compress_to_fit(
        codec,
        &resized,
        profile.target_quality,
        profile.max_file_size_bytes,
    )?;
    debug!(
        "{}: compressed to {} bytes (limit {})",
        profile.name,
        compressed.len(),
        profile.max_file_size_bytes
    );

    // Stage 3: strip metadata
    let (final_buffer, strip_succeeded) = if profile.removes_gps() {
        match strip_metadata(
            compressed.as_bytes(),
            profile.strip_gps,
            profile.strip_all_metadata,
        ) {
            Ok(stripped) => (stripped, true),
            Err(e) => {
                warn!("{}: metadata left in place: {e}", profile.name);
                (compressed, false)
            }
        }
    } else {
        (compressed, false)
    };

    // Stage 4: verify
    let optimized_image = codec.decode(final_buffer.as_bytes())?;

    // Stage 5: report
    let stripped_gps = strip_succeeded
        && profile.removes_gps()
        && read_metadata(original_bytes).has_gps()
        && !read_metadata(final_buffer.as_bytes()).has_gps();

    Ok(OptimizationResult {
        original_size_bytes: original_bytes.len() as u64,
        optimized_buffer: final_buffer,
        optimized_image,
        was_resized,
        original_dimensions,
        optimized_dimensions,
        stripped_gps,
        stripped_all_metadata: profile.strip_all_metadata,
    })
}

fn survives_strip_all(segment: &MetadataSegment) -> bool {
    container::classify(segment.marker, &segment.contents).is_none_or(SegmentKind::survives_strip_all)
}
