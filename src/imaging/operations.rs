//! High-level image operations.
//!
//! These functions combine calculations with codec execution: [`resize`]
//! shrinks a decoded image to a long-edge bound, [`compress_to_fit`] walks
//! the quality schedule until an encode fits a byte ceiling.

use super::calculations::fit_long_edge;
use super::codec::{Codec, DecodedImage, EncodeError, EncodedBuffer};
use super::params::{Quality, descent_schedule};
use image::imageops::FilterType;
use std::borrow::Cow;
use tracing::{debug, warn};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, EncodeError>;

/// Shrink `image` so its long edge is at most `max_long_edge`.
///
/// Returns the input borrowed when it already fits (no upscaling, no copy).
/// Carried metadata is kept on the resized image.
pub fn resize(image: &DecodedImage, max_long_edge: u32) -> Cow<'_, DecodedImage> {
    let source = (image.width(), image.height());
    let (width, height) = fit_long_edge(source, max_long_edge);

    if (width, height) == source {
        return Cow::Borrowed(image);
    }

    debug!(
        "resize {}x{} -> {width}x{height} (long edge {max_long_edge})",
        source.0, source.1
    );
    let pixels = image
        .pixels()
        .resize_exact(width, height, FilterType::Triangle);
    Cow::Owned(image.with_pixels(pixels))
}

fn fits(buffer: &EncodedBuffer, max_bytes: u64) -> bool {
    buffer.len() as u64 <= max_bytes
}

/// Encode `image` at `target_quality`, stepping the quality down until the
/// result fits in `max_bytes`.
///
/// - One encode when the first attempt already fits.
/// - Otherwise up to nine more, at `target - 0.1`, `target - 0.2`, … down to 0.1.
/// - The returned buffer is the smallest one seen; it can still exceed
///   `max_bytes` when even the floor quality is too large.
///
/// Only a failure of the first encode is an error. A failed encode during the
/// descent ends the search with the best buffer so far.
pub fn compress_to_fit(
    codec: &impl Codec,
    image: &DecodedImage,
    target_quality: f32,
    max_bytes: u64,
) -> Result<EncodedBuffer> {
    let mut best = codec.encode(image, Quality::new(target_quality))?;
    debug!(
        "quality {target_quality:.2}: {} bytes (limit {max_bytes})",
        best.len()
    );
    if fits(&best, max_bytes) {
        return Ok(best);
    }

    for quality in descent_schedule(target_quality) {
        let candidate = match codec.encode(image, Quality::new(quality)) {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!("quality descent stopped: {e}");
                break;
            }
        };
        debug!("quality {quality:.2}: {} bytes", candidate.len());

        // A larger re-encode is discarded so sizes never go back up.
        if candidate.len() <= best.len() {
            best = candidate;
        }
        if fits(&best, max_bytes) {
            return Ok(best);
        }
    }

    debug!(
        "best effort: {} bytes still over the {max_bytes} byte limit",
        best.len()
    );
    Ok(best)
}
