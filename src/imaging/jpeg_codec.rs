//! Production codec: baseline JPEG through the `image` crate, container
//! segments through `img-parts`.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Split container, carry metadata | `img_parts::jpeg::Jpeg` |
//! | Decode pixels | `image::ImageReader` (JPEG decoder) |
//! | EXIF orientation | `kamadak-exif` reader + in-place tag reset |
//! | Encode pixels | `image::codecs::jpeg::JpegEncoder` |
//!
//! The encoder only writes a JFIF header, so carried segments are spliced in
//! after it with [`container::insert_segments`].

use super::codec::{Codec, DecodeError, DecodedImage, EncodeError, EncodedBuffer, MetadataSegment};
use super::container::{self, EXIF_PREFIX, SegmentKind};
use super::params::Quality;
use super::tiff;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, ImageReader};
use img_parts::Bytes;
use std::io::Cursor;

/// JPEG codec using the pure Rust `image` decoders/encoders.
///
/// Stateless; one instance can serve any number of threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegCodec;

impl JpegCodec {
    pub fn new() -> Self {
        Self
    }
}

fn decode_pixels(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
    ImageReader::with_format(Cursor::new(bytes), ImageFormat::Jpeg)
        .decode()
        .map_err(|e| DecodeError(format!("JPEG decode failed: {e}")))
}

/// EXIF Orientation of a TIFF payload; `1` when absent or unreadable.
fn read_orientation(tiff: &[u8]) -> u32 {
    exif::Reader::new()
        .read_raw(tiff.to_vec())
        .ok()
        .and_then(|parsed| {
            parsed
                .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
                .and_then(|f| f.value.get_uint(0))
        })
        .unwrap_or(1)
}

/// Rotate/flip pixels so that an image tagged with `orientation` displays
/// upright without the tag.
///
/// 1 = normal, 2 = mirrored, 3 = 180°, 4 = flipped vertically,
/// 5 = mirrored + 90° CW, 6 = 90° CW, 7 = mirrored + 270° CW, 8 = 270° CW
fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Rewrite the Orientation tag of the carried EXIF segment to 1.
/// Returns false (leaving `segments` untouched) if it cannot be patched.
fn reset_carried_orientation(segments: &mut [MetadataSegment]) -> bool {
    let Some(segment) = segments
        .iter_mut()
        .find(|s| container::classify(s.marker, &s.contents) == Some(SegmentKind::Exif))
    else {
        return false;
    };

    let mut contents = segment.contents.to_vec();
    match tiff::reset_orientation(&mut contents[EXIF_PREFIX.len()..]) {
        Ok(true) => {
            segment.contents = Bytes::from(contents);
            true
        }
        Ok(false) => false,
        Err(e) => {
            tracing::warn!("EXIF orientation not reset: {e}");
            false
        }
    }
}

fn encode_pixels(pixels: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    match pixels {
        DynamicImage::ImageRgb8(rgb) => encoder.write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )?,
        DynamicImage::ImageLuma8(luma) => encoder.write_image(
            luma.as_raw(),
            luma.width(),
            luma.height(),
            ExtendedColorType::L8,
        )?,
        other if !other.color().has_color() => {
            let luma = other.to_luma8();
            encoder.write_image(
                luma.as_raw(),
                luma.width(),
                luma.height(),
                ExtendedColorType::L8,
            )?
        }
        other => {
            // JPEG has no alpha channel; it is dropped here.
            let rgb = other.to_rgb8();
            encoder.write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )?
        }
    }
    Ok(buf)
}

impl Codec for JpegCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        let jpeg = container::parse(bytes)?;
        let pixels = decode_pixels(bytes)?;
        let mut segments = container::carried_segments(&jpeg);

        let orientation = container::exif_payload(&jpeg).map_or(1, read_orientation);
        let pixels = if (2..=8).contains(&orientation) && reset_carried_orientation(&mut segments)
        {
            tracing::debug!("applying EXIF orientation {orientation}");
            apply_orientation(pixels, orientation)
        } else {
            pixels
        };

        Ok(DecodedImage::with_metadata(pixels, segments))
    }

    fn encode(&self, image: &DecodedImage, quality: Quality) -> Result<EncodedBuffer, EncodeError> {
        let encoded = encode_pixels(image.pixels(), quality.to_jpeg()).map_err(|e| EncodeError {
            quality: quality.value(),
            reason: e.to_string(),
        })?;

        let carried = image.metadata_segments();
        if carried.is_empty() {
            return Ok(EncodedBuffer::new(encoded));
        }

        let mut jpeg = container::parse(&encoded).map_err(|e| EncodeError {
            quality: quality.value(),
            reason: e.to_string(),
        })?;
        container::insert_segments(&mut jpeg, carried);
        Ok(EncodedBuffer::new(container::serialize(jpeg)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Dimensions;
    use crate::test_helpers::*;
    use image::GrayImage;

    #[test]
    fn decode_plain_jpeg() {
        let bytes = plain_jpeg(&gradient(200, 150), 85);
        let decoded = JpegCodec::new().decode(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), Dimensions::new(200, 150));
        assert!(decoded.metadata_segments().is_empty());
    }

    #[test]
    fn decode_rejects_non_jpeg() {
        let codec = JpegCodec::new();
        assert!(codec.decode(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR").is_err());
        assert!(codec.decode(&[]).is_err());
    }

    #[test]
    fn decode_carries_metadata_segments_in_order() {
        let decoded = JpegCodec::new().decode(&photo_with_gps(64, 48)).unwrap();
        let kinds: Vec<_> = decoded
            .metadata_segments()
            .iter()
            .filter_map(|s| container::classify(s.marker, &s.contents))
            .collect();
        assert_eq!(
            kinds,
            vec![
                SegmentKind::Exif,
                SegmentKind::Xmp,
                SegmentKind::Icc,
                SegmentKind::Iptc,
                SegmentKind::Comment,
            ]
        );
    }

    #[test]
    fn encode_reattaches_carried_segments() {
        let codec = JpegCodec::new();
        let decoded = codec.decode(&photo_with_gps(64, 48)).unwrap();
        let encoded = codec.encode(&decoded, Quality::new(0.7)).unwrap();

        let again = codec.decode(encoded.as_bytes()).unwrap();
        assert_eq!(again.dimensions(), Dimensions::new(64, 48));
        assert_eq!(again.metadata_segments(), decoded.metadata_segments());
    }

    #[test]
    fn encode_without_metadata_is_bare() {
        let codec = JpegCodec::new();
        let image = DecodedImage::new(gradient(32, 32));
        let encoded = codec.encode(&image, Quality::new(0.8)).unwrap();
        let jpeg = container::parse(encoded.as_bytes()).unwrap();
        assert_eq!(container::metadata_segments(&jpeg).count(), 0);
    }

    #[test]
    fn lower_quality_is_smaller() {
        let codec = JpegCodec::new();
        let image = DecodedImage::new(noise(128, 128));
        let high = codec.encode(&image, Quality::new(0.9)).unwrap();
        let low = codec.encode(&image, Quality::new(0.3)).unwrap();
        assert!(low.len() < high.len(), "{} vs {}", low.len(), high.len());
    }

    #[test]
    fn encode_grayscale() {
        let codec = JpegCodec::new();
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(16, 8, image::Luma([90])));
        let encoded = codec
            .encode(&DecodedImage::new(gray), Quality::default())
            .unwrap();
        let decoded = codec.decode(encoded.as_bytes()).unwrap();
        assert_eq!(decoded.dimensions(), Dimensions::new(16, 8));
    }

    #[test]
    fn encode_drops_alpha() {
        let codec = JpegCodec::new();
        let rgba = DynamicImage::new_rgba8(10, 6);
        let encoded = codec
            .encode(&DecodedImage::new(rgba), Quality::default())
            .unwrap();
        assert!(!encoded.is_empty());
    }

    #[test]
    fn decode_applies_rotation_and_resets_tag() {
        let bytes = with_segments(
            plain_jpeg(&gradient(40, 20), 90),
            &[exif_segment(orientation_exif(6))],
        );
        let decoded = JpegCodec::new().decode(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), Dimensions::new(20, 40));

        let segment = &decoded.metadata_segments()[0];
        assert_eq!(read_orientation(&segment.contents[EXIF_PREFIX.len()..]), 1);
    }

    #[test]
    fn decode_upright_tag_keeps_dimensions() {
        let bytes = with_segments(
            plain_jpeg(&gradient(40, 20), 90),
            &[exif_segment(orientation_exif(1))],
        );
        let decoded = JpegCodec::new().decode(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), Dimensions::new(40, 20));
    }

    #[test]
    fn apply_orientation_transforms() {
        let img = gradient(4, 2);
        assert_eq!(apply_orientation(img.clone(), 1).width(), 4);
        assert_eq!(apply_orientation(img.clone(), 3).width(), 4);
        assert_eq!(apply_orientation(img.clone(), 5).width(), 2);
        assert_eq!(apply_orientation(img.clone(), 8).height(), 4);
        assert_eq!(apply_orientation(img, 42).width(), 4);
    }

    #[test]
    fn read_orientation_defaults_to_upright() {
        assert_eq!(read_orientation(b"garbage"), 1);
        assert_eq!(read_orientation(&sample_exif(false, true)), 1);
        assert_eq!(read_orientation(&orientation_exif(8)), 8);
    }
}
