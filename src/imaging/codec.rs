//! Codec trait and the value types that flow through the pipeline.
//!
//! The [`Codec`] trait defines the two pixel-level operations every codec must
//! support: decode and encode. Everything else in the crate (resize, quality
//! search, orchestration) is written against the trait so tests can swap in a
//! recording mock and count encode calls.
//!
//! The production implementation is
//! [`JpegCodec`](super::jpeg_codec::JpegCodec).

use super::params::Quality;
use image::DynamicImage;
use img_parts::Bytes;
use serde::Serialize;
use thiserror::Error;

/// Input bytes could not be parsed as the expected image container.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot decode image: {0}")]
pub struct DecodeError(pub String);

/// Pixel data could not be serialized at the requested quality.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot encode image at quality {quality:.2}: {reason}")]
pub struct EncodeError {
    pub quality: f32,
    pub reason: String,
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A raw container segment (`APPn` or `COM`) lifted from an encoded image.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataSegment {
    pub marker: u8,
    pub contents: Bytes,
}

/// An in-memory raster plus the metadata segments of the container it came from.
///
/// Never mutated in place: resizing or re-encoding yields a new value. The
/// carried segments are written back by [`Codec::encode`], so a decoded photo
/// keeps its EXIF/XMP/ICC until something strips them.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: DynamicImage,
    metadata: Vec<MetadataSegment>,
}

impl DecodedImage {
    /// Wrap bare pixels with no carried metadata.
    pub fn new(pixels: DynamicImage) -> Self {
        Self {
            pixels,
            metadata: Vec::new(),
        }
    }

    pub fn with_metadata(pixels: DynamicImage, metadata: Vec<MetadataSegment>) -> Self {
        Self { pixels, metadata }
    }

    /// Same carried metadata, different pixels.
    pub(crate) fn with_pixels(&self, pixels: DynamicImage) -> Self {
        Self {
            pixels,
            metadata: self.metadata.clone(),
        }
    }

    /// Same pixels, carrying only the segments `keep` accepts.
    pub(crate) fn retain_metadata(mut self, keep: impl FnMut(&MetadataSegment) -> bool) -> Self {
        self.metadata.retain(keep);
        self
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn metadata_segments(&self) -> &[MetadataSegment] {
        &self.metadata
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width(), self.height())
    }
}

/// An immutable encoded image (JPEG container, metadata included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBuffer(Vec<u8>);

impl EncodedBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Trait for image codecs.
///
/// Implementations must be pure: same input, same output, no shared mutable
/// state. `Sync` lets one codec serve parallel `optimize` calls.
pub trait Codec: Sync {
    /// Decode an encoded container into pixels plus carried metadata.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError>;

    /// Encode pixels at the given quality, re-attaching carried metadata.
    fn encode(&self, image: &DecodedImage, quality: Quality) -> Result<EncodedBuffer, EncodeError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    type SizeFn = Box<dyn Fn(u8) -> Option<usize> + Send + Sync>;

    /// Mock codec that records operations and fabricates buffers.
    ///
    /// Encoded size is a function of the JPEG quality; `None` from that
    /// function means the encode fails. Decoding returns blank pixels with
    /// the dimensions of the last encoded image.
    /// Uses Mutex (not RefCell) so it is Sync like real codecs.
    pub struct MockCodec {
        size_for_quality: SizeFn,
        decode_fails: bool,
        last_encoded: Mutex<Option<Dimensions>>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode(usize),
        Encode { quality: u8, width: u32, height: u32 },
    }

    impl MockCodec {
        /// 10 KB per quality point: quality 75 → 750 000 bytes.
        pub fn linear() -> Self {
            Self::with_sizes(|q| Some(q as usize * 10_000))
        }

        pub fn with_sizes(f: impl Fn(u8) -> Option<usize> + Send + Sync + 'static) -> Self {
            Self {
                size_for_quality: Box::new(f),
                decode_fails: false,
                last_encoded: Mutex::new(None),
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn failing_decode(mut self) -> Self {
            self.decode_fails = true;
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        /// JPEG qualities of every encode call, in order.
        pub fn encode_qualities(&self) -> Vec<u8> {
            self.get_operations()
                .into_iter()
                .filter_map(|op| match op {
                    RecordedOp::Encode { quality, .. } => Some(quality),
                    RecordedOp::Decode(_) => None,
                })
                .collect()
        }
    }

    impl Codec for MockCodec {
        fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode(bytes.len()));

            if self.decode_fails {
                return Err(DecodeError("mock decode failure".to_string()));
            }
            let dims = self
                .last_encoded
                .lock()
                .unwrap()
                .unwrap_or(Dimensions::new(1, 1));
            Ok(DecodedImage::new(DynamicImage::new_rgb8(
                dims.width,
                dims.height,
            )))
        }

        fn encode(
            &self,
            image: &DecodedImage,
            quality: Quality,
        ) -> Result<EncodedBuffer, EncodeError> {
            let q = quality.to_jpeg();
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                quality: q,
                width: image.width(),
                height: image.height(),
            });
            *self.last_encoded.lock().unwrap() = Some(image.dimensions());

            match (self.size_for_quality)(q) {
                Some(len) => Ok(EncodedBuffer::new(vec![0xAB; len])),
                None => Err(EncodeError {
                    quality: quality.value(),
                    reason: "mock encode failure".to_string(),
                }),
            }
        }
    }

    fn blank(width: u32, height: u32) -> DecodedImage {
        DecodedImage::new(DynamicImage::new_rgb8(width, height))
    }

    #[test]
    fn mock_records_encode() {
        let codec = MockCodec::linear();
        let out = codec.encode(&blank(80, 60), Quality::new(0.75)).unwrap();

        assert_eq!(out.len(), 750_000);
        assert_eq!(
            codec.get_operations(),
            vec![RecordedOp::Encode {
                quality: 75,
                width: 80,
                height: 60
            }]
        );
    }

    #[test]
    fn mock_decode_returns_last_encoded_dimensions() {
        let codec = MockCodec::linear();
        let out = codec.encode(&blank(32, 24), Quality::new(0.5)).unwrap();
        let decoded = codec.decode(out.as_bytes()).unwrap();
        assert_eq!(decoded.dimensions(), Dimensions::new(32, 24));
    }

    #[test]
    fn mock_encode_failure_reports_quality() {
        let codec = MockCodec::with_sizes(|_| None);
        let err = codec.encode(&blank(4, 4), Quality::new(0.9)).unwrap_err();
        assert_eq!(err.quality, 0.9);
    }

    #[test]
    fn retain_metadata_filters_segments() {
        let note = MetadataSegment {
            marker: 0xFE,
            contents: Bytes::from_static(b"note"),
        };
        let app2 = MetadataSegment {
            marker: 0xE2,
            contents: Bytes::from_static(b"profile"),
        };
        let image = DecodedImage::with_metadata(DynamicImage::new_rgb8(8, 8), vec![note, app2.clone()]);

        let kept = image.retain_metadata(|s| s.marker == 0xE2);
        assert_eq!(kept.metadata_segments(), &[app2][..]);
        assert_eq!(kept.dimensions(), Dimensions::new(8, 8));
    }

    #[test]
    fn with_pixels_keeps_carried_metadata() {
        let segment = MetadataSegment {
            marker: 0xFE,
            contents: Bytes::from_static(b"hello"),
        };
        let image = DecodedImage::with_metadata(DynamicImage::new_rgb8(8, 8), vec![segment]);
        let smaller = image.with_pixels(DynamicImage::new_rgb8(4, 4));

        assert_eq!(smaller.dimensions(), Dimensions::new(4, 4));
        assert_eq!(smaller.metadata_segments(), image.metadata_segments());
    }
}
