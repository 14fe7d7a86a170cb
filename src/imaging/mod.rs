//! Image processing: JPEG pixels plus the metadata segments around them.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode / encode** | `image` JPEG codec, see [`JpegCodec`] |
//! | **Container segments** | `img-parts` (EXIF, XMP, ICC, IPTC, comments) |
//! | **EXIF fields** | `kamadak-exif` reader, custom in-place TIFF patching |
//! | **IPTC metadata** | custom parser (APP13 / 8BIM) |
//! | **XMP GPS** | `regex` over the packet's `exif:GPS*` properties |
//! | **Resize** | `DynamicImage::resize_exact` with `Triangle` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: [`Quality`] and the quality descent schedule
//! - **Codec**: [`Codec`] trait + [`JpegCodec`]
//! - **Operations**: [`resize`] and [`compress_to_fit`], written against the trait

mod calculations;
pub mod codec;
pub(crate) mod container;
pub mod iptc_parser;
pub mod jpeg_codec;
pub mod operations;
mod params;
pub(crate) mod tiff;
pub(crate) mod xmp;

pub use calculations::fit_long_edge;
pub use codec::{
    Codec, DecodeError, DecodedImage, Dimensions, EncodeError, EncodedBuffer, MetadataSegment,
};
pub use jpeg_codec::JpegCodec;
pub use operations::{compress_to_fit, resize};
pub use params::{MAX_DESCENT_STEPS, QUALITY_FLOOR, QUALITY_STEP, Quality, descent_schedule};
