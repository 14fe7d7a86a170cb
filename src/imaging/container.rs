//! JPEG container segments: which ones are metadata, and what kind.
//!
//! A JPEG is a sequence of marker segments ahead of the entropy-coded scan.
//! Metadata lives in application segments (`APP1`–`APP15`) and comments
//! (`COM`); the frame/table segments belong to the codec. `img-parts` splits
//! the container; this module names the pieces.
//!
//! | Marker | Signature | Kind |
//! |---|---|---|
//! | APP0 | `JFIF\0` | codec header, never treated as metadata |
//! | APP1 | `Exif\0\0` | [`SegmentKind::Exif`] |
//! | APP1 | `http://ns.adobe.com/xap/1.0/\0` | [`SegmentKind::Xmp`] |
//! | APP2 | `ICC_PROFILE\0` | [`SegmentKind::Icc`] |
//! | APP2 | `MPF\0` | [`SegmentKind::MultiPicture`] |
//! | APP13 | `Photoshop 3.0\0` | [`SegmentKind::Iptc`] |
//! | APP14 | `Adobe` | codec colour-transform flag, never metadata |
//! | COM | (any) | [`SegmentKind::Comment`] |
//! | other APPn | (any) | [`SegmentKind::Other`] |

use super::codec::{DecodeError, MetadataSegment};
use img_parts::Bytes;
use img_parts::jpeg::{Jpeg, JpegSegment, markers};

pub(crate) const EXIF_PREFIX: &[u8] = b"Exif\0\0";
pub(crate) const XMP_PREFIX: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const XMP_EXTENSION_PREFIX: &[u8] = b"http://ns.adobe.com/xmp/extension/\0";
const ICC_PREFIX: &[u8] = b"ICC_PROFILE\0";
const MPF_PREFIX: &[u8] = b"MPF\0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Exif,
    Xmp,
    Icc,
    /// Photoshop image resources, usually wrapping IPTC-IIM.
    Iptc,
    /// Multi-Picture index; its offsets point past the primary image.
    MultiPicture,
    Comment,
    Other,
}

impl SegmentKind {
    /// Whether a re-encode should copy this segment onto the new container.
    ///
    /// The MPF index describes secondary images appended after the original
    /// scan; those are not re-encoded, so the index would dangle.
    pub fn is_carried(self) -> bool {
        !matches!(self, SegmentKind::MultiPicture)
    }

    /// Whether a strip-all pass keeps this segment. Only the colour profile
    /// survives.
    pub fn survives_strip_all(self) -> bool {
        matches!(self, SegmentKind::Icc)
    }
}

/// Classify a segment, or `None` if it is not metadata.
pub fn classify(marker: u8, contents: &[u8]) -> Option<SegmentKind> {
    match marker {
        markers::APP0 | markers::APP14 => None,
        markers::APP1 if contents.starts_with(EXIF_PREFIX) => Some(SegmentKind::Exif),
        markers::APP1
            if contents.starts_with(XMP_PREFIX) || contents.starts_with(XMP_EXTENSION_PREFIX) =>
        {
            Some(SegmentKind::Xmp)
        }
        markers::APP2 if contents.starts_with(ICC_PREFIX) => Some(SegmentKind::Icc),
        markers::APP2 if contents.starts_with(MPF_PREFIX) => Some(SegmentKind::MultiPicture),
        markers::APP13 => Some(SegmentKind::Iptc),
        markers::COM => Some(SegmentKind::Comment),
        m if (markers::APP1..=markers::APP15).contains(&m) => Some(SegmentKind::Other),
        _ => None,
    }
}

/// Split a JPEG into its segments. Fails on anything that is not a JPEG.
pub fn parse(bytes: &[u8]) -> Result<Jpeg, DecodeError> {
    Jpeg::from_bytes(Bytes::copy_from_slice(bytes))
        .map_err(|e| DecodeError(format!("not a JPEG container: {e}")))
}

/// Serialize a (possibly edited) container back to bytes.
pub fn serialize(jpeg: Jpeg) -> Vec<u8> {
    jpeg.encoder().bytes().to_vec()
}

/// Every metadata segment of the container, in file order.
pub fn metadata_segments(jpeg: &Jpeg) -> impl Iterator<Item = (SegmentKind, &JpegSegment)> {
    jpeg.segments()
        .iter()
        .filter_map(|s| classify(s.marker(), s.contents()).map(|kind| (kind, s)))
}

/// The TIFF payload of the first EXIF segment (prefix removed).
pub fn exif_payload(jpeg: &Jpeg) -> Option<&[u8]> {
    metadata_segments(jpeg)
        .find(|(kind, _)| *kind == SegmentKind::Exif)
        .map(|(_, s)| &s.contents()[EXIF_PREFIX.len()..])
}

/// Segments a re-encode should carry over, as owned values.
pub fn carried_segments(jpeg: &Jpeg) -> Vec<MetadataSegment> {
    metadata_segments(jpeg)
        .filter(|(kind, _)| kind.is_carried())
        .map(|(_, s)| MetadataSegment {
            marker: s.marker(),
            contents: s.contents().clone(),
        })
        .collect()
}

/// Insert segments right after the codec's own header segments (APP0/APP14),
/// which is where cameras put them.
pub fn insert_segments(jpeg: &mut Jpeg, segments: &[MetadataSegment]) {
    let segs = jpeg.segments_mut();
    let at = segs
        .iter()
        .take_while(|s| matches!(s.marker(), markers::APP0 | markers::APP14))
        .count();
    for (i, seg) in segments.iter().enumerate() {
        segs.insert(
            at + i,
            JpegSegment::new_with_contents(seg.marker, seg.contents.clone()),
        );
    }
}
