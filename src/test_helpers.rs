//! Shared test utilities for the sendfit test suite.
//!
//! Provides synthetic pixels, plain JPEG encoding, and hand-built metadata
//! segments (EXIF with camera/GPS/maker-note fields, XMP, IPTC, ICC, comments)
//! so metadata tests do not depend on fixture files.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let bytes = photo_with_gps(400, 300);
//! let record = read_metadata(&bytes);
//! assert!(record.gps.is_some());
//! ```

use crate::imaging::MetadataSegment;
use crate::imaging::container;
use image::{DynamicImage, ImageEncoder, RgbImage};
use img_parts::Bytes;
use img_parts::jpeg::markers;

// =========================================================================
// Pixels
// =========================================================================

/// Smooth gradient: compresses very well.
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

/// Deterministic pseudo-random noise: compresses very badly.
pub fn noise(width: u32, height: u32) -> DynamicImage {
    let mut state: u32 = 0x9E37_79B9;
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |_, _| {
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        };
        image::Rgb([next(), next(), next()])
    }))
}

/// Encode pixels as a bare JPEG (JFIF header only, no metadata).
pub fn plain_jpeg(img: &DynamicImage, quality: u8) -> Vec<u8> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality)
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
    buf
}

// =========================================================================
// Metadata segments
// =========================================================================

/// A `(marker, contents)` pair ready to splice into a JPEG.
pub type RawSegment = (u8, Vec<u8>);

pub fn exif_segment(tiff: Vec<u8>) -> RawSegment {
    let mut contents = b"Exif\0\0".to_vec();
    contents.extend(tiff);
    (markers::APP1, contents)
}

pub fn xmp_segment() -> RawSegment {
    let mut contents = b"http://ns.adobe.com/xap/1.0/\0".to_vec();
    contents.extend_from_slice(
        b"<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"><rdf:RDF/></x:xmpmeta>",
    );
    (markers::APP1, contents)
}

/// XMP packet that repeats the Tokyo fix of [`sample_exif`]: coordinates as
/// attributes, altitude as child elements, plus a non-GPS property.
pub fn xmp_gps_segment() -> RawSegment {
    let mut contents = b"http://ns.adobe.com/xap/1.0/\0".to_vec();
    contents.extend_from_slice(
        br#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF><rdf:Description tiff:Make="Canon" exif:GPSLatitude="35,39.486N" exif:GPSLongitude="139,44.906E"><exif:GPSAltitude>40/1</exif:GPSAltitude><exif:GPSAltitudeRef>0</exif:GPSAltitudeRef></rdf:Description></rdf:RDF></x:xmpmeta>"#,
    );
    (markers::APP1, contents)
}

pub fn icc_segment() -> RawSegment {
    let mut contents = b"ICC_PROFILE\0\x01\x01".to_vec();
    contents.extend_from_slice(&[0x11; 64]);
    (markers::APP2, contents)
}

/// APP13 with a Photoshop 8BIM resource holding IPTC caption + keyword.
pub fn iptc_segment() -> RawSegment {
    let mut iim = Vec::new();
    iim.extend_from_slice(&[0x1C, 0x02, 0x78, 0x00, 0x0B]);
    iim.extend_from_slice(b"Street food");
    iim.extend_from_slice(&[0x1C, 0x02, 0x19, 0x00, 0x05]);
    iim.extend_from_slice(b"tokyo");

    let mut contents = b"Photoshop 3.0\0".to_vec();
    contents.extend_from_slice(b"8BIM");
    contents.extend_from_slice(&0x0404u16.to_be_bytes());
    contents.extend_from_slice(&[0, 0]); // empty pascal name, padded
    contents.extend_from_slice(&(iim.len() as u32).to_be_bytes());
    contents.extend(iim);
    (markers::APP13, contents)
}

pub fn comment_segment(text: &str) -> RawSegment {
    (markers::COM, text.as_bytes().to_vec())
}

/// Splice segments into a JPEG right after its header segments.
pub fn with_segments(jpeg: Vec<u8>, segments: &[RawSegment]) -> Vec<u8> {
    let mut parsed = container::parse(&jpeg).unwrap();
    let segments: Vec<MetadataSegment> = segments
        .iter()
        .map(|(marker, contents)| MetadataSegment {
            marker: *marker,
            contents: Bytes::from(contents.clone()),
        })
        .collect();
    container::insert_segments(&mut parsed, &segments);
    container::serialize(parsed)
}

/// A camera-like JPEG: EXIF (device, capture, maker note, GPS), XMP, IPTC,
/// ICC profile and a comment.
pub fn photo_with_gps(width: u32, height: u32) -> Vec<u8> {
    with_segments(
        plain_jpeg(&gradient(width, height), 90),
        &[
            exif_segment(sample_exif(true, true)),
            xmp_segment(),
            icc_segment(),
            iptc_segment(),
            comment_segment("shot on a phone"),
        ],
    )
}

/// EXIF GPS plus the same fix mirrored into XMP, as photo editors write it.
pub fn photo_with_exif_and_xmp_gps(width: u32, height: u32) -> Vec<u8> {
    with_segments(
        plain_jpeg(&gradient(width, height), 90),
        &[exif_segment(sample_exif(true, true)), xmp_gps_segment()],
    )
}

/// Same as [`photo_with_gps`] but the EXIF block has no GPS IFD.
pub fn photo_without_gps(width: u32, height: u32) -> Vec<u8> {
    with_segments(
        plain_jpeg(&gradient(width, height), 90),
        &[exif_segment(sample_exif(false, true)), xmp_segment()],
    )
}

// =========================================================================
// EXIF (TIFF) builder
// =========================================================================

/// A tag value as written into an IFD entry.
#[derive(Debug, Clone)]
pub enum TagValue {
    Byte(Vec<u8>),
    Ascii(&'static str),
    Short(u16),
    Long(u32),
    Rational(Vec<(u32, u32)>),
    Undefined(Vec<u8>),
    /// LONG pointer to the IFD with this index in the builder.
    Ifd(usize),
}

impl TagValue {
    fn typ(&self) -> u16 {
        match self {
            TagValue::Byte(_) => 1,
            TagValue::Ascii(_) => 2,
            TagValue::Short(_) => 3,
            TagValue::Long(_) | TagValue::Ifd(_) => 4,
            TagValue::Rational(_) => 5,
            TagValue::Undefined(_) => 7,
        }
    }

    fn count(&self) -> u32 {
        match self {
            TagValue::Byte(v) | TagValue::Undefined(v) => v.len() as u32,
            TagValue::Ascii(s) => s.len() as u32 + 1,
            TagValue::Short(_) | TagValue::Long(_) | TagValue::Ifd(_) => 1,
            TagValue::Rational(v) => v.len() as u32,
        }
    }

    fn encode(&self, big_endian: bool, ifd_offsets: &[u32]) -> Vec<u8> {
        let u16_bytes = |v: u16| {
            if big_endian {
                v.to_be_bytes()
            } else {
                v.to_le_bytes()
            }
        };
        let u32_bytes = |v: u32| {
            if big_endian {
                v.to_be_bytes()
            } else {
                v.to_le_bytes()
            }
        };
        match self {
            TagValue::Byte(v) | TagValue::Undefined(v) => v.clone(),
            TagValue::Ascii(s) => {
                let mut v = s.as_bytes().to_vec();
                v.push(0);
                v
            }
            TagValue::Short(v) => u16_bytes(*v).to_vec(),
            TagValue::Long(v) => u32_bytes(*v).to_vec(),
            TagValue::Ifd(k) => u32_bytes(ifd_offsets[*k]).to_vec(),
            TagValue::Rational(parts) => parts
                .iter()
                .flat_map(|(n, d)| u32_bytes(*n).into_iter().chain(u32_bytes(*d)))
                .collect(),
        }
    }
}

/// Lays out IFDs back to back after the 8-byte header, each followed by its
/// out-of-line values. Entries must be given in ascending tag order.
pub struct ExifBuilder {
    big_endian: bool,
    ifds: Vec<Vec<(u16, TagValue)>>,
}

impl ExifBuilder {
    pub fn new(big_endian: bool) -> Self {
        Self {
            big_endian,
            ifds: Vec::new(),
        }
    }

    pub fn ifd(mut self, entries: Vec<(u16, TagValue)>) -> Self {
        self.ifds.push(entries);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let be = self.big_endian;
        let dummy = vec![0u32; self.ifds.len()];
        let out_of_line = |v: &TagValue| {
            let n = v.encode(be, &dummy).len();
            if n > 4 { n + n % 2 } else { 0 }
        };

        let mut offsets = Vec::with_capacity(self.ifds.len());
        let mut at = 8usize;
        for ifd in &self.ifds {
            offsets.push(at as u32);
            at += 2 + 12 * ifd.len() + 4 + ifd.iter().map(|(_, v)| out_of_line(v)).sum::<usize>();
        }

        let u16_bytes = |v: u16| if be { v.to_be_bytes() } else { v.to_le_bytes() };
        let u32_bytes = |v: u32| if be { v.to_be_bytes() } else { v.to_le_bytes() };

        let mut out = Vec::with_capacity(at);
        out.extend_from_slice(if be { b"MM" } else { b"II" });
        out.extend_from_slice(&u16_bytes(42));
        out.extend_from_slice(&u32_bytes(8));

        for (k, ifd) in self.ifds.iter().enumerate() {
            let data_start = offsets[k] as usize + 2 + 12 * ifd.len() + 4;
            let mut data = Vec::new();
            out.extend_from_slice(&u16_bytes(ifd.len() as u16));
            for (tag, value) in ifd {
                let bytes = value.encode(be, &offsets);
                out.extend_from_slice(&u16_bytes(*tag));
                out.extend_from_slice(&u16_bytes(value.typ()));
                out.extend_from_slice(&u32_bytes(value.count()));
                if bytes.len() <= 4 {
                    let mut field = bytes;
                    field.resize(4, 0);
                    out.extend(field);
                } else {
                    out.extend_from_slice(&u32_bytes((data_start + data.len()) as u32));
                    data.extend(bytes);
                    if data.len() % 2 == 1 {
                        data.push(0);
                    }
                }
            }
            out.extend_from_slice(&u32_bytes(0));
            out.extend(data);
        }
        out
    }
}

/// A realistic EXIF block: Canon EOS R5, 50mm f/2.8 1/250s ISO 400, taken
/// 2024-05-01, maker note, and (optionally) a GPS fix in central Tokyo
/// (35.6581 N, 139.7484 E, 40 m).
pub fn sample_exif(with_gps: bool, big_endian: bool) -> Vec<u8> {
    let mut ifd0 = vec![
        (0x010F, TagValue::Ascii("Canon")),
        (0x0110, TagValue::Ascii("EOS R5")),
        (0x0131, TagValue::Ascii("Digital Photo Professional")),
        (0x8769, TagValue::Ifd(1)),
    ];
    if with_gps {
        ifd0.push((0x8825, TagValue::Ifd(2)));
    }

    let exif_ifd = vec![
        (0x829A, TagValue::Rational(vec![(1, 250)])),
        (0x829D, TagValue::Rational(vec![(28, 10)])),
        (0x8827, TagValue::Short(400)),
        (0x9003, TagValue::Ascii("2024:05:01 10:20:30")),
        (0x920A, TagValue::Rational(vec![(50, 1)])),
        (0x927C, TagValue::Undefined(vec![0x42; 32])),
    ];

    let mut builder = ExifBuilder::new(big_endian).ifd(ifd0).ifd(exif_ifd);
    if with_gps {
        builder = builder.ifd(vec![
            (0x0000, TagValue::Byte(vec![2, 3, 0, 0])),
            (0x0001, TagValue::Ascii("N")),
            (0x0002, TagValue::Rational(vec![(35, 1), (39, 1), (2916, 100)])),
            (0x0003, TagValue::Ascii("E")),
            (0x0004, TagValue::Rational(vec![(139, 1), (44, 1), (5436, 100)])),
            (0x0005, TagValue::Byte(vec![0])),
            (0x0006, TagValue::Rational(vec![(40, 1)])),
        ]);
    }
    builder.build()
}

/// EXIF block with just a camera make and an Orientation tag.
pub fn orientation_exif(orientation: u16) -> Vec<u8> {
    ExifBuilder::new(false)
        .ifd(vec![
            (0x010F, TagValue::Ascii("Apple")),
            (0x0112, TagValue::Short(orientation)),
        ])
        .build()
}
