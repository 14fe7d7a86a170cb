//! Metadata inspection and removal for encoded JPEG buffers.
//!
//! A photo straight off a phone carries far more than pixels. This module
//! reads that payload into a closed set of typed categories, and rewrites a
//! buffer with some of them removed.
//!
//! ## Categories
//!
//! | Category | Source | Typical fields |
//! |---|---|---|
//! | [`GpsInfo`] | EXIF GPS IFD, XMP `exif:GPS*` | latitude, longitude, altitude |
//! | [`ExifInfo`] | EXIF sub-IFD | capture time, focal length, exposure |
//! | [`DeviceInfo`] | EXIF IFD0 (TIFF tags) | make, model, software |
//! | [`VendorInfo`] | maker note, IPTC (APP13), XMP, comments, other APPn | opaque or tool-specific blocks |
//! | [`PixelInfo`] | frame header | width, height |
//!
//! A category is `None` when the buffer has no such block. Fields inside a
//! present category are individually optional: a GPS IFD without coordinates
//! is still GPS metadata and still worth removing.
//!
//! ## Stripping
//!
//! [`strip_metadata`] edits the container, never the pixels, so the encode
//! quality chosen earlier stays baked in and the result is never larger than
//! the input:
//!
//! - **strip all** drops every metadata segment. The JFIF/Adobe codec headers
//!   and the ICC colour profile stay.
//! - **strip GPS** unlinks the GPS IFD from the EXIF block and zeroes it in
//!   place. Every other EXIF byte keeps its offset, so the camera, capture
//!   and maker-note fields read back identically. `exif:GPS*` properties are
//!   cut out of the XMP packet; the rest of the packet is kept.
//!
//! ## Display
//!
//! [`read_metadata_for_display`] flattens a record into labelled rows for a
//! "what will be sent" preview.

use crate::imaging::container::{self, EXIF_PREFIX, SegmentKind};
use crate::imaging::iptc_parser::{IptcData, read_iptc};
use crate::imaging::{DecodeError, EncodedBuffer, tiff, xmp};
use exif::{Context, Exif, Field, In, Tag, Value};
use image::{ImageFormat, ImageReader};
use img_parts::Bytes;
use img_parts::jpeg::{Jpeg, JpegSegment};
use serde::Serialize;
use std::io::Cursor;

/// Location recorded by the camera.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GpsInfo {
    /// Decimal degrees, negative south of the equator.
    pub latitude: Option<f64>,
    /// Decimal degrees, negative west of Greenwich.
    pub longitude: Option<f64>,
    /// Metres, negative below sea level.
    pub altitude: Option<f64>,
}

/// Capture settings from the EXIF sub-IFD.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExifInfo {
    /// `YYYY-MM-DD HH:MM:SS`, camera local time.
    pub captured_at: Option<String>,
    pub focal_length_mm: Option<f64>,
    /// Seconds.
    pub exposure_time: Option<f64>,
    pub f_number: Option<f64>,
    pub iso: Option<u32>,
}

/// Camera and software identification from IFD0.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub make: Option<String>,
    pub model: Option<String>,
    pub software: Option<String>,
}

impl DeviceInfo {
    /// `"make model"`, or whichever half is known.
    pub fn camera(&self) -> Option<String> {
        match (&self.make, &self.model) {
            (Some(make), Some(model)) => Some(format!("{make} {model}")),
            (Some(one), None) | (None, Some(one)) => Some(one.clone()),
            (None, None) => None,
        }
    }
}

/// Vendor-specific and tool-specific blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VendorInfo {
    /// Size of the EXIF MakerNote blob.
    pub maker_note_bytes: Option<usize>,
    /// Present whenever an APP13 (Photoshop) block exists, even if it holds
    /// no IPTC fields we understand.
    pub iptc: Option<IptcData>,
    /// Total size of the XMP packets.
    pub xmp_bytes: Option<usize>,
    pub comment: Option<String>,
    /// Application segments nobody here knows how to read.
    pub other_segments: usize,
}

impl VendorInfo {
    /// Short names of the blocks present, in a stable order.
    pub fn block_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.maker_note_bytes.is_some() {
            names.push("Maker note");
        }
        if self.iptc.is_some() {
            names.push("IPTC");
        }
        if self.xmp_bytes.is_some() {
            names.push("XMP");
        }
        if self.comment.is_some() {
            names.push("Comment");
        }
        if self.other_segments > 0 {
            names.push("Other");
        }
        names
    }
}

/// Pixel dimensions as stored in the frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelInfo {
    pub width: u32,
    pub height: u32,
}

/// Everything [`read_metadata`] found in a buffer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetadataRecord {
    pub gps: Option<GpsInfo>,
    pub exif: Option<ExifInfo>,
    pub device: Option<DeviceInfo>,
    pub vendor: Option<VendorInfo>,
    pub image: Option<PixelInfo>,
}

impl MetadataRecord {
    pub fn has_gps(&self) -> bool {
        self.gps.is_some()
    }

    /// Whether any descriptive category (everything but [`PixelInfo`]) is present.
    pub fn has_metadata(&self) -> bool {
        self.gps.is_some() || self.exif.is_some() || self.device.is_some() || self.vendor.is_some()
    }
}

// ============================================================================
// Reading
// ============================================================================

/// Parse the metadata of an encoded buffer.
///
/// Never fails: anything that is not a JPEG yields an empty record, and a
/// malformed EXIF block just leaves the EXIF-derived categories empty.
pub fn read_metadata(bytes: &[u8]) -> MetadataRecord {
    let Ok(jpeg) = container::parse(bytes) else {
        return MetadataRecord::default();
    };

    let exif = container::exif_payload(&jpeg)
        .and_then(|tiff| exif::Reader::new().read_raw(tiff.to_vec()).ok());
    let xmp_packets: Vec<&[u8]> = container::metadata_segments(&jpeg)
        .filter(|(kind, _)| *kind == SegmentKind::Xmp)
        .map(|(_, s)| &s.contents()[..])
        .collect();

    MetadataRecord {
        gps: read_gps(exif.as_ref(), &xmp_packets),
        exif: exif.as_ref().and_then(read_exif),
        device: exif.as_ref().and_then(read_device),
        vendor: read_vendor(&jpeg, exif.as_ref()),
        image: read_dimensions(bytes),
    }
}

fn primary_fields(exif: &Exif) -> impl Iterator<Item = &Field> {
    exif.fields().filter(|f| f.ifd_num == In::PRIMARY)
}

fn field<'a>(exif: &'a Exif, tag: Tag) -> Option<&'a Field> {
    exif.get_field(tag, In::PRIMARY)
}

fn is_pointer(tag: Tag) -> bool {
    matches!(
        tag,
        Tag::ExifIFDPointer | Tag::GPSInfoIFDPointer | Tag::InteropIFDPointer
    )
}

fn ascii(exif: &Exif, tag: Tag) -> Option<String> {
    match &field(exif, tag)?.value {
        Value::Ascii(parts) => parts
            .first()
            .map(|s| String::from_utf8_lossy(s).trim_end_matches('\0').trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

/// Rational component `index` as a finite float.
fn rational(exif: &Exif, tag: Tag, index: usize) -> Option<f64> {
    match &field(exif, tag)?.value {
        Value::Rational(values) => values
            .get(index)
            .map(|r| r.to_f64())
            .filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Degrees/minutes/seconds triple to signed decimal degrees.
fn coordinate(exif: &Exif, value: Tag, reference: Tag, negative: &str) -> Option<f64> {
    let degrees = rational(exif, value, 0)?;
    let minutes = rational(exif, value, 1).unwrap_or(0.0);
    let seconds = rational(exif, value, 2).unwrap_or(0.0);
    let decimal = degrees + minutes / 60.0 + seconds / 3600.0;
    let sign = match ascii(exif, reference) {
        Some(r) if r.eq_ignore_ascii_case(negative) => -1.0,
        _ => 1.0,
    };
    Some(sign * decimal)
}

/// EXIF GPS, with fields the EXIF block lacks taken from XMP. Either source
/// alone makes the category present.
fn read_gps(exif: Option<&Exif>, xmp_packets: &[&[u8]]) -> Option<GpsInfo> {
    let from_exif = exif.and_then(exif_gps);
    let mut xmp_gps = xmp_packets.iter().copied().filter(|p| xmp::has_gps(p)).peekable();
    if from_exif.is_none() && xmp_gps.peek().is_none() {
        return None;
    }

    let mut gps = from_exif.unwrap_or_default();
    for packet in xmp_gps {
        gps.latitude = gps.latitude.or_else(|| xmp::latitude(packet));
        gps.longitude = gps.longitude.or_else(|| xmp::longitude(packet));
        gps.altitude = gps.altitude.or_else(|| xmp::altitude(packet));
    }
    Some(gps)
}

fn exif_gps(exif: &Exif) -> Option<GpsInfo> {
    let present = primary_fields(exif)
        .any(|f| f.tag == Tag::GPSInfoIFDPointer || f.tag.context() == Context::Gps);
    if !present {
        return None;
    }

    let below_sea_level =
        field(exif, Tag::GPSAltitudeRef).and_then(|f| f.value.get_uint(0)) == Some(1);
    let altitude = rational(exif, Tag::GPSAltitude, 0)
        .map(|alt| if below_sea_level { -alt } else { alt });

    Some(GpsInfo {
        latitude: coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, "S"),
        longitude: coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, "W"),
        altitude,
    })
}

fn captured_at(exif: &Exif) -> Option<String> {
    let raw = ascii(exif, Tag::DateTimeOriginal).or_else(|| ascii(exif, Tag::DateTimeDigitized))?;
    Some(match exif::DateTime::from_ascii(raw.as_bytes()) {
        Ok(dt) => format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            dt.year, dt.month, dt.day, dt.hour, dt.minute, dt.second
        ),
        Err(_) => raw,
    })
}

fn read_exif(exif: &Exif) -> Option<ExifInfo> {
    let present = primary_fields(exif).any(|f| {
        f.tag == Tag::ExifIFDPointer || (f.tag.context() == Context::Exif && f.tag != Tag::MakerNote)
    });
    if !present {
        return None;
    }

    Some(ExifInfo {
        captured_at: captured_at(exif),
        focal_length_mm: rational(exif, Tag::FocalLength, 0),
        exposure_time: rational(exif, Tag::ExposureTime, 0),
        f_number: rational(exif, Tag::FNumber, 0),
        iso: field(exif, Tag::PhotographicSensitivity).and_then(|f| f.value.get_uint(0)),
    })
}

fn read_device(exif: &Exif) -> Option<DeviceInfo> {
    let present =
        primary_fields(exif).any(|f| f.tag.context() == Context::Tiff && !is_pointer(f.tag));
    if !present {
        return None;
    }

    Some(DeviceInfo {
        make: ascii(exif, Tag::Make),
        model: ascii(exif, Tag::Model),
        software: ascii(exif, Tag::Software),
    })
}

fn read_vendor(jpeg: &Jpeg, exif: Option<&Exif>) -> Option<VendorInfo> {
    let mut vendor = VendorInfo {
        maker_note_bytes: exif
            .and_then(|e| field(e, Tag::MakerNote))
            .map(|f| match &f.value {
                Value::Undefined(bytes, _) => bytes.len(),
                _ => 0,
            }),
        ..VendorInfo::default()
    };

    for (kind, segment) in container::metadata_segments(jpeg) {
        let contents = segment.contents();
        match kind {
            SegmentKind::Iptc if vendor.iptc.is_none() => vendor.iptc = Some(read_iptc(contents)),
            SegmentKind::Xmp => {
                *vendor.xmp_bytes.get_or_insert(0) += contents.len();
            }
            SegmentKind::Comment if vendor.comment.is_none() => {
                vendor.comment = Some(String::from_utf8_lossy(contents).trim().to_string());
            }
            SegmentKind::Other | SegmentKind::MultiPicture => vendor.other_segments += 1,
            _ => {}
        }
    }

    (vendor != VendorInfo::default()).then_some(vendor)
}

fn read_dimensions(bytes: &[u8]) -> Option<PixelInfo> {
    let (width, height) = ImageReader::with_format(Cursor::new(bytes), ImageFormat::Jpeg)
        .into_dimensions()
        .ok()?;
    Some(PixelInfo { width, height })
}

// ============================================================================
// Stripping
// ============================================================================

/// Rewrite `bytes` without the requested metadata.
///
/// - `strip_all` removes every metadata category (GPS included, whatever
///   `strip_gps` says).
/// - `strip_gps` alone removes only the GPS category.
/// - Neither flag returns the input unchanged.
///
/// Only the container is edited; the compressed pixels are copied verbatim.
/// When there is nothing to remove the input comes back byte for byte.
///
/// Fails if `bytes` is not a JPEG container, or if GPS removal is requested
/// and the EXIF block is malformed.
pub fn strip_metadata(
    bytes: &[u8],
    strip_gps: bool,
    strip_all: bool,
) -> Result<EncodedBuffer, DecodeError> {
    let mut jpeg = container::parse(bytes)?;

    let changed = if strip_all {
        strip_all_segments(&mut jpeg)
    } else if strip_gps {
        strip_gps_fields(&mut jpeg)?
    } else {
        false
    };

    if changed {
        Ok(EncodedBuffer::new(container::serialize(jpeg)))
    } else {
        Ok(EncodedBuffer::new(bytes.to_vec()))
    }
}

fn strip_all_segments(jpeg: &mut Jpeg) -> bool {
    let segments = jpeg.segments_mut();
    let before = segments.len();
    segments.retain(|s| {
        container::classify(s.marker(), s.contents()).is_none_or(SegmentKind::survives_strip_all)
    });
    let removed = before - segments.len();
    tracing::debug!("strip all: removed {removed} metadata segments");
    removed > 0
}

fn strip_gps_fields(jpeg: &mut Jpeg) -> Result<bool, DecodeError> {
    let mut changed = false;
    for segment in jpeg.segments_mut().iter_mut() {
        let rewritten = match container::classify(segment.marker(), segment.contents()) {
            Some(SegmentKind::Exif) => {
                let mut contents = segment.contents().to_vec();
                let removed = tiff::remove_gps(&mut contents[EXIF_PREFIX.len()..])
                    .map_err(|e| DecodeError(format!("malformed EXIF block: {e}")))?;
                removed.then_some(contents)
            }
            Some(SegmentKind::Xmp) => xmp::remove_gps(segment.contents()),
            _ => None,
        };
        if let Some(contents) = rewritten {
            *segment = JpegSegment::new_with_contents(segment.marker(), Bytes::from(contents));
            changed = true;
        }
    }
    tracing::debug!("strip GPS: {}", if changed { "removed" } else { "none present" });
    Ok(changed)
}

// ============================================================================
// Display
// ============================================================================

/// Which category a display row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataCategory {
    Gps,
    Exif,
    Device,
    Vendor,
    Image,
}

/// One row of a metadata preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataItem {
    pub label: String,
    pub value: String,
    /// Presentation hint (an SF Symbols name).
    pub icon: &'static str,
    pub category: MetadataCategory,
}

impl MetadataItem {
    fn new(
        label: &str,
        value: String,
        icon: &'static str,
        category: MetadataCategory,
    ) -> Self {
        Self {
            label: label.to_string(),
            value,
            icon,
            category,
        }
    }
}

/// Read a buffer's metadata and flatten it into preview rows.
pub fn read_metadata_for_display(bytes: &[u8]) -> Vec<MetadataItem> {
    display_items(&read_metadata(bytes))
}

/// Preview rows for a record: location, capture time, focal length, camera,
/// vendor blocks, resolution. Absent data produces no row.
pub fn display_items(record: &MetadataRecord) -> Vec<MetadataItem> {
    let mut items = Vec::new();

    if let Some(gps) = &record.gps {
        let value = match (gps.latitude, gps.longitude) {
            (Some(lat), Some(lon)) => format!("{lat:.4}, {lon:.4}"),
            _ => "Present".to_string(),
        };
        items.push(MetadataItem::new(
            "Location",
            value,
            "location.fill",
            MetadataCategory::Gps,
        ));
    }

    if let Some(exif) = &record.exif {
        if let Some(captured) = &exif.captured_at {
            items.push(MetadataItem::new(
                "Captured",
                captured.clone(),
                "calendar",
                MetadataCategory::Exif,
            ));
        }
        if let Some(focal) = exif.focal_length_mm {
            items.push(MetadataItem::new(
                "Focal length",
                format!("{focal:.0}mm"),
                "camera.metering.center.weighted",
                MetadataCategory::Exif,
            ));
        }
    }

    if let Some(camera) = record.device.as_ref().and_then(DeviceInfo::camera) {
        items.push(MetadataItem::new(
            "Camera",
            camera,
            "camera",
            MetadataCategory::Device,
        ));
    }

    if let Some(vendor) = &record.vendor {
        items.push(MetadataItem::new(
            "Vendor data",
            vendor.block_names().join(", "),
            "tag",
            MetadataCategory::Vendor,
        ));
    }

    if let Some(px) = record.image {
        items.push(MetadataItem::new(
            "Resolution",
            format!("{} × {}", px.width, px.height),
            "aspectratio",
            MetadataCategory::Image,
        ));
    }

    items
}
