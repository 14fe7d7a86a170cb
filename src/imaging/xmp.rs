//! GPS properties inside XMP packets.
//!
//! Cameras and editors mirror the EXIF GPS IFD into XMP as `exif:GPS*`
//! properties, either as attributes of `rdf:Description`:
//!
//! ```text
//! <rdf:Description exif:GPSLatitude="35,39.486N" exif:GPSLongitude="139,44.904E"/>
//! ```
//!
//! or as child elements:
//!
//! ```text
//! <exif:GPSLatitude>35,39.486N</exif:GPSLatitude>
//! ```
//!
//! Coordinates are `DDD,MM,SSk` or `DDD,MM.mmk` with `k` one of `NSEW`.
//! Only the main packet (`http://ns.adobe.com/xap/1.0/`) is edited; extended
//! XMP chunks carry offsets into a reassembled document and are left alone.

use super::container::XMP_PREFIX;
use regex::bytes::Regex;
use std::sync::LazyLock;

static GPS_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?-u)\s+exif:(GPS[A-Za-z]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("static pattern")
});

static GPS_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s-u)<exif:(GPS[A-Za-z]+)(?:\s[^>]*)?(?:/>|>(.*?)</exif:GPS[A-Za-z]+\s*>)")
        .expect("static pattern")
});

/// Whether an XMP segment carries any `exif:GPS*` property.
pub fn has_gps(segment: &[u8]) -> bool {
    GPS_ATTRIBUTE.is_match(segment) || GPS_ELEMENT.is_match(segment)
}

/// Text value of the `exif:<name>` property, attribute or element form.
fn property(segment: &[u8], name: &str) -> Option<String> {
    let from_attribute = GPS_ATTRIBUTE
        .captures_iter(segment)
        .find(|c| &c[1] == name.as_bytes())
        .and_then(|c| c.get(2).or_else(|| c.get(3)));
    let from_element = || {
        GPS_ELEMENT
            .captures_iter(segment)
            .find(|c| &c[1] == name.as_bytes())
            .and_then(|c| c.get(2))
    };
    let raw = from_attribute.or_else(from_element)?;
    let text = String::from_utf8_lossy(raw.as_bytes()).trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// `DDD,MM,SSk` / `DDD,MM.mmk` to signed decimal degrees.
fn parse_coordinate(raw: &str) -> Option<f64> {
    let direction = raw.chars().last()?;
    let sign = match direction.to_ascii_uppercase() {
        'N' | 'E' => 1.0,
        'S' | 'W' => -1.0,
        _ => return None,
    };
    let body = &raw[..raw.len() - direction.len_utf8()];

    let mut parts = body.split(',').map(|p| p.trim().parse::<f64>());
    let degrees = parts.next()?.ok()?;
    let minutes = parts.next().transpose().ok()?.unwrap_or(0.0);
    let seconds = parts.next().transpose().ok()?.unwrap_or(0.0);
    let decimal = sign * (degrees + minutes / 60.0 + seconds / 3600.0);
    decimal.is_finite().then_some(decimal)
}

/// `n/d` or a plain number.
fn parse_rational(raw: &str) -> Option<f64> {
    let value = match raw.split_once('/') {
        Some((n, d)) => n.trim().parse::<f64>().ok()? / d.trim().parse::<f64>().ok()?,
        None => raw.parse::<f64>().ok()?,
    };
    value.is_finite().then_some(value)
}

pub fn latitude(segment: &[u8]) -> Option<f64> {
    property(segment, "GPSLatitude").as_deref().and_then(parse_coordinate)
}

pub fn longitude(segment: &[u8]) -> Option<f64> {
    property(segment, "GPSLongitude").as_deref().and_then(parse_coordinate)
}

/// Metres; negative when `exif:GPSAltitudeRef` is 1.
pub fn altitude(segment: &[u8]) -> Option<f64> {
    let metres = property(segment, "GPSAltitude").as_deref().and_then(parse_rational)?;
    let below = property(segment, "GPSAltitudeRef").as_deref() == Some("1");
    Some(if below { -metres } else { metres })
}

/// The segment with every `exif:GPS*` property removed, or `None` when
/// there is nothing to remove (or the segment is an extended XMP chunk).
pub fn remove_gps(segment: &[u8]) -> Option<Vec<u8>> {
    if !segment.starts_with(XMP_PREFIX) || !has_gps(segment) {
        return None;
    }
    let without_elements = GPS_ELEMENT.replace_all(segment, &b""[..]);
    let without_attributes = GPS_ATTRIBUTE.replace_all(&without_elements, &b""[..]);
    Some(without_attributes.into_owned())
}
