//! IPTC-IIM fields from JPEG APP13 segments.
//!
//! An APP13 segment is a `Photoshop 3.0\0` signature followed by image
//! resources (`8BIM`, id, padded Pascal name, length, payload). Resource
//! `0x0404` holds IPTC-IIM datasets: `0x1C`, record, dataset, u16 length,
//! value. Only application-record (2) datasets are read:
//!
//! | Dataset | Field |
//! |---|---|
//! | 2:05 | [`IptcData::object_name`] |
//! | 2:25 | [`IptcData::keywords`] (repeatable) |
//! | 2:80 | [`IptcData::by_line`] |
//! | 2:120 | [`IptcData::caption`] |

use serde::Serialize;

const PHOTOSHOP_SIGNATURE: &[u8] = b"Photoshop 3.0\0";
const RESOURCE_SIGNATURE: &[u8] = b"8BIM";
const IIM_RESOURCE: u16 = 0x0404;
const DATASET_TAG: u8 = 0x1C;
const APPLICATION_RECORD: u8 = 2;

/// Fields read from an APP13 block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IptcData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl IptcData {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Read the IPTC fields of an APP13 segment's contents.
///
/// Truncated or unrecognised blocks yield whatever was read before the
/// damage, possibly nothing.
pub fn read_iptc(app13: &[u8]) -> IptcData {
    let resources = app13.strip_prefix(PHOTOSHOP_SIGNATURE).unwrap_or(app13);
    find_resource(resources, IIM_RESOURCE)
        .map(read_datasets)
        .unwrap_or_default()
}

/// Big-endian byte cursor that returns `None` instead of running off the end.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn u16(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Option<u32> {
        self.take(4).map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// Payload of the first image resource with id `wanted`.
fn find_resource(data: &[u8], wanted: u16) -> Option<&[u8]> {
    let mut cursor = Cursor::new(data);
    loop {
        if cursor.take(4)? != RESOURCE_SIGNATURE {
            return None;
        }
        let id = cursor.u16()?;
        // Name length byte plus name, padded to an even size.
        let name_len = cursor.u8()? as usize;
        cursor.take(name_len + (name_len + 1) % 2)?;
        let len = cursor.u32()? as usize;
        let payload = cursor.take(len)?;
        if id == wanted {
            return Some(payload);
        }
        if len % 2 == 1 {
            cursor.take(1)?;
        }
    }
}

fn read_datasets(iim: &[u8]) -> IptcData {
    let mut out = IptcData::default();
    let mut cursor = Cursor::new(iim);

    while let Some(tag) = cursor.u8() {
        if tag != DATASET_TAG {
            break;
        }
        let Some((record, dataset, len)) = cursor
            .u8()
            .zip(cursor.u8())
            .zip(cursor.u16())
            .map(|((r, d), l)| (r, d, l as usize))
        else {
            break;
        };
        let Some(raw) = cursor.take(len) else {
            break;
        };
        if record != APPLICATION_RECORD {
            continue;
        }

        let value = String::from_utf8_lossy(raw).trim().to_string();
        if value.is_empty() {
            continue;
        }
        match dataset {
            5 => out.object_name = Some(value),
            25 => out.keywords.push(value),
            80 => out.by_line = Some(value),
            120 => out.caption = Some(value),
            _ => {}
        }
    }

    out
}
