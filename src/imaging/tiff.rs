//! Minimal in-place editor for EXIF (TIFF) blocks.
//!
//! Two edits, both done without moving any byte that another IFD might point
//! at:
//! - [`remove_gps`] unlinks the GPS IFD from IFD0 and zeroes the GPS IFD plus
//!   its out-of-line values.
//! - [`reset_orientation`] rewrites the IFD0 Orientation tag to `1` (upright).
//!
//! TIFF layout refresher:
//!   Bytes 0-1: `II` (little-endian) or `MM` (big-endian)
//!   Bytes 2-3: magic 42
//!   Bytes 4-7: offset of IFD0
//!   IFD:       entry count (u16), entries (12 bytes each), next-IFD offset (u32)
//!   Entry:     tag (u16), type (u16), count (u32), value or offset (u32)

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TiffError {
    #[error("not a TIFF header")]
    BadHeader,
    #[error("EXIF block truncated at offset {0}")]
    Truncated(usize),
}

pub(crate) const TAG_ORIENTATION: u16 = 0x0112;
pub(crate) const TAG_GPS_IFD: u16 = 0x8825;

const TYPE_SHORT: u16 = 3;
const ENTRY_LEN: usize = 12;

/// TIFF type sizes: count is number of values, not bytes.
fn type_size(typ: u16) -> usize {
    match typ {
        1 | 2 | 6 | 7 => 1,   // BYTE, ASCII, SBYTE, UNDEFINED
        3 | 8 => 2,           // SHORT, SSHORT
        4 | 9 | 11 | 13 => 4, // LONG, SLONG, FLOAT, IFD
        5 | 10 | 12 => 8,     // RATIONAL, SRATIONAL, DOUBLE
        _ => 1,
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    /// Offset of the entry itself within the block.
    pos: usize,
    tag: u16,
    typ: u16,
    count: u32,
}

impl Entry {
    fn value_len(&self) -> usize {
        (self.count as usize).saturating_mul(type_size(self.typ))
    }

    fn value_field(&self) -> usize {
        self.pos + 8
    }
}

struct Tiff<D> {
    data: D,
    big_endian: bool,
}

impl<D: AsRef<[u8]>> Tiff<D> {
    fn new(data: D) -> Result<Self, TiffError> {
        let big_endian = match data.as_ref().get(0..2) {
            Some(b"MM") => true,
            Some(b"II") => false,
            _ => return Err(TiffError::BadHeader),
        };
        let tiff = Self { data, big_endian };
        if tiff.read_u16(2).ok() != Some(42) {
            return Err(TiffError::BadHeader);
        }
        Ok(tiff)
    }

    fn bytes(&self, offset: usize, len: usize) -> Result<&[u8], TiffError> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.as_ref().get(offset..end))
            .ok_or(TiffError::Truncated(offset))
    }

    fn read_u16(&self, offset: usize) -> Result<u16, TiffError> {
        let b = self.bytes(offset, 2)?;
        let b = [b[0], b[1]];
        Ok(if self.big_endian {
            u16::from_be_bytes(b)
        } else {
            u16::from_le_bytes(b)
        })
    }

    fn read_u32(&self, offset: usize) -> Result<u32, TiffError> {
        let b = self.bytes(offset, 4)?;
        let b = [b[0], b[1], b[2], b[3]];
        Ok(if self.big_endian {
            u32::from_be_bytes(b)
        } else {
            u32::from_le_bytes(b)
        })
    }

    fn ifd0(&self) -> Result<usize, TiffError> {
        Ok(self.read_u32(4)? as usize)
    }

    fn entries(&self, ifd: usize) -> Result<Vec<Entry>, TiffError> {
        let count = self.read_u16(ifd)? as usize;
        let start = ifd + 2;
        self.bytes(start, count * ENTRY_LEN)?;

        (0..count)
            .map(|i| {
                let pos = start + i * ENTRY_LEN;
                Ok(Entry {
                    pos,
                    tag: self.read_u16(pos)?,
                    typ: self.read_u16(pos + 2)?,
                    count: self.read_u32(pos + 4)?,
                })
            })
            .collect()
    }
}

impl<D: AsRef<[u8]> + AsMut<[u8]>> Tiff<D> {
    fn bytes_mut(&mut self, offset: usize, len: usize) -> Result<&mut [u8], TiffError> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.as_mut().get_mut(offset..end))
            .ok_or(TiffError::Truncated(offset))
    }

    fn write_u16(&mut self, offset: usize, value: u16) -> Result<(), TiffError> {
        let bytes = if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        self.bytes_mut(offset, 2)?.copy_from_slice(&bytes);
        Ok(())
    }

    fn zero(&mut self, offset: usize, len: usize) -> Result<(), TiffError> {
        self.bytes_mut(offset, len)?.fill(0);
        Ok(())
    }

    /// Zero an IFD and every out-of-line value it references.
    fn blank_ifd(&mut self, ifd: usize) -> Result<(), TiffError> {
        let entries = self.entries(ifd)?;
        for entry in &entries {
            let len = entry.value_len();
            if len > 4 {
                let at = self.read_u32(entry.value_field())? as usize;
                self.zero(at, len)?;
            }
        }
        self.zero(ifd, 2 + entries.len() * ENTRY_LEN)?;
        // The trailing next-IFD offset is optional in broken files.
        let next = ifd + 2 + entries.len() * ENTRY_LEN;
        self.zero(next, 4).ok();
        Ok(())
    }

    /// Drop entry `index` from an IFD by shifting the later entries (and the
    /// next-IFD offset) up one slot. The freed 12 bytes at the end are zeroed.
    fn remove_entry(
        &mut self,
        ifd: usize,
        entries: &[Entry],
        index: usize,
    ) -> Result<(), TiffError> {
        let start = ifd + 2;
        let end = start + entries.len() * ENTRY_LEN + 4;
        self.bytes(start, end - start)?;

        let from = start + (index + 1) * ENTRY_LEN;
        let to = start + index * ENTRY_LEN;
        self.data.as_mut().copy_within(from..end, to);
        self.zero(end - ENTRY_LEN, ENTRY_LEN)?;
        self.write_u16(ifd, (entries.len() - 1) as u16)
    }
}

/// Remove the GPS IFD from an EXIF block in place.
///
/// Returns `Ok(false)` when IFD0 has no GPS pointer. Every other tag keeps
/// its exact bytes and offsets.
pub fn remove_gps(data: &mut [u8]) -> Result<bool, TiffError> {
    let mut tiff = Tiff::new(data)?;
    let ifd0 = tiff.ifd0()?;
    let entries = tiff.entries(ifd0)?;

    let Some(index) = entries.iter().position(|e| e.tag == TAG_GPS_IFD) else {
        return Ok(false);
    };

    let gps_ifd = tiff.read_u32(entries[index].value_field())? as usize;
    if let Err(e) = tiff.blank_ifd(gps_ifd) {
        // Unreadable GPS IFD: unlinking it is still enough to hide it.
        tracing::debug!("GPS IFD at {gps_ifd} not blanked: {e}");
    }
    tiff.remove_entry(ifd0, &entries, index)?;
    Ok(true)
}

/// Rewrite IFD0's Orientation tag to `1`.
///
/// Returns `Ok(false)` if there is no Orientation tag, or it is not a SHORT
/// and so cannot be patched in place.
pub fn reset_orientation(data: &mut [u8]) -> Result<bool, TiffError> {
    let mut tiff = Tiff::new(data)?;
    let ifd0 = tiff.ifd0()?;
    let entries = tiff.entries(ifd0)?;

    match entries.iter().find(|e| e.tag == TAG_ORIENTATION) {
        Some(entry) if entry.typ == TYPE_SHORT && entry.count >= 1 => {
            // SHORT values are left-justified in the value field in both byte orders.
            tiff.write_u16(entry.value_field(), 1)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Tags present in IFD0, in file order.
#[cfg(test)]
pub(crate) fn ifd0_tags(data: &[u8]) -> Result<Vec<u16>, TiffError> {
    let tiff = Tiff::new(data)?;
    Ok(tiff.entries(tiff.ifd0()?)?.iter().map(|e| e.tag).collect())
}
