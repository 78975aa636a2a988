//! Container parsing: file header, one IFD's raw entries, and entry value
//! loading.
//!
//! This module is the lowest layer of the parser: it knows how to read the
//! 8/16-byte file header, how one IFD's entry table is laid out (12 bytes
//! classic, 20 bytes BigTIFF), and how to turn an entry's raw
//! value-or-offset field into a typed [`IfdValue`]. IFD-chain traversal
//! (cyclic detection, sub-IFD following, freeze discipline) lives one layer
//! up, in [`crate::tiff::ifd`], which calls back into
//! [`read_one_ifd_at`].

use bytes::Bytes;
use std::collections::HashSet;

use crate::error::TiffError;
use crate::io::{
    read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_be, read_u64_le, LockedSource,
    SeekableSource,
};

use super::tags::FieldType;
use super::value::IfdValue;

// =============================================================================
// Constants
// =============================================================================

const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;
const BYTE_ORDER_BIG_ENDIAN: u16 = 0x4D4D;

const VERSION_TIFF: u16 = 42;
const VERSION_BIGTIFF: u16 = 43;

/// Minimum classic-TIFF header + one entry + next-offset field.
pub const MIN_CLASSIC_LEN: u64 = 8 + 2 + 12 + 4;
pub const TIFF_HEADER_SIZE: usize = 8;
pub const BIGTIFF_HEADER_SIZE: usize = 16;

/// Safety limit on the number of entries in a single IFD (spec §4.1).
pub const MAX_ENTRIES_PER_IFD: u64 = 1_000_000;

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order (endianness) declared by a TIFF file's first two bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            ByteOrder::LittleEndian => read_u16_le(bytes),
            ByteOrder::BigEndian => read_u16_be(bytes),
        }
    }

    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            ByteOrder::LittleEndian => read_u32_le(bytes),
            ByteOrder::BigEndian => read_u32_be(bytes),
        }
    }

    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        match self {
            ByteOrder::LittleEndian => read_u64_le(bytes),
            ByteOrder::BigEndian => read_u64_be(bytes),
        }
    }

    #[inline]
    pub fn read_i64(self, bytes: &[u8]) -> i64 {
        self.read_u64(bytes) as i64
    }

    #[inline]
    pub fn read_f32(self, bytes: &[u8]) -> f32 {
        f32::from_bits(self.read_u32(bytes))
    }

    #[inline]
    pub fn read_f64(self, bytes: &[u8]) -> f64 {
        f64::from_bits(self.read_u64(bytes))
    }
}

// =============================================================================
// TiffHeader
// =============================================================================

/// Parsed file header: byte order, classic vs BigTIFF, and the first IFD's
/// offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    pub byte_order: ByteOrder,
    pub is_bigtiff: bool,
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Parse the header from the first bytes of a file.
    ///
    /// `bytes` must contain at least [`TIFF_HEADER_SIZE`] bytes (16 if the
    /// version turns out to be BigTIFF). `source_len` is the total source
    /// length, used to validate the first-IFD offset when `require_valid`
    /// is set (the default, per `ReaderOptions::require_valid_tiff`).
    pub fn parse(bytes: &[u8], source_len: u64, require_valid: bool) -> Result<Self, TiffError> {
        if bytes.len() < TIFF_HEADER_SIZE {
            return Err(TiffError::truncated(format!(
                "need at least {TIFF_HEADER_SIZE} bytes for a TIFF header, got {}",
                bytes.len()
            )));
        }

        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        let byte_order = match magic {
            BYTE_ORDER_LITTLE_ENDIAN => ByteOrder::LittleEndian,
            BYTE_ORDER_BIG_ENDIAN => ByteOrder::BigEndian,
            _ => {
                return Err(TiffError::NotTiff(format!(
                    "expected byte-order marker 0x4949 (II) or 0x4D4D (MM), got {magic:#06x}"
                )))
            }
        };

        let version = byte_order.read_u16(&bytes[2..4]);

        match version {
            VERSION_TIFF => {
                if source_len < MIN_CLASSIC_LEN {
                    return Err(TiffError::truncated(format!(
                        "file is {source_len} bytes, need at least {MIN_CLASSIC_LEN}"
                    )));
                }
                let first_ifd_offset = byte_order.read_u32(&bytes[4..8]) as u64;
                if require_valid && first_ifd_offset >= source_len {
                    return Err(TiffError::malformed(format!(
                        "first IFD offset {first_ifd_offset} is outside the file (len {source_len})"
                    )));
                }
                if first_ifd_offset == 0 {
                    return Err(TiffError::malformed("empty TIFF: first IFD offset is 0"));
                }
                Ok(TiffHeader {
                    byte_order,
                    is_bigtiff: false,
                    first_ifd_offset,
                })
            }
            VERSION_BIGTIFF => {
                if bytes.len() < BIGTIFF_HEADER_SIZE {
                    return Err(TiffError::truncated(format!(
                        "need {BIGTIFF_HEADER_SIZE} bytes for a BigTIFF header, got {}",
                        bytes.len()
                    )));
                }
                let offset_size = byte_order.read_u16(&bytes[4..6]);
                if offset_size != 8 {
                    return Err(TiffError::malformed(format!(
                        "BigTIFF offset byte size must be 8, got {offset_size}"
                    )));
                }

                let raw_offset = byte_order.read_i64(&bytes[8..16]);
                if raw_offset < 0 {
                    return Err(TiffError::malformed(format!(
                        "negative BigTIFF first IFD offset {raw_offset}"
                    )));
                }
                let first_ifd_offset = raw_offset as u64;
                if require_valid && first_ifd_offset >= source_len {
                    return Err(TiffError::malformed(format!(
                        "first IFD offset {first_ifd_offset} is outside the file (len {source_len})"
                    )));
                }
                if first_ifd_offset == 0 {
                    return Err(TiffError::malformed("empty TIFF: first IFD offset is 0"));
                }
                Ok(TiffHeader {
                    byte_order,
                    is_bigtiff: true,
                    first_ifd_offset,
                })
            }
            _ => Err(TiffError::NotTiff(format!(
                "expected version 42 (classic) or 43 (BigTIFF), got {version}"
            ))),
        }
    }

    #[inline]
    pub const fn ifd_entry_size(&self) -> usize {
        if self.is_bigtiff {
            20
        } else {
            12
        }
    }

    #[inline]
    pub const fn ifd_count_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            2
        }
    }

    #[inline]
    pub const fn ifd_next_offset_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }

    #[inline]
    pub const fn value_offset_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }
}

// =============================================================================
// IfdEntry (raw, pre-value-load)
// =============================================================================

/// One raw IFD entry: tag, type, count, and the 4- or 8-byte
/// value-or-offset field exactly as it appeared on disk.
#[derive(Debug, Clone)]
pub struct IfdEntry {
    pub tag_id: u16,
    pub field_type: FieldType,
    pub count: u64,
    pub is_inline: bool,
    /// The raw value-or-offset bytes, left-aligned and zero-padded to 8
    /// bytes regardless of classic/BigTIFF width.
    pub value_or_offset_bytes: [u8; 8],
}

/// Parse one entry from a `header.ifd_entry_size()`-byte slice.
pub fn parse_entry(
    bytes: &[u8],
    header: &TiffHeader,
    source_len: u64,
    require_valid: bool,
) -> Result<IfdEntry, TiffError> {
    let bo = header.byte_order;
    let tag_id = bo.read_u16(&bytes[0..2]);
    let type_raw = bo.read_u16(&bytes[2..4]);
    let field_type = FieldType::from_u16(type_raw)
        .ok_or_else(|| TiffError::malformed(format!("unknown IFD type code {type_raw}")))?;

    let (count, value_field) = if header.is_bigtiff {
        (bo.read_u64(&bytes[4..12]), &bytes[12..20])
    } else {
        (bo.read_u32(&bytes[4..8]) as u64, &bytes[8..12])
    };

    let total_size = field_type
        .size_in_bytes()
        .checked_mul(count as usize)
        .ok_or_else(|| TiffError::out_of_range("entry value size overflows usize"))?;
    let is_inline = field_type.fits_inline(count, header.is_bigtiff);

    let mut value_or_offset_bytes = [0u8; 8];
    value_or_offset_bytes[..value_field.len()].copy_from_slice(value_field);

    if !is_inline && require_valid {
        let offset = if header.is_bigtiff {
            bo.read_u64(value_field)
        } else {
            bo.read_u32(value_field) as u64
        };
        if offset.saturating_add(total_size as u64) > source_len {
            return Err(TiffError::malformed(format!(
                "entry for tag {tag_id} points outside the file: offset {offset}, size {total_size}"
            )));
        }
    }

    Ok(IfdEntry {
        tag_id,
        field_type,
        count,
        is_inline,
        value_or_offset_bytes,
    })
}

/// Resolve the external offset of a non-inline entry's value.
pub fn entry_value_offset(entry: &IfdEntry, header: &TiffHeader) -> u64 {
    if header.is_bigtiff {
        header.byte_order.read_u64(&entry.value_or_offset_bytes)
    } else {
        header.byte_order.read_u32(&entry.value_or_offset_bytes) as u64
    }
}

/// Load and decode the value for one entry, fetching from the source if the
/// value isn't stored inline.
pub fn read_entry_value<S: SeekableSource>(
    source: &LockedSource<S>,
    header: &TiffHeader,
    entry: &IfdEntry,
) -> Result<IfdValue, TiffError> {
    let count = entry.count as usize;
    let total_size = entry.field_type.size_in_bytes() * count;

    let bytes: Bytes = if entry.is_inline {
        Bytes::copy_from_slice(&entry.value_or_offset_bytes[..total_size])
    } else {
        let offset = entry_value_offset(entry, header);
        source.read_exact_at(offset, total_size)?
    };

    decode_value(&bytes, entry.field_type, count, header.byte_order)
}

fn decode_value(
    bytes: &[u8],
    field_type: FieldType,
    count: usize,
    bo: ByteOrder,
) -> Result<IfdValue, TiffError> {
    let elem = field_type.size_in_bytes();
    let chunk = |i: usize| &bytes[i * elem..(i + 1) * elem];

    Ok(match field_type {
        FieldType::Byte => IfdValue::Byte(bytes[..count].to_vec()),
        FieldType::Sbyte => IfdValue::Sbyte(bytes[..count].iter().map(|&b| b as i8).collect()),
        FieldType::Undefined => IfdValue::Undefined(Bytes::copy_from_slice(&bytes[..count])),
        FieldType::Ascii => {
            let strings = bytes[..count]
                .split(|&b| b == 0)
                .filter(|s| !s.is_empty())
                .map(|s| String::from_utf8_lossy(s).into_owned())
                .collect::<Vec<_>>();
            IfdValue::Ascii(if strings.is_empty() {
                vec![String::new()]
            } else {
                strings
            })
        }
        FieldType::Short => {
            IfdValue::Short((0..count).map(|i| bo.read_u16(chunk(i))).collect())
        }
        FieldType::Sshort => {
            IfdValue::Sshort((0..count).map(|i| bo.read_u16(chunk(i)) as i16).collect())
        }
        FieldType::Long | FieldType::Ifd => {
            IfdValue::Long((0..count).map(|i| bo.read_u32(chunk(i))).collect())
        }
        FieldType::Slong => {
            IfdValue::Slong((0..count).map(|i| bo.read_u32(chunk(i)) as i32).collect())
        }
        FieldType::Long8 | FieldType::Ifd8 => {
            IfdValue::Long8((0..count).map(|i| bo.read_u64(chunk(i))).collect())
        }
        FieldType::Slong8 => {
            IfdValue::Slong8((0..count).map(|i| bo.read_u64(chunk(i)) as i64).collect())
        }
        FieldType::Rational => IfdValue::Rational(
            (0..count)
                .map(|i| {
                    let c = chunk(i);
                    (bo.read_u32(&c[0..4]), bo.read_u32(&c[4..8]))
                })
                .collect(),
        ),
        FieldType::Srational => IfdValue::Srational(
            (0..count)
                .map(|i| {
                    let c = chunk(i);
                    (bo.read_u32(&c[0..4]) as i32, bo.read_u32(&c[4..8]) as i32)
                })
                .collect(),
        ),
        FieldType::Float => IfdValue::Float((0..count).map(|i| bo.read_f32(chunk(i))).collect()),
        FieldType::Double => {
            IfdValue::Double((0..count).map(|i| bo.read_f64(chunk(i))).collect())
        }
    })
}

// =============================================================================
// Single-IFD reading (one node of the chain)
// =============================================================================

/// One IFD's raw entries plus chain-navigation bookkeeping, before the
/// higher-level `Ifd` model is built from it.
pub struct RawIfd {
    pub file_offset: u64,
    /// `(tag, value)` pairs, first-occurrence order, duplicates dropped.
    pub entries: Vec<(u16, IfdValue)>,
    /// `None` marks the last IFD in the chain (next-offset field was 0).
    pub next_ifd_offset: Option<u64>,
}

/// Read one IFD's entry table and resolve every entry's value.
///
/// Does not follow the chain or sub-IFDs; that's [`crate::tiff::ifd`]'s job.
/// Does perform the entry-count safety check and duplicate-tag dedup.
pub fn read_one_ifd_at<S: SeekableSource>(
    source: &LockedSource<S>,
    header: &TiffHeader,
    offset: u64,
    require_valid: bool,
) -> Result<RawIfd, TiffError> {
    let count_size = header.ifd_count_size();
    let count_bytes = source.read_exact_at(offset, count_size)?;
    let entry_count = if header.is_bigtiff {
        header.byte_order.read_u64(&count_bytes)
    } else {
        header.byte_order.read_u16(&count_bytes) as u64
    };

    if entry_count > MAX_ENTRIES_PER_IFD {
        return Err(TiffError::out_of_range(format!(
            "IFD at offset {offset} declares {entry_count} entries, exceeding the limit of {MAX_ENTRIES_PER_IFD}"
        )));
    }

    let entry_size = header.ifd_entry_size();
    let table_offset = offset + count_size as u64;
    let table_bytes = source.read_exact_at(table_offset, entry_size * entry_count as usize)?;

    let mut entries = Vec::with_capacity(entry_count as usize);
    let mut seen_tags = HashSet::with_capacity(entry_count as usize);
    for i in 0..entry_count as usize {
        let raw = &table_bytes[i * entry_size..(i + 1) * entry_size];
        let entry = parse_entry(raw, header, source.len(), require_valid)?;
        if !seen_tags.insert(entry.tag_id) {
            continue; // duplicate tag: keep first occurrence
        }
        let value = read_entry_value(source, header, &entry)?;
        entries.push((entry.tag_id, value));
    }

    let next_offset_field_pos = table_offset + (entry_size * entry_count as usize) as u64;
    let next_bytes = source.read_exact_at(next_offset_field_pos, header.ifd_next_offset_size())?;
    let next_raw = if header.is_bigtiff {
        header.byte_order.read_u64(&next_bytes)
    } else {
        header.byte_order.read_u32(&next_bytes) as u64
    };

    Ok(RawIfd {
        file_offset: offset,
        entries,
        next_ifd_offset: if next_raw == 0 { None } else { Some(next_raw) },
    })
}
