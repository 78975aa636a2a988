//! Shared fixture builders for the integration tests.
//!
//! All of these hand-assemble classic-TIFF byte streams the way the unit
//! tests elsewhere in the crate do, just with enough knobs (tiles vs
//! strips, predictor, YCbCr tags) to cover a whole scenario in one place.

/// Build one classic (non-BigTIFF) IFD's bytes: entry count, the entries
/// themselves, then the next-IFD offset.
pub fn build_classic_ifd(entries: &[(u16, u16, u32, [u8; 4])], next: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for &(tag, ty, count, ref value) in entries {
        buf.extend_from_slice(&tag.to_le_bytes());
        buf.extend_from_slice(&ty.to_le_bytes());
        buf.extend_from_slice(&count.to_le_bytes());
        buf.extend_from_slice(value);
    }
    buf.extend_from_slice(&next.to_le_bytes());
    buf
}

/// A little-endian classic-TIFF header followed by `ifd_bytes`, then padded
/// with zeros up to `data_offset` and finally `data`.
pub fn assemble_classic_tiff(ifd_bytes: &[u8], data_offset: usize, data: &[u8]) -> Vec<u8> {
    let mut file = vec![0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00];
    file.extend_from_slice(ifd_bytes);
    assert!(
        file.len() <= data_offset,
        "data_offset {data_offset} is inside the IFD table ({} bytes) - pick a larger offset",
        file.len(),
    );
    file.resize(data_offset, 0);
    file.extend_from_slice(data);
    file
}

/// `FieldType::Short` entry value, inline.
pub fn short(v: u16) -> [u8; 4] {
    let mut b = [0u8; 4];
    b[..2].copy_from_slice(&(v as u16).to_le_bytes());
    b
}

/// `FieldType::Long` entry value, inline.
pub fn long(v: u32) -> [u8; 4] {
    v.to_le_bytes()
}
