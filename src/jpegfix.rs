//! JPEG pre-fixup: turning an abbreviated JPEG tile (no DQT/DHT tables) plus
//! a `JPEGTables` entry into one self-contained JPEG stream, so the codec
//! sees a normal, complete image.

use bytes::{Bytes, BytesMut};

use crate::error::TiffError;

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Prepend a `JPEGTables` segment to a tile's compressed bytes.
///
/// The tables' own SOI/EOI markers are stripped (they're not part of the
/// scan content), the tile's SOI is stripped and replaced by a single fresh
/// one at the front, and the tile's EOI is kept. `tile_data` must begin with
/// SOI; anything else fails with `Malformed`.
pub fn prepend_jpeg_tables(tables: &[u8], tile_data: &[u8]) -> Result<Bytes, TiffError> {
    if tile_data.len() < 2 || tile_data[0..2] != SOI {
        return Err(TiffError::malformed(
            "JPEG tile data does not start with SOI (FF D8)",
        ));
    }
    if tables.is_empty() {
        return Ok(Bytes::copy_from_slice(tile_data));
    }

    let tables_start = if tables.len() >= 2 && tables[0..2] == SOI {
        2
    } else {
        0
    };
    let tables_end = if tables.len() >= 2 && tables[tables.len() - 2..] == EOI {
        tables.len() - 2
    } else {
        tables.len()
    };
    let tables_content = &tables[tables_start..tables_end.max(tables_start)];

    let mut result = BytesMut::with_capacity(2 + tables_content.len() + tile_data.len() - 2);
    result.extend_from_slice(&SOI);
    result.extend_from_slice(tables_content);
    result.extend_from_slice(&tile_data[2..]);
    Ok(result.freeze())
}
