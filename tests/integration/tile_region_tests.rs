//! Scenarios 4 and 5: a region crossing a tile boundary, and the same grid
//! with one tile marked missing.

use tiffcore::io::SliceSource;
use tiffcore::options::ReaderOptions;
use tiffcore::reader::TiffReader;
use tiffcore::region::RegionRequest;

use super::test_utils::*;

const TILE_OFFSETS_ARRAY_AT: usize = 200;
const TILE_BYTE_COUNTS_ARRAY_AT: usize = 220;
const DATA_AT: usize = 260;

/// 8x8 image, 4x4 tiles: (0,0)=0x11, (1,0)=0x22, (0,1)=0x33, (1,1)=0x44, in
/// `linear_index` order. A zero entry in `present` marks that tile missing
/// (TileOffsets/TileByteCounts both 0 for it).
fn build_four_tile_grid(present: [bool; 4]) -> Vec<u8> {
    let fills = [0x11u8, 0x22, 0x33, 0x44];
    let mut data = Vec::new();
    let mut offsets = [0u32; 4];
    let mut byte_counts = [0u32; 4];
    for (i, &fill) in fills.iter().enumerate() {
        if present[i] {
            offsets[i] = (DATA_AT + data.len()) as u32;
            byte_counts[i] = 16;
            data.extend(std::iter::repeat(fill).take(16));
        }
    }

    let entries: Vec<(u16, u16, u32, [u8; 4])> = vec![
        (256, 4, 1, long(8)),     // ImageWidth
        (257, 4, 1, long(8)),     // ImageLength
        (258, 3, 1, short(8)),    // BitsPerSample
        (259, 3, 1, short(1)),    // Compression = None
        (262, 3, 1, short(1)),    // PhotometricInterpretation = BlackIsZero
        (277, 3, 1, short(1)),    // SamplesPerPixel
        (322, 4, 1, long(4)),     // TileWidth
        (323, 4, 1, long(4)),     // TileLength
        (324, 4, 4, long(TILE_OFFSETS_ARRAY_AT as u32)),
        (325, 4, 4, long(TILE_BYTE_COUNTS_ARRAY_AT as u32)),
    ];
    let ifd_bytes = build_classic_ifd(&entries, 0);

    let mut file = vec![0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00];
    file.extend_from_slice(&ifd_bytes);
    file.resize(TILE_OFFSETS_ARRAY_AT, 0);
    for o in offsets {
        file.extend_from_slice(&o.to_le_bytes());
    }
    file.resize(TILE_BYTE_COUNTS_ARRAY_AT, 0);
    for c in byte_counts {
        file.extend_from_slice(&c.to_le_bytes());
    }
    file.resize(DATA_AT, 0);
    file.extend_from_slice(&data);
    file
}

#[test]
fn test_scenario_region_crossing_tile_boundary() {
    let file = build_four_tile_grid([true, true, true, true]);
    let reader = TiffReader::open(SliceSource::new(file), ReaderOptions::default()).unwrap();
    let region = reader
        .read_region(
            0,
            RegionRequest {
                from_x: 2,
                from_y: 2,
                size_x: 4,
                size_y: 4,
            },
            false,
        )
        .unwrap();

    let expected = [
        0x11, 0x11, 0x22, 0x22, //
        0x11, 0x11, 0x22, 0x22, //
        0x33, 0x33, 0x44, 0x44, //
        0x33, 0x33, 0x44, 0x44, //
    ];
    assert_eq!(&region[..], &expected);
}

#[test]
fn test_scenario_missing_tile_uses_byte_filler() {
    // Tile (0, 1) (linear index 2, the bottom-left tile) is missing.
    let file = build_four_tile_grid([true, true, false, true]);
    let reader = TiffReader::open(
        SliceSource::new(file),
        ReaderOptions {
            missing_tiles_allowed: true,
            byte_filler: 0xAB,
            ..ReaderOptions::default()
        },
    )
    .unwrap();
    let region = reader
        .read_region(
            0,
            RegionRequest {
                from_x: 2,
                from_y: 2,
                size_x: 4,
                size_y: 4,
            },
            false,
        )
        .unwrap();

    // Bottom-left 2x2 of the 4x4 result (rows 2-3, cols 0-1) comes from the
    // missing tile and must be the filler byte.
    assert_eq!(region[8], 0xAB);
    assert_eq!(region[9], 0xAB);
    assert_eq!(region[12], 0xAB);
    assert_eq!(region[13], 0xAB);
}
