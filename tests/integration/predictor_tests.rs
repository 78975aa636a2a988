//! Scenario 3: horizontal predictor reversal on one worked example. The
//! general apply-then-invert-is-identity property (P4) is exercised
//! separately in `property_tests.rs`, across several representative rows.

use tiffcore::io::SliceSource;
use tiffcore::options::ReaderOptions;
use tiffcore::reader::TiffReader;
use tiffcore::region::RegionRequest;

use super::test_utils::*;

#[test]
fn test_scenario_horizontal_predictor() {
    // 4x4, 8-bit grayscale, Predictor=Horizontal. Each row is stored as a
    // horizontal difference (first sample verbatim, the rest relative to
    // their predecessor): `00 10 10 10` decodes to `00 10 20 30`.
    let strip_offset = 200usize;
    let diff_row = [0x00u8, 0x10, 0x10, 0x10];
    let mut stored = Vec::new();
    for _ in 0..4 {
        stored.extend_from_slice(&diff_row);
    }

    let ifd = build_classic_ifd(
        &[
            (256, 4, 1, long(4)),
            (257, 4, 1, long(4)),
            (258, 3, 1, short(8)),
            (259, 3, 1, short(1)),
            (262, 3, 1, short(1)),
            (273, 4, 1, long(strip_offset as u32)),
            (277, 3, 1, short(1)),
            (278, 4, 1, long(4)),
            (279, 4, 1, long(16)),
            (317, 3, 1, short(2)), // Predictor = Horizontal
        ],
        0,
    );
    let file = assemble_classic_tiff(&ifd, strip_offset, &stored);

    let reader = TiffReader::open(SliceSource::new(file), ReaderOptions::default()).unwrap();
    let region = reader
        .read_region(
            0,
            RegionRequest {
                from_x: 0,
                from_y: 0,
                size_x: 4,
                size_y: 4,
            },
            false,
        )
        .unwrap();

    let expected_row = [0x00u8, 0x10, 0x20, 0x30];
    for row in region.chunks(4) {
        assert_eq!(row, expected_row);
    }
}

#[test]
fn test_scenario_horizontal_predictor_chunky_rgb() {
    // 2x1, RGB, 8-bit, PlanarConfiguration=1 (chunky), Predictor=Horizontal.
    // Row is two pixels: (10, 20, 30) then (12, 23, 34). Stored as the first
    // pixel verbatim, the second differenced channel-by-channel against the
    // first (not against its own preceding byte): R1-R0=2, G1-G0=3, B1-B0=4.
    let strip_offset = 200usize;
    let stored = [10u8, 20, 30, 2, 3, 4];

    let ifd = build_classic_ifd(
        &[
            (256, 4, 1, long(2)),
            (257, 4, 1, long(1)),
            (258, 3, 1, short(8)),
            (259, 3, 1, short(1)),
            (262, 3, 1, short(2)), // RGB
            (273, 4, 1, long(strip_offset as u32)),
            (277, 3, 1, short(3)), // SamplesPerPixel = 3
            (278, 4, 1, long(1)),
            (279, 4, 1, long(stored.len() as u32)),
            (284, 3, 1, short(1)), // PlanarConfiguration = Chunky
            (317, 3, 1, short(2)), // Predictor = Horizontal
        ],
        0,
    );
    let file = assemble_classic_tiff(&ifd, strip_offset, &stored);

    let reader = TiffReader::open(SliceSource::new(file), ReaderOptions::default()).unwrap();
    let region = reader
        .read_region(
            0,
            RegionRequest {
                from_x: 0,
                from_y: 0,
                size_x: 2,
                size_y: 1,
            },
            false,
        )
        .unwrap();

    // Separated (planar) output: all R, then all G, then all B.
    assert_eq!(&region[..], &[10, 12, 20, 23, 30, 34]);
}
