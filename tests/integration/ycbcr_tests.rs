//! Scenario 6: YCbCr block decoding with default subsampling, coefficients,
//! and reference black/white.

use tiffcore::io::SliceSource;
use tiffcore::options::ReaderOptions;
use tiffcore::reader::TiffReader;
use tiffcore::region::RegionRequest;

use super::test_utils::*;

#[test]
fn test_scenario_ycbcr_block_decoding() {
    // 2x2 image, one YCbCr block (subX=2, subY=2): 4 Y samples then Cb, Cr.
    // Y = 100 everywhere, Cb = Cr = 128 (the chroma-neutral midpoint), no
    // ReferenceBlackWhite/YCbCrCoefficients override — per the default
    // reference the whole block should come out as RGB (100, 100, 100).
    let strip_offset = 200usize;
    let block = [100u8, 100, 100, 100, 128, 128];

    let ifd = build_classic_ifd(
        &[
            (256, 4, 1, long(2)),  // ImageWidth
            (257, 4, 1, long(2)),  // ImageLength
            (258, 3, 1, short(8)), // BitsPerSample
            (259, 3, 1, short(1)), // Compression = None
            (262, 3, 1, short(6)), // PhotometricInterpretation = YCbCr
            (273, 4, 1, long(strip_offset as u32)), // StripOffsets
            (277, 3, 1, short(3)), // SamplesPerPixel
            (278, 4, 1, long(2)),  // RowsPerStrip
            (279, 4, 1, long(6)),  // StripByteCounts
        ],
        0,
    );
    let file = assemble_classic_tiff(&ifd, strip_offset, &block);

    let reader = TiffReader::open(SliceSource::new(file), ReaderOptions::default()).unwrap();
    let region = reader
        .read_region(
            0,
            RegionRequest {
                from_x: 0,
                from_y: 0,
                size_x: 2,
                size_y: 2,
            },
            false,
        )
        .unwrap();

    // Separated (default) layout: R plane, G plane, B plane, 4 bytes each.
    assert_eq!(region.len(), 12);
    assert!(region.iter().all(|&b| b == 100));
}
