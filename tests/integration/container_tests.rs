//! Scenario 1 (tiny valid classic TIFF round trip) and scenario 2 (cyclic
//! IFD chain).

use tiffcore::io::SliceSource;
use tiffcore::options::ReaderOptions;
use tiffcore::reader::TiffReader;
use tiffcore::region::RegionRequest;
use tiffcore::TiffError;

use super::test_utils::*;

#[test]
fn test_scenario_tiny_classic_tiff_roundtrip() {
    // 4x4, 8-bit grayscale, uncompressed, one strip.
    let strip_offset = 200usize;
    let pixels: [u8; 16] = [
        0x00, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70, 0x80, 0x90, 0xA0, 0xB0, 0xC0, 0xD0, 0xE0,
        0xF0,
    ];
    let ifd = build_classic_ifd(
        &[
            (256, 4, 1, long(4)),                        // ImageWidth
            (257, 4, 1, long(4)),                         // ImageLength
            (258, 3, 1, short(8)),                        // BitsPerSample
            (259, 3, 1, short(1)),                        // Compression = None
            (262, 3, 1, short(1)),                         // PhotometricInterpretation = BlackIsZero
            (273, 4, 1, long(strip_offset as u32)),       // StripOffsets
            (277, 3, 1, short(1)),                        // SamplesPerPixel
            (278, 4, 1, long(4)),                          // RowsPerStrip
            (279, 4, 1, long(16)),                         // StripByteCounts
        ],
        0,
    );
    let file = assemble_classic_tiff(&ifd, strip_offset, &pixels);

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
    assert_eq!(&region[..], &pixels);
}

#[test]
fn test_scenario_cyclic_ifd_chain() {
    // IFD at offset 8 whose next-IFD offset points back to 8 itself.
    let ifd = build_classic_ifd(&[(256, 4, 1, long(4))], 8);
    let mut file = vec![0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00];
    file.extend_from_slice(&ifd);
    file.resize(200, 0);

    let result = TiffReader::open(SliceSource::new(file), ReaderOptions::default());
    assert!(matches!(result, Err(TiffError::CyclicIfdChain(8))));
}

#[test]
fn test_bigtiff_header_is_recognized() {
    let mut header = vec![
        0x49, 0x49, 0x2B, 0x00, // II, version 43 (BigTIFF)
        0x08, 0x00, 0x00, 0x00, // offset size 8, reserved
    ];
    header.extend_from_slice(&16u64.to_le_bytes()); // first IFD at 16
    let ifd_count: u64 = 0;
    header.extend_from_slice(&ifd_count.to_le_bytes());
    header.extend_from_slice(&0u64.to_le_bytes()); // next-IFD offset

    let reader = TiffReader::open(
        SliceSource::new(header),
        ReaderOptions {
            require_valid_tiff: false,
            ..ReaderOptions::default()
        },
    )
    .unwrap();
    assert!(reader.header().is_bigtiff);
}
