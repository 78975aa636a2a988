//! The tile decode pipeline: fetch → invert fill order → JPEG pre-fixup →
//! decompress → reverse predictor → unpack → YCbCr→RGB → separate.
//!
//! Each stage is its own function so the pipeline's orchestration
//! ([`decode_tile`]) reads as a straight-line description of spec order;
//! the stage-selection rule lives in [`decode_tile`] itself since it needs
//! to see the IFD's compression/photometric/precision together.

use bytes::Bytes;

use crate::bitreader::{BitReader, REVERSED_BITS};
use crate::codec::{CodecOpts, CodecRegistry};
use crate::error::TiffError;
use crate::jpegfix::prepend_jpeg_tables;
use crate::tiff::{ByteOrder, Compression, FillOrder, Ifd, Photometric, Predictor, Tag};
use crate::tilemap::{Tile, TileMap};

const DEFAULT_YCBCR_COEFFICIENTS: (f64, f64, f64) = (0.299, 0.587, 0.114);
const DEFAULT_REFERENCE_BLACK_WHITE: [f64; 6] = [0.0, 255.0, 128.0, 255.0, 128.0, 255.0];

/// Run the full decode pipeline on `tile`, whose `encoded` field must
/// already be populated. On success, `tile.decoded` is populated,
/// `interleaved == false`, and its length equals `map.tile_bytes()`.
pub fn decode_tile(
    tile: &mut Tile,
    ifd: &Ifd,
    map: &TileMap,
    byte_order: ByteOrder,
    registry: &CodecRegistry,
    y_cb_cr_correction_enabled: bool,
    extended_codec: bool,
) -> Result<(), TiffError> {
    let encoded = tile
        .encoded()
        .ok_or_else(|| TiffError::malformed("decode_tile called on a tile with no encoded data"))?
        .clone();

    // Stage 1: invert fill order.
    let mut data: Vec<u8> = match ifd.fill_order()? {
        FillOrder::MsbFirst => encoded.to_vec(),
        FillOrder::LsbFirst => encoded.iter().map(|&b| REVERSED_BITS[b as usize]).collect(),
    };

    let compression = ifd.compression()?;
    let photometric = ifd.photometric()?;

    // Stage 2: JPEG pre-fixup.
    if compression == Compression::Jpeg {
        if let Some(tables) = ifd.get(Tag::JpegTables) {
            let tables = tables.as_bytes()?;
            data = prepend_jpeg_tables(&tables, &data)?.to_vec();
        }
    }

    // Stage 3: decompress.
    let sub_sampling = ycbcr_subsampling(ifd)?;
    let codec = registry.get(compression, extended_codec)?;
    let opts = CodecOpts {
        little_endian: byte_order == ByteOrder::LittleEndian,
        max_bytes: (map.tile_bytes() as usize).max(data.len()),
        ycbcr: photometric == Photometric::YCbCr && sub_sampling.0 == 1 && y_cb_cr_correction_enabled,
        interleaved: !(compression.is_jpeg_family() || compression == Compression::Jpeg2000),
    };
    let mut decoded = codec.decode(&data, opts)?.to_vec();

    // Stage 4: predictor reversal.
    let predictor = ifd.predictor()?;
    match predictor {
        Predictor::None => {}
        Predictor::Horizontal => reverse_horizontal_predictor(&mut decoded, map, byte_order)?,
        Predictor::FloatingPoint => {
            return Err(TiffError::unsupported("floating-point predictor is not supported"))
        }
    }

    let bits = *ifd.bits_per_sample()?.first().ok_or_else(|| TiffError::malformed("empty BitsPerSample"))?;
    let ordinary_precision = matches!(bits, 8 | 16 | 32 | 64);

    if !compression.is_jpeg_family() && compression != Compression::Jpeg2000 {
        if photometric == Photometric::YCbCr {
            // Stage 7: YCbCr -> RGB.
            let rgb = ycbcr_to_rgb(&decoded, map, ifd, sub_sampling)?;
            tile.set_decoded(Bytes::from(rgb), false);
        } else if ordinary_precision && !photometric.inverts_samples() {
            // Stage 5: simple repack.
            tile.set_decoded(Bytes::from(decoded), true);
            tile.adjust_number_of_pixels(map.tile_bytes() as usize)?;
            tile.separate_samples_if_necessary(
                map.tile_samples_per_pixel() as usize,
                map.bytes_per_sample() as usize,
            )?;
        } else {
            // Stage 6: unusual-precision unpack.
            let separated = unpack_unusual_precisions(&decoded, map, bits, byte_order, photometric)?;
            tile.set_decoded(Bytes::from(separated), false);
        }
    } else {
        // JPEG-family/JPEG2000 codecs deinterleave and colorspace-convert
        // internally; their output is already separated.
        tile.set_decoded(Bytes::from(decoded), false);
    }

    Ok(())
}

/// `(sub_x, sub_y)`: the horizontal/vertical chroma subsampling factors
/// from the `YCbCrSubSampling` tag, defaulting to `(2, 2)`.
fn ycbcr_subsampling(ifd: &Ifd) -> Result<(u32, u32), TiffError> {
    match ifd.get(Tag::YCbCrSubSampling) {
        Some(v) => {
            let raw = v.as_u64_vec()?;
            let sub_x = *raw.first().unwrap_or(&2) as u32;
            let sub_y = *raw.get(1).unwrap_or(&2) as u32;
            Ok((sub_x, sub_y))
        }
        None => Ok((2, 2)),
    }
}

// -----------------------------------------------------------------------
// Stage 4: predictor reversal
// -----------------------------------------------------------------------

fn reverse_horizontal_predictor(
    data: &mut [u8],
    map: &TileMap,
    byte_order: ByteOrder,
) -> Result<(), TiffError> {
    let sample_len = map.bytes_per_sample() as usize;
    let samples_per_pixel = map.tile_samples_per_pixel() as usize;
    let stride = samples_per_pixel * sample_len;
    let row_len = map.tile_size_x() as usize * map.tile_bytes_per_pixel() as usize;
    if row_len == 0 || data.len() % row_len != 0 {
        return Err(TiffError::malformed(
            "decoded tile length is not a multiple of the predictor row length",
        ));
    }

    // Each sample is differenced against the same channel in the previous
    // pixel, `stride` bytes back - not against whatever sample immediately
    // precedes it, which for samples_per_pixel > 1 would chain R into G
    // into B within one pixel instead of across pixels.
    for row in data.chunks_mut(row_len) {
        let mut pos = stride;
        while pos + sample_len <= row_len {
            let prev = read_uint(&row[pos - stride..pos - stride + sample_len], byte_order);
            let cur = read_uint(&row[pos..pos + sample_len], byte_order);
            let sum = prev.wrapping_add(cur);
            write_uint(&mut row[pos..pos + sample_len], sum, byte_order);
            pos += sample_len;
        }
    }
    Ok(())
}

// -----------------------------------------------------------------------
// Stage 6: unusual-precision unpacking
// -----------------------------------------------------------------------

fn unpack_unusual_precisions(
    data: &[u8],
    map: &TileMap,
    bits: u16,
    byte_order: ByteOrder,
    photometric: Photometric,
) -> Result<Vec<u8>, TiffError> {
    let tile_size_x = map.tile_size_x() as u64;
    let tile_pixels = map.tile_pixels();
    let samples_per_pixel = map.tile_samples_per_pixel() as u64;
    let bytes_per_sample = map.bytes_per_sample() as usize;
    let invert = photometric.inverts_samples();
    let max_value: u64 = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };

    let row_bit_width = tile_size_x * bits as u64 * samples_per_pixel;
    let skip_bits = ((8 - (row_bit_width % 8)) % 8) as u32;

    let mut reader = BitReader::new(data);
    let mut out = vec![0u8; (tile_pixels * samples_per_pixel) as usize * bytes_per_sample];

    for i in 0..tile_pixels {
        for ch in 0..samples_per_pixel {
            let sample = if bits % 8 != 0 {
                let v = reader.get_bits(bits as u32);
                if v < 0 {
                    return Err(TiffError::truncated(
                        "unexpected end of tile data while unpacking unusual-precision samples",
                    ));
                }
                v as u64
            } else {
                let byte_off = reader.byte_offset();
                if byte_off + bytes_per_sample > data.len() {
                    return Err(TiffError::truncated(
                        "unexpected end of tile data while unpacking samples",
                    ));
                }
                let value = read_uint(&data[byte_off..byte_off + bytes_per_sample], byte_order);
                reader.skip_bits(bits as u32);
                value
            };
            let sample = if invert { max_value.saturating_sub(sample) } else { sample };
            let dst = ((ch * tile_pixels + i) as usize) * bytes_per_sample;
            write_uint(&mut out[dst..dst + bytes_per_sample], sample, byte_order);
        }

        if tile_size_x > 0 && i % tile_size_x == tile_size_x - 1 && skip_bits > 0 && !reader.is_eof() {
            reader.skip_bits(skip_bits);
        }
    }

    Ok(out)
}

// -----------------------------------------------------------------------
// Stage 7: YCbCr -> RGB
// -----------------------------------------------------------------------

fn ycbcr_to_rgb(
    data: &[u8],
    map: &TileMap,
    ifd: &Ifd,
    (sub_x, sub_y): (u32, u32),
) -> Result<Vec<u8>, TiffError> {
    if map.planar_separated() {
        return Err(TiffError::unsupported("YCbCr requires chunked planar configuration"));
    }
    if map.bytes_per_sample() != 1 {
        return Err(TiffError::unsupported("YCbCr requires 8-bit samples"));
    }

    let tile_size_x = map.tile_size_x();
    let tile_size_y = map.tile_size_y();
    if tile_size_x % sub_x != 0 || tile_size_y % sub_y != 0 {
        return Err(TiffError::unsupported(
            "YCbCr tile dimensions are not a multiple of the chroma subsampling factors",
        ));
    }

    let ref_bw = match ifd.get(Tag::ReferenceBlackWhite) {
        Some(v) => {
            let r = v.as_f64_ratios()?;
            if r.len() < 6 {
                return Err(TiffError::malformed("ReferenceBlackWhite needs 6 values"));
            }
            [r[0], r[1], r[2], r[3], r[4], r[5]]
        }
        None => DEFAULT_REFERENCE_BLACK_WHITE,
    };
    let (luma_red, luma_green, luma_blue) = match ifd.get(Tag::YCbCrCoefficients) {
        Some(v) => {
            let r = v.as_f64_ratios()?;
            if r.len() < 3 {
                return Err(TiffError::malformed("YCbCrCoefficients needs 3 values"));
            }
            (r[0], r[1], r[2])
        }
        None => DEFAULT_YCBCR_COEFFICIENTS,
    };

    let y_scale = 255.0 / (ref_bw[1] - ref_bw[0]).max(f64::EPSILON);
    let blocks_x = tile_size_x / sub_x;
    let blocks_y = tile_size_y / sub_y;
    let block_samples = (sub_x * sub_y) as usize;
    let block_stride = block_samples + 2;
    let tile_pixels = tile_size_x as usize * tile_size_y as usize;

    let mut out = vec![0u8; tile_pixels * 3];
    let mut pos = 0usize;

    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            if pos + block_stride > data.len() {
                return Err(TiffError::truncated("YCbCr block data is truncated"));
            }
            let ys = &data[pos..pos + block_samples];
            let cb = data[pos + block_samples] as f64 - 128.0;
            let cr = data[pos + block_samples + 1] as f64 - 128.0;
            pos += block_stride;

            let r = cr * (2.0 - 2.0 * luma_red);
            let b = cb * (2.0 - 2.0 * luma_blue);

            for (k, &y_raw) in ys.iter().enumerate() {
                let y = (y_raw as f64 - ref_bw[0]) * y_scale;
                let rr = clamp_round(r + y);
                let bb = clamp_round(b + y);
                let gg = clamp_round((y - luma_blue * (b + y) - luma_red * (r + y)) / luma_green);

                let dx = bx * sub_x + (k as u32 % sub_x);
                let dy = by * sub_y + (k as u32 / sub_x);
                let p = (dy as usize) * tile_size_x as usize + dx as usize;
                out[p] = rr;
                out[tile_pixels + p] = gg;
                out[2 * tile_pixels + p] = bb;
            }
        }
    }

    Ok(out)
}

fn clamp_round(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

// -----------------------------------------------------------------------
// Byte-width integer helpers
// -----------------------------------------------------------------------

fn read_uint(chunk: &[u8], byte_order: ByteOrder) -> u64 {
    let mut v: u64 = 0;
    match byte_order {
        ByteOrder::BigEndian => {
            for &b in chunk {
                v = (v << 8) | b as u64;
            }
        }
        ByteOrder::LittleEndian => {
            for &b in chunk.iter().rev() {
                v = (v << 8) | b as u64;
            }
        }
    }
    v
}

fn write_uint(dst: &mut [u8], v: u64, byte_order: ByteOrder) {
    let n = dst.len();
    match byte_order {
        ByteOrder::BigEndian => {
            for (i, slot) in dst.iter_mut().enumerate() {
                *slot = (v >> (8 * (n - 1 - i))) as u8;
            }
        }
        ByteOrder::LittleEndian => {
            for (i, slot) in dst.iter_mut().enumerate() {
                *slot = (v >> (8 * i)) as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_uint_round_trip_big_endian() {
        let mut buf = [0u8; 4];
        write_uint(&mut buf, 0x0102_0304, ByteOrder::BigEndian);
        assert_eq!(buf, [0x01, 0x02, 0x03, 0x04]);
        assert_eq!(read_uint(&buf, ByteOrder::BigEndian), 0x0102_0304);
    }

    #[test]
    fn test_read_write_uint_round_trip_little_endian() {
        let mut buf = [0u8; 4];
        write_uint(&mut buf, 0x0102_0304, ByteOrder::LittleEndian);
        assert_eq!(buf, [0x04, 0x03, 0x02, 0x01]);
        assert_eq!(read_uint(&buf, ByteOrder::LittleEndian), 0x0102_0304);
    }

    #[test]
    fn test_clamp_round() {
        assert_eq!(clamp_round(300.0), 255);
        assert_eq!(clamp_round(-10.0), 0);
        assert_eq!(clamp_round(99.6), 100);
    }
}
