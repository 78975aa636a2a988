//! The region reader: composes an arbitrary `(x, y, w, h)` pixel rectangle
//! out of however many tiles it overlaps.

use bytes::Bytes;

use crate::codec::CodecRegistry;
use crate::decode::decode_tile;
use crate::error::TiffError;
use crate::io::{LockedSource, SeekableSource};
use crate::options::ReaderOptions;
use crate::tiff::{ByteOrder, Ifd, SampleFormat};
use crate::tilemap::TileMap;

/// A rectangular pixel request against a `TileMap`.
#[derive(Debug, Clone, Copy)]
pub struct RegionRequest {
    pub from_x: u32,
    pub from_y: u32,
    pub size_x: u32,
    pub size_y: u32,
}

/// Read `request` out of `map`'s image, composing as many tiles as needed.
///
/// Returns a buffer in separated (planar) byte layout unless
/// `opts.interleave_results` is set, in which case it is reshaped to
/// chunky before returning. If the IFD's sample format is `FLOAT16`/
/// `FLOAT24` and `opts.auto_unpack_unusual_precisions` is set, samples are
/// widened to `f32` in place (the returned buffer is 4 bytes per sample).
#[allow(clippy::too_many_arguments)]
pub fn read_region<S: SeekableSource>(
    map: &mut TileMap,
    ifd: &Ifd,
    source: &LockedSource<S>,
    byte_order: ByteOrder,
    registry: &CodecRegistry,
    opts: &ReaderOptions,
    request: RegionRequest,
    store_tiles_in_map: bool,
) -> Result<Bytes, TiffError> {
    let bps = map.bytes_per_sample() as usize;
    let channels = map.num_channels() as usize;
    let out_len = request.size_x as usize * request.size_y as usize * channels * bps;
    let mut out = vec![opts.byte_filler; out_len];

    let to_x = if opts.crop_tiles_to_image_boundaries {
        (request.from_x as u64 + request.size_x as u64).min(map.dim_x() as u64)
    } else {
        request.from_x as u64 + request.size_x as u64
    };
    let to_y = if opts.crop_tiles_to_image_boundaries {
        (request.from_y as u64 + request.size_y as u64).min(map.dim_y() as u64)
    } else {
        request.from_y as u64 + request.size_y as u64
    };
    if to_x <= request.from_x as u64 || to_y <= request.from_y as u64 {
        return Ok(Bytes::from(out));
    }

    let tile_size_x = map.tile_size_x() as u64;
    let tile_size_y = map.tile_size_y() as u64;
    let min_xi = (request.from_x as u64 / tile_size_x) as u32;
    let max_xi = (((to_x - 1) / tile_size_x) as u32).min(map.tile_count_x().saturating_sub(1));
    let min_yi = (request.from_y as u64 / tile_size_y) as u32;
    let max_yi = (((to_y - 1) / tile_size_y) as u32).min(map.tile_count_y().saturating_sub(1));

    let tile_offsets = ifd.tile_offsets()?.to_vec();
    let tile_byte_counts = ifd.tile_byte_counts()?.to_vec();

    for p in 0..map.num_separated_planes() {
        for yi in min_yi..=max_yi {
            for xi in min_xi..=max_xi {
                let mut tile = map.make_tile(p, xi, yi, opts.crop_tiles_to_image_boundaries)?;
                let linear = map.linear_index(p, xi, yi) as usize;
                let offset = *tile_offsets
                    .get(linear)
                    .ok_or_else(|| TiffError::malformed("tile index outside offsets array"))?;
                let byte_count = *tile_byte_counts
                    .get(linear)
                    .ok_or_else(|| TiffError::malformed("tile index outside byte-counts array"))?;

                if offset == 0 || byte_count == 0 {
                    if !opts.missing_tiles_allowed {
                        return Err(TiffError::malformed(format!(
                            "tile ({xi}, {yi}) plane {p} has no data and missing tiles are not allowed"
                        )));
                    }
                    tile.mark_empty();
                    tile.set_decoded(Bytes::from(vec![opts.byte_filler; map.tile_bytes() as usize]), false);
                } else {
                    let encoded = source.read_exact_at(offset, byte_count as usize)?;
                    tile.set_encoded(encoded);
                    decode_tile(
                        &mut tile,
                        ifd,
                        map,
                        byte_order,
                        registry,
                        opts.y_cb_cr_correction,
                        opts.extended_codec,
                    )?;
                }
                debug_assert!(tile.separated());

                copy_tile_into_output(&tile, map, request, &mut out, p)?;

                if store_tiles_in_map {
                    map.put(tile)?;
                }
            }
        }
    }

    let mut out = out;
    let mut sample_bytes = bps;
    if opts.auto_unpack_unusual_precisions {
        if let Some((eb, mb)) = unusual_float_shape(ifd)? {
            out = expand_unusual_floats(&out, eb, mb, byte_order);
            sample_bytes = 4;
        }
    }

    if opts.interleave_results {
        out = interleave(&out, request.size_x as usize, request.size_y as usize, channels, sample_bytes);
    }

    Ok(Bytes::from(out))
}

fn copy_tile_into_output(
    tile: &crate::tilemap::Tile,
    map: &TileMap,
    request: RegionRequest,
    out: &mut [u8],
    plane: u32,
) -> Result<(), TiffError> {
    let idx = tile.index();
    let tile_start_x = idx.from_x.max(request.from_x);
    let tile_start_y = idx.from_y.max(request.from_y);
    let tile_end_x = idx.to_x.min(request.from_x + request.size_x);
    let tile_end_y = idx.to_y.min(request.from_y + request.size_y);
    if tile_end_x <= tile_start_x || tile_end_y <= tile_start_y {
        return Ok(());
    }

    let bps = map.bytes_per_sample() as usize;
    let tile_size_x = map.tile_size_x() as usize;
    let tile_size_y = map.tile_size_y() as usize;
    let size_x_in_tile = (tile_end_x - tile_start_x) as usize;
    let size_y_in_tile = (tile_end_y - tile_start_y) as usize;
    let from_x_in_tile = (tile_start_x - idx.from_x) as usize;
    let from_y_in_tile = (tile_start_y - idx.from_y) as usize;

    let decoded = tile
        .decoded()
        .ok_or_else(|| TiffError::malformed("tile has no decoded data to copy"))?;

    for s in 0..map.tile_samples_per_pixel() as usize {
        let dst_plane = plane as usize + s;
        for row in 0..size_y_in_tile {
            let src_row = from_y_in_tile + row;
            let src_off = ((s * tile_size_y + src_row) * tile_size_x + from_x_in_tile) * bps;
            let dst_row = tile_start_y as usize - request.from_y as usize + row;
            let dst_off = ((dst_plane * request.size_y as usize + dst_row) * request.size_x as usize
                + (tile_start_x as usize - request.from_x as usize))
                * bps;
            let row_len = size_x_in_tile * bps;
            if src_off + row_len > decoded.len() || dst_off + row_len > out.len() {
                return Err(TiffError::out_of_range("region copy out of bounds"));
            }
            out[dst_off..dst_off + row_len].copy_from_slice(&decoded[src_off..src_off + row_len]);
        }
    }
    Ok(())
}

/// `(exponent_bits, mantissa_bits)` if the IFD declares an unusual
/// floating-point precision (16 or 24 bits), else `None`.
fn unusual_float_shape(ifd: &Ifd) -> Result<Option<(u32, u32)>, TiffError> {
    if ifd.sample_format()? != SampleFormat::IeeeFp {
        return Ok(None);
    }
    let bits = *ifd
        .bits_per_sample()?
        .first()
        .ok_or_else(|| TiffError::malformed("empty BitsPerSample"))?;
    Ok(match bits {
        16 => Some((5, 10)),
        24 => Some((7, 16)),
        _ => None,
    })
}

fn expand_unusual_floats(data: &[u8], eb: u32, mb: u32, byte_order: ByteOrder) -> Vec<u8> {
    let src_width = ((eb + mb + 1) as usize).div_ceil(8);
    let mut out = Vec::with_capacity(data.len() / src_width * 4);
    for chunk in data.chunks(src_width) {
        let raw = read_uint_bytes(chunk, byte_order);
        let bits = expand_float_bits(raw, eb, mb);
        out.extend_from_slice(&bits.to_le_bytes());
    }
    out
}

fn read_uint_bytes(chunk: &[u8], byte_order: ByteOrder) -> u64 {
    let mut v = 0u64;
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

fn expand_float_bits(raw: u64, eb: u32, mb: u32) -> u32 {
    let sign = ((raw >> (eb + mb)) & 1) as u32;
    let exp = ((raw >> mb) & ((1u64 << eb) - 1)) as u32;
    let mantissa = (raw & ((1u64 << mb) - 1)) as u32;
    let src_bias = (1u32 << (eb - 1)) - 1;
    let bias_diff = 127i32 - src_bias as i32;
    let all_ones = (1u32 << eb) - 1;

    let (out_exp, out_mantissa) = if exp == 0 && mantissa == 0 {
        (0u32, 0u32)
    } else if exp == 0 {
        // Subnormal: normalize by shifting the mantissa until its top bit
        // lines up with the implicit leading 1.
        let mut m = mantissa;
        let mut shift = 0i32;
        while m & (1 << mb) == 0 {
            m <<= 1;
            shift += 1;
        }
        m &= (1u32 << mb) - 1;
        let new_exp = 1 - shift + bias_diff;
        (new_exp.max(0) as u32, m)
    } else if exp == all_ones {
        (255u32, mantissa)
    } else {
        ((exp as i32 + bias_diff) as u32, mantissa)
    };

    (sign << 31) | (out_exp << 23) | (out_mantissa << (23 - mb))
}

fn interleave(data: &[u8], w: usize, h: usize, channels: usize, bps: usize) -> Vec<u8> {
    let plane_len = w * h * bps;
    let mut out = vec![0u8; data.len()];
    for p in 0..channels {
        for px in 0..w * h {
            let src = p * plane_len + px * bps;
            let dst = px * channels * bps + p * bps;
            out[dst..dst + bps].copy_from_slice(&data[src..src + bps]);
        }
    }
    out
}
