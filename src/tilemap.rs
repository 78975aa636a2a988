//! The tile grid over one IFD: geometry, tile storage, and the tile record
//! itself.

use std::collections::HashMap;

use bytes::Bytes;

use crate::error::TiffError;
use crate::tiff::{Ifd, PlanarConfig};

/// Maximum tile/plane index the grid will accept (spec's documented limit).
const MAX_TILE_INDEX: u64 = 1_000_000_000;

// =============================================================================
// TileIndex
// =============================================================================

/// A tile's position in the grid, plus its cached pixel-space bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileIndex {
    pub plane: u32,
    pub x_tile: u32,
    pub y_tile: u32,
    pub from_x: u32,
    pub from_y: u32,
    pub to_x: u32,
    pub to_y: u32,
}

impl TileIndex {
    fn new(plane: u32, x_tile: u32, y_tile: u32, tile_size_x: u32, tile_size_y: u32) -> Self {
        let from_x = x_tile as u64 * tile_size_x as u64;
        let from_y = y_tile as u64 * tile_size_y as u64;
        let to_x = (from_x + tile_size_x as u64).min((1u64 << 31) - 1);
        let to_y = (from_y + tile_size_y as u64).min((1u64 << 31) - 1);
        TileIndex {
            plane,
            x_tile,
            y_tile,
            from_x: from_x as u32,
            from_y: from_y as u32,
            to_x: to_x as u32,
            to_y: to_y as u32,
        }
    }
}

// =============================================================================
// Tile
// =============================================================================

/// One tile's encoded/decoded bytes plus the flags the decode pipeline and
/// region reader need to interpret them.
#[derive(Debug, Clone)]
pub struct Tile {
    index: TileIndex,
    encoded: Option<Bytes>,
    decoded: Option<Bytes>,
    interleaved: bool,
    separated: bool,
    empty: bool,
    size_x: u32,
    size_y: u32,
}

impl Tile {
    fn new(index: TileIndex, size_x: u32, size_y: u32) -> Self {
        Tile {
            index,
            encoded: None,
            decoded: None,
            interleaved: true,
            separated: false,
            empty: false,
            size_x,
            size_y,
        }
    }

    pub fn index(&self) -> TileIndex {
        self.index
    }

    pub fn encoded(&self) -> Option<&Bytes> {
        self.encoded.as_ref()
    }

    pub fn decoded(&self) -> Option<&Bytes> {
        self.decoded.as_ref()
    }

    pub fn interleaved(&self) -> bool {
        self.interleaved
    }

    pub fn separated(&self) -> bool {
        self.separated
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn size_x(&self) -> u32 {
        self.size_x
    }

    pub fn size_y(&self) -> u32 {
        self.size_y
    }

    pub fn mark_empty(&mut self) {
        self.empty = true;
        self.encoded = Some(Bytes::new());
    }

    pub fn set_encoded(&mut self, data: Bytes) {
        self.encoded = Some(data);
    }

    pub fn set_decoded(&mut self, data: Bytes, interleaved: bool) {
        self.decoded = Some(data);
        self.interleaved = interleaved;
        self.separated = !interleaved;
    }

    /// Clip the tile's declared size down to the image boundary.
    pub fn crop_to_map(&mut self, dim_x: u32, dim_y: u32) {
        if self.index.from_x < dim_x {
            self.size_x = self.size_x.min(dim_x - self.index.from_x);
        } else {
            self.size_x = 0;
        }
        if self.index.from_y < dim_y {
            self.size_y = self.size_y.min(dim_y - self.index.from_y);
        } else {
            self.size_y = 0;
        }
    }

    /// Truncate or zero-extend `decoded` to exactly `expected_len` bytes.
    pub fn adjust_number_of_pixels(&mut self, expected_len: usize) -> Result<(), TiffError> {
        let data = self
            .decoded
            .take()
            .ok_or_else(|| TiffError::malformed("adjust_number_of_pixels on a tile with no decoded data"))?;
        let mut buf = Vec::with_capacity(expected_len);
        buf.extend_from_slice(&data[..data.len().min(expected_len)]);
        buf.resize(expected_len, 0);
        self.decoded = Some(Bytes::from(buf));
        Ok(())
    }

    /// De-interleave `decoded` from chunky (`RGBRGB...`) to separated
    /// (`RRR...GGG...BBB...`) layout, if `tile_samples_per_pixel > 1`.
    pub fn separate_samples_if_necessary(
        &mut self,
        tile_samples_per_pixel: usize,
        bytes_per_sample: usize,
    ) -> Result<(), TiffError> {
        if self.separated || tile_samples_per_pixel <= 1 {
            self.separated = true;
            self.interleaved = false;
            return Ok(());
        }
        let data = self
            .decoded
            .take()
            .ok_or_else(|| TiffError::malformed("separate_samples_if_necessary on a tile with no decoded data"))?;
        let pixel_stride = tile_samples_per_pixel * bytes_per_sample;
        if data.len() % pixel_stride != 0 {
            return Err(TiffError::malformed(
                "decoded tile length is not a multiple of its pixel stride",
            ));
        }
        let num_pixels = data.len() / pixel_stride;
        let mut out = vec![0u8; data.len()];
        for p in 0..num_pixels {
            for ch in 0..tile_samples_per_pixel {
                let src = p * pixel_stride + ch * bytes_per_sample;
                let dst = (ch * num_pixels + p) * bytes_per_sample;
                out[dst..dst + bytes_per_sample].copy_from_slice(&data[src..src + bytes_per_sample]);
            }
        }
        self.decoded = Some(Bytes::from(out));
        self.separated = true;
        self.interleaved = false;
        Ok(())
    }
}

// =============================================================================
// TileMap
// =============================================================================

/// The logical grid of tiles over one frozen `Ifd`.
pub struct TileMap<'a> {
    ifd: &'a Ifd,
    resizable: bool,
    planar_separated: bool,
    num_channels: u32,
    num_separated_planes: u32,
    tile_samples_per_pixel: u32,
    bytes_per_sample: u32,
    tile_bytes_per_pixel: u32,
    total_bytes_per_pixel: u32,
    tile_size_x: u32,
    tile_size_y: u32,
    tile_pixels: u64,
    tile_bytes: u64,
    dim_x: u32,
    dim_y: u32,
    tile_count_x: u32,
    tile_count_y: u32,
    num_tiles: u64,
    tiles: HashMap<TileIndexKey, Tile>,
    insertion_order: Vec<TileIndexKey>,
}

/// The three-field key a tile is stored under, distinct from `TileIndex`'s
/// cached coordinates so lookups don't depend on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TileIndexKey {
    plane: u32,
    x_tile: u32,
    y_tile: u32,
}

impl<'a> TileMap<'a> {
    /// Build a grid over `ifd`. If `resizable` is `false`, the IFD must
    /// already declare image dimensions.
    pub fn new(ifd: &'a Ifd, resizable: bool) -> Result<Self, TiffError> {
        let planar_config = ifd.planar_config()?;
        let num_channels = ifd.samples_per_pixel()?;
        let planar_separated = planar_config == PlanarConfig::Separate;
        let num_separated_planes = if planar_separated { num_channels } else { 1 };
        let tile_samples_per_pixel = if planar_separated { 1 } else { num_channels };
        let bytes_per_sample = ifd.bytes_per_sample()?;
        let tile_bytes_per_pixel = tile_samples_per_pixel * bytes_per_sample;
        let total_bytes_per_pixel = num_channels * bytes_per_sample;

        let tile_size_x = ifd.tile_size_x()?;
        let tile_size_y = ifd.tile_size_y()?;
        let tile_pixels = tile_size_x as u64 * tile_size_y as u64;
        if tile_pixels > (1u64 << 31) - 1 {
            return Err(TiffError::out_of_range("tile_size_x * tile_size_y exceeds 31 bits"));
        }
        let tile_bytes = tile_pixels * tile_bytes_per_pixel as u64;
        if tile_bytes > (1u64 << 31) - 1 {
            return Err(TiffError::out_of_range(
                "tile_size_x * tile_size_y * bytes_per_pixel exceeds 31 bits",
            ));
        }

        let mut map = TileMap {
            ifd,
            resizable,
            planar_separated,
            num_channels,
            num_separated_planes,
            tile_samples_per_pixel,
            bytes_per_sample,
            tile_bytes_per_pixel,
            total_bytes_per_pixel,
            tile_size_x,
            tile_size_y,
            tile_pixels,
            tile_bytes,
            dim_x: 0,
            dim_y: 0,
            tile_count_x: 0,
            tile_count_y: 0,
            num_tiles: 0,
            tiles: HashMap::new(),
            insertion_order: Vec::new(),
        };

        match (ifd.image_dim_x(), ifd.image_dim_y()) {
            (Ok(w), Ok(h)) => map.set_dimensions(w, h)?,
            _ if resizable => {}
            (Err(e), _) | (_, Err(e)) => return Err(e),
        }

        Ok(map)
    }

    pub fn ifd(&self) -> &Ifd {
        self.ifd
    }

    pub fn resizable(&self) -> bool {
        self.resizable
    }

    pub fn planar_separated(&self) -> bool {
        self.planar_separated
    }

    pub fn num_channels(&self) -> u32 {
        self.num_channels
    }

    pub fn num_separated_planes(&self) -> u32 {
        self.num_separated_planes
    }

    pub fn tile_samples_per_pixel(&self) -> u32 {
        self.tile_samples_per_pixel
    }

    pub fn bytes_per_sample(&self) -> u32 {
        self.bytes_per_sample
    }

    pub fn tile_bytes_per_pixel(&self) -> u32 {
        self.tile_bytes_per_pixel
    }

    pub fn total_bytes_per_pixel(&self) -> u32 {
        self.total_bytes_per_pixel
    }

    pub fn tile_size_x(&self) -> u32 {
        self.tile_size_x
    }

    pub fn tile_size_y(&self) -> u32 {
        self.tile_size_y
    }

    pub fn tile_pixels(&self) -> u64 {
        self.tile_pixels
    }

    pub fn tile_bytes(&self) -> u64 {
        self.tile_bytes
    }

    pub fn dim_x(&self) -> u32 {
        self.dim_x
    }

    pub fn dim_y(&self) -> u32 {
        self.dim_y
    }

    pub fn tile_count_x(&self) -> u32 {
        self.tile_count_x
    }

    pub fn tile_count_y(&self) -> u32 {
        self.tile_count_y
    }

    pub fn num_tiles(&self) -> u64 {
        self.num_tiles
    }

    /// `linear_index(plane, xi, yi) = (plane * tile_count_y + yi) * tile_count_x + xi`.
    pub fn linear_index(&self, plane: u32, xi: u32, yi: u32) -> u64 {
        (plane as u64 * self.tile_count_y as u64 + yi as u64) * self.tile_count_x as u64 + xi as u64
    }

    /// Recompute `tile_count_x/y` and `num_tiles` for new image dimensions.
    pub fn set_dimensions(&mut self, w: u32, h: u32) -> Result<(), TiffError> {
        self.dim_x = w;
        self.dim_y = h;
        let tile_count_x = div_ceil_u32(w, self.tile_size_x);
        let tile_count_y = div_ceil_u32(h, self.tile_size_y);
        self.set_tile_counts(tile_count_x, tile_count_y)
    }

    /// Grow dimensions if `min_w`/`min_h` exceed the current ones; no-op
    /// otherwise.
    pub fn expand_sizes(&mut self, min_w: u32, min_h: u32) -> Result<(), TiffError> {
        if min_w <= self.dim_x && min_h <= self.dim_y {
            return Ok(());
        }
        self.set_dimensions(self.dim_x.max(min_w), self.dim_y.max(min_h))
    }

    /// Grow the tile-count grid if needed, guarded by the `2^31` overflow
    /// check.
    pub fn expand_tile_counts(&mut self, min_cx: u32, min_cy: u32) -> Result<(), TiffError> {
        if min_cx <= self.tile_count_x && min_cy <= self.tile_count_y {
            return Ok(());
        }
        self.set_tile_counts(self.tile_count_x.max(min_cx), self.tile_count_y.max(min_cy))
    }

    fn set_tile_counts(&mut self, tile_count_x: u32, tile_count_y: u32) -> Result<(), TiffError> {
        let num_tiles = tile_count_x as u64 * tile_count_y as u64 * self.num_separated_planes as u64;
        if num_tiles >= (1u64 << 31) {
            return Err(TiffError::out_of_range(
                "tile_count_x * tile_count_y * num_separated_planes exceeds 2^31",
            ));
        }
        self.tile_count_x = tile_count_x;
        self.tile_count_y = tile_count_y;
        self.num_tiles = num_tiles;
        Ok(())
    }

    /// Build a fresh, un-stored `Tile` for `(plane, xi, yi)`, clipped to the
    /// image boundary if `crop` is set.
    pub fn make_tile(&self, plane: u32, xi: u32, yi: u32, crop: bool) -> Result<Tile, TiffError> {
        check_index(plane, xi, yi)?;
        let index = TileIndex::new(plane, xi, yi, self.tile_size_x, self.tile_size_y);
        let mut tile = Tile::new(index, self.tile_size_x, self.tile_size_y);
        if crop {
            tile.crop_to_map(self.dim_x, self.dim_y);
        }
        Ok(tile)
    }

    /// Insert a tile into the grid. In resizable mode, grows the grid to
    /// encompass it; in fixed mode, fails if it falls outside the current
    /// grid.
    pub fn put(&mut self, tile: Tile) -> Result<(), TiffError> {
        let idx = tile.index();
        check_index(idx.plane, idx.x_tile, idx.y_tile)?;

        if idx.x_tile >= self.tile_count_x || idx.y_tile >= self.tile_count_y {
            if !self.resizable {
                return Err(TiffError::out_of_range(format!(
                    "tile ({}, {}) is outside the fixed {}x{} grid",
                    idx.x_tile, idx.y_tile, self.tile_count_x, self.tile_count_y
                )));
            }
            self.expand_tile_counts(idx.x_tile + 1, idx.y_tile + 1)?;
        }

        let key = TileIndexKey {
            plane: idx.plane,
            x_tile: idx.x_tile,
            y_tile: idx.y_tile,
        };
        if self.tiles.insert(key, tile).is_none() {
            self.insertion_order.push(key);
        }
        Ok(())
    }

    /// Look up a previously-inserted tile.
    pub fn get(&self, plane: u32, xi: u32, yi: u32) -> Option<&Tile> {
        self.tiles.get(&TileIndexKey {
            plane,
            x_tile: xi,
            y_tile: yi,
        })
    }

    /// Drop all stored tiles and reset counts to zero.
    pub fn clear(&mut self) {
        self.tiles.clear();
        self.insertion_order.clear();
        self.dim_x = 0;
        self.dim_y = 0;
        self.tile_count_x = 0;
        self.tile_count_y = 0;
        self.num_tiles = 0;
    }

    /// Tiles in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.insertion_order.iter().filter_map(|k| self.tiles.get(k))
    }
}

impl PartialEq for TileMap<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.ifd.id() == other.ifd.id()
            && self.resizable == other.resizable
            && self.dim_x == other.dim_x
            && self.dim_y == other.dim_y
            && self.tiles.len() == other.tiles.len()
            && self
                .insertion_order
                .iter()
                .zip(other.insertion_order.iter())
                .all(|(a, b)| a == b)
    }
}

fn check_index(plane: u32, xi: u32, yi: u32) -> Result<(), TiffError> {
    if plane as u64 > MAX_TILE_INDEX || xi as u64 > MAX_TILE_INDEX || yi as u64 > MAX_TILE_INDEX {
        return Err(TiffError::out_of_range("tile index exceeds 10^9"));
    }
    Ok(())
}

fn div_ceil_u32(a: u32, b: u32) -> u32 {
    ((a as u64 + b as u64 - 1) / b as u64) as u32
}
