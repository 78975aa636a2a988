//! The IFD (Image File Directory) model: chain traversal, sub-IFD
//! following, derived accessors, and the freeze discipline that protects a
//! TileMap's derived sizes from being invalidated out from under it.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use tracing::warn;

use crate::error::TiffError;
use crate::io::{LockedSource, SeekableSource};

use super::parser::{read_one_ifd_at, RawIfd, TiffHeader};
use super::tags::{Compression, FillOrder, Photometric, PlanarConfig, Predictor, SampleFormat, Tag};
use super::value::IfdValue;

/// Which role an IFD plays relative to the main chain — the discriminator
/// named by the data model, generalized (per the crate's supplemented
/// features) to record which tag led the parser here, so a caller walking
/// nested `SubIFD → SubIFD` chains can tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubIfdKind {
    Main,
    SubIfd,
    Exif,
}

/// One Image File Directory: a tag→value map plus the derived accessors
/// and invariants the rest of the engine relies on.
///
/// An `Ifd` is built by the parser, lives as long as the reader session, and
/// becomes immutable after [`Ifd::freeze`] except for the small whitelist of
/// updaters ([`Ifd::set_image_dimensions`],
/// [`Ifd::set_tile_offsets_and_byte_counts`],
/// [`Ifd::set_strip_offsets_and_byte_counts`]) that a `TileMap` needs to
/// keep working after an image is resized in place.
pub struct Ifd {
    id: u64,
    file_offset_of_reading: Option<u64>,
    next_ifd_offset: Option<u64>,
    sub_ifd_kind: Option<SubIfdKind>,
    entries: Vec<(u16, IfdValue)>,
    entries_by_tag: HashMap<u16, usize>,
    frozen: bool,
    cached_tile_offsets: OnceLock<Vec<u64>>,
    cached_tile_byte_counts: OnceLock<Vec<u64>>,
}

static NEXT_IFD_ID: AtomicU64 = AtomicU64::new(1);

impl Ifd {
    fn from_raw(raw: RawIfd, sub_ifd_kind: Option<SubIfdKind>) -> Self {
        let mut entries_by_tag = HashMap::with_capacity(raw.entries.len());
        for (i, (tag, _)) in raw.entries.iter().enumerate() {
            entries_by_tag.entry(*tag).or_insert(i);
        }
        Ifd {
            id: NEXT_IFD_ID.fetch_add(1, Ordering::Relaxed),
            file_offset_of_reading: Some(raw.file_offset),
            next_ifd_offset: raw.next_ifd_offset,
            sub_ifd_kind,
            entries: raw.entries,
            entries_by_tag,
            frozen: false,
            cached_tile_offsets: OnceLock::new(),
            cached_tile_byte_counts: OnceLock::new(),
        }
    }

    /// Process-wide identity, assigned once at construction. Used in place
    /// of pointer identity so that `TileMap` equality and tile-cache keys
    /// don't depend on an `Ifd`'s address.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Offset the IFD header was read from.
    pub fn file_offset_of_reading(&self) -> Option<u64> {
        self.file_offset_of_reading
    }

    /// File offset of the next IFD in the main chain, or `None` if this was
    /// the last one (next-offset field was `0`) or this is a sub-IFD.
    pub fn next_ifd_offset(&self) -> Option<u64> {
        self.next_ifd_offset
    }

    /// Which role this IFD plays (main chain, SubIFD, EXIF), if known.
    pub fn sub_ifd_kind(&self) -> Option<SubIfdKind> {
        self.sub_ifd_kind
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Prevent further structural mutation. Idempotent.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Raw value lookup by tag ID (works for both recognized and
    /// pass-through tags).
    pub fn get_raw(&self, tag_id: u16) -> Option<&IfdValue> {
        self.entries_by_tag.get(&tag_id).map(|&i| &self.entries[i].1)
    }

    /// Raw value lookup by recognized tag.
    pub fn get(&self, tag: Tag) -> Option<&IfdValue> {
        self.get_raw(tag.as_u16())
    }

    fn require(&self, tag: Tag) -> Result<&IfdValue, TiffError> {
        self.get(tag)
            .ok_or_else(|| TiffError::malformed(format!("missing required tag {tag:?}")))
    }

    // -------------------------------------------------------------------
    // Structural mutation (requires !frozen)
    // -------------------------------------------------------------------

    /// Insert or replace a tag's value. Fails if the IFD is frozen.
    pub fn put(&mut self, tag_id: u16, value: IfdValue) -> Result<(), TiffError> {
        if self.frozen {
            return Err(TiffError::malformed("cannot mutate a frozen IFD"));
        }
        if let Some(&i) = self.entries_by_tag.get(&tag_id) {
            self.entries[i].1 = value;
        } else {
            self.entries_by_tag.insert(tag_id, self.entries.len());
            self.entries.push((tag_id, value));
        }
        self.invalidate_caches();
        Ok(())
    }

    /// Drop all entries. Fails if the IFD is frozen.
    pub fn clear(&mut self) -> Result<(), TiffError> {
        if self.frozen {
            return Err(TiffError::malformed("cannot mutate a frozen IFD"));
        }
        self.entries.clear();
        self.entries_by_tag.clear();
        self.invalidate_caches();
        Ok(())
    }

    fn invalidate_caches(&mut self) {
        self.cached_tile_offsets = OnceLock::new();
        self.cached_tile_byte_counts = OnceLock::new();
    }

    // -------------------------------------------------------------------
    // Whitelisted updates, permitted even when frozen
    // -------------------------------------------------------------------

    /// Update `ImageWidth`/`ImageLength` in place. Permitted on a frozen
    /// IFD: a `TileMap` needs to be able to grow an image's declared
    /// dimensions without invalidating the rest of the frozen metadata.
    pub fn set_image_dimensions(&mut self, width: u32, height: u32) -> Result<(), TiffError> {
        self.force_put(Tag::ImageWidth.as_u16(), IfdValue::Long(vec![width]));
        self.force_put(Tag::ImageLength.as_u16(), IfdValue::Long(vec![height]));
        Ok(())
    }

    /// Update `TileOffsets`/`TileByteCounts` in place and refresh their
    /// caches. Permitted on a frozen IFD.
    pub fn set_tile_offsets_and_byte_counts(
        &mut self,
        offsets: Vec<u64>,
        byte_counts: Vec<u64>,
    ) -> Result<(), TiffError> {
        self.force_put(
            Tag::TileOffsets.as_u16(),
            IfdValue::Long8(offsets.clone()),
        );
        self.force_put(
            Tag::TileByteCounts.as_u16(),
            IfdValue::Long8(byte_counts.clone()),
        );
        let _ = self.cached_tile_offsets.set(offsets);
        let _ = self.cached_tile_byte_counts.set(byte_counts);
        Ok(())
    }

    /// Update `StripOffsets`/`StripByteCounts` in place. Permitted on a
    /// frozen IFD.
    pub fn set_strip_offsets_and_byte_counts(
        &mut self,
        offsets: Vec<u64>,
        byte_counts: Vec<u64>,
    ) -> Result<(), TiffError> {
        self.force_put(
            Tag::StripOffsets.as_u16(),
            IfdValue::Long8(offsets.clone()),
        );
        self.force_put(
            Tag::StripByteCounts.as_u16(),
            IfdValue::Long8(byte_counts.clone()),
        );
        let _ = self.cached_tile_offsets.set(offsets);
        let _ = self.cached_tile_byte_counts.set(byte_counts);
        Ok(())
    }

    fn force_put(&mut self, tag_id: u16, value: IfdValue) {
        if let Some(&i) = self.entries_by_tag.get(&tag_id) {
            self.entries[i].1 = value;
        } else {
            self.entries_by_tag.insert(tag_id, self.entries.len());
            self.entries.push((tag_id, value));
        }
    }

    // -------------------------------------------------------------------
    // Derived accessors
    // -------------------------------------------------------------------

    pub fn image_dim_x(&self) -> Result<u32, TiffError> {
        positive_dimension(self.require(Tag::ImageWidth)?)
    }

    pub fn image_dim_y(&self) -> Result<u32, TiffError> {
        positive_dimension(self.require(Tag::ImageLength)?)
    }

    /// Bits per sample for every channel. Length must be at least
    /// `samples_per_pixel`; values must be positive.
    pub fn bits_per_sample(&self) -> Result<Vec<u16>, TiffError> {
        let value = self.require(Tag::BitsPerSample)?;
        let bits: Vec<u16> = value
            .as_u64_vec()?
            .into_iter()
            .map(|v| v as u16)
            .collect();
        if bits.is_empty() {
            return Err(TiffError::malformed("BitsPerSample has no entries"));
        }
        if bits.iter().any(|&b| b == 0) {
            return Err(TiffError::malformed("BitsPerSample contains a zero entry"));
        }
        Ok(bits)
    }

    /// Samples per pixel. Special rule: old-style JPEG always has 3
    /// (YCbCr), regardless of what the tag says.
    pub fn samples_per_pixel(&self) -> Result<u32, TiffError> {
        if self.compression()? == Compression::OldJpeg {
            return Ok(3);
        }
        match self.get(Tag::SamplesPerPixel) {
            Some(v) => {
                let spp = v.as_u64_vec()?.first().copied().unwrap_or(1) as u32;
                if spp == 0 {
                    return Err(TiffError::malformed("SamplesPerPixel is 0"));
                }
                if spp > 512 {
                    return Err(TiffError::out_of_range(format!(
                        "SamplesPerPixel {spp} exceeds the limit of 512"
                    )));
                }
                Ok(spp)
            }
            None => Ok(1),
        }
    }

    /// `ceil(bits / 8)`, required to be equal across channels.
    pub fn bytes_per_sample(&self) -> Result<u32, TiffError> {
        let bits = self.bits_per_sample()?;
        let first = bits[0].div_ceil(8) as u32;
        if bits.iter().any(|&b| (b as u32).div_ceil(8) != first) {
            return Err(TiffError::unsupported(
                "bytes-per-sample differs across channels",
            ));
        }
        // A single entry is the common "uniform bit depth across channels"
        // shorthand; anything else must cover every sample.
        let spp = self.samples_per_pixel()? as usize;
        if bits.len() != 1 && bits.len() < spp {
            return Err(TiffError::malformed(
                "BitsPerSample has fewer entries than SamplesPerPixel",
            ));
        }
        let channels = spp as u64;
        if channels * first as u64 > 4096 {
            return Err(TiffError::out_of_range(
                "channels * bytes_per_sample exceeds 4096",
            ));
        }
        Ok(first)
    }

    pub fn planar_config(&self) -> Result<PlanarConfig, TiffError> {
        match self.get(Tag::PlanarConfiguration) {
            Some(v) => {
                let raw = v.as_u64_vec()?.first().copied().unwrap_or(1) as u16;
                PlanarConfig::from_u16(raw)
                    .ok_or_else(|| TiffError::malformed(format!("invalid PlanarConfiguration {raw}")))
            }
            None => Ok(PlanarConfig::Chunked),
        }
    }

    pub fn compression(&self) -> Result<Compression, TiffError> {
        match self.get(Tag::Compression) {
            Some(v) => {
                let raw = v.as_u64_vec()?.first().copied().unwrap_or(1) as u16;
                Compression::from_u16(raw)
                    .ok_or_else(|| TiffError::unsupported(format!("unrecognized compression {raw}")))
            }
            None => Ok(Compression::None),
        }
    }

    pub fn photometric(&self) -> Result<Photometric, TiffError> {
        let v = self.require(Tag::PhotometricInterpretation)?;
        let raw = v.as_u64_vec()?.first().copied().unwrap_or(0) as u32;
        Photometric::from_u32(raw)
            .ok_or_else(|| TiffError::unsupported(format!("unrecognized photometric value {raw}")))
    }

    pub fn fill_order(&self) -> Result<FillOrder, TiffError> {
        match self.get(Tag::FillOrder) {
            Some(v) => {
                let raw = v.as_u64_vec()?.first().copied().unwrap_or(1) as u16;
                FillOrder::from_u16(raw)
                    .ok_or_else(|| TiffError::malformed(format!("invalid FillOrder {raw}")))
            }
            None => Ok(FillOrder::MsbFirst),
        }
    }

    pub fn predictor(&self) -> Result<Predictor, TiffError> {
        match self.get(Tag::Predictor) {
            Some(v) => {
                let raw = v.as_u64_vec()?.first().copied().unwrap_or(1) as u16;
                Predictor::from_u16(raw)
                    .ok_or_else(|| TiffError::malformed(format!("invalid Predictor {raw}")))
            }
            None => Ok(Predictor::None),
        }
    }

    pub fn sample_format(&self) -> Result<SampleFormat, TiffError> {
        match self.get(Tag::SampleFormat) {
            Some(v) => {
                let raw = v.as_u64_vec()?.first().copied().unwrap_or(1) as u16;
                SampleFormat::from_u16(raw)
                    .ok_or_else(|| TiffError::malformed(format!("invalid SampleFormat {raw}")))
            }
            None => Ok(SampleFormat::Uint),
        }
    }

    /// `true` if both `TileWidth` and `TileLength` are present. It is an
    /// error for exactly one to be present.
    pub fn has_tile_information(&self) -> Result<bool, TiffError> {
        let has_width = self.get(Tag::TileWidth).is_some();
        let has_length = self.get(Tag::TileLength).is_some();
        if has_width != has_length {
            return Err(TiffError::malformed(
                "exactly one of TileWidth/TileLength is present",
            ));
        }
        Ok(has_width)
    }

    /// Tile width if tiled, else the full image width (a "strip" is a tile
    /// spanning the whole row).
    pub fn tile_size_x(&self) -> Result<u32, TiffError> {
        if self.has_tile_information()? {
            positive_dimension(self.require(Tag::TileWidth)?)
        } else {
            self.image_dim_x()
        }
    }

    /// Tile height if tiled, else `RowsPerStrip`.
    pub fn tile_size_y(&self) -> Result<u32, TiffError> {
        if self.has_tile_information()? {
            positive_dimension(self.require(Tag::TileLength)?)
        } else {
            match self.get(Tag::RowsPerStrip) {
                Some(v) => positive_dimension(v),
                None => self.image_dim_y(),
            }
        }
    }

    /// Tile/strip byte offsets, widened to `u64` and cached.
    pub fn tile_offsets(&self) -> Result<&[u64], TiffError> {
        if let Some(v) = self.cached_tile_offsets.get() {
            return Ok(v);
        }
        let tag = if self.has_tile_information()? {
            Tag::TileOffsets
        } else {
            Tag::StripOffsets
        };
        let raw = self.require(tag)?.as_u64_vec()?;
        Ok(self.cached_tile_offsets.get_or_init(|| raw))
    }

    /// Tile/strip byte counts, widened to `u64` and cached. Each value must
    /// fit in 31 bits.
    pub fn tile_byte_counts(&self) -> Result<&[u64], TiffError> {
        if let Some(v) = self.cached_tile_byte_counts.get() {
            return Ok(v);
        }
        let tag = if self.has_tile_information()? {
            Tag::TileByteCounts
        } else {
            Tag::StripByteCounts
        };
        let raw = self.require(tag)?.as_u64_vec()?;
        if raw.iter().any(|&c| c > (1u64 << 31) - 1) {
            return Err(TiffError::out_of_range(
                "a tile/strip byte count exceeds 31 bits",
            ));
        }
        Ok(self.cached_tile_byte_counts.get_or_init(|| raw))
    }
}

fn positive_dimension(value: &IfdValue) -> Result<u32, TiffError> {
    let raw = value
        .as_u64_vec()?
        .first()
        .copied()
        .ok_or_else(|| TiffError::malformed("empty dimension value"))?;
    if raw == 0 || raw > (1u32 << 31) as u64 - 1 {
        return Err(TiffError::out_of_range(format!(
            "dimension {raw} is not a positive 31-bit integer"
        )));
    }
    Ok(raw as u32)
}

// =============================================================================
// Chain traversal
// =============================================================================

/// Walk the main IFD chain starting at `header.first_ifd_offset`, following
/// `SubIFD`/`ExifIFD` pointers one level deep for each main IFD.
///
/// Cyclic offsets (anywhere in the combined main-chain + sub-IFD traversal)
/// fail with `CyclicIFDChain`. A sub-IFD that fails to parse is logged and
/// skipped; the parent IFD remains valid, per the parser's non-fatal
/// sub-IFD failure rule.
pub fn read_ifd_chain<S: SeekableSource>(
    source: &LockedSource<S>,
    header: &TiffHeader,
    require_valid: bool,
    follow_sub_ifds: bool,
) -> Result<Vec<Ifd>, TiffError> {
    let mut visited = HashSet::new();
    let mut result = Vec::new();
    let mut next = Some(header.first_ifd_offset);

    while let Some(offset) = next {
        if !visited.insert(offset) {
            return Err(TiffError::CyclicIfdChain(offset));
        }

        let raw = read_one_ifd_at(source, header, offset, require_valid)?;
        next = raw.next_ifd_offset;
        let mut ifd = Ifd::from_raw(raw, Some(SubIfdKind::Main));

        if follow_sub_ifds {
            append_sub_ifds(source, header, require_valid, &mut visited, &ifd, &mut result);
        }

        ifd.freeze();
        result.push(ifd);
    }

    Ok(result)
}

fn append_sub_ifds<S: SeekableSource>(
    source: &LockedSource<S>,
    header: &TiffHeader,
    require_valid: bool,
    visited: &mut HashSet<u64>,
    parent: &Ifd,
    out: &mut Vec<Ifd>,
) {
    let candidates: [(Tag, SubIfdKind); 2] =
        [(Tag::SubIfd, SubIfdKind::SubIfd), (Tag::ExifIfd, SubIfdKind::Exif)];

    for (tag, kind) in candidates {
        let Some(value) = parent.get(tag) else {
            continue;
        };
        let offsets = match value.as_u64_vec() {
            Ok(offsets) => offsets,
            Err(e) => {
                warn!("skipping {tag:?}: {e}");
                continue;
            }
        };
        for offset in offsets {
            if !visited.insert(offset) {
                warn!("skipping {tag:?} at {offset:#x}: already visited (cyclic)");
                continue;
            }
            match read_one_ifd_at(source, header, offset, require_valid) {
                Ok(raw) => {
                    let mut sub = Ifd::from_raw(raw, Some(kind));
                    sub.freeze();
                    out.push(sub);
                }
                Err(e) => {
                    warn!("failed to parse {tag:?} at {offset:#x}: {e}");
                }
            }
        }
    }
}
