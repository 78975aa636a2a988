//! Top-level reader: ties a [`SeekableSource`] to a parsed IFD chain, a
//! [`CodecRegistry`], and [`ReaderOptions`], and exposes region reads.

use bytes::Bytes;

use crate::codec::CodecRegistry;
use crate::error::TiffError;
use crate::io::{LockedSource, SeekableSource};
use crate::options::ReaderOptions;
use crate::region::{read_region, RegionRequest};
use crate::tiff::{read_ifd_chain, ByteOrder, Ifd, TiffHeader};
use crate::tilemap::TileMap;

/// A parsed TIFF/BigTIFF container: its IFD chain, byte order, and the
/// source it was read from.
///
/// Construct with [`TiffReader::open`]. The IFD chain is walked eagerly (per
/// `opts.caching_ifds`'s ambient assumption that a reader session reuses its
/// metadata across many region reads) and is then immutable for the life of
/// the reader.
pub struct TiffReader<S> {
    source: LockedSource<S>,
    header: TiffHeader,
    ifds: Vec<Ifd>,
    registry: CodecRegistry,
    opts: ReaderOptions,
}

impl<S: SeekableSource> TiffReader<S> {
    /// Open `source`, parse its header, and walk its IFD chain.
    pub fn open(source: S, opts: ReaderOptions) -> Result<Self, TiffError> {
        Self::open_with_registry(source, opts, CodecRegistry::with_defaults())
    }

    /// Like [`TiffReader::open`], but with a caller-supplied codec registry
    /// (e.g. one with JPEG/JPEG2000 codecs registered).
    pub fn open_with_registry(
        source: S,
        opts: ReaderOptions,
        registry: CodecRegistry,
    ) -> Result<Self, TiffError> {
        const HEADER_PROBE_LEN: usize = 16; // enough for classic (8) or BigTIFF (16)

        let locked = LockedSource::new(source);
        let header_bytes = locked.read_exact_at(0, HEADER_PROBE_LEN.min(locked.len() as usize))?;
        let header = TiffHeader::parse(&header_bytes, locked.len(), opts.require_valid_tiff)?;
        let ifds = read_ifd_chain(&locked, &header, opts.require_valid_tiff, true)?;

        Ok(TiffReader {
            source: locked,
            header,
            ifds,
            registry,
            opts,
        })
    }

    /// The parsed file header.
    pub fn header(&self) -> &TiffHeader {
        &self.header
    }

    /// The byte order declared by the file header.
    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    /// The full IFD chain (main chain plus any followed `SubIFD`/`ExifIFD`
    /// entries), in the order the parser discovered them.
    pub fn ifds(&self) -> &[Ifd] {
        &self.ifds
    }

    /// The IFD at `index`, or `Malformed` if out of range.
    pub fn ifd(&self, index: usize) -> Result<&Ifd, TiffError> {
        self.ifds
            .get(index)
            .ok_or_else(|| TiffError::malformed(format!("no IFD at index {index}")))
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut CodecRegistry {
        &mut self.registry
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.opts
    }

    /// Build a fixed-grid `TileMap` over the IFD at `index`.
    pub fn tile_map(&self, index: usize) -> Result<TileMap<'_>, TiffError> {
        TileMap::new(self.ifd(index)?, false)
    }

    /// Read `request`'s pixel rectangle out of the IFD at `index`,
    /// decoding (and caching, if `store_tiles` is set) whichever tiles it
    /// overlaps.
    pub fn read_region(
        &self,
        index: usize,
        request: RegionRequest,
        store_tiles: bool,
    ) -> Result<Bytes, TiffError> {
        let ifd = self.ifd(index)?;
        let mut map = TileMap::new(ifd, false)?;
        read_region(
            &mut map,
            ifd,
            &self.source,
            self.header.byte_order,
            &self.registry,
            &self.opts,
            request,
            store_tiles,
        )
    }
}
