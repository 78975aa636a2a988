//! # tiffcore
//!
//! A TIFF/BigTIFF container parser and tiled-region decode engine.
//!
//! This crate reads a classic or BigTIFF file's IFD chain, models its tile
//! (or strip) grid, and decodes arbitrary `(x, y, w, h)` pixel rectangles
//! out of it — running each overlapping tile through a fixed pipeline of
//! fill-order inversion, JPEG table merging, decompression, predictor
//! reversal, bit-unpacking, and YCbCr→RGB conversion as needed.
//!
//! Decompression itself is pluggable: the crate implements Deflate directly
//! and leaves LZW/JPEG/JPEG2000 to a caller-supplied [`codec::CodecRegistry`],
//! so this crate's own dependency footprint stays small.
//!
//! ## Architecture
//!
//! ```text
//!        SeekableSource (file, memory, ...)
//!              |
//!              v
//!   tiff::parser   --  header + raw IFD entries
//!              |
//!              v
//!   tiff::ifd      --  chain traversal, sub-IFDs, frozen Ifd model
//!              |
//!              v
//!   tilemap        --  tile grid geometry over one Ifd
//!              |
//!              v
//!   decode         --  per-tile pipeline (bitreader, jpegfix, codec)
//!              |
//!              v
//!   region         --  compose a pixel rectangle out of many tiles
//!              |
//!              v
//!   reader::TiffReader  --  the facade tying it all together
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use tiffcore::io::FileSource;
//! use tiffcore::options::ReaderOptions;
//! use tiffcore::reader::TiffReader;
//! use tiffcore::region::RegionRequest;
//!
//! let source = FileSource::open("slide.tiff").unwrap();
//! let reader = TiffReader::open(source, ReaderOptions::default()).unwrap();
//!
//! let region = reader
//!     .read_region(
//!         0,
//!         RegionRequest { from_x: 0, from_y: 0, size_x: 512, size_y: 512 },
//!         false,
//!     )
//!     .unwrap();
//! println!("read {} bytes", region.len());
//! ```

pub mod bitreader;
pub mod codec;
pub mod decode;
pub mod error;
pub mod io;
pub mod jpegfix;
pub mod options;
pub mod reader;
pub mod region;
pub mod tiff;
pub mod tilemap;

pub use codec::{Codec, CodecOpts, CodecRegistry};
pub use error::{IoError, TiffError};
pub use options::ReaderOptions;
pub use reader::TiffReader;
pub use region::RegionRequest;
pub use tiff::{
    ByteOrder, Compression, FieldType, FillOrder, Ifd, Photometric, PlanarConfig, Predictor,
    SampleFormat, SubIfdKind, Tag, TiffHeader,
};
pub use tilemap::{Tile, TileIndex, TileMap};
