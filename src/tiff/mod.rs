//! The TIFF/BigTIFF container model: tag vocabulary, dynamic value typing,
//! low-level entry parsing, and the higher-level `Ifd` chain.

mod ifd;
mod parser;
mod tags;
mod value;

pub use ifd::{read_ifd_chain, Ifd, SubIfdKind};
pub use parser::{ByteOrder, TiffHeader, MAX_ENTRIES_PER_IFD};
pub use tags::{Compression, FieldType, FillOrder, Photometric, PlanarConfig, Predictor, SampleFormat, Tag};
pub use value::IfdValue;
