mod file_source;
mod source;

pub use file_source::{FileSource, SliceSource};
pub use source::{
    read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_be, read_u64_le, LockedSource,
    SeekableSource,
};
