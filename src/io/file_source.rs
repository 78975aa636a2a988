//! Concrete `SeekableSource` implementations.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::IoError;
use crate::io::source::SeekableSource;

/// An in-memory source backed by an owned byte buffer.
///
/// Useful for tests and for callers who have already loaded a file (or
/// received one over the wire) into memory.
pub struct SliceSource {
    data: Vec<u8>,
    pos: u64,
}

impl SliceSource {
    /// Wrap an owned buffer.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }
}

impl SeekableSource for SliceSource {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn seek(&mut self, pos: u64) -> Result<(), IoError> {
        self.pos = pos;
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), IoError> {
        let start = self.pos;
        let end = start
            .checked_add(buf.len() as u64)
            .ok_or_else(|| IoError::Failed("offset overflow".to_string()))?;
        if end > self.data.len() as u64 {
            return Err(IoError::RangeOutOfBounds {
                offset: start,
                requested: buf.len() as u64,
                size: self.data.len() as u64,
            });
        }
        buf.copy_from_slice(&self.data[start as usize..end as usize]);
        self.pos = end;
        Ok(())
    }
}

/// A source backed by an open `std::fs::File`.
pub struct FileSource {
    file: File,
    len: u64,
}

impl FileSource {
    /// Open `path` for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let file = File::open(path).map_err(io_err)?;
        let len = file.metadata().map_err(io_err)?.len();
        Ok(Self { file, len })
    }

    /// Wrap an already-open file.
    pub fn from_file(file: File) -> Result<Self, IoError> {
        let len = file.metadata().map_err(io_err)?.len();
        Ok(Self { file, len })
    }
}

impl SeekableSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn seek(&mut self, pos: u64) -> Result<(), IoError> {
        self.file.seek(SeekFrom::Start(pos)).map_err(io_err)?;
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), IoError> {
        Read::read_exact(&mut self.file, buf).map_err(io_err)
    }
}

fn io_err(e: io::Error) -> IoError {
    IoError::Failed(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_slice_source_read_exact() {
        let mut source = SliceSource::new(vec![1, 2, 3, 4, 5]);
        source.seek(1).unwrap();
        let mut buf = [0u8; 3];
        source.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [2, 3, 4]);
    }

    #[test]
    fn test_slice_source_out_of_bounds() {
        let mut source = SliceSource::new(vec![1, 2, 3]);
        let mut buf = [0u8; 10];
        assert!(matches!(
            source.read_exact(&mut buf),
            Err(IoError::RangeOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_file_source_round_trip() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"hello tiff world").unwrap();
        tmp.flush().unwrap();

        let mut source = FileSource::open(tmp.path()).unwrap();
        assert_eq!(source.len(), 16);

        source.seek(6).unwrap();
        let mut buf = [0u8; 4];
        source.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"tiff");
    }
}
