//! Seekable byte sources and endian helpers.
//!
//! This module defines the I/O boundary the container parser and decode
//! pipeline are built against. A [`SeekableSource`] is a random-access byte
//! source — a local file, a memory-mapped region, a caller-supplied buffer.
//! The engine never assumes anything about where the bytes come from; it
//! only ever calls `seek` followed by `read_exact`.
//!
//! # Concurrency
//!
//! A single logical session may be read from multiple threads concurrently,
//! but a `SeekableSource` carries a cursor, so access must be serialized.
//! [`LockedSource`] wraps any `SeekableSource` behind a `Mutex` and exposes a
//! cursor-free `read_exact_at(offset, len)`, mirroring how the rest of the
//! engine wants to read: "give me these bytes from here," not "seek, then
//! read."

use std::sync::Mutex;

use bytes::Bytes;

use crate::error::IoError;

/// A random-access byte source.
///
/// Implementations must be `Send`: a `SeekableSource` is typically wrapped
/// in a [`LockedSource`] and shared across threads, but only one thread
/// drives it at a time (the mutex enforces that).
pub trait SeekableSource: Send {
    /// Total length of the source in bytes.
    fn len(&self) -> u64;

    /// Move the cursor to `pos`. `pos` may be at or past `len()`; the next
    /// read will then fail rather than the seek itself.
    fn seek(&mut self, pos: u64) -> Result<(), IoError>;

    /// Fill `buf` completely from the current cursor position, advancing it
    /// by `buf.len()`. Must fail with [`IoError::RangeOutOfBounds`] (or an
    /// implementation-specific I/O error) rather than returning a partial
    /// read.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), IoError>;

    /// `true` if the source has zero length.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Serializes access to a [`SeekableSource`] behind a mutex.
///
/// This is the engine's only way of touching a `SeekableSource` once a
/// reader session has started: every higher-level component (the container
/// parser, the region reader, one decode-pipeline invocation per tile) goes
/// through `read_exact_at`, never through `seek`/`read_exact` directly, so
/// there is exactly one lock acquisition per logical read.
pub struct LockedSource<S> {
    inner: Mutex<S>,
    len: u64,
}

impl<S: SeekableSource> LockedSource<S> {
    /// Wrap a source. The length is snapshotted once at construction time;
    /// sources are not expected to grow or shrink during a reader session.
    pub fn new(source: S) -> Self {
        let len = source.len();
        Self {
            inner: Mutex::new(source),
            len,
        }
    }

    /// Total length of the underlying source, snapshotted at construction.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// `true` if the underlying source is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read exactly `len` bytes starting at `offset`.
    ///
    /// Acquires the lock, seeks, reads, and releases the lock before
    /// returning. Validates the range against the snapshotted length before
    /// touching the source at all, so an out-of-bounds request never reaches
    /// the underlying I/O.
    pub fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        if offset.saturating_add(len as u64) > self.len {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.len,
            });
        }
        if len == 0 {
            return Ok(Bytes::new());
        }

        let mut guard = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.seek(offset)?;
        let mut buf = vec![0u8; len];
        guard.read_exact(&mut buf)?;
        Ok(Bytes::from(buf))
    }
}

// =============================================================================
// Endian helper functions
// =============================================================================
//
// TIFF files can be either little-endian or big-endian, determined by the
// magic bytes at the start of the file. These helpers are used extensively
// by the container parser and value reader.

/// Read a little-endian u16 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 2 bytes.
#[inline]
pub fn read_u16_le(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

/// Read a big-endian u16 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 2 bytes.
#[inline]
pub fn read_u16_be(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

/// Read a little-endian u32 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
pub fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read a big-endian u32 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
pub fn read_u32_be(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read a little-endian u64 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 8 bytes.
#[inline]
pub fn read_u64_le(bytes: &[u8]) -> u64 {
    u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

/// Read a big-endian u64 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 8 bytes.
#[inline]
pub fn read_u64_be(bytes: &[u8]) -> u64 {
    u64::from_be_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}
