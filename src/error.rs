use thiserror::Error;

/// Errors surfaced by a [`crate::io::SeekableSource`].
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Requested range exceeds the source's bounds.
    #[error("range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// Underlying I/O failure (e.g. a `std::io::Error` from a `FileSource`).
    #[error("I/O failure: {0}")]
    Failed(String),
}

/// Errors that can occur while parsing a container or decoding pixel data.
///
/// These are the kinds the core engine surfaces; `Io` wraps a source-level
/// failure, the rest cover structural and semantic failures found while
/// walking the IFD chain, validating a frozen IFD, or running the decode
/// pipeline.
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading from the source.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Bad byte-order marker or magic number: this is not a TIFF at all.
    #[error("not a TIFF file: {0}")]
    NotTiff(String),

    /// EOF encountered before the expected content was fully read.
    #[error("truncated: {0}")]
    Truncated(String),

    /// A structurally invalid field: present but inconsistent with its
    /// neighbors or with the format's rules.
    #[error("malformed: {0}")]
    Malformed(String),

    /// An IFD offset was seen twice while walking the chain.
    #[error("cyclic IFD chain: offset {0:#x} was already visited")]
    CyclicIfdChain(u64),

    /// A legal but unimplemented case (floating-point predictor, YCbCr on
    /// planar-separated data, unequal bytes-per-sample across channels, ...).
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Error bubbled up from a [`crate::codec::Codec`] implementation.
    #[error("codec error: {0}")]
    CodecError(String),

    /// Arithmetic overflow or an index/size outside a documented limit.
    #[error("out of range: {0}")]
    OutOfRange(String),
}

impl TiffError {
    /// Shorthand for [`TiffError::Malformed`] with a formatted message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        TiffError::Malformed(msg.into())
    }

    /// Shorthand for [`TiffError::Unsupported`] with a formatted message.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        TiffError::Unsupported(msg.into())
    }

    /// Shorthand for [`TiffError::OutOfRange`] with a formatted message.
    pub fn out_of_range(msg: impl Into<String>) -> Self {
        TiffError::OutOfRange(msg.into())
    }

    /// Shorthand for [`TiffError::Truncated`] with a formatted message.
    pub fn truncated(msg: impl Into<String>) -> Self {
        TiffError::Truncated(msg.into())
    }
}
