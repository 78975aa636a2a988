//! The compression codec interface and registry.
//!
//! The engine treats decompression as an external collaborator: LZW, JPEG,
//! and JPEG2000 bodies are out of scope (see the crate's non-goals) and are
//! supplied by the caller through [`CodecRegistry`]. Deflate is implemented
//! here directly since it maps onto a single well-known crate
//! (`flate2`) rather than needing its own pluggable slot.

use bytes::Bytes;
use flate2::read::ZlibDecoder;
use std::io::Read;

use crate::error::TiffError;
use crate::tiff::Compression;

/// Options passed to a codec for one tile's decompression.
#[derive(Debug, Clone, Copy)]
pub struct CodecOpts {
    pub little_endian: bool,
    /// Upper bound on the decompressed size, used by codecs that need to
    /// preallocate or detect runaway output.
    pub max_bytes: usize,
    /// Whether the data is YCbCr and eligible for the codec's own
    /// colorspace conversion (true only for JPEG-family codecs; see the
    /// decode pipeline's stage-selection rule).
    pub ycbcr: bool,
    /// Whether the codec should treat samples as chunky on the way in.
    /// `false` for JPEG-family codecs, which deinterleave internally.
    pub interleaved: bool,
}

/// A compression codec: takes encoded tile bytes and this tile's options,
/// returns decompressed bytes.
pub trait Codec: Send + Sync {
    fn decode(&self, encoded: &[u8], opts: CodecOpts) -> Result<Bytes, TiffError>;
}

/// Returns the input unchanged. Used for `Compression::None` and as the
/// default for any compression the caller hasn't registered a codec for.
pub struct PassthroughCodec;

impl Codec for PassthroughCodec {
    fn decode(&self, encoded: &[u8], _opts: CodecOpts) -> Result<Bytes, TiffError> {
        Ok(Bytes::copy_from_slice(encoded))
    }
}

/// Zlib/Deflate decompression (TIFF `Compression::Deflate` and
/// `Compression::AdobeDeflate`, which share a wire format), via `flate2`.
pub struct DeflateCodec;

impl Codec for DeflateCodec {
    fn decode(&self, encoded: &[u8], opts: CodecOpts) -> Result<Bytes, TiffError> {
        let mut decoder = ZlibDecoder::new(encoded);
        let mut out = Vec::with_capacity(opts.max_bytes.min(1 << 20));
        decoder
            .read_to_end(&mut out)
            .map_err(|e| TiffError::CodecError(format!("deflate decompression failed: {e}")))?;
        if out.len() > opts.max_bytes {
            return Err(TiffError::out_of_range(format!(
                "deflate output {} bytes exceeds max_bytes {}",
                out.len(),
                opts.max_bytes
            )));
        }
        Ok(Bytes::from(out))
    }
}

/// A caller-populated table mapping `Compression` values to `Codec`
/// implementations. Unregistered compressions fail with `Unsupported`,
/// except `None`, which always resolves to `PassthroughCodec` whether or not
/// the caller registered anything else.
///
/// Two codecs can be on file for the same compression at once: the
/// host-native one this crate ships (currently just [`DeflateCodec`] via
/// [`CodecRegistry::with_defaults`]) and an extended one a caller registers
/// with [`CodecRegistry::register`] — typically a faster or more complete
/// implementation of the same compression. [`CodecRegistry::get`] picks
/// between them per the `extended_codec` reader option.
pub struct CodecRegistry {
    host_native: Vec<(Compression, Box<dyn Codec>)>,
    extended: Vec<(Compression, Box<dyn Codec>)>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        CodecRegistry {
            host_native: Vec::new(),
            extended: Vec::new(),
        }
    }

    /// A registry with `Deflate`/`AdobeDeflate` pre-wired to [`DeflateCodec`]
    /// as the host-native implementation.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.host_native.push((Compression::Deflate, Box::new(DeflateCodec)));
        registry.host_native.push((Compression::AdobeDeflate, Box::new(DeflateCodec)));
        registry
    }

    /// Register an extended (caller-supplied) codec for `compression`,
    /// replacing any previously registered extended codec for it. Does not
    /// touch the host-native codecs `with_defaults` installs.
    pub fn register(&mut self, compression: Compression, codec: Box<dyn Codec>) {
        self.extended.retain(|(c, _)| *c != compression);
        self.extended.push((compression, codec));
    }

    /// Resolve the codec for `compression`. When `prefer_extended` is true
    /// (the `extended_codec` reader option's default), a registered extended
    /// codec wins over the host-native one; when false, the host-native
    /// codec wins and the extended one is only used as a fallback.
    pub fn get(&self, compression: Compression, prefer_extended: bool) -> Result<&dyn Codec, TiffError> {
        if compression == Compression::None {
            return Ok(&PassthroughCodec);
        }
        let (first, second) = if prefer_extended {
            (&self.extended, &self.host_native)
        } else {
            (&self.host_native, &self.extended)
        };
        find_codec(first, compression)
            .or_else(|| find_codec(second, compression))
            .ok_or_else(|| {
                TiffError::unsupported(format!("no codec registered for {}", compression.name()))
            })
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn find_codec(table: &[(Compression, Box<dyn Codec>)], compression: Compression) -> Option<&dyn Codec> {
    table.iter().find(|(c, _)| *c == compression).map(|(_, codec)| codec.as_ref())
}
