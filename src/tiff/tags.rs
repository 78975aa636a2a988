//! TIFF tag and field-type vocabulary.
//!
//! This module defines the identifiers that give meaning to raw IFD entries:
//! field types (how a value is encoded), tag IDs (what a value means), and
//! the small enums for the handful of tags whose values select engine
//! behavior (compression, photometric interpretation, planar configuration,
//! sample format, predictor, fill order).

// =============================================================================
// TIFF field types
// =============================================================================

/// TIFF field types, as defined by the TIFF 6.0 and BigTIFF specifications.
///
/// Each type has a fixed per-element byte size, used both to compute array
/// sizes and to decide whether a value fits inline in an IFD entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FieldType {
    Byte = 1,
    Ascii = 2,
    Short = 3,
    Long = 4,
    Rational = 5,
    Sbyte = 6,
    Undefined = 7,
    Sshort = 8,
    Slong = 9,
    Srational = 10,
    Float = 11,
    Double = 12,
    Ifd = 13,
    Long8 = 16,
    Slong8 = 17,
    Ifd8 = 18,
}

impl FieldType {
    /// Size of a single value of this type in bytes.
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::Sbyte | FieldType::Undefined => 1,
            FieldType::Short | FieldType::Sshort => 2,
            FieldType::Long | FieldType::Slong | FieldType::Float | FieldType::Ifd => 4,
            FieldType::Rational
            | FieldType::Srational
            | FieldType::Double
            | FieldType::Long8
            | FieldType::Slong8
            | FieldType::Ifd8 => 8,
        }
    }

    /// Build a `FieldType` from its numeric type code.
    ///
    /// Returns `None` for unrecognized codes — the caller surfaces this as
    /// `TiffError::Malformed` ("unknown IFD type"), per the container
    /// parser's entry-parsing rules.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(FieldType::Byte),
            2 => Some(FieldType::Ascii),
            3 => Some(FieldType::Short),
            4 => Some(FieldType::Long),
            5 => Some(FieldType::Rational),
            6 => Some(FieldType::Sbyte),
            7 => Some(FieldType::Undefined),
            8 => Some(FieldType::Sshort),
            9 => Some(FieldType::Slong),
            10 => Some(FieldType::Srational),
            11 => Some(FieldType::Float),
            12 => Some(FieldType::Double),
            13 => Some(FieldType::Ifd),
            16 => Some(FieldType::Long8),
            17 => Some(FieldType::Slong8),
            18 => Some(FieldType::Ifd8),
            _ => None,
        }
    }

    /// Maximum bytes that can be stored inline in a classic-TIFF IFD entry.
    pub const INLINE_THRESHOLD_TIFF: usize = 4;

    /// Maximum bytes that can be stored inline in a BigTIFF IFD entry.
    pub const INLINE_THRESHOLD_BIGTIFF: usize = 8;

    /// Whether a value of this type and `count` fits inline in the entry's
    /// value-or-offset field, rather than needing to be read from an
    /// external offset.
    #[inline]
    pub fn fits_inline(self, count: u64, is_bigtiff: bool) -> bool {
        let total_size = self.size_in_bytes() as u64 * count;
        let threshold = if is_bigtiff {
            Self::INLINE_THRESHOLD_BIGTIFF as u64
        } else {
            Self::INLINE_THRESHOLD_TIFF as u64
        };
        total_size <= threshold
    }
}

// =============================================================================
// TIFF tags
// =============================================================================

/// The recognized tag subset (spec: others are read but passed through
/// unmodified — an unrecognized tag is not an error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Tag {
    ImageWidth = 256,
    ImageLength = 257,
    BitsPerSample = 258,
    Compression = 259,
    PhotometricInterpretation = 262,
    FillOrder = 266,
    StripOffsets = 273,
    SamplesPerPixel = 277,
    RowsPerStrip = 278,
    StripByteCounts = 279,
    PlanarConfiguration = 284,
    Predictor = 317,
    TileWidth = 322,
    TileLength = 323,
    TileOffsets = 324,
    TileByteCounts = 325,
    SubIfd = 330,
    SampleFormat = 339,
    JpegTables = 347,
    YCbCrCoefficients = 529,
    YCbCrSubSampling = 530,
    ReferenceBlackWhite = 532,
    ExifIfd = 34665,
}

impl Tag {
    /// Build a `Tag` from its numeric ID. Returns `None` for tags outside
    /// the recognized subset; the caller retains those entries untouched.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            256 => Some(Tag::ImageWidth),
            257 => Some(Tag::ImageLength),
            258 => Some(Tag::BitsPerSample),
            259 => Some(Tag::Compression),
            262 => Some(Tag::PhotometricInterpretation),
            266 => Some(Tag::FillOrder),
            273 => Some(Tag::StripOffsets),
            277 => Some(Tag::SamplesPerPixel),
            278 => Some(Tag::RowsPerStrip),
            279 => Some(Tag::StripByteCounts),
            284 => Some(Tag::PlanarConfiguration),
            317 => Some(Tag::Predictor),
            322 => Some(Tag::TileWidth),
            323 => Some(Tag::TileLength),
            324 => Some(Tag::TileOffsets),
            325 => Some(Tag::TileByteCounts),
            330 => Some(Tag::SubIfd),
            339 => Some(Tag::SampleFormat),
            347 => Some(Tag::JpegTables),
            529 => Some(Tag::YCbCrCoefficients),
            530 => Some(Tag::YCbCrSubSampling),
            532 => Some(Tag::ReferenceBlackWhite),
            34665 => Some(Tag::ExifIfd),
            _ => None,
        }
    }

    /// The numeric tag ID.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }
}

// =============================================================================
// Compression
// =============================================================================

/// Compression scheme identifiers. The engine itself never decompresses
/// except via a registered [`crate::codec::Codec`]; this enum only carries
/// identity and the handful of behavioral flags the decode pipeline needs
/// (is this JPEG-family, does this codec pre-unpack).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Compression {
    None = 1,
    Lzw = 5,
    OldJpeg = 6,
    Jpeg = 7,
    Deflate = 8,
    AdobeDeflate = 32946,
    Jpeg2000 = 33003,
}

impl Compression {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Compression::None),
            5 => Some(Compression::Lzw),
            6 => Some(Compression::OldJpeg),
            7 => Some(Compression::Jpeg),
            8 => Some(Compression::Deflate),
            32946 => Some(Compression::AdobeDeflate),
            33003 => Some(Compression::Jpeg2000),
            _ => None,
        }
    }

    /// Whether this compression is one of the JPEG family (handles its own
    /// deinterleaving and YCbCr conversion internally, per decode pipeline
    /// stage 3/7's stage-selection rule).
    #[inline]
    pub const fn is_jpeg_family(self) -> bool {
        matches!(self, Compression::Jpeg | Compression::OldJpeg)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Compression::None => "None",
            Compression::Lzw => "LZW",
            Compression::OldJpeg => "Old JPEG",
            Compression::Jpeg => "JPEG",
            Compression::Deflate => "Deflate",
            Compression::AdobeDeflate => "Adobe Deflate",
            Compression::Jpeg2000 => "JPEG 2000",
        }
    }
}

// =============================================================================
// Photometric interpretation
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Photometric {
    WhiteIsZero = 0,
    BlackIsZero = 1,
    Rgb = 2,
    RgbPalette = 3,
    Mask = 4,
    Separated = 5,
    YCbCr = 6,
    CieLab = 8,
    IccLab = 9,
    ItuLab = 10,
    Cfa = 32803,
}

impl Photometric {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Photometric::WhiteIsZero),
            1 => Some(Photometric::BlackIsZero),
            2 => Some(Photometric::Rgb),
            3 => Some(Photometric::RgbPalette),
            4 => Some(Photometric::Mask),
            5 => Some(Photometric::Separated),
            6 => Some(Photometric::YCbCr),
            8 => Some(Photometric::CieLab),
            9 => Some(Photometric::IccLab),
            10 => Some(Photometric::ItuLab),
            32803 => Some(Photometric::Cfa),
            _ => None,
        }
    }

    /// Whether samples of this interpretation must be inverted against
    /// `max_value` during bit-unpacking (decode pipeline stage 6).
    #[inline]
    pub const fn inverts_samples(self) -> bool {
        matches!(self, Photometric::WhiteIsZero | Photometric::Separated)
    }
}

// =============================================================================
// Planar configuration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum PlanarConfig {
    Chunked = 1,
    Separate = 2,
}

impl PlanarConfig {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(PlanarConfig::Chunked),
            2 => Some(PlanarConfig::Separate),
            _ => None,
        }
    }
}

// =============================================================================
// Sample format
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum SampleFormat {
    Uint = 1,
    Int = 2,
    IeeeFp = 3,
    Void = 4,
    ComplexInt = 5,
    ComplexIeeeFp = 6,
}

impl SampleFormat {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(SampleFormat::Uint),
            2 => Some(SampleFormat::Int),
            3 => Some(SampleFormat::IeeeFp),
            4 => Some(SampleFormat::Void),
            5 => Some(SampleFormat::ComplexInt),
            6 => Some(SampleFormat::ComplexIeeeFp),
            _ => None,
        }
    }
}

// =============================================================================
// Predictor
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Predictor {
    None = 1,
    Horizontal = 2,
    FloatingPoint = 3,
}

impl Predictor {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Predictor::None),
            2 => Some(Predictor::Horizontal),
            3 => Some(Predictor::FloatingPoint),
            _ => None,
        }
    }
}

// =============================================================================
// Fill order
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FillOrder {
    /// Bit 7 (MSB) of each byte is the first bit in the bit stream.
    MsbFirst = 1,
    /// Bit 0 (LSB) of each byte is the first bit in the bit stream.
    LsbFirst = 2,
}

impl FillOrder {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(FillOrder::MsbFirst),
            2 => Some(FillOrder::LsbFirst),
            _ => None,
        }
    }
}
