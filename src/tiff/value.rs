//! Dynamic value typing for IFD entries.
//!
//! The container stores tag values as heterogeneous, dynamically-typed
//! arrays: whatever `FieldType` the entry declares, it is recorded in the
//! union of arrays below rather than forced into one representation. Callers
//! use the typed projection accessors (`as_u64_vec`, `as_string`, ...) to
//! pull out the shape they expect, getting a typed error on mismatch instead
//! of a silent reinterpretation.

use bytes::Bytes;

use crate::error::TiffError;

/// One IFD entry's decoded value, tagged by its original `FieldType`.
///
/// `Long`/`Long8`/`Ifd`/`Ifd8` are all integer-offset-shaped types; they are
/// folded into `Long`/`Long8` respectively since the engine only ever wants
/// their numeric value, never their "this was an offset to another IFD"
/// distinction (that's handled one layer up, by the parser's sub-IFD
/// following).
#[derive(Debug, Clone, PartialEq)]
pub enum IfdValue {
    Byte(Vec<u8>),
    Sbyte(Vec<i8>),
    Ascii(Vec<String>),
    Short(Vec<u16>),
    Sshort(Vec<i16>),
    Long(Vec<u32>),
    Slong(Vec<i32>),
    Long8(Vec<u64>),
    Slong8(Vec<i64>),
    Rational(Vec<(u32, u32)>),
    Srational(Vec<(i32, i32)>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Undefined(Bytes),
}

impl IfdValue {
    /// Number of elements in the value (strings count as one element each).
    pub fn len(&self) -> usize {
        match self {
            IfdValue::Byte(v) => v.len(),
            IfdValue::Sbyte(v) => v.len(),
            IfdValue::Ascii(v) => v.len(),
            IfdValue::Short(v) => v.len(),
            IfdValue::Sshort(v) => v.len(),
            IfdValue::Long(v) => v.len(),
            IfdValue::Slong(v) => v.len(),
            IfdValue::Long8(v) => v.len(),
            IfdValue::Slong8(v) => v.len(),
            IfdValue::Rational(v) => v.len(),
            IfdValue::Srational(v) => v.len(),
            IfdValue::Float(v) => v.len(),
            IfdValue::Double(v) => v.len(),
            IfdValue::Undefined(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Project any integer-shaped value (Byte, Sbyte, Short, Sshort, Long,
    /// Slong, Long8, Slong8) to a widened `u64` vector, per the spec's rule
    /// that unsigned LONG/LONG8 values are represented as 64-bit to preserve
    /// range. Signed values are reinterpreted as their bit pattern's
    /// unsigned widening is *not* performed silently — negative values
    /// produce a `Malformed` error, since none of the recognized tags carry
    /// negative counts, offsets, or dimensions.
    pub fn as_u64_vec(&self) -> Result<Vec<u64>, TiffError> {
        match self {
            IfdValue::Byte(v) => Ok(v.iter().map(|&b| b as u64).collect()),
            IfdValue::Short(v) => Ok(v.iter().map(|&s| s as u64).collect()),
            IfdValue::Long(v) => Ok(v.iter().map(|&l| l as u64).collect()),
            IfdValue::Long8(v) => Ok(v.clone()),
            IfdValue::Sbyte(v) => non_negative_widen(v),
            IfdValue::Sshort(v) => non_negative_widen(v),
            IfdValue::Slong(v) => non_negative_widen(v),
            IfdValue::Slong8(v) => non_negative_widen(v),
            other => Err(TiffError::malformed(format!(
                "expected an integer-typed value, got {}",
                other.type_name()
            ))),
        }
    }

    /// The first ASCII string, with its NUL terminator already stripped.
    pub fn as_string(&self) -> Result<&str, TiffError> {
        match self {
            IfdValue::Ascii(strings) => strings
                .first()
                .map(|s| s.as_str())
                .ok_or_else(|| TiffError::malformed("empty ASCII value")),
            other => Err(TiffError::malformed(format!(
                "expected ASCII, got {}",
                other.type_name()
            ))),
        }
    }

    /// All NUL-delimited strings in the value.
    pub fn as_strings(&self) -> Result<&[String], TiffError> {
        match self {
            IfdValue::Ascii(strings) => Ok(strings),
            other => Err(TiffError::malformed(format!(
                "expected ASCII, got {}",
                other.type_name()
            ))),
        }
    }

    /// Project RATIONAL/SRATIONAL pairs to their `f64` ratio.
    pub fn as_f64_ratios(&self) -> Result<Vec<f64>, TiffError> {
        match self {
            IfdValue::Rational(pairs) => {
                Ok(pairs.iter().map(|&(n, d)| n as f64 / d as f64).collect())
            }
            IfdValue::Srational(pairs) => {
                Ok(pairs.iter().map(|&(n, d)| n as f64 / d as f64).collect())
            }
            IfdValue::Float(v) => Ok(v.iter().map(|&f| f as f64).collect()),
            IfdValue::Double(v) => Ok(v.clone()),
            other => Err(TiffError::malformed(format!(
                "expected a rational or floating-point value, got {}",
                other.type_name()
            ))),
        }
    }

    /// Raw bytes, for BYTE/SBYTE/UNDEFINED values (e.g. JPEGTables).
    pub fn as_bytes(&self) -> Result<Bytes, TiffError> {
        match self {
            IfdValue::Undefined(b) => Ok(b.clone()),
            IfdValue::Byte(v) => Ok(Bytes::copy_from_slice(v)),
            other => Err(TiffError::malformed(format!(
                "expected raw bytes, got {}",
                other.type_name()
            ))),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            IfdValue::Byte(_) => "BYTE",
            IfdValue::Sbyte(_) => "SBYTE",
            IfdValue::Ascii(_) => "ASCII",
            IfdValue::Short(_) => "SHORT",
            IfdValue::Sshort(_) => "SSHORT",
            IfdValue::Long(_) => "LONG",
            IfdValue::Slong(_) => "SLONG",
            IfdValue::Long8(_) => "LONG8",
            IfdValue::Slong8(_) => "SLONG8",
            IfdValue::Rational(_) => "RATIONAL",
            IfdValue::Srational(_) => "SRATIONAL",
            IfdValue::Float(_) => "FLOAT",
            IfdValue::Double(_) => "DOUBLE",
            IfdValue::Undefined(_) => "UNDEFINED",
        }
    }
}

fn non_negative_widen<T>(values: &[T]) -> Result<Vec<u64>, TiffError>
where
    T: Copy + Into<i64>,
{
    values
        .iter()
        .map(|&v| {
            let v: i64 = v.into();
            u64::try_from(v)
                .map_err(|_| TiffError::malformed(format!("negative value {v} in integer tag")))
        })
        .collect()
}
