//! Owned byte buffer with optional scalar interpretation.
//!
//! A [`ByteBuffer`] is a plain growable byte sequence. It can additionally
//! carry a [`ScalarTag`] saying how its contents should be read back as a
//! number through [`ByteBuffer::value`]. All numeric encodings are
//! fixed-width little-endian; floats are IEEE-754.
//!
//! Read cursors are not part of the buffer. Use [`crate::reader::BinaryReader`]
//! to walk a buffer; any number of readers may borrow the same buffer.

use crate::error::SolError;

/// Width class of a tagged numeric buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// 8-bit integer.
    Byte,
    /// 16-bit integer.
    Short,
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    Long,
    /// IEEE-754 float. Encoded as 64 bits; decoded as 32 or 64 bits
    /// depending on the buffer length.
    Float,
}

impl ScalarKind {
    /// Encoded width in bytes.
    pub fn width(self) -> usize {
        match self {
            ScalarKind::Byte => 1,
            ScalarKind::Short => 2,
            ScalarKind::Int => 4,
            ScalarKind::Long | ScalarKind::Float => 8,
        }
    }
}

/// How a buffer's bytes are to be interpreted as a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScalarTag {
    pub kind: ScalarKind,
    pub signed: bool,
}

impl ScalarTag {
    pub fn new(kind: ScalarKind, signed: bool) -> Self {
        Self { kind, signed }
    }

    pub fn unsigned(kind: ScalarKind) -> Self {
        Self::new(kind, false)
    }

    pub fn signed(kind: ScalarKind) -> Self {
        Self::new(kind, true)
    }
}

/// A decoded (or to-be-encoded) numeric value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl Scalar {
    fn as_i128(self) -> Option<i128> {
        match self {
            Scalar::Unsigned(v) => Some(v as i128),
            Scalar::Signed(v) => Some(v as i128),
            Scalar::Float(_) => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Scalar::Unsigned(v) => v as f64,
            Scalar::Signed(v) => v as f64,
            Scalar::Float(v) => v,
        }
    }
}

macro_rules! scalar_from {
    ($variant:ident, $target:ty, $($t:ty),+) => {
        $(impl From<$t> for Scalar {
            fn from(v: $t) -> Self {
                Scalar::$variant(v as $target)
            }
        })+
    };
}

scalar_from!(Unsigned, u64, u8, u16, u32, u64);
scalar_from!(Signed, i64, i8, i16, i32, i64);
scalar_from!(Float, f64, f32, f64);

/// Growable byte sequence, optionally tagged for numeric interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteBuffer {
    data: Vec<u8>,
    tag: Option<ScalarTag>,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            tag: None,
        }
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            data: bytes.into(),
            tag: None,
        }
    }

    /// Decode base-58 text into a buffer.
    pub fn from_base58(text: &str) -> Result<Self, SolError> {
        let data = bs58::decode(text)
            .into_vec()
            .map_err(|e| SolError::MalformedInput(format!("base58 decode failed: {e}")))?;
        Ok(Self::from_bytes(data))
    }

    /// Encode a scalar at the width implied by `kind`.
    ///
    /// Integer values must fit the target width and signedness; they are
    /// never truncated. The resulting buffer keeps the tag so that
    /// [`value`](Self::value) reads the same number back.
    pub fn from_scalar(
        value: impl Into<Scalar>,
        kind: ScalarKind,
        signed: bool,
    ) -> Result<Self, SolError> {
        let value = value.into();
        let tag = ScalarTag::new(kind, signed);

        if kind == ScalarKind::Float {
            return Ok(Self {
                data: value.as_f64().to_le_bytes().to_vec(),
                tag: Some(tag),
            });
        }

        let v = value.as_i128().ok_or_else(|| {
            SolError::MalformedInput(format!("cannot encode a float as {kind:?}"))
        })?;
        let bits = (kind.width() * 8) as u32;
        let (min, max) = if signed {
            (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
        } else {
            (0, (1i128 << bits) - 1)
        };
        if v < min || v > max {
            return Err(SolError::MalformedInput(format!(
                "{v} out of range for {} {kind:?}",
                if signed { "signed" } else { "unsigned" }
            )));
        }

        let full = (v as i64 as u64).to_le_bytes();
        Ok(Self {
            data: full[..kind.width()].to_vec(),
            tag: Some(tag),
        })
    }

    /// Replace the scalar tag.
    pub fn with_tag(mut self, tag: ScalarTag) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn tag(&self) -> Option<ScalarTag> {
        self.tag
    }

    /// Append the bytes of `source` (any buffer, key, or slice).
    pub fn push(&mut self, source: impl AsRef<[u8]>) -> &mut Self {
        self.data.extend_from_slice(source.as_ref());
        self
    }

    pub fn push_byte(&mut self, byte: u8) -> &mut Self {
        self.data.push(byte);
        self
    }

    /// Copy `length` bytes starting at `offset` into a new buffer.
    ///
    /// `length = None` takes everything to the end. The new buffer is
    /// independent of `self` and carries `tag` (not `self`'s tag).
    pub fn slice(
        &self,
        offset: usize,
        length: Option<usize>,
        tag: Option<ScalarTag>,
    ) -> Result<ByteBuffer, SolError> {
        let remaining = self.data.len().saturating_sub(offset);
        let needed = length.unwrap_or(remaining);
        if offset > self.data.len() || needed > remaining {
            return Err(SolError::UnexpectedEof {
                offset,
                needed,
                remaining,
            });
        }

        Ok(ByteBuffer {
            data: self.data[offset..offset + needed].to_vec(),
            tag,
        })
    }

    /// Remove and return the first byte.
    pub fn shift(&mut self) -> Option<u8> {
        if self.data.is_empty() {
            None
        } else {
            Some(self.data.remove(0))
        }
    }

    /// Grow to at least `len` bytes, filling with `fill`. Never shrinks.
    pub fn pad(&mut self, len: usize, fill: u8) -> &mut Self {
        if self.data.len() < len {
            self.data.resize(len, fill);
        }
        self
    }

    /// Resize to exactly `size` bytes, truncating or zero-filling.
    pub fn fixed(&mut self, size: usize) -> &mut Self {
        self.data.resize(size, 0);
        self
    }

    /// Interpret the whole buffer as the scalar implied by its tag.
    pub fn value(&self) -> Result<Scalar, SolError> {
        let tag = self.tag.ok_or_else(|| {
            SolError::MalformedInput(
                "buffer has no scalar type; tag it before reading a value".into(),
            )
        })?;

        if tag.kind == ScalarKind::Float {
            return match self.data.len() {
                4 => {
                    let mut raw = [0u8; 4];
                    raw.copy_from_slice(&self.data);
                    Ok(Scalar::Float(f32::from_le_bytes(raw) as f64))
                }
                8 => {
                    let mut raw = [0u8; 8];
                    raw.copy_from_slice(&self.data);
                    Ok(Scalar::Float(f64::from_le_bytes(raw)))
                }
                n => Err(SolError::MalformedInput(format!(
                    "float buffer must be 4 or 8 bytes, got {n}"
                ))),
            };
        }

        let width = tag.kind.width();
        if self.data.len() != width {
            return Err(SolError::MalformedInput(format!(
                "{:?} buffer must be {width} bytes, got {}",
                tag.kind,
                self.data.len()
            )));
        }

        let mut raw = [0u8; 8];
        raw[..width].copy_from_slice(&self.data);
        let unsigned = u64::from_le_bytes(raw);

        if tag.signed {
            let shift = 64 - (width as u32 * 8);
            Ok(Scalar::Signed(((unsigned << shift) as i64) >> shift))
        } else {
            Ok(Scalar::Unsigned(unsigned))
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn to_base58_string(&self) -> String {
        bs58::encode(&self.data).into_string()
    }
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self::from_bytes(data)
    }
}

impl From<&[u8]> for ByteBuffer {
    fn from(data: &[u8]) -> Self {
        Self::from_bytes(data)
    }
}

impl From<ByteBuffer> for Vec<u8> {
    fn from(buf: ByteBuffer) -> Self {
        buf.data
    }
}
