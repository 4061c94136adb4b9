//! Append-only typed writer.

use crate::buffer::ByteBuffer;
use crate::error::SolError;
use crate::pubkey::Pubkey;
use crate::short_vec;

/// Typed little-endian writer backing the schema codec and message encoder.
#[derive(Debug, Clone, Default)]
pub struct BinaryWriter {
    buf: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i8(&mut self, v: i8) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    /// u32 LE length followed by the UTF-8 bytes.
    pub fn write_string(&mut self, s: &str) -> Result<(), SolError> {
        self.write_u32(u32_len(s.len())?);
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    /// Raw bytes, no length prefix.
    pub fn write_fixed_array(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_pubkey(&mut self, key: &Pubkey) {
        self.buf.extend_from_slice(key.as_ref());
    }

    /// Decode base-58 text and write the 32 key bytes.
    pub fn write_pubkey_as_string(&mut self, text: &str) -> Result<(), SolError> {
        let key: Pubkey = text.parse()?;
        self.write_pubkey(&key);
        Ok(())
    }

    pub fn write_compact_length(&mut self, len: usize) {
        short_vec::encode_length_into(&mut self.buf, len);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn into_buffer(self) -> ByteBuffer {
        ByteBuffer::from_bytes(self.buf)
    }
}

pub(crate) fn u32_len(len: usize) -> Result<u32, SolError> {
    u32::try_from(len)
        .map_err(|_| SolError::MalformedInput(format!("length {len} exceeds u32 prefix")))
}
