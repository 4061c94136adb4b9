//! Cursor over a borrowed byte slice.

use crate::error::SolError;
use crate::pubkey::{Pubkey, PUBKEY_BYTES};
use crate::short_vec;

/// Forward-only typed reader. Every successful read advances the cursor by
/// exactly the number of bytes consumed; a read that would run past the end
/// fails and leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread tail of the input.
    pub fn rest(&self) -> &'a [u8] {
        &self.bytes[self.offset..]
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], SolError> {
        if len > self.remaining() {
            return Err(SolError::UnexpectedEof {
                offset: self.offset,
                needed: len,
                remaining: self.remaining(),
            });
        }
        let out = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], SolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, SolError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, SolError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, SolError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, SolError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_i8(&mut self) -> Result<i8, SolError> {
        Ok(i8::from_le_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, SolError> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, SolError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, SolError> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, SolError> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, SolError> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// A single byte that must be 0 or 1.
    pub fn read_bool(&mut self) -> Result<bool, SolError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SolError::MalformedInput(format!(
                "invalid bool byte {other:#04x} at offset {}",
                self.offset - 1
            ))),
        }
    }

    /// u32 LE length followed by that many UTF-8 bytes.
    pub fn read_string(&mut self) -> Result<String, SolError> {
        let start = self.offset;
        let len = self.read_u32()? as usize;
        let raw = match self.read_bytes(len) {
            Ok(raw) => raw,
            Err(e) => {
                self.offset = start;
                return Err(e);
            }
        };
        String::from_utf8(raw.to_vec())
            .map_err(|e| SolError::MalformedInput(format!("string is not valid utf-8: {e}")))
    }

    pub fn read_fixed_array(&mut self, len: usize) -> Result<Vec<u8>, SolError> {
        Ok(self.read_bytes(len)?.to_vec())
    }

    pub fn read_pubkey(&mut self) -> Result<Pubkey, SolError> {
        Ok(Pubkey::new_from_array(self.read_array::<PUBKEY_BYTES>()?))
    }

    pub fn read_pubkey_as_string(&mut self) -> Result<String, SolError> {
        Ok(self.read_pubkey()?.to_base58())
    }

    /// Compact (short vec) length prefix.
    pub fn read_compact_length(&mut self) -> Result<usize, SolError> {
        let (len, consumed) = short_vec::decode_length(self.rest())?;
        self.offset += consumed;
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_integers() {
        let mut bytes = Vec::new();
        bytes.push(0xff);
        bytes.extend_from_slice(&20u64.to_le_bytes());
        bytes.extend_from_slice(&(-121i32).to_le_bytes());
        bytes.extend_from_slice(&(-20i8).to_le_bytes());
        bytes.extend_from_slice(&0xbeefu16.to_le_bytes());

        let mut r = BinaryReader::new(&bytes);
        assert_eq!(r.read_u8().unwrap(), 255);
        assert_eq!(r.read_u64().unwrap(), 20);
        assert_eq!(r.read_i32().unwrap(), -121);
        assert_eq!(r.read_i8().unwrap(), -20);
        assert_eq!(r.read_u16().unwrap(), 0xbeef);
        assert!(r.is_empty());
    }

    #[test]
    fn reads_floats() {
        let mut bytes = 12.987f64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&0.25f32.to_le_bytes());
        let mut r = BinaryReader::new(&bytes);
        assert_eq!(r.read_f64().unwrap(), 12.987);
        assert_eq!(r.read_f32().unwrap(), 0.25);
    }

    #[test]
    fn short_read_fails_without_advancing() {
        let bytes = [1u8, 2, 3];
        let mut r = BinaryReader::new(&bytes);
        assert_eq!(r.read_u8().unwrap(), 1);
        let err = r.read_u32().unwrap_err();
        assert!(matches!(
            err,
            SolError::UnexpectedEof {
                offset: 1,
                needed: 4,
                remaining: 2
            }
        ));
        assert_eq!(r.offset(), 1);
        assert_eq!(r.read_u16().unwrap(), 0x0302);
    }

    #[test]
    fn reads_length_prefixed_string() {
        let bytes = [5u8, 0, 0, 0, b'h', b'e', b'l', b'l', b'o'];
        let mut r = BinaryReader::new(&bytes);
        assert_eq!(r.read_string().unwrap(), "hello");
    }

    #[test]
    fn truncated_string_restores_cursor() {
        let bytes = [9u8, 0, 0, 0, b'h', b'i'];
        let mut r = BinaryReader::new(&bytes);
        assert!(r.read_string().is_err());
        assert_eq!(r.offset(), 0);
    }

    #[test]
    fn invalid_bool_byte_fails() {
        let mut r = BinaryReader::new(&[2u8]);
        assert!(r.read_bool().is_err());
    }

    #[test]
    fn reads_pubkey_as_base58() {
        let bytes = [0u8; 32];
        let mut r = BinaryReader::new(&bytes);
        assert_eq!(
            r.read_pubkey_as_string().unwrap(),
            "11111111111111111111111111111111"
        );
    }

    #[test]
    fn independent_readers_over_same_bytes() {
        let bytes = [1u8, 2, 3, 4];
        let mut a = BinaryReader::new(&bytes);
        let mut b = BinaryReader::new(&bytes);
        assert_eq!(a.read_u16().unwrap(), 0x0201);
        assert_eq!(b.read_u8().unwrap(), 1);
        assert_eq!(a.read_u8().unwrap(), 3);
        assert_eq!(b.read_u8().unwrap(), 2);
    }

    #[test]
    fn reads_compact_length() {
        let bytes = [0x80u8, 0x01, 0xaa];
        let mut r = BinaryReader::new(&bytes);
        assert_eq!(r.read_compact_length().unwrap(), 128);
        assert_eq!(r.offset(), 2);
    }
}
