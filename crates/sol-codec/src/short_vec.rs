//! Compact length encoding ("short vec").
//!
//! Every variable-length list in the message wire format is prefixed with
//! its length as a little-endian base-128 varint: the low 7 bits of each
//! byte carry data, the high bit says another byte follows.
//!
//! ```text
//!   0x0000_007f -> 7f
//!   0x0000_0080 -> 80 01
//!   0x0000_7fff -> ff ff 01
//!   0x0020_0000 -> 80 80 80 01
//! ```
//!
//! No upper bound is imposed by the format. Realistic account and
//! instruction counts stay below 2^24.

use crate::error::SolError;

/// Encode `len` as a compact length prefix.
pub fn encode_length(len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(3);
    encode_length_into(&mut out, len);
    out
}

/// Append the compact encoding of `len` to `out`.
pub fn encode_length_into(out: &mut Vec<u8>, len: usize) {
    let mut rem = len;

    loop {
        let mut elem = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(elem);
            break;
        }
        elem |= 0x80;
        out.push(elem);
    }
}

/// Decode a compact length prefix from the start of `bytes`.
///
/// Returns `(value, bytes_consumed)`. Fails if the input ends before a byte
/// with the high bit clear, or if the value does not fit in a `usize`.
pub fn decode_length(bytes: &[u8]) -> Result<(usize, usize), SolError> {
    let mut len: usize = 0;
    let mut size: usize = 0;

    loop {
        let elem = *bytes.get(size).ok_or_else(|| {
            SolError::MalformedInput(format!(
                "compact length truncated after {size} bytes"
            ))
        })?;

        let shift = (size * 7) as u32;
        let group = (elem & 0x7f) as usize;
        if shift >= usize::BITS || (group << shift) >> shift != group {
            return Err(SolError::MalformedInput(
                "compact length does not fit in usize".into(),
            ));
        }
        len |= group << shift;
        size += 1;

        if elem & 0x80 == 0 {
            return Ok((len, size));
        }
    }
}
