//! Varint codec for length prefixes and packet ids.
//!
//! Base-128 encoding, least-significant group first, high bit of each byte
//! as the continuation flag. A 32-bit value occupies between 1 and 5 bytes;
//! a fifth byte with the continuation bit set is a protocol violation.

use crate::error::{ProtocolError, Result};

/// Maximum encoded size of a 32-bit varint.
pub const MAX_VARINT_LEN: usize = 5;

/// Outcome of a non-consuming header inspection, used by the framer to
/// decide whether more bytes are needed before a length prefix is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verify {
    /// A complete varint of `n` bytes starts at the head of the buffer.
    Valid(usize),
    /// Every available byte has the continuation bit set and fewer than
    /// five bytes are buffered; read more and retry.
    Overrun,
    /// Five bytes buffered and the fifth still has the continuation bit.
    Invalid,
}

/// Append `value` to `out` as a varint (1..=5 bytes).
pub fn encode(out: &mut Vec<u8>, mut value: u32) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Number of bytes `encode` would write for `value`.
pub fn sizeof(value: u32) -> usize {
    match value {
        0..=0x7f => 1,
        0x80..=0x3fff => 2,
        0x4000..=0x1f_ffff => 3,
        0x20_0000..=0xfff_ffff => 4,
        _ => 5,
    }
}

/// Inspect the head of `buf` without consuming it.
pub fn verify(buf: &[u8]) -> Verify {
    for (i, byte) in buf.iter().take(MAX_VARINT_LEN).enumerate() {
        if byte & 0x80 == 0 {
            return Verify::Valid(i + 1);
        }
    }
    if buf.len() >= MAX_VARINT_LEN {
        Verify::Invalid
    } else {
        Verify::Overrun
    }
}

/// Decode a varint from the head of `buf`, returning the value and the
/// number of bytes consumed.
///
/// # Errors
/// [`ProtocolError::TruncatedVarint`] if the buffer ends before a
/// terminating byte; [`ProtocolError::MalformedVarint`] if the fifth byte
/// still has the continuation bit set.
pub fn decode(buf: &[u8]) -> Result<(u32, usize)> {
    let mut value: u32 = 0;
    for (i, byte) in buf.iter().take(MAX_VARINT_LEN).enumerate() {
        value |= u32::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    if buf.len() >= MAX_VARINT_LEN {
        Err(ProtocolError::MalformedVarint)
    } else {
        Err(ProtocolError::TruncatedVarint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_lengths() {
        let cases: &[(u32, usize)] = &[
            (0, 1),
            (127, 1),
            (128, 2),
            (16_383, 2),
            (16_384, 3),
            (2_097_151, 3),
            (2_097_152, 4),
            (268_435_455, 4),
            (268_435_456, 5),
            (u32::MAX, 5),
        ];
        for &(value, expected) in cases {
            let mut out = Vec::new();
            encode(&mut out, value);
            assert_eq!(out.len(), expected, "encoded length of {value}");
            assert_eq!(sizeof(value), expected, "sizeof of {value}");
            let (decoded, used) = decode(&out).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(used, expected);
        }
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let mut out = Vec::new();
        encode(&mut out, 300);
        out.extend_from_slice(&[0xde, 0xad]);
        let (value, used) = decode(&out).unwrap();
        assert_eq!(value, 300);
        assert_eq!(used, 2);
    }

    #[test]
    fn truncated_input() {
        // Two continuation bytes, then nothing.
        assert!(matches!(
            decode(&[0x80, 0x80]),
            Err(ProtocolError::TruncatedVarint)
        ));
        assert_eq!(verify(&[0x80, 0x80]), Verify::Overrun);
    }

    #[test]
    fn malformed_five_continuations() {
        let bad = [0xff, 0xff, 0xff, 0xff, 0xff];
        assert!(matches!(decode(&bad), Err(ProtocolError::MalformedVarint)));
        assert_eq!(verify(&bad), Verify::Invalid);
    }

    #[test]
    fn verify_valid_prefix() {
        let mut out = Vec::new();
        encode(&mut out, 16_384);
        assert_eq!(verify(&out), Verify::Valid(3));
        // The prefix alone is still incomplete.
        assert_eq!(verify(&out[..2]), Verify::Overrun);
    }

    #[test]
    fn empty_buffer_is_overrun() {
        assert_eq!(verify(&[]), Verify::Overrun);
        assert!(matches!(decode(&[]), Err(ProtocolError::TruncatedVarint)));
    }
}
