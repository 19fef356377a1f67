#![doc = r#"
Variable-length quantities

MIDI files store delta-times and chunk-internal lengths as big-endian
groups of 7 bits. Every byte except the last has its leading bit set.

```text
         0 -> 00
       127 -> 7F
       128 -> 81 00
    0x3FFF -> FF 7F
0x0FFFFFFF -> FF FF FF 7F
```

The Standard MIDI File specification caps quantities at four bytes
(`0x0FFF_FFFF`). Larger `u32` values still encode, using a fifth byte.
"#]

use super::{CodecError, CodecErrorKind, CodecResult};

/// The largest quantity a Standard MIDI File may contain.
pub const MAX_SMF_VALUE: u32 = 0x0FFF_FFFF;

/// No quantity is longer than this.
pub const MAX_LEN: usize = 5;

/// Returns the number of bytes [`encode`] would emit for `value`.
pub const fn encoded_len(value: u32) -> usize {
    match value {
        0..0x80 => 1,
        0x80..0x4000 => 2,
        0x4000..0x20_0000 => 3,
        0x20_0000..0x1000_0000 => 4,
        _ => 5,
    }
}

/// Appends the encoded `value` to `out`, returning the number of bytes written.
pub fn encode(value: u32, out: &mut Vec<u8>) -> usize {
    let len = encoded_len(value);
    for group in (1..len).rev() {
        out.push(((value >> (7 * group)) & 0x7F) as u8 | 0x80);
    }
    out.push((value & 0x7F) as u8);
    len
}

/// Decodes a quantity from the front of `bytes`.
///
/// Returns the value and how many bytes it occupied.
pub fn decode(bytes: &[u8]) -> CodecResult<(u32, usize)> {
    let mut value: u32 = 0;
    for (i, &byte) in bytes.iter().take(MAX_LEN).enumerate() {
        if value > (u32::MAX >> 7) {
            return Err(CodecError::new(i, CodecErrorKind::VlqOverflow));
        }
        value = (value << 7) | (byte & 0x7F) as u32;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    if bytes.len() < MAX_LEN {
        Err(CodecError::new(bytes.len(), CodecErrorKind::TruncatedVlq))
    } else {
        Err(CodecError::new(MAX_LEN, CodecErrorKind::UnterminatedVlq))
    }
}

#[cfg(test)]
fn encoded(value: u32) -> Vec<u8> {
    let mut out = Vec::new();
    encode(value, &mut out);
    out
}

#[test]
fn encode_known_values() {
    use pretty_assertions::assert_eq;
    assert_eq!(encoded(0), [0x00]);
    assert_eq!(encoded(0x40), [0x40]);
    assert_eq!(encoded(0x7F), [0x7F]);
    assert_eq!(encoded(0x80), [0x81, 0x00]);
    assert_eq!(encoded(0x2000), [0xC0, 0x00]);
    assert_eq!(encoded(0x3FFF), [0xFF, 0x7F]);
    assert_eq!(encoded(0x4000), [0x81, 0x80, 0x00]);
    assert_eq!(encoded(0x10_0000), [0xC0, 0x80, 0x00]);
    assert_eq!(encoded(0x1F_FFFF), [0xFF, 0xFF, 0x7F]);
    assert_eq!(encoded(0x20_0000), [0x81, 0x80, 0x80, 0x00]);
    assert_eq!(encoded(MAX_SMF_VALUE), [0xFF, 0xFF, 0xFF, 0x7F]);
}

#[test]
fn encode_past_smf_range_uses_five_bytes() {
    let bytes = encoded(u32::MAX);
    assert_eq!(bytes, [0x8F, 0xFF, 0xFF, 0xFF, 0x7F]);
    assert_eq!(decode(&bytes).unwrap(), (u32::MAX, 5));
}

#[test]
fn round_trip_boundaries() {
    let values = [
        0,
        1,
        0x7F,
        0x80,
        0x3FFF,
        0x4000,
        0x1F_FFFF,
        0x20_0000,
        0x0ABC_DEF0,
        MAX_SMF_VALUE,
    ];
    for value in values {
        let bytes = encoded(value);
        assert!(bytes.len() <= MAX_LEN);
        assert_eq!(bytes.len(), encoded_len(value));
        assert_eq!(decode(&bytes).unwrap(), (value, bytes.len()));
    }
}

#[test]
fn decode_ignores_trailing_bytes() {
    assert_eq!(decode(&[0x81, 0x00, 0x90, 0x3C]).unwrap(), (0x80, 2));
}

#[test]
fn decode_errors() {
    let err = decode(&[]).unwrap_err();
    assert_eq!(err.error_kind(), &CodecErrorKind::TruncatedVlq);

    let err = decode(&[0x81, 0x80]).unwrap_err();
    assert_eq!(err.error_kind(), &CodecErrorKind::TruncatedVlq);
    assert_eq!(err.position(), 2);

    let err = decode(&[0x81, 0x80, 0x80, 0x80, 0x80, 0x00]).unwrap_err();
    assert_eq!(err.error_kind(), &CodecErrorKind::UnterminatedVlq);

    let err = decode(&[0xFF, 0xFF, 0xFF, 0xFF, 0x7F]).unwrap_err();
    assert_eq!(err.error_kind(), &CodecErrorKind::VlqOverflow);
}
