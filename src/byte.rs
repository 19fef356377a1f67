use core::fmt;

use crate::codec::CodecErrorKind;

/// A byte whose leading bit is zero (0..=127).
///
/// Every data byte of a channel event is one of these.
#[derive(Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Debug, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataByte(pub(crate) u8);

impl DataByte {
    /// Checks for correctness (leading 0 bit).
    pub const fn new(byte: u8) -> Result<Self, CodecErrorKind> {
        if byte > 127 {
            return Err(CodecErrorKind::InvalidDataByte(byte));
        }
        Ok(Self(byte))
    }

    /// Masks off the leading bit.
    pub const fn new_unchecked(byte: u8) -> Self {
        Self(byte & 0x7F)
    }

    /// Clamps the value to 127.
    pub const fn saturating(byte: u8) -> Self {
        if byte > 127 { Self(127) } else { Self(byte) }
    }

    /// The underlying byte
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for DataByte {
    type Error = CodecErrorKind;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DataByte> for u8 {
    fn from(value: DataByte) -> Self {
        value.0
    }
}

impl fmt::Display for DataByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[test]
fn data_byte_bounds() {
    assert_eq!(DataByte::new(127).unwrap().value(), 127);
    assert_eq!(
        DataByte::new(128).unwrap_err(),
        CodecErrorKind::InvalidDataByte(128)
    );
    assert_eq!(DataByte::new_unchecked(0xC5).value(), 0x45);
    assert_eq!(DataByte::saturating(200).value(), 127);
}
