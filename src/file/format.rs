use num_enum::{IntoPrimitive, TryFromPrimitive};

#[doc = r#"
The format word of the header chunk.

Format 0 holds a single multi-channel track, format 1 holds tracks that
play simultaneously, format 2 holds independent single-track patterns.
The compiler writes one track per channel, so it defaults to format 1.
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum FormatType {
    /// Format 0
    SingleMultiChannel = 0,
    /// Format 1
    #[default]
    Simultaneous = 1,
    /// Format 2
    SequentiallyIndependent = 2,
}

impl FormatType {
    /// The big-endian header bytes
    pub fn to_bytes(self) -> [u8; 2] {
        u16::from(self).to_be_bytes()
    }
}

#[test]
fn format_words() {
    assert_eq!(FormatType::default().to_bytes(), [0, 1]);
    assert_eq!(FormatType::try_from(2u16), Ok(FormatType::SequentiallyIndependent));
    assert!(FormatType::try_from(3u16).is_err());
}
