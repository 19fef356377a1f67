use super::{FormatType, Timing};
use crate::codec::ChunkError;

#[doc = r#"
The contents of the `MThd` chunk.

```text
MThd <length:u32 = 6> <format:u16> <ntrks:u16> <division:u16>
```
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MidiFileHeader {
    format: FormatType,
    num_tracks: u16,
    timing: Timing,
}

impl MidiFileHeader {
    /// The fixed length of the header chunk data
    pub const LEN: u32 = 6;

    /// Create a new header
    pub const fn new(format: FormatType, num_tracks: u16, timing: Timing) -> Self {
        Self {
            format,
            num_tracks,
            timing,
        }
    }

    /// The file format
    pub const fn format(&self) -> FormatType {
        self.format
    }

    /// The track count the header declares
    pub const fn num_tracks(&self) -> u16 {
        self.num_tracks
    }

    /// Get the timing props
    pub const fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Decode the six data bytes of an `MThd` chunk.
    pub fn from_data(data: &[u8]) -> Result<Self, ChunkError> {
        let bytes: [u8; 6] = data
            .try_into()
            .map_err(|_| ChunkError::HeaderLength(data.len() as u32))?;
        let format = u16::from_be_bytes([bytes[0], bytes[1]]);
        let format =
            FormatType::try_from(format).map_err(|_| ChunkError::UnknownFormat(format))?;
        Ok(Self {
            format,
            num_tracks: u16::from_be_bytes([bytes[2], bytes[3]]),
            timing: Timing::from_bytes([bytes[4], bytes[5]])?,
        })
    }

    /// The six data bytes of the chunk
    pub fn to_data(&self) -> [u8; 6] {
        let [f0, f1] = self.format.to_bytes();
        let [n0, n1] = self.num_tracks.to_be_bytes();
        let [t0, t1] = self.timing.to_bytes();
        [f0, f1, n0, n1, t0, t1]
    }
}

#[test]
fn header_data() {
    let header = MidiFileHeader::new(FormatType::Simultaneous, 3, Timing::default());
    assert_eq!(header.to_data(), [0, 1, 0, 3, 0x01, 0xE0]);
    assert_eq!(MidiFileHeader::from_data(&header.to_data()), Ok(header));
}

#[test]
fn malformed_header_data() {
    assert_eq!(
        MidiFileHeader::from_data(&[0, 1, 0, 1]),
        Err(ChunkError::HeaderLength(4))
    );
    assert_eq!(
        MidiFileHeader::from_data(&[0, 7, 0, 1, 0, 96]),
        Err(ChunkError::UnknownFormat(7))
    );
}
