use crate::codec::ChunkError;

/// The frame rates an SMPTE division may name.
///
/// `TwentyNine` is 29.97 fps drop-frame timecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SmpteFps {
    /// 24 frames per second
    TwentyFour,
    /// 25 frames per second
    TwentyFive,
    /// 29.97 frames per second
    TwentyNine,
    /// 30 frames per second
    Thirty,
}

impl SmpteFps {
    /// The negative frame rate stored in the high byte of the division
    pub const fn as_division_byte(&self) -> i8 {
        match self {
            Self::TwentyFour => -24,
            Self::TwentyFive => -25,
            Self::TwentyNine => -29,
            Self::Thirty => -30,
        }
    }

    const fn from_division_byte(byte: i8) -> Option<Self> {
        match byte {
            -24 => Some(Self::TwentyFour),
            -25 => Some(Self::TwentyFive),
            -29 => Some(Self::TwentyNine),
            -30 => Some(Self::Thirty),
            _ => None,
        }
    }
}

#[doc = r#"
The division word of the header chunk.

Either the number of ticks per quarter note, or an SMPTE frame rate and
a number of ticks per frame. Only the first drives the compiler's
duration arithmetic; SMPTE divisions are decoded so that foreign files
can be read.

# Example
```rust
# use mml2midi::prelude::*;
let timing = Timing::new_ticks_per_quarter_note(480);
assert_eq!(timing.to_bytes(), [0x01, 0xE0]);
assert_eq!(timing.ticks_per_quarter_note(), Some(480));
assert_eq!(Timing::default(), timing);
```
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Timing {
    /// Delta times count fractions of a quarter note
    TicksPerQuarterNote(u16),
    /// Delta times count fractions of an SMPTE frame
    Smpte {
        /// Frames per second
        fps: SmpteFps,
        /// Subdivisions of a frame
        ticks_per_frame: u8,
    },
}

impl Timing {
    /// The resolution used when nothing else is asked for
    pub const DEFAULT_TICKS_PER_QUARTER_NOTE: u16 = 480;

    /// The tickrate per quarter note defines what a "quarter note" means.
    ///
    /// The leading bit of the u16 is disregarded, so 1-32767
    pub const fn new_ticks_per_quarter_note(tpqn: u16) -> Self {
        Self::TicksPerQuarterNote(tpqn & 0x7FFF)
    }

    /// Define the timing in terms of fps and ticks per frame
    pub const fn new_smpte(fps: SmpteFps, ticks_per_frame: u8) -> Self {
        Self::Smpte {
            fps,
            ticks_per_frame,
        }
    }

    /// Returns Some if the midi timing is defined
    /// as ticks per quarter note
    pub const fn ticks_per_quarter_note(&self) -> Option<u16> {
        match self {
            Self::TicksPerQuarterNote(t) => Some(*t),
            Self::Smpte { .. } => None,
        }
    }

    /// The two header bytes
    pub const fn to_bytes(&self) -> [u8; 2] {
        match self {
            Self::TicksPerQuarterNote(t) => t.to_be_bytes(),
            Self::Smpte {
                fps,
                ticks_per_frame,
            } => [fps.as_division_byte() as u8, *ticks_per_frame],
        }
    }

    /// Decode the two header bytes.
    pub const fn from_bytes(bytes: [u8; 2]) -> Result<Self, ChunkError> {
        if bytes[0] & 0x80 == 0 {
            return Ok(Self::TicksPerQuarterNote(u16::from_be_bytes(bytes)));
        }
        match SmpteFps::from_division_byte(bytes[0] as i8) {
            Some(fps) => Ok(Self::new_smpte(fps, bytes[1])),
            None => Err(ChunkError::SmpteFrameRate(bytes[0] as i8)),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::new_ticks_per_quarter_note(Self::DEFAULT_TICKS_PER_QUARTER_NOTE)
    }
}

#[test]
fn smpte_division() {
    let timing = Timing::new_smpte(SmpteFps::TwentyFive, 40);
    assert_eq!(timing.to_bytes(), [0xE7, 40]);
    assert_eq!(Timing::from_bytes([0xE7, 40]), Ok(timing));
    assert_eq!(timing.ticks_per_quarter_note(), None);
}

#[test]
fn invalid_smpte_rate() {
    assert_eq!(
        Timing::from_bytes([0xE0, 4]),
        Err(ChunkError::SmpteFrameRate(-32))
    );
}

#[test]
fn leading_bit_is_masked() {
    assert_eq!(
        Timing::new_ticks_per_quarter_note(0x8000 | 96),
        Timing::TicksPerQuarterNote(96)
    );
}
