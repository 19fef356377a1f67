use core::fmt;

/// Tempo expressed in microseconds per quarter note.
///
/// This is the unit of the Set Tempo meta event (`FF 51 03 tt tt tt`),
/// so values are limited to 24 bits.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tempo(u32);

impl Tempo {
    /// 120 beats per minute.
    pub const DEFAULT: Self = Self(500_000);

    /// The largest tempo value a meta event can carry.
    pub const MAX_MICROS: u32 = 0x00FF_FFFF;

    /// Creates a tempo from microseconds per quarter note.
    ///
    /// Values wider than 24 bits are clamped.
    pub const fn new(micros_per_quarter_note: u32) -> Self {
        if micros_per_quarter_note > Self::MAX_MICROS {
            Self(Self::MAX_MICROS)
        } else {
            Self(micros_per_quarter_note)
        }
    }

    /// Creates a tempo from beats per minute.
    ///
    /// Returns `None` for a zero bpm.
    pub const fn from_bpm(bpm: u32) -> Option<Self> {
        if bpm == 0 {
            return None;
        }
        Some(Self::new(60_000_000 / bpm))
    }

    /// True if [`Tempo::from_bpm`] has to clamp this bpm.
    pub const fn bpm_is_clamped(bpm: u32) -> bool {
        bpm != 0 && 60_000_000 / bpm > Self::MAX_MICROS
    }

    /// Parse the three big-endian bytes of a tempo meta event.
    pub const fn from_bytes(bytes: [u8; 3]) -> Self {
        Self(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
    }

    /// The microseconds per quarter note
    pub const fn micros_per_quarter_note(&self) -> u32 {
        self.0
    }

    /// The tempo in beats per minute (rounded down), 0 for a zero tempo
    pub const fn bpm(&self) -> u32 {
        match 60_000_000u32.checked_div(self.0) {
            Some(bpm) => bpm,
            None => 0,
        }
    }

    /// The three bytes of the tempo meta event payload.
    pub const fn to_bytes(&self) -> [u8; 3] {
        let [_, a, b, c] = self.0.to_be_bytes();
        [a, b, c]
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us/qn", self.0)
    }
}

#[test]
fn bpm_conversion() {
    assert_eq!(Tempo::from_bpm(120), Some(Tempo::DEFAULT));
    assert_eq!(Tempo::from_bpm(60).unwrap().micros_per_quarter_note(), 1_000_000);
    assert_eq!(Tempo::from_bpm(0), None);
    assert_eq!(Tempo::DEFAULT.bpm(), 120);
}

#[test]
fn clamps_to_24_bits() {
    assert!(Tempo::bpm_is_clamped(1));
    assert!(!Tempo::bpm_is_clamped(4));
    assert_eq!(
        Tempo::from_bpm(1).unwrap().micros_per_quarter_note(),
        Tempo::MAX_MICROS
    );
}

#[test]
fn meta_bytes() {
    assert_eq!(Tempo::DEFAULT.to_bytes(), [0x07, 0xA1, 0x20]);
    assert_eq!(Tempo::from_bytes([0x07, 0xA1, 0x20]), Tempo::DEFAULT);
}
