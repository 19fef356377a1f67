use core::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::DataByte;
use crate::codec::CodecErrorKind;

#[doc = r#"
Identifies a key for some message.

Keys are interpeted as a 7-bit number. [`Note`] `0` is `C(-1)`,
[`Note`] `60` is middle C (`C4`) and [`Note`] `127` is `G9`.

# Example
```rust
# use mml2midi::prelude::*;
let note = Note::from_key(Key::C, 0, 4);
assert_eq!(note.byte(), 60);

// sharpened B in octave 9 does not exist, the value is clamped
let note = Note::from_key(Key::B, 1, 9);
assert_eq!(note.byte(), 127);
```
"#]
#[derive(Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Note(DataByte);

impl Note {
    /// Create a new note.
    ///
    /// Checks for correctness (leading 0 bit).
    pub fn from_databyte<B>(rep: B) -> Result<Self, CodecErrorKind>
    where
        B: TryInto<DataByte, Error = CodecErrorKind>,
    {
        rep.try_into().map(Self)
    }

    /// Create a note from a data byte
    pub const fn new(byte: DataByte) -> Self {
        Self(byte)
    }

    /// Creates a new note without checking for the validity of the byte
    pub const fn from_databyte_unchecked(byte: u8) -> Self {
        Self(DataByte::new_unchecked(byte))
    }

    /// Resolve a key, an accidental in semitones and an octave number into
    /// a note.
    ///
    /// The result is `(octave + 1) * 12 + key + accidental`, clamped
    /// into `0..=127`.
    pub const fn from_key(key: Key, accidental: i8, octave: i32) -> Self {
        let value = (octave as i64 + 1) * 12 + key.semitone() as i64 + accidental as i64;
        let clamped = if value < 0 {
            0
        } else if value > 127 {
            127
        } else {
            value
        };
        Self(DataByte(clamped as u8))
    }

    /// The octave of the note, from `-1` to `9`
    pub const fn octave(&self) -> i8 {
        (self.0.0 / 12) as i8 - 1
    }

    /// The pitch class of the note, 0 (C) to 11 (B)
    pub const fn pitch_class(&self) -> u8 {
        self.0.0 % 12
    }

    /// Returns the underlying byte of the note
    pub const fn byte(&self) -> u8 {
        self.0.0
    }

    /// Returns the note as a data byte
    pub const fn data_byte(&self) -> DataByte {
        self.0
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];
        write!(f, "{}{}", NAMES[self.pitch_class() as usize], self.octave())
    }
}

#[doc = r#"
The seven note letters of the macro language.

The discriminant is the ASCII letter used in source text.

# Example
```rust
# use mml2midi::prelude::*;
let key = Key::try_from(b'e').unwrap();
assert_eq!(key, Key::E);
assert_eq!(key.semitone(), 4);
```
"#]
#[allow(missing_docs)]
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Key {
    C = b'c',
    D = b'd',
    E = b'e',
    F = b'f',
    G = b'g',
    A = b'a',
    B = b'b',
}

impl Key {
    /// Returns an array beginning with [`Key::C`] to [`Key::B`]
    pub const fn all() -> [Key; 7] {
        use Key::*;
        [C, D, E, F, G, A, B]
    }

    /// Semitones above C within the octave.
    pub const fn semitone(&self) -> u8 {
        use Key::*;
        match self {
            C => 0,
            D => 2,
            E => 4,
            F => 5,
            G => 7,
            A => 9,
            B => 11,
        }
    }

    /// The source letter
    pub const fn letter(&self) -> char {
        *self as u8 as char
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter().to_ascii_uppercase())
    }
}

#[test]
fn middle_c() {
    let c = Note::from_key(Key::C, 0, 4);
    assert_eq!(c.byte(), 60);
    assert_eq!(c.octave(), 4);
    assert_eq!(c.to_string(), "C4");
}

#[test]
fn accidentals_cross_octaves() {
    assert_eq!(Note::from_key(Key::C, -1, 4).byte(), 59);
    assert_eq!(Note::from_key(Key::B, 1, 3).byte(), 60);
    assert_eq!(Note::from_key(Key::F, 1, 4).to_string(), "F#4");
}

#[test]
fn clamps_out_of_range() {
    assert_eq!(Note::from_key(Key::C, -1, -1).byte(), 0);
    assert_eq!(Note::from_key(Key::C, 0, -7).byte(), 0);
    assert_eq!(Note::from_key(Key::G, 1, 9).byte(), 127);
    assert_eq!(Note::from_key(Key::A, 0, 200).byte(), 127);
}

#[test]
fn note_from_key_octave_pairs() {
    for byte in 0..128u8 {
        let note = Note::from_databyte(byte).unwrap();
        let natural = Key::all()
            .into_iter()
            .find(|k| k.semitone() == note.pitch_class());
        let rebuilt = match natural {
            Some(key) => Note::from_key(key, 0, note.octave() as i32),
            None => {
                let below = Key::all()
                    .into_iter()
                    .find(|k| k.semitone() + 1 == note.pitch_class())
                    .unwrap();
                Note::from_key(below, 1, note.octave() as i32)
            }
        };
        assert_eq!(rebuilt, note);
    }
}

#[test]
fn keys_from_letters() {
    for key in Key::all() {
        assert_eq!(Key::try_from(u8::from(key)).unwrap(), key);
    }
    assert!(Key::try_from(b'r').is_err());
    assert!(Key::try_from(b'C').is_err());
}
