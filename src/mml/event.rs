use core::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::note::Key;

/// The pitch of a [`NoteEvent`]: a note letter or a rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Pitch {
    /// One of `a`-`g`
    Key(Key),
    /// `r`
    Rest,
}

impl Pitch {
    /// Pitch from a source letter
    pub fn from_letter(letter: u8) -> Option<Self> {
        match letter {
            b'r' => Some(Self::Rest),
            other => Key::try_from(other).ok().map(Self::Key),
        }
    }

    /// True for `r`
    pub const fn is_rest(&self) -> bool {
        matches!(self, Self::Rest)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{}", key.letter()),
            Self::Rest => f.write_str("r"),
        }
    }
}

#[doc = r#"
A note or rest.

`chord` and `tie` are not reachable from the text syntax; they exist
so that a producer of events can build chords and held notes that the
translator then honours.

# Example
```rust
# use mml2midi::prelude::*;
let note = NoteEvent::new(Pitch::Key(Key::C)).with_length(8).with_dots(1);
assert_eq!(note.to_string(), "c8.");
```
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NoteEvent {
    /// Note letter or rest
    pub pitch: Pitch,
    /// `-1` flat, `0` natural, `+1` sharp
    pub accidental: i8,
    /// Length denominator, `0` for the track's default length
    pub length: u32,
    /// Number of augmentation dots
    pub dots: u32,
    /// Sounds together with the next note, sharing its duration
    pub chord: bool,
    /// Keeps sounding after its duration ends
    pub tie: bool,
}

impl NoteEvent {
    /// A natural note of default length
    pub const fn new(pitch: Pitch) -> Self {
        Self {
            pitch,
            accidental: 0,
            length: 0,
            dots: 0,
            chord: false,
            tie: false,
        }
    }

    /// Set the accidental
    pub const fn with_accidental(mut self, accidental: i8) -> Self {
        self.accidental = accidental;
        self
    }

    /// Set the length denominator
    pub const fn with_length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }

    /// Set the number of dots
    pub const fn with_dots(mut self, dots: u32) -> Self {
        self.dots = dots;
        self
    }

    /// Link to the next note as a chord
    pub const fn with_chord(mut self, chord: bool) -> Self {
        self.chord = chord;
        self
    }

    /// Hold past the end of the duration
    pub const fn with_tie(mut self, tie: bool) -> Self {
        self.tie = tie;
        self
    }
}

impl fmt::Display for NoteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pitch)?;
        match self.accidental {
            1 => f.write_str("+")?,
            -1 => f.write_str("-")?,
            _ => {}
        }
        if self.length != 0 {
            write!(f, "{}", self.length)?;
        }
        for _ in 0..self.dots {
            f.write_str(".")?;
        }
        Ok(())
    }
}

/// The command letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Command {
    /// `o`: set the octave
    Octave = b'o',
    /// `<`: one octave down
    OctaveDown = b'<',
    /// `>`: one octave up
    OctaveUp = b'>',
    /// `l`: set the default length
    Length = b'l',
    /// `v`: set the velocity
    Velocity = b'v',
    /// `t`: set the tempo in beats per minute
    Tempo = b't',
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self) as char)
    }
}

/// A command and its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Control {
    /// The command
    pub command: Command,
    /// The numeric argument, `0` when omitted
    pub value: u32,
}

impl Control {
    /// A new control event
    pub const fn new(command: Command, value: u32) -> Self {
        Self { command, value }
    }
}

/// An element of the intermediate representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Event {
    /// A note or rest
    Note(NoteEvent),
    /// A state change
    Control(Control),
    /// Ends the current track
    EndOfTrack,
}

impl From<NoteEvent> for Event {
    fn from(value: NoteEvent) -> Self {
        Self::Note(value)
    }
}

impl From<Control> for Event {
    fn from(value: Control) -> Self {
        Self::Control(value)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Note(n) => write!(f, "{n}"),
            Self::Control(c) => write!(f, "{}{}", c.command, c.value),
            Self::EndOfTrack => f.write_str(";"),
        }
    }
}

#[test]
fn pitch_letters() {
    assert_eq!(Pitch::from_letter(b'r'), Some(Pitch::Rest));
    assert_eq!(Pitch::from_letter(b'g'), Some(Pitch::Key(Key::G)));
    assert_eq!(Pitch::from_letter(b'h'), None);
}

#[test]
fn display_round_trips_the_syntax() {
    let events = [
        Event::from(NoteEvent::new(Pitch::Key(Key::F)).with_accidental(1).with_length(16)),
        Event::from(Control::new(Command::Tempo, 90)),
        Event::from(NoteEvent::new(Pitch::Rest).with_dots(2)),
        Event::EndOfTrack,
    ];
    let text: Vec<_> = events.iter().map(ToString::to_string).collect();
    assert_eq!(text, ["f+16", "t90", "r..", ";"]);
}
