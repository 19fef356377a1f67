#![doc = r#"
Channel events

A channel event is a status byte followed by one or two data bytes.
The high nibble of the status byte names the [`StatusKind`], the low
nibble the [`Channel`].

```text
|  status  |   data 1   |  data 2  |
| 1kkk cccc| 0xxx xxxx  | 0yyy yyyy|
```

When a track stream repeats the previous status byte, the status may be
left out ("running status"). Encoding and decoding both take that into
account explicitly: see [`ChannelEvent::write_into`] and [`Status`].
"#]

use num_enum::{IntoPrimitive, TryFromPrimitive};

use super::{CodecError, CodecErrorKind, CodecResult};
use crate::{DataByte, note::Note};

#[doc = r#"
The high nibble of a channel status byte
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum StatusKind {
    /// `0x8n`
    NoteOff = 0x8,
    /// `0x9n`
    NoteOn = 0x9,
    /// `0xAn`, polyphonic key pressure
    PolyPressure = 0xA,
    /// `0xBn`, control change
    Controller = 0xB,
    /// `0xCn`, program change
    Program = 0xC,
    /// `0xDn`, channel pressure
    ChannelPressure = 0xD,
    /// `0xEn`
    PitchBend = 0xE,
}

impl StatusKind {
    /// How many data bytes follow a status of this kind.
    pub const fn data_len(&self) -> usize {
        match self {
            Self::Program | Self::ChannelPressure => 1,
            _ => 2,
        }
    }
}

/// One of the sixteen MIDI channels.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Channel {
    One = 0,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Eleven,
    Twelve,
    Thirteen,
    Fourteen,
    Fifteen,
    Sixteen,
}

impl Channel {
    /// Channel from the low nibble of a status byte
    pub const fn from_status(status: u8) -> Self {
        // all 16 values of the nibble are represented
        match Self::try_from_index(status & 0x0F) {
            Some(channel) => channel,
            None => unreachable!(),
        }
    }

    /// `None` if the index is 16 or more
    pub const fn try_from_index(index: u8) -> Option<Self> {
        use Channel::*;
        Some(match index {
            0 => One,
            1 => Two,
            2 => Three,
            3 => Four,
            4 => Five,
            5 => Six,
            6 => Seven,
            7 => Eight,
            8 => Nine,
            9 => Ten,
            10 => Eleven,
            11 => Twelve,
            12 => Thirteen,
            13 => Fourteen,
            14 => Fifteen,
            15 => Sixteen,
            _ => return None,
        })
    }

    /// The zero-based channel index
    pub const fn index(&self) -> u8 {
        *self as u8
    }
}

/// The payload of a channel event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VoiceEvent {
    /// Release a key
    NoteOff {
        /// The key
        note: Note,
        /// Release velocity
        velocity: DataByte,
    },
    /// Press a key. A velocity of zero is treated as a release by receivers.
    NoteOn {
        /// The key
        note: Note,
        /// Attack velocity
        velocity: DataByte,
    },
    /// Aftertouch on a single key
    PolyPressure {
        /// The key
        note: Note,
        /// Pressure amount
        pressure: DataByte,
    },
    /// Control change
    Controller {
        /// Controller number
        controller: DataByte,
        /// Controller value
        value: DataByte,
    },
    /// Program change
    Program(DataByte),
    /// Aftertouch for the whole channel
    ChannelPressure(DataByte),
    /// 14-bit pitch bend, `0x2000` is centered.
    PitchBend(u16),
}

impl VoiceEvent {
    /// Returns the status nibble for the event
    pub const fn kind(&self) -> StatusKind {
        match self {
            Self::NoteOff { .. } => StatusKind::NoteOff,
            Self::NoteOn { .. } => StatusKind::NoteOn,
            Self::PolyPressure { .. } => StatusKind::PolyPressure,
            Self::Controller { .. } => StatusKind::Controller,
            Self::Program(_) => StatusKind::Program,
            Self::ChannelPressure(_) => StatusKind::ChannelPressure,
            Self::PitchBend(_) => StatusKind::PitchBend,
        }
    }
}

/// Where the status byte of an event comes from while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The first input byte is the status byte.
    Explicit,
    /// The status was elided; use this previously seen status byte.
    Running(u8),
}

#[doc = r#"
A channel event: a [`VoiceEvent`] addressed to a [`Channel`]

# Example
```rust
# use mml2midi::prelude::*;
let event = ChannelEvent::note_on(Channel::One, Note::from_key(Key::C, 0, 4), 100);
assert_eq!(event.to_bytes(), [0x90, 60, 100]);

let mut running = Vec::new();
event.write_into(&mut running, true);
assert_eq!(running, [60, 100]);

let (decoded, used) = ChannelEvent::read(&running, Status::Running(0x90)).unwrap();
assert_eq!(decoded, event);
assert_eq!(used, 2);
```
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelEvent {
    channel: Channel,
    event: VoiceEvent,
}

impl ChannelEvent {
    /// Create a new channel event
    pub const fn new(channel: Channel, event: VoiceEvent) -> Self {
        Self { channel, event }
    }

    /// A note on event. The velocity is clamped to 127.
    pub const fn note_on(channel: Channel, note: Note, velocity: u8) -> Self {
        Self::new(
            channel,
            VoiceEvent::NoteOn {
                note,
                velocity: DataByte::saturating(velocity),
            },
        )
    }

    /// The channel of the event
    pub const fn channel(&self) -> Channel {
        self.channel
    }

    /// The payload of the event
    pub const fn event(&self) -> &VoiceEvent {
        &self.event
    }

    /// The full status byte, `kind << 4 | channel`
    pub const fn status(&self) -> u8 {
        ((self.event.kind() as u8) << 4) | self.channel.index()
    }

    /// Number of bytes [`ChannelEvent::write_into`] emits.
    pub const fn encoded_len(&self, running_status: bool) -> usize {
        let data = self.event.kind().data_len();
        if running_status { data } else { data + 1 }
    }

    /// Append the event to `out`.
    ///
    /// If `running_status` is true the status byte is left out.
    pub fn write_into(&self, out: &mut Vec<u8>, running_status: bool) {
        if !running_status {
            out.push(self.status());
        }
        use VoiceEvent::*;
        match self.event {
            NoteOff { note, velocity } | NoteOn { note, velocity } => {
                out.extend_from_slice(&[note.byte(), velocity.value()])
            }
            PolyPressure { note, pressure } => {
                out.extend_from_slice(&[note.byte(), pressure.value()])
            }
            Controller { controller, value } => {
                out.extend_from_slice(&[controller.value(), value.value()])
            }
            Program(byte) | ChannelPressure(byte) => out.push(byte.value()),
            PitchBend(value) => {
                out.extend_from_slice(&[(value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8])
            }
        }
    }

    /// The event with an explicit status byte
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(3);
        self.write_into(&mut out, false);
        out
    }

    /// Decode a channel event from the front of `bytes`.
    ///
    /// Returns the event and the number of bytes consumed, which does not
    /// include an inherited running status.
    pub fn read(bytes: &[u8], status: Status) -> CodecResult<(Self, usize)> {
        let (status, data_start) = match status {
            Status::Explicit => {
                let Some(&status) = bytes.first() else {
                    return Err(CodecError::oob(0));
                };
                (status, 1)
            }
            Status::Running(status) => (status, 0),
        };
        if !(0x80..0xF0).contains(&status) {
            return Err(CodecError::new(0, CodecErrorKind::InvalidStatus(status)));
        }
        let kind = StatusKind::try_from(status >> 4)
            .map_err(|_| CodecError::new(0, CodecErrorKind::InvalidStatus(status)))?;
        let channel = Channel::from_status(status);

        let end = data_start + kind.data_len();
        let Some(data) = bytes.get(data_start..end) else {
            return Err(CodecError::oob(bytes.len()));
        };
        let byte = |i: usize| {
            DataByte::new(data[i]).map_err(|k| CodecError::new(data_start + i, k))
        };

        use VoiceEvent::*;
        let event = match kind {
            StatusKind::NoteOff => NoteOff {
                note: Note::new(byte(0)?),
                velocity: byte(1)?,
            },
            StatusKind::NoteOn => NoteOn {
                note: Note::new(byte(0)?),
                velocity: byte(1)?,
            },
            StatusKind::PolyPressure => PolyPressure {
                note: Note::new(byte(0)?),
                pressure: byte(1)?,
            },
            StatusKind::Controller => Controller {
                controller: byte(0)?,
                value: byte(1)?,
            },
            StatusKind::Program => Program(byte(0)?),
            StatusKind::ChannelPressure => ChannelPressure(byte(0)?),
            StatusKind::PitchBend => {
                PitchBend(byte(0)?.value() as u16 | (byte(1)?.value() as u16) << 7)
            }
        };
        Ok((Self { channel, event }, end))
    }
}

#[cfg(test)]
fn db(byte: u8) -> DataByte {
    DataByte::new(byte).unwrap()
}

#[test]
fn encode_every_kind() {
    use pretty_assertions::assert_eq;
    let c4 = Note::from_databyte(60u8).unwrap();
    let cases = [
        (
            VoiceEvent::NoteOff {
                note: c4,
                velocity: db(64),
            },
            vec![0x83, 60, 64],
        ),
        (
            VoiceEvent::NoteOn {
                note: c4,
                velocity: db(100),
            },
            vec![0x93, 60, 100],
        ),
        (
            VoiceEvent::PolyPressure {
                note: c4,
                pressure: db(5),
            },
            vec![0xA3, 60, 5],
        ),
        (
            VoiceEvent::Controller {
                controller: db(7),
                value: db(127),
            },
            vec![0xB3, 7, 127],
        ),
        (VoiceEvent::Program(db(19)), vec![0xC3, 19]),
        (VoiceEvent::ChannelPressure(db(33)), vec![0xD3, 33]),
        (VoiceEvent::PitchBend(0x2000), vec![0xE3, 0x00, 0x40]),
        (VoiceEvent::PitchBend(0x3FFF), vec![0xE3, 0x7F, 0x7F]),
    ];
    for (event, bytes) in cases {
        let event = ChannelEvent::new(Channel::Four, event);
        assert_eq!(event.to_bytes(), bytes);
        assert_eq!(event.encoded_len(false), bytes.len());

        let (decoded, used) = ChannelEvent::read(&bytes, Status::Explicit).unwrap();
        assert_eq!(decoded, event);
        assert_eq!(used, bytes.len());

        let mut running = Vec::new();
        event.write_into(&mut running, true);
        assert_eq!(running, &bytes[1..]);
        let (inherited, used) =
            ChannelEvent::read(&running, Status::Running(bytes[0])).unwrap();
        assert_eq!(inherited, decoded);
        assert_eq!(used, running.len());
    }
}

#[test]
fn decode_errors() {
    let err = ChannelEvent::read(&[0x90, 60], Status::Explicit).unwrap_err();
    assert!(err.is_out_of_bounds());

    let err = ChannelEvent::read(&[0x90, 0xBC, 0x10], Status::Explicit).unwrap_err();
    assert_eq!(err.error_kind(), &CodecErrorKind::InvalidDataByte(0xBC));
    assert_eq!(err.position(), 1);

    let err = ChannelEvent::read(&[0xF8], Status::Explicit).unwrap_err();
    assert_eq!(err.error_kind(), &CodecErrorKind::InvalidStatus(0xF8));

    let err = ChannelEvent::read(&[0x40, 0x40], Status::Running(0x3C)).unwrap_err();
    assert_eq!(err.error_kind(), &CodecErrorKind::InvalidStatus(0x3C));

    let err = ChannelEvent::read(&[], Status::Explicit).unwrap_err();
    assert!(err.is_out_of_bounds());
}

#[test]
fn channels_from_status() {
    assert_eq!(Channel::from_status(0x9F), Channel::Sixteen);
    assert_eq!(Channel::try_from_index(16), None);
    assert_eq!(Channel::try_from(9u8).unwrap(), Channel::Ten);
    assert_eq!(Channel::Ten.index(), 9);
}
