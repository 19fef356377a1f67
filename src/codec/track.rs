#![doc = r#"
Track events

Every event in an `MTrk` chunk is a delta-time followed by one of
three payloads:

```text
<delta:vlq> <status 0x80-0xEF> <data...>           channel event
<delta:vlq> <0xF0 | 0xF7> <len:vlq> <data...>      system exclusive
<delta:vlq> <0xFF> <type> <len:vlq> <data...>      meta event
```
"#]

use std::borrow::Cow;

use super::{ChannelEvent, vlq};
use crate::tempo::Tempo;

/// The type byte of the meta events this crate produces.
pub mod meta_type {
    /// `FF 51 03 tt tt tt`
    pub const TEMPO: u8 = 0x51;
    /// `FF 2F 00`
    pub const END_OF_TRACK: u8 = 0x2F;
}

/// The terminating byte of a system exclusive message.
pub const SYSEX_END: u8 = 0xF7;

#[doc = r#"
A meta event: a type byte and an opaque payload.
"#]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaEvent<'a> {
    kind: u8,
    data: Cow<'a, [u8]>,
}

impl<'a> MetaEvent<'a> {
    /// Create a meta event of some type
    pub fn new<B>(kind: u8, data: B) -> Self
    where
        B: Into<Cow<'a, [u8]>>,
    {
        Self {
            kind,
            data: data.into(),
        }
    }

    /// A Set Tempo event
    pub fn tempo(tempo: Tempo) -> MetaEvent<'static> {
        MetaEvent::new(meta_type::TEMPO, tempo.to_bytes().to_vec())
    }

    /// The End Of Track marker
    pub fn end_of_track() -> MetaEvent<'static> {
        MetaEvent::new(meta_type::END_OF_TRACK, Vec::new())
    }

    /// The type byte
    pub fn kind(&self) -> u8 {
        self.kind
    }

    /// The payload
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The tempo, if this is a well formed Set Tempo event.
    pub fn as_tempo(&self) -> Option<Tempo> {
        if self.kind != meta_type::TEMPO {
            return None;
        }
        let bytes: [u8; 3] = self.data.as_ref().try_into().ok()?;
        Some(Tempo::from_bytes(bytes))
    }

    /// True for `FF 2F`
    pub fn is_end_of_track(&self) -> bool {
        self.kind == meta_type::END_OF_TRACK
    }

    /// Copy any borrowed payload.
    pub fn into_owned(self) -> MetaEvent<'static> {
        MetaEvent {
            kind: self.kind,
            data: Cow::Owned(self.data.into_owned()),
        }
    }
}

/// What a [`TrackEvent`] carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackMessage<'a> {
    /// A channel voice event
    Channel(ChannelEvent),
    /// A system exclusive payload, without the leading `F0` and the
    /// trailing `F7`.
    SystemExclusive(Cow<'a, [u8]>),
    /// A meta event
    Meta(MetaEvent<'a>),
}

impl From<ChannelEvent> for TrackMessage<'_> {
    fn from(value: ChannelEvent) -> Self {
        Self::Channel(value)
    }
}

impl<'a> From<MetaEvent<'a>> for TrackMessage<'a> {
    fn from(value: MetaEvent<'a>) -> Self {
        Self::Meta(value)
    }
}

#[doc = r#"
A delta-time and a message.

# Example
```rust
# use mml2midi::prelude::*;
let eot = TrackEvent::new(96, MetaEvent::end_of_track());
assert_eq!(eot.to_bytes(), [0x60, 0xFF, 0x2F, 0x00]);
assert_eq!(eot.encoded_len(), 4);
```
"#]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEvent<'a> {
    delta_ticks: u32,
    message: TrackMessage<'a>,
}

impl<'a> TrackEvent<'a> {
    /// Create a new track event
    pub fn new(delta_ticks: u32, message: impl Into<TrackMessage<'a>>) -> Self {
        Self {
            delta_ticks,
            message: message.into(),
        }
    }

    /// Ticks since the previous event in the track
    pub fn delta_ticks(&self) -> u32 {
        self.delta_ticks
    }

    /// The payload
    pub fn message(&self) -> &TrackMessage<'a> {
        &self.message
    }

    /// The channel event, if this is one
    pub fn channel_event(&self) -> Option<&ChannelEvent> {
        match &self.message {
            TrackMessage::Channel(c) => Some(c),
            _ => None,
        }
    }

    /// The meta event, if this is one
    pub fn meta_event(&self) -> Option<&MetaEvent<'a>> {
        match &self.message {
            TrackMessage::Meta(m) => Some(m),
            _ => None,
        }
    }

    /// The number of bytes [`TrackEvent::write_into`] emits with an explicit
    /// status.
    pub fn encoded_len(&self) -> usize {
        vlq::encoded_len(self.delta_ticks) + self.payload_len(false)
    }

    fn payload_len(&self, running_status: bool) -> usize {
        match &self.message {
            TrackMessage::Channel(c) => c.encoded_len(running_status),
            TrackMessage::SystemExclusive(data) => {
                let len = data.len() as u32 + 1;
                1 + vlq::encoded_len(len) + len as usize
            }
            TrackMessage::Meta(m) => {
                2 + vlq::encoded_len(m.data.len() as u32) + m.data.len()
            }
        }
    }

    /// Append the delta-time and message to `out`.
    ///
    /// `running_status` only affects channel events: their status byte is
    /// left out when true.
    pub fn write_into(&self, out: &mut Vec<u8>, running_status: bool) {
        vlq::encode(self.delta_ticks, out);
        match &self.message {
            TrackMessage::Channel(c) => c.write_into(out, running_status),
            TrackMessage::SystemExclusive(data) => {
                out.push(0xF0);
                vlq::encode(data.len() as u32 + 1, out);
                out.extend_from_slice(data);
                out.push(SYSEX_END);
            }
            TrackMessage::Meta(m) => {
                out.push(0xFF);
                out.push(m.kind);
                vlq::encode(m.data.len() as u32, out);
                out.extend_from_slice(&m.data);
            }
        }
    }

    /// The event with an explicit status byte
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.write_into(&mut out, false);
        out
    }

    /// Copy any borrowed payload.
    pub fn into_owned(self) -> TrackEvent<'static> {
        let message = match self.message {
            TrackMessage::Channel(c) => TrackMessage::Channel(c),
            TrackMessage::SystemExclusive(data) => {
                TrackMessage::SystemExclusive(Cow::Owned(data.into_owned()))
            }
            TrackMessage::Meta(m) => TrackMessage::Meta(m.into_owned()),
        };
        TrackEvent {
            delta_ticks: self.delta_ticks,
            message,
        }
    }
}

#[doc = r#"
Serializes the events of one track, applying running status.

The encoder remembers the last channel status byte it wrote and leaves
out any identical status that follows. Meta and system exclusive events
do not reset it, mirroring [`TrackReader`](super::TrackReader).

# Example
```rust
# use mml2midi::prelude::*;
let c4 = Note::from_key(Key::C, 0, 4);
let mut encoder = TrackEncoder::new();
encoder.push(&TrackEvent::new(0, ChannelEvent::note_on(Channel::One, c4, 100)));
encoder.push(&TrackEvent::new(480, ChannelEvent::note_on(Channel::One, c4, 0)));
assert_eq!(encoder.as_bytes(), [0x00, 0x90, 60, 100, 0x83, 0x60, 60, 0]);
```
"#]
#[derive(Debug, Default, Clone)]
pub struct TrackEncoder {
    bytes: Vec<u8>,
    last_status: Option<u8>,
}

impl TrackEncoder {
    /// An encoder with an empty buffer and no running status
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode an event into the buffer.
    pub fn push(&mut self, event: &TrackEvent<'_>) {
        let running = match event.channel_event() {
            Some(c) => {
                let status = c.status();
                let running = self.last_status == Some(status);
                self.last_status = Some(status);
                running
            }
            None => false,
        };
        event.write_into(&mut self.bytes, running);
    }

    /// The last channel status byte written
    pub fn last_status(&self) -> Option<u8> {
        self.last_status
    }

    /// The encoded bytes so far
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Clear the buffer, keeping the running status.
    pub fn take_bytes(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }

    /// The encoded bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
fn c4() -> crate::note::Note {
    crate::note::Note::from_databyte_unchecked(60)
}

#[test]
fn meta_event_bytes() {
    use pretty_assertions::assert_eq;
    let tempo = TrackEvent::new(0, MetaEvent::tempo(Tempo::DEFAULT));
    assert_eq!(tempo.to_bytes(), [0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20]);
    assert_eq!(tempo.encoded_len(), 7);
    assert_eq!(
        tempo.meta_event().and_then(MetaEvent::as_tempo),
        Some(Tempo::DEFAULT)
    );
}

#[test]
fn sysex_bytes_carry_terminator() {
    let sysex = TrackEvent::new(
        0x80,
        TrackMessage::SystemExclusive(Cow::Borrowed(&[0x43, 0x12, 0x00])),
    );
    let bytes = sysex.to_bytes();
    assert_eq!(bytes, [0x81, 0x00, 0xF0, 0x04, 0x43, 0x12, 0x00, 0xF7]);
    assert_eq!(sysex.encoded_len(), bytes.len());
}

#[test]
fn encoder_running_status() {
    use super::Channel;
    let mut encoder = TrackEncoder::new();
    encoder.push(&TrackEvent::new(0, MetaEvent::tempo(Tempo::DEFAULT)));
    assert_eq!(encoder.last_status(), None);
    encoder.push(&TrackEvent::new(0, ChannelEvent::note_on(Channel::One, c4(), 100)));
    // tempo changes do not interrupt running status
    encoder.push(&TrackEvent::new(0, MetaEvent::tempo(Tempo::DEFAULT)));
    encoder.push(&TrackEvent::new(10, ChannelEvent::note_on(Channel::One, c4(), 0)));
    encoder.push(&TrackEvent::new(0, ChannelEvent::note_on(Channel::Two, c4(), 1)));
    encoder.push(&TrackEvent::new(0, MetaEvent::end_of_track()));

    let expected = [
        0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, //
        0x00, 0x90, 60, 100, //
        0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, //
        0x0A, 60, 0, //
        0x00, 0x91, 60, 1, //
        0x00, 0xFF, 0x2F, 0x00,
    ];
    assert_eq!(encoder.last_status(), Some(0x91));
    assert_eq!(encoder.into_bytes(), expected);
}
