use std::borrow::Cow;

use super::{
    ChannelEvent, CodecError, CodecErrorKind, CodecResult, MetaEvent, Status, TrackEvent,
    TrackMessage, vlq,
};

#[doc = r#"
Reads [`TrackEvent`]s from the data section of an `MTrk` chunk.

The reader keeps the last channel status byte it saw, so events that
rely on running status decode to the same [`ChannelEvent`] the encoder
started from. Payloads are borrowed from the input.

# Example
```rust
# use mml2midi::prelude::*;
let bytes = [0x00, 0x90, 60, 100, 0x83, 0x60, 60, 0, 0x00, 0xFF, 0x2F, 0x00];
let mut reader = TrackReader::new(&bytes);

let _on = reader.read_event().unwrap().unwrap();
let off = reader.read_event().unwrap().unwrap();
assert_eq!(off.delta_ticks(), 480);
assert_eq!(off.channel_event().unwrap().status(), 0x90);
assert!(reader.read_event().unwrap().unwrap().meta_event().unwrap().is_end_of_track());
assert!(reader.read_event().unwrap().is_none());
```
"#]
#[derive(Debug, Clone)]
pub struct TrackReader<'a> {
    bytes: &'a [u8],
    position: usize,
    last_status: Option<u8>,
}

impl<'a> TrackReader<'a> {
    /// A reader at the start of `bytes` with no running status
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            position: 0,
            last_status: None,
        }
    }

    /// The offset of the next unread byte
    pub fn buffer_position(&self) -> usize {
        self.position
    }

    /// The running status, if a channel event has been read
    pub fn last_status(&self) -> Option<u8> {
        self.last_status
    }

    /// True once every byte has been consumed
    pub fn is_empty(&self) -> bool {
        self.position >= self.bytes.len()
    }

    fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.position.min(self.bytes.len())..]
    }

    fn read_vlq(&mut self) -> CodecResult<u32> {
        let (value, used) =
            vlq::decode(self.remaining()).map_err(|e| e.offset_by(self.position))?;
        self.position += used;
        Ok(value)
    }

    fn read_u8(&mut self) -> CodecResult<u8> {
        let byte = *self
            .bytes
            .get(self.position)
            .ok_or(CodecError::oob(self.position))?;
        self.position += 1;
        Ok(byte)
    }

    fn read_slice(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let end = self
            .position
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(CodecError::oob(self.bytes.len()))?;
        let slice = &self.bytes[self.position..end];
        self.position = end;
        Ok(slice)
    }

    /// Read the next event.
    ///
    /// Returns `Ok(None)` when the input is exhausted. A failed read leaves
    /// the reader wherever decoding stopped; it should not be resumed.
    pub fn read_event(&mut self) -> CodecResult<Option<TrackEvent<'a>>> {
        if self.is_empty() {
            return Ok(None);
        }
        let delta_ticks = self.read_vlq()?;
        let start = self.position;
        let first = self.read_u8()?;

        let message = match first {
            0x80..=0xEF => {
                let (event, used) = ChannelEvent::read(&self.bytes[start..], Status::Explicit)
                    .map_err(|e| e.offset_by(start))?;
                self.position = start + used;
                self.last_status = Some(first);
                TrackMessage::Channel(event)
            }
            0xF0 | 0xF7 => {
                let len = self.read_vlq()? as usize;
                let data = self.read_slice(len)?;
                // the final byte is the F7 terminator
                let payload = &data[..len.saturating_sub(1)];
                TrackMessage::SystemExclusive(Cow::Borrowed(payload))
            }
            0xFF => {
                let kind = self.read_u8()?;
                let len = self.read_vlq()? as usize;
                let data = self.read_slice(len)?;
                TrackMessage::Meta(MetaEvent::new(kind, data))
            }
            byte => match self.last_status {
                Some(status) if byte < 0x80 => {
                    let (event, used) =
                        ChannelEvent::read(&self.bytes[start..], Status::Running(status))
                            .map_err(|e| e.offset_by(start))?;
                    self.position = start + used;
                    TrackMessage::Channel(event)
                }
                Some(_) => {
                    return Err(CodecError::new(start, CodecErrorKind::InvalidStatus(byte)));
                }
                None => {
                    return Err(CodecError::new(start, CodecErrorKind::NoRunningStatus(byte)));
                }
            },
        };

        Ok(Some(TrackEvent::new(delta_ticks, message)))
    }

    /// Read every remaining event.
    pub fn read_all(&mut self) -> CodecResult<Vec<TrackEvent<'a>>> {
        let mut events = Vec::new();
        while let Some(event) = self.read_event()? {
            events.push(event);
        }
        Ok(events)
    }
}

impl<'a> Iterator for TrackReader<'a> {
    type Item = CodecResult<TrackEvent<'a>>;
    fn next(&mut self) -> Option<Self::Item> {
        self.read_event().transpose()
    }
}

#[test]
fn reads_mixed_stream() {
    use crate::{codec::Channel, tempo::Tempo};
    use pretty_assertions::assert_eq;

    let bytes = [
        0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, // tempo
        0x00, 0xC2, 0x05, // program change, channel 3
        0x10, 0x07, // running program change
        0x81, 0x00, 0xF0, 0x03, 0x43, 0x10, 0xF7, // sysex
        0x00, 0xE2, 0x00, 0x40, // pitch bend, center
        0x00, 0xFF, 0x2F, 0x00,
    ];
    let events = TrackReader::new(&bytes).read_all().unwrap();
    assert_eq!(events.len(), 6);

    assert_eq!(
        events[0].meta_event().and_then(MetaEvent::as_tempo),
        Some(Tempo::DEFAULT)
    );
    let program = events[2].channel_event().unwrap();
    assert_eq!(events[2].delta_ticks(), 0x10);
    assert_eq!(program.channel(), Channel::Three);
    assert_eq!(program.status(), 0xC2);

    assert_eq!(events[3].delta_ticks(), 0x80);
    assert_eq!(
        events[3].message(),
        &TrackMessage::SystemExclusive(Cow::Borrowed(&[0x43, 0x10]))
    );
    assert_eq!(events[4].channel_event().unwrap().status(), 0xE2);
    assert!(events[5].meta_event().unwrap().is_end_of_track());
}

#[test]
fn data_byte_without_status_is_malformed() {
    let err = TrackReader::new(&[0x00, 0x3C, 0x40]).read_event().unwrap_err();
    assert_eq!(err.error_kind(), &CodecErrorKind::NoRunningStatus(0x3C));
    assert_eq!(err.position(), 1);
}

#[test]
fn system_real_time_byte_is_malformed() {
    let err = TrackReader::new(&[0x00, 0x90, 0x3C, 0x40, 0x00, 0xF8])
        .read_all()
        .unwrap_err();
    assert_eq!(err.error_kind(), &CodecErrorKind::InvalidStatus(0xF8));
    assert_eq!(err.position(), 5);
}

#[test]
fn truncated_events() {
    let err = TrackReader::new(&[0x00, 0x90, 0x3C]).read_event().unwrap_err();
    assert!(err.is_out_of_bounds());

    let err = TrackReader::new(&[0x00, 0xFF, 0x51, 0x03, 0x07])
        .read_event()
        .unwrap_err();
    assert!(err.is_out_of_bounds());

    let err = TrackReader::new(&[0x81]).read_event().unwrap_err();
    assert_eq!(err.error_kind(), &CodecErrorKind::TruncatedVlq);
}
