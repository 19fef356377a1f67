use std::io::{self, Seek, SeekFrom, Write};

use thiserror::Error;

use super::{
    FormatType, MidiFileHeader, Timing,
    chunk::{HEADER_ID, TRACK_ID},
};
use crate::codec::{TrackEncoder, TrackEvent};

/// Failures while writing a Standard MIDI File.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The sink failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// `end_track` without a matching `begin_track`
    #[error("No track is open")]
    NoOpenTrack,
    /// `begin_track` or `finish` while a track is still open
    #[error("A track is already open")]
    TrackAlreadyOpen,
    /// The track data does not fit the 32-bit chunk length
    #[error("Track of {0} bytes is too long for a chunk")]
    TrackTooLong(u64),
    /// The header can count at most 65535 tracks
    #[error("Too many tracks")]
    TooManyTracks,
}

/// Offset of the track count inside the file.
const TRACK_COUNT_OFFSET: u64 = 10;

#[doc = r#"
Writes a Standard MIDI File in one pass over a seekable sink.

Lengths are not known up front: the header's track count and each track's
chunk length are written as zero and patched by seeking back once the real
value is known. A sink that cannot seek can be served by writing into a
[`Cursor<Vec<u8>>`](std::io::Cursor) and copying the bytes out afterwards.

# Example
```rust
# use std::io::Cursor;
# use mml2midi::prelude::*;
let mut writer = MidiWriter::begin(Cursor::new(Vec::new()), FormatType::Simultaneous, Timing::default()).unwrap();
writer.begin_track().unwrap();
writer.append(&TrackEvent::new(0, MetaEvent::end_of_track()).to_bytes()).unwrap();
writer.end_track().unwrap();
let bytes = writer.finish().unwrap().into_inner();

assert_eq!(&bytes[..4], b"MThd");
assert_eq!(&bytes[10..12], [0, 1]); // one track
assert_eq!(&bytes[14..22], b"MTrk\0\0\0\x04");
```
"#]
#[derive(Debug)]
pub struct MidiWriter<W: Write + Seek> {
    sink: W,
    start: u64,
    track_count: u16,
    /// Position of the first data byte of the open track
    track_start: Option<u64>,
}

impl<W: Write + Seek> MidiWriter<W> {
    /// Write the header chunk with a placeholder track count.
    pub fn begin(mut sink: W, format: FormatType, timing: Timing) -> Result<Self, WriteError> {
        let start = sink.stream_position()?;
        let header = MidiFileHeader::new(format, 0, timing);
        sink.write_all(&HEADER_ID)?;
        sink.write_all(&MidiFileHeader::LEN.to_be_bytes())?;
        sink.write_all(&header.to_data())?;
        Ok(Self {
            sink,
            start,
            track_count: 0,
            track_start: None,
        })
    }

    /// Tracks closed so far
    pub fn track_count(&self) -> u16 {
        self.track_count
    }

    /// True between `begin_track` and `end_track`
    pub fn is_track_open(&self) -> bool {
        self.track_start.is_some()
    }

    /// Open a track chunk with a placeholder length.
    pub fn begin_track(&mut self) -> Result<(), WriteError> {
        if self.track_start.is_some() {
            return Err(WriteError::TrackAlreadyOpen);
        }
        self.sink.write_all(&TRACK_ID)?;
        self.sink.write_all(&0u32.to_be_bytes())?;
        self.track_start = Some(self.sink.stream_position()?);
        Ok(())
    }

    /// Append raw bytes to the sink.
    ///
    /// Nothing is validated: the bytes should be encoded track events.
    pub fn append(&mut self, data: &[u8]) -> Result<(), WriteError> {
        if data.is_empty() {
            return Ok(());
        }
        self.sink.write_all(data)?;
        Ok(())
    }

    /// Close the open track, patching its length.
    pub fn end_track(&mut self) -> Result<(), WriteError> {
        let Some(start) = self.track_start else {
            return Err(WriteError::NoOpenTrack);
        };
        let end = self.sink.stream_position()?;
        let len = end - start;
        let len = u32::try_from(len).map_err(|_| WriteError::TrackTooLong(len))?;
        let count = self
            .track_count
            .checked_add(1)
            .ok_or(WriteError::TooManyTracks)?;

        self.sink.seek(SeekFrom::Start(start - 4))?;
        self.sink.write_all(&len.to_be_bytes())?;
        self.sink.seek(SeekFrom::Start(end))?;

        self.track_start = None;
        self.track_count = count;

        #[cfg(feature = "tracing")]
        tracing::trace!(track = count, bytes = len, "closed track chunk");
        Ok(())
    }

    /// Encode `events` as one complete track chunk.
    pub fn write_track(&mut self, events: &[TrackEvent<'_>]) -> Result<(), WriteError> {
        let mut encoder = TrackEncoder::new();
        for event in events {
            encoder.push(event);
        }
        self.begin_track()?;
        self.append(encoder.as_bytes())?;
        self.end_track()
    }

    /// Patch the track count into the header and hand back the sink.
    pub fn finish(mut self) -> Result<W, WriteError> {
        if self.track_start.is_some() {
            return Err(WriteError::TrackAlreadyOpen);
        }
        let end = self.sink.stream_position()?;
        self.sink
            .seek(SeekFrom::Start(self.start + TRACK_COUNT_OFFSET))?;
        self.sink.write_all(&self.track_count.to_be_bytes())?;
        self.sink.seek(SeekFrom::Start(end))?;
        self.sink.flush()?;

        #[cfg(feature = "tracing")]
        tracing::debug!(tracks = self.track_count, bytes = end - self.start, "finished midi file");
        Ok(self.sink)
    }
}

#[cfg(test)]
fn new_writer() -> MidiWriter<io::Cursor<Vec<u8>>> {
    MidiWriter::begin(
        io::Cursor::new(Vec::new()),
        FormatType::Simultaneous,
        Timing::new_ticks_per_quarter_note(96),
    )
    .unwrap()
}

#[test]
fn patches_lengths_and_count() {
    use pretty_assertions::assert_eq;
    let mut writer = new_writer();
    writer.begin_track().unwrap();
    writer.append(&[0x00, 0x90, 0x3C, 0x40]).unwrap();
    writer.append(&[]).unwrap();
    writer.append(&[0x00, 0xFF, 0x2F, 0x00]).unwrap();
    writer.end_track().unwrap();
    writer.begin_track().unwrap();
    writer.end_track().unwrap();
    assert_eq!(writer.track_count(), 2);

    let bytes = writer.finish().unwrap().into_inner();
    let expected = [
        b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 1, 0, 2, 0, 96, //
        b'M', b'T', b'r', b'k', 0, 0, 0, 8, //
        0x00, 0x90, 0x3C, 0x40, 0x00, 0xFF, 0x2F, 0x00, //
        b'M', b'T', b'r', b'k', 0, 0, 0, 0,
    ];
    assert_eq!(bytes, expected);
}

#[test]
fn header_only_file() {
    let bytes = new_writer().finish().unwrap().into_inner();
    assert_eq!(bytes, b"MThd\0\0\0\x06\0\x01\0\0\0\x60");
}

#[test]
fn writer_starts_at_the_current_position() {
    let mut sink = io::Cursor::new(Vec::new());
    sink.write_all(b"junk").unwrap();
    let mut writer =
        MidiWriter::begin(sink, FormatType::SingleMultiChannel, Timing::default()).unwrap();
    writer.write_track(&[]).unwrap();
    let bytes = writer.finish().unwrap().into_inner();
    assert_eq!(&bytes[4..8], b"MThd");
    assert_eq!(&bytes[14..16], [0, 1]);
    assert_eq!(bytes.len(), 4 + 14 + 8);
}

#[test]
fn track_bracketing_is_checked() {
    let mut writer = new_writer();
    assert!(matches!(writer.end_track(), Err(WriteError::NoOpenTrack)));
    writer.begin_track().unwrap();
    assert!(matches!(
        writer.begin_track(),
        Err(WriteError::TrackAlreadyOpen)
    ));
    assert!(writer.is_track_open());
    assert!(matches!(
        writer.finish(),
        Err(WriteError::TrackAlreadyOpen)
    ));
}
