#![doc = r#"
Rusty representation of a [`MidiFile`], and the [`MidiWriter`] that
produces one
"#]

pub mod chunk;

mod format;
pub use format::*;

mod header;
pub use header::*;

mod timing;
pub use timing::*;

mod writer;
pub use writer::*;

use crate::codec::{
    ChunkError, CodecError, CodecErrorKind, CodecResult, TrackEvent, TrackReader,
};
use chunk::ChunkReader;

/// The events of one `MTrk` chunk.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Track<'a> {
    events: Vec<TrackEvent<'a>>,
}

impl<'a> Track<'a> {
    /// Create a track from its events
    pub fn new(events: Vec<TrackEvent<'a>>) -> Self {
        Self { events }
    }

    /// The events in stream order
    pub fn events(&self) -> &[TrackEvent<'a>] {
        &self.events
    }

    /// Take the events
    pub fn into_events(self) -> Vec<TrackEvent<'a>> {
        self.events
    }

    /// The sum of every delta-time
    pub fn duration_ticks(&self) -> u64 {
        self.events.iter().map(|e| u64::from(e.delta_ticks())).sum()
    }
}

#[doc = r#"
A parsed Standard MIDI File.

The header must be the first chunk. Unknown chunks are skipped, and the
header's track count is informational only: every `MTrk` chunk present
is read.

# Example
```rust
# use mml2midi::prelude::*;
let bytes = compile(b"c;").unwrap();
let file = MidiFile::parse(&bytes).unwrap();
assert_eq!(file.header().num_tracks(), 1);
assert_eq!(file.tracks().len(), 1);
```
"#]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiFile<'a> {
    header: MidiFileHeader,
    tracks: Vec<Track<'a>>,
}

impl<'a> MidiFile<'a> {
    /// Parse a set of bytes into a file struct
    pub fn parse(bytes: &'a [u8]) -> CodecResult<Self> {
        let mut reader = ChunkReader::new(bytes);

        let header = match reader.read_chunk()? {
            Some(chunk) if chunk.is_header() => MidiFileHeader::from_data(chunk.data())
                .map_err(|e| CodecError::new(0, e.into()))?,
            _ => return Err(CodecError::new(0, ChunkError::MissingHeader.into())),
        };

        let mut tracks = Vec::with_capacity(header.num_tracks() as usize);
        loop {
            let position = reader.buffer_position();
            let Some(chunk) = reader.read_chunk()? else {
                break;
            };
            if chunk.is_header() {
                return Err(CodecError::new(
                    position,
                    CodecErrorKind::Chunk(ChunkError::DuplicateHeader),
                ));
            }
            if !chunk.is_track() {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    id = %String::from_utf8_lossy(&chunk.id()),
                    len = chunk.data().len(),
                    "skipping unknown chunk"
                );
                continue;
            }
            let data_start = position + chunk::CHUNK_PREFIX_LEN;
            let events = TrackReader::new(chunk.data())
                .read_all()
                .map_err(|e| e.offset_by(data_start))?;
            tracks.push(Track::new(events));
        }

        #[cfg(feature = "tracing")]
        {
            if tracks.len() != header.num_tracks() as usize {
                tracing::warn!(
                    declared = header.num_tracks(),
                    found = tracks.len(),
                    "track count does not match the header"
                );
            }
        }

        Ok(Self { header, tracks })
    }

    /// Returns header info
    pub fn header(&self) -> &MidiFileHeader {
        &self.header
    }

    /// Returns the timing of the file
    pub fn timing(&self) -> Timing {
        *self.header.timing()
    }

    /// Returns the format type for the file.
    pub fn format_type(&self) -> FormatType {
        self.header.format()
    }

    /// Returns a track list
    pub fn tracks(&self) -> &[Track<'a>] {
        &self.tracks
    }

    /// Take the tracks
    pub fn into_tracks(self) -> Vec<Track<'a>> {
        self.tracks
    }
}

#[test]
fn header_must_come_first() {
    let err = MidiFile::parse(b"MTrk\0\0\0\0").unwrap_err();
    assert_eq!(
        err.error_kind(),
        &CodecErrorKind::Chunk(ChunkError::MissingHeader)
    );
    let err = MidiFile::parse(b"").unwrap_err();
    assert_eq!(
        err.error_kind(),
        &CodecErrorKind::Chunk(ChunkError::MissingHeader)
    );
}

#[test]
fn duplicate_header() {
    let mut bytes = b"MThd\0\0\0\x06\0\x01\0\0\x01\xE0".to_vec();
    bytes.extend_from_within(..);
    let err = MidiFile::parse(&bytes).unwrap_err();
    assert_eq!(
        err.error_kind(),
        &CodecErrorKind::Chunk(ChunkError::DuplicateHeader)
    );
    assert_eq!(err.position(), 14);
}

#[test]
fn unknown_chunks_are_skipped() {
    let bytes = [
        b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 0, 0, 1, 0, 96, //
        b'J', b'U', b'N', b'K', 0, 0, 0, 2, 0xFF, 0xFF, //
        b'M', b'T', b'r', b'k', 0, 0, 0, 4, 0x00, 0xFF, 0x2F, 0x00,
    ];
    let file = MidiFile::parse(&bytes).unwrap();
    assert_eq!(file.format_type(), FormatType::SingleMultiChannel);
    assert_eq!(file.timing().ticks_per_quarter_note(), Some(96));
    assert_eq!(file.tracks().len(), 1);
    assert!(
        file.tracks()[0].events()[0]
            .meta_event()
            .unwrap()
            .is_end_of_track()
    );
}

#[test]
fn track_errors_are_positioned_in_the_file() {
    let bytes = [
        b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 1, 0, 1, 0, 96, //
        b'M', b'T', b'r', b'k', 0, 0, 0, 2, 0x00, 0x3C,
    ];
    let err = MidiFile::parse(&bytes).unwrap_err();
    assert_eq!(err.error_kind(), &CodecErrorKind::NoRunningStatus(0x3C));
    assert_eq!(err.position(), 23);
}
