#![doc = r#"
Contains types for MIDI file chunks

# Overview

MIDI files are organized into chunks, each identified by a 4-character ASCII type identifier
followed by a 32-bit big-endian length field and then the chunk data. The Standard MIDI File
specification defines two chunk types:

- `MThd`, the header, which must come first and always has 6 bytes of data
  (see [`MidiFileHeader`](super::MidiFileHeader))
- `MTrk`, a track, whose data is a sequence of
  [`TrackEvent`](crate::codec::TrackEvent)s

Anything else is an unknown chunk, which readers skip.

```text
[Header Chunk: "MThd"]
[Track Chunk 1: "MTrk"]
...
[Track Chunk N: "MTrk"]
[Optional Unknown Chunks]
```
"#]

use crate::codec::{CodecError, CodecResult};

/// Type identifier of the header chunk
pub const HEADER_ID: [u8; 4] = *b"MThd";
/// Type identifier of a track chunk
pub const TRACK_ID: [u8; 4] = *b"MTrk";

/// Bytes before the data of every chunk
pub const CHUNK_PREFIX_LEN: usize = 8;

/// A chunk whose data is borrowed from the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawChunk<'a> {
    id: [u8; 4],
    data: &'a [u8],
}

impl<'a> RawChunk<'a> {
    /// The 4-byte type identifier
    pub const fn id(&self) -> [u8; 4] {
        self.id
    }

    /// The chunk data, without the type and length prefix
    pub const fn data(&self) -> &'a [u8] {
        self.data
    }

    /// True for `MThd`
    pub fn is_header(&self) -> bool {
        self.id == HEADER_ID
    }

    /// True for `MTrk`
    pub fn is_track(&self) -> bool {
        self.id == TRACK_ID
    }
}

/// Splits a file into its chunks.
#[derive(Debug, Clone)]
pub struct ChunkReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ChunkReader<'a> {
    /// A reader at the start of the file
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// The offset of the next unread byte
    pub const fn buffer_position(&self) -> usize {
        self.position
    }

    /// Read the next chunk, `Ok(None)` at the end of the file.
    ///
    /// A chunk whose declared length runs past the end of the file is an
    /// out of bounds error.
    pub fn read_chunk(&mut self) -> CodecResult<Option<RawChunk<'a>>> {
        let rest = &self.bytes[self.position.min(self.bytes.len())..];
        if rest.is_empty() {
            return Ok(None);
        }
        let Some((prefix, data)) = rest.split_first_chunk::<CHUNK_PREFIX_LEN>() else {
            return Err(CodecError::oob(self.bytes.len()));
        };
        let [a, b, c, d, l0, l1, l2, l3] = *prefix;
        let len = u32::from_be_bytes([l0, l1, l2, l3]) as usize;
        let data = data
            .get(..len)
            .ok_or(CodecError::oob(self.bytes.len()))?;

        self.position += CHUNK_PREFIX_LEN + len;
        Ok(Some(RawChunk {
            id: [a, b, c, d],
            data,
        }))
    }
}

impl<'a> Iterator for ChunkReader<'a> {
    type Item = CodecResult<RawChunk<'a>>;
    fn next(&mut self) -> Option<Self::Item> {
        self.read_chunk().transpose()
    }
}

#[test]
fn splits_chunks() {
    let bytes = [
        b'M', b'T', b'h', b'd', 0, 0, 0, 2, 0xAA, 0xBB, //
        b'X', b'Y', b'Z', b'W', 0, 0, 0, 0, //
        b'M', b'T', b'r', b'k', 0, 0, 0, 1, 0xCC,
    ];
    let chunks: Vec<_> = ChunkReader::new(&bytes).collect::<Result<_, _>>().unwrap();
    assert_eq!(chunks.len(), 3);
    assert!(chunks[0].is_header());
    assert_eq!(chunks[0].data(), [0xAA, 0xBB]);
    assert_eq!(&chunks[1].id(), b"XYZW");
    assert!(chunks[2].is_track());
    assert_eq!(chunks[2].data(), [0xCC]);
}

#[test]
fn truncated_chunks() {
    let err = ChunkReader::new(b"MTrk\0\0\0\x05ab").read_chunk().unwrap_err();
    assert!(err.is_out_of_bounds());
    assert_eq!(err.position(), 10);

    let err = ChunkReader::new(b"MTr").read_chunk().unwrap_err();
    assert!(err.is_out_of_bounds());
}
