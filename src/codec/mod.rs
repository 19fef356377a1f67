#![doc = r#"
MIDI primitive codec

The byte-level building blocks of a Standard MIDI File track:

- [`vlq`]: variable-length quantities for delta-times and lengths
- [`ChannelEvent`]: channel voice events, with or without their status byte
- [`TrackEvent`]: a delta-time plus a channel, system exclusive or meta payload
- [`TrackEncoder`] / [`TrackReader`]: whole track streams, applying and
  resolving running status
"#]

mod error;
pub use error::*;

pub mod vlq;

mod channel;
pub use channel::*;

mod track;
pub use track::*;

mod reader;
pub use reader::*;
