#![warn(missing_docs)]
#![doc = r#"
A compiler from a compact music macro language to Standard MIDI Files.

```text
!arp{ c e g > c < }    define a macro
t140 l8 o4             tempo, default length, octave
[ @arp : r4 ]2 ;       play it twice with a rest between, end the track
v90 o2 c2 g2 ;         a second track on the next channel
```

The pipeline runs in four stages, each usable on its own:

- [`mml::lexer`] splits source bytes into tokens
- [`mml::parser`] expands macros and loops into a flat [`mml::Event`] list
- [`translate`] walks the events with per-track state and produces
  [`codec::TrackEvent`]s
- [`file::MidiWriter`] writes the `MThd`/`MTrk` chunks, with
  [`codec::TrackEncoder`] applying running status

[`MidiFile::parse`](file::MidiFile::parse) reads the result back.

# Example
```rust
use mml2midi::prelude::*;

let bytes = compile(b"t120 o4 c4;").unwrap();
let file = MidiFile::parse(&bytes).unwrap();

let track = &file.tracks()[0];
let note_off = track.events()[3].channel_event().unwrap();
assert_eq!(track.events()[3].delta_ticks(), 480);
assert_eq!(note_off.to_bytes(), [0x90, 60, 0]);
```
"#]

mod byte;
pub use byte::*;

pub mod codec;
pub mod compile;
mod error;
pub use error::*;
pub mod file;
pub mod mml;
pub mod note;
pub mod tempo;
pub mod translate;

/// Commonly used types
pub mod prelude {
    pub use crate::{
        DataByte, Error,
        codec::{
            Channel, ChannelEvent, CodecError, CodecErrorKind, MetaEvent, Status, StatusKind,
            TrackEncoder, TrackEvent, TrackMessage, TrackReader, VoiceEvent,
        },
        compile::{CompileOptions, Compiled, compile, compile_file, compile_to, compile_with},
        file::{
            FormatType, MidiFile, MidiFileHeader, MidiWriter, SmpteFps, Timing, Track, WriteError,
        },
        mml::{Command, Control, Event, NoteEvent, ParseError, ParseWarning, Pitch},
        note::{Key, Note},
        tempo::Tempo,
        translate::{TranslateError, Translator, TranslatorConfig},
    };
}
