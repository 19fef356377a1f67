#![doc = r#"
Source to Standard MIDI File in one call

```text
source bytes -> tokens -> events -> tracks -> MThd + MTrk chunks
```

[`compile`] uses the defaults (format 1, 480 ticks per quarter note);
[`CompileOptions`] changes them.
"#]

use std::{
    fs,
    io::{Cursor, Seek, Write},
    path::Path,
};

use crate::{
    error::{Error, Result},
    file::{FormatType, MidiWriter, Timing, Track},
    mml::{ParseWarning, parse, tokenize},
    translate::{Translator, TranslatorConfig},
};

/// Settings of the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompileOptions {
    /// The header division; must be ticks per quarter note
    pub timing: Timing,
    /// The header format word
    pub format: FormatType,
}

impl CompileOptions {
    /// Set the division
    pub const fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Set the division to `tpqn` ticks per quarter note
    pub const fn with_ticks_per_quarter_note(self, tpqn: u16) -> Self {
        self.with_timing(Timing::new_ticks_per_quarter_note(tpqn))
    }

    /// Set the format word
    pub const fn with_format(mut self, format: FormatType) -> Self {
        self.format = format;
        self
    }

    /// The translator settings these options imply.
    pub fn translator_config(&self) -> Result<TranslatorConfig> {
        let tpqn = self
            .timing
            .ticks_per_quarter_note()
            .ok_or(Error::UnsupportedTiming(self.timing))?;
        Ok(TranslatorConfig::default().with_ticks_per_quarter_note(tpqn))
    }
}

/// The tracks of a compiled source, before they are written.
#[derive(Debug, Clone, Default)]
pub struct Compiled {
    /// One track per channel
    pub tracks: Vec<Track<'static>>,
    /// Parser diagnostics that did not stop the compile
    pub warnings: Vec<ParseWarning>,
}

/// Run the front end and the translator over `source`.
pub fn translate_source(source: &[u8], options: &CompileOptions) -> Result<Compiled> {
    let config = options.translator_config()?;
    let tokens = tokenize(source)?;
    let parsed = parse(&tokens, source)?;
    let tracks = Translator::new(config).translate(&parsed.events)?;

    #[cfg(feature = "tracing")]
    {
        if options.format == FormatType::SingleMultiChannel && tracks.len() > 1 {
            tracing::warn!(
                tracks = tracks.len(),
                "format 0 files should hold a single track"
            );
        }
    }

    Ok(Compiled {
        tracks,
        warnings: parsed.warnings,
    })
}

/// Write `tracks` as a complete file into `sink`.
pub fn write_tracks<W: Write + Seek>(
    tracks: &[Track<'_>],
    options: &CompileOptions,
    sink: W,
) -> Result<W> {
    let mut writer = MidiWriter::begin(sink, options.format, options.timing)?;
    for track in tracks {
        writer.write_track(track.events())?;
    }
    Ok(writer.finish()?)
}

/// Compile `source` with the default options.
///
/// ```rust
/// # use mml2midi::prelude::*;
/// let bytes = compile(b"t120 o4 c4;").unwrap();
/// assert_eq!(&bytes[..4], b"MThd");
/// assert!(matches!(compile(b"c @missing"), Err(Error::Parse(_))));
/// ```
pub fn compile(source: &[u8]) -> Result<Vec<u8>> {
    compile_with(source, &CompileOptions::default())
}

/// Compile `source` into an in-memory file.
pub fn compile_with(source: &[u8], options: &CompileOptions) -> Result<Vec<u8>> {
    Ok(compile_to(source, options, Cursor::new(Vec::new()))?.into_inner())
}

/// Compile `source` into any seekable sink, returning it.
///
/// Nothing is written if the source fails to compile.
pub fn compile_to<W: Write + Seek>(source: &[u8], options: &CompileOptions, sink: W) -> Result<W> {
    let compiled = translate_source(source, options)?;
    write_tracks(&compiled.tracks, options, sink)
}

/// Compile the file at `input` into a new file at `output`.
///
/// The file is compiled in memory, written to a temporary file next to
/// `output` and renamed into place, so a failed compile or write leaves no
/// partial file behind.
pub fn compile_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &CompileOptions,
) -> Result<Compiled> {
    let source = fs::read(input.as_ref())?;
    let compiled = translate_source(&source, options)?;
    let bytes = write_tracks(&compiled.tracks, options, Cursor::new(Vec::new()))?.into_inner();
    persist(output.as_ref(), &bytes)?;

    #[cfg(feature = "tracing")]
    tracing::info!(
        input = %input.as_ref().display(),
        output = %output.as_ref().display(),
        tracks = compiled.tracks.len(),
        bytes = bytes.len(),
        "compiled"
    );
    Ok(compiled)
}

/// Replace `output` with `bytes` in one rename.
fn persist(output: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(output).map_err(|e| e.error)?;
    Ok(())
}

#[test]
fn smpte_timing_is_rejected() {
    use crate::file::SmpteFps;
    let options =
        CompileOptions::default().with_timing(Timing::new_smpte(SmpteFps::TwentyFive, 40));
    assert!(matches!(
        compile_with(b"c", &options),
        Err(Error::UnsupportedTiming(_))
    ));
}

#[test]
fn options_reach_the_header() {
    let options = CompileOptions::default()
        .with_ticks_per_quarter_note(96)
        .with_format(FormatType::SingleMultiChannel);
    let bytes = compile_with(b"c", &options).unwrap();
    assert_eq!(&bytes[8..14], [0, 0, 0, 1, 0, 96]);
    assert_eq!(&bytes[29..33], [0x00, 0x90, 60, 100]);
    // a quarter note later, under running status
    assert_eq!(&bytes[33..36], [0x60, 60, 0]);
}

#[test]
fn failed_compile_writes_nothing() {
    let mut sink = Cursor::new(Vec::new());
    assert!(compile_to(b"c x", &CompileOptions::default(), &mut sink).is_err());
    assert!(sink.get_ref().is_empty());
}
