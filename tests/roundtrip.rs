use mml2midi::{compile::translate_source, prelude::*};
use pretty_assertions::assert_eq;

fn round_trip(source: &[u8]) {
    let options = CompileOptions::default();
    let compiled = translate_source(source, &options).unwrap();
    let bytes = compile_with(source, &options).unwrap();

    let file = MidiFile::parse(&bytes).unwrap();
    assert_eq!(file.format_type(), FormatType::Simultaneous);
    assert_eq!(file.timing(), Timing::default());
    assert_eq!(
        file.header().num_tracks() as usize,
        compiled.tracks.len()
    );
    assert_eq!(file.tracks(), compiled.tracks.as_slice());
}

#[test]
fn two_tracks_with_macros() {
    round_trip(b"!a{ c8 e8 g8 } t90 [ @a : r8 ]3 ; !b{ > c2 < } v20 @b @b ;");
}

#[test]
fn canon() {
    round_trip(include_bytes!("../test-asset/Canon.mml"));
}

#[test]
fn macros() {
    round_trip(include_bytes!("../test-asset/Macros.mml"));
}

#[test]
fn drums() {
    round_trip(include_bytes!("../test-asset/Drums.mml"));
}

#[test]
fn format_and_division_survive() {
    let options = CompileOptions::default()
        .with_ticks_per_quarter_note(96)
        .with_format(FormatType::SequentiallyIndependent);
    let bytes = compile_with(b"c;d;e", &options).unwrap();
    let file = MidiFile::parse(&bytes).unwrap();
    assert_eq!(file.format_type(), FormatType::SequentiallyIndependent);
    assert_eq!(file.timing().ticks_per_quarter_note(), Some(96));
    assert_eq!(file.tracks().len(), 3);
    for track in file.tracks() {
        assert_eq!(track.duration_ticks(), 96);
    }
}

#[test]
fn decoding_with_running_status_matches_explicit_status() {
    let bytes = compile(include_bytes!("../test-asset/Canon.mml")).unwrap();
    let file = MidiFile::parse(&bytes).unwrap();

    for track in file.tracks() {
        let mut explicit = Vec::new();
        for event in track.events() {
            event.write_into(&mut explicit, false);
        }
        let decoded = TrackReader::new(&explicit).read_all().unwrap();
        assert_eq!(decoded.as_slice(), track.events());
    }
}
