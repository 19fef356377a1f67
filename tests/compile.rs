use mml2midi::prelude::*;
use pretty_assertions::assert_eq;

/// Events with the tick they fall on
fn ticked<'a>(track: &'a Track<'_>) -> Vec<(u64, &'a TrackEvent<'a>)> {
    let mut tick = 0;
    track
        .events()
        .iter()
        .map(|e| {
            tick += u64::from(e.delta_ticks());
            (tick, e)
        })
        .collect()
}

fn note_on(
    e: &(u64, &TrackEvent<'_>),
    accumulated_ticks: u64,
    channel: Channel,
    key: Key,
    octave: i8,
    vel: u8,
) {
    assert_eq!(e.0, accumulated_ticks);
    let cv = e.1.channel_event().expect("channel event");
    assert_eq!(cv.channel(), channel);
    let VoiceEvent::NoteOn { note, velocity } = cv.event() else {
        panic!("expected note on, got {:?}", cv.event());
    };
    assert_eq!(note.pitch_class(), key.semitone());
    assert_eq!(note.octave(), octave);
    assert_eq!(velocity.value(), vel);
}

fn note_off(e: &(u64, &TrackEvent<'_>), accumulated_ticks: u64, channel: Channel, key: Key, octave: i8) {
    note_on(e, accumulated_ticks, channel, key, octave, 0);
}

fn tempo(e: &(u64, &TrackEvent<'_>), accumulated_ticks: u64, bpm: u32) {
    assert_eq!(e.0, accumulated_ticks);
    let tempo = e.1.meta_event().and_then(MetaEvent::as_tempo).expect("tempo");
    assert_eq!(tempo.bpm(), bpm);
}

fn end_of_track(e: &(u64, &TrackEvent<'_>), accumulated_ticks: u64) {
    assert_eq!(e.0, accumulated_ticks);
    assert!(e.1.meta_event().is_some_and(MetaEvent::is_end_of_track));
}

#[test]
fn quarter_note_file_bytes() {
    let bytes = compile(b"t120 o4 c4;").unwrap();
    let expected = [
        b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 1, 0, 1, 0x01, 0xE0, //
        b'M', b'T', b'r', b'k', 0, 0, 0, 26, //
        0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, //
        0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, //
        0x00, 0x90, 60, 100, //
        0x83, 0x60, 60, 0, //
        0x00, 0xFF, 0x2F, 0x00,
    ];
    assert_eq!(bytes, expected);
}

#[test]
fn scale() {
    let bytes = compile(include_bytes!("../test-asset/Scale.mml")).unwrap();
    let file = MidiFile::parse(&bytes).unwrap();
    assert_eq!(file.tracks().len(), 1);

    let events = ticked(&file.tracks()[0]);
    assert_eq!(events.len(), 2 + 8 * 2 + 1);
    tempo(&events[0], 0, 120);
    tempo(&events[1], 0, 96);

    use Channel::One;
    let keys = [Key::C, Key::D, Key::E, Key::F, Key::G, Key::A, Key::B];
    for (i, key) in keys.into_iter().enumerate() {
        let start = 240 * i as u64;
        note_on(&events[2 + 2 * i], start, One, key, 4, 100);
        note_off(&events[3 + 2 * i], start + 240, One, key, 4);
    }
    note_on(&events[16], 1680, One, Key::C, 5, 100);
    note_off(&events[17], 2160, One, Key::C, 5);
    end_of_track(&events[18], 2160);
}

#[test]
fn loops_and_macros_across_tracks() {
    let source = b"!up{ c > c < }\n[ @up : r ]2 ;\nv64 o3 @up ;";
    let bytes = compile(source).unwrap();
    let file = MidiFile::parse(&bytes).unwrap();
    assert_eq!(file.header().num_tracks(), 2);

    use Channel::*;
    let first = ticked(&file.tracks()[0]);
    note_on(&first[1], 0, One, Key::C, 4, 100);
    note_off(&first[2], 480, One, Key::C, 4);
    note_on(&first[3], 480, One, Key::C, 5, 100);
    note_off(&first[4], 960, One, Key::C, 5);
    // the rest between the repetitions
    note_on(&first[5], 1440, One, Key::C, 4, 100);
    note_off(&first[8], 2400, One, Key::C, 5);
    end_of_track(&first[9], 2400);

    let second = ticked(&file.tracks()[1]);
    note_on(&second[1], 0, Two, Key::C, 3, 64);
    note_on(&second[3], 480, Two, Key::C, 4, 64);
    end_of_track(&second[5], 960);
}

#[test]
fn later_tracks_use_later_channels() {
    let bytes = compile(include_bytes!("../test-asset/Drums.mml")).unwrap();
    let file = MidiFile::parse(&bytes).unwrap();
    assert_eq!(file.tracks().len(), 10);

    let drums = ticked(&file.tracks()[9]);
    // tempo, tempo, 8 * 4 notes, end of track
    assert_eq!(drums.len(), 2 + 8 * 4 * 2 + 1);
    note_on(&drums[2], 0, Channel::Ten, Key::C, 2, 100);
    note_on(&drums[6], 480, Channel::Ten, Key::D, 2, 100);
    end_of_track(drums.last().unwrap(), 8 * 4 * 240);
}

#[test]
fn running_status_shrinks_tracks() {
    let bytes = compile(b"cdefgab").unwrap();
    let file = MidiFile::parse(&bytes).unwrap();
    let track_len = u32::from_be_bytes(bytes[18..22].try_into().unwrap()) as usize;

    let explicit: usize = file.tracks()[0]
        .events()
        .iter()
        .map(TrackEvent::encoded_len)
        .sum();
    // all but the first channel event drop their status byte
    assert_eq!(track_len, explicit - 13);
}

#[test]
fn warnings_are_reported() {
    let compiled =
        mml2midi::compile::translate_source(include_bytes!("../test-asset/Macros.mml"), &Default::default())
            .unwrap();
    assert_eq!(
        compiled.warnings,
        [ParseWarning::Redefinition {
            name: "riff2".into(),
            offset: 52,
        }]
    );
}

#[test]
fn errors_carry_offsets() {
    let Err(Error::Lex(e)) = compile(b"c d\n  H") else {
        panic!("expected a lex error");
    };
    assert_eq!(e.offset, 6);

    let Err(Error::Parse(e)) = compile(b"c [d e") else {
        panic!("expected a parse error");
    };
    assert_eq!(e.offset(), Some(6));

    assert!(matches!(compile(b""), Err(Error::Parse(ParseError::EmptyInput))));
    assert!(matches!(
        compile(b"c t0 d"),
        Err(Error::Translate(TranslateError::ZeroTempo { track: 0 }))
    ));
}

#[test]
fn nested_loops_fail_instead_of_exhausting_memory() {
    let Err(Error::Parse(e)) = compile(b"[[[[c]1000]1000]1000]1000;") else {
        panic!("expected a parse error");
    };
    assert_eq!(e, ParseError::ExpansionTooLarge { offset: 1 });
    assert_eq!(e.offset(), Some(1));
}
