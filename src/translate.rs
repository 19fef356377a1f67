#![doc = r#"
Turns an [`Event`] sequence into MIDI tracks

Each [`Event::EndOfTrack`] closes a track; the next one starts on the
next channel with every setting back at its default. A track always
begins with a tempo event and ends with an end-of-track event:

```text
c8 e8 ;   ->   0 tempo 500000
               0 note-on  c4 100
             240 note-on  c4 0
               0 note-on  e4 100
             240 note-on  e4 0
               0 end-of-track
```
"#]

use thiserror::Error;

use crate::{
    codec::{Channel, ChannelEvent, MetaEvent, TrackEvent, TrackMessage},
    file::Track,
    mml::{Command, Control, Event, NoteEvent, Pitch},
    note::Note,
    tempo::Tempo,
};

/// Failures while translating events.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TranslateError {
    /// `t0`
    #[error("Tempo of 0 beats per minute in track {track}")]
    ZeroTempo {
        /// Zero based track index
        track: usize,
    },
    /// The gap between two events does not fit a delta-time
    #[error("Gap of {ticks} ticks in track {track} is too long")]
    DeltaTooLarge {
        /// Zero based track index
        track: usize,
        /// The gap
        ticks: u64,
    },
}

/// The state every track starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TranslatorConfig {
    /// Resolution of a quarter note
    pub ticks_per_quarter_note: u16,
    /// Tempo written at the start of each track
    pub tempo: Tempo,
    /// Starting octave
    pub octave: i32,
    /// Starting default length denominator
    pub length: u32,
    /// Starting note-on velocity
    pub velocity: u8,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            ticks_per_quarter_note: 480,
            tempo: Tempo::DEFAULT,
            octave: 4,
            length: 4,
            velocity: 100,
        }
    }
}

impl TranslatorConfig {
    /// Set the resolution
    pub const fn with_ticks_per_quarter_note(mut self, tpqn: u16) -> Self {
        self.ticks_per_quarter_note = tpqn;
        self
    }
}

/// Ticks taken by a note of `1/length`, extended by `dots` halvings.
///
/// A `length` of 0 lasts no time at all.
pub const fn note_duration(length: u32, dots: u32, ticks_per_quarter_note: u16) -> u32 {
    if length == 0 {
        return 0;
    }
    let base = 4 * ticks_per_quarter_note as u32 / length;
    let mut total = base;
    let mut add = base;
    let mut i = 0;
    while i < dots {
        add /= 2;
        if add == 0 {
            break;
        }
        total += add;
        i += 1;
    }
    total
}

#[doc = r#"
Translates an event sequence into one [`Track`] per channel.

At most sixteen tracks are produced; events past the sixteenth
[`Event::EndOfTrack`] are dropped.

# Example
```rust
# use mml2midi::prelude::*;
let events = [
    Event::from(NoteEvent::new(Pitch::Key(Key::A))),
    Event::EndOfTrack,
];
let tracks = Translator::default().translate(&events).unwrap();
let note_on = tracks[0].events()[1].channel_event().unwrap();
assert_eq!(note_on.status(), 0x90);
assert_eq!(note_on.to_bytes(), [0x90, 69, 100]);
```
"#]
#[derive(Debug, Clone, Copy, Default)]
pub struct Translator {
    config: TranslatorConfig,
}

impl Translator {
    /// A translator starting every track from `config`
    pub const fn new(config: TranslatorConfig) -> Self {
        Self { config }
    }

    /// The configuration
    pub const fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Translate the whole sequence.
    pub fn translate(&self, events: &[Event]) -> Result<Vec<Track<'static>>, TranslateError> {
        let mut tracks = Vec::new();
        let mut rest = events;

        while !rest.is_empty() {
            let index = tracks.len();
            let Some(channel) = u8::try_from(index).ok().and_then(Channel::try_from_index) else {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    dropped_events = rest.len(),
                    "no MIDI channel left, dropping the remaining tracks"
                );
                break;
            };

            let end = rest
                .iter()
                .position(|e| matches!(e, Event::EndOfTrack))
                .map_or(rest.len(), |i| i + 1);
            let (body, tail) = rest.split_at(end);
            rest = tail;

            let mut state = TrackState::new(&self.config, index, channel);
            state.run(body)?;
            let track = state.finish()?;

            #[cfg(feature = "tracing")]
            tracing::debug!(
                track = index,
                channel = channel.index(),
                events = track.events().len(),
                ticks = track.duration_ticks(),
                "translated track"
            );
            tracks.push(track);
        }

        Ok(tracks)
    }
}

/// A note of the current batch.
#[derive(Debug, Clone, Copy)]
struct BatchNote {
    note: Note,
    tie: bool,
}

/// Per track state, reset at the start of every track.
#[derive(Debug)]
struct TrackState {
    index: usize,
    channel: Channel,
    ticks_per_quarter_note: u16,
    length: u32,
    octave: i32,
    velocity: u8,
    current_tick: u64,
    last_tick: u64,
    active: [bool; 128],
    events: Vec<TrackEvent<'static>>,
}

impl TrackState {
    fn new(config: &TranslatorConfig, index: usize, channel: Channel) -> Self {
        let mut state = Self {
            index,
            channel,
            ticks_per_quarter_note: config.ticks_per_quarter_note,
            length: config.length,
            octave: config.octave,
            velocity: config.velocity,
            current_tick: 0,
            last_tick: 0,
            active: [false; 128],
            events: Vec::new(),
        };
        state.events.push(TrackEvent::new(0, MetaEvent::tempo(config.tempo)));
        state
    }

    /// Push a message at the current tick.
    fn emit(&mut self, message: impl Into<TrackMessage<'static>>) -> Result<(), TranslateError> {
        let ticks = self.current_tick - self.last_tick;
        let delta = u32::try_from(ticks).map_err(|_| TranslateError::DeltaTooLarge {
            track: self.index,
            ticks,
        })?;
        self.events.push(TrackEvent::new(delta, message));
        self.last_tick = self.current_tick;
        Ok(())
    }

    fn run(&mut self, events: &[Event]) -> Result<(), TranslateError> {
        let mut i = 0;
        while let Some(event) = events.get(i) {
            match event {
                Event::EndOfTrack => return Ok(()),
                Event::Control(control) => {
                    self.control(*control)?;
                    i += 1;
                }
                Event::Note(_) => {
                    let notes = events[i..]
                        .iter()
                        .map_while(|e| match e {
                            Event::Note(n) => Some(n),
                            _ => None,
                        });
                    let mut batch = Vec::new();
                    let mut duration = 0;
                    for note in notes {
                        i += 1;
                        if let Pitch::Key(key) = note.pitch {
                            batch.push(BatchNote {
                                note: Note::from_key(key, note.accidental, self.octave),
                                tie: note.tie,
                            });
                        }
                        if !note.chord {
                            duration = self.duration(note);
                            break;
                        }
                    }
                    self.step(&batch, duration)?;
                }
            }
        }
        Ok(())
    }

    fn duration(&self, note: &NoteEvent) -> u32 {
        let length = if note.length == 0 {
            self.length
        } else {
            note.length
        };
        note_duration(length, note.dots, self.ticks_per_quarter_note)
    }

    /// Sound a batch of notes for `duration` ticks.
    fn step(&mut self, batch: &[BatchNote], duration: u32) -> Result<(), TranslateError> {
        for n in batch {
            let key = n.note.byte() as usize;
            if !self.active[key] {
                self.emit(ChannelEvent::note_on(self.channel, n.note, self.velocity))?;
                self.active[key] = true;
            }
        }

        self.current_tick += u64::from(duration);

        for n in batch.iter().filter(|n| !n.tie) {
            self.emit(ChannelEvent::note_on(self.channel, n.note, 0))?;
            self.active[n.note.byte() as usize] = false;
        }
        Ok(())
    }

    fn control(&mut self, control: Control) -> Result<(), TranslateError> {
        let value = control.value;
        match control.command {
            Command::Tempo => {
                let tempo =
                    Tempo::from_bpm(value).ok_or(TranslateError::ZeroTempo { track: self.index })?;
                #[cfg(feature = "tracing")]
                {
                    if Tempo::bpm_is_clamped(value) {
                        tracing::warn!(bpm = value, "tempo too slow, clamped to {tempo}");
                    }
                }
                // written at delta 0, leaving the time base of the next
                // channel event untouched
                self.events.push(TrackEvent::new(0, MetaEvent::tempo(tempo)));
            }
            Command::Octave => self.octave = i32::try_from(value).unwrap_or(i32::MAX),
            Command::OctaveDown => self.octave = self.octave.saturating_sub(1),
            Command::OctaveUp => self.octave = self.octave.saturating_add(1),
            Command::Length => self.length = value,
            Command::Velocity => self.velocity = (value % 127) as u8,
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Track<'static>, TranslateError> {
        self.emit(MetaEvent::end_of_track())?;
        Ok(Track::new(self.events))
    }
}

#[cfg(test)]
fn translate_str(source: &str) -> Vec<Track<'static>> {
    let tokens = crate::mml::tokenize(source.as_bytes()).unwrap();
    let parsed = crate::mml::parse(&tokens, source.as_bytes()).unwrap();
    Translator::default().translate(&parsed.events).unwrap()
}

#[cfg(test)]
fn tempo(delta: u32, micros: u32) -> TrackEvent<'static> {
    TrackEvent::new(delta, MetaEvent::tempo(Tempo::new(micros)))
}

#[cfg(test)]
fn note(delta: u32, channel: Channel, key: u8, velocity: u8) -> TrackEvent<'static> {
    TrackEvent::new(
        delta,
        ChannelEvent::note_on(channel, Note::from_databyte_unchecked(key), velocity),
    )
}

#[cfg(test)]
fn eot(delta: u32) -> TrackEvent<'static> {
    TrackEvent::new(delta, MetaEvent::end_of_track())
}

#[test]
fn single_quarter_note() {
    use pretty_assertions::assert_eq;
    let tracks = translate_str("t120 o4 c4;");
    assert_eq!(tracks.len(), 1);
    assert_eq!(
        tracks[0].events(),
        [
            tempo(0, 500_000),
            tempo(0, 500_000),
            note(0, Channel::One, 60, 100),
            note(480, Channel::One, 60, 0),
            eot(0),
        ]
    );
}

#[test]
fn durations() {
    assert_eq!(note_duration(4, 0, 480), 480);
    assert_eq!(note_duration(8, 1, 480), 360);
    assert_eq!(note_duration(2, 2, 480), 960 + 480 + 240);
    assert_eq!(note_duration(0, 3, 480), 0);
    assert_eq!(note_duration(3, 0, 480), 640);
    // halving stops once nothing is left to add
    assert_eq!(note_duration(1, u32::MAX, 1), 4 + 2 + 1);
}

#[test]
fn rests_and_default_length() {
    use pretty_assertions::assert_eq;
    let tracks = translate_str("l8 r d r4. e16");
    assert_eq!(
        tracks[0].events(),
        [
            tempo(0, 500_000),
            note(240, Channel::One, 62, 100),
            note(240, Channel::One, 62, 0),
            note(720, Channel::One, 64, 100),
            note(120, Channel::One, 64, 0),
            eot(0),
        ]
    );
}

#[test]
fn trailing_rest_lands_on_end_of_track() {
    let tracks = translate_str("c r2");
    assert_eq!(tracks[0].events().last(), Some(&eot(960)));
}

#[test]
fn octave_and_velocity_commands() {
    let tracks = translate_str("o2 > c < < c- v130 o9 b+");
    let notes: Vec<_> = tracks[0]
        .events()
        .iter()
        .filter_map(TrackEvent::channel_event)
        .map(|c| c.to_bytes())
        .step_by(2)
        .collect();
    assert_eq!(notes, [[0x90u8, 48, 100], [0x90, 23, 100], [0x90, 127, 3]]);
}

#[test]
fn tracks_take_successive_channels_and_reset_state() {
    let tracks = translate_str("o5 l8 v10 c; c");
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].events()[1], note(0, Channel::One, 72, 10));
    assert_eq!(tracks[0].events()[2], note(240, Channel::One, 72, 0));
    assert_eq!(tracks[1].events()[1], note(0, Channel::Two, 60, 100));
    assert_eq!(tracks[1].events()[2], note(480, Channel::Two, 60, 0));
}

#[test]
fn empty_tracks() {
    let tracks = translate_str(";;");
    assert_eq!(tracks.len(), 2);
    for track in &tracks {
        assert_eq!(track.events(), [tempo(0, 500_000), eot(0)]);
    }
    assert!(Translator::default().translate(&[]).unwrap().is_empty());
}

#[test]
fn at_most_sixteen_tracks() {
    let tracks = translate_str(&"c;".repeat(20));
    assert_eq!(tracks.len(), 16);
    let last = tracks[15].events()[1].channel_event().unwrap();
    assert_eq!(last.channel(), Channel::Sixteen);
}

#[test]
fn tempo_commands() {
    let tracks = translate_str("c t60 d t1");
    let events = tracks[0].events();
    assert_eq!(events[3], tempo(0, 1_000_000));
    assert_eq!(events[6], tempo(0, Tempo::MAX_MICROS));

    let events = [Event::from(Control::new(Command::Tempo, 0))];
    let err = Translator::default().translate(&events).unwrap_err();
    assert_eq!(err, TranslateError::ZeroTempo { track: 0 });
}

#[test]
fn chords_share_one_duration() {
    use crate::note::Key;
    use pretty_assertions::assert_eq;
    let chord = |key| Event::from(NoteEvent::new(Pitch::Key(key)).with_chord(true));
    let events = [
        chord(Key::C),
        chord(Key::E),
        NoteEvent::new(Pitch::Key(Key::G)).with_length(2).into(),
        Event::EndOfTrack,
    ];
    let tracks = Translator::default().translate(&events).unwrap();
    assert_eq!(
        tracks[0].events(),
        [
            tempo(0, 500_000),
            note(0, Channel::One, 60, 100),
            note(0, Channel::One, 64, 100),
            note(0, Channel::One, 67, 100),
            note(960, Channel::One, 60, 0),
            note(0, Channel::One, 64, 0),
            note(0, Channel::One, 67, 0),
            eot(0),
        ]
    );
}

#[test]
fn tied_notes_keep_sounding() {
    use crate::note::Key;
    use pretty_assertions::assert_eq;
    let c = NoteEvent::new(Pitch::Key(Key::C));
    let events = [
        Event::from(c.with_tie(true)),
        c.into(),
        NoteEvent::new(Pitch::Key(Key::D)).into(),
    ];
    let tracks = Translator::default().translate(&events).unwrap();
    assert_eq!(
        tracks[0].events(),
        [
            tempo(0, 500_000),
            note(0, Channel::One, 60, 100),
            // the second c is already sounding, so only its release is written
            note(960, Channel::One, 60, 0),
            note(0, Channel::One, 62, 100),
            note(480, Channel::One, 62, 0),
            eot(0),
        ]
    );
}

#[test]
fn chord_with_a_sounding_note_keeps_the_delta() {
    use crate::note::Key;
    let c = NoteEvent::new(Pitch::Key(Key::C));
    let events = [
        Event::from(c.with_tie(true)),
        NoteEvent::new(Pitch::Rest).into(),
        c.with_chord(true).into(),
        NoteEvent::new(Pitch::Key(Key::E)).into(),
    ];
    let tracks = Translator::default().translate(&events).unwrap();
    // the e starts after the tied c and the rest
    assert_eq!(tracks[0].events()[2], note(960, Channel::One, 64, 100));
    assert_eq!(tracks[0].events()[3], note(480, Channel::One, 60, 0));
}
