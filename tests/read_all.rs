use mml2midi::{
    codec::{CodecErrorKind, TrackReader},
    compile::compile,
    file::chunk::ChunkReader,
};

fn loop_through(source: &[u8]) {
    let bytes = compile(source).unwrap();
    let mut chunks = ChunkReader::new(&bytes);

    let header = chunks.read_chunk().unwrap().unwrap();
    assert!(header.is_header());
    let declared = u16::from_be_bytes([header.data()[2], header.data()[3]]);

    let mut tracks = 0;
    while let Some(chunk) = chunks.read_chunk().unwrap() {
        assert!(chunk.is_track());
        tracks += 1;

        let mut reader = TrackReader::new(chunk.data());
        let mut last = None;
        loop {
            match reader.read_event() {
                Ok(Some(event)) => last = Some(event),
                Ok(None) => break,
                Err(e) => panic!("Error at {}, {:?}", reader.buffer_position(), e),
            }
        }
        let last = last.expect("empty track");
        assert!(last.meta_event().is_some_and(|m| m.is_end_of_track()));
    }
    assert_eq!(tracks, declared);
}

#[test]
fn read_scale() {
    loop_through(include_bytes!("../test-asset/Scale.mml"))
}

#[test]
fn read_canon() {
    loop_through(include_bytes!("../test-asset/Canon.mml"))
}

#[test]
fn read_macros() {
    loop_through(include_bytes!("../test-asset/Macros.mml"))
}

#[test]
fn read_drums() {
    loop_through(include_bytes!("../test-asset/Drums.mml"))
}

#[test]
fn read_damaged() {
    let bytes = compile(include_bytes!("../test-asset/Canon.mml")).unwrap();
    let mut chunks = ChunkReader::new(&bytes);
    chunks.read_chunk().unwrap();
    let track = chunks.read_chunk().unwrap().unwrap();

    // cut the track in the middle of its last event
    let data = &track.data()[..track.data().len() - 2];
    let mut reader = TrackReader::new(data);
    loop {
        match reader.read_event() {
            Ok(Some(_)) => {}
            Ok(None) => panic!("Corrupted track should not have read to the end"),
            Err(e) => {
                assert_eq!(e.error_kind(), &CodecErrorKind::OutOfBounds);
                return;
            }
        }
    }
}
