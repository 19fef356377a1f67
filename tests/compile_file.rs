use std::fs;

use mml2midi::prelude::*;

#[test]
fn writes_the_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("canon.mml");
    let output = dir.path().join("canon.mid");
    fs::write(&input, include_bytes!("../test-asset/Canon.mml")).unwrap();

    let compiled = compile_file(&input, &output, &CompileOptions::default()).unwrap();
    assert_eq!(compiled.tracks.len(), 3);
    assert!(compiled.warnings.is_empty());

    let written = fs::read(&output).unwrap();
    assert_eq!(written, compile(include_bytes!("../test-asset/Canon.mml")).unwrap());
}

#[test]
fn failed_compile_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.mml");
    let output = dir.path().join("broken.mid");
    fs::write(&input, "c d [e f").unwrap();

    let err = compile_file(&input, &output, &CompileOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        Error::Parse(ParseError::ExpectedClosingBracket { .. })
    ));
    assert!(!output.exists());
}

#[test]
fn missing_input_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = compile_file(
        dir.path().join("nope.mml"),
        dir.path().join("nope.mid"),
        &CompileOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn existing_output_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("a.mml");
    let output = dir.path().join("a.mid");
    fs::write(&input, "c").unwrap();
    fs::write(&output, vec![0xAA; 4096]).unwrap();

    compile_file(&input, &output, &CompileOptions::default()).unwrap();
    let file_bytes = fs::read(&output).unwrap();
    let file = MidiFile::parse(&file_bytes).unwrap();
    assert_eq!(file.tracks().len(), 1);
}

#[test]
fn only_the_output_is_left_in_the_directory() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scale.mml");
    let output = dir.path().join("scale.mid");
    fs::write(&input, include_bytes!("../test-asset/Scale.mml")).unwrap();

    compile_file(&input, &output, &CompileOptions::default()).unwrap();
    let mut names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    names.sort();
    assert_eq!(names, ["scale.mid", "scale.mml"]);
}

#[test]
fn unwritable_output_leaves_nothing_behind() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("a.mml");
    let output = dir.path().join("missing").join("a.mid");
    fs::write(&input, "c").unwrap();

    let err = compile_file(&input, &output, &CompileOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert!(!output.exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}
