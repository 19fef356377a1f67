use thiserror::Error;

use crate::{
    codec::CodecError,
    file::{Timing, WriteError},
    mml::{LexError, ParseError},
    translate::TranslateError,
};

/// Any failure of a compile.
#[derive(Debug, Error)]
pub enum Error {
    /// The source contains a character that starts no token
    #[error(transparent)]
    Lex(#[from] LexError),
    /// The tokens do not form a valid program
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The events cannot be turned into tracks
    #[error(transparent)]
    Translate(#[from] TranslateError),
    /// Decoding MIDI bytes failed
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Writing the file failed
    #[error(transparent)]
    Write(#[from] WriteError),
    /// Reading the source or creating the output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Durations can only be computed against ticks per quarter note
    #[error("Cannot compile against SMPTE timing {0:?}")]
    UnsupportedTiming(Timing),
}

/// The crate result type (see [`Error`])
pub type Result<T> = core::result::Result<T, Error>;
