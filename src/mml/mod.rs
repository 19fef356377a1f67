//! The macro language front end: [`lexer`] turns source bytes into
//! tokens, [`parser`] expands macros and loops into a flat [`event`]
//! sequence.

pub mod event;
pub mod lexer;
pub mod parser;

pub use event::*;
pub use lexer::{LexError, tokenize};
pub use parser::{ParseError, ParseWarning, Parsed, parse};
