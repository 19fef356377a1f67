#![doc = r#"
Recursive descent parser for the macro language

```text
sequence   := ( ";" | track )* EOF
track      := ( definition | action )*          up to ";" or EOF
action     := note | control | loop | expansion
note       := LETTER ( "+" | "-" )? NUMBER? "."*
control    := COMMAND NUMBER?
loop       := "[" action* ( ":" action* )? "]" NUMBER
definition := "!name" "{" action* "}"
expansion  := "@name"
```

Macros and loops are expanded while parsing, so the resulting
[`Event`] sequence contains only notes, controls and track ends.
"#]

use core::fmt;

use thiserror::Error;

use crate::mml::{
    event::{Command, Control, Event, NoteEvent, Pitch},
    lexer::{Token, TokenKind},
};

mod macros;
pub use macros::*;

/// The longest event sequence loop unrolling and macro expansion may build.
pub const MAX_EVENTS: usize = 1 << 20;

/// How many events a whole parse may copy while unrolling loops and
/// splicing macros, counting copies into definitions and loop bodies.
pub const MAX_EXPANDED_EVENTS: usize = 4 * MAX_EVENTS;

/// Where an unexpected token was met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Directly inside a track
    Track,
    /// Between `[` and `:` or `]`
    LoopBody,
    /// Between `:` and `]`
    LoopBreak,
    /// Between `{` and `}` of a definition
    Definition,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Track => "track body",
            Self::LoopBody => "loop body",
            Self::LoopBreak => "loop break",
            Self::Definition => "macro definition",
        })
    }
}

/// A fatal parse failure. Offsets are bytes into the source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A token that cannot start an action in this scope
    #[error("Unexpected {kind} in {scope} at byte {offset}")]
    UnexpectedToken {
        /// The token found
        kind: TokenKind,
        /// Where it starts
        offset: usize,
        /// The construct being parsed
        scope: Scope,
    },
    /// A loop was not closed with `]`
    #[error("Expected `]` to close the loop, found {kind} at byte {offset}")]
    ExpectedClosingBracket {
        /// The token found instead
        kind: TokenKind,
        /// Where it starts
        offset: usize,
    },
    /// `]` was not followed by a number
    #[error("Expected a repeat count after `]`, found {kind} at byte {offset}")]
    ExpectedRepeatCount {
        /// The token found instead
        kind: TokenKind,
        /// Where it starts
        offset: usize,
    },
    /// `!name` was not followed by `{`
    #[error("Expected `{{` after the macro name, found {kind} at byte {offset}")]
    ExpectedOpeningBrace {
        /// The token found instead
        kind: TokenKind,
        /// Where it starts
        offset: usize,
    },
    /// A definition body was not closed with `}`
    #[error("Expected `}}` to close the definition, found {kind} at byte {offset}")]
    ExpectedClosingBrace {
        /// The token found instead
        kind: TokenKind,
        /// Where it starts
        offset: usize,
    },
    /// A bare `@` or `!`
    #[error("Expected an identifier after the {kind} sigil at byte {offset}")]
    MissingIdentifier {
        /// [`TokenKind::Expansion`] or [`TokenKind::Definition`]
        kind: TokenKind,
        /// Where the sigil is
        offset: usize,
    },
    /// `@name` with no earlier `!name`
    #[error("Macro `{name}` is not defined (byte {offset})")]
    UndefinedMacro {
        /// The name, decoded lossily
        name: String,
        /// Where the expansion starts
        offset: usize,
    },
    /// A number that does not fit in 32 bits
    #[error("Number at byte {offset} is too large")]
    InvalidNumber {
        /// Where the number starts
        offset: usize,
    },
    /// Unrolling a loop or splicing a macro would grow an event sequence
    /// past [`MAX_EVENTS`], or the parse past [`MAX_EXPANDED_EVENTS`]
    #[error("Expansion at byte {offset} is too large")]
    ExpansionTooLarge {
        /// The `[` of the loop or the `@` of the expansion
        offset: usize,
    },
    /// The token stream holds nothing but the end of input
    #[error("Nothing to parse")]
    EmptyInput,
}

impl ParseError {
    /// The byte offset the error points at
    pub fn offset(&self) -> Option<usize> {
        use ParseError::*;
        match self {
            UnexpectedToken { offset, .. }
            | ExpectedClosingBracket { offset, .. }
            | ExpectedRepeatCount { offset, .. }
            | ExpectedOpeningBrace { offset, .. }
            | ExpectedClosingBrace { offset, .. }
            | MissingIdentifier { offset, .. }
            | UndefinedMacro { offset, .. }
            | InvalidNumber { offset }
            | ExpansionTooLarge { offset } => Some(*offset),
            EmptyInput => None,
        }
    }
}

/// Something suspicious that does not stop the parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// `!name{}`: nothing was stored
    EmptyDefinition {
        /// The macro name, decoded lossily
        name: String,
        /// Where the definition starts
        offset: usize,
    },
    /// A macro was defined again; the new body replaced the old one
    Redefinition {
        /// The macro name, decoded lossily
        name: String,
        /// Where the new definition starts
        offset: usize,
    },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDefinition { name, offset } => {
                write!(f, "empty definition `{name}` at byte {offset}")
            }
            Self::Redefinition { name, offset } => {
                write!(f, "macro `{name}` redefined at byte {offset}")
            }
        }
    }
}

/// The result of a successful parse.
#[derive(Debug, Clone, Default)]
pub struct Parsed {
    /// The fully expanded event sequence
    pub events: Vec<Event>,
    /// Non fatal diagnostics, in source order
    pub warnings: Vec<ParseWarning>,
    /// Every macro defined by the source
    pub macros: MacroTable,
}

/// Parse a token stream produced from `source`.
///
/// ```rust
/// # use mml2midi::mml::{lexer::tokenize, parser::parse};
/// # use mml2midi::prelude::*;
/// let source = b"!x{ c e }[@x : r]2;";
/// let parsed = parse(&tokenize(source).unwrap(), source).unwrap();
/// assert_eq!(parsed.events.len(), 6);
/// assert_eq!(parsed.events[2], Event::from(NoteEvent::new(Pitch::Rest)));
/// assert_eq!(parsed.events[5], Event::EndOfTrack);
/// ```
pub fn parse(tokens: &[Token], source: &[u8]) -> Result<Parsed, ParseError> {
    Parser::new(tokens, source).parse()
}

/// Holds the cursor and macro table of one parse.
#[derive(Debug)]
pub struct Parser<'t, 's> {
    tokens: &'t [Token],
    source: &'s [u8],
    position: usize,
    macros: MacroTable,
    warnings: Vec<ParseWarning>,
    expanded: usize,
}

impl<'t, 's> Parser<'t, 's> {
    /// A parser at the first token
    pub fn new(tokens: &'t [Token], source: &'s [u8]) -> Self {
        Self {
            tokens,
            source,
            position: 0,
            macros: MacroTable::default(),
            warnings: Vec::new(),
            expanded: 0,
        }
    }

    /// Parse the whole token stream.
    pub fn parse(mut self) -> Result<Parsed, ParseError> {
        if self.peek().kind == TokenKind::Eof {
            return Err(ParseError::EmptyInput);
        }

        let mut events = Vec::new();
        loop {
            match self.peek().kind {
                TokenKind::Eof => break,
                TokenKind::Semicolon => {
                    self.advance();
                    events.push(Event::EndOfTrack);
                }
                _ => self.track(&mut events)?,
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            events = events.len(),
            macros = self.macros.len(),
            "parsed event sequence"
        );

        Ok(Parsed {
            events,
            warnings: self.warnings,
            macros: self.macros,
        })
    }

    /// The current token. A stream missing its final `Eof` behaves as if
    /// it had one.
    fn peek(&self) -> Token {
        self.tokens
            .get(self.position)
            .copied()
            .unwrap_or(Token::new(TokenKind::Eof, self.source.len(), 0))
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn text(&self, token: &Token) -> &'s [u8] {
        self.source
            .get(token.span.offset..token.span.end())
            .unwrap_or_default()
    }

    fn unexpected(&self, scope: Scope) -> ParseError {
        let token = self.peek();
        ParseError::UnexpectedToken {
            kind: token.kind,
            offset: token.span.offset,
            scope,
        }
    }

    /// Consume a number token if there is one.
    fn optional_number(&mut self) -> Result<Option<u32>, ParseError> {
        if !self.check(TokenKind::Number) {
            return Ok(None);
        }
        let token = self.advance();
        decimal(self.text(&token))
            .map(Some)
            .ok_or(ParseError::InvalidNumber {
                offset: token.span.offset,
            })
    }

    fn track(&mut self, out: &mut Vec<Event>) -> Result<(), ParseError> {
        loop {
            match self.peek().kind {
                TokenKind::Eof | TokenKind::Semicolon => return Ok(()),
                TokenKind::Definition => self.definition()?,
                _ => {
                    if !self.action(out)? {
                        return Err(self.unexpected(Scope::Track));
                    }
                }
            }
        }
    }

    /// Parse one action into `out`. Returns false, consuming nothing, if the
    /// current token starts none.
    fn action(&mut self, out: &mut Vec<Event>) -> Result<bool, ParseError> {
        match self.peek().kind {
            TokenKind::Note => self.note(out)?,
            TokenKind::Command => self.control(out)?,
            TokenKind::LBracket => self.repeat(out)?,
            TokenKind::Expansion => self.expansion(out)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Parse actions into `out` until one of `terminators` or the end of
    /// input.
    fn actions_until(
        &mut self,
        out: &mut Vec<Event>,
        terminators: &[TokenKind],
        scope: Scope,
    ) -> Result<(), ParseError> {
        loop {
            let kind = self.peek().kind;
            if kind == TokenKind::Eof || terminators.contains(&kind) {
                return Ok(());
            }
            if !self.action(out)? {
                return Err(self.unexpected(scope));
            }
        }
    }

    fn note(&mut self, out: &mut Vec<Event>) -> Result<(), ParseError> {
        let token = self.advance();
        let letter = self.text(&token).first().copied().unwrap_or_default();
        let Some(pitch) = Pitch::from_letter(letter) else {
            return Err(ParseError::UnexpectedToken {
                kind: token.kind,
                offset: token.span.offset,
                scope: Scope::Track,
            });
        };

        let accidental = match self.peek().kind {
            TokenKind::Plus => 1,
            TokenKind::Minus => -1,
            _ => 0,
        };
        if accidental != 0 {
            self.advance();
        }

        let length = self.optional_number()?.unwrap_or(0);

        let mut dots = 0;
        while self.check(TokenKind::Dot) {
            self.advance();
            dots += 1;
        }

        out.push(
            NoteEvent::new(pitch)
                .with_accidental(accidental)
                .with_length(length)
                .with_dots(dots)
                .into(),
        );
        Ok(())
    }

    fn control(&mut self, out: &mut Vec<Event>) -> Result<(), ParseError> {
        let token = self.advance();
        let letter = self.text(&token).first().copied().unwrap_or_default();
        let Ok(command) = Command::try_from(letter) else {
            return Err(ParseError::UnexpectedToken {
                kind: token.kind,
                offset: token.span.offset,
                scope: Scope::Track,
            });
        };
        let value = self.optional_number()?.unwrap_or(0);
        out.push(Control::new(command, value).into());
        Ok(())
    }

    fn repeat(&mut self, out: &mut Vec<Event>) -> Result<(), ParseError> {
        let open = self.advance();

        let mut body = Vec::new();
        self.actions_until(
            &mut body,
            &[TokenKind::RBracket, TokenKind::Colon],
            Scope::LoopBody,
        )?;

        let mut exit = Vec::new();
        if self.check(TokenKind::Colon) {
            self.advance();
            self.actions_until(&mut exit, &[TokenKind::RBracket], Scope::LoopBreak)?;
        }

        let closing = self.peek();
        if closing.kind != TokenKind::RBracket {
            return Err(ParseError::ExpectedClosingBracket {
                kind: closing.kind,
                offset: closing.span.offset,
            });
        }
        self.advance();

        let count_token = self.peek();
        let Some(count) = self.optional_number()? else {
            return Err(ParseError::ExpectedRepeatCount {
                kind: count_token.kind,
                offset: count_token.span.offset,
            });
        };

        let count = count as usize;
        let added = body.len().checked_mul(count).and_then(|n| {
            exit.len()
                .checked_mul(count.saturating_sub(1))
                .and_then(|m| n.checked_add(m))
        });
        self.reserve(out, added, open.span.offset)?;

        for i in 0..count {
            out.extend_from_slice(&body);
            if i + 1 < count {
                out.extend_from_slice(&exit);
            }
        }
        Ok(())
    }

    /// The name after a `@` or `!` sigil.
    fn identifier(&self, token: &Token) -> Result<&'s [u8], ParseError> {
        match self.text(token).get(1..) {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(ParseError::MissingIdentifier {
                kind: token.kind,
                offset: token.span.offset,
            }),
        }
    }

    fn definition(&mut self) -> Result<(), ParseError> {
        let token = self.advance();
        let name = self.identifier(&token)?;

        let open = self.peek();
        if open.kind != TokenKind::LBrace {
            return Err(ParseError::ExpectedOpeningBrace {
                kind: open.kind,
                offset: open.span.offset,
            });
        }
        self.advance();

        let mut body = Vec::new();
        self.actions_until(&mut body, &[TokenKind::RBrace], Scope::Definition)?;

        let close = self.peek();
        if close.kind != TokenKind::RBrace {
            return Err(ParseError::ExpectedClosingBrace {
                kind: close.kind,
                offset: close.span.offset,
            });
        }
        self.advance();

        let offset = token.span.offset;
        let display_name = String::from_utf8_lossy(name).into_owned();
        if body.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::warn!(name = %display_name, offset, "empty macro definition");
            self.warnings.push(ParseWarning::EmptyDefinition {
                name: display_name,
                offset,
            });
            return Ok(());
        }

        if self.macros.define(name, body).is_some() {
            #[cfg(feature = "tracing")]
            tracing::warn!(name = %display_name, offset, "macro redefined");
            self.warnings.push(ParseWarning::Redefinition {
                name: display_name,
                offset,
            });
        }
        Ok(())
    }

    fn expansion(&mut self, out: &mut Vec<Event>) -> Result<(), ParseError> {
        let token = self.advance();
        let name = self.identifier(&token)?;
        let len = self
            .macros
            .get(name)
            .map(<[Event]>::len)
            .ok_or_else(|| ParseError::UndefinedMacro {
                name: String::from_utf8_lossy(name).into_owned(),
                offset: token.span.offset,
            })?;
        self.reserve(out, Some(len), token.span.offset)?;
        if let Some(body) = self.macros.get(name) {
            out.extend_from_slice(body);
        }
        Ok(())
    }

    /// Make room for `added` more events in `out`, within [`MAX_EVENTS`]
    /// for `out` and [`MAX_EXPANDED_EVENTS`] for the parse. `None` means
    /// the count itself overflowed.
    fn reserve(
        &mut self,
        out: &mut Vec<Event>,
        added: Option<usize>,
        offset: usize,
    ) -> Result<(), ParseError> {
        let too_large = ParseError::ExpansionTooLarge { offset };
        let Some(added) = added.filter(|n| {
            n.checked_add(out.len())
                .is_some_and(|total| total <= MAX_EVENTS)
        }) else {
            return Err(too_large);
        };
        self.expanded = self
            .expanded
            .checked_add(added)
            .filter(|total| *total <= MAX_EXPANDED_EVENTS)
            .ok_or_else(|| too_large.clone())?;
        out.try_reserve(added).map_err(|_| too_large)
    }
}

/// Value of a run of ASCII digits, `None` on overflow.
fn decimal(digits: &[u8]) -> Option<u32> {
    digits.iter().try_fold(0u32, |acc, &b| {
        let digit = char::from(b).to_digit(10)?;
        acc.checked_mul(10)?.checked_add(digit)
    })
}

#[cfg(test)]
fn parse_str(source: &str) -> Result<Parsed, ParseError> {
    let tokens = crate::mml::lexer::tokenize(source.as_bytes()).unwrap();
    parse(&tokens, source.as_bytes())
}

#[cfg(test)]
fn events(source: &str) -> Vec<Event> {
    parse_str(source).unwrap().events
}

#[test]
fn macro_expands_in_place() {
    use pretty_assertions::assert_eq;
    assert_eq!(events("!x{cde}@x;"), events("cde;"));
    assert_eq!(events("!x{c} !y{@x d} @y @x"), events("cdc"));
}

#[test]
fn loop_break_goes_between_repetitions() {
    use pretty_assertions::assert_eq;
    assert_eq!(events("[cd:e]3;"), events("cdecdecd;"));
    assert_eq!(events("[c:d]1"), events("c"));
    assert_eq!(events("[c d]2"), events("c d c d"));
    assert_eq!(events("[[c]2 d]2"), events("ccdccd"));
}

#[test]
fn zero_repeat_count_emits_nothing() {
    assert_eq!(events("[c:d]0 e"), events("e"));
}

#[test]
fn note_fields() {
    use crate::note::Key;
    let parsed = events("c+8.. e- r16 g");
    assert_eq!(
        parsed,
        [
            Event::from(
                NoteEvent::new(Pitch::Key(Key::C))
                    .with_accidental(1)
                    .with_length(8)
                    .with_dots(2)
            ),
            NoteEvent::new(Pitch::Key(Key::E)).with_accidental(-1).into(),
            NoteEvent::new(Pitch::Rest).with_length(16).into(),
            NoteEvent::new(Pitch::Key(Key::G)).into(),
        ]
    );
}

#[test]
fn control_arguments_default_to_zero() {
    assert_eq!(
        events("t120 o v< >2"),
        [
            Event::from(Control::new(Command::Tempo, 120)),
            Control::new(Command::Octave, 0).into(),
            Control::new(Command::Velocity, 0).into(),
            Control::new(Command::OctaveDown, 0).into(),
            Control::new(Command::OctaveUp, 2).into(),
        ]
    );
}

#[test]
fn semicolons_split_tracks() {
    assert_eq!(
        events(";c;"),
        [
            Event::EndOfTrack,
            Event::from(NoteEvent::new(Pitch::from_letter(b'c').unwrap())),
            Event::EndOfTrack,
        ]
    );
}

#[test]
fn undefined_macros() {
    let undefined = |offset| ParseError::UndefinedMacro {
        name: "a".into(),
        offset,
    };
    assert_eq!(parse_str("c @a").unwrap_err(), undefined(2));
    // forward reference
    assert_eq!(parse_str("@a !a{c}").unwrap_err(), undefined(0));
    // self reference
    assert_eq!(parse_str("!a{c @a}").unwrap_err(), undefined(5));
}

#[test]
fn last_definition_wins() {
    let parsed = parse_str("!a{c} !a{d} @a").unwrap();
    assert_eq!(parsed.events, events("d"));
    assert_eq!(
        parsed.warnings,
        [ParseWarning::Redefinition {
            name: "a".into(),
            offset: 6
        }]
    );
}

#[test]
fn empty_definition_is_not_stored() {
    let parsed = parse_str("!a{} c").unwrap();
    assert_eq!(parsed.events, events("c"));
    assert!(parsed.macros.is_empty());
    assert_eq!(
        parsed.warnings,
        [ParseWarning::EmptyDefinition {
            name: "a".into(),
            offset: 0
        }]
    );
    assert!(matches!(
        parse_str("!a{} @a"),
        Err(ParseError::UndefinedMacro { .. })
    ));
}

#[test]
fn unclosed_constructs() {
    assert_eq!(
        parse_str("[cd").unwrap_err(),
        ParseError::ExpectedClosingBracket {
            kind: TokenKind::Eof,
            offset: 3
        }
    );
    assert_eq!(
        parse_str("[cd]e").unwrap_err(),
        ParseError::ExpectedRepeatCount {
            kind: TokenKind::Note,
            offset: 4
        }
    );
    assert_eq!(
        parse_str("!a c}").unwrap_err(),
        ParseError::ExpectedOpeningBrace {
            kind: TokenKind::Note,
            offset: 3
        }
    );
    assert_eq!(
        parse_str("!a{c").unwrap_err(),
        ParseError::ExpectedClosingBrace {
            kind: TokenKind::Eof,
            offset: 4
        }
    );
}

#[test]
fn unexpected_tokens_report_their_scope() {
    let scope_of = |source| match parse_str(source) {
        Err(ParseError::UnexpectedToken { scope, .. }) => Some(scope),
        _ => None,
    };
    assert_eq!(scope_of("c }"), Some(Scope::Track));
    assert_eq!(scope_of("c : d"), Some(Scope::Track));
    assert_eq!(scope_of("[c;]2"), Some(Scope::LoopBody));
    assert_eq!(scope_of("[c !x{d}]2"), Some(Scope::LoopBody));
    assert_eq!(scope_of("[c:d !x{e}]2"), Some(Scope::LoopBreak));
    assert_eq!(scope_of("!a{!b{c}}"), Some(Scope::Definition));

    assert_eq!(
        parse_str("c }").unwrap_err(),
        ParseError::UnexpectedToken {
            kind: TokenKind::RBrace,
            offset: 2,
            scope: Scope::Track
        }
    );
}

#[test]
fn missing_identifiers() {
    assert_eq!(
        parse_str("c @").unwrap_err(),
        ParseError::MissingIdentifier {
            kind: TokenKind::Expansion,
            offset: 2
        }
    );
    assert_eq!(
        parse_str("!{c}").unwrap_err(),
        ParseError::MissingIdentifier {
            kind: TokenKind::Definition,
            offset: 0
        }
    );
}

#[test]
fn empty_input() {
    assert_eq!(parse_str("").unwrap_err(), ParseError::EmptyInput);
    assert_eq!(parse_str(" \n\t").unwrap_err(), ParseError::EmptyInput);
    assert_eq!(parse(&[], b"").unwrap_err(), ParseError::EmptyInput);
}

#[test]
fn numbers_must_fit_in_u32() {
    assert_eq!(
        events("l4294967295"),
        [Event::from(Control::new(Command::Length, u32::MAX))]
    );
    assert_eq!(
        parse_str("c4294967296").unwrap_err(),
        ParseError::InvalidNumber { offset: 1 }
    );
}

#[test]
fn runaway_expansion_is_an_error() {
    assert_eq!(
        parse_str("[[[[c]1000]1000]1000]1000").unwrap_err(),
        ParseError::ExpansionTooLarge { offset: 1 }
    );
    assert_eq!(
        parse_str("c [d:e]4294967295").unwrap_err(),
        ParseError::ExpansionTooLarge { offset: 2 }
    );
    // each body fits, the second splice does not
    assert_eq!(
        parse_str("!a{[c]1024} !b{[@a]1024} @b d @b").unwrap_err(),
        ParseError::ExpansionTooLarge { offset: 30 }
    );
    assert_eq!(events("[[c]1024]1024").len(), MAX_EVENTS);
}

#[test]
fn copies_into_definitions_count_against_the_parse() {
    // b, c and d each hold MAX_EVENTS events; e is one copy too many
    assert_eq!(
        parse_str("!a{[c]1024} !b{[@a]1024} !c{@b} !d{@b} !e{@b}").unwrap_err(),
        ParseError::ExpansionTooLarge { offset: 42 }
    );
}
