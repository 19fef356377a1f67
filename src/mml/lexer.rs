#![doc = r#"
Tokenizer for the macro language

```text
!riff{ c8 e8 g8 }      definition
t140 o3 l8             commands with numeric arguments
[ @riff : r4 ]4 ;      loop with a break section, end of track
```

Tokens only record a [`Span`] into the source; the text is recovered
with [`Token::text`].
"#]

use core::fmt;

use thiserror::Error;

/// A byte range in the source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Byte offset of the first byte
    pub offset: usize,
    /// Length in bytes
    pub len: usize,
}

impl Span {
    /// A new span
    pub const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// One past the last byte
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// What a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A run of decimal digits
    Number,
    /// `@name`
    Expansion,
    /// `!name`
    Definition,
    /// One of `o < > l v t`
    Command,
    /// One of `a`-`g` or the rest `r`
    Note,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `.`
    Dot,
    /// `;`
    Semicolon,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `:`
    Colon,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// End of input
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TokenKind::*;
        let name = match self {
            Number => "number",
            Expansion => "macro expansion",
            Definition => "macro definition",
            Command => "command",
            Note => "note",
            Plus => "`+`",
            Minus => "`-`",
            Dot => "`.`",
            Semicolon => "`;`",
            LBracket => "`[`",
            RBracket => "`]`",
            Colon => "`:`",
            LBrace => "`{`",
            RBrace => "`}`",
            Eof => "end of input",
        };
        f.write_str(name)
    }
}

/// A token: a kind and where it sits in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    /// The token kind
    pub kind: TokenKind,
    /// The source bytes covered
    pub span: Span,
}

impl Token {
    /// A new token
    pub const fn new(kind: TokenKind, offset: usize, len: usize) -> Self {
        Self {
            kind,
            span: Span::new(offset, len),
        }
    }

    /// The bytes of the token in `source`, empty if the span does not fit
    /// `source`
    pub fn text<'s>(&self, source: &'s [u8]) -> &'s [u8] {
        source
            .get(self.span.offset..self.span.end())
            .unwrap_or_default()
    }
}

/// The lexer met a byte that starts no token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unexpected character `{character}` at byte {offset}")]
pub struct LexError {
    /// Where the character starts
    pub offset: usize,
    /// The offending character, decoded lossily
    pub character: String,
}

/// `isspace` in the C locale.
const fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | 0x0B | 0x0C | b'\r')
}

/// Identifier bytes: ASCII alphanumerics and any non-ASCII byte.
const fn is_ident(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte >= 0x80
}

/// Length of the UTF-8 sequence introduced by `lead`.
///
/// Continuation and invalid lead bytes count as one.
const fn utf8_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 1,
    }
}

#[doc = r#"
Produces tokens from a source buffer.

The lexer is an iterator of `Result<Token, LexError>` that yields exactly
one [`TokenKind::Eof`] and then stops. After an error it yields nothing.

# Example
```rust
# use mml2midi::mml::lexer::{tokenize, TokenKind};
let kinds: Vec<_> = tokenize(b"c4").unwrap().iter().map(|t| t.kind).collect();
assert_eq!(kinds, [TokenKind::Note, TokenKind::Number, TokenKind::Eof]);
```
"#]
#[derive(Debug, Clone)]
pub struct Lexer<'s> {
    source: &'s [u8],
    offset: usize,
    done: bool,
}

impl<'s> Lexer<'s> {
    /// A lexer at the start of `source`
    pub fn new(source: &'s [u8]) -> Self {
        Self {
            source,
            offset: 0,
            done: false,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.offset < self.source.len() && is_space(self.source[self.offset]) {
            self.offset += 1;
        }
    }

    /// Length of the run of bytes after the sigil at `start` that satisfy
    /// `accept`.
    fn run_after(&self, start: usize, accept: impl Fn(u8) -> bool) -> usize {
        self.source[start + 1..]
            .iter()
            .take_while(|b| accept(**b))
            .count()
    }

    /// Read the next token.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();
        let offset = self.offset;
        let Some(&byte) = self.source.get(offset) else {
            return Ok(Token::new(TokenKind::Eof, offset, 0));
        };

        use TokenKind::*;
        let (kind, len) = match byte {
            b'a'..=b'g' | b'r' => (Note, 1),
            b'o' | b'<' | b'>' | b'l' | b'v' | b't' => (Command, 1),
            b'+' => (Plus, 1),
            b'-' => (Minus, 1),
            b'.' => (Dot, 1),
            b';' => (Semicolon, 1),
            b'{' => (LBrace, 1),
            b'}' => (RBrace, 1),
            b'[' => (LBracket, 1),
            b']' => (RBracket, 1),
            b':' => (Colon, 1),
            b'@' => (Expansion, 1 + self.run_after(offset, is_ident)),
            b'!' => (
                Definition,
                1 + self.run_after(offset, |b| is_ident(b) && !is_space(b) && b != b'{'),
            ),
            b'0'..=b'9' => (
                Number,
                self.source[offset..]
                    .iter()
                    .take_while(|b| b.is_ascii_digit())
                    .count(),
            ),
            _ => {
                let end = (offset + utf8_len(byte)).min(self.source.len());
                return Err(LexError {
                    offset,
                    character: String::from_utf8_lossy(&self.source[offset..end]).into_owned(),
                });
            }
        };

        self.offset += len;
        Ok(Token::new(kind, offset, len))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let token = self.next_token();
        self.done = !matches!(&token, Ok(t) if t.kind != TokenKind::Eof);
        Some(token)
    }
}

/// Tokenize a whole source buffer.
///
/// The returned stream always ends with a single [`TokenKind::Eof`].
pub fn tokenize(source: &[u8]) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).collect()
}

#[cfg(test)]
fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source.as_bytes())
        .unwrap()
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

#[test]
fn note_and_length() {
    use pretty_assertions::assert_eq;
    use TokenKind::*;
    assert_eq!(kinds("c4"), [Note, Number, Eof]);
    assert_eq!(kinds("  c+16..  "), [Note, Plus, Number, Dot, Dot, Eof]);
    assert_eq!(kinds("r"), [Note, Eof]);
}

#[test]
fn empty_source_is_a_single_eof() {
    assert_eq!(kinds(""), [TokenKind::Eof]);
    assert_eq!(kinds(" \t\r\n\x0B\x0C"), [TokenKind::Eof]);
}

#[test]
fn every_structural_token() {
    use pretty_assertions::assert_eq;
    use TokenKind::*;
    assert_eq!(
        kinds("o<>lvt+-.;{}[]:"),
        [
            Command, Command, Command, Command, Command, Command, Plus, Minus, Dot, Semicolon,
            LBrace, RBrace, LBracket, RBracket, Colon, Eof
        ]
    );
}

#[test]
fn macro_tokens_and_spans() {
    let source = "!bass{c}@bass2;";
    let tokens = tokenize(source.as_bytes()).unwrap();
    let texts: Vec<_> = tokens
        .iter()
        .map(|t| core::str::from_utf8(t.text(source.as_bytes())).unwrap())
        .collect();
    assert_eq!(texts, ["!bass", "{", "c", "}", "@bass2", ";", ""]);
    assert_eq!(tokens[4].kind, TokenKind::Expansion);
    assert_eq!(tokens[4].span, Span::new(8, 6));
}

#[test]
fn identifiers_take_non_ascii_bytes() {
    let source = "!ねこ{c}@ねこ";
    let tokens = tokenize(source.as_bytes()).unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Definition);
    assert_eq!(tokens[0].text(source.as_bytes()), "!ねこ".as_bytes());
    assert_eq!(tokens[4].text(source.as_bytes()), "@ねこ".as_bytes());
}

#[test]
fn bare_sigils() {
    let source = b"@ !{";
    let tokens = tokenize(source).unwrap();
    assert_eq!(tokens[0].span, Span::new(0, 1));
    assert_eq!(tokens[1].kind, TokenKind::Definition);
    assert_eq!(tokens[1].span, Span::new(2, 1));
    assert_eq!(tokens[2].kind, TokenKind::LBrace);
}

#[test]
fn numbers_are_maximal_runs() {
    let tokens = tokenize(b"t120c").unwrap();
    assert_eq!(tokens[1].span, Span::new(1, 3));
    assert_eq!(tokens[2].kind, TokenKind::Note);
}

#[test]
fn unknown_characters_fail() {
    let err = tokenize(b"cde x").unwrap_err();
    assert_eq!(err.offset, 4);
    assert_eq!(err.character, "x");

    let err = tokenize("c é".as_bytes()).unwrap_err();
    assert_eq!(err.offset, 2);
    assert_eq!(err.character, "é");

    // uppercase letters are not notes
    assert!(tokenize(b"C").is_err());
}

#[test]
fn text_outside_the_source_is_empty() {
    let tokens = tokenize(b"c d @long").unwrap();
    assert_eq!(tokens[2].text(b"c d @long"), b"@long");
    assert_eq!(tokens[2].text(b"c d"), b"");
    assert_eq!(tokens[2].text(b"c d @lo"), b"");
}

#[test]
fn lexer_stops_after_eof() {
    let mut lexer = Lexer::new(b"c");
    assert!(lexer.next().unwrap().is_ok());
    assert_eq!(lexer.next().unwrap().unwrap().kind, TokenKind::Eof);
    assert!(lexer.next().is_none());
}
