use thiserror::Error;

#[doc = r#"
A set of errors that can occur while decoding MIDI bytes.

Every error carries the byte position (relative to the start of the
buffer handed to the decoder) where decoding stopped.
"#]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Decoding at position {position}, {kind}")]
pub struct CodecError {
    position: usize,
    pub(crate) kind: CodecErrorKind,
}

/// A kind of error that the codec can produce
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecErrorKind {
    /// The buffer ended inside a variable-length quantity.
    #[error("Variable-length quantity is truncated")]
    TruncatedVlq,
    /// Five bytes were read without a terminal byte.
    #[error("Variable-length quantity does not terminate within 5 bytes")]
    UnterminatedVlq,
    /// The quantity does not fit in 32 bits.
    #[error("Variable-length quantity overflows 32 bits")]
    VlqOverflow,
    /// Reading out of bounds.
    #[error("Read out of bounds!")]
    OutOfBounds,
    /// A data byte had its leading bit set.
    #[error("Invalid data byte {0:#04X}")]
    InvalidDataByte(u8),
    /// A byte that is not a channel status was used as one.
    #[error("Invalid channel status byte {0:#04X}")]
    InvalidStatus(u8),
    /// A data byte appeared where a status was required, and no status
    /// had been seen on the stream yet.
    #[error("Data byte {0:#04X} without a previous running status")]
    NoRunningStatus(u8),
    /// Chunk-level problems in a Standard MIDI File.
    #[error("Chunk {0}")]
    Chunk(#[from] ChunkError),
}

/// Errors found while walking the chunks of a Standard MIDI File
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkError {
    /// The file does not begin with an `MThd` chunk
    #[error("The file does not start with a header chunk")]
    MissingHeader,
    /// A second `MThd` was found
    #[error("Found more than one header chunk")]
    DuplicateHeader,
    /// `MThd` declared a length other than 6
    #[error("Header chunk length must be 6, found {0}")]
    HeaderLength(u32),
    /// The header format is not 0, 1 or 2
    #[error("Unknown file format {0}")]
    UnknownFormat(u16),
    /// SMPTE division with an fps byte outside -24/-25/-29/-30
    #[error("Invalid SMPTE frame rate {0}")]
    SmpteFrameRate(i8),
}

impl CodecError {
    /// Create a codec error from a position and kind
    pub const fn new(position: usize, kind: CodecErrorKind) -> Self {
        Self { position, kind }
    }
    /// True if out of bounds or truncated
    pub const fn is_out_of_bounds(&self) -> bool {
        matches!(
            self.kind,
            CodecErrorKind::OutOfBounds | CodecErrorKind::TruncatedVlq
        )
    }
    /// Returns the error kind.
    pub fn error_kind(&self) -> &CodecErrorKind {
        &self.kind
    }
    /// Returns the position where the error occurred.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Create a new out of bounds error
    pub const fn oob(position: usize) -> Self {
        Self {
            position,
            kind: CodecErrorKind::OutOfBounds,
        }
    }

    /// Shift the position by `offset`, used when a sub-slice was decoded.
    pub(crate) const fn offset_by(mut self, offset: usize) -> Self {
        self.position += offset;
        self
    }
}

/// The codec result type (see [`CodecError`])
pub type CodecResult<T> = Result<T, CodecError>;
