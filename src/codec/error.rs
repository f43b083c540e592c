use thiserror::Error;

#[doc = r#"
A set of errors that can occur while decoding a Standard MIDI File.

Every error records the absolute byte offset at which it was detected.
"#]
#[derive(Debug, Error)]
#[error("decode error at byte {offset}: {kind}")]
pub struct DecodeError {
    offset: usize,
    kind: DecodeErrorKind,
}

/// A kind of error the decoder can produce.
#[derive(Debug, Error)]
pub enum DecodeErrorKind {
    /// The file structure is not SMF: bad signature, bad header length,
    /// unknown format word.
    #[error("{0}")]
    Format(#[from] FormatError),
    /// A read would consume bytes past the declared chunk length or the
    /// end of the buffer.
    #[error("read past the end of the data")]
    Truncated,
    /// The byte stream is structurally SMF but violates the MIDI protocol.
    #[error("{0}")]
    Protocol(#[from] ProtocolError),
}

/// Structural problems with the file container.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    /// The file does not start with `"MThd"`.
    #[error("bad header signature {0:02x?}, expected \"MThd\"")]
    HeaderSignature([u8; 4]),
    /// The header declares a length other than 6.
    #[error("bad header length {0}, expected 6")]
    HeaderLength(u32),
    /// A track chunk does not start with `"MTrk"`.
    #[error("bad track signature {0:02x?}, expected \"MTrk\"")]
    TrackSignature([u8; 4]),
    /// The format word is not 0, 1 or 2.
    #[error("unknown file format {0}")]
    UnknownFormat(u16),
    /// The division word requests SMPTE timing, which this engine does not
    /// play.
    #[error("SMPTE division is not supported")]
    SmpteDivision,
}

/// Violations of the MIDI event grammar inside a chunk.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// A data byte arrived where a status byte was required and no running
    /// status had been established yet.
    #[error("data byte {0:#04x} with no running status established")]
    RunningStatusUnset(u8),
    /// A variable-length quantity ran past its four-byte maximum.
    #[error("variable-length quantity exceeds four bytes")]
    VlqOverflow,
}

impl DecodeError {
    /// Create a decode error from an offset and kind.
    pub const fn new(offset: usize, kind: DecodeErrorKind) -> Self {
        Self { offset, kind }
    }

    /// Create a new truncation error.
    pub const fn truncated(offset: usize) -> Self {
        Self {
            offset,
            kind: DecodeErrorKind::Truncated,
        }
    }

    /// The absolute byte offset at which the error was detected.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The error kind.
    pub fn kind(&self) -> &DecodeErrorKind {
        &self.kind
    }

    /// True if the buffer or chunk ran out mid-read.
    pub const fn is_truncated(&self) -> bool {
        matches!(self.kind, DecodeErrorKind::Truncated)
    }
}

/// The decode result type (see [`DecodeError`]).
pub type DecodeResult<T> = Result<T, DecodeError>;

pub(crate) fn format_err(offset: usize, err: FormatError) -> DecodeError {
    DecodeError::new(offset, DecodeErrorKind::Format(err))
}

pub(crate) fn protocol_err(offset: usize, err: ProtocolError) -> DecodeError {
    DecodeError::new(offset, DecodeErrorKind::Protocol(err))
}
