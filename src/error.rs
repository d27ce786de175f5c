use crate::cigar::ops::CigarOp;

/// Result type alias for fallible operations in this crate.
pub type Result<T> = std::result::Result<T, AlignError>;

/// Errors raised by the alignment engine and the CIGAR toolkit.
///
/// All of these surface to the caller of the public API; none are
/// recovered internally.
#[derive(thiserror::Error, Debug)]
pub enum AlignError {
    /// Scoring parameters violate a precondition.
    #[error("invalid scoring: {0}")]
    InvalidScoring(&'static str),

    /// Unknown alignment mode string.
    #[error("invalid alignment mode: {0:?}")]
    InvalidMode(String),

    /// A CIGAR consumes more reference or query bases than supplied.
    #[error("CIGAR length mismatch: {0}")]
    LengthMismatch(String),

    /// CIGAR operator lookup by character failed.
    #[error("no CIGAR operator for character {0:?}")]
    UnknownOperatorChar(char),

    /// CIGAR operator lookup by binary code failed.
    #[error("no CIGAR operator with code {0}")]
    UnknownOperatorCode(u8),

    /// An operator identifier had an unsupported shape.
    #[error("invalid CIGAR operator identifier: {0}")]
    InvalidOperatorType(String),

    /// A CIGAR string ended in digits with no operator character.
    #[error("CIGAR string ends with trailing digits: {0:?}")]
    TrailingDigits(String),

    /// The operator has no defined inverse.
    #[error("CIGAR operator {} ({}) has no inverse", .0.name(), .0.as_char())]
    UnsupportedInverse(CigarOp),

    /// `pop` on an empty sequence.
    #[error("cannot pop from an empty CIGAR sequence")]
    EmptySequence,

    /// A negative clip length was passed to `invert`.
    #[error("clip lengths must be non-negative (got {0})")]
    InvalidClip(i64),

    /// Growing the backing word buffer failed.
    #[error("out of memory growing CIGAR buffer")]
    OutOfMemory(#[source] std::collections::TryReserveError),

    /// The traceback matrix produced an impossible direction. This is a
    /// bug in the fill kernel and is reported rather than masked.
    #[error("invalid edit operation in traceback at ({i}, {j})")]
    InvalidEditOperation { i: usize, j: usize },
}
