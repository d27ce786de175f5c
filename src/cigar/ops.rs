use std::fmt;

use noodles::sam::record::cigar::op::Kind;
use serde::{Deserialize, Serialize};

use crate::error::{AlignError, Result};

/// The nine CIGAR operators.
///
/// The discriminant of each variant is its binary code, matching the
/// packed 32-bit word encoding used by the prevailing aligned-read
/// format: `(count << 4) | code`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CigarOp {
    /// M: aligned pair, match or mismatch
    Match = 0,
    /// I: bases present in the query but not the reference
    Insertion = 1,
    /// D: bases present in the reference but not the query
    Deletion = 2,
    /// N: skipped region of the reference
    Skipped = 3,
    /// S: clipped query bases retained in the record
    SoftClip = 4,
    /// H: clipped query bases absent from the record
    HardClip = 5,
    /// P: silent padding, consumes neither sequence
    Padding = 6,
    /// =: aligned pair, bases equal
    SeqMatch = 7,
    /// X: aligned pair, bases differ
    SeqMismatch = 8,
}

impl CigarOp {
    /// All operators, indexed by binary code.
    pub const ALL: [CigarOp; 9] = [
        CigarOp::Match,
        CigarOp::Insertion,
        CigarOp::Deletion,
        CigarOp::Skipped,
        CigarOp::SoftClip,
        CigarOp::HardClip,
        CigarOp::Padding,
        CigarOp::SeqMatch,
        CigarOp::SeqMismatch,
    ];

    /// The operator's binary code (0..=8).
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// The operator's CIGAR string character.
    #[inline]
    pub const fn as_char(self) -> char {
        match self {
            CigarOp::Match => 'M',
            CigarOp::Insertion => 'I',
            CigarOp::Deletion => 'D',
            CigarOp::Skipped => 'N',
            CigarOp::SoftClip => 'S',
            CigarOp::HardClip => 'H',
            CigarOp::Padding => 'P',
            CigarOp::SeqMatch => '=',
            CigarOp::SeqMismatch => 'X',
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            CigarOp::Match => "MATCH",
            CigarOp::Insertion => "INSERTION",
            CigarOp::Deletion => "DELETION",
            CigarOp::Skipped => "SKIPPED",
            CigarOp::SoftClip => "SOFT_CLIP",
            CigarOp::HardClip => "HARD_CLIP",
            CigarOp::Padding => "PADDING",
            CigarOp::SeqMatch => "SEQ_MATCH",
            CigarOp::SeqMismatch => "SEQ_MISMATCH",
        }
    }

    /// True when the operator consumes reference bases.
    #[inline]
    pub const fn consumes_ref(self) -> bool {
        matches!(
            self,
            CigarOp::Match
                | CigarOp::Deletion
                | CigarOp::Skipped
                | CigarOp::SeqMatch
                | CigarOp::SeqMismatch
        )
    }

    /// True when the operator consumes query (read) bases.
    #[inline]
    pub const fn consumes_read(self) -> bool {
        matches!(
            self,
            CigarOp::Match
                | CigarOp::Insertion
                | CigarOp::SoftClip
                | CigarOp::SeqMatch
                | CigarOp::SeqMismatch
        )
    }

    /// The operator describing the same column with reference and query
    /// roles swapped. Clips, padding, and skips have no inverse.
    pub fn inverse(self) -> Result<CigarOp> {
        match self {
            CigarOp::Match => Ok(CigarOp::Match),
            CigarOp::Insertion => Ok(CigarOp::Deletion),
            CigarOp::Deletion => Ok(CigarOp::Insertion),
            CigarOp::SeqMatch => Ok(CigarOp::SeqMatch),
            CigarOp::SeqMismatch => Ok(CigarOp::SeqMismatch),
            _ => Err(AlignError::UnsupportedInverse(self)),
        }
    }

    /// Looks up an operator by binary code.
    pub fn from_code(code: u8) -> Result<CigarOp> {
        Self::ALL
            .get(usize::from(code))
            .copied()
            .ok_or(AlignError::UnknownOperatorCode(code))
    }

    /// Looks up an operator by its CIGAR character byte.
    pub fn from_char(ch: u8) -> Result<CigarOp> {
        match ch {
            b'M' => Ok(CigarOp::Match),
            b'I' => Ok(CigarOp::Insertion),
            b'D' => Ok(CigarOp::Deletion),
            b'N' => Ok(CigarOp::Skipped),
            b'S' => Ok(CigarOp::SoftClip),
            b'H' => Ok(CigarOp::HardClip),
            b'P' => Ok(CigarOp::Padding),
            b'=' => Ok(CigarOp::SeqMatch),
            b'X' => Ok(CigarOp::SeqMismatch),
            _ => Err(AlignError::UnknownOperatorChar(char::from(ch))),
        }
    }

    /// Looks up an operator from a single-character bytestring.
    pub fn from_bytes(bytes: &[u8]) -> Result<CigarOp> {
        match bytes {
            [ch] => Self::from_char(*ch),
            _ => Err(AlignError::InvalidOperatorType(format!(
                "expected a single character, got {:?}",
                String::from_utf8_lossy(bytes)
            ))),
        }
    }

    pub fn from_sam_kind(kind: Kind) -> CigarOp {
        match kind {
            Kind::Match => CigarOp::Match,
            Kind::Insertion => CigarOp::Insertion,
            Kind::Deletion => CigarOp::Deletion,
            Kind::Skip => CigarOp::Skipped,
            Kind::SoftClip => CigarOp::SoftClip,
            Kind::HardClip => CigarOp::HardClip,
            Kind::Pad => CigarOp::Padding,
            Kind::SequenceMatch => CigarOp::SeqMatch,
            Kind::SequenceMismatch => CigarOp::SeqMismatch,
        }
    }

    pub fn sam_kind(self) -> Kind {
        match self {
            CigarOp::Match => Kind::Match,
            CigarOp::Insertion => Kind::Insertion,
            CigarOp::Deletion => Kind::Deletion,
            CigarOp::Skipped => Kind::Skip,
            CigarOp::SoftClip => Kind::SoftClip,
            CigarOp::HardClip => Kind::HardClip,
            CigarOp::Padding => Kind::Pad,
            CigarOp::SeqMatch => Kind::SequenceMatch,
            CigarOp::SeqMismatch => Kind::SequenceMismatch,
        }
    }
}

impl fmt::Display for CigarOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// An operator identifier as accepted at the API edge: an operator
/// value, a binary code, or a CIGAR character. Decoded once on entry;
/// internally everything is the binary code.
#[derive(Debug, Copy, Clone)]
pub enum OpId {
    Op(CigarOp),
    Code(u8),
    Char(char),
}

impl OpId {
    pub fn resolve(self) -> Result<CigarOp> {
        match self {
            OpId::Op(op) => Ok(op),
            OpId::Code(code) => CigarOp::from_code(code),
            OpId::Char(ch) if ch.is_ascii() => CigarOp::from_char(ch as u8),
            OpId::Char(ch) => Err(AlignError::InvalidOperatorType(format!(
                "non-ASCII operator character {ch:?}"
            ))),
        }
    }
}

impl From<CigarOp> for OpId {
    fn from(op: CigarOp) -> Self {
        OpId::Op(op)
    }
}

impl From<u8> for OpId {
    fn from(code: u8) -> Self {
        OpId::Code(code)
    }
}

impl From<char> for OpId {
    fn from(ch: char) -> Self {
        OpId::Char(ch)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{CigarOp, OpId};
    use crate::error::AlignError;

    #[test]
    fn test_codes_match_table_order() {
        for (code, op) in CigarOp::ALL.iter().enumerate() {
            assert_eq!(usize::from(op.code()), code);
            assert_eq!(CigarOp::from_code(op.code()).unwrap(), *op);
        }
    }

    #[rstest]
    #[case(CigarOp::Match, 'M', true, true)]
    #[case(CigarOp::Insertion, 'I', false, true)]
    #[case(CigarOp::Deletion, 'D', true, false)]
    #[case(CigarOp::Skipped, 'N', true, false)]
    #[case(CigarOp::SoftClip, 'S', false, true)]
    #[case(CigarOp::HardClip, 'H', false, false)]
    #[case(CigarOp::Padding, 'P', false, false)]
    #[case(CigarOp::SeqMatch, '=', true, true)]
    #[case(CigarOp::SeqMismatch, 'X', true, true)]
    fn test_registry(
        #[case] op: CigarOp,
        #[case] ch: char,
        #[case] consumes_ref: bool,
        #[case] consumes_read: bool,
    ) {
        assert_eq!(op.as_char(), ch);
        assert_eq!(CigarOp::from_char(ch as u8).unwrap(), op);
        assert_eq!(op.consumes_ref(), consumes_ref);
        assert_eq!(op.consumes_read(), consumes_read);
    }

    #[test]
    fn test_inverses() {
        assert_eq!(CigarOp::Match.inverse().unwrap(), CigarOp::Match);
        assert_eq!(CigarOp::Insertion.inverse().unwrap(), CigarOp::Deletion);
        assert_eq!(CigarOp::Deletion.inverse().unwrap(), CigarOp::Insertion);
        assert_eq!(CigarOp::SeqMatch.inverse().unwrap(), CigarOp::SeqMatch);
        assert_eq!(CigarOp::SeqMismatch.inverse().unwrap(), CigarOp::SeqMismatch);
        for op in [CigarOp::Skipped, CigarOp::SoftClip, CigarOp::HardClip, CigarOp::Padding] {
            assert!(matches!(
                op.inverse(),
                Err(AlignError::UnsupportedInverse(o)) if o == op
            ));
        }
    }

    #[test]
    fn test_unknown_lookups() {
        assert!(matches!(
            CigarOp::from_char(b'Q'),
            Err(AlignError::UnknownOperatorChar('Q'))
        ));
        assert!(matches!(
            CigarOp::from_code(9),
            Err(AlignError::UnknownOperatorCode(9))
        ));
    }

    #[test]
    fn test_from_bytes_requires_single_character() {
        assert_eq!(CigarOp::from_bytes(b"M").unwrap(), CigarOp::Match);
        assert!(matches!(
            CigarOp::from_bytes(b"MI"),
            Err(AlignError::InvalidOperatorType(_))
        ));
        assert!(matches!(
            CigarOp::from_bytes(b""),
            Err(AlignError::InvalidOperatorType(_))
        ));
    }

    #[test]
    fn test_op_id_resolution() {
        assert_eq!(OpId::from(CigarOp::Deletion).resolve().unwrap(), CigarOp::Deletion);
        assert_eq!(OpId::from(2u8).resolve().unwrap(), CigarOp::Deletion);
        assert_eq!(OpId::from('D').resolve().unwrap(), CigarOp::Deletion);
        assert!(matches!(
            OpId::from('λ').resolve(),
            Err(AlignError::InvalidOperatorType(_))
        ));
    }

    #[test]
    fn test_sam_kind_round_trip() {
        for op in CigarOp::ALL {
            assert_eq!(CigarOp::from_sam_kind(op.sam_kind()), op);
        }
    }
}
