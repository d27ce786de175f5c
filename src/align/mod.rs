//! The alignment engine: scoring, kernels, and the public entry point.

pub mod alignment;
pub mod altschul;
pub mod constants;
pub mod gotoh;
pub mod scoring;
pub(crate) mod traceback;

use std::{fmt::Display, str::FromStr};

use derive_builder::Builder;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{AlignError, Result};
use alignment::Alignment;
use altschul::AltschulEricksonAligner;
use gotoh::GotohAligner;
use scoring::Scoring;

pub use constants::MIN_SCORE;

/// The modes of alignment supported by the engine.
///
/// The boundary conditions and the terminal cell of the dynamic
/// program vary by mode; the recurrences are shared.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone, Hash, Serialize, Deserialize)]
pub enum AlignmentMode {
    /// Aligns the full query against the full reference.
    #[default]
    Global,
    /// Aligns a sub-sequence of the query against a sub-sequence of the
    /// reference, with the score floored at zero (Smith–Waterman).
    Local,
    /// Free leading and trailing gaps; the alignment ends wherever the
    /// last row or last column scores best.
    Glocal,
    /// Glocal boundaries, but the alignment is forced to end at the end
    /// of both sequences.
    LocalGlobal,
}

impl Display for AlignmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Local => write!(f, "local"),
            Self::Glocal => write!(f, "glocal"),
            Self::LocalGlobal => write!(f, "local_global"),
        }
    }
}

impl FromStr for AlignmentMode {
    type Err = AlignError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "global" => Ok(AlignmentMode::Global),
            "local" => Ok(AlignmentMode::Local),
            "glocal" => Ok(AlignmentMode::Glocal),
            "local_global" | "local-global" | "localglobal" => Ok(AlignmentMode::LocalGlobal),
            _ => Err(AlignError::InvalidMode(s.to_string())),
        }
    }
}

/// Options for a single alignment call.
#[derive(Copy, Clone, Debug, Builder, Serialize, Deserialize)]
pub struct AlignmentOptions {
    #[builder(default)]
    pub mode: AlignmentMode,

    /// Skip the traceback and return only the score and end
    /// coordinates.
    #[builder(default = "false")]
    pub score_only: bool,

    /// Score for a pair of equal bases (must exceed every penalty).
    #[builder(default = "10")]
    pub match_score: i32,

    /// Score for a pair of differing bases.
    #[builder(default = "-9")]
    pub mismatch_score: i32,

    /// Score for the first base of a gap.
    #[builder(default = "-15")]
    pub gap_open: i32,

    /// Score for each additional gap base.
    #[builder(default = "-6")]
    pub gap_extend: i32,

    /// Emit `=`/`X` instead of `M`.
    #[builder(default = "false")]
    pub extended_cigar: bool,

    /// Bracket local and glocal CIGARs with soft clips covering the
    /// unaligned query prefix and suffix.
    #[builder(default = "false")]
    pub soft_clip: bool,
}

impl Default for AlignmentOptions {
    fn default() -> Self {
        AlignmentOptionsBuilder::default().build().unwrap()
    }
}

impl AlignmentOptions {
    fn scoring(&self) -> Result<Scoring> {
        Scoring::try_new(
            self.match_score,
            self.mismatch_score,
            self.gap_open,
            self.gap_extend,
        )
    }
}

/// Aligns `query` against `ref_seq` under the given options.
///
/// This is the Gotoh path: full calls record the five-flag traceback
/// matrix and return coordinates plus a CIGAR; score-only calls keep
/// only the O(m) score vectors.
pub fn align(ref_seq: &[u8], query: &[u8], options: &AlignmentOptions) -> Result<Alignment> {
    let scoring = options.scoring()?;
    debug!(
        "aligning {} x {} bases ({}, score_only={})",
        ref_seq.len(),
        query.len(),
        options.mode,
        options.score_only
    );
    let mut aligner = GotohAligner::with_capacity(ref_seq.len(), query.len(), scoring);
    match (options.mode, options.score_only) {
        (AlignmentMode::Global, false) => {
            aligner.global(ref_seq, query, options.extended_cigar)
        }
        (AlignmentMode::Global, true) => aligner.global_score(ref_seq, query),
        (AlignmentMode::Local, false) => {
            aligner.local(ref_seq, query, options.extended_cigar, options.soft_clip)
        }
        (AlignmentMode::Local, true) => aligner.local_score(ref_seq, query),
        (AlignmentMode::Glocal, false) => {
            aligner.glocal(ref_seq, query, options.extended_cigar, options.soft_clip)
        }
        (AlignmentMode::Glocal, true) => aligner.glocal_score(ref_seq, query),
        (AlignmentMode::LocalGlobal, false) => {
            aligner.local_global(ref_seq, query, options.extended_cigar, options.soft_clip)
        }
        (AlignmentMode::LocalGlobal, true) => aligner.local_global_score(ref_seq, query),
    }
}

/// Global alignment via the Altschul–Erickson traceback encoding.
///
/// Scores match [`align`] in global mode exactly; where equal-score
/// alignments exist the emitted CIGAR is the unique path left by the
/// tie-resolving post-pass. The `mode` option is ignored.
pub fn align_altschul_erickson(
    ref_seq: &[u8],
    query: &[u8],
    options: &AlignmentOptions,
) -> Result<Alignment> {
    let scoring = options.scoring()?;
    debug!(
        "aligning {} x {} bases (global, Altschul-Erickson, score_only={})",
        ref_seq.len(),
        query.len(),
        options.score_only
    );
    let mut aligner = AltschulEricksonAligner::with_capacity(ref_seq.len(), query.len(), scoring);
    if options.score_only {
        aligner.global_score(ref_seq, query)
    } else {
        aligner.global(ref_seq, query, options.extended_cigar)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{align, align_altschul_erickson, AlignmentMode, AlignmentOptions,
        AlignmentOptionsBuilder};
    use crate::error::AlignError;

    fn options(mode: &str) -> AlignmentOptions {
        AlignmentOptionsBuilder::default()
            .mode(mode.parse().unwrap())
            .build()
            .unwrap()
    }

    #[rstest]
    #[case("global", AlignmentMode::Global)]
    #[case("GLOBAL", AlignmentMode::Global)]
    #[case("Local", AlignmentMode::Local)]
    #[case("glocal", AlignmentMode::Glocal)]
    #[case("local_global", AlignmentMode::LocalGlobal)]
    #[case("LOCAL-GLOBAL", AlignmentMode::LocalGlobal)]
    fn test_mode_parsing(#[case] text: &str, #[case] expected: AlignmentMode) {
        assert_eq!(text.parse::<AlignmentMode>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_mode() {
        assert!(matches!(
            "sideways".parse::<AlignmentMode>(),
            Err(AlignError::InvalidMode(m)) if m == "sideways"
        ));
    }

    #[test]
    fn test_invalid_scoring_is_checked_up_front() {
        let opts = AlignmentOptionsBuilder::default()
            .match_score(-10)
            .mismatch_score(-9)
            .build()
            .unwrap();
        assert!(matches!(
            align(b"ACGT", b"ACGT", &opts),
            Err(AlignError::InvalidScoring(_))
        ));
    }

    #[test]
    fn test_local_single_base() {
        let alignment = align(b"b", b"abc", &options("local")).unwrap();
        assert_eq!(alignment.score, 10);
        assert_eq!(alignment.cigar.as_ref().unwrap().to_string(), "1M");
        assert_eq!(alignment.ref_start, Some(0));
        assert_eq!(alignment.ref_stop, 1);
        assert_eq!(alignment.query_start, Some(1));
        assert_eq!(alignment.query_stop, 2);
    }

    #[test]
    fn test_local_with_raised_match_score() {
        let opts = AlignmentOptionsBuilder::default()
            .mode(AlignmentMode::Local)
            .match_score(30)
            .build()
            .unwrap();
        let alignment = align(b"abbcbbd", b"acd", &opts).unwrap();
        assert_eq!(alignment.score, 48);
        assert_eq!(alignment.cigar.as_ref().unwrap().to_string(), "1M2D1M2D1M");
    }

    #[test]
    fn test_local_subsequence() {
        let opts = AlignmentOptionsBuilder::default()
            .mode(AlignmentMode::Local)
            .mismatch_score(-20)
            .build()
            .unwrap();
        let alignment = align(
            b"AGACCAAGTCTCTGCTACCGTACATACTCGTACTGAGACTGCCAAGGCACACAGGGGATAG",
            b"GCTGGTGCGACACAT",
            &opts,
        )
        .unwrap();
        assert_eq!(alignment.score, 55);
        assert_eq!(alignment.cigar.as_ref().unwrap().to_string(), "2M1I5M");
        assert_eq!(alignment.ref_start, Some(46));
        assert_eq!(alignment.ref_stop, 53);
        assert_eq!(alignment.query_start, Some(6));
        assert_eq!(alignment.query_stop, 14);
    }

    #[test]
    fn test_global_single_base_query() {
        let alignment = align(b"abc", b"b", &options("global")).unwrap();
        assert_eq!(alignment.score, -20);
        assert_eq!(alignment.cigar.as_ref().unwrap().to_string(), "1D1M1D");
    }

    #[test]
    fn test_glocal_subsequence() {
        let opts = AlignmentOptionsBuilder::default()
            .mode(AlignmentMode::Glocal)
            .mismatch_score(-20)
            .build()
            .unwrap();
        let alignment = align(
            b"AGACCAAGTCTCTGCTACCGTACATACTCGTACTGAGACTGCCAAGGCACACAGGGGATAG",
            b"GCTGGTGCGACACAT",
            &opts,
        )
        .unwrap();
        assert_eq!(alignment.score, 27);
        assert_eq!(
            alignment.cigar.as_ref().unwrap().to_string(),
            "1M1D3M4D1M1I2M1I5M1I"
        );
    }

    #[rstest]
    #[case("global")]
    #[case("local")]
    #[case("glocal")]
    #[case("local_global")]
    fn test_score_only_matches_full(#[case] mode: &str) {
        let ref_seq = b"AGACCAAGTCTCTGCTACCGTACATACTCGTACTGAGACTGCCAAGGCACACAGGGGATAG";
        let query = b"GCTGGTGCGACACAT";
        let full = align(ref_seq, query, &options(mode)).unwrap();
        let score_only = align(
            ref_seq,
            query,
            &AlignmentOptionsBuilder::default()
                .mode(mode.parse().unwrap())
                .score_only(true)
                .build()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(score_only.score, full.score);
        assert_eq!(score_only.ref_stop, full.ref_stop);
        assert_eq!(score_only.query_stop, full.query_stop);
        assert_eq!(score_only.ref_start, None);
        assert_eq!(score_only.query_start, None);
        assert_eq!(score_only.cigar, None);
    }

    #[test]
    fn test_extended_cigar_never_mixes_forms() {
        let opts = AlignmentOptionsBuilder::default()
            .extended_cigar(true)
            .build()
            .unwrap();
        let alignment = align(b"AACCGGTT", b"AACCGCTT", &opts).unwrap();
        let cigar = alignment.cigar.as_ref().unwrap().to_string();
        assert!(!cigar.contains('M'), "extended cigar contains M: {cigar}");

        let basic = align(b"AACCGGTT", b"AACCGCTT", &options("global")).unwrap();
        let cigar = basic.cigar.as_ref().unwrap().to_string();
        assert!(
            !cigar.contains('=') && !cigar.contains('X'),
            "basic cigar contains extended operators: {cigar}"
        );
    }

    #[test]
    fn test_altschul_erickson_matches_global_score() {
        let ref_seq = b"AGACCAAGTCTCTGCTACCGTACATACT";
        let query = b"GCTGGTGCGACACAT";
        let gotoh = align(ref_seq, query, &options("global")).unwrap();
        let ae = align_altschul_erickson(ref_seq, query, &AlignmentOptions::default()).unwrap();
        assert_eq!(ae.score, gotoh.score);
    }
}
