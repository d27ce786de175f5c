//! Global alignment with the Altschul–Erickson traceback encoding.
//!
//! The fill pass records seven provenance bits per cell instead of the
//! five-flag layout used by the Gotoh kernels. A reverse post-pass then
//! clears redundant bits so that the backward read visits exactly one
//! optimal path. Scores are identical to the Gotoh global kernel; the
//! emitted CIGAR may differ where equal-score alignments exist.

use std::iter::repeat;

use crate::{
    align::{
        alignment::Alignment,
        constants::{DEFAULT_ALIGNER_CAPACITY, MIN_SCORE},
        scoring::Scoring,
        traceback::Traceback,
    },
    cigar::{ops::CigarOp, CigarSequence},
    error::{AlignError, Result},
};

// Provenance bits, one byte per cell.
const AE_DIAG: u8 = 0b0000_0001; // S achieved by the diagonal move
const AE_S_DEL: u8 = 0b0000_0010; // S equals D
const AE_S_INS: u8 = 0b0000_0100; // S equals I
const AE_DEL_EXTEND: u8 = 0b0000_1000; // D extends the deletion above
const AE_DEL_OPEN: u8 = 0b0001_0000; // D opens from S above
const AE_INS_EXTEND: u8 = 0b0010_0000; // I extends the insertion to the left
const AE_INS_OPEN: u8 = 0b0100_0000; // I opens from S to the left

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Plane {
    Score,
    Del,
    Ins,
}

/// Global affine-gap aligner whose traceback is made unique by the
/// Altschul–Erickson post-pass.
pub struct AltschulEricksonAligner {
    scoring: Scoring,
    s: Vec<i32>,
    d: Vec<i32>,
    flags: Traceback,
}

impl AltschulEricksonAligner {
    pub fn new(scoring: Scoring) -> Self {
        Self::with_capacity(DEFAULT_ALIGNER_CAPACITY, DEFAULT_ALIGNER_CAPACITY, scoring)
    }

    pub fn with_capacity(n: usize, m: usize, scoring: Scoring) -> Self {
        Self {
            scoring,
            s: Vec::with_capacity(m + 1),
            d: Vec::with_capacity(m + 1),
            flags: Traceback::with_capacity(n, m),
        }
    }

    /// Global alignment with full traceback.
    pub fn global(
        &mut self,
        ref_seq: &[u8],
        query: &[u8],
        extended_cigar: bool,
    ) -> Result<Alignment> {
        let (n, m) = (ref_seq.len(), query.len());
        let score = self.fill(ref_seq, query);
        self.prune(n, m);
        let cigar = self.walk(ref_seq, query, extended_cigar)?;
        Ok(Alignment {
            ref_seq: ref_seq.to_vec(),
            ref_start: Some(0),
            ref_stop: n,
            query: query.to_vec(),
            query_start: Some(0),
            query_stop: m,
            cigar: Some(cigar),
            score,
        })
    }

    /// Global alignment, score only.
    pub fn global_score(&mut self, ref_seq: &[u8], query: &[u8]) -> Result<Alignment> {
        let (n, m) = (ref_seq.len(), query.len());
        let score = self.fill(ref_seq, query);
        Ok(Alignment {
            ref_seq: ref_seq.to_vec(),
            ref_start: None,
            ref_stop: n,
            query: query.to_vec(),
            query_start: None,
            query_stop: m,
            cigar: None,
            score,
        })
    }

    fn fill(&mut self, ref_seq: &[u8], query: &[u8]) -> i32 {
        let (n, m) = (ref_seq.len(), query.len());
        self.s.clear();
        self.d.clear();
        self.d.extend(repeat(MIN_SCORE).take(m + 1));
        self.s.push(0);
        for j in 1..=m {
            self.s
                .push(self.scoring.gap_open + self.scoring.gap_extend * (j as i32 - 1));
        }

        self.flags.init(n, m);
        for j in 1..=m {
            let gap = if j == 1 { AE_INS_OPEN } else { AE_INS_EXTEND };
            self.flags.set(0, j, AE_S_INS | gap);
        }
        for i in 1..=n {
            let gap = if i == 1 { AE_DEL_OPEN } else { AE_DEL_EXTEND };
            self.flags.set(i, 0, AE_S_DEL | gap);
        }

        for i in 1..=n {
            let p = ref_seq[i - 1];
            let mut s_diag = self.s[0];
            self.s[0] = self.scoring.gap_open + self.scoring.gap_extend * (i as i32 - 1);
            let mut ins = MIN_SCORE;
            for j in 1..=m {
                let d_open = self.s[j] + self.scoring.gap_open;
                let d_extend = self.d[j] + self.scoring.gap_extend;
                let d_score = d_open.max(d_extend);
                let i_open = self.s[j - 1] + self.scoring.gap_open;
                let i_extend = ins + self.scoring.gap_extend;
                let i_score = i_open.max(i_extend);
                let m_score = s_diag + self.scoring.score(p, query[j - 1]);
                let best = m_score.max(d_score).max(i_score);

                let mut flags = 0u8;
                if d_extend == d_score {
                    flags |= AE_DEL_EXTEND;
                }
                if d_open == d_score {
                    flags |= AE_DEL_OPEN;
                }
                if i_extend == i_score {
                    flags |= AE_INS_EXTEND;
                }
                if i_open == i_score {
                    flags |= AE_INS_OPEN;
                }
                if m_score == best {
                    flags |= AE_DIAG;
                }
                if d_score == best {
                    flags |= AE_S_DEL;
                }
                if i_score == best {
                    flags |= AE_S_INS;
                }
                self.flags.set(i, j, flags);

                s_diag = self.s[j];
                self.s[j] = best;
                self.d[j] = d_score;
                ins = i_score;
            }
        }
        self.s[m]
    }

    /// The tie-resolving post-pass: walking the matrix in reverse,
    /// drop a gap-continuation bit whenever the gap could equally be
    /// opened at the cell, and keep a single S-plane choice
    /// (diagonal over deletion over insertion). After this pass the
    /// backward read is unambiguous.
    fn prune(&mut self, n: usize, m: usize) {
        for i in (0..=n).rev() {
            for j in (0..=m).rev() {
                let mut f = self.flags.get(i, j);
                if f & AE_DEL_OPEN != 0 && f & AE_DEL_EXTEND != 0 {
                    f &= !AE_DEL_EXTEND;
                }
                if f & AE_INS_OPEN != 0 && f & AE_INS_EXTEND != 0 {
                    f &= !AE_INS_EXTEND;
                }
                if f & AE_DIAG != 0 {
                    f &= !(AE_S_DEL | AE_S_INS);
                } else if f & AE_S_DEL != 0 {
                    f &= !AE_S_INS;
                }
                self.flags.set(i, j, f);
            }
        }
    }

    fn walk(&self, ref_seq: &[u8], query: &[u8], extended_cigar: bool) -> Result<CigarSequence> {
        let mut i = ref_seq.len();
        let mut j = query.len();
        let mut cigar = CigarSequence::new();
        let mut plane = Plane::Score;

        loop {
            if i == 0 && j == 0 && plane == Plane::Score {
                break;
            }
            let flags = self.flags.get(i, j);
            match plane {
                Plane::Score => {
                    if flags & AE_DIAG != 0 {
                        if i == 0 || j == 0 {
                            return Err(AlignError::InvalidEditOperation { i, j });
                        }
                        let op = if extended_cigar {
                            if ref_seq[i - 1] == query[j - 1] {
                                CigarOp::SeqMatch
                            } else {
                                CigarOp::SeqMismatch
                            }
                        } else {
                            CigarOp::Match
                        };
                        cigar.push(op, 1)?;
                        i -= 1;
                        j -= 1;
                    } else if flags & AE_S_DEL != 0 {
                        plane = Plane::Del;
                    } else if flags & AE_S_INS != 0 {
                        plane = Plane::Ins;
                    } else {
                        return Err(AlignError::InvalidEditOperation { i, j });
                    }
                }
                Plane::Del => {
                    if i == 0 {
                        return Err(AlignError::InvalidEditOperation { i, j });
                    }
                    cigar.push(CigarOp::Deletion, 1)?;
                    if flags & AE_DEL_EXTEND != 0 {
                        i -= 1;
                    } else if flags & AE_DEL_OPEN != 0 {
                        i -= 1;
                        plane = Plane::Score;
                    } else {
                        return Err(AlignError::InvalidEditOperation { i, j });
                    }
                }
                Plane::Ins => {
                    if j == 0 {
                        return Err(AlignError::InvalidEditOperation { i, j });
                    }
                    cigar.push(CigarOp::Insertion, 1)?;
                    if flags & AE_INS_EXTEND != 0 {
                        j -= 1;
                    } else if flags & AE_INS_OPEN != 0 {
                        j -= 1;
                        plane = Plane::Score;
                    } else {
                        return Err(AlignError::InvalidEditOperation { i, j });
                    }
                }
            }
        }

        cigar.reverse();
        Ok(cigar)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::AltschulEricksonAligner;
    use crate::align::{gotoh::GotohAligner, scoring::Scoring};

    fn ae() -> AltschulEricksonAligner {
        AltschulEricksonAligner::new(Scoring::default())
    }

    #[test]
    fn test_identical() {
        let alignment = ae().global(b"ACGTAACC", b"ACGTAACC", false).unwrap();
        assert_eq!(alignment.score, 80);
        assert_eq!(alignment.cigar.as_ref().unwrap().to_string(), "8M");
        assert_eq!(alignment.ref_start, Some(0));
        assert_eq!(alignment.query_start, Some(0));
    }

    #[test]
    fn test_single_base_query() {
        let alignment = ae().global(b"abc", b"b", false).unwrap();
        assert_eq!(alignment.score, -20);
        assert_eq!(alignment.cigar.as_ref().unwrap().to_string(), "1D1M1D");
    }

    #[test]
    fn test_empty_sequences() {
        let alignment = ae().global(b"ACG", b"", false).unwrap();
        assert_eq!(alignment.cigar.as_ref().unwrap().to_string(), "3D");
        let alignment = ae().global(b"", b"AC", false).unwrap();
        assert_eq!(alignment.cigar.as_ref().unwrap().to_string(), "2I");
    }

    #[test]
    fn test_extended_cigar() {
        let alignment = ae().global(b"AACCGGTT", b"AACCGCTT", true).unwrap();
        assert_eq!(alignment.cigar.as_ref().unwrap().to_string(), "5=1X2=");
    }

    /// Equal-score mismatch and indel paths resolve to the diagonal.
    #[test]
    fn test_tie_resolves_to_diagonal() {
        let scoring = Scoring::try_new(10, -30, -15, -6).unwrap();
        let alignment = AltschulEricksonAligner::new(scoring)
            .global(b"AAACCC", b"AACCCC", false)
            .unwrap();
        assert_eq!(alignment.score, 20);
        assert_eq!(alignment.cigar.as_ref().unwrap().to_string(), "6M");
    }

    #[rstest]
    #[case(b"AGACCAAGTCTCTGCTACCGTACATACT".as_slice(), b"GCTGGTGCGACACAT".as_slice())]
    #[case(b"GTTTTTTTTTTA".as_slice(), b"GTTTTTTTTTA".as_slice())]
    #[case(b"abbcbbd".as_slice(), b"acd".as_slice())]
    fn test_matches_gotoh_score_and_consumption(#[case] ref_seq: &[u8], #[case] query: &[u8]) {
        let gotoh = GotohAligner::new(Scoring::default())
            .global(ref_seq, query, false)
            .unwrap();
        let alignment = ae().global(ref_seq, query, false).unwrap();
        assert_eq!(alignment.score, gotoh.score);
        let cigar = alignment.cigar.as_ref().unwrap();
        assert_eq!(cigar.ref_len(None) as usize, ref_seq.len());
        assert_eq!(cigar.query_len(None, true) as usize, query.len());
    }

    #[test]
    fn test_score_only() {
        let full = ae().global(b"abbcbbd", b"acd", false).unwrap();
        let score_only = ae().global_score(b"abbcbbd", b"acd").unwrap();
        assert_eq!(score_only.score, full.score);
        assert_eq!(score_only.cigar, None);
        assert_eq!(score_only.ref_start, None);
    }
}
