// The dynamic-programming layout follows the classic rust-bio pairwise
// module (https://github.com/rust-bio/rust-bio), Copyright 2014-2015
// Johannes Köster, Vadim Nazarov, Patrick Marks, MIT license.

use std::iter::repeat;

use crate::{
    align::{
        alignment::Alignment,
        constants::{DEFAULT_ALIGNER_CAPACITY, MIN_SCORE},
        scoring::Scoring,
        traceback::{
            traceback, Traceback, TRACE_DEL, TRACE_INS, TRACE_MATCH, TRACE_NEXT_DEL,
            TRACE_NEXT_INS,
        },
    },
    cigar::CigarSequence,
    error::Result,
};

/// Gotoh affine-gap aligner over three coupled score planes.
///
/// `S(i,j)` is the best score for the prefixes `ref[0..i]`, `query[0..j]`;
/// `D(i,j)` the best score with `(i,j)` ending in a deletion (a gap
/// consuming reference bases); `I(i,j)` the best score ending in an
/// insertion (a gap consuming query bases).
///
/// Only one row of `S` and one row of `D` are kept; `I` is a scalar
/// walking rightward across each row. Full kernels additionally record
/// one flag byte per cell for the traceback.
pub struct GotohAligner {
    scoring: Scoring,
    s: Vec<i32>,
    d: Vec<i32>,
    traceback: Traceback,
}

impl GotohAligner {
    pub fn new(scoring: Scoring) -> Self {
        Self::with_capacity(DEFAULT_ALIGNER_CAPACITY, DEFAULT_ALIGNER_CAPACITY, scoring)
    }

    /// Creates an aligner with size hints to avoid re-allocating the
    /// score vectors; `n` and `m` are the expected reference and query
    /// lengths.
    pub fn with_capacity(n: usize, m: usize, scoring: Scoring) -> Self {
        Self {
            scoring,
            s: Vec::with_capacity(m + 1),
            d: Vec::with_capacity(m + 1),
            traceback: Traceback::with_capacity(n, m),
        }
    }

    /// Seeds the row vectors. The first `S` row is the affine gap ramp
    /// for global alignment and all zeros otherwise; `D` is forbidden
    /// everywhere above the first reference base.
    fn init_vectors(&mut self, m: usize, global: bool) {
        self.s.clear();
        self.d.clear();
        self.d.extend(repeat(MIN_SCORE).take(m + 1));
        if global {
            self.s.push(0);
            for j in 1..=m {
                self.s
                    .push(self.scoring.gap_open + self.scoring.gap_extend * (j as i32 - 1));
            }
        } else {
            self.s.extend(repeat(0).take(m + 1));
        }
    }

    fn make_alignment(
        &self,
        ref_seq: &[u8],
        query: &[u8],
        starts: Option<(usize, usize)>,
        stops: (usize, usize),
        cigar: Option<CigarSequence>,
        score: i32,
    ) -> Alignment {
        Alignment {
            ref_seq: ref_seq.to_vec(),
            ref_start: starts.map(|(i, _)| i),
            ref_stop: stops.0,
            query: query.to_vec(),
            query_start: starts.map(|(_, j)| j),
            query_stop: stops.1,
            cigar,
            score,
        }
    }

    /// Global (Needleman–Wunsch) alignment with full traceback.
    pub fn global(
        &mut self,
        ref_seq: &[u8],
        query: &[u8],
        extended_cigar: bool,
    ) -> Result<Alignment> {
        let (n, m) = (ref_seq.len(), query.len());
        self.init_vectors(m, true);
        self.traceback.init(n, m);
        for j in 1..=m {
            let next = if j > 1 { TRACE_NEXT_INS } else { 0 };
            self.traceback.set(0, j, TRACE_INS | next);
        }
        for i in 1..=n {
            let next = if i > 1 { TRACE_NEXT_DEL } else { 0 };
            self.traceback.set(i, 0, TRACE_DEL | next);
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
                if d_extend >= d_open {
                    flags |= TRACE_NEXT_DEL;
                }
                if i_extend >= i_open {
                    flags |= TRACE_NEXT_INS;
                }
                if m_score == best {
                    flags |= TRACE_MATCH;
                }
                if d_score == best {
                    flags |= TRACE_DEL;
                }
                if i_score == best {
                    flags |= TRACE_INS;
                }
                self.traceback.set(i, j, flags);

                s_diag = self.s[j];
                self.s[j] = best;
                self.d[j] = d_score;
                ins = i_score;
            }
        }

        let score = self.s[m];
        let (cigar, ref_start, query_start) = traceback(
            &self.traceback,
            ref_seq,
            query,
            n,
            m,
            extended_cigar,
            false,
            true,
        )?;
        Ok(self.make_alignment(
            ref_seq,
            query,
            Some((ref_start, query_start)),
            (n, m),
            Some(cigar),
            score,
        ))
    }

    /// Global alignment, score only.
    pub fn global_score(&mut self, ref_seq: &[u8], query: &[u8]) -> Result<Alignment> {
        let (n, m) = (ref_seq.len(), query.len());
        self.init_vectors(m, true);
        for i in 1..=n {
            let p = ref_seq[i - 1];
            let mut s_diag = self.s[0];
            self.s[0] = self.scoring.gap_open + self.scoring.gap_extend * (i as i32 - 1);
            let mut ins = MIN_SCORE;
            for j in 1..=m {
                let d_score =
                    (self.s[j] + self.scoring.gap_open).max(self.d[j] + self.scoring.gap_extend);
                let i_score =
                    (self.s[j - 1] + self.scoring.gap_open).max(ins + self.scoring.gap_extend);
                let m_score = s_diag + self.scoring.score(p, query[j - 1]);
                let best = m_score.max(d_score).max(i_score);
                s_diag = self.s[j];
                self.s[j] = best;
                self.d[j] = d_score;
                ins = i_score;
            }
        }
        Ok(self.make_alignment(ref_seq, query, None, (n, m), None, self.s[m]))
    }

    /// Local (Smith–Waterman) alignment with full traceback.
    ///
    /// Cells where every candidate falls to zero or below carry no
    /// direction bits; they are the stop cells of the traceback. The
    /// gap-extension bits are still recorded so a gap run crossing a
    /// floored cell replays intact.
    pub fn local(
        &mut self,
        ref_seq: &[u8],
        query: &[u8],
        extended_cigar: bool,
        soft_clip: bool,
    ) -> Result<Alignment> {
        let (n, m) = (ref_seq.len(), query.len());
        self.init_vectors(m, false);
        self.traceback.init(n, m);
        let mut best = (0i32, 0usize, 0usize);

        for i in 1..=n {
            let p = ref_seq[i - 1];
            let mut s_diag = self.s[0];
            self.s[0] = 0;
            let mut ins = MIN_SCORE;
            for j in 1..=m {
                let d_open = self.s[j] + self.scoring.gap_open;
                let d_extend = self.d[j] + self.scoring.gap_extend;
                let d_score = d_open.max(d_extend);
                let i_open = self.s[j - 1] + self.scoring.gap_open;
                let i_extend = ins + self.scoring.gap_extend;
                let i_score = i_open.max(i_extend);
                let m_score = s_diag + self.scoring.score(p, query[j - 1]);
                let best_cell = m_score.max(d_score).max(i_score);

                let mut flags = 0u8;
                if d_extend >= d_open {
                    flags |= TRACE_NEXT_DEL;
                }
                if i_extend >= i_open {
                    flags |= TRACE_NEXT_INS;
                }
                let s_val = if best_cell > 0 {
                    if m_score == best_cell {
                        flags |= TRACE_MATCH;
                    }
                    if d_score == best_cell {
                        flags |= TRACE_DEL;
                    }
                    if i_score == best_cell {
                        flags |= TRACE_INS;
                    }
                    best_cell
                } else {
                    0
                };
                self.traceback.set(i, j, flags);

                if s_val > best.0 {
                    best = (s_val, i, j);
                }
                s_diag = self.s[j];
                self.s[j] = s_val;
                self.d[j] = d_score;
                ins = i_score;
            }
        }

        let (score, ref_stop, query_stop) = best;
        let (cigar, ref_start, query_start) = traceback(
            &self.traceback,
            ref_seq,
            query,
            ref_stop,
            query_stop,
            extended_cigar,
            soft_clip,
            false,
        )?;
        Ok(self.make_alignment(
            ref_seq,
            query,
            Some((ref_start, query_start)),
            (ref_stop, query_stop),
            Some(cigar),
            score,
        ))
    }

    /// Local alignment, score only.
    pub fn local_score(&mut self, ref_seq: &[u8], query: &[u8]) -> Result<Alignment> {
        let (n, m) = (ref_seq.len(), query.len());
        self.init_vectors(m, false);
        let mut best = (0i32, 0usize, 0usize);
        for i in 1..=n {
            let p = ref_seq[i - 1];
            let mut s_diag = self.s[0];
            self.s[0] = 0;
            let mut ins = MIN_SCORE;
            for j in 1..=m {
                let d_score =
                    (self.s[j] + self.scoring.gap_open).max(self.d[j] + self.scoring.gap_extend);
                let i_score =
                    (self.s[j - 1] + self.scoring.gap_open).max(ins + self.scoring.gap_extend);
                let m_score = s_diag + self.scoring.score(p, query[j - 1]);
                let s_val = m_score.max(d_score).max(i_score).max(0);
                if s_val > best.0 {
                    best = (s_val, i, j);
                }
                s_diag = self.s[j];
                self.s[j] = s_val;
                self.d[j] = d_score;
                ins = i_score;
            }
        }
        let (score, ref_stop, query_stop) = best;
        Ok(self.make_alignment(ref_seq, query, None, (ref_stop, query_stop), None, score))
    }

    /// Glocal alignment: free leading gaps on both sequences, terminal
    /// cell chosen over the last row and last column.
    pub fn glocal(
        &mut self,
        ref_seq: &[u8],
        query: &[u8],
        extended_cigar: bool,
        soft_clip: bool,
    ) -> Result<Alignment> {
        self.semi_global(ref_seq, query, false, extended_cigar, soft_clip)
    }

    /// Glocal alignment, score only.
    pub fn glocal_score(&mut self, ref_seq: &[u8], query: &[u8]) -> Result<Alignment> {
        self.semi_global_score(ref_seq, query, false)
    }

    /// Local-global alignment: glocal boundaries, but the path is
    /// forced to terminate at the end of both sequences.
    pub fn local_global(
        &mut self,
        ref_seq: &[u8],
        query: &[u8],
        extended_cigar: bool,
        soft_clip: bool,
    ) -> Result<Alignment> {
        self.semi_global(ref_seq, query, true, extended_cigar, soft_clip)
    }

    /// Local-global alignment, score only.
    pub fn local_global_score(&mut self, ref_seq: &[u8], query: &[u8]) -> Result<Alignment> {
        self.semi_global_score(ref_seq, query, true)
    }

    fn semi_global(
        &mut self,
        ref_seq: &[u8],
        query: &[u8],
        to_corner: bool,
        extended_cigar: bool,
        soft_clip: bool,
    ) -> Result<Alignment> {
        let (n, m) = (ref_seq.len(), query.len());
        self.init_vectors(m, false);
        self.traceback.init(n, m);
        // best of the last column (query exhausted), seeded with row 0
        let mut col_best = (self.s[m], 0usize);

        for i in 1..=n {
            let p = ref_seq[i - 1];
            let mut s_diag = self.s[0];
            self.s[0] = 0;
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
                if d_extend >= d_open {
                    flags |= TRACE_NEXT_DEL;
                }
                if i_extend >= i_open {
                    flags |= TRACE_NEXT_INS;
                }
                if m_score == best {
                    flags |= TRACE_MATCH;
                }
                if d_score == best {
                    flags |= TRACE_DEL;
                }
                if i_score == best {
                    flags |= TRACE_INS;
                }
                self.traceback.set(i, j, flags);

                s_diag = self.s[j];
                self.s[j] = best;
                self.d[j] = d_score;
                ins = i_score;
            }
            if self.s[m] > col_best.0 {
                col_best = (self.s[m], i);
            }
        }

        let (score, ref_stop, query_stop) = self.pick_semi_global_end(n, m, to_corner, col_best);
        let (cigar, ref_start, query_start) = traceback(
            &self.traceback,
            ref_seq,
            query,
            ref_stop,
            query_stop,
            extended_cigar,
            soft_clip,
            false,
        )?;
        Ok(self.make_alignment(
            ref_seq,
            query,
            Some((ref_start, query_start)),
            (ref_stop, query_stop),
            Some(cigar),
            score,
        ))
    }

    fn semi_global_score(
        &mut self,
        ref_seq: &[u8],
        query: &[u8],
        to_corner: bool,
    ) -> Result<Alignment> {
        let (n, m) = (ref_seq.len(), query.len());
        self.init_vectors(m, false);
        let mut col_best = (self.s[m], 0usize);
        for i in 1..=n {
            let p = ref_seq[i - 1];
            let mut s_diag = self.s[0];
            self.s[0] = 0;
            let mut ins = MIN_SCORE;
            for j in 1..=m {
                let d_score =
                    (self.s[j] + self.scoring.gap_open).max(self.d[j] + self.scoring.gap_extend);
                let i_score =
                    (self.s[j - 1] + self.scoring.gap_open).max(ins + self.scoring.gap_extend);
                let m_score = s_diag + self.scoring.score(p, query[j - 1]);
                let best = m_score.max(d_score).max(i_score);
                s_diag = self.s[j];
                self.s[j] = best;
                self.d[j] = d_score;
                ins = i_score;
            }
            if self.s[m] > col_best.0 {
                col_best = (self.s[m], i);
            }
        }
        let (score, ref_stop, query_stop) = self.pick_semi_global_end(n, m, to_corner, col_best);
        Ok(self.make_alignment(ref_seq, query, None, (ref_stop, query_stop), None, score))
    }

    /// Picks the terminal cell for the semi-global kernels: the corner
    /// when forced, otherwise the greater of the last-row and
    /// last-column maxima, ties going to the last column.
    fn pick_semi_global_end(
        &self,
        n: usize,
        m: usize,
        to_corner: bool,
        col_best: (i32, usize),
    ) -> (i32, usize, usize) {
        if to_corner {
            return (self.s[m], n, m);
        }
        let mut row_best = (self.s[0], 0usize);
        for j in 1..=m {
            if self.s[j] > row_best.0 {
                row_best = (self.s[j], j);
            }
        }
        if row_best.0 > col_best.0 {
            (row_best.0, n, row_best.1)
        } else {
            (col_best.0, col_best.1, m)
        }
    }
}
