use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    cigar::{ops::CigarOp, CigarSequence},
    error::{AlignError, Result},
};

/// The outcome of a pairwise alignment between a reference and a query
/// byte sequence.
///
/// Full alignments carry start coordinates and a CIGAR; score-only
/// alignments carry the optimal score and its end coordinates, with
/// `ref_start`, `query_start`, and `cigar` absent. Coordinates are
/// 0-based, stops exclusive, and exclude any clipped region: with a
/// full alignment, `ref_seq[ref_start..ref_stop]` is exactly the
/// reference region the CIGAR consumes.
#[derive(Debug, Eq, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct Alignment {
    /// The reference sequence handed to the aligner.
    pub ref_seq: Vec<u8>,

    /// Start of the aligned region on the reference.
    pub ref_start: Option<usize>,

    /// End of the aligned region on the reference (exclusive).
    pub ref_stop: usize,

    /// The query sequence handed to the aligner.
    pub query: Vec<u8>,

    /// Start of the aligned region on the query.
    pub query_start: Option<usize>,

    /// End of the aligned region on the query (exclusive).
    pub query_stop: usize,

    /// Edit operations over the aligned region.
    pub cigar: Option<CigarSequence>,

    /// Alignment score.
    pub score: i32,
}

impl Alignment {
    /// Generates a padded text representation of the alignment for
    /// visualization. The returned strings are three rows as follows
    /// (minus the labels on the left):
    ///
    /// ```text
    /// query : ACGTGAACTGACT-ACTGTATGCG
    /// align : |||||  |||||| ||||||||.|
    /// ref   : ACGTG--CTGACTGACTGTATGGG
    /// ```
    ///
    /// Soft clips, hard clips, and padding are not rendered; skipped
    /// regions advance the reference silently.
    pub fn padded_string(&self) -> Result<(String, String, String)> {
        let mut query_buf = String::new();
        let mut align_buf = String::new();
        let mut ref_buf = String::new();
        let Some(cigar) = &self.cigar else {
            return Ok((query_buf, align_buf, ref_buf));
        };

        let mut ri = self.ref_start.unwrap_or(0);
        let mut qi = self.query_start.unwrap_or(0);
        for (op, count) in cigar.iter() {
            let len = count as usize;
            if op.consumes_ref() && ri + len > self.ref_seq.len() {
                return Err(AlignError::LengthMismatch(format!(
                    "{count}{op} overruns the reference ({} bases)",
                    self.ref_seq.len()
                )));
            }
            if op.consumes_read() && qi + len > self.query.len() {
                return Err(AlignError::LengthMismatch(format!(
                    "{count}{op} overruns the query ({} bases)",
                    self.query.len()
                )));
            }
            match op {
                CigarOp::Match | CigarOp::SeqMatch | CigarOp::SeqMismatch => {
                    for k in 0..len {
                        let (p, q) = (self.ref_seq[ri + k], self.query[qi + k]);
                        query_buf.push(q as char);
                        align_buf.push(if p == q { '|' } else { '.' });
                        ref_buf.push(p as char);
                    }
                    ri += len;
                    qi += len;
                }
                CigarOp::Insertion => {
                    for k in 0..len {
                        query_buf.push(self.query[qi + k] as char);
                        align_buf.push(' ');
                        ref_buf.push('-');
                    }
                    qi += len;
                }
                CigarOp::Deletion => {
                    for k in 0..len {
                        query_buf.push('-');
                        align_buf.push(' ');
                        ref_buf.push(self.ref_seq[ri + k] as char);
                    }
                    ri += len;
                }
                CigarOp::Skipped => ri += len,
                CigarOp::SoftClip => qi += len,
                CigarOp::HardClip | CigarOp::Padding => {}
            }
        }
        Ok((query_buf, align_buf, ref_buf))
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn span(start: Option<usize>, stop: usize) -> String {
            match start {
                Some(start) => format!("{start}-{stop}"),
                None => format!("?-{stop}"),
            }
        }
        write!(
            f,
            "ref-span: {} query-span: {} score: {} cigar: {}",
            span(self.ref_start, self.ref_stop),
            span(self.query_start, self.query_stop),
            self.score,
            self.cigar
                .as_ref()
                .map_or_else(|| "*".to_string(), ToString::to_string),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Alignment;
    use crate::error::AlignError;

    fn alignment(ref_seq: &[u8], query: &[u8], cigar: &str) -> Alignment {
        Alignment {
            ref_seq: ref_seq.to_vec(),
            ref_start: Some(0),
            ref_stop: ref_seq.len(),
            query: query.to_vec(),
            query_start: Some(0),
            query_stop: query.len(),
            cigar: Some(cigar.parse().unwrap()),
            score: 0,
        }
    }

    #[test]
    fn test_padded_string() {
        let alignment = alignment(b"ACGGTACT", b"ACGTAGCA", "3M1D2M1I2M");
        let (query_buf, align_buf, ref_buf) = alignment.padded_string().unwrap();
        assert_eq!(query_buf, "ACG-TAGCA");
        assert_eq!(align_buf, "||| || |.");
        assert_eq!(ref_buf, "ACGGTA-CT");
    }

    #[test]
    fn test_padded_string_overrun() {
        let alignment = alignment(b"ACG", b"ACGT", "4M");
        assert!(matches!(
            alignment.padded_string(),
            Err(AlignError::LengthMismatch(_))
        ));
    }

    #[test]
    fn test_display_score_only() {
        let alignment = Alignment {
            ref_seq: b"ACGT".to_vec(),
            ref_stop: 4,
            query: b"ACGT".to_vec(),
            query_stop: 4,
            score: 40,
            ..Alignment::default()
        };
        assert_eq!(
            alignment.to_string(),
            "ref-span: ?-4 query-span: ?-4 score: 40 cigar: *"
        );
    }
}
