use serde::{Deserialize, Serialize};

use crate::error::{AlignError, Result};

/// Details of scoring are encapsulated in this structure.
///
/// An [affine gap score model](https://en.wikipedia.org/wiki/Gap_penalty#Affine)
/// is used so that the gap score for a length `k` is:
/// `GapScore(k) = gap_open + gap_extend * (k - 1)`
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct Scoring {
    pub match_score: i32,
    pub mismatch_score: i32,
    pub gap_open: i32,
    pub gap_extend: i32,
}

impl Scoring {
    /// Creates a new scoring instance, checking the parameter
    /// preconditions up front:
    ///
    /// * `match_score > mismatch_score`
    /// * `match_score > gap_open`
    /// * `match_score > gap_extend`
    /// * `gap_open <= gap_extend`
    pub fn try_new(
        match_score: i32,
        mismatch_score: i32,
        gap_open: i32,
        gap_extend: i32,
    ) -> Result<Self> {
        if match_score <= mismatch_score {
            return Err(AlignError::InvalidScoring(
                "match score must be greater than the mismatch score",
            ));
        }
        if match_score <= gap_open {
            return Err(AlignError::InvalidScoring(
                "match score must be greater than the gap open score",
            ));
        }
        if match_score <= gap_extend {
            return Err(AlignError::InvalidScoring(
                "match score must be greater than the gap extend score",
            ));
        }
        if gap_open > gap_extend {
            return Err(AlignError::InvalidScoring(
                "gap open score must not be greater than the gap extend score",
            ));
        }
        Ok(Self {
            match_score,
            mismatch_score,
            gap_open,
            gap_extend,
        })
    }

    /// Score for aligning byte `p` against byte `q`.
    #[inline]
    pub fn score(&self, p: u8, q: u8) -> i32 {
        if p == q {
            self.match_score
        } else {
            self.mismatch_score
        }
    }
}

impl Default for Scoring {
    fn default() -> Self {
        Self {
            match_score: 10,
            mismatch_score: -9,
            gap_open: -15,
            gap_extend: -6,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::Scoring;
    use crate::error::AlignError;

    #[test]
    fn test_defaults_are_valid() {
        let d = Scoring::default();
        Scoring::try_new(d.match_score, d.mismatch_score, d.gap_open, d.gap_extend).unwrap();
    }

    #[rstest]
    #[case(10, 10, -15, -6)] // match not above mismatch
    #[case(-20, -21, -15, -6)] // match not above gap open
    #[case(-7, -21, -15, -6)] // match not above gap extend
    #[case(10, -9, -6, -15)] // open above extend
    fn test_invalid_scoring(
        #[case] match_score: i32,
        #[case] mismatch_score: i32,
        #[case] gap_open: i32,
        #[case] gap_extend: i32,
    ) {
        assert!(matches!(
            Scoring::try_new(match_score, mismatch_score, gap_open, gap_extend),
            Err(AlignError::InvalidScoring(_))
        ));
    }

    #[test]
    fn test_substitution_score() {
        let scoring = Scoring::default();
        assert_eq!(scoring.score(b'A', b'A'), 10);
        assert_eq!(scoring.score(b'A', b'C'), -9);
        assert_eq!(scoring.score(b'a', b'A'), -9);
    }
}
