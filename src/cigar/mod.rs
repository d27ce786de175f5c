//! A packed, mutable run-length CIGAR container and its conversions.

pub mod ops;

use std::{fmt, str::FromStr};

use itertools::Itertools;
use noodles::sam::record::{cigar::op::Op, Cigar as SamCigar};
use serde::{Deserialize, Serialize};

use crate::error::{AlignError, Result};
use ops::{CigarOp, OpId};

/// Low 4 bits of a packed word hold the operator code, the rest the count.
const OP_MASK: u32 = 0xf;
const COUNT_SHIFT: u32 = 4;

/// Smallest number of words the backing buffer reserves.
const MIN_CAPACITY: usize = 4;

#[inline]
fn pack(op: CigarOp, count: u32) -> u32 {
    (count << COUNT_SHIFT) | u32::from(op.code())
}

#[inline]
fn unpack(word: u32) -> (CigarOp, u32) {
    (CigarOp::ALL[(word & OP_MASK) as usize], word >> COUNT_SHIFT)
}

/// An ordered sequence of normalized `(operator, count)` runs, stored as
/// packed 32-bit words: `(count << 4) | code`.
///
/// The sequence is kept normalized: no two adjacent runs share an
/// operator code, every count is at least one. Equality and string
/// round-tripping rely on this. Counts are trusted to stay within 28
/// bits, matching the binary aligned-read encoding.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct CigarSequence {
    words: Vec<u32>,
}

impl CigarSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            words: Vec::with_capacity(capacity.max(MIN_CAPACITY)),
        }
    }

    /// Parses a CIGAR string such as `150M3I5D`. A bare operator
    /// character means count one; digits with no trailing operator are
    /// an error.
    pub fn from_text(text: &[u8]) -> Result<Self> {
        let mut cigar = Self::new();
        let mut count: u32 = 0;
        let mut has_digits = false;
        for &b in text {
            if b.is_ascii_digit() {
                count = count * 10 + u32::from(b - b'0');
                has_digits = true;
            } else {
                let op = CigarOp::from_char(b)?;
                cigar.push(op, if has_digits { count } else { 1 })?;
                count = 0;
                has_digits = false;
            }
        }
        if has_digits {
            return Err(AlignError::TrailingDigits(
                String::from_utf8_lossy(text).into_owned(),
            ));
        }
        Ok(cigar)
    }

    /// Builds a sequence from packed binary words.
    pub fn from_words(words: &[u32]) -> Result<Self> {
        let mut cigar = Self::new();
        cigar.extend_from_words(words)?;
        Ok(cigar)
    }

    /// Builds a sequence from the little-endian byte form of the packed
    /// words, as found in the binary aligned-read format.
    pub fn from_le_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(AlignError::LengthMismatch(format!(
                "binary CIGAR buffer of {} bytes is not a whole number of 32-bit words",
                bytes.len()
            )));
        }
        let words: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Self::from_words(&words)
    }

    /// Builds a sequence from `(identifier, count)` pairs, where the
    /// identifier may be an operator, a binary code, or a character.
    pub fn from_pairs<T, I>(pairs: I) -> Result<Self>
    where
        T: Into<OpId>,
        I: IntoIterator<Item = (T, u32)>,
    {
        let mut cigar = Self::new();
        cigar.extend_pairs(pairs)?;
        Ok(cigar)
    }

    /// Builds a sequence from the CIGAR of an aligned-read record.
    pub fn from_sam_cigar(cigar: &SamCigar) -> Result<Self> {
        let mut out = Self::new();
        for op in cigar.iter() {
            out.push(CigarOp::from_sam_kind(op.kind()), op.len() as u32)?;
        }
        Ok(out)
    }

    /// Number of runs (not bases).
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The packed word representation.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Iterates `(operator, count)` runs in order.
    pub fn iter(&self) -> impl Iterator<Item = (CigarOp, u32)> + '_ {
        self.words.iter().map(|&w| unpack(w))
    }

    fn reserve_one(&mut self) -> Result<()> {
        if self.words.len() == self.words.capacity() {
            // Double the buffer, never reserving fewer than MIN_CAPACITY
            // words. On failure the sequence is left untouched.
            let additional = self.words.capacity().max(MIN_CAPACITY);
            self.words
                .try_reserve_exact(additional)
                .map_err(AlignError::OutOfMemory)?;
        }
        Ok(())
    }

    /// Appends a run, coalescing into the tail run when the operator
    /// matches. A zero count is a no-op.
    pub fn push(&mut self, op: CigarOp, count: u32) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        if let Some(last) = self.words.last_mut() {
            if *last & OP_MASK == u32::from(op.code()) {
                *last += count << COUNT_SHIFT;
                return Ok(());
            }
        }
        self.reserve_one()?;
        self.words.push(pack(op, count));
        Ok(())
    }

    /// Appends `(identifier, count)` pairs with coalescing.
    pub fn extend_pairs<T, I>(&mut self, pairs: I) -> Result<()>
    where
        T: Into<OpId>,
        I: IntoIterator<Item = (T, u32)>,
    {
        for (id, count) in pairs {
            self.push(id.into().resolve()?, count)?;
        }
        Ok(())
    }

    /// Appends packed binary words. The words are copied verbatim,
    /// except that a first word matching the existing tail operator is
    /// folded into the tail run. Counts are trusted to stay within the
    /// 28-bit field.
    pub fn extend_from_words(&mut self, words: &[u32]) -> Result<()> {
        for &w in words {
            if w & OP_MASK > 8 {
                return Err(AlignError::UnknownOperatorCode((w & OP_MASK) as u8));
            }
        }
        let mut rest = words;
        if let (Some(last), Some(&first)) = (self.words.last_mut(), words.first()) {
            if *last & OP_MASK == first & OP_MASK {
                *last += first & !OP_MASK;
                rest = &words[1..];
            }
        }
        self.words
            .try_reserve(rest.len())
            .map_err(AlignError::OutOfMemory)?;
        self.words.extend_from_slice(rest);
        Ok(())
    }

    /// Removes and returns the last run.
    pub fn pop(&mut self) -> Result<(CigarOp, u32)> {
        self.words.pop().map(unpack).ok_or(AlignError::EmptySequence)
    }

    /// Reverses the runs in place. Reversal of a normalized sequence is
    /// still normalized.
    pub fn reverse(&mut self) {
        self.words.reverse();
    }

    /// Copies out the runs selected by `start..stop` with the given
    /// step (negative steps walk the window backwards). The selected
    /// words are copied as-is: runs adjacent after slicing are *not*
    /// re-coalesced, so the caller sees the original run boundaries.
    pub fn slice(&self, start: usize, stop: usize, step: isize) -> CigarSequence {
        assert!(step != 0, "slice step must be non-zero");
        let stop = stop.min(self.words.len());
        let start = start.min(stop);
        let words: Vec<u32> = if step > 0 {
            (start..stop)
                .step_by(step as usize)
                .map(|i| self.words[i])
                .collect()
        } else {
            (start..stop)
                .rev()
                .step_by(step.unsigned_abs())
                .map(|i| self.words[i])
                .collect()
        };
        CigarSequence { words }
    }

    /// Produces the sequence describing the same alignment with the
    /// reference and query roles swapped.
    ///
    /// Hard and soft clips are stripped from the body; the count of the
    /// first stripped soft clip is returned as `s_left` and any later
    /// stripped soft clips accumulate into `s_right`. Every remaining
    /// operator is replaced by its inverse. `left_clip` and
    /// `right_clip` bracket the result with fresh soft-clip runs.
    ///
    /// Returns `(inverted, s_left, s_right)`.
    pub fn invert(&self, left_clip: i64, right_clip: i64) -> Result<(CigarSequence, u32, u32)> {
        if left_clip < 0 {
            return Err(AlignError::InvalidClip(left_clip));
        }
        if right_clip < 0 {
            return Err(AlignError::InvalidClip(right_clip));
        }
        let mut out = Self::new();
        let mut s_left = 0u32;
        let mut s_right = 0u32;
        let mut seen_soft = false;
        out.push(CigarOp::SoftClip, left_clip as u32)?;
        for (op, count) in self.iter() {
            match op {
                CigarOp::HardClip => {}
                CigarOp::SoftClip => {
                    if seen_soft {
                        s_right += count;
                    } else {
                        s_left = count;
                        seen_soft = true;
                    }
                }
                _ => out.push(op.inverse()?, count)?,
            }
        }
        out.push(CigarOp::SoftClip, right_clip as u32)?;
        Ok((out, s_left, s_right))
    }

    /// Rewrites every SKIPPED run into a SOFT_CLIP run in place,
    /// leaving counts and run boundaries alone. Runs made adjacent to
    /// an existing soft clip are deliberately not re-coalesced, so the
    /// original boundaries stay visible downstream.
    pub fn convert_n_to_s(&mut self) {
        let n = u32::from(CigarOp::Skipped.code());
        let s = u32::from(CigarOp::SoftClip.code());
        for w in &mut self.words {
            if *w & OP_MASK == n {
                *w = (*w & !OP_MASK) | s;
            }
        }
    }

    /// Total count over all runs of the given operator.
    pub fn count(&self, op: CigarOp) -> u32 {
        self.iter().filter(|(o, _)| *o == op).map(|(_, n)| n).sum()
    }

    /// Sum of counts for operators that consume reference or read
    /// bases. Soft clips contribute only when `include_soft_clip`.
    pub fn gapped_len(&self, include_soft_clip: bool) -> u32 {
        self.iter()
            .filter(|&(op, _)| {
                (op.consumes_ref() || op.consumes_read())
                    && (op != CigarOp::SoftClip || include_soft_clip)
            })
            .map(|(_, n)| n)
            .sum()
    }

    /// Reference bases consumed by the sequence.
    ///
    /// With `query_bases` set, runs are walked until the read-side
    /// consumption would meet or exceed that bound; the final run is
    /// only counted for the portion that fits.
    pub fn ref_len(&self, query_bases: Option<u32>) -> u32 {
        let mut ref_total = 0u32;
        let mut read_total = 0u32;
        for (op, count) in self.iter() {
            if let Some(cap) = query_bases {
                if op.consumes_read() && read_total + count >= cap {
                    if op.consumes_ref() {
                        ref_total += cap - read_total;
                    }
                    return ref_total;
                }
            }
            if op.consumes_ref() {
                ref_total += count;
            }
            if op.consumes_read() {
                read_total += count;
            }
        }
        ref_total
    }

    /// Read bases consumed by the sequence, optionally including soft
    /// clips, optionally capped at `ref_bases` reference bases with the
    /// same partial-count rule as [`CigarSequence::ref_len`].
    pub fn query_len(&self, ref_bases: Option<u32>, include_soft_clip: bool) -> u32 {
        let mut ref_total = 0u32;
        let mut read_total = 0u32;
        for (op, count) in self.iter() {
            let consumes_read =
                op.consumes_read() && (op != CigarOp::SoftClip || include_soft_clip);
            if let Some(cap) = ref_bases {
                if op.consumes_ref() && ref_total + count >= cap {
                    if consumes_read {
                        read_total += cap - ref_total;
                    }
                    return read_total;
                }
            }
            if op.consumes_ref() {
                ref_total += count;
            }
            if consumes_read {
                read_total += count;
            }
        }
        read_total
    }

    /// Runs as `(binary code, count)` pairs.
    pub fn to_pairs(&self) -> Vec<(u8, u32)> {
        self.iter().map(|(op, n)| (op.code(), n)).collect()
    }

    /// Runs as `(operator, count)` pairs.
    pub fn to_op_pairs(&self) -> Vec<(CigarOp, u32)> {
        self.iter().collect()
    }

    /// The little-endian byte form of the packed words.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    /// Converts to an aligned-read record CIGAR.
    pub fn to_sam_cigar(&self) -> SamCigar {
        let ops: Vec<Op> = self
            .iter()
            .map(|(op, n)| Op::new(op.sam_kind(), n as usize))
            .collect();
        SamCigar::try_from(ops).unwrap()
    }
}

impl fmt::Display for CigarSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.iter()
                .format_with("", |(op, n), g| g(&format_args!("{n}{}", op.as_char())))
        )
    }
}

impl FromStr for CigarSequence {
    type Err = AlignError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_text(s.as_bytes())
    }
}

impl TryFrom<&[u8]> for CigarSequence {
    type Error = AlignError;

    fn try_from(text: &[u8]) -> Result<Self> {
        Self::from_text(text)
    }
}

/// Expands every MATCH run of `cigar` into SEQ_MATCH / SEQ_MISMATCH
/// runs by comparing the reference and query bases each aligned column
/// consumes, starting from the given offsets (defaulting to zero). All
/// other runs are copied unchanged.
pub fn cigar_to_extended(
    cigar: &CigarSequence,
    ref_seq: &[u8],
    query: &[u8],
    ref_start: Option<usize>,
    query_start: Option<usize>,
) -> Result<CigarSequence> {
    let mut ri = ref_start.unwrap_or(0);
    let mut qi = query_start.unwrap_or(0);
    let mut out = CigarSequence::new();
    for (op, count) in cigar.iter() {
        let len = count as usize;
        if op.consumes_ref() && ri + len > ref_seq.len() {
            return Err(AlignError::LengthMismatch(format!(
                "{count}{op} needs reference bases {ri}..{} but the reference has {}",
                ri + len,
                ref_seq.len()
            )));
        }
        if op.consumes_read() && qi + len > query.len() {
            return Err(AlignError::LengthMismatch(format!(
                "{count}{op} needs query bases {qi}..{} but the query has {}",
                qi + len,
                query.len()
            )));
        }
        if op == CigarOp::Match {
            for k in 0..len {
                let ext = if ref_seq[ri + k] == query[qi + k] {
                    CigarOp::SeqMatch
                } else {
                    CigarOp::SeqMismatch
                };
                out.push(ext, 1)?;
            }
        } else {
            out.push(op, count)?;
        }
        if op.consumes_ref() {
            ri += len;
        }
        if op.consumes_read() {
            qi += len;
        }
    }
    Ok(out)
}
