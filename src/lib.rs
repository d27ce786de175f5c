#![deny(unsafe_code)]
#![allow(
    clippy::must_use_candidate,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::too_many_lines,
    clippy::too_many_arguments,
    clippy::struct_excessive_bools,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

pub mod align;
pub mod cigar;
pub mod error;

pub use crate::{
    align::{
        align, align_altschul_erickson, alignment::Alignment, scoring::Scoring, AlignmentMode,
        AlignmentOptions, AlignmentOptionsBuilder,
    },
    cigar::{
        cigar_to_extended,
        ops::{CigarOp, OpId},
        CigarSequence,
    },
    error::{AlignError, Result},
};
