//! Writing conversion results: output files, naming, and source housekeeping.

pub mod naming;
pub mod output;
pub mod source;
