//! Chord slices ("moments") of a whole score and the queries run on them.
//!
//! A score is chordified into [`SliceEntry`] rows, written to a separated
//! values table, and later loaded back as an [`SvTable`] for counting set
//! classes, intervals and chord successions.

mod extract;
mod histogram;
mod query;
mod types;

pub use extract::{extract_slices, ScoreSlices};
pub use histogram::write_follow_histogram;
pub use query::{
    parse_triad_types, write_even_midi, Occurrences, SliceWidth, SvTable, TriadType,
    AUGMENTED_SIXTH_INTERVALS, REST_LABEL, SLICE_WIDTH_OPTIONS,
};
pub use types::{ChordInfo, QueryError, SliceEntry, SLICE_COLUMNS};
