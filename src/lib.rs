//! Extract analytical slices and melodic segments from symbolic scores and
//! write them out as separated-values tables.
//!
//! The crate has two independent pipelines:
//! - [`slices`]: chordify a whole score into simultaneities and rests, write
//!   one row per slice, and query those tables afterwards.
//! - [`segments`]: split a single line into rest-delimited segments, describe
//!   and filter them, and re-render matches as fragments.
pub mod analysis;
pub mod config;
pub mod corpus;
pub mod score;
pub mod segments;
pub mod slices;
pub mod table;
