use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::score::{Pitch, QuarterLength};
use crate::table::repr::{format_set, parse_set};
use crate::table::{expect_fields, TableRow};

/// Column names of a segment table, in order.
pub const SEGMENT_HEADER: [&str; 7] = [
    "startingMeasure",
    "startingOffset",
    "endingMeasure",
    "endingOffset",
    "intervals",
    "noteValues",
    "metricalPositions",
];

/// A note of a melodic line, positioned within its measure.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentNote {
    pub pitch: Pitch,
    /// Measure number as written in the score.
    pub measure: i32,
    /// Offset from the start of the measure.
    pub offset: QuarterLength,
    pub duration: QuarterLength,
}

impl SegmentNote {
    pub fn end(&self) -> QuarterLength {
        self.offset + self.duration
    }
}

/// A run of notes bounded by rests. Never empty, never contains a rest.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub notes: Vec<SegmentNote>,
}

impl Segment {
    pub fn first(&self) -> &SegmentNote {
        &self.notes[0]
    }

    pub fn last(&self) -> &SegmentNote {
        &self.notes[self.notes.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// Summary of one segment: where it starts and ends and what it uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentInfo {
    pub starting_measure: i32,
    pub starting_offset: QuarterLength,
    pub ending_measure: i32,
    pub ending_offset: QuarterLength,
    pub intervals: BTreeSet<String>,
    pub note_values: BTreeSet<QuarterLength>,
    pub metrical_positions: BTreeSet<QuarterLength>,
}

fn parse_lengths(cell: &str) -> Result<BTreeSet<QuarterLength>, String> {
    parse_set(cell)?
        .iter()
        .map(|item| item.parse::<QuarterLength>().map_err(|e| e.to_string()))
        .collect()
}

fn parse_measure(cell: &str) -> Result<i32, String> {
    cell.trim()
        .parse()
        .map_err(|_| format!("invalid measure number {:?}", cell))
}

fn parse_offset(cell: &str) -> Result<QuarterLength, String> {
    cell.parse().map_err(|e: crate::score::ParseQuarterLengthError| e.to_string())
}

impl TableRow for SegmentInfo {
    const HEADER: Option<&'static [&'static str]> = Some(&SEGMENT_HEADER);

    fn to_record(&self) -> Vec<String> {
        vec![
            self.starting_measure.to_string(),
            self.starting_offset.to_string(),
            self.ending_measure.to_string(),
            self.ending_offset.to_string(),
            format_set(&self.intervals, true),
            format_set(&self.note_values, false),
            format_set(&self.metrical_positions, false),
        ]
    }

    fn from_record(fields: &[&str]) -> Result<Self, String> {
        expect_fields(fields, SEGMENT_HEADER.len())?;
        Ok(SegmentInfo {
            starting_measure: parse_measure(fields[0])?,
            starting_offset: parse_offset(fields[1])?,
            ending_measure: parse_measure(fields[2])?,
            ending_offset: parse_offset(fields[3])?,
            intervals: parse_set(fields[4])?.into_iter().collect(),
            note_values: parse_lengths(fields[5])?,
            metrical_positions: parse_lengths(fields[6])?,
        })
    }
}
