use crate::table::repr::{
    format_float, format_int_list, format_str_list, parse_int_list, parse_number, parse_str_list,
};
use crate::table::{expect_fields, TableRow, TableError};

/// Number of columns in a slice table.
pub const SLICE_COLUMNS: usize = 8;

/// Pitch content of a sounding slice.
#[derive(Debug, Clone, PartialEq)]
pub struct ChordInfo {
    /// Spelled pitches with octave, lowest first, without duplicates.
    pub pitches: Vec<String>,
    /// Names of the intervals between each pair of pitches.
    pub intervals: Vec<String>,
    pub prime_form: Vec<u8>,
    pub normal_order: Vec<u8>,
}

/// One row of a slice table: a chord or a rest.
///
/// - `measure`: measure number in the piece, as numbered in the source
///   (0 for most anacruses)
/// - `beat`: 1-based beat in the measure, whatever the time signature
/// - `beat_strength`: metrical weight of the position, 1.0 on the downbeat
/// - `length`: duration in quarter notes
/// - `chord`: `None` for rests
#[derive(Debug, Clone, PartialEq)]
pub struct SliceEntry {
    pub measure: i32,
    pub beat: f64,
    pub beat_strength: f64,
    pub length: f64,
    pub chord: Option<ChordInfo>,
}

impl SliceEntry {
    pub fn is_rest(&self) -> bool {
        self.chord.is_none()
    }

    pub fn prime_form(&self) -> Option<&[u8]> {
        self.chord.as_ref().map(|c| c.prime_form.as_slice())
    }

    pub fn normal_order(&self) -> Option<&[u8]> {
        self.chord.as_ref().map(|c| c.normal_order.as_slice())
    }

    pub fn intervals(&self) -> &[String] {
        self.chord.as_ref().map(|c| c.intervals.as_slice()).unwrap_or(&[])
    }
}

impl TableRow for SliceEntry {
    const HEADER: Option<&'static [&'static str]> = None;

    fn to_record(&self) -> Vec<String> {
        let mut record = vec![
            self.measure.to_string(),
            format_float(self.beat),
            format_float(self.beat_strength),
            format_float(self.length),
        ];
        match &self.chord {
            Some(chord) => record.extend([
                format_str_list(&chord.pitches),
                format_str_list(&chord.intervals),
                format_int_list(&chord.prime_form),
                format_int_list(&chord.normal_order),
            ]),
            None => record.extend(std::iter::repeat(String::new()).take(4)),
        }
        record
    }

    fn from_record(fields: &[&str]) -> Result<Self, String> {
        expect_fields(fields, SLICE_COLUMNS)?;

        let measure = fields[0]
            .trim()
            .parse::<i32>()
            .map_err(|_| format!("invalid measure {:?}", fields[0]))?;

        let chord = if fields[4].trim().is_empty() {
            None
        } else {
            Some(ChordInfo {
                pitches: parse_str_list(fields[4])?,
                intervals: parse_str_list(fields[5])?,
                prime_form: parse_int_list(fields[6])?,
                normal_order: parse_int_list(fields[7])?,
            })
        };

        Ok(SliceEntry {
            measure,
            beat: parse_number(fields[1])?,
            beat_strength: parse_number(fields[2])?,
            length: parse_number(fields[3])?,
            chord,
        })
    }
}

/// Errors that can occur while querying slice tables
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Errors reading or writing the underlying table
    #[error(transparent)]
    Table(#[from] TableError),

    /// IO errors when writing derived files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No triad types were selected
    #[error("Please choose one or more triad types: {0}")]
    NoTriadTypes(String),

    /// Unknown triad type name
    #[error("Unknown triad type {0:?}")]
    UnknownTriad(String),

    /// Slice width that cannot be used for equal-width slicing
    #[error("Cannot work with the slice width here ({0}). Please choose one of {1}.")]
    InvalidSliceWidth(String, String),

    /// Table with no entries where some are required
    #[error("Nothing to work with: {0}")]
    Empty(String),

    /// Chord given as something other than a list of pitch classes
    #[error("Invalid chord: {0}")]
    InvalidChord(String),

    /// Pitch name in a table that cannot be read
    #[error("Invalid pitch in table: {0}")]
    InvalidPitch(String),

    /// Errors while drawing a chart
    #[error("Plotting error: {0}")]
    Plot(String),
}
