use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::SegmentInfo;
use crate::score::QuarterLength;
use crate::table::{read_table_file, TableError};

/// Criteria a segment must avoid to be kept.
///
/// Every configured criterion applies: a segment is dropped when it starts
/// or ends inside `measure_range` or `offset_range` (both half-open), or
/// when it uses any of the listed intervals, note values or metrical
/// positions. Unset ranges, empty ranges such as `[0, 0]` and empty lists
/// exclude nothing; a configuration file switches a range off with `[0, 0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentFilter {
    pub measure_range: Option<(i32, i32)>,
    pub offset_range: Option<(QuarterLength, QuarterLength)>,
    pub intervals: Vec<String>,
    pub note_values: Vec<QuarterLength>,
    pub metrical_positions: Vec<QuarterLength>,
}

impl Default for SegmentFilter {
    fn default() -> Self {
        SegmentFilter {
            measure_range: Some((100, 110)),
            offset_range: Some((QuarterLength::from_int(1000), QuarterLength::from_int(2000))),
            intervals: vec!["m6".to_string(), "M6".to_string()],
            note_values: vec![QuarterLength::new(1, 4), QuarterLength::new(1, 8)],
            metrical_positions: vec![QuarterLength::new(7, 3)],
        }
    }
}

impl SegmentFilter {
    /// A filter that keeps every segment.
    pub fn none() -> Self {
        SegmentFilter {
            measure_range: None,
            offset_range: None,
            intervals: Vec::new(),
            note_values: Vec::new(),
            metrical_positions: Vec::new(),
        }
    }

    /// A filter on segment content only, with no position ranges.
    pub fn content(intervals: Vec<String>, note_values: Vec<QuarterLength>) -> Self {
        SegmentFilter {
            intervals,
            note_values,
            ..SegmentFilter::none()
        }
    }

    pub fn matches(&self, info: &SegmentInfo) -> bool {
        if let Some((low, high)) = self.measure_range {
            let inside = |m: i32| low <= m && m < high;
            if inside(info.starting_measure) || inside(info.ending_measure) {
                return false;
            }
        }
        if let Some((low, high)) = self.offset_range {
            let inside = |o: QuarterLength| low <= o && o < high;
            if inside(info.starting_offset) || inside(info.ending_offset) {
                return false;
            }
        }
        if self.intervals.iter().any(|i| info.intervals.contains(i)) {
            return false;
        }
        if self.note_values.iter().any(|v| info.note_values.contains(v)) {
            return false;
        }
        !self
            .metrical_positions
            .iter()
            .any(|p| info.metrical_positions.contains(p))
    }
}

/// Keeps the segments that pass `filter`, in order.
pub fn filter_segments(segments: &[SegmentInfo], filter: &SegmentFilter) -> Vec<SegmentInfo> {
    let kept: Vec<SegmentInfo> = segments
        .iter()
        .filter(|info| filter.matches(info))
        .cloned()
        .collect();
    debug!(total = segments.len(), kept = kept.len(), "filtered segments");
    kept
}

/// Reads a segment table and keeps the rows that use none of `intervals`
/// and none of `note_values`.
pub fn filter_segment_table(
    path: &Path,
    intervals: &[String],
    note_values: &[QuarterLength],
) -> Result<Vec<SegmentInfo>, TableError> {
    let rows: Vec<SegmentInfo> = read_table_file(path)?;
    let filter = SegmentFilter::content(intervals.to_vec(), note_values.to_vec());
    Ok(filter_segments(&rows, &filter))
}
