/// Rest-delimited melodic segmentation.
///
/// This module provides functionality to:
/// - Split one line of a score into segments bounded by rests
/// - Describe segments by position, intervals, note values and metrical positions
/// - Filter described segments and store them in tables
/// - Cut a found segment back out of its score as a playable fragment
mod filter;
mod render;
mod segmenter;
mod types;

pub use filter::{filter_segment_table, filter_segments, SegmentFilter};
pub use render::{fill_measures, render_fragment};
pub use segmenter::{describe, interval_list, segment_by_rests, segment_part};
pub use types::{Segment, SegmentInfo, SegmentNote, SEGMENT_HEADER};

use std::path::Path;
use tracing::info;

use crate::table::{read_table_file, write_table_file, Delimiter, TableError};

/// Writes segment descriptions with a header row. The delimiter follows
/// the file extension.
pub fn write_segment_table(segments: &[SegmentInfo], path: &Path) -> Result<(), TableError> {
    write_table_file(segments, path, Delimiter::from_path(path))?;
    info!(path = %path.display(), rows = segments.len(), "wrote segment table");
    Ok(())
}

pub fn read_segment_table(path: &Path) -> Result<Vec<SegmentInfo>, TableError> {
    read_table_file(path)
}
