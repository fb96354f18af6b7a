use std::collections::BTreeSet;

use tracing::debug;

use super::types::{Segment, SegmentInfo, SegmentNote};
use crate::analysis::Interval;
use crate::score::{Measure, Part, Score, ScoreError};

/// Splits one voice of a part into segments bounded by rests.
///
/// Events of other voices are ignored; `voice: None` reads every event of
/// the part as one line. Chords contribute their highest pitch. A rest
/// closes the open segment, so no segment ever contains one.
pub fn segment_by_rests(part: &Part, measures: &[Measure], voice: Option<u8>) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current: Vec<SegmentNote> = Vec::new();

    for event in &part.events {
        if voice.is_some_and(|v| v != event.voice) {
            continue;
        }

        let pitch = match event.top_pitch() {
            Some(pitch) => pitch,
            None => {
                if !current.is_empty() {
                    segments.push(Segment {
                        notes: std::mem::take(&mut current),
                    });
                }
                continue;
            }
        };

        let (number, measure_offset) = measures
            .get(event.measure)
            .map(|m| (m.number, m.offset))
            .unwrap_or((event.measure as i32 + 1, event.offset));

        current.push(SegmentNote {
            pitch,
            measure: number,
            offset: event.offset - measure_offset,
            duration: event.duration,
        });
    }

    if !current.is_empty() {
        segments.push(Segment { notes: current });
    }

    debug!(part = %part.name, segments = segments.len(), "segmented by rests");
    segments
}

/// Segments part `part_index` of a score.
///
/// With `voice: None` the part's primary voice is used.
///
/// # Errors
/// * If the score has no part at `part_index`
pub fn segment_part(score: &Score, part_index: usize, voice: Option<u8>) -> Result<Vec<Segment>, ScoreError> {
    let part = score.parts.get(part_index).ok_or_else(|| {
        ScoreError::Invalid(format!(
            "part {} requested but the score has {} part(s)",
            part_index,
            score.parts.len()
        ))
    })?;
    let voice = voice.unwrap_or_else(|| part.primary_voice());
    Ok(segment_by_rests(part, &score.measures, Some(voice)))
}

/// Names of the intervals between adjacent notes.
pub fn interval_list(notes: &[SegmentNote]) -> Vec<String> {
    notes
        .windows(2)
        .map(|pair| Interval::between(pair[0].pitch, pair[1].pitch).name())
        .collect()
}

/// Describes every segment: start and end position plus the intervals,
/// note values and metrical positions it uses.
pub fn describe(segments: &[Segment]) -> Vec<SegmentInfo> {
    segments
        .iter()
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let first = segment.first();
            let last = segment.last();
            SegmentInfo {
                starting_measure: first.measure,
                starting_offset: first.offset,
                ending_measure: last.measure,
                ending_offset: last.end(),
                intervals: interval_list(&segment.notes).into_iter().collect(),
                note_values: segment.notes.iter().map(|n| n.duration).collect::<BTreeSet<_>>(),
                metrical_positions: segment.notes.iter().map(|n| n.offset).collect(),
            }
        })
        .collect()
}
