use tracing::debug;

use super::types::SegmentInfo;
use crate::score::{Event, EventKind, Measure, Part, QuarterLength, Score, ScoreError};

/// Cuts the measures spanned by a segment out of one part of `score`.
///
/// The fragment keeps the original measure numbers and time signatures
/// but starts at offset 0. Its first and last measures are padded with
/// rests by [`fill_measures`] so only the segment itself sounds.
///
/// # Errors
/// * If the score has no part at `part_index`
/// * If either measure number of the segment is not in the score
pub fn render_fragment(score: &Score, part_index: usize, info: &SegmentInfo) -> Result<Score, ScoreError> {
    let part = score.parts.get(part_index).ok_or_else(|| {
        ScoreError::Invalid(format!(
            "part {} requested but the score has {} part(s)",
            part_index,
            score.parts.len()
        ))
    })?;
    let find = |number: i32| {
        score
            .measure_index_by_number(number)
            .ok_or_else(|| ScoreError::Invalid(format!("measure {} not found", number)))
    };
    let first = find(info.starting_measure)?;
    let last = find(info.ending_measure)?;
    if last < first {
        return Err(ScoreError::Invalid(format!(
            "segment ends in measure {} before it starts in measure {}",
            info.ending_measure, info.starting_measure
        )));
    }

    let origin = score.measures[first].offset;
    let measures: Vec<Measure> = score.measures[first..=last]
        .iter()
        .map(|m| Measure {
            offset: m.offset - origin,
            ..m.clone()
        })
        .collect();

    let events: Vec<Event> = part
        .events
        .iter()
        .filter(|e| (first..=last).contains(&e.measure))
        .map(|e| Event {
            offset: e.offset - origin,
            measure: e.measure - first,
            ..e.clone()
        })
        .collect();

    let fragment = Score {
        metadata: score.metadata.clone(),
        measures,
        parts: vec![Part {
            name: part.name.clone(),
            events,
        }],
    };

    debug!(
        from = info.starting_measure,
        to = info.ending_measure,
        "cut fragment"
    );
    Ok(fill_measures(fragment, info.starting_offset, info.ending_offset))
}

/// Replaces material before `start_offset` in the first measure and from
/// `end_offset` on in the last measure with rests.
///
/// Offsets are relative to their measure. Applies to every part of the
/// fragment.
pub fn fill_measures(mut fragment: Score, start_offset: QuarterLength, end_offset: QuarterLength) -> Score {
    let (first, last) = match (fragment.measures.first(), fragment.measures.last()) {
        (Some(first), Some(last)) => (first.clone(), last.clone()),
        _ => return fragment,
    };
    let last_index = fragment.measures.len() - 1;
    let cut_start = first.offset + start_offset;
    let cut_end = last.offset + end_offset;

    for part in &mut fragment.parts {
        let voice = part.primary_voice();
        part.events.retain(|e| {
            let early = e.measure == 0 && e.offset < cut_start;
            let late = e.measure == last_index && e.offset >= cut_end;
            !(early || late)
        });

        if start_offset > QuarterLength::ZERO {
            part.events.push(Event {
                offset: first.offset,
                duration: start_offset,
                measure: 0,
                voice,
                kind: EventKind::Rest,
            });
        }
        if end_offset < last.duration {
            part.events.push(Event {
                offset: cut_end,
                duration: last.duration - end_offset,
                measure: last_index,
                voice,
                kind: EventKind::Rest,
            });
        }
        part.events.sort_by(|a, b| a.offset.cmp(&b.offset));
    }

    fragment
}
