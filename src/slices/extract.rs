use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::{ChordInfo, SliceEntry};
use crate::analysis::{chord_intervals, normal_order, pitch_classes, prime_form};
use crate::score::{Pitch, QuarterLength, Score};
use crate::table::{write_table_file, Delimiter, TableError};

/// A single sounding pitch with absolute timing.
struct Sounding {
    start: QuarterLength,
    end: QuarterLength,
    pitch: Pitch,
}

/// Chordifies a score into slices.
///
/// Every note onset, note release and barline across all parts starts a
/// new slice, so each slice has constant pitch content and never crosses a
/// barline. Stretches where nothing sounds become rest entries.
pub fn extract_slices(score: &Score) -> Vec<SliceEntry> {
    if score.measures.is_empty() {
        return Vec::new();
    }

    let mut notes: Vec<Sounding> = score
        .parts
        .iter()
        .flat_map(|part| part.events.iter())
        .filter(|event| !event.duration.is_zero())
        .flat_map(|event| {
            event.pitches().iter().map(move |&pitch| Sounding {
                start: event.offset,
                end: event.end(),
                pitch,
            })
        })
        .collect();
    notes.sort_by(|a, b| a.start.cmp(&b.start));

    let mut boundaries: BTreeSet<QuarterLength> = BTreeSet::new();
    for measure in &score.measures {
        boundaries.insert(measure.offset);
        boundaries.insert(measure.end());
    }
    for note in &notes {
        boundaries.insert(note.start);
        boundaries.insert(note.end);
    }
    let boundaries: Vec<QuarterLength> = boundaries.into_iter().collect();

    let mut entries = Vec::with_capacity(boundaries.len());
    let mut active: Vec<&Sounding> = Vec::new();
    let mut next_note = 0;

    for window in boundaries.windows(2) {
        let (start, end) = (window[0], window[1]);

        active.retain(|note| note.end > start);
        while next_note < notes.len() && notes[next_note].start <= start {
            if notes[next_note].end > start {
                active.push(&notes[next_note]);
            }
            next_note += 1;
        }

        let measure = &score.measures[score.measure_index_at(start)];
        let offset_in_measure = start - measure.offset;
        let pitches: Vec<Pitch> = active.iter().map(|note| note.pitch).collect();

        entries.push(SliceEntry {
            measure: measure.number,
            beat: measure.beat(offset_in_measure),
            beat_strength: measure.beat_strength(offset_in_measure),
            length: (end - start).to_f64(),
            chord: chord_info(pitches),
        });
    }

    debug!(slices = entries.len(), "chordified score");
    entries
}

fn chord_info(mut pitches: Vec<Pitch>) -> Option<ChordInfo> {
    if pitches.is_empty() {
        return None;
    }

    pitches.sort_by_key(|p| p.midi());
    let mut unique: Vec<Pitch> = Vec::with_capacity(pitches.len());
    for pitch in pitches {
        if !unique.contains(&pitch) {
            unique.push(pitch);
        }
    }

    let pcs = pitch_classes(&unique);
    Some(ChordInfo {
        pitches: unique.iter().map(|p| p.name_with_octave()).collect(),
        intervals: chord_intervals(&unique),
        prime_form: prime_form(&pcs),
        normal_order: normal_order(&pcs),
    })
}

/// Chord and rest slices of one score, ready to be written out.
#[derive(Debug, Clone)]
pub struct ScoreSlices {
    /// Default table name, derived from the score metadata.
    pub name: String,
    pub entries: Vec<SliceEntry>,
}

impl ScoreSlices {
    pub fn from_score(score: &Score) -> Self {
        ScoreSlices {
            name: score.sv_file_name(),
            entries: extract_slices(score),
        }
    }

    /// Writes the slices to `<dir>/<name>.<tsv|csv>` and returns the path.
    ///
    /// `name` overrides the metadata-derived name.
    pub fn write(&self, dir: &Path, name: Option<&str>, delimiter: Delimiter) -> Result<PathBuf, TableError> {
        let name = name.unwrap_or(&self.name);
        let path = dir.join(format!("{}.{}", name, delimiter.extension()));
        write_table_file(&self.entries, &path, delimiter)?;
        info!(path = %path.display(), rows = self.entries.len(), "wrote slice table");
        Ok(path)
    }
}
