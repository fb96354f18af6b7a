/// Score model and readers for symbolic score files.
///
/// This module provides functionality to:
/// - Read partwise MusicXML and Standard MIDI Files into one [`Score`] model
/// - Locate events in measures and compute beats and beat strengths
/// - Write scores and fragments back out as MIDI
mod duration;
mod meter;
mod midi;
mod musicxml;
mod pitch;
mod timing;
mod types;

pub use duration::{ParseQuarterLengthError, QuarterLength};
pub use meter::{Measure, TimeSignature};
pub use midi::{midi_bytes, parse_midi, write_midi, EXPORT_TICKS_PER_QUARTER};
pub use musicxml::parse_musicxml;
pub use pitch::{ParsePitchError, Pitch, Step};
pub use timing::{MeterChange, MeterMap};
pub use types::{Event, EventKind, Metadata, Part, Score, ScoreError};

use std::fs;
use std::path::Path;
use tracing::debug;

/// Reads a score file, choosing the reader from the file extension.
///
/// # Errors
/// * If the file cannot be read
/// * If the extension is not a supported score format
/// * If the contents cannot be parsed
pub fn load_score(path: &Path) -> Result<Score, ScoreError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let score = match extension.as_str() {
        "musicxml" | "xml" => {
            let xml = fs::read_to_string(path)?;
            parse_musicxml(&xml)?
        }
        "mid" | "midi" => {
            let midi_data = fs::read(path)?;
            parse_midi(&midi_data)?
        }
        "mxl" => {
            return Err(ScoreError::UnsupportedFormat(format!(
                "{} is compressed MusicXML; extract the .musicxml file first",
                path.display()
            )))
        }
        _ => {
            return Err(ScoreError::UnsupportedFormat(format!(
                "{} (expected .musicxml, .xml, .mid or .midi)",
                path.display()
            )))
        }
    };

    debug!(
        path = %path.display(),
        parts = score.parts.len(),
        measures = score.measures.len(),
        "loaded score"
    );
    Ok(score)
}
