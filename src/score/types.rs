use super::duration::QuarterLength;
use super::meter::Measure;
use super::pitch::Pitch;
use serde::{Deserialize, Serialize};

/// Errors that can occur while reading or writing scores
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    /// IO errors when reading/writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed MusicXML
    #[error("MusicXML parsing error: {0}")]
    Xml(String),

    /// Malformed or unsupported MIDI
    #[error("MIDI parsing error: {0}")]
    Midi(String),

    /// File extension not recognised as a score format
    #[error("Unsupported score format: {0}")]
    UnsupportedFormat(String),

    /// Well-formed input that does not describe a usable score
    #[error("Invalid score: {0}")]
    Invalid(String),
}

impl From<quick_xml::Error> for ScoreError {
    fn from(err: quick_xml::Error) -> Self {
        ScoreError::Xml(err.to_string())
    }
}

impl From<midly::Error> for ScoreError {
    fn from(err: midly::Error) -> Self {
        ScoreError::Midi(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// One or more pitches sounding together, lowest first.
    Note(Vec<Pitch>),
    Rest,
}

/// A note, chord, or rest in one part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Absolute offset from the start of the score.
    pub offset: QuarterLength,
    pub duration: QuarterLength,
    /// Index into [`Score::measures`].
    pub measure: usize,
    pub voice: u8,
    pub kind: EventKind,
}

impl Event {
    pub fn end(&self) -> QuarterLength {
        self.offset + self.duration
    }

    pub fn is_rest(&self) -> bool {
        matches!(self.kind, EventKind::Rest)
    }

    pub fn pitches(&self) -> &[Pitch] {
        match &self.kind {
            EventKind::Note(pitches) => pitches,
            EventKind::Rest => &[],
        }
    }

    /// Highest sounding pitch, used when reading a chord as a melody note.
    pub fn top_pitch(&self) -> Option<Pitch> {
        self.pitches().iter().copied().max_by_key(|p| p.midi())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub name: String,
    /// Sorted by offset.
    pub events: Vec<Event>,
}

impl Part {
    /// Voice of the first event, the line segmentation follows by default.
    pub fn primary_voice(&self) -> u8 {
        self.events
            .iter()
            .find(|e| !e.is_rest())
            .or_else(|| self.events.first())
            .map(|e| e.voice)
            .unwrap_or(1)
    }

    pub fn note_count(&self) -> usize {
        self.events.iter().filter(|e| !e.is_rest()).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub movement: Option<String>,
    pub composer: Option<String>,
}

impl Metadata {
    /// Present values keyed by field name, sorted by key.
    pub fn all(&self) -> Vec<(&'static str, &str)> {
        [
            ("composer", self.composer.as_deref()),
            ("movementName", self.movement.as_deref()),
            ("title", self.title.as_deref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.filter(|v| !v.trim().is_empty()).map(|v| (key, v)))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub metadata: Metadata,
    pub measures: Vec<Measure>,
    pub parts: Vec<Part>,
}

impl Score {
    pub fn duration(&self) -> QuarterLength {
        self.measures
            .last()
            .map(|m| m.end())
            .unwrap_or(QuarterLength::ZERO)
    }

    /// Index of the measure containing `offset`.
    pub fn measure_index_at(&self, offset: QuarterLength) -> usize {
        self.measures
            .partition_point(|m| m.offset <= offset)
            .saturating_sub(1)
    }

    /// Index of the first measure numbered `number`.
    pub fn measure_index_by_number(&self, number: i32) -> Option<usize> {
        self.measures.iter().position(|m| m.number == number)
    }

    /// Builds a table file name from the score metadata.
    ///
    /// Values are joined with `_`, with `.mxl` dropped, `.` replaced by `-`
    /// and spaces by `_`. Scores without metadata get `UNNAMED_SV_FILE`.
    pub fn sv_file_name(&self) -> String {
        let values: Vec<&str> = self.metadata.all().into_iter().map(|(_, v)| v).collect();
        if values.is_empty() {
            return "UNNAMED_SV_FILE".to_string();
        }
        values
            .join("_")
            .replace(".mxl", "")
            .replace('.', "-")
            .replace(' ', "_")
    }
}
