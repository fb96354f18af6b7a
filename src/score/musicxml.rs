use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::Reader;
use tracing::debug;

use super::duration::QuarterLength;
use super::meter::{Measure, TimeSignature};
use super::pitch::{Pitch, Step};
use super::types::{Event, EventKind, Metadata, Part, Score, ScoreError};

/// Leaf elements whose text the reader keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    WorkTitle,
    MovementTitle,
    Composer,
    PartName,
    Divisions,
    Beats,
    BeatType,
    Step,
    Alter,
    Octave,
    Duration,
    Voice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Motion {
    Backup,
    Forward,
}

/// A `<backup>` or `<forward>` being read.
#[derive(Debug)]
struct MotionBuilder {
    motion: Motion,
    amount: i64,
    voice: Option<u8>,
}

impl MotionBuilder {
    fn new(motion: Motion) -> Self {
        MotionBuilder {
            motion,
            amount: 0,
            voice: None,
        }
    }
}

#[derive(Debug, Default)]
struct NoteBuilder {
    chord: bool,
    rest: bool,
    /// Grace notes take no time and are dropped.
    grace: bool,
    step: Option<Step>,
    alter: i8,
    octave: Option<i8>,
    duration: i64,
    voice: Option<u8>,
}

#[derive(Debug)]
struct RawEvent {
    offset: QuarterLength,
    duration: QuarterLength,
    voice: u8,
    kind: EventKind,
}

#[derive(Debug, Default)]
struct RawMeasure {
    number: Option<String>,
    implicit: bool,
    time_signature: Option<TimeSignature>,
    /// Furthest position reached inside the bar.
    length: QuarterLength,
    events: Vec<RawEvent>,
}

#[derive(Debug)]
struct PartBuilder {
    id: String,
    divisions: i64,
    cursor: QuarterLength,
    last_onset: QuarterLength,
    measures: Vec<RawMeasure>,
}

#[derive(Debug, Default)]
struct MusicXmlReader {
    metadata: Metadata,
    part_names: HashMap<String, String>,
    score_part: Option<String>,
    parts: Vec<PartBuilder>,
    note: Option<NoteBuilder>,
    motion: Option<MotionBuilder>,
    in_time: bool,
    beats: Option<u32>,
    beat_type: Option<u32>,
    field: Option<Field>,
}

/// Parses a partwise MusicXML document.
pub fn parse_musicxml(xml: &str) -> Result<Score, ScoreError> {
    let mut reader = Reader::from_str(xml);
    let mut state = MusicXmlReader::default();

    loop {
        match reader.read_event()? {
            XmlEvent::Start(e) => state.start(&e)?,
            XmlEvent::Empty(e) => {
                state.start(&e)?;
                state.end(e.local_name().as_ref())?;
            }
            XmlEvent::Text(t) => {
                let text = t.unescape()?;
                let text = text.trim();
                if !text.is_empty() {
                    state.text(text)?;
                }
            }
            XmlEvent::End(e) => state.end(e.local_name().as_ref())?,
            XmlEvent::Eof => break,
            _ => {}
        }
    }

    state.finish()
}

fn attribute(e: &BytesStart, name: &[u8]) -> Result<Option<String>, ScoreError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ScoreError::Xml(err.to_string()))?;
        if attr.key.as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn parse_int<T: std::str::FromStr>(text: &str, what: &str) -> Result<T, ScoreError> {
    text.parse()
        .map_err(|_| ScoreError::Xml(format!("invalid {}: {:?}", what, text)))
}

impl MusicXmlReader {
    fn current_part(&mut self) -> Result<&mut PartBuilder, ScoreError> {
        self.parts
            .last_mut()
            .ok_or_else(|| ScoreError::Xml("musical content outside <part>".into()))
    }

    fn start(&mut self, e: &BytesStart) -> Result<(), ScoreError> {
        let in_note = self.note.is_some();
        match e.local_name().as_ref() {
            b"score-timewise" => {
                return Err(ScoreError::UnsupportedFormat(
                    "timewise MusicXML (convert to partwise first)".into(),
                ))
            }
            b"work-title" => self.field = Some(Field::WorkTitle),
            b"movement-title" => self.field = Some(Field::MovementTitle),
            b"creator" => {
                if attribute(e, b"type")?.as_deref() == Some("composer") {
                    self.field = Some(Field::Composer);
                }
            }
            b"score-part" => self.score_part = attribute(e, b"id")?,
            b"part-name" if self.score_part.is_some() => self.field = Some(Field::PartName),
            b"part" => {
                self.parts.push(PartBuilder {
                    id: attribute(e, b"id")?.unwrap_or_default(),
                    divisions: 1,
                    cursor: QuarterLength::ZERO,
                    last_onset: QuarterLength::ZERO,
                    measures: Vec::new(),
                });
            }
            b"measure" => {
                let number = attribute(e, b"number")?;
                let implicit = attribute(e, b"implicit")?.as_deref() == Some("yes");
                let part = self.current_part()?;
                part.cursor = QuarterLength::ZERO;
                part.last_onset = QuarterLength::ZERO;
                part.measures.push(RawMeasure {
                    number,
                    implicit,
                    ..RawMeasure::default()
                });
            }
            b"divisions" => self.field = Some(Field::Divisions),
            b"time" => {
                self.in_time = true;
                self.beats = None;
                self.beat_type = None;
            }
            b"beats" if self.in_time => self.field = Some(Field::Beats),
            b"beat-type" if self.in_time => self.field = Some(Field::BeatType),
            b"note" => self.note = Some(NoteBuilder::default()),
            b"chord" if in_note => self.note_mut().chord = true,
            b"rest" if in_note => self.note_mut().rest = true,
            b"grace" if in_note => self.note_mut().grace = true,
            b"step" if in_note => self.field = Some(Field::Step),
            b"alter" if in_note => self.field = Some(Field::Alter),
            b"octave" if in_note => self.field = Some(Field::Octave),
            b"voice" if in_note || self.motion.is_some() => self.field = Some(Field::Voice),
            b"duration" if in_note || self.motion.is_some() => self.field = Some(Field::Duration),
            b"backup" => self.motion = Some(MotionBuilder::new(Motion::Backup)),
            b"forward" => self.motion = Some(MotionBuilder::new(Motion::Forward)),
            _ => {}
        }
        Ok(())
    }

    fn note_mut(&mut self) -> &mut NoteBuilder {
        self.note.get_or_insert_with(NoteBuilder::default)
    }

    fn text(&mut self, text: &str) -> Result<(), ScoreError> {
        let Some(field) = self.field else {
            return Ok(());
        };
        match field {
            Field::WorkTitle => self.metadata.title = Some(text.to_string()),
            Field::MovementTitle => self.metadata.movement = Some(text.to_string()),
            Field::Composer => self.metadata.composer = Some(text.to_string()),
            Field::PartName => {
                if let Some(id) = self.score_part.clone() {
                    self.part_names.insert(id, text.to_string());
                }
            }
            Field::Divisions => {
                let divisions: i64 = parse_int(text, "divisions")?;
                if divisions <= 0 {
                    return Err(ScoreError::Xml(format!("divisions must be positive, got {}", divisions)));
                }
                self.current_part()?.divisions = divisions;
            }
            Field::Beats => {
                // Additive meters such as 3+2
                let mut total = 0u32;
                for piece in text.split('+') {
                    total += parse_int::<u32>(piece.trim(), "beats")?;
                }
                self.beats = Some(total);
            }
            Field::BeatType => self.beat_type = Some(parse_int(text, "beat-type")?),
            Field::Step => {
                let step = text
                    .chars()
                    .next()
                    .and_then(Step::from_char)
                    .ok_or_else(|| ScoreError::Xml(format!("invalid step: {:?}", text)))?;
                self.note_mut().step = Some(step);
            }
            Field::Alter => {
                let alter: f64 = text
                    .parse()
                    .map_err(|_| ScoreError::Xml(format!("invalid alter: {:?}", text)))?;
                self.note_mut().alter = alter.round() as i8;
            }
            Field::Octave => self.note_mut().octave = Some(parse_int(text, "octave")?),
            Field::Voice => {
                let voice = Some(text.parse().unwrap_or(1));
                match (self.note.as_mut(), self.motion.as_mut()) {
                    (Some(note), _) => note.voice = voice,
                    (None, Some(motion)) => motion.voice = voice,
                    (None, None) => {}
                }
            }
            Field::Duration => {
                let duration: i64 = parse_int(text, "duration")?;
                if let Some(note) = self.note.as_mut() {
                    note.duration = duration;
                } else if let Some(motion) = self.motion.as_mut() {
                    motion.amount = duration;
                }
            }
        }
        Ok(())
    }

    fn end(&mut self, name: &[u8]) -> Result<(), ScoreError> {
        self.field = None;
        match name {
            b"score-part" => self.score_part = None,
            b"time" => {
                self.in_time = false;
                if let (Some(beats), Some(beat_type)) = (self.beats, self.beat_type) {
                    let ts = TimeSignature::new(beats, beat_type);
                    if let Some(measure) = self.current_part()?.measures.last_mut() {
                        measure.time_signature = Some(ts);
                    }
                }
            }
            b"note" => self.commit_note()?,
            b"backup" | b"forward" => {
                if let Some(builder) = self.motion.take() {
                    let part = self.current_part()?;
                    let delta = QuarterLength::new(builder.amount, part.divisions);
                    match builder.motion {
                        Motion::Backup => {
                            part.cursor = if delta > part.cursor {
                                QuarterLength::ZERO
                            } else {
                                part.cursor - delta
                            };
                        }
                        Motion::Forward => {
                            // Skipped time is a hidden rest in its voice
                            let onset = part.cursor;
                            part.cursor += delta;
                            let cursor = part.cursor;
                            if let Some(measure) = part.measures.last_mut() {
                                measure.length = measure.length.max(cursor);
                                if delta > QuarterLength::ZERO {
                                    measure.events.push(RawEvent {
                                        offset: onset,
                                        duration: delta,
                                        voice: builder.voice.unwrap_or(1),
                                        kind: EventKind::Rest,
                                    });
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn commit_note(&mut self) -> Result<(), ScoreError> {
        let Some(note) = self.note.take() else {
            return Ok(());
        };
        if note.grace {
            return Ok(());
        }

        let part = self.current_part()?;
        let duration = QuarterLength::new(note.duration, part.divisions);
        let voice = note.voice.unwrap_or(1);
        let pitch = match (note.step, note.octave) {
            (Some(step), Some(octave)) => Some(Pitch::new(step, note.alter, octave)),
            _ => None,
        };

        let onset = if note.chord { part.last_onset } else { part.cursor };
        if !note.chord {
            part.last_onset = onset;
            part.cursor += duration;
        }
        let cursor = part.cursor;
        let measure = part
            .measures
            .last_mut()
            .ok_or_else(|| ScoreError::Xml("<note> outside <measure>".into()))?;
        measure.length = measure.length.max(cursor);

        let kind = if note.rest {
            EventKind::Rest
        } else if let Some(pitch) = pitch {
            EventKind::Note(vec![pitch])
        } else {
            // Unpitched percussion keeps its time but adds no pitch
            return Ok(());
        };

        if note.chord {
            if let EventKind::Note(pitches) = &kind {
                let previous = measure.events.iter_mut().rev().find(|e| {
                    e.offset == onset && e.voice == voice && matches!(e.kind, EventKind::Note(_))
                });
                if let Some(EventKind::Note(existing)) = previous.map(|e| &mut e.kind) {
                    existing.extend_from_slice(pitches);
                    existing.sort_by_key(|p| p.midi());
                    return Ok(());
                }
            }
        }

        measure.events.push(RawEvent {
            offset: onset,
            duration,
            voice,
            kind,
        });
        Ok(())
    }

    fn finish(self) -> Result<Score, ScoreError> {
        if self.parts.is_empty() {
            return Err(ScoreError::Invalid("MusicXML contains no parts".into()));
        }

        let measure_count = self.parts.iter().map(|p| p.measures.len()).max().unwrap_or(0);
        if measure_count == 0 {
            return Err(ScoreError::Invalid("MusicXML contains no measures".into()));
        }

        let mut measures: Vec<Measure> = Vec::with_capacity(measure_count);
        let mut time_signature = TimeSignature::default();
        let mut offset = QuarterLength::ZERO;

        for index in 0..measure_count {
            let raws: Vec<&RawMeasure> = self.parts.iter().filter_map(|p| p.measures.get(index)).collect();

            if let Some(ts) = raws.iter().find_map(|m| m.time_signature) {
                time_signature = ts;
            }
            let mut duration = raws
                .iter()
                .map(|m| m.length)
                .max()
                .unwrap_or(QuarterLength::ZERO);
            if duration.is_zero() {
                duration = time_signature.bar_length();
            }

            let first = raws[0];
            let previous_number = measures.last().map(|m| m.number);
            let number = first
                .number
                .as_deref()
                .and_then(leading_number)
                .unwrap_or_else(|| match previous_number {
                    Some(n) => n + 1,
                    None if first.implicit => 0,
                    None => 1,
                });

            let padding = if index == 0 && duration < time_signature.bar_length() {
                time_signature.bar_length() - duration
            } else {
                QuarterLength::ZERO
            };

            measures.push(Measure {
                number,
                offset,
                duration,
                time_signature,
                padding,
            });
            offset += duration;
        }

        let mut parts = Vec::with_capacity(self.parts.len());
        for builder in self.parts {
            let mut events = Vec::new();
            for (index, raw) in builder.measures.into_iter().enumerate() {
                let start = measures[index].offset;
                for event in raw.events {
                    events.push(Event {
                        offset: start + event.offset,
                        duration: event.duration,
                        measure: index,
                        voice: event.voice,
                        kind: event.kind,
                    });
                }
            }
            events.sort_by(|a, b| a.offset.cmp(&b.offset));

            let name = self
                .part_names
                .get(&builder.id)
                .cloned()
                .unwrap_or_else(|| builder.id.clone());
            debug!(part = %name, events = events.len(), "parsed MusicXML part");
            parts.push(Part { name, events });
        }

        Ok(Score {
            metadata: self.metadata,
            measures,
            parts,
        })
    }
}

/// Reads the numeric prefix of a measure number such as `12` or `12a`.
fn leading_number(text: &str) -> Option<i32> {
    let digits: String = text
        .trim()
        .chars()
        .enumerate()
        .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && *c == '-'))
        .map(|(_, c)| c)
        .collect();
    digits.parse().ok()
}
