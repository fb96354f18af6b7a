use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

use super::duration::QuarterLength;
use super::meter::{Measure, TimeSignature};
use super::pitch::Pitch;
use super::timing::{MeterChange, MeterMap};
use super::types::{Event, EventKind, Metadata, Part, Score, ScoreError};

/// Resolution used when writing fragments back out.
pub const EXPORT_TICKS_PER_QUARTER: u32 = 480;
const DEFAULT_TEMPO: u32 = 500_000; // 120 BPM
const DEFAULT_VELOCITY: u8 = 80;

/// A sounding note with absolute tick timing, before grouping into events.
#[derive(Debug, Clone, Copy)]
struct TimedNote {
    onset: u64,
    release: u64,
    key: u8,
}

struct TrackNotes {
    name: Option<String>,
    notes: Vec<TimedNote>,
}

pub fn parse_midi(midi_data: &[u8]) -> Result<Score, ScoreError> {
    let smf = Smf::parse(midi_data)?;

    let ticks_per_quarter = match smf.header.timing {
        Timing::Metrical(ticks) => u32::from(ticks.as_int()),
        _ => return Err(ScoreError::Midi("Unsupported timing format".into())),
    };
    if ticks_per_quarter == 0 {
        return Err(ScoreError::Midi("Zero ticks per quarter note".into()));
    }

    let mut meter_changes = Vec::new();
    let mut tracks = Vec::new();
    let mut end_ticks: u64 = 0;

    for track in smf.tracks.iter() {
        let mut track_time: u64 = 0;
        let mut name = None;
        // (channel, key) -> onsets still waiting for a release
        let mut open: HashMap<(u8, u8), Vec<u64>> = HashMap::new();
        let mut notes = Vec::new();

        for event in track {
            track_time += u64::from(event.delta.as_int());
            match event.kind {
                TrackEventKind::Midi { channel, message } => match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        open.entry((channel.as_int(), key.as_int()))
                            .or_default()
                            .push(track_time);
                    }
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        let pending = open.get_mut(&(channel.as_int(), key.as_int()));
                        if let Some(onset) = pending.filter(|p| !p.is_empty()).map(|p| p.remove(0)) {
                            if track_time > onset {
                                notes.push(TimedNote {
                                    onset,
                                    release: track_time,
                                    key: key.as_int(),
                                });
                            }
                        }
                    }
                    _ => {}
                },
                TrackEventKind::Meta(MetaMessage::TimeSignature(num, denom_pow, _, _)) => {
                    meter_changes.push(MeterChange {
                        tick: track_time,
                        time_signature: TimeSignature::new(u32::from(num), 1u32 << denom_pow.min(6)),
                    });
                }
                TrackEventKind::Meta(MetaMessage::TrackName(bytes)) => {
                    name = Some(String::from_utf8_lossy(bytes).trim().to_string());
                }
                _ => {}
            }
        }

        end_ticks = end_ticks.max(track_time);
        if !notes.is_empty() {
            end_ticks = end_ticks.max(notes.iter().map(|n| n.release).max().unwrap_or(0));
            tracks.push(TrackNotes { name, notes });
        }
    }

    if tracks.is_empty() {
        return Err(ScoreError::Invalid("MIDI file contains no notes".into()));
    }

    let measures = MeterMap::new(ticks_per_quarter, meter_changes).measures(end_ticks);

    let parts = tracks
        .into_iter()
        .enumerate()
        .map(|(index, track)| Part {
            name: track
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("Track {}", index + 1)),
            events: track_events(&track.notes, ticks_per_quarter, &measures),
        })
        .collect();

    Ok(Score {
        metadata: Metadata::default(),
        measures,
        parts,
    })
}

fn measure_index(measures: &[Measure], offset: QuarterLength) -> usize {
    measures
        .partition_point(|m| m.offset <= offset)
        .saturating_sub(1)
}

/// Groups a track's notes into chord events and fills silent gaps with
/// rests, splitting rests at barlines.
fn track_events(notes: &[TimedNote], ticks_per_quarter: u32, measures: &[Measure]) -> Vec<Event> {
    // Notes sharing onset and release form one chord
    let mut chords: BTreeMap<(u64, u64), Vec<u8>> = BTreeMap::new();
    for note in notes {
        chords.entry((note.onset, note.release)).or_default().push(note.key);
    }

    let mut events = Vec::new();
    let mut covered_until: u64 = 0;

    for ((onset, release), mut keys) in chords {
        if onset > covered_until {
            push_rests(&mut events, covered_until, onset, ticks_per_quarter, measures);
        }
        covered_until = covered_until.max(release);

        keys.sort_unstable();
        keys.dedup();
        let offset = QuarterLength::from_ticks(onset, ticks_per_quarter);
        events.push(Event {
            offset,
            duration: QuarterLength::from_ticks(release - onset, ticks_per_quarter),
            measure: measure_index(measures, offset),
            voice: 1,
            kind: EventKind::Note(keys.into_iter().map(Pitch::from_midi).collect()),
        });
    }

    events
}

fn push_rests(events: &mut Vec<Event>, start: u64, end: u64, ticks_per_quarter: u32, measures: &[Measure]) {
    let end = QuarterLength::from_ticks(end, ticks_per_quarter);
    let mut offset = QuarterLength::from_ticks(start, ticks_per_quarter);

    while offset < end {
        let measure = measure_index(measures, offset);
        let bar_end = measures.get(measure).map(|m| m.end()).unwrap_or(end);
        let stop = if bar_end > offset && bar_end < end { bar_end } else { end };
        events.push(Event {
            offset,
            duration: stop - offset,
            measure,
            voice: 1,
            kind: EventKind::Rest,
        });
        offset = stop;
    }
}

/// Writes a score as a format-1 MIDI file: a conductor track with tempo
/// and meter, then one track per part.
pub fn write_midi(score: &Score, path: &Path) -> Result<(), ScoreError> {
    fs::write(path, midi_bytes(score)?)?;
    Ok(())
}

pub fn midi_bytes(score: &Score) -> Result<Vec<u8>, ScoreError> {
    let tpq = EXPORT_TICKS_PER_QUARTER;
    let mut tracks = Vec::with_capacity(score.parts.len() + 1);

    let mut conductor: Vec<(u64, u8, TrackEventKind)> = vec![(
        0,
        0,
        TrackEventKind::Meta(MetaMessage::Tempo(u24::new(DEFAULT_TEMPO))),
    )];
    let mut previous: Option<TimeSignature> = None;
    for measure in &score.measures {
        if previous != Some(measure.time_signature) {
            let ts = measure.time_signature;
            conductor.push((
                measure.offset.to_ticks(tpq),
                0,
                TrackEventKind::Meta(MetaMessage::TimeSignature(
                    ts.numerator.min(255) as u8,
                    ts.denominator.trailing_zeros() as u8,
                    24,
                    8,
                )),
            ));
            previous = Some(ts);
        }
    }
    tracks.push(to_delta_track(conductor));

    for (index, part) in score.parts.iter().enumerate() {
        let channel = u4::new((index % 16) as u8);
        let mut timed: Vec<(u64, u8, TrackEventKind)> = vec![(
            0,
            0,
            TrackEventKind::Meta(MetaMessage::TrackName(part.name.as_bytes())),
        )];

        for event in &part.events {
            let start = event.offset.to_ticks(tpq);
            let stop = event.end().to_ticks(tpq);
            for pitch in event.pitches() {
                let key = u7::new(pitch.midi().clamp(0, 127) as u8);
                // Releases sort before onsets at the same tick
                timed.push((
                    start,
                    2,
                    TrackEventKind::Midi {
                        channel,
                        message: MidiMessage::NoteOn {
                            key,
                            vel: u7::new(DEFAULT_VELOCITY),
                        },
                    },
                ));
                timed.push((
                    stop,
                    1,
                    TrackEventKind::Midi {
                        channel,
                        message: MidiMessage::NoteOff {
                            key,
                            vel: u7::new(0),
                        },
                    },
                ));
            }
        }
        tracks.push(to_delta_track(timed));
    }

    let smf = Smf {
        header: Header::new(Format::Parallel, Timing::Metrical(u15::new(tpq as u16))),
        tracks,
    };
    let mut out = Vec::new();
    smf.write_std(&mut out)?;
    Ok(out)
}

fn to_delta_track(mut timed: Vec<(u64, u8, TrackEventKind)>) -> Vec<TrackEvent> {
    timed.sort_by_key(|(tick, order, _)| (*tick, *order));

    let mut track = Vec::with_capacity(timed.len() + 1);
    let mut last_tick = 0u64;
    for (tick, _, kind) in timed {
        track.push(TrackEvent {
            delta: u28::new((tick - last_tick) as u32),
            kind,
        });
        last_tick = tick;
    }
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    track
}
