// Score reading tests
//
// These tests focus on turning score files into the shared score model.
// They verify that MusicXML and MIDI files are read into the same shape
// (metadata, measures, parts, events) and that scores can be written back
// out as MIDI.
//
// The tests cover:
// - Partwise MusicXML with chords, rests, anacruses and tuplets
// - Several voices in one part, with backup, forward, grace and cue notes
// - Standard MIDI Files generated on the fly
// - Round trips through the MIDI writer
// - Error handling for unsupported or malformed input

use pretty_assertions::assert_eq;
use score_tables::score::{
    self, load_score, parse_midi, parse_musicxml, Pitch, QuarterLength, ScoreError, TimeSignature,
};
use std::path::Path;

use test_utils::{
    arpeggio_midi, CHORALE_MUSICXML, CHORALE_TABLE_NAME, MELODY_MUSICXML, VOICES_MUSICXML,
};

fn ql(num: i64, den: i64) -> QuarterLength {
    QuarterLength::new(num, den)
}

fn pitch(name: &str) -> Pitch {
    name.parse().expect("Invalid pitch name")
}

/// Test reading a two-part MusicXML chorale.
///
/// This test verifies:
/// - Metadata is read and turned into a table name
/// - The implicit pickup measure is numbered 0 and padded to a full bar
/// - Part names come from the part list
/// - Chord notes are merged into a single event
#[test]
fn test_musicxml_chorale() {
    let score = load_score(Path::new(CHORALE_MUSICXML)).expect("Failed to load chorale");

    assert_eq!(score.metadata.title.as_deref(), Some("Test Chorale"));
    assert_eq!(score.metadata.composer.as_deref(), Some("Anon"));
    assert_eq!(score.sv_file_name(), CHORALE_TABLE_NAME);

    let numbers: Vec<i32> = score.measures.iter().map(|m| m.number).collect();
    assert_eq!(numbers, vec![0, 1, 2, 3]);
    assert_eq!(score.measures[0].duration, ql(1, 1));
    assert_eq!(score.measures[0].padding, ql(3, 1));
    assert_eq!(score.measures[1].offset, ql(1, 1));
    assert_eq!(score.duration(), ql(13, 1));

    let names: Vec<&str> = score.parts.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Soprano", "Bass"]);

    let soprano = &score.parts[0];
    assert_eq!(soprano.note_count(), 7);
    let first_chord = &soprano.events[1];
    assert_eq!(first_chord.offset, ql(1, 1));
    assert_eq!(first_chord.pitches(), &[pitch("E4"), pitch("G4")]);
    assert_eq!(first_chord.top_pitch(), Some(pitch("G4")));

    let bass = &score.parts[1];
    assert_eq!(bass.note_count(), 3);
    assert!(bass.events[0].is_rest());
}

/// Test reading a melody with tuplets in 3/4.
///
/// This test verifies:
/// - Triplet durations are kept exact
/// - Measures carry the time signature
/// - Events are attached to the right measure
#[test]
fn test_musicxml_melody_tuplets() {
    let score = load_score(Path::new(MELODY_MUSICXML)).expect("Failed to load melody");

    assert_eq!(score.measures.len(), 5);
    assert!(score
        .measures
        .iter()
        .all(|m| m.time_signature == TimeSignature::new(3, 4)));

    let melody = &score.parts[0];
    let triplets: Vec<_> = melody
        .events
        .iter()
        .filter(|e| e.duration == ql(1, 3))
        .collect();
    assert_eq!(triplets.len(), 3);
    assert_eq!(triplets[1].offset, ql(6, 1) + ql(1, 3));
    assert!(triplets.iter().all(|e| score.measures[e.measure].number == 3));

    let last = melody.events.last().expect("Melody has no events");
    assert_eq!(last.pitches(), &[pitch("F#4")]);
    assert_eq!(last.duration, ql(3, 1));
}

/// Test reading two voices in one part.
///
/// This test verifies:
/// - `<backup>` moves the second voice back to the start of the bar
/// - `<forward>` leaves a rest in its voice covering the skipped time
/// - Grace notes are dropped and take no time
/// - Cue notes are read like ordinary notes
/// - Tied notes stay separate events
#[test]
fn test_musicxml_voices() {
    let score = load_score(Path::new(VOICES_MUSICXML)).expect("Failed to load voices");
    assert_eq!(score.measures.len(), 2);
    assert_eq!(score.measures[0].duration, ql(4, 1));
    assert_eq!(score.measures[0].padding, QuarterLength::ZERO);

    let part = &score.parts[0];
    assert_eq!(part.name, "Keyboard");
    assert_eq!(part.events.len(), 10);
    assert_eq!(part.note_count(), 8);

    let summary: Vec<(QuarterLength, u8, Option<Pitch>)> = part
        .events
        .iter()
        .map(|e| (e.offset, e.voice, e.top_pitch()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (ql(0, 1), 1, Some(pitch("E5"))),
            (ql(0, 1), 2, Some(pitch("C4"))),
            (ql(1, 1), 2, None),
            (ql(2, 1), 1, Some(pitch("G5"))),
            (ql(2, 1), 2, Some(pitch("E4"))),
            (ql(3, 1), 2, Some(pitch("G4"))),
            (ql(4, 1), 1, Some(pitch("G5"))),
            (ql(4, 1), 2, Some(pitch("A3"))),
            (ql(5, 1), 1, Some(pitch("F5"))),
            (ql(6, 1), 1, None),
        ]
    );

    let hidden = &part.events[2];
    assert!(hidden.is_rest());
    assert_eq!(hidden.duration, ql(1, 1));
    assert!(part.events.iter().all(|e| e.top_pitch() != Some(pitch("D5"))));
}

/// Test reading a generated MIDI file.
///
/// This test verifies:
/// - Notes are paired into events with exact quarter lengths
/// - Notes sharing onset and release form a chord
/// - Silent gaps become rests
/// - Bars are laid out from the time signature
#[test]
fn test_midi_parsing() {
    let score = parse_midi(&arpeggio_midi()).expect("Failed to parse MIDI");

    assert_eq!(score.sv_file_name(), "UNNAMED_SV_FILE");
    assert_eq!(score.measures.len(), 2);
    assert_eq!(score.parts.len(), 1);

    let part = &score.parts[0];
    assert_eq!(part.name, "Piano");
    assert_eq!(part.events.len(), 5);
    assert!(part.events[2].is_rest());
    assert_eq!(part.events[2].offset, ql(2, 1));

    let chord = &part.events[4];
    assert_eq!(chord.pitches(), &[pitch("C4"), pitch("E4"), pitch("G4")]);
    assert_eq!(chord.duration, ql(4, 1));
    assert_eq!(score.measures[chord.measure].number, 2);
}

/// Test writing a score as MIDI and reading it back.
///
/// This test verifies:
/// - Every part becomes its own named track
/// - Pitches and note counts survive the round trip
#[test]
fn test_midi_round_trip() {
    let original = load_score(Path::new(CHORALE_MUSICXML)).expect("Failed to load chorale");
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("chorale.mid");

    score::write_midi(&original, &path).expect("Failed to write MIDI");
    let reread = load_score(&path).expect("Failed to read written MIDI");

    assert_eq!(reread.parts.len(), original.parts.len());
    for (a, b) in original.parts.iter().zip(&reread.parts) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.note_count(), b.note_count());
        let pitches_a: Vec<_> = a.events.iter().flat_map(|e| e.pitches().to_vec()).collect();
        let pitches_b: Vec<_> = b.events.iter().flat_map(|e| e.pitches().to_vec()).collect();
        let midi_a: Vec<i32> = pitches_a.iter().map(|p| p.midi()).collect();
        let midi_b: Vec<i32> = pitches_b.iter().map(|p| p.midi()).collect();
        assert_eq!(midi_a, midi_b);
    }
}

/// Test error handling for input that is not a readable score.
///
/// This test verifies:
/// - Unknown and compressed formats are rejected by extension
/// - Missing files report an IO error
/// - Malformed MusicXML and MIDI produce parse errors
#[test]
fn test_unreadable_input() {
    assert!(matches!(
        load_score(Path::new("tests/samples/score.mxl")),
        Err(ScoreError::UnsupportedFormat(_))
    ));
    assert!(matches!(
        load_score(Path::new("tests/samples/notes.txt")),
        Err(ScoreError::UnsupportedFormat(_))
    ));
    assert!(matches!(
        load_score(Path::new("tests/samples/missing.musicxml")),
        Err(ScoreError::Io(_))
    ));

    assert!(parse_musicxml("<score-partwise><part id=\"P1\"></score-partwise>").is_err());
    assert!(matches!(
        parse_musicxml("<score-timewise></score-timewise>"),
        Err(ScoreError::UnsupportedFormat(_))
    ));
    assert!(parse_midi(b"not a midi file").is_err());
}
