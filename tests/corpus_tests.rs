// Corpus tests
//
// These tests build a small corpus from the sample scores in a scratch
// directory, then search it with different filters.

use pretty_assertions::assert_eq;
use score_tables::corpus::{
    build_corpus, list_files, load_segments, search_corpus, store_segments, CorpusError,
    StoredSegments,
};
use score_tables::segments::SegmentFilter;
use std::fs;
use std::path::{Path, PathBuf};

use test_utils::{CHORALE_MUSICXML, MELODY_MUSICXML, SAMPLES_DIR};

/// Copy the sample scores plus one broken file into a scratch directory.
fn scratch_scores(dir: &Path) -> Vec<PathBuf> {
    fs::copy(MELODY_MUSICXML, dir.join("melody.musicxml")).expect("Failed to copy melody");
    fs::copy(CHORALE_MUSICXML, dir.join("chorale.musicxml")).expect("Failed to copy chorale");
    fs::write(dir.join("broken.musicxml"), "<score-partwise>").expect("Failed to write broken file");
    fs::write(dir.join("notes.txt"), "not a score").expect("Failed to write text file");
    list_files(dir, Some("musicxml")).expect("Failed to list scores")
}

/// Test listing files.
///
/// This test verifies:
/// - Files are sorted by name
/// - The extension filter ignores case and a leading dot
#[test]
fn test_list_files() {
    let all = list_files(Path::new(SAMPLES_DIR), None).expect("Failed to list samples");
    assert!(all.len() >= 2);
    let mut sorted = all.clone();
    sorted.sort();
    assert_eq!(all, sorted);

    let scores = list_files(Path::new(SAMPLES_DIR), Some(".MusicXML")).expect("Failed to list samples");
    assert!(scores.contains(&PathBuf::from(MELODY_MUSICXML)));
}

/// Test building a corpus.
///
/// This test verifies:
/// - One stored file per readable score, named after the score
/// - Unreadable files are skipped and reported instead of failing the build
/// - Stored segments load back unchanged
#[test]
fn test_build_corpus() {
    let source = tempfile::tempdir().expect("Failed to create temp dir");
    let destination = tempfile::tempdir().expect("Failed to create temp dir");
    let files = scratch_scores(source.path());
    assert_eq!(files.len(), 3);

    let report = build_corpus(&files, destination.path(), 0).expect("Failed to build corpus");
    assert_eq!(report.stored.len(), 2);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].0.ends_with("broken.musicxml"));

    let melody = load_segments(destination.path(), "melody").expect("Failed to load stored segments");
    assert_eq!(melody.source, "melody.musicxml");
    assert_eq!(melody.part, 0);
    assert_eq!(melody.segments.len(), 3);

    assert!(matches!(
        load_segments(destination.path(), "broken"),
        Err(CorpusError::Io(_))
    ));
}

/// Test searching a corpus.
///
/// This test verifies:
/// - Every stored file is searched in name order
/// - Each file's segments are filtered
#[test]
fn test_search_corpus() {
    let source = tempfile::tempdir().expect("Failed to create temp dir");
    let destination = tempfile::tempdir().expect("Failed to create temp dir");
    let files = scratch_scores(source.path());
    build_corpus(&files, destination.path(), 0).expect("Failed to build corpus");

    let everything = search_corpus(destination.path(), &SegmentFilter::none()).expect("Failed to search");
    let names: Vec<&str> = everything.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["chorale", "melody"]);

    let no_seconds = SegmentFilter::content(vec!["m2".to_string()], Vec::new());
    let found = search_corpus(destination.path(), &no_seconds).expect("Failed to search");
    let melody = found.iter().find(|m| m.name == "melody").expect("Melody not searched");
    assert_eq!(melody.segments.len(), 1);
    assert_eq!(melody.segments[0].starting_measure, 1);
}

/// Test storing segments directly.
///
/// This test verifies:
/// - Stored files are JSON named `<name>.json`
/// - Corrupt stored files report a JSON error
#[test]
fn test_store_segments() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data = StoredSegments {
        source: "empty.musicxml".to_string(),
        part: 1,
        segments: Vec::new(),
    };

    let path = store_segments(&data, dir.path(), "empty").expect("Failed to store segments");
    assert_eq!(path, dir.path().join("empty.json"));
    assert_eq!(load_segments(dir.path(), "empty").expect("Failed to load"), data);

    fs::write(dir.path().join("corrupt.json"), "{").expect("Failed to write corrupt file");
    assert!(matches!(
        load_segments(dir.path(), "corrupt"),
        Err(CorpusError::Json { .. })
    ));
}
