// Integration tests for the score table pipelines
//
// These tests run both pipelines end to end the way the command line tool
// does: configuration is loaded, scores are read from disk, tables are
// written, and the written tables are read back and queried.
//
// The integration tests ensure:
// 1. Configuration files override defaults section by section
// 2. The slice pipeline works from a MIDI file on disk to query results
// 3. The segment pipeline works from a score to a rendered fragment

use pretty_assertions::assert_eq;
use score_tables::config::{load_config_from, Config};
use score_tables::score::{load_score, QuarterLength};
use score_tables::segments::{self, SegmentFilter};
use score_tables::slices::{ScoreSlices, SliceWidth, SvTable};
use score_tables::table::Delimiter;
use std::fs;
use std::path::Path;

use test_utils::{arpeggio_midi, MELODY_MUSICXML};

/// Test loading configuration.
///
/// This test verifies:
/// - A missing file gives the defaults
/// - Sections and keys left out keep their defaults
/// - Filter criteria are read with exact quarter lengths
#[test]
fn test_config_loading() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let defaults = load_config_from(&dir.path().join("config.toml")).expect("Failed to load defaults");
    assert_eq!(defaults.common.delimiter, Delimiter::Tab);
    assert_eq!(defaults.queries.follow_limit, 15);
    assert_eq!(defaults.segments.filter, SegmentFilter::default());

    let path = dir.path().join("custom.toml");
    fs::write(
        &path,
        r#"
[common]
delimiter = "csv"

[segments]
part = 1

[segments.filter]
intervals = ["A4", "d5"]
note_values = ["1/3"]
"#,
    )
    .expect("Failed to write config");

    let config: Config = load_config_from(&path).expect("Failed to load config");
    assert_eq!(config.common.delimiter, Delimiter::Comma);
    assert_eq!(config.common.output_dir, ".");
    assert_eq!(config.segments.part, 1);
    assert_eq!(config.segments.filter.intervals, vec!["A4", "d5"]);
    assert_eq!(config.segments.filter.note_values, vec![QuarterLength::new(1, 3)]);
    assert_eq!(config.segments.filter.measure_range, Some((100, 110)));
    assert_eq!(config.queries.follow_limit, 15);

    fs::write(&path, "[queries]\nfollow_limit = \"many\"\n").expect("Failed to write config");
    assert!(load_config_from(&path).is_err());
}

/// Test switching filter criteria from a configuration file.
///
/// This test verifies:
/// - An empty range such as `[0, 0]` excludes nothing
/// - Quarter lengths are read from numbers as well as strings
/// - The loaded filter applies to real segments
#[test]
fn test_config_filter_values() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[segments.filter]
measure_range = [0, 0]
offset_range = [0, 0]
note_values = [0.25, "1/3", 2]
metrical_positions = []
"#,
    )
    .expect("Failed to write config");

    let config = load_config_from(&path).expect("Failed to load config");
    let filter = &config.segments.filter;
    assert_eq!(filter.measure_range, Some((0, 0)));
    assert_eq!(filter.offset_range, Some((QuarterLength::ZERO, QuarterLength::ZERO)));
    assert_eq!(
        filter.note_values,
        vec![QuarterLength::new(1, 4), QuarterLength::new(1, 3), QuarterLength::from_int(2)]
    );
    assert_eq!(filter.intervals, vec!["m6", "M6"]);

    let score = load_score(Path::new(MELODY_MUSICXML)).expect("Failed to load melody");
    let infos = segments::describe(&segments::segment_part(&score, 0, None).expect("Failed to segment"));
    let ranges_only = SegmentFilter {
        measure_range: filter.measure_range,
        offset_range: filter.offset_range,
        ..SegmentFilter::none()
    };
    assert_eq!(segments::filter_segments(&infos, &ranges_only), infos);

    // Half notes drop the first segment, triplets the second
    assert_eq!(segments::filter_segments(&infos, filter), vec![infos[2].clone()]);
}

/// Test the slice pipeline from a MIDI file on disk.
///
/// This test verifies:
/// - MIDI files are read by extension
/// - Unnamed scores get the fallback table name
/// - Queries run on the written table
#[test]
fn test_midi_slice_pipeline() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let midi_path = dir.path().join("arpeggio.mid");
    fs::write(&midi_path, arpeggio_midi()).expect("Failed to write MIDI sample");

    let score = load_score(&midi_path).expect("Failed to load MIDI");
    let table_path = ScoreSlices::from_score(&score)
        .write(dir.path(), None, Delimiter::Comma)
        .expect("Failed to write slice table");
    assert_eq!(table_path, dir.path().join("UNNAMED_SV_FILE.csv"));

    let table = SvTable::load(&table_path).expect("Failed to load slice table");
    assert_eq!(table.entries().len(), 5);

    let major = table.sets_of_type(&[0, 3, 7], true);
    assert_eq!(major.count, 4.0);
    assert_eq!(major.measures, vec![2]);

    assert_eq!(
        table.follow_chord(&[0], 15, false),
        vec![("[0]".to_string(), 1), ("rest".to_string(), 1), ("[0, 3, 7]".to_string(), 1)]
    );

    let even = table
        .even_slices(SliceWidth::Auto)
        .expect("Failed to re-slice table");
    assert_eq!(even.len(), 8);
}

/// Test the segment pipeline from a score to a fragment.
///
/// This test verifies:
/// - Segments are written, read back and filtered from disk
/// - A row of the table renders to a MIDI fragment
#[test]
fn test_segment_pipeline() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let score = load_score(Path::new(MELODY_MUSICXML)).expect("Failed to load melody");

    let found = segments::segment_part(&score, 0, None).expect("Failed to segment");
    let infos = segments::describe(&found);
    let table = dir.path().join("melody.tsv");
    segments::write_segment_table(&infos, &table).expect("Failed to write segments");

    let rows = segments::read_segment_table(&table).expect("Failed to read segments");
    assert_eq!(rows.len(), found.len());

    let fragment = segments::render_fragment(&score, 0, &rows[0]).expect("Failed to render");
    let out = dir.path().join("fragment.mid");
    score_tables::score::write_midi(&fragment, &out).expect("Failed to write fragment");
    let reread = load_score(&out).expect("Failed to read fragment");
    assert_eq!(reread.parts[0].note_count(), 4);
}
