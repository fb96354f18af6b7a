//! Corpora of stored segment descriptions.
//!
//! Building a corpus segments every score in a list and stores the
//! descriptions as one JSON file per score; searching loads them back and
//! filters each file's segments.
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::score::{load_score, ScoreError};
use crate::segments::{describe, filter_segments, segment_part, SegmentFilter, SegmentInfo};

/// Extension of stored segment files.
pub const CORPUS_EXTENSION: &str = "json";

/// Errors that can occur while building or searching a corpus
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    /// IO errors when reading/writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored segment files that cannot be encoded or decoded
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Errors reading a score
    #[error(transparent)]
    Score(#[from] ScoreError),
}

/// Segment descriptions of one score, as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSegments {
    /// File name of the score they were taken from.
    pub source: String,
    pub part: usize,
    pub segments: Vec<SegmentInfo>,
}

/// Outcome of [`build_corpus`].
#[derive(Debug, Default)]
pub struct CorpusReport {
    pub stored: Vec<PathBuf>,
    /// Files that could not be read, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

/// Segments kept from one stored file by [`search_corpus`].
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusMatch {
    pub name: String,
    pub source: String,
    pub segments: Vec<SegmentInfo>,
}

/// Files in `dir`, sorted by name, optionally restricted to one extension.
pub fn list_files(dir: &Path, extension: Option<&str>) -> Result<Vec<PathBuf>, CorpusError> {
    let wanted = extension.map(|e| e.trim_start_matches('.').to_ascii_lowercase());
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = match &wanted {
            Some(wanted) => path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(wanted)),
            None => true,
        };
        if matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn stored_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.{}", name, CORPUS_EXTENSION))
}

/// Writes `data` to `<dir>/<name>.json` and returns the path.
pub fn store_segments(data: &StoredSegments, dir: &Path, name: &str) -> Result<PathBuf, CorpusError> {
    let path = stored_path(dir, name);
    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut writer, data).map_err(|source| CorpusError::Json {
        path: path.clone(),
        source,
    })?;
    writer.flush()?;
    Ok(path)
}

/// Reads `<dir>/<name>.json`.
pub fn load_segments(dir: &Path, name: &str) -> Result<StoredSegments, CorpusError> {
    let path = stored_path(dir, name);
    let reader = BufReader::new(File::open(&path)?);
    serde_json::from_reader(reader).map_err(|source| CorpusError::Json { path, source })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn describe_file(path: &Path, part: usize) -> Result<Vec<SegmentInfo>, ScoreError> {
    let score = load_score(path)?;
    let segments = segment_part(&score, part, None)?;
    Ok(describe(&segments))
}

/// Segments part `part` of every file and stores the descriptions in
/// `destination`, one file per score named after it.
///
/// Files that cannot be read or segmented are skipped with a warning.
pub fn build_corpus(files: &[PathBuf], destination: &Path, part: usize) -> Result<CorpusReport, CorpusError> {
    fs::create_dir_all(destination)?;
    let mut report = CorpusReport::default();

    for path in files {
        let segments = match describe_file(path, part) {
            Ok(segments) => segments,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping file");
                report.skipped.push((path.clone(), e.to_string()));
                continue;
            }
        };

        let data = StoredSegments {
            source: path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            part,
            segments,
        };
        let stored = store_segments(&data, destination, &file_stem(path))?;
        info!(path = %path.display(), segments = data.segments.len(), "stored segments");
        report.stored.push(stored);
    }

    Ok(report)
}

/// Loads every stored file in `dir` and keeps the segments passing
/// `filter`, one match per file in name order.
pub fn search_corpus(dir: &Path, filter: &SegmentFilter) -> Result<Vec<CorpusMatch>, CorpusError> {
    let mut matches = Vec::new();
    for path in list_files(dir, Some(CORPUS_EXTENSION))? {
        let name = file_stem(&path);
        debug!(file = %name, "searching");
        let data = load_segments(dir, &name)?;
        matches.push(CorpusMatch {
            segments: filter_segments(&data.segments, filter),
            source: data.source,
            name,
        });
    }
    Ok(matches)
}
