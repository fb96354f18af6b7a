use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use super::types::{QueryError, SliceEntry};
use crate::analysis::transposed_normal_form;
use crate::score::Pitch;
use crate::table::read_table_file;
use crate::table::repr::format_int_list;

/// Note values accepted as the width of equal-width slices.
pub const SLICE_WIDTH_OPTIONS: [f64; 10] = [0.0625, 0.125, 0.25, 0.5, 0.75, 1.0, 1.5, 2.0, 3.0, 4.0];

/// Intervals that only occur in augmented sixth chords and their
/// inversions, used as a default search.
pub const AUGMENTED_SIXTH_INTERVALS: [&str; 4] = ["A6", "d3", "A13", "d10"];

/// Label used for rests when counting chord successions.
pub const REST_LABEL: &str = "rest";

/// How often something occurs in a table, and where.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrences {
    /// Number of matching entries, or their summed length when weighted,
    /// rounded to three places.
    pub count: f64,
    pub measures: Vec<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriadType {
    Major,
    Minor,
    Diminished,
    Augmented,
}

impl TriadType {
    pub const ALL: [TriadType; 4] = [
        TriadType::Major,
        TriadType::Minor,
        TriadType::Diminished,
        TriadType::Augmented,
    ];

    /// Normal order transposed to 0.
    pub fn pitch_classes(self) -> [u8; 3] {
        match self {
            TriadType::Major => [0, 4, 7],
            TriadType::Minor => [0, 3, 7],
            TriadType::Diminished => [0, 3, 6],
            TriadType::Augmented => [0, 4, 8],
        }
    }
}

impl FromStr for TriadType {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "major" => Ok(TriadType::Major),
            "minor" => Ok(TriadType::Minor),
            "diminished" => Ok(TriadType::Diminished),
            "augmented" => Ok(TriadType::Augmented),
            other => Err(QueryError::UnknownTriad(other.to_string())),
        }
    }
}

/// Expands triad names, where `triads` stands for all four types.
pub fn parse_triad_types<S: AsRef<str>>(names: &[S]) -> Result<Vec<TriadType>, QueryError> {
    let mut types = Vec::new();
    for name in names {
        let name = name.as_ref();
        let parsed = if name.eq_ignore_ascii_case("triads") {
            TriadType::ALL.to_vec()
        } else {
            vec![name.parse()?]
        };
        for triad in parsed {
            if !types.contains(&triad) {
                types.push(triad);
            }
        }
    }
    Ok(types)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SliceWidth {
    /// The shortest slice in the table.
    Auto,
    Fixed(f64),
}

impl FromStr for SliceWidth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(SliceWidth::Auto);
        }
        s.parse::<f64>()
            .map(SliceWidth::Fixed)
            .map_err(|_| format!("slice width must be 'auto' or a number, got {:?}", s))
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn options_list() -> String {
    let options: Vec<String> = SLICE_WIDTH_OPTIONS.iter().map(|w| w.to_string()).collect();
    format!("[{}]", options.join(", "))
}

/// A slice table loaded back from disk, with the queries run on it.
#[derive(Debug, Clone)]
pub struct SvTable {
    pub path: PathBuf,
    entries: Vec<SliceEntry>,
}

impl SvTable {
    pub fn load(path: &Path) -> Result<Self, QueryError> {
        let entries: Vec<SliceEntry> = read_table_file(path)?;
        debug!(path = %path.display(), rows = entries.len(), "loaded slice table");
        Ok(SvTable {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn from_entries(path: PathBuf, entries: Vec<SliceEntry>) -> Self {
        SvTable { path, entries }
    }

    pub fn entries(&self) -> &[SliceEntry] {
        &self.entries
    }

    /// Prime form of every entry, `None` for rests.
    pub fn primes(&self) -> Vec<Option<&[u8]>> {
        self.entries.iter().map(|e| e.prime_form()).collect()
    }

    /// Normal order of every entry, `None` for rests.
    pub fn normals(&self) -> Vec<Option<&[u8]>> {
        self.entries.iter().map(|e| e.normal_order()).collect()
    }

    fn tally<F>(&self, weighted: bool, matches: F) -> (f64, Vec<i32>)
    where
        F: Fn(&SliceEntry) -> bool,
    {
        let mut count = 0.0;
        let mut measures = Vec::new();
        for entry in self.entries.iter().filter(|e| matches(e)) {
            measures.push(entry.measure);
            count += if weighted { entry.length } else { 1.0 };
        }
        (round3(count), measures)
    }

    /// Entries whose prime form is `chord_type`.
    ///
    /// Counts entries, or sums their lengths when `weighted`. Lists the
    /// measure of every hit, repeats included.
    pub fn sets_of_type(&self, chord_type: &[u8], weighted: bool) -> Occurrences {
        let (count, measures) = self.tally(weighted, |e| e.prime_form() == Some(chord_type));
        Occurrences { count, measures }
    }

    /// Entries containing at least one of `intervals`.
    ///
    /// Interval names carry spelling, so this finds chords that
    /// [`sets_of_type`](Self::sets_of_type) cannot, such as augmented
    /// sixths. Measures are listed once each, in order.
    pub fn intervals_of_type<S: AsRef<str>>(&self, intervals: &[S], weighted: bool) -> Occurrences {
        let (count, measures) = self.tally(weighted, |e| {
            e.intervals()
                .iter()
                .any(|i| intervals.iter().any(|wanted| wanted.as_ref() == i))
        });
        let mut unique = Vec::with_capacity(measures.len());
        for measure in measures {
            if !unique.contains(&measure) {
                unique.push(measure);
            }
        }
        Occurrences {
            count,
            measures: unique,
        }
    }

    /// Relative usage of triad types.
    ///
    /// Returns `("Overall", total entries)` when `counts` is set, then per
    /// triad a `"<set> Count"` and/or `"<set> Proportion"` pair. Triads are
    /// matched on the transposed normal form so major and minor stay apart.
    pub fn compare_triads(
        &self,
        triads: &[TriadType],
        counts: bool,
        proportions: bool,
    ) -> Result<Vec<(String, f64)>, QueryError> {
        if triads.is_empty() {
            return Err(QueryError::NoTriadTypes(
                "major, minor, diminished, augmented, triads".into(),
            ));
        }
        let total = self.entries.len();
        if total == 0 {
            return Err(QueryError::Empty(format!("{} has no entries", self.path.display())));
        }

        let forms: Vec<Option<Vec<u8>>> = self
            .entries
            .iter()
            .map(|e| e.normal_order().map(transposed_normal_form))
            .collect();

        let mut overall = Vec::new();
        if counts {
            overall.push(("Overall".to_string(), total as f64));
        }
        for triad in triads {
            let target = triad.pitch_classes();
            let hits = forms
                .iter()
                .filter(|form| form.as_deref() == Some(&target[..]))
                .count();
            let label = format_int_list(&target);
            if counts {
                overall.push((format!("{} Count", label), hits as f64));
            }
            if proportions {
                overall.push((format!("{} Proportion", label), hits as f64 / total as f64));
            }
        }
        Ok(overall)
    }

    /// Most common prime forms directly following `target`.
    ///
    /// Ties keep the order in which chords were first seen. `how_many`
    /// caps the list; `ignore_first` drops the most common entry, which is
    /// often `target` itself.
    pub fn follow_chord(&self, target: &[u8], how_many: usize, ignore_first: bool) -> Vec<(String, usize)> {
        let mut tally: Vec<(String, usize)> = Vec::new();

        for pair in self.entries.windows(2) {
            if pair[0].prime_form() != Some(target) {
                continue;
            }
            let label = pair[1]
                .prime_form()
                .map(format_int_list)
                .unwrap_or_else(|| REST_LABEL.to_string());
            match tally.iter_mut().find(|(l, _)| *l == label) {
                Some((_, count)) => *count += 1,
                None => tally.push((label, 1)),
            }
        }

        // Stable sort keeps first-seen order among equal counts
        tally.sort_by(|a, b| b.1.cmp(&a.1));
        let start = usize::from(ignore_first);
        tally
            .into_iter()
            .take(how_many)
            .skip(start)
            .collect()
    }

    /// Re-slices the table so every entry has the same length.
    ///
    /// Each entry becomes the nearest whole number of slices of `width`.
    /// The difference is carried into the next entry, so the total length
    /// stays within half a slice of the input and a short entry may be
    /// covered entirely by the slice before it.
    pub fn even_slices(&self, width: SliceWidth) -> Result<Vec<SliceEntry>, QueryError> {
        let width = match width {
            SliceWidth::Auto => {
                let shortest = self
                    .entries
                    .iter()
                    .map(|e| e.length)
                    .fold(f64::INFINITY, f64::min);
                if !shortest.is_finite() {
                    return Err(QueryError::Empty(format!("{} has no entries", self.path.display())));
                }
                if !SLICE_WIDTH_OPTIONS.contains(&shortest) {
                    return Err(QueryError::InvalidSliceWidth(shortest.to_string(), options_list()));
                }
                shortest
            }
            SliceWidth::Fixed(width) => {
                if !(width.is_finite() && width > 0.0) {
                    return Err(QueryError::InvalidSliceWidth(width.to_string(), options_list()));
                }
                width
            }
        };

        let mut even = Vec::new();
        let mut carry = 0.0;
        for entry in &self.entries {
            let available = entry.length + carry;
            let pieces = (available / width).round().max(0.0) as usize;
            carry = available - pieces as f64 * width;

            let mut piece = entry.clone();
            piece.length = width;
            even.extend(std::iter::repeat(piece).take(pieces));
        }

        debug!(width, slices = even.len(), "re-sliced table");
        Ok(even)
    }
}

/// Writes one line per sounding entry with its MIDI note numbers separated
/// by spaces. Rests are skipped.
pub fn write_even_midi(entries: &[SliceEntry], path: &Path) -> Result<(), QueryError> {
    let mut out = BufWriter::new(File::create(path)?);
    for chord in entries.iter().filter_map(|e| e.chord.as_ref()) {
        let numbers = chord
            .pitches
            .iter()
            .map(|name| {
                name.parse::<Pitch>()
                    .map(|p| p.midi().to_string())
                    .map_err(|e| QueryError::InvalidPitch(e.to_string()))
            })
            .collect::<Result<Vec<String>, QueryError>>()?;
        writeln!(out, "{}", numbers.join(" "))?;
    }
    out.flush()?;
    Ok(())
}
