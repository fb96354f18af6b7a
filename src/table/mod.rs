/// Separated-values tables: delimiter handling and typed rows over `csv`.
///
/// Writing rows and reading them back yields the same rows in the same
/// order, as long as each row type's record conversion is lossless.
pub mod repr;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;
use std::str::FromStr;

/// Errors that can occur while reading or writing tables
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// IO errors when reading/writing files
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Malformed separated-values input
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A record whose cells cannot be converted into a row
    #[error("Invalid row at line {line}: {message}")]
    Row { line: u64, message: String },

    /// Delimiter other than tab or comma
    #[error("Delimiter (currently {0:?}) must be either '\\t' (for .tsv) or ',' (for .csv)")]
    InvalidDelimiter(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delimiter {
    #[default]
    #[serde(rename = "tsv")]
    Tab,
    #[serde(rename = "csv")]
    Comma,
}

impl Delimiter {
    pub fn byte(self) -> u8 {
        match self {
            Delimiter::Tab => b'\t',
            Delimiter::Comma => b',',
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Delimiter::Tab => "tsv",
            Delimiter::Comma => "csv",
        }
    }

    /// `.csv` files are comma separated, everything else tab separated.
    pub fn from_path(path: &Path) -> Delimiter {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Delimiter::Comma,
            _ => Delimiter::Tab,
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Delimiter {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "\t" | "tsv" | "tab" => Ok(Delimiter::Tab),
            "," | "csv" | "comma" => Ok(Delimiter::Comma),
            other => Err(TableError::InvalidDelimiter(other.to_string())),
        }
    }
}

/// A typed row of a separated-values table.
pub trait TableRow: Sized {
    /// Column names, written as a header row when present.
    const HEADER: Option<&'static [&'static str]>;

    fn to_record(&self) -> Vec<String>;

    fn from_record(fields: &[&str]) -> Result<Self, String>;
}

pub fn write_rows<R: TableRow, W: io::Write>(
    rows: &[R],
    writer: W,
    delimiter: Delimiter,
) -> Result<(), TableError> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter.byte())
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(writer);

    if let Some(header) = R::HEADER {
        wtr.write_record(header)?;
    }
    for row in rows {
        wtr.write_record(row.to_record())?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn read_rows<R: TableRow, Rd: io::Read>(reader: Rd, delimiter: Delimiter) -> Result<Vec<R>, TableError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter.byte())
        .has_headers(R::HEADER.is_some())
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let fields: Vec<&str> = record.iter().collect();
        let row = R::from_record(&fields).map_err(|message| TableError::Row {
            line: record.position().map(|p| p.line()).unwrap_or(0),
            message,
        })?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn write_table_file<R: TableRow>(rows: &[R], path: &Path, delimiter: Delimiter) -> Result<(), TableError> {
    let file = File::create(path)?;
    write_rows(rows, BufWriter::new(file), delimiter)
}

/// Reads a table, taking the delimiter from the file extension.
pub fn read_table_file<R: TableRow>(path: &Path) -> Result<Vec<R>, TableError> {
    let file = File::open(path)?;
    read_rows(file, Delimiter::from_path(path))
}

/// Checks a record has exactly `expected` cells.
pub fn expect_fields(fields: &[&str], expected: usize) -> Result<(), String> {
    if fields.len() == expected {
        Ok(())
    } else {
        Err(format!("expected {} fields, found {}", expected, fields.len()))
    }
}
