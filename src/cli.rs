use clap::{Args, Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use score_tables::config::{self, Config};
use score_tables::corpus::{self, CorpusError};
use score_tables::score::{self, ScoreError};
use score_tables::segments::{self, SegmentFilter};
use score_tables::slices::{
    self, parse_triad_types, QueryError, ScoreSlices, SliceWidth, SvTable, AUGMENTED_SIXTH_INTERVALS,
};
use score_tables::table::repr::parse_int_list;
use score_tables::table::{Delimiter, TableError};

/// Score slice and segment table tool
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show metadata, parts and measures of a score
    Info(InfoArgs),

    /// Chordify a score and write its slice table
    Slices(SlicesArgs),

    /// Split one part of a score into rest-delimited segments
    Segments(SegmentsArgs),

    /// Query a slice table
    Query(QueryArgs),

    /// Build or search a corpus of stored segments
    #[command(subcommand)]
    Corpus(CorpusCommand),

    /// Cut a segment out of its score and write it as MIDI
    Render(RenderArgs),
}

/// Show metadata, parts and measures of a score
#[derive(Args)]
struct InfoArgs {
    /// Path to the input score (.musicxml, .xml, .mid, .midi)
    #[arg(required = true)]
    score: PathBuf,
}

/// Chordify a score and write its slice table
#[derive(Args)]
struct SlicesArgs {
    /// Path to the input score
    #[arg(required = true)]
    score: PathBuf,

    /// Directory for the table (defaults to output_dir from config.toml)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Table name without extension (defaults to one built from the metadata)
    #[arg(short, long)]
    name: Option<String>,

    /// Table format: tsv or csv
    #[arg(short, long)]
    delimiter: Option<Delimiter>,
}

/// Split one part of a score into rest-delimited segments
#[derive(Args)]
struct SegmentsArgs {
    /// Path to the input score
    #[arg(required = true)]
    score: PathBuf,

    /// Output table (.csv or .tsv); prints to the console when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Part index, 0 for the top line
    #[arg(short, long)]
    part: Option<usize>,

    /// Voice to follow (defaults to the part's first voice)
    #[arg(long)]
    voice: Option<u8>,

    /// Keep only segments passing the filter from config.toml
    #[arg(short, long)]
    filter: bool,
}

/// Query a slice table
#[derive(Args)]
struct QueryArgs {
    /// Path to a slice table (.tsv or .csv)
    #[arg(required = true)]
    table: PathBuf,

    #[command(subcommand)]
    query: QueryCommand,
}

#[derive(Subcommand)]
enum QueryCommand {
    /// Count slices of one set class, e.g. "[0, 3, 7]"
    Sets {
        chord: String,
        /// Sum slice lengths instead of counting slices
        #[arg(short, long)]
        weighted: bool,
    },

    /// Count slices containing any of the given intervals
    Intervals {
        /// Interval names (defaults to the augmented sixth intervals)
        intervals: Vec<String>,
        #[arg(short, long)]
        weighted: bool,
    },

    /// Compare usage of triad types
    Triads {
        /// major, minor, diminished, augmented, or triads for all four
        #[arg(default_value = "triads")]
        types: Vec<String>,
        /// Leave out raw counts
        #[arg(long)]
        no_counts: bool,
        /// Leave out proportions
        #[arg(long)]
        no_proportions: bool,
    },

    /// List the chords that follow a chord
    Follow {
        chord: String,
        /// Number of chords to list (defaults to follow_limit from config.toml)
        #[arg(short, long)]
        limit: Option<usize>,
        /// Leave out the most common following chord
        #[arg(short, long)]
        ignore_first: bool,
        /// Also draw a histogram to this SVG file
        #[arg(long, value_name = "FILE")]
        histogram: Option<PathBuf>,
    },

    /// Re-slice the table at an equal width
    Even {
        /// Slice width in quarter notes, or auto
        #[arg(short, long, default_value = "auto")]
        width: SliceWidth,
        /// Write MIDI note numbers, one slice per line, to this file
        #[arg(short, long, value_name = "FILE")]
        midi_out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum CorpusCommand {
    /// Segment every score in a directory and store the results
    Build {
        /// Directory of scores
        source: PathBuf,
        /// Directory for the stored segment files
        destination: PathBuf,
        /// Only read files with this extension
        #[arg(short, long, default_value = "musicxml")]
        extension: String,
        /// Part index, 0 for the top line
        #[arg(short, long)]
        part: Option<usize>,
    },

    /// Filter every stored file in a corpus
    Search {
        /// Directory of stored segment files
        directory: PathBuf,
        /// Keep every segment instead of applying the filter from config.toml
        #[arg(long)]
        all: bool,
    },
}

/// Cut a segment out of its score and write it as MIDI
#[derive(Args)]
struct RenderArgs {
    /// Path to the score the segments were taken from
    #[arg(required = true)]
    score: PathBuf,

    /// Segment table written by the segments command
    #[arg(required = true)]
    segments: PathBuf,

    /// Row of the segment table, starting at 0
    #[arg(short, long, default_value_t = 0)]
    row: usize,

    /// Part index, 0 for the top line
    #[arg(short, long)]
    part: Option<usize>,

    /// Output MIDI file
    #[arg(short, long, default_value = "fragment.mid")]
    output: PathBuf,
}

fn require_file(path: &Path, what: &str) -> Result<(), io::Error> {
    if path.exists() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} not found: {}", what, path.display()),
        ))
    }
}

fn run_info_command(args: &InfoArgs) -> Result<(), ScoreError> {
    require_file(&args.score, "Score file")?;
    let score = score::load_score(&args.score)?;

    println!("Score Information:");
    println!("------------------");
    for (key, value) in score.metadata.all() {
        println!("{}: {}", key, value);
    }
    println!("Table name: {}", score.sv_file_name());
    println!(
        "Measures: {} ({} quarter notes)",
        score.measures.len(),
        score.duration()
    );
    for (index, part) in score.parts.iter().enumerate() {
        println!(
            "Part {}: {} ({} notes, voice {})",
            index,
            part.name,
            part.note_count(),
            part.primary_voice()
        );
    }
    Ok(())
}

fn run_slices_command(args: &SlicesArgs, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    require_file(&args.score, "Score file")?;
    let score = score::load_score(&args.score)?;
    let slices = ScoreSlices::from_score(&score);

    let dir = match &args.out_dir {
        Some(dir) => dir.clone(),
        None => PathBuf::from(&config.common.output_dir),
    };
    let dir = config::ensure_output_dir(&dir)?;
    let delimiter = args.delimiter.unwrap_or(config.common.delimiter);

    let path = slices.write(&dir, args.name.as_deref(), delimiter)?;
    println!("Wrote {} slices to {}", slices.entries.len(), path.display());
    Ok(())
}

fn run_segments_command(args: &SegmentsArgs, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    require_file(&args.score, "Score file")?;
    let score = score::load_score(&args.score)?;
    let part = args.part.unwrap_or(config.segments.part);

    let found = segments::segment_part(&score, part, args.voice)?;
    let mut infos = segments::describe(&found);
    if args.filter {
        infos = segments::filter_segments(&infos, &config.segments.filter);
    }

    match &args.output {
        Some(path) => {
            segments::write_segment_table(&infos, path)?;
            println!("Wrote {} segments to {}", infos.len(), path.display());
        }
        None => {
            let delimiter = Delimiter::Comma;
            score_tables::table::write_rows(&infos, io::stdout().lock(), delimiter)?;
        }
    }
    Ok(())
}

fn parse_chord(chord: &str) -> Result<Vec<u8>, QueryError> {
    parse_int_list(chord).map_err(QueryError::InvalidChord)
}

fn run_query_command(args: &QueryArgs, config: &Config) -> Result<(), QueryError> {
    require_file(&args.table, "Slice table")?;
    let table = SvTable::load(&args.table)?;

    match &args.query {
        QueryCommand::Sets { chord, weighted } => {
            let found = table.sets_of_type(&parse_chord(chord)?, *weighted);
            println!("Count: {}", found.count);
            println!("Measures: {:?}", found.measures);
        }
        QueryCommand::Intervals { intervals, weighted } => {
            let intervals: Vec<String> = if intervals.is_empty() {
                AUGMENTED_SIXTH_INTERVALS.iter().map(|s| s.to_string()).collect()
            } else {
                intervals.clone()
            };
            let found = table.intervals_of_type(intervals.as_slice(), *weighted);
            println!("Count: {}", found.count);
            println!("Measures: {:?}", found.measures);
        }
        QueryCommand::Triads {
            types,
            no_counts,
            no_proportions,
        } => {
            let triads = parse_triad_types(types.as_slice())?;
            for (label, value) in table.compare_triads(&triads, !no_counts, !no_proportions)? {
                println!("{}: {}", label, value);
            }
        }
        QueryCommand::Follow {
            chord,
            limit,
            ignore_first,
            histogram,
        } => {
            let limit = limit.unwrap_or(config.queries.follow_limit);
            let counts = table.follow_chord(&parse_chord(chord)?, limit, *ignore_first);
            for (label, count) in &counts {
                println!("{}: {}", label, count);
            }
            if let Some(path) = histogram {
                slices::write_follow_histogram(&counts, path)?;
                println!("Histogram saved to {}", path.display());
            }
        }
        QueryCommand::Even { width, midi_out } => {
            let even = table.even_slices(*width)?;
            println!("{} equal-width slices", even.len());
            if let Some(path) = midi_out {
                slices::write_even_midi(&even, path)?;
                println!("MIDI numbers saved to {}", path.display());
            }
        }
    }
    Ok(())
}

fn run_corpus_command(command: &CorpusCommand, config: &Config) -> Result<(), CorpusError> {
    match command {
        CorpusCommand::Build {
            source,
            destination,
            extension,
            part,
        } => {
            let files = corpus::list_files(source, Some(extension.as_str()))?;
            let part = part.unwrap_or(config.segments.part);
            let report = corpus::build_corpus(&files, destination, part)?;
            println!(
                "Stored {} file(s), skipped {}",
                report.stored.len(),
                report.skipped.len()
            );
            for (path, reason) in &report.skipped {
                println!("  {}: {}", path.display(), reason);
            }
        }
        CorpusCommand::Search { directory, all } => {
            let filter = if *all {
                SegmentFilter::none()
            } else {
                config.segments.filter.clone()
            };
            for found in corpus::search_corpus(directory, &filter)? {
                println!("{} ({} segments)", found.source, found.segments.len());
                for info in &found.segments {
                    println!(
                        "  m. {} offset {} to m. {} offset {}",
                        info.starting_measure, info.starting_offset, info.ending_measure, info.ending_offset
                    );
                }
            }
        }
    }
    Ok(())
}

fn run_render_command(args: &RenderArgs, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    require_file(&args.score, "Score file")?;
    require_file(&args.segments, "Segment table")?;

    let rows = segments::read_segment_table(&args.segments)?;
    let info = rows.get(args.row).ok_or_else(|| {
        format!(
            "row {} requested but {} has {} row(s)",
            args.row,
            args.segments.display(),
            rows.len()
        )
    })?;

    let score = score::load_score(&args.score)?;
    let part = args.part.unwrap_or(config.segments.part);
    let fragment = segments::render_fragment(&score, part, info)?;
    score::write_midi(&fragment, &args.output)?;
    println!("Fragment saved to {}", args.output.display());
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = config::load_config()?;

    match &cli.command {
        Commands::Info(args) => run_info_command(args)?,
        Commands::Slices(args) => run_slices_command(args, &config)?,
        Commands::Segments(args) => run_segments_command(args, &config)?,
        Commands::Query(args) => run_query_command(args, &config)?,
        Commands::Corpus(command) => run_corpus_command(command, &config)?,
        Commands::Render(args) => run_render_command(args, &config)?,
    }

    Ok(())
}

fn is_not_found(err: &(dyn std::error::Error + 'static)) -> bool {
    let io_err = err
        .downcast_ref::<io::Error>()
        .or_else(|| match err.downcast_ref::<ScoreError>() {
            Some(ScoreError::Io(e)) => Some(e),
            _ => None,
        })
        .or_else(|| match err.downcast_ref::<QueryError>() {
            Some(QueryError::Io(e)) | Some(QueryError::Table(TableError::Io(e))) => Some(e),
            _ => None,
        })
        .or_else(|| match err.downcast_ref::<CorpusError>() {
            Some(CorpusError::Io(e)) | Some(CorpusError::Score(ScoreError::Io(e))) => Some(e),
            _ => None,
        });
    io_err.is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "score_tables=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match run() {
        Ok(_) => {}
        Err(err) => {
            eprintln!("\nERROR: {}\n", err);
            if is_not_found(err.as_ref()) {
                eprintln!("Please check that:");
                eprintln!("1. The file path is correct");
                eprintln!("2. The file exists");
                eprintln!("3. You have permission to read the file");
            } else if let Some(ScoreError::UnsupportedFormat(_)) = err.downcast_ref::<ScoreError>() {
                eprintln!("Supported formats are MusicXML (.musicxml, .xml) and MIDI (.mid, .midi).");
            }
            process::exit(1);
        }
    }
}
