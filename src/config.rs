use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::segments::SegmentFilter;
use crate::table::Delimiter;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Settings shared by every command
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub segments: SegmentsConfig,
    #[serde(default)]
    pub queries: QueriesConfig,
}

/// Common configuration settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommonConfig {
    /// Directory where tables are written when no output path is given
    pub output_dir: String,
    /// Format of slice tables: "tsv" or "csv"
    pub delimiter: Delimiter,
}

/// Segmentation settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SegmentsConfig {
    /// Index of the part to segment, 0 for the top line
    pub part: usize,
    /// Criteria used when searching segments
    pub filter: SegmentFilter,
}

/// Slice table query settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueriesConfig {
    /// Maximum number of chords listed by the follow query
    pub follow_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            common: CommonConfig::default(),
            segments: SegmentsConfig::default(),
            queries: QueriesConfig::default(),
        }
    }
}

impl Default for CommonConfig {
    fn default() -> Self {
        CommonConfig {
            output_dir: ".".to_string(),
            delimiter: Delimiter::Tab,
        }
    }
}

impl Default for SegmentsConfig {
    fn default() -> Self {
        SegmentsConfig {
            part: 0,
            filter: SegmentFilter::default(),
        }
    }
}

impl Default for QueriesConfig {
    fn default() -> Self {
        QueriesConfig { follow_limit: 15 }
    }
}

/// Load configuration from config.toml
pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    load_config_from(Path::new(CONFIG_FILE))
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist
pub fn load_config_from(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    match File::open(path) {
        Ok(mut file) => {
            let mut contents = String::new();
            file.read_to_string(&mut contents)?;
            Ok(toml::from_str(&contents)?)
        }
        Err(_) => {
            // If file doesn't exist, return default config
            Ok(Config::default())
        }
    }
}

/// Ensure the output directory exists
pub fn ensure_output_dir(dir: &Path) -> Result<PathBuf, std::io::Error> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(dir.to_path_buf())
}
