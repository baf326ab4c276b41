//! Configuration types for the file organizer

use crate::bucket::{Bucket, Period};
use crate::catalog::extension_of;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// What to store inside archive entries on the folder path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveContents {
    /// A short placeholder line naming the file
    #[default]
    Placeholder,
    /// The file's real bytes
    Original,
}

/// Where a video's timestamp comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TimeSource {
    /// File system modification time
    #[default]
    Modified,
    /// Container metadata via ffprobe, then the file name, then modification time
    Metadata,
}

/// A bucket as written in the config file or on the command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BucketConfig {
    pub name: String,
    pub date: String,
    pub start_time: String,
    pub start_period: Period,
    pub end_time: String,
    pub end_period: Period,
}

impl From<&BucketConfig> for Bucket {
    fn from(cfg: &BucketConfig) -> Self {
        Bucket::named(cfg.name.clone()).with_window(
            cfg.date.clone(),
            cfg.start_time.clone(),
            cfg.start_period,
            cfg.end_time.clone(),
            cfg.end_period,
        )
    }
}

/// Split `9:30 PM` into its time and period; the period defaults to AM
fn split_clock(value: &str) -> Result<(String, Period), String> {
    let mut parts = value.split_whitespace();
    let time = parts.next().unwrap_or_default().to_string();
    let period = match parts.next() {
        Some(p) => p.parse()?,
        None => Period::Am,
    };
    Ok((time, period))
}

impl FromStr for BucketConfig {
    type Err = String;

    /// Parse `name|YYYY-MM-DD|H:MM AM|H:MM PM`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split('|').map(str::trim).collect();
        let [name, date, start, end] = fields.as_slice() else {
            return Err(format!(
                "bucket '{}' must look like 'name|YYYY-MM-DD|H:MM AM|H:MM PM'",
                s
            ));
        };

        let (start_time, start_period) = split_clock(start)?;
        let (end_time, end_period) = split_clock(end)?;

        Ok(Self {
            name: name.to_string(),
            date: date.to_string(),
            start_time,
            start_period,
            end_time,
            end_period,
        })
    }
}

/// A manual assignment of one video to a named bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveConfig {
    /// File name (or path) of the video
    pub file: String,
    /// Bucket name
    pub bucket: String,
}

impl FromStr for MoveConfig {
    type Err = String;

    /// Parse `file=bucket`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('=') {
            Some((file, bucket)) if !file.trim().is_empty() && !bucket.trim().is_empty() => {
                Ok(Self {
                    file: file.trim().to_string(),
                    bucket: bucket.trim().to_string(),
                })
            }
            _ => Err(format!("move '{}' must look like 'file=bucket'", s)),
        }
    }
}

/// Configuration for the file organizer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory the archives are written to
    pub output_dir: PathBuf,

    /// Descend into subdirectories when scanning a folder
    pub recursive: bool,

    /// Contents of entries in the folder archive
    pub archive_contents: ArchiveContents,

    /// Timestamp source for videos
    pub time_source: TimeSource,

    /// Reject buckets whose window cannot be read instead of letting them match nothing
    pub strict_windows: bool,

    /// Write video thumbnails here when set
    pub thumbnails_dir: Option<PathBuf>,

    /// Number of threads for thumbnail generation (0 = auto)
    pub threads: usize,

    /// Directory for history and session files
    pub data_dir: Option<PathBuf>,

    /// Dry run mode - compute everything but write no archive
    pub dry_run: bool,

    /// Verbose output
    pub verbose: bool,

    /// Accepted video extensions (dotted, lower-case)
    pub video_extensions: Vec<String>,

    /// Time-window buckets, evaluated in order
    pub buckets: Vec<BucketConfig>,

    /// Manual assignments applied after bucketing
    pub moves: Vec<MoveConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            recursive: false,
            archive_contents: ArchiveContents::default(),
            time_source: TimeSource::default(),
            strict_windows: false,
            thumbnails_dir: None,
            threads: 0,
            data_dir: None,
            dry_run: false,
            verbose: false,
            video_extensions: vec![
                ".mp4".into(), ".mov".into(), ".avi".into(), ".mkv".into(), ".webm".into(),
                ".m4v".into(), ".wmv".into(), ".flv".into(), ".3gp".into(),
            ],
            buckets: vec![],
            moves: vec![],
        }
    }
}

impl Config {
    /// Check whether a file name carries an accepted video extension
    pub fn is_video(&self, file_name: &str) -> bool {
        let ext = format!(".{}", extension_of(file_name));
        self.video_extensions
            .iter()
            .any(|e| e.to_lowercase() == ext)
    }

    /// Buckets in evaluation order
    pub fn to_buckets(&self) -> Vec<Bucket> {
        self.buckets.iter().map(Bucket::from).collect()
    }

    /// Data directory, falling back to `default` when unset
    pub fn data_dir_or(&self, default: &Path) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| default.to_path_buf())
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            source: e,
        })?;

        fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# File Organizer Configuration File
# This file uses TOML format (https://toml.io)

# Directory the archives are written to
output_dir = "."

# Descend into subdirectories when scanning a folder
recursive = false

# Contents of entries in organized-files.zip: "placeholder" or "original"
# - placeholder: each entry holds "Sample content for <name>"
# - original: each entry holds the file's real bytes
archive_contents = "placeholder"

# Timestamp source for videos: "modified" or "metadata"
# - modified: file system modification time
# - metadata: ffprobe creation time, then the file name, then modification time
time_source = "modified"

# Reject buckets with an unreadable date or time instead of letting them match nothing
strict_windows = false

# Write a JPEG thumbnail per video here (requires ffmpeg and ffprobe in PATH)
# thumbnails_dir = "thumbnails"

# Number of threads for thumbnail generation (0 = auto-detect)
threads = 0

# Directory for history and session files (defaults to Data/ beside the executable)
# data_dir = "Data"

# Accepted video extensions
video_extensions = [".mp4", ".mov", ".avi", ".mkv", ".webm", ".m4v", ".wmv", ".flv", ".3gp"]

# Buckets are evaluated in order; an earlier bucket wins when windows overlap.
# Times use a 12-hour clock with a separate AM/PM period.
[[buckets]]
name = "Ceremony"
date = "2024-06-01"
start_time = "10:00"
start_period = "AM"
end_time = "12:30"
end_period = "PM"

[[buckets]]
name = "Reception"
date = "2024-06-01"
start_time = "6:00"
start_period = "PM"
end_time = "11:59"
end_period = "PM"

# Manual assignments, applied after bucketing and never checked against the window
# [[moves]]
# file = "speech.mp4"
# bucket = "Reception"
"#
        .to_string()
    }
}

/// Errors that can occur when loading or saving configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to write configuration file
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to serialize configuration
    SerializeError {
        source: toml::ser::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::WriteError { path, source } => {
                write!(f, "Failed to write config file '{}': {}", path.display(), source)
            }
            ConfigError::SerializeError { source } => {
                write!(f, "Failed to serialize config: {}", source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::WriteError { source, .. } => Some(source),
            ConfigError::SerializeError { source } => Some(source),
        }
    }
}
