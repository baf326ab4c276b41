//! Video timestamp extraction
//!
//! Bucketing compares local wall-clock times. By default a video's time is its
//! file modification time; the metadata source tries, in order:
//! 1. Container creation time via FFprobe
//! 2. Filename parsing
//! 3. File system modification time

pub mod filename;
pub mod video;

use crate::config::TimeSource;
use crate::error::Result;
use chrono::{DateTime, Local, NaiveDateTime};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Where an extracted timestamp came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampOrigin {
    /// Extracted from video metadata via FFprobe
    VideoMetadata,
    /// Parsed from filename
    Filename,
    /// From file system modification time
    FileSystem,
}

/// Result of timestamp extraction
#[derive(Debug, Clone)]
pub struct ExtractedTime {
    /// Local wall-clock timestamp
    pub timestamp: NaiveDateTime,
    /// Source of the timestamp
    pub origin: TimestampOrigin,
}

/// File modification time as local wall-clock time
pub fn modified_time(path: &Path) -> Result<NaiveDateTime> {
    let modified = fs::metadata(path)?.modified()?;
    let local: DateTime<Local> = modified.into();
    Ok(local.naive_local())
}

/// Extract a video's timestamp according to the configured source
pub fn extract_time(path: &Path, source: TimeSource) -> Result<ExtractedTime> {
    if source == TimeSource::Metadata {
        match video::extract_video_time(path) {
            Ok(timestamp) => {
                debug!(?path, "Extracted time from video metadata");
                return Ok(ExtractedTime {
                    timestamp,
                    origin: TimestampOrigin::VideoMetadata,
                });
            }
            Err(e) => debug!(?path, error = %e, "No video metadata time found, trying other methods"),
        }

        if let Some(timestamp) = path
            .file_name()
            .and_then(|f| f.to_str())
            .and_then(filename::parse_filename_time)
        {
            debug!(?path, "Extracted time from filename");
            return Ok(ExtractedTime {
                timestamp,
                origin: TimestampOrigin::Filename,
            });
        }
        debug!(?path, "No time found in filename, using file system time");
    }

    Ok(ExtractedTime {
        timestamp: modified_time(path)?,
        origin: TimestampOrigin::FileSystem,
    })
}
