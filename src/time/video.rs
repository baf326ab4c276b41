//! Video metadata extraction via FFprobe

use crate::error::{Error, Result};
use crate::time::filename::parse_filename_time;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;
use tracing::{debug, trace, warn};

/// Metadata keys to try for creation date
const CREATION_DATE_KEYS: &[&str] = &[
    "creation_time",
    "com.apple.quicktime.creationdate",
    "date",
    "date_recorded",
];

/// Cached FFprobe availability check
static FFPROBE_AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Check if ffprobe is available (cached)
pub fn is_ffprobe_available() -> bool {
    *FFPROBE_AVAILABLE.get_or_init(|| Command::new("ffprobe").arg("-version").output().is_ok())
}

/// Run ffprobe on a file and return its JSON report (format and streams)
pub fn probe(path: &Path) -> Result<serde_json::Value> {
    if !is_ffprobe_available() {
        return Err(Error::FfprobeNotFound);
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .map_err(|e| Error::VideoMetadata {
            path: path.to_path_buf(),
            message: format!("Failed to execute ffprobe: {}", e),
        })?;

    if !output.status.success() {
        return Err(Error::VideoMetadata {
            path: path.to_path_buf(),
            message: format!(
                "FFprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ),
        });
    }

    trace!(?path, "FFprobe output: {}", String::from_utf8_lossy(&output.stdout));

    serde_json::from_slice(&output.stdout).map_err(|e| Error::VideoMetadata {
        path: path.to_path_buf(),
        message: format!("Failed to parse FFprobe JSON: {}", e),
    })
}

/// Container duration in seconds, if ffprobe reports one
pub fn duration_secs(report: &serde_json::Value) -> Option<f64> {
    report
        .get("format")?
        .get("duration")?
        .as_str()?
        .parse()
        .ok()
}

/// Parse a metadata date string into a UTC naive date-time.
///
/// Values with an offset are converted to UTC; values without one are
/// taken as UTC already.
pub fn parse_video_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Find the first creation date tag in a tag object
fn creation_tag(tags: &serde_json::Value) -> Option<(String, NaiveDateTime)> {
    for key in CREATION_DATE_KEYS {
        for tag_key in [key.to_string(), key.to_uppercase()] {
            if let Some(dt) = tags
                .get(&tag_key)
                .and_then(|v| v.as_str())
                .and_then(parse_video_datetime)
            {
                return Some((tag_key, dt));
            }
        }
    }
    None
}

/// Extract a local creation time from video metadata using FFprobe
pub fn extract_video_time(path: &Path) -> Result<NaiveDateTime> {
    let report = probe(path)?;

    let from_format = report.get("format").and_then(|f| f.get("tags")).and_then(creation_tag);
    let found = from_format.or_else(|| {
        report
            .get("streams")
            .and_then(|s| s.as_array())
            .into_iter()
            .flatten()
            .filter_map(|stream| stream.get("tags"))
            .find_map(creation_tag)
    });

    let (key, utc_time) = found.ok_or_else(|| Error::VideoMetadata {
        path: path.to_path_buf(),
        message: "No creation time found in video metadata".to_string(),
    })?;
    debug!(?path, key = %key, "Found video creation time");

    Ok(apply_timezone_correction(path, utc_time))
}

/// Turn a UTC metadata time into local wall-clock time.
///
/// A file name timestamp within 14 hours of the metadata time is taken as the
/// local capture time and the offset is rounded to 15 minutes; otherwise the
/// system timezone is used.
fn apply_timezone_correction(path: &Path, utc_time: NaiveDateTime) -> NaiveDateTime {
    if let Some(filename) = path.file_name().and_then(|f| f.to_str())
        && let Some(filename_time) = parse_filename_time(filename)
    {
        let diff_seconds = (filename_time - utc_time).num_seconds();

        if diff_seconds.abs() <= 14 * 3600 {
            let offset_seconds = (diff_seconds / 900) * 900;
            debug!(
                ?path,
                utc_time = %utc_time,
                filename_time = %filename_time,
                offset_minutes = offset_seconds / 60,
                "Calculated timezone offset from filename"
            );
            return utc_time + chrono::Duration::seconds(offset_seconds);
        }

        warn!(
            ?path,
            utc_time = %utc_time,
            filename_time = %filename_time,
            diff_hours = diff_seconds / 3600,
            "Filename timestamp differs too much from metadata, using system timezone"
        );
    }

    Local.from_utc_datetime(&utc_time).naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[test]
    fn test_parse_video_datetime() {
        let dt = parse_video_datetime("2024-01-15T14:30:00Z").unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.hour(), 14);

        let dt = parse_video_datetime("2024-01-15T14:30:00.123Z").unwrap();
        assert_eq!(dt.minute(), 30);

        // 14:30 +08:00 = 06:30 UTC
        let dt = parse_video_datetime("2024-01-15T14:30:00+08:00").unwrap();
        assert_eq!(dt.hour(), 6);

        let dt = parse_video_datetime("2024-01-15 14:30:00").unwrap();
        assert_eq!(dt.day(), 15);

        assert!(parse_video_datetime("invalid").is_none());
    }

    #[test]
    fn test_creation_tag_lookup() {
        let tags = json!({ "encoder": "x", "CREATION_TIME": "2024-01-15T14:30:00Z" });
        let (key, dt) = creation_tag(&tags).unwrap();
        assert_eq!(key, "CREATION_TIME");
        assert_eq!(dt.hour(), 14);

        assert!(creation_tag(&json!({ "encoder": "x" })).is_none());
    }

    #[test]
    fn test_duration_secs() {
        let report = json!({ "format": { "duration": "12.500000" } });
        assert_eq!(duration_secs(&report), Some(12.5));
        assert_eq!(duration_secs(&json!({})), None);
    }

    #[test]
    fn test_timezone_correction_from_filename() {
        // File name says 22:30 local, metadata says 14:30 UTC: +8h
        let utc = NaiveDateTime::parse_from_str("2024-01-15 14:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let local = apply_timezone_correction(Path::new("VID_20240115_223000.mp4"), utc);
        assert_eq!(local.hour(), 22);
        assert_eq!(local.minute(), 30);
    }
}
