//! Capture time encoded in video file names

use chrono::{NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::trace;

/// Year/month/day/hour/minute/second patterns, tried in order
static DATETIME_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        // VID_20240115_143000, PXL_20240115_143000123, DJI_20240115143000
        (
            "camera prefix",
            r"(?:VID|MOV|MVI|PXL|DJI|GOPR|GP|REC)[-_]?(\d{4})(\d{2})(\d{2})[-_]?(\d{2})(\d{2})(\d{2})",
        ),
        // 20240115_143000 or 20240115-143000
        ("compact", r"(\d{4})(\d{2})(\d{2})[_\-](\d{2})(\d{2})(\d{2})"),
        // 2024-01-15 14.30.00, 2024-01-15_14-30-00
        (
            "separated",
            r"(\d{4})[-_](\d{2})[-_](\d{2})[-_\sT](\d{2})[-_.:](\d{2})[-_.:](\d{2})",
        ),
        // Screen Recording 2024-01-15 at 14.30.00
        (
            "screen recording",
            r"(?i)(?:screen recording|screenrecorder|录屏)[-_\s]*(\d{4})[-_]?(\d{2})[-_]?(\d{2})[-_\s]*(?:at[-_\s]*)?(\d{1,2})[-_.]?(\d{2})[-_.]?(\d{2})",
        ),
    ]
    .into_iter()
    .filter_map(|(label, pattern)| Regex::new(pattern).ok().map(|re| (label, re)))
    .collect()
});

/// Parse a local capture time from a file name
pub fn parse_filename_time(filename: &str) -> Option<NaiveDateTime> {
    let name = filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .filter(|stem| !stem.is_empty())
        .unwrap_or(filename);

    for (label, pattern) in DATETIME_PATTERNS.iter() {
        if let Some(dt) = pattern.captures(name).and_then(|caps| from_captures(&caps)) {
            trace!(filename, pattern = label, "Matched file name pattern");
            return Some(dt);
        }
    }

    None
}

fn from_captures(caps: &Captures<'_>) -> Option<NaiveDateTime> {
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let year = i32::try_from(field(1)?).ok()?;
    if !(1990..=2100).contains(&year) {
        return None;
    }

    NaiveDate::from_ymd_opt(year, field(2)?, field(3)?)?.and_hms_opt(field(4)?, field(5)?, field(6)?)
}
