//! Time-window bucketing for videos
//!
//! Users describe each bucket with a calendar date and a start/end time on a
//! 12-hour clock. Bucketing walks the buckets in order and lets each one claim
//! every still-unclaimed video whose timestamp falls inside its window, so an
//! earlier bucket wins when windows overlap.
//!
//! Window fields are free text. Components are coerced to integers and the
//! resulting date-time rolls over like a lenient calendar constructor (month
//! 13 is January of the next year). A component that cannot be read at all
//! yields a window that matches nothing.

use crate::error::{Error, Result};
use chrono::{Months, NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

/// Half of the 12-hour clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Period {
    #[default]
    #[serde(rename = "AM", alias = "am")]
    Am,
    #[serde(rename = "PM", alias = "pm")]
    Pm,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Am => f.write_str("AM"),
            Period::Pm => f.write_str("PM"),
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AM" => Ok(Period::Am),
            "PM" => Ok(Period::Pm),
            other => Err(format!("expected AM or PM, got '{}'", other)),
        }
    }
}

/// JPEG still taken from a video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub jpeg: Vec<u8>,
}

/// A video accepted for bucketing
#[derive(Debug, Clone, PartialEq)]
pub struct VideoRecord {
    /// Where the video lives on disk
    pub path: PathBuf,
    /// File name used inside the archive
    pub name: String,
    /// Capture time proxy, local wall clock
    pub modified: NaiveDateTime,
    /// Best-effort preview frame
    pub thumbnail: Option<Thumbnail>,
    /// Placed by a manual move; bucketing leaves it in its bucket
    pub pinned: bool,
}

impl VideoRecord {
    pub fn new(path: impl Into<PathBuf>, modified: NaiveDateTime) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            name,
            modified,
            thumbnail: None,
            pinned: false,
        }
    }
}

/// Why a bucket's window could not be built
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("date '{0}' is not YYYY-MM-DD")]
    Date(String),
    #[error("{field} '{value}' is not H:MM")]
    Time { field: &'static str, value: String },
    #[error("window falls outside the supported calendar range")]
    OutOfRange,
}

/// Inclusive range of local wall-clock instants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// Whether `at` lies within `[start, end]`
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at <= self.end
    }
}

/// A user-named folder with a time window
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bucket {
    pub name: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `H:MM` or `HH:MM` on a 12-hour clock
    pub start_time: String,
    pub start_period: Period,
    pub end_time: String,
    pub end_period: Period,
    pub members: Vec<VideoRecord>,
}

impl Bucket {
    /// A bucket with the given name and an empty window
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder-style window setter
    pub fn with_window(
        mut self,
        date: impl Into<String>,
        start_time: impl Into<String>,
        start_period: Period,
        end_time: impl Into<String>,
        end_period: Period,
    ) -> Self {
        self.date = date.into();
        self.start_time = start_time.into();
        self.start_period = start_period;
        self.end_time = end_time.into();
        self.end_period = end_period;
        self
    }

    /// Build the bucket's window from its text fields
    pub fn window(&self) -> std::result::Result<TimeWindow, WindowError> {
        let mut parts = self.date.split('-');
        let date_part = |p: Option<&str>| to_number(p).ok_or_else(|| WindowError::Date(self.date.clone()));
        let year = date_part(parts.next())?;
        let month = date_part(parts.next())?;
        let day = date_part(parts.next())?;

        let start_hour = convert_to_24_hour(&self.start_time, self.start_period).ok_or_else(|| {
            WindowError::Time {
                field: "start time",
                value: self.start_time.clone(),
            }
        })?;
        let start_minute = minutes_of(&self.start_time).ok_or_else(|| WindowError::Time {
            field: "start time",
            value: self.start_time.clone(),
        })?;
        let end_hour = convert_to_24_hour(&self.end_time, self.end_period).ok_or_else(|| {
            WindowError::Time {
                field: "end time",
                value: self.end_time.clone(),
            }
        })?;
        let end_minute = minutes_of(&self.end_time).ok_or_else(|| WindowError::Time {
            field: "end time",
            value: self.end_time.clone(),
        })?;

        let start = local_instant(year, month, day, start_hour, start_minute)
            .ok_or(WindowError::OutOfRange)?;
        let end =
            local_instant(year, month, day, end_hour, end_minute).ok_or(WindowError::OutOfRange)?;

        Ok(TimeWindow { start, end })
    }

    /// Fail with a descriptive error when the window cannot be built
    pub fn validate(&self) -> Result<()> {
        self.window().map(|_| ()).map_err(|e| Error::InvalidWindow {
            bucket: self.name.clone(),
            message: e.to_string(),
        })
    }
}

/// Coerce one text component to an integer.
///
/// Surrounding whitespace is ignored and an empty component reads as zero; a
/// missing or non-numeric component has no value.
fn to_number(part: Option<&str>) -> Option<i64> {
    let part = part?.trim();
    if part.is_empty() {
        return Some(0);
    }
    part.parse().ok()
}

fn minutes_of(time: &str) -> Option<i64> {
    to_number(time.split(':').nth(1))
}

/// Convert the hour of an `H:MM` time on a 12-hour clock to a 24-hour value.
///
/// 12 AM is hour 0, PM adds 12 to every hour except 12, and anything else
/// passes through unchanged (out-of-range hours are not clamped).
pub fn convert_to_24_hour(time: &str, period: Period) -> Option<i64> {
    let hours = to_number(time.split(':').next())?;
    Some(match period {
        Period::Pm if hours != 12 => hours.checked_add(12)?,
        Period::Am if hours == 12 => 0,
        _ => hours,
    })
}

/// Local date-time from possibly out-of-range components, rolling over
fn local_instant(year: i64, month: i64, day: i64, hour: i64, minute: i64) -> Option<NaiveDateTime> {
    let base = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, 1, 1)?.and_hms_opt(0, 0, 0)?;

    let months = month - 1;
    let base = if months >= 0 {
        base.checked_add_months(Months::new(u32::try_from(months).ok()?))?
    } else {
        base.checked_sub_months(Months::new(u32::try_from(-months).ok()?))?
    };

    base.checked_add_signed(TimeDelta::try_days(day - 1)?)?
        .checked_add_signed(TimeDelta::try_hours(hour)?)?
        .checked_add_signed(TimeDelta::try_minutes(minute)?)
}

/// Buckets and remainder after a bucketing pass
#[derive(Debug, Clone, Default)]
pub struct Bucketing {
    pub buckets: Vec<Bucket>,
    pub remainder: Vec<VideoRecord>,
}

/// Assign videos to buckets.
///
/// Members claimed by an earlier pass go back to the pool together with the
/// remainder, so every bucket is re-evaluated against its current window.
/// Pinned members stay where a manual move put them. Buckets whose window
/// cannot be built claim nothing.
pub fn bucket_videos(mut buckets: Vec<Bucket>, remainder: Vec<VideoRecord>) -> Bucketing {
    let mut pool = Vec::with_capacity(remainder.len());
    for bucket in &mut buckets {
        let (pinned, returned): (Vec<_>, Vec<_>) =
            std::mem::take(&mut bucket.members).into_iter().partition(|v| v.pinned);
        if !returned.is_empty() {
            debug!(bucket = %bucket.name, returned = returned.len(), "Returned members to the pool");
        }
        bucket.members = pinned;
        pool.extend(returned);
    }
    pool.extend(remainder);

    let mut result = Vec::with_capacity(buckets.len());
    for mut bucket in buckets {
        match bucket.window() {
            Ok(window) => {
                let (matched, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut pool)
                    .into_iter()
                    .partition(|video| window.contains(video.modified));
                debug!(
                    bucket = %bucket.name,
                    start = %window.start,
                    end = %window.end,
                    claimed = matched.len(),
                    "Bucket evaluated"
                );
                bucket.members.extend(matched);
                pool = rest;
            }
            Err(e) => {
                warn!(bucket = %bucket.name, error = %e, "Bucket window is malformed, it matches nothing");
            }
        }

        result.push(bucket);
    }

    Bucketing {
        buckets: result,
        remainder: pool,
    }
}

/// Move one remainder video into a bucket, ignoring the bucket's window
pub fn move_video_to_folder(
    buckets: &mut [Bucket],
    remainder: &mut Vec<VideoRecord>,
    video: &Path,
    bucket_index: usize,
) -> Result<()> {
    if bucket_index >= buckets.len() {
        return Err(Error::BucketIndexOutOfRange {
            index: bucket_index,
            count: buckets.len(),
        });
    }

    let position = remainder
        .iter()
        .position(|v| v.path == video)
        .ok_or_else(|| Error::VideoNotInRemainder {
            path: video.to_path_buf(),
        })?;

    let mut record = remainder.remove(position);
    record.pinned = true;
    debug!(video = %record.name, bucket = %buckets[bucket_index].name, "Moved video manually");
    buckets[bucket_index].members.push(record);
    Ok(())
}
