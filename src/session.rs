//! Video organizing session
//!
//! Holds the buckets and the remainder of one run. Videos enter the
//! remainder on intake, buckets claim them when the session is organized,
//! and manual moves pull single videos out of the remainder afterwards.

use crate::archive::{ArchivePlan, VIDEOS_ARCHIVE_NAME, plan_videos_archive, write_archive};
use crate::bucket::{Bucket, Bucketing, VideoRecord, bucket_videos, move_video_to_folder};
use crate::config::{Config, MoveConfig};
use crate::error::{Error, Result};
use crate::intake::collect_videos;
use crate::thumbnail::{ThumbnailStats, attach_thumbnails};
use std::path::{Path, PathBuf};
use tracing::{Level, debug, info, span};

/// Buckets and unassigned videos of one run
#[derive(Debug, Clone, Default)]
pub struct VideoSession {
    buckets: Vec<Bucket>,
    remainder: Vec<VideoRecord>,
}

impl VideoSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buckets(buckets: Vec<Bucket>) -> Self {
        Self {
            buckets,
            remainder: Vec::new(),
        }
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn remainder(&self) -> &[VideoRecord] {
        &self.remainder
    }

    /// Mutable access for editing a bucket's name or window
    pub fn bucket_mut(&mut self, index: usize) -> Option<&mut Bucket> {
        self.buckets.get_mut(index)
    }

    /// Append videos to the remainder, returning how many were added
    pub fn intake(&mut self, videos: impl IntoIterator<Item = VideoRecord>) -> usize {
        let before = self.remainder.len();
        self.remainder.extend(videos);
        let added = self.remainder.len() - before;
        debug!(added, remainder = self.remainder.len(), "Videos added to remainder");
        added
    }

    /// Append an empty bucket named `Folder N`, returning its index
    pub fn create_bucket(&mut self) -> usize {
        let name = format!("Folder {}", self.buckets.len() + 1);
        debug!(%name, "Created bucket");
        self.buckets.push(Bucket::named(name));
        self.buckets.len() - 1
    }

    /// Fail on the first bucket whose window cannot be read
    pub fn validate(&self) -> Result<()> {
        self.buckets.iter().try_for_each(Bucket::validate)
    }

    /// Re-evaluate every bucket against its window, keeping manual moves
    pub fn organize(&mut self) {
        let Bucketing { buckets, remainder } = bucket_videos(
            std::mem::take(&mut self.buckets),
            std::mem::take(&mut self.remainder),
        );
        self.buckets = buckets;
        self.remainder = remainder;
        info!(
            bucketed = self.buckets.iter().map(|b| b.members.len()).sum::<usize>(),
            remaining = self.remainder.len(),
            "Organized videos"
        );
    }

    /// Move one remainder video into the bucket at `index`
    pub fn move_to_bucket(&mut self, video: &Path, index: usize) -> Result<()> {
        move_video_to_folder(&mut self.buckets, &mut self.remainder, video, index)
    }

    /// Apply a manual assignment naming the video by path or file name and
    /// the bucket by name
    pub fn apply_move(&mut self, assignment: &MoveConfig) -> Result<()> {
        let index = self
            .buckets
            .iter()
            .position(|b| b.name == assignment.bucket)
            .ok_or_else(|| Error::BucketNotFound(assignment.bucket.clone()))?;

        let wanted = Path::new(&assignment.file);
        let video = self
            .remainder
            .iter()
            .find(|v| v.path == wanted || v.name == assignment.file)
            .map(|v| v.path.clone())
            .ok_or_else(|| Error::VideoNotInRemainder {
                path: wanted.to_path_buf(),
            })?;

        self.move_to_bucket(&video, index)
    }

    /// Archive layout for the current state
    pub fn plan_archive(&self) -> ArchivePlan {
        plan_videos_archive(&self.buckets, &self.remainder)
    }
}

/// What one video run produced
#[derive(Debug)]
pub struct VideoOutcome {
    pub session: VideoSession,
    pub thumbnails: Option<ThumbnailStats>,
    /// Written archive, absent on dry runs
    pub archive: Option<PathBuf>,
}

/// Run the video pipeline: intake, thumbnails, bucketing, manual moves, archive
pub fn organize_videos(inputs: &[PathBuf], config: &Config) -> Result<VideoOutcome> {
    let _span = span!(Level::INFO, "video_run").entered();

    let mut session = VideoSession::with_buckets(config.to_buckets());
    if config.strict_windows {
        session.validate()?;
    }

    let mut videos = collect_videos(inputs, config)?;
    let thumbnails = config
        .thumbnails_dir
        .as_deref()
        .map(|dir| attach_thumbnails(&mut videos, config.threads, Some(dir)));
    session.intake(videos);

    session.organize();
    for assignment in &config.moves {
        session.apply_move(assignment)?;
        info!(file = %assignment.file, bucket = %assignment.bucket, "Applied manual move");
    }

    if config.dry_run {
        info!("Dry run, archive not written");
        return Ok(VideoOutcome {
            session,
            thumbnails,
            archive: None,
        });
    }

    let dest = config.output_dir.join(VIDEOS_ARCHIVE_NAME);
    write_archive(&session.plan_archive(), &dest)?;
    Ok(VideoOutcome {
        session,
        thumbnails,
        archive: Some(dest),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::Period;
    use chrono::{Local, NaiveDateTime, TimeZone};
    use filetime::{FileTime, set_file_mtime};
    use std::fs::{self, File};
    use tempfile::tempdir;
    use zip::ZipArchive;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn video(name: &str, when: &str) -> VideoRecord {
        VideoRecord::new(format!("/videos/{}", name), at(when))
    }

    fn morning() -> Bucket {
        Bucket::named("Morning").with_window("2024-06-01", "9:00", Period::Am, "11:00", Period::Am)
    }

    #[test]
    fn test_create_bucket_names() {
        let mut session = VideoSession::new();
        assert_eq!(session.create_bucket(), 0);
        assert_eq!(session.create_bucket(), 1);
        let names: Vec<_> = session.buckets().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Folder 1", "Folder 2"]);
        assert_eq!(session.buckets()[0].start_period, Period::Am);
        assert!(session.buckets()[0].date.is_empty());
    }

    #[test]
    fn test_new_bucket_matches_nothing() {
        let mut session = VideoSession::new();
        session.create_bucket();
        session.intake([video("a.mp4", "2024-06-01 10:00")]);
        session.organize();
        assert!(session.buckets()[0].members.is_empty());
        assert_eq!(session.remainder().len(), 1);
    }

    #[test]
    fn test_organize_then_edit_and_reorganize() {
        let mut session = VideoSession::new();
        let index = session.create_bucket();
        session.intake([video("a.mp4", "2024-06-01 10:00"), video("b.mp4", "2024-06-01 15:00")]);
        session.organize();

        *session.bucket_mut(index).unwrap() = morning();
        session.organize();
        assert_eq!(session.buckets()[0].members[0].name, "a.mp4");
        assert_eq!(session.remainder()[0].name, "b.mp4");
    }

    #[test]
    fn test_reorganize_keeps_every_video() {
        let mut session = VideoSession::with_buckets(vec![morning()]);
        session.intake([video("a.mp4", "2024-06-01 10:00"), video("b.mp4", "2024-06-01 20:00")]);
        session.organize();
        session.move_to_bucket(Path::new("/videos/b.mp4"), 0).unwrap();

        session.organize();
        let total = session.buckets()[0].members.len() + session.remainder().len();
        assert_eq!(total, 2);
        assert!(session.buckets()[0].members.iter().any(|v| v.name == "b.mp4"));

        // A window edit releases bucketed videos but not the manual move
        session.bucket_mut(0).unwrap().date = "2025-01-01".into();
        session.organize();
        let members: Vec<_> = session.buckets()[0].members.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(members, ["b.mp4"]);
        assert_eq!(session.remainder()[0].name, "a.mp4");
    }

    #[test]
    fn test_apply_move_by_name() {
        let mut session = VideoSession::with_buckets(vec![morning()]);
        session.intake([video("late.mp4", "2024-06-01 23:00")]);
        session.organize();

        session
            .apply_move(&"late.mp4=Morning".parse().unwrap())
            .unwrap();
        assert!(session.remainder().is_empty());
        assert_eq!(session.buckets()[0].members.len(), 1);

        assert!(matches!(
            session.apply_move(&"late.mp4=Morning".parse().unwrap()),
            Err(Error::VideoNotInRemainder { .. })
        ));
        assert!(matches!(
            session.apply_move(&"late.mp4=Evening".parse().unwrap()),
            Err(Error::BucketNotFound(_))
        ));
    }

    #[test]
    fn test_move_to_bad_index_keeps_video() {
        let mut session = VideoSession::new();
        session.intake([video("a.mp4", "2024-06-01 10:00")]);
        let err = session
            .move_to_bucket(Path::new("/videos/a.mp4"), 3)
            .unwrap_err();
        assert!(matches!(err, Error::BucketIndexOutOfRange { index: 3, count: 0 }));
        assert_eq!(session.remainder().len(), 1);
    }

    #[test]
    fn test_strict_windows_rejects_malformed_bucket() {
        let dir = tempdir().unwrap();
        let mut config = Config {
            output_dir: dir.path().to_path_buf(),
            strict_windows: true,
            ..Config::default()
        };
        config
            .buckets
            .push("Broken|2024-06-01|9 AM|10:00 AM".parse().unwrap());

        let err = organize_videos(&[dir.path().to_path_buf()], &config).unwrap_err();
        assert!(matches!(err, Error::InvalidWindow { .. }));
    }

    #[test]
    fn test_organize_videos_end_to_end() {
        let input = tempdir().unwrap();
        let out = tempdir().unwrap();

        let write_clip = |name: &str, when: &str| {
            let path = input.path().join(name);
            fs::write(&path, format!("bytes of {}", name)).unwrap();
            let local = Local.from_local_datetime(&at(when)).earliest().unwrap();
            set_file_mtime(&path, FileTime::from_unix_time(local.timestamp(), 0)).unwrap();
        };
        write_clip("vows.mp4", "2024-06-01 10:30");
        write_clip("party.mov", "2024-06-01 20:00");
        write_clip("speech.mkv", "2024-06-02 09:00");
        write_clip("unrelated.mp4", "2024-06-03 09:00");
        fs::write(input.path().join("notes.txt"), "not a video").unwrap();

        let mut config = Config {
            output_dir: out.path().to_path_buf(),
            ..Config::default()
        };
        config.buckets = vec![
            "Ceremony|2024-06-01|10:00 AM|12:30 PM".parse().unwrap(),
            "Reception|2024-06-01|6:00 PM|11:59 PM".parse().unwrap(),
        ];
        config.moves = vec!["speech.mkv=Reception".parse().unwrap()];

        let outcome = organize_videos(&[input.path().to_path_buf()], &config).unwrap();
        let session = &outcome.session;
        assert_eq!(session.buckets()[0].members.len(), 1);
        assert_eq!(session.buckets()[1].members.len(), 2);
        assert_eq!(session.remainder().len(), 1);
        assert!(outcome.thumbnails.is_none());

        let archive = ZipArchive::new(File::open(outcome.archive.unwrap()).unwrap()).unwrap();
        let names: Vec<_> = archive.file_names().collect();
        for expected in [
            "organized_videos/ceremony/vows.mp4",
            "organized_videos/reception/party.mov",
            "organized_videos/reception/speech.mkv",
            "organized_videos/remaining_videos/unrelated.mp4",
        ] {
            assert!(names.contains(&expected), "missing {}", expected);
        }
        assert!(!names.iter().any(|n| n.ends_with("notes.txt")));
    }
}
