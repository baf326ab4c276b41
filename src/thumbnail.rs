//! Best-effort video thumbnails via FFmpeg
//!
//! One JPEG frame is taken at 10% of each video's duration. Missing tools or
//! unreadable videos simply leave the thumbnail unset.

use crate::bucket::{Thumbnail, VideoRecord};
use crate::error::{Error, Result};
use crate::time::video::{duration_secs, is_ffprobe_available, probe};
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{Level, debug, info, span, warn};

/// Fraction of the duration where the frame is taken
const SEEK_FRACTION: f64 = 0.1;

static FFMPEG_AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Check if ffmpeg is available (cached)
pub fn is_ffmpeg_available() -> bool {
    *FFMPEG_AVAILABLE.get_or_init(|| Command::new("ffmpeg").arg("-version").output().is_ok())
}

/// Thumbnail generation counters
#[derive(Debug, Default)]
pub struct ThumbnailStats {
    pub generated: AtomicUsize,
    pub failed: AtomicUsize,
    pub skipped: AtomicUsize,
}

impl ThumbnailStats {
    pub fn summary(&self) -> String {
        format!(
            "Thumbnails generated: {}, Failed: {}, Skipped: {}",
            self.generated.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
            self.skipped.load(Ordering::Relaxed)
        )
    }
}

/// Seek offset in seconds for a video of the given duration
pub fn seek_position(duration: Option<f64>) -> f64 {
    match duration {
        Some(d) if d.is_finite() && d > 0.0 => d * SEEK_FRACTION,
        _ => 0.0,
    }
}

/// Grab one JPEG frame from a video
pub fn generate_thumbnail(path: &Path) -> Result<Thumbnail> {
    let duration = probe(path).ok().as_ref().and_then(duration_secs);
    let seek = seek_position(duration);

    let output = Command::new("ffmpeg")
        .args(["-v", "error", "-ss", &format!("{:.3}", seek), "-i"])
        .arg(path)
        .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "mjpeg", "-"])
        .output()
        .map_err(|e| Error::Thumbnail {
            path: path.to_path_buf(),
            message: format!("Failed to execute ffmpeg: {}", e),
        })?;

    if !output.status.success() || output.stdout.is_empty() {
        return Err(Error::Thumbnail {
            path: path.to_path_buf(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    debug!(?path, seek, bytes = output.stdout.len(), "Generated thumbnail");
    Ok(Thumbnail {
        jpeg: output.stdout,
    })
}

/// Attach thumbnails to videos in parallel.
///
/// `threads` of 0 lets rayon pick. When `out_dir` is set each JPEG is also
/// written there as `<file stem>.jpg`.
pub fn attach_thumbnails(
    videos: &mut [VideoRecord],
    threads: usize,
    out_dir: Option<&Path>,
) -> ThumbnailStats {
    let _span = span!(Level::INFO, "thumbnails").entered();
    let stats = ThumbnailStats::default();

    if !is_ffmpeg_available() || !is_ffprobe_available() {
        info!("FFmpeg not found, skipping thumbnails");
        stats.skipped.store(videos.len(), Ordering::Relaxed);
        return stats;
    }

    if let Some(dir) = out_dir
        && let Err(e) = fs::create_dir_all(dir)
    {
        warn!(?dir, error = %e, "Failed to create thumbnail directory, thumbnails stay in memory");
    }

    let mut work = || {
        videos.par_iter_mut().for_each(|video| {
            match generate_thumbnail(&video.path) {
                Ok(thumbnail) => {
                    if let Some(dir) = out_dir {
                        save_thumbnail(dir, &video.path, &thumbnail);
                    }
                    video.thumbnail = Some(thumbnail);
                    stats.generated.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    debug!(path = ?video.path, error = %e, "No thumbnail");
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        })
    };

    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(work),
        Err(e) => {
            warn!(error = %e, "Failed to build thumbnail thread pool, using the global pool");
            work();
        }
    }

    info!("{}", stats.summary());
    stats
}

fn save_thumbnail(dir: &Path, video: &Path, thumbnail: &Thumbnail) {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "thumbnail".to_string());
    let target = dir.join(format!("{}.jpg", stem));

    if let Err(e) = fs::write(&target, &thumbnail.jpeg) {
        warn!(?target, error = %e, "Failed to write thumbnail");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use tempfile::tempdir;

    #[test]
    fn test_seek_position() {
        assert_eq!(seek_position(Some(50.0)), 5.0);
        assert_eq!(seek_position(None), 0.0);
        assert_eq!(seek_position(Some(f64::NAN)), 0.0);
        assert_eq!(seek_position(Some(-3.0)), 0.0);
    }

    #[test]
    fn test_unreadable_video_has_no_thumbnail() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.mp4");
        fs::write(&path, b"not a video").unwrap();

        let when = NaiveDateTime::parse_from_str("2024-06-01 10:00", "%Y-%m-%d %H:%M").unwrap();
        let mut videos = vec![VideoRecord::new(&path, when)];
        let out = dir.path().join("thumbs");

        let stats = attach_thumbnails(&mut videos, 1, Some(&out));
        assert!(videos[0].thumbnail.is_none());
        assert_eq!(stats.generated.load(Ordering::Relaxed), 0);
        assert!(!out.join("broken.jpg").exists());
    }
}
