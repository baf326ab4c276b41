//! Folder scanning and video intake

use crate::bucket::VideoRecord;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::time::extract_time;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// A regular file found while scanning a folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
}

/// List the regular files of `dir`, sorted by file name.
///
/// Only the top level is read unless `recursive` is set; directories
/// themselves are never returned.
pub fn scan_folder(dir: &Path, recursive: bool) -> Result<Vec<ScannedFile>> {
    if !dir.exists() {
        return Err(Error::InputNotFound {
            path: dir.to_path_buf(),
        });
    }
    if !dir.is_dir() {
        return Err(Error::NotADirectory {
            path: dir.to_path_buf(),
        });
    }

    let mut walker = WalkDir::new(dir).min_depth(1).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let size = entry.metadata()?.len();
        let name = entry.file_name().to_string_lossy().into_owned();
        debug!(path = ?entry.path(), size, "Scanned file");
        files.push(ScannedFile {
            path: entry.into_path(),
            name,
            size,
        });
    }

    info!(?dir, recursive, count = files.len(), "Scanned folder");
    Ok(files)
}

/// Turn input paths into video records.
///
/// Files are taken as given; folders are scanned following `config.recursive`.
/// Anything without an accepted video extension is skipped.
pub fn collect_videos(inputs: &[PathBuf], config: &Config) -> Result<Vec<VideoRecord>> {
    let mut candidates = Vec::new();
    for input in inputs {
        if !input.exists() {
            return Err(Error::InputNotFound {
                path: input.clone(),
            });
        }

        if input.is_dir() {
            candidates.extend(
                scan_folder(input, config.recursive)?
                    .into_iter()
                    .map(|f| f.path),
            );
        } else {
            candidates.push(input.clone());
        }
    }

    let mut videos = Vec::with_capacity(candidates.len());
    let mut skipped = 0usize;
    for path in candidates {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !config.is_video(&name) {
            debug!(?path, "Not a supported video, skipping");
            skipped += 1;
            continue;
        }

        let extracted = extract_time(&path, config.time_source)?;
        debug!(?path, timestamp = %extracted.timestamp, origin = ?extracted.origin, "Accepted video");
        videos.push(VideoRecord::new(path, extracted.timestamp));
    }

    info!(accepted = videos.len(), skipped, "Collected videos");
    Ok(videos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path, bytes: &[u8]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_scan_top_level_only() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("b.txt"), b"hello");
        touch(&dir.path().join("a.jpg"), b"");
        touch(&dir.path().join("nested").join("c.mp3"), b"x");

        let files = scan_folder(dir.path(), false).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "b.txt"]);
        assert_eq!(files[1].size, 5);
    }

    #[test]
    fn test_scan_recursive() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("a.jpg"), b"");
        touch(&dir.path().join("nested").join("deeper").join("c.mp3"), b"x");

        let files = scan_folder(dir.path(), true).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "c.mp3"]);
    }

    #[test]
    fn test_scan_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            scan_folder(&missing, false),
            Err(Error::InputNotFound { .. })
        ));

        let file = dir.path().join("file.txt");
        touch(&file, b"");
        assert!(matches!(
            scan_folder(&file, false),
            Err(Error::NotADirectory { .. })
        ));
    }

    #[test]
    fn test_collect_videos_filters_by_extension() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("clip.MP4"), b"v");
        touch(&dir.path().join("notes.txt"), b"t");
        let single = dir.path().join("solo").join("talk.mov");
        touch(&single, b"v");

        let config = Config::default();
        let videos = collect_videos(&[dir.path().to_path_buf(), single], &config).unwrap();
        let names: Vec<_> = videos.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["clip.MP4", "talk.mov"]);
        assert!(videos.iter().all(|v| v.thumbnail.is_none()));
    }

    #[test]
    fn test_collect_videos_missing_input() {
        let config = Config::default();
        let result = collect_videos(&[PathBuf::from("/no/such/clip.mp4")], &config);
        assert!(matches!(result, Err(Error::InputNotFound { .. })));
    }
}
