//! Zip archive output
//!
//! An [`ArchivePlan`] is the virtual folder tree of one archive: directory
//! entries plus file entries whose bytes come from text or a file on disk.
//! Adding a file under a path already planned replaces the earlier entry but
//! keeps its position. Plans are written to a temporary sibling and renamed
//! into place, so a failed write never leaves a partial archive behind.

use crate::bucket::{Bucket, VideoRecord};
use crate::config::ArchiveContents;
use crate::error::{Error, Result};
use crate::process::CategoryTree;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Archive written by the folder pipeline
pub const FILES_ARCHIVE_NAME: &str = "organized-files.zip";

/// Archive written by the video pipeline
pub const VIDEOS_ARCHIVE_NAME: &str = "organized_videos.zip";

/// Root folder inside the video archive
pub const VIDEOS_ROOT: &str = "organized_videos";

/// Folder for videos no bucket claimed
pub const REMAINING_FOLDER: &str = "remaining_videos";

/// Summary text at the root of the folder archive
pub const SUMMARY_FILE: &str = "summary.txt";

/// Folder name for a bucket: anything outside `[a-z0-9]` becomes `_`, then lower-cased
pub fn sanitize_folder_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Stand-in contents for a file entry
pub fn placeholder_text(file_name: &str) -> String {
    format!("Sample content for {}", file_name)
}

/// Where an entry's bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySource {
    Text(String),
    File(PathBuf),
}

/// One file inside the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// `/`-separated path inside the archive
    pub path: String,
    pub source: EntrySource,
}

/// Directories and files to write, in order
#[derive(Debug, Clone, Default)]
pub struct ArchivePlan {
    directories: Vec<String>,
    entries: Vec<ArchiveEntry>,
}

impl ArchivePlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan a directory and its parents
    pub fn add_directory(&mut self, path: &str) {
        let path = path.trim_matches('/');
        if path.is_empty() {
            return;
        }

        let mut prefix = String::new();
        for part in path.split('/') {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(part);
            if !self.directories.iter().any(|d| *d == prefix) {
                self.directories.push(prefix.clone());
            }
        }
    }

    /// Plan a file, replacing any entry already planned at the same path
    pub fn add_file(&mut self, path: impl Into<String>, source: EntrySource) {
        let path = path.into();
        if let Some((parent, _)) = path.rsplit_once('/') {
            self.add_directory(parent);
        }

        match self.entries.iter_mut().find(|e| e.path == path) {
            Some(existing) => {
                debug!(%path, "Replacing archive entry with the same path");
                existing.source = source;
            }
            None => self.entries.push(ArchiveEntry { path, source }),
        }
    }

    pub fn directories(&self) -> &[String] {
        &self.directories
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn entry(&self, path: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.path == path)
    }
}

/// Plan `organized-files.zip`: `<main>/<sub>/<name>` entries plus the summary
pub fn plan_files_archive(
    tree: &CategoryTree,
    summary: &str,
    contents: ArchiveContents,
) -> ArchivePlan {
    let mut plan = ArchivePlan::new();

    for category in &tree.categories {
        plan.add_directory(category.name);
        for sub in &category.subcategories {
            let folder = format!("{}/{}", category.name, sub.name);
            plan.add_directory(&folder);

            for file in &sub.files {
                let source = match (contents, &file.source) {
                    (ArchiveContents::Original, Some(path)) => EntrySource::File(path.clone()),
                    _ => EntrySource::Text(placeholder_text(&file.name)),
                };
                plan.add_file(format!("{}/{}", folder, file.name), source);
            }
        }
    }

    plan.add_file(SUMMARY_FILE, EntrySource::Text(summary.to_string()));
    plan
}

/// Plan `organized_videos.zip`: one folder per bucket plus the unclaimed remainder
pub fn plan_videos_archive(buckets: &[Bucket], remainder: &[VideoRecord]) -> ArchivePlan {
    let mut plan = ArchivePlan::new();
    plan.add_directory(VIDEOS_ROOT);

    let mut add_folder = |folder: String, videos: &[VideoRecord]| {
        plan.add_directory(&folder);
        for video in videos {
            plan.add_file(
                format!("{}/{}", folder, video.name),
                EntrySource::File(video.path.clone()),
            );
        }
    };

    for (index, bucket) in buckets.iter().enumerate() {
        let mut folder = sanitize_folder_name(&bucket.name);
        if folder.is_empty() {
            folder = format!("folder_{}", index + 1);
            debug!(%folder, "Unnamed bucket archived under a numbered folder");
        }
        add_folder(format!("{}/{}", VIDEOS_ROOT, folder), &bucket.members);
    }

    if !remainder.is_empty() {
        add_folder(format!("{}/{}", VIDEOS_ROOT, REMAINING_FOLDER), remainder);
    }

    plan
}

fn archive_error(path: &Path, message: impl ToString) -> Error {
    Error::Archive {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

/// Write a plan to `dest`, returning the number of file entries
pub fn write_archive(plan: &ArchivePlan, dest: &Path) -> Result<usize> {
    if let Some(parent) = dest.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let temp_path = dest.with_extension("zip.tmp");
    if let Err(e) = write_entries(plan, &temp_path) {
        if let Err(cleanup) = fs::remove_file(&temp_path)
            && cleanup.kind() != io::ErrorKind::NotFound
        {
            warn!(path = ?temp_path, error = %cleanup, "Failed to remove temporary archive");
        }
        return Err(e);
    }

    fs::rename(&temp_path, dest).map_err(|e| archive_error(dest, e))?;

    info!(
        path = ?dest,
        directories = plan.directories.len(),
        files = plan.entries.len(),
        "Archive written"
    );
    Ok(plan.entries.len())
}

fn write_entries(plan: &ArchivePlan, temp_path: &Path) -> Result<()> {
    let file = File::create(temp_path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for dir in &plan.directories {
        zip.add_directory(format!("{}/", dir), options)
            .map_err(|e| archive_error(temp_path, format!("directory {}: {}", dir, e)))?;
    }

    for entry in &plan.entries {
        match &entry.source {
            EntrySource::Text(text) => {
                zip.start_file(entry.path.as_str(), options)
                    .map_err(|e| archive_error(temp_path, format!("entry {}: {}", entry.path, e)))?;
                zip.write_all(text.as_bytes())?;
            }
            EntrySource::File(source) => {
                let mut input = File::open(source)?;
                let size = input.metadata()?.len();
                let entry_options = options.large_file(size >= u64::from(u32::MAX));
                zip.start_file(entry.path.as_str(), entry_options)
                    .map_err(|e| archive_error(temp_path, format!("entry {}: {}", entry.path, e)))?;
                io::copy(&mut input, &mut zip)?;
            }
        }
        debug!(path = %entry.path, "Added archive entry");
    }

    zip.finish().map_err(|e| archive_error(temp_path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CategoryTree;
    use chrono::NaiveDateTime;
    use std::io::Read;
    use tempfile::tempdir;
    use zip::ZipArchive;

    fn read_archive(path: &Path) -> ZipArchive<File> {
        ZipArchive::new(File::open(path).unwrap()).unwrap()
    }

    fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> String {
        let mut text = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut text).unwrap();
        text
    }

    fn names(archive: &ZipArchive<File>) -> Vec<String> {
        archive.file_names().map(str::to_string).collect()
    }

    #[test]
    fn test_sanitize_folder_name() {
        assert_eq!(sanitize_folder_name("Ceremony"), "ceremony");
        assert_eq!(sanitize_folder_name("First Dance!"), "first_dance_");
        assert_eq!(sanitize_folder_name("Día 2"), "d_a_2");
        assert_eq!(sanitize_folder_name(""), "");
    }

    #[test]
    fn test_add_file_replaces_in_place() {
        let mut plan = ArchivePlan::new();
        plan.add_file("a/one.txt", EntrySource::Text("first".into()));
        plan.add_file("a/two.txt", EntrySource::Text("two".into()));
        plan.add_file("a/one.txt", EntrySource::Text("second".into()));

        let paths: Vec<_> = plan.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a/one.txt", "a/two.txt"]);
        assert_eq!(
            plan.entry("a/one.txt").unwrap().source,
            EntrySource::Text("second".into())
        );
        assert_eq!(plan.directories(), &["a".to_string()]);
    }

    #[test]
    fn test_add_directory_adds_parents_once() {
        let mut plan = ArchivePlan::new();
        plan.add_directory("x/y/z/");
        plan.add_directory("x/y");
        assert_eq!(plan.directories(), &["x", "x/y", "x/y/z"]);
    }

    #[test]
    fn test_files_archive_layout() {
        let dir = tempdir().unwrap();
        let tree = CategoryTree::from_names(["report.docx", "photo.heic", "notes.txt"]);
        let summary = tree.summary();
        let plan = plan_files_archive(&tree, &summary, ArchiveContents::Placeholder);

        let dest = dir.path().join("out").join(FILES_ARCHIVE_NAME);
        assert_eq!(write_archive(&plan, &dest).unwrap(), 4);
        assert!(!dest.with_extension("zip.tmp").exists());

        let mut archive = read_archive(&dest);
        let all = names(&archive);
        for expected in [
            "documents/",
            "documents/word/",
            "documents/text/",
            "images/",
            "images/heic/",
            "documents/word/report.docx",
            "images/heic/photo.heic",
            "documents/text/notes.txt",
            "summary.txt",
        ] {
            assert!(all.iter().any(|n| n == expected), "missing {}", expected);
        }

        assert_eq!(
            read_entry(&mut archive, "documents/word/report.docx"),
            "Sample content for report.docx"
        );
        assert_eq!(read_entry(&mut archive, SUMMARY_FILE), summary);
    }

    #[test]
    fn test_files_archive_original_contents() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("notes.txt");
        fs::write(&source, "real notes").unwrap();

        let mut tree = CategoryTree::default();
        tree.insert_path(&source);
        let plan = plan_files_archive(&tree, &tree.summary(), ArchiveContents::Original);

        let dest = dir.path().join(FILES_ARCHIVE_NAME);
        write_archive(&plan, &dest).unwrap();
        let mut archive = read_archive(&dest);
        assert_eq!(read_entry(&mut archive, "documents/text/notes.txt"), "real notes");
    }

    #[test]
    fn test_videos_archive_layout() {
        let dir = tempdir().unwrap();
        let when = NaiveDateTime::parse_from_str("2024-06-01 10:00", "%Y-%m-%d %H:%M").unwrap();
        let clip = dir.path().join("clip.mp4");
        let extra = dir.path().join("extra.mov");
        fs::write(&clip, b"clip-bytes").unwrap();
        fs::write(&extra, b"extra-bytes").unwrap();

        let mut ceremony = Bucket::named("First Dance");
        ceremony.members.push(VideoRecord::new(&clip, when));
        let empty = Bucket::named("Empty");

        let plan = plan_videos_archive(&[ceremony, empty], &[VideoRecord::new(&extra, when)]);
        let dest = dir.path().join(VIDEOS_ARCHIVE_NAME);
        write_archive(&plan, &dest).unwrap();

        let mut archive = read_archive(&dest);
        let all = names(&archive);
        assert!(all.iter().any(|n| n == "organized_videos/empty/"));
        assert_eq!(
            read_entry(&mut archive, "organized_videos/first_dance/clip.mp4"),
            "clip-bytes"
        );
        assert_eq!(
            read_entry(&mut archive, "organized_videos/remaining_videos/extra.mov"),
            "extra-bytes"
        );
    }

    #[test]
    fn test_unnamed_bucket_gets_numbered_folder() {
        let mut unnamed = Bucket::named("");
        let when = NaiveDateTime::parse_from_str("2024-06-01 10:00", "%Y-%m-%d %H:%M").unwrap();
        unnamed.members.push(VideoRecord::new("/videos/clip.mp4", when));
        let plan = plan_videos_archive(&[Bucket::named("Intro"), unnamed], &[]);

        assert!(plan.entry("organized_videos/folder_2/clip.mp4").is_some());
        assert!(plan.entries().iter().all(|e| !e.path.contains("//")));
        assert!(plan.directories().iter().all(|d| !d.ends_with('/')));
    }

    #[test]
    fn test_videos_archive_without_remainder() {
        let plan = plan_videos_archive(&[Bucket::named("A")], &[]);
        assert!(!plan.directories().iter().any(|d| d.ends_with(REMAINING_FOLDER)));
        assert!(plan.entries().is_empty());
    }

    #[test]
    fn test_failed_write_leaves_nothing() {
        let dir = tempdir().unwrap();
        let mut plan = ArchivePlan::new();
        plan.add_file("gone.mp4", EntrySource::File(dir.path().join("gone.mp4")));

        let dest = dir.path().join(VIDEOS_ARCHIVE_NAME);
        assert!(write_archive(&plan, &dest).is_err());
        assert!(!dest.exists());
        assert!(!dest.with_extension("zip.tmp").exists());
    }
}
