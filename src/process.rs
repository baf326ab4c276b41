//! Folder organizing pipeline
//!
//! Handles the core logic of:
//! - Scanning the input folder
//! - Classifying each file by extension
//! - Grouping files into a category tree and summarizing it
//! - Recording the organization in history
//! - Writing `organized-files.zip`

use crate::archive::{FILES_ARCHIVE_NAME, plan_files_archive, write_archive};
use crate::auth::SessionService;
use crate::catalog::{Category, classify};
use crate::config::{ArchiveContents, Config};
use crate::error::{Error, Result};
use crate::history::{FileEntry, HistoryStore, NewRecord, OrganizationRecord};
use crate::intake::scan_folder;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{Level, debug, info, span, warn};

/// A file placed in the category tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeFile {
    pub name: String,
    /// On-disk location, when the file is available
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubcategoryGroup {
    pub name: &'static str,
    pub files: Vec<TreeFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup {
    pub name: &'static str,
    pub subcategories: Vec<SubcategoryGroup>,
}

/// Files grouped by main category then subcategory, in first-appearance order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTree {
    pub categories: Vec<CategoryGroup>,
}

impl CategoryTree {
    /// Group file names that are not backed by files on disk
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Self::default();
        for name in names {
            let name = name.as_ref();
            tree.insert(
                classify(name),
                TreeFile {
                    name: name.to_string(),
                    source: None,
                },
            );
        }
        tree
    }

    /// Classify and add a file on disk
    pub fn insert_path(&mut self, path: &Path) -> Category {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let category = classify(&name);
        self.insert(
            category,
            TreeFile {
                name,
                source: Some(path.to_path_buf()),
            },
        );
        category
    }

    /// Add a file under an already computed category
    pub fn insert(&mut self, category: Category, file: TreeFile) {
        let main = match self.categories.iter().position(|c| c.name == category.main) {
            Some(i) => &mut self.categories[i],
            None => {
                self.categories.push(CategoryGroup {
                    name: category.main,
                    subcategories: Vec::new(),
                });
                let last = self.categories.len() - 1;
                &mut self.categories[last]
            }
        };

        match main.subcategories.iter_mut().find(|s| s.name == category.sub) {
            Some(sub) => sub.files.push(file),
            None => main.subcategories.push(SubcategoryGroup {
                name: category.sub,
                files: vec![file],
            }),
        }
    }

    pub fn file_count(&self) -> usize {
        self.categories
            .iter()
            .flat_map(|c| &c.subcategories)
            .map(|s| s.files.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// `main (sub: n files, sub: n files); main (...)`
    pub fn summary(&self) -> String {
        self.categories
            .iter()
            .map(|category| {
                let counts = category
                    .subcategories
                    .iter()
                    .map(|sub| format!("{}: {} files", sub.name, sub.files.len()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{} ({})", category.name, counts)
            })
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// History entries: each file with its main category
    pub fn file_entries(&self) -> Vec<FileEntry> {
        self.categories
            .iter()
            .flat_map(|c| {
                c.subcategories.iter().flat_map(move |s| {
                    s.files.iter().map(move |f| FileEntry {
                        name: f.name.clone(),
                        file_type: c.name.to_string(),
                    })
                })
            })
            .collect()
    }
}

/// Processing statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub total_files: AtomicUsize,
    pub classified: AtomicUsize,
    pub unknown: AtomicUsize,
    pub archived: AtomicUsize,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> String {
        format!(
            "Total: {}, Classified: {}, Unknown: {}, Archived: {}",
            self.total_files.load(Ordering::Relaxed),
            self.classified.load(Ordering::Relaxed),
            self.unknown.load(Ordering::Relaxed),
            self.archived.load(Ordering::Relaxed)
        )
    }
}

/// What one folder run produced
#[derive(Debug)]
pub struct OrganizeOutcome {
    pub tree: CategoryTree,
    pub summary: String,
    /// Stored history entry, absent for empty folders and dry runs
    pub record: Option<OrganizationRecord>,
    /// Written archive, absent for empty folders and dry runs
    pub archive: Option<PathBuf>,
}

/// Organizes one folder on behalf of the signed-in user
pub struct Processor<'a> {
    config: Config,
    sessions: &'a dyn SessionService,
    history: &'a mut dyn HistoryStore,
    stats: ProcessingStats,
}

impl<'a> Processor<'a> {
    pub fn new(
        config: Config,
        sessions: &'a dyn SessionService,
        history: &'a mut dyn HistoryStore,
    ) -> Self {
        Self {
            config,
            sessions,
            history,
            stats: ProcessingStats::new(),
        }
    }

    pub fn stats(&self) -> &ProcessingStats {
        &self.stats
    }

    /// Run the folder pipeline
    pub fn run(&mut self, input: &Path) -> Result<OrganizeOutcome> {
        let _span = span!(Level::INFO, "processor_run", ?input).entered();

        let user = self.sessions.current_user().ok_or(Error::NotSignedIn)?;

        info!("Scanning input folder...");
        let files = scan_folder(input, self.config.recursive)?;
        self.stats.total_files.store(files.len(), Ordering::Relaxed);

        let mut tree = CategoryTree::default();
        for file in &files {
            let category = tree.insert_path(&file.path);
            debug!(file = %file.name, %category, "Classified file");
            if category.is_unknown() {
                self.stats.unknown.fetch_add(1, Ordering::Relaxed);
            } else {
                self.stats.classified.fetch_add(1, Ordering::Relaxed);
            }
        }

        let summary = tree.summary();
        if tree.is_empty() {
            info!("No files to organize");
            return Ok(OrganizeOutcome {
                tree,
                summary,
                record: None,
                archive: None,
            });
        }

        info!(categories = tree.categories.len(), %summary, "Organized files");

        if self.config.dry_run {
            info!("Dry run, nothing recorded or written");
            info!("{}", self.stats.summary());
            return Ok(OrganizeOutcome {
                tree,
                summary,
                record: None,
                archive: None,
            });
        }

        let record = self.history.insert(NewRecord {
            user_id: user.id.clone(),
            files: tree.file_entries(),
            summary: summary.clone(),
        })?;

        let plan = plan_files_archive(&tree, &summary, self.config.archive_contents);
        let dest = self.config.output_dir.join(FILES_ARCHIVE_NAME);
        if let Err(e) = write_archive(&plan, &dest) {
            if let Err(cleanup) = self.history.delete(&user.id, &record.id) {
                warn!(id = %record.id, error = %cleanup, "Failed to remove history record of unwritten archive");
            }
            return Err(e);
        }
        self.stats.archived.store(tree.file_count(), Ordering::Relaxed);

        info!("{}", self.stats.summary());
        Ok(OrganizeOutcome {
            tree,
            summary,
            record: Some(record),
            archive: Some(dest),
        })
    }
}

/// Rebuild the archive of a stored organization with placeholder contents
pub fn download_record(
    sessions: &dyn SessionService,
    history: &dyn HistoryStore,
    id: &str,
    output_dir: &Path,
) -> Result<PathBuf> {
    let user = sessions.current_user().ok_or(Error::NotSignedIn)?;
    let record = history.get(&user.id, id)?;

    let tree = CategoryTree::from_names(record.files.iter().map(|f| f.name.as_str()));
    let plan = plan_files_archive(&tree, &tree.summary(), ArchiveContents::Placeholder);
    let dest = output_dir.join(FILES_ARCHIVE_NAME);
    write_archive(&plan, &dest)?;

    info!(%id, path = ?dest, "Rebuilt archive from history");
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::LocalSessionService;
    use crate::history::JsonHistoryStore;
    use std::fs::{self, File};
    use std::io::Read;
    use tempfile::{TempDir, tempdir};
    use zip::ZipArchive;

    fn fixture(names: &[&str]) -> TempDir {
        let dir = tempdir().unwrap();
        for name in names {
            fs::write(dir.path().join(name), format!("bytes of {}", name)).unwrap();
        }
        dir
    }

    fn signed_in(data: &Path) -> LocalSessionService {
        let mut sessions = LocalSessionService::in_dir(data).unwrap();
        sessions.sign_up("a@example.com", "hunter22").unwrap();
        sessions
    }

    #[test]
    fn test_processing_stats() {
        let stats = ProcessingStats::new();
        stats.total_files.store(5, Ordering::Relaxed);
        stats.classified.fetch_add(4, Ordering::Relaxed);
        stats.unknown.fetch_add(1, Ordering::Relaxed);

        let summary = stats.summary();
        assert!(summary.contains("Total: 5"));
        assert!(summary.contains("Classified: 4"));
        assert!(summary.contains("Unknown: 1"));
    }

    #[test]
    fn test_summary_first_appearance_order() {
        let tree = CategoryTree::from_names([
            "report.docx",
            "photo.heic",
            "movie.mkv",
            "notes.txt",
            "unknown.xyz",
            "memo.doc",
        ]);
        assert_eq!(
            tree.summary(),
            "documents (word: 2 files, text: 1 files); images (heic: 1 files); \
             videos (mkv: 1 files); others (other: 1 files)"
        );
        assert_eq!(tree.file_count(), 6);
    }

    #[test]
    fn test_file_entries_use_main_category() {
        let tree = CategoryTree::from_names(["a.png", "b.rs"]);
        let entries = tree.file_entries();
        assert_eq!(entries[0].file_type, "images");
        assert_eq!(entries[1].file_type, "code");
    }

    #[test]
    fn test_empty_tree_summary() {
        assert_eq!(CategoryTree::default().summary(), "");
    }

    #[test]
    fn test_requires_sign_in() {
        let input = fixture(&["a.txt"]);
        let data = tempdir().unwrap();
        let sessions = LocalSessionService::in_dir(data.path()).unwrap();
        let mut history = JsonHistoryStore::in_dir(data.path()).unwrap();

        let mut processor = Processor::new(Config::default(), &sessions, &mut history);
        let err = processor.run(input.path()).unwrap_err();
        assert_eq!(err.to_string(), "Please sign in to organize files");
    }

    #[test]
    fn test_run_records_and_archives() {
        let input = fixture(&["report.docx", "photo.heic", "unknown.xyz"]);
        let data = tempdir().unwrap();
        let out = tempdir().unwrap();
        let sessions = signed_in(data.path());
        let mut history = JsonHistoryStore::in_dir(data.path()).unwrap();

        let config = Config {
            output_dir: out.path().to_path_buf(),
            ..Config::default()
        };
        let (outcome, processor_archived) = {
            let mut processor = Processor::new(config, &sessions, &mut history);
            let outcome = processor.run(input.path()).unwrap();
            assert_eq!(processor.stats().unknown.load(Ordering::Relaxed), 1);
            (outcome, processor.stats().archived.load(Ordering::Relaxed))
        };

        let record = outcome.record.unwrap();
        assert_eq!(record.summary, outcome.summary);
        assert_eq!(processor_archived, 3);
        assert_eq!(record.files.len(), 3);

        let user = sessions.current_user().unwrap();
        assert_eq!(history.list(&user.id).unwrap(), vec![record]);

        let archive_path = outcome.archive.unwrap();
        let mut archive = ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
        let mut text = String::new();
        archive
            .by_name("images/heic/photo.heic")
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "Sample content for photo.heic");
    }

    #[test]
    fn test_failed_archive_leaves_no_history() {
        let input = fixture(&["a.txt"]);
        let data = tempdir().unwrap();
        let sessions = signed_in(data.path());
        let mut history = JsonHistoryStore::in_dir(data.path()).unwrap();
        let user = sessions.current_user().unwrap();

        // The output directory cannot be created under a regular file
        let blocker = data.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let config = Config {
            output_dir: blocker.join("out"),
            ..Config::default()
        };

        let result = Processor::new(config, &sessions, &mut history).run(input.path());
        assert!(result.is_err());
        assert!(history.list(&user.id).unwrap().is_empty());
    }

    #[test]
    fn test_dry_run_and_empty_folder() {
        let data = tempdir().unwrap();
        let out = tempdir().unwrap();
        let sessions = signed_in(data.path());
        let mut history = JsonHistoryStore::in_dir(data.path()).unwrap();
        let user = sessions.current_user().unwrap();

        let config = Config {
            output_dir: out.path().to_path_buf(),
            dry_run: true,
            ..Config::default()
        };
        let input = fixture(&["a.txt"]);
        let outcome = Processor::new(config.clone(), &sessions, &mut history)
            .run(input.path())
            .unwrap();
        assert_eq!(outcome.summary, "documents (text: 1 files)");
        assert!(outcome.archive.is_none());

        let empty = fixture(&[]);
        let outcome = Processor::new(Config { dry_run: false, ..config }, &sessions, &mut history)
            .run(empty.path())
            .unwrap();
        assert!(outcome.record.is_none());
        assert!(!out.path().join(FILES_ARCHIVE_NAME).exists());
        assert!(history.list(&user.id).unwrap().is_empty());
    }

    #[test]
    fn test_download_record() {
        let input = fixture(&["notes.txt", "song.mp3"]);
        let data = tempdir().unwrap();
        let out = tempdir().unwrap();
        let sessions = signed_in(data.path());
        let mut history = JsonHistoryStore::in_dir(data.path()).unwrap();

        let config = Config {
            output_dir: out.path().join("first"),
            archive_contents: ArchiveContents::Original,
            ..Config::default()
        };
        let record = Processor::new(config, &sessions, &mut history)
            .run(input.path())
            .unwrap()
            .record
            .unwrap();

        let again = out.path().join("again");
        let path = download_record(&sessions, &history, &record.id, &again).unwrap();
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();

        let mut text = String::new();
        archive
            .by_name("documents/text/notes.txt")
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "Sample content for notes.txt");

        let mut summary = String::new();
        archive
            .by_name("summary.txt")
            .unwrap()
            .read_to_string(&mut summary)
            .unwrap();
        assert_eq!(summary, record.summary);

        assert!(matches!(
            download_record(&sessions, &history, "missing", &again),
            Err(Error::RecordNotFound(_))
        ));
    }
}
