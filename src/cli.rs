//! CLI argument parsing with clap

use crate::config::{ArchiveContents, BucketConfig, Config, MoveConfig, TimeSource};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// File Organizer - sort files by type and videos by time window
///
/// Classifies the files of a folder into category/subcategory folders and
/// buckets videos into named date and time windows, writing the result as a
/// zip archive.
#[derive(Parser, Debug)]
#[command(name = "file-organizer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for history and session files
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long, global = true)]
    pub json_log: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify a folder's files and write organized-files.zip
    Organize(OrganizeArgs),

    /// Bucket videos by time window and write organized_videos.zip
    Videos(VideosArgs),

    /// Print the category of each file name
    Classify {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// List, delete or re-download past organizations
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Manage the local account and session
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Write a commented sample configuration file
    InitConfig {
        /// Destination (defaults to Config/organizer.toml beside the executable)
        path: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct OrganizeArgs {
    /// Folder to organize
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output directory for the archive
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Include files in subfolders
    #[arg(short, long)]
    pub recursive: bool,

    /// Contents of archive entries
    #[arg(long, value_enum)]
    pub contents: Option<ArchiveContents>,

    /// Dry run mode - classify and summarize without recording or writing
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct VideosArgs {
    /// Video files or folders containing videos
    #[arg(short, long, num_args = 1.., required = true)]
    pub input: Vec<PathBuf>,

    /// Output directory for the archive
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Include videos in subfolders of input folders
    #[arg(short, long)]
    pub recursive: bool,

    /// Bucket as "name|YYYY-MM-DD|H:MM AM|H:MM PM" (repeatable, evaluated in order)
    #[arg(short, long = "bucket")]
    pub buckets: Vec<BucketConfig>,

    /// Manual assignment as "file=bucket" (repeatable)
    #[arg(short, long = "move")]
    pub moves: Vec<MoveConfig>,

    /// Where video timestamps come from
    #[arg(long, value_enum)]
    pub time_source: Option<TimeSource>,

    /// Write a JPEG thumbnail per video into this directory
    #[arg(long)]
    pub thumbnails: Option<PathBuf>,

    /// Fail on buckets whose date or time cannot be read
    #[arg(long)]
    pub strict: bool,

    /// Number of threads for thumbnail generation (0 = auto)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Dry run mode - bucket videos without writing the archive
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug)]
pub enum HistoryAction {
    /// List your organizations, newest first
    List,
    /// Delete one organization
    Delete { id: String },
    /// Rebuild the archive of one organization
    Download {
        id: String,
        /// Output directory for the archive
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct Credentials {
    #[arg(long)]
    pub email: String,

    #[arg(long, env = "FILE_ORGANIZER_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Subcommand, Debug)]
pub enum AuthAction {
    /// Create an account and sign in
    SignUp(Credentials),
    /// Sign in to an existing account
    SignIn(Credentials),
    /// End the current session
    SignOut,
    /// Show who is signed in
    Status,
}

impl Cli {
    /// Get config file name (without extension) for log naming
    pub fn config_name(&self) -> Option<String> {
        self.config.as_ref().and_then(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        })
    }

    /// Name of the subcommand, used for log file names
    pub fn command_name(&self) -> &'static str {
        match self.command {
            Command::Organize(_) => "Organize",
            Command::Videos(_) => "Videos",
            Command::Classify { .. } => "Classify",
            Command::History { .. } => "History",
            Command::Auth { .. } => "Auth",
            Command::InitConfig { .. } => "InitConfig",
        }
    }

    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if let Some(ref data_dir) = self.data_dir {
            config.data_dir = Some(data_dir.clone());
        }
        if self.verbose {
            config.verbose = true;
        }

        match &self.command {
            Command::Organize(args) => {
                if let Some(ref output) = args.output {
                    config.output_dir = output.clone();
                }
                if args.recursive {
                    config.recursive = true;
                }
                if let Some(contents) = args.contents {
                    config.archive_contents = contents;
                }
                if args.dry_run {
                    config.dry_run = true;
                }
            }
            Command::Videos(args) => {
                if let Some(ref output) = args.output {
                    config.output_dir = output.clone();
                }
                if args.recursive {
                    config.recursive = true;
                }
                if !args.buckets.is_empty() {
                    config.buckets = args.buckets.clone();
                }
                if !args.moves.is_empty() {
                    config.moves = args.moves.clone();
                }
                if let Some(time_source) = args.time_source {
                    config.time_source = time_source;
                }
                if let Some(ref thumbnails) = args.thumbnails {
                    config.thumbnails_dir = Some(thumbnails.clone());
                }
                if args.strict {
                    config.strict_windows = true;
                }
                if let Some(threads) = args.threads {
                    config.threads = threads;
                }
                if args.dry_run {
                    config.dry_run = true;
                }
            }
            Command::History {
                action: HistoryAction::Download {
                    output: Some(output),
                    ..
                },
            } => {
                config.output_dir = output.clone();
            }
            _ => {}
        }

        config
    }

    /// Convert CLI arguments to Config (when no config file is used)
    pub fn to_config(&self) -> Config {
        self.merge_with_config(Config::default())
    }
}
