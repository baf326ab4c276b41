//! File Organizer - sort folders by file type and videos by time window
//!
//! This library provides:
//! - Extension-based classification into category/subcategory pairs
//! - Time-window bucketing of videos on a 12-hour clock
//! - FFprobe-based video timestamps and FFmpeg thumbnails
//! - Zip archive output of the organized folder structure
//! - Organization history and local accounts

pub mod archive;
pub mod auth;
pub mod bucket;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod hash;
pub mod history;
pub mod i18n;
pub mod intake;
pub mod process;
pub mod session;
pub mod thumbnail;
pub mod time;

pub use bucket::{Bucket, Period, VideoRecord, bucket_videos, convert_to_24_hour, move_video_to_folder};
pub use catalog::{Category, ClassifiedFile, EXTENSION_TABLE, classify};
pub use cli::Cli;
pub use config::{ArchiveContents, BucketConfig, Config, ConfigError, MoveConfig, TimeSource};
pub use error::{Error, Result};
pub use i18n::init_locale;
pub use process::{CategoryTree, Processor};
pub use session::VideoSession;
