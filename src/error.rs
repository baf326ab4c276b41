//! Error types for the file organizer

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for file organizer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the file organizer
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input path does not exist: {path}")]
    InputNotFound { path: PathBuf },

    #[error("Input path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Failed to create archive {path}: {message}")]
    Archive { path: PathBuf, message: String },

    #[error("Invalid time window for bucket '{bucket}': {message}")]
    InvalidWindow { bucket: String, message: String },

    #[error("No bucket named '{0}'")]
    BucketNotFound(String),

    #[error("Bucket index {index} is out of range ({count} buckets)")]
    BucketIndexOutOfRange { index: usize, count: usize },

    #[error("Video is not waiting in the remainder: {path}")]
    VideoNotInRemainder { path: PathBuf },

    #[error("Failed to extract video metadata from {path}: {message}")]
    VideoMetadata { path: PathBuf, message: String },

    #[error("Failed to generate thumbnail for {path}: {message}")]
    Thumbnail { path: PathBuf, message: String },

    #[error("FFprobe not found. Please install FFmpeg and ensure ffprobe is in PATH")]
    FfprobeNotFound,

    #[error("History store error: {0}")]
    History(String),

    #[error("History record not found: {0}")]
    RecordNotFound(String),

    #[error("{0}")]
    Auth(String),

    #[error("Please sign in to organize files")]
    NotSignedIn,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),
}
