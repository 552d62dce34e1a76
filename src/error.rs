use std::path::PathBuf;
use thiserror::Error;

/// Failure to produce a thumbnail for one file. The scanner skips the file.
#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("Failed to encode thumbnail: {0}")]
    Encode(#[source] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a whole indexing run, reported to whoever triggered it.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("An indexing run is already in progress")]
    AlreadyRunning,
    #[error("Photo root {} is not usable: {source}", .path.display())]
    InvalidRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Thumbnail directory {} is not usable: {source}", .path.display())]
    ThumbnailStore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Store or transaction failure; the current directory was rolled back.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type IndexResult<T> = Result<T, IndexError>;
