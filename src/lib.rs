//! Photo catalogue indexer.
//!
//! Walks a photo root, writes a thumbnail for every supported image, records
//! capture metadata in SQLite and groups geotagged photos into GPS clusters.

pub mod clustering;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod scanner;

pub use clustering::{rebuild_clusters, ClusterReport};
pub use config::Config;
pub use db::Database;
pub use error::{IndexError, IndexResult, ThumbnailError};
pub use scanner::{ScanReport, Scanner};
