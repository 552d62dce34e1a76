pub mod discovery;
pub mod metadata;
pub mod thumbnails;

#[cfg(test)]
pub(crate) mod fixtures;

use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::clustering::{self, ClusterReport};
use crate::config::Config;
use crate::db::{Database, NewPhoto};
use crate::error::{IndexError, IndexResult, ThumbnailError};

pub use discovery::{list_images, walk_directories};
pub use metadata::{extract_metadata, GpsCoordinates, ImageMetadata};
pub use thumbnails::ThumbnailGenerator;

/// Outcome of one indexing run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub root: PathBuf,
    pub directories_scanned: usize,
    pub unreadable_directories: usize,
    /// Files with a supported extension
    pub files_seen: usize,
    pub already_indexed: usize,
    pub indexed: usize,
    pub failed: usize,
    pub clusters: ClusterReport,
    pub elapsed_ms: u64,
}

/// Walks the photo root and catalogues new files.
///
/// Clones share one in-process run token, and the `scans` table carries a
/// second one for other processes on the same catalogue. While a scan is in
/// flight every other trigger gets [`IndexError::AlreadyRunning`].
#[derive(Debug, Clone)]
pub struct Scanner {
    config: Config,
    running: Arc<AtomicBool>,
}

/// Releases the run token when the scan ends, successful or not
struct RunGuard {
    running: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Scanner {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn begin_run(&self) -> Option<RunGuard> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RunGuard {
                running: Arc::clone(&self.running),
            })
    }

    /// Index the configured photo root.
    pub fn scan(&self, db: &Database) -> IndexResult<ScanReport> {
        self.scan_root(&self.config.photos.root, db)
    }

    /// Index `root`, then rebuild the GPS clusters.
    ///
    /// New photos are committed once per directory. A file that cannot be
    /// thumbnailed is logged and skipped. A store error aborts the run; the
    /// directory being committed is rolled back but earlier directories stay
    /// indexed, so the run can simply be triggered again.
    pub fn scan_root(&self, root: &Path, db: &Database) -> IndexResult<ScanReport> {
        let _guard = self.begin_run().ok_or(IndexError::AlreadyRunning)?;

        let root = std::fs::canonicalize(root).map_err(|source| IndexError::InvalidRoot {
            path: root.to_path_buf(),
            source,
        })?;
        if !root.is_dir() {
            return Err(IndexError::InvalidRoot {
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
                path: root,
            });
        }

        let stale_after = Duration::from_secs(self.config.scanner.stale_run_minutes.saturating_mul(60));
        let scan_id = match db.begin_scan(&root, stale_after)? {
            Some(scan_id) => scan_id,
            None => {
                info!("Another indexing run is in progress on this catalogue");
                return Err(IndexError::AlreadyRunning);
            }
        };
        info!("Indexing photos under {}", root.display());

        match self.run(&root, scan_id, db) {
            Ok(report) => {
                if let Err(e) = db.complete_scan(
                    scan_id,
                    report.indexed,
                    report.failed,
                    report.clusters.clusters_created,
                ) {
                    warn!("Could not record scan {} as completed: {:#}", scan_id, e);
                }
                info!(
                    "Indexing complete: {} new, {} already indexed, {} failed, {} clusters ({} ms)",
                    report.indexed,
                    report.already_indexed,
                    report.failed,
                    report.clusters.clusters_created,
                    report.elapsed_ms
                );
                Ok(report)
            }
            Err(e) => {
                error!("Indexing of {} failed: {}", root.display(), e);
                if let Err(record_err) = db.fail_scan(scan_id, &e.to_string()) {
                    warn!("Could not record scan {} as failed: {:#}", scan_id, record_err);
                }
                Err(e)
            }
        }
    }

    fn run(&self, root: &Path, scan_id: i64, db: &Database) -> IndexResult<ScanReport> {
        let started = Instant::now();
        let mut report = ScanReport {
            root: root.to_path_buf(),
            ..Default::default()
        };

        let thumb_dir = self.config.photos.thumbnail_dir_for(root);
        let generator = ThumbnailGenerator::new(thumb_dir.clone(), &self.config.thumbnails);
        generator
            .ensure_dir()
            .map_err(|source| IndexError::ThumbnailStore {
                path: thumb_dir.clone(),
                source,
            })?;
        let thumb_dir = std::fs::canonicalize(&thumb_dir).unwrap_or(thumb_dir);

        let walk = walk_directories(root, &thumb_dir);
        report.unreadable_directories = walk.unreadable;

        for directory in &walk.directories {
            self.index_directory(directory, root, db, &generator, &mut report)?;
            if let Err(e) = db.touch_scan(scan_id) {
                warn!("Could not refresh heartbeat of scan {}: {:#}", scan_id, e);
            }
        }

        report.clusters = clustering::rebuild_clusters(db)?;
        report.elapsed_ms = started.elapsed().as_millis() as u64;

        Ok(report)
    }

    fn index_directory(
        &self,
        directory: &Path,
        root: &Path,
        db: &Database,
        generator: &ThumbnailGenerator,
        report: &mut ScanReport,
    ) -> IndexResult<()> {
        let images = match list_images(directory, &self.config.scanner.image_extensions) {
            Ok(images) => images,
            Err(e) => {
                warn!("Skipping unreadable directory {}: {:#}", directory.display(), e);
                report.unreadable_directories += 1;
                return Ok(());
            }
        };
        report.directories_scanned += 1;
        report.files_seen += images.len();

        let mut pending = Vec::with_capacity(images.len());
        for path in images {
            // Stored paths are text; distinct raw names could collide
            if path.to_str().is_none() {
                warn!("Skipping {}: path is not valid UTF-8", path.display());
                report.failed += 1;
                continue;
            }
            if db.photo_exists(&path)? {
                report.already_indexed += 1;
            } else {
                pending.push(path);
            }
        }

        if pending.is_empty() {
            return Ok(());
        }

        let results: Vec<(PathBuf, Result<NewPhoto, ThumbnailError>)> = if self.config.scanner.parallel {
            pending
                .into_par_iter()
                .map(|path| {
                    let result = process_file(&path, root, generator);
                    (path, result)
                })
                .collect()
        } else {
            pending
                .into_iter()
                .map(|path| {
                    let result = process_file(&path, root, generator);
                    (path, result)
                })
                .collect()
        };

        let mut batch = Vec::with_capacity(results.len());
        for (path, result) in results {
            match result {
                Ok(photo) => batch.push(photo),
                Err(e) => {
                    warn!("Failed to generate thumbnail for {}: {}", path.display(), e);
                    report.failed += 1;
                }
            }
        }

        db.insert_photos(&batch)?;
        report.indexed += batch.len();
        debug!("Committed {} new photos from {}", batch.len(), directory.display());

        Ok(())
    }
}

/// Thumbnail first: a file that cannot be thumbnailed gets no record at all.
fn process_file(
    path: &Path,
    root: &Path,
    generator: &ThumbnailGenerator,
) -> Result<NewPhoto, ThumbnailError> {
    let thumbnail_path = generator.generate(path)?;
    let metadata = extract_metadata(path);

    debug!("Processed {}", path.display());

    Ok(NewPhoto {
        filename: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        filepath: path.to_string_lossy().into_owned(),
        folder_path: folder_path(path, root),
        thumbnail_path: thumbnail_path.to_string_lossy().to_string(),
        creation_date: metadata.taken_at,
        gps_latitude: metadata.gps.map(|g| g.latitude),
        gps_longitude: metadata.gps.map(|g| g.longitude),
        camera_model: metadata.camera_model,
        focal_length: metadata.focal_length,
        lens_model: metadata.lens_model,
    })
}

/// Containing folder relative to the photo root; empty for the root itself.
pub fn folder_path(path: &Path, root: &Path) -> String {
    path.parent()
        .and_then(|parent| parent.strip_prefix(root).ok())
        .map(|relative| relative.to_string_lossy().to_string())
        .unwrap_or_default()
}
