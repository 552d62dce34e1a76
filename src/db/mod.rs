mod schema;
pub mod albums;
pub mod clusters;
pub mod scans;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

pub use schema::SCHEMA;
pub use albums::Album;
pub use clusters::{ClusterCell, GeotaggedPhoto, GpsCluster};
pub use scans::{ScanRun, ScanStatus};

/// A catalogued photo as stored in the database
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Photo {
    pub id: i64,
    pub filename: String,
    pub filepath: String,
    pub folder_path: Option<String>,
    pub thumbnail_path: Option<String>,
    pub creation_date: NaiveDateTime,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub camera_model: Option<String>,
    pub focal_length: Option<f64>,
    pub lens_model: Option<String>,
    pub album_id: Option<i64>,
    pub gps_cluster_id: Option<i64>,
}

/// A photo the scanner is about to insert. Album and cluster links are
/// always empty on creation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPhoto {
    pub filename: String,
    pub filepath: String,
    pub folder_path: String,
    pub thumbnail_path: String,
    pub creation_date: NaiveDateTime,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub camera_model: Option<String>,
    pub focal_length: Option<f64>,
    pub lens_model: Option<String>,
}

pub(crate) const PHOTO_COLUMNS: &str = "id, filename, filepath, folder_path, thumbnail_path, creation_date, \
     gps_latitude, gps_longitude, camera_model, focal_length, lens_model, album_id, gps_cluster_id";

pub(crate) fn photo_from_row(row: &Row<'_>) -> rusqlite::Result<Photo> {
    Ok(Photo {
        id: row.get(0)?,
        filename: row.get(1)?,
        filepath: row.get(2)?,
        folder_path: row.get(3)?,
        thumbnail_path: row.get(4)?,
        creation_date: row.get(5)?,
        gps_latitude: row.get(6)?,
        gps_longitude: row.get(7)?,
        camera_model: row.get(8)?,
        focal_length: row.get(9)?,
        lens_model: row.get(10)?,
        album_id: row.get(11)?,
        gps_cluster_id: row.get(12)?,
    })
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the catalog at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        // Another process may be committing a directory batch
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self { conn })
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ========================================================================
    // Photo operations
    // ========================================================================

    pub fn photo_exists(&self, path: &Path) -> Result<bool> {
        let path_str = path.to_string_lossy();
        let exists = self
            .conn
            .query_row(
                "SELECT 1 FROM photos WHERE filepath = ?",
                [path_str.as_ref()],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(exists)
    }

    /// Insert a batch of photos in a single transaction.
    /// Either every row is written or none is.
    pub fn insert_photos(&self, photos: &[NewPhoto]) -> Result<()> {
        if photos.is_empty() {
            return Ok(());
        }

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO photos (
                    filename, filepath, folder_path, thumbnail_path, creation_date,
                    gps_latitude, gps_longitude, camera_model, focal_length, lens_model
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )?;

            for photo in photos {
                stmt.execute(rusqlite::params![
                    photo.filename,
                    photo.filepath,
                    photo.folder_path,
                    photo.thumbnail_path,
                    photo.creation_date,
                    photo.gps_latitude,
                    photo.gps_longitude,
                    photo.camera_model,
                    photo.focal_length,
                    photo.lens_model,
                ])
                .with_context(|| format!("Failed to insert {}", photo.filepath))?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    pub fn get_photo_by_path(&self, path: &Path) -> Result<Option<Photo>> {
        let path_str = path.to_string_lossy();
        let sql = format!("SELECT {} FROM photos WHERE filepath = ?", PHOTO_COLUMNS);
        let photo = self
            .conn
            .query_row(&sql, [path_str.as_ref()], photo_from_row)
            .optional()?;
        Ok(photo)
    }

    pub fn get_photo(&self, photo_id: i64) -> Result<Option<Photo>> {
        let sql = format!("SELECT {} FROM photos WHERE id = ?", PHOTO_COLUMNS);
        let photo = self
            .conn
            .query_row(&sql, [photo_id], photo_from_row)
            .optional()?;
        Ok(photo)
    }

    pub fn get_all_photos(&self) -> Result<Vec<Photo>> {
        let sql = format!("SELECT {} FROM photos ORDER BY id", PHOTO_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let photos = stmt
            .query_map([], photo_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(photos)
    }

    pub fn count_photos(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;

    pub(crate) fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    pub(crate) fn new_photo(path: &str, gps: Option<(f64, f64)>) -> NewPhoto {
        let filename = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        NewPhoto {
            thumbnail_path: format!("/Photos/thumbnail/thumb_{}", filename),
            filename,
            filepath: path.to_string(),
            folder_path: String::new(),
            creation_date: NaiveDate::from_ymd_opt(2023, 7, 14)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            gps_latitude: gps.map(|g| g.0),
            gps_longitude: gps.map(|g| g.1),
            camera_model: Some("Canon EOS R6".to_string()),
            focal_length: Some(35.0),
            lens_model: None,
        }
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let db = test_db();
        db.initialize().unwrap();
        assert_eq!(db.count_photos().unwrap(), 0);
    }

    #[test]
    fn test_insert_and_read_back() {
        let db = test_db();
        let photo = new_photo("/Photos/2023/beach.jpg", Some((40.4461, -79.9822)));
        db.insert_photos(&[photo.clone()]).unwrap();

        assert!(db.photo_exists(Path::new("/Photos/2023/beach.jpg")).unwrap());
        assert!(!db.photo_exists(Path::new("/Photos/2023/other.jpg")).unwrap());

        let stored = db
            .get_photo_by_path(Path::new("/Photos/2023/beach.jpg"))
            .unwrap()
            .unwrap();
        assert_eq!(stored.filename, "beach.jpg");
        assert_eq!(stored.creation_date, photo.creation_date);
        assert_eq!(stored.gps_latitude, Some(40.4461));
        assert_eq!(stored.camera_model.as_deref(), Some("Canon EOS R6"));
        assert_eq!(stored.album_id, None);
        assert_eq!(stored.gps_cluster_id, None);
        assert_eq!(db.get_photo(stored.id).unwrap(), Some(stored));
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let db = test_db();
        db.insert_photos(&[new_photo("/Photos/a.jpg", None)]).unwrap();

        // Second row collides with the unique filepath
        let batch = vec![
            new_photo("/Photos/b.jpg", None),
            new_photo("/Photos/a.jpg", None),
        ];
        assert!(db.insert_photos(&batch).is_err());

        assert_eq!(db.count_photos().unwrap(), 1);
        assert!(!db.photo_exists(Path::new("/Photos/b.jpg")).unwrap());
    }
}
