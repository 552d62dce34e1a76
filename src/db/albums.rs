//! Albums are managed by the web layer; the indexer only owns the schema
//! and never touches `photos.album_id` when re-scanning.

use anyhow::Result;
use chrono::NaiveDateTime;
use serde::Serialize;

use super::Database;

/// An album (named collection of photos)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Album {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub creation_date: NaiveDateTime,
    pub photo_count: i64,
}

impl Database {
    pub fn create_album(&self, name: &str, description: Option<&str>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO albums (name, description) VALUES (?, ?)",
            rusqlite::params![name, description],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_all_albums(&self) -> Result<Vec<Album>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT a.id, a.name, a.description, a.creation_date,
                   (SELECT COUNT(*) FROM photos WHERE album_id = a.id) as photo_count
            FROM albums a
            ORDER BY a.name
            "#,
        )?;
        let albums = stmt
            .query_map([], |row| {
                Ok(Album {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    creation_date: row.get(3)?,
                    photo_count: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(albums)
    }

    /// Move a photo into an album, or out of any album with `None`.
    pub fn set_photo_album(&self, photo_id: i64, album_id: Option<i64>) -> Result<()> {
        self.conn.execute(
            "UPDATE photos SET album_id = ? WHERE id = ?",
            rusqlite::params![album_id, photo_id],
        )?;
        Ok(())
    }

    /// Photos of a deleted album fall back to no album.
    pub fn delete_album(&self, album_id: i64) -> Result<()> {
        self.conn.execute("DELETE FROM albums WHERE id = ?", [album_id])?;
        Ok(())
    }
}
