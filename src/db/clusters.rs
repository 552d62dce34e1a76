use anyhow::{Context, Result};
use rusqlite::OptionalExtension;
use serde::Serialize;

use super::{photo_from_row, Database, Photo, PHOTO_COLUMNS};

/// A stored GPS cluster cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpsCluster {
    pub id: i64,
    pub cluster_latitude: f64,
    pub cluster_longitude: f64,
    pub photo_count: i64,
}

/// Coordinates of a photo that carries GPS data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeotaggedPhoto {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
}

/// A cluster to be written: rounded cell coordinates and its members
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterCell {
    pub latitude: f64,
    pub longitude: f64,
    pub photo_ids: Vec<i64>,
}

impl Database {
    pub fn get_geotagged_photos(&self) -> Result<Vec<GeotaggedPhoto>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, gps_latitude, gps_longitude
            FROM photos
            WHERE gps_latitude IS NOT NULL AND gps_longitude IS NOT NULL
            ORDER BY id
            "#,
        )?;
        let photos = stmt
            .query_map([], |row| {
                Ok(GeotaggedPhoto {
                    id: row.get(0)?,
                    latitude: row.get(1)?,
                    longitude: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(photos)
    }

    /// Replace every cluster with `cells` in one transaction.
    ///
    /// All photo back-links are cleared first, so photos outside `cells`
    /// end up without a cluster. On any error the transaction is rolled
    /// back and the previous clusters stay in place. Returns the number of
    /// photos linked.
    pub fn replace_clusters(&self, cells: &[ClusterCell]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute("UPDATE photos SET gps_cluster_id = NULL WHERE gps_cluster_id IS NOT NULL", [])?;
        tx.execute("DELETE FROM gps_clusters", [])?;

        let mut linked = 0;
        {
            let mut insert = tx.prepare(
                "INSERT INTO gps_clusters (cluster_latitude, cluster_longitude, photo_count) VALUES (?, ?, ?)",
            )?;
            let mut link = tx.prepare("UPDATE photos SET gps_cluster_id = ? WHERE id = ?")?;

            for cell in cells {
                insert
                    .execute(rusqlite::params![
                        cell.latitude,
                        cell.longitude,
                        cell.photo_ids.len() as i64,
                    ])
                    .with_context(|| {
                        format!("Failed to create cluster ({}, {})", cell.latitude, cell.longitude)
                    })?;
                let cluster_id = tx.last_insert_rowid();

                for photo_id in &cell.photo_ids {
                    linked += link.execute(rusqlite::params![cluster_id, photo_id])?;
                }
            }
        }

        tx.commit()?;
        Ok(linked)
    }

    pub fn get_all_clusters(&self) -> Result<Vec<GpsCluster>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, cluster_latitude, cluster_longitude, photo_count
            FROM gps_clusters
            ORDER BY photo_count DESC, id
            "#,
        )?;
        let clusters = stmt
            .query_map([], |row| {
                Ok(GpsCluster {
                    id: row.get(0)?,
                    cluster_latitude: row.get(1)?,
                    cluster_longitude: row.get(2)?,
                    photo_count: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(clusters)
    }

    pub fn get_cluster(&self, cluster_id: i64) -> Result<Option<GpsCluster>> {
        let cluster = self
            .conn
            .query_row(
                "SELECT id, cluster_latitude, cluster_longitude, photo_count FROM gps_clusters WHERE id = ?",
                [cluster_id],
                |row| {
                    Ok(GpsCluster {
                        id: row.get(0)?,
                        cluster_latitude: row.get(1)?,
                        cluster_longitude: row.get(2)?,
                        photo_count: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(cluster)
    }

    pub fn get_photos_in_cluster(&self, cluster_id: i64) -> Result<Vec<Photo>> {
        let sql = format!(
            "SELECT {} FROM photos WHERE gps_cluster_id = ? ORDER BY creation_date, id",
            PHOTO_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let photos = stmt
            .query_map([cluster_id], photo_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(photos)
    }
}
