//! GPS clustering of catalogued photos.
//!
//! Photos are bucketed by their coordinates rounded to
//! [`CLUSTER_PRECISION`] decimal places (cells of roughly 1.1 km at the
//! equator). The cluster table is rebuilt from scratch on every pass.

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::db::{ClusterCell, Database, GeotaggedPhoto};

/// Decimal places kept when rounding coordinates into a cell
pub const CLUSTER_PRECISION: i32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClusterReport {
    pub clusters_created: usize,
    pub photos_clustered: usize,
}

/// Integer cell key: each coordinate rounded to [`CLUSTER_PRECISION`]
/// decimals, then scaled by 10^precision.
pub fn cluster_cell(latitude: f64, longitude: f64) -> (i64, i64) {
    let scale = 10f64.powi(CLUSTER_PRECISION);
    (
        (round_coordinate(latitude) * scale).round() as i64,
        (round_coordinate(longitude) * scale).round() as i64,
    )
}

/// Decimal rounding of the exact binary value. Scaling first would pick up
/// the multiplication's own error (1.115 * 100 is 111.50000000000001).
pub fn round_coordinate(value: f64) -> f64 {
    format!("{:.*}", CLUSTER_PRECISION as usize, value)
        .parse()
        .unwrap_or(value)
}

/// Rounded coordinate of a cell key component
pub fn cell_coordinate(key: i64) -> f64 {
    key as f64 / 10f64.powi(CLUSTER_PRECISION)
}

/// Group photos into cells, ordered by cell key; members ordered by id.
pub fn group_into_cells(photos: &[GeotaggedPhoto]) -> Vec<ClusterCell> {
    let mut cells: BTreeMap<(i64, i64), Vec<i64>> = BTreeMap::new();

    for photo in photos {
        if !photo.latitude.is_finite() || !photo.longitude.is_finite() {
            continue;
        }
        cells
            .entry(cluster_cell(photo.latitude, photo.longitude))
            .or_default()
            .push(photo.id);
    }

    cells
        .into_iter()
        .map(|((lat_key, lon_key), mut photo_ids)| {
            photo_ids.sort_unstable();
            ClusterCell {
                latitude: cell_coordinate(lat_key),
                longitude: cell_coordinate(lon_key),
                photo_ids,
            }
        })
        .collect()
}

/// Delete all clusters and rebuild them from the current photos, as one
/// transaction. On error the previous clusters are left untouched.
pub fn rebuild_clusters(db: &Database) -> Result<ClusterReport> {
    let photos = db.get_geotagged_photos()?;
    let cells = group_into_cells(&photos);
    let photos_clustered = db.replace_clusters(&cells)?;

    let report = ClusterReport {
        clusters_created: cells.len(),
        photos_clustered,
    };
    info!(
        "Rebuilt {} GPS clusters covering {} photos",
        report.clusters_created, report.photos_clustered
    );

    Ok(report)
}
