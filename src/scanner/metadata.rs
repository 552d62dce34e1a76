//! Capture metadata extraction from embedded EXIF blocks.
//!
//! Extraction never fails: anything that cannot be read is left empty and
//! the capture date falls back to the file's modification time.

use chrono::{DateTime, Local, NaiveDateTime, Timelike};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, warn};

/// Format of the EXIF `DateTimeOriginal` field
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GpsCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageMetadata {
    /// EXIF original capture date, else the file modification time
    pub taken_at: NaiveDateTime,
    /// Present only when both latitude and longitude could be read
    pub gps: Option<GpsCoordinates>,
    pub camera_model: Option<String>,
    pub focal_length: Option<f64>,
    pub lens_model: Option<String>,
}

pub fn extract_metadata(path: &Path) -> ImageMetadata {
    let exif = match read_exif(path) {
        Ok(exif) => Some(exif),
        Err(exif::Error::NotFound(_)) => {
            debug!("No EXIF data in {}", path.display());
            None
        }
        Err(e) => {
            warn!("Could not read EXIF data for {}: {}", path.display(), e);
            None
        }
    };

    let taken_at = exif
        .as_ref()
        .and_then(|exif| capture_date(exif, path))
        .unwrap_or_else(|| modification_time(path));

    match exif {
        Some(exif) => ImageMetadata {
            taken_at,
            gps: gps_coordinates(&exif),
            camera_model: ascii_field(&exif, exif::Tag::Model),
            focal_length: exif
                .get_field(exif::Tag::FocalLength, exif::In::PRIMARY)
                .and_then(|f| first_rational(&f.value)),
            lens_model: ascii_field(&exif, exif::Tag::LensModel),
        },
        None => ImageMetadata {
            taken_at,
            gps: None,
            camera_model: None,
            focal_length: None,
            lens_model: None,
        },
    }
}

/// EXIF orientation code (1-8) of the primary image, if present
pub fn read_orientation(path: &Path) -> Option<u16> {
    let exif = read_exif(path).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    field.value.get_uint(0).and_then(|v| u16::try_from(v).ok())
}

fn read_exif(path: &Path) -> Result<exif::Exif, exif::Error> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    exif::Reader::new().read_from_container(&mut reader)
}

fn capture_date(exif: &exif::Exif, path: &Path) -> Option<NaiveDateTime> {
    let raw = ascii_field(exif, exif::Tag::DateTimeOriginal)?;
    match parse_exif_datetime(&raw) {
        Some(dt) => Some(dt),
        None => {
            warn!("Unparsable capture date {:?} in {}", raw, path.display());
            None
        }
    }
}

pub fn parse_exif_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim_end_matches('\0'), EXIF_DATETIME_FORMAT).ok()
}

/// File modification time as local wall-clock time, whole seconds.
fn modification_time(path: &Path) -> NaiveDateTime {
    let modified = std::fs::metadata(path).and_then(|m| m.modified());
    let local = match modified {
        Ok(time) => DateTime::<Local>::from(time),
        Err(e) => {
            warn!("Could not read modification time of {}: {}", path.display(), e);
            Local::now()
        }
    };
    let naive = local.naive_local();
    naive.with_nanosecond(0).unwrap_or(naive)
}

fn gps_coordinates(exif: &exif::Exif) -> Option<GpsCoordinates> {
    let latitude = dms_field(exif, exif::Tag::GPSLatitude)?;
    let longitude = dms_field(exif, exif::Tag::GPSLongitude)?;

    let lat_ref = ascii_field(exif, exif::Tag::GPSLatitudeRef);
    let lon_ref = ascii_field(exif, exif::Tag::GPSLongitudeRef);

    Some(GpsCoordinates {
        latitude: apply_hemisphere(latitude, lat_ref.as_deref(), 'S'),
        longitude: apply_hemisphere(longitude, lon_ref.as_deref(), 'W'),
    })
}

fn dms_field(exif: &exif::Exif, tag: exif::Tag) -> Option<f64> {
    let field = exif.get_field(tag, exif::In::PRIMARY)?;
    match field.value {
        exif::Value::Rational(ref v) if v.len() >= 3 => Some(dms_to_decimal(
            rational_to_f64(&v[0])?,
            rational_to_f64(&v[1])?,
            rational_to_f64(&v[2])?,
        )),
        _ => None,
    }
}

pub fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}

/// Negate `value` when the hemisphere reference names the negative side.
/// A missing reference counts as North / East.
pub fn apply_hemisphere(value: f64, reference: Option<&str>, negative: char) -> f64 {
    match reference.and_then(|r| r.trim().chars().next()) {
        Some(c) if c.eq_ignore_ascii_case(&negative) => -value,
        _ => value,
    }
}

fn rational_to_f64(r: &exif::Rational) -> Option<f64> {
    if r.denom == 0 {
        None
    } else {
        Some(r.num as f64 / r.denom as f64)
    }
}

fn first_rational(value: &exif::Value) -> Option<f64> {
    match value {
        exif::Value::Rational(v) => v.first().and_then(rational_to_f64),
        _ => None,
    }
}

/// First ASCII component of a field, copied through as-is
fn ascii_field(exif: &exif::Exif, tag: exif::Tag) -> Option<String> {
    let field = exif.get_field(tag, exif::In::PRIMARY)?;
    match field.value {
        exif::Value::Ascii(ref v) => v
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}
