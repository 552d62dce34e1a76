use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::fs;
use std::path::{Path, PathBuf};

use super::metadata;
use crate::config::ThumbnailConfig;
use crate::error::ThumbnailError;

/// Generates upright, size-bounded JPEG previews into the thumbnail store
#[derive(Debug, Clone)]
pub struct ThumbnailGenerator {
    dir: PathBuf,
    size: u32,
    prefix: String,
    quality: u8,
}

impl ThumbnailGenerator {
    pub fn new(dir: PathBuf, config: &ThumbnailConfig) -> Self {
        Self {
            dir,
            size: config.size,
            prefix: config.prefix.clone(),
            quality: config.quality.clamp(1, 100),
        }
    }

    /// Ensure the thumbnail directory exists
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        Ok(())
    }

    /// `<dir>/<prefix><original file name>`
    pub fn thumbnail_path(&self, original: &Path) -> PathBuf {
        let name = original
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.dir.join(format!("{}{}", self.prefix, name))
    }

    /// Decode `original`, fix its orientation and colour mode, shrink it and
    /// write the result. An existing thumbnail with the same name is
    /// overwritten. Nothing is written unless encoding succeeds.
    pub fn generate(&self, original: &Path) -> Result<PathBuf, ThumbnailError> {
        let img = image::ImageReader::open(original)?
            .with_guessed_format()?
            .decode()
            .map_err(ThumbnailError::Decode)?;

        let img = apply_orientation(img, metadata::read_orientation(original));
        let img = normalize_color(img);
        let img = shrink_to_fit(img, self.size);

        let mut encoded = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut encoded, self.quality);
        img.write_with_encoder(encoder)
            .map_err(ThumbnailError::Encode)?;

        let path = self.thumbnail_path(original);
        fs::write(&path, &encoded)?;

        Ok(path)
    }
}

/// Rotate/flip pixels so the image displays upright for an EXIF
/// orientation code.
pub fn apply_orientation(img: DynamicImage, orientation: Option<u16>) -> DynamicImage {
    match orientation {
        Some(2) => img.fliph(),
        Some(3) => img.rotate180(),
        Some(4) => img.flipv(),
        Some(5) => img.rotate90().fliph(),
        Some(6) => img.rotate90(),
        Some(7) => img.rotate270().fliph(),
        Some(8) => img.rotate270(),
        _ => img,
    }
}

/// The JPEG encoder only takes 8-bit grey or RGB.
pub fn normalize_color(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => img,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Largest size with the same aspect ratio that fits in `max` x `max`.
/// Images already inside the bounds keep their size.
pub fn bounded_dimensions(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }

    let ratio = f64::min(max as f64 / width as f64, max as f64 / height as f64);
    let scaled = |v: u32| ((v as f64 * ratio).round() as u32).clamp(1, max);
    (scaled(width), scaled(height))
}

fn shrink_to_fit(img: DynamicImage, max: u32) -> DynamicImage {
    let (width, height) = bounded_dimensions(img.width(), img.height(), max);
    if (width, height) == (img.width(), img.height()) {
        img
    } else {
        img.thumbnail_exact(width, height)
    }
}
