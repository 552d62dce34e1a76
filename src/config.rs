use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub photos: PhotosConfig,

    #[serde(default)]
    pub thumbnails: ThumbnailConfig,

    #[serde(default)]
    pub scanner: ScannerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub sqlite_path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ecopix")
        .join("ecopix.db")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotosConfig {
    /// Directory tree that gets catalogued.
    #[serde(default = "default_photos_root")]
    pub root: PathBuf,

    /// Thumbnail store. Relative paths are resolved against `root`.
    /// The directory is never traversed by the scanner.
    #[serde(default = "default_thumbnail_dir")]
    pub thumbnail_dir: PathBuf,
}

fn default_photos_root() -> PathBuf {
    PathBuf::from("/Photos")
}

fn default_thumbnail_dir() -> PathBuf {
    PathBuf::from("thumbnail")
}

impl Default for PhotosConfig {
    fn default() -> Self {
        Self {
            root: default_photos_root(),
            thumbnail_dir: default_thumbnail_dir(),
        }
    }
}

impl PhotosConfig {
    /// Thumbnail directory for a given (possibly canonicalised) root.
    pub fn thumbnail_dir_for(&self, root: &Path) -> PathBuf {
        if self.thumbnail_dir.is_absolute() {
            self.thumbnail_dir.clone()
        } else {
            root.join(&self.thumbnail_dir)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    /// Longest side of a thumbnail in pixels.
    #[serde(default = "default_thumb_size")]
    pub size: u32,

    #[serde(default = "default_thumb_prefix")]
    pub prefix: String,

    /// JPEG quality (1-100)
    #[serde(default = "default_thumb_quality")]
    pub quality: u8,
}

fn default_thumb_size() -> u32 {
    300
}

fn default_thumb_prefix() -> String {
    "thumb_".to_string()
}

fn default_thumb_quality() -> u8 {
    85
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            size: default_thumb_size(),
            prefix: default_thumb_prefix(),
            quality: default_thumb_quality(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    /// Decode and thumbnail the files of a directory on the rayon pool.
    /// The commit stays one transaction per directory either way.
    #[serde(default = "default_parallel")]
    pub parallel: bool,

    /// A run recorded as in progress whose heartbeat is older than this is
    /// treated as abandoned (killed process) and no longer blocks new runs.
    #[serde(default = "default_stale_run_minutes")]
    pub stale_run_minutes: u64,
}

fn default_image_extensions() -> Vec<String> {
    vec![
        "jpg".to_string(),
        "jpeg".to_string(),
        "png".to_string(),
        "gif".to_string(),
    ]
}

fn default_parallel() -> bool {
    true
}

fn default_stale_run_minutes() -> u64 {
    30
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            image_extensions: default_image_extensions(),
            parallel: default_parallel(),
            stale_run_minutes: default_stale_run_minutes(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// When set, logs go to a daily rolling file in this directory
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Config {
    /// Load from `ECOPIX_CONFIG` or the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load from an explicit path. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("ECOPIX_CONFIG") {
            return PathBuf::from(path);
        }

        Self::config_dir().join("config.toml")
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ecopix")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.photos.root, PathBuf::from("/Photos"));
        assert_eq!(
            config.photos.thumbnail_dir_for(&config.photos.root),
            PathBuf::from("/Photos/thumbnail")
        );
        assert_eq!(config.thumbnails.size, 300);
        assert_eq!(config.thumbnails.prefix, "thumb_");
        assert_eq!(config.scanner.image_extensions, vec!["jpg", "jpeg", "png", "gif"]);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[photos]\nroot = \"/srv/pictures\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.photos.root, PathBuf::from("/srv/pictures"));
        assert_eq!(config.photos.thumbnail_dir, PathBuf::from("thumbnail"));
        assert_eq!(config.thumbnails.size, 300);
        assert!(config.scanner.parallel);
        assert_eq!(config.scanner.stale_run_minutes, 30);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.thumbnails.quality, 85);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[photos\nroot = 1").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.photos.thumbnail_dir = PathBuf::from("/var/cache/thumbs");
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.photos.thumbnail_dir, PathBuf::from("/var/cache/thumbs"));
        assert_eq!(
            loaded.photos.thumbnail_dir_for(Path::new("/Photos")),
            PathBuf::from("/var/cache/thumbs")
        );
    }
}
