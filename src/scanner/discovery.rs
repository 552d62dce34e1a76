use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Directories found under a root, plus how many could not be read.
#[derive(Debug, Clone, Default)]
pub struct DirectoryWalk {
    pub directories: Vec<PathBuf>,
    pub unreadable: usize,
}

/// Collect every directory under `root` (root included), never descending
/// into `excluded`. Unreadable entries are logged and skipped; the rest of
/// the tree is still walked.
pub fn walk_directories(root: &Path, excluded: &Path) -> DirectoryWalk {
    let mut walk = DirectoryWalk::default();

    let entries = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.path() != excluded);

    for entry in entries {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_dir() {
                    walk.directories.push(entry.into_path());
                }
            }
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                // A directory that cannot be listed was already yielded
                if e.path().is_some() && walk.directories.last().map(PathBuf::as_path) == e.path() {
                    walk.directories.pop();
                }
                walk.unreadable += 1;
            }
        }
    }

    walk
}

/// Image files directly inside `directory` whose extension matches one of
/// `extensions` (case-insensitive), sorted by path.
pub fn list_images(directory: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();

    for entry in std::fs::read_dir(directory)?.flatten() {
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }

        let path = entry.path();
        if has_supported_extension(&path, extensions) {
            images.push(path);
        }
    }

    // Sort by path for consistent ordering
    images.sort();

    Ok(images)
}

pub fn has_supported_extension(path: &Path, extensions: &[String]) -> bool {
    match path.extension() {
        Some(ext) => {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            extensions.iter().any(|e| e.to_lowercase() == ext_lower)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    fn extensions() -> Vec<String> {
        vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string(), "gif".to_string()]
    }

    #[test]
    fn test_list_images_filters_extensions() {
        let dir = tempdir().unwrap();

        File::create(dir.path().join("photo1.jpg")).unwrap();
        File::create(dir.path().join("photo2.PNG")).unwrap();
        File::create(dir.path().join("anim.Gif")).unwrap();
        File::create(dir.path().join("document.txt")).unwrap();
        File::create(dir.path().join("noext")).unwrap();
        fs::create_dir(dir.path().join("folder.jpg")).unwrap();

        let images = list_images(dir.path(), &extensions()).unwrap();
        let names: Vec<String> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(names, vec!["anim.Gif", "photo1.jpg", "photo2.PNG"]);
    }

    #[test]
    fn test_list_images_is_not_recursive() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();
        File::create(dir.path().join("subdir/photo3.jpeg")).unwrap();

        assert!(list_images(dir.path(), &extensions()).unwrap().is_empty());
    }

    #[test]
    fn test_walk_skips_excluded_subtree() {
        let dir = tempdir().unwrap();
        let thumbs = dir.path().join("thumbnail");
        fs::create_dir_all(thumbs.join("nested")).unwrap();
        fs::create_dir_all(dir.path().join("2023/summer")).unwrap();

        let walk = walk_directories(dir.path(), &thumbs);

        assert_eq!(walk.unreadable, 0);
        assert_eq!(
            walk.directories,
            vec![
                dir.path().to_path_buf(),
                dir.path().join("2023"),
                dir.path().join("2023/summer"),
            ]
        );
    }

    #[test]
    fn test_walk_missing_root_counts_as_unreadable() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");

        let walk = walk_directories(&missing, &missing.join("thumbnail"));
        assert!(walk.directories.is_empty());
        assert_eq!(walk.unreadable, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_drops_directory_it_cannot_list() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        if fs::read_dir(&locked).is_ok() {
            // Permission bits are not enforced for this user (root)
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let walk = walk_directories(dir.path(), &dir.path().join("thumbnail"));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(walk.unreadable, 1);
        assert_eq!(walk.directories, vec![dir.path().to_path_buf()]);
    }
}
