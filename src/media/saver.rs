// File Saver
// Copies a chosen status file into the persistent save directory

use super::{MediaError, MediaItem};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Persists chosen media into the save directory, creating it on demand
/// and de-conflicting file names instead of overwriting.
pub struct FileSaver {
    dest_dir: PathBuf,
}

impl FileSaver {
    pub fn new(dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            dest_dir: dest_dir.into(),
        }
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    /// Copy the item into the save directory and return the target path.
    pub fn save(&self, item: &MediaItem) -> Result<PathBuf, MediaError> {
        if !item.path.is_file() {
            return Err(MediaError::MissingSource(item.path.clone()));
        }

        std::fs::create_dir_all(&self.dest_dir).map_err(|source| MediaError::CreateDir {
            dir: self.dest_dir.clone(),
            source,
        })?;

        let target = self.unique_target(&item.file_name);
        let bytes = std::fs::copy(&item.path, &target).map_err(|source| MediaError::Copy {
            file: item.file_name.clone(),
            source,
        })?;

        info!(file = %item.file_name, bytes, target = %target.display(), "status saved");
        Ok(target)
    }

    /// First free variant of `file_name` inside the save directory:
    /// `name.jpg`, `name (1).jpg`, `name (2).jpg`, ...
    fn unique_target(&self, file_name: &str) -> PathBuf {
        let candidate = self.dest_dir.join(file_name);
        if !candidate.exists() {
            return candidate;
        }

        let (stem, ext) = match file_name.rsplit_once('.') {
            Some((stem, ext)) => (stem, Some(ext)),
            None => (file_name, None),
        };

        for n in 1.. {
            let name = match ext {
                Some(ext) => format!("{stem} ({n}).{ext}"),
                None => format!("{stem} ({n})"),
            };
            let candidate = self.dest_dir.join(&name);
            if !candidate.exists() {
                debug!(original = file_name, renamed = %name, "name conflict resolved");
                return candidate;
            }
        }
        unreachable!("counter space exhausted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaKind;
    use std::fs;
    use tempfile::tempdir;

    fn item(path: &Path) -> MediaItem {
        MediaItem {
            path: path.to_path_buf(),
            file_name: path.file_name().unwrap().to_string_lossy().to_string(),
            kind: MediaKind::Image,
            size: 4,
            modified: std::time::SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn copies_into_created_directory() {
        let src_dir = tempdir().unwrap();
        let dst_dir = tempdir().unwrap();
        let src = src_dir.path().join("status.jpg");
        fs::write(&src, b"data").unwrap();

        let saver = FileSaver::new(dst_dir.path().join("saved"));
        let target = saver.save(&item(&src)).unwrap();

        assert_eq!(fs::read(target).unwrap(), b"data");
    }

    #[test]
    fn conflicting_names_get_suffixes() {
        let src_dir = tempdir().unwrap();
        let dst_dir = tempdir().unwrap();
        let src = src_dir.path().join("status.jpg");
        fs::write(&src, b"data").unwrap();

        let saver = FileSaver::new(dst_dir.path());
        let first = saver.save(&item(&src)).unwrap();
        let second = saver.save(&item(&src)).unwrap();
        let third = saver.save(&item(&src)).unwrap();

        assert_eq!(first.file_name().unwrap(), "status.jpg");
        assert_eq!(second.file_name().unwrap(), "status (1).jpg");
        assert_eq!(third.file_name().unwrap(), "status (2).jpg");
    }

    #[test]
    fn missing_source_is_reported() {
        let dst_dir = tempdir().unwrap();
        let saver = FileSaver::new(dst_dir.path());
        let missing = item(Path::new("/nonexistent/status.jpg"));

        assert!(matches!(
            saver.save(&missing),
            Err(MediaError::MissingSource(_))
        ));
    }
}
