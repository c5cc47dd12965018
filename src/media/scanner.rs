// Status Scanner
// Walks the messaging app's status folders and organizes what it finds

use super::{MediaItem, MediaKind};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Status folders checked relative to the storage base, covering both the
/// regular and the business variant of the messaging app.
pub const DEFAULT_STATUS_DIRS: [&str; 4] = [
    "WhatsApp/Media/.Statuses",
    "Android/media/com.whatsapp/WhatsApp/Media/.Statuses",
    "WhatsApp Business/Media/.Statuses",
    "Android/media/com.whatsapp.w4b/WhatsApp Business/Media/.Statuses",
];

/// Media found by one scan pass, grouped by kind and sorted newest-first.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub images: Vec<MediaItem>,
    pub videos: Vec<MediaItem>,
    pub audio: Vec<MediaItem>,
}

impl ScanReport {
    pub fn total(&self) -> usize {
        self.images.len() + self.videos.len() + self.audio.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn all(&self) -> impl Iterator<Item = &MediaItem> {
        self.images.iter().chain(&self.videos).chain(&self.audio)
    }
}

/// Enumerates candidate status media across the configured roots.
pub struct StatusScanner {
    roots: Vec<PathBuf>,
}

impl StatusScanner {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// The default roots resolved against a storage base directory.
    pub fn with_base(base: &Path) -> Self {
        Self::new(DEFAULT_STATUS_DIRS.iter().map(|dir| base.join(dir)).collect())
    }

    /// Scan every root and return the organized result. The same file
    /// name appearing under multiple roots is reported once. Unreadable
    /// folders are skipped, never fatal.
    pub fn scan_all(&self) -> ScanReport {
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for root in &self.roots {
            for item in self.scan_folder(root) {
                if seen.insert(item.file_name.clone()) {
                    items.push(item);
                }
            }
        }

        items.sort_by(|a, b| b.modified.cmp(&a.modified));

        let mut report = ScanReport::default();
        for item in items {
            match item.kind {
                MediaKind::Image => report.images.push(item),
                MediaKind::Video => report.videos.push(item),
                MediaKind::Audio => report.audio.push(item),
            }
        }
        report
    }

    /// Quick check without building the full report.
    pub fn has_statuses(&self) -> bool {
        self.roots.iter().any(|root| {
            root.is_dir()
                && std::fs::read_dir(root)
                    .map(|mut entries| entries.next().is_some())
                    .unwrap_or(false)
        })
    }

    pub fn total_count(&self) -> usize {
        self.scan_all().total()
    }

    fn scan_folder(&self, root: &Path) -> Vec<MediaItem> {
        if !root.is_dir() {
            debug!(root = %root.display(), "status folder absent");
            return Vec::new();
        }

        let mut items = Vec::new();
        for entry in WalkDir::new(root).max_depth(1).into_iter() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy().to_string();
            if file_name.starts_with('.') {
                continue;
            }

            let Some(kind) = Path::new(&file_name)
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(MediaKind::from_extension)
            else {
                continue;
            };

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(file = %file_name, error = %e, "skipping file without metadata");
                    continue;
                }
            };

            items.push(MediaItem {
                path: entry.path().to_path_buf(),
                file_name,
                kind,
                size: metadata.len(),
                modified: metadata.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH),
            });
        }

        debug!(root = %root.display(), found = items.len(), "status folder scanned");
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"data").unwrap();
    }

    #[test]
    fn classifies_and_groups_media() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.jpg");
        touch(dir.path(), "b.mp4");
        touch(dir.path(), "c.opus");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), ".nomedia");

        let scanner = StatusScanner::new(vec![dir.path().to_path_buf()]);
        let report = scanner.scan_all();

        assert_eq!(report.images.len(), 1);
        assert_eq!(report.videos.len(), 1);
        assert_eq!(report.audio.len(), 1);
        assert_eq!(report.total(), 3);
    }

    #[test]
    fn deduplicates_across_roots() {
        let dir1 = tempdir().unwrap();
        let dir2 = tempdir().unwrap();
        touch(dir1.path(), "same.jpg");
        touch(dir2.path(), "same.jpg");
        touch(dir2.path(), "other.jpg");

        let scanner =
            StatusScanner::new(vec![dir1.path().to_path_buf(), dir2.path().to_path_buf()]);
        assert_eq!(scanner.scan_all().total(), 2);
    }

    #[test]
    fn missing_roots_are_not_fatal() {
        let scanner = StatusScanner::new(vec![PathBuf::from("/nonexistent/status/dir")]);
        assert!(scanner.scan_all().is_empty());
        assert!(!scanner.has_statuses());
    }

    #[test]
    fn has_statuses_sees_files() {
        let dir = tempdir().unwrap();
        let scanner = StatusScanner::new(vec![dir.path().to_path_buf()]);
        assert!(!scanner.has_statuses());

        touch(dir.path(), "a.jpg");
        assert!(scanner.has_statuses());
    }
}
