// Media Module
// Status media discovery and persistence

pub mod saver;
pub mod scanner;

use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::time::SystemTime;
use thiserror::Error;

/// Errors from media persistence
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("source file does not exist: {0}")]
    MissingSource(PathBuf),

    #[error("failed to create save directory {dir}: {source}")]
    CreateDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to copy {file}: {source}")]
    Copy {
        file: String,
        #[source]
        source: io::Error,
    },
}

/// Kind of a status media file, classified by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    /// Classify a file extension; unknown extensions are not media.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" => Some(MediaKind::Image),
            "mp4" | "mkv" | "avi" | "3gp" | "webm" => Some(MediaKind::Video),
            "mp3" | "m4a" | "aac" | "opus" | "ogg" => Some(MediaKind::Audio),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

/// A single status media file found on disk
#[derive(Debug, Clone, Serialize)]
pub struct MediaItem {
    pub path: PathBuf,
    pub file_name: String,
    pub kind: MediaKind,
    pub size: u64,
    pub modified: SystemTime,
}

impl MediaItem {
    pub fn extension(&self) -> &str {
        self.file_name.rsplit('.').next().unwrap_or("")
    }

    /// Human-readable size for list output
    pub fn formatted_size(&self) -> String {
        match self.size {
            s if s < 1024 => format!("{s} B"),
            s if s < 1024 * 1024 => format!("{} KB", s / 1024),
            s => format!("{} MB", s / (1024 * 1024)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_classification() {
        assert_eq!(MediaKind::from_extension("jpg"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_extension("MP4"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_extension("opus"), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_extension("pdf"), None);
        assert_eq!(MediaKind::from_extension(""), None);
    }

    #[test]
    fn formatted_sizes() {
        let item = |size| MediaItem {
            path: PathBuf::from("/tmp/x.jpg"),
            file_name: "x.jpg".to_string(),
            kind: MediaKind::Image,
            size,
            modified: SystemTime::UNIX_EPOCH,
        };
        assert_eq!(item(512).formatted_size(), "512 B");
        assert_eq!(item(2048).formatted_size(), "2 KB");
        assert_eq!(item(3 * 1024 * 1024).formatted_size(), "3 MB");
    }
}
