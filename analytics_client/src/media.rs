use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};
use zone_common::geometry::Size;
use zone_common::summary::MediaKind;

use crate::error::MediaError;

/// A user-selected image or video, validated for kind and size.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub path: PathBuf,
    pub file_name: String,
    pub kind: MediaKind,
    pub mime: &'static str,
    pub size: u64,
}

fn classify(path: &Path) -> Option<(MediaKind, &'static str)> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let found = match ext.as_str() {
        "jpg" | "jpeg" => (MediaKind::Image, "image/jpeg"),
        "png" => (MediaKind::Image, "image/png"),
        "gif" => (MediaKind::Image, "image/gif"),
        "bmp" => (MediaKind::Image, "image/bmp"),
        "webp" => (MediaKind::Image, "image/webp"),
        "mp4" => (MediaKind::Video, "video/mp4"),
        "mkv" => (MediaKind::Video, "video/x-matroska"),
        "webm" => (MediaKind::Video, "video/webm"),
        "mov" => (MediaKind::Video, "video/quicktime"),
        "avi" => (MediaKind::Video, "video/x-msvideo"),
        _ => return None,
    };
    Some(found)
}

impl MediaFile {
    pub fn open(path: &Path, max_bytes: u64) -> Result<Self, MediaError> {
        let meta = std::fs::metadata(path).map_err(|source| MediaError::Io {
            path: path.display().to_string(),
            source,
        })?;
        if meta.len() > max_bytes {
            return Err(MediaError::TooLarge {
                limit_mb: max_bytes / (1024 * 1024),
            });
        }
        let (kind, mime) = classify(path).ok_or(MediaError::Unsupported)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            kind,
            mime,
            size: meta.len(),
        })
    }

    pub fn read(&self) -> Result<Vec<u8>, MediaError> {
        std::fs::read(&self.path).map_err(|source| MediaError::Io {
            path: self.path.display().to_string(),
            source,
        })
    }

    /// Message shown once the file is accepted.
    pub fn loaded_message(&self) -> &'static str {
        match self.kind {
            MediaKind::Image => "Image uploaded successfully. Ready for analysis.",
            MediaKind::Video => "Video uploaded successfully. Ready for zone drawing.",
        }
    }

    /// Native pixel size, or `None` when it cannot be determined yet.
    pub fn probe_native_size(&self, frame_size: Option<Size>) -> Option<Size> {
        if let Some(size) = frame_size {
            return Some(size);
        }
        match self.kind {
            MediaKind::Image => match image::image_dimensions(&self.path) {
                Ok((width, height)) => Some(Size::new(width, height)),
                Err(e) => {
                    warn!("Could not read image dimensions of {:?}: {e}", self.path);
                    None
                }
            },
            MediaKind::Video => probe_video_size(&self.path),
        }
    }
}

/// Asks `ffprobe` for the first video stream's dimensions.
fn probe_video_size(path: &Path) -> Option<Size> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=s=x:p=0",
        ])
        .arg(path)
        .output();

    match output {
        Ok(out) if out.status.success() => {
            let text = String::from_utf8_lossy(&out.stdout);
            let size = parse_frame_size(text.lines().next().unwrap_or_default());
            debug!("ffprobe {:?} -> {:?}", path, size);
            size
        }
        Ok(out) => {
            warn!("ffprobe failed for {:?}: {}", path, String::from_utf8_lossy(&out.stderr).trim());
            None
        }
        Err(e) => {
            warn!("ffprobe unavailable ({e}); pass --frame-size to enable zone drawing");
            None
        }
    }
}

/// Parses `WIDTHxHEIGHT`, e.g. `1920x1080`.
pub fn parse_frame_size(s: &str) -> Option<Size> {
    let (w, h) = s.trim().split_once(['x', 'X'])?;
    let size = Size::new(w.trim().parse().ok()?, h.trim().parse().ok()?);
    (!size.is_empty()).then_some(size)
}

/// Human-readable byte count: `0 Bytes`, `1.5 KB`, `12.34 MB`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut i = 0;
    let mut scaled = bytes as f64;
    while scaled >= 1024.0 && i < UNITS.len() - 1 {
        scaled /= 1024.0;
        i += 1;
    }
    let value = (scaled * 100.0).round() / 100.0;
    format!("{} {}", value, UNITS[i])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(512), "512 Bytes");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1024 * 1024), "1 MB");
        assert_eq!(format_bytes(12_940_000), "12.34 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3 GB");
    }

    #[test]
    fn test_parse_frame_size() {
        assert_eq!(parse_frame_size("1920x1080"), Some(Size::new(1920, 1080)));
        assert_eq!(parse_frame_size(" 640X480\n"), Some(Size::new(640, 480)));
        assert_eq!(parse_frame_size("0x480"), None);
        assert_eq!(parse_frame_size("wide"), None);
    }

    #[test]
    fn test_open_classifies_and_limits() {
        let dir = tempfile::tempdir().unwrap();

        let clip = dir.path().join("lobby.MP4");
        std::fs::write(&clip, vec![0u8; 2048]).unwrap();
        let media = MediaFile::open(&clip, 1024 * 1024).unwrap();
        assert_eq!(media.kind, MediaKind::Video);
        assert_eq!(media.mime, "video/mp4");
        assert_eq!(media.file_name, "lobby.MP4");
        assert_eq!(media.size, 2048);

        assert!(matches!(
            MediaFile::open(&clip, 1024),
            Err(MediaError::TooLarge { .. })
        ));

        let doc = dir.path().join("notes.txt");
        std::fs::write(&doc, b"hello").unwrap();
        assert!(matches!(
            MediaFile::open(&doc, 1024),
            Err(MediaError::Unsupported)
        ));

        assert!(matches!(
            MediaFile::open(&dir.path().join("missing.png"), 1024),
            Err(MediaError::Io { .. })
        ));
    }

    #[test]
    fn test_probe_image_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        image::RgbImage::new(64, 48).save(&path).unwrap();

        let media = MediaFile::open(&path, 1024 * 1024).unwrap();
        assert_eq!(media.probe_native_size(None), Some(Size::new(64, 48)));
        assert_eq!(
            media.probe_native_size(Some(Size::new(10, 10))),
            Some(Size::new(10, 10))
        );
    }
}
