//! Path utilities for classifying library files by extension.
//!
//! Used by the directory listing and by the delivery service to decide how a
//! content file has to be opened.

use std::path::Path;

use crate::MediaKind;

/// Supported still image extensions.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg", "avif", "jxl"];

/// Supported video extensions.
const VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4", "webm"];

/// Supported audio extensions.
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "ogg", "oga", "opus", "flac"];

/// Multi-resolution container manifest extension.
const CONTAINER_EXTENSION: &str = "srs";

/// Streaming manifest extensions.
const MANIFEST_EXTENSIONS: &[&str] = &["mpd", "m3u8"];

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Check if a path has a still image extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use imgview_common::paths::is_image_file;
///
/// assert!(is_image_file(Path::new("photo.JPG")));
/// assert!(is_image_file(Path::new("/library/drawing.jxl")));
/// assert!(!is_image_file(Path::new("clip.webm")));
/// ```
pub fn is_image_file(path: &Path) -> bool {
    has_extension(path, IMAGE_EXTENSIONS)
}

/// Check if a path has a video extension.
pub fn is_video_file(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

/// Check if a path has an audio extension.
pub fn is_audio_file(path: &Path) -> bool {
    has_extension(path, AUDIO_EXTENSIONS)
}

/// Check if a path is an SRS multi-resolution container manifest.
pub fn is_container_file(path: &Path) -> bool {
    has_extension(path, &[CONTAINER_EXTENSION])
}

/// Check if a path is a streaming manifest (DASH or HLS).
pub fn is_manifest_file(path: &Path) -> bool {
    has_extension(path, MANIFEST_EXTENSIONS)
}

/// Check if the library serves this file at all.
pub fn is_supported_file(path: &Path) -> bool {
    is_image_file(path)
        || is_video_file(path)
        || is_audio_file(path)
        || is_container_file(path)
        || is_manifest_file(path)
}

/// Whether a file of `kind` at `path` holds raster pixels a perceptual
/// fingerprint can be computed from.
pub fn is_hashable_image(kind: MediaKind, path: &Path) -> bool {
    kind == MediaKind::Image && !has_extension(path, &["svg"])
}

/// Guess the media kind from the extension alone.
pub fn media_kind_for_path(path: &Path) -> Option<MediaKind> {
    if is_image_file(path) || is_container_file(path) {
        Some(MediaKind::Image)
    } else if is_video_file(path) {
        Some(MediaKind::Video)
    } else if is_audio_file(path) {
        Some(MediaKind::Audio)
    } else {
        None
    }
}
