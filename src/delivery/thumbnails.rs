//! On-disk thumbnail cache.
//!
//! Rendered thumbnails are kept as `{content_id}_{width}x{height}.{ext}` under
//! the configured cache directory and registered in the `thumbnails` table.
//! Files are written to a temporary name and renamed into place, so a reader
//! never sees a partial file and concurrent renders of the same key simply
//! replace each other.

use std::io::Write;
use std::path::{Path, PathBuf};

use imgview_common::{ContentId, EncodingFormat, Error, Result};
use imgview_db::models::ThumbnailEntry;
use imgview_db::queries::thumbnails;
use rusqlite::Connection;
use tempfile::NamedTempFile;

/// Handle to the thumbnail cache directory.
#[derive(Debug, Clone)]
pub struct ThumbnailCache {
    dir: PathBuf,
}

impl ThumbnailCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(content_id: ContentId, width: u32, height: u32, format: EncodingFormat) -> String {
        format!("{}_{}x{}.{}", content_id, width, height, format.extension())
    }

    /// Path of a registered thumbnail whose file still exists.
    ///
    /// A row whose file has vanished counts as a miss.
    pub fn get_cached_thumbnail(
        &self,
        conn: &Connection,
        content_id: ContentId,
        width: u32,
        height: u32,
        format: EncodingFormat,
    ) -> Result<Option<PathBuf>> {
        let Some(entry) = thumbnails::get_thumbnail(conn, content_id, width, height, format)? else {
            return Ok(None);
        };

        let path = self.dir.join(&entry.file_path);
        if path.is_file() {
            tracing::info!(
                "Thumbnail cache hit: content {} {}x{} {}",
                content_id,
                width,
                height,
                format
            );
            Ok(Some(path))
        } else {
            tracing::warn!(
                "Thumbnail registered for content {} but file is missing: {}",
                content_id,
                path.display()
            );
            Ok(None)
        }
    }

    /// Write `bytes` into the cache and register the entry, replacing any
    /// previous entry for the same key.
    pub fn register_thumbnail(
        &self,
        conn: &Connection,
        content_id: ContentId,
        width: u32,
        height: u32,
        format: EncodingFormat,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        let name = Self::file_name(content_id, width, height, format);
        let target = self.dir.join(&name);

        self.write_atomic(&target, bytes).map_err(|e| {
            Error::cache_write(format!("Failed to write {}: {}", target.display(), e))
        })?;

        let entry = ThumbnailEntry {
            content_id,
            width,
            height,
            format,
            file_path: name,
        };
        thumbnails::register_thumbnail(conn, &entry)
            .map_err(|e| Error::cache_write(format!("Failed to register thumbnail: {}", e)))?;

        tracing::info!(
            "Cached thumbnail for content {} at {}",
            content_id,
            target.display()
        );
        Ok(target)
    }

    fn write_atomic(&self, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let mut file = NamedTempFile::new_in(&self.dir)?;
        file.write_all(bytes)?;
        file.persist(target).map_err(|e| e.error)?;
        Ok(())
    }

    /// Remove every cached thumbnail of a content item, rows and files.
    ///
    /// Returns how many entries were dropped.
    pub fn drop_thumbnails(&self, conn: &Connection, content_id: ContentId) -> Result<usize> {
        let removed = thumbnails::drop_thumbnails(conn, content_id)?;

        for entry in &removed {
            let path = self.dir.join(&entry.file_path);
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
            }
        }

        tracing::info!(
            "Dropped {} thumbnail(s) for content {}",
            removed.len(),
            content_id
        );
        Ok(removed.len())
    }
}
