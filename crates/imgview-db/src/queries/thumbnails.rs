//! Thumbnail cache queries.

use imgview_common::{ContentId, EncodingFormat, Error, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::conversion_error;
use crate::models::ThumbnailEntry;

fn parse_thumbnail_row(row: &rusqlite::Row) -> rusqlite::Result<ThumbnailEntry> {
    let format: String = row.get(3)?;
    Ok(ThumbnailEntry {
        content_id: ContentId::from(row.get::<_, i64>(0)?),
        width: row.get(1)?,
        height: row.get(2)?,
        format: format
            .parse::<EncodingFormat>()
            .map_err(|e| conversion_error(3, e))?,
        file_path: row.get(4)?,
    })
}

/// Look up a cached thumbnail for an exact `(content, width, height, format)` key.
pub fn get_thumbnail(
    conn: &Connection,
    content_id: ContentId,
    width: u32,
    height: u32,
    format: EncodingFormat,
) -> Result<Option<ThumbnailEntry>> {
    conn.query_row(
        "SELECT content_id, width, height, format, file_path
         FROM thumbnails
         WHERE content_id = ?1 AND width = ?2 AND height = ?3 AND format = ?4",
        params![content_id.get(), width, height, format.as_str()],
        parse_thumbnail_row,
    )
    .optional()
    .map_err(Error::database)
}

/// Register a rendered thumbnail, replacing any previous row for the same key.
pub fn register_thumbnail(conn: &Connection, entry: &ThumbnailEntry) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO thumbnails (content_id, width, height, format, file_path)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.content_id.get(),
            entry.width,
            entry.height,
            entry.format.as_str(),
            entry.file_path,
        ],
    )
    .map_err(Error::database)?;
    Ok(())
}

/// List every cached thumbnail of a content item.
pub fn list_thumbnails(conn: &Connection, content_id: ContentId) -> Result<Vec<ThumbnailEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT content_id, width, height, format, file_path
             FROM thumbnails
             WHERE content_id = ?1
             ORDER BY width, height, format",
        )
        .map_err(Error::database)?;

    let rows = stmt
        .query_map(params![content_id.get()], parse_thumbnail_row)
        .map_err(Error::database)?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Error::database)
}

/// Delete every thumbnail row of a content item.
///
/// Returns the removed entries so the caller can delete the files.
pub fn drop_thumbnails(conn: &Connection, content_id: ContentId) -> Result<Vec<ThumbnailEntry>> {
    let entries = list_thumbnails(conn, content_id)?;
    conn.execute(
        "DELETE FROM thumbnails WHERE content_id = ?1",
        params![content_id.get()],
    )
    .map_err(Error::database)?;
    Ok(entries)
}
