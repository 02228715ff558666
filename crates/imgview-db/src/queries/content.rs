//! Content item queries.
//!
//! Items are never deleted, only hidden. The alternate-version relation is
//! a manually curated link stored on the item row.

use chrono::{DateTime, Utc};
use imgview_common::{ContentId, Error, MediaKind, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::conversion_error;
use crate::models::{ContentItem, NewContent, Origin};

const CONTENT_COLUMNS: &str = "id, file_path, media_kind, title, hidden, description, added_at,
                               origin_name, origin_id, alternate_of";

/// Parse a content item from a database row.
///
/// Expects columns in the order of `CONTENT_COLUMNS`.
fn parse_content_row(row: &rusqlite::Row) -> rusqlite::Result<ContentItem> {
    let media_kind: String = row.get(2)?;
    let added_at: String = row.get(6)?;
    let origin_name: Option<String> = row.get(7)?;

    Ok(ContentItem {
        id: ContentId::from(row.get::<_, i64>(0)?),
        file_path: row.get(1)?,
        media_kind: media_kind
            .parse::<MediaKind>()
            .map_err(|e| conversion_error(2, e))?,
        title: row.get(3)?,
        hidden: row.get(4)?,
        description: row.get(5)?,
        added_at: parse_timestamp(&added_at).map_err(|e| conversion_error(6, e))?,
        origin: origin_name.map(|name| Origin {
            name,
            external_id: row.get(8).ok().flatten(),
        }),
        alternate_of: row.get::<_, Option<i64>>(9)?.map(ContentId::from),
    })
}

fn parse_timestamp(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp {value:?}: {e}"))
}

/// Register a new content item.
pub fn insert_content(conn: &Connection, new: &NewContent) -> Result<ContentItem> {
    let added_at = new.added_at.unwrap_or_else(Utc::now);

    conn.execute(
        "INSERT INTO content (file_path, media_kind, title, description, added_at, origin_name, origin_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            new.file_path,
            new.media_kind.to_string(),
            new.title,
            new.description,
            added_at.to_rfc3339(),
            new.origin.as_ref().map(|o| o.name.as_str()),
            new.origin.as_ref().and_then(|o| o.external_id.as_deref()),
        ],
    )
    .map_err(Error::database)?;

    let id = ContentId::from(conn.last_insert_rowid());
    get_content(conn, id)?.ok_or_else(|| Error::not_found("content", id))
}

/// Get a content item by id.
pub fn get_content(conn: &Connection, id: ContentId) -> Result<Option<ContentItem>> {
    conn.query_row(
        &format!("SELECT {CONTENT_COLUMNS} FROM content WHERE id = ?1"),
        params![id.get()],
        parse_content_row,
    )
    .optional()
    .map_err(Error::database)
}

/// Get a content item by id, failing with `NotFound` when it does not exist.
pub fn require_content(conn: &Connection, id: ContentId) -> Result<ContentItem> {
    get_content(conn, id)?.ok_or_else(|| Error::not_found("content", id))
}

/// Get a content item by its library-relative file path.
pub fn get_content_by_path(conn: &Connection, file_path: &str) -> Result<Option<ContentItem>> {
    conn.query_row(
        &format!("SELECT {CONTENT_COLUMNS} FROM content WHERE file_path = ?1"),
        params![file_path],
        parse_content_row,
    )
    .optional()
    .map_err(Error::database)
}

/// Point a content item at a new file, e.g. after its file was replaced.
///
/// Returns `true` if the item exists.
pub fn update_file_path(conn: &Connection, id: ContentId, file_path: &str) -> Result<bool> {
    let affected = conn
        .execute(
            "UPDATE content SET file_path = ?1 WHERE id = ?2",
            params![file_path, id.get()],
        )
        .map_err(Error::database)?;
    Ok(affected > 0)
}

/// Hide or unhide a content item.
pub fn set_hidden(conn: &Connection, id: ContentId, hidden: bool) -> Result<bool> {
    let affected = conn
        .execute(
            "UPDATE content SET hidden = ?1 WHERE id = ?2",
            params![hidden, id.get()],
        )
        .map_err(Error::database)?;
    Ok(affected > 0)
}

/// Mark two items as intentionally kept variants of each other.
///
/// Each side gets linked to the other unless it already carries a link, so
/// an item that already belongs to a set of variants keeps its first partner.
pub fn mark_alternate_version(conn: &Connection, first: ContentId, second: ContentId) -> Result<()> {
    if first == second {
        return Err(Error::validation(
            "an item cannot be an alternate version of itself",
        ));
    }
    require_content(conn, first)?;
    require_content(conn, second)?;

    let tx = conn.unchecked_transaction().map_err(Error::database)?;
    for (id, partner) in [(first, second), (second, first)] {
        tx.execute(
            "UPDATE content SET alternate_of = ?1 WHERE id = ?2 AND alternate_of IS NULL",
            params![partner.get(), id.get()],
        )
        .map_err(Error::database)?;
    }
    tx.commit().map_err(Error::database)?;

    Ok(())
}
