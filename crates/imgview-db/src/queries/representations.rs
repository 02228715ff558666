//! Representation catalog queries.
//!
//! Representations are returned ordered by compatibility level ascending, so
//! the first entry is the best-quality copy and the last one is the copy the
//! widest range of clients can decode.

use std::path::PathBuf;

use imgview_common::{CompatibilityTier, ContentId, EncodingFormat, Error, Result};
use rusqlite::{params, Connection};

use super::conversion_error;
use crate::models::Representation;

fn parse_representation_row(row: &rusqlite::Row) -> rusqlite::Result<Representation> {
    let format: String = row.get(1)?;
    let level: u8 = row.get(2)?;
    let file_path: String = row.get(3)?;

    Ok(Representation {
        content_id: ContentId::from(row.get::<_, i64>(0)?),
        format: format
            .parse::<EncodingFormat>()
            .map_err(|e| conversion_error(1, e))?,
        compatibility_level: CompatibilityTier::try_from(level)
            .map_err(|e| conversion_error(2, e))?,
        file_path: PathBuf::from(file_path),
    })
}

/// List all representations of a content item, best quality first.
pub fn get_representations(conn: &Connection, content_id: ContentId) -> Result<Vec<Representation>> {
    let mut stmt = conn
        .prepare(
            "SELECT content_id, format, compatibility_level, file_path
             FROM representations
             WHERE content_id = ?1
             ORDER BY compatibility_level ASC, format ASC",
        )
        .map_err(Error::database)?;

    let rows = stmt
        .query_map(params![content_id.get()], parse_representation_row)
        .map_err(Error::database)?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Error::database)
}

/// Register a representation.
///
/// Concurrent population of the same item is tolerated: an already registered
/// `(content_id, format, compatibility_level)` row is left untouched. Returns
/// `true` if a new row was written.
pub fn register_representation(conn: &Connection, repr: &Representation) -> Result<bool> {
    let affected = conn
        .execute(
            "INSERT OR IGNORE INTO representations (content_id, format, compatibility_level, file_path)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                repr.content_id.get(),
                repr.format.as_str(),
                repr.compatibility_level.level(),
                repr.file_path.to_string_lossy(),
            ],
        )
        .map_err(Error::database)?;

    Ok(affected > 0)
}

/// Remove every representation row of a content item.
///
/// Returns the number of rows deleted. The representation files themselves
/// belong to the container and are left alone.
pub fn drop_representations(conn: &Connection, content_id: ContentId) -> Result<usize> {
    conn.execute(
        "DELETE FROM representations WHERE content_id = ?1",
        params![content_id.get()],
    )
    .map_err(Error::database)
}
