//! Fingerprint storage and near-duplicate lookup.
//!
//! The 64-bit value hash is stored bit-for-bit in SQLite's signed INTEGER
//! column.

use std::collections::BTreeMap;

use imgview_common::{ContentId, Error, Fingerprint, Result};
use rusqlite::{named_params, params, Connection, OptionalExtension};

use super::conversion_error;
use crate::models::{DuplicateGroup, FingerprintCandidate, FingerprintRecord};

fn parse_fingerprint(row: &rusqlite::Row, offset: usize) -> rusqlite::Result<Fingerprint> {
    let hue: i64 = row.get(offset + 2)?;
    let saturation: i64 = row.get(offset + 3)?;
    Ok(Fingerprint {
        aspect_ratio: row.get(offset)?,
        value_hash: row.get::<_, i64>(offset + 1)? as u64,
        hue_hash: u16::try_from(hue)
            .map_err(|e| conversion_error(offset + 2, e.to_string()))?,
        saturation_hash: u16::try_from(saturation)
            .map_err(|e| conversion_error(offset + 3, e.to_string()))?,
    })
}

/// Get the stored fingerprint of a content item.
pub fn get_fingerprint(conn: &Connection, content_id: ContentId) -> Result<Option<Fingerprint>> {
    conn.query_row(
        "SELECT aspect_ratio, value_hash, hue_hash, saturation_hash
         FROM fingerprints WHERE content_id = ?1",
        params![content_id.get()],
        |row| parse_fingerprint(row, 0),
    )
    .optional()
    .map_err(Error::database)
}

/// Store a fingerprint unless the item already has one.
///
/// Returns `true` if this call wrote the row. A fingerprint is never
/// overwritten, so concurrent writers end up with exactly one row.
pub fn insert_fingerprint_if_absent(conn: &Connection, record: &FingerprintRecord) -> Result<bool> {
    let fp = &record.fingerprint;
    let affected = conn
        .execute(
            "INSERT OR IGNORE INTO fingerprints
                (content_id, aspect_ratio, value_hash, hue_hash, saturation_hash)
             VALUES (:content_id, :aspect_ratio, :value_hash, :hue_hash, :saturation_hash)",
            named_params! {
                ":content_id": record.content_id.get(),
                ":aspect_ratio": fp.aspect_ratio,
                ":value_hash": fp.value_hash as i64,
                ":hue_hash": fp.hue_hash,
                ":saturation_hash": fp.saturation_hash,
            },
        )
        .map_err(Error::database)?;
    Ok(affected > 0)
}

/// Find every item whose fingerprint equals `fingerprint` exactly.
///
/// Items explicitly linked as alternate versions to a match are included even
/// when their own fingerprint differs. Each candidate reports whether it takes
/// part in an alternate-version relation.
pub fn find_content_by_fingerprint(
    conn: &Connection,
    fingerprint: &Fingerprint,
) -> Result<Vec<FingerprintCandidate>> {
    let mut stmt = conn
        .prepare(
            "WITH matches AS (
                SELECT content_id FROM fingerprints
                WHERE value_hash = :value_hash
                  AND hue_hash = :hue_hash
                  AND saturation_hash = :saturation_hash
                  AND aspect_ratio = :aspect_ratio
             )
             SELECT c.id, c.alternate_of IS NOT NULL
             FROM content c
             WHERE c.id IN (SELECT content_id FROM matches)
                OR c.alternate_of IN (SELECT content_id FROM matches)
             ORDER BY c.id",
        )
        .map_err(Error::database)?;

    let rows = stmt
        .query_map(
            named_params! {
                ":value_hash": fingerprint.value_hash as i64,
                ":hue_hash": fingerprint.hue_hash,
                ":saturation_hash": fingerprint.saturation_hash,
                ":aspect_ratio": fingerprint.aspect_ratio,
            },
            |row| {
                Ok(FingerprintCandidate {
                    content_id: ContentId::from(row.get::<_, i64>(0)?),
                    alternate_version: row.get(1)?,
                })
            },
        )
        .map_err(Error::database)?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Error::database)
}

/// List every fingerprint bucket holding more than one item.
///
/// With `show_alternates` unset, buckets made up only of alternate versions
/// are left out.
pub fn find_duplicate_groups(conn: &Connection, show_alternates: bool) -> Result<Vec<DuplicateGroup>> {
    let mut stmt = conn
        .prepare(
            "SELECT f.content_id, c.alternate_of IS NOT NULL,
                    f.aspect_ratio, f.value_hash, f.hue_hash, f.saturation_hash
             FROM fingerprints f
             JOIN content c ON c.id = f.content_id
             WHERE (f.value_hash, f.hue_hash, f.saturation_hash, f.aspect_ratio) IN (
                SELECT value_hash, hue_hash, saturation_hash, aspect_ratio
                FROM fingerprints
                GROUP BY value_hash, hue_hash, saturation_hash, aspect_ratio
                HAVING COUNT(*) > 1
             )
             ORDER BY f.value_hash, f.hue_hash, f.saturation_hash, f.aspect_ratio, f.content_id",
        )
        .map_err(Error::database)?;

    let rows = stmt
        .query_map([], |row| {
            let candidate = FingerprintCandidate {
                content_id: ContentId::from(row.get::<_, i64>(0)?),
                alternate_version: row.get(1)?,
            };
            Ok((parse_fingerprint(row, 2)?, candidate))
        })
        .map_err(Error::database)?;

    // Raw bit patterns, so aspect ratios compare exactly.
    let mut groups: BTreeMap<(u64, u32, u64), DuplicateGroup> = BTreeMap::new();
    for row in rows {
        let (fingerprint, candidate) = row.map_err(Error::database)?;
        let key = (
            fingerprint.value_hash,
            fingerprint.hue_saturation_hash(),
            fingerprint.aspect_ratio.to_bits(),
        );
        groups
            .entry(key)
            .or_insert_with(|| DuplicateGroup {
                fingerprint,
                members: Vec::new(),
            })
            .members
            .push(candidate);
    }

    Ok(groups
        .into_values()
        .filter(|group| show_alternates || !group.members.iter().all(|m| m.alternate_version))
        .collect())
}
