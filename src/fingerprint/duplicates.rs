//! Fingerprint persistence and duplicate lookup.

use imgview_common::{ContentId, Fingerprint, Result};
use imgview_db::models::{ContentItem, DuplicateGroup, FingerprintRecord};
use imgview_db::queries::{content, fingerprints};
use rusqlite::Connection;
use serde::Serialize;

/// A content item sharing a fingerprint bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub item: ContentItem,
    pub alternate_version: bool,
}

/// Store a fingerprint for `content_id` unless one already exists.
///
/// `compute` only runs when no fingerprint is stored. Returns whether a new
/// fingerprint was written.
pub fn ensure_fingerprint<F>(conn: &Connection, content_id: ContentId, compute: F) -> Result<bool>
where
    F: FnOnce() -> Result<Fingerprint>,
{
    if fingerprints::get_fingerprint(conn, content_id)?.is_some() {
        return Ok(false);
    }

    let record = FingerprintRecord {
        content_id,
        fingerprint: compute()?,
    };
    let inserted = fingerprints::insert_fingerprint_if_absent(conn, &record)?;
    if inserted {
        tracing::info!("Stored fingerprint for content {}", content_id);
    }
    Ok(inserted)
}

/// Items whose fingerprint equals `fingerprint`, plus items linked to them
/// as alternate versions.
pub fn find_candidates(conn: &Connection, fingerprint: &Fingerprint) -> Result<Vec<Candidate>> {
    fingerprints::find_content_by_fingerprint(conn, fingerprint)?
        .into_iter()
        .map(|candidate| {
            Ok(Candidate {
                item: content::require_content(conn, candidate.content_id)?,
                alternate_version: candidate.alternate_version,
            })
        })
        .collect()
}

/// Every fingerprint bucket holding more than one item.
pub fn find_duplicate_groups(conn: &Connection, show_alternates: bool) -> Result<Vec<DuplicateGroup>> {
    let groups = fingerprints::find_duplicate_groups(conn, show_alternates)?;
    tracing::debug!("Found {} duplicate group(s)", groups.len());
    Ok(groups)
}
