//! Representation catalog: the persisted (format, tier) → file map of a
//! container-backed content item, populated from the container on first use.

use std::path::Path;

use imgview_codec::{Codec, Decoded, SrsContainer};
use imgview_common::{ContentId, Error, Result};
use imgview_db::models::Representation;
use imgview_db::queries::representations;
use rusqlite::Connection;

/// Outcome of populating the catalog from a container.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CatalogReport {
    /// Representations newly written to the database.
    pub registered: usize,
    /// Bundled files the manifest names but that are absent on disk.
    pub missing: Vec<std::path::PathBuf>,
}

/// Open `source` and require it to be a container.
pub fn open_container(codec: &dyn Codec, source: &Path) -> Result<SrsContainer> {
    match codec.open(source, None)? {
        Decoded::Container(container) => Ok(container),
        _ => Err(Error::malformed(format!(
            "{} is not a multi-resolution container",
            source.display()
        ))),
    }
}

/// Register every bundled file of `container` that exists on disk.
///
/// Missing files are reported and skipped; the rest are still registered.
pub fn populate_catalog(
    conn: &Connection,
    content_id: ContentId,
    container: &SrsContainer,
) -> Result<CatalogReport> {
    let mut report = CatalogReport::default();

    for level in container.representations() {
        if !level.file_path.is_file() {
            tracing::warn!(
                "Content {}: level {} file missing: {}",
                content_id,
                level.compatibility_level,
                level.file_path.display()
            );
            report.missing.push(level.file_path.clone());
            continue;
        }

        let repr = Representation {
            content_id,
            format: level.format,
            compatibility_level: level.compatibility_level,
            file_path: level.file_path.clone(),
        };
        if representations::register_representation(conn, &repr)? {
            report.registered += 1;
        }
    }

    Ok(report)
}

/// Persisted representations of a content item, parsing its container once
/// when none are stored yet.
///
/// The result is ordered best quality first. A container that yields no
/// usable representation is a [`Error::MalformedContainer`].
pub fn get_or_build_catalog(
    conn: &Connection,
    codec: &dyn Codec,
    content_id: ContentId,
    source: &Path,
) -> Result<Vec<Representation>> {
    let existing = representations::get_representations(conn, content_id)?;
    if !existing.is_empty() {
        return Ok(existing);
    }

    let container = open_container(codec, source)?;
    let report = populate_catalog(conn, content_id, &container)?;
    tracing::info!(
        "Content {}: catalog populated with {} representation(s), {} missing",
        content_id,
        report.registered,
        report.missing.len()
    );

    let populated = representations::get_representations(conn, content_id)?;
    if populated.is_empty() {
        return Err(Error::malformed(format!(
            "{} has no representation present on disk",
            source.display()
        )));
    }
    Ok(populated)
}
