//! Database query modules.
//!
//! This module organizes all database operations into logical groups:
//! - content: content item CRUD, hiding and alternate-version marking
//! - representations: pre-encoded representation catalog
//! - thumbnails: rendered thumbnail cache rows
//! - fingerprints: perceptual fingerprints and duplicate lookup

pub mod content;
pub mod fingerprints;
pub mod representations;
pub mod thumbnails;

/// Build the error rusqlite expects when a stored column cannot be converted.
pub(crate) fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        message.into(),
    )
}
