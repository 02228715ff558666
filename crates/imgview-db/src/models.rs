//! Internal Rust models matching the database schema.
//!
//! Paths are stored as given by the caller: content file paths relative to the
//! media root, representation paths as resolved from the container manifest,
//! thumbnail paths relative to the thumbnail cache directory.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use imgview_common::{CompatibilityTier, ContentId, EncodingFormat, Fingerprint, MediaKind};
use serde::{Deserialize, Serialize};

/// External source a content item was collected from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Origin {
    /// Source name, e.g. a site or archive.
    pub name: String,
    /// Identifier of the item at that source, when known.
    pub external_id: Option<String>,
}

/// Media library content item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    pub id: ContentId,
    pub file_path: String,
    pub media_kind: MediaKind,
    pub title: Option<String>,
    pub hidden: bool,
    pub description: Option<String>,
    pub added_at: DateTime<Utc>,
    pub origin: Option<Origin>,
    /// Curated link to another item this one is an intentional variant of.
    pub alternate_of: Option<ContentId>,
}

impl ContentItem {
    /// Whether the item takes part in an alternate-version relation.
    pub fn is_alternate_version(&self) -> bool {
        self.alternate_of.is_some()
    }
}

/// Data needed to register a new content item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewContent {
    pub file_path: String,
    pub media_kind: MediaKind,
    pub title: Option<String>,
    pub description: Option<String>,
    pub origin: Option<Origin>,
    /// Defaults to the insertion time when `None`.
    pub added_at: Option<DateTime<Utc>>,
}

impl NewContent {
    pub fn new(file_path: impl Into<String>, media_kind: MediaKind) -> Self {
        Self {
            file_path: file_path.into(),
            media_kind,
            title: None,
            description: None,
            origin: None,
            added_at: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_origin(mut self, name: impl Into<String>, external_id: Option<String>) -> Self {
        self.origin = Some(Origin {
            name: name.into(),
            external_id,
        });
        self
    }

    pub fn with_added_at(mut self, added_at: DateTime<Utc>) -> Self {
        self.added_at = Some(added_at);
        self
    }
}

/// An independently stored, fully encoded copy of a content item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Representation {
    pub content_id: ContentId,
    pub format: EncodingFormat,
    pub compatibility_level: CompatibilityTier,
    pub file_path: PathBuf,
}

/// A rendered thumbnail registered in the cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThumbnailEntry {
    pub content_id: ContentId,
    pub width: u32,
    pub height: u32,
    pub format: EncodingFormat,
    /// Relative to the thumbnail cache directory.
    pub file_path: String,
}

/// Stored fingerprint of a content item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FingerprintRecord {
    pub content_id: ContentId,
    pub fingerprint: Fingerprint,
}

/// A content item returned by a fingerprint lookup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FingerprintCandidate {
    pub content_id: ContentId,
    /// The item is marked as an alternate version of some other item.
    pub alternate_version: bool,
}

/// A fingerprint bucket holding more than one content item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DuplicateGroup {
    pub fingerprint: Fingerprint,
    pub members: Vec<FingerprintCandidate>,
}
