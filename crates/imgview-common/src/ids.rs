//! Typed ID wrappers.
//!
//! Content rows are keyed by SQLite integer ids; wrapping them keeps a content
//! id from being mixed up with a width, a tier or a tag id.

use serde::{Deserialize, Serialize};

/// Unique identifier for a media library content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(i64);

impl ContentId {
    /// The raw database value.
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for ContentId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<ContentId> for i64 {
    fn from(id: ContentId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ContentId {
    type Err = std::num::ParseIntError;

    /// Accepts both the bare number and the `mlid` prefixed form used in links.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("mlid").unwrap_or(s).parse().map(Self)
    }
}
