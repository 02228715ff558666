//! Memoized result count of the tag search.
//!
//! Paging through results repeats the same count query with the same filter;
//! only the first page pays for it.

use parking_lot::Mutex;

/// Tag ids grouped as the search takes them: every group must match.
pub type TagGroups = Vec<Vec<i64>>;

/// What the cache currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TagCountState {
    #[default]
    Empty,
    /// Count of all items, unfiltered by tags.
    Total { hidden: bool, count: u64 },
    /// Count for a tag filter.
    Tags {
        groups: TagGroups,
        hidden: bool,
        count: u64,
    },
}

impl TagCountState {
    fn lookup(&self, groups: &[Vec<i64>], hidden: bool) -> Option<u64> {
        match self {
            Self::Total { hidden: h, count } if groups.is_empty() && *h == hidden => Some(*count),
            Self::Tags {
                groups: g,
                hidden: h,
                count,
            } if !groups.is_empty() && g == groups && *h == hidden => Some(*count),
            _ => None,
        }
    }

    fn for_key(groups: &[Vec<i64>], hidden: bool, count: u64) -> Self {
        if groups.is_empty() {
            Self::Total { hidden, count }
        } else {
            Self::Tags {
                groups: groups.to_vec(),
                hidden,
                count,
            }
        }
    }
}

/// Single-slot cache over [`TagCountState`].
#[derive(Debug, Default)]
pub struct TagCountCache {
    state: Mutex<TagCountState>,
}

impl TagCountCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result count for `groups` (empty for "all items") with the given
    /// hidden-item filter. `query` runs only when the cached key differs.
    pub fn count<E, F>(&self, groups: &[Vec<i64>], hidden: bool, query: F) -> Result<u64, E>
    where
        F: FnOnce() -> Result<u64, E>,
    {
        if let Some(count) = self.state.lock().lookup(groups, hidden) {
            return Ok(count);
        }

        let count = query()?;
        tracing::debug!("Tag count recomputed: {} for {} group(s)", count, groups.len());
        *self.state.lock() = TagCountState::for_key(groups, hidden, count);
        Ok(count)
    }

    pub fn state(&self) -> TagCountState {
        self.state.lock().clone()
    }

    pub fn invalidate(&self) {
        *self.state.lock() = TagCountState::Empty;
    }
}

/// Number of pages needed for `count` items.
pub fn page_count(count: u64, per_page: u32) -> u64 {
    if per_page == 0 {
        return 0;
    }
    count.div_ceil(u64::from(per_page))
}
