//! Single-slot request caches, built once at startup and shared by handle.

pub mod listing;
pub mod single_slot;
pub mod tag_count;

pub use listing::{list_directory, DirectoryListingCache, ListingEntry};
pub use single_slot::SingleSlot;
pub use tag_count::{page_count, TagCountCache, TagCountState};

/// The process-wide request caches.
#[derive(Debug, Default)]
pub struct RequestCaches {
    pub listing: DirectoryListingCache,
    pub tag_count: TagCountCache,
}

impl RequestCaches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything, e.g. after the library changed on disk.
    pub fn invalidate_all(&self) {
        self.listing.invalidate();
        self.tag_count.invalidate();
    }
}
