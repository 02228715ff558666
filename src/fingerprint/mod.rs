//! Perceptual fingerprints and duplicate detection.
//!
//! - [`hash`] computes a [`Fingerprint`](imgview_common::Fingerprint) from pixels
//! - [`duplicates`] persists fingerprints at most once and looks up buckets
//! - [`compare`] scores a pair of items from the same bucket

pub mod compare;
pub mod duplicates;
pub mod hash;

pub use compare::{compare, difference_score, ComparedItem, DuplicateComparison};
pub use duplicates::{ensure_fingerprint, find_candidates, find_duplicate_groups, Candidate};
pub use hash::fingerprint;
