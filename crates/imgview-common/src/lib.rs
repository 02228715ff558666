//! Imgview-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across imgview:
//!
//! - **Typed IDs**: `ContentId` wrapper for media library content rows
//! - **Core Types**: media kinds, encoding formats and compatibility tiers
//! - **Path Utilities**: Functions to classify files by extension
//! - **Error Handling**: The unified error taxonomy and result alias
//!
//! # Examples
//!
//! ```
//! use imgview_common::{CompatibilityTier, ContentId, EncodingFormat, Error, Result};
//! use imgview_common::paths::is_container_file;
//! use std::path::Path;
//!
//! let content_id = ContentId::from(42);
//! assert_eq!(content_id.to_string(), "42");
//!
//! let format: EncodingFormat = "webp".parse().unwrap();
//! assert!(CompatibilityTier::new(3).unwrap().accepts(CompatibilityTier::BASELINE));
//! assert_eq!(format.mime_type(), "image/webp");
//!
//! assert!(is_container_file(Path::new("picture.srs")));
//!
//! fn example(content_id: ContentId) -> Result<()> {
//!     Err(Error::not_found("content", content_id))
//! }
//! ```

pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
