//! Media delivery: deciding which stored bytes answer a request.
//!
//! - [`negotiate`] picks a LOD or representation for a client tier and format
//! - [`catalog`] persists the representations of container-backed items
//! - [`thumbnails`] keeps rendered thumbnails on disk
//! - [`service`] ties these together for content in the library

pub mod catalog;
pub mod etag;
pub mod negotiate;
pub mod service;
pub mod thumbnails;

pub use catalog::{get_or_build_catalog, CatalogReport};
pub use etag::{is_not_modified, source_etag};
pub use negotiate::{
    select_by_tier_and_format, select_for_thumbnail, select_for_transcode, RepresentationChoice,
    ThumbnailDecision, ThumbnailRequest, TranscodeDecision,
};
pub use service::{download_filename, Delivery, DeliveryService, Download, FingerprintOutcome};
pub use thumbnails::ThumbnailCache;
