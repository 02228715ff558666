//! Delivery service coordinating the negotiator, the catalog, the thumbnail
//! cache and the codec for content stored in the library.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::imageops::FilterType;
use image::DynamicImage;
use imgview_codec::{Codec, Decoded, DecodedImage, NativeCodec};
use imgview_common::paths::{is_container_file, is_hashable_image};
use imgview_common::{
    CompatibilityTier, ContentId, EncodingFormat, Error, Fingerprint, RequestedFormat, Result,
};
use imgview_db::models::{ContentItem, DuplicateGroup, Origin, Representation};
use imgview_db::pool::{get_conn, DbPool, PooledConnection};
use imgview_db::queries::{content, fingerprints, representations, thumbnails};
use serde::Serialize;

use super::catalog::{get_or_build_catalog, open_container};
use super::negotiate::{
    is_directly_servable, select_by_tier_and_format, select_for_thumbnail, select_for_transcode,
    RepresentationChoice, ThumbnailDecision, ThumbnailRequest, TranscodeDecision,
};
use super::thumbnails::ThumbnailCache;
use crate::config::Config;
use crate::fingerprint::{self, Candidate, ComparedItem, DuplicateComparison};

/// What the caller should hand back to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Point the client at an existing file.
    Redirect(PathBuf),
    /// Send an existing file's bytes.
    File {
        path: PathBuf,
        format: Option<EncodingFormat>,
    },
    /// Send freshly encoded bytes.
    Bytes {
        data: Vec<u8>,
        format: EncodingFormat,
    },
}

/// A byte-exact download and the file name to suggest for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub delivery: Delivery,
    pub filename: String,
}

/// Per-item outcome of [`DeliveryService::fingerprint_content`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FingerprintOutcome {
    pub content_id: ContentId,
    pub fingerprint: Option<Fingerprint>,
    /// A fingerprint was computed by this call.
    pub computed: bool,
}

/// Serves library content: thumbnails, transcodes, downloads and duplicate
/// comparisons.
pub struct DeliveryService {
    pool: DbPool,
    codec: Arc<dyn Codec>,
    root_dir: PathBuf,
    thumbnails: Option<ThumbnailCache>,
}

impl DeliveryService {
    /// Create a new `DeliveryService`.
    ///
    /// Without a thumbnail cache every thumbnail is rendered on demand.
    pub fn new(
        pool: DbPool,
        codec: Arc<dyn Codec>,
        root_dir: impl Into<PathBuf>,
        thumbnails: Option<ThumbnailCache>,
    ) -> Self {
        Self {
            pool,
            codec,
            root_dir: root_dir.into(),
            thumbnails,
        }
    }

    /// Build a service with the native codec from configuration.
    pub fn from_config(config: &Config, pool: DbPool) -> Self {
        let codec = NativeCodec::new(config.delivery.encoder_settings(), config.tools.clone());
        Self::new(
            pool,
            Arc::new(codec),
            config.library.root_dir.clone(),
            config.cache.thumbnail_dir.clone().map(ThumbnailCache::new),
        )
    }

    pub fn thumbnail_cache(&self) -> Option<&ThumbnailCache> {
        self.thumbnails.as_ref()
    }

    fn conn(&self) -> Result<PooledConnection> {
        get_conn(&self.pool)
    }

    fn source_path(&self, item: &ContentItem) -> PathBuf {
        self.root_dir.join(&item.file_path)
    }

    /// Decode a file down to one still image.
    fn load_pixels(&self, path: &Path, target_size: Option<(u32, u32)>) -> Result<DecodedImage> {
        match self.codec.open(path, target_size)? {
            Decoded::Plain(image) => Ok(image),
            Decoded::Frames(frames) => Ok(frames.next_frame()?),
            Decoded::Container(_) => Err(Error::malformed(format!(
                "{} points at another container",
                path.display()
            ))),
        }
    }

    /// Full-fidelity pixels of an item: the best quality representation of a
    /// container, the file itself otherwise.
    fn full_pixels(&self, conn: &PooledConnection, item: &ContentItem) -> Result<DecodedImage> {
        let source = self.source_path(item);
        if !is_container_file(&source) {
            return self.load_pixels(&source, None);
        }

        let reprs = get_or_build_catalog(conn, self.codec.as_ref(), item.id, &source)?;
        let best = reprs
            .iter()
            .find(|repr| repr.format.is_image())
            .ok_or_else(|| Error::malformed(format!("{} has no image level", source.display())))?;
        self.load_pixels(&best.file_path, None)
    }

    /// Thumbnail of a content item.
    ///
    /// A cached thumbnail is served without touching the codec. Otherwise the
    /// negotiator may redirect to an existing file; failing that, the source
    /// is decoded, fitted inside the bounds, encoded and cached.
    pub fn thumbnail(&self, content_id: ContentId, request: &ThumbnailRequest) -> Result<Delivery> {
        validate_bounds(request)?;
        let conn = self.conn()?;

        if let Some(cache) = &self.thumbnails {
            if let Some(path) = cache.get_cached_thumbnail(
                &conn,
                content_id,
                request.width,
                request.height,
                request.format,
            )? {
                return Ok(Delivery::File {
                    path,
                    format: Some(request.format),
                });
            }
        }

        let item = content::require_content(&conn, content_id)?;
        let source = self.source_path(&item);

        let decoded = if is_container_file(&source) {
            let reprs = get_or_build_catalog(&conn, self.codec.as_ref(), item.id, &source)?;
            match select_by_tier_and_format(&reprs, request.tier, request.format, request.allow_origin)? {
                RepresentationChoice::Redirect(repr) => {
                    tracing::debug!(
                        "Content {}: redirecting to tier {} {}",
                        content_id,
                        repr.compatibility_level,
                        repr.format
                    );
                    return Ok(Delivery::Redirect(repr.file_path));
                }
                RepresentationChoice::ReconstructJpeg(repr) => {
                    tracing::debug!(
                        "Content {}: serving JPEG reconstructed from tier {} {}",
                        content_id,
                        repr.compatibility_level,
                        repr.format
                    );
                    return Ok(Delivery::Bytes {
                        data: self.codec.reconstruct_jpeg(&repr.file_path)?,
                        format: EncodingFormat::Jpeg,
                    });
                }
                RepresentationChoice::Decode(_) => {}
            }

            let container = open_container(self.codec.as_ref(), &source)?;
            match select_for_thumbnail(self.codec.as_ref(), &container, request)? {
                ThumbnailDecision::Redirect(path) => return Ok(Delivery::Redirect(path)),
                ThumbnailDecision::Decode(path) => {
                    self.load_pixels(&path, Some((request.width, request.height)))?
                }
            }
        } else {
            let hashable = is_hashable_image(item.media_kind, &source);
            let needs_fingerprint =
                hashable && fingerprints::get_fingerprint(&conn, content_id)?.is_none();
            // full decode when the pixels are about to be fingerprinted
            let target = (!needs_fingerprint).then_some((request.width, request.height));
            let decoded = self.load_pixels(&source, target)?;

            if needs_fingerprint {
                if let Err(e) = fingerprint::ensure_fingerprint(&conn, content_id, || {
                    Ok(fingerprint::fingerprint(&decoded.image))
                }) {
                    tracing::warn!("Content {}: fingerprinting failed: {}", content_id, e);
                }
            }

            if self.can_redirect_to_source(&source, &decoded, request) {
                tracing::debug!("Content {}: source already satisfies request", content_id);
                return Ok(Delivery::Redirect(source));
            }
            decoded
        };

        let data = self.render(decoded.image, request)?;

        if let Some(cache) = &self.thumbnails {
            if let Err(e) = cache.register_thumbnail(
                &conn,
                content_id,
                request.width,
                request.height,
                request.format,
                &data,
            ) {
                tracing::warn!("Content {}: serving uncached thumbnail: {}", content_id, e);
            }
        }

        Ok(Delivery::Bytes {
            data,
            format: request.format,
        })
    }

    /// Thumbnail of a library file that has no content row, e.g. from a
    /// directory listing. Nothing is cached.
    pub fn thumbnail_file(&self, path: &Path, request: &ThumbnailRequest) -> Result<Delivery> {
        validate_bounds(request)?;
        let target = Some((request.width, request.height));

        let decoded = match self.codec.open(path, target)? {
            Decoded::Container(container) => {
                match select_for_thumbnail(self.codec.as_ref(), &container, request)? {
                    ThumbnailDecision::Redirect(lod) => return Ok(Delivery::Redirect(lod)),
                    ThumbnailDecision::Decode(lod) => self.load_pixels(&lod, target)?,
                }
            }
            Decoded::Frames(frames) => frames.next_frame()?,
            Decoded::Plain(decoded) => {
                if self.can_redirect_to_source(path, &decoded, request) {
                    return Ok(Delivery::Redirect(path.to_path_buf()));
                }
                decoded
            }
        };

        Ok(Delivery::Bytes {
            data: self.render(decoded.image, request)?,
            format: request.format,
        })
    }

    /// The decoded source can be handed out unchanged.
    fn can_redirect_to_source(
        &self,
        source: &Path,
        decoded: &DecodedImage,
        request: &ThumbnailRequest,
    ) -> bool {
        if !request.allow_origin || decoded.format != Some(request.format) {
            return false;
        }
        (decoded.animated || decoded.fits_within(request.width, request.height))
            && is_directly_servable(self.codec.as_ref(), source, request.format)
    }

    /// Fit inside the bounds without upscaling, flatten to RGBA and encode.
    fn render(&self, image: DynamicImage, request: &ThumbnailRequest) -> Result<Vec<u8>> {
        let image = if image.width() > request.width || image.height() > request.height {
            image.resize(request.width, request.height, FilterType::Lanczos3)
        } else {
            image
        };
        let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
        Ok(self.codec.encode(&rgba, request.format)?)
    }

    /// Serve a content item in `requested` format for a client at `tier`.
    ///
    /// With `download` set, a stored file already in the output format is
    /// sent verbatim instead of redirected to.
    pub fn transcode(
        &self,
        content_id: ContentId,
        requested: RequestedFormat,
        tier: CompatibilityTier,
        download: bool,
    ) -> Result<Delivery> {
        let conn = self.conn()?;
        let item = content::require_content(&conn, content_id)?;
        let source = self.source_path(&item);
        let output = requested.output_format(tier);

        if !is_container_file(&source) {
            return self.transcode_file(&source, requested, tier, download);
        }

        let container = open_container(self.codec.as_ref(), &source)?;
        match select_for_transcode(self.codec.as_ref(), &container, requested, tier, download)? {
            TranscodeDecision::Redirect(path) => Ok(Delivery::Redirect(path)),
            TranscodeDecision::Stream { path, format } => Ok(Delivery::File {
                path,
                format: Some(format),
            }),
            TranscodeDecision::ReconstructJpeg(path) => Ok(Delivery::Bytes {
                data: self.codec.reconstruct_jpeg(&path)?,
                format: EncodingFormat::Jpeg,
            }),
            TranscodeDecision::Decode(path) => {
                let detected = self.probe_format(&path);
                self.reencode(&path, detected, output)
            }
        }
    }

    /// Transcode a plain file.
    pub fn transcode_file(
        &self,
        path: &Path,
        requested: RequestedFormat,
        tier: CompatibilityTier,
        download: bool,
    ) -> Result<Delivery> {
        let detected = self.probe_format(path);
        if let Some(format) = detected {
            if requested.candidate_formats(tier).contains(&format)
                && is_directly_servable(self.codec.as_ref(), path, format)
            {
                return Ok(if download {
                    Delivery::File {
                        path: path.to_path_buf(),
                        format: Some(format),
                    }
                } else {
                    Delivery::Redirect(path.to_path_buf())
                });
            }
        }
        self.reencode(path, detected, requested.output_format(tier))
    }

    fn probe_format(&self, path: &Path) -> Option<EncodingFormat> {
        self.codec.detect_format(path).unwrap_or_else(|e| {
            tracing::debug!("Format probe failed for {}: {}", path.display(), e);
            None
        })
    }

    /// Produce `output` from a file, losslessly where the pair allows it.
    fn reencode(
        &self,
        path: &Path,
        detected: Option<EncodingFormat>,
        output: EncodingFormat,
    ) -> Result<Delivery> {
        let data = match (detected, output) {
            (Some(EncodingFormat::Jpeg), EncodingFormat::Jpeg) => self.codec.lossless_jpeg(path)?,
            (Some(EncodingFormat::Jxl), EncodingFormat::Jpeg) => self.codec.reconstruct_jpeg(path)?,
            _ => {
                let decoded = self.load_pixels(path, None)?;
                let rgba = DynamicImage::ImageRgba8(decoded.image.to_rgba8());
                self.codec.encode(&rgba, output)?
            }
        };
        Ok(Delivery::Bytes {
            data,
            format: output,
        })
    }

    /// Byte-exact download of a content item.
    ///
    /// Containers serve their most compatible representation; a JPEG XL
    /// representation at tier 2 holds a recompressed JPEG and is reconstructed.
    pub fn download(&self, content_id: ContentId) -> Result<Download> {
        let conn = self.conn()?;
        let item = content::require_content(&conn, content_id)?;
        let source = self.source_path(&item);

        let delivery = if is_container_file(&source) {
            let reprs = get_or_build_catalog(&conn, self.codec.as_ref(), item.id, &source)?;
            let repr = reprs
                .iter()
                .filter(|repr| repr.format.is_image())
                .max_by_key(|repr| repr.compatibility_level)
                .ok_or_else(|| Error::malformed(format!("{} has no image level", source.display())))?;

            if repr.format == EncodingFormat::Jxl && repr.compatibility_level.level() == 2 {
                Delivery::Bytes {
                    data: self.codec.reconstruct_jpeg(&repr.file_path)?,
                    format: EncodingFormat::Jpeg,
                }
            } else {
                Delivery::File {
                    path: repr.file_path.clone(),
                    format: Some(repr.format),
                }
            }
        } else {
            match self.probe_format(&source) {
                Some(EncodingFormat::Jxl) => Delivery::Bytes {
                    data: self.codec.reconstruct_jpeg(&source)?,
                    format: EncodingFormat::Jpeg,
                },
                format => Delivery::File {
                    path: source.clone(),
                    format,
                },
            }
        };

        let extension = match &delivery {
            Delivery::Bytes { format, .. } | Delivery::File { format: Some(format), .. } => {
                format.extension().to_string()
            }
            Delivery::File { path, .. } | Delivery::Redirect(path) => path
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or("bin")
                .to_string(),
        };

        Ok(Download {
            filename: download_filename(&item, &extension),
            delivery,
        })
    }

    /// Persisted representations of a content item, building the catalog on
    /// first access.
    pub fn representations(&self, content_id: ContentId) -> Result<Vec<Representation>> {
        let conn = self.conn()?;
        let item = content::require_content(&conn, content_id)?;
        let source = self.source_path(&item);
        if !is_container_file(&source) {
            return Ok(Vec::new());
        }
        get_or_build_catalog(&conn, self.codec.as_ref(), item.id, &source)
    }

    /// Compute and store the fingerprint of a content item unless it has one.
    ///
    /// Items that are not raster images get no fingerprint.
    pub fn fingerprint_content(&self, content_id: ContentId) -> Result<FingerprintOutcome> {
        let conn = self.conn()?;
        let item = content::require_content(&conn, content_id)?;
        let source = self.source_path(&item);

        if !is_hashable_image(item.media_kind, &source) {
            tracing::debug!("Content {} is not a raster image", content_id);
            return Ok(FingerprintOutcome {
                content_id,
                fingerprint: None,
                computed: false,
            });
        }

        let computed = fingerprint::ensure_fingerprint(&conn, content_id, || {
            Ok(fingerprint::fingerprint(&self.full_pixels(&conn, &item)?.image))
        })?;

        Ok(FingerprintOutcome {
            content_id,
            fingerprint: fingerprints::get_fingerprint(&conn, content_id)?,
            computed,
        })
    }

    /// Items sharing the fingerprint bucket of `content_id`, the item itself
    /// included.
    pub fn find_candidates(&self, content_id: ContentId) -> Result<Vec<Candidate>> {
        let outcome = self.fingerprint_content(content_id)?;
        let Some(fingerprint) = outcome.fingerprint else {
            return Ok(Vec::new());
        };
        let conn = self.conn()?;
        fingerprint::find_candidates(&conn, &fingerprint)
    }

    pub fn duplicate_groups(&self, show_alternates: bool) -> Result<Vec<DuplicateGroup>> {
        let conn = self.conn()?;
        fingerprint::find_duplicate_groups(&conn, show_alternates)
    }

    /// Compare every pair of the given items, in order.
    pub fn compare_content(&self, content_ids: &[ContentId]) -> Result<Vec<DuplicateComparison>> {
        let conn = self.conn()?;
        let mut loaded = Vec::with_capacity(content_ids.len());
        for &id in content_ids {
            let item = content::require_content(&conn, id)?;
            let image = self.full_pixels(&conn, &item)?.image;
            loaded.push((item, image));
        }

        let mut results = Vec::new();
        for (i, (first, first_image)) in loaded.iter().enumerate() {
            for (second, second_image) in &loaded[i + 1..] {
                results.push(fingerprint::compare(
                    ComparedItem {
                        item: first,
                        image: first_image,
                    },
                    ComparedItem {
                        item: second,
                        image: second_image,
                    },
                ));
            }
        }
        Ok(results)
    }

    /// Remove all cached thumbnails of an item. Returns the number dropped.
    pub fn drop_thumbnails(&self, content_id: ContentId) -> Result<usize> {
        let conn = self.conn()?;
        match &self.thumbnails {
            Some(cache) => cache.drop_thumbnails(&conn, content_id),
            None => Ok(thumbnails::drop_thumbnails(&conn, content_id)?.len()),
        }
    }

    /// Forget the representation catalog of an item so the next access
    /// re-reads its container.
    pub fn drop_representations(&self, content_id: ContentId) -> Result<usize> {
        let conn = self.conn()?;
        let dropped = representations::drop_representations(&conn, content_id)?;
        tracing::info!("Dropped {} representation(s) for content {}", dropped, content_id);
        Ok(dropped)
    }

    /// Link two items as curated alternate versions of each other.
    pub fn mark_alternate(&self, first: ContentId, second: ContentId) -> Result<()> {
        let conn = self.conn()?;
        content::mark_alternate_version(&conn, first, second)
    }
}

fn validate_bounds(request: &ThumbnailRequest) -> Result<()> {
    if request.width == 0 || request.height == 0 {
        return Err(Error::validation(format!(
            "thumbnail bounds must be positive, got {}x{}",
            request.width, request.height
        )));
    }
    if !request.format.is_image() {
        return Err(Error::validation(format!(
            "{} is not an image format",
            request.format
        )));
    }
    Ok(())
}

/// Suggested file name for a download: `{title} {origin}{origin_id}.{ext}`,
/// with `mlid{id}` standing in when the item has no external id.
pub fn download_filename(item: &ContentItem, extension: &str) -> String {
    let prefix = match &item.origin {
        Some(Origin {
            name,
            external_id: Some(external_id),
        }) => format!("{name}{external_id}"),
        _ => format!("mlid{}", item.id),
    };

    let stem = match item.title.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => format!("{title} {prefix}"),
        _ => prefix,
    };

    let safe: String = stem
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    format!("{safe}.{extension}")
}
