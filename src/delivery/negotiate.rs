//! Compatibility negotiation.
//!
//! Decides, for a request, which stored file satisfies it: a redirect to an
//! existing file, a verbatim stream, or a candidate that has to be decoded and
//! re-encoded. Nothing here encodes; the functions only look at formats and
//! dimensions through the [`Codec`].

use std::path::{Path, PathBuf};

use imgview_codec::{Codec, SrsContainer};
use imgview_common::{CompatibilityTier, EncodingFormat, Error, RequestedFormat, Result};
use imgview_db::models::Representation;

/// A thumbnail request as seen by the negotiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailRequest {
    pub width: u32,
    pub height: u32,
    pub format: EncodingFormat,
    pub tier: CompatibilityTier,
    /// The client accepts being redirected to an unmodified file.
    pub allow_origin: bool,
}

/// Outcome of a LOD walk for a thumbnail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailDecision {
    /// Hand the client this file as is.
    Redirect(PathBuf),
    /// Decode this file and render the thumbnail from it.
    Decode(PathBuf),
}

/// Outcome of a LOD walk for a transcode or download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscodeDecision {
    Redirect(PathBuf),
    /// Send the file's bytes verbatim (byte-exact download).
    Stream { path: PathBuf, format: EncodingFormat },
    /// The JPEG stored inside a JPEG XL file can be recovered losslessly.
    ReconstructJpeg(PathBuf),
    Decode(PathBuf),
}

/// Outcome of picking from an explicit representation set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepresentationChoice {
    Redirect(Representation),
    /// Serve the JPEG a JPEG XL representation was losslessly made from.
    ReconstructJpeg(Representation),
    Decode(Representation),
}

fn non_empty_lods(container: &SrsContainer) -> Result<&[PathBuf]> {
    let lods = container.progressive_lods();
    if lods.is_empty() {
        return Err(Error::malformed(format!(
            "{} has no LODs",
            container.manifest_path().display()
        )));
    }
    Ok(lods)
}

/// Native format of a candidate, treating a probe failure as "unknown".
///
/// An unknown format never matches, so the candidate gets decoded instead of
/// redirected to.
fn probe_format(codec: &dyn Codec, path: &Path) -> Option<EncodingFormat> {
    match codec.detect_format(path) {
        Ok(format) => format,
        Err(e) => {
            tracing::debug!("Format probe failed for {}: {}", path.display(), e);
            None
        }
    }
}

/// Whether browsers can show the file as is. Arithmetic-coded JPEGs cannot.
pub(crate) fn is_directly_servable(codec: &dyn Codec, path: &Path, format: EncodingFormat) -> bool {
    if format != EncodingFormat::Jpeg {
        return true;
    }
    match codec.is_arithmetic_jpeg(path) {
        Ok(arithmetic) => !arithmetic,
        Err(e) => {
            tracing::debug!("Arithmetic coding probe failed for {}: {}", path.display(), e);
            false
        }
    }
}

/// Pick the LOD a thumbnail is rendered from.
///
/// Clients at a best-quality tier that accept redirects get the largest LOD
/// without measuring anything, and clients at tier 2 or better get the
/// container's tier-2 level when it has one. Otherwise the chain is walked in
/// ascending resolution and the first LOD whose width and height both reach
/// the requested bounds wins; the largest LOD is used when none does.
pub fn select_for_thumbnail(
    codec: &dyn Codec,
    container: &SrsContainer,
    request: &ThumbnailRequest,
) -> Result<ThumbnailDecision> {
    let lods = non_empty_lods(container)?;

    if request.allow_origin && request.tier.is_best_quality() {
        return Ok(ThumbnailDecision::Redirect(container.best_quality().to_path_buf()));
    }

    let level_two = CompatibilityTier::new(2).unwrap_or_default();
    if request.allow_origin && request.tier <= level_two {
        if let Some(path) = container.get_content_by_level(level_two) {
            return Ok(ThumbnailDecision::Redirect(path.to_path_buf()));
        }
    }

    let last = lods.len() - 1;
    let mut chosen = &lods[last];
    for (index, lod) in lods.iter().enumerate() {
        if index == last {
            break;
        }
        let (width, height) = codec.dimensions(lod)?;
        tracing::debug!("LOD {} is {}x{}", lod.display(), width, height);
        if width >= request.width && height >= request.height {
            chosen = lod;
            break;
        }
    }

    if request.allow_origin {
        if let Some(format) = probe_format(codec, chosen) {
            if format == request.format && is_directly_servable(codec, chosen, format) {
                return Ok(ThumbnailDecision::Redirect(chosen.clone()));
            }
        }
    }

    Ok(ThumbnailDecision::Decode(chosen.clone()))
}

/// Pick the LOD a transcode request is served from.
///
/// Walks the chain in ascending resolution and stops at the first LOD whose
/// native format the client accepts. That LOD is redirected to, or streamed
/// verbatim for a download of exactly that format. Without a match the
/// largest LOD is decoded, or reconstructed when it is JPEG XL and JPEG was
/// asked for.
pub fn select_for_transcode(
    codec: &dyn Codec,
    container: &SrsContainer,
    requested: RequestedFormat,
    tier: CompatibilityTier,
    download: bool,
) -> Result<TranscodeDecision> {
    let lods = non_empty_lods(container)?;
    let candidates = requested.candidate_formats(tier);
    let output = requested.output_format(tier);

    for lod in lods {
        let Some(format) = probe_format(codec, lod) else {
            continue;
        };
        tracing::debug!("LOD {} is {}", lod.display(), format);
        if !candidates.contains(&format) || !is_directly_servable(codec, lod, format) {
            continue;
        }
        if !download {
            return Ok(TranscodeDecision::Redirect(lod.clone()));
        }
        if format == output {
            return Ok(TranscodeDecision::Stream {
                path: lod.clone(),
                format,
            });
        }
        return Ok(TranscodeDecision::Decode(lod.clone()));
    }

    let best = container.best_quality().to_path_buf();
    if output == EncodingFormat::Jpeg && probe_format(codec, &best) == Some(EncodingFormat::Jxl) {
        return Ok(TranscodeDecision::ReconstructJpeg(best));
    }
    Ok(TranscodeDecision::Decode(best))
}

/// Pick from an explicit representation set, ordered best quality first.
///
/// With `allow_origin`, the first representation the client tier accepts in
/// the requested format is redirected to. Failing that, a web-safe most
/// compatible representation is redirected to as is, and a JPEG XL one is
/// served as its reconstructed JPEG. Otherwise the most compatible
/// representation is decoded.
pub fn select_by_tier_and_format(
    representations: &[Representation],
    tier: CompatibilityTier,
    requested: EncodingFormat,
    allow_origin: bool,
) -> Result<RepresentationChoice> {
    let images: Vec<&Representation> = representations
        .iter()
        .filter(|repr| repr.format.is_image())
        .collect();

    let Some(most_compatible) = images.iter().max_by_key(|repr| repr.compatibility_level) else {
        return Err(Error::malformed("no image representations"));
    };

    if allow_origin {
        if let Some(repr) = images
            .iter()
            .find(|repr| tier.accepts(repr.compatibility_level) && repr.format == requested)
        {
            return Ok(RepresentationChoice::Redirect((*repr).clone()));
        }
        if most_compatible.format.is_web_safe() {
            return Ok(RepresentationChoice::Redirect((*most_compatible).clone()));
        }
        if most_compatible.format == EncodingFormat::Jxl {
            return Ok(RepresentationChoice::ReconstructJpeg((*most_compatible).clone()));
        }
    }

    Ok(RepresentationChoice::Decode((*most_compatible).clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;
    use imgview_codec::Decoded;
    use imgview_common::ContentId;
    use std::collections::HashMap;

    /// Answers format and size questions from a table.
    #[derive(Default)]
    struct TableCodec {
        files: HashMap<PathBuf, (EncodingFormat, u32, u32)>,
        arithmetic: Vec<PathBuf>,
    }

    impl TableCodec {
        fn with(mut self, path: &str, format: EncodingFormat, w: u32, h: u32) -> Self {
            self.files.insert(PathBuf::from(path), (format, w, h));
            self
        }

        fn lookup(&self, path: &Path) -> imgview_codec::Result<(EncodingFormat, u32, u32)> {
            self.files
                .get(path)
                .copied()
                .ok_or_else(|| imgview_codec::Error::unsupported("unknown file"))
        }
    }

    impl Codec for TableCodec {
        fn open(&self, _: &Path, _: Option<(u32, u32)>) -> imgview_codec::Result<Decoded> {
            Err(imgview_codec::Error::unsupported("no decoding in negotiation"))
        }
        fn dimensions(&self, path: &Path) -> imgview_codec::Result<(u32, u32)> {
            self.lookup(path).map(|(_, w, h)| (w, h))
        }
        fn detect_format(&self, path: &Path) -> imgview_codec::Result<Option<EncodingFormat>> {
            self.lookup(path).map(|(format, _, _)| Some(format))
        }
        fn is_arithmetic_jpeg(&self, path: &Path) -> imgview_codec::Result<bool> {
            Ok(self.arithmetic.iter().any(|p| p == path))
        }
        fn encode(&self, _: &DynamicImage, _: EncodingFormat) -> imgview_codec::Result<Vec<u8>> {
            Err(imgview_codec::Error::unsupported("no encoding in negotiation"))
        }
        fn reconstruct_jpeg(&self, _: &Path) -> imgview_codec::Result<Vec<u8>> {
            Err(imgview_codec::Error::unsupported("no encoding in negotiation"))
        }
        fn lossless_jpeg(&self, _: &Path) -> imgview_codec::Result<Vec<u8>> {
            Err(imgview_codec::Error::unsupported("no encoding in negotiation"))
        }
    }

    fn container(lods: &[&str]) -> SrsContainer {
        let lods: Vec<String> = lods.iter().map(|l| format!("{l:?}")).collect();
        let manifest = format!(
            r#"{{"ftype": "CLSRS", "streams": {{"image": {{
                "levels": {{"4": "base.jpg"}},
                "lods": [{}]
            }}}}}}"#,
            lods.join(", ")
        );
        SrsContainer::parse(Path::new("/lib/item.srs"), &manifest).unwrap()
    }

    fn tier(level: u8) -> CompatibilityTier {
        CompatibilityTier::new(level).unwrap()
    }

    fn thumb(width: u32, height: u32, level: u8, allow_origin: bool) -> ThumbnailRequest {
        ThumbnailRequest {
            width,
            height,
            format: EncodingFormat::Webp,
            tier: tier(level),
            allow_origin,
        }
    }

    fn chain_codec() -> TableCodec {
        TableCodec::default()
            .with("/lib/s.webp", EncodingFormat::Webp, 160, 120)
            .with("/lib/m.jpg", EncodingFormat::Jpeg, 640, 480)
            .with("/lib/l.png", EncodingFormat::Png, 2560, 1920)
    }

    #[test]
    fn test_thumbnail_stops_at_first_sufficient_lod() {
        let codec = chain_codec();
        let srs = container(&["s.webp", "m.jpg", "l.png"]);

        let decision = select_for_thumbnail(&codec, &srs, &thumb(300, 200, 3, false)).unwrap();
        assert_eq!(decision, ThumbnailDecision::Decode(PathBuf::from("/lib/m.jpg")));

        let decision = select_for_thumbnail(&codec, &srs, &thumb(100, 100, 3, false)).unwrap();
        assert_eq!(decision, ThumbnailDecision::Decode(PathBuf::from("/lib/s.webp")));
    }

    #[test]
    fn test_thumbnail_needs_both_dimensions() {
        let codec = chain_codec();
        let srs = container(&["s.webp", "m.jpg", "l.png"]);
        // s.webp is wide enough but not tall enough
        let decision = select_for_thumbnail(&codec, &srs, &thumb(150, 121, 3, false)).unwrap();
        assert_eq!(decision, ThumbnailDecision::Decode(PathBuf::from("/lib/m.jpg")));
    }

    #[test]
    fn test_thumbnail_exhausts_at_largest() {
        let codec = chain_codec();
        let srs = container(&["s.webp", "m.jpg", "l.png"]);
        let decision = select_for_thumbnail(&codec, &srs, &thumb(5000, 5000, 3, false)).unwrap();
        assert_eq!(decision, ThumbnailDecision::Decode(PathBuf::from("/lib/l.png")));
    }

    #[test]
    fn test_thumbnail_redirects_matching_format() {
        let codec = chain_codec();
        let srs = container(&["s.webp", "m.jpg", "l.png"]);
        let decision = select_for_thumbnail(&codec, &srs, &thumb(100, 100, 3, true)).unwrap();
        assert_eq!(decision, ThumbnailDecision::Redirect(PathBuf::from("/lib/s.webp")));
    }

    #[test]
    fn test_thumbnail_best_quality_skips_measuring() {
        // no entries: any dimension lookup would fail
        let codec = TableCodec::default();
        let srs = container(&["s.webp", "m.jpg", "l.png"]);
        let decision = select_for_thumbnail(&codec, &srs, &thumb(100, 100, 0, true)).unwrap();
        assert_eq!(decision, ThumbnailDecision::Redirect(PathBuf::from("/lib/l.png")));
    }

    #[test]
    fn test_transcode_autodetect_baseline_skips_webp() {
        let codec = chain_codec();
        let srs = container(&["s.webp", "m.jpg", "l.png"]);
        let decision =
            select_for_transcode(&codec, &srs, RequestedFormat::Autodetect, tier(4), false).unwrap();
        assert_eq!(decision, TranscodeDecision::Redirect(PathBuf::from("/lib/m.jpg")));
    }

    #[test]
    fn test_transcode_skips_arithmetic_jpeg() {
        let mut codec = chain_codec();
        codec.arithmetic.push(PathBuf::from("/lib/m.jpg"));
        let srs = container(&["s.webp", "m.jpg", "l.png"]);
        let decision =
            select_for_transcode(&codec, &srs, RequestedFormat::Autodetect, tier(4), false).unwrap();
        assert_eq!(decision, TranscodeDecision::Redirect(PathBuf::from("/lib/l.png")));
    }

    #[test]
    fn test_transcode_download_streams_exact_format() {
        let codec = chain_codec();
        let srs = container(&["s.webp", "m.jpg", "l.png"]);
        let requested = RequestedFormat::Exact(EncodingFormat::Png);
        let decision = select_for_transcode(&codec, &srs, requested, tier(3), true).unwrap();
        assert_eq!(
            decision,
            TranscodeDecision::Stream {
                path: PathBuf::from("/lib/l.png"),
                format: EncodingFormat::Png
            }
        );
    }

    #[test]
    fn test_transcode_without_match_decodes_largest() {
        let codec = chain_codec();
        let srs = container(&["s.webp", "m.jpg", "l.png"]);
        let requested = RequestedFormat::Exact(EncodingFormat::Avif);
        let decision = select_for_transcode(&codec, &srs, requested, tier(0), false).unwrap();
        assert_eq!(decision, TranscodeDecision::Decode(PathBuf::from("/lib/l.png")));
    }

    #[test]
    fn test_transcode_reconstructs_jxl_for_jpeg() {
        let codec = TableCodec::default()
            .with("/lib/s.webp", EncodingFormat::Webp, 160, 120)
            .with("/lib/l.jxl", EncodingFormat::Jxl, 2560, 1920);
        let srs = container(&["s.webp", "l.jxl"]);
        let requested = RequestedFormat::Exact(EncodingFormat::Jpeg);
        let decision = select_for_transcode(&codec, &srs, requested, tier(3), false).unwrap();
        assert_eq!(decision, TranscodeDecision::ReconstructJpeg(PathBuf::from("/lib/l.jxl")));
    }

    fn repr(format: EncodingFormat, level: u8) -> Representation {
        Representation {
            content_id: ContentId::from(42),
            format,
            compatibility_level: tier(level),
            file_path: PathBuf::from(format!("/lib/mlid42.{}", format.extension())),
        }
    }

    #[test]
    fn test_representation_redirect_for_accepted_tier() {
        let reprs = [repr(EncodingFormat::Avif, 0), repr(EncodingFormat::Jpeg, 4)];
        let choice =
            select_by_tier_and_format(&reprs, tier(0), EncodingFormat::Avif, true).unwrap();
        assert_eq!(choice, RepresentationChoice::Redirect(reprs[0].clone()));
    }

    #[test]
    fn test_representation_tier_too_advanced_falls_back_to_web_safe() {
        let reprs = [repr(EncodingFormat::Avif, 0), repr(EncodingFormat::Jpeg, 4)];
        let choice =
            select_by_tier_and_format(&reprs, tier(3), EncodingFormat::Avif, true).unwrap();
        assert_eq!(choice, RepresentationChoice::Redirect(reprs[1].clone()));
    }

    #[test]
    fn test_representation_jxl_fallback_reconstructs_jpeg() {
        let reprs = [repr(EncodingFormat::Avif, 0), repr(EncodingFormat::Jxl, 2)];
        let choice =
            select_by_tier_and_format(&reprs, tier(3), EncodingFormat::Webp, true).unwrap();
        assert_eq!(choice, RepresentationChoice::ReconstructJpeg(reprs[1].clone()));
    }

    #[test]
    fn test_representation_fallback_decodes_other_formats() {
        let reprs = [repr(EncodingFormat::Avif, 0), repr(EncodingFormat::Gif, 4)];
        let choice =
            select_by_tier_and_format(&reprs, tier(3), EncodingFormat::Webp, true).unwrap();
        assert_eq!(choice, RepresentationChoice::Decode(reprs[1].clone()));
    }

    #[test]
    fn test_representation_without_origin_decodes_most_compatible() {
        let reprs = [repr(EncodingFormat::Avif, 0), repr(EncodingFormat::Jpeg, 4)];
        let choice =
            select_by_tier_and_format(&reprs, tier(0), EncodingFormat::Avif, false).unwrap();
        assert_eq!(choice, RepresentationChoice::Decode(reprs[1].clone()));
    }

    #[test]
    fn test_representation_empty_is_malformed() {
        let sidecar_only = [repr(EncodingFormat::JsonXz, 4)];
        for reprs in [&[][..], &sidecar_only[..]] {
            let result = select_by_tier_and_format(reprs, tier(3), EncodingFormat::Webp, true);
            assert!(matches!(result, Err(Error::MalformedContainer(_))));
        }
    }
}
