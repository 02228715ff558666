//! Integration tests for thumbnails, transcodes and downloads.

mod common;

use assert_matches::assert_matches;
use common::{TestHarness, AVIF_HEADER};
use image::{GenericImageView, ImageFormat};
use imgview::delivery::{Delivery, ThumbnailCache, ThumbnailRequest};
use imgview_common::{CompatibilityTier, ContentId, EncodingFormat, Error, MediaKind, RequestedFormat};
use imgview_db::models::NewContent;
use imgview_db::queries::{fingerprints, representations};

const BLACK: [u8; 4] = [0, 0, 0, 255];
const RED: [u8; 4] = [200, 30, 30, 255];

fn request(width: u32, height: u32, format: EncodingFormat) -> ThumbnailRequest {
    ThumbnailRequest {
        width,
        height,
        format,
        tier: CompatibilityTier::DEFAULT,
        allow_origin: false,
    }
}

fn decoded_dimensions(delivery: &Delivery) -> (u32, u32) {
    match delivery {
        Delivery::Bytes { data, .. } => image::load_from_memory(data).unwrap().dimensions(),
        other => panic!("expected encoded bytes, got {other:?}"),
    }
}

#[test]
fn test_representation_redirect_skips_encoding() {
    let h = TestHarness::new();
    h.write_image("mlid42.jpg", 64, 48, RED, ImageFormat::Jpeg);
    let avif = h.write_file("mlid42.avif", AVIF_HEADER);
    h.write_manifest(
        "mlid42.srs",
        r#"{"levels": {"4": "mlid42.jpg", "0": "mlid42.avif"}}"#,
    );
    let id = h.add_content_with_id(42, "mlid42.srs");

    let req = ThumbnailRequest {
        tier: CompatibilityTier::BEST,
        allow_origin: true,
        ..request(128, 128, EncodingFormat::Avif)
    };
    let delivery = h.service.thumbnail(id, &req).unwrap();

    assert_eq!(delivery, Delivery::Redirect(avif));
    assert_eq!(h.codec.encodes(), 0);

    // The catalog was persisted on first access.
    let reprs = representations::get_representations(&h.conn(), id).unwrap();
    assert_eq!(reprs.len(), 2);
}

#[test]
fn test_unmatched_format_redirects_to_web_safe_representation() {
    let h = TestHarness::new();
    let jpeg = h.write_image("mlid7.jpg", 64, 48, RED, ImageFormat::Jpeg);
    h.write_file("mlid7.avif", AVIF_HEADER);
    h.write_manifest(
        "mlid7.srs",
        r#"{"levels": {"4": "mlid7.jpg", "0": "mlid7.avif"}}"#,
    );
    let item = h.add_content("mlid7.srs");

    let req = ThumbnailRequest {
        allow_origin: true,
        ..request(32, 32, EncodingFormat::Webp)
    };
    let delivery = h.service.thumbnail(item.id, &req).unwrap();

    assert_eq!(delivery, Delivery::Redirect(jpeg));
    assert_eq!(h.codec.encodes(), 0);

    // Without the origin hint the thumbnail is rendered.
    let delivery = h
        .service
        .thumbnail(item.id, &request(32, 32, EncodingFormat::Webp))
        .unwrap();
    assert_eq!(decoded_dimensions(&delivery), (32, 24));
    assert_eq!(h.codec.encodes(), 1);
}

#[test]
fn test_autodetect_baseline_picks_first_compatible_lod() {
    let h = TestHarness::new();
    h.write_image("item/small.webp", 16, 12, RED, ImageFormat::WebP);
    let jpeg = h.write_image("item/medium.jpg", 64, 48, RED, ImageFormat::Jpeg);
    h.write_image("item/large.png", 256, 192, RED, ImageFormat::Png);
    h.write_manifest(
        "item/item.srs",
        r#"{"levels": {"4": "large.png"}, "lods": ["small.webp", "medium.jpg", "large.png"]}"#,
    );
    let item = h.add_content("item/item.srs");

    let delivery = h
        .service
        .transcode(
            item.id,
            RequestedFormat::Autodetect,
            CompatibilityTier::BASELINE,
            false,
        )
        .unwrap();
    assert_eq!(delivery, Delivery::Redirect(jpeg.clone()));

    let download = h
        .service
        .transcode(
            item.id,
            RequestedFormat::Autodetect,
            CompatibilityTier::BASELINE,
            true,
        )
        .unwrap();
    assert_eq!(
        download,
        Delivery::File {
            path: jpeg,
            format: Some(EncodingFormat::Jpeg)
        }
    );
}

#[test]
fn test_thumbnail_cache_hit_skips_codec() {
    let h = TestHarness::new();
    h.write_image("photo.png", 400, 300, RED, ImageFormat::Png);
    let item = h.add_content("photo.png");
    let req = request(100, 100, EncodingFormat::Webp);

    let first = h.service.thumbnail(item.id, &req).unwrap();
    assert_eq!(decoded_dimensions(&first), (100, 75));
    assert!(h.codec.calls() > 0);

    h.codec.reset();
    let second = h.service.thumbnail(item.id, &req).unwrap();
    assert_eq!(h.codec.calls(), 0);

    let cache_dir = h.dir.path().join("thumbs");
    match second {
        Delivery::File { path, format } => {
            assert!(path.starts_with(&cache_dir));
            assert!(path.is_file());
            assert_eq!(format, Some(EncodingFormat::Webp));
            let cached = image::open(&path).unwrap();
            assert_eq!(cached.dimensions(), (100, 75));
        }
        other => panic!("expected cached file, got {other:?}"),
    }
}

#[test]
fn test_thumbnail_never_upscales() {
    let h = TestHarness::new();
    h.write_image("tiny.png", 50, 40, RED, ImageFormat::Png);
    let item = h.add_content("tiny.png");

    let delivery = h
        .service
        .thumbnail(item.id, &request(200, 200, EncodingFormat::Webp))
        .unwrap();
    assert_eq!(decoded_dimensions(&delivery), (50, 40));
}

#[test]
fn test_small_source_in_requested_format_is_redirected() {
    let h = TestHarness::new();
    let source = h.write_image("tiny.png", 50, 40, RED, ImageFormat::Png);
    let item = h.add_content("tiny.png");

    let req = ThumbnailRequest {
        allow_origin: true,
        ..request(200, 200, EncodingFormat::Png)
    };
    let delivery = h.service.thumbnail(item.id, &req).unwrap();

    assert_eq!(delivery, Delivery::Redirect(source));
    assert_eq!(h.codec.encodes(), 0);
    // Rendering still fingerprinted the pixels it decoded.
    assert!(fingerprints::get_fingerprint(&h.conn(), item.id)
        .unwrap()
        .is_some());
}

#[test]
fn test_large_source_is_rendered_even_when_origin_allowed() {
    let h = TestHarness::new();
    h.write_image("big.png", 200, 100, RED, ImageFormat::Png);
    let item = h.add_content("big.png");

    let req = ThumbnailRequest {
        allow_origin: true,
        ..request(100, 100, EncodingFormat::Png)
    };
    let delivery = h.service.thumbnail(item.id, &req).unwrap();
    assert_eq!(decoded_dimensions(&delivery), (100, 50));
}

#[test]
fn test_thumbnail_decodes_smallest_sufficient_lod() {
    let h = TestHarness::new();
    h.write_image("set/s.png", 100, 75, RED, ImageFormat::Png);
    let medium = h.write_image("set/m.png", 400, 300, RED, ImageFormat::Png);
    let large = h.write_image("set/l.png", 1600, 1200, RED, ImageFormat::Png);
    h.write_manifest(
        "set/set.srs",
        r#"{"levels": {"4": "l.png"}, "lods": ["s.png", "m.png", "l.png"]}"#,
    );
    let item = h.add_content("set/set.srs");

    let delivery = h
        .service
        .thumbnail(item.id, &request(300, 300, EncodingFormat::Png))
        .unwrap();
    assert_eq!(h.codec.last_opened(), Some(medium));
    assert_eq!(decoded_dimensions(&delivery), (300, 225));

    // Nothing is large enough: the largest LOD is used.
    h.codec.reset();
    let delivery = h
        .service
        .thumbnail(item.id, &request(2000, 2000, EncodingFormat::Png))
        .unwrap();
    assert_eq!(h.codec.last_opened(), Some(large));
    assert_eq!(decoded_dimensions(&delivery), (1600, 1200));
}

#[test]
fn test_thumbnail_survives_cache_write_failure() {
    let h = TestHarness::build(|dir| {
        let blocker = dir.join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        Some(ThumbnailCache::new(blocker.join("thumbs")))
    });
    h.write_image("photo.png", 80, 60, RED, ImageFormat::Png);
    let item = h.add_content("photo.png");
    let req = request(40, 40, EncodingFormat::Png);

    let delivery = h.service.thumbnail(item.id, &req).unwrap();
    assert_eq!(decoded_dimensions(&delivery), (40, 30));

    // Still rendered on the next request since nothing was cached.
    h.codec.reset();
    let again = h.service.thumbnail(item.id, &req).unwrap();
    assert_matches!(again, Delivery::Bytes { .. });
    assert_eq!(h.codec.encodes(), 1);
}

#[test]
fn test_thumbnail_without_cache() {
    let h = TestHarness::build(|_| None);
    h.write_image("photo.png", 80, 60, BLACK, ImageFormat::Png);
    let item = h.add_content("photo.png");
    let req = request(40, 40, EncodingFormat::Jpeg);

    for _ in 0..2 {
        let delivery = h.service.thumbnail(item.id, &req).unwrap();
        assert_matches!(delivery, Delivery::Bytes { format: EncodingFormat::Jpeg, .. });
    }
    assert_eq!(h.codec.encodes(), 2);
}

#[test]
fn test_drop_thumbnails_removes_cached_files() {
    let h = TestHarness::new();
    h.write_image("photo.png", 120, 120, RED, ImageFormat::Png);
    let item = h.add_content("photo.png");

    for size in [32, 64] {
        h.service
            .thumbnail(item.id, &request(size, size, EncodingFormat::Png))
            .unwrap();
    }
    let cached = match h
        .service
        .thumbnail(item.id, &request(32, 32, EncodingFormat::Png))
        .unwrap()
    {
        Delivery::File { path, .. } => path,
        other => panic!("expected cached file, got {other:?}"),
    };

    assert_eq!(h.service.drop_thumbnails(item.id).unwrap(), 2);
    assert!(!cached.exists());

    h.codec.reset();
    let delivery = h
        .service
        .thumbnail(item.id, &request(32, 32, EncodingFormat::Png))
        .unwrap();
    assert_matches!(delivery, Delivery::Bytes { .. });
    assert_eq!(h.codec.encodes(), 1);
}

#[test]
fn test_thumbnail_rejects_bad_bounds() {
    let h = TestHarness::new();
    h.write_image("photo.png", 10, 10, RED, ImageFormat::Png);
    let item = h.add_content("photo.png");

    let err = h
        .service
        .thumbnail(item.id, &request(0, 10, EncodingFormat::Png))
        .unwrap_err();
    assert_matches!(err, Error::Validation(_));
    assert_eq!(err.http_status(), 400);
    assert_eq!(h.codec.calls(), 0);
}

#[test]
fn test_missing_content_is_not_found() {
    let h = TestHarness::new();
    let err = h
        .service
        .thumbnail(ContentId::from(999), &request(10, 10, EncodingFormat::Png))
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.http_status(), 404);

    let err = h.service.download(ContentId::from(999)).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_container_without_image_level_is_malformed() {
    let h = TestHarness::new();
    h.write_file("meta.json.xz", b"\xfd7zXZ\x00");
    h.write_manifest("broken.srs", r#"{"levels": {"4": "meta.json.xz"}}"#);
    let item = h.add_content("broken.srs");

    let err = h
        .service
        .thumbnail(item.id, &request(10, 10, EncodingFormat::Png))
        .unwrap_err();
    assert_matches!(err, Error::MalformedContainer(_));
}

#[test]
fn test_transcode_plain_file() {
    let h = TestHarness::new();
    let source = h.write_image("photo.png", 32, 24, RED, ImageFormat::Png);
    let item = h.add_content("photo.png");

    // Baseline clients accept PNG as it is.
    let delivery = h
        .service
        .transcode(item.id, RequestedFormat::Autodetect, CompatibilityTier::BASELINE, false)
        .unwrap();
    assert_eq!(delivery, Delivery::Redirect(source));

    // Other tiers get WebP.
    let delivery = h
        .service
        .transcode(item.id, RequestedFormat::Autodetect, CompatibilityTier::DEFAULT, false)
        .unwrap();
    match delivery {
        Delivery::Bytes { data, format } => {
            assert_eq!(format, EncodingFormat::Webp);
            assert_eq!(
                image::guess_format(&data).unwrap(),
                ImageFormat::WebP
            );
        }
        other => panic!("expected encoded bytes, got {other:?}"),
    }

    let delivery = h
        .service
        .transcode(
            item.id,
            RequestedFormat::Exact(EncodingFormat::Jpeg),
            CompatibilityTier::DEFAULT,
            false,
        )
        .unwrap();
    assert_eq!(decoded_dimensions(&delivery), (32, 24));
}

#[test]
fn test_download_plain_file() {
    let h = TestHarness::new();
    let source = h.write_image("sunset.png", 16, 16, RED, ImageFormat::Png);
    let item = h.add(
        NewContent::new("sunset.png", MediaKind::Image)
            .with_title("Sunset")
            .with_origin("archive", Some("7".to_string())),
    );

    let download = h.service.download(item.id).unwrap();
    assert_eq!(download.filename, "Sunset archive7.png");
    assert_eq!(
        download.delivery,
        Delivery::File {
            path: source,
            format: Some(EncodingFormat::Png)
        }
    );
}

#[test]
fn test_download_container_serves_most_compatible_level() {
    let h = TestHarness::new();
    h.write_file("mlid5.avif", AVIF_HEADER);
    let png = h.write_image("mlid5.png", 16, 16, RED, ImageFormat::Png);
    h.write_manifest(
        "mlid5.srs",
        r#"{"levels": {"0": "mlid5.avif", "4": "mlid5.png"}}"#,
    );
    let item = h.add_content("mlid5.srs");

    let download = h.service.download(item.id).unwrap();
    assert_eq!(download.filename, format!("mlid{}.png", item.id));
    assert_eq!(
        download.delivery,
        Delivery::File {
            path: png,
            format: Some(EncodingFormat::Png)
        }
    );
}

#[test]
fn test_drop_representations_rebuilds_catalog() {
    let h = TestHarness::new();
    h.write_image("a.png", 8, 8, RED, ImageFormat::Png);
    h.write_manifest("a.srs", r#"{"levels": {"4": "a.png"}}"#);
    let item = h.add_content("a.srs");

    assert_eq!(h.service.representations(item.id).unwrap().len(), 1);
    assert_eq!(h.service.drop_representations(item.id).unwrap(), 1);
    assert!(representations::get_representations(&h.conn(), item.id)
        .unwrap()
        .is_empty());
    assert_eq!(h.service.representations(item.id).unwrap().len(), 1);
}
