//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates a scratch library root, a thumbnail
//! cache directory, an in-memory DB and a [`DeliveryService`] whose codec
//! counts every call, so tests can prove a path never reached the codec.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imgview::delivery::{DeliveryService, ThumbnailCache};
use imgview_codec::{Codec, Decoded, NativeCodec};
use imgview_common::{ContentId, EncodingFormat, MediaKind};
use imgview_db::models::{ContentItem, NewContent};
use imgview_db::pool::{init_memory_pool, DbPool, PooledConnection};
use imgview_db::queries::content;
use tempfile::TempDir;

/// [`NativeCodec`] wrapper recording how often each operation ran.
#[derive(Default)]
pub struct CountingCodec {
    inner: NativeCodec,
    pub opens: AtomicUsize,
    pub probes: AtomicUsize,
    pub encodes: AtomicUsize,
    pub opened: Mutex<Vec<PathBuf>>,
}

impl CountingCodec {
    pub fn calls(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
            + self.probes.load(Ordering::SeqCst)
            + self.encodes.load(Ordering::SeqCst)
    }

    pub fn encodes(&self) -> usize {
        self.encodes.load(Ordering::SeqCst)
    }

    pub fn last_opened(&self) -> Option<PathBuf> {
        self.opened.lock().unwrap().last().cloned()
    }

    pub fn reset(&self) {
        self.opens.store(0, Ordering::SeqCst);
        self.probes.store(0, Ordering::SeqCst);
        self.encodes.store(0, Ordering::SeqCst);
        self.opened.lock().unwrap().clear();
    }
}

impl Codec for CountingCodec {
    fn open(&self, path: &Path, target_size: Option<(u32, u32)>) -> imgview_codec::Result<Decoded> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.opened.lock().unwrap().push(path.to_path_buf());
        self.inner.open(path, target_size)
    }

    fn dimensions(&self, path: &Path) -> imgview_codec::Result<(u32, u32)> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.inner.dimensions(path)
    }

    fn detect_format(&self, path: &Path) -> imgview_codec::Result<Option<EncodingFormat>> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.inner.detect_format(path)
    }

    fn is_arithmetic_jpeg(&self, path: &Path) -> imgview_codec::Result<bool> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.inner.is_arithmetic_jpeg(path)
    }

    fn encode(&self, image: &DynamicImage, format: EncodingFormat) -> imgview_codec::Result<Vec<u8>> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        self.inner.encode(image, format)
    }

    fn reconstruct_jpeg(&self, jxl_path: &Path) -> imgview_codec::Result<Vec<u8>> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        self.inner.reconstruct_jpeg(jxl_path)
    }

    fn lossless_jpeg(&self, jpeg_path: &Path) -> imgview_codec::Result<Vec<u8>> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        self.inner.lossless_jpeg(jpeg_path)
    }
}

/// Scratch library plus a service wired to it.
pub struct TestHarness {
    pub dir: TempDir,
    pub root: PathBuf,
    pub db: DbPool,
    pub codec: Arc<CountingCodec>,
    pub service: DeliveryService,
}

impl TestHarness {
    /// Harness with a thumbnail cache under the scratch directory.
    pub fn new() -> Self {
        Self::build(|dir| Some(ThumbnailCache::new(dir.join("thumbs"))))
    }

    /// Harness with the thumbnail cache `cache` builds from the scratch directory.
    pub fn build(cache: impl FnOnce(&Path) -> Option<ThumbnailCache>) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = dir.path().join("library");
        std::fs::create_dir_all(&root).expect("failed to create library root");

        let db = init_memory_pool().expect("failed to create in-memory pool");
        let codec = Arc::new(CountingCodec::default());
        let service = DeliveryService::new(
            db.clone(),
            codec.clone() as Arc<dyn Codec>,
            root.clone(),
            cache(dir.path()),
        );

        Self {
            dir,
            root,
            db,
            codec,
            service,
        }
    }

    pub fn conn(&self) -> PooledConnection {
        self.db.get().expect("failed to get connection")
    }

    /// Write a solid-color image into the library.
    pub fn write_image(
        &self,
        relative: &str,
        width: u32,
        height: u32,
        color: [u8; 4],
        format: ImageFormat,
    ) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let image = RgbaImage::from_pixel(width, height, Rgba(color));
        match format {
            ImageFormat::Jpeg => DynamicImage::ImageRgba8(image)
                .to_rgb8()
                .save_with_format(&path, format)
                .unwrap(),
            _ => image.save_with_format(&path, format).unwrap(),
        }
        path
    }

    /// Write a file with arbitrary bytes into the library.
    pub fn write_file(&self, relative: &str, bytes: &[u8]) -> PathBuf {
        let path = self.root.join(relative);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    /// Write an SRS manifest with the given `streams.image` object.
    pub fn write_manifest(&self, relative: &str, image_stream: &str) -> PathBuf {
        self.write_file(
            relative,
            format!(r#"{{"ftype": "CLSRS", "streams": {{"image": {image_stream}}}}}"#).as_bytes(),
        )
    }

    pub fn add_content(&self, relative: &str) -> ContentItem {
        self.add(NewContent::new(relative, MediaKind::Image))
    }

    pub fn add(&self, new: NewContent) -> ContentItem {
        content::insert_content(&self.conn(), &new).unwrap()
    }

    /// Insert a content row under a fixed id.
    pub fn add_content_with_id(&self, id: i64, relative: &str) -> ContentId {
        self.conn()
            .execute(
                "INSERT INTO content (id, file_path, media_kind) VALUES (?1, ?2, 'image')",
                rusqlite::params![id, relative],
            )
            .unwrap();
        ContentId::from(id)
    }
}

/// Minimal ISO-BMFF header that sniffs as AVIF.
pub const AVIF_HEADER: &[u8] = b"\x00\x00\x00\x1cftypavif\x00\x00\x00\x00avifmif1miaf";
