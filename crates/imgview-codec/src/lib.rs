//! # imgview-codec
//!
//! Image decoding, encoding and container reading for imgview.
//!
//! This crate provides functionality for:
//! - Opening library files as plain images, SRS containers or frame sequences
//! - Sniffing encodings by magic bytes, including arithmetic-coded JPEG detection
//! - Encoding JPEG, PNG, GIF, WebP and AVIF natively, JPEG XL through `cjxl`
//! - Lossless JPEG passthrough (`jpegtran`) and reconstruction from JPEG XL (`djxl`)
//!
//! The delivery layer talks to all of this through the [`Codec`] trait so a
//! counting or scripted implementation can stand in during tests.
//!
//! ## Example
//!
//! ```no_run
//! use imgview_codec::{Codec, Decoded, NativeCodec};
//! use std::path::Path;
//!
//! let codec = NativeCodec::default();
//! match codec.open(Path::new("/library/mlid42.srs"), None)? {
//!     Decoded::Container(srs) => println!("{} LODs", srs.progressive_lods().len()),
//!     Decoded::Plain(img) => println!("{}x{}", img.width(), img.height()),
//!     Decoded::Frames(frames) => println!("video at {}", frames.path().display()),
//! }
//! # Ok::<(), imgview_codec::Error>(())
//! ```

pub mod container;
pub mod decode;
pub mod detect;
mod encode;
mod error;
pub mod frames;
pub mod tools;

use std::path::Path;

use image::{DynamicImage, ImageReader};
use imgview_common::paths::{is_container_file, is_video_file};
use imgview_common::EncodingFormat;

// Re-exports
pub use container::{ContainerLevel, SrsContainer};
pub use decode::{Decoded, DecodedImage};
pub use encode::EncoderSettings;
pub use error::{Error, Result};
pub use frames::FrameSequence;
pub use tools::{check_tool, check_tools, require_tool, ToolInfo, ToolPaths};

/// Decoder and encoder used by the delivery layer.
///
/// Implementations must be safe to share across threads (`Send + Sync`).
pub trait Codec: Send + Sync {
    /// Open a library file.
    ///
    /// Containers are parsed but none of their LODs is decoded; video-like
    /// sources are returned unread. `target_size` lets a large raster be
    /// shrunk right after decoding when only a thumbnail of that size is needed.
    fn open(&self, path: &Path, target_size: Option<(u32, u32)>) -> Result<Decoded>;

    /// Pixel dimensions of a raster file, decoding as little as the format allows.
    fn dimensions(&self, path: &Path) -> Result<(u32, u32)>;

    /// Native encoding of a file, judged by its content.
    fn detect_format(&self, path: &Path) -> Result<Option<EncodingFormat>>;

    /// Encode pixels as `format`.
    fn encode(&self, image: &DynamicImage, format: EncodingFormat) -> Result<Vec<u8>>;

    /// Recover the JPEG a JPEG XL file was losslessly transcoded from.
    fn reconstruct_jpeg(&self, jxl_path: &Path) -> Result<Vec<u8>>;

    /// Copy a JPEG through a lossless re-pack.
    fn lossless_jpeg(&self, jpeg_path: &Path) -> Result<Vec<u8>>;

    /// Whether a JPEG file uses arithmetic coding, which browsers do not decode.
    fn is_arithmetic_jpeg(&self, path: &Path) -> Result<bool> {
        detect::is_arithmetic_coded_jpeg(&std::fs::read(path)?)
    }
}

/// [`Codec`] backed by the `image` crate plus external tools.
#[derive(Debug, Clone, Default)]
pub struct NativeCodec {
    settings: EncoderSettings,
    tools: ToolPaths,
}

impl NativeCodec {
    pub fn new(settings: EncoderSettings, tools: ToolPaths) -> Self {
        Self { settings, tools }
    }

    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    fn decode_raster(&self, path: &Path) -> Result<DecodedImage> {
        match detect::sniff_file(path)? {
            Some(EncodingFormat::Jxl) => {
                decode::decode_external(&self.tools, "djxl", path, EncodingFormat::Jxl)
            }
            Some(EncodingFormat::Avif) => {
                decode::decode_external(&self.tools, "avifdec", path, EncodingFormat::Avif)
            }
            format => decode::decode_native(path, format),
        }
    }
}

impl Codec for NativeCodec {
    fn open(&self, path: &Path, target_size: Option<(u32, u32)>) -> Result<Decoded> {
        if is_container_file(path) {
            return SrsContainer::open(path).map(Decoded::Container);
        }
        if is_video_file(path) {
            return Ok(Decoded::Frames(FrameSequence::new(path, self.tools.clone())));
        }
        let decoded = self.decode_raster(path)?;
        Ok(Decoded::Plain(match target_size {
            Some((width, height)) => decoded.reduce_to_cover(width, height),
            None => decoded,
        }))
    }

    fn dimensions(&self, path: &Path) -> Result<(u32, u32)> {
        if is_video_file(path) {
            let frames = FrameSequence::new(path, self.tools.clone());
            return Ok(frames.next_frame()?.dimensions());
        }
        match detect::sniff_file(path)? {
            Some(EncodingFormat::Jxl | EncodingFormat::Avif) => {
                Ok(self.decode_raster(path)?.dimensions())
            }
            _ => Ok(ImageReader::open(path)?
                .with_guessed_format()?
                .into_dimensions()?),
        }
    }

    fn detect_format(&self, path: &Path) -> Result<Option<EncodingFormat>> {
        detect::sniff_file(path)
    }

    fn encode(&self, image: &DynamicImage, format: EncodingFormat) -> Result<Vec<u8>> {
        tracing::debug!(
            "Encoding {}x{} image as {}",
            image.width(),
            image.height(),
            format
        );
        encode::encode_image(image, format, &self.settings, &self.tools)
    }

    fn reconstruct_jpeg(&self, jxl_path: &Path) -> Result<Vec<u8>> {
        encode::reconstruct_jpeg(jxl_path, &self.tools)
    }

    fn lossless_jpeg(&self, jpeg_path: &Path) -> Result<Vec<u8>> {
        encode::lossless_jpeg(jpeg_path, &self.tools)
    }
}
