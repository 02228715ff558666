//! Decoded sources and the native decoders behind them.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::codecs::gif::GifDecoder;
use image::codecs::png::PngDecoder;
use image::codecs::webp::WebPDecoder;
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage, GenericImageView, ImageReader};
use imgview_common::EncodingFormat;

use crate::container::SrsContainer;
use crate::frames::FrameSequence;
use crate::tools::{run_tool, ToolPaths};
use crate::Result;

/// What opening a library file yields.
#[derive(Debug)]
pub enum Decoded {
    /// A single raster image (the first frame of an animation).
    Plain(DecodedImage),
    /// A multi-resolution container; pick a LOD and open that instead.
    Container(SrsContainer),
    /// A video-like source; reduce it to one frame before use.
    Frames(FrameSequence),
}

/// Pixels plus what is known about the file they came from.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    /// Native encoding of the source file, when it was sniffed.
    pub format: Option<EncodingFormat>,
    /// The source holds more than one frame.
    pub animated: bool,
    /// Dimensions of the file before any reduction.
    pub source_dimensions: (u32, u32),
}

impl DecodedImage {
    pub fn new(image: DynamicImage, format: Option<EncodingFormat>) -> Self {
        Self {
            source_dimensions: image.dimensions(),
            image,
            format,
            animated: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    /// Whether the source file fits inside `width`×`height`.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        let (source_width, source_height) = self.source_dimensions;
        source_width <= width && source_height <= height
    }

    /// Shrink to the smallest size that still covers `width`×`height`.
    ///
    /// Only applied when the source is at least twice the target in both
    /// dimensions; animations and smaller sources are returned untouched.
    pub fn reduce_to_cover(self, width: u32, height: u32) -> Self {
        if self.animated
            || width == 0
            || height == 0
            || self.width() < width.saturating_mul(2)
            || self.height() < height.saturating_mul(2)
        {
            return self;
        }

        let scale = f64::max(
            f64::from(width) / f64::from(self.width()),
            f64::from(height) / f64::from(self.height()),
        );
        let new_width = (f64::from(self.width()) * scale).ceil() as u32;
        let new_height = (f64::from(self.height()) * scale).ceil() as u32;

        Self {
            image: self
                .image
                .resize_exact(new_width.max(width), new_height.max(height), FilterType::Triangle),
            ..self
        }
    }
}

/// Whether an animation-capable file holds more than one frame.
pub(crate) fn is_animated(path: &Path, format: EncodingFormat) -> Result<bool> {
    let reader = || -> Result<BufReader<File>> { Ok(BufReader::new(File::open(path)?)) };

    let animated = match format {
        EncodingFormat::Gif => GifDecoder::new(reader()?)?
            .into_frames()
            .take(2)
            .count()
            > 1,
        EncodingFormat::Webp => WebPDecoder::new(reader()?)?.has_animation(),
        EncodingFormat::Png => PngDecoder::new(reader()?)?.is_apng()?,
        _ => false,
    };
    Ok(animated)
}

/// Decode a raster file the `image` crate reads natively.
pub(crate) fn decode_native(path: &Path, format: Option<EncodingFormat>) -> Result<DecodedImage> {
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    let animated = match format {
        Some(format) if format.supports_animation() => is_animated(path, format)?,
        _ => false,
    };
    Ok(DecodedImage {
        animated,
        ..DecodedImage::new(image, format)
    })
}

/// Decode through an external decoder writing a PNG scratch file.
///
/// Used for JPEG XL (`djxl`) and AVIF (`avifdec`).
pub(crate) fn decode_external(
    tools: &ToolPaths,
    tool: &str,
    path: &Path,
    format: EncodingFormat,
) -> Result<DecodedImage> {
    let program = tools.resolve(tool)?;
    let scratch = tempfile::Builder::new()
        .prefix("imgview-")
        .suffix(".png")
        .tempfile()?;

    run_tool(&program, &[path.as_os_str(), scratch.path().as_os_str()])?;

    let image = ImageReader::open(scratch.path())?
        .with_guessed_format()?
        .decode()?;
    Ok(DecodedImage::new(image, Some(format)))
}
