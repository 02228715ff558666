//! Encoders for every output format the delivery layer produces.

use std::ffi::OsStr;
use std::io::Cursor;
use std::path::Path;

use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat};
use imgview_common::EncodingFormat;
use serde::{Deserialize, Serialize};

use crate::tools::{run_tool, ToolPaths};
use crate::{Error, Result};

/// Quality knobs for the lossy encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderSettings {
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
    /// AVIF quality, 1-100.
    pub avif_quality: u8,
    /// AVIF encoder speed, 1 (slowest) to 10.
    pub avif_speed: u8,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            jpeg_quality: 90,
            avif_quality: 80,
            avif_speed: 8,
        }
    }
}

/// Encode `image` as `format`.
///
/// The image is flattened to RGBA first (RGB for JPEG). WebP output is
/// lossless; JPEG XL goes through `cjxl`.
pub(crate) fn encode_image(
    image: &DynamicImage,
    format: EncodingFormat,
    settings: &EncoderSettings,
    tools: &ToolPaths,
) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();

    match format {
        EncodingFormat::Jpeg => {
            let rgb = image.to_rgb8();
            JpegEncoder::new_with_quality(&mut buffer, settings.jpeg_quality).write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )?;
        }
        EncodingFormat::Png => {
            DynamicImage::ImageRgba8(image.to_rgba8())
                .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
        }
        EncodingFormat::Gif => {
            DynamicImage::ImageRgba8(image.to_rgba8())
                .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Gif)?;
        }
        EncodingFormat::Webp => {
            let rgba = image.to_rgba8();
            WebPEncoder::new_lossless(&mut buffer).write_image(
                rgba.as_raw(),
                rgba.width(),
                rgba.height(),
                ExtendedColorType::Rgba8,
            )?;
        }
        EncodingFormat::Avif => {
            let rgba = image.to_rgba8();
            AvifEncoder::new_with_speed_quality(
                &mut buffer,
                settings.avif_speed,
                settings.avif_quality,
            )
            .write_image(
                rgba.as_raw(),
                rgba.width(),
                rgba.height(),
                ExtendedColorType::Rgba8,
            )?;
        }
        EncodingFormat::Jxl => return encode_jxl(image, tools),
        EncodingFormat::JsonXz => {
            return Err(Error::unsupported("json+xz is sidecar data, not an image"))
        }
    }

    Ok(buffer)
}

fn encode_jxl(image: &DynamicImage, tools: &ToolPaths) -> Result<Vec<u8>> {
    let cjxl = tools.resolve("cjxl")?;
    let dir = tempfile::Builder::new().prefix("imgview-").tempdir()?;
    let input = dir.path().join("input.png");
    let output = dir.path().join("output.jxl");

    DynamicImage::ImageRgba8(image.to_rgba8()).save_with_format(&input, ImageFormat::Png)?;
    run_tool(&cjxl, &[input.as_os_str(), output.as_os_str()])?;

    Ok(std::fs::read(&output)?)
}

/// Losslessly recover the original JPEG bitstream stored in a JPEG XL file.
pub(crate) fn reconstruct_jpeg(jxl_path: &Path, tools: &ToolPaths) -> Result<Vec<u8>> {
    let djxl = tools.resolve("djxl")?;
    let scratch = tempfile::Builder::new()
        .prefix("imgview-")
        .suffix(".jpg")
        .tempfile()?;

    run_tool(&djxl, &[jxl_path.as_os_str(), scratch.path().as_os_str()])?;

    Ok(std::fs::read(scratch.path())?)
}

/// Pass a JPEG through `jpegtran -copy all`, keeping every marker.
pub(crate) fn lossless_jpeg(jpeg_path: &Path, tools: &ToolPaths) -> Result<Vec<u8>> {
    let jpegtran = tools.resolve("jpegtran")?;
    run_tool(
        &jpegtran,
        &[OsStr::new("-copy"), OsStr::new("all"), jpeg_path.as_os_str()],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::sniff;
    use image::{Rgba, RgbaImage};

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(16, 12, |x, y| {
            Rgba([(x * 16) as u8, (y * 20) as u8, 128, 255])
        }))
    }

    #[test]
    fn test_native_encoders_produce_their_format() {
        let settings = EncoderSettings::default();
        let tools = ToolPaths::default();
        for format in [
            EncodingFormat::Jpeg,
            EncodingFormat::Png,
            EncodingFormat::Gif,
            EncodingFormat::Webp,
        ] {
            let bytes = encode_image(&sample(), format, &settings, &tools).unwrap();
            assert_eq!(sniff(&bytes), Some(format), "{format}");
        }
    }

    #[test]
    fn test_webp_is_lossless() {
        let bytes = encode_image(
            &sample(),
            EncodingFormat::Webp,
            &EncoderSettings::default(),
            &ToolPaths::default(),
        )
        .unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.to_rgba8(), sample().to_rgba8());
    }

    #[test]
    fn test_sidecar_format_rejected() {
        let result = encode_image(
            &sample(),
            EncodingFormat::JsonXz,
            &EncoderSettings::default(),
            &ToolPaths::default(),
        );
        assert!(matches!(result, Err(Error::Unsupported(_))));
    }
}
