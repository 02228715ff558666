//! Video-like sources reduced to a single representative frame.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use image::ImageFormat;

use crate::decode::DecodedImage;
use crate::tools::{run_tool, ToolPaths};
use crate::Result;

/// A video or animated source read through `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    path: PathBuf,
    tools: ToolPaths,
}

impl FrameSequence {
    pub fn new(path: impl Into<PathBuf>, tools: ToolPaths) -> Self {
        Self {
            path: path.into(),
            tools,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Extract the first frame as a PNG over ffmpeg's stdout and decode it.
    pub fn next_frame(&self) -> Result<DecodedImage> {
        let ffmpeg = self.tools.resolve("ffmpeg")?;
        let args: [&OsStr; 11] = [
            OsStr::new("-v"),
            OsStr::new("error"),
            OsStr::new("-i"),
            self.path.as_os_str(),
            OsStr::new("-frames:v"),
            OsStr::new("1"),
            OsStr::new("-f"),
            OsStr::new("image2pipe"),
            OsStr::new("-vcodec"),
            OsStr::new("png"),
            OsStr::new("-"),
        ];
        let png = run_tool(&ffmpeg, &args)?;

        tracing::debug!("Extracted frame from {}", self.path.display());

        let image = image::load_from_memory_with_format(&png, ImageFormat::Png)?;
        Ok(DecodedImage::new(image, None))
    }
}
