//! Core type definitions for content items, encoding formats and client tiers.
//!
//! All enums serialize in the lowercase spelling stored in the database and
//! used in request URLs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of media a content item holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaKind {
    /// Still image (possibly a multi-resolution container).
    Image,
    /// Video with sound.
    Video,
    /// Short looping video without sound.
    VideoLoop,
    /// Audio track.
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
            Self::VideoLoop => write!(f, "video-loop"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "video-loop" => Ok(Self::VideoLoop),
            "audio" => Ok(Self::Audio),
            other => Err(format!("unknown media kind: {other}")),
        }
    }
}

/// Encoding format of a stored file or a requested output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncodingFormat {
    #[serde(rename = "jpeg")]
    Jpeg,
    #[serde(rename = "png")]
    Png,
    #[serde(rename = "gif")]
    Gif,
    #[serde(rename = "webp")]
    Webp,
    #[serde(rename = "avif")]
    Avif,
    #[serde(rename = "jxl")]
    Jxl,
    /// xz-compressed JSON sidecar data stored next to image levels.
    #[serde(rename = "json+xz")]
    JsonXz,
}

impl EncodingFormat {
    /// Canonical lowercase name, as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Avif => "avif",
            Self::Jxl => "jxl",
            Self::JsonXz => "json+xz",
        }
    }

    /// MIME type sent with files of this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Avif => "image/avif",
            Self::Jxl => "image/jxl",
            Self::JsonXz => "application/x-xz",
        }
    }

    /// File extension used when writing files of this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Avif => "avif",
            Self::Jxl => "jxl",
            Self::JsonXz => "json.xz",
        }
    }

    /// Guess the format from a file extension (case-insensitive, without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "jfif" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            "avif" => Some(Self::Avif),
            "jxl" => Some(Self::Jxl),
            "xz" => Some(Self::JsonXz),
            _ => None,
        }
    }

    /// Whether files of this format hold pixels (as opposed to sidecar data).
    pub fn is_image(&self) -> bool {
        !matches!(self, Self::JsonXz)
    }

    /// Whether the format can carry an animation.
    pub fn supports_animation(&self) -> bool {
        matches!(self, Self::Gif | Self::Webp | Self::Png)
    }

    /// Formats every browser can display, safe to redirect any client to.
    pub fn is_web_safe(&self) -> bool {
        matches!(self, Self::Webp | Self::Jpeg | Self::Png)
    }
}

impl fmt::Display for EncodingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncodingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "gif" => Ok(Self::Gif),
            "webp" => Ok(Self::Webp),
            "avif" => Ok(Self::Avif),
            "jxl" | "jpeg xl" => Ok(Self::Jxl),
            "json+xz" => Ok(Self::JsonXz),
            other => Err(format!("unknown encoding format: {other}")),
        }
    }
}

/// Client or representation compatibility tier.
///
/// Lower values are more advanced and less broadly supported; 4 is the
/// baseline every client decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CompatibilityTier(u8);

impl CompatibilityTier {
    /// Most advanced tier.
    pub const BEST: Self = Self(0);
    /// Tier assumed for clients that did not declare one.
    pub const DEFAULT: Self = Self(3);
    /// Maximally compatible tier.
    pub const BASELINE: Self = Self(4);

    /// Create a tier, rejecting values above [`Self::BASELINE`].
    pub fn new(level: u8) -> Option<Self> {
        (level <= Self::BASELINE.0).then_some(Self(level))
    }

    pub fn level(&self) -> u8 {
        self.0
    }

    /// Clients at tier 0 or 1 ask for the best quality available.
    pub fn is_best_quality(&self) -> bool {
        self.0 <= 1
    }

    /// Whether a representation stored at `representation` can be handed to a
    /// client at this tier (it must be at least as compatible).
    pub fn accepts(&self, representation: CompatibilityTier) -> bool {
        representation.0 >= self.0
    }
}

impl Default for CompatibilityTier {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for CompatibilityTier {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level).ok_or_else(|| format!("compatibility level out of range: {level}"))
    }
}

impl From<CompatibilityTier> for u8 {
    fn from(tier: CompatibilityTier) -> Self {
        tier.0
    }
}

impl fmt::Display for CompatibilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Output format asked for by a transcode request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestedFormat {
    /// Let the server pick from what the client tier supports.
    Autodetect,
    Exact(EncodingFormat),
}

impl RequestedFormat {
    /// Native formats a client at `tier` accepts without re-encoding.
    pub fn candidate_formats(&self, tier: CompatibilityTier) -> Vec<EncodingFormat> {
        match self {
            Self::Exact(format) => vec![*format],
            Self::Autodetect if tier.is_best_quality() => {
                vec![EncodingFormat::Avif, EncodingFormat::Webp]
            }
            Self::Autodetect if tier == CompatibilityTier::BASELINE => vec![
                EncodingFormat::Jpeg,
                EncodingFormat::Png,
                EncodingFormat::Gif,
            ],
            Self::Autodetect => vec![EncodingFormat::Webp],
        }
    }

    /// Format produced when the source has to be re-encoded.
    pub fn output_format(&self, tier: CompatibilityTier) -> EncodingFormat {
        match self {
            Self::Exact(format) => *format,
            Self::Autodetect if tier == CompatibilityTier::BASELINE => EncodingFormat::Jpeg,
            Self::Autodetect => EncodingFormat::Webp,
        }
    }
}

impl fmt::Display for RequestedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Autodetect => f.write_str("autodetect"),
            Self::Exact(format) => format.fmt(f),
        }
    }
}

impl FromStr for RequestedFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("autodetect") {
            Ok(Self::Autodetect)
        } else {
            s.parse().map(Self::Exact)
        }
    }
}

/// Perceptual fingerprint of a content item's pixels.
///
/// Items whose fingerprints are equal field-for-field land in the same
/// duplicate bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Width divided by height of the hashed image.
    pub aspect_ratio: f64,
    /// 64-bit difference hash of the value (brightness) channel.
    pub value_hash: u64,
    /// 16-bit difference hash of the hue channel.
    pub hue_hash: u16,
    /// 16-bit difference hash of the saturation channel.
    pub saturation_hash: u16,
}

impl Fingerprint {
    /// Hue and saturation hashes packed into one 32-bit value (hue in the high half).
    pub fn hue_saturation_hash(&self) -> u32 {
        (u32::from(self.hue_hash) << 16) | u32::from(self.saturation_hash)
    }
}
