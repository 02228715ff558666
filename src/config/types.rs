use imgview_codec::{EncoderSettings, ToolPaths};
use imgview_common::CompatibilityTier;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Explicit executable paths; unset tools are looked up on PATH.
    #[serde(default)]
    pub tools: ToolPaths,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    /// Media root. Content file paths are relative to it.
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    #[serde(default = "default_items_per_page")]
    pub items_per_page: u32,
}

fn default_root_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_items_per_page() -> u32 {
    50
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            items_per_page: default_items_per_page(),
        }
    }
}

impl LibraryConfig {
    /// Absolute location of a library-relative path.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root_dir.join(relative)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("imgview.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Where rendered thumbnails are kept. Thumbnails are rendered on every
    /// request when unset.
    #[serde(default)]
    pub thumbnail_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
    /// Client tier assumed when a request carries none.
    #[serde(default = "default_compatibility_level")]
    pub default_compatibility_level: u8,

    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    #[serde(default = "default_avif_quality")]
    pub avif_quality: u8,

    #[serde(default = "default_avif_speed")]
    pub avif_speed: u8,
}

fn default_compatibility_level() -> u8 {
    CompatibilityTier::DEFAULT.level()
}

fn default_jpeg_quality() -> u8 {
    90
}

fn default_avif_quality() -> u8 {
    80
}

fn default_avif_speed() -> u8 {
    8
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            default_compatibility_level: default_compatibility_level(),
            jpeg_quality: default_jpeg_quality(),
            avif_quality: default_avif_quality(),
            avif_speed: default_avif_speed(),
        }
    }
}

impl DeliveryConfig {
    /// The configured default tier, falling back to the built-in default when
    /// the value is out of range.
    pub fn default_tier(&self) -> CompatibilityTier {
        CompatibilityTier::new(self.default_compatibility_level).unwrap_or_default()
    }

    pub fn encoder_settings(&self) -> EncoderSettings {
        EncoderSettings {
            jpeg_quality: self.jpeg_quality,
            avif_quality: self.avif_quality,
            avif_speed: self.avif_speed,
        }
    }
}
