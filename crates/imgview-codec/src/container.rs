//! SRS multi-resolution container manifests.
//!
//! An SRS file is a small JSON manifest next to the encoded files it bundles:
//!
//! ```json
//! {
//!   "ftype": "CLSRS",
//!   "streams": {
//!     "image": {
//!       "levels": { "0": "mlid42.avif", "2": "mlid42.jxl", "4": "mlid42.jpg" },
//!       "lods": ["mlid42-small.webp", "mlid42.jpg", "mlid42.avif"]
//!     }
//!   }
//! }
//! ```
//!
//! `levels` maps compatibility tiers to files. `lods` lists the files in
//! ascending pixel resolution; when it is absent the LOD chain is the image
//! levels ordered from the most compatible tier down.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use imgview_common::{CompatibilityTier, EncodingFormat};
use serde::Deserialize;

use crate::{Error, Result};

const SRS_FILE_TYPE: &str = "CLSRS";

#[derive(Debug, Deserialize)]
struct Manifest {
    ftype: String,
    #[serde(default)]
    streams: Streams,
}

#[derive(Debug, Default, Deserialize)]
struct Streams {
    image: Option<ImageStream>,
}

#[derive(Debug, Deserialize)]
struct ImageStream {
    #[serde(default)]
    levels: BTreeMap<String, String>,
    lods: Option<Vec<String>>,
}

/// A file bundled in a container at a given compatibility tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerLevel {
    pub compatibility_level: CompatibilityTier,
    pub format: EncodingFormat,
    pub file_path: PathBuf,
}

/// Parsed SRS container.
#[derive(Debug, Clone)]
pub struct SrsContainer {
    manifest_path: PathBuf,
    levels: Vec<ContainerLevel>,
    lods: Vec<PathBuf>,
}

/// Format of a bundled file, judged by its name.
pub fn format_for_path(path: &Path) -> Option<EncodingFormat> {
    let name = path.file_name()?.to_str()?.to_ascii_lowercase();
    if name.ends_with(".json.xz") {
        return Some(EncodingFormat::JsonXz);
    }
    EncodingFormat::from_extension(path.extension()?.to_str()?)
        .filter(|format| *format != EncodingFormat::JsonXz)
}

impl SrsContainer {
    /// Read and parse a manifest from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::parse(path, &data)
    }

    /// Parse manifest text; bundled paths resolve against the manifest's directory.
    pub fn parse(manifest_path: &Path, data: &str) -> Result<Self> {
        let manifest: Manifest = serde_json::from_str(data)
            .map_err(|e| Error::malformed(manifest_path, e.to_string()))?;

        if manifest.ftype != SRS_FILE_TYPE {
            return Err(Error::malformed(
                manifest_path,
                format!("unexpected file type {:?}", manifest.ftype),
            ));
        }

        let stream = manifest
            .streams
            .image
            .ok_or_else(|| Error::malformed(manifest_path, "no image stream"))?;

        let base_dir = manifest_path.parent().unwrap_or(Path::new(""));

        let mut levels = Vec::with_capacity(stream.levels.len());
        for (key, file) in &stream.levels {
            let compatibility_level = key
                .parse::<u8>()
                .ok()
                .and_then(CompatibilityTier::new)
                .ok_or_else(|| {
                    Error::malformed(manifest_path, format!("invalid compatibility level {key:?}"))
                })?;
            let file_path = base_dir.join(file);
            let format = format_for_path(&file_path).ok_or_else(|| {
                Error::malformed(manifest_path, format!("unknown format of {file:?}"))
            })?;
            levels.push(ContainerLevel {
                compatibility_level,
                format,
                file_path,
            });
        }
        levels.sort_by_key(|level| level.compatibility_level);

        let lods: Vec<PathBuf> = match stream.lods {
            Some(lods) => lods.iter().map(|file| base_dir.join(file)).collect(),
            None => levels
                .iter()
                .rev()
                .filter(|level| level.format.is_image())
                .map(|level| level.file_path.clone())
                .collect(),
        };

        if lods.is_empty() || !levels.iter().any(|level| level.format.is_image()) {
            return Err(Error::malformed(manifest_path, "no image levels"));
        }

        Ok(Self {
            manifest_path: manifest_path.to_path_buf(),
            levels,
            lods,
        })
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// LOD files in ascending pixel resolution. Never empty.
    pub fn progressive_lods(&self) -> &[PathBuf] {
        &self.lods
    }

    /// The highest-resolution LOD.
    pub fn best_quality(&self) -> &Path {
        self.lods
            .last()
            .map(PathBuf::as_path)
            .unwrap_or(self.manifest_path.as_path())
    }

    /// File stored for exactly `tier`, if the container has one.
    pub fn get_content_by_level(&self, tier: CompatibilityTier) -> Option<&Path> {
        self.levels
            .iter()
            .find(|level| level.compatibility_level == tier && level.format.is_image())
            .map(|level| level.file_path.as_path())
    }

    /// Every bundled file, best quality first, sidecar data included.
    pub fn representations(&self) -> &[ContainerLevel] {
        &self.levels
    }
}
