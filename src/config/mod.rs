mod types;

pub use types::*;

use anyhow::{Context, Result};
use imgview_common::CompatibilityTier;
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    expand_paths(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./imgview.toml",
        "~/.config/imgview/config.toml",
        "/etc/imgview/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    Ok(Config::default())
}

fn expand(path: &Path) -> std::path::PathBuf {
    let raw = path.to_string_lossy();
    std::path::PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}

fn expand_paths(config: &mut Config) {
    config.library.root_dir = expand(&config.library.root_dir);
    config.database.path = expand(&config.database.path);
    if let Some(dir) = config.cache.thumbnail_dir.as_mut() {
        *dir = expand(dir);
    }
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if CompatibilityTier::new(config.delivery.default_compatibility_level).is_none() {
        anyhow::bail!(
            "Default compatibility level must be between 0 and {}, got {}",
            CompatibilityTier::BASELINE,
            config.delivery.default_compatibility_level
        );
    }

    for (name, quality) in [
        ("JPEG", config.delivery.jpeg_quality),
        ("AVIF", config.delivery.avif_quality),
    ] {
        if !(1..=100).contains(&quality) {
            anyhow::bail!("{} quality must be between 1 and 100, got {}", name, quality);
        }
    }

    if !(1..=10).contains(&config.delivery.avif_speed) {
        anyhow::bail!(
            "AVIF speed must be between 1 and 10, got {}",
            config.delivery.avif_speed
        );
    }

    if config.library.items_per_page == 0 {
        anyhow::bail!("Items per page cannot be 0");
    }

    if !config.library.root_dir.is_dir() {
        tracing::warn!("Library root does not exist: {:?}", config.library.root_dir);
    }

    if let Some(dir) = &config.cache.thumbnail_dir {
        if !dir.is_dir() {
            tracing::warn!("Thumbnail cache directory does not exist: {:?}", dir);
        }
    }

    Ok(())
}
