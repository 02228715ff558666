mod cli;

use imgview::caches::DirectoryListingCache;
use imgview::config::{self, Config};
use imgview::delivery::{Delivery, DeliveryService, ThumbnailRequest};
use imgview_common::paths::media_kind_for_path;
use imgview_common::CompatibilityTier;
use imgview_db::models::NewContent;
use imgview_db::pool::init_pool;
use imgview_db::queries::content;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use serde_json::json;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "imgview=trace,imgview_codec=debug,imgview_db=debug".to_string()
        } else {
            "imgview=info,imgview_codec=info,imgview_db=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::CheckTools => check_tools(),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("imgview {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        command => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            run_library_command(&config, command)
        }
    }
}

fn tier_or_default(config: &Config, tier: Option<u8>) -> CompatibilityTier {
    tier.and_then(CompatibilityTier::new)
        .unwrap_or_else(|| config.delivery.default_tier())
}

/// Commands that work on the library database.
fn run_library_command(config: &Config, command: Commands) -> Result<()> {
    let db_path = config.database.path.to_string_lossy();
    tracing::debug!("Opening database at {}", db_path);
    let pool = init_pool(&db_path)?;
    let service = DeliveryService::from_config(config, pool.clone());

    match command {
        Commands::Add {
            file,
            title,
            origin,
            origin_id,
        } => {
            let kind = media_kind_for_path(&file)
                .with_context(|| format!("Unsupported file type: {}", file.display()))?;
            let mut new = NewContent::new(file.to_string_lossy(), kind);
            if let Some(title) = title {
                new = new.with_title(title);
            }
            if let Some(origin) = origin {
                new = new.with_origin(origin, origin_id);
            }
            let conn = pool.get().context("Failed to get database connection")?;
            let item = content::insert_content(&conn, &new)?;
            print_json(&item)
        }
        Commands::Thumbnail {
            id,
            width,
            height,
            format,
            tier,
            allow_origin,
            out,
        } => {
            let request = ThumbnailRequest {
                width,
                height,
                format,
                tier: tier_or_default(config, tier),
                allow_origin,
            };
            let delivery = service.thumbnail(id, &request)?;
            emit(&delivery, out.as_deref())
        }
        Commands::Transcode {
            id,
            format,
            tier,
            download,
            out,
        } => {
            let delivery = service.transcode(id, format, tier_or_default(config, tier), download)?;
            emit(&delivery, out.as_deref())
        }
        Commands::Download { id, out_dir } => {
            let download = service.download(id)?;
            let out = out_dir.map(|dir| dir.join(&download.filename));
            emit(&download.delivery, out.as_deref())?;
            println!("{}", json!({ "filename": download.filename }));
            Ok(())
        }
        Commands::Fingerprint { ids } => {
            let mut outcomes = Vec::with_capacity(ids.len());
            for id in ids {
                outcomes.push(service.fingerprint_content(id)?);
            }
            print_json(&outcomes)
        }
        Commands::Duplicates {
            id: Some(id),
            show_alternates: _,
        } => print_json(&service.find_candidates(id)?),
        Commands::Duplicates {
            id: None,
            show_alternates,
        } => print_json(&service.duplicate_groups(show_alternates)?),
        Commands::Compare { ids } => print_json(&service.compare_content(&ids)?),
        Commands::DropThumbnails { id } => {
            let dropped = service.drop_thumbnails(id)?;
            println!("{}", json!({ "content_id": id, "dropped": dropped }));
            Ok(())
        }
        Commands::DropRepresentations { id } => {
            let dropped = service.drop_representations(id)?;
            println!("{}", json!({ "content_id": id, "dropped": dropped }));
            Ok(())
        }
        Commands::MarkAlternate { first, second } => {
            service.mark_alternate(first, second)?;
            println!("Marked {} and {} as alternate versions", first, second);
            Ok(())
        }
        Commands::List { dir, glob } => {
            let dir = config.library.resolve(dir.unwrap_or_default());
            let listing = DirectoryListingCache::new().list(&dir, glob.as_deref())?;
            print_json(listing.as_ref())
        }
        Commands::CheckTools | Commands::Validate { .. } | Commands::Version => Ok(()),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Report a delivery and, with `out`, write its bytes there.
fn emit(delivery: &Delivery, out: Option<&Path>) -> Result<()> {
    let summary = match delivery {
        Delivery::Redirect(path) => json!({ "redirect": path }),
        Delivery::File { path, format } => {
            if let Some(out) = out {
                std::fs::copy(path, out)
                    .with_context(|| format!("Failed to copy {} to {}", path.display(), out.display()))?;
            }
            json!({ "file": path, "format": format })
        }
        Delivery::Bytes { data, format } => {
            if let Some(out) = out {
                std::fs::write(out, data)
                    .with_context(|| format!("Failed to write {}", out.display()))?;
            }
            json!({ "bytes": data.len(), "format": format, "written_to": out.map(PathBuf::from) })
        }
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    let tools = imgview_codec::check_tools();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All external tools are available!");
    } else {
        println!("Some tools are missing. JPEG XL, AVIF decoding and video frames need them.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Library root: {}", config.library.root_dir.display());
    println!("  Database: {}", config.database.path.display());
    match &config.cache.thumbnail_dir {
        Some(dir) => println!("  Thumbnail cache: {}", dir.display()),
        None => println!("  Thumbnail cache: disabled"),
    }
    println!(
        "  Default compatibility level: {}",
        config.delivery.default_tier()
    );
    println!(
        "  Quality: JPEG {}, AVIF {} (speed {})",
        config.delivery.jpeg_quality, config.delivery.avif_quality, config.delivery.avif_speed
    );

    Ok(())
}
