use clap::{Parser, Subcommand};
use imgview_common::{ContentId, EncodingFormat, RequestedFormat};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "imgview")]
#[command(author, version, about = "Media delivery core for a personal media library")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a library file as a content item
    Add {
        /// File path relative to the library root
        file: PathBuf,

        #[arg(long)]
        title: Option<String>,

        /// Name of the external source the file came from
        #[arg(long)]
        origin: Option<String>,

        /// Identifier of the file at the external source
        #[arg(long, requires = "origin")]
        origin_id: Option<String>,
    },

    /// Render (or look up) a thumbnail
    Thumbnail {
        id: ContentId,

        #[arg(long, default_value = "256")]
        width: u32,

        #[arg(long, default_value = "256")]
        height: u32,

        #[arg(short, long, default_value = "webp")]
        format: EncodingFormat,

        /// Client compatibility tier (0-4); the configured default when omitted
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=4))]
        tier: Option<u8>,

        /// Accept a redirect to an unmodified file
        #[arg(long)]
        allow_origin: bool,

        /// Write the encoded bytes here
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Serve a content item in another format
    Transcode {
        id: ContentId,

        /// Output format, or "autodetect" to pick by tier
        #[arg(short, long, default_value = "autodetect")]
        format: RequestedFormat,

        #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=4))]
        tier: Option<u8>,

        /// Send stored files verbatim instead of redirecting
        #[arg(long)]
        download: bool,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Byte-exact download with a suggested file name
    Download {
        id: ContentId,

        /// Directory to save the file into
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Compute missing fingerprints
    Fingerprint {
        #[arg(required = true)]
        ids: Vec<ContentId>,
    },

    /// List duplicate groups, or the candidates of one item
    Duplicates {
        /// Show the fingerprint bucket of this item only
        #[arg(long)]
        id: Option<ContentId>,

        /// Include groups made up only of alternate versions
        #[arg(long)]
        show_alternates: bool,
    },

    /// Compare items pairwise
    Compare {
        #[arg(required = true, num_args = 2..)]
        ids: Vec<ContentId>,
    },

    /// Delete cached thumbnails of an item
    DropThumbnails { id: ContentId },

    /// Forget the representation catalog of an item
    DropRepresentations { id: ContentId },

    /// Link two items as alternate versions of each other
    MarkAlternate { first: ContentId, second: ContentId },

    /// List media in a library directory
    List {
        /// Directory relative to the library root
        dir: Option<PathBuf>,

        /// Glob over paths below the directory, e.g. "**/*.png"
        #[arg(short, long)]
        glob: Option<String>,
    },

    /// Check that external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
