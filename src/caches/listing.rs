//! Directory listings of the media root, memoized for the last query.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use imgview_common::paths::{is_supported_file, media_kind_for_path};
use imgview_common::{Error, MediaKind, Result};
use regex::Regex;
use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use super::SingleSlot;

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingEntry {
    pub path: PathBuf,
    /// Path relative to the listed directory.
    pub name: String,
    pub is_dir: bool,
    pub media_kind: Option<MediaKind>,
}

type ListingKey = (PathBuf, Option<String>);

/// Remembers the listing of the most recently listed (directory, glob) pair.
#[derive(Debug, Default)]
pub struct DirectoryListingCache {
    slot: SingleSlot<ListingKey, Vec<ListingEntry>>,
}

impl DirectoryListingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// List `dir`, reusing the previous result when the query is unchanged.
    pub fn list(&self, dir: &Path, glob: Option<&str>) -> Result<Arc<Vec<ListingEntry>>> {
        let key = (dir.to_path_buf(), glob.map(str::to_string));
        self.slot.get_or_try_insert_with(key, |(dir, glob)| {
            tracing::debug!("Listing {} (glob {:?})", dir.display(), glob);
            list_directory(dir, glob.as_deref())
        })
    }

    pub fn invalidate(&self) {
        self.slot.invalidate();
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

/// List the media in `dir`, sorted by name.
///
/// Without a glob only the direct children are listed: subdirectories and
/// files the library serves. With a glob, files anywhere below `dir` whose
/// relative path matches it are listed. Hidden entries are skipped.
pub fn list_directory(dir: &Path, glob: Option<&str>) -> Result<Vec<ListingEntry>> {
    let pattern = glob.map(glob_to_regex).transpose()?;
    let max_depth = if pattern.is_some() { usize::MAX } else { 1 };

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry));

    let mut entries = Vec::new();
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        let is_dir = entry.file_type().is_dir();
        let name = path
            .strip_prefix(dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        let keep = match &pattern {
            Some(pattern) => !is_dir && pattern.is_match(&name),
            None => is_dir || is_supported_file(path),
        };
        if !keep {
            continue;
        }

        entries.push(ListingEntry {
            media_kind: if is_dir { None } else { media_kind_for_path(path) },
            path: path.to_path_buf(),
            name,
            is_dir,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Translate a glob into an anchored regex over `/`-separated relative paths.
///
/// `*` and `?` stay within one path segment; `**` crosses segments.
fn glob_to_regex(glob: &str) -> Result<Regex> {
    let mut pattern = String::from("^");
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    pattern.push_str("(?:.*/)?");
                } else {
                    pattern.push_str(".*");
                }
            }
            '*' => pattern.push_str("[^/]*"),
            '?' => pattern.push_str("[^/]"),
            c => pattern.push_str(&regex::escape(&c.to_string())),
        }
    }
    pattern.push('$');

    Regex::new(&pattern).map_err(|e| Error::validation(format!("invalid glob {glob:?}: {e}")))
}
