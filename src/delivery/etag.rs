//! Entity tags for served files.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use imgview_common::Result;
use sha2::{Digest, Sha256};

/// SHA-256 of a file's bytes, hex encoded.
pub fn source_etag(path: &Path) -> Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Whether an `If-None-Match` header value names the file's current tag.
pub fn is_not_modified(path: &Path, if_none_match: Option<&str>) -> Result<bool> {
    let Some(header) = if_none_match else {
        return Ok(false);
    };
    let etag = source_etag(path)?;
    Ok(header
        .split(',')
        .map(|tag| tag.trim().trim_start_matches("W/").trim_matches('"'))
        .any(|tag| tag == etag || tag == "*"))
}
