//! Format sniffing by magic bytes.
//!
//! File extensions in a media library are not trustworthy (a `.jpg` may hold a
//! PNG), so every decision about how to open a file starts here.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use imgview_common::EncodingFormat;

use crate::{Error, Result};

/// Bytes read from the start of a file when sniffing.
pub const SNIFF_LEN: usize = 64;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JXL_CODESTREAM: &[u8] = &[0xFF, 0x0A];
const JXL_CONTAINER: &[u8] = b"\x00\x00\x00\x0cJXL \r\n\x87\n";

pub fn is_jpeg(data: &[u8]) -> bool {
    data.starts_with(&[0xFF, 0xD8, 0xFF])
}

pub fn is_png(data: &[u8]) -> bool {
    data.starts_with(PNG_SIGNATURE)
}

pub fn is_gif(data: &[u8]) -> bool {
    data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a")
}

pub fn is_webp(data: &[u8]) -> bool {
    data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP"
}

/// ISO-BMFF `ftyp` box whose major or compatible brands include `avif`/`avis`.
pub fn is_avif(data: &[u8]) -> bool {
    if data.len() < 12 || &data[4..8] != b"ftyp" {
        return false;
    }
    let box_len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let end = box_len.clamp(12, data.len());

    // major brand, minor version, then compatible brands
    std::iter::once(&data[8..12])
        .chain(data.get(16..end).unwrap_or(&[]).chunks_exact(4))
        .any(|brand| brand == b"avif" || brand == b"avis")
}

pub fn is_jxl(data: &[u8]) -> bool {
    data.starts_with(JXL_CODESTREAM) || data.starts_with(JXL_CONTAINER)
}

/// Identify the encoding of `data` from its leading bytes.
pub fn sniff(data: &[u8]) -> Option<EncodingFormat> {
    if is_jpeg(data) {
        Some(EncodingFormat::Jpeg)
    } else if is_png(data) {
        Some(EncodingFormat::Png)
    } else if is_gif(data) {
        Some(EncodingFormat::Gif)
    } else if is_webp(data) {
        Some(EncodingFormat::Webp)
    } else if is_avif(data) {
        Some(EncodingFormat::Avif)
    } else if is_jxl(data) {
        Some(EncodingFormat::Jxl)
    } else {
        None
    }
}

/// Read the first [`SNIFF_LEN`] bytes of a file.
pub fn read_header(path: &Path) -> Result<Vec<u8>> {
    let mut header = Vec::with_capacity(SNIFF_LEN);
    File::open(path)?
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut header)?;
    Ok(header)
}

/// Sniff the encoding of a file on disk.
pub fn sniff_file(path: &Path) -> Result<Option<EncodingFormat>> {
    Ok(sniff(&read_header(path)?))
}

/// Whether a JPEG uses arithmetic entropy coding (SOF9 to SOF15).
///
/// Browsers cannot display arithmetic-coded JPEGs, so such files must never be
/// redirected to directly. Scans marker segments up to the first frame header.
///
/// # Errors
///
/// Returns [`Error::Unsupported`] when `data` is not a JPEG.
pub fn is_arithmetic_coded_jpeg(data: &[u8]) -> Result<bool> {
    if !is_jpeg(data) {
        return Err(Error::unsupported("not a JPEG stream"));
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        let marker = data[pos + 1];
        match marker {
            // fill bytes
            0xFF => {
                pos += 1;
                continue;
            }
            // TEM and RSTn carry no length
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            // start of scan reached without a frame header
            0xDA | 0xD9 => return Ok(false),
            // DHT, JPG and DAC share the SOFn range but are not frame headers
            0xC4 | 0xC8 | 0xCC => {}
            0xC0..=0xCF => return Ok(marker >= 0xC9),
            _ => {}
        }

        if pos + 3 >= data.len() {
            break;
        }
        let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        pos += 2 + len;
    }

    Ok(false)
}
