//! Data URI decoding and scratch persistence for embedded images.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::CodecError;

const DATA_URI_PREFIX: &str = "data:image/";
const BASE64_MARKER: &str = "base64,";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    /// Map a declared format name onto a supported codec. `jpg` is accepted
    /// as an alias of `jpeg`.
    pub fn parse(name: &str) -> Result<Self, CodecError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            _ => Err(CodecError::Unsupported(name.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }

    pub(crate) fn to_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }

    pub(crate) fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ImageFormat::parse(ext).ok())
    }
}

/// An image that has been decoded and written to scratch storage.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub storage_path: PathBuf,
}

/// Return the `<format>` part of `data:image/<format>;base64,<payload>`.
pub fn extract_format(data_uri: &str) -> Result<&str, CodecError> {
    let rest = data_uri
        .trim_start()
        .strip_prefix(DATA_URI_PREFIX)
        .ok_or(CodecError::FormatNotFound)?;
    let end = rest.find([';', ',']).ok_or(CodecError::FormatNotFound)?;
    let format = &rest[..end];
    let valid = |c: char| c.is_ascii_alphanumeric() || c == '+' || c == '-';
    if format.is_empty() || !format.chars().all(valid) {
        return Err(CodecError::FormatNotFound);
    }
    Ok(format)
}

/// Base64-decode everything after the `base64,` marker.
pub fn extract_payload(data_uri: &str) -> Result<Vec<u8>, CodecError> {
    let (_, payload) = data_uri
        .split_once(BASE64_MARKER)
        .ok_or(CodecError::PayloadNotFound)?;
    // Clients frequently wrap long payloads across lines.
    let compact: Vec<u8> = payload
        .bytes()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect();
    Ok(BASE64.decode(compact)?)
}

/// Check the magic bytes of `bytes` against the declared format.
pub fn verify_format(bytes: &[u8], format: ImageFormat) -> Result<(), CodecError> {
    match image::guess_format(bytes) {
        Ok(found) if found == format.to_image_format() => Ok(()),
        _ => Err(CodecError::FormatMismatch {
            expected: format.name(),
        }),
    }
}

/// Write `bytes` to `path`, creating parent directories first.
pub fn persist(bytes: &[u8], path: &Path) -> Result<(), CodecError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(())
}
